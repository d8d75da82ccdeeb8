//! End-to-end tests driving the `brochure-kb` binary against a temporary
//! `SQLite` database, exercising the full ingest -> query -> drift -> purge
//! lifecycle the way an operator would from a shell.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BROCHURE_MD: &str = "---\n\
product: Explorer\n\
locale: en-US\n\
market: US\n\
trim: Limited\n\
---\n\
\n\
## Specifications\n\
\n\
| Category | Sub-Category | Specification | Value | Additional Metadata |\n\
|---|---|---|---|---|\n\
| Engine | Powertrain | Horsepower | 300 hp | |\n\
| Engine | Powertrain | Torque | 310 lb-ft | |\n\
| Interior | Comfort | Heated Seats | Standard | |\n\
\n\
## Key Features\n\
\n\
- Panoramic sunroof\n\
- Adaptive cruise control\n\
\n\
## USPs\n\
\n\
- Best-in-class cargo space\n\
\n\
## FAQ\n\
\n\
**Q: What is the towing capacity?**\n\
A: Up to 5,600 lbs when properly equipped.\n";

fn cmd(db_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("brochure-kb").expect("binary should build");
    cmd.arg("--db-path").arg(db_path);
    cmd
}

#[test]
fn ingest_then_query_returns_structured_facts() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("brochure.db");
    let md_path = dir.path().join("explorer.md");
    std::fs::write(&md_path, BROCHURE_MD).expect("write brochure");

    cmd(&db_path)
        .args(["ingest", "Acme", "Explorer"])
        .arg(&md_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("job "));

    cmd(&db_path)
        .args(["--format", "json", "query", "Acme", "What is the horsepower?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("structured_facts"));
}

#[test]
fn ingest_is_idempotent_across_repeated_invocations() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("brochure.db");
    let md_path = dir.path().join("explorer.md");
    std::fs::write(&md_path, BROCHURE_MD).expect("write brochure");

    for _ in 0..2 {
        cmd(&db_path).args(["ingest", "Acme", "Explorer"]).arg(&md_path).assert().success();
    }

    cmd(&db_path)
        .args(["--format", "json", "drift", "Acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"alerts\""));
}

#[test]
fn query_against_an_empty_tenant_succeeds_with_no_facts() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("brochure.db");

    cmd(&db_path)
        .args(["--format", "json", "query", "Nobody", "anything at all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"structured_facts\": []"));
}

#[test]
fn drift_against_an_empty_tenant_reports_no_alerts() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("brochure.db");

    cmd(&db_path).args(["drift", "Acme"]).assert().success().stdout(predicate::str::contains("drift severity"));
}

#[test]
fn purge_dry_run_does_not_delete_ingested_rows() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("brochure.db");
    let md_path = dir.path().join("explorer.md");
    std::fs::write(&md_path, BROCHURE_MD).expect("write brochure");

    cmd(&db_path).args(["ingest", "Acme", "Explorer"]).arg(&md_path).assert().success();

    cmd(&db_path)
        .args(["--format", "json", "purge", "Acme", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dry_run\": true"));

    // Rows survive a dry run: a second query still finds the ingested facts.
    cmd(&db_path)
        .args(["--format", "json", "query", "Acme", "Horsepower"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Horsepower").or(predicate::str::contains("structured_facts")));
}

#[test]
fn purge_without_dry_run_removes_the_tenant_s_data() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("brochure.db");
    let md_path = dir.path().join("explorer.md");
    std::fs::write(&md_path, BROCHURE_MD).expect("write brochure");

    cmd(&db_path).args(["ingest", "Acme", "Explorer"]).arg(&md_path).assert().success();
    cmd(&db_path).args(["--format", "json", "purge", "Acme"]).assert().success().stdout(predicate::str::contains("\"dry_run\": false"));

    cmd(&db_path)
        .args(["--format", "json", "query", "Acme", "Horsepower"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"structured_facts\": []"));
}

#[test]
fn nonexistent_brochure_file_is_a_clean_invalid_input_error() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("brochure.db");

    cmd(&db_path)
        .args(["--format", "json", "ingest", "Acme", "Explorer"])
        .arg(dir.path().join("missing.md"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("InvalidInput"));
}
