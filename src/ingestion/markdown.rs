//! Stage 1, `Parse` (§4.8): Markdown frontmatter, 5-column spec tables,
//! bulleted feature/USP sections, and FAQ pairs.
//!
//! This is a line-scanning parser, not a full CommonMark implementation —
//! brochures are generated from a narrow, predictable template, and the
//! pipeline only needs the handful of constructs §4.8 names.

use crate::error::{IngestionError, Result};

const SPEC_TABLE_COLUMNS: usize = 5;

/// Frontmatter metadata block (`title`, `product`, `model_year`, `locale`,
/// `market`, `trim`), delimited by `---` lines at the top of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    /// Document title.
    pub title: Option<String>,
    /// Product name, as written in the brochure.
    pub product: Option<String>,
    /// Model year.
    pub model_year: Option<String>,
    /// Locale, e.g. `"en-US"`.
    pub locale: Option<String>,
    /// Market, e.g. `"US"`.
    pub market: Option<String>,
    /// Trim level, e.g. `"Limited"`.
    pub trim: Option<String>,
}

/// One data row from a 5-column spec table, not yet normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpecRow {
    /// Top-level category column.
    pub parent_category: String,
    /// Sub-category column.
    pub sub_category: String,
    /// Specification name column.
    pub specification: String,
    /// Value column, as written.
    pub value: String,
    /// Free-form fifth column, if non-empty.
    pub additional_metadata: Option<String>,
    /// 1-based source line of this row, for error messages.
    pub source_line: usize,
}

/// A bulleted feature or USP line, optionally attributed to a category by
/// its enclosing heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBullet {
    /// The bullet's text body (without the leading `-`/`*`).
    pub body: String,
    /// The nearest enclosing heading, if any.
    pub category: Option<String>,
}

/// A question/answer pair extracted from a FAQ section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFaq {
    /// The question text.
    pub question: String,
    /// The answer text.
    pub answer: String,
}

/// The fully parsed structure of one brochure document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Frontmatter metadata.
    pub frontmatter: Frontmatter,
    /// Spec table rows, in document order.
    pub spec_rows: Vec<RawSpecRow>,
    /// Feature bullets, in document order.
    pub features: Vec<RawBullet>,
    /// USP bullets, in document order.
    pub usps: Vec<RawBullet>,
    /// FAQ question/answer pairs, in document order.
    pub faqs: Vec<RawFaq>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Feature,
    Usp,
    Faq,
}

/// Parses `markdown` into its frontmatter, spec rows, features, USPs, and FAQs.
///
/// # Errors
///
/// Returns [`IngestionError::MalformedRow`] if a detected spec table has a
/// row whose column count doesn't match its header.
pub fn parse(markdown: &str) -> Result<ParsedDocument> {
    let (frontmatter, body) = split_frontmatter(markdown);
    let mut doc = ParsedDocument {
        frontmatter,
        ..ParsedDocument::default()
    };

    let lines: Vec<&str> = body.lines().collect();
    let mut section = Section::None;
    let mut current_heading: Option<String> = None;
    let mut pending_question: Option<String> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim_end();
        let trimmed = line.trim();

        if let Some(heading) = parse_heading(trimmed) {
            current_heading = Some(heading.clone());
            section = classify_heading(&heading);
            i += 1;
            continue;
        }

        if trimmed.starts_with('|') && i + 1 < lines.len() && is_table_separator(lines[i + 1].trim()) {
            let (rows, consumed) = parse_table(&lines[i..], i + 1)?;
            doc.spec_rows.extend(rows);
            i += consumed;
            continue;
        }

        if let Some(body_text) = parse_bullet(trimmed) {
            match section {
                Section::Feature => doc.features.push(RawBullet {
                    body: body_text,
                    category: current_heading.clone(),
                }),
                Section::Usp => doc.usps.push(RawBullet {
                    body: body_text,
                    category: current_heading.clone(),
                }),
                Section::Faq => parse_faq_line(&body_text, &mut pending_question, &mut doc.faqs),
                Section::None => {}
            }
            i += 1;
            continue;
        }

        // FAQ question/answer lines are not always bulleted in real brochure
        // copy; recognize them directly by their `Q:`/`A:` tag.
        if section == Section::Faq {
            parse_faq_line(trimmed, &mut pending_question, &mut doc.faqs);
        }

        i += 1;
    }

    Ok(doc)
}

fn parse_faq_line(text: &str, pending_question: &mut Option<String>, faqs: &mut Vec<RawFaq>) {
    if let Some(answer) = strip_prefix_ci(text, "a:") {
        if let Some(question) = pending_question.take() {
            faqs.push(RawFaq { question, answer });
        }
    } else if let Some(question) = strip_prefix_ci(text, "q:") {
        *pending_question = Some(question);
    }
}

/// Strips markdown bold markers anywhere in `text`, then matches `prefix`
/// (case-insensitively) against what remains, returning the trimmed rest.
///
/// Brochure FAQ copy bolds the whole line (`**Q: ...?**`) as often as it
/// bolds just the tag (`**Q:** ...`), so bold markers are stripped
/// throughout rather than only at the start.
fn strip_prefix_ci(text: &str, prefix: &str) -> Option<String> {
    let cleaned = text.replace("**", "");
    let trimmed = cleaned.trim();
    if trimmed.len() >= prefix.len() && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(trimmed[prefix.len()..].trim().to_string())
    } else {
        None
    }
}

fn split_frontmatter(markdown: &str) -> (Frontmatter, &str) {
    let Some(rest) = markdown.strip_prefix("---") else {
        return (Frontmatter::default(), markdown);
    };
    let rest = rest.trim_start_matches(['\r', '\n']);
    let Some(end) = rest.find("\n---") else {
        return (Frontmatter::default(), markdown);
    };
    let block = &rest[..end];
    let body = rest[end + 4..].trim_start_matches(['\r', '\n']);

    let mut fm = Frontmatter::default();
    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim().trim_matches('"').to_string();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "title" => fm.title = Some(value),
            "product" => fm.product = Some(value),
            "model_year" => fm.model_year = Some(value),
            "locale" => fm.locale = Some(value),
            "market" => fm.market = Some(value),
            "trim" => fm.trim = Some(value),
            _ => {}
        }
    }
    (fm, body)
}

fn parse_heading(line: &str) -> Option<String> {
    let stripped = line.trim_start_matches('#');
    let depth = line.len() - stripped.len();
    if depth == 0 || depth > 6 {
        return None;
    }
    Some(stripped.trim().to_string())
}

fn classify_heading(heading: &str) -> Section {
    let lower = heading.to_lowercase();
    if lower.contains("faq") || lower.contains("frequently asked") {
        Section::Faq
    } else if lower.contains("usp") || lower.contains("unique selling") || lower.contains("why buy") {
        Section::Usp
    } else if lower.contains("feature") {
        Section::Feature
    } else {
        Section::None
    }
}

fn parse_bullet(line: &str) -> Option<String> {
    for prefix in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Some(rest.trim().to_string());
        }
    }
    None
}

fn is_table_separator(line: &str) -> bool {
    line.starts_with('|') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn split_table_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

fn header_matches_spec_table(header: &[String]) -> bool {
    if header.len() != SPEC_TABLE_COLUMNS {
        return false;
    }
    let expect = ["category", "sub-category", "specification", "value", "additional metadata"];
    header
        .iter()
        .zip(expect.iter())
        .all(|(cell, want)| cell.to_lowercase().contains(want) || want.contains(&cell.to_lowercase()))
}

/// Parses a contiguous table starting at `remaining[0]` (the header row),
/// returning its data rows and the number of lines consumed from the
/// original document (for the caller's line cursor).
fn parse_table(remaining: &[&str], header_source_line: usize) -> Result<(Vec<RawSpecRow>, usize)> {
    let header = split_table_row(remaining[0]);
    let mut consumed = 2; // header + separator
    if !header_matches_spec_table(&header) {
        // Not the 5-column spec table we care about; skip past it without
        // emitting rows, so later bullet/heading scanning isn't confused by
        // the `|`-prefixed lines.
        while consumed < remaining.len() && remaining[consumed].trim_start().starts_with('|') {
            consumed += 1;
        }
        return Ok((Vec::new(), consumed));
    }

    let mut rows = Vec::new();
    while consumed < remaining.len() && remaining[consumed].trim_start().starts_with('|') {
        let cells = split_table_row(remaining[consumed]);
        let line_no = header_source_line + (consumed - 1);
        if cells.len() != SPEC_TABLE_COLUMNS {
            return Err(IngestionError::MalformedRow {
                line: line_no,
                reason: format!("expected {SPEC_TABLE_COLUMNS} columns, found {}", cells.len()),
            }
            .into());
        }
        if cells[0].is_empty() {
            return Err(IngestionError::MalformedRow {
                line: line_no,
                reason: "missing category".to_string(),
            }
            .into());
        }
        rows.push(RawSpecRow {
            parent_category: cells[0].clone(),
            sub_category: cells[1].clone(),
            specification: cells[2].clone(),
            value: cells[3].clone(),
            additional_metadata: (!cells[4].is_empty()).then(|| cells[4].clone()),
            source_line: line_no,
        });
        consumed += 1;
    }

    Ok((rows, consumed))
}
