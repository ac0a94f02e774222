//! Structural validation of `code;name` import files.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::model::Candidate;

const SEPARATOR: char = ';';
const EXPECTED_COLUMNS: usize = 2;
const IMPORT_EXTENSION: &str = "csv";
const MIN_FILE_BYTES: u64 = 6;

/// File-level gate applied before any parsing: the name needs a `csv`
/// extension (any case) and the file must be larger than six bytes.
pub fn is_importable_csv_file(file_name: &str, size: u64) -> bool {
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return false;
    };
    if !extension.eq_ignore_ascii_case(IMPORT_EXTENSION) {
        return false;
    }
    size > MIN_FILE_BYTES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RecordError {
    WrongColumnCount { line: usize, columns: usize },
    DuplicateName { line: usize },
}

impl RecordError {
    pub fn line(&self) -> usize {
        match self {
            Self::WrongColumnCount { line, .. } | Self::DuplicateName { line } => *line,
        }
    }
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongColumnCount { line, columns } => write!(
                f,
                "Invalid record on line {} : Num of Col is not equal of {} (={})",
                line, EXPECTED_COLUMNS, columns
            ),
            Self::DuplicateName { line } => write!(f, "Duplicate name on line {}", line),
        }
    }
}

/// Every defect found in a rejected file, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub errors: Vec<RecordError>,
    /// Lines that passed both checks but are discarded with the file.
    pub accepted_lines: usize,
}

impl ErrorReport {
    /// Plain-text report, one CRLF-terminated line per defect.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for e in &self.errors {
            out.push_str(&e.to_string());
            out.push_str("\r\n");
        }
        out
    }

    /// The rendered report encoded for download as a text attachment.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.render().as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted(Vec<Candidate>),
    Rejected(ErrorReport),
}

/// Splits on `\r\n`, a bare `\r` or `\n`, and the Unicode line breaks
/// NEL, LS and PS. A final break does not open an extra empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\r' => {
                lines.push(&text[start..idx]);
                start = idx + 1;
                if let Some(&(next, '\n')) = chars.peek() {
                    chars.next();
                    start = next + 1;
                }
            }
            '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}' => {
                lines.push(&text[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_duplicate_name(accepted: &[Candidate], name: &str) -> bool {
    accepted.iter().any(|c| c.name == name)
}

/// Parses the raw file and returns either every candidate or, when any line
/// is malformed or repeats an earlier name, the full error report.
pub fn parse_and_validate(raw: &[u8], reference_id: i64) -> Validation {
    let text = String::from_utf8_lossy(raw);
    let mut accepted: Vec<Candidate> = Vec::new();
    let mut errors: Vec<RecordError> = Vec::new();

    for (idx, line) in split_lines(&text).into_iter().enumerate() {
        let line_no = idx + 1;
        let fields = line.split(SEPARATOR).collect::<Vec<_>>();
        if fields.len() != EXPECTED_COLUMNS {
            errors.push(RecordError::WrongColumnCount {
                line: line_no,
                columns: fields.len(),
            });
            continue;
        }
        let (code, name) = (fields[0], fields[1]);
        // Names, not codes, must be unique inside one file.
        if is_duplicate_name(&accepted, name) {
            errors.push(RecordError::DuplicateName { line: line_no });
            continue;
        }
        accepted.push(Candidate::new(reference_id, line_no, code, name));
    }

    if errors.is_empty() {
        Validation::Accepted(accepted)
    } else {
        Validation::Rejected(ErrorReport {
            errors,
            accepted_lines: accepted.len(),
        })
    }
}
