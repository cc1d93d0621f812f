//! Redaction of PEM-style private key blocks.
//!
//! The block is located by literal scanning: the END marker has to repeat the
//! exact TYPE of the BEGIN marker, which is a backreference the `regex` crate
//! cannot express.

use std::ops::Range;

use thiserror::Error;

const BEGIN_PREFIX: &str = "-----BEGIN ";
const END_PREFIX: &str = "-----END ";
const MARKER_SUFFIX: &str = " KEY-----";

/// Lines shorter than this are replaced by [`SHORT_LINE_MASK`].
const SHORT_LINE_THRESHOLD: usize = 20;
const VISIBLE_CHARS: usize = 4;
const SHORT_LINE_MASK: &str = "***";
const MASK_CHAR: char = '*';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    #[error("No BEGIN/END key block found in input")]
    MalformedKeyInput,
}

/// How the last line of a key body is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastLineDetection {
    /// The first line after the first one whose content equals the final
    /// line. Lines after it are left untouched.
    #[default]
    FirstEqual,
    /// Only the final line.
    Position,
}

/// A located key block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBlock<'a> {
    pub key_type: &'a str,
    pub body: &'a str,
    /// Byte range of `body` within the scanned text.
    pub body_span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyMasker {
    last_line: LastLineDetection,
}

impl KeyMasker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_last_line_detection(mut self, last_line: LastLineDetection) -> Self {
        self.last_line = last_line;
        self
    }

    pub fn last_line_detection(&self) -> LastLineDetection {
        self.last_line
    }

    /// Returns `text` with the body of its first key block redacted.
    pub fn mask(&self, text: &str) -> Result<String, MaskError> {
        let block = find_key_block(text).ok_or(MaskError::MalformedKeyInput)?;
        let masked_body = self.mask_body(block.body);

        let mut masked = String::with_capacity(text.len());
        masked.push_str(&text[..block.body_span.start]);
        masked.push_str(&masked_body);
        masked.push_str(&text[block.body_span.end..]);
        Ok(masked)
    }

    fn mask_body(&self, body: &str) -> String {
        let rows: Vec<&str> = body.split('\n').collect();
        let last_index = rows.len() - 1;
        let last_row = rows[last_index];

        let mut masked = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            if idx == 0 {
                masked.push(mask_depending_on_length(row, Visible::Prefix));
                continue;
            }

            let is_last = match self.last_line {
                LastLineDetection::FirstEqual => *row == last_row,
                LastLineDetection::Position => idx == last_index,
            };
            if is_last {
                masked.push(mask_depending_on_length(row, Visible::Suffix));
                masked.extend(rows[idx + 1..].iter().map(|r| r.to_string()));
                break;
            }

            masked.push(mask_all(row));
        }
        masked.join("\n")
    }
}

/// Masks the first key block in `text` with the default [`KeyMasker`].
pub fn mask_private_key(text: &str) -> Result<String, MaskError> {
    KeyMasker::default().mask(text)
}

/// Finds the leftmost key block. For a given BEGIN marker the shortest TYPE
/// with a matching END marker wins, and the body stops at the first such END.
/// Whitespace adjacent to either marker is not part of the body.
pub fn find_key_block(text: &str) -> Option<KeyBlock<'_>> {
    for (begin, _) in text.match_indices(BEGIN_PREFIX) {
        let type_start = begin + BEGIN_PREFIX.len();
        let line_end = text[type_start..]
            .find('\n')
            .map_or(text.len(), |offset| type_start + offset);

        for (offset, _) in text[type_start..].match_indices(MARKER_SUFFIX) {
            let type_end = type_start + offset;
            // TYPE never spans lines
            if type_end > line_end {
                break;
            }

            let key_type = &text[type_start..type_end];
            let header_end = type_end + MARKER_SUFFIX.len();
            let footer = format!("{END_PREFIX}{key_type}{MARKER_SUFFIX}");

            if let Some(found) = text[header_end..].find(&footer) {
                let inner = &text[header_end..header_end + found];
                let body_start = header_end + (inner.len() - inner.trim_start().len());
                let body_end = body_start + inner.trim().len();

                return Some(KeyBlock {
                    key_type,
                    body: &text[body_start..body_end],
                    body_span: body_start..body_end,
                });
            }
        }
    }
    None
}

#[derive(Debug, Clone, Copy)]
enum Visible {
    Prefix,
    Suffix,
}

fn mask_depending_on_length(row: &str, visible: Visible) -> String {
    let len = row.chars().count();
    if len < SHORT_LINE_THRESHOLD {
        return SHORT_LINE_MASK.to_string();
    }

    let hidden: String = std::iter::repeat_n(MASK_CHAR, len - VISIBLE_CHARS).collect();
    match visible {
        Visible::Prefix => {
            let prefix: String = row.chars().take(VISIBLE_CHARS).collect();
            format!("{prefix}{hidden}")
        },
        Visible::Suffix => {
            let suffix: String = row.chars().skip(len - VISIBLE_CHARS).collect();
            format!("{hidden}{suffix}")
        },
    }
}

fn mask_all(row: &str) -> String {
    row.chars().map(|_| MASK_CHAR).collect()
}
