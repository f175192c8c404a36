use std::collections::HashMap;

use super::{Rejection, REQUIRED_FIELDS};

pub const SEPARATOR: char = ':';

/// Label → trimmed value, one entry per message line.
pub type FieldMap = HashMap<String, String>;

/// Split a registration message into labeled fields.
///
/// Blank lines are ignored. The line count is checked before any line is
/// parsed, so a message with both problems reports the count. A repeated
/// label keeps its last value.
pub fn parse_fields(text: &str) -> Result<FieldMap, Rejection> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();

    if lines.len() != REQUIRED_FIELDS.len() {
        return Err(Rejection::LineCount { found: lines.len() });
    }

    let mut fields = FieldMap::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        let (key, value) = line
            .split_once(SEPARATOR)
            .ok_or_else(|| Rejection::MalformedLine {
                line_number: index + 1,
                line: line.trim().to_string(),
            })?;
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(fields)
}
