//! CSV-style rows to JSON documents.
//!
//! Expected documents are written as comma-separated lines: the first line
//! holds the field paths, each following line one document.
//!
//! ```text
//! id,status,lines[0].sku
//! i~7,NEW,A-1
//! ```
//!
//! builds `[{"id":7,"status":"NEW","lines":[{"sku":"A-1"}]}]`. An empty cell
//! omits the field; `""` is an empty string. Cells may be quoted to carry
//! commas.

use indexmap::IndexMap;
use serde_json::Value;

use crate::document::mapson::build_document;
use crate::error::BuildError;

/// Build a JSON array with one document per data line.
pub fn build_rows_document(lines: &[String]) -> Result<Value, BuildError> {
    let mut lines = lines.iter().filter(|line| !line.trim().is_empty());

    let header_line = match lines.next() {
        Some(line) => line,
        None => return Ok(Value::Array(Vec::new())),
    };
    let header: Vec<String> = split_line(header_line)
        .into_iter()
        .map(|cell| cell.unwrap_or_default().trim().to_string())
        .collect();

    let mut documents = Vec::new();
    for line in lines {
        let cells = split_line(line);
        if cells.len() != header.len() {
            return Err(BuildError::Malformed {
                builder: "CSV".to_string(),
                reason: format!("expected {} cells, found {}", header.len(), cells.len()),
                input: line.clone(),
            });
        }

        let row: IndexMap<String, String> = header
            .iter()
            .zip(cells)
            .filter_map(|(path, cell)| cell.map(|value| (path.clone(), value)))
            .collect();
        documents.push(build_document(&row)?);
    }

    Ok(Value::Array(documents))
}

/// Split one line into cells. `None` marks an empty, unquoted cell.
fn split_line(line: &str) -> Vec<Option<String>> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => {
                cells.push(finish_cell(&mut current, &mut quoted));
            }
            _ => current.push(c),
        }
    }
    cells.push(finish_cell(&mut current, &mut quoted));
    cells
}

fn finish_cell(current: &mut String, quoted: &mut bool) -> Option<String> {
    let text = std::mem::take(current);
    let was_quoted = std::mem::replace(quoted, false);
    if !was_quoted && text.trim().is_empty() {
        None
    } else if was_quoted {
        Some(text)
    } else {
        Some(text.trim().to_string())
    }
}
