//! CSV vocabulary lists: `word[,definition[,context]]` per line.
//!
//! Quoting is minimal: a `"` toggles quoted mode and is consumed, so commas
//! inside quotes do not split and the surrounding quotes never reach the field.
//! Escaped quotes (`""`) are not supported.

use crate::models::flashcard::UploadedWord;

pub fn parse_csv(content: &str) -> Vec<UploadedWord> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let columns = parse_csv_line(line);
            let word = columns.first()?.trim();
            if word.is_empty() {
                return None;
            }
            Some(UploadedWord {
                word: word.to_string(),
                definition: non_empty(columns.get(1)),
                context: non_empty(columns.get(2)),
            })
        })
        .collect()
}

fn non_empty(column: Option<&String>) -> Option<String> {
    column
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(String::from)
}

pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}
