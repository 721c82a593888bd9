//! Extended M3U reading and writing.
//!
//! ```text
//! #EXTM3U
//! #EXTINF:-1 tvg-id="news.us" group-title="News",News Channel
//! http://example.com/news.m3u8
//! ```

use std::collections::BTreeMap;

use super::Entry;
use crate::error::CheckError;

const HEADER: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF:";

/// Parses playlist text into entries in file order.
pub fn parse(content: &str) -> Result<Vec<Entry>, CheckError> {
    let content = content.trim_start_matches('\u{feff}').trim_start();
    if !content.starts_with(HEADER) {
        return Err(CheckError::InvalidPlaylistFormat(format!(
            "missing {} header",
            HEADER
        )));
    }

    let mut entries = Vec::new();
    let mut pending: Option<&str> = None;

    for line in content.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(EXTINF) {
            pending = Some(line);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let mut entry = Entry::new(line);
        if let Some(extinf) = pending.take() {
            let (title, attributes) = parse_extinf(extinf);
            entry.display_name = title;
            entry.attributes = attributes;
            entry.extinf = Some(extinf.to_string());
        }
        entries.push(entry);
    }

    Ok(entries)
}

/// Renders entries as an extended M3U playlist, reusing original `#EXTINF` lines.
pub fn write_m3u<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for entry in entries {
        match &entry.extinf {
            Some(extinf) => out.push_str(extinf),
            None => {
                out.push_str(EXTINF);
                out.push_str("-1,");
                out.push_str(entry.display_name.as_deref().unwrap_or(""));
            }
        }
        out.push('\n');
        out.push_str(&entry.url);
        out.push('\n');
    }
    out
}

fn parse_extinf(line: &str) -> (Option<String>, BTreeMap<String, String>) {
    let body = &line[EXTINF.len()..];
    let (head, title) = match title_separator(body) {
        Some(i) => (&body[..i], Some(body[i + 1..].trim())),
        None => (body, None),
    };
    let title = title.filter(|t| !t.is_empty()).map(str::to_string);
    (title, parse_attributes(head))
}

/// First comma outside a quoted attribute value.
fn title_separator(body: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in body.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_attributes(head: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    let mut rest = head;

    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].rsplit(char::is_whitespace).next().unwrap_or("").trim();
        let after = &rest[eq + 1..];
        let (value, remainder) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => {
                let end = after.find(char::is_whitespace).unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
        };
        if !key.is_empty() {
            attributes.insert(key.to_string(), value.to_string());
        }
        rest = remainder;
    }

    attributes
}
