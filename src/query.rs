//! Substring search over a [`TemplateSet`] and match highlighting.
//!
//! Matching is ordinal and locale-naive: a message matches when its
//! lowercase form contains the lowercase query. Highlighting uses the same
//! comparison, so every surviving message has at least one highlighted run.
//! Results keep the set's category order and each list's message order;
//! filtering only removes.

use serde::Serialize;

use crate::templates::{display_name, TemplateSet};

/// Selections shorter than this (after trimming) do not open the popup.
pub const MIN_SELECTION_LEN: usize = 3;

/// CSS class wrapped around highlighted matches.
pub const HIGHLIGHT_CLASS: &str = "quickcopy-highlight";

/// One category's surviving messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryMatches {
    /// Display name (`tax-on-hold` → `Tax On Hold`).
    pub category: String,
    /// Storage key, for surfaces that act on the category.
    pub key: String,
    pub messages: Vec<String>,
}

/// Char-by-char lowercase. Used for both sides of every comparison.
fn fold(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

fn matches(message: &str, needle_lower: &str) -> bool {
    fold(message).contains(needle_lower)
}

/// Search every category. An empty query returns all categories with their
/// full lists; otherwise categories without a matching message are omitted.
pub fn search(set: &TemplateSet, query: &str) -> Vec<CategoryMatches> {
    if query.is_empty() {
        return set
            .iter()
            .map(|c| CategoryMatches {
                category: display_name(&c.name),
                key: c.name.clone(),
                messages: c.messages.clone(),
            })
            .collect();
    }

    let needle = fold(query);
    set.iter()
        .filter_map(|c| {
            let messages: Vec<String> = c
                .messages
                .iter()
                .filter(|m| matches(m, &needle))
                .cloned()
                .collect();
            (!messages.is_empty()).then(|| CategoryMatches {
                category: display_name(&c.name),
                key: c.name.clone(),
                messages,
            })
        })
        .collect()
}

/// Filter a single category, keeping each message's original index so the
/// caller can edit or delete it. `None` when the category does not exist.
pub fn search_category<'a>(
    set: &'a TemplateSet,
    category: &str,
    query: &str,
) -> Option<Vec<(usize, &'a str)>> {
    let messages = set.get(category)?;
    let needle = fold(query);
    Some(
        messages
            .iter()
            .enumerate()
            .filter(|(_, m)| query.is_empty() || matches(m, &needle))
            .map(|(i, m)| (i, m.as_str()))
            .collect(),
    )
}

/// Normalize a page selection into a search query: trimmed and lowercased.
/// Returns `None` when the selection is shorter than `min_len` characters.
pub fn selection_query(selected: &str, min_len: usize) -> Option<String> {
    let trimmed = selected.trim();
    if trimmed.is_empty() || trimmed.chars().count() < min_len {
        return None;
    }
    Some(trimmed.to_lowercase())
}

/// A run of message text, either inside or outside a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub matched: bool,
}

/// Split `message` into matched and unmatched runs of `query`, compared the
/// same way [`search`] compares. A match that starts or ends inside a
/// character whose lowercase form is longer than one char covers that whole
/// character.
pub fn highlight_segments<'a>(message: &'a str, query: &str) -> Vec<Segment<'a>> {
    let plain = vec![Segment { text: message, matched: false }];
    let needle = fold(query);
    if needle.is_empty() || message.is_empty() {
        return plain;
    }

    // For every byte of the folded text: the span of the source char it
    // came from.
    let mut folded = String::with_capacity(message.len());
    let mut source: Vec<(usize, usize)> = Vec::with_capacity(message.len());
    for (start, ch) in message.char_indices() {
        let end = start + ch.len_utf8();
        for lower in ch.to_lowercase() {
            folded.push(lower);
            source.extend(std::iter::repeat_n((start, end), lower.len_utf8()));
        }
    }

    let mut segments = Vec::new();
    let mut last = 0;
    for (pos, hit) in folded.match_indices(needle.as_str()) {
        let start = source[pos].0.max(last);
        let end = source[pos + hit.len() - 1].1;
        if start >= end {
            continue;
        }
        if start > last {
            segments.push(Segment { text: &message[last..start], matched: false });
        }
        segments.push(Segment { text: &message[start..end], matched: true });
        last = end;
    }
    if segments.is_empty() {
        return plain;
    }
    if last < message.len() {
        segments.push(Segment { text: &message[last..], matched: false });
    }
    segments
}

fn escape_html(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

/// Display markup for `message` with every match of `query` wrapped in a
/// `<span class="quickcopy-highlight">`. All message text is HTML-escaped;
/// the message itself is not modified.
pub fn highlight(message: &str, query: &str) -> String {
    let mut out = String::with_capacity(message.len() + 32);
    for seg in highlight_segments(message, query) {
        if seg.matched {
            out.push_str("<span class=\"");
            out.push_str(HIGHLIGHT_CLASS);
            out.push_str("\">");
            escape_html(seg.text, &mut out);
            out.push_str("</span>");
        } else {
            escape_html(seg.text, &mut out);
        }
    }
    out
}

/// Truncate `text` to `max` characters, appending `...` when cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
