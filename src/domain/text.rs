//! Text helpers for derived presentation fields.

const WORDS_PER_MINUTE: usize = 200;
const META_DESCRIPTION_LIMIT: usize = 160;

/// Estimate reading time in whole minutes. Never less than one.
pub fn reading_minutes(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words / WORDS_PER_MINUTE).max(1)
}

/// Produce a meta description by collapsing whitespace and truncating at a
/// word boundary.
pub fn meta_description(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() <= META_DESCRIPTION_LIMIT {
        return collapsed;
    }

    let mut limit = META_DESCRIPTION_LIMIT;
    while !collapsed.is_char_boundary(limit) {
        limit -= 1;
    }
    let truncated = &collapsed[..limit];
    let cut = truncated.rfind(' ').unwrap_or(truncated.len());
    format!("{}...", &truncated[..cut])
}
