//! Caption normalizer.
//!
//! Reduces a raw post caption to a short, ASCII-only, single-sentence
//! summary suitable for a spreadsheet cell. The pipeline is fixed and the
//! order of its steps matters:
//!
//! 1. line feeds and carriage returns become spaces
//! 2. non-ASCII characters are dropped (emoji, accents, other scripts)
//! 3. the text is cut after its first sentence terminator (`.`, `!`, `?`)
//! 4. runs of characters outside `[A-Za-z0-9 ,.!?]` become one space
//! 5. whitespace is collapsed and trimmed
//!
//! The function is total: every input, including an empty one, yields a
//! (possibly empty) string.

/// Normalize a raw caption. See the module docs for the pipeline.
pub fn clean_caption(raw: &str) -> String {
    let flattened: String = raw
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .filter(char::is_ascii)
        .collect();

    let sentence = first_sentence(flattened.trim());
    let filtered = replace_disallowed(sentence);

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`clean_caption`] for captions that may be absent.
pub fn clean_optional_caption(raw: Option<&str>) -> String {
    raw.map(clean_caption).unwrap_or_default()
}

/// Shortest prefix ending in a terminator, with at least one character
/// before it. Falls back to the whole text.
///
/// Expects ASCII input, so byte offsets are char boundaries.
fn first_sentence(text: &str) -> &str {
    text.char_indices()
        .skip(1)
        .find(|&(_, c)| is_terminator(c))
        .map(|(i, c)| &text[..i + c.len_utf8()])
        .unwrap_or(text)
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | ',' | '.' | '!' | '?')
}

fn replace_disallowed(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if is_allowed(c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push(' ');
            in_run = true;
        }
    }
    out
}
