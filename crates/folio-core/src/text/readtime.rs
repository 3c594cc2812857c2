//! Reading time estimates for post bodies.

const WORDS_PER_MINUTE: usize = 200;

/// Minutes needed to read `text`, rounded up.
///
/// Empty text takes zero minutes; anything else takes at least one.
pub fn estimate(text: &str) -> i32 {
    if text.is_empty() {
        return 0;
    }
    let minutes = count_words(text).div_ceil(WORDS_PER_MINUTE).max(1);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

/// Like [`estimate`], ignoring markdown syntax and code.
pub fn estimate_markdown(markdown: &str) -> i32 {
    if markdown.is_empty() {
        return 0;
    }
    let text = strip_code_blocks(markdown).replace('`', "");
    let text = strip_links(&strip_images(&text));
    let text = text.replace('#', "").replace('*', "");
    estimate(&text)
}

/// Words are maximal runs of letters and digits.
fn count_words(text: &str) -> usize {
    let mut words = 0;
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if !in_word {
                words += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    words
}

fn strip_code_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_block = false;
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_block = !in_block;
            continue;
        }
        if !in_block {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Split `[label](target)` at `start`, returning the label and the byte
/// length of the whole construct.
fn bracketed_link(text: &str, start: usize) -> Option<(&str, usize)> {
    let rest = &text[start..];
    if !rest.starts_with('[') {
        return None;
    }
    let close = rest.find(']')?;
    let after = &rest[close + 1..];
    if !after.starts_with('(') {
        return None;
    }
    let paren = after.find(')')?;
    Some((&rest[1..close], close + 1 + paren + 1))
}

fn strip_images(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if text[i..].starts_with("![") {
            if let Some((_, len)) = bracketed_link(text, i + 1) {
                i += 1 + len;
                continue;
            }
        }
        let ch = text[i..].chars().next().unwrap_or_default();
        out.push(ch);
        i += ch.len_utf8().max(1);
    }
    out
}

fn strip_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if let Some((label, len)) = bracketed_link(text, i) {
            out.push_str(label);
            i += len;
            continue;
        }
        let ch = text[i..].chars().next().unwrap_or_default();
        out.push(ch);
        i += ch.len_utf8().max(1);
    }
    out
}
