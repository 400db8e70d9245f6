// Low-level HTML string helpers for the dashboard page.
// These are deliberately naive: no DOM, just tag scanning on a lowercased copy.
// Lowercasing is ASCII-only so byte offsets line up with the original string.

/// Inner HTML of the first element whose `class` attribute contains `class`.
///
/// Nested elements with the same tag name are balanced, so a `<div>` inside
/// the matched `<div>` does not end the match early.
pub fn element_by_class<'a>(html: &'a str, class: &str) -> Option<&'a str> {
    let lc = to_lower(html);
    let class = to_lower(class);
    let mut from = 0;

    while let Some(rel) = lc[from..].find('<') {
        let start = from + rel;
        let end = start + lc[start..].find('>')?;
        let tag = &lc[start + 1..end];
        from = end + 1;

        if tag.starts_with('/') || tag.starts_with('!') || !has_class(tag, &class) {
            continue;
        }
        let name = tag.split(|c: char| c.is_whitespace() || c == '/').next()?;
        let inner_end = matching_close(&lc, name, from)?;
        return Some(&html[from..inner_end]);
    }
    None
}

/// Inner HTML of every `<tag>` element in `html`, in document order.
pub fn tag_blocks<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = to_lower(html);
    let tag = to_lower(tag);
    let open = format!("<{tag}");
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_tag(&lc, &open, pos) {
        let Some(open_end) = lc[start..].find('>').map(|i| start + i + 1) else {
            break;
        };
        let Some(close) = matching_close(&lc, &tag, open_end) else {
            break;
        };
        out.push(&html[open_end..close]);
        pos = close;
    }
    out
}

/// Text content: tags become spaces, entities are decoded, whitespace collapsed.
pub fn text_content(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&normalize_entities(&out))
}

/// Decode the handful of entities the page actually uses.
pub fn normalize_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&auml;", "ä")
        .replace("&ouml;", "ö")
        .replace("&uuml;", "ü")
        .replace("&Auml;", "Ä")
        .replace("&Ouml;", "Ö")
        .replace("&Uuml;", "Ü")
        .replace("&szlig;", "ß")
        .replace("&amp;", "&")
}

/// Collapse sequences of whitespace into a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// ASCII-only lowercasing; keeps byte offsets stable.
pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// `class=` only counts as its own attribute, not as the tail of `data-class=`.
fn has_class(tag: &str, class: &str) -> bool {
    let Some(idx) = tag
        .match_indices("class=")
        .map(|(i, _)| i)
        .find(|&i| tag[..i].ends_with(char::is_whitespace))
    else {
        return false;
    };
    let rest = &tag[idx + "class=".len()..];
    let value = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => rest[1..].split(q).next().unwrap_or(""),
        _ => rest.split(|c: char| c.is_whitespace()).next().unwrap_or(""),
    };
    value.split_whitespace().any(|c| c == class)
}

/// Find `prefix` (e.g. `<p` or `</p`) at a tag-name boundary.
fn find_tag(lc: &str, prefix: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let idx = lc.get(pos..)?.find(prefix)? + pos;
        let after = lc[idx + prefix.len()..].chars().next();
        if matches!(after, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
            return Some(idx);
        }
        pos = idx + prefix.len();
    }
}

/// Offset of the `</name` that closes an element whose content starts at `from`.
fn matching_close(lc: &str, name: &str, from: usize) -> Option<usize> {
    let open = format!("<{name}");
    let close = format!("</{name}");
    let mut depth = 1usize;
    let mut pos = from;

    loop {
        let next_close = find_tag(lc, &close, pos)?;
        match find_tag(lc, &open, pos).filter(|&i| i < next_close) {
            Some(i) => {
                depth += 1;
                pos = i + open.len();
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                pos = next_close + close.len();
            }
        }
    }
}
