//! HTML-to-text conversion for message bodies
//!
//! Markup arriving in real mail is frequently malformed, so this module
//! never parses into a DOM: it removes content-bearing containers
//! (`script`, `style`, `head`) and comments, turns block-level boundaries
//! into line breaks, strips the remaining tags, decodes common entities,
//! and normalizes whitespace. Unknown constructs degrade to plain text
//! instead of failing.

/// Tags whose open or close marks a line break in the text rendering.
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "br",
    "hr",
    "li",
    "tr",
    "table",
    "ul",
    "ol",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "section",
    "article",
    "header",
    "footer",
];

/// Tags removed together with their entire content.
const CONTAINER_TAGS: &[&str] = &["script", "style", "head"];

/// Convert an HTML fragment or document to readable plain text.
///
/// Whitespace rules: runs of horizontal whitespace collapse to one space,
/// runs of three or more newlines collapse to a single blank line, and
/// the result is trimmed.
pub fn html_to_text(html: &str) -> String {
    let mut text = strip_comments(html);
    for tag in CONTAINER_TAGS {
        text = remove_tag_block(&text, tag);
    }
    let stripped = strip_tags(&text);
    let decoded = decode_entities(&stripped);
    collapse_whitespace(&decoded)
}

/// Remove `<!-- ... -->` comments. An unterminated comment swallows the
/// remainder, matching how browsers treat it.
fn strip_comments(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start + 4..].find("-->") {
            Some(end) => rest = &rest[start + 4 + end + 3..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Remove an entire tag block (e.g. `<style>...</style>`), case-insensitive.
/// A missing close tag removes through the end of input.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = find_open_tag(rest, &open) {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        match find_ascii_ci(after, &close) {
            Some(end) => rest = &after[end + close.len()..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Find `open` (`<tag`) at a tag-name boundary, so `<head` does not match
/// `<header>`.
fn find_open_tag(haystack: &str, open: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = find_ascii_ci(&haystack[from..], open) {
        let at = from + pos;
        match haystack.as_bytes().get(at + open.len()) {
            Some(b) if b.is_ascii_alphanumeric() => from = at + 1,
            _ => return Some(at),
        }
    }
    None
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
///
/// `needle` must be pure ASCII so the returned offset is always a char
/// boundary in `haystack`.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    h.windows(n.len()).position(|w| w.eq_ignore_ascii_case(n))
}

/// Drop remaining tags, emitting a newline wherever a block-level tag
/// opens or closes. A `<` not introducing a tag is kept as text; an
/// unterminated tag drops the remainder.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        let tail = &rest[lt..];
        if !looks_like_tag(tail) {
            out.push_str(&rest[..lt + 1]);
            rest = &rest[lt + 1..];
            continue;
        }
        out.push_str(&rest[..lt]);
        match tail.find('>') {
            Some(gt) => {
                if is_block_tag(&tail[1..gt]) {
                    out.push('\n');
                }
                rest = &tail[gt + 1..];
            }
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// A `<` starts a tag only when followed by a letter, `/`, or `!`.
fn looks_like_tag(tail: &str) -> bool {
    matches!(
        tail.as_bytes().get(1),
        Some(b) if b.is_ascii_alphabetic() || *b == b'/' || *b == b'!'
    )
}

/// Whether the tag body (content between `<` and `>`) names a block tag.
fn is_block_tag(body: &str) -> bool {
    let name: String = body
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    BLOCK_TAGS.iter().any(|t| t.eq_ignore_ascii_case(&name))
}

/// Decode named and numeric character references. Unrecognized sequences
/// are left as-is.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match entity_at(tail) {
            Some((ch, len)) => {
                out.push(ch);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode one entity at the start of `s` (which begins with `&`),
/// returning the character and the byte length consumed.
fn entity_at(s: &str) -> Option<(char, usize)> {
    // Entities longer than "&#x10FFFF;" are not worth chasing.
    let semi = s.bytes().take(12).position(|b| b == b';')?;
    let body = &s[1..semi];
    if body.is_empty() || !body.is_ascii() {
        return None;
    }

    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let num = body.strip_prefix('#')?;
            let value = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            // Non-breaking space renders as a plain space.
            if value == 160 {
                ' '
            } else {
                char::from_u32(value).filter(|c| *c != '\0')?
            }
        }
    };
    Some((ch, semi + 1))
}

/// Apply the whitespace rules: drop `\r`, collapse horizontal runs to one
/// space (none at line boundaries), collapse 3+ consecutive newlines to a
/// single blank line, trim the ends.
fn collapse_whitespace(text: &str) -> String {
    let mut flat = String::with_capacity(text.len());
    let mut in_hspace = false;
    for ch in text.chars() {
        match ch {
            '\r' => {}
            ' ' | '\t' => in_hspace = true,
            '\n' => {
                in_hspace = false;
                flat.push('\n');
            }
            other => {
                if in_hspace && !flat.is_empty() && !flat.ends_with('\n') {
                    flat.push(' ');
                }
                in_hspace = false;
                flat.push(other);
            }
        }
    }

    let mut out = String::with_capacity(flat.len());
    let mut newline_run = 0usize;
    for ch in flat.chars() {
        if ch == '\n' {
            newline_run += 1;
            continue;
        }
        if newline_run > 0 {
            out.push('\n');
            if newline_run >= 2 {
                out.push('\n');
            }
            newline_run = 0;
        }
        out.push(ch);
    }
    out.trim().to_string()
}
