//! Shared, purely lexical HTML helpers used by the analyzer (metrics) and
//! the composer (escaping, pullquote plaintext scan). None of this is a
//! real HTML parser — a single linear tag-stripping scan is reused
//! everywhere plaintext is needed rather than re-implemented per call site.

/// Replaces every `<…>` run with a single space, then collapses runs of
/// whitespace. Tolerant of malformed markup: an unterminated `<` simply
/// consumes to the end of the string.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if in_tag => {}
            _ => out.push(ch),
        }
    }
    collapse_whitespace(&out)
}

/// Collapses any run of whitespace into a single space and trims the ends.
pub fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = true; // trims leading whitespace
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Non-empty whitespace-split token count.
pub fn word_count(plain: &str) -> u32 {
    plain.split_whitespace().filter(|t| !t.is_empty()).count() as u32
}

/// Escapes `&<>"'` for safe interpolation into the composed document.
/// `body_html` is the one exception — it is a trust boundary intake
/// owns, not this core.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Lowercase, whitespace-collapsed-to-`-` slug used for artifact filenames
/// and pack slugs.
pub fn slugify(input: &str) -> String {
    let collapsed = collapse_whitespace(input).to_lowercase();
    collapsed.split(' ').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-")
}
