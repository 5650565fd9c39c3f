use std::borrow::Cow;

/// Removes a parenthetical disambiguation suffix from a page title.
///
/// Everything from the first `" ("` through the last `)` that follows it is
/// dropped. Titles without such a span are returned unchanged (borrowed).
///
/// # Examples
///
/// ```
/// use wiki_spots::util::clean_spot_name;
///
/// assert_eq!(clean_spot_name("Tokyo Tower (Minato)"), "Tokyo Tower");
/// assert_eq!(clean_spot_name("Kinkaku-ji"), "Kinkaku-ji");
/// ```
pub fn clean_spot_name(title: &str) -> Cow<'_, str> {
    let Some(start) = title.find(" (") else {
        return Cow::Borrowed(title);
    };

    match title.rfind(')') {
        Some(end) if end > start => {
            let mut out = String::with_capacity(title.len());
            out.push_str(&title[..start]);
            out.push_str(&title[end + 1..]);
            Cow::Owned(out)
        }
        _ => Cow::Borrowed(title),
    }
}

/// Removes every `Category:` occurrence from a category title.
pub fn strip_category_prefix(title: &str) -> String {
    title.replace("Category:", "")
}

/// Drops the namespace prefix (`File:`, `ファイル:`, ...) from a title returned by the API.
///
/// Titles without a colon are returned as-is.
pub fn strip_namespace(title: &str) -> &str {
    match title.split_once(':') {
        Some((_, rest)) => rest,
        None => title,
    }
}

/// Normalizes a file name the way MediaWiki displays it: underscores become spaces.
pub fn display_file_name(name: &str) -> Cow<'_, str> {
    if name.contains('_') {
        Cow::Owned(name.replace('_', " "))
    } else {
        Cow::Borrowed(name)
    }
}

/// Makes an image title safe to use as a single path component.
///
/// Path separators are replaced with `_`. A title of `.` or `..` is prefixed
/// so it can never address a parent directory.
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

/// Strips HTML markup from an `extmetadata` value and collapses whitespace.
///
/// Commons attribution fields (`Artist`, `Credit`) are HTML fragments, usually
/// a user link. Only the text content is kept, and the handful of entities
/// those fields actually use are decoded.
///
/// Returns `Cow::Borrowed` when the value has no markup, entities or runs of
/// whitespace.
pub fn strip_html_tags(s: &str) -> Cow<'_, str> {
    let trimmed = s.trim();
    let needs_work = trimmed.contains(['<', '&', '\n', '\t']) || trimmed.contains("  ");
    if !needs_work {
        return Cow::Borrowed(trimmed);
    }

    let mut text = String::with_capacity(trimmed.len());
    let mut in_tag = false;
    for c in trimmed.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                // Tags like <br> separate words
                text.push(' ');
            }
            _ if in_tag => {}
            _ => text.push(c),
        }
    }

    let decoded = decode_entities(&text);

    let mut out = String::with_capacity(decoded.len());
    for word in decoded.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    Cow::Owned(out)
}

fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    const ENTITIES: &[(&str, &str)] = &[
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&#039;", "'"),
        ("&nbsp;", " "),
        // Must be last so "&amp;lt;" decodes to "&lt;" rather than "<"
        ("&amp;", "&"),
    ];

    let mut out = s.to_string();
    for (entity, replacement) in ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    Cow::Owned(out)
}
