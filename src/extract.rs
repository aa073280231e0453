// Page extraction module - tag-level scanning of management-console pages
//
// SANOS pages are machine-generated markup: flat records such as
// <udv><id>3</id><name>vol-1</name>...</udv> inside a <response> envelope,
// plus ordinary HTML on the login page. The firmware's output is not always
// well formed (stray <img/> tags inside volume records, void tags without a
// closing element), so this module scans for tag blocks instead of building
// a DOM. Tag names match ASCII case-insensitively; values are returned as
// trimmed strings with no numeric coercion.

/// Inner bodies of every `<tag>...</tag>` block, in page order.
///
/// Self-closing occurrences are skipped and a truncated final block is
/// dropped rather than guessed at. Nested blocks of the same tag do not
/// occur in appliance pages and are not handled.
pub fn records<'a>(body: &'a str, tag: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut at = 0;
    while let Some(start) = find_start(body, tag, at) {
        if start.self_closing {
            at = start.inner_start;
            continue;
        }
        match find_close(body, tag, start.inner_start) {
            Some((inner_end, after)) => {
                out.push(&body[start.inner_start..inner_end]);
                at = after;
            }
            None => break,
        }
    }
    out
}

/// Trimmed inner text of the first `<tag>...</tag>` block, if present.
pub fn text<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let start = find_start(body, tag, 0)?;
    if start.self_closing {
        return Some("");
    }
    let (inner_end, _) = find_close(body, tag, start.inner_start)?;
    Some(body[start.inner_start..inner_end].trim())
}

/// Direct child elements of a record as ordered `(name, text)` pairs.
///
/// Element names are lowercased. Self-closing tags, unclosed void tags
/// (the firmware drops bare `<img/>` markers into volume records) and
/// free-floating text between elements are all skipped.
pub fn fields(record: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let bytes = record.as_bytes();
    let mut at = 0;
    while let Some(rel) = record[at..].find('<') {
        let open = at + rel;
        if bytes.get(open + 1) == Some(&b'/') {
            at = open + 2;
            continue;
        }
        let Some(gt_rel) = record[open..].find('>') else {
            break;
        };
        let gt = open + gt_rel;
        let name_end = record[open + 1..gt]
            .find(|c: char| c.is_ascii_whitespace() || c == '/')
            .map(|i| open + 1 + i)
            .unwrap_or(gt);
        let name = &record[open + 1..name_end];
        if !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            at = gt + 1;
            continue;
        }
        if bytes[gt - 1] == b'/' {
            at = gt + 1;
            continue;
        }
        match find_close(record, name, gt + 1) {
            Some((inner_end, after)) => {
                out.push((
                    name.to_ascii_lowercase(),
                    record[gt + 1..inner_end].trim().to_string(),
                ));
                at = after;
            }
            None => at = gt + 1,
        }
    }
    out
}

/// True when some `<tag ...>` start tag carries `attr="value"`.
///
/// Used for the logout-marker probe on the login page; the value compare is
/// case-sensitive, matching what the console actually renders.
pub fn has_marker(body: &str, tag: &str, attr: &str, value: &str) -> bool {
    let mut at = 0;
    while let Some(start) = find_start(body, tag, at) {
        let attrs = &body[start.attrs_start..start.attrs_end];
        if attr_value(attrs, attr) == Some(value) {
            return true;
        }
        at = start.inner_start;
    }
    false
}

struct StartTag {
    attrs_start: usize,
    attrs_end: usize,
    inner_start: usize,
    self_closing: bool,
}

/// Locates the next `<tag ...>` start tag at or after `from`, rejecting
/// longer names that merely share the prefix (`<vd_num>` is not `<vd>`).
fn find_start(body: &str, tag: &str, from: usize) -> Option<StartTag> {
    let pat = format!("<{tag}");
    let bytes = body.as_bytes();
    let mut at = from;
    loop {
        let open = find_ci(body, &pat, at)?;
        let after = open + pat.len();
        match bytes.get(after) {
            Some(&b'>') | Some(&b'/') => {}
            Some(c) if c.is_ascii_whitespace() => {}
            _ => {
                at = open + 1;
                continue;
            }
        }
        let gt = after + body[after..].find('>')?;
        let self_closing = bytes[gt - 1] == b'/';
        return Some(StartTag {
            attrs_start: after,
            attrs_end: if self_closing { gt - 1 } else { gt },
            inner_start: gt + 1,
            self_closing,
        });
    }
}

/// Locates `</tag>` (optionally with trailing whitespace inside the tag) at
/// or after `from`. Returns the index where the inner text ends and the
/// index just past the closing `>`.
fn find_close(body: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let pat = format!("</{tag}");
    let mut at = from;
    loop {
        let open = find_ci(body, &pat, at)?;
        let after_name = open + pat.len();
        let rest = &body[after_name..];
        let gt_rel = rest.find('>')?;
        if rest[..gt_rel].chars().all(|c| c.is_ascii_whitespace()) {
            return Some((open, after_name + gt_rel + 1));
        }
        at = open + 1;
    }
}

/// Value of `name="..."` (either quote style, or unquoted) inside a start
/// tag's attribute region.
fn attr_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let mut at = 0;
    loop {
        let hit = find_ci(attrs, name, at)?;
        let boundary = hit == 0 || attrs.as_bytes()[hit - 1].is_ascii_whitespace();
        let rest = attrs[hit + name.len()..].trim_start();
        if boundary && rest.starts_with('=') {
            let rest = rest[1..].trim_start();
            return match rest.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let end = rest[1..].find(q)?;
                    Some(&rest[1..1 + end])
                }
                Some(_) => {
                    let end = rest
                        .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                        .unwrap_or(rest.len());
                    Some(&rest[..end])
                }
                None => None,
            };
        }
        at = hit + 1;
    }
}

/// ASCII case-insensitive substring search.
fn find_ci(body: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = body.as_bytes();
    let ned = needle.as_bytes();
    if ned.is_empty() || hay.len() < ned.len() || from > hay.len() - ned.len() {
        return None;
    }
    (from..=hay.len() - ned.len()).find(|&i| hay[i..i + ned.len()].eq_ignore_ascii_case(ned))
}
