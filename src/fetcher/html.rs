//! Minimal HTML text extraction for the stats page.
//!
//! Only what the page scraper needs: locate an element by tag and/or class,
//! pull its visible text, and find a value printed after a label. Offsets
//! are computed on an ASCII-lowercased copy, which keeps byte positions
//! identical to the input.

/// Visible text of the first element carrying `class` (optionally restricted
/// to `tag`), with nested markup stripped and whitespace collapsed.
pub fn text_by_class(html: &str, tag: Option<&str>, class: &str) -> Option<String> {
    let lc = html.to_ascii_lowercase();
    let mut from = 0;

    while let Some(rel) = lc[from..].find('<') {
        let start = from + rel;
        let open_end = start + lc[start..].find('>')? + 1;
        from = open_end;

        let open = &lc[start + 1..open_end - 1];
        let name = tag_name(open);
        if name.is_empty() {
            continue;
        }
        if tag.is_some_and(|t| !t.eq_ignore_ascii_case(name)) {
            continue;
        }
        if !has_class(open, &class.to_ascii_lowercase()) {
            continue;
        }
        if open.ends_with('/') {
            return None;
        }

        let close = matching_close(&lc, name, open_end)?;
        let text = strip_tags(&html[open_end..close]);
        return if text.is_empty() { None } else { Some(text) };
    }
    None
}

/// First number printed after `label` in the page's visible text, e.g.
/// `text_after_label(html, "wins")` on `<span>Wins</span> <b>1,204</b>`
/// yields `"1,204"`.
pub fn text_after_label(html: &str, label: &str) -> Option<String> {
    let text = strip_tags(&remove_blocks(html, &["script", "style"]));
    let lc = text.to_ascii_lowercase();
    let label = label.to_ascii_lowercase();

    let mut from = 0;
    while let Some(rel) = lc[from..].find(&label) {
        let after = from + rel + label.len();
        from = after;
        let rest = text[after..].trim_start_matches(|c: char| c == ':' || c.is_whitespace());
        if let Some(n) = leading_number(rest) {
            return Some(n);
        }
    }
    None
}

/// Leading run of digits and thousands separators, if any.
pub fn leading_number(s: &str) -> Option<String> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, ',' | '.' | '\'')))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let run = s[..end].trim_end_matches([',', '.', '\'']);
    if run.starts_with(|c: char| c.is_ascii_digit()) {
        Some(run.to_string())
    } else {
        None
    }
}

/// Drop markup, decode the handful of entities the page uses and collapse
/// whitespace.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn tag_name(open: &str) -> &str {
    let end = open
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(open.len());
    &open[..end]
}

/// `open` is the lowercased tag body between `<` and `>`.
fn has_class(open: &str, class: &str) -> bool {
    // Only a standalone `class` attribute; `data-class=` and friends don't count.
    let Some(pos) = open
        .match_indices("class=")
        .map(|(i, _)| i)
        .find(|&i| open[..i].ends_with(|c: char| c.is_whitespace()))
    else {
        return false;
    };
    let rest = &open[pos + "class=".len()..];
    let value = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => rest[1..].split(q).next().unwrap_or(""),
        _ => rest.split(|c: char| c.is_whitespace() || c == '/').next().unwrap_or(""),
    };
    value.split_whitespace().any(|c| c == class)
}

/// Byte offset of the `</name>` matching an element whose content starts at
/// `from`, honouring nested elements of the same name.
fn matching_close(lc: &str, name: &str, from: usize) -> Option<usize> {
    let open_pat = format!("<{}", name);
    let close_pat = format!("</{}", name);
    let mut depth = 1usize;
    let mut pos = from;

    loop {
        let next_close = lc[pos..].find(&close_pat)? + pos;
        let next_open = lc[pos..]
            .match_indices(&open_pat)
            .map(|(i, _)| i + pos)
            .find(|&i| is_name_boundary(lc, i + open_pat.len()));

        match next_open {
            Some(o) if o < next_close => {
                depth += 1;
                pos = o + open_pat.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                pos = next_close + close_pat.len();
            }
        }
    }
}

fn is_name_boundary(lc: &str, i: usize) -> bool {
    lc[i..]
        .chars()
        .next()
        .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
}

fn remove_blocks(html: &str, tags: &[&str]) -> String {
    let mut out = html.to_string();
    for tag in tags {
        loop {
            let lc = out.to_ascii_lowercase();
            let Some(start) = lc.find(&format!("<{}", tag)) else {
                break;
            };
            let close = format!("</{}>", tag);
            let end = match lc[start..].find(&close) {
                Some(rel) => start + rel + close.len(),
                None => out.len(),
            };
            out.replace_range(start..end, " ");
        }
    }
    out
}
