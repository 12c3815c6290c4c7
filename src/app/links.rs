use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

fn href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(\shref\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).expect("valid href regex")
    })
}

/// Returns the rewritten text and the number of links changed.
///
/// With a count of zero the input is handed back borrowed, so callers can
/// skip writing the file.
pub fn rewrite_links(html: &str) -> (Cow<'_, str>, usize) {
    let mut count = 0;
    let rewritten = href_regex().replace_all(html, |caps: &Captures| {
        let (value, quote) = match (caps.get(2), caps.get(3)) {
            (Some(v), _) => (v.as_str(), '"'),
            (None, Some(v)) => (v.as_str(), '\''),
            (None, None) => return caps[0].to_string(),
        };
        match rewrite_target(value) {
            Some(target) => {
                count += 1;
                format!("{}{quote}{target}{quote}", &caps[1])
            }
            None => caps[0].to_string(),
        }
    });

    if count == 0 {
        (Cow::Borrowed(html), 0)
    } else {
        (rewritten, count)
    }
}

/// New link target for a `.md` path, keeping `?query` and `#fragment` verbatim.
fn rewrite_target(value: &str) -> Option<String> {
    if is_external(value) {
        return None;
    }
    let split = value.find(['?', '#']).unwrap_or(value.len());
    let (path, suffix) = value.split_at(split);
    let stem = strip_md_extension(path)?;
    Some(format!("{}.html{suffix}", stem.replace('\\', "/")))
}

fn strip_md_extension(path: &str) -> Option<&str> {
    let cut = path.len().checked_sub(3)?;
    let ext = path.get(cut..)?;
    if !ext.eq_ignore_ascii_case(".md") {
        return None;
    }
    let stem = &path[..cut];
    // A bare `.md` or `dir/.md` is a dotfile, not a Markdown document.
    if stem.is_empty() || stem.ends_with(['/', '\\']) {
        return None;
    }
    Some(stem)
}

/// `scheme:` (two or more chars, so `C:\…` stays a path) or protocol-relative `//host`.
fn is_external(value: &str) -> bool {
    if value.starts_with("//") {
        return true;
    }
    let Some(colon) = value.find(':') else {
        return false;
    };
    let scheme = &value[..colon];
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
