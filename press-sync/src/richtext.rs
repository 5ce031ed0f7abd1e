//! Inline-image handling for serialized rich-text fragments.
//!
//! A fragment may embed staged images under two conventions:
//! `src="blob:<local-id>"` on the image tag, or a `data-local-id="<local-id>"`
//! attribute alongside a placeholder `src`. Extraction returns the *distinct*
//! set of ids (a fragment may reference the same id multiple times; uploads
//! happen once per id, replacements cover every occurrence).

use once_cell::sync::Lazy;
use press_staging::LocalRef;
use regex::Regex;

static LOCAL_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:src="blob:|data-local-id=")(local_[A-Za-z0-9_]+)""#)
        .expect("static pattern")
});

static SRC_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src="[^"]*""#).expect("static pattern"));

/// Distinct staged ids embedded in a fragment, in order of first appearance
pub fn extract_local_ids(html: &str) -> Vec<LocalRef> {
    let mut seen = Vec::new();
    for capture in LOCAL_ID_RE.captures_iter(html) {
        let id = LocalRef(capture[1].to_string());
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Replace every textual occurrence of `id` in a fragment with `url`.
///
/// Covers both conventions: `src="blob:<id>"` becomes `src="<url>"`, and any
/// image tag carrying `data-local-id="<id>"` gets its `src` rewritten and the
/// marker attribute stripped.
pub fn substitute(html: &str, id: &LocalRef, url: &str) -> String {
    let mut out = html.replace(
        &format!(r#"src="blob:{}""#, id.as_str()),
        &format!(r#"src="{}""#, url),
    );

    let tag_re = Regex::new(&format!(
        r#"<img[^>]*data-local-id="{}"[^>]*>"#,
        regex::escape(id.as_str())
    ))
    .expect("escaped id pattern");

    let marker = format!(r#"data-local-id="{}""#, id.as_str());
    out = tag_re
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            let tag = &caps[0];
            let new_src = format!(r#"src="{}""#, url);
            let resrced = SRC_ATTR_RE.replace(tag, regex::NoExpand(&new_src));
            resrced
                .replace(&format!(" {}", marker), "")
                .replace(&marker, "")
        })
        .into_owned();

    out
}
