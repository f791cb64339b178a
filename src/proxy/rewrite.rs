//! HTML link rewriting
//!
//! Routes same-origin navigation back through the proxy by rewriting the
//! document as plain text: a fixed sequence of whole-document regex
//! substitutions, not a parse-tree rewrite. The blunt matching (plain-text
//! URL mentions get wrapped too, re-running the passes nests the encoding)
//! is deliberate and covered by tests.

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};
use url::Url;

/// Characters escaped the same way JavaScript's `encodeURIComponent` does.
const COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a string for use as a `url` query parameter value
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT_SET).to_string()
}

static HEAD_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head([^>]*)>").expect("head tag regex"));

// Scheme and host only; any path after the host is left trailing the
// wrapped prefix, matching the original rewrite behavior.
static ABSOLUTE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[a-zA-Z0-9.-]+").expect("absolute url regex"));

static ROOT_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="(/[^"]*)""#).expect("root href regex"));

static ROOT_ACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"action="(/[^"]*)""#).expect("root action regex"));

static SRC_ABSOLUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src="https?://([^"]+)""#).expect("absolute src regex"));

/// Per-request context for one rewrite pass; never outlives the request
pub struct RewriteContext {
    /// Parsed target URL, used to resolve root-relative paths
    pub target: Url,
    /// Scheme + host under which the proxy itself is being accessed
    pub self_base: String,
    /// Scheme + host of the target
    pub target_origin: String,
}

impl RewriteContext {
    pub fn new(target: Url, self_base: String) -> Self {
        let target_origin = target.origin().ascii_serialization();
        Self {
            target,
            self_base,
            target_origin,
        }
    }
}

/// Rewrite an HTML document so links, forms and sources route through the
/// proxy. Pass order is observable output, see the tests.
pub fn rewrite_html(html: &str, ctx: &RewriteContext) -> String {
    // Every absolute URL anywhere in the document, attributes and text
    // nodes alike.
    let rewritten = ABSOLUTE_URL_RE.replace_all(html, |caps: &Captures| {
        format!("{}/proxy?url={}", ctx.self_base, encode_component(&caps[0]))
    });

    // Root-relative links and form targets, resolved against the target.
    let rewritten = ROOT_HREF_RE.replace_all(&rewritten, |caps: &Captures| {
        rewrite_root_relative("href", &caps[0], &caps[1], ctx)
    });
    let rewritten = ROOT_ACTION_RE.replace_all(&rewritten, |caps: &Captures| {
        rewrite_root_relative("action", &caps[0], &caps[1], ctx)
    });

    // src attributes get the https scheme forced. Absolute src values were
    // already wrapped by the first pass, so this re-wraps the proxied value;
    // that double wrap is part of the observable contract.
    let rewritten = SRC_ABSOLUTE_RE.replace_all(&rewritten, |caps: &Captures| {
        format!(r#"src="{}/proxy?url=https://{}""#, ctx.self_base, &caps[1])
    });

    // Injected last so the base tag itself is never proxied.
    inject_base(&rewritten, &ctx.target_origin)
}

/// Rewrite a root-relative attribute value to a proxied absolute URL.
/// Protocol-relative values (`//host/...`) are left untouched.
fn rewrite_root_relative(attr: &str, whole: &str, path: &str, ctx: &RewriteContext) -> String {
    if path.starts_with("//") {
        return whole.to_string();
    }

    match ctx.target.join(path) {
        Ok(absolute) => format!(
            r#"{}="{}/proxy?url={}""#,
            attr,
            ctx.self_base,
            encode_component(absolute.as_str())
        ),
        Err(_) => whole.to_string(),
    }
}

/// Insert a `<base>` tag right after the first `<head ...>` opening tag.
/// Documents without a head are left alone.
fn inject_base(html: &str, target_origin: &str) -> String {
    match HEAD_TAG_RE.find(html) {
        Some(head) => {
            let mut out = String::with_capacity(html.len() + 64);
            out.push_str(&html[..head.end()]);
            out.push_str(&format!(r#"<base href="{}/">"#, target_origin));
            out.push_str(&html[head.end()..]);
            out
        }
        None => html.to_string(),
    }
}
