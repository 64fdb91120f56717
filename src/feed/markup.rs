//! Tolerant tag extraction over untrusted feed markup.
//!
//! Nothing here validates the document. Elements are located with
//! case-insensitive regex scans that step over CDATA sections and comments,
//! so markup quoted inside them never opens or closes an element. Missing or
//! broken markup degrades to `None` or empty strings; no function in this
//! module can fail.

use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

/// Opening tags, with CDATA sections and comments matched first so they can
/// be skipped. Group 1 is the tag name, group 2 the attribute text.
const OPEN_TOKEN: &str =
    r"(?is)<!\[CDATA\[.*?(?:\]\]>|\z)|<!--.*?(?:-->|\z)|<([a-z][\w:.-]*)([^>]*)>";
/// Closing tags, skipping CDATA sections and comments the same way.
const CLOSE_TOKEN: &str =
    r"(?is)<!\[CDATA\[.*?(?:\]\]>|\z)|<!--.*?(?:-->|\z)|</([a-z][\w:.-]*)\s*>";
const ATTRIBUTE: &str = r#"(?is)(?:^|\s)([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#;
/// An unterminated section keeps everything after the opening marker.
const CDATA: &str = r"(?is)<!\[CDATA\[(.*?)(?:\]\]>|\z)";
const ENTITY: &str = r"&#?[A-Za-z0-9]{1,10};";
const SCRIPT_OR_STYLE: &str =
    r"(?is)<script\b.*?(?:</script\s*>|\z)|<style\b.*?(?:</style\s*>|\z)";
/// Tags that separate words when stripped from a description.
const BREAKING_TAG: &str = r"(?i)</?(?:br|p|div|li|tr|td|h[1-6]|blockquote)\b[^>]*>";
/// `<` only starts a tag when followed by a letter, `/`, `!` or `?`, so prose
/// like `a < b` survives. An unterminated tag swallows the remainder.
const ANY_TAG: &str = r"<[A-Za-z/!?][^>]*(?:>|\z)";

static OPEN_TOKEN_RE: OnceLock<Option<Regex>> = OnceLock::new();
static CLOSE_TOKEN_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ATTRIBUTE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static CDATA_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ENTITY_RE: OnceLock<Option<Regex>> = OnceLock::new();
static SCRIPT_OR_STYLE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static BREAKING_TAG_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ANY_TAG_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Compiles `source` once. The patterns are constants, so `None` only means a
/// broken pattern, which the tests rule out; callers then treat it as no match.
fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(source) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern = source, error = %e, "Invalid markup pattern");
            None
        }
    })
    .as_ref()
}

// ============================================================================
// Tag location
// ============================================================================

/// Position of an opening tag within a document.
struct OpenTag<'a> {
    /// Index just past `>`
    end: usize,
    attributes: &'a str,
    self_closing: bool,
}

/// Finds the next `<name ...>` at or after `from`. The whole tag name must
/// match, so `<title` does not match `<titles>`.
fn find_open_tag<'a>(doc: &'a str, name: &str, from: usize) -> Option<OpenTag<'a>> {
    let re = pattern(&OPEN_TOKEN_RE, OPEN_TOKEN)?;
    let rest = doc.get(from..)?;

    re.captures_iter(rest).find_map(|caps| {
        let tag = caps.get(1)?;
        if !tag.as_str().eq_ignore_ascii_case(name) {
            return None;
        }
        let attributes = caps.get(2).map_or("", |m| m.as_str());
        Some(OpenTag {
            end: from + caps.get(0)?.end(),
            attributes: attributes.trim_end_matches('/'),
            self_closing: attributes.ends_with('/'),
        })
    })
}

/// Finds the `</name>` closing an element whose content starts at `from`,
/// returning its start and end offsets.
///
/// An unterminated CDATA section swallows the rest of the document and the
/// element is treated as unclosed.
fn find_close_tag(doc: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let re = pattern(&CLOSE_TOKEN_RE, CLOSE_TOKEN)?;
    let rest = doc.get(from..)?;

    re.captures_iter(rest).find_map(|caps| {
        let tag = caps.get(1)?;
        if !tag.as_str().eq_ignore_ascii_case(name) {
            return None;
        }
        let whole = caps.get(0)?;
        Some((from + whole.start(), from + whole.end()))
    })
}

// ============================================================================
// Blocks
// ============================================================================

/// Lazy iterator over the inner markup of every `<name>...</name>` element in
/// a document, in document order. Cloning restarts from the clone point.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    raw: &'a str,
    name: String,
    pos: usize,
}

impl<'a> Blocks<'a> {
    pub fn new(raw: &'a str, name: &str) -> Self {
        Self {
            raw,
            name: name.to_string(),
            pos: 0,
        }
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let open = find_open_tag(self.raw, &self.name, self.pos)?;
            if open.self_closing {
                self.pos = open.end;
                continue;
            }

            // An unclosed final block runs to the end of the document.
            return Some(match find_close_tag(self.raw, &self.name, open.end) {
                Some((start, end)) => {
                    self.pos = end;
                    Block::new(&self.raw[open.end..start])
                }
                None => {
                    self.pos = self.raw.len();
                    Block::new(&self.raw[open.end..])
                }
            });
        }
    }
}

/// The inner markup of one item-delimiting element.
#[derive(Debug, Clone)]
pub struct Block<'a> {
    raw: &'a str,
}

impl<'a> Block<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// Raw inner markup of the first `<name>` element. A self-closing match
    /// yields `Some("")`.
    fn first(&self, name: &str) -> Option<&'a str> {
        let open = find_open_tag(self.raw, name, 0)?;
        if open.self_closing {
            return Some("");
        }
        let (close, _) = find_close_tag(self.raw, name, open.end)?;
        Some(&self.raw[open.end..close])
    }

    /// Cleaned plain-text value of the first non-blank field among `names`.
    pub fn text(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.first(name))
            .map(clean_text)
            .find(|s| !s.is_empty())
    }

    /// Like [`Block::text`] but also strips embedded markup (HTML bodies).
    pub fn plain(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.first(name))
            .map(clean_markup)
            .find(|s| !s.is_empty())
    }

    /// Value of `attr` on the first `<tag>` element.
    pub fn attribute(&self, tag: &str, attr: &str) -> Option<String> {
        let open = find_open_tag(self.raw, tag, 0)?;
        let re = pattern(&ATTRIBUTE_RE, ATTRIBUTE)?;

        re.captures_iter(open.attributes)
            .filter(|caps| caps[1].eq_ignore_ascii_case(attr))
            .find_map(|caps| {
                let value = caps.get(2).or_else(|| caps.get(3))?.as_str().trim();
                let value = unescape_entities(value);
                (!value.is_empty()).then(|| value.into_owned())
            })
    }
}

// ============================================================================
// Text cleanup
// ============================================================================

/// CDATA unwrap, then entity unescape, then whitespace collapse.
pub fn clean_text(s: &str) -> String {
    let unwrapped = unwrap_cdata(s);
    let unescaped = unescape_entities(&unwrapped);
    collapse_whitespace(&unescaped)
}

/// [`clean_text`] with markup tags removed before the whitespace collapse.
pub fn clean_markup(s: &str) -> String {
    let unwrapped = unwrap_cdata(s);
    let unescaped = unescape_entities(&unwrapped);
    collapse_whitespace(&strip_tags(&unescaped))
}

/// Replaces every `<![CDATA[...]]>` with its contents, repeating until no
/// wrapper remains so nested wrappers are fully removed.
pub fn unwrap_cdata(s: &str) -> Cow<'_, str> {
    let Some(re) = pattern(&CDATA_RE, CDATA) else {
        return Cow::Borrowed(s);
    };

    let mut current = Cow::Borrowed(s);
    while re.is_match(&current) {
        current = Cow::Owned(re.replace_all(&current, "$1").into_owned());
    }
    current
}

/// Decodes the predefined XML entities, `&nbsp;` and numeric character
/// references in a single pass. Unknown or malformed entities are left as
/// written.
pub fn unescape_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let Some(re) = pattern(&ENTITY_RE, ENTITY) else {
        return Cow::Borrowed(s);
    };

    re.replace_all(s, |caps: &Captures<'_>| {
        let entity = &caps[0];
        unescape_with(entity, resolve_entity)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| entity.to_string())
    })
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    resolve_predefined_entity(name).or(match name {
        "nbsp" => Some(" "),
        _ => None,
    })
}

/// Removes markup tags, dropping `<script>`/`<style>` bodies entirely.
pub fn strip_tags(s: &str) -> String {
    let (Some(script), Some(breaking), Some(any)) = (
        pattern(&SCRIPT_OR_STYLE_RE, SCRIPT_OR_STYLE),
        pattern(&BREAKING_TAG_RE, BREAKING_TAG),
        pattern(&ANY_TAG_RE, ANY_TAG),
    ) else {
        return s.to_string();
    };

    // Scripts go first so their bodies never reach the generic tag pass.
    let cleaned = script.replace_all(s, "");
    let cleaned = breaking.replace_all(&cleaned, " ");
    any.replace_all(&cleaned, "").into_owned()
}

/// Trims and collapses runs of whitespace to single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
