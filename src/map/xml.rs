//! Minimal element scanner for the map document format.
//!
//! The map format is a small, regular subset of XML: nested elements, a few
//! attributes, escaped text content and no mixed content. This module splits
//! a document into its top-level elements and handles text escaping; it is
//! shared by the map reader and entity factories.

use super::error::MapError;
use std::borrow::Cow;

/// One element found by [`elements`], borrowing from the source text.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub tag: &'a str,
    pub attrs: &'a str,
    pub body: &'a str,
}

impl<'a> Element<'a> {
    /// Unescaped text content, surrounding whitespace included.
    pub fn text(&self) -> String {
        unescape(self.body)
    }

    /// Unescaped text content with surrounding whitespace removed. Used for
    /// numbers, flags and keys.
    pub fn value(&self) -> String {
        unescape(self.body.trim())
    }

    /// Top-level child elements of this element's body.
    pub fn children(&self) -> Result<Vec<Element<'a>>, MapError> {
        elements(self.body)
    }

    /// Value of attribute `key`, unescaped.
    pub fn attr(&self, key: &str) -> Option<String> {
        let mut rest = self.attrs;
        while let Some(eq) = rest.find('=') {
            let name = rest[..eq].trim();
            let after = rest[eq + 1..].trim_start();
            let quote = after.chars().next()?;
            if quote != '"' && quote != '\'' {
                return None;
            }
            let value_end = after[1..].find(quote)?;
            let value = &after[1..1 + value_end];
            if name == key {
                return Some(unescape(value));
            }
            rest = &after[value_end + 2..];
        }
        None
    }
}

/// Finds the first element named `tag` in `items`.
pub fn find<'a, 'b>(items: &'b [Element<'a>], tag: &str) -> Option<&'b Element<'a>> {
    items.iter().find(|e| e.tag == tag)
}

/// Like [`find`] but a missing element is an error.
pub fn require<'a, 'b>(items: &'b [Element<'a>], tag: &str) -> Result<&'b Element<'a>, MapError> {
    find(items, tag).ok_or_else(|| MapError::MissingElement(tag.to_string()))
}

/// Parses the text of `tag` in `items` as an integer.
pub fn require_int<T>(items: &[Element<'_>], tag: &str) -> Result<T, MapError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    require(items, tag)?
        .value()
        .parse()
        .map_err(|source| MapError::BadNumber { field: tag.to_string(), source })
}

/// Splits `src` into its top-level elements. Text between elements is ignored.
pub fn elements(src: &str) -> Result<Vec<Element<'_>>, MapError> {
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(lt) = src[pos..].find('<') {
        let open_start = pos + lt;
        let open_end = open_start
            + src[open_start..]
                .find('>')
                .ok_or_else(|| MapError::Malformed("unterminated tag".into()))?;
        let inner = &src[open_start + 1..open_end];

        if inner.starts_with('?') || inner.starts_with('!') {
            pos = open_end + 1;
            continue;
        }
        if inner.starts_with('/') {
            return Err(MapError::Malformed(format!("unexpected <{}>", inner)));
        }

        let self_closing = inner.ends_with('/');
        let inner = inner.trim_end_matches('/');
        let (tag, attrs) = match inner.find(char::is_whitespace) {
            Some(i) => (&inner[..i], inner[i..].trim()),
            None => (inner, ""),
        };
        if tag.is_empty() {
            return Err(MapError::Malformed("empty tag name".into()));
        }

        if self_closing {
            out.push(Element { tag, attrs, body: "" });
            pos = open_end + 1;
            continue;
        }

        let body_start = open_end + 1;
        let (body_end, next) = matching_close(src, body_start, tag)?;
        out.push(Element {
            tag,
            attrs,
            body: &src[body_start..body_end],
        });
        pos = next;
    }

    Ok(out)
}

/// Returns (start of the closing tag, index just past it).
fn matching_close(src: &str, from: usize, tag: &str) -> Result<(usize, usize), MapError> {
    let close = format!("</{}>", tag);
    let mut depth = 1usize;
    let mut cursor = from;

    loop {
        let at = cursor
            + src[cursor..]
                .find('<')
                .ok_or_else(|| MapError::Malformed(format!("unclosed <{}>", tag)))?;
        let rest = &src[at..];

        if rest.starts_with(&close) {
            depth -= 1;
            if depth == 0 {
                return Ok((at, at + close.len()));
            }
            cursor = at + close.len();
        } else if opens(rest, tag) {
            let gt = rest
                .find('>')
                .ok_or_else(|| MapError::Malformed("unterminated tag".into()))?;
            if !rest[..gt].ends_with('/') {
                depth += 1;
            }
            cursor = at + gt + 1;
        } else {
            cursor = at + 1;
        }
    }
}

fn opens(rest: &str, tag: &str) -> bool {
    rest[1..].starts_with(tag)
        && rest[1 + tag.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
}

pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

pub fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sibling_elements() {
        let items = elements("<a>1</a>\n  <b>two</b>").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].tag, "a");
        assert_eq!(items[1].text(), "two");
    }

    #[test]
    fn text_keeps_padding_and_value_trims_it() {
        let items = elements("<name>  Old &amp; New  </name><width>\n  12\n</width>").unwrap();
        assert_eq!(items[0].text(), "  Old & New  ");
        assert_eq!(items[1].value(), "12");
        assert_eq!(require_int::<usize>(&items, "width").unwrap(), 12);
    }

    #[test]
    fn nested_same_tag_is_matched_by_depth() {
        let items = elements("<e><e>inner</e></e><f/>").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].body, "<e>inner</e>");
        assert_eq!(items[1].tag, "f");
        assert_eq!(items[1].body, "");
    }

    #[test]
    fn attributes_are_read() {
        let items = elements(r#"<script condition="load" other='x y'>go</script>"#).unwrap();
        assert_eq!(items[0].attr("condition").as_deref(), Some("load"));
        assert_eq!(items[0].attr("other").as_deref(), Some("x y"));
        assert_eq!(items[0].attr("missing"), None);
    }

    #[test]
    fn unclosed_element_is_malformed() {
        assert!(matches!(elements("<map><name>x</name>"), Err(MapError::Malformed(_))));
    }

    #[test]
    fn escape_and_unescape_are_inverse() {
        let src = r#"if a < b && c > "d" then 'e' end"#;
        let escaped = escape(src);
        assert!(!escaped.contains('<'));
        assert_eq!(unescape(&escaped), src);
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
    }
}
