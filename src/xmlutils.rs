// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Utilities for building and rendering XML data.
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::Write;
use std::str::FromStr;

use http::status::InvalidStatusCode;
use http::StatusCode;
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::names::{self, PropertyName};

/// Characters that are escaped for hrefs.
pub const DISALLOWED_FOR_HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// An XML element with its attributes, text and children.
///
/// This is the unit in which property values are produced and multistatus documents are
/// assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: PropertyName,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    #[must_use]
    pub fn new(name: PropertyName) -> Element {
        Element {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(name: PropertyName, text: impl Into<String>) -> Element {
        Element {
            text: Some(text.into()),
            ..Element::new(name)
        }
    }

    /// An element wrapping a single `<D:href>`.
    #[must_use]
    pub fn with_href(name: PropertyName, href: impl Into<String>) -> Element {
        Element::new(name).with_child(Element::with_text(names::HREF, href))
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Element {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Element {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    fn collect_namespaces<'a>(&'a self, namespaces: &mut BTreeSet<&'a str>) {
        namespaces.insert(self.name.namespace());
        for child in &self.children {
            child.collect_namespaces(namespaces);
        }
    }

    fn render_into(&self, out: &mut String, declarations: &str) {
        let (tag, default_ns) = match names::prefix_for(self.name.namespace()) {
            Some(prefix) => (format!("{prefix}:{}", self.name.name()), None),
            None if self.name.namespace().is_empty() => (self.name.name().to_string(), None),
            None => (self.name.name().to_string(), Some(self.name.namespace())),
        };
        out.push('<');
        out.push_str(&tag);
        out.push_str(declarations);
        if let Some(ns) = default_ns {
            let _ = write!(out, " xmlns=\"{}\"", escape_attribute(ns));
        }
        for (key, value) in &self.attributes {
            let _ = write!(out, " {key}=\"{}\"", escape_attribute(value));
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape_text(text));
        }
        for child in &self.children {
            child.render_into(out, "");
        }
        let _ = write!(out, "</{tag}>");
    }
}

/// Render a full XML document rooted at `root`.
///
/// Every known namespace used in the tree is declared with its prefix on the root element.
/// Elements in unknown namespaces declare them as their default namespace.
#[must_use]
pub fn render_document(root: &Element) -> String {
    let mut namespaces = BTreeSet::new();
    root.collect_namespaces(&mut namespaces);
    let mut declarations = String::new();
    for (prefix, ns) in names::NAMESPACES {
        if namespaces.contains(ns) {
            let _ = write!(declarations, " xmlns:{prefix}=\"{ns}\"");
        }
    }

    let mut out = String::from("<?xml version='1.0' encoding='utf-8'?>\n");
    root.render_into(&mut out, &declarations);
    out
}

/// Build the textual status line for a status code.
///
/// Example output: `HTTP/1.1 404 Not Found`.
#[must_use]
pub fn make_response(status: StatusCode) -> String {
    format!(
        "HTTP/1.1 {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}

/// Parses a status line string into a [`StatusCode`].
///
/// Example input string: `HTTP/1.1 200 OK`.
///
/// # Errors
///
/// If the input string does not match a status line.
pub fn parse_statusline(status_line: impl AsRef<str>) -> Result<StatusCode, InvalidStatusCode> {
    let mut iter = status_line.as_ref().splitn(3, ' ');
    iter.next();
    let code = iter.next().unwrap_or("");
    StatusCode::from_str(code)
}

/// Join `base_prefix` and an absolute `href`, URL-encoding the result.
///
/// Obviously the input parameters MUST NOT be url-encoded.
#[must_use]
pub fn make_href(base_prefix: &str, href: &str) -> String {
    let joined = format!("{}{}", base_prefix.trim_end_matches('/'), href);
    quote_href(joined.as_bytes()).into_owned()
}

// URL-encodes an href.
pub(crate) fn quote_href(href: &[u8]) -> Cow<'_, str> {
    Cow::from(percent_encode(href, DISALLOWED_FOR_HREF))
}

/// Replaces characters that need to be escaped in texts.
///
/// `<` --> `&lt;`
/// `>` --> `&gt;`
/// `&` --> `&amp;`
///
/// This IS NOT usable in other contexts of XML encoding.
#[must_use]
pub fn escape_text(raw: &str) -> Cow<str> {
    escape(raw, |c| matches!(c, '<' | '>' | '&'))
}

/// Like [`escape_text`], but also escapes quotes for use inside attribute values.
#[must_use]
pub fn escape_attribute(raw: &str) -> Cow<str> {
    escape(raw, |c| matches!(c, '<' | '>' | '&' | '"' | '\''))
}

fn escape(raw: &str, needs_escape: impl Fn(char) -> bool) -> Cow<str> {
    if !raw.contains(&needs_escape) {
        return Cow::Borrowed(raw);
    }
    let mut escaped = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '<' if needs_escape(c) => escaped.push_str("&lt;"),
            '>' if needs_escape(c) => escaped.push_str("&gt;"),
            '&' if needs_escape(c) => escaped.push_str("&amp;"),
            '"' if needs_escape(c) => escaped.push_str("&quot;"),
            '\'' if needs_escape(c) => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
