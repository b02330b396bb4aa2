// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Names of common dav properties, and the namespaces they live in.
//!
//! Properties are stored in collection metadata using their "human" form (e.g.:
//! `D:displayname`) and travel on the wire in their namespace-qualified form. [`PropertyName`]
//! converts between both.

use std::borrow::Cow;
use std::fmt;

/// Namespace for properties defined in the WebDav specifications.
pub const DAV: &str = "DAV:";
/// Namespace for properties defined in the CalDav specifications.
pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";
/// Namespace for properties defined in the CardDav specifications.
pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";
/// Namespace for properties defined by calendarserver.org (`getctag`).
pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";
/// Namespace for properties defined by Apple / ical.
pub const APPLE: &str = "http://apple.com/ns/ical/";
pub const ME: &str = "http://me.com/_namespace/";
/// Namespace for properties only meaningful to this server and its web interface.
pub const SERVER: &str = "http://radicale.org/ns/";

/// Known namespaces and the prefix used for each of them.
///
/// The prefix is used both when rendering XML and when storing properties in collection
/// metadata.
pub const NAMESPACES: &[(&str, &str)] = &[
    ("C", CALDAV),
    ("CR", CARDDAV),
    ("D", DAV),
    ("CS", CALENDARSERVER),
    ("ICAL", APPLE),
    ("ME", ME),
    ("RADICALE", SERVER),
];

/// Returns the prefix registered for a namespace.
#[must_use]
pub fn prefix_for(namespace: &str) -> Option<&'static str> {
    NAMESPACES
        .iter()
        .find(|(_, ns)| *ns == namespace)
        .map(|(prefix, _)| *prefix)
}

/// Returns the namespace registered for a prefix.
#[must_use]
pub fn namespace_for(prefix: &str) -> Option<&'static str> {
    NAMESPACES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| *ns)
}

/// A WebDav property with a `namespace` and `name`.
///
/// Unlike [`roxmltree::ExpandedName`], this type owns its data when needed, so names parsed
/// out of a request can outlive the request document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyName {
    namespace: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl PropertyName {
    /// Create a new name from static strings.
    #[must_use]
    pub const fn from_static(namespace: &'static str, name: &'static str) -> PropertyName {
        PropertyName {
            namespace: Cow::Borrowed(namespace),
            name: Cow::Borrowed(name),
        }
    }

    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> PropertyName {
        PropertyName {
            namespace: Cow::Owned(namespace.into()),
            name: Cow::Owned(name.into()),
        }
    }

    /// The namespace URI. Empty for names without a namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render in clark notation: `{DAV:}getetag`.
    #[must_use]
    pub fn clark(&self) -> String {
        format!("{{{}}}{}", self.namespace, self.name)
    }

    /// Parse a name in clark notation.
    ///
    /// Names without a `{namespace}` part are accepted and have an empty namespace.
    #[must_use]
    pub fn from_clark(clark: &str) -> Option<PropertyName> {
        match clark.strip_prefix('{') {
            Some(rest) => {
                let (namespace, name) = rest.split_once('}')?;
                if name.is_empty() {
                    return None;
                }
                Some(PropertyName::new(namespace, name))
            }
            None if clark.is_empty() => None,
            None => Some(PropertyName::new("", clark)),
        }
    }

    /// Render in the prefixed form used for collection metadata: `D:displayname`.
    ///
    /// Falls back to clark notation for unknown namespaces.
    #[must_use]
    pub fn human(&self) -> String {
        match prefix_for(&self.namespace) {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None if self.namespace.is_empty() => self.name.to_string(),
            None => self.clark(),
        }
    }

    /// Parse a metadata key in either prefixed or clark form.
    #[must_use]
    pub fn from_human(human: &str) -> PropertyName {
        if let Some((prefix, name)) = human.split_once(':') {
            if let Some(namespace) = namespace_for(prefix) {
                return PropertyName::new(namespace, name);
            }
        }
        PropertyName::from_clark(human).unwrap_or_else(|| PropertyName::new("", human))
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.human())
    }
}

impl From<roxmltree::ExpandedName<'_, '_>> for PropertyName {
    fn from(value: roxmltree::ExpandedName<'_, '_>) -> Self {
        PropertyName::new(value.namespace().unwrap_or_default(), value.name())
    }
}

impl PartialEq<roxmltree::ExpandedName<'_, '_>> for PropertyName {
    fn eq(&self, other: &roxmltree::ExpandedName<'_, '_>) -> bool {
        self.name == other.name() && self.namespace == other.namespace().unwrap_or_default()
    }
}

pub const MULTISTATUS: PropertyName = PropertyName::from_static(DAV, "multistatus");
pub const RESPONSE: PropertyName = PropertyName::from_static(DAV, "response");
pub const HREF: PropertyName = PropertyName::from_static(DAV, "href");
pub const PROPSTAT: PropertyName = PropertyName::from_static(DAV, "propstat");
pub const PROP: PropertyName = PropertyName::from_static(DAV, "prop");
pub const STATUS: PropertyName = PropertyName::from_static(DAV, "status");

pub const PROPFIND: PropertyName = PropertyName::from_static(DAV, "propfind");
pub const ALLPROP: PropertyName = PropertyName::from_static(DAV, "allprop");
pub const PROPNAME: PropertyName = PropertyName::from_static(DAV, "propname");
/// Extra properties for `allprop` (rfc4918-14.8). Accepted but not acted upon.
pub const INCLUDE: PropertyName = PropertyName::from_static(DAV, "include");

pub const PRINCIPAL_COLLECTION_SET: PropertyName =
    PropertyName::from_static(DAV, "principal-collection-set");
pub const CURRENT_USER_PRINCIPAL: PropertyName =
    PropertyName::from_static(DAV, "current-user-principal");
pub const CURRENT_USER_PRIVILEGE_SET: PropertyName =
    PropertyName::from_static(DAV, "current-user-privilege-set");
pub const SUPPORTED_REPORT_SET: PropertyName =
    PropertyName::from_static(DAV, "supported-report-set");
pub const RESOURCETYPE: PropertyName = PropertyName::from_static(DAV, "resourcetype");
/// From <https://www.rfc-editor.org/rfc/rfc3744#section-5.1>
pub const OWNER: PropertyName = PropertyName::from_static(DAV, "owner");
pub const PRINCIPAL_URL: PropertyName = PropertyName::from_static(DAV, "principal-URL");
pub const GETETAG: PropertyName = PropertyName::from_static(DAV, "getetag");
pub const GETLASTMODIFIED: PropertyName = PropertyName::from_static(DAV, "getlastmodified");
pub const GETCONTENTTYPE: PropertyName = PropertyName::from_static(DAV, "getcontenttype");
pub const GETCONTENTLENGTH: PropertyName = PropertyName::from_static(DAV, "getcontentlength");
pub const DISPLAY_NAME: PropertyName = PropertyName::from_static(DAV, "displayname");
/// From <https://www.rfc-editor.org/rfc/rfc6578#section-4>
pub const SYNC_TOKEN: PropertyName = PropertyName::from_static(DAV, "sync-token");

pub const UNAUTHENTICATED: PropertyName = PropertyName::from_static(DAV, "unauthenticated");
pub const PRIVILEGE: PropertyName = PropertyName::from_static(DAV, "privilege");
pub const READ: PropertyName = PropertyName::from_static(DAV, "read");
pub const ALL: PropertyName = PropertyName::from_static(DAV, "all");
pub const WRITE: PropertyName = PropertyName::from_static(DAV, "write");
pub const WRITE_PROPERTIES: PropertyName = PropertyName::from_static(DAV, "write-properties");
pub const WRITE_CONTENT: PropertyName = PropertyName::from_static(DAV, "write-content");
pub const SUPPORTED_REPORT: PropertyName = PropertyName::from_static(DAV, "supported-report");
pub const REPORT: PropertyName = PropertyName::from_static(DAV, "report");
pub const EXPAND_PROPERTY: PropertyName = PropertyName::from_static(DAV, "expand-property");
pub const PRINCIPAL_SEARCH_PROPERTY_SET: PropertyName =
    PropertyName::from_static(DAV, "principal-search-property-set");
pub const PRINCIPAL_PROPERTY_SEARCH: PropertyName =
    PropertyName::from_static(DAV, "principal-property-search");
pub const SYNC_COLLECTION: PropertyName = PropertyName::from_static(DAV, "sync-collection");
pub const PRINCIPAL: PropertyName = PropertyName::from_static(DAV, "principal");
pub const COLLECTION: PropertyName = PropertyName::from_static(DAV, "collection");

pub const CALENDAR: PropertyName = PropertyName::from_static(CALDAV, "calendar");
pub const CALENDAR_USER_ADDRESS_SET: PropertyName =
    PropertyName::from_static(CALDAV, "calendar-user-address-set");
/// Defined in <https://www.rfc-editor.org/rfc/rfc4791#section-6.2.1>
pub const CALENDAR_HOME_SET: PropertyName = PropertyName::from_static(CALDAV, "calendar-home-set");
/// Defined in <https://www.rfc-editor.org/rfc/rfc4791#section-5.2.3>
pub const SUPPORTED_CALENDAR_COMPONENT_SET: PropertyName =
    PropertyName::from_static(CALDAV, "supported-calendar-component-set");
pub const COMP: PropertyName = PropertyName::from_static(CALDAV, "comp");
pub const CALENDAR_MULTIGET: PropertyName = PropertyName::from_static(CALDAV, "calendar-multiget");
pub const CALENDAR_QUERY: PropertyName = PropertyName::from_static(CALDAV, "calendar-query");

pub const ADDRESSBOOK: PropertyName = PropertyName::from_static(CARDDAV, "addressbook");
pub const ADDRESSBOOK_HOME_SET: PropertyName =
    PropertyName::from_static(CARDDAV, "addressbook-home-set");
pub const ADDRESSBOOK_MULTIGET: PropertyName =
    PropertyName::from_static(CARDDAV, "addressbook-multiget");
pub const ADDRESSBOOK_QUERY: PropertyName =
    PropertyName::from_static(CARDDAV, "addressbook-query");

pub const GETCTAG: PropertyName = PropertyName::from_static(CALENDARSERVER, "getctag");

/// Display name as stored, without falling back to the collection path.
///
/// Only used by the web interface.
pub const INTERNAL_DISPLAY_NAME: PropertyName = PropertyName::from_static(SERVER, "displayname");
