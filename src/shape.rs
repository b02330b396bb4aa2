// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Classification of discovered resources.
//!
//! Only items and *leaf* collections (address books and calendars) carry content, and so only
//! they expose `getetag`, `getlastmodified`, `getcontenttype` and `getcontentlength`. Plain
//! collections only group other collections.

use crate::storage::Resource;

/// The tag of a leaf collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    AddressBook,
    Calendar,
}

impl Tag {
    #[must_use]
    pub fn from_meta(tag: &str) -> Option<Tag> {
        match tag {
            "VADDRESSBOOK" => Some(Tag::AddressBook),
            "VCALENDAR" => Some(Tag::Calendar),
            _ => None,
        }
    }

    /// Content type of a collection with this tag.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Tag::AddressBook => "text/vcard",
            Tag::Calendar => "text/calendar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Item,
    PlainCollection,
    Leaf(Tag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceShape {
    pub kind: ResourceKind,
    /// Whether the resource is a principal collection.
    ///
    /// Always `false` for items, even if they live in a principal collection.
    pub is_principal: bool,
}

impl ResourceShape {
    #[must_use]
    pub fn classify(resource: &Resource) -> ResourceShape {
        match resource {
            Resource::Item(item) => ResourceShape {
                kind: ResourceKind::Item,
                is_principal: false,
            },
            Resource::Collection(collection) => ResourceShape {
                kind: collection
                    .tag()
                    .and_then(Tag::from_meta)
                    .map_or(ResourceKind::PlainCollection, ResourceKind::Leaf),
                is_principal: collection.is_principal,
            },
        }
    }

    #[must_use]
    pub fn is_collection(self) -> bool {
        !matches!(self.kind, ResourceKind::Item)
    }

    #[must_use]
    pub fn tag(self) -> Option<Tag> {
        match self.kind {
            ResourceKind::Leaf(tag) => Some(tag),
            ResourceKind::Item | ResourceKind::PlainCollection => None,
        }
    }

    #[must_use]
    pub fn is_leaf(self) -> bool {
        self.tag().is_some()
    }

    /// Items and leaf collections.
    #[must_use]
    pub fn is_content_bearing(self) -> bool {
        !matches!(self.kind, ResourceKind::PlainCollection)
    }
}
