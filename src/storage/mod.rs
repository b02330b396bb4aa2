// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! The interface to the storage backend.
//!
//! Storage owns the tree of collections and items. Request handling only ever sees snapshots of
//! it ([`Resource`]), obtained through a [`StoreGuard`] that holds the store-wide lock for the
//! duration of a request.

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub mod folder;
pub mod memory;

pub use memory::MemoryStore;

/// Metadata key that marks a collection as an address book or calendar.
pub const TAG: &str = "tag";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("cannot modify storage while holding a shared lock")]
    ReadOnlyLock,

    #[error("no such collection: {0}")]
    NotFound(String),

    #[error("sync token is not valid for this collection: {0}")]
    InvalidSyncToken(String),

    #[error("invalid collection properties: {0}")]
    InvalidProps(#[from] serde_json::Error),

    #[error("i/o error reading storage: {0}")]
    Io(#[from] std::io::Error),
}

/// How deep discovery descends below the addressed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Just the addressed resource.
    #[default]
    Zero,
    /// The addressed resource and its direct children.
    One,
    Infinity,
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Depth::Zero),
            "1" => Ok(Depth::One),
            s if s.eq_ignore_ascii_case("infinity") => Ok(Depth::Infinity),
            other => Err(format!("invalid depth: {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Concurrent readers, no writers.
    Shared,
    /// A single writer, no readers.
    Exclusive,
}

/// A snapshot of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Stripped path. Empty for the root collection.
    pub path: String,
    /// Stored properties, keyed by their human tag (`D:displayname`), plus the reserved [`TAG`].
    pub meta: BTreeMap<String, String>,
    /// Whether this collection is the root collection of a single user.
    pub is_principal: bool,
    pub owner: Option<String>,
    /// Changes whenever the member set or a member's content changes.
    pub etag: String,
    pub last_modified: String,
    /// Sum of the body lengths of the collection's items.
    pub content_length: usize,
}

impl Collection {
    #[must_use]
    pub fn get_meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    /// Value of the [`TAG`] metadata, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.get_meta(TAG).filter(|tag| !tag.is_empty())
    }
}

/// The type of data carried in an item's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// An iCalendar object, with the name of its main component (e.g.: `VEVENT`).
    Calendar { component: Option<String> },
    /// A vCard.
    Contact,
}

impl ItemKind {
    /// Full content type, including parameters.
    #[must_use]
    pub fn content_type(&self, encoding: &str) -> String {
        match self {
            ItemKind::Calendar { component } => {
                let mut content_type = format!("text/calendar;charset={encoding}");
                if let Some(component) = component {
                    content_type.push_str(";component=");
                    content_type.push_str(&component.to_ascii_lowercase());
                }
                content_type
            }
            ItemKind::Contact => format!("text/vcard;charset={encoding}"),
        }
    }
}

/// A snapshot of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// The collection this item belongs to.
    pub collection: Arc<Collection>,
    /// Name of the item inside its collection.
    pub href: String,
    pub uid: String,
    pub etag: String,
    pub last_modified: String,
    /// The serialized item.
    pub body: Vec<u8>,
    pub kind: ItemKind,
}

impl Item {
    /// Stripped path of this item.
    #[must_use]
    pub fn path(&self) -> String {
        if self.collection.path.is_empty() {
            self.href.clone()
        } else {
            format!("{}/{}", self.collection.path, self.href)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Collection(Arc<Collection>),
    Item(Item),
}

impl Resource {
    /// The collection itself, or the collection owning an item.
    #[must_use]
    pub fn collection(&self) -> &Collection {
        match self {
            Resource::Collection(collection) => collection,
            Resource::Item(item) => &item.collection,
        }
    }

    #[must_use]
    pub fn etag(&self) -> &str {
        match self {
            Resource::Collection(collection) => &collection.etag,
            Resource::Item(item) => &item.etag,
        }
    }

    #[must_use]
    pub fn last_modified(&self) -> &str {
        match self {
            Resource::Collection(collection) => &collection.last_modified,
            Resource::Item(item) => &item.last_modified,
        }
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, Resource::Collection(_))
    }

    /// Human-readable description, for logging.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Resource::Collection(collection) if collection.tag().is_some() => {
                format!("collection with tag '{}'", collection.path)
            }
            Resource::Collection(collection) => format!("collection '{}'", collection.path),
            Resource::Item(item) => {
                format!("item '{}' from '{}'", item.href, item.collection.path)
            }
        }
    }
}

/// Format a timestamp the way `getlastmodified` expects it (rfc1123).
#[must_use]
pub fn format_last_modified(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// A storage backend.
pub trait Storage: Send + Sync {
    type Guard<'a>: StoreGuard + Send + Sync
    where
        Self: 'a;

    /// Acquire the store-wide lock.
    ///
    /// The lock is held for as long as the returned guard is alive.
    fn acquire_lock(
        &self,
        mode: LockMode,
        user: Option<&str>,
    ) -> impl Future<Output = Self::Guard<'_>> + Send;
}

/// Access to the store while holding its lock.
pub trait StoreGuard {
    /// Find the resource at `path` and, depending on `depth`, its children.
    ///
    /// The addressed resource always comes first. An empty result means that nothing exists at
    /// `path` (including when `path` is malformed).
    ///
    /// # Errors
    ///
    /// If the storage backend fails to read its data.
    fn discover(&self, path: &str, depth: Depth) -> Result<Vec<Resource>, StorageError>;

    /// Returns the current sync token of a collection and the hrefs of the items that changed
    /// since `old_token`. All items are returned when `old_token` is `None`.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidSyncToken`] if `old_token` was never issued for this collection.
    fn sync(
        &self,
        collection: &Collection,
        old_token: Option<&str>,
    ) -> Result<(String, Vec<String>), StorageError>;

    /// Delete a whole collection (when `href` is `None`) or a single item from it.
    ///
    /// Returns the removed items, in storage's enumeration order.
    ///
    /// # Errors
    ///
    /// [`StorageError::ReadOnlyLock`] if the guard holds a shared lock.
    fn delete(
        &mut self,
        collection: &Collection,
        href: Option<&str>,
    ) -> Result<Vec<Item>, StorageError>;
}
