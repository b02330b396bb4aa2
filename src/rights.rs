// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Permission handling.
//!
//! A rights backend grants a permission string for a user and a path. Strings are made of the
//! symbols `R` and `W` (read and write on plain collections) and `r` and `w` (read and write on
//! address books, calendars and their items). Each operation intersects the granted set with the
//! set it requires and derives an [`Access`] level from what remains.

use std::fmt;

use serde::Deserialize;

use crate::pathutils::{parent_path, strip_path};
use crate::storage::Resource;

/// A set of permission symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions(u8);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    /// `R`
    pub const COLLECTION_READ: Permissions = Permissions(0b0001);
    /// `W`
    pub const COLLECTION_WRITE: Permissions = Permissions(0b0010);
    /// `r`
    pub const ITEM_READ: Permissions = Permissions(0b0100);
    /// `w`
    pub const ITEM_WRITE: Permissions = Permissions(0b1000);

    const SYMBOLS: [(char, Permissions); 4] = [
        ('R', Permissions::COLLECTION_READ),
        ('r', Permissions::ITEM_READ),
        ('W', Permissions::COLLECTION_WRITE),
        ('w', Permissions::ITEM_WRITE),
    ];

    /// Parse a permission string. Unknown symbols are ignored.
    #[must_use]
    pub fn parse(permissions: &str) -> Permissions {
        permissions
            .chars()
            .filter_map(|c| Permissions::SYMBOLS.iter().find(|(s, _)| *s == c))
            .fold(Permissions::NONE, |acc, (_, p)| acc.union(*p))
    }

    #[must_use]
    pub const fn union(self, other: Permissions) -> Permissions {
        Permissions(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersect(self, other: Permissions) -> Permissions {
        Permissions(self.0 & other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The effective access level of this set.
    #[must_use]
    pub fn access(self) -> Access {
        if !self.intersect(Permissions::parse("Ww")).is_empty() {
            Access::Write
        } else if !self.intersect(Permissions::parse("Rr")).is_empty() {
            Access::Read
        } else {
            Access::None
        }
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (symbol, permission) in Permissions::SYMBOLS {
            if !self.intersect(permission).is_empty() {
                write!(f, "{symbol}")?;
            }
        }
        Ok(())
    }
}

/// Intersect a granted permission string with a required one.
#[must_use]
pub fn intersect(granted: &str, required: &str) -> Permissions {
    Permissions::parse(granted).intersect(Permissions::parse(required))
}

/// Effective access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    None,
    Read,
    Write,
}

impl Access {
    /// Lowercase permission symbol for this access level, as used by [`PathAccess::check`].
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Access::None => "",
            Access::Read => "r",
            Access::Write => "w",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Access::None => "NO",
            Access::Read => "read",
            Access::Write => "write",
        })
    }
}

/// A rights backend.
pub trait Rights: Send + Sync {
    /// Returns the permission string granted to `user` on `path`.
    ///
    /// `path` is sanitized and `user` is `None` for anonymous requests.
    fn authorization(&self, user: Option<&str>, path: &str) -> String;
}

/// The built-in rights backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RightsBackend {
    /// Everybody may read and write everything.
    None,
    /// Authenticated users may read and write everything.
    Authenticated,
    /// Authenticated users may only read and write their own collections.
    #[default]
    OwnerOnly,
    /// Like [`RightsBackend::OwnerOnly`], but other users' collections are readable.
    OwnerWrite,
}

impl Rights for RightsBackend {
    fn authorization(&self, user: Option<&str>, path: &str) -> String {
        let verify_user = !matches!(self, RightsBackend::None);
        if verify_user && user.is_none() {
            return String::new();
        }
        let sane_path = strip_path(path);
        let depth = sane_path.matches('/').count();

        let granted = match self {
            RightsBackend::None | RightsBackend::Authenticated => match depth {
                0 => "RW",
                1 => "rw",
                _ => "",
            },
            RightsBackend::OwnerOnly | RightsBackend::OwnerWrite => {
                if sane_path.is_empty() {
                    return "R".into();
                }
                let owner = sane_path.split('/').next().unwrap_or_default();
                let is_owner = user == Some(owner);
                match (depth, is_owner, self) {
                    (0, true, _) => "RW",
                    (1, true, _) => "rw",
                    (0, false, RightsBackend::OwnerWrite) => "R",
                    (1, false, RightsBackend::OwnerWrite) => "r",
                    _ => "",
                }
            }
        };
        granted.into()
    }
}

/// The permissions of a user on a request path, and on its parent.
///
/// The parent matters for items, which inherit the item-level permissions of the collection
/// they belong to.
pub struct PathAccess<'r, R: ?Sized> {
    rights: &'r R,
    user: Option<String>,
    /// Sanitized request path.
    pub path: String,
    parent_path: String,
    permissions: Permissions,
}

impl<'r, R: Rights + ?Sized> PathAccess<'r, R> {
    pub fn new(rights: &'r R, user: Option<&str>, path: &str) -> PathAccess<'r, R> {
        let permissions = Permissions::parse(&rights.authorization(user, path));
        PathAccess {
            rights,
            user: user.map(str::to_string),
            path: path.to_string(),
            parent_path: parent_path(path),
            permissions,
        }
    }

    fn parent_permissions(&self) -> Permissions {
        if strip_path(&self.path) == strip_path(&self.parent_path) {
            return self.permissions;
        }
        Permissions::parse(
            &self
                .rights
                .authorization(self.user.as_deref(), &self.parent_path),
        )
    }

    /// Check whether `access` is granted on the path, or on a concrete resource found there.
    ///
    /// Without a resource, both collection-level and item-level grants are accepted. For a
    /// collection, only the grant matching its kind counts. For an item, the grant comes from
    /// its parent collection.
    #[must_use]
    pub fn check(&self, access: Access, resource: Option<&Resource>) -> bool {
        let symbol = access.symbol();
        if symbol.is_empty() {
            return true;
        }
        let upper = symbol.to_ascii_uppercase();
        let (required, parent_required) = match resource {
            None => (format!("{symbol}{upper}"), symbol.to_string()),
            Some(Resource::Collection(collection)) if collection.tag().is_some() => {
                (symbol.to_string(), String::new())
            }
            Some(Resource::Collection(_)) => (upper, String::new()),
            Some(Resource::Item(_)) => (String::new(), symbol.to_string()),
        };
        if !self
            .permissions
            .intersect(Permissions::parse(&required))
            .is_empty()
        {
            return true;
        }
        strip_path(&self.path) != strip_path(&self.parent_path)
            && !parent_required.is_empty()
            && !self
                .parent_permissions()
                .intersect(Permissions::parse(&parent_required))
                .is_empty()
    }
}
