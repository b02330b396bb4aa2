// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! An in-memory storage backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use sha2::{Digest, Sha256};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    format_last_modified, Collection, Depth, Item, ItemKind, LockMode, Resource, Storage,
    StorageError, StoreGuard,
};
use crate::names;
use crate::pathutils::strip_path;

/// An item to be stored.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub uid: String,
    pub body: Vec<u8>,
    pub kind: ItemKind,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredItem {
    uid: String,
    body: Vec<u8>,
    kind: ItemKind,
    etag: String,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredCollection {
    meta: BTreeMap<String, String>,
    items: BTreeMap<String, StoredItem>,
    last_modified: DateTime<Utc>,
}

impl StoredCollection {
    fn new(meta: BTreeMap<String, String>) -> StoredCollection {
        StoredCollection {
            meta,
            items: BTreeMap::new(),
            last_modified: Utc::now(),
        }
    }

    /// Membership state: href to etag.
    fn state(&self) -> BTreeMap<String, String> {
        self.items
            .iter()
            .map(|(href, item)| (href.clone(), item.etag.clone()))
            .collect()
    }
}

fn quoted_hash(data: impl AsRef<[u8]>) -> String {
    format!("\"{:x}\"", Sha256::digest(data))
}

fn state_hash(state: &BTreeMap<String, String>) -> Sha256 {
    let mut hasher = Sha256::new();
    for (href, etag) in state {
        hasher.update(href.as_bytes());
        hasher.update([0]);
        hasher.update(etag.as_bytes());
        hasher.update([0]);
    }
    hasher
}

fn sync_token(state: &BTreeMap<String, String>) -> String {
    format!("{}sync/{:x}", names::SERVER, state_hash(state).finalize())
}

fn parent_of(path: &str) -> Option<&str> {
    if path.is_empty() {
        None
    } else {
        Some(path.rsplit_once('/').map_or("", |(parent, _)| parent))
    }
}

/// The tree of collections, keyed by stripped path. The root collection has an empty path.
#[derive(Debug)]
pub struct Tree {
    collections: BTreeMap<String, StoredCollection>,
    /// Membership state for every sync token issued, per collection.
    sync_history: HashMap<String, HashMap<String, BTreeMap<String, String>>>,
}

impl Default for Tree {
    fn default() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(String::new(), StoredCollection::new(BTreeMap::new()));
        Tree {
            collections,
            sync_history: HashMap::new(),
        }
    }
}

impl Tree {
    fn snapshot(&self, path: &str) -> Option<Arc<Collection>> {
        let stored = self.collections.get(path)?;
        let mut etag_input = Vec::new();
        for (href, item) in &stored.items {
            etag_input.extend_from_slice(href.as_bytes());
            etag_input.push(0);
            etag_input.extend_from_slice(item.etag.as_bytes());
            etag_input.push(0);
        }
        let last_modified = stored
            .items
            .values()
            .map(|item| item.last_modified)
            .chain([stored.last_modified])
            .max()
            .unwrap_or(stored.last_modified);
        let owner = path.split('/').next().filter(|owner| !owner.is_empty());

        Some(Arc::new(Collection {
            path: path.to_string(),
            meta: stored.meta.clone(),
            is_principal: !path.is_empty() && !path.contains('/'),
            owner: owner.map(str::to_string),
            etag: quoted_hash(etag_input),
            last_modified: format_last_modified(last_modified),
            content_length: stored.items.values().map(|item| item.body.len()).sum(),
        }))
    }

    fn item(collection: &Arc<Collection>, href: &str, stored: &StoredItem) -> Item {
        Item {
            collection: Arc::clone(collection),
            href: href.to_string(),
            uid: stored.uid.clone(),
            etag: stored.etag.clone(),
            last_modified: format_last_modified(stored.last_modified),
            body: stored.body.clone(),
            kind: stored.kind.clone(),
        }
    }

    fn children(&self, path: &str) -> impl Iterator<Item = &str> + '_ {
        let path = path.to_string();
        self.collections
            .keys()
            .map(String::as_str)
            .filter(move |key| parent_of(key) == Some(path.as_str()))
    }

    fn record_sync_state(&mut self, path: &str) {
        if let Some(stored) = self.collections.get(path) {
            let state = stored.state();
            self.sync_history
                .entry(path.to_string())
                .or_default()
                .insert(sync_token(&state), state);
        }
    }

    fn discover(&self, path: &str, depth: Depth) -> Vec<Resource> {
        let stripped = strip_path(path);
        if let Some(collection) = self.snapshot(stripped) {
            let mut resources = Vec::new();
            if depth != Depth::Zero {
                let stored = &self.collections[stripped];
                resources.extend(
                    stored
                        .items
                        .iter()
                        .map(|(href, item)| Resource::Item(Tree::item(&collection, href, item))),
                );
                resources.extend(
                    self.children(stripped)
                        .filter_map(|child| self.snapshot(child))
                        .map(Resource::Collection),
                );
            }
            resources.insert(0, Resource::Collection(collection));
            return resources;
        }

        let (parent, href) = stripped.rsplit_once('/').unwrap_or(("", stripped));
        let Some(stored) = self
            .collections
            .get(parent)
            .and_then(|collection| collection.items.get(href))
        else {
            return Vec::new();
        };
        match self.snapshot(parent) {
            Some(collection) => vec![Resource::Item(Tree::item(&collection, href, stored))],
            None => Vec::new(),
        }
    }

    fn sync(
        &self,
        collection: &Collection,
        old_token: Option<&str>,
    ) -> Result<(String, Vec<String>), StorageError> {
        let stored = self
            .collections
            .get(&collection.path)
            .ok_or_else(|| StorageError::NotFound(collection.path.clone()))?;
        let state = stored.state();
        let token = sync_token(&state);

        let changes = match old_token {
            None => state.keys().cloned().collect(),
            Some(old) if old == token => Vec::new(),
            Some(old) => {
                let old_state = self
                    .sync_history
                    .get(&collection.path)
                    .and_then(|history| history.get(old))
                    .ok_or_else(|| StorageError::InvalidSyncToken(old.to_string()))?;
                old_state
                    .keys()
                    .chain(state.keys())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .filter(|href| old_state.get(*href) != state.get(*href))
                    .cloned()
                    .collect()
            }
        };
        Ok((token, changes))
    }

    fn delete(
        &mut self,
        collection: &Collection,
        href: Option<&str>,
    ) -> Result<Vec<Item>, StorageError> {
        let path = collection.path.as_str();
        let snapshot = self
            .snapshot(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;

        if let Some(href) = href {
            let stored = self
                .collections
                .get_mut(path)
                .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
            let removed = stored
                .items
                .remove(href)
                .ok_or_else(|| StorageError::NotFound(format!("{path}/{href}")))?;
            stored.last_modified = Utc::now();
            self.record_sync_state(path);
            return Ok(vec![Tree::item(&snapshot, href, &removed)]);
        }

        let subtree = self
            .collections
            .keys()
            .filter(|key| {
                path.is_empty() || key.as_str() == path || key.starts_with(&format!("{path}/"))
            })
            .cloned()
            .collect::<Vec<_>>();

        let mut removed = Vec::new();
        for key in &subtree {
            let Some(collection) = self.snapshot(key) else {
                continue;
            };
            let stored = &self.collections[key.as_str()];
            removed.extend(
                stored
                    .items
                    .iter()
                    .map(|(href, item)| Tree::item(&collection, href, item)),
            );
        }

        for key in subtree {
            if key.is_empty() {
                // The root collection always exists.
                if let Some(root) = self.collections.get_mut("") {
                    root.items.clear();
                    root.last_modified = Utc::now();
                }
                self.record_sync_state("");
            } else {
                self.collections.remove(&key);
                self.sync_history.remove(&key);
            }
        }
        Ok(removed)
    }
}

/// A storage backend keeping the whole tree in memory.
///
/// The tree is populated with [`MemoryStore::create_collection`] and [`MemoryStore::upload`]
/// before the store is shared.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: RwLock<Tree>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Create a collection (and any missing parents) or replace its metadata.
    pub fn create_collection(&mut self, path: &str, meta: BTreeMap<String, String>) {
        let tree = self.tree.get_mut();
        let stripped = strip_path(path);
        let mut parent = parent_of(stripped);
        while let Some(path) = parent {
            tree.collections
                .entry(path.to_string())
                .or_insert_with(|| StoredCollection::new(BTreeMap::new()));
            parent = parent_of(path);
        }
        match tree.collections.get_mut(stripped) {
            Some(existing) => existing.meta = meta,
            None => {
                tree.collections
                    .insert(stripped.to_string(), StoredCollection::new(meta));
            }
        }
        tree.record_sync_state(stripped);
    }

    /// Store an item in an existing collection, replacing any item with the same href.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if the collection does not exist.
    pub fn upload(
        &mut self,
        collection: &str,
        href: &str,
        item: NewItem,
    ) -> Result<(), StorageError> {
        let tree = self.tree.get_mut();
        let stripped = strip_path(collection);
        let stored = tree
            .collections
            .get_mut(stripped)
            .ok_or_else(|| StorageError::NotFound(stripped.to_string()))?;
        stored.items.insert(
            href.to_string(),
            StoredItem {
                uid: item.uid,
                etag: quoted_hash(&item.body),
                body: item.body,
                kind: item.kind,
                last_modified: item.last_modified,
            },
        );
        stored.last_modified = stored.last_modified.max(item.last_modified);
        tree.record_sync_state(stripped);
        Ok(())
    }
}

/// The store-wide lock of a [`MemoryStore`].
pub enum MemoryGuard<'a> {
    Shared(RwLockReadGuard<'a, Tree>),
    Exclusive(RwLockWriteGuard<'a, Tree>),
}

impl MemoryGuard<'_> {
    fn tree(&self) -> &Tree {
        match self {
            MemoryGuard::Shared(guard) => &**guard,
            MemoryGuard::Exclusive(guard) => &**guard,
        }
    }
}

impl Storage for MemoryStore {
    type Guard<'a> = MemoryGuard<'a>;

    async fn acquire_lock(&self, mode: LockMode, user: Option<&str>) -> MemoryGuard<'_> {
        debug!(
            "Acquiring {mode:?} lock for {}",
            user.map_or_else(|| "anonymous user".to_string(), |u| format!("'{u}'"))
        );
        match mode {
            LockMode::Shared => MemoryGuard::Shared(self.tree.read().await),
            LockMode::Exclusive => MemoryGuard::Exclusive(self.tree.write().await),
        }
    }
}

impl StoreGuard for MemoryGuard<'_> {
    fn discover(&self, path: &str, depth: Depth) -> Result<Vec<Resource>, StorageError> {
        Ok(self.tree().discover(path, depth))
    }

    fn sync(
        &self,
        collection: &Collection,
        old_token: Option<&str>,
    ) -> Result<(String, Vec<String>), StorageError> {
        self.tree().sync(collection, old_token)
    }

    fn delete(
        &mut self,
        collection: &Collection,
        href: Option<&str>,
    ) -> Result<Vec<Item>, StorageError> {
        match self {
            MemoryGuard::Shared(_) => Err(StorageError::ReadOnlyLock),
            MemoryGuard::Exclusive(tree) => tree.delete(collection, href),
        }
    }
}
