// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Populate a [`MemoryStore`] from a directory tree.
//!
//! Every directory below the root is a collection; first-level directories are the principal
//! collections of the users they are named after. Collection metadata lives in a `.props.json`
//! file (a JSON object of strings). Every other file is an item: `.vcf` files are contacts and
//! anything else is parsed as iCalendar data.

use std::collections::BTreeMap;
use std::fs::{read, read_dir};
use std::path::Path;

use chrono::{DateTime, Utc};
use icalendar::{Calendar, CalendarComponent, Component};
use log::{debug, warn};
use uuid::Uuid;

use super::memory::{MemoryStore, NewItem};
use super::{ItemKind, StorageError};

/// Name of the file holding a collection's metadata.
pub const PROPS_FILE: &str = ".props.json";

/// Load all collections found under `folder`.
///
/// A missing folder yields an empty store.
///
/// # Errors
///
/// If a directory or file cannot be read, or a `.props.json` file is not a JSON object of
/// strings.
pub fn load(folder: &Path) -> Result<MemoryStore, StorageError> {
    let mut store = MemoryStore::new();
    if !folder.is_dir() {
        warn!("Storage folder {} does not exist", folder.display());
        return Ok(store);
    }
    load_collection(&mut store, folder, folder)?;
    Ok(store)
}

fn load_collection(store: &mut MemoryStore, root: &Path, dir: &Path) -> Result<(), StorageError> {
    let path = dir
        .strip_prefix(root)
        .unwrap_or(dir)
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/");

    let props_file = dir.join(PROPS_FILE);
    let meta = if path.is_empty() || !props_file.is_file() {
        BTreeMap::new()
    } else {
        serde_json::from_slice::<BTreeMap<String, String>>(&read(&props_file)?)?
    };
    if !path.is_empty() {
        debug!("Loading collection '{path}'");
        store.create_collection(&path, meta);
    }

    let mut entries = read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);
    for entry in entries {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!("Skipping non-utf8 file name in {}", dir.display());
            continue;
        };
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            load_collection(store, root, &entry.path())?;
        } else if file_type.is_file() && !name.starts_with('.') {
            let body = read(entry.path())?;
            let last_modified = entry
                .metadata()?
                .modified()
                .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
            store.upload(&path, &name, parse_item(&name, body, last_modified))?;
        }
    }
    Ok(())
}

/// Work out the uid and kind of an item from its body.
///
/// Items without a uid get a freshly generated one.
#[must_use]
pub fn parse_item(href: &str, body: Vec<u8>, last_modified: DateTime<Utc>) -> NewItem {
    let text = String::from_utf8_lossy(&body);
    let (uid, kind) = if href.to_ascii_lowercase().ends_with(".vcf") {
        (vcard_uid(&text), ItemKind::Contact)
    } else {
        match text.parse::<Calendar>() {
            Ok(calendar) => {
                let (uid, component) = calendar_uid(&calendar);
                (uid, ItemKind::Calendar { component })
            }
            Err(err) => {
                warn!("Could not parse {href} as iCalendar data: {err}");
                (None, ItemKind::Calendar { component: None })
            }
        }
    };

    NewItem {
        uid: uid.unwrap_or_else(|| Uuid::now_v7().to_string()),
        body,
        kind,
        last_modified,
    }
}

fn calendar_uid(calendar: &Calendar) -> (Option<String>, Option<String>) {
    for component in &calendar.components {
        match component {
            CalendarComponent::Event(event) => {
                return (event.get_uid().map(str::to_string), Some("VEVENT".into()));
            }
            CalendarComponent::Todo(todo) => {
                return (todo.get_uid().map(str::to_string), Some("VTODO".into()));
            }
            _ => {}
        }
    }
    (None, None)
}

fn vcard_uid(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("UID").then(|| value.trim().to_string())
        })
        .filter(|uid| !uid.is_empty())
}
