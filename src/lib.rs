#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! The core of a caldav and carddav server: property discovery (`PROPFIND`) and deletion
//! (`DELETE`) over a tree of collections and items.
//!
//! See [`Application`] as the entry point. It combines three collaborators:
//!
//! - A [`storage::Storage`], which owns the tree and its store-wide lock. [`MemoryStore`] keeps
//!   everything in memory and can be populated from disk with [`storage::folder::load`].
//! - A [`rights::Rights`] backend, which grants permission strings per user and path.
//! - A [`hook::Hook`], which receives a notification for every item removed by a request.
//!
//! # Collections and items
//!
//! The first level of the tree holds one *principal* collection per user. Collections whose
//! `tag` metadata is `VADDRESSBOOK` or `VCALENDAR` are address books and calendars; these are
//! the only collections that hold items and that report content properties like `getetag`.
//!
//! # Hrefs
//!
//! All `href`s in responses are quoted by this library. Request paths are expected to be
//! already unquoted.

pub mod app;
pub mod config;
pub mod delete;
pub mod error;
pub mod hook;
pub mod names;
pub mod pathutils;
pub mod propfind;
pub mod props;
pub mod response;
pub mod rights;
pub mod shape;
pub mod storage;
pub mod xmlutils;

pub use app::{Application, DavRequest};
pub use error::DavError;
pub use names::PropertyName;
pub use storage::MemoryStore;
