// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Helpers for the slash-separated paths that address collections and items.
//!
//! A *sanitized* path is absolute (`/alice/calendar/`), free of `.`/`..` segments and empty
//! segments, and keeps the trailing slash of its input. A *stripped* path has neither leading nor
//! trailing slashes (`alice/calendar`) and is how storage refers to resources.

/// Normalize an untrusted request path.
#[must_use]
pub fn sanitize_path(path: &str) -> String {
    let trailing_slash = path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    let mut sanitized = format!("/{}", segments.join("/"));
    if trailing_slash && !sanitized.ends_with('/') {
        sanitized.push('/');
    }
    sanitized
}

#[must_use]
pub fn strip_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// Turn a stripped path back into an absolute one.
#[must_use]
pub fn unstrip_path(stripped_path: &str, trailing_slash: bool) -> String {
    let mut path = format!("/{stripped_path}");
    if trailing_slash && !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// Parent of a sanitized path, as a sanitized path with a trailing slash.
#[must_use]
pub fn parent_path(path: &str) -> String {
    let stripped = strip_path(path);
    let parent = stripped.rsplit_once('/').map_or("", |(parent, _)| parent);
    unstrip_path(parent, true)
}
