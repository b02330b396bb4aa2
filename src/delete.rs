// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Handling of `DELETE` requests.
//!
//! See [rfc4918-9.6](https://www.rfc-editor.org/rfc/rfc4918#section-9.6).

use std::future::Future;

use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use log::{debug, trace};
use tokio::io::AsyncRead;

use crate::app::{Application, DavRequest};
use crate::error::{DavError, Result};
use crate::hook::{delete_notifications, emit, Hook};
use crate::response::MultiStatus;
use crate::rights::{Access, PathAccess, Rights};
use crate::storage::{Depth, LockMode, Resource, Storage, StoreGuard};
use crate::xmlutils::make_href;

/// Whether an `If-Match` value allows modifying a resource with the given etag.
///
/// A missing header is equivalent to `*`.
#[must_use]
pub fn precondition_holds(if_match: Option<&str>, etag: &str) -> bool {
    match if_match.map(str::trim) {
        None | Some("*") => true,
        Some(if_match) => if_match == etag,
    }
}

pub(crate) trait DeleteRequestHandler: Sync + Send {
    fn handle_delete_request<B: AsyncRead + Unpin + Send>(
        &self,
        path: &str,
        request: &mut DavRequest<B>,
    ) -> impl Future<Output = Result<Response<String>>> + Send;
}

impl<S, R, H> DeleteRequestHandler for Application<S, R, H>
where
    S: Storage,
    R: Rights,
    H: Hook,
{
    async fn handle_delete_request<B: AsyncRead + Unpin + Send>(
        &self,
        path: &str,
        request: &mut DavRequest<B>,
    ) -> Result<Response<String>> {
        let user = request.user.as_deref();
        let access = PathAccess::new(&self.rights, user, path);
        if !access.check(Access::Write, None) {
            return Err(DavError::NotAllowed);
        }

        let mut guard = self.storage.acquire_lock(LockMode::Exclusive, user).await;
        let resource = guard
            .discover(path, Depth::Zero)?
            .into_iter()
            .next()
            .ok_or(DavError::NotFound)?;
        if !access.check(Access::Write, Some(&resource)) {
            return Err(DavError::NotAllowed);
        }
        if !precondition_holds(request.if_match.as_deref(), resource.etag()) {
            debug!(
                "Precondition failed on {}: etag is {}",
                resource.describe(),
                resource.etag()
            );
            return Err(DavError::PreconditionFailed);
        }

        let notifications = match &resource {
            Resource::Collection(collection) => {
                let removed = guard.delete(collection, None)?;
                delete_notifications(&removed, None)
            }
            Resource::Item(item) => {
                let removed = guard.delete(&item.collection, Some(&item.href))?;
                delete_notifications(&removed, request.context.as_deref())
            }
        };
        let body = MultiStatus::single_status(
            make_href(&self.config.base_prefix, path),
            StatusCode::OK,
        )
        .render();
        emit(&self.hook, &notifications);
        drop(guard);
        trace!("DELETE response: {body}");

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(
                CONTENT_TYPE,
                format!("text/xml; charset={}", self.config.encoding),
            )
            .body(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::precondition_holds;

    #[test]
    fn test_precondition() {
        assert!(precondition_holds(None, "\"abc\""));
        assert!(precondition_holds(Some("*"), "\"abc\""));
        assert!(precondition_holds(Some("\"abc\""), "\"abc\""));
        assert!(precondition_holds(Some(" \"abc\" "), "\"abc\""));
        assert!(!precondition_holds(Some("\"xyz\""), "\"abc\""));
        assert!(!precondition_holds(Some("abc"), "\"abc\""));
    }
}
