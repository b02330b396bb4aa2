// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Handling of `PROPFIND` requests.
//!
//! See [rfc4918-9.1](https://www.rfc-editor.org/rfc/rfc4918#section-9.1).

use std::future::Future;

use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use log::{debug, trace};
use tokio::io::AsyncRead;

use crate::app::{Application, DavRequest, DAV_HEADERS};
use crate::error::{DavError, Result};
use crate::hook::Hook;
use crate::names::{self, PropertyName};
use crate::pathutils::unstrip_path;
use crate::props::{PropFindMode, PropFindRequest, RequestContext};
use crate::response::assemble;
use crate::rights::{intersect, Access, PathAccess, Rights};
use crate::storage::{Depth, LockMode, Resource, Storage, StoreGuard};

/// Parse the body of a `PROPFIND` request.
///
/// A missing (or blank) body is equivalent to `allprop`.
///
/// # Errors
///
/// [`DavError::BadRequest`] if the body is not XML, its root is not `DAV:propfind`, or it does
/// not ask for anything.
pub fn parse_request(body: Option<&str>) -> Result<PropFindRequest> {
    let Some(body) = body.filter(|body| !body.trim().is_empty()) else {
        return Ok(PropFindRequest::allprop());
    };
    let doc = roxmltree::Document::parse(body)?;
    let root = doc.root_element();
    if names::PROPFIND != root.tag_name() {
        return Err(DavError::BadRequest(format!(
            "expected propfind element, got {}",
            PropertyName::from(root.tag_name())
        )));
    }

    let mut request = PropFindRequest::default();
    let mut found = false;
    for child in root.children().filter(roxmltree::Node::is_element) {
        if names::ALLPROP == child.tag_name() {
            request.allprop = true;
        } else if names::PROPNAME == child.tag_name() {
            request.propname = true;
        } else if names::PROP == child.tag_name() {
            request.props.extend(
                child
                    .children()
                    .filter(roxmltree::Node::is_element)
                    .map(|prop| PropertyName::from(prop.tag_name())),
            );
        } else {
            // Includes `DAV:include`, which only extends `allprop` with dead properties.
            continue;
        }
        found = true;
    }
    if !found {
        return Err(DavError::BadRequest(
            "propfind element requests nothing".into(),
        ));
    }
    Ok(request)
}

/// Filter discovered resources down to those `user` may read, along with their access level.
///
/// Collections are checked against their own path: tagged collections need item-level grants,
/// plain ones collection-level grants. Items are checked against their collection's path.
pub fn collect_allowed_items<R: Rights + ?Sized>(
    rights: &R,
    user: Option<&str>,
    resources: Vec<Resource>,
) -> Vec<(Resource, Access)> {
    resources
        .into_iter()
        .filter_map(|resource| {
            let (path, required) = match &resource {
                Resource::Collection(collection) if collection.tag().is_some() => {
                    (unstrip_path(&collection.path, true), "rw")
                }
                Resource::Collection(collection) => (unstrip_path(&collection.path, true), "RW"),
                Resource::Item(item) => (unstrip_path(&item.collection.path, true), "rw"),
            };
            let access = intersect(&rights.authorization(user, &path), required).access();
            debug!(
                "{} has {access} access to {}",
                user.map_or_else(|| "anonymous user".to_string(), |u| format!("'{u}'")),
                resource.describe()
            );
            (access != Access::None).then_some((resource, access))
        })
        .collect()
}

pub(crate) trait PropFindRequestHandler: Sync + Send {
    fn handle_propfind_request<B: AsyncRead + Unpin + Send>(
        &self,
        path: &str,
        request: &mut DavRequest<B>,
    ) -> impl Future<Output = Result<Response<String>>> + Send;
}

impl<S, R, H> PropFindRequestHandler for Application<S, R, H>
where
    S: Storage,
    R: Rights,
    H: Hook,
{
    async fn handle_propfind_request<B: AsyncRead + Unpin + Send>(
        &self,
        path: &str,
        request: &mut DavRequest<B>,
    ) -> Result<Response<String>> {
        let user = request.user.as_deref();
        let access = PathAccess::new(&self.rights, user, path);
        if !access.check(Access::Read, None) {
            return Err(DavError::NotAllowed);
        }

        let body = self.read_body(&mut request.body).await?;
        let mode = parse_request(body.as_deref())?.mode()?;
        let depth = match request.depth.as_deref() {
            Some(depth) => depth.parse::<Depth>().map_err(DavError::BadRequest)?,
            None => Depth::Zero,
        };

        let guard = self.storage.acquire_lock(LockMode::Shared, user).await;
        let resources = guard.discover(path, depth)?;
        let Some(first) = resources.first() else {
            return Err(DavError::NotFound);
        };
        if !access.check(Access::Read, Some(first)) {
            return Err(DavError::NotAllowed);
        }
        if user.is_none() {
            if let PropFindMode::Props(props) = &mode {
                if props.contains(&names::CURRENT_USER_PRINCIPAL) {
                    // Only allprop falls back to `DAV:unauthenticated`.
                    return Err(DavError::Forbidden);
                }
            }
        }

        let allowed = collect_allowed_items(&self.rights, user, resources);
        let context = RequestContext {
            base_prefix: &self.config.base_prefix,
            path,
            user,
            encoding: &self.config.encoding,
        };
        let store: &dyn StoreGuard = &guard;
        let multistatus = assemble(&self.resolver, &mode, &context, store, allowed)?;
        let body = multistatus.render();
        drop(guard);
        trace!("PROPFIND response: {body}");

        Ok(Response::builder()
            .status(StatusCode::MULTI_STATUS)
            .header("DAV", DAV_HEADERS)
            .header(
                CONTENT_TYPE,
                format!("text/xml; charset={}", self.config.encoding),
            )
            .body(body)?)
    }
}
