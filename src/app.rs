// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Request dispatch.
//!
//! An [`Application`] owns the storage, rights and hook collaborators and answers
//! [`DavRequest`]s. Errors are turned into plain responses here; handlers only ever return
//! [`DavError`].

use http::{Method, Response};
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, Empty};
use tokio::time::timeout;

use crate::config::ServerConfig;
use crate::delete::DeleteRequestHandler;
use crate::error::{DavError, Result};
use crate::hook::Hook;
use crate::pathutils::sanitize_path;
use crate::propfind::PropFindRequestHandler;
use crate::props::PropertyResolver;
use crate::rights::Rights;
use crate::storage::Storage;

/// Value of the `DAV` header in `PROPFIND` responses.
pub const DAV_HEADERS: &str = "1, 2, 3, calendar-access, addressbook, extended-mkcol";

/// A request, as extracted by the transport.
#[derive(Debug)]
pub struct DavRequest<B = Empty> {
    pub method: Method,
    /// Request path, as sent by the client (not yet sanitized).
    pub path: String,
    /// Authenticated user, if any.
    pub user: Option<String>,
    /// Value of the `Depth` header.
    pub depth: Option<String>,
    /// Value of the `If-Match` header.
    pub if_match: Option<String>,
    /// Free-form context passed on to change notifications.
    pub context: Option<String>,
    pub body: B,
}

impl DavRequest {
    /// A request without body or headers.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> DavRequest {
        DavRequest {
            method,
            path: path.into(),
            user: None,
            depth: None,
            if_match: None,
            context: None,
            body: tokio::io::empty(),
        }
    }
}

impl<B> DavRequest<B> {
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn depth(mut self, depth: impl Into<String>) -> Self {
        self.depth = Some(depth.into());
        self
    }

    #[must_use]
    pub fn if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Replace the body of this request.
    pub fn with_body<B2>(self, body: B2) -> DavRequest<B2> {
        DavRequest {
            method: self.method,
            path: self.path,
            user: self.user,
            depth: self.depth,
            if_match: self.if_match,
            context: self.context,
            body,
        }
    }
}

/// Answers requests against a single store.
pub struct Application<S, R, H> {
    pub(crate) config: ServerConfig,
    pub(crate) storage: S,
    pub(crate) rights: R,
    pub(crate) hook: H,
    pub(crate) resolver: PropertyResolver,
}

impl<S, R, H> Application<S, R, H>
where
    S: Storage,
    R: Rights,
    H: Hook,
{
    pub fn new(config: ServerConfig, storage: S, rights: R, hook: H) -> Application<S, R, H> {
        Application {
            config,
            storage,
            rights,
            hook,
            resolver: PropertyResolver::new(),
        }
    }

    /// Answer a request.
    ///
    /// Failures are reported as responses with an appropriate status and a short plain text
    /// body; details are only logged.
    pub async fn handle<B>(&self, mut request: DavRequest<B>) -> Response<String>
    where
        B: AsyncRead + Unpin + Send,
    {
        let path = sanitize_path(&request.path);
        let user_description = request
            .user
            .as_deref()
            .map_or_else(|| "anonymous user".to_string(), |u| format!("user '{u}'"));
        info!(
            "{} request for {path:?} received from {user_description}",
            request.method
        );

        let result = match request.method.as_str() {
            "PROPFIND" => self.handle_propfind_request(&path, &mut request).await,
            "DELETE" => self.handle_delete_request(&path, &mut request).await,
            _ => Err(DavError::MethodNotAllowed(request.method.clone())),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    DavError::BadRequest(_) => {
                        warn!("Bad {} request on {path:?}: {err}", request.method);
                    }
                    DavError::Timeout => debug!("Client timed out"),
                    DavError::Internal(_) => error!(
                        "An exception occurred during {} request on {path:?}: {err}",
                        request.method
                    ),
                    _ => debug!("{} request on {path:?} failed: {err}", request.method),
                }
                err.into_response(request.user.as_deref(), &self.config.realm)
            }
        };
        info!(
            "{} response status for {path:?}: {}",
            request.method,
            response.status()
        );
        response
    }

    /// Read a request body, giving up after the configured timeout.
    ///
    /// Returns `None` for an empty body.
    pub(crate) async fn read_body<B>(&self, body: &mut B) -> Result<Option<String>>
    where
        B: AsyncRead + Unpin + Send,
    {
        let limit = self.config.max_content_length;
        let mut content = Vec::new();
        timeout(
            self.config.request_timeout(),
            body.take(limit.saturating_add(1)).read_to_end(&mut content),
        )
        .await
        .map_err(|_| DavError::Timeout)??;

        if u64::try_from(content.len()).unwrap_or(u64::MAX) > limit {
            return Err(DavError::BadRequest(format!(
                "request body exceeds {limit} bytes"
            )));
        }
        if content.is_empty() {
            return Ok(None);
        }
        String::from_utf8(content)
            .map(Some)
            .map_err(|err| DavError::BadRequest(format!("request body is not utf-8: {err}")))
    }
}
