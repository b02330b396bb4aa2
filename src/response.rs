// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Multistatus documents.
use http::StatusCode;

use crate::error::Result;
use crate::names;
use crate::pathutils::unstrip_path;
use crate::props::{PropContext, PropFindMode, PropStatuses, PropertyResolver, RequestContext};
use crate::rights::Access;
use crate::storage::{Resource, StoreGuard};
use crate::xmlutils::{make_href, make_response, render_document, Element};

/// A group of properties sharing a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropStat {
    pub status: StatusCode,
    pub props: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Properties of the resource, one group per status.
    PropStats(Vec<PropStat>),
    /// Outcome of an operation on the resource.
    Status(StatusCode),
}

/// The entry for a single resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Quoted href, including the base prefix.
    pub href: String,
    pub body: ResponseBody,
}

impl Response {
    #[must_use]
    pub fn from_statuses(href: String, statuses: PropStatuses) -> Response {
        let propstats = statuses
            .into_iter()
            .filter(|(_, props)| !props.is_empty())
            .map(|(status, props)| PropStat { status, props })
            .collect();
        Response {
            href,
            body: ResponseBody::PropStats(propstats),
        }
    }

    fn to_element(&self) -> Element {
        let mut response =
            Element::new(names::RESPONSE).with_child(Element::with_text(names::HREF, &self.href));
        match &self.body {
            ResponseBody::PropStats(propstats) => {
                for propstat in propstats {
                    let mut prop = Element::new(names::PROP);
                    prop.children.clone_from(&propstat.props);
                    response.push(
                        Element::new(names::PROPSTAT)
                            .with_child(prop)
                            .with_child(status_element(propstat.status)),
                    );
                }
            }
            ResponseBody::Status(status) => response.push(status_element(*status)),
        }
        response
    }
}

fn status_element(status: StatusCode) -> Element {
    Element::with_text(names::STATUS, make_response(status))
}

/// A `multistatus` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiStatus {
    pub responses: Vec<Response>,
}

impl MultiStatus {
    /// A document with a single entry reporting `status` for `href`.
    #[must_use]
    pub fn single_status(href: String, status: StatusCode) -> MultiStatus {
        MultiStatus {
            responses: vec![Response {
                href,
                body: ResponseBody::Status(status),
            }],
        }
    }

    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut multistatus = Element::new(names::MULTISTATUS);
        for response in &self.responses {
            multistatus.push(response.to_element());
        }
        multistatus
    }

    /// Render as a full XML document.
    #[must_use]
    pub fn render(&self) -> String {
        render_document(&self.to_element())
    }
}

/// The href under which a resource is reported.
///
/// Collections always get a trailing slash; items are addressed inside their collection.
#[must_use]
pub fn resource_href(base_prefix: &str, resource: &Resource) -> String {
    let path = match resource {
        Resource::Collection(collection) => unstrip_path(&collection.path, true),
        Resource::Item(item) => unstrip_path(&item.path(), false),
    };
    make_href(base_prefix, &path)
}

/// Build the `PROPFIND` answer for resources the caller may access.
///
/// Entries appear in the order of `allowed`.
///
/// # Errors
///
/// If computing a property fails in storage.
pub fn assemble(
    resolver: &PropertyResolver,
    mode: &PropFindMode,
    request: &RequestContext<'_>,
    store: &dyn StoreGuard,
    allowed: impl IntoIterator<Item = (Resource, Access)>,
) -> Result<MultiStatus> {
    let mut multistatus = MultiStatus::default();
    for (resource, access) in allowed {
        let ctx = PropContext::new(request, &resource, access == Access::Write, store);
        let statuses = resolver.resolve(&ctx, mode)?;
        multistatus.responses.push(Response::from_statuses(
            resource_href(request.base_prefix, &resource),
            statuses,
        ));
    }
    Ok(multistatus)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::storage::{Collection, Item, ItemKind};
    use crate::xmlutils::parse_statusline;

    fn collection(path: &str) -> Arc<Collection> {
        Arc::new(Collection {
            path: path.into(),
            meta: BTreeMap::new(),
            is_principal: false,
            owner: None,
            etag: "\"c\"".into(),
            last_modified: String::new(),
            content_length: 0,
        })
    }

    #[test]
    fn test_resource_href() {
        let calendar = collection("alice/my calendar");
        assert_eq!(
            resource_href("/dav", &Resource::Collection(Arc::clone(&calendar))),
            "/dav/alice/my%20calendar/"
        );
        let item = Resource::Item(Item {
            collection: calendar,
            href: "event.ics".into(),
            uid: "event".into(),
            etag: String::new(),
            last_modified: String::new(),
            body: Vec::new(),
            kind: ItemKind::Contact,
        });
        assert_eq!(resource_href("", &item), "/alice/my%20calendar/event.ics");
        assert_eq!(resource_href("", &Resource::Collection(collection(""))), "/");
    }

    #[test]
    fn test_empty_groups_are_omitted() {
        let statuses = PropStatuses::from([
            (StatusCode::OK, vec![Element::new(names::GETETAG)]),
            (StatusCode::NOT_FOUND, Vec::new()),
        ]);
        let response = Response::from_statuses("/a/".into(), statuses);
        let ResponseBody::PropStats(propstats) = response.body else {
            panic!("expected propstats");
        };
        assert_eq!(propstats.len(), 1);
        assert_eq!(propstats[0].status, StatusCode::OK);
    }

    #[test]
    fn test_render() {
        let statuses = PropStatuses::from([
            (
                StatusCode::OK,
                vec![Element::with_text(names::GETETAG, "\"abc\"")],
            ),
            (StatusCode::NOT_FOUND, vec![Element::new(names::GETCTAG)]),
        ]);
        let multistatus = MultiStatus {
            responses: vec![
                Response::from_statuses("/alice/cal/".into(), statuses),
                Response {
                    href: "/alice/cal/gone.ics".into(),
                    body: ResponseBody::Status(StatusCode::OK),
                },
            ],
        };
        let rendered = multistatus.render();
        let doc = roxmltree::Document::parse(&rendered).unwrap();
        let root = doc.root_element();
        assert_eq!(names::MULTISTATUS, root.tag_name());

        let responses = root.children().filter(|n| n.is_element()).collect::<Vec<_>>();
        assert_eq!(responses.len(), 2);

        let propstats = responses[0]
            .children()
            .filter(|n| names::PROPSTAT == n.tag_name())
            .collect::<Vec<_>>();
        assert_eq!(propstats.len(), 2);
        let status = propstats[1]
            .children()
            .find(|n| names::STATUS == n.tag_name())
            .and_then(|n| n.text())
            .unwrap();
        assert_eq!(parse_statusline(status).unwrap(), StatusCode::NOT_FOUND);

        let href = responses[1]
            .children()
            .find(|n| names::HREF == n.tag_name())
            .and_then(|n| n.text());
        assert_eq!(href, Some("/alice/cal/gone.ics"));
        assert_eq!(
            responses[1]
                .children()
                .find(|n| names::STATUS == n.tag_name())
                .and_then(|n| n.text()),
            Some("HTTP/1.1 200 OK")
        );
    }
}
