// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Computing property values for discovered resources.
//!
//! Each supported property has a rule: a function that produces the property's element for a
//! resource, or `None` if the property does not apply to it. Rules are looked up in a table that
//! is built once by [`PropertyResolver::new`]. Properties without a rule are looked up in the
//! metadata of collections.
//!
//! Results are grouped by status: `200` for properties with a value and `404` for those without.

use std::collections::{BTreeMap, HashMap};

use http::StatusCode;

use crate::error::{DavError, Result};
use crate::names::{self, PropertyName};
use crate::shape::{ResourceShape, Tag};
use crate::storage::{Resource, StoreGuard, TAG};
use crate::xmlutils::{make_href, Element};

/// Components a calendar supports unless its metadata says otherwise.
pub const DEFAULT_COMPONENTS: [&str; 3] = ["VTODO", "VEVENT", "VJOURNAL"];

/// The body of a `PROPFIND` request, as sent by the client.
///
/// At most one of the three ways of requesting properties may be used at once; see
/// [`PropFindRequest::mode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropFindRequest {
    pub allprop: bool,
    pub propname: bool,
    pub props: Vec<PropertyName>,
}

/// What a `PROPFIND` request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropFindMode {
    /// Values of all properties in the catalog of each resource.
    AllProp,
    /// Names of all properties in the catalog of each resource.
    PropName,
    /// Values of exactly these properties, in this order.
    Props(Vec<PropertyName>),
}

impl PropFindRequest {
    /// The request used when the client sends no body.
    #[must_use]
    pub fn allprop() -> PropFindRequest {
        PropFindRequest {
            allprop: true,
            ..PropFindRequest::default()
        }
    }

    /// Validate the request and determine its mode.
    ///
    /// # Errors
    ///
    /// [`DavError::BadRequest`] if more than one mode is active.
    pub fn mode(self) -> Result<PropFindMode> {
        match (self.allprop, self.propname, self.props.is_empty()) {
            (true, false, true) => Ok(PropFindMode::AllProp),
            (false, true, true) => Ok(PropFindMode::PropName),
            (false, false, _) => Ok(PropFindMode::Props(self.props)),
            _ => Err(DavError::BadRequest(
                "only one of prop, propname and allprop may be used".into(),
            )),
        }
    }
}

/// Request-wide inputs to property computation.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub base_prefix: &'a str,
    /// Sanitized request path.
    pub path: &'a str,
    pub user: Option<&'a str>,
    pub encoding: &'a str,
}

/// Everything a rule may look at.
pub struct PropContext<'a> {
    pub request: &'a RequestContext<'a>,
    pub resource: &'a Resource,
    pub shape: ResourceShape,
    /// Whether the caller may write to the resource.
    pub write: bool,
    pub store: &'a dyn StoreGuard,
}

impl<'a> PropContext<'a> {
    #[must_use]
    pub fn new(
        request: &'a RequestContext<'a>,
        resource: &'a Resource,
        write: bool,
        store: &'a dyn StoreGuard,
    ) -> PropContext<'a> {
        PropContext {
            request,
            resource,
            shape: ResourceShape::classify(resource),
            write,
            store,
        }
    }

    fn href(&self, path: &str) -> Element {
        Element::with_text(names::HREF, make_href(self.request.base_prefix, path))
    }
}

type Rule = fn(&PropContext<'_>, &PropertyName) -> Result<Option<Element>>;

/// Property elements grouped by status, in ascending status order.
pub type PropStatuses = BTreeMap<StatusCode, Vec<Element>>;

/// Looks up and evaluates property rules.
pub struct PropertyResolver {
    rules: HashMap<PropertyName, Rule>,
}

impl Default for PropertyResolver {
    fn default() -> Self {
        PropertyResolver::new()
    }
}

impl PropertyResolver {
    #[must_use]
    pub fn new() -> PropertyResolver {
        let rules: [(PropertyName, Rule); 20] = [
            (names::GETETAG, getetag),
            (names::GETLASTMODIFIED, getlastmodified),
            (names::GETCONTENTLENGTH, getcontentlength),
            (names::GETCONTENTTYPE, getcontenttype),
            (names::PRINCIPAL_COLLECTION_SET, principal_collection_set),
            (names::CURRENT_USER_PRINCIPAL, current_user_principal),
            (names::CURRENT_USER_PRIVILEGE_SET, current_user_privilege_set),
            (names::SUPPORTED_REPORT_SET, supported_report_set),
            (names::OWNER, owner),
            (names::RESOURCETYPE, resourcetype),
            (names::DISPLAY_NAME, displayname),
            (names::INTERNAL_DISPLAY_NAME, internal_displayname),
            (names::GETCTAG, getctag),
            (names::SYNC_TOKEN, sync_token),
            (
                names::SUPPORTED_CALENDAR_COMPONENT_SET,
                supported_calendar_component_set,
            ),
            (names::CALENDAR_USER_ADDRESS_SET, principal_identity),
            (names::PRINCIPAL_URL, principal_identity),
            (names::ADDRESSBOOK_HOME_SET, principal_identity),
            (names::CALENDAR_HOME_SET, principal_identity),
            // Never stored as metadata.
            (PropertyName::from_static("", TAG), |_, _| Ok(None)),
        ];
        PropertyResolver {
            rules: rules.into_iter().collect(),
        }
    }

    /// Compute a single property. `None` means it does not exist on this resource.
    ///
    /// # Errors
    ///
    /// If storage fails to compute a sync token.
    pub fn evaluate(&self, ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
        match self.rules.get(name) {
            Some(rule) => rule(ctx, name),
            None => Ok(metadata(ctx, name)),
        }
    }

    /// Compute the properties requested by `mode` for one resource.
    ///
    /// # Errors
    ///
    /// If storage fails to compute a sync token.
    pub fn resolve(&self, ctx: &PropContext<'_>, mode: &PropFindMode) -> Result<PropStatuses> {
        let mut statuses = PropStatuses::new();
        let requested = match mode {
            PropFindMode::PropName => {
                let elements = catalog(ctx.shape, ctx.resource)
                    .into_iter()
                    .map(Element::new)
                    .collect::<Vec<_>>();
                if !elements.is_empty() {
                    statuses.insert(StatusCode::OK, elements);
                }
                return Ok(statuses);
            }
            PropFindMode::AllProp => catalog(ctx.shape, ctx.resource),
            PropFindMode::Props(props) => props.clone(),
        };

        for name in requested {
            let (status, element) = match self.evaluate(ctx, &name)? {
                Some(element) => (StatusCode::OK, element),
                None => (StatusCode::NOT_FOUND, Element::new(name)),
            };
            statuses.entry(status).or_default().push(element);
        }
        Ok(statuses)
    }
}

/// All properties that can be computed for a resource, in reporting order.
#[must_use]
pub fn catalog(shape: ResourceShape, resource: &Resource) -> Vec<PropertyName> {
    let mut props = vec![
        names::PRINCIPAL_COLLECTION_SET,
        names::CURRENT_USER_PRINCIPAL,
        names::CURRENT_USER_PRIVILEGE_SET,
        names::SUPPORTED_REPORT_SET,
        names::RESOURCETYPE,
        names::OWNER,
    ];
    if shape.is_collection() && shape.is_principal {
        props.extend([
            names::CALENDAR_USER_ADDRESS_SET,
            names::PRINCIPAL_URL,
            names::ADDRESSBOOK_HOME_SET,
            names::CALENDAR_HOME_SET,
        ]);
    }
    if shape.is_content_bearing() {
        props.extend([
            names::GETETAG,
            names::GETLASTMODIFIED,
            names::GETCONTENTTYPE,
            names::GETCONTENTLENGTH,
        ]);
    }
    if shape.is_leaf() {
        props.extend([names::DISPLAY_NAME, names::SYNC_TOKEN]);
    }
    if shape.tag() == Some(Tag::Calendar) {
        props.extend([names::GETCTAG, names::SUPPORTED_CALENDAR_COMPONENT_SET]);
    }
    if let Resource::Collection(collection) = resource {
        for key in collection.meta.keys().filter(|key| key.as_str() != TAG) {
            let name = PropertyName::from_human(key);
            if !props.contains(&name) {
                props.push(name);
            }
        }
    }
    props
}

fn metadata(ctx: &PropContext<'_>, name: &PropertyName) -> Option<Element> {
    match ctx.resource {
        Resource::Collection(collection) => collection
            .get_meta(&name.human())
            .map(|value| Element::with_text(name.clone(), value)),
        Resource::Item(_) => None,
    }
}

fn getetag(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    Ok(ctx
        .shape
        .is_content_bearing()
        .then(|| Element::with_text(name.clone(), ctx.resource.etag())))
}

fn getlastmodified(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    Ok(ctx
        .shape
        .is_content_bearing()
        .then(|| Element::with_text(name.clone(), ctx.resource.last_modified())))
}

fn getcontentlength(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    let length = match ctx.resource {
        Resource::Item(item) => item.body.len(),
        Resource::Collection(collection) if ctx.shape.is_leaf() => collection.content_length,
        Resource::Collection(_) => return Ok(None),
    };
    Ok(Some(Element::with_text(name.clone(), length.to_string())))
}

fn getcontenttype(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    let content_type = match (ctx.resource, ctx.shape.tag()) {
        (Resource::Item(item), _) => item.kind.content_type(ctx.request.encoding),
        (Resource::Collection(_), Some(tag)) => tag.mime_type().to_string(),
        (Resource::Collection(_), None) => return Ok(None),
    };
    Ok(Some(Element::with_text(name.clone(), content_type)))
}

fn principal_collection_set(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    Ok(Some(Element::with_href(
        name.clone(),
        make_href(ctx.request.base_prefix, "/"),
    )))
}

fn current_user_principal(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    let child = match ctx.request.user {
        Some(user) => ctx.href(&format!("/{user}/")),
        None => Element::new(names::UNAUTHENTICATED),
    };
    Ok(Some(Element::new(name.clone()).with_child(child)))
}

fn current_user_privilege_set(
    ctx: &PropContext<'_>,
    name: &PropertyName,
) -> Result<Option<Element>> {
    let mut privileges = vec![names::READ];
    if ctx.write {
        privileges.extend([
            names::ALL,
            names::WRITE,
            names::WRITE_PROPERTIES,
            names::WRITE_CONTENT,
        ]);
    }
    let mut element = Element::new(name.clone());
    for privilege in privileges {
        element.push(Element::new(names::PRIVILEGE).with_child(Element::new(privilege)));
    }
    Ok(Some(element))
}

fn supported_report_set(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    // Advertised, but not implemented.
    let mut reports = vec![
        names::EXPAND_PROPERTY,
        names::PRINCIPAL_SEARCH_PROPERTY_SET,
        names::PRINCIPAL_PROPERTY_SEARCH,
    ];
    match ctx.shape.tag() {
        Some(Tag::AddressBook) => reports.extend([
            names::SYNC_COLLECTION,
            names::ADDRESSBOOK_MULTIGET,
            names::ADDRESSBOOK_QUERY,
        ]),
        Some(Tag::Calendar) => reports.extend([
            names::SYNC_COLLECTION,
            names::CALENDAR_MULTIGET,
            names::CALENDAR_QUERY,
        ]),
        None => {}
    }
    let mut element = Element::new(name.clone());
    for report in reports {
        element.push(
            Element::new(names::SUPPORTED_REPORT)
                .with_child(Element::new(names::REPORT).with_child(Element::new(report))),
        );
    }
    Ok(Some(element))
}

fn owner(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    // rfc3744-5.1: an empty element if there is no owner.
    let mut element = Element::new(name.clone());
    if let Some(owner) = ctx
        .resource
        .collection()
        .owner
        .as_deref()
        .filter(|owner| !owner.is_empty())
    {
        element.push(ctx.href(&format!("/{owner}/")));
    }
    Ok(Some(element))
}

fn resourcetype(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    let mut element = Element::new(name.clone());
    if ctx.shape.is_collection() {
        if ctx.shape.is_principal {
            element.push(Element::new(names::PRINCIPAL));
        }
        match ctx.shape.tag() {
            Some(Tag::AddressBook) => element.push(Element::new(names::ADDRESSBOOK)),
            Some(Tag::Calendar) => element.push(Element::new(names::CALENDAR)),
            None => {}
        }
        element.push(Element::new(names::COLLECTION));
    }
    Ok(Some(element))
}

fn displayname(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    let Resource::Collection(collection) = ctx.resource else {
        return Ok(None);
    };
    let stored = collection.get_meta(&names::DISPLAY_NAME.human());
    let displayname = match stored {
        None | Some("") if ctx.shape.is_leaf() => Some(collection.path.as_str()),
        stored => stored,
    };
    Ok(displayname.map(|value| Element::with_text(name.clone(), value)))
}

fn internal_displayname(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    Ok(match ctx.resource {
        Resource::Collection(collection) => collection
            .get_meta(&names::DISPLAY_NAME.human())
            .map(|value| Element::with_text(name.clone(), value)),
        Resource::Item(_) => None,
    })
}

fn getctag(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    Ok((ctx.shape.tag() == Some(Tag::Calendar))
        .then(|| Element::with_text(name.clone(), ctx.resource.etag())))
}

fn sync_token(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    match ctx.resource {
        Resource::Collection(collection) if ctx.shape.is_leaf() => {
            let (token, _) = ctx.store.sync(collection, None)?;
            Ok(Some(Element::with_text(name.clone(), token)))
        }
        _ => Ok(None),
    }
}

fn supported_calendar_component_set(
    ctx: &PropContext<'_>,
    name: &PropertyName,
) -> Result<Option<Element>> {
    let Resource::Collection(collection) = ctx.resource else {
        return Ok(None);
    };
    if !ctx.shape.is_leaf() {
        return Ok(None);
    }
    let stored = collection
        .get_meta(&name.human())
        .filter(|components| !components.is_empty());
    let components = match stored {
        Some(components) => components
            .split(',')
            .map(str::trim)
            .filter(|component| !component.is_empty())
            .collect::<Vec<_>>(),
        None => DEFAULT_COMPONENTS.to_vec(),
    };
    let mut element = Element::new(name.clone());
    for component in components {
        element.push(Element::new(names::COMP).with_attribute("name", component));
    }
    Ok(Some(element))
}

/// Home sets and principal url, which all point to the principal itself.
fn principal_identity(ctx: &PropContext<'_>, name: &PropertyName) -> Result<Option<Element>> {
    if ctx.shape.is_collection() && ctx.shape.is_principal {
        Ok(Some(
            Element::new(name.clone()).with_child(ctx.href(ctx.request.path)),
        ))
    } else {
        Ok(metadata(ctx, name))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::storage::{Collection, Depth, Item, ItemKind, StorageError};

    /// A store that only knows how to compute sync tokens.
    struct FixedSync;

    impl StoreGuard for FixedSync {
        fn discover(&self, _: &str, _: Depth) -> std::result::Result<Vec<Resource>, StorageError> {
            Ok(Vec::new())
        }

        fn sync(
            &self,
            collection: &Collection,
            _: Option<&str>,
        ) -> std::result::Result<(String, Vec<String>), StorageError> {
            Ok((format!("token-{}", collection.path), Vec::new()))
        }

        fn delete(
            &mut self,
            _: &Collection,
            _: Option<&str>,
        ) -> std::result::Result<Vec<Item>, StorageError> {
            Err(StorageError::ReadOnlyLock)
        }
    }

    fn collection(path: &str, meta: &[(&str, &str)]) -> Arc<Collection> {
        Arc::new(Collection {
            path: path.into(),
            meta: meta
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
            is_principal: !path.is_empty() && !path.contains('/'),
            owner: path.split('/').next().filter(|o| !o.is_empty()).map(str::to_string),
            etag: format!("\"etag-{path}\""),
            last_modified: "Fri, 01 Mar 2024 09:05:00 GMT".into(),
            content_length: 42,
        })
    }

    fn calendar() -> Resource {
        Resource::Collection(collection(
            "alice/work",
            &[("tag", "VCALENDAR"), ("D:displayname", "Work")],
        ))
    }

    fn item() -> Resource {
        Resource::Item(Item {
            collection: collection("alice/work", &[("tag", "VCALENDAR")]),
            href: "event.ics".into(),
            uid: "event".into(),
            etag: "\"item\"".into(),
            last_modified: "Fri, 01 Mar 2024 09:05:00 GMT".into(),
            body: b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".to_vec(),
            kind: ItemKind::Calendar {
                component: Some("VEVENT".into()),
            },
        })
    }

    const REQUEST: RequestContext<'static> = RequestContext {
        base_prefix: "",
        path: "/alice/",
        user: Some("alice"),
        encoding: "utf-8",
    };

    fn resolve(resource: &Resource, mode: &PropFindMode) -> PropStatuses {
        let store = FixedSync;
        let ctx = PropContext::new(&REQUEST, resource, true, &store);
        PropertyResolver::new().resolve(&ctx, mode).unwrap()
    }

    fn names_in(statuses: &PropStatuses, status: StatusCode) -> Vec<PropertyName> {
        statuses
            .get(&status)
            .map(|elements| elements.iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    fn text_of(statuses: &PropStatuses, name: &PropertyName) -> Option<String> {
        statuses[&StatusCode::OK]
            .iter()
            .find(|e| &e.name == name)
            .and_then(|e| e.text.clone())
    }

    #[test]
    fn test_mode() {
        assert_eq!(PropFindRequest::allprop().mode().unwrap(), PropFindMode::AllProp);
        let both = PropFindRequest {
            allprop: true,
            propname: true,
            props: Vec::new(),
        };
        assert!(matches!(both.mode(), Err(DavError::BadRequest(_))));
        let with_list = PropFindRequest {
            allprop: false,
            propname: true,
            props: vec![names::GETETAG],
        };
        assert!(matches!(with_list.mode(), Err(DavError::BadRequest(_))));
        let list = PropFindRequest {
            props: vec![names::GETETAG],
            ..PropFindRequest::default()
        };
        assert_eq!(list.mode().unwrap(), PropFindMode::Props(vec![names::GETETAG]));
    }

    #[test]
    fn test_allprop_on_calendar() {
        let statuses = resolve(&calendar(), &PropFindMode::AllProp);
        assert!(names_in(&statuses, StatusCode::NOT_FOUND).is_empty());
        assert_eq!(text_of(&statuses, &names::DISPLAY_NAME).as_deref(), Some("Work"));
        assert_eq!(
            text_of(&statuses, &names::GETCTAG).as_deref(),
            Some("\"etag-alice/work\"")
        );
        assert_eq!(
            text_of(&statuses, &names::SYNC_TOKEN).as_deref(),
            Some("token-alice/work")
        );
        assert_eq!(
            text_of(&statuses, &names::GETCONTENTTYPE).as_deref(),
            Some("text/calendar")
        );
        let components = statuses[&StatusCode::OK]
            .iter()
            .find(|e| e.name == names::SUPPORTED_CALENDAR_COMPONENT_SET)
            .unwrap();
        let components = components
            .children
            .iter()
            .map(|c| c.attributes[0].1.as_str())
            .collect::<Vec<_>>();
        assert_eq!(components, DEFAULT_COMPONENTS);

        // Stored displayname is not repeated by the metadata pass.
        let ok = names_in(&statuses, StatusCode::OK);
        assert_eq!(ok.iter().filter(|n| **n == names::DISPLAY_NAME).count(), 1);
        assert_eq!(ok[..6], [
            names::PRINCIPAL_COLLECTION_SET,
            names::CURRENT_USER_PRINCIPAL,
            names::CURRENT_USER_PRIVILEGE_SET,
            names::SUPPORTED_REPORT_SET,
            names::RESOURCETYPE,
            names::OWNER,
        ]);
    }

    #[test]
    fn test_content_properties_on_plain_collection() {
        let plain = Resource::Collection(collection("alice/stuff", &[]));
        let props = vec![
            names::GETETAG,
            names::GETLASTMODIFIED,
            names::GETCONTENTLENGTH,
            names::GETCONTENTTYPE,
            names::RESOURCETYPE,
        ];
        let statuses = resolve(&plain, &PropFindMode::Props(props));
        assert_eq!(
            names_in(&statuses, StatusCode::NOT_FOUND),
            [
                names::GETETAG,
                names::GETLASTMODIFIED,
                names::GETCONTENTLENGTH,
                names::GETCONTENTTYPE
            ]
        );
        assert_eq!(names_in(&statuses, StatusCode::OK), [names::RESOURCETYPE]);

        let allprop = resolve(&plain, &PropFindMode::AllProp);
        assert!(!allprop.contains_key(&StatusCode::NOT_FOUND));
        assert!(!names_in(&allprop, StatusCode::OK).contains(&names::GETETAG));
    }

    #[test]
    fn test_item_properties() {
        let statuses = resolve(
            &item(),
            &PropFindMode::Props(vec![
                names::GETCONTENTTYPE,
                names::GETCONTENTLENGTH,
                names::RESOURCETYPE,
                names::DISPLAY_NAME,
                names::CALENDAR_HOME_SET,
            ]),
        );
        assert_eq!(
            text_of(&statuses, &names::GETCONTENTTYPE).as_deref(),
            Some("text/calendar;charset=utf-8;component=vevent")
        );
        assert_eq!(text_of(&statuses, &names::GETCONTENTLENGTH).as_deref(), Some("32"));
        let resourcetype = statuses[&StatusCode::OK]
            .iter()
            .find(|e| e.name == names::RESOURCETYPE)
            .unwrap();
        assert!(resourcetype.children.is_empty());
        assert_eq!(
            names_in(&statuses, StatusCode::NOT_FOUND),
            [names::DISPLAY_NAME, names::CALENDAR_HOME_SET]
        );
    }

    #[test]
    fn test_principal_properties() {
        let principal = Resource::Collection(collection("alice", &[]));
        let statuses = resolve(&principal, &PropFindMode::AllProp);
        let home = statuses[&StatusCode::OK]
            .iter()
            .find(|e| e.name == names::CALENDAR_HOME_SET)
            .unwrap();
        assert_eq!(home.children[0].text.as_deref(), Some("/alice/"));
        let resourcetype = statuses[&StatusCode::OK]
            .iter()
            .find(|e| e.name == names::RESOURCETYPE)
            .unwrap();
        let kinds = resourcetype
            .children
            .iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();
        assert_eq!(kinds, [names::PRINCIPAL, names::COLLECTION]);

        // Not a principal: the identity properties are missing.
        let statuses = resolve(
            &calendar(),
            &PropFindMode::Props(vec![names::PRINCIPAL_URL]),
        );
        assert_eq!(names_in(&statuses, StatusCode::NOT_FOUND), [names::PRINCIPAL_URL]);
    }

    #[test]
    fn test_owner_and_privileges() {
        let root = Resource::Collection(collection("", &[]));
        let store = FixedSync;
        let ctx = PropContext::new(&REQUEST, &root, false, &store);
        let resolver = PropertyResolver::new();

        let owner = resolver.evaluate(&ctx, &names::OWNER).unwrap().unwrap();
        assert!(owner.children.is_empty());

        let privileges = resolver
            .evaluate(&ctx, &names::CURRENT_USER_PRIVILEGE_SET)
            .unwrap()
            .unwrap();
        assert_eq!(privileges.children.len(), 1);
        assert_eq!(privileges.children[0].children[0].name, names::READ);

        let ctx = PropContext::new(&REQUEST, &root, true, &store);
        let privileges = resolver
            .evaluate(&ctx, &names::CURRENT_USER_PRIVILEGE_SET)
            .unwrap()
            .unwrap();
        assert_eq!(privileges.children.len(), 5);
    }

    #[test]
    fn test_displayname_fallbacks() {
        let unnamed = Resource::Collection(collection("alice/contacts", &[("tag", "VADDRESSBOOK")]));
        let statuses = resolve(
            &unnamed,
            &PropFindMode::Props(vec![
                names::DISPLAY_NAME,
                names::INTERNAL_DISPLAY_NAME,
                names::GETCTAG,
            ]),
        );
        assert_eq!(
            text_of(&statuses, &names::DISPLAY_NAME).as_deref(),
            Some("alice/contacts")
        );
        assert_eq!(
            names_in(&statuses, StatusCode::NOT_FOUND),
            [names::INTERNAL_DISPLAY_NAME, names::GETCTAG]
        );

        let plain = Resource::Collection(collection("alice/stuff", &[]));
        let statuses = resolve(&plain, &PropFindMode::Props(vec![names::DISPLAY_NAME]));
        assert_eq!(names_in(&statuses, StatusCode::NOT_FOUND), [names::DISPLAY_NAME]);
    }

    #[test]
    fn test_metadata_properties() {
        let colour = PropertyName::new(names::APPLE, "calendar-color");
        let resource = Resource::Collection(collection(
            "alice/work",
            &[
                ("tag", "VCALENDAR"),
                ("ICAL:calendar-color", "#ff0000"),
                ("C:supported-calendar-component-set", "VEVENT,VTODO"),
            ],
        ));
        let statuses = resolve(
            &resource,
            &PropFindMode::Props(vec![
                colour.clone(),
                PropertyName::new("http://example.com/", "missing"),
                PropertyName::from_static("", "tag"),
            ]),
        );
        assert_eq!(text_of(&statuses, &colour).as_deref(), Some("#ff0000"));
        assert_eq!(names_in(&statuses, StatusCode::NOT_FOUND).len(), 2);

        let propnames = resolve(&resource, &PropFindMode::PropName);
        let propnames = names_in(&propnames, StatusCode::OK);
        assert!(propnames.contains(&colour));
        assert_eq!(
            propnames
                .iter()
                .filter(|n| **n == names::SUPPORTED_CALENDAR_COMPONENT_SET)
                .count(),
            1
        );

        let components = resolve(
            &resource,
            &PropFindMode::Props(vec![names::SUPPORTED_CALENDAR_COMPONENT_SET]),
        );
        assert_eq!(components[&StatusCode::OK][0].children.len(), 2);
    }

    #[test]
    fn test_propname_has_no_values() {
        let statuses = resolve(&calendar(), &PropFindMode::PropName);
        assert_eq!(statuses.len(), 1);
        assert!(statuses[&StatusCode::OK]
            .iter()
            .all(|e| e.text.is_none() && e.children.is_empty()));
    }

    #[test]
    fn test_explicit_list_keeps_request_order() {
        let props = vec![names::OWNER, names::GETETAG, names::RESOURCETYPE];
        let statuses = resolve(&item(), &PropFindMode::Props(props.clone()));
        assert_eq!(names_in(&statuses, StatusCode::OK), props);
    }
}
