// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use davcore::config::ServerConfig;
use davcore::hook::{ChannelHook, HookNotificationItem};
use davcore::rights::RightsBackend;
use davcore::storage::folder::parse_item;
use davcore::xmlutils::parse_statusline;
use davcore::{names, Application, MemoryStore, PropertyName};
use http::{Response, StatusCode};
use tokio::sync::mpsc::UnboundedReceiver;

pub type TestApp = Application<MemoryStore, RightsBackend, ChannelHook>;

pub fn event(uid: &str, summary: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//davcore//tests//EN\r\nBEGIN:VEVENT\r\nUID:{uid}\r\nDTSTAMP:20240301T090000Z\r\nDTSTART:20240302T090000Z\r\nSUMMARY:{summary}\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
    )
}

pub fn card(uid: &str, name: &str) -> String {
    format!("BEGIN:VCARD\r\nVERSION:3.0\r\nUID:{uid}\r\nFN:{name}\r\nEND:VCARD\r\n")
}

fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect()
}

/// Two users, each with a calendar; alice also has an address book and a plain collection.
pub fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    let modified = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

    store.create_collection("/alice/", BTreeMap::new());
    store.create_collection(
        "/alice/calendar/",
        meta(&[("tag", "VCALENDAR"), ("D:displayname", "Work")]),
    );
    store.create_collection("/alice/contacts/", meta(&[("tag", "VADDRESSBOOK")]));
    store.create_collection("/alice/plain/", BTreeMap::new());
    store.create_collection("/bob/calendar/", meta(&[("tag", "VCALENDAR")]));

    for (uid, summary) in [("meeting", "Meeting"), ("lunch", "Lunch"), ("review", "Review")] {
        let href = format!("{uid}.ics");
        let item = parse_item(&href, event(uid, summary).into_bytes(), modified);
        store.upload("alice/calendar", &href, item).unwrap();
    }
    let item = parse_item("carol.vcf", card("carol", "Carol").into_bytes(), modified);
    store.upload("alice/contacts", "carol.vcf", item).unwrap();
    let item = parse_item("bobs.ics", event("bobs", "Bob's").into_bytes(), modified);
    store.upload("bob/calendar", "bobs.ics", item).unwrap();
    store
}

pub fn app_with(
    config: ServerConfig,
    rights: RightsBackend,
) -> (TestApp, UnboundedReceiver<HookNotificationItem>) {
    let (hook, receiver) = ChannelHook::new();
    (Application::new(config, store(), rights, hook), receiver)
}

pub fn app() -> (TestApp, UnboundedReceiver<HookNotificationItem>) {
    app_with(ServerConfig::default(), RightsBackend::OwnerOnly)
}

pub fn drain(receiver: &mut UnboundedReceiver<HookNotificationItem>) -> Vec<HookNotificationItem> {
    let mut items = Vec::new();
    while let Ok(item) = receiver.try_recv() {
        items.push(item);
    }
    items
}

/// An owned copy of an element from a response.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: PropertyName,
    pub text: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    fn from_xml(node: roxmltree::Node<'_, '_>) -> Node {
        Node {
            name: PropertyName::from(node.tag_name()),
            text: node.text().map(str::to_string).filter(|t| !t.trim().is_empty()),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            children: node
                .children()
                .filter(roxmltree::Node::is_element)
                .map(Node::from_xml)
                .collect(),
        }
    }

    pub fn child_names(&self) -> Vec<PropertyName> {
        self.children.iter().map(|c| c.name.clone()).collect()
    }

    /// Text of the `href` child.
    pub fn href(&self) -> Option<&str> {
        self.children
            .iter()
            .find(|c| c.name == names::HREF)
            .and_then(|c| c.text.as_deref())
    }
}

/// A `response` entry of a multistatus document.
#[derive(Debug, Clone)]
pub struct Entry {
    pub href: String,
    pub propstats: Vec<(StatusCode, Vec<Node>)>,
    pub status: Option<StatusCode>,
}

impl Entry {
    pub fn props(&self, status: StatusCode) -> Vec<Node> {
        self.propstats
            .iter()
            .filter(|(s, _)| *s == status)
            .flat_map(|(_, props)| props.clone())
            .collect()
    }

    pub fn names(&self, status: StatusCode) -> Vec<PropertyName> {
        self.props(status).into_iter().map(|p| p.name).collect()
    }

    pub fn prop(&self, name: &PropertyName) -> Option<Node> {
        self.props(StatusCode::OK).into_iter().find(|p| &p.name == name)
    }

    pub fn text(&self, name: &PropertyName) -> Option<String> {
        self.prop(name).and_then(|p| p.text)
    }
}

fn status_of(node: roxmltree::Node<'_, '_>) -> Option<StatusCode> {
    node.children()
        .find(|c| names::STATUS == c.tag_name())
        .and_then(|c| c.text())
        .and_then(|text| parse_statusline(text).ok())
}

/// Parse a multistatus body.
pub fn parse_multistatus(body: &str) -> Vec<Entry> {
    let doc = roxmltree::Document::parse(body).unwrap();
    let root = doc.root_element();
    assert!(names::MULTISTATUS == root.tag_name());
    root.children()
        .filter(|n| names::RESPONSE == n.tag_name())
        .map(|response| Entry {
            href: response
                .children()
                .find(|c| names::HREF == c.tag_name())
                .and_then(|c| c.text())
                .unwrap()
                .to_string(),
            propstats: response
                .children()
                .filter(|c| names::PROPSTAT == c.tag_name())
                .map(|propstat| {
                    let props = propstat
                        .children()
                        .find(|c| names::PROP == c.tag_name())
                        .map(|prop| {
                            prop.children()
                                .filter(roxmltree::Node::is_element)
                                .map(Node::from_xml)
                                .collect()
                        })
                        .unwrap_or_default();
                    (status_of(propstat).unwrap(), props)
                })
                .collect(),
            status: status_of(response),
        })
        .collect()
}

/// Parse the body of a successful multistatus response.
pub fn entries(response: &Response<String>) -> Vec<Entry> {
    assert!(
        response.status() == StatusCode::MULTI_STATUS || response.status() == StatusCode::OK,
        "unexpected status {}: {}",
        response.status(),
        response.body()
    );
    parse_multistatus(response.body())
}
