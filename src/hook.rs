// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Change notifications.
//!
//! Every item affected by a mutation produces one [`HookNotificationItem`], which is handed to a
//! [`Hook`] while the store lock is still held. Delivery is fire-and-forget: a hook never fails
//! the request that triggered it.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::pathutils::strip_path;
use crate::storage::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookNotificationItemType {
    Cpatch,
    Upsert,
    Delete,
}

/// A single change notification.
///
/// Fields are declared in alphabetical order, which is the order in which they are serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookNotificationItem {
    content: Option<String>,
    context: Option<String>,
    point: String,
    #[serde(rename = "type")]
    kind: HookNotificationItemType,
}

/// The first two segments of a path, or an empty string if it has fewer.
fn notification_point(path: &str) -> String {
    let mut segments = strip_path(path).split('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(first), Some(second)) => format!("{first}/{second}"),
        _ => String::new(),
    }
}

impl HookNotificationItem {
    #[must_use]
    pub fn new(
        kind: HookNotificationItemType,
        path: &str,
        content: Option<String>,
        context: Option<String>,
    ) -> HookNotificationItem {
        HookNotificationItem {
            content,
            context,
            point: notification_point(path),
            kind,
        }
    }

    #[must_use]
    pub fn kind(&self) -> HookNotificationItemType {
        self.kind
    }

    /// Routing key: `user/collection`.
    #[must_use]
    pub fn point(&self) -> &str {
        &self.point
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Serialize as a JSON object with sorted keys and four-space indentation.
    ///
    /// # Errors
    ///
    /// Never in practice; serialization of these fields cannot fail.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// The notification transport.
pub trait Hook: Send + Sync {
    fn notify(&self, item: &HookNotificationItem);
}

impl<H: Hook + ?Sized> Hook for std::sync::Arc<H> {
    fn notify(&self, item: &HookNotificationItem) {
        (**self).notify(item);
    }
}

/// The built-in hooks selectable via configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookBackend {
    /// Discard notifications.
    #[default]
    None,
    /// Log every notification.
    Log,
}

impl Hook for HookBackend {
    fn notify(&self, item: &HookNotificationItem) {
        match self {
            HookBackend::None => {}
            HookBackend::Log => match item.to_json() {
                Ok(json) => info!("Hook notification: {json}"),
                Err(err) => warn!("Could not serialize hook notification: {err}"),
            },
        }
    }
}

/// Hands notifications over to an in-process consumer.
#[derive(Debug, Clone)]
pub struct ChannelHook {
    sender: UnboundedSender<HookNotificationItem>,
}

impl ChannelHook {
    /// Create a hook along with the receiving end of its channel.
    #[must_use]
    pub fn new() -> (ChannelHook, UnboundedReceiver<HookNotificationItem>) {
        let (sender, receiver) = unbounded_channel();
        (ChannelHook { sender }, receiver)
    }
}

impl Hook for ChannelHook {
    fn notify(&self, item: &HookNotificationItem) {
        if self.sender.send(item.clone()).is_err() {
            warn!("Hook receiver is gone, dropping notification for {}", item.point);
        }
    }
}

/// One `delete` notification per removed item, in removal order.
#[must_use]
pub fn delete_notifications(removed: &[Item], context: Option<&str>) -> Vec<HookNotificationItem> {
    removed
        .iter()
        .map(|item| {
            HookNotificationItem::new(
                HookNotificationItemType::Delete,
                &item.path(),
                Some(item.uid.clone()),
                context.map(str::to_string),
            )
        })
        .collect()
}

/// Hand every notification to `hook`, in order.
pub fn emit<H: Hook + ?Sized>(hook: &H, notifications: &[HookNotificationItem]) {
    for notification in notifications {
        hook.notify(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point() {
        assert_eq!(notification_point("/alice/calendar/event.ics"), "alice/calendar");
        assert_eq!(notification_point("/alice/calendar/"), "alice/calendar");
        assert_eq!(notification_point("/alice/"), "");
        assert_eq!(notification_point("/"), "");
        assert_eq!(notification_point(""), "");
    }

    #[test]
    fn test_to_json() {
        let item = HookNotificationItem::new(
            HookNotificationItemType::Delete,
            "/alice/calendar/",
            Some("uid-1".into()),
            None,
        );
        assert_eq!(
            item.to_json().unwrap(),
            "{\n    \"content\": \"uid-1\",\n    \"context\": null,\n    \"point\": \"alice/calendar\",\n    \"type\": \"delete\"\n}"
        );
    }

    #[test]
    fn test_channel_hook() {
        let (hook, mut receiver) = ChannelHook::new();
        let items = [
            HookNotificationItem::new(HookNotificationItemType::Upsert, "/a/b", None, None),
            HookNotificationItem::new(
                HookNotificationItemType::Cpatch,
                "/a/c",
                None,
                Some("ctx".into()),
            ),
        ];
        emit(&hook, &items);
        assert_eq!(receiver.try_recv().unwrap().point(), "a/b");
        let second = receiver.try_recv().unwrap();
        assert_eq!(second.kind(), HookNotificationItemType::Cpatch);
        assert_eq!(second.context(), Some("ctx"));
        assert!(receiver.try_recv().is_err());

        // A closed receiver does not fail notification.
        drop(receiver);
        hook.notify(&items[0]);
    }
}
