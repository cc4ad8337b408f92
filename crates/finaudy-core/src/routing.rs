// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notification click routing.
//
// Pure mapping from a normalized notification to the in-app destination.
// The caller performs the navigation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::notification::NotificationPayload;

/// In-app destinations a notification can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Root,
    Sharing,
    Reminders,
    Subscriptions,
    Budgets,
    Installments,
    Notifications,
}

impl View {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Sharing => "/sharing",
            Self::Reminders => "/reminders",
            Self::Subscriptions => "/subscriptions",
            Self::Budgets => "/budgets",
            Self::Installments => "/installments",
            Self::Notifications => "/notifications",
        }
    }

    /// Hash route used by the web build (`/#budgets`). The root and the
    /// notification list both resolve to `/` there.
    fn web_fragment(&self) -> Option<&'static str> {
        match self {
            Self::Sharing => Some("sharing"),
            Self::Reminders => Some("reminders"),
            Self::Subscriptions => Some("subscriptions"),
            Self::Budgets => Some("budgets"),
            Self::Installments => Some("installments"),
            Self::Root | Self::Notifications => None,
        }
    }
}

/// Where a notification click should take the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub view: View,
    pub query: BTreeMap<String, String>,
}

impl RouteTarget {
    pub fn new(view: View) -> Self {
        Self {
            view,
            query: BTreeMap::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn path(&self) -> &'static str {
        self.view.path()
    }

    /// Path plus encoded query string, e.g. `/budgets?category=42`.
    pub fn to_location(&self) -> String {
        let mut location = self.path().to_string();
        append_query(&mut location, &self.query);
        location
    }
}

impl std::fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_location())
    }
}

fn view_for_kind(kind: Option<&str>) -> View {
    match kind {
        Some("sharing_invite" | "sharing_accepted") => View::Sharing,
        Some("bill_reminder" | "reminder") => View::Reminders,
        Some("subscription" | "subscription_renewal" | "overdue_subscription") => {
            View::Subscriptions
        }
        Some("budget_exceeded") => View::Budgets,
        Some("transaction") => View::Root,
        Some("installment" | "overdue_installment") => View::Installments,
        _ => View::Notifications,
    }
}

/// Map a notification to its destination. Total: unknown or missing types
/// go to the notification list.
pub fn route_notification(payload: &NotificationPayload) -> RouteTarget {
    let view = view_for_kind(payload.kind());
    let target = RouteTarget::new(view);
    match (view, payload.field("category_id")) {
        (View::Budgets, Some(category)) => target.with_query("category", category),
        _ => target,
    }
}

/// Location for a click handled by the service worker in the web build.
///
/// Returns `None` when the user pressed the dismiss action. Unknown types
/// open the app root, as the web build has no notification list route.
pub fn web_location(payload: &NotificationPayload) -> Option<String> {
    if payload.action.as_deref() == Some("dismiss") {
        return None;
    }
    let target = route_notification(payload);
    let location = match target.view.web_fragment() {
        Some(fragment) => {
            let mut location = format!("/#{fragment}");
            append_query(&mut location, &target.query);
            location
        }
        None => "/".to_string(),
    };
    Some(location)
}

fn append_query(location: &mut String, query: &BTreeMap<String, String>) {
    for (i, (name, value)) in query.iter().enumerate() {
        location.push(if i == 0 { '?' } else { '&' });
        location.push_str(&urlencoding::encode(name));
        location.push('=');
        location.push_str(&urlencoding::encode(value));
    }
}
