//! Terminal rendering of the bell and its dropdown.
//!
//! Pure functions over a [`SyncSnapshot`]; nothing here touches the store.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::models::notification::NotificationKind;
use crate::sync::SyncSnapshot;

/// Glyph and ANSI color used for a notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub icon: &'static str,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Blue,
    Purple,
    Green,
    Yellow,
    Indigo,
    Orange,
    Gray,
}

impl Color {
    fn ansi(&self) -> &'static str {
        match self {
            Color::Blue => "\x1b[34m",
            Color::Purple => "\x1b[35m",
            Color::Green => "\x1b[32m",
            Color::Yellow => "\x1b[33m",
            Color::Indigo => "\x1b[94m",
            Color::Orange => "\x1b[91m",
            Color::Gray => "\x1b[90m",
        }
    }
}

const RESET: &str = "\x1b[0m";

pub fn presentation(kind: NotificationKind) -> Presentation {
    let (icon, color) = match kind {
        NotificationKind::Assignment => ("📝", Color::Blue),
        NotificationKind::Test => ("📋", Color::Purple),
        NotificationKind::Submission => ("📤", Color::Green),
        NotificationKind::Grade => ("🏆", Color::Yellow),
        NotificationKind::CourseMaterial => ("📚", Color::Indigo),
        NotificationKind::TestCompletion => ("✅", Color::Orange),
        NotificationKind::Other => ("🔔", Color::Gray),
    };
    Presentation { icon, color }
}

/// Short relative age: "just now", "5m ago", "3h ago", "2d ago", then a date.
pub fn format_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(created_at);
    if age.num_minutes() < 1 {
        "just now".to_string()
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_days() < 1 {
        format!("{}h ago", age.num_hours())
    } else if age.num_days() < 7 {
        format!("{}d ago", age.num_days())
    } else {
        created_at.format("%Y-%m-%d").to_string()
    }
}

fn badge(count: usize) -> String {
    if count > 99 {
        "99+".to_string()
    } else {
        count.to_string()
    }
}

/// One-line bell: icon, unread badge, loading marker.
pub fn render_bell(snapshot: &SyncSnapshot) -> String {
    let mut line = String::from("🔔");
    if snapshot.unread_count > 0 {
        let _ = write!(line, " ({})", badge(snapshot.unread_count));
    }
    if snapshot.is_loading {
        line.push_str(" …");
    }
    line
}

/// Dropdown body, newest first, at most `limit` rows. `color` toggles ANSI escapes.
pub fn render_dropdown(
    snapshot: &SyncSnapshot,
    now: DateTime<Utc>,
    limit: usize,
    color: bool,
) -> String {
    if snapshot.notifications.is_empty() {
        return "No notifications".to_string();
    }

    let mut out = String::new();
    for n in snapshot.notifications.iter().take(limit) {
        let p = presentation(n.r#type);
        let marker = if n.is_read { ' ' } else { '•' };
        let age = format_age(n.created_at, now);
        if color {
            let _ = writeln!(
                out,
                "{} {}{}{} {} — {} ({})",
                marker,
                p.color.ansi(),
                p.icon,
                RESET,
                n.title,
                n.message,
                age
            );
        } else {
            let _ = writeln!(out, "{} {} {} — {} ({})", marker, p.icon, n.title, n.message, age);
        }
    }

    let hidden = snapshot.notifications.len().saturating_sub(limit);
    if hidden > 0 {
        let _ = writeln!(out, "  … {} more", hidden);
    }
    out
}
