use clap::{Parser, Subcommand};
use uuid::Uuid;

use portal_notify::NotificationKind;

/// portal-notify: notification bell for the student/teacher portal
#[derive(Parser)]
#[command(name = "portal-notify", version, about)]
pub struct Cli {
    /// Base URL of the notification store
    #[arg(long, global = true, env = "PORTAL_STORE_URL")]
    pub store_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve an in-memory notification store for local development
    Serve {
        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Keep the bell in sync and print it whenever it changes
    Watch {
        #[arg(long)]
        user: Uuid,
        /// Poll interval in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
        /// Rows shown in the dropdown
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
    },

    /// Print a user's notifications, newest first
    List {
        #[arg(long)]
        user: Uuid,
    },

    /// Print the store's unread count for a user
    Unread {
        #[arg(long)]
        user: Uuid,
    },

    /// Mark one notification as read
    Read { id: Uuid },

    /// Mark every notification of a user as read
    ReadAll {
        #[arg(long)]
        user: Uuid,
    },

    /// Create a notification
    Notify {
        #[arg(long)]
        user: Uuid,
        /// assignment, test, submission, grade, course_material, test_completion, other
        #[arg(long = "type", default_value = "other")]
        kind: NotificationKind,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        message: String,
    },
}
