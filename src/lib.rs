//! portal-notify: notification bell sync for the student/teacher portal.
//!
//! Re-exports modules needed by the binary and by integration tests in `tests/`.

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod render;
pub mod store;
pub mod sync;

pub use models::notification::{NewNotification, Notification, NotificationKind};
pub use store::{NotificationStore, StoreError};
pub use sync::{NotificationSync, SyncSnapshot, SyncStats};
