pub mod history;
pub mod local;
pub mod notifier;
pub mod reminder;
pub mod stats;
pub mod store;

pub use history::{History, HISTORY_LIMIT};
pub use local::LocalBackend;
#[cfg(feature = "desktop")]
pub use notifier::DesktopNotifier;
pub use notifier::{default_notifier, LogNotifier, Notifier};
pub use store::JsonStore;
