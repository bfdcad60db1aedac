mod client;
mod notes;
mod notifier;
mod settings;
mod types;

pub use notifier::{FailureLog, IssueNotifier};
