mod styling;

use styling::{bright_green, bright_red, dim, magenta_bold};

pub use styling::cyan;

/// Prints the `redmine-notify` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔔 redmine-notify"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Build results for Redmine issues")
    );
}

/// Success line once the build has been handled.
pub fn print_success(build_id: u64) {
    eprintln!(
        "{} Build {} reported to Redmine",
        bright_green("✓"),
        cyan(build_id)
    );
}

/// Failure line for an update that did not go through.
pub fn print_failure(message: &str) {
    eprintln!("{} {}", bright_red("✗"), message);
}
