use url::form_urlencoded;

use crate::build::{BuildContext, BuildStatus};
use crate::config::Messages;

/// Link to the build detail page on the CI host.
pub fn build_link(ci_url: &str, build_id: u64) -> String {
    format!("{ci_url}/build/view/{build_id}")
}

/// Textile image embed of the CI host's build-status badge.
pub fn status_image(ci_url: &str, project_id: &str, branch: &str) -> String {
    let branch: String = form_urlencoded::byte_serialize(branch.as_bytes()).collect();
    format!("!{ci_url}/build-status/image/{project_id}?branch={branch}!")
}

/// Fills the first `%s` of a message template with the build link.
fn fill_template(template: &str, link: &str) -> String {
    template.replacen("%s", link, 1)
}

/// Builds the journal note posted to the issue.
///
/// Every note starts with the commit message and the status badge. Passed
/// builds add the success line; failed builds add the failure line and the
/// full build log inside a collapsed block.
pub fn compose_notes(
    build: &BuildContext,
    ci_url: &str,
    url_build: Option<&str>,
    messages: &Messages,
) -> String {
    let mut notes = format!("Commit: *{}*\n", build.commit_message);

    if let Some(url) = url_build {
        notes.push_str(&format!("Build URL: {url}\n"));
    }

    notes.push_str(&status_image(ci_url, &build.project_id, &build.branch));
    notes.push_str("\n\n");

    let link = build_link(ci_url, build.build_id);
    match build.status {
        BuildStatus::Passed => {
            notes.push_str(&fill_template(&messages.passed, &link));
            notes.push('\n');
        }
        BuildStatus::Failed => {
            notes.push_str(&fill_template(&messages.failed, &link));
            notes.push('\n');
            notes.push_str(&format!(
                "{{{{collapse(View details...)\n<pre>{}</pre>\n}}}}\n",
                build.log
            ));
        }
        BuildStatus::Other(_) => {}
    }

    notes
}
