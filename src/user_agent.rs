//! Shared User-Agent string for page and transfer requests.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/papergrab";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("papergrab/{version} (exam-paper-archiver; +{PROJECT_UA_URL})")
}
