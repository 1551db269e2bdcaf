//! Session, folder and layout records

mod folder;
mod session;

pub use folder::{LayoutItem, SessionFolder};
pub use session::{AuthType, PortForwarding, SessionItem, SessionSource, SessionType};

/// Current time as fractional Unix seconds
#[must_use]
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Canonical folder path: `""` for the root, otherwise `/a/b` without a
/// trailing slash.
#[must_use]
pub fn normalize_folder_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
