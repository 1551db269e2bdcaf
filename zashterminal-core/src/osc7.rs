//! Working-directory tracking from OSC 7 (`file://host/path`) URIs
//!
//! VTE exposes the last OSC 7 report as the terminal's current directory URI.
//! [`Osc7Tracker`] remembers the last path per terminal so titles are only
//! recomputed when the directory really changes.

use std::collections::HashMap;
use std::path::Path;

use url::Url;

/// Shell snippet that sets `ZASHTERMINAL_OSC7_HOST` for the OSC 7 prompt hook
pub const OSC7_HOST_DETECTION_SNIPPET: &str = concat!(
    r#"if [ -z "$ZASHTERMINAL_OSC7_HOST" ]; then "#,
    "if command -v hostname >/dev/null 2>&1; then ",
    r#"ZASHTERMINAL_OSC7_HOST="$(hostname)"; "#,
    r#"elif [ -n "$HOSTNAME" ]; then "#,
    r#"ZASHTERMINAL_OSC7_HOST="$HOSTNAME"; "#,
    "elif command -v uname >/dev/null 2>&1; then ",
    r#"ZASHTERMINAL_OSC7_HOST="$(uname -n)"; "#,
    "else ",
    r#"ZASHTERMINAL_OSC7_HOST="unknown"; "#,
    "fi; ",
    "fi;"
);

/// A parsed directory report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Osc7Info {
    /// Reporting host, `localhost` when the URI has none
    pub hostname: String,
    /// Decoded absolute path
    pub path: String,
    /// Shortened path for titles
    pub display_path: String,
}

/// Parses a `file://` URI, shortening the path relative to `home`
#[must_use]
pub fn parse_osc7_uri_with_home(uri: &str, home: &Path) -> Option<Osc7Info> {
    let mut url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    let hostname = url
        .host_str()
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost")
        .to_string();
    url.set_host(None).ok()?;
    let path = url.to_file_path().ok()?.to_string_lossy().into_owned();
    let display_path = display_path(&path, home);
    Some(Osc7Info {
        hostname,
        path,
        display_path,
    })
}

/// Parses a `file://` URI relative to the user's home directory
#[must_use]
pub fn parse_osc7_uri(uri: &str) -> Option<Osc7Info> {
    parse_osc7_uri_with_home(uri, &crate::config::home_dir())
}

/// Title-friendly form of `path`: `~` for paths under `home`, and only the
/// last three components of deep paths
#[must_use]
pub fn display_path(path: &str, home: &Path) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    let home = home.to_string_lossy();
    let home = home.trim_end_matches('/');
    if path == home {
        return path.to_string();
    }
    if !home.is_empty()
        && let Some(rest) = path.strip_prefix(home).filter(|r| r.starts_with('/'))
    {
        return format!("~{rest}");
    }
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() > 4 {
        return format!(".../{}", parts[parts.len() - 3..].join("/"));
    }
    path.to_string()
}

/// Last known directory per terminal
#[derive(Debug, Default)]
pub struct Osc7Tracker {
    terminals: HashMap<String, Osc7Info>,
}

impl Osc7Tracker {
    /// Creates an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a directory URI for `terminal_id`. Returns the parsed report
    /// only when the path differs from the previous one.
    pub fn update(&mut self, terminal_id: &str, uri: &str) -> Option<Osc7Info> {
        self.update_with_home(terminal_id, uri, &crate::config::home_dir())
    }

    /// [`update`](Self::update) with an explicit home directory
    pub fn update_with_home(
        &mut self,
        terminal_id: &str,
        uri: &str,
        home: &Path,
    ) -> Option<Osc7Info> {
        let info = parse_osc7_uri_with_home(uri, home)?;
        if self
            .terminals
            .get(terminal_id)
            .is_some_and(|last| last.path == info.path)
        {
            return None;
        }
        tracing::debug!(terminal = terminal_id, path = %info.path, "Working directory changed");
        self.terminals.insert(terminal_id.to_string(), info.clone());
        Some(info)
    }

    /// Last reported directory of `terminal_id`
    #[must_use]
    pub fn current_dir(&self, terminal_id: &str) -> Option<&str> {
        self.terminals.get(terminal_id).map(|i| i.path.as_str())
    }

    /// Forgets a closed terminal
    pub fn untrack(&mut self, terminal_id: &str) {
        self.terminals.remove(terminal_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "/home/zash";

    #[test]
    fn parses_file_uris() {
        let info = parse_osc7_uri_with_home("file://box/home/zash/my%20dir", Path::new(HOME)).unwrap();
        assert_eq!(info.hostname, "box");
        assert_eq!(info.path, "/home/zash/my dir");
        assert_eq!(info.display_path, "~/my dir");

        let local = parse_osc7_uri_with_home("file:///tmp", Path::new(HOME)).unwrap();
        assert_eq!(local.hostname, "localhost");
        assert!(parse_osc7_uri_with_home("http://box/tmp", Path::new(HOME)).is_none());
        assert!(parse_osc7_uri_with_home("not a uri", Path::new(HOME)).is_none());
    }

    #[test]
    fn display_paths() {
        let home = Path::new(HOME);
        assert_eq!(display_path("", home), "/");
        assert_eq!(display_path("/", home), "/");
        assert_eq!(display_path(HOME, home), HOME);
        assert_eq!(display_path("/home/zash/src/app", home), "~/src/app");
        assert_eq!(display_path("/home/zashx", home), "/home/zashx");
        assert_eq!(display_path("/usr/local/share", home), "/usr/local/share");
        assert_eq!(display_path("/usr/local/share/doc", home), ".../local/share/doc");
    }

    #[test]
    fn tracker_dedupes_paths() {
        let mut tracker = Osc7Tracker::new();
        let home = Path::new(HOME);
        assert!(tracker.update_with_home("t1", "file:///tmp", home).is_some());
        assert!(tracker.update_with_home("t1", "file://other/tmp", home).is_none());
        assert!(tracker.update_with_home("t2", "file:///tmp", home).is_some());
        assert_eq!(tracker.current_dir("t1"), Some("/tmp"));
        tracker.untrack("t1");
        assert_eq!(tracker.current_dir("t1"), None);
        assert!(tracker.update_with_home("t1", "file:///tmp", home).is_some());
    }
}
