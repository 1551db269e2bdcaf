//! OpenSSH client config parsing for session import
//!
//! Only concrete `Host` aliases are returned; wildcard and negated patterns
//! are skipped. Parsing stops at the first `Match` block. `Include`
//! directives are followed (with `~` expansion and `*`/`?` wildcards) and
//! each file is visited at most once.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::config::expand_home;

/// A host entry from ssh_config
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SshConfigHost {
    /// The `Host` alias
    pub alias: String,
    /// `HostName`
    pub hostname: Option<String>,
    /// `User`
    pub user: Option<String>,
    /// `Port`, ignored when not a number
    pub port: Option<u16>,
    /// `IdentityFile`
    pub identity_file: Option<String>,
    /// `ForwardX11`
    pub forward_x11: Option<bool>,
}

/// Parses `path` and every file it includes
#[must_use]
pub fn parse_ssh_config(path: &Path) -> Vec<SshConfigHost> {
    let mut parser = Parser::default();
    let path = expand_home(&path.to_string_lossy());
    parser.parse_file(&path);
    parser.entries
}

/// Parses config text. `base_dir` resolves relative `Include` paths.
#[must_use]
pub fn parse_ssh_config_str(content: &str, base_dir: &Path) -> Vec<SshConfigHost> {
    let mut parser = Parser::default();
    parser.parse_content(content, base_dir);
    parser.entries
}

/// Default config location, `~/.ssh/config`
#[must_use]
pub fn default_ssh_config_path() -> PathBuf {
    crate::config::home_dir().join(".ssh").join("config")
}

#[derive(Default)]
struct Parser {
    entries: Vec<SshConfigHost>,
    visited: HashSet<PathBuf>,
}

impl Parser {
    fn parse_file(&mut self, path: &Path) {
        let Ok(resolved) = path.canonicalize() else {
            tracing::warn!(path = %path.display(), "SSH config path does not exist");
            return;
        };
        if !resolved.is_file() {
            tracing::warn!(path = %path.display(), "SSH config path is not a file");
            return;
        }
        if !self.visited.insert(resolved.clone()) {
            return;
        }
        let content = match std::fs::read(&resolved) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!(path = %resolved.display(), error = %e, "Failed to read SSH config");
                return;
            }
        };
        let base = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
        self.parse_content(&content, &base);
    }

    fn parse_content(&mut self, content: &str, base_dir: &Path) {
        let mut patterns: Vec<String> = Vec::new();
        let mut options: BTreeMap<String, String> = BTreeMap::new();

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(tokens) = tokenize(line) else {
                continue;
            };
            let Some((keyword, values)) = tokens.split_first() else {
                continue;
            };
            match keyword.to_lowercase().as_str() {
                "match" => {
                    self.flush(&patterns, &options);
                    return;
                }
                "host" => {
                    self.flush(&patterns, &options);
                    patterns = values.to_vec();
                    options.clear();
                }
                "include" => {
                    self.flush(&patterns, &options);
                    patterns.clear();
                    options.clear();
                    for pattern in values {
                        for path in expand_include(pattern, base_dir) {
                            self.parse_file(&path);
                        }
                    }
                }
                other => {
                    if !patterns.is_empty() && !values.is_empty() {
                        options.insert(other.to_string(), values.join(" "));
                    }
                }
            }
        }
        self.flush(&patterns, &options);
    }

    fn flush(&mut self, patterns: &[String], options: &BTreeMap<String, String>) {
        for alias in patterns {
            if alias.is_empty() || alias.contains(['*', '?', '!']) {
                continue;
            }
            let port = options.get("port").and_then(|p| {
                let parsed = p.parse().ok();
                if parsed.is_none() {
                    tracing::debug!(alias, port = %p, "Invalid port in ssh config");
                }
                parsed
            });
            self.entries.push(SshConfigHost {
                alias: alias.clone(),
                hostname: options.get("hostname").cloned(),
                user: options.get("user").cloned(),
                port,
                identity_file: options.get("identityfile").cloned(),
                forward_x11: options
                    .get("forwardx11")
                    .map(|v| matches!(v.to_lowercase().as_str(), "yes" | "true" | "on")),
            });
        }
    }
}

/// Shell-like split with `#` starting a comment
fn tokenize(line: &str) -> Option<Vec<String>> {
    let code = match line.find(" #") {
        Some(pos) if !in_quotes(&line[..pos]) => &line[..pos],
        _ => line,
    };
    shlex::split(code)
}

fn in_quotes(prefix: &str) -> bool {
    prefix.matches('"').count() % 2 == 1 || prefix.matches('\'').count() % 2 == 1
}

fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

/// Expands an `Include` argument into existing files, sorted
fn expand_include(pattern: &str, base_dir: &Path) -> Vec<PathBuf> {
    let expanded = expand_home(pattern);
    let full = if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    };

    let mut candidates = vec![PathBuf::new()];
    for component in full.components() {
        let part = component.as_os_str().to_string_lossy();
        let is_wild = matches!(component, Component::Normal(_)) && part.contains(['*', '?']);
        if !is_wild {
            for c in &mut candidates {
                c.push(component.as_os_str());
            }
            continue;
        }
        let Some(re) = wildcard_regex(&part) else {
            return Vec::new();
        };
        let mut next = Vec::new();
        for dir in &candidates {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with('.') && re.is_match(&name) {
                    next.push(dir.join(name));
                }
            }
        }
        candidates = next;
    }
    candidates.retain(|p| p.is_file());
    candidates.sort();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_concrete_hosts() {
        let config = r#"
# global
User ignored
Host web web-alias
    HostName 10.0.0.5
    user deploy
    Port 2222
    IdentityFile ~/.ssh/web_ed25519
    ForwardX11 yes

Host *.internal !bastion
    User nobody

Host db
    Port not-a-number  # comment
"#;
        let hosts = parse_ssh_config_str(config, Path::new("/nonexistent"));
        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts[0].alias, "web");
        assert_eq!(hosts[0].hostname.as_deref(), Some("10.0.0.5"));
        assert_eq!(hosts[0].user.as_deref(), Some("deploy"));
        assert_eq!(hosts[0].port, Some(2222));
        assert_eq!(hosts[0].forward_x11, Some(true));
        assert_eq!(hosts[1].alias, "web-alias");
        assert_eq!(hosts[2].alias, "db");
        assert_eq!(hosts[2].port, None);
    }

    #[test]
    fn match_stops_parsing() {
        let config = "Host a\n  HostName a.example\nMatch host b\nHost c\n";
        let hosts = parse_ssh_config_str(config, Path::new("/"));
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].alias, "a");
    }

    #[test]
    fn includes_are_followed_once() {
        let dir = tempfile::tempdir().unwrap();
        let conf_d = dir.path().join("config.d");
        std::fs::create_dir(&conf_d).unwrap();
        std::fs::write(conf_d.join("a.conf"), "Host inc-a\n  HostName a\n").unwrap();
        std::fs::write(conf_d.join("b.conf"), "Host inc-b\n  HostName b\n").unwrap();
        let main = dir.path().join("config");
        std::fs::write(
            &main,
            "Include config.d/*.conf\nInclude config\nHost main\n  HostName m\n",
        )
        .unwrap();
        let hosts = parse_ssh_config(&main);
        let aliases: Vec<_> = hosts.iter().map(|h| h.alias.as_str()).collect();
        assert_eq!(aliases, vec!["inc-a", "inc-b", "main"]);
    }

    #[test]
    fn quoted_values() {
        let hosts = parse_ssh_config_str(
            "Host q\n  IdentityFile \"/path with space/key\"\n",
            Path::new("/"),
        );
        assert_eq!(hosts[0].identity_file.as_deref(), Some("/path with space/key"));
    }
}
