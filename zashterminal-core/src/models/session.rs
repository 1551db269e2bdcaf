//! Saved terminal sessions

use serde::{Deserialize, Deserializer, Serialize};

use super::{normalize_folder_path, unix_now};
use crate::config::expand_home;
use crate::helpers::sanitize_name;

/// Kind of terminal a session opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// Local shell
    Local,
    /// Remote shell through the system `ssh` client
    #[default]
    Ssh,
}

impl SessionType {
    /// Value stored in JSON and drag payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Ssh => "ssh",
        }
    }
}

/// How an SSH session authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthType {
    /// Identity file, path in `auth_value`
    #[default]
    #[serde(rename = "key")]
    Key,
    /// Password kept in the system keyring
    #[serde(rename = "password")]
    Password,
    /// Let ssh decide
    #[serde(rename = "")]
    None,
}

/// Where a session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    /// Created in the UI or CLI
    #[default]
    User,
    /// Imported from `~/.ssh/config`
    SshConfig,
}

/// One `-L` tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortForwarding {
    /// Display name, "Tunnel" when blank
    #[serde(default, deserialize_with = "de_tunnel_name")]
    pub name: String,
    /// Bind address, "localhost" when blank
    #[serde(default = "default_local_host", deserialize_with = "de_local_host")]
    pub local_host: String,
    /// Local port
    #[serde(default, deserialize_with = "de_port_number")]
    pub local_port: u32,
    /// Destination host as seen from the server
    #[serde(default, deserialize_with = "de_trimmed")]
    pub remote_host: String,
    /// Destination port
    #[serde(default, deserialize_with = "de_port_number")]
    pub remote_port: u32,
}

impl PortForwarding {
    /// Creates a normalized tunnel
    #[must_use]
    pub fn new(
        name: &str,
        local_host: &str,
        local_port: u32,
        remote_host: &str,
        remote_port: u32,
    ) -> Self {
        Self {
            name: non_blank(name, "Tunnel"),
            local_host: non_blank(local_host, "localhost"),
            local_port,
            remote_host: remote_host.trim().to_string(),
            remote_port,
        }
    }

    /// `-L` argument: `local_host:local_port:remote_host:remote_port`
    #[must_use]
    pub fn ssh_spec(&self) -> String {
        let remote = if self.remote_host.is_empty() {
            "localhost"
        } else {
            &self.remote_host
        };
        format!(
            "{}:{}:{remote}:{}",
            self.local_host, self.local_port, self.remote_port
        )
    }
}

fn non_blank(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn default_local_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    22
}

fn de_trimmed<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .unwrap_or_default()
        .trim()
        .to_string())
}

fn de_tunnel_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(non_blank(&de_trimmed(d)?, "Tunnel"))
}

fn de_local_host<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(non_blank(&de_trimmed(d)?, "localhost"))
}

fn de_port_number<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        Text(String),
    }
    match NumberOrString::deserialize(d)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(|_| {
            serde::de::Error::custom("Port forwarding entries must use numeric ports.")
        }),
    }
}

fn de_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(sanitize_name(&Option::<String>::deserialize(d)?.unwrap_or_default()))
}

fn de_folder_path<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(normalize_folder_path(
        &Option::<String>::deserialize(d)?.unwrap_or_default(),
    ))
}

fn de_source<'de, D: Deserializer<'de>>(d: D) -> Result<SessionSource, D::Error> {
    Ok(match Option::<String>::deserialize(d)?.as_deref() {
        Some("ssh_config") => SessionSource::SshConfig,
        _ => SessionSource::User,
    })
}

/// A saved terminal session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    /// Display name, sanitized with [`sanitize_name`]
    #[serde(deserialize_with = "de_name")]
    pub name: String,
    /// Local or SSH
    pub session_type: SessionType,
    /// Remote host name or address
    #[serde(default, deserialize_with = "de_trimmed")]
    pub host: String,
    /// Remote user name
    #[serde(default, deserialize_with = "de_trimmed")]
    pub user: String,
    /// SSH authentication method
    #[serde(default)]
    pub auth_type: AuthType,
    /// Identity file for key auth; always empty for password auth
    #[serde(default)]
    pub auth_value: String,
    /// Containing folder path, `""` at the root
    #[serde(default, deserialize_with = "de_folder_path")]
    pub folder_path: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional tab color (any CSS color)
    #[serde(default)]
    pub tab_color: Option<String>,
    /// Run [`Self::post_login_command`] after connecting
    #[serde(default)]
    pub post_login_command_enabled: bool,
    /// Command run on the remote shell after login
    #[serde(default, deserialize_with = "de_trimmed")]
    pub post_login_command: String,
    /// Offer an SFTP session alongside the shell
    #[serde(default)]
    pub sftp_session_enabled: bool,
    /// Local starting directory for SFTP
    #[serde(default, deserialize_with = "de_trimmed")]
    pub sftp_local_directory: String,
    /// Remote starting directory for SFTP
    #[serde(default, deserialize_with = "de_trimmed")]
    pub sftp_remote_directory: String,
    /// `-L` tunnels
    #[serde(default)]
    pub port_forwardings: Vec<PortForwarding>,
    /// Forward X11 (`-Y`)
    #[serde(default)]
    pub x11_forwarding: bool,
    /// User-created or imported
    #[serde(default, deserialize_with = "de_source")]
    pub source: SessionSource,
    /// Starting directory for local sessions
    #[serde(default, deserialize_with = "de_trimmed")]
    pub local_working_directory: String,
    /// Command run in local sessions after the shell starts
    #[serde(default, deserialize_with = "de_trimmed")]
    pub local_startup_command: String,
    /// Per-session override; `None` follows the global preference
    #[serde(default)]
    pub output_highlighting: Option<bool>,
    /// Per-session override for command-specific rules
    #[serde(default)]
    pub command_specific_highlighting: Option<bool>,
    /// Per-session override for `cat` colorization
    #[serde(default)]
    pub cat_colorization: Option<bool>,
    /// Per-session override for shell input highlighting
    #[serde(default)]
    pub shell_input_highlighting: Option<bool>,
    /// Unix timestamp of creation
    #[serde(default = "unix_now")]
    pub created_at: f64,
    /// Unix timestamp of the last change
    #[serde(default = "unix_now")]
    pub modified_at: f64,
}

impl SessionItem {
    /// Creates a session with default options
    #[must_use]
    pub fn new(name: &str, session_type: SessionType) -> Self {
        let now = unix_now();
        Self {
            name: sanitize_name(name),
            session_type,
            host: String::new(),
            user: String::new(),
            auth_type: AuthType::Key,
            auth_value: String::new(),
            folder_path: String::new(),
            port: 22,
            tab_color: None,
            post_login_command_enabled: false,
            post_login_command: String::new(),
            sftp_session_enabled: false,
            sftp_local_directory: String::new(),
            sftp_remote_directory: String::new(),
            port_forwardings: Vec::new(),
            x11_forwarding: false,
            source: SessionSource::User,
            local_working_directory: String::new(),
            local_startup_command: String::new(),
            output_highlighting: None,
            command_specific_highlighting: None,
            cat_colorization: None,
            shell_input_highlighting: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Creates an SSH session
    #[must_use]
    pub fn ssh(name: &str, host: &str, user: &str, port: u16) -> Self {
        Self {
            host: host.trim().to_string(),
            user: user.trim().to_string(),
            port,
            ..Self::new(name, SessionType::Ssh)
        }
    }

    /// Creates a local session
    #[must_use]
    pub fn local(name: &str) -> Self {
        Self::new(name, SessionType::Local)
    }

    /// Renames the session, sanitizing the new name
    pub fn set_name(&mut self, name: &str) {
        self.name = sanitize_name(name);
        self.touch();
    }

    /// Moves the session into `folder_path`
    pub fn set_folder_path(&mut self, folder_path: &str) {
        self.folder_path = normalize_folder_path(folder_path);
        self.touch();
    }

    /// Updates `modified_at`
    pub fn touch(&mut self) {
        self.modified_at = unix_now();
    }

    /// `true` for local shells
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.session_type == SessionType::Local
    }

    /// `true` for SSH sessions
    #[must_use]
    pub fn is_ssh(&self) -> bool {
        self.session_type == SessionType::Ssh
    }

    /// SSH with an identity file
    #[must_use]
    pub fn uses_key_auth(&self) -> bool {
        self.is_ssh() && self.auth_type == AuthType::Key
    }

    /// SSH with a keyring password
    #[must_use]
    pub fn uses_password_auth(&self) -> bool {
        self.is_ssh() && self.auth_type == AuthType::Password
    }

    /// `user@host`, `host`, or "Local Terminal"
    #[must_use]
    pub fn connection_string(&self) -> String {
        if self.is_local() {
            "Local Terminal".to_string()
        } else if self.user.is_empty() {
            self.host.clone()
        } else {
            format!("{}@{}", self.user, self.host)
        }
    }

    /// `user@host:port` as recorded in `ignored_ssh_config_hosts`
    #[must_use]
    pub fn ssh_config_key(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }

    /// Copy suitable for writing to disk: passwords never leave the keyring
    #[must_use]
    pub fn for_storage(&self) -> Self {
        let mut stored = self.clone();
        if stored.uses_password_auth() {
            stored.auth_value.clear();
        }
        stored
    }

    /// Human-readable problems; empty when the session is valid
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push("Session name is required.".to_string());
        }
        if !self.is_ssh() {
            return errors;
        }
        if self.host.is_empty() {
            errors.push("Host is required for SSH sessions.".to_string());
        }
        if self.port == 0 {
            errors.push("Port must be between 1 and 65535.".to_string());
        }
        if self.post_login_command_enabled && self.post_login_command.is_empty() {
            errors.push("Post-login command cannot be empty when enabled.".to_string());
        }
        if self.sftp_session_enabled && !self.sftp_local_directory.is_empty() {
            let local = expand_home(&self.sftp_local_directory);
            if !local.is_dir() {
                errors.push("SFTP local directory must exist and be a directory.".to_string());
            }
        }
        for tunnel in &self.port_forwardings {
            if !(1025..=65535).contains(&tunnel.local_port) {
                errors.push(format!(
                    "Port forward '{}' has an invalid local port (must be between 1025 and 65535).",
                    tunnel.name
                ));
            }
            if !(1..=65535).contains(&tunnel.remote_port) {
                errors.push(format!(
                    "Port forward '{}' has an invalid remote port.",
                    tunnel.name
                ));
            }
        }
        errors
    }

    /// `true` when [`Self::validation_errors`] is empty
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let session: SessionItem =
            serde_json::from_str(r#"{"name": "web/1", "session_type": "ssh", "host": " example.com "}"#)
                .unwrap();
        assert_eq!(session.name, "web_1");
        assert_eq!(session.host, "example.com");
        assert_eq!(session.port, 22);
        assert_eq!(session.auth_type, AuthType::Key);
        assert_eq!(session.source, SessionSource::User);
        assert!(session.output_highlighting.is_none());
    }

    #[test]
    fn tunnels_are_normalized() {
        let tunnel: PortForwarding = serde_json::from_str(
            r#"{"name": " ", "local_host": "", "local_port": "8080", "remote_port": 80}"#,
        )
        .unwrap();
        assert_eq!(tunnel.name, "Tunnel");
        assert_eq!(tunnel.local_host, "localhost");
        assert_eq!(tunnel.local_port, 8080);
        assert_eq!(tunnel.ssh_spec(), "localhost:8080:localhost:80");

        let bad: Result<PortForwarding, _> =
            serde_json::from_str(r#"{"local_port": "abc", "remote_port": 80}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn ssh_validation_messages() {
        let mut session = SessionItem::new("db", SessionType::Ssh);
        session.post_login_command_enabled = true;
        session
            .port_forwardings
            .push(PortForwarding::new("pg", "", 80, "db", 0));
        let errors = session.validation_errors();
        assert!(errors.contains(&"Host is required for SSH sessions.".to_string()));
        assert!(errors.contains(&"Post-login command cannot be empty when enabled.".to_string()));
        assert!(errors.iter().any(|e| e.contains("invalid local port")));
        assert!(errors.iter().any(|e| e.contains("invalid remote port")));
    }

    #[test]
    fn local_sessions_skip_ssh_checks() {
        let session = SessionItem::local("shell");
        assert!(session.is_valid());
        assert_eq!(session.connection_string(), "Local Terminal");
    }

    #[test]
    fn passwords_are_not_stored() {
        let mut session = SessionItem::ssh("srv", "host", "root", 2222);
        session.auth_type = AuthType::Password;
        session.auth_value = "hunter2".into();
        assert!(session.for_storage().auth_value.is_empty());
        assert_eq!(session.ssh_config_key(), "root@host:2222");
        assert_eq!(session.connection_string(), "root@host");
    }
}
