//! Command-line surface of the terminal and `ssh` argv construction
//!
//! The binary accepts a small, terminal-emulator-conventional set of options
//! (`-w`, `-e`, `--ssh`, `--new-window`). The file-manager extension turns a
//! selected folder URI into those options; [`nautilus_launch_args`] holds
//! that translation so both sides agree on it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use url::Url;

use crate::config::SettingsManager;
use crate::error::{LaunchError, LaunchResult};
use crate::models::SessionItem;
use crate::osc7::OSC7_HOST_DETECTION_SNIPPET;

/// Usage text printed for `--help`
pub const USAGE: &str = "\
Usage: zashterminal [OPTIONS] [DIRECTORY]

Options:
  -w, --working-directory <DIR>   Start the shell in DIR
  -e, -x, --execute <CMD...>      Run CMD; all remaining arguments are part of it
      --close-after-execute       Close the tab when CMD finishes
      --ssh <[USER@]HOST[:PORT][/PATH]>
                                  Open an SSH connection
      --new-window                Always open a new window
  -h, --help                      Show this help
  -v, --version                   Show the version";

/// `[user@]host[:port][/path]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Remote user, if given
    pub user: Option<String>,
    /// Host name or address (IPv6 without brackets)
    pub host: String,
    /// Port, if given
    pub port: Option<u16>,
    /// Remote directory to change into, if given
    pub path: Option<String>,
}

impl SshTarget {
    /// Parses a target string
    ///
    /// # Errors
    /// [`LaunchError::InvalidSshTarget`] for an empty host or bad port.
    pub fn parse(input: &str) -> LaunchResult<Self> {
        let invalid = || LaunchError::InvalidSshTarget(input.to_string());
        let input_trimmed = input.trim();

        let (user, rest) = match input_trimmed.rsplit_once('@') {
            Some((user, rest)) if !user.is_empty() => (Some(user.to_string()), rest),
            Some(_) => return Err(invalid()),
            None => (None, input_trimmed),
        };

        let (authority, path) = if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']').ok_or_else(invalid)?;
            let after = &stripped[end + 1..];
            let slash = after.find('/').unwrap_or(after.len());
            (&rest[..end + 2 + slash], &after[slash..])
        } else {
            let slash = rest.find('/').unwrap_or(rest.len());
            (&rest[..slash], &rest[slash..])
        };

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let end = bracketed.find(']').ok_or_else(invalid)?;
            let port = bracketed[end + 1..].strip_prefix(':');
            (&bracketed[..end], port)
        } else {
            match authority.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port
            .map(|p| p.parse::<u16>().ok().filter(|p| *p > 0).ok_or_else(invalid))
            .transpose()?;
        let path = Some(path).filter(|p| !p.is_empty() && *p != "/").map(str::to_string);

        Ok(Self {
            user,
            host: host.to_string(),
            port,
            path,
        })
    }

    /// A throwaway session for connecting to this target
    #[must_use]
    pub fn to_session(&self) -> SessionItem {
        let mut session = SessionItem::ssh(
            &self.host,
            &self.host,
            self.user.as_deref().unwrap_or_default(),
            self.port.unwrap_or(22),
        );
        if let Some(user) = &self.user {
            session.set_name(&format!("{user}@{}", self.host));
        }
        session
    }

    /// `cd` command for the remote shell when a path was given
    #[must_use]
    pub fn initial_command(&self) -> Option<String> {
        self.path.as_ref().map(|p| format!("cd \"{p}\""))
    }
}

impl FromStr for SshTarget {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        if let Some(path) = &self.path {
            f.write_str(path)?;
        }
        Ok(())
    }
}

/// Options the terminal was started with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Starting directory for the first local tab
    pub working_directory: Option<PathBuf>,
    /// Command to run instead of an interactive shell
    pub execute: Option<String>,
    /// Close the tab once `execute` finishes
    pub close_after_execute: bool,
    /// Connect to this target instead of opening a local shell
    pub ssh: Option<SshTarget>,
    /// Open a new window even if one exists
    pub new_window: bool,
    /// `--help` was given
    pub help: bool,
    /// `--version` was given
    pub version: bool,
}

impl LaunchRequest {
    /// Parses arguments, excluding the program name.
    ///
    /// Everything after `-e`/`-x`/`--execute` is the command. A lone
    /// non-option argument is taken as the working directory.
    ///
    /// # Errors
    /// Missing option values, malformed `--ssh` targets and unknown options.
    pub fn parse<I, S>(args: I) -> LaunchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let mut request = Self::default();
        let mut iter = args.iter().enumerate();

        while let Some((index, arg)) = iter.next() {
            let mut value_for = |name: &str| {
                iter.next()
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| LaunchError::MissingValue(name.to_string()))
            };
            match arg.as_str() {
                "-w" | "--working-directory" => {
                    request.working_directory = Some(PathBuf::from(value_for(arg)?));
                }
                "-e" | "-x" | "--execute" => {
                    let rest = &args[index + 1..];
                    if rest.is_empty() {
                        return Err(LaunchError::MissingValue(arg.clone()));
                    }
                    request.execute = Some(rest.join(" "));
                    break;
                }
                "--ssh" => request.ssh = Some(SshTarget::parse(&value_for(arg)?)?),
                "--close-after-execute" => request.close_after_execute = true,
                "--new-window" => request.new_window = true,
                "-h" | "--help" => request.help = true,
                "-v" | "--version" => request.version = true,
                other => {
                    if let Some(dir) = other.strip_prefix("--working-directory=") {
                        request.working_directory = Some(PathBuf::from(dir));
                    } else if let Some(cmd) = other.strip_prefix("--execute=") {
                        request.execute = Some(cmd.to_string());
                    } else if let Some(target) = other.strip_prefix("--ssh=") {
                        request.ssh = Some(SshTarget::parse(target)?);
                    } else if other.starts_with('-') {
                        return Err(LaunchError::UnknownArgument(other.to_string()));
                    } else if request.working_directory.is_none() {
                        request.working_directory = Some(PathBuf::from(other));
                    }
                }
            }
        }
        Ok(request)
    }

    /// `true` if the request asks for a specific tab rather than just a window
    #[must_use]
    pub const fn has_explicit_target(&self) -> bool {
        self.ssh.is_some() || self.execute.is_some() || self.working_directory.is_some()
    }
}

/// What to do with a launch when a window may already be open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchDisposition {
    /// Open a new window
    NewWindow,
    /// Raise the existing window without opening anything
    FocusExisting,
    /// Open a tab in the existing window
    NewTab,
}

/// Applies the `new_instance_behavior` setting (`new_tab`, `new_window`,
/// `focus_existing`) to a launch
#[must_use]
pub fn launch_disposition(
    request: &LaunchRequest,
    behavior: &str,
    has_window: bool,
) -> LaunchDisposition {
    if request.new_window || behavior == "new_window" || !has_window {
        LaunchDisposition::NewWindow
    } else if behavior == "focus_existing" && !request.has_explicit_target() {
        LaunchDisposition::FocusExisting
    } else {
        LaunchDisposition::NewTab
    }
}

/// Terminal arguments for a folder selected in the file manager.
///
/// `sftp://` and `ssh://` URIs open an SSH connection. `local_path` is the
/// GVFS mount point of a remote folder or the path of a local one; it is
/// used for `file://` URIs and ignored for remote ones.
///
/// # Errors
/// Unparsable URIs, remote URIs without a host, other schemes, and
/// `file://` URIs that are not absolute paths.
pub fn nautilus_launch_args(uri: &str, local_path: Option<&Path>) -> LaunchResult<Vec<String>> {
    let url = Url::parse(uri).map_err(|e| LaunchError::InvalidUri(format!("{uri}: {e}")))?;
    match url.scheme() {
        "sftp" | "ssh" => {
            let host = url
                .host_str()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| LaunchError::MissingHost(uri.to_string()))?;
            let path = url.path();
            let target = SshTarget {
                user: Some(url.username())
                    .filter(|u| !u.is_empty())
                    .map(str::to_string),
                host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
                port: url.port(),
                path: Some(path)
                    .filter(|p| !p.is_empty() && *p != "/")
                    .map(str::to_string),
            };
            Ok(vec!["--ssh".to_string(), target.to_string()])
        }
        "file" => {
            let path = match local_path {
                Some(p) => p.to_path_buf(),
                None => url
                    .to_file_path()
                    .map_err(|()| LaunchError::InvalidUri(uri.to_string()))?,
            };
            Ok(vec![
                "--working-directory".to_string(),
                path.to_string_lossy().into_owned(),
            ])
        }
        other => Err(LaunchError::UnsupportedScheme(other.to_string())),
    }
}

/// Connection settings shared by every `ssh` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshLaunchOptions {
    /// `ControlPersist` seconds; 0 disables connection sharing
    pub control_persist_secs: i64,
    /// `ConnectTimeout` seconds
    pub connect_timeout_secs: i64,
    /// Directory for `ControlPath` sockets
    pub control_dir: PathBuf,
    /// Login name used in the socket name when the session has no user
    pub local_user: String,
}

impl SshLaunchOptions {
    /// Reads `ssh_control_persist_duration` and `ssh_connect_timeout`
    #[must_use]
    pub fn from_settings(settings: &SettingsManager, control_dir: &Path) -> Self {
        Self {
            control_persist_secs: settings.get_i64("ssh_control_persist_duration", 60),
            connect_timeout_secs: settings.get_i64("ssh_connect_timeout", 30),
            control_dir: control_dir.to_path_buf(),
            local_user: std::env::var("USER").unwrap_or_else(|_| "user".to_string()),
        }
    }

    fn control_path(&self, session: &SessionItem) -> PathBuf {
        let user = if session.user.is_empty() {
            &self.local_user
        } else {
            &session.user
        };
        self.control_dir.join(format!(
            "ssh_control_{}_{}_{user}",
            session.host, session.port
        ))
    }
}

/// Remote command run after login: the optional initial command, the
/// post-login command, OSC 7 prompt reporting, then a login shell
#[must_use]
pub fn remote_shell_command(session: &SessionItem, initial_command: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(cmd) = initial_command.filter(|c| !c.trim().is_empty()) {
        parts.push(cmd.to_string());
    }
    if session.post_login_command_enabled && !session.post_login_command.is_empty() {
        parts.push(session.post_login_command.clone());
    }
    parts.push(format!(
        "{OSC7_HOST_DETECTION_SNIPPET} export PROMPT_COMMAND='printf \"\\033]7;file://%s%s\\007\" \"$ZASHTERMINAL_OSC7_HOST\" \"$PWD\"'"
    ));
    parts.push("exec \"$SHELL\" -l".to_string());
    parts.join("; ")
}

/// `ssh` argv for an interactive session.
///
/// Connection sharing is disabled for sessions with X11 or port forwarding
/// so their tunnels close with the terminal.
#[must_use]
pub fn ssh_command_args(
    session: &SessionItem,
    options: &SshLaunchOptions,
    initial_command: Option<&str>,
) -> Vec<String> {
    let forwarding = !session.port_forwardings.is_empty();
    let mut ssh_options: Vec<(&str, String)> = vec![
        ("ConnectTimeout", options.connect_timeout_secs.to_string()),
        ("ServerAliveInterval", "30".to_string()),
        ("ServerAliveCountMax", "3".to_string()),
        ("StrictHostKeyChecking", "accept-new".to_string()),
        ("UpdateHostKeys", "yes".to_string()),
    ];
    if !session.x11_forwarding && !forwarding {
        ssh_options.push(("ControlMaster", "auto".to_string()));
        ssh_options.push((
            "ControlPath",
            options.control_path(session).to_string_lossy().into_owned(),
        ));
        if options.control_persist_secs > 0 {
            ssh_options.push(("ControlPersist", options.control_persist_secs.to_string()));
        }
    }
    if forwarding {
        ssh_options.push(("ExitOnForwardFailure", "yes".to_string()));
    }
    if session.x11_forwarding {
        ssh_options.push(("ForwardX11", "yes".to_string()));
        ssh_options.push(("ForwardX11Trusted", "yes".to_string()));
    }

    let mut argv = vec!["ssh".to_string(), "-t".to_string()];
    if session.x11_forwarding {
        argv.push("-Y".to_string());
    }
    for (key, value) in ssh_options {
        argv.push("-o".to_string());
        argv.push(format!("{key}={value}"));
    }
    if session.uses_key_auth() && !session.auth_value.is_empty() {
        argv.push("-i".to_string());
        argv.push(session.auth_value.clone());
    }
    if session.port != 22 {
        argv.push("-p".to_string());
        argv.push(session.port.to_string());
    }
    for tunnel in &session.port_forwardings {
        let valid = (1..=65535).contains(&tunnel.local_port)
            && (1..=65535).contains(&tunnel.remote_port);
        if valid {
            argv.push("-L".to_string());
            argv.push(tunnel.ssh_spec());
        }
    }
    argv.push(session.connection_string());
    argv.push(remote_shell_command(session, initial_command));
    argv
}

/// Prefixes an argv with `sshpass -e`; the password goes in `SSHPASS`
#[must_use]
pub fn with_sshpass(argv: Vec<String>) -> Vec<String> {
    let mut wrapped = vec!["sshpass".to_string(), "-e".to_string()];
    wrapped.extend(argv);
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthType, PortForwarding};

    fn options() -> SshLaunchOptions {
        SshLaunchOptions {
            control_persist_secs: 60,
            connect_timeout_secs: 30,
            control_dir: PathBuf::from("/run/zt"),
            local_user: "me".into(),
        }
    }

    #[test]
    fn parses_targets() {
        let t = SshTarget::parse("deploy@web.example.com:2222/srv/app").unwrap();
        assert_eq!(t.user.as_deref(), Some("deploy"));
        assert_eq!(t.host, "web.example.com");
        assert_eq!(t.port, Some(2222));
        assert_eq!(t.path.as_deref(), Some("/srv/app"));
        assert_eq!(t.to_string(), "deploy@web.example.com:2222/srv/app");
        assert_eq!(t.initial_command().as_deref(), Some("cd \"/srv/app\""));

        let bare = SshTarget::parse("host/").unwrap();
        assert_eq!(bare.path, None);
        assert_eq!(bare.to_string(), "host");

        let v6 = SshTarget::parse("[::1]:22").unwrap();
        assert_eq!(v6.host, "::1");
        assert_eq!(v6.to_string(), "[::1]:22");

        assert!(SshTarget::parse("").is_err());
        assert!(SshTarget::parse("@host").is_err());
        assert!(SshTarget::parse("host:port").is_err());
    }

    #[test]
    fn parses_argv() {
        let r = LaunchRequest::parse(["-w", "/tmp", "--new-window", "-e", "htop", "-d", "5"]).unwrap();
        assert_eq!(r.working_directory, Some(PathBuf::from("/tmp")));
        assert!(r.new_window);
        assert_eq!(r.execute.as_deref(), Some("htop -d 5"));

        let r = LaunchRequest::parse(["--ssh=me@box", "/home"]).unwrap();
        assert_eq!(r.ssh.unwrap().host, "box");
        assert_eq!(r.working_directory, Some(PathBuf::from("/home")));

        assert!(matches!(
            LaunchRequest::parse(["--ssh"]),
            Err(LaunchError::MissingValue(_))
        ));
        assert!(matches!(
            LaunchRequest::parse(["--bogus"]),
            Err(LaunchError::UnknownArgument(_))
        ));
    }

    #[test]
    fn dispositions() {
        let empty = LaunchRequest::default();
        let ssh = LaunchRequest::parse(["--ssh", "box"]).unwrap();
        assert_eq!(launch_disposition(&empty, "new_tab", false), LaunchDisposition::NewWindow);
        assert_eq!(launch_disposition(&empty, "focus_existing", true), LaunchDisposition::FocusExisting);
        assert_eq!(launch_disposition(&ssh, "focus_existing", true), LaunchDisposition::NewTab);
        assert_eq!(launch_disposition(&ssh, "new_window", true), LaunchDisposition::NewWindow);
    }

    #[test]
    fn nautilus_uris() {
        assert_eq!(
            nautilus_launch_args("sftp://me@box:2200/var/log", None).unwrap(),
            vec!["--ssh", "me@box:2200/var/log"]
        );
        assert_eq!(
            nautilus_launch_args("ssh://box/", None).unwrap(),
            vec!["--ssh", "box"]
        );
        assert_eq!(
            nautilus_launch_args("file:///home/me/My%20Docs", None).unwrap(),
            vec!["--working-directory", "/home/me/My Docs"]
        );
        assert!(matches!(
            nautilus_launch_args("sftp:///path", None),
            Err(LaunchError::MissingHost(_))
        ));
        assert!(matches!(
            nautilus_launch_args("smb://server/share", None),
            Err(LaunchError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn ssh_argv_basic() {
        let mut session = SessionItem::ssh("web", "web1", "deploy", 2222);
        session.auth_type = AuthType::Key;
        session.auth_value = "/home/me/.ssh/id_ed25519".into();
        let argv = ssh_command_args(&session, &options(), Some("cd \"/srv\""));
        assert_eq!(&argv[..2], ["ssh", "-t"]);
        assert!(argv.contains(&"ControlPersist=60".to_string()));
        assert!(argv.contains(&"ControlPath=/run/zt/ssh_control_web1_2222_deploy".to_string()));
        let i = argv.iter().position(|a| a == "-i").unwrap();
        assert_eq!(argv[i + 1], "/home/me/.ssh/id_ed25519");
        let p = argv.iter().position(|a| a == "-p").unwrap();
        assert_eq!(argv[p + 1], "2222");
        assert_eq!(argv[argv.len() - 2], "deploy@web1");
        let remote = argv.last().unwrap();
        assert!(remote.starts_with("cd \"/srv\"; "));
        assert!(remote.ends_with("exec \"$SHELL\" -l"));
    }

    #[test]
    fn forwarding_disables_sharing() {
        let mut session = SessionItem::ssh("db", "db1", "", 22);
        session.x11_forwarding = true;
        session.port_forwardings = vec![PortForwarding::new("pg", "", 15432, "", 5432)];
        session.post_login_command_enabled = true;
        session.post_login_command = "tmux attach".into();
        let argv = ssh_command_args(&session, &options(), None);
        assert!(argv.contains(&"-Y".to_string()));
        assert!(!argv.iter().any(|a| a.starts_with("ControlMaster")));
        assert!(argv.contains(&"ExitOnForwardFailure=yes".to_string()));
        let l = argv.iter().position(|a| a == "-L").unwrap();
        assert_eq!(argv[l + 1], "localhost:15432:localhost:5432");
        assert!(!argv.contains(&"-p".to_string()));
        assert!(argv.last().unwrap().starts_with("tmux attach; "));
        assert_eq!(&with_sshpass(vec!["ssh".into()])[..2], ["sshpass", "-e"]);
    }
}
