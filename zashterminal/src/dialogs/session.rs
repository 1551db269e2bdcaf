//! Session add/edit dialog
//!
//! One form covers local and SSH sessions; the SSH-only groups hide when
//! the type is Local. Passwords go to the keyring and never into the
//! session record.

use std::cell::RefCell;
use std::rc::Rc;

use adw::prelude::*;
use gtk4::gdk;
use libadwaita as adw;
use secrecy::SecretString;
use zashterminal_core::models::{AuthType, PortForwarding, SessionItem, SessionType};
use zashterminal_core::secret::store_password;

use super::keyboard::{setup_dialog_shortcuts, setup_entry_activation};
use super::widgets::{
    dialog_header, folder_combo, folder_paths, form_box, form_window, selected_folder,
    show_errors, status_label,
};
use crate::async_utils::spawn_background;
use crate::state::SharedAppState;
use crate::toast::{ToastType, show_toast_on_widget};

const TYPE_LABELS: [&str; 2] = ["SSH", "Local"];
const AUTH_LABELS: [&str; 3] = ["Identity File", "Password", "Let SSH Decide"];
const OVERRIDE_LABELS: [&str; 3] = ["Use Global Setting", "On", "Off"];

fn combo(title: &str, labels: &[&str], selected: u32) -> adw::ComboRow {
    let row = adw::ComboRow::builder()
        .title(title)
        .model(&gtk4::StringList::new(labels))
        .build();
    row.set_selected(selected);
    row
}

fn entry(title: &str, text: &str) -> adw::EntryRow {
    let row = adw::EntryRow::builder().title(title).build();
    row.set_text(text);
    row
}

fn override_row(title: &str, value: Option<bool>) -> adw::ComboRow {
    let selected = match value {
        None => 0,
        Some(true) => 1,
        Some(false) => 2,
    };
    combo(title, &OVERRIDE_LABELS, selected)
}

fn override_value(row: &adw::ComboRow) -> Option<bool> {
    match row.selected() {
        1 => Some(true),
        2 => Some(false),
        _ => None,
    }
}

const fn auth_index(auth: AuthType) -> u32 {
    match auth {
        AuthType::Key => 0,
        AuthType::Password => 1,
        AuthType::None => 2,
    }
}

const fn auth_from_index(index: u32) -> AuthType {
    match index {
        1 => AuthType::Password,
        2 => AuthType::None,
        _ => AuthType::Key,
    }
}

/// Rows of one `-L` tunnel
struct TunnelRows {
    expander: adw::ExpanderRow,
    name: adw::EntryRow,
    local_host: adw::EntryRow,
    local_port: adw::SpinRow,
    remote_host: adw::EntryRow,
    remote_port: adw::SpinRow,
}

impl TunnelRows {
    fn new(tunnel: &PortForwarding) -> Self {
        let expander = adw::ExpanderRow::builder()
            .title(&tunnel.name)
            .subtitle(tunnel.ssh_spec())
            .build();
        let name = entry("Name", &tunnel.name);
        let local_host = entry("Local Host", &tunnel.local_host);
        let local_port = adw::SpinRow::with_range(1025.0, 65535.0, 1.0);
        local_port.set_title("Local Port");
        local_port.set_value(f64::from(tunnel.local_port.max(1025)));
        let remote_host = entry("Remote Host", &tunnel.remote_host);
        let remote_port = adw::SpinRow::with_range(1.0, 65535.0, 1.0);
        remote_port.set_title("Remote Port");
        remote_port.set_value(f64::from(tunnel.remote_port.max(1)));

        expander.add_row(&name);
        expander.add_row(&local_host);
        expander.add_row(&local_port);
        expander.add_row(&remote_host);
        expander.add_row(&remote_port);

        let expander_weak = expander.downgrade();
        name.connect_changed(move |row| {
            if let Some(expander) = expander_weak.upgrade() {
                expander.set_title(&row.text());
            }
        });

        Self {
            expander,
            name,
            local_host,
            local_port,
            remote_host,
            remote_port,
        }
    }

    fn to_forwarding(&self) -> PortForwarding {
        PortForwarding::new(
            &self.name.text(),
            &self.local_host.text(),
            spin_u32(&self.local_port),
            &self.remote_host.text(),
            spin_u32(&self.remote_port),
        )
    }
}

fn spin_u32(row: &adw::SpinRow) -> u32 {
    u32::try_from(row.value().round() as i64).unwrap_or(0)
}

/// Form widgets of the session dialog
struct SessionForm {
    name: adw::EntryRow,
    session_type: adw::ComboRow,
    folder: adw::ComboRow,
    folder_choices: Vec<String>,
    host: adw::EntryRow,
    user: adw::EntryRow,
    port: adw::SpinRow,
    auth: adw::ComboRow,
    key_path: adw::EntryRow,
    password: adw::PasswordEntryRow,
    tab_color_enabled: adw::SwitchRow,
    tab_color: gtk4::ColorDialogButton,
    post_login_enabled: adw::SwitchRow,
    post_login_command: adw::EntryRow,
    sftp_enabled: adw::SwitchRow,
    sftp_local: adw::EntryRow,
    sftp_remote: adw::EntryRow,
    x11: adw::SwitchRow,
    working_dir: adw::EntryRow,
    startup_command: adw::EntryRow,
    output_highlighting: adw::ComboRow,
    command_highlighting: adw::ComboRow,
    cat_colorization: adw::ComboRow,
    shell_input: adw::ComboRow,
    tunnels: Rc<RefCell<Vec<TunnelRows>>>,
    ssh_groups: Vec<adw::PreferencesGroup>,
    local_group: adw::PreferencesGroup,
}

impl SessionForm {
    fn new(session: &SessionItem, folders: &[String]) -> Self {
        let (folder, folder_choices) = folder_combo("Folder", folders, &session.folder_path);
        let port = adw::SpinRow::with_range(1.0, 65535.0, 1.0);
        port.set_title("Port");
        port.set_value(f64::from(session.port.max(1)));

        let password = adw::PasswordEntryRow::builder().title("Password").build();
        if session.uses_password_auth() {
            password.set_tooltip_text(Some("Leave empty to keep the stored password"));
        }

        let tab_color = gtk4::ColorDialogButton::new(Some(gtk4::ColorDialog::new()));
        tab_color.set_valign(gtk4::Align::Center);
        if let Some(rgba) = session
            .tab_color
            .as_deref()
            .and_then(|c| gdk::RGBA::parse(c).ok())
        {
            tab_color.set_rgba(&rgba);
        }
        let tab_color_enabled = adw::SwitchRow::builder()
            .title("Custom Tab Color")
            .active(session.tab_color.is_some())
            .build();
        tab_color_enabled.add_suffix(&tab_color);

        let bool_row = |title: &str, active: bool| {
            adw::SwitchRow::builder().title(title).active(active).build()
        };

        Self {
            name: entry("Name", &session.name),
            session_type: combo(
                "Type",
                &TYPE_LABELS,
                u32::from(session.session_type == SessionType::Local),
            ),
            folder,
            folder_choices,
            host: entry("Host", &session.host),
            user: entry("User", &session.user),
            port,
            auth: combo("Authentication", &AUTH_LABELS, auth_index(session.auth_type)),
            key_path: entry(
                "Identity File",
                if session.uses_key_auth() { session.auth_value.as_str() } else { "" },
            ),
            password,
            tab_color_enabled,
            tab_color,
            post_login_enabled: bool_row("Run Command After Login", session.post_login_command_enabled),
            post_login_command: entry("Command", &session.post_login_command),
            sftp_enabled: bool_row("Open SFTP Tab", session.sftp_session_enabled),
            sftp_local: entry("Local Directory", &session.sftp_local_directory),
            sftp_remote: entry("Remote Directory", &session.sftp_remote_directory),
            x11: bool_row("X11 Forwarding", session.x11_forwarding),
            working_dir: entry("Working Directory", &session.local_working_directory),
            startup_command: entry("Startup Command", &session.local_startup_command),
            output_highlighting: override_row("Output Highlighting", session.output_highlighting),
            command_highlighting: override_row(
                "Command-Specific Rules",
                session.command_specific_highlighting,
            ),
            cat_colorization: override_row("Colorize cat Output", session.cat_colorization),
            shell_input: override_row("Shell Input Highlighting", session.shell_input_highlighting),
            tunnels: Rc::new(RefCell::new(Vec::new())),
            ssh_groups: Vec::new(),
            local_group: adw::PreferencesGroup::new(),
        }
    }

    fn is_local(&self) -> bool {
        self.session_type.selected() == 1
    }

    fn update_visibility(&self) {
        let local = self.is_local();
        for group in &self.ssh_groups {
            group.set_visible(!local);
        }
        self.local_group.set_visible(local);
        let auth = auth_from_index(self.auth.selected());
        self.key_path.set_visible(auth == AuthType::Key);
        self.password.set_visible(auth == AuthType::Password);
        self.post_login_command
            .set_sensitive(self.post_login_enabled.is_active());
        self.sftp_local.set_sensitive(self.sftp_enabled.is_active());
        self.sftp_remote.set_sensitive(self.sftp_enabled.is_active());
        self.tab_color.set_sensitive(self.tab_color_enabled.is_active());
    }

    /// Applies the form to a copy of `base`
    fn collect(&self, base: &SessionItem) -> SessionItem {
        let mut session = base.clone();
        session.set_name(&self.name.text());
        session.set_folder_path(&selected_folder(&self.folder, &self.folder_choices));
        session.tab_color = self
            .tab_color_enabled
            .is_active()
            .then(|| self.tab_color.rgba().to_string());
        session.output_highlighting = override_value(&self.output_highlighting);
        session.command_specific_highlighting = override_value(&self.command_highlighting);
        session.cat_colorization = override_value(&self.cat_colorization);
        session.shell_input_highlighting = override_value(&self.shell_input);

        if self.is_local() {
            session.session_type = SessionType::Local;
            session.local_working_directory = self.working_dir.text().trim().to_string();
            session.local_startup_command = self.startup_command.text().trim().to_string();
            return session;
        }

        session.session_type = SessionType::Ssh;
        session.host = self.host.text().trim().to_string();
        session.user = self.user.text().trim().to_string();
        session.port = u16::try_from(self.port.value().round() as i64).unwrap_or(0);
        session.auth_type = auth_from_index(self.auth.selected());
        session.auth_value = match session.auth_type {
            AuthType::Key => self.key_path.text().trim().to_string(),
            AuthType::Password | AuthType::None => String::new(),
        };
        session.post_login_command_enabled = self.post_login_enabled.is_active();
        session.post_login_command = self.post_login_command.text().trim().to_string();
        session.sftp_session_enabled = self.sftp_enabled.is_active();
        session.sftp_local_directory = self.sftp_local.text().trim().to_string();
        session.sftp_remote_directory = self.sftp_remote.text().trim().to_string();
        session.x11_forwarding = self.x11.is_active();
        session.port_forwardings = self
            .tunnels
            .borrow()
            .iter()
            .map(TunnelRows::to_forwarding)
            .collect();
        session
    }
}

fn add_tunnel(group: &adw::PreferencesGroup, tunnels: &Rc<RefCell<Vec<TunnelRows>>>, tunnel: &PortForwarding) {
    let rows = TunnelRows::new(tunnel);
    let remove = gtk4::Button::builder()
        .icon_name("user-trash-symbolic")
        .tooltip_text("Remove Tunnel")
        .valign(gtk4::Align::Center)
        .css_classes(["flat"])
        .build();
    rows.expander.add_suffix(&remove);
    group.add(&rows.expander);

    let group_weak = group.downgrade();
    let expander_weak = rows.expander.downgrade();
    let tunnels_weak = Rc::downgrade(tunnels);
    remove.connect_clicked(move |_| {
        let (Some(group), Some(expander), Some(tunnels)) =
            (group_weak.upgrade(), expander_weak.upgrade(), tunnels_weak.upgrade())
        else {
            return;
        };
        group.remove(&expander);
        tunnels.borrow_mut().retain(|t| t.expander != expander);
    });
    tunnels.borrow_mut().push(rows);
}

/// Opens the session dialog.
///
/// `existing` edits a saved session in place; `None` creates a new one in
/// `default_folder`.
pub fn show_session_dialog(
    parent: Option<&gtk4::Window>,
    state: &SharedAppState,
    existing: Option<SessionItem>,
    default_folder: &str,
) {
    let is_edit = existing.is_some();
    let base = existing.unwrap_or_else(|| {
        let mut session = SessionItem::new("", SessionType::Ssh);
        session.set_folder_path(default_folder);
        session
    });

    let (header, cancel_btn, save_btn) =
        dialog_header("Cancel", if is_edit { "Save" } else { "Create" });
    let content = form_box();
    let status = status_label();
    content.append(&status);

    let mut form = SessionForm::new(&base, &folder_paths(state));

    let general = adw::PreferencesGroup::builder().title("Session").build();
    general.add(&form.name);
    general.add(&form.session_type);
    general.add(&form.folder);
    general.add(&form.tab_color_enabled);
    content.append(&general);

    let connection = adw::PreferencesGroup::builder().title("Connection").build();
    connection.add(&form.host);
    connection.add(&form.user);
    connection.add(&form.port);
    connection.add(&form.auth);
    connection.add(&form.key_path);
    connection.add(&form.password);
    content.append(&connection);

    let options = adw::PreferencesGroup::builder().title("Options").build();
    options.add(&form.post_login_enabled);
    options.add(&form.post_login_command);
    options.add(&form.sftp_enabled);
    options.add(&form.sftp_local);
    options.add(&form.sftp_remote);
    options.add(&form.x11);
    content.append(&options);

    let add_tunnel_btn = gtk4::Button::builder()
        .icon_name("list-add-symbolic")
        .tooltip_text("Add Tunnel")
        .css_classes(["flat"])
        .build();
    let tunnels_group = adw::PreferencesGroup::builder()
        .title("Port Forwarding")
        .description("Local tunnels opened with the connection")
        .header_suffix(&add_tunnel_btn)
        .build();
    for tunnel in &base.port_forwardings {
        add_tunnel(&tunnels_group, &form.tunnels, tunnel);
    }
    {
        let group = tunnels_group.clone();
        let tunnels = Rc::clone(&form.tunnels);
        add_tunnel_btn.connect_clicked(move |_| {
            add_tunnel(&group, &tunnels, &PortForwarding::new("", "", 8080, "", 80));
        });
    }
    content.append(&tunnels_group);

    form.local_group.set_title("Local Shell");
    form.local_group.add(&form.working_dir);
    form.local_group.add(&form.startup_command);
    content.append(&form.local_group);

    let highlighting = adw::PreferencesGroup::builder().title("Highlighting").build();
    highlighting.add(&form.output_highlighting);
    highlighting.add(&form.command_highlighting);
    highlighting.add(&form.cat_colorization);
    highlighting.add(&form.shell_input);
    content.append(&highlighting);

    form.ssh_groups = vec![connection, options, tunnels_group];
    form.update_visibility();
    let form = Rc::new(form);

    for row in [&form.session_type, &form.auth] {
        let form = Rc::clone(&form);
        row.connect_selected_notify(move |_| form.update_visibility());
    }
    for row in [&form.post_login_enabled, &form.sftp_enabled, &form.tab_color_enabled] {
        let form = Rc::clone(&form);
        row.connect_active_notify(move |_| form.update_visibility());
    }

    let title = if is_edit { "Edit Session" } else { "New Session" };
    let window = form_window(parent, title, 560, &header, &content);
    window.set_default_height(640);

    setup_dialog_shortcuts(&window, Some(&save_btn));
    setup_entry_activation(&form.name, &save_btn);

    let window_weak = window.downgrade();
    cancel_btn.connect_clicked(move |_| {
        if let Some(window) = window_weak.upgrade() {
            window.close();
        }
    });

    let state = Rc::clone(state);
    let window_weak = window.downgrade();
    save_btn.connect_clicked(move |_| {
        let Some(window) = window_weak.upgrade() else {
            return;
        };
        let session = form.collect(&base);
        let errors = session.validation_errors();
        if !errors.is_empty() {
            show_errors(&status, &errors);
            return;
        }

        let position = if is_edit {
            let found = state
                .borrow()
                .operations()
                .find_session_by_name_and_path(&base.name, &base.folder_path)
                .map(|(_, position)| position);
            if found.is_none() {
                show_errors(&status, &["The session no longer exists.".to_string()]);
                return;
            }
            found
        } else {
            None
        };

        let password = form.password.text();
        let result = {
            let mut state_ref = state.borrow_mut();
            let operations = state_ref.operations_mut();
            match position {
                Some(position) => operations.update_session(position, session.clone()),
                None => operations.add_session(session.clone()),
            }
        };

        if !result.success {
            show_errors(&status, &[result.message]);
            return;
        }

        if session.uses_password_auth() && !password.is_empty() {
            let name = session.name.clone();
            let secret = SecretString::from(password.to_string());
            let toast_anchor = parent_anchor(&window);
            spawn_background(store_password(name, secret), move |stored| {
                if let Err(e) = stored {
                    tracing::error!(error = %e, "Failed to store session password");
                    if let Some(anchor) = toast_anchor {
                        show_toast_on_widget(
                            &anchor,
                            "Password could not be saved to the keyring",
                            ToastType::Error,
                        );
                    }
                }
            });
        }

        if let Some(anchor) = parent_anchor(&window) {
            show_toast_on_widget(&anchor, &result.message, ToastType::Success);
        }
        window.close();
    });

    window.present();
}

fn parent_anchor(window: &adw::Window) -> Option<gtk4::Window> {
    window.transient_for()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_index_round_trips() {
        for auth in [AuthType::Key, AuthType::Password, AuthType::None] {
            assert_eq!(auth_from_index(auth_index(auth)), auth);
        }
        assert_eq!(auth_from_index(42), AuthType::Key);
    }
}
