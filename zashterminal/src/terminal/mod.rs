//! Terminal tabs and split panes
//!
//! [`TabManager`] owns the `adw::TabView` of one window. Which terminal sits
//! in which pane of which tab is kept in a [`TabManagerModel`]; after every
//! structural change the tab's `gtk::Paned` tree is rebuilt from it.
//!
//! # Module Structure
//!
//! - `widget` - VTE setup, appearance and process spawning
//! - `panes` - `gtk::Paned` trees built from the pane model
//! - `search` - the in-terminal search bar

mod panes;
mod search;
mod widget;

pub use search::TerminalSearchBar;
pub use widget::{SpawnCommand, user_shell};

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{
    Box as GtkBox, CssProvider, Label, Orientation, ScrolledWindow, gdk, gio, glib,
};
use libadwaita as adw;
use secrecy::ExposeSecret;
use serde_json::json;
use vte4::Terminal;
use vte4::prelude::*;
use zashterminal_core::config::home_dir;
use zashterminal_core::launch::with_sshpass;
use zashterminal_core::layout::{LayoutNode, RestoredTerminal, SavedLayout, SessionStateFile};
use zashterminal_core::models::{SessionItem, SessionType};
use zashterminal_core::osc7::Osc7Tracker;
use zashterminal_core::secret::lookup_password;
use zashterminal_core::signals::AppEvent;
use zashterminal_core::split::{
    CloseOutcome, ExitAction, PaneId, PaneOrientation, TabId, TabManagerModel, TerminalRef,
};
use zashterminal_core::theme::TerminalAppearance;

use crate::async_utils::spawn_background;
use crate::state::SharedAppState;
use panes::RatioCallback;
use widget::{MAX_FONT_SCALE, MIN_FONT_SCALE, apply_appearance, create_terminal, ssh_options};

/// Font scale step for zoom in/out
const ZOOM_STEP: f64 = 1.1;

/// Title of ad-hoc local tabs before the shell reports anything
const LOCAL_TAB_TITLE: &str = "Local Terminal";

struct TerminalEntry {
    terminal: Terminal,
    scroller: ScrolledWindow,
}

/// What to run in a new terminal
enum Launch {
    Command(SpawnCommand),
    Ssh {
        session: SessionItem,
        initial_command: Option<String>,
    },
}

/// Tabbed terminal area of one window
pub struct TabManager {
    container: GtkBox,
    tab_view: adw::TabView,
    tab_bar: adw::TabBar,
    state: SharedAppState,
    model: RefCell<TabManagerModel>,
    terminals: RefCell<HashMap<String, TerminalEntry>>,
    pages: RefCell<HashMap<TabId, adw::TabPage>>,
    osc7: RefCell<Osc7Tracker>,
    /// Terminal that last had keyboard focus
    focused: RefCell<Option<String>>,
    color_provider: CssProvider,
    color_rules: RefCell<BTreeMap<String, String>>,
    home: PathBuf,
    on_last_tab_closed: RefCell<Option<Box<dyn Fn()>>>,
    quitting: Cell<bool>,
}

impl TabManager {
    /// Creates an empty tab area
    pub fn new(state: SharedAppState) -> Rc<Self> {
        let container = GtkBox::new(Orientation::Vertical, 0);

        let tab_view = adw::TabView::new();
        tab_view.set_hexpand(true);
        tab_view.set_vexpand(true);
        tab_view.add_css_class("terminal-tab-view");

        let tab_bar = adw::TabBar::new();
        tab_bar.set_view(Some(&tab_view));
        tab_bar.set_autohide(false);
        tab_bar.add_css_class("scrolled-tab-bar");

        container.append(&tab_bar);
        container.append(&tab_view);

        let color_provider = CssProvider::new();
        crate::theming::add_provider(&color_provider, gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION);

        let manager = Rc::new(Self {
            container,
            tab_view,
            tab_bar,
            state,
            model: RefCell::new(TabManagerModel::new()),
            terminals: RefCell::new(HashMap::new()),
            pages: RefCell::new(HashMap::new()),
            osc7: RefCell::new(Osc7Tracker::new()),
            focused: RefCell::new(None),
            color_provider,
            color_rules: RefCell::new(BTreeMap::new()),
            home: home_dir(),
            on_last_tab_closed: RefCell::new(None),
            quitting: Cell::new(false),
        });
        manager.apply_tab_alignment();
        manager.setup_tab_view_signals();
        manager
    }

    /// Returns the container widget (tab bar plus tab view)
    #[must_use]
    pub fn widget(&self) -> &GtkBox {
        &self.container
    }

    #[must_use]
    pub fn tab_view(&self) -> &adw::TabView {
        &self.tab_view
    }

    /// Number of open tabs
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.model.borrow().len()
    }

    /// Registers the callback run once the last tab is gone
    pub fn set_on_last_tab_closed(&self, callback: impl Fn() + 'static) {
        *self.on_last_tab_closed.borrow_mut() = Some(Box::new(callback));
    }

    fn setup_tab_view_signals(self: &Rc<Self>) {
        // Tabs cannot be torn off into a new window
        self.tab_view.connect_create_window(|_| {
            tracing::debug!("Tab tearoff is not supported");
            None
        });

        let weak = Rc::downgrade(self);
        self.tab_view.connect_close_page(move |view, page| {
            if let Some(manager) = weak.upgrade() {
                manager.forget_page(page);
            }
            view.close_page_finish(page, true);
            if let Some(manager) = weak.upgrade()
                && !manager.quitting.get()
                && manager.model.borrow().is_empty()
            {
                let weak = Rc::downgrade(&manager);
                glib::idle_add_local_once(move || {
                    if let Some(manager) = weak.upgrade()
                        && manager.model.borrow().is_empty()
                        && let Some(callback) = manager.on_last_tab_closed.borrow().as_ref()
                    {
                        callback();
                    }
                });
            }
            glib::Propagation::Stop
        });

        let weak = Rc::downgrade(self);
        self.tab_view.connect_selected_page_notify(move |view| {
            let Some(manager) = weak.upgrade() else {
                return;
            };
            let Some(page) = view.selected_page() else {
                return;
            };
            let Some(tab) = manager.tab_for_page(&page) else {
                return;
            };
            if let Err(e) = manager.model.borrow_mut().set_active(tab) {
                tracing::debug!(error = %e, "Selected page has no tab");
            }
            let weak = Rc::downgrade(&manager);
            glib::idle_add_local_once(move || {
                if let Some(manager) = weak.upgrade() {
                    manager.focus_tab(tab);
                }
            });
        });

        let weak = Rc::downgrade(self);
        self.tab_view.connect_page_reordered(move |_, page, position| {
            let Some(manager) = weak.upgrade() else {
                return;
            };
            let Some(moving) = manager.tab_for_page(page) else {
                return;
            };
            let mut model = manager.model.borrow_mut();
            let Some(from) = model.index_of(moving) else {
                return;
            };
            let Some(target) = usize::try_from(position)
                .ok()
                .and_then(|p| model.tabs().get(p))
                .map(|t| t.id)
            else {
                return;
            };
            let drop_right = usize::try_from(position).is_ok_and(|p| from < p);
            if let Err(e) = model.move_tab(moving, target, drop_right) {
                tracing::warn!(error = %e, "Failed to reorder tab");
            }
        });
    }

    fn apply_tab_alignment(&self) {
        let alignment = self
            .state
            .borrow()
            .settings()
            .get_string("tab_alignment", "center");
        self.tab_bar.set_expand_tabs(alignment != "left");
    }

    fn tab_for_page(&self, page: &adw::TabPage) -> Option<TabId> {
        self.pages
            .borrow()
            .iter()
            .find(|(_, p)| *p == page)
            .map(|(id, _)| *id)
    }

    fn page_for_tab(&self, tab: TabId) -> Option<adw::TabPage> {
        self.pages.borrow().get(&tab).cloned()
    }

    // Drops the page and, if the model still has the tab, every terminal in it
    fn forget_page(&self, page: &adw::TabPage) {
        let Some(tab) = self.tab_for_page(page) else {
            return;
        };
        self.pages.borrow_mut().remove(&tab);
        let closed = self.model.borrow_mut().close_tab(tab);
        if let Ok(closed) = closed {
            for pane in closed.panes().panes() {
                self.drop_terminal(&pane.terminal.terminal_id);
            }
        }
        tracing::debug!(tab = %tab, "Tab closed");
    }

    fn drop_terminal(&self, terminal_id: &str) {
        self.terminals.borrow_mut().remove(terminal_id);
        self.osc7.borrow_mut().untrack(terminal_id);
        if self.focused.borrow().as_deref() == Some(terminal_id) {
            *self.focused.borrow_mut() = None;
        }
        let signals = Rc::clone(self.state.borrow().signals());
        signals.emit(&AppEvent::TerminalClosed(terminal_id.to_string()));
    }

    // ---------------------------------------------------------------------
    // Opening tabs
    // ---------------------------------------------------------------------

    /// Opens a local shell, optionally in `working_dir` and running `command`
    pub fn open_local(self: &Rc<Self>, working_dir: Option<&str>, command: Option<&str>, close_after: bool) {
        let login = self.state.borrow().settings().get_bool("use_login_shell", false);
        let spawn = SpawnCommand::local_shell(&user_shell(), login, working_dir, command, close_after);
        let mut terminal = TerminalRef::local(LOCAL_TAB_TITLE);
        terminal.working_dir = spawn.working_dir.clone();
        self.open_tab(terminal, None, Launch::Command(spawn));
    }

    /// Opens a saved session in a new tab
    pub fn open_session(self: &Rc<Self>, session: &SessionItem, initial_command: Option<&str>) {
        let color = session.tab_color.clone().filter(|c| !c.trim().is_empty());
        if session.is_local() {
            let login = self.state.borrow().settings().get_bool("use_login_shell", false);
            let spawn = SpawnCommand::local_session(session, &user_shell(), login);
            let mut terminal = TerminalRef::local(&session.name);
            terminal.working_dir = spawn.working_dir.clone();
            self.open_tab(terminal, color, Launch::Command(spawn));
        } else {
            tracing::info!(session = %session.name, host = %session.host, "Opening SSH session");
            let launch = Launch::Ssh {
                session: session.clone(),
                initial_command: initial_command.map(str::to_string),
            };
            self.open_tab(TerminalRef::ssh(&session.name), color, launch);
        }
    }

    fn open_tab(self: &Rc<Self>, terminal: TerminalRef, color: Option<String>, launch: Launch) {
        let tab = self.model.borrow_mut().add_tab(terminal.clone(), color);
        self.create_page(tab);
        self.start_terminal(&terminal, launch);
        self.rebuild_tab(tab);
        self.select_tab(tab);
    }

    /// Reopens tabs from a saved layout or session state file
    pub fn restore_tabs(self: &Rc<Self>, tabs: &[LayoutNode]) {
        let sessions = self.state.borrow().operations().sessions().to_vec();
        let mut last = None;
        for node in tabs {
            let (tree, launches) = node.restore_tree(&sessions);
            let title = tree.first_pane().terminal.session_name.clone();
            let tab = self.model.borrow_mut().add_tab_with_panes(&title, tree);
            self.create_page(tab);
            for restored in launches {
                self.start_restored(restored);
            }
            self.rebuild_tab(tab);
            last = Some(tab);
        }
        if let Some(tab) = last {
            self.select_tab(tab);
        }
        tracing::info!(tabs = tabs.len(), "Tabs restored");
    }

    fn start_restored(self: &Rc<Self>, restored: RestoredTerminal) {
        let RestoredTerminal {
            terminal,
            session,
            initial_command,
        } = restored;
        let launch = match session {
            Some(session) if session.is_ssh() => Launch::Ssh {
                session,
                initial_command,
            },
            Some(session) => {
                let login = self.state.borrow().settings().get_bool("use_login_shell", false);
                let mut spawn = SpawnCommand::local_session(&session, &user_shell(), login);
                if let Some(dir) = terminal.working_dir.as_deref() {
                    let from_dir = SpawnCommand::local_shell(&user_shell(), login, Some(dir), None, false);
                    spawn.working_dir = from_dir.working_dir.or(spawn.working_dir);
                }
                Launch::Command(spawn)
            }
            None => {
                let login = self.state.borrow().settings().get_bool("use_login_shell", false);
                Launch::Command(SpawnCommand::local_shell(
                    &user_shell(),
                    login,
                    terminal.working_dir.as_deref(),
                    None,
                    false,
                ))
            }
        };
        self.start_terminal(&terminal, launch);
    }

    fn create_page(&self, tab: TabId) -> adw::TabPage {
        let content = GtkBox::new(Orientation::Vertical, 0);
        content.set_hexpand(true);
        content.set_vexpand(true);
        let page = self.tab_view.append(&content);

        if let Some(t) = self.model.borrow().tab(tab) {
            page.set_title(&t.base_title);
            page.set_tooltip(&t.base_title);
            let icon = match t.session_type {
                SessionType::Ssh => "network-server-symbolic",
                SessionType::Local => "utilities-terminal-symbolic",
            };
            page.set_icon(Some(&gio::ThemedIcon::new(icon)));
        }
        self.pages.borrow_mut().insert(tab, page.clone());
        page
    }

    fn select_tab(&self, tab: TabId) {
        if let Some(page) = self.page_for_tab(tab) {
            self.tab_view.set_selected_page(&page);
        }
        self.focus_tab(tab);
    }

    // ---------------------------------------------------------------------
    // Terminals
    // ---------------------------------------------------------------------

    fn appearance(&self) -> (TerminalAppearance, bool) {
        let state = self.state.borrow();
        let settings = state.settings();
        let appearance = TerminalAppearance::from_settings(settings, &settings.color_scheme());
        (appearance, settings.get_bool("scroll_on_output", true))
    }

    fn start_terminal(self: &Rc<Self>, terminal_ref: &TerminalRef, launch: Launch) {
        let id = terminal_ref.terminal_id.clone();
        let terminal = create_terminal();
        let (appearance, scroll_on_output) = self.appearance();
        apply_appearance(&terminal, &appearance, scroll_on_output);
        let scroller = widget::wrap_in_scroller(&terminal);

        self.connect_terminal_signals(&terminal, &id);
        self.terminals.borrow_mut().insert(
            id.clone(),
            TerminalEntry {
                terminal: terminal.clone(),
                scroller,
            },
        );

        match launch {
            Launch::Command(command) => self.spawn_command(&terminal, &id, &command),
            Launch::Ssh {
                session,
                initial_command,
            } => self.spawn_ssh(&terminal, &id, session, initial_command),
        }

        let signals = Rc::clone(self.state.borrow().signals());
        signals.emit(&AppEvent::TerminalCreated(id));
    }

    fn spawn_ssh(
        self: &Rc<Self>,
        terminal: &Terminal,
        id: &str,
        session: SessionItem,
        initial_command: Option<String>,
    ) {
        let options = {
            let state = self.state.borrow();
            ssh_options(state.settings(), &state.paths().cache_dir)
        };
        let command = SpawnCommand::ssh(&session, &options, initial_command.as_deref());
        if !session.uses_password_auth() {
            self.spawn_command(terminal, id, &command);
            return;
        }

        let weak = Rc::downgrade(self);
        let terminal = terminal.clone();
        let id = id.to_string();
        let name = session.name.clone();
        spawn_background(lookup_password(session.name), move |result| {
            let Some(manager) = weak.upgrade() else {
                return;
            };
            let mut command = command;
            match result {
                Ok(Some(password)) => {
                    command.argv = with_sshpass(command.argv);
                    command
                        .env
                        .push(format!("SSHPASS={}", password.expose_secret()));
                }
                Ok(None) => tracing::debug!(session = %name, "No stored password, ssh will prompt"),
                Err(e) => tracing::warn!(session = %name, error = %e, "Password lookup failed"),
            }
            manager.spawn_command(&terminal, &id, &command);
        });
    }

    fn spawn_command(self: &Rc<Self>, terminal: &Terminal, id: &str, command: &SpawnCommand) {
        let weak = Rc::downgrade(self);
        let failed_terminal = terminal.clone();
        let id = id.to_string();
        widget::spawn(terminal, command, move |result| {
            if let Err(e) = result {
                tracing::error!(terminal = %id, error = %e, "Failed to spawn terminal process");
                failed_terminal.feed(format!("\r\nFailed to start process: {e}\r\n").as_bytes());
                if let Some(manager) = weak.upgrade()
                    && let Err(e) = manager.model.borrow_mut().mark_spawn_failed(&id)
                {
                    tracing::debug!(error = %e, "Spawn failure for a closed terminal");
                }
            }
        });
    }

    fn connect_terminal_signals(self: &Rc<Self>, terminal: &Terminal, id: &str) {
        let weak = Rc::downgrade(self);
        let terminal_id = id.to_string();
        terminal.connect_window_title_changed(move |terminal| {
            let Some(manager) = weak.upgrade() else {
                return;
            };
            let title = terminal.window_title().map(|t| t.to_string()).unwrap_or_default();
            if title.is_empty() {
                return;
            }
            let tab = manager.model.borrow().find_terminal(&terminal_id).map(|(tab, _)| tab);
            if let Some(tab) = tab {
                manager.set_tab_title(tab, &title);
            }
            let signals = Rc::clone(manager.state.borrow().signals());
            signals.emit(&AppEvent::TerminalTitleChanged(terminal_id.clone(), title));
        });

        let weak = Rc::downgrade(self);
        let terminal_id = id.to_string();
        terminal.connect_current_directory_uri_changed(move |terminal| {
            let Some(manager) = weak.upgrade() else {
                return;
            };
            let Some(uri) = terminal.current_directory_uri() else {
                return;
            };
            let info = manager
                .osc7
                .borrow_mut()
                .update_with_home(&terminal_id, &uri, &manager.home);
            let Some(info) = info else {
                return;
            };
            let tab = {
                let mut model = manager.model.borrow_mut();
                if let Err(e) = model.set_working_dir(&terminal_id, &info.path) {
                    tracing::debug!(error = %e, "Directory report for a closed terminal");
                }
                model
                    .find_terminal(&terminal_id)
                    .map(|(tab, _)| tab)
                    .filter(|tab| {
                        model
                            .tab(*tab)
                            .is_some_and(|t| t.session_type == SessionType::Local)
                    })
            };
            if let Some(tab) = tab {
                manager.set_tab_title(tab, &info.display_path);
            }
        });

        let weak = Rc::downgrade(self);
        let terminal_id = id.to_string();
        terminal.connect_child_exited(move |_, status| {
            tracing::debug!(terminal = %terminal_id, status, "Terminal process exited");
            let weak = weak.clone();
            let terminal_id = terminal_id.clone();
            glib::idle_add_local_once(move || {
                if let Some(manager) = weak.upgrade() {
                    manager.on_child_exited(&terminal_id);
                }
            });
        });

        let focus = gtk4::EventControllerFocus::new();
        let weak = Rc::downgrade(self);
        let terminal_id = id.to_string();
        focus.connect_enter(move |_| {
            if let Some(manager) = weak.upgrade() {
                *manager.focused.borrow_mut() = Some(terminal_id.clone());
            }
        });
        terminal.add_controller(focus);

        self.attach_context_menu(terminal, id);
        attach_url_click(terminal);
    }

    fn on_child_exited(self: &Rc<Self>, terminal_id: &str) {
        let action = self.model.borrow_mut().on_child_exited(terminal_id);
        match action {
            ExitAction::Ignore => {}
            ExitAction::ClosePane { pane, .. } => self.close_pane(pane),
            ExitAction::CloseTab { tab } => {
                if let Some(page) = self.page_for_tab(tab) {
                    self.tab_view.close_page(&page);
                }
            }
            ExitAction::QuitApplication { tab } => {
                tracing::info!(tab = %tab, "Last live terminal exited, quitting");
                self.quit_application();
            }
        }
    }

    // Closes every tab, including ones whose terminal never spawned, then
    // asks the window to close from idle.
    fn quit_application(self: &Rc<Self>) {
        if self.quitting.replace(true) {
            return;
        }
        let closed = self.model.borrow_mut().close_all_tabs();
        for tab in &closed {
            for pane in tab.panes().panes() {
                self.drop_terminal(&pane.terminal.terminal_id);
            }
            let page = self.pages.borrow_mut().remove(&tab.id);
            if let Some(page) = page {
                self.tab_view.close_page(&page);
            }
        }
        let weak = Rc::downgrade(self);
        glib::idle_add_local_once(move || {
            if let Some(manager) = weak.upgrade()
                && let Some(callback) = manager.on_last_tab_closed.borrow().as_ref()
            {
                callback();
            }
        });
    }

    fn attach_context_menu(self: &Rc<Self>, terminal: &Terminal, id: &str) {
        let gesture = gtk4::GestureClick::new();
        gesture.set_button(gdk::BUTTON_SECONDARY);
        let weak = Rc::downgrade(self);
        let terminal_id = id.to_string();
        gesture.connect_pressed(move |gesture, _, x, y| {
            let Some(widget) = gesture.widget() else {
                return;
            };
            if let Some(manager) = weak.upgrade() {
                *manager.focused.borrow_mut() = Some(terminal_id.clone());
            }
            widget.grab_focus();

            let menu = gio::Menu::new();
            let clipboard = gio::Menu::new();
            clipboard.append(Some("Copy"), Some("app.copy"));
            clipboard.append(Some("Paste"), Some("app.paste"));
            clipboard.append(Some("Select All"), Some("app.select-all"));
            menu.append_section(None, &clipboard);

            let split = gio::Menu::new();
            split.append(Some("Split Horizontally"), Some("app.split-horizontal"));
            split.append(Some("Split Vertically"), Some("app.split-vertical"));
            split.append(Some("Move Pane to New Tab"), Some("win.move-pane-to-tab"));
            split.append(Some("Close Pane"), Some("app.close-pane"));
            menu.append_section(None, &split);

            let tools = gio::Menu::new();
            tools.append(Some("Search"), Some("app.toggle-search"));
            tools.append(Some("Clear Session"), Some("app.clear-session"));
            tools.append(Some("Ask AI Assistant"), Some("app.ai-assistant"));
            menu.append_section(None, &tools);

            let popover = gtk4::PopoverMenu::from_model(Some(&menu));
            popover.set_parent(&widget);
            popover.set_has_arrow(false);
            popover.set_pointing_to(Some(&gdk::Rectangle::new(x as i32, y as i32, 1, 1)));
            popover.connect_closed(|pop| {
                let pop = pop.clone();
                // Unparent after the activated action has run
                glib::idle_add_local_once(move || pop.unparent());
            });
            popover.popup();
            gesture.set_state(gtk4::EventSequenceState::Claimed);
        });
        terminal.add_controller(gesture);
    }

    // ---------------------------------------------------------------------
    // Layout
    // ---------------------------------------------------------------------

    fn color_class(&self, background: &str, foreground: &str) -> Option<String> {
        gdk::RGBA::parse(background).ok()?;
        let suffix: String = background
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        let class = format!("tab-color-{suffix}");
        let mut rules = self.color_rules.borrow_mut();
        if !rules.contains_key(&class) {
            rules.insert(
                class.clone(),
                format!(".{class} {{ background-color: {background}; color: {foreground}; }}"),
            );
            let css: Vec<&str> = rules.values().map(String::as_str).collect();
            self.color_provider.load_from_string(&css.join("\n"));
        }
        Some(class)
    }

    fn rebuild_tab(self: &Rc<Self>, tab: TabId) {
        let Some(page) = self.page_for_tab(tab) else {
            return;
        };
        let Ok(content) = page.child().downcast::<GtkBox>() else {
            return;
        };
        let (root, colors, title) = {
            let model = self.model.borrow();
            let Some(t) = model.tab(tab) else {
                return;
            };
            (t.panes().root().clone(), t.label_colors(), t.base_title.clone())
        };

        while let Some(child) = content.first_child() {
            content.remove(&child);
        }

        if let Some((background, foreground)) = colors
            && let Some(class) = self.color_class(&background, foreground)
        {
            let banner = Label::builder().label(&title).xalign(0.0).build();
            banner.add_css_class("tab-color-banner");
            banner.add_css_class(&class);
            content.append(&banner);
            page.set_indicator_icon(Some(&gio::ThemedIcon::new("media-record-symbolic")));
        }

        let scrollers: HashMap<String, ScrolledWindow> = self
            .terminals
            .borrow()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.scroller.clone()))
            .collect();
        let weak = Rc::downgrade(self);
        let on_ratio: RatioCallback = Rc::new(move |pane, ratio| {
            if let Some(manager) = weak.upgrade()
                && let Ok(mut model) = manager.model.try_borrow_mut()
            {
                model.update_ratio(pane, ratio);
            }
        });
        content.append(&panes::build(&root, &scrollers, &on_ratio));
        self.refresh_title(tab);
    }

    fn set_tab_title(&self, tab: TabId, new_title: &str) {
        let title = self.model.borrow().title_for(tab, new_title);
        if let (Some(title), Some(page)) = (title, self.page_for_tab(tab)) {
            page.set_title(&title);
        }
    }

    // Re-derives the title after the pane count changed
    fn refresh_title(&self, tab: TabId) {
        let base = {
            let model = self.model.borrow();
            let Some(t) = model.tab(tab) else {
                return;
            };
            let first = &t.panes().first_pane().terminal;
            let reported = self
                .terminals
                .borrow()
                .get(&first.terminal_id)
                .and_then(|e| e.terminal.window_title())
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty());
            reported.unwrap_or_else(|| match t.session_type {
                SessionType::Local => t.cwd_title(&self.home),
                SessionType::Ssh => t.base_title.clone(),
            })
        };
        self.set_tab_title(tab, &base);
    }

    fn focus_tab(&self, tab: TabId) {
        let target = {
            let model = self.model.borrow();
            let Some(t) = model.tab(tab) else {
                return;
            };
            let focused = self.focused.borrow().clone();
            focused
                .filter(|id| t.panes().find_terminal(id).is_some())
                .unwrap_or_else(|| t.panes().first_pane().terminal.terminal_id.clone())
        };
        self.focus_terminal(&target);
    }

    fn focus_pane(&self, pane: PaneId) {
        let target = {
            let model = self.model.borrow();
            model
                .tab_of_pane(pane)
                .and_then(|tab| model.tab(tab))
                .and_then(|t| t.panes().find(pane))
                .map(|leaf| leaf.terminal.terminal_id.clone())
        };
        if let Some(id) = target {
            self.focus_terminal(&id);
        }
    }

    fn focus_terminal(&self, terminal_id: &str) {
        let terminal = self
            .terminals
            .borrow()
            .get(terminal_id)
            .map(|e| e.terminal.clone());
        if let Some(terminal) = terminal {
            *self.focused.borrow_mut() = Some(terminal_id.to_string());
            terminal.grab_focus();
        }
    }

    // Focused terminal of the active tab, falling back to its first pane
    fn active_terminal_id(&self) -> Option<String> {
        let model = self.model.borrow();
        let tab = model.tab(model.active()?)?;
        let focused = self.focused.borrow().clone();
        Some(
            focused
                .filter(|id| tab.panes().find_terminal(id).is_some())
                .unwrap_or_else(|| tab.panes().first_pane().terminal.terminal_id.clone()),
        )
    }

    /// Terminal that keyboard actions apply to
    #[must_use]
    pub fn active_terminal(&self) -> Option<Terminal> {
        let id = self.active_terminal_id()?;
        self.terminals.borrow().get(&id).map(|e| e.terminal.clone())
    }

    // ---------------------------------------------------------------------
    // Pane and tab actions
    // ---------------------------------------------------------------------

    /// Splits the focused pane. SSH panes reopen the same session, local
    /// panes start a shell in the current directory.
    pub fn split_active(self: &Rc<Self>, orientation: PaneOrientation) {
        let Some(id) = self.active_terminal_id() else {
            return;
        };
        let Some((tab, pane, source)) = self
            .model
            .borrow()
            .find_terminal(&id)
            .map(|(tab, leaf)| (tab, leaf.id, leaf.terminal.clone()))
        else {
            return;
        };
        let cwd = self
            .osc7
            .borrow()
            .current_dir(&id)
            .map(str::to_string)
            .or_else(|| source.working_dir.clone());

        let session = match source.session_type {
            SessionType::Ssh => self
                .state
                .borrow()
                .operations()
                .find_session_by_name(&source.session_name)
                .cloned(),
            SessionType::Local => None,
        };
        let (terminal, launch) = if let Some(session) = session {
            (
                TerminalRef::ssh(&session.name),
                Launch::Ssh {
                    session,
                    initial_command: None,
                },
            )
        } else {
            let login = self.state.borrow().settings().get_bool("use_login_shell", false);
            let spawn = SpawnCommand::local_shell(&user_shell(), login, cwd.as_deref(), None, false);
            let mut terminal = TerminalRef::local(&source.session_name);
            terminal.working_dir = spawn.working_dir.clone();
            (terminal, Launch::Command(spawn))
        };

        let split = self
            .model
            .borrow_mut()
            .split_pane(pane, orientation, terminal.clone());
        match split {
            Ok(new_pane) => {
                self.start_terminal(&terminal, launch);
                self.rebuild_tab(tab);
                self.focus_pane(new_pane);
                tracing::debug!(orientation = %orientation, "Pane split");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to split pane"),
        }
    }

    fn close_pane(self: &Rc<Self>, pane: PaneId) {
        let Some(tab) = self.model.borrow().tab_of_pane(pane) else {
            return;
        };
        let outcome = self.model.borrow_mut().close_pane(pane);
        match outcome {
            Ok(CloseOutcome::Promoted { removed, focus }) => {
                self.drop_terminal(&removed.terminal.terminal_id);
                self.rebuild_tab(tab);
                self.focus_pane(focus);
            }
            Ok(CloseOutcome::TabEmptied(leaf)) => {
                self.drop_terminal(&leaf.terminal.terminal_id);
                if let Some(page) = self.page_for_tab(tab) {
                    self.tab_view.close_page(&page);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to close pane"),
        }
    }

    /// Closes the focused pane, or the tab if it is the only pane
    pub fn close_active_pane(self: &Rc<Self>) {
        let Some(id) = self.active_terminal_id() else {
            return;
        };
        let pane = self.model.borrow().find_terminal(&id).map(|(_, leaf)| leaf.id);
        if let Some(pane) = pane {
            self.close_pane(pane);
        }
    }

    pub fn close_active_tab(&self) {
        if let Some(page) = self.tab_view.selected_page() {
            self.tab_view.close_page(&page);
        }
    }

    pub fn next_tab(&self) {
        let next = self.model.borrow_mut().next_tab();
        if let Some(tab) = next {
            self.select_tab(tab);
        }
    }

    pub fn previous_tab(&self) {
        let previous = self.model.borrow_mut().previous_tab();
        if let Some(tab) = previous {
            self.select_tab(tab);
        }
    }

    /// Detaches the focused pane into its own tab
    pub fn move_active_pane_to_new_tab(self: &Rc<Self>) -> bool {
        let Some(id) = self.active_terminal_id() else {
            return false;
        };
        let Some((source, pane)) = self.model.borrow().find_terminal(&id).map(|(t, l)| (t, l.id)) else {
            return false;
        };
        let moved = self.model.borrow_mut().move_pane_to_new_tab(pane);
        match moved {
            Ok(tab) => {
                self.create_page(tab);
                self.rebuild_tab(source);
                self.rebuild_tab(tab);
                self.select_tab(tab);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Pane not moved");
                false
            }
        }
    }

    // ---------------------------------------------------------------------
    // Terminal actions
    // ---------------------------------------------------------------------

    pub fn copy(&self) {
        if let Some(terminal) = self.active_terminal()
            && terminal.has_selection()
        {
            terminal.copy_clipboard_format(vte4::Format::Text);
        }
    }

    pub fn paste(&self) {
        if let Some(terminal) = self.active_terminal() {
            terminal.paste_clipboard();
        }
    }

    pub fn select_all(&self) {
        if let Some(terminal) = self.active_terminal() {
            terminal.select_all();
        }
    }

    /// Clears the scrollback and asks the shell to redraw its prompt
    pub fn clear_active(&self) {
        if let Some(terminal) = self.active_terminal() {
            terminal.reset(true, true);
            terminal.feed_child(b"\x0c");
        }
    }

    /// Types `command` into the active terminal and runs it
    pub fn run_command(&self, command: &str) -> bool {
        let Some(terminal) = self.active_terminal() else {
            return false;
        };
        terminal.feed_child(format!("{command}\n").as_bytes());
        terminal.grab_focus();
        true
    }

    /// Multiplies the font scale by `ZOOM_STEP` (`steps` > 0) or divides
    /// it; `steps == 0` resets it
    pub fn zoom(&self, steps: i32) {
        let settings = std::sync::Arc::clone(self.state.borrow().settings());
        let current = settings.get_f64("font_scale", 1.0);
        let scale = if steps == 0 {
            1.0
        } else {
            (current * ZOOM_STEP.powi(steps)).clamp(MIN_FONT_SCALE, MAX_FONT_SCALE)
        };
        if let Err(e) = settings.set("font_scale", json!(scale)) {
            tracing::warn!(error = %e, "Failed to save font scale");
        }
        for entry in self.terminals.borrow().values() {
            entry.terminal.set_font_scale(scale);
        }
    }

    /// Re-applies appearance settings to every terminal
    pub fn apply_settings(&self) {
        let (appearance, scroll_on_output) = self.appearance();
        for entry in self.terminals.borrow().values() {
            apply_appearance(&entry.terminal, &appearance, scroll_on_output);
        }
        self.apply_tab_alignment();
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Snapshot for the session state file
    #[must_use]
    pub fn session_state(&self) -> SessionStateFile {
        SessionStateFile::from_tabs(&self.model.borrow())
    }

    /// Snapshot of every tab as a named layout in `folder_path`
    #[must_use]
    pub fn saved_layout(&self, folder_path: &str) -> SavedLayout {
        SavedLayout::from_tabs(&self.model.borrow(), folder_path)
    }
}

// Ctrl+click on a matched URL opens it
fn attach_url_click(terminal: &Terminal) {
    let gesture = gtk4::GestureClick::new();
    gesture.set_button(gdk::BUTTON_PRIMARY);
    gesture.connect_pressed(|gesture, _, x, y| {
        if !gesture
            .current_event_state()
            .contains(gdk::ModifierType::CONTROL_MASK)
        {
            return;
        }
        let Some(terminal) = gesture.widget().and_downcast::<Terminal>() else {
            return;
        };
        let (uri, _) = terminal.check_match_at(x, y);
        let Some(uri) = uri.or_else(|| terminal.check_hyperlink_at(x, y)) else {
            return;
        };
        gesture.set_state(gtk4::EventSequenceState::Claimed);
        if let Err(e) = open::that(uri.as_str()) {
            tracing::warn!(uri = %uri, error = %e, "Failed to open link");
        }
    });
    terminal.add_controller(gesture);
}
