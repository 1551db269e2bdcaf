//! GTK4 Application setup and initialization
//!
//! The application owns one [`SharedAppState`], one [`ThemeManager`] and
//! every open [`MainWindow`]. It handles its own command line so a second
//! `zashterminal` invocation is forwarded to the running instance and opens
//! a tab or window there according to `new_instance_behavior`.

use std::cell::{OnceCell, RefCell};
use std::path::Path;
use std::rc::Rc;

use adw::prelude::*;
use gtk4::{gio, glib};
use libadwaita as adw;
use zashterminal_core::config::AppConstants;
use zashterminal_core::config::defaults::pick_default_font;
use zashterminal_core::config::default_keybindings;
use zashterminal_core::launch::{LaunchDisposition, LaunchRequest, USAGE, launch_disposition};
use zashterminal_core::layout::{RESTORE_ASK, RESTORE_NEVER, SessionStateFile};
use zashterminal_core::signals::AppEvent;
use zashterminal_core::split::PaneOrientation;
use zashterminal_core::tracing::{set_console_log_level, set_log_to_file_enabled};

use crate::dialogs::{ask_restore_session, show_preferences_dialog, show_shortcuts_dialog};
use crate::state::{SharedAppState, create_shared_state, forward_setting_changes};
use crate::theming::{ThemeManager, load_base_css};
use crate::window::MainWindow;

/// Settings the display-wide theme depends on
const THEME_SETTINGS: &[&str] = &["gtk_theme", "color_scheme", "headerbar_transparency", "transparency"];

/// Everything shared by the windows of one application instance
struct AppContext {
    state: SharedAppState,
    theme: ThemeManager,
    windows: RefCell<Vec<Rc<MainWindow>>>,
}

impl AppContext {
    fn new(app: &adw::Application) -> Result<Rc<Self>, String> {
        load_base_css();
        let state = create_shared_state(&installed_default_font()).map_err(|e| e.to_string())?;
        let theme = ThemeManager::new();
        theme.apply(&state);

        let context = Rc::new(Self {
            state,
            theme,
            windows: RefCell::new(Vec::new()),
        });
        context.connect_bus();
        setup_app_actions(app, &context);
        apply_keybindings(app, &context.state);
        Ok(context)
    }

    fn connect_bus(self: &Rc<Self>) {
        forward_setting_changes(&self.state);
        let signals = Rc::clone(self.state.borrow().signals());
        let weak = Rc::downgrade(self);
        signals.connect(move |event| {
            let relevant = match event {
                AppEvent::SettingsChanged(key, _) => {
                    THEME_SETTINGS.contains(&key.as_str()) || key == "console_log_level" || key == "log_to_file"
                }
                AppEvent::ColorSchemeChanged(_) => true,
                _ => false,
            };
            if !relevant {
                return;
            }
            let event = event.clone();
            let weak = weak.clone();
            glib::idle_add_local_once(move || {
                if let Some(context) = weak.upgrade() {
                    context.on_event(&event);
                }
            });
        });
    }

    fn on_event(&self, event: &AppEvent) {
        match event {
            AppEvent::SettingsChanged(key, value) if key == "console_log_level" => {
                if let Some(level) = value.as_str() {
                    set_console_log_level(level);
                }
            }
            AppEvent::SettingsChanged(key, value) if key == "log_to_file" => {
                set_log_to_file_enabled(value.as_bool().unwrap_or(false));
            }
            _ => self.theme.apply(&self.state),
        }
    }

    /// The focused window, or the most recently opened one
    fn active_window(&self, app: &adw::Application) -> Option<Rc<MainWindow>> {
        let windows = self.windows.borrow();
        app.active_window()
            .and_then(|active| {
                windows
                    .iter()
                    .find(|w| w.gtk_window().upcast_ref::<gtk4::Window>() == &active)
                    .cloned()
            })
            .or_else(|| windows.last().cloned())
    }

    fn open_window(self: &Rc<Self>, app: &adw::Application) -> Rc<MainWindow> {
        let window = MainWindow::new(app, Rc::clone(&self.state));
        self.windows.borrow_mut().push(Rc::clone(&window));

        let weak_context = Rc::downgrade(self);
        let weak_window = Rc::downgrade(&window);
        window.gtk_window().connect_close_request(move |_| {
            if let (Some(context), Some(window)) = (weak_context.upgrade(), weak_window.upgrade()) {
                context.on_window_closing(&window);
            }
            glib::Propagation::Proceed
        });

        tracing::debug!(windows = self.windows.borrow().len(), "Window opened");
        window
    }

    fn on_window_closing(&self, window: &Rc<MainWindow>) {
        let last = {
            let mut windows = self.windows.borrow_mut();
            windows.retain(|w| !Rc::ptr_eq(w, window));
            windows.is_empty()
        };
        if last {
            self.save_session_state(window);
        }
    }

    /// Writes the tabs of the last closing window for the next start
    fn save_session_state(&self, window: &MainWindow) {
        let (policy, path) = {
            let state = self.state.borrow();
            (state.settings().session_restore_policy(), state.paths().state_file())
        };
        let snapshot = window.tabs().session_state();
        if policy == RESTORE_NEVER || snapshot.tabs.is_empty() {
            SessionStateFile::clear(&path);
            return;
        }
        if let Err(e) = snapshot.save(&path) {
            tracing::error!(error = %e, "Failed to save session state");
        }
    }

    /// Opens, focuses or adds to a window as the launch and
    /// `new_instance_behavior` dictate
    fn handle_launch(self: &Rc<Self>, app: &adw::Application, request: &LaunchRequest) {
        let has_window = !self.windows.borrow().is_empty();
        let behavior = self
            .state
            .borrow()
            .settings()
            .get_string("new_instance_behavior", "new_tab");

        match launch_disposition(request, &behavior, has_window) {
            LaunchDisposition::NewWindow => {
                let window = self.open_window(app);
                window.present();
                if has_window || request.has_explicit_target() {
                    window.open_launch(request);
                } else {
                    self.restore_or_start(&window, request);
                }
            }
            LaunchDisposition::FocusExisting => {
                if let Some(window) = self.active_window(app) {
                    window.present();
                }
            }
            LaunchDisposition::NewTab => {
                if let Some(window) = self.active_window(app) {
                    window.open_launch(request);
                    window.present();
                }
            }
        }
    }

    /// Restores the previous session into the first window, or opens a
    /// plain local tab
    fn restore_or_start(&self, window: &Rc<MainWindow>, request: &LaunchRequest) {
        let (policy, path) = {
            let state = self.state.borrow();
            (state.settings().session_restore_policy(), state.paths().state_file())
        };
        let saved = match SessionStateFile::take(&path, &policy) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable session state file ignored");
                SessionStateFile::clear(&path);
                None
            }
        };
        let Some(saved) = saved else {
            window.open_launch(request);
            return;
        };

        if policy == RESTORE_ASK {
            let weak = Rc::downgrade(window);
            let request = request.clone();
            ask_restore_session(window.gtk_window(), saved.tabs.len(), move |restore| {
                let Some(window) = weak.upgrade() else {
                    return;
                };
                if restore {
                    window.tabs().restore_tabs(&saved.tabs);
                }
                if window.tabs().tab_count() == 0 {
                    window.open_launch(&request);
                }
            });
        } else {
            window.tabs().restore_tabs(&saved.tabs);
            if window.tabs().tab_count() == 0 {
                window.open_launch(request);
            }
        }
    }
}

/// First font from the preferred list that Pango can find
fn installed_default_font() -> String {
    let probe = gtk4::Label::new(None);
    let families: Vec<String> = probe
        .pango_context()
        .list_families()
        .iter()
        .map(|f| f.name().to_lowercase())
        .collect();
    pick_default_font(|family| families.contains(&family.to_lowercase()))
}

/// Makes a relative working directory absolute against the invoking
/// process's directory
fn resolve_working_directory(request: &mut LaunchRequest, cwd: Option<&Path>) {
    if let (Some(dir), Some(cwd)) = (request.working_directory.as_mut(), cwd)
        && dir.is_relative()
    {
        *dir = cwd.join(&*dir);
    }
}

/// Creates and configures the GTK4 Application
#[must_use]
pub fn create_application() -> adw::Application {
    let app = adw::Application::builder()
        .application_id(AppConstants::APP_ID)
        .flags(gio::ApplicationFlags::HANDLES_COMMAND_LINE)
        .build();

    let context: Rc<OnceCell<Rc<AppContext>>> = Rc::new(OnceCell::new());

    {
        let context = Rc::clone(&context);
        app.connect_startup(move |app| match AppContext::new(app) {
            Ok(ctx) => {
                let _ = context.set(ctx);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize application state");
                show_startup_error(app, "Initialization Error", &e);
            }
        });
    }

    {
        let context = Rc::clone(&context);
        app.connect_command_line(move |app, command_line| {
            let Some(ctx) = context.get() else {
                return glib::ExitCode::FAILURE;
            };
            let args: Vec<String> = command_line
                .arguments()
                .iter()
                .skip(1)
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            let mut request = match LaunchRequest::parse(&args) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid command line forwarded");
                    return glib::ExitCode::FAILURE;
                }
            };
            if request.help || request.version {
                tracing::info!("Help or version requested from a forwarded command line:\n{USAGE}");
                return glib::ExitCode::SUCCESS;
            }
            resolve_working_directory(&mut request, command_line.cwd().as_deref());
            ctx.handle_launch(app, &request);
            glib::ExitCode::SUCCESS
        });
    }

    {
        let context = Rc::clone(&context);
        app.connect_activate(move |app| {
            if let Some(ctx) = context.get() {
                ctx.handle_launch(app, &LaunchRequest::default());
            }
        });
    }

    app.connect_shutdown(move |_| {
        if let Some(ctx) = context.get()
            && let Err(e) = ctx.state.borrow().flush_persistence()
        {
            tracing::error!(%e, "Failed to flush persistence on shutdown");
        }
    });

    app
}

fn add_app_action(
    app: &adw::Application,
    context: &Rc<AppContext>,
    name: &str,
    handler: impl Fn(&adw::Application, &Rc<AppContext>) + 'static,
) {
    let action = gio::SimpleAction::new(name, None);
    let weak = Rc::downgrade(context);
    let app_weak = app.downgrade();
    action.connect_activate(move |_, _| {
        if let (Some(context), Some(app)) = (weak.upgrade(), app_weak.upgrade()) {
            handler(&app, &context);
        }
    });
    app.add_action(&action);
}

/// Registers an action that works on the active window
fn add_window_action(
    app: &adw::Application,
    context: &Rc<AppContext>,
    name: &str,
    handler: impl Fn(&Rc<MainWindow>) + 'static,
) {
    add_app_action(app, context, name, move |app, context| {
        if let Some(window) = context.active_window(app) {
            handler(&window);
        }
    });
}

/// Sets up application-level actions
fn setup_app_actions(app: &adw::Application, context: &Rc<AppContext>) {
    add_window_action(app, context, "new-local-tab", |w| w.tabs().open_local(None, None, false));
    add_window_action(app, context, "close-tab", |w| w.tabs().close_active_tab());
    add_window_action(app, context, "next-tab", |w| w.tabs().next_tab());
    add_window_action(app, context, "previous-tab", |w| w.tabs().previous_tab());
    add_window_action(app, context, "split-horizontal", |w| {
        w.tabs().split_active(PaneOrientation::Horizontal);
    });
    add_window_action(app, context, "split-vertical", |w| {
        w.tabs().split_active(PaneOrientation::Vertical);
    });
    add_window_action(app, context, "close-pane", |w| w.tabs().close_active_pane());
    add_window_action(app, context, "copy", |w| w.tabs().copy());
    add_window_action(app, context, "paste", |w| w.tabs().paste());
    add_window_action(app, context, "select-all", |w| w.tabs().select_all());
    add_window_action(app, context, "clear-session", |w| w.tabs().clear_active());
    add_window_action(app, context, "toggle-search", |w| w.toggle_search());
    add_window_action(app, context, "ai-assistant", |w| w.toggle_ai_panel());
    add_window_action(app, context, "zoom-in", |w| w.tabs().zoom(1));
    add_window_action(app, context, "zoom-out", |w| w.tabs().zoom(-1));
    add_window_action(app, context, "zoom-reset", |w| w.tabs().zoom(0));
    add_window_action(app, context, "toggle-sidebar", |w| w.toggle_sidebar());

    add_app_action(app, context, "new-window", |app, context| {
        let window = context.open_window(app);
        window.present();
        window.tabs().open_local(None, None, false);
    });

    add_app_action(app, context, "preferences", |app, context| {
        if let Some(window) = context.active_window(app) {
            show_preferences_dialog(window.gtk_window(), &context.state);
        }
    });

    add_app_action(app, context, "shortcuts", |app, context| {
        if let Some(window) = context.active_window(app) {
            show_shortcuts_dialog(window.gtk_window(), &context.state, app.upcast_ref());
        }
    });

    add_app_action(app, context, "about", |app, context| {
        if let Some(window) = context.active_window(app) {
            show_about_dialog(window.gtk_window());
        }
    });

    // Closing every window runs the same state saving as closing them by hand
    add_app_action(app, context, "quit", |app, context| {
        let windows: Vec<Rc<MainWindow>> = context.windows.borrow().clone();
        for window in windows {
            window.gtk_window().close();
        }
        app.quit();
    });
}

/// Installs the accelerator of every keybinding action from settings
pub fn apply_keybindings(app: &adw::Application, state: &SharedAppState) {
    let settings = std::sync::Arc::clone(state.borrow().settings());
    for def in default_keybindings() {
        let accel = settings.get_shortcut(&def.action);
        if accel.is_empty() {
            app.set_accels_for_action(&def.detailed_action(), &[]);
        } else {
            app.set_accels_for_action(&def.detailed_action(), &[accel.as_str()]);
        }
    }
    tracing::debug!("Keyboard shortcuts applied");
}

/// Shows the about dialog
fn show_about_dialog(parent: &adw::ApplicationWindow) {
    let debug_info = format!(
        "{app} {version}\n\
         GTK {gtk_major}.{gtk_minor}.{gtk_micro}\n\
         libadwaita {adw_major}.{adw_minor}.{adw_micro}\n\
         OS: {os}",
        app = AppConstants::APP_TITLE,
        version = AppConstants::APP_VERSION,
        gtk_major = gtk4::major_version(),
        gtk_minor = gtk4::minor_version(),
        gtk_micro = gtk4::micro_version(),
        adw_major = adw::major_version(),
        adw_minor = adw::minor_version(),
        adw_micro = adw::micro_version(),
        os = std::env::consts::OS,
    );

    let about = adw::AboutDialog::builder()
        .application_name(AppConstants::APP_TITLE)
        .developer_name(AppConstants::DEVELOPER_NAME)
        .version(AppConstants::APP_VERSION)
        .comments("A terminal for local shells and saved SSH sessions, with split panes and an AI command assistant.")
        .website(AppConstants::WEBSITE)
        .issue_url(AppConstants::ISSUE_URL)
        .license_type(gtk4::License::Gpl30)
        .developers(vec![AppConstants::DEVELOPER_NAME])
        .copyright(AppConstants::COPYRIGHT)
        .application_icon(AppConstants::APP_ID)
        .debug_info(&debug_info)
        .debug_info_filename("zashterminal-debug-info.txt")
        .build();

    about.add_legal_section(
        "GTK4, libadwaita & VTE",
        Some("© The GNOME Project"),
        gtk4::License::Lgpl21,
        None,
    );

    about.present(Some(parent));
}

/// Shows an error before any window exists
fn show_startup_error(app: &adw::Application, title: &str, message: &str) {
    let dialog = adw::AlertDialog::new(Some(title), Some(message));
    dialog.add_response("ok", "OK");
    dialog.set_default_response(Some("ok"));

    let window = adw::ApplicationWindow::builder().application(app).build();
    window.present();
    let closing = window.clone();
    dialog.connect_response(None, move |_, _| closing.close());
    dialog.present(Some(&window));
}

/// Runs the GTK4 application
///
/// # Returns
///
/// Returns `glib::ExitCode::FAILURE` if libadwaita initialization fails,
/// otherwise returns the application's exit code.
pub fn run() -> glib::ExitCode {
    if let Err(e) = adw::init() {
        tracing::error!(%e, "Failed to initialize libadwaita");
        return glib::ExitCode::FAILURE;
    }

    let app = create_application();
    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn relative_directory_resolves_against_caller() {
        let mut request = LaunchRequest::parse(["projects/web"]).unwrap();
        resolve_working_directory(&mut request, Some(Path::new("/home/ana")));
        assert_eq!(request.working_directory, Some(PathBuf::from("/home/ana/projects/web")));
    }

    #[test]
    fn absolute_directory_is_kept() {
        let mut request = LaunchRequest::parse(["-w", "/srv"]).unwrap();
        resolve_working_directory(&mut request, Some(Path::new("/home/ana")));
        assert_eq!(request.working_directory, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn theme_settings_cover_transparency() {
        assert!(THEME_SETTINGS.contains(&"transparency"));
        assert!(THEME_SETTINGS.contains(&"gtk_theme"));
    }
}
