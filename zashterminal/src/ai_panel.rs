//! AI assistant side panel
//!
//! Requests run on the tokio runtime. Streamed pieces come back over a
//! channel drained on the main loop; while a reply is arriving only its
//! `reply` text is shown, and the finished reply is re-rendered as Pango
//! markup with one button row per suggested command.

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use std::sync::mpsc;

use gtk4::prelude::*;
use gtk4::{
    Box as GtkBox, Button, Label, MenuButton, Orientation, Popover, ScrolledWindow, TextView,
    gdk, glib,
};
use libadwaita as adw;
use zashterminal_core::ai::{
    AiClient, AiConfig, AssistantReply, ChatMessage, ChatRole, CodeColors, RECENT_MESSAGES,
    SuggestedCommand, build_messages, default_system_prompt, extract_partial_reply, markdown_to_pango,
    parse_assistant_payload,
};
use zashterminal_core::error::AiResult;

use crate::async_utils::poll_channel;
use crate::state::SharedAppState;
use crate::theming::PANEL_CSS_CLASS;
use crate::toast::{ToastType, show_toast_on_widget};

/// Prompts offered on an empty conversation
const DEFAULT_QUICK_PROMPTS: &[&str] = &[
    "Explain the last error in my terminal",
    "Find the largest files in this directory",
    "Show which process is listening on a port",
    "Check disk usage",
];

type RunCommand = Rc<dyn Fn(&str) -> bool>;

/// Messages from the request task
enum StreamEvent {
    Chunk(String),
    Finished(AiResult<String>),
}

/// Assistant bubble that fills in while the reply streams
struct PendingReply {
    bubble: GtkBox,
    label: Label,
    raw: String,
}

/// The assistant panel of one window
pub struct AiPanel {
    container: GtkBox,
    messages: GtkBox,
    scroller: ScrolledWindow,
    input: TextView,
    send_btn: Button,
    quick_prompts: gtk4::FlowBox,
    state: SharedAppState,
    run_command: RunCommand,
    busy: Cell<bool>,
    system_prompt: OnceCell<String>,
    pending: RefCell<Option<PendingReply>>,
}

impl AiPanel {
    /// Creates the panel; `run_command` types a command into the active
    /// terminal and reports whether there was one
    pub fn new(state: SharedAppState, run_command: impl Fn(&str) -> bool + 'static) -> Rc<Self> {
        let container = GtkBox::new(Orientation::Vertical, 0);
        container.add_css_class("ai-panel");
        container.add_css_class(PANEL_CSS_CLASS);
        container.set_width_request(340);

        let messages = GtkBox::new(Orientation::Vertical, 8);
        messages.set_margin_start(10);
        messages.set_margin_end(10);
        messages.set_margin_top(10);
        messages.set_margin_bottom(10);
        let scroller = ScrolledWindow::builder()
            .hscrollbar_policy(gtk4::PolicyType::Never)
            .vexpand(true)
            .child(&messages)
            .build();

        let quick_prompts = gtk4::FlowBox::builder()
            .selection_mode(gtk4::SelectionMode::None)
            .max_children_per_line(2)
            .row_spacing(4)
            .column_spacing(4)
            .margin_start(10)
            .margin_end(10)
            .build();

        let input = TextView::builder()
            .wrap_mode(gtk4::WrapMode::WordChar)
            .accepts_tab(false)
            .top_margin(6)
            .bottom_margin(6)
            .left_margin(6)
            .right_margin(6)
            .hexpand(true)
            .build();
        input.add_css_class("ai-input");
        let input_scroller = ScrolledWindow::builder()
            .hscrollbar_policy(gtk4::PolicyType::Never)
            .min_content_height(60)
            .max_content_height(160)
            .propagate_natural_height(true)
            .child(&input)
            .build();
        let send_btn = Button::builder()
            .icon_name("mail-send-symbolic")
            .tooltip_text("Send (Enter)")
            .valign(gtk4::Align::End)
            .css_classes(["suggested-action", "circular"])
            .build();
        let input_row = GtkBox::new(Orientation::Horizontal, 6);
        input_row.set_margin_start(10);
        input_row.set_margin_end(10);
        input_row.set_margin_top(6);
        input_row.set_margin_bottom(10);
        input_row.append(&input_scroller);
        input_row.append(&send_btn);

        let panel = Rc::new(Self {
            container,
            messages,
            scroller,
            input,
            send_btn,
            quick_prompts,
            state,
            run_command: Rc::new(run_command),
            busy: Cell::new(false),
            system_prompt: OnceCell::new(),
            pending: RefCell::new(None),
        });

        panel.container.append(&panel.create_header());
        panel.container.append(&gtk4::Separator::new(Orientation::Horizontal));
        panel.container.append(&panel.scroller);
        panel.container.append(&panel.quick_prompts);
        panel.container.append(&input_row);
        panel.setup_input();
        panel.fill_quick_prompts();
        panel.reload_history();
        panel
    }

    #[must_use]
    pub fn widget(&self) -> &GtkBox {
        &self.container
    }

    /// Moves keyboard focus to the prompt
    pub fn focus_input(&self) {
        self.input.grab_focus();
    }

    fn create_header(self: &Rc<Self>) -> GtkBox {
        let header = GtkBox::new(Orientation::Horizontal, 4);
        header.set_margin_start(10);
        header.set_margin_end(6);
        header.set_margin_top(6);
        header.set_margin_bottom(6);

        let title = Label::builder()
            .label("AI Assistant")
            .xalign(0.0)
            .hexpand(true)
            .css_classes(["heading"])
            .build();
        header.append(&title);

        let new_btn = Button::builder()
            .icon_name("document-new-symbolic")
            .tooltip_text("New Conversation")
            .css_classes(["flat"])
            .build();
        let weak = Rc::downgrade(self);
        new_btn.connect_clicked(move |_| {
            if let Some(panel) = weak.upgrade() {
                panel.new_conversation();
            }
        });
        header.append(&new_btn);

        let history_btn = MenuButton::builder()
            .icon_name("document-open-recent-symbolic")
            .tooltip_text("Conversations")
            .css_classes(["flat"])
            .build();
        let popover = Popover::new();
        history_btn.set_popover(Some(&popover));
        let weak = Rc::downgrade(self);
        popover.connect_show(move |popover| {
            if let Some(panel) = weak.upgrade() {
                popover.set_child(Some(&panel.conversation_list(popover)));
            }
        });
        header.append(&history_btn);

        let settings_btn = Button::builder()
            .icon_name("emblem-system-symbolic")
            .tooltip_text("Assistant Settings")
            .action_name("win.ai-settings")
            .css_classes(["flat"])
            .build();
        header.append(&settings_btn);
        header
    }

    fn setup_input(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.send_btn.connect_clicked(move |_| {
            if let Some(panel) = weak.upgrade() {
                panel.send_input();
            }
        });

        // Enter sends, Shift+Enter inserts a newline
        let key_ctrl = gtk4::EventControllerKey::new();
        let weak = Rc::downgrade(self);
        key_ctrl.connect_key_pressed(move |_, key, _, modifiers| {
            let is_enter = matches!(key, gdk::Key::Return | gdk::Key::KP_Enter);
            if !is_enter || modifiers.contains(gdk::ModifierType::SHIFT_MASK) {
                return glib::Propagation::Proceed;
            }
            if let Some(panel) = weak.upgrade() {
                panel.send_input();
            }
            glib::Propagation::Stop
        });
        self.input.add_controller(key_ctrl);
    }

    fn fill_quick_prompts(self: &Rc<Self>) {
        let custom: Vec<String> = self
            .state
            .borrow()
            .settings()
            .get_or("ai_custom_quick_prompts", Vec::new());
        let prompts: Vec<String> = if custom.is_empty() {
            DEFAULT_QUICK_PROMPTS.iter().map(|p| (*p).to_string()).collect()
        } else {
            custom
        };

        while let Some(child) = self.quick_prompts.first_child() {
            self.quick_prompts.remove(&child);
        }
        for prompt in prompts {
            let button = Button::builder()
                .label(&prompt)
                .css_classes(["pill", "ai-quick-prompt"])
                .build();
            let weak = Rc::downgrade(self);
            button.connect_clicked(move |_| {
                if let Some(panel) = weak.upgrade() {
                    panel.send(&prompt);
                }
            });
            self.quick_prompts.insert(&button, -1);
        }
        self.update_quick_prompts();
    }

    fn update_quick_prompts(&self) {
        let empty = self.state.borrow().ai_history().messages().is_empty();
        self.quick_prompts.set_visible(empty);
    }

    // ---------------------------------------------------------------------
    // Conversations
    // ---------------------------------------------------------------------

    fn clear_messages(&self) {
        while let Some(child) = self.messages.first_child() {
            self.messages.remove(&child);
        }
    }

    /// Shows the current conversation from the history file
    pub fn reload_history(&self) {
        self.clear_messages();
        let entries = self.state.borrow().ai_history().messages().to_vec();
        for entry in entries {
            match entry.role {
                ChatRole::User => self.append_user(&entry.content),
                ChatRole::Assistant => {
                    let reply = AssistantReply {
                        reply: entry.content.clone(),
                        commands: entry
                            .commands
                            .iter()
                            .map(|c| SuggestedCommand {
                                command: c.clone(),
                                description: String::new(),
                            })
                            .collect(),
                    };
                    let (bubble, label) = self.assistant_bubble();
                    self.render_reply(&bubble, &label, &reply);
                }
                ChatRole::System => {}
            }
        }
        self.update_quick_prompts();
        self.scroll_to_end();
    }

    fn new_conversation(&self) {
        if self.busy.get() {
            return;
        }
        let created = self.state.borrow_mut().ai_history_mut().new_conversation();
        if let Err(e) = created {
            tracing::error!(error = %e, "Failed to start conversation");
        }
        self.reload_history();
    }

    fn conversation_list(self: &Rc<Self>, popover: &Popover) -> GtkBox {
        let list = GtkBox::new(Orientation::Vertical, 2);
        list.set_width_request(280);
        let conversations: Vec<(String, String)> = self
            .state
            .borrow()
            .ai_history()
            .all_conversations()
            .filter_map(|c| {
                let title = c.title()?;
                let title: String = title.lines().next().unwrap_or(title).chars().take(48).collect();
                Some((c.id.clone(), title))
            })
            .collect();

        if conversations.is_empty() {
            list.append(
                &Label::builder()
                    .label("No saved conversations")
                    .css_classes(["dim-label"])
                    .margin_top(12)
                    .margin_bottom(12)
                    .build(),
            );
        }

        for (id, title) in conversations {
            let row = GtkBox::new(Orientation::Horizontal, 4);
            let open = Button::builder()
                .label(&title)
                .hexpand(true)
                .css_classes(["flat"])
                .build();
            if let Some(label) = open.child().and_downcast::<Label>() {
                label.set_xalign(0.0);
                label.set_ellipsize(gtk4::pango::EllipsizeMode::End);
            }
            let delete = Button::builder()
                .icon_name("user-trash-symbolic")
                .tooltip_text("Delete Conversation")
                .css_classes(["flat"])
                .build();
            {
                let weak = Rc::downgrade(self);
                let popover = popover.clone();
                let id = id.clone();
                open.connect_clicked(move |_| {
                    popover.popdown();
                    let Some(panel) = weak.upgrade() else {
                        return;
                    };
                    let loaded = panel.state.borrow_mut().ai_history_mut().load_conversation(&id);
                    if let Err(e) = loaded {
                        tracing::error!(error = %e, "Failed to open conversation");
                    }
                    panel.reload_history();
                });
            }
            {
                let weak = Rc::downgrade(self);
                let popover = popover.clone();
                delete.connect_clicked(move |_| {
                    popover.popdown();
                    let Some(panel) = weak.upgrade() else {
                        return;
                    };
                    let deleted = panel.state.borrow_mut().ai_history_mut().delete_conversation(&id);
                    if let Err(e) = deleted {
                        tracing::error!(error = %e, "Failed to delete conversation");
                    }
                    panel.reload_history();
                });
            }
            row.append(&open);
            row.append(&delete);
            list.append(&row);
        }

        let clear_all = Button::builder()
            .label("Clear All History")
            .css_classes(["destructive-action"])
            .margin_top(6)
            .build();
        let weak = Rc::downgrade(self);
        let popover = popover.clone();
        clear_all.connect_clicked(move |_| {
            popover.popdown();
            let Some(panel) = weak.upgrade() else {
                return;
            };
            let cleared = panel.state.borrow_mut().ai_history_mut().clear_all();
            if let Err(e) = cleared {
                tracing::error!(error = %e, "Failed to clear AI history");
            }
            panel.reload_history();
        });
        list.append(&clear_all);
        list
    }

    // ---------------------------------------------------------------------
    // Message bubbles
    // ---------------------------------------------------------------------

    fn append_user(&self, text: &str) {
        let label = Label::builder()
            .label(text)
            .wrap(true)
            .wrap_mode(gtk4::pango::WrapMode::WordChar)
            .xalign(0.0)
            .selectable(true)
            .build();
        let bubble = GtkBox::new(Orientation::Vertical, 0);
        bubble.add_css_class("ai-message");
        bubble.add_css_class("ai-message-user");
        bubble.set_halign(gtk4::Align::End);
        bubble.append(&label);
        self.messages.append(&bubble);
    }

    fn assistant_bubble(&self) -> (GtkBox, Label) {
        let label = Label::builder()
            .wrap(true)
            .wrap_mode(gtk4::pango::WrapMode::WordChar)
            .xalign(0.0)
            .selectable(true)
            .build();
        let bubble = GtkBox::new(Orientation::Vertical, 6);
        bubble.add_css_class("ai-message");
        bubble.add_css_class("ai-message-assistant");
        bubble.set_halign(gtk4::Align::Fill);
        bubble.append(&label);
        self.messages.append(&bubble);
        (bubble, label)
    }

    fn append_error(&self, message: &str) {
        let label = Label::builder()
            .label(message)
            .wrap(true)
            .xalign(0.0)
            .css_classes(["error", "ai-message"])
            .build();
        self.messages.append(&label);
        self.scroll_to_end();
    }

    fn render_reply(&self, bubble: &GtkBox, label: &Label, reply: &AssistantReply) {
        let dark = adw::StyleManager::default().is_dark();
        label.set_markup(&markdown_to_pango(&reply.reply, CodeColors::for_dark_theme(dark)));
        for command in &reply.commands {
            bubble.append(&self.command_row(&command.command, &command.description));
        }
    }

    fn command_row(&self, command: &str, description: &str) -> GtkBox {
        let row = GtkBox::new(Orientation::Horizontal, 4);
        row.add_css_class("ai-command");

        let text = GtkBox::new(Orientation::Vertical, 2);
        text.set_hexpand(true);
        let command_label = Label::builder()
            .label(command)
            .xalign(0.0)
            .wrap(true)
            .wrap_mode(gtk4::pango::WrapMode::Char)
            .selectable(true)
            .css_classes(["monospace"])
            .build();
        text.append(&command_label);
        if !description.is_empty() {
            text.append(
                &Label::builder()
                    .label(description)
                    .xalign(0.0)
                    .wrap(true)
                    .css_classes(["dim-label", "caption"])
                    .build(),
            );
        }
        row.append(&text);

        let run = Button::builder()
            .icon_name("media-playback-start-symbolic")
            .tooltip_text("Run in Terminal")
            .valign(gtk4::Align::Center)
            .css_classes(["flat"])
            .build();
        let run_command = Rc::clone(&self.run_command);
        let cmd = command.to_string();
        run.connect_clicked(move |btn| {
            if !run_command(&cmd) {
                show_toast_on_widget(btn, "No terminal to run the command in", ToastType::Warning);
            }
        });

        let copy = Button::builder()
            .icon_name("edit-copy-symbolic")
            .tooltip_text("Copy")
            .valign(gtk4::Align::Center)
            .css_classes(["flat"])
            .build();
        let cmd = command.to_string();
        copy.connect_clicked(move |btn| {
            btn.clipboard().set_text(&cmd);
        });

        row.append(&run);
        row.append(&copy);
        row
    }

    fn scroll_to_end(&self) {
        let scroller = self.scroller.clone();
        glib::idle_add_local_once(move || {
            let adj = scroller.vadjustment();
            adj.set_value(adj.upper() - adj.page_size());
        });
    }

    // ---------------------------------------------------------------------
    // Requests
    // ---------------------------------------------------------------------

    fn send_input(self: &Rc<Self>) {
        let buffer = self.input.buffer();
        let text = buffer.text(&buffer.start_iter(), &buffer.end_iter(), false);
        let prompt = text.trim();
        if prompt.is_empty() {
            return;
        }
        if self.send(prompt) {
            buffer.set_text("");
        }
    }

    /// Sends `prompt` with the current conversation as context. Returns
    /// false if nothing was sent.
    pub fn send(self: &Rc<Self>, prompt: &str) -> bool {
        if self.busy.get() {
            return false;
        }
        let config = match AiConfig::from_settings(self.state.borrow().settings()) {
            Ok(config) => config,
            Err(e) => {
                tracing::info!(error = %e, "AI assistant is not configured");
                self.append_error(&format!(
                    "{e}. Open the assistant settings to choose a provider."
                ));
                return false;
            }
        };

        let history: Vec<ChatMessage> = self
            .state
            .borrow()
            .ai_history()
            .recent_messages(RECENT_MESSAGES)
            .iter()
            .map(|m| m.to_message())
            .collect();
        let system = self.system_prompt.get_or_init(default_system_prompt);
        let messages = build_messages(system, &history, prompt);

        let added = self
            .state
            .borrow_mut()
            .ai_history_mut()
            .add_message(ChatRole::User, prompt, Vec::new());
        if let Err(e) = added {
            tracing::warn!(error = %e, "Failed to save prompt to history");
        }
        self.append_user(prompt);
        self.update_quick_prompts();

        let (bubble, label) = self.assistant_bubble();
        label.set_text("...");
        *self.pending.borrow_mut() = Some(PendingReply {
            bubble,
            label,
            raw: String::new(),
        });
        self.set_busy(true);
        self.scroll_to_end();

        let (tx, rx) = mpsc::channel();
        tokio::spawn(async move {
            let chunk_tx = tx.clone();
            let result = async {
                let client = AiClient::for_provider(config.provider)?;
                client
                    .complete_streaming(&config, &messages, |chunk| {
                        // Receiver gone means the window closed
                        let _ = chunk_tx.send(StreamEvent::Chunk(chunk.to_string()));
                    })
                    .await
            }
            .await;
            let _ = tx.send(StreamEvent::Finished(result));
        });

        let weak = Rc::downgrade(self);
        poll_channel(rx, move |event| {
            if let Some(panel) = weak.upgrade() {
                panel.on_stream_event(event);
            }
        });
        true
    }

    fn set_busy(&self, busy: bool) {
        self.busy.set(busy);
        self.send_btn.set_sensitive(!busy);
        self.quick_prompts.set_sensitive(!busy);
    }

    fn on_stream_event(&self, event: StreamEvent) {
        match event {
            StreamEvent::Chunk(chunk) => {
                let mut pending = self.pending.borrow_mut();
                if let Some(pending) = pending.as_mut() {
                    pending.raw.push_str(&chunk);
                    let partial = extract_partial_reply(&pending.raw);
                    if !partial.is_empty() {
                        pending.label.set_text(&partial);
                    }
                }
                drop(pending);
                self.scroll_to_end();
            }
            StreamEvent::Finished(result) => {
                let pending = self.pending.borrow_mut().take();
                self.set_busy(false);
                let Some(pending) = pending else {
                    return;
                };
                match result {
                    Ok(full) => self.finish_reply(&pending, &full),
                    Err(e) => {
                        tracing::error!(error = %e, "AI request failed");
                        self.messages.remove(&pending.bubble);
                        self.append_error(&format!("Request failed: {e}"));
                    }
                }
            }
        }
    }

    fn finish_reply(&self, pending: &PendingReply, full: &str) {
        let reply = parse_assistant_payload(full);
        self.render_reply(&pending.bubble, &pending.label, &reply);
        let saved = self.state.borrow_mut().ai_history_mut().add_message(
            ChatRole::Assistant,
            &reply.reply,
            reply.command_lines(),
        );
        if let Err(e) = saved {
            tracing::warn!(error = %e, "Failed to save reply to history");
        }
        tracing::debug!(commands = reply.commands.len(), "AI reply received");
        self.scroll_to_end();
    }
}
