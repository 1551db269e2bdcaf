//! Session tree sidebar
//!
//! A `gtk::ListView` over a `gtk::TreeListModel`. Root rows come from
//! [`SessionTree::root_nodes`](zashterminal_core::sessions::SessionTree),
//! folder children are loaded when a folder is first expanded. Filtering,
//! expansion state and the copy/cut buffer all live in the core tree; this
//! module only mirrors them.
//!
//! # Module Structure
//!
//! - `view` - row widgets and match highlighting
//! - `drag_drop` - moving rows between folders
//! - `menu` - right-click menus

mod drag_drop;
mod menu;
mod view;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{
    Box as GtkBox, Button, EventControllerKey, GestureClick, ListView, MultiSelection,
    Orientation, ScrolledWindow, SearchEntry, SignalListItemFactory, TreeExpander, TreeListModel,
    TreeListRow, gdk, gio, glib,
};
use zashterminal_core::sessions::{
    KeyIntent, KeyModifiers, TreeKey, TreeNode, key_intent, trim_search_text,
};

use crate::state::SharedAppState;
use view::ExpandHandlers;

type ActivateCallback = Rc<dyn Fn(TreeNode)>;

/// Sidebar with search entry, session tree and toolbar
pub struct Sidebar {
    container: GtkBox,
    search_entry: SearchEntry,
    list_view: ListView,
    root_store: gio::ListStore,
    tree_model: TreeListModel,
    selection: MultiSelection,
    state: SharedAppState,
    on_activate: RefCell<Option<ActivateCallback>>,
}

impl Sidebar {
    pub fn new(state: SharedAppState) -> Rc<Self> {
        let container = GtkBox::new(Orientation::Vertical, 0);
        container.add_css_class("sidebar-container");

        let search_entry = SearchEntry::builder()
            .placeholder_text("Search sessions")
            .margin_start(6)
            .margin_end(6)
            .margin_top(6)
            .margin_bottom(6)
            .build();
        search_entry.add_css_class("sidebar-search");
        container.append(&search_entry);

        let root_store = gio::ListStore::new::<glib::BoxedAnyObject>();
        let tree_model = TreeListModel::new(root_store.clone(), false, false, {
            let state = Rc::clone(&state);
            move |item| {
                let boxed = item.downcast_ref::<glib::BoxedAnyObject>()?;
                let path = match &*boxed.borrow::<TreeNode>() {
                    TreeNode::Folder(folder) => folder.path.clone(),
                    _ => return None,
                };
                let store = gio::ListStore::new::<glib::BoxedAnyObject>();
                match state.try_borrow_mut() {
                    Ok(mut state) => {
                        for child in state.tree_mut().children(&path) {
                            store.append(&glib::BoxedAnyObject::new(child));
                        }
                    }
                    Err(_) => tracing::debug!(folder = %path, "State busy, folder left empty"),
                }
                Some(store.upcast())
            }
        });
        let selection = MultiSelection::new(Some(tree_model.clone()));

        let handlers: ExpandHandlers = Rc::new(RefCell::new(HashMap::new()));
        let factory = SignalListItemFactory::new();
        factory.connect_setup(|factory, item| {
            let Some(list_item) = item.downcast_ref::<gtk4::ListItem>() else {
                return;
            };
            view::setup_list_item(factory, list_item);
            drag_drop::attach_drag_source(list_item);
        });
        {
            let state = Rc::clone(&state);
            let handlers = Rc::clone(&handlers);
            factory.connect_bind(move |_, item| {
                if let Some(list_item) = item.downcast_ref::<gtk4::ListItem>() {
                    view::bind_list_item(list_item, &state, &handlers);
                }
            });
        }
        factory.connect_unbind(move |_, item| {
            if let Some(list_item) = item.downcast_ref::<gtk4::ListItem>() {
                view::unbind_list_item(list_item, &handlers);
            }
        });

        let list_view = ListView::new(Some(selection.clone()), Some(factory));
        list_view.add_css_class("sidebar-session-tree");
        list_view.add_css_class("navigation-sidebar");
        list_view.set_vexpand(true);

        let scrolled = ScrolledWindow::builder()
            .hscrollbar_policy(gtk4::PolicyType::Never)
            .vexpand(true)
            .child(&list_view)
            .build();
        container.append(&scrolled);
        container.append(&create_bottom_toolbar());

        let sidebar = Rc::new(Self {
            container,
            search_entry,
            list_view,
            root_store,
            tree_model,
            selection,
            state,
            on_activate: RefCell::new(None),
        });
        sidebar.setup_signals();
        sidebar.refresh();
        sidebar
    }

    /// Returns the sidebar widget
    #[must_use]
    pub fn widget(&self) -> &GtkBox {
        &self.container
    }

    /// Registers what happens when a session or layout row is activated
    pub fn set_on_activate(&self, callback: impl Fn(TreeNode) + 'static) {
        *self.on_activate.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn focus_search(&self) {
        self.search_entry.grab_focus();
    }

    fn setup_signals(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.list_view.connect_activate(move |_, position| {
            let Some(sidebar) = weak.upgrade() else {
                return;
            };
            let Some(row) = sidebar.tree_model.item(position).and_downcast::<TreeListRow>() else {
                return;
            };
            match view::node_of(&row) {
                Some(TreeNode::Folder(_)) => row.set_expanded(!row.is_expanded()),
                Some(node) => {
                    let callback = sidebar.on_activate.borrow().clone();
                    if let Some(callback) = callback {
                        callback(node);
                    }
                }
                None => {}
            }
        });

        let weak = Rc::downgrade(self);
        self.search_entry.connect_search_changed(move |entry| {
            let Some(sidebar) = weak.upgrade() else {
                return;
            };
            let text = entry.text();
            {
                let mut state = sidebar.state.borrow_mut();
                if text.is_empty() {
                    state.tree_mut().clear_search();
                } else {
                    state.tree_mut().set_filter_text(&text);
                }
            }
            sidebar.reload();
        });

        let weak = Rc::downgrade(self);
        self.search_entry.connect_stop_search(move |entry| {
            entry.set_text("");
            if let Some(sidebar) = weak.upgrade() {
                sidebar.list_view.grab_focus();
            }
        });

        let key_controller = EventControllerKey::new();
        let weak = Rc::downgrade(self);
        key_controller.connect_key_pressed(move |controller, key, _, modifiers| {
            let Some(sidebar) = weak.upgrade() else {
                return glib::Propagation::Proceed;
            };
            let tree_key = match key {
                gdk::Key::Delete | gdk::Key::KP_Delete => TreeKey::Delete,
                gdk::Key::BackSpace => TreeKey::BackSpace,
                other => other.to_unicode().map_or(TreeKey::Other, TreeKey::Char),
            };
            let mods = KeyModifiers {
                control: modifiers.contains(gdk::ModifierType::CONTROL_MASK),
                alt: modifiers.contains(gdk::ModifierType::ALT_MASK),
                shift: modifiers.contains(gdk::ModifierType::SHIFT_MASK),
            };
            let Some(widget) = controller.widget() else {
                return glib::Propagation::Proceed;
            };
            let action = match key_intent(tree_key, mods) {
                KeyIntent::StartSearch(c) => {
                    let text = format!("{}{c}", sidebar.search_entry.text());
                    sidebar.search_entry.set_text(&text);
                    sidebar.search_entry.grab_focus();
                    sidebar.search_entry.set_position(-1);
                    return glib::Propagation::Stop;
                }
                KeyIntent::TrimSearch => {
                    let text = sidebar.search_entry.text();
                    if text.is_empty() {
                        return glib::Propagation::Proceed;
                    }
                    sidebar.search_entry.set_text(&trim_search_text(&text));
                    return glib::Propagation::Stop;
                }
                KeyIntent::SelectAll => {
                    sidebar.selection.select_all();
                    return glib::Propagation::Stop;
                }
                KeyIntent::Copy => "win.copy-item",
                KeyIntent::Cut => "win.cut-item",
                KeyIntent::Paste => "win.paste-item",
                KeyIntent::DeleteSelected => "win.delete-item",
                KeyIntent::Propagate => return glib::Propagation::Proceed,
            };
            if let Err(e) = widget.activate_action(action, None) {
                tracing::debug!(action, error = %e, "Sidebar action unavailable");
            }
            glib::Propagation::Stop
        });
        self.list_view.add_controller(key_controller);

        let gesture = GestureClick::new();
        gesture.set_button(gdk::BUTTON_SECONDARY);
        let weak = Rc::downgrade(self);
        gesture.connect_pressed(move |gesture, _, x, y| {
            let Some(sidebar) = weak.upgrade() else {
                return;
            };
            let row = sidebar.row_at(x, y);
            if let Some(row) = &row {
                sidebar.selection.select_item(row.position(), true);
            } else {
                sidebar.selection.unselect_all();
            }
            let node = row.as_ref().and_then(view::node_of);
            let can_paste = sidebar.state.borrow().tree().clipboard().has_content();
            menu::show(&sidebar.list_view, x, y, node.as_ref(), can_paste);
            gesture.set_state(gtk4::EventSequenceState::Claimed);
        });
        self.list_view.add_controller(gesture);

        let weak = Rc::downgrade(self);
        drag_drop::attach_drop_target(&self.list_view, &self.state, move || {
            if let Some(sidebar) = weak.upgrade() {
                sidebar.refresh();
            }
        });
    }

    fn row_at(&self, x: f64, y: f64) -> Option<TreeListRow> {
        let picked = self.list_view.pick(x, y, gtk4::PickFlags::DEFAULT)?;
        let expander = if picked.is::<TreeExpander>() {
            Some(picked)
        } else {
            picked.ancestor(TreeExpander::static_type())
        }
        .and_downcast::<TreeExpander>()?;
        expander.list_row()
    }

    /// Rebuilds the tree from the current sessions, folders and layouts
    pub fn refresh(&self) {
        match self.state.try_borrow_mut() {
            Ok(mut state) => state.refresh_tree(),
            Err(_) => {
                tracing::debug!("State busy, sidebar refresh skipped");
                return;
            }
        }
        self.reload();
    }

    // Repopulates the rows from the tree and re-applies its expansion state
    fn reload(&self) {
        let roots = self.state.borrow().tree().root_nodes();
        self.root_store.remove_all();
        for node in roots {
            self.root_store.append(&glib::BoxedAnyObject::new(node));
        }

        // Expanding a row inserts its children after it, so the count is
        // re-read every iteration
        let mut position = 0;
        while position < self.tree_model.n_items() {
            if let Some(row) = self.tree_model.row(position)
                && let Some(TreeNode::Folder(folder)) = view::node_of(&row)
            {
                let expanded = self.state.borrow().tree().is_expanded(&folder.path);
                if expanded && !row.is_expanded() {
                    row.set_expanded(true);
                }
            }
            position += 1;
        }
    }

    /// Currently selected rows, in display order
    #[must_use]
    pub fn selected_nodes(&self) -> Vec<TreeNode> {
        let bitset = self.selection.selection();
        (0..bitset.size())
            .filter_map(|i| {
                let position = u32::try_from(i).ok().map(|i| bitset.nth(i))?;
                let row = self.tree_model.row(position)?;
                view::node_of(&row)
            })
            .collect()
    }

    /// First selected row
    #[must_use]
    pub fn selected_node(&self) -> Option<TreeNode> {
        self.selected_nodes().into_iter().next()
    }

    /// Selects and scrolls to the session named `name`
    pub fn select_session(&self, name: &str) {
        for position in 0..self.tree_model.n_items() {
            let Some(row) = self.tree_model.row(position) else {
                continue;
            };
            if let Some(TreeNode::Session(session)) = view::node_of(&row)
                && session.name == name
            {
                self.selection.select_item(position, true);
                self.list_view
                    .scroll_to(position, gtk4::ListScrollFlags::FOCUS, None);
                return;
            }
        }
    }
}

fn create_bottom_toolbar() -> GtkBox {
    let toolbar = GtkBox::new(Orientation::Horizontal, 4);
    toolbar.add_css_class("sidebar-toolbar");
    toolbar.set_margin_start(6);
    toolbar.set_margin_end(6);
    toolbar.set_margin_top(4);
    toolbar.set_margin_bottom(4);

    for (icon, tooltip, action) in [
        ("list-add-symbolic", "New Session", "win.new-session"),
        ("folder-new-symbolic", "New Folder", "win.new-folder"),
        ("document-edit-symbolic", "Edit", "win.edit-item"),
        ("user-trash-symbolic", "Delete", "win.delete-item"),
    ] {
        let button = Button::builder()
            .icon_name(icon)
            .tooltip_text(tooltip)
            .action_name(action)
            .build();
        button.add_css_class("flat");
        toolbar.append(&button);
    }

    let spacer = GtkBox::new(Orientation::Horizontal, 0);
    spacer.set_hexpand(true);
    toolbar.append(&spacer);

    let save_layout = Button::builder()
        .icon_name("view-grid-symbolic")
        .tooltip_text("Save Layout")
        .action_name("win.save-layout")
        .build();
    save_layout.add_css_class("flat");
    toolbar.append(&save_layout);
    toolbar
}
