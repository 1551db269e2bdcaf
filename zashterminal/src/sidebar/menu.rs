//! Context menus of the session tree
//!
//! Entries activate `win.*` actions, which work on the current selection.

use gtk4::prelude::*;
use gtk4::{gdk, gio, glib};
use zashterminal_core::sessions::TreeNode;

fn item_menu(node: &TreeNode, can_paste: bool) -> gio::Menu {
    let menu = gio::Menu::new();

    let open = gio::Menu::new();
    match node {
        TreeNode::Session(_) => open.append(Some("Connect"), Some("win.open-item")),
        TreeNode::Layout(_) => open.append(Some("Restore Layout"), Some("win.open-item")),
        TreeNode::Folder(_) => {
            open.append(Some("New Session"), Some("win.new-session"));
            open.append(Some("New Subfolder"), Some("win.new-folder"));
        }
    }
    menu.append_section(None, &open);

    let edit = gio::Menu::new();
    if !matches!(node, TreeNode::Layout(_)) {
        edit.append(Some("Edit"), Some("win.edit-item"));
    }
    if matches!(node, TreeNode::Session(_)) {
        edit.append(Some("Duplicate"), Some("win.duplicate-session"));
    }
    edit.append(Some("Move to Folder"), Some("win.move-to-folder"));
    menu.append_section(None, &edit);

    let clipboard = gio::Menu::new();
    if node.to_entry().is_some() {
        clipboard.append(Some("Copy"), Some("win.copy-item"));
        clipboard.append(Some("Cut"), Some("win.cut-item"));
    }
    if can_paste {
        clipboard.append(Some("Paste"), Some("win.paste-item"));
    }
    menu.append_section(None, &clipboard);

    let danger = gio::Menu::new();
    danger.append(Some("Delete"), Some("win.delete-item"));
    menu.append_section(None, &danger);
    menu
}

fn empty_area_menu(can_paste: bool) -> gio::Menu {
    let menu = gio::Menu::new();
    let create = gio::Menu::new();
    create.append(Some("New Session"), Some("win.new-session"));
    create.append(Some("New Folder"), Some("win.new-folder"));
    menu.append_section(None, &create);

    let other = gio::Menu::new();
    if can_paste {
        other.append(Some("Paste"), Some("win.paste-item"));
    }
    other.append(Some("Import from SSH Config"), Some("win.import-ssh-config"));
    menu.append_section(None, &other);
    menu
}

/// Pops up the menu for `node`, or the empty-area menu, at `x`/`y` of
/// `widget`
pub fn show(widget: &impl IsA<gtk4::Widget>, x: f64, y: f64, node: Option<&TreeNode>, can_paste: bool) {
    let model = node.map_or_else(|| empty_area_menu(can_paste), |n| item_menu(n, can_paste));
    let popover = gtk4::PopoverMenu::from_model(Some(&model));
    popover.add_css_class("sidebar-popover");
    popover.set_parent(widget);
    popover.set_has_arrow(false);
    popover.set_pointing_to(Some(&gdk::Rectangle::new(x as i32, y as i32, 1, 1)));
    popover.connect_closed(|pop| {
        let pop = pop.clone();
        glib::idle_add_local_once(move || pop.unparent());
    });
    popover.popup();
}
