//! Row widgets of the session tree
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{
    Box as GtkBox, Image, Label, ListItem, Orientation, SignalListItemFactory, TreeExpander,
    TreeListRow, glib,
};
use zashterminal_core::models::SessionType;
use zashterminal_core::sessions::TreeNode;

use crate::state::SharedAppState;

/// Expansion handlers per bound row, disconnected on unbind
pub type ExpandHandlers = Rc<RefCell<HashMap<ListItem, (TreeListRow, glib::SignalHandlerId)>>>;

/// The tree node shown by a list item, if any
pub fn node_of(row: &TreeListRow) -> Option<TreeNode> {
    let boxed = row.item().and_downcast::<glib::BoxedAnyObject>()?;
    let node = boxed.borrow::<TreeNode>().clone();
    Some(node)
}

/// Icon for a tree row
pub fn icon_name(node: &TreeNode) -> &'static str {
    match node {
        TreeNode::Folder(_) => "folder-symbolic",
        TreeNode::Layout(_) => "view-grid-symbolic",
        TreeNode::Session(s) => match s.session_type {
            SessionType::Ssh => "network-server-symbolic",
            SessionType::Local => "utilities-terminal-symbolic",
        },
    }
}

/// Pango markup for `text` with case-insensitive matches of `query` in bold
pub fn highlight_match(text: &str, query: &str) -> String {
    if query.trim().is_empty() {
        return glib::markup_escape_text(text).to_string();
    }
    let Ok(regex) = regex::RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    else {
        return glib::markup_escape_text(text).to_string();
    };

    let mut last_end = 0;
    let mut result = String::new();
    for m in regex.find_iter(text) {
        result.push_str(&glib::markup_escape_text(&text[last_end..m.start()]));
        result.push_str("<b>");
        result.push_str(&glib::markup_escape_text(m.as_str()));
        result.push_str("</b>");
        last_end = m.end();
    }
    result.push_str(&glib::markup_escape_text(&text[last_end..]));
    result
}

/// Builds the expander, icon and label of a row
pub fn setup_list_item(_factory: &SignalListItemFactory, list_item: &ListItem) {
    let expander = TreeExpander::new();

    let content_box = GtkBox::new(Orientation::Horizontal, 8);
    content_box.set_margin_start(4);
    content_box.set_margin_end(4);
    content_box.set_margin_top(4);
    content_box.set_margin_bottom(4);

    let icon = Image::from_icon_name("network-server-symbolic");
    content_box.append(&icon);

    let label = Label::new(None);
    label.set_halign(gtk4::Align::Start);
    label.set_hexpand(true);
    label.set_ellipsize(gtk4::pango::EllipsizeMode::End);
    content_box.append(&label);

    let detail = Label::new(None);
    detail.add_css_class("dim-label");
    detail.add_css_class("caption");
    detail.set_ellipsize(gtk4::pango::EllipsizeMode::End);
    content_box.append(&detail);

    expander.set_child(Some(&content_box));
    list_item.set_child(Some(&expander));
}

/// Fills a row and keeps its folder's expansion state in the tree
pub fn bind_list_item(
    list_item: &ListItem,
    state: &SharedAppState,
    handlers: &ExpandHandlers,
) {
    let Some(expander) = list_item.child().and_downcast::<TreeExpander>() else {
        return;
    };
    let Some(row) = list_item.item().and_downcast::<TreeListRow>() else {
        return;
    };
    expander.set_list_row(Some(&row));

    let Some(node) = node_of(&row) else {
        return;
    };
    let Some(content_box) = expander.child().and_downcast::<GtkBox>() else {
        return;
    };
    let Some(icon) = content_box.first_child().and_downcast::<Image>() else {
        return;
    };
    let Some(label) = icon.next_sibling().and_downcast::<Label>() else {
        return;
    };
    let Some(detail) = label.next_sibling().and_downcast::<Label>() else {
        return;
    };

    icon.set_icon_name(Some(icon_name(&node)));
    let query = state
        .try_borrow()
        .map(|s| s.tree().filter_text().to_string())
        .unwrap_or_default();
    label.set_markup(&highlight_match(node.name(), &query));

    match &node {
        TreeNode::Session(session) if session.is_ssh() => {
            detail.set_text(&session.connection_string());
            detail.set_visible(true);
            expander.set_tooltip_text(Some(&session.connection_string()));
        }
        _ => {
            detail.set_visible(false);
            expander.set_tooltip_text(None);
        }
    }

    if let TreeNode::Folder(folder) = node {
        let state = Rc::clone(state);
        let path = folder.path;
        let handler = row.connect_expanded_notify(move |row| {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.tree_mut().set_expanded(&path, row.is_expanded());
            }
        });
        handlers
            .borrow_mut()
            .insert(list_item.clone(), (row, handler));
    }
}

pub fn unbind_list_item(list_item: &ListItem, handlers: &ExpandHandlers) {
    if let Some((row, handler)) = handlers.borrow_mut().remove(list_item) {
        row.disconnect(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_bold_and_escaped() {
        assert_eq!(highlight_match("web-01", "WEB"), "<b>web</b>-01");
        assert_eq!(highlight_match("a<b", ""), "a&lt;b");
        assert_eq!(highlight_match("db & db", "db"), "<b>db</b> &amp; <b>db</b>");
    }
}
