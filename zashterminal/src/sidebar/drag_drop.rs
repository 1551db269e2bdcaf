//! Drag and drop inside the session tree
//!
//! Rows travel as the `type|name|path` string of [`DragPayload`]; the move
//! itself is decided by `zashterminal_core::drag_drop`.

use gtk4::prelude::*;
use gtk4::{DragSource, DropTarget, ListItem, ListView, TreeExpander, gdk, glib};
use zashterminal_core::drag_drop::{DragKind, DragPayload, drop_target_path, perform_move};
use zashterminal_core::sessions::TreeNode;

use super::view::node_of;
use crate::state::SharedAppState;
use crate::toast::{ToastType, show_toast_on_widget};

/// Makes a row draggable
pub fn attach_drag_source(list_item: &ListItem) {
    let Some(expander) = list_item.child() else {
        return;
    };
    let drag_source = DragSource::new();
    drag_source.set_actions(gdk::DragAction::MOVE);

    let list_item_weak = list_item.downgrade();
    drag_source.connect_prepare(move |_, _, _| {
        let list_item = list_item_weak.upgrade()?;
        let row = list_item.item().and_downcast::<gtk4::TreeListRow>()?;
        let payload = DragPayload::from_node(&node_of(&row)?);
        Some(gdk::ContentProvider::for_value(&payload.to_string().to_value()))
    });

    drag_source.connect_drag_begin(|source, _| {
        if let Some(widget) = source.widget() {
            widget.add_css_class("dragging");
        }
    });
    drag_source.connect_drag_end(|source, _, _| {
        if let Some(widget) = source.widget() {
            widget.remove_css_class("dragging");
        }
    });
    expander.add_controller(drag_source);
}

// Row under the pointer, `None` for the empty area below the rows
fn node_at(list_view: &ListView, x: f64, y: f64) -> Option<TreeNode> {
    let picked = list_view.pick(x, y, gtk4::PickFlags::DEFAULT)?;
    let expander = if picked.is::<TreeExpander>() {
        Some(picked)
    } else {
        picked.ancestor(TreeExpander::static_type())
    }
    .and_downcast::<TreeExpander>()?;
    node_of(&expander.list_row()?)
}

/// Accepts drops on the tree. `on_layout_moved` runs after a layout file
/// moved, since layouts are not announced on the signal bus.
pub fn attach_drop_target(
    list_view: &ListView,
    state: &SharedAppState,
    on_layout_moved: impl Fn() + 'static,
) {
    let drop_target = DropTarget::new(glib::Type::STRING, gdk::DragAction::MOVE);

    drop_target.connect_enter(|target, _, _| {
        if let Some(widget) = target.widget() {
            widget.add_css_class("drop-active");
        }
        gdk::DragAction::MOVE
    });
    drop_target.connect_leave(|target| {
        if let Some(widget) = target.widget() {
            widget.remove_css_class("drop-active");
        }
    });

    let state = state.clone();
    drop_target.connect_drop(move |target, value, x, y| {
        let Some(list_view) = target.widget().and_downcast::<ListView>() else {
            return false;
        };
        list_view.remove_css_class("drop-active");
        let Some(payload) = value.get::<String>().ok().and_then(|s| DragPayload::decode(&s)) else {
            return false;
        };
        let target_path = drop_target_path(node_at(&list_view, x, y).as_ref());

        let result = {
            let Ok(mut state) = state.try_borrow_mut() else {
                return false;
            };
            let layouts = state.layouts().clone();
            perform_move(state.operations_mut(), &layouts, &payload, &target_path)
        };

        if result.success {
            if payload.kind == DragKind::Layout {
                on_layout_moved();
            }
        } else {
            show_toast_on_widget(&list_view, &result.message, ToastType::Error);
        }
        result.success
    });
    list_view.add_controller(drop_target);
}
