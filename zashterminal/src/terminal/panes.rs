//! Nested `gtk::Paned` widgets mirroring a tab's pane tree
//!
//! The tree is rebuilt from the model after every structural change. Leaf
//! widgets (the terminal scrollers) survive rebuilds, so they are detached
//! from their old parent before being placed again.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{Box as GtkBox, Orientation, Paned, ScrolledWindow, Widget, glib};
use zashterminal_core::split::{PaneId, PaneNode, PaneOrientation};

/// Called with the first pane of a split and its new ratio after a divider
/// drag
pub type RatioCallback = Rc<dyn Fn(PaneId, f64)>;

const fn gtk_orientation(orientation: PaneOrientation) -> Orientation {
    match orientation {
        PaneOrientation::Horizontal => Orientation::Horizontal,
        PaneOrientation::Vertical => Orientation::Vertical,
    }
}

/// Removes `widget` from whatever container holds it
pub fn detach(widget: &impl IsA<Widget>) {
    let widget = widget.as_ref();
    let Some(parent) = widget.parent() else {
        return;
    };
    if let Some(paned) = parent.downcast_ref::<Paned>() {
        if paned.start_child().as_ref() == Some(widget) {
            paned.set_start_child(None::<&Widget>);
        } else {
            paned.set_end_child(None::<&Widget>);
        }
    } else if let Some(container) = parent.downcast_ref::<GtkBox>() {
        container.remove(widget);
    } else {
        widget.unparent();
    }
}

/// Builds the widget for `node`. `scrollers` maps terminal ids to their pane
/// widgets.
pub fn build(
    node: &PaneNode,
    scrollers: &HashMap<String, ScrolledWindow>,
    on_ratio: &RatioCallback,
) -> Widget {
    match node {
        PaneNode::Leaf(leaf) => match scrollers.get(&leaf.terminal.terminal_id) {
            Some(scroller) => {
                detach(scroller);
                scroller.clone().upcast()
            }
            None => {
                tracing::warn!(terminal = %leaf.terminal.terminal_id, "Pane has no terminal widget");
                gtk4::Label::new(Some("Terminal unavailable")).upcast()
            }
        },
        PaneNode::Split {
            orientation,
            first,
            second,
            ratio,
        } => {
            let paned = Paned::new(gtk_orientation(*orientation));
            paned.set_hexpand(true);
            paned.set_vexpand(true);
            paned.set_resize_start_child(true);
            paned.set_resize_end_child(true);
            paned.set_shrink_start_child(true);
            paned.set_shrink_end_child(true);

            paned.set_start_child(Some(&build(first, scrollers, on_ratio)));
            paned.set_end_child(Some(&build(second, scrollers, on_ratio)));

            track_ratio(&paned, first.first_leaf().id, *ratio, Rc::clone(on_ratio));
            paned.upcast()
        }
    }
}

fn paned_size(paned: &Paned) -> i32 {
    if paned.orientation() == Orientation::Horizontal {
        paned.width()
    } else {
        paned.height()
    }
}

// The stored ratio is applied once the paned has a size; only drags after
// that are reported back.
fn track_ratio(paned: &Paned, first_pane: PaneId, ratio: f64, on_ratio: RatioCallback) {
    let applied = Rc::new(Cell::new(false));

    let paned_weak = paned.downgrade();
    let applied_map = Rc::clone(&applied);
    paned.connect_map(move |_| {
        let paned_weak = paned_weak.clone();
        let applied = Rc::clone(&applied_map);
        glib::idle_add_local_once(move || {
            if let Some(p) = paned_weak.upgrade() {
                let size = paned_size(&p);
                if size > 0 {
                    p.set_position((f64::from(size) * ratio).round() as i32);
                }
                applied.set(true);
            }
        });
    });

    paned.connect_position_notify(move |p| {
        if !applied.get() {
            return;
        }
        let size = paned_size(p);
        if size > 0 {
            on_ratio(first_pane, f64::from(p.position()) / f64::from(size));
        }
    });
}
