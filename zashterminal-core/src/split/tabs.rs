//! Ordered tabs, each owning a [`PaneTree`]
//!
//! The widget layer mirrors this model: every mutation here has a matching
//! `adw::TabView`/`gtk::Paned` change, and the decisions that depend on the
//! whole window (what to do when a process exits, where a dropped tab lands,
//! what a tab is called) are made here so they can be tested without a display.

use std::path::Path;

use super::error::{PaneError, PaneResult};
use super::tree::{CloseOutcome, PaneLeaf, PaneTree};
use super::types::{PaneId, PaneOrientation, TabId, TerminalRef, TerminalStatus};
use crate::models::SessionType;
use crate::osc7::display_path;
use crate::theme::contrasting_text_color;

/// One tab
#[derive(Debug, Clone, PartialEq)]
pub struct TabModel {
    /// Stable identifier
    pub id: TabId,
    /// Session name, or the shell title for ad-hoc local tabs
    pub base_title: String,
    /// Type of the session the tab was opened for
    pub session_type: SessionType,
    /// Optional CSS color from the session
    pub color: Option<String>,
    panes: PaneTree,
}

impl TabModel {
    /// Panes of this tab
    #[must_use]
    pub const fn panes(&self) -> &PaneTree {
        &self.panes
    }

    /// Panes of this tab, mutable
    #[must_use]
    pub const fn panes_mut(&mut self) -> &mut PaneTree {
        &mut self.panes
    }

    /// `true` if any pane still has a running or reconnecting terminal
    #[must_use]
    pub fn has_live_terminals(&self) -> bool {
        self.panes.panes().iter().any(|p| p.terminal.is_live())
    }

    /// Title from the working directory of the first pane, falling back to
    /// the base title
    #[must_use]
    pub fn cwd_title(&self, home: &Path) -> String {
        self.panes
            .first_pane()
            .terminal
            .working_dir
            .as_deref()
            .map_or_else(|| self.base_title.clone(), |dir| display_path(dir, home))
    }

    /// Text and background colors for the tab label, if the tab is colored
    #[must_use]
    pub fn label_colors(&self) -> Option<(String, &'static str)> {
        let color = self.color.as_deref().filter(|c| !c.trim().is_empty())?;
        Some((color.to_string(), contrasting_text_color(color)))
    }
}

/// Title shown for a tab after a terminal in it reported `new_title`
#[must_use]
pub fn derive_tab_title(
    base_title: &str,
    session_type: SessionType,
    new_title: &str,
    terminal_count: usize,
) -> String {
    let title = match session_type {
        SessionType::Local => new_title.to_string(),
        SessionType::Ssh => {
            if new_title.starts_with(&format!("{base_title}:")) {
                new_title.to_string()
            } else if new_title == base_title {
                base_title.to_string()
            } else {
                format!("{base_title}: {new_title}")
            }
        }
    };
    if terminal_count > 1 {
        format!("{title} ({terminal_count})")
    } else {
        title
    }
}

/// Where a tab dragged from `moving` ends up when dropped on the left or
/// right half of the tab at `target`. `None` means nothing moves.
#[must_use]
pub fn tab_move_index(moving: usize, target: usize, drop_right: bool) -> Option<usize> {
    if moving == target {
        return None;
    }
    let mut index = if drop_right { target + 1 } else { target };
    if moving < index {
        index -= 1;
    }
    (index != moving).then_some(index)
}

/// What the window should do after a terminal process exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAction {
    /// Nothing: the terminal is reconnecting or already gone
    Ignore,
    /// Remove the pane from its split
    ClosePane {
        /// Tab holding the pane
        tab: TabId,
        /// The exited pane
        pane: PaneId,
    },
    /// Close the whole tab, other tabs keep running
    CloseTab {
        /// Tab to close
        tab: TabId,
    },
    /// No live terminal is left anywhere
    QuitApplication {
        /// Tab to close before quitting
        tab: TabId,
    },
}

/// The tab strip
#[derive(Debug, Default)]
pub struct TabManagerModel {
    tabs: Vec<TabModel>,
    active: Option<TabId>,
}

impl TabManagerModel {
    /// An empty window
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tabs in display order
    #[must_use]
    pub fn tabs(&self) -> &[TabModel] {
        &self.tabs
    }

    /// Number of tabs
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// `true` if no tab is open
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Currently selected tab
    #[must_use]
    pub const fn active(&self) -> Option<TabId> {
        self.active
    }

    /// Position of a tab
    #[must_use]
    pub fn index_of(&self, tab: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab)
    }

    /// Looks up a tab
    #[must_use]
    pub fn tab(&self, tab: TabId) -> Option<&TabModel> {
        self.tabs.iter().find(|t| t.id == tab)
    }

    fn tab_mut(&mut self, tab: TabId) -> PaneResult<&mut TabModel> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == tab)
            .ok_or(PaneError::TabNotFound(tab))
    }

    /// Selects a tab.
    ///
    /// # Errors
    /// [`PaneError::TabNotFound`] for an unknown tab.
    pub fn set_active(&mut self, tab: TabId) -> PaneResult<()> {
        self.index_of(tab).ok_or(PaneError::TabNotFound(tab))?;
        self.active = Some(tab);
        Ok(())
    }

    /// Appends a tab showing `terminal` and selects it
    pub fn add_tab(&mut self, terminal: TerminalRef, color: Option<String>) -> TabId {
        let tab = TabModel {
            id: TabId::new(),
            base_title: terminal.session_name.clone(),
            session_type: terminal.session_type,
            color,
            panes: PaneTree::new(terminal),
        };
        let id = tab.id;
        tracing::debug!(tab = %id, title = %tab.base_title, "Tab added");
        self.tabs.push(tab);
        self.active = Some(id);
        id
    }

    /// Adds a tab with an already built pane tree, e.g. from a saved layout
    pub fn add_tab_with_panes(&mut self, base_title: &str, panes: PaneTree) -> TabId {
        let tab = TabModel {
            id: TabId::new(),
            base_title: base_title.to_string(),
            session_type: panes.first_pane().terminal.session_type,
            color: None,
            panes,
        };
        let id = tab.id;
        self.tabs.push(tab);
        self.active = Some(id);
        id
    }

    /// Removes a tab. If it was selected, the last remaining tab is selected.
    ///
    /// # Errors
    /// [`PaneError::TabNotFound`] for an unknown tab.
    pub fn close_tab(&mut self, tab: TabId) -> PaneResult<TabModel> {
        let index = self.index_of(tab).ok_or(PaneError::TabNotFound(tab))?;
        let removed = self.tabs.remove(index);
        if self.active == Some(tab) {
            self.active = self.tabs.last().map(|t| t.id);
        }
        tracing::debug!(tab = %tab, remaining = self.tabs.len(), "Tab closed");
        Ok(removed)
    }

    /// Removes every tab, in display order. Used when the last live terminal
    /// exits: tabs whose terminal never spawned must not keep the window open.
    pub fn close_all_tabs(&mut self) -> Vec<TabModel> {
        self.active = None;
        let closed = std::mem::take(&mut self.tabs);
        tracing::debug!(count = closed.len(), "All tabs closed");
        closed
    }

    /// Moves `moving` next to `target`. Returns `true` if the order changed.
    ///
    /// # Errors
    /// [`PaneError::TabNotFound`] if either tab is unknown.
    pub fn move_tab(&mut self, moving: TabId, target: TabId, drop_right: bool) -> PaneResult<bool> {
        let from = self.index_of(moving).ok_or(PaneError::TabNotFound(moving))?;
        let to = self.index_of(target).ok_or(PaneError::TabNotFound(target))?;
        let Some(index) = tab_move_index(from, to, drop_right) else {
            return Ok(false);
        };
        let tab = self.tabs.remove(from);
        self.tabs.insert(index, tab);
        Ok(true)
    }

    fn cycle(&mut self, forward: bool) -> Option<TabId> {
        if self.tabs.len() <= 1 {
            return None;
        }
        let current = self.active.and_then(|id| self.index_of(id)).unwrap_or(0);
        let len = self.tabs.len();
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        let id = self.tabs[next].id;
        self.active = Some(id);
        Some(id)
    }

    /// Selects the next tab, wrapping around. `None` with fewer than two tabs.
    pub fn next_tab(&mut self) -> Option<TabId> {
        self.cycle(true)
    }

    /// Selects the previous tab, wrapping around
    pub fn previous_tab(&mut self) -> Option<TabId> {
        self.cycle(false)
    }

    /// Tab holding `pane`
    #[must_use]
    pub fn tab_of_pane(&self, pane: PaneId) -> Option<TabId> {
        self.tabs
            .iter()
            .find(|t| t.panes.find(pane).is_some())
            .map(|t| t.id)
    }

    /// Tab and pane showing `terminal_id`
    #[must_use]
    pub fn find_terminal(&self, terminal_id: &str) -> Option<(TabId, &PaneLeaf)> {
        self.tabs
            .iter()
            .find_map(|t| t.panes.find_terminal(terminal_id).map(|p| (t.id, p)))
    }

    fn terminal_mut(&mut self, terminal_id: &str) -> PaneResult<&mut TerminalRef> {
        let (tab, pane) = self
            .find_terminal(terminal_id)
            .map(|(tab, leaf)| (tab, leaf.id))
            .ok_or_else(|| PaneError::TerminalNotFound(terminal_id.to_string()))?;
        self.tab_mut(tab)?
            .panes
            .find_mut(pane)
            .map(|leaf| &mut leaf.terminal)
            .ok_or(PaneError::PaneNotFound(pane))
    }

    /// Records a new working directory
    ///
    /// # Errors
    /// [`PaneError::TerminalNotFound`] for an unknown terminal.
    pub fn set_working_dir(&mut self, terminal_id: &str, dir: &str) -> PaneResult<()> {
        self.terminal_mut(terminal_id)?.working_dir = Some(dir.to_string());
        Ok(())
    }

    /// Marks whether the SSH layer is retrying a terminal's connection
    ///
    /// # Errors
    /// [`PaneError::TerminalNotFound`] for an unknown terminal.
    pub fn set_auto_reconnect(&mut self, terminal_id: &str, active: bool) -> PaneResult<()> {
        self.terminal_mut(terminal_id)?.auto_reconnect = active;
        Ok(())
    }

    /// Records a spawn failure
    ///
    /// # Errors
    /// [`PaneError::TerminalNotFound`] for an unknown terminal.
    pub fn mark_spawn_failed(&mut self, terminal_id: &str) -> PaneResult<()> {
        self.terminal_mut(terminal_id)?.status = TerminalStatus::SpawnFailed;
        Ok(())
    }

    /// Splits `pane`, putting `terminal` in the new half.
    ///
    /// # Errors
    /// [`PaneError::PaneNotFound`] if no tab holds `pane`.
    pub fn split_pane(
        &mut self,
        pane: PaneId,
        orientation: PaneOrientation,
        terminal: TerminalRef,
    ) -> PaneResult<PaneId> {
        let tab = self.tab_of_pane(pane).ok_or(PaneError::PaneNotFound(pane))?;
        self.tab_mut(tab)?.panes.split(pane, orientation, terminal)
    }

    /// Records a divider drag on the split whose first child starts with
    /// `first_pane`. Returns `false` if there is no such split.
    pub fn update_ratio(&mut self, first_pane: PaneId, ratio: f64) -> bool {
        let Some(tab) = self.tab_of_pane(first_pane) else {
            return false;
        };
        self.tab_mut(tab)
            .is_ok_and(|t| t.panes.update_ratio(first_pane, ratio))
    }

    /// Closes a pane; a tab left without panes is closed too.
    ///
    /// # Errors
    /// [`PaneError::PaneNotFound`] if no tab holds `pane`.
    pub fn close_pane(&mut self, pane: PaneId) -> PaneResult<CloseOutcome> {
        let tab = self.tab_of_pane(pane).ok_or(PaneError::PaneNotFound(pane))?;
        let outcome = self.tab_mut(tab)?.panes.close(pane)?;
        if matches!(outcome, CloseOutcome::TabEmptied(_)) {
            self.close_tab(tab)?;
        }
        Ok(outcome)
    }

    /// Detaches a pane from its split into a tab of its own, which becomes
    /// active.
    ///
    /// # Errors
    /// [`PaneError::OnlyPane`] if the pane is alone in its tab,
    /// [`PaneError::PaneNotFound`] if no tab holds it.
    pub fn move_pane_to_new_tab(&mut self, pane: PaneId) -> PaneResult<TabId> {
        let tab = self.tab_of_pane(pane).ok_or(PaneError::PaneNotFound(pane))?;
        let source = self.tab_mut(tab)?;
        if !source.panes.is_split() {
            return Err(PaneError::OnlyPane);
        }
        let color = source.color.clone();
        let CloseOutcome::Promoted { removed, .. } = source.panes.close(pane)? else {
            return Err(PaneError::OnlyPane);
        };
        let id = self.add_tab(removed.terminal, color);
        tracing::debug!(pane = %pane, tab = %id, "Pane moved to new tab");
        Ok(id)
    }

    /// Records that a terminal's child process exited and decides what the
    /// window should do about it.
    pub fn on_child_exited(&mut self, terminal_id: &str) -> ExitAction {
        let Ok(terminal) = self.terminal_mut(terminal_id) else {
            return ExitAction::Ignore;
        };
        if terminal.auto_reconnect {
            tracing::debug!(terminal = terminal_id, "Exit ignored, reconnect in progress");
            return ExitAction::Ignore;
        }
        if terminal.status == TerminalStatus::Running {
            terminal.status = TerminalStatus::Exited;
        }
        let Some((tab_id, leaf)) = self.find_terminal(terminal_id) else {
            return ExitAction::Ignore;
        };
        let pane = leaf.id;
        let Some(tab) = self.tab(tab_id) else {
            return ExitAction::Ignore;
        };
        if tab.panes.is_split() && tab.has_live_terminals() {
            return ExitAction::ClosePane { tab: tab_id, pane };
        }
        let live_elsewhere = self
            .tabs
            .iter()
            .any(|t| t.id != tab_id && t.has_live_terminals());
        if live_elsewhere {
            ExitAction::CloseTab { tab: tab_id }
        } else {
            ExitAction::QuitApplication { tab: tab_id }
        }
    }

    /// Title of a tab after `terminal_id` changed its window title
    #[must_use]
    pub fn title_for(&self, tab: TabId, new_title: &str) -> Option<String> {
        let tab = self.tab(tab)?;
        Some(derive_tab_title(
            &tab.base_title,
            tab.session_type,
            new_title,
            tab.panes.pane_count(),
        ))
    }

    /// Working-directory titles for every tab, in display order
    #[must_use]
    pub fn cwd_titles(&self, home: &Path) -> Vec<(TabId, String)> {
        self.tabs.iter().map(|t| (t.id, t.cwd_title(home))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::PaneNode;

    #[test]
    fn ssh_titles_get_session_prefix() {
        assert_eq!(derive_tab_title("web", SessionType::Ssh, "vim", 1), "web: vim");
        assert_eq!(derive_tab_title("web", SessionType::Ssh, "web: top", 1), "web: top");
        assert_eq!(derive_tab_title("web", SessionType::Ssh, "web", 1), "web");
        assert_eq!(derive_tab_title("web", SessionType::Ssh, "vim", 3), "web: vim (3)");
        assert_eq!(derive_tab_title("Local", SessionType::Local, "~/src", 2), "~/src (2)");
    }

    #[test]
    fn drop_indices() {
        assert_eq!(tab_move_index(0, 2, true), Some(2));
        assert_eq!(tab_move_index(0, 2, false), Some(1));
        assert_eq!(tab_move_index(3, 1, false), Some(1));
        assert_eq!(tab_move_index(3, 1, true), Some(2));
        assert_eq!(tab_move_index(1, 1, true), None);
        assert_eq!(tab_move_index(0, 1, false), None);
    }

    #[test]
    fn closing_active_tab_selects_last() {
        let mut model = TabManagerModel::new();
        let a = model.add_tab(TerminalRef::local("a"), None);
        let b = model.add_tab(TerminalRef::local("b"), None);
        let c = model.add_tab(TerminalRef::local("c"), None);
        model.set_active(a).unwrap();
        model.close_tab(a).unwrap();
        assert_eq!(model.active(), Some(c));
        model.close_tab(b).unwrap();
        assert_eq!(model.active(), Some(c));
        model.close_tab(c).unwrap();
        assert_eq!(model.active(), None);
        assert!(model.close_tab(c).is_err());
    }

    #[test]
    fn cycling_wraps() {
        let mut model = TabManagerModel::new();
        assert_eq!(model.next_tab(), None);
        let a = model.add_tab(TerminalRef::local("a"), None);
        assert_eq!(model.next_tab(), None);
        let b = model.add_tab(TerminalRef::local("b"), None);
        assert_eq!(model.next_tab(), Some(a));
        assert_eq!(model.previous_tab(), Some(b));
        assert_eq!(model.previous_tab(), Some(a));
    }

    #[test]
    fn moving_tabs_reorders() {
        let mut model = TabManagerModel::new();
        let a = model.add_tab(TerminalRef::local("a"), None);
        let b = model.add_tab(TerminalRef::local("b"), None);
        let c = model.add_tab(TerminalRef::local("c"), None);
        assert!(model.move_tab(a, c, true).unwrap());
        let order: Vec<TabId> = model.tabs().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![b, c, a]);
        assert!(!model.move_tab(a, a, false).unwrap());
    }

    #[test]
    fn only_pane_cannot_be_detached() {
        let mut model = TabManagerModel::new();
        let tab = model.add_tab(TerminalRef::ssh("web"), Some("#ffcc00".into()));
        let pane = model.tab(tab).unwrap().panes().first_pane().id;
        assert_eq!(model.move_pane_to_new_tab(pane), Err(PaneError::OnlyPane));

        let second = model
            .split_pane(pane, PaneOrientation::Vertical, TerminalRef::ssh("web"))
            .unwrap();
        let new_tab = model.move_pane_to_new_tab(second).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.active(), Some(new_tab));
        assert!(!model.tab(tab).unwrap().panes().is_split());
        assert_eq!(model.tab(new_tab).unwrap().color.as_deref(), Some("#ffcc00"));
    }

    #[test]
    fn divider_drags_update_the_owning_tab() {
        let mut model = TabManagerModel::new();
        let tab = model.add_tab(TerminalRef::local("a"), None);
        let pane = model.tab(tab).unwrap().panes().first_pane().id;
        assert!(!model.update_ratio(pane, 0.3));
        model
            .split_pane(pane, PaneOrientation::Horizontal, TerminalRef::local("b"))
            .unwrap();
        assert!(model.update_ratio(pane, 0.3));
        match model.tab(tab).unwrap().panes().root() {
            PaneNode::Split { ratio, .. } => assert!((ratio - 0.3).abs() < f64::EPSILON),
            PaneNode::Leaf(_) => panic!("expected a split"),
        }
    }

    #[test]
    fn exit_decisions() {
        let mut model = TabManagerModel::new();
        let first = TerminalRef::local("a");
        let first_id = first.terminal_id.clone();
        let tab = model.add_tab(first, None);
        let pane = model.tab(tab).unwrap().panes().first_pane().id;
        let split = TerminalRef::ssh("web");
        let split_id = split.terminal_id.clone();
        let split_pane = model
            .split_pane(pane, PaneOrientation::Horizontal, split)
            .unwrap();

        model.set_auto_reconnect(&split_id, true).unwrap();
        assert_eq!(model.on_child_exited(&split_id), ExitAction::Ignore);
        model.set_auto_reconnect(&split_id, false).unwrap();
        assert_eq!(
            model.on_child_exited(&split_id),
            ExitAction::ClosePane { tab, pane: split_pane }
        );
        model.close_pane(split_pane).unwrap();

        let other = model.add_tab(TerminalRef::local("b"), None);
        assert_eq!(model.on_child_exited(&first_id), ExitAction::CloseTab { tab });
        model.close_tab(tab).unwrap();

        let last_id = model.tab(other).unwrap().panes().first_pane().terminal.terminal_id.clone();
        assert_eq!(
            model.on_child_exited(&last_id),
            ExitAction::QuitApplication { tab: other }
        );
        assert_eq!(model.on_child_exited("unknown"), ExitAction::Ignore);
    }

    #[test]
    fn spawn_failed_tab_does_not_block_quit() {
        let mut model = TabManagerModel::new();
        let broken = TerminalRef::ssh("unreachable");
        let broken_id = broken.terminal_id.clone();
        let broken_tab = model.add_tab(broken, None);
        model.mark_spawn_failed(&broken_id).unwrap();

        let live = TerminalRef::local("shell");
        let live_id = live.terminal_id.clone();
        let live_tab = model.add_tab(live, None);

        let action = model.on_child_exited(&live_id);
        assert_eq!(action, ExitAction::QuitApplication { tab: live_tab });

        let closed: Vec<TabId> = model.close_all_tabs().iter().map(|t| t.id).collect();
        assert_eq!(closed, vec![broken_tab, live_tab]);
        assert!(model.is_empty());
        assert_eq!(model.active(), None);
    }

    #[test]
    fn cwd_titles_and_colors() {
        let mut model = TabManagerModel::new();
        let terminal = TerminalRef::local("shell");
        let id = terminal.terminal_id.clone();
        let tab = model.add_tab(terminal, Some("#ffffff".into()));
        let home = Path::new("/home/zash");
        assert_eq!(model.cwd_titles(home), vec![(tab, "shell".to_string())]);
        model.set_working_dir(&id, "/home/zash/src").unwrap();
        assert_eq!(model.cwd_titles(home), vec![(tab, "~/src".to_string())]);
        assert_eq!(
            model.tab(tab).unwrap().label_colors(),
            Some(("#ffffff".to_string(), "#000000"))
        );
    }
}
