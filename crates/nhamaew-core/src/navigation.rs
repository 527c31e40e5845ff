//! Category drill-down menu.
//!
//! `CategoryNavigator` walks the category tree one level at a time. Each
//! drill-down pushes a `NavigationFrame` so `go_back` restores the previous
//! level exactly, without refetching. Selecting a leaf ends navigation with
//! a search scoped to that category; the owner of the surface then calls
//! `close`, which discards the stack.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::Category;

/// Shown when neither a category nor the caller supplies a level name.
const DEFAULT_LEVEL_NAME: &str = "หมวดหมู่สินค้า";

/// The level that was on screen before a drill-down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationFrame {
    pub current: Option<Category>,
    pub siblings: Vec<Category>,
}

/// Where a navigation ends: a product search limited to one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchScope {
    pub category_id: i64,
}

/// Result of selecting an entry in the menu.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Moved one level down; the menu stays open.
    Drilled { depth: usize },
    /// A leaf was chosen; navigation is over.
    Search(SearchScope),
    /// The entry cannot be selected, or the menu is not open.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Loaded, but there are no categories for this animal type.
    Empty,
    /// The category fetch failed; the user may re-open to retry.
    Failed(String),
}

/// Identifies one opening of the menu. Results fetched for an older
/// session are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavSessionId(u64);

#[derive(Debug, Clone)]
struct OpenMenu {
    session: NavSessionId,
    load: LoadState,
    roots: Vec<Category>,
    current: Option<Category>,
    siblings: Vec<Category>,
    stack: Vec<NavigationFrame>,
}

#[derive(Debug, Default)]
pub struct CategoryNavigator {
    menu: Option<OpenMenu>,
    next_session: u64,
}

impl CategoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_session(&mut self, load: LoadState, roots: Vec<Category>) -> NavSessionId {
        self.next_session += 1;
        let session = NavSessionId(self.next_session);
        self.menu = Some(OpenMenu {
            session,
            load,
            siblings: roots.clone(),
            roots,
            current: None,
            stack: Vec::new(),
        });
        session
    }

    /// Open at the root level with categories already in hand. Re-opening
    /// resets any previous drill-down.
    pub fn open(&mut self, roots: Vec<Category>) -> NavSessionId {
        let load = if roots.is_empty() {
            LoadState::Empty
        } else {
            LoadState::Ready
        };
        self.start_session(load, roots)
    }

    /// Open in the loading state while categories are fetched.
    pub fn begin_loading(&mut self) -> NavSessionId {
        self.start_session(LoadState::Loading, Vec::new())
    }

    /// Apply a category fetch started by `begin_loading`. Returns `false`
    /// when the result belongs to a session that has since been closed or
    /// replaced.
    pub fn finish_loading<E: std::fmt::Display>(
        &mut self,
        session: NavSessionId,
        result: Result<Vec<Category>, E>,
    ) -> bool {
        let Some(menu) = self.menu.as_mut().filter(|m| m.session == session) else {
            debug!(?session, "Discarding category result for a stale session");
            return false;
        };

        match result {
            Ok(roots) => {
                menu.load = if roots.is_empty() {
                    LoadState::Empty
                } else {
                    LoadState::Ready
                };
                menu.siblings = roots.clone();
                menu.roots = roots;
                menu.current = None;
                menu.stack.clear();
            }
            Err(err) => {
                warn!(error = %err, "Failed to load categories");
                menu.load = LoadState::Failed(err.to_string());
                menu.roots.clear();
                menu.siblings.clear();
                menu.current = None;
                menu.stack.clear();
            }
        }
        true
    }

    pub fn close(&mut self) {
        self.menu = None;
    }

    pub fn is_open(&self) -> bool {
        self.menu.is_some()
    }

    pub fn session(&self) -> Option<NavSessionId> {
        self.menu.as_ref().map(|m| m.session)
    }

    pub fn load_state(&self) -> Option<&LoadState> {
        self.menu.as_ref().map(|m| &m.load)
    }

    pub fn current(&self) -> Option<&Category> {
        self.menu.as_ref().and_then(|m| m.current.as_ref())
    }

    /// Every entry at the current level, including hidden ones.
    pub fn siblings(&self) -> &[Category] {
        self.menu.as_ref().map(|m| m.siblings.as_slice()).unwrap_or(&[])
    }

    /// Entries the user can pick at the current level.
    pub fn selectable(&self) -> Vec<&Category> {
        self.siblings().iter().filter(|c| c.is_selectable()).collect()
    }

    pub fn depth(&self) -> usize {
        self.menu.as_ref().map(|m| m.stack.len()).unwrap_or(0)
    }

    pub fn can_go_back(&self) -> bool {
        self.depth() > 0
    }

    /// Snapshot of the back stack, oldest frame first.
    pub fn frames(&self) -> &[NavigationFrame] {
        self.menu.as_ref().map(|m| m.stack.as_slice()).unwrap_or(&[])
    }

    /// Drill into `node`, or finish with a search when it is a leaf.
    ///
    /// Selecting a leaf leaves the menu state as it was; the caller closes
    /// the surface when it acts on the returned search.
    pub fn select(&mut self, node: &Category) -> Selection {
        if !node.is_selectable() {
            debug!(id = node.id, "Ignoring selection of aggregate or deleted category");
            return Selection::Ignored;
        }
        let Some(menu) = self.menu.as_mut() else {
            return Selection::Ignored;
        };

        if node.is_leaf() {
            return Selection::Search(SearchScope { category_id: node.id });
        }

        let frame = NavigationFrame {
            current: menu.current.take(),
            siblings: std::mem::replace(&mut menu.siblings, node.list.clone()),
        };
        menu.stack.push(frame);
        menu.current = Some(node.clone());
        Selection::Drilled {
            depth: menu.stack.len(),
        }
    }

    /// Select by position in `selectable()`.
    pub fn select_index(&mut self, index: usize) -> Selection {
        let node = self.selectable().get(index).map(|c| (*c).clone());
        match node {
            Some(node) => self.select(&node),
            None => Selection::Ignored,
        }
    }

    /// Return to the previous level. Does nothing at the root.
    pub fn go_back(&mut self) -> bool {
        let Some(menu) = self.menu.as_mut() else {
            return false;
        };
        match menu.stack.pop() {
            Some(frame) => {
                menu.current = frame.current;
                menu.siblings = frame.siblings;
                true
            }
            None => false,
        }
    }

    /// Search everything under the current level. Falls back to the first
    /// root category at the root level, and to `None` when there are no
    /// categories at all. The back stack is not touched.
    pub fn view_all(&self) -> Option<SearchScope> {
        let menu = self.menu.as_ref()?;
        menu.current
            .as_ref()
            .or_else(|| menu.roots.first())
            .map(|c| SearchScope { category_id: c.id })
    }

    /// Header label for the current level.
    pub fn current_level_name<'a>(&'a self, fallback: Option<&'a str>) -> &'a str {
        self.current()
            .map(|c| c.detail.as_str())
            .filter(|d| !d.is_empty())
            .or(fallback.filter(|f| !f.is_empty()))
            .unwrap_or(DEFAULT_LEVEL_NAME)
    }

    /// Label for the back button: the level `go_back` would return to.
    pub fn previous_level_name<'a>(&'a self, fallback: Option<&'a str>) -> &'a str {
        self.frames()
            .last()
            .and_then(|f| f.current.as_ref())
            .map(|c| c.detail.as_str())
            .filter(|d| !d.is_empty())
            .or(fallback.filter(|f| !f.is_empty()))
            .unwrap_or(DEFAULT_LEVEL_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, detail: &str, list: Vec<Category>) -> Category {
        Category {
            id,
            detail: detail.to_string(),
            is_delete: false,
            is_all: false,
            category_level: 0,
            list,
        }
    }

    fn all_node(id: i64) -> Category {
        Category {
            is_all: true,
            ..node(id, "ทั้งหมด", vec![])
        }
    }

    /// Cat > Food > {Dry, Wet}, Cat > Toys; Dog (leaf)
    fn tree() -> Vec<Category> {
        vec![
            node(
                1,
                "Cat",
                vec![
                    all_node(10),
                    node(11, "Food", vec![node(111, "Dry", vec![]), node(112, "Wet", vec![])]),
                    node(12, "Toys", vec![]),
                ],
            ),
            node(2, "Dog", vec![]),
        ]
    }

    #[test]
    fn test_open_starts_at_root() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        assert!(nav.is_open());
        assert_eq!(nav.current(), None);
        assert_eq!(nav.siblings(), tree().as_slice());
        assert_eq!(nav.depth(), 0);
        assert_eq!(nav.load_state(), Some(&LoadState::Ready));
    }

    #[test]
    fn test_reopen_resets_state() {
        let mut nav = CategoryNavigator::new();
        let first = nav.open(tree());
        nav.select(&tree()[0]);
        assert_eq!(nav.depth(), 1);

        let second = nav.open(tree());
        assert_ne!(first, second);
        assert_eq!(nav.depth(), 0);
        assert_eq!(nav.current(), None);
    }

    #[test]
    fn test_example_scenario() {
        let roots = vec![
            node(1, "Cat", vec![node(11, "Food", vec![])]),
            node(2, "Dog", vec![]),
        ];
        let mut nav = CategoryNavigator::new();
        nav.open(roots.clone());

        assert_eq!(nav.select(&roots[0]), Selection::Drilled { depth: 1 });
        assert_eq!(nav.siblings(), &[node(11, "Food", vec![])]);

        let food = nav.siblings()[0].clone();
        assert_eq!(nav.select(&food), Selection::Search(SearchScope { category_id: 11 }));
        assert_eq!(nav.depth(), 1);

        assert!(nav.go_back());
        assert_eq!(nav.depth(), 0);
        assert_eq!(nav.siblings(), roots.as_slice());
    }

    #[test]
    fn test_leaf_selection_does_not_touch_stack() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        nav.select(&tree()[0]);
        let frames = nav.frames().to_vec();
        let current = nav.current().cloned();

        let toys = tree()[0].list[2].clone();
        assert_eq!(nav.select(&toys), Selection::Search(SearchScope { category_id: 12 }));
        assert_eq!(nav.frames(), frames.as_slice());
        assert_eq!(nav.current().cloned(), current);

        nav.close();
        assert!(!nav.is_open());
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn test_stack_symmetry() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        let initial_current = nav.current().cloned();
        let initial_siblings = nav.siblings().to_vec();

        let cat = tree()[0].clone();
        let food = cat.list[1].clone();
        assert_eq!(nav.select(&cat), Selection::Drilled { depth: 1 });
        assert_eq!(nav.select(&food), Selection::Drilled { depth: 2 });
        assert_eq!(nav.current(), Some(&food));
        assert_eq!(nav.siblings(), food.list.as_slice());

        assert!(nav.go_back());
        assert_eq!(nav.current(), Some(&cat));
        assert_eq!(nav.siblings(), cat.list.as_slice());
        assert!(nav.go_back());

        assert_eq!(nav.current().cloned(), initial_current);
        assert_eq!(nav.siblings(), initial_siblings.as_slice());
    }

    #[test]
    fn test_go_back_at_root_is_noop() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        assert!(!nav.go_back());
        assert_eq!(nav.siblings(), tree().as_slice());

        let mut closed = CategoryNavigator::new();
        assert!(!closed.go_back());
    }

    #[test]
    fn test_aggregate_node_is_hidden_and_ignored() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        nav.select(&tree()[0]);

        let labels: Vec<&str> = nav.selectable().iter().map(|c| c.detail.as_str()).collect();
        assert_eq!(labels, vec!["Food", "Toys"]);
        assert_eq!(nav.select(&all_node(10)), Selection::Ignored);
        assert_eq!(nav.depth(), 1);
        assert!(nav.is_open());
    }

    #[test]
    fn test_deleted_node_is_hidden_and_ignored() {
        let retired = Category {
            is_delete: true,
            ..node(3, "Fish", vec![node(31, "Flakes", vec![])])
        };
        let mut roots = tree();
        roots.push(retired.clone());

        let mut nav = CategoryNavigator::new();
        nav.open(roots);
        let labels: Vec<&str> = nav.selectable().iter().map(|c| c.detail.as_str()).collect();
        assert_eq!(labels, vec!["Cat", "Dog"]);
        assert_eq!(nav.select(&retired), Selection::Ignored);
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn test_select_index_uses_selectable_order() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        nav.select_index(0);
        // Index 0 skips the aggregate entry and lands on Food
        assert_eq!(nav.select_index(0), Selection::Drilled { depth: 2 });
        assert_eq!(nav.current().map(|c| c.id), Some(11));
        assert_eq!(nav.select_index(9), Selection::Ignored);
    }

    #[test]
    fn test_view_all_scopes() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        assert_eq!(nav.view_all(), Some(SearchScope { category_id: 1 }));

        nav.select(&tree()[0]);
        nav.select(&tree()[0].list[1]);
        assert_eq!(nav.view_all(), Some(SearchScope { category_id: 11 }));
        assert_eq!(nav.depth(), 2);

        nav.open(vec![]);
        assert_eq!(nav.view_all(), None);
        assert_eq!(nav.load_state(), Some(&LoadState::Empty));

        assert_eq!(CategoryNavigator::new().view_all(), None);
    }

    #[test]
    fn test_level_names() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        assert_eq!(nav.current_level_name(Some("แมว")), "แมว");
        assert_eq!(nav.current_level_name(None), "หมวดหมู่สินค้า");

        nav.select(&tree()[0]);
        nav.select(&tree()[0].list[1]);
        assert_eq!(nav.current_level_name(Some("แมว")), "Food");
        assert_eq!(nav.previous_level_name(Some("แมว")), "Cat");

        nav.go_back();
        assert_eq!(nav.previous_level_name(Some("แมว")), "แมว");
    }

    #[test]
    fn test_stale_load_result_is_discarded() {
        let mut nav = CategoryNavigator::new();
        let old = nav.begin_loading();
        assert_eq!(nav.load_state(), Some(&LoadState::Loading));

        let current = nav.begin_loading();
        assert!(!nav.finish_loading::<String>(old, Ok(tree())));
        assert_eq!(nav.load_state(), Some(&LoadState::Loading));

        assert!(nav.finish_loading::<String>(current, Ok(tree())));
        assert_eq!(nav.siblings().len(), 2);

        nav.close();
        assert!(!nav.finish_loading::<String>(current, Ok(tree())));
    }

    #[test]
    fn test_failed_load_shows_error_state() {
        let mut nav = CategoryNavigator::new();
        let session = nav.begin_loading();
        assert!(nav.finish_loading(session, Err("timeout")));
        assert_eq!(nav.load_state(), Some(&LoadState::Failed("timeout".to_string())));
        assert!(nav.selectable().is_empty());
        assert_eq!(nav.view_all(), None);
    }

    #[test]
    fn test_frames_serialize() {
        let mut nav = CategoryNavigator::new();
        nav.open(tree());
        nav.select(&tree()[0]);
        let json = serde_json::to_string(nav.frames()).expect("serialize frames");
        let frames: Vec<NavigationFrame> = serde_json::from_str(&json).expect("deserialize frames");
        assert_eq!(frames, nav.frames());
    }
}
