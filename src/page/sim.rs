//! In-memory simulated page.
//!
//! Stands in for a live document in tests and embedder experiments. Nodes
//! declare which selector strings they answer to; queries are literal tag
//! matches, not CSS evaluation. Removal marks a node (and its subtree)
//! vanished, mimicking the host page destroying elements mid-pipeline.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::domain::{Label, PanelView, RelatedPost};
use crate::page::selectors;

use super::host::{HostPage, NodeId, PageEvent};

/// Blueprint for one simulated element.
#[derive(Debug, Clone, Default)]
pub struct SimElement {
    selectors: Vec<String>,
    attrs: Vec<(String, String)>,
    text: String,
}

impl SimElement {
    pub fn new(selector: &str) -> Self {
        Self {
            selectors: vec![selector.to_string()],
            ..Default::default()
        }
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

#[derive(Debug)]
struct SimNode {
    selectors: Vec<String>,
    attrs: HashMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    badges: Vec<Label>,
    removed: bool,
}

#[derive(Default)]
struct SimState {
    url: String,
    next_id: NodeId,
    nodes: HashMap<NodeId, SimNode>,
    /// Top-level insertion order; stands in for document order.
    roots: Vec<NodeId>,
    popups: Vec<Vec<RelatedPost>>,
    panel_renders: Vec<PanelView>,
    related_ui_mounted: bool,
}

pub struct SimPage {
    state: Mutex<SimState>,
    events: broadcast::Sender<PageEvent>,
}

impl SimPage {
    pub fn new(url: &str) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(SimState {
                url: url.to_string(),
                ..Default::default()
            }),
            events,
        }
    }

    /// Simulates a single-page-app navigation (URL changes, no event).
    pub fn navigate(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    pub fn emit(&self, event: PageEvent) {
        let _ = self.events.send(event);
    }

    pub fn add_element(&self, parent: Option<NodeId>, spec: SimElement) -> NodeId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.nodes.insert(
            id,
            SimNode {
                selectors: spec.selectors,
                attrs: spec.attrs.into_iter().collect(),
                text: spec.text,
                children: Vec::new(),
                badges: Vec::new(),
                removed: false,
            },
        );
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = state.nodes.get_mut(&parent_id) {
                    parent_node.children.push(id);
                }
            }
            None => state.roots.push(id),
        }
        id
    }

    /// The host page destroying an element and its subtree.
    pub fn remove_element(&self, node: NodeId) {
        let mut state = self.state.lock();
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if let Some(entry) = state.nodes.get_mut(&id) {
                entry.removed = true;
                pending.extend(entry.children.iter().copied());
            }
        }
    }

    // --- scenario builders ---

    /// Feed tile carrying its permalink as an attribute (new layout).
    pub fn add_feed_tile(&self, permalink: &str) -> NodeId {
        self.add_element(
            None,
            SimElement::new(selectors::FEED_TILE).attr("permalink", permalink),
        )
    }

    /// Feed tile whose only identifier is a descendant anchor (old layout).
    pub fn add_feed_tile_with_anchor(&self, href: &str) -> NodeId {
        let tile = self.add_element(None, SimElement::new(selectors::FEED_TILE));
        self.add_element(
            Some(tile),
            SimElement::new(selectors::PERMALINK_ANCHOR).attr("href", href),
        );
        tile
    }

    pub fn add_sdui_unit(&self, href: &str) -> NodeId {
        let unit = self.add_element(None, SimElement::new(selectors::SDUI_UNIT));
        self.add_element(
            Some(unit),
            SimElement::new(selectors::SDUI_TITLE_ANCHOR).attr("href", href),
        );
        unit
    }

    pub fn add_search_preview_tile(&self, permalink: &str) -> NodeId {
        self.add_element(
            None,
            SimElement::new(selectors::SEARCH_PREVIEW).attr("permalink", permalink),
        )
    }

    pub fn add_opened_post(&self, title: &str, body: &str) -> NodeId {
        let post = self.add_element(None, SimElement::new(selectors::OPENED_POST));
        self.add_element(Some(post), SimElement::new(selectors::POST_TITLE).text(title));
        self.add_element(Some(post), SimElement::new(selectors::POST_BODY).text(body));
        post
    }

    // --- assertions for tests ---

    pub fn badges(&self, node: NodeId) -> Vec<Label> {
        self.state
            .lock()
            .nodes
            .get(&node)
            .map(|n| n.badges.clone())
            .unwrap_or_default()
    }

    pub fn badge_count(&self, node: NodeId) -> usize {
        self.badges(node).len()
    }

    pub fn popups(&self) -> Vec<Vec<RelatedPost>> {
        self.state.lock().popups.clone()
    }

    pub fn panel_renders(&self) -> Vec<PanelView> {
        self.state.lock().panel_renders.clone()
    }

    pub fn related_ui_mounted(&self) -> bool {
        self.state.lock().related_ui_mounted
    }
}

impl SimState {
    fn live(&self, node: NodeId) -> Option<&SimNode> {
        self.nodes.get(&node).filter(|n| !n.removed)
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        self.live(node)
            .map(|n| n.selectors.iter().any(|s| s == selector))
            .unwrap_or(false)
    }

    fn find_within(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let entry = self.live(node)?;
        for child in &entry.children {
            if self.matches(*child, selector) {
                return Some(*child);
            }
            if let Some(found) = self.find_within(*child, selector) {
                return Some(found);
            }
        }
        None
    }
}

impl HostPage for SimPage {
    fn current_url(&self) -> String {
        self.state.lock().url.clone()
    }

    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        let state = self.state.lock();
        let mut matched = Vec::new();
        let mut pending: Vec<NodeId> = state.roots.clone();
        let mut index = 0;
        while index < pending.len() {
            let id = pending[index];
            index += 1;
            if state.matches(id, selector) {
                matched.push(id);
            }
            if let Some(node) = state.live(id) {
                pending.extend(node.children.iter().copied());
            }
        }
        matched
    }

    fn query_within(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        self.state.lock().find_within(node, selector)
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.state.lock().live(node).map(|n| n.text.clone())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.state
            .lock()
            .live(node)
            .and_then(|n| n.attrs.get(name).cloned())
    }

    fn set_attr(&self, node: NodeId, name: &str, value: &str) -> bool {
        let mut state = self.state.lock();
        match state.nodes.get_mut(&node).filter(|n| !n.removed) {
            Some(entry) => {
                entry.attrs.insert(name.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    fn append_badge(&self, node: NodeId, label: Label) -> bool {
        let mut state = self.state.lock();
        match state.nodes.get_mut(&node).filter(|n| !n.removed) {
            Some(entry) => {
                entry.badges.push(label);
                true
            }
            None => false,
        }
    }

    fn clear_annotations(&self, marker_attr: &str) {
        let mut state = self.state.lock();
        for node in state.nodes.values_mut() {
            node.badges.clear();
            node.attrs.remove(marker_attr);
        }
    }

    fn mount_related_ui(&self) {
        self.state.lock().related_ui_mounted = true;
    }

    fn render_related_panel(&self, view: &PanelView) {
        self.state.lock().panel_renders.push(view.clone());
    }

    fn remove_related_ui(&self) {
        self.state.lock().related_ui_mounted = false;
    }

    fn show_popup(&self, recommendations: &[RelatedPost]) {
        self.state.lock().popups.push(recommendations.to_vec());
    }

    fn subscribe_events(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }
}
