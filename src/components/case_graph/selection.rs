//! Step/edge selection and hover, plus the relevance each derives.
//!
//! [`SelectionState`] changes only through [`SelectionState::reduce`], so any
//! UI binding (pointer, keyboard, sidebar, tests) drives it the same way.

use std::collections::{BTreeSet, HashSet};

use super::types::{CaseGraph, Edge, EdgeId, Node, NodeId, StepId, Tier};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Hover {
	#[default]
	None,
	Node(NodeId),
	Edge(EdgeId),
}

/// What a pointer click landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickTarget {
	Node(NodeId),
	Edge { edge: EdgeId, step: StepId },
	Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
	/// Toggles: selecting the current step deselects it.
	SelectStep(StepId),
	ClearStep,
	ToggleEdge(EdgeId),
	SetHover(Hover),
	Click(ClickTarget),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
	selected_step: Option<StepId>,
	selected_edges: BTreeSet<EdgeId>,
	hovered_node: Option<NodeId>,
	hovered_edge: Option<EdgeId>,
}

impl SelectionState {
	pub fn selected_step(&self) -> Option<StepId> {
		self.selected_step
	}

	pub fn selected_edges(&self) -> &BTreeSet<EdgeId> {
		&self.selected_edges
	}

	pub fn hovered_node(&self) -> Option<NodeId> {
		self.hovered_node
	}

	pub fn hovered_edge(&self) -> Option<EdgeId> {
		self.hovered_edge
	}

	pub fn hover(&self) -> Hover {
		match (self.hovered_node, self.hovered_edge) {
			(Some(n), _) => Hover::Node(n),
			(None, Some(e)) => Hover::Edge(e),
			(None, None) => Hover::None,
		}
	}

	pub fn reduce(mut self, event: SelectionEvent) -> Self {
		match event {
			SelectionEvent::SelectStep(step) => {
				self.selected_step = if self.selected_step == Some(step) { None } else { Some(step) };
				self.selected_edges.clear();
			}
			SelectionEvent::ClearStep => {
				self.selected_step = None;
				self.selected_edges.clear();
			}
			SelectionEvent::ToggleEdge(edge) => {
				if self.selected_step.is_some() && !self.selected_edges.remove(&edge) {
					self.selected_edges.insert(edge);
				}
			}
			SelectionEvent::SetHover(hover) => {
				(self.hovered_node, self.hovered_edge) = match hover {
					Hover::None => (None, None),
					Hover::Node(n) => (Some(n), None),
					Hover::Edge(e) => (None, Some(e)),
				};
			}
			SelectionEvent::Click(ClickTarget::Edge { step, .. }) => {
				if self.selected_step.is_none() {
					return self.reduce(SelectionEvent::SelectStep(step));
				}
			}
			SelectionEvent::Click(ClickTarget::Empty) => return self.reduce(SelectionEvent::ClearStep),
			SelectionEvent::Click(ClickTarget::Node(_)) => {}
		}
		self
	}

	/// Applies `event` in place; returns whether anything changed.
	pub fn apply(&mut self, event: SelectionEvent) -> bool {
		let next = self.clone().reduce(event);
		let changed = next != *self;
		*self = next;
		changed
	}
}

/// How a node relates to the current selection. Hover is tracked separately
/// and overrides the colour at every tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRelevance {
	/// No step selected; coloured by depth.
	Tier(Tier),
	Active,
	HighlightedChild,
	Dimmed,
}

/// Node sets derived from one selected step; rebuilt when the step changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepFocus {
	pub step: StepId,
	pub active: HashSet<NodeId>,
	pub highlighted: HashSet<NodeId>,
}

impl StepFocus {
	/// `active`: endpoints of the step's edges. `highlighted`: structural
	/// descendants of referenced organisations (children of a referenced
	/// parent; children and grandchildren of a referenced root).
	pub fn new(graph: &CaseGraph, step: StepId) -> Self {
		let active: HashSet<NodeId> = graph
			.edges_for_step(step)
			.flat_map(|e| e.from_nodes.iter().chain(&e.to_nodes).copied())
			.collect();

		let mut highlighted = HashSet::new();
		for target in active.iter().filter_map(|&id| graph.node(id)) {
			let tier = target.tier();
			for node in graph.nodes() {
				let under = match tier {
					Tier::Parent => node.parent_id == Some(target.id),
					Tier::Root => {
						node.parent_id == Some(target.id) || node.grandparent_id == Some(target.id)
					}
					Tier::Child => false,
				};
				if under {
					highlighted.insert(node.id);
				}
			}
		}

		Self {
			step,
			active,
			highlighted,
		}
	}

	pub fn relevance(&self, node: NodeId) -> NodeRelevance {
		if self.active.contains(&node) {
			NodeRelevance::Active
		} else if self.highlighted.contains(&node) {
			NodeRelevance::HighlightedChild
		} else {
			NodeRelevance::Dimmed
		}
	}
}

pub fn node_relevance(focus: Option<&StepFocus>, node: &Node) -> NodeRelevance {
	match focus {
		Some(focus) => focus.relevance(node.id),
		None => NodeRelevance::Tier(node.tier()),
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeRelevance {
	/// No step selected.
	Idle,
	Active,
	/// Shown, but outside the selected step or unchecked within it.
	Dimmed,
}

pub fn edge_relevance(state: &SelectionState, edge: &Edge) -> EdgeRelevance {
	match state.selected_step {
		None => EdgeRelevance::Idle,
		Some(step) if edge.step_id != step => EdgeRelevance::Dimmed,
		Some(_) if state.selected_edges.is_empty() || state.selected_edges.contains(&edge.id) => {
			EdgeRelevance::Active
		}
		Some(_) => EdgeRelevance::Dimmed,
	}
}

/// Edges of the selected step that are filtered out by the checkbox subset
/// are drawn faintly and cannot be picked.
pub fn edge_pickable(state: &SelectionState, edge: &Edge) -> bool {
	match state.selected_step {
		Some(step) if edge.step_id == step => edge_relevance(state, edge) == EdgeRelevance::Active,
		_ => true,
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
	pub relevance: NodeRelevance,
	pub alpha: u8,
	pub hovered: bool,
}

pub fn node_style(state: &SelectionState, focus: Option<&StepFocus>, node: &Node) -> NodeStyle {
	let relevance = node_relevance(focus, node);
	let hovered = state.hovered_node == Some(node.id);
	let alpha = match relevance {
		_ if hovered => 255,
		NodeRelevance::Tier(_) | NodeRelevance::Active => 225,
		NodeRelevance::HighlightedChild => 180,
		NodeRelevance::Dimmed => 80,
	};
	NodeStyle {
		relevance,
		alpha,
		hovered,
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
	pub relevance: EdgeRelevance,
	pub alpha: u8,
	pub width: f64,
	/// Violated edges are always drawn as a broken line.
	pub broken: bool,
	pub hovered: bool,
}

pub fn edge_style(state: &SelectionState, edge: &Edge) -> EdgeStyle {
	let relevance = edge_relevance(state, edge);
	let (mut alpha, mut width) = match relevance {
		EdgeRelevance::Idle if edge.violated => (40, 1.0),
		EdgeRelevance::Idle => (60, 1.0),
		EdgeRelevance::Active => (200, 2.0),
		EdgeRelevance::Dimmed => (30, 1.0),
	};
	if relevance == EdgeRelevance::Active {
		if edge.violated {
			alpha = alpha.max(180);
		} else if edge.unused {
			alpha = alpha.min(80);
		}
	}
	let hovered = state.hovered_edge == Some(edge.id);
	if hovered {
		(alpha, width) = (255, 3.0);
	}
	EdgeStyle {
		relevance,
		alpha,
		width,
		broken: edge.violated,
		hovered,
	}
}
