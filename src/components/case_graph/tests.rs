//! Whole-controller scenarios on the bundled Bell Labs case study.
//!
//! The canvas is 800×600 and the camera starts unpanned at zoom 1, so a
//! world point `(x, y)` sits at screen `(x + 400, y + 300)` until `tick`.

use std::collections::HashSet;

use rstest::{fixture, rstest};

use super::config::{LayoutMode, Settings};
use super::data::{bundled_dataset, validate};
use super::geometry::Point;
use super::selection::{EdgeRelevance, NodeRelevance, SelectionEvent, edge_style, node_relevance};
use super::state::{GraphCommand, Hit, Tooltip, VisualizationState};
use super::types::{Dataset, Edge, EdgeId, Node, NodeId, Step, StepId, Tier};

fn screen(x: f64, y: f64) -> (f64, f64) {
	(x + 400.0, y + 300.0)
}

/// Right of the Transistor Development Team (node 21, at (300, -150)), on
/// the ring of its step 9 self-loop.
const LOOP_POINT: (f64, f64) = (325.0, -150.0);

#[fixture]
fn bell() -> VisualizationState {
	VisualizationState::new(bundled_dataset(), Settings::default(), 800.0, 600.0)
}

fn relevance(state: &VisualizationState, id: NodeId) -> NodeRelevance {
	let node = state.graph().node(id).unwrap();
	node_relevance(state.focus(), node)
}

fn ids_with(state: &VisualizationState, wanted: NodeRelevance) -> HashSet<NodeId> {
	state
		.graph()
		.nodes()
		.iter()
		.map(|n| n.id)
		.filter(|&id| relevance(state, id) == wanted)
		.collect()
}

#[rstest]
fn shockleys_violated_supervision(mut bell: VisualizationState) {
	assert!(bell.dispatch(GraphCommand::Select(SelectionEvent::SelectStep(6))));

	assert_eq!(ids_with(&bell, NodeRelevance::Active), HashSet::from([4, 6, 7]));
	assert!(ids_with(&bell, NodeRelevance::HighlightedChild).is_empty());
	assert_eq!(ids_with(&bell, NodeRelevance::Dimmed).len(), 22);

	let violated = edge_style(bell.selection(), bell.graph().edge(19).unwrap());
	assert_eq!(violated.relevance, EdgeRelevance::Active);
	assert!(violated.broken);
	assert!(violated.alpha >= 180);
	let plain = edge_style(bell.selection(), bell.graph().edge(18).unwrap());
	assert!(!plain.broken);
	let elsewhere = edge_style(bell.selection(), bell.graph().edge(0).unwrap());
	assert_eq!(elsewhere.relevance, EdgeRelevance::Dimmed);

	// Edges 6, 7, 13, 18 and 19 all join 4 and 6, so they fan out.
	assert_eq!(bell.offsets().get(18, 4, 6), 30.0);
	assert_eq!(bell.offsets().get(19, 4, 6), 60.0);
}

#[rstest]
#[case::root_pulls_in_its_tree(0, &[2, 3], &[1, 5, 13, 21, 0, 4, 6, 7, 8, 9, 10, 11, 12, 20, 22, 23])]
#[case::parents_pull_in_members(9, &[0, 5, 16, 18, 20, 21], &[4, 6, 7, 8, 9, 22, 23])]
fn referenced_organisations_highlight_members(
	mut bell: VisualizationState,
	#[case] step: StepId,
	#[case] active: &[NodeId],
	#[case] highlighted: &[NodeId],
) {
	bell.select(SelectionEvent::SelectStep(step));
	assert_eq!(ids_with(&bell, NodeRelevance::Active), active.iter().copied().collect());
	assert_eq!(ids_with(&bell, NodeRelevance::HighlightedChild), highlighted.iter().copied().collect());
}

#[rstest]
fn without_a_step_nodes_show_their_tier(bell: VisualizationState) {
	assert_eq!(relevance(&bell, 2), NodeRelevance::Tier(Tier::Root));
	assert_eq!(relevance(&bell, 5), NodeRelevance::Tier(Tier::Parent));
	assert_eq!(relevance(&bell, 4), NodeRelevance::Tier(Tier::Child));
}

#[rstest]
fn nodes_win_over_edges(bell: VisualizationState) {
	let (x, y) = screen(300.0, 0.0);
	assert_eq!(bell.hit_test(x, y), Some(Hit::Node(2)));
	let (x, y) = screen(LOOP_POINT.0, LOOP_POINT.1);
	assert_eq!(bell.hit_test(x, y), Some(Hit::Edge(34)));
	let (x, y) = screen(0.0, -1000.0);
	assert_eq!(bell.hit_test(x, y), None);
}

#[rstest]
fn clicking_the_loop_selects_its_step(mut bell: VisualizationState) {
	let (x, y) = screen(LOOP_POINT.0, LOOP_POINT.1);
	bell.pointer_down(x, y);
	assert!(bell.pointer_up(x, y));
	assert_eq!(bell.selection().selected_step(), Some(9));

	// Already on a step: edge clicks change nothing.
	bell.pointer_down(x, y);
	assert!(!bell.pointer_up(x, y));
	assert_eq!(bell.selection().selected_step(), Some(9));

	let (x, y) = screen(0.0, -1000.0);
	bell.pointer_down(x, y);
	assert!(bell.pointer_up(x, y));
	assert_eq!(bell.selection().selected_step(), None);
}

#[rstest]
fn unchecked_edges_of_the_step_cannot_be_picked(mut bell: VisualizationState) {
	let (x, y) = screen(LOOP_POINT.0, LOOP_POINT.1);
	bell.select(SelectionEvent::SelectStep(9));
	assert_eq!(bell.hit_test(x, y), Some(Hit::Edge(34)));
	bell.select(SelectionEvent::ToggleEdge(33));
	assert_eq!(bell.hit_test(x, y), None);
}

#[rstest]
fn hover_tracks_the_pointer_and_feeds_the_tooltip(mut bell: VisualizationState) {
	let (x, y) = screen(300.0, 0.0);
	assert!(bell.pointer_move(x, y));
	assert_eq!(bell.selection().hovered_node(), Some(2));
	assert_eq!(
		bell.tooltip(),
		Some(Tooltip {
			title: "Bell Labs".into(),
			detail: Some("AT&T research arm".into()),
		})
	);
	assert!(bell.pointer_leave());
	assert_eq!(bell.tooltip(), None);
}

#[rstest]
fn dragging_moves_the_node_without_clicking(mut bell: VisualizationState) {
	let (x, y) = screen(300.0, 0.0);
	bell.pointer_down(x, y);
	bell.pointer_move(x, y + 50.0);
	assert!(bell.is_dragging());
	assert!(!bell.pointer_up(x, y + 50.0));
	assert_eq!(bell.layout().position(2), Some(Point::new(300.0, 50.0)));
	assert_eq!(bell.selection().selected_step(), None);
}

#[rstest]
fn dragging_empty_canvas_pans(mut bell: VisualizationState) {
	let (x, y) = screen(0.0, -1000.0);
	bell.pointer_down(x, y);
	bell.pointer_move(x + 50.0, y - 20.0);
	bell.pointer_up(x + 50.0, y - 20.0);
	assert_eq!(bell.camera().pan, Point::new(50.0, -20.0));
	assert_eq!(bell.selection().selected_step(), None);
}

#[rstest]
fn selecting_a_step_frames_its_nodes(mut bell: VisualizationState) {
	bell.select(SelectionEvent::SelectStep(6));
	let cam = bell.camera();
	// Nodes 4, 6 and 7 span (235.28, 150) .. (380, 226.08).
	assert!((cam.target_pan.x + 307.64).abs() < 0.01);
	assert!((cam.target_pan.y + 188.04).abs() < 0.01);
	assert!((0.2..=3.0).contains(&cam.target_zoom));
	assert_eq!(cam.zoom, 1.0);
}

#[rstest]
fn step_navigation_walks_declaration_order(mut bell: VisualizationState) {
	bell.dispatch(GraphCommand::StepBack);
	assert_eq!(bell.selection().selected_step(), Some(12));
	bell.dispatch(GraphCommand::StepForward);
	assert_eq!(bell.selection().selected_step(), Some(12));
	bell.dispatch(GraphCommand::Select(SelectionEvent::ClearStep));
	bell.dispatch(GraphCommand::StepForward);
	bell.dispatch(GraphCommand::StepForward);
	assert_eq!(bell.selection().selected_step(), Some(1));
	bell.dispatch(GraphCommand::StepBack);
	assert_eq!(bell.selection().selected_step(), Some(0));
}

#[rstest]
fn hidden_tiers_drop_out_of_picking(mut bell: VisualizationState) {
	let (x, y) = screen(380.0, 150.0);
	assert_eq!(bell.hit_test(x, y), Some(Hit::Node(4)));
	bell.dispatch(GraphCommand::SetTierVisible(Tier::Child, false));
	assert_eq!(bell.hit_test(x, y), None);
	bell.dispatch(GraphCommand::SetTierVisible(Tier::Child, true));
	assert_eq!(bell.hit_test(x, y), Some(Hit::Node(4)));
}

#[rstest]
fn physics_relaxes_from_the_rings(mut bell: VisualizationState) {
	bell.dispatch(GraphCommand::SetLayout(LayoutMode::Physics));
	assert_eq!(bell.layout().mode(), LayoutMode::Physics);
	let start = bell.layout().positions();
	assert_eq!(start.get(&2), Some(&Point::new(300.0, 0.0)));
	for _ in 0..3 {
		bell.tick();
	}
	let end = bell.layout().positions();
	assert_eq!(end.len(), 25);
	assert!(start.iter().any(|(id, p)| end[id] != *p));
	assert!(end.values().all(|p| p.x.is_finite() && p.y.is_finite()));
}

#[rstest]
fn reloading_rebuilds_the_same_graph(bell: VisualizationState) {
	let again = VisualizationState::new(bundled_dataset(), Settings::default(), 800.0, 600.0);
	assert_eq!(bell.graph().nodes(), again.graph().nodes());
	assert_eq!(bell.graph().edges(), again.graph().edges());
	assert_eq!(bell.graph().steps(), again.graph().steps());
	assert_eq!(bell.layout().positions(), again.layout().positions());
	assert_eq!(bell.offsets(), again.offsets());
}

#[rstest]
fn edge_toggles_outside_the_step_are_ignored(mut bell: VisualizationState) {
	bell.select(SelectionEvent::SelectStep(9));
	// Edge 19 belongs to step 6.
	assert!(!bell.select(SelectionEvent::ToggleEdge(19)));
	assert!(!bell.select(SelectionEvent::ToggleEdge(999)));
	assert!(bell.selection().selected_edges().is_empty());
	let own = edge_style(bell.selection(), bell.graph().edge(33).unwrap());
	assert_eq!(own.relevance, EdgeRelevance::Active);

	bell.dispatch(GraphCommand::Select(SelectionEvent::ClearStep));
	assert!(!bell.select(SelectionEvent::ToggleEdge(33)));
}

#[test]
fn inverted_zoom_bounds_do_not_break_framing() {
	let settings = Settings::from_json_str(r#"{"camera": {"min_zoom": 4.0, "max_zoom": 1.0}}"#);
	let mut state = VisualizationState::new(bundled_dataset(), settings, 800.0, 600.0);
	assert!(state.dispatch(GraphCommand::Select(SelectionEvent::SelectStep(6))));
	assert!((1.0..=4.0).contains(&state.camera().target_zoom));
	state.dispatch(GraphCommand::ZoomBy(100.0));
	assert_eq!(state.camera().target_zoom, 4.0);
	state.zoom_at(10.0, 10.0, 0.001);
	assert_eq!(state.camera().target_zoom, 1.0);
	state.tick();
	assert!(state.camera().zoom.is_finite());
}

fn node(id: NodeId, parent: Option<NodeId>) -> Node {
	Node {
		id,
		name: format!("n{id}"),
		description: None,
		parent_id: parent,
		grandparent_id: None,
	}
}

fn link(id: EdgeId, from: NodeId, to: NodeId, step: StepId) -> Edge {
	Edge {
		id,
		from_nodes: vec![from],
		to_nodes: vec![to],
		description: format!("e{id}"),
		step_id: step,
		bidirectional: false,
		unused: false,
		violated: false,
	}
}

#[test]
fn dangling_references_are_skipped() {
	// Node 1 names a parent that does not exist; edges 11 and 12 touch the
	// missing node 42, and edge 12 a missing step.
	let data = Dataset {
		nodes: vec![node(0, None), node(1, Some(99))],
		edges: vec![link(10, 0, 1, 0), link(11, 0, 42, 0), link(12, 42, 0, 7)],
		steps: vec![Step {
			id: 0,
			description: "only".into(),
			date: String::new(),
			phase: None,
			document_ids: Vec::new(),
		}],
		documents: Vec::new(),
	};
	let report = validate(&data);
	assert_eq!(report.missing_nodes, vec![42]);
	assert_eq!(report.missing_steps, vec![7]);

	let mut state = VisualizationState::new(data, Settings::default(), 800.0, 600.0);
	let (hub, stray) = (state.node_position(0).unwrap(), state.node_position(1).unwrap());
	assert_eq!(state.node_position(42), None);

	let (x, y) = screen(hub.x, hub.y);
	assert_eq!(state.hit_test(x, y), Some(Hit::Node(0)));
	let mid = hub.midpoint(stray);
	let (x, y) = screen(mid.x, mid.y);
	assert_eq!(state.hit_test(x, y), Some(Hit::Edge(10)));
	for (wx, wy) in [(150.0, 0.0), (0.0, 0.0), (300.0, -200.0)] {
		let (x, y) = screen(wx, wy);
		assert_eq!(state.hit_test(x, y), None);
	}

	// Framing uses only the nodes that have positions.
	state.select(SelectionEvent::SelectStep(0));
	let cam = state.camera();
	assert!((cam.target_pan.x + mid.x).abs() < 1e-9);
	assert!((cam.target_pan.y + mid.y).abs() < 1e-9);

	assert!(state.select(SelectionEvent::SelectStep(7)));
	let cam = state.camera();
	assert!((cam.target_pan.x + hub.x).abs() < 1e-9 && (cam.target_pan.y + hub.y).abs() < 1e-9);
}
