use std::collections::HashSet;

use log::{debug, info};

use super::config::{CameraSettings, LayoutMode, Settings};
use super::geometry::{Bounds, Point, annulus_contains, distance_point_to_curve, distance_point_to_segment};
use super::layout::Layout;
use super::offsets::EdgeOffsets;
use super::selection::{ClickTarget, Hover, SelectionEvent, SelectionState, StepFocus, edge_pickable};
use super::types::{CaseGraph, Dataset, EdgeId, NodeId, StepId, Tier};

/// What lies under the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
	Node(NodeId),
	Edge(EdgeId),
}

/// Requests from UI outside the canvas, applied between frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GraphCommand {
	Select(SelectionEvent),
	StepForward,
	StepBack,
	SetLayout(LayoutMode),
	ToggleCentering,
	SetTierVisible(Tier, bool),
	SetPan(Point),
	SetZoom(f64),
	/// Zoom about the canvas centre.
	ZoomBy(f64),
}

/// Pan/zoom with smoothed targets. Screen and world are related by
/// `world = (screen - origin) / zoom - pan`, `origin` being the canvas centre.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
	pub pan: Point,
	pub zoom: f64,
	pub target_pan: Point,
	pub target_zoom: f64,
	settings: CameraSettings,
}

impl Camera {
	pub fn new(settings: CameraSettings) -> Self {
		Self {
			pan: Point::default(),
			zoom: 1.0,
			target_pan: Point::default(),
			target_zoom: 1.0,
			settings,
		}
	}

	pub fn screen_to_world(&self, screen: Point, origin: Point) -> Point {
		Point::new(
			(screen.x - origin.x) / self.zoom - self.pan.x,
			(screen.y - origin.y) / self.zoom - self.pan.y,
		)
	}

	pub fn world_to_screen(&self, world: Point, origin: Point) -> Point {
		Point::new(
			(world.x + self.pan.x) * self.zoom + origin.x,
			(world.y + self.pan.y) * self.zoom + origin.y,
		)
	}

	/// Inverted bounds resolve to `max_zoom`.
	fn clamp_zoom(&self, zoom: f64) -> f64 {
		zoom.max(self.settings.min_zoom).min(self.settings.max_zoom)
	}

	pub fn set_pan(&mut self, pan: Point) {
		self.target_pan = pan;
	}

	pub fn set_zoom(&mut self, zoom: f64) {
		self.target_zoom = self.clamp_zoom(zoom);
	}

	/// Moves both current and target pan, for direct manipulation.
	pub fn jump_pan(&mut self, pan: Point) {
		self.pan = pan;
		self.target_pan = pan;
	}

	/// Scales the target zoom by `factor`, keeping the world point under
	/// `screen` fixed once the camera settles.
	pub fn zoom_at(&mut self, screen: Point, origin: Point, factor: f64) {
		let (rx, ry) = (screen.x - origin.x, screen.y - origin.y);
		let world = Point::new(rx / self.target_zoom - self.target_pan.x, ry / self.target_zoom - self.target_pan.y);
		let zoom = self.clamp_zoom(self.target_zoom * factor);
		self.target_zoom = zoom;
		self.target_pan = Point::new(rx / zoom - world.x, ry / zoom - world.y);
	}

	/// Centres `bounds` and picks the zoom that fits it inside the viewport
	/// minus the fit margin.
	pub fn fit(&mut self, bounds: Bounds, width: f64, height: f64) {
		let bounds = bounds.padded(self.settings.fit_padding);
		let margin = 2.0 * self.settings.fit_margin;
		let zoom = ((width - margin).max(1.0) / bounds.width()).min((height - margin).max(1.0) / bounds.height());
		let center = bounds.center();
		self.target_zoom = self.clamp_zoom(zoom);
		self.target_pan = Point::new(-center.x, -center.y);
	}

	pub fn step(&mut self) {
		let k = self.settings.smoothing;
		self.pan = self.pan.lerp(self.target_pan, k);
		self.zoom += (self.target_zoom - self.zoom) * k;
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Press {
	start: Point,
	node: Option<NodeId>,
	/// Node position minus the world point grabbed, or the pan at press time.
	anchor: Point,
	moved: bool,
}

/// Text shown next to the pointer for the hovered item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tooltip {
	pub title: String,
	pub detail: Option<String>,
}

/// Everything one canvas needs: entities, layout, offsets, camera and
/// selection, owned by a single controller and stepped once per frame.
pub struct VisualizationState {
	graph: CaseGraph,
	settings: Settings,
	layout: Layout,
	offsets: EdgeOffsets,
	camera: Camera,
	selection: SelectionState,
	focus: Option<StepFocus>,
	hidden: HashSet<Tier>,
	press: Option<Press>,
	pub width: f64,
	pub height: f64,
}

impl VisualizationState {
	pub fn new(data: Dataset, settings: Settings, width: f64, height: f64) -> Self {
		let settings = settings.normalized();
		let graph = CaseGraph::new(data);
		let layout = Layout::new(settings.layout, &graph, &settings, width, height);
		let offsets = EdgeOffsets::resolve(graph.edges(), settings.interaction.offset_spacing);
		info!(
			"Visualization ready: {} nodes placed, {} offset strands, {:?} layout",
			layout.positions().len(),
			offsets.len(),
			layout.mode()
		);
		Self {
			camera: Camera::new(settings.camera.clone()),
			graph,
			settings,
			layout,
			offsets,
			selection: SelectionState::default(),
			focus: None,
			hidden: HashSet::new(),
			press: None,
			width,
			height,
		}
	}

	pub fn graph(&self) -> &CaseGraph {
		&self.graph
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	pub fn offsets(&self) -> &EdgeOffsets {
		&self.offsets
	}

	pub fn camera(&self) -> &Camera {
		&self.camera
	}

	pub fn selection(&self) -> &SelectionState {
		&self.selection
	}

	pub fn focus(&self) -> Option<&StepFocus> {
		self.focus.as_ref()
	}

	pub fn is_dragging(&self) -> bool {
		matches!(self.press, Some(Press { node: Some(_), moved: true, .. }))
	}

	pub fn origin(&self) -> Point {
		Point::new(self.width / 2.0, self.height / 2.0)
	}

	pub fn screen_to_world(&self, sx: f64, sy: f64) -> Point {
		self.camera.screen_to_world(Point::new(sx, sy), self.origin())
	}

	pub fn is_visible(&self, node: NodeId) -> bool {
		self.graph.node(node).is_some_and(|n| !self.hidden.contains(&n.tier()))
	}

	/// Position of a visible, laid-out node.
	pub fn node_position(&self, node: NodeId) -> Option<Point> {
		self.is_visible(node).then(|| self.layout.position(node)).flatten()
	}

	/// Nodes before edges; within each, first match in declaration order.
	pub fn hit_test(&self, sx: f64, sy: f64) -> Option<Hit> {
		let world = self.screen_to_world(sx, sy);
		let ix = &self.settings.interaction;

		let node = self.graph.nodes().iter().find(|n| {
			self.node_position(n.id)
				.is_some_and(|p| p.distance(world) < ix.node_hit_radius)
		});
		if let Some(node) = node {
			return Some(Hit::Node(node.id));
		}

		let edge = self.graph.edges().iter().filter(|e| edge_pickable(&self.selection, e)).find(|e| {
			e.endpoint_pairs().any(|(from, to)| {
				let (Some(a), Some(b)) = (self.node_position(from), self.node_position(to)) else {
					return false;
				};
				if from == to {
					return annulus_contains(world, a, ix.loop_inner_radius, ix.loop_outer_radius);
				}
				let offset = self.offsets.get(e.id, from, to);
				let d = if offset == 0.0 {
					distance_point_to_segment(world, a, b)
				} else {
					distance_point_to_curve(world, a, b, offset, ix.curve_samples)
				};
				d < ix.edge_hit_threshold
			})
		});
		edge.map(|e| Hit::Edge(e.id))
	}

	/// Applies a selection event; a newly selected step recomputes the
	/// derived focus and moves the camera onto it. Edge toggles only apply
	/// to edges of the selected step.
	pub fn select(&mut self, event: SelectionEvent) -> bool {
		let before = self.selection.selected_step();
		if let SelectionEvent::ToggleEdge(edge) = event
			&& self.graph.edge(edge).map(|e| e.step_id) != before
		{
			debug!("Ignoring toggle of edge {edge}, which is not in the selected step");
			return false;
		}
		if !self.selection.apply(event) {
			return false;
		}
		let after = self.selection.selected_step();
		if after != before {
			self.focus = after.map(|step| StepFocus::new(&self.graph, step));
			if let Some(step) = after {
				debug!("Selected step {step}");
				self.fit_to_step(step);
			}
		}
		true
	}

	pub fn hover_at(&mut self, sx: f64, sy: f64) -> bool {
		let hover = match self.hit_test(sx, sy) {
			Some(Hit::Node(n)) => Hover::Node(n),
			Some(Hit::Edge(e)) => Hover::Edge(e),
			None => Hover::None,
		};
		self.select(SelectionEvent::SetHover(hover))
	}

	pub fn click_at(&mut self, sx: f64, sy: f64) -> bool {
		let target = match self.hit_test(sx, sy) {
			Some(Hit::Node(n)) => ClickTarget::Node(n),
			Some(Hit::Edge(edge)) => match self.graph.edge(edge) {
				Some(e) => ClickTarget::Edge { edge, step: e.step_id },
				None => ClickTarget::Empty,
			},
			None => ClickTarget::Empty,
		};
		self.select(SelectionEvent::Click(target))
	}

	pub fn fit_to_step(&mut self, step: StepId) {
		let points = self
			.graph
			.edges_for_step(step)
			.flat_map(|e| e.from_nodes.iter().chain(&e.to_nodes))
			.filter_map(|&id| self.node_position(id));
		if let Some(bounds) = Bounds::from_points(points) {
			self.camera.fit(bounds, self.width, self.height);
		}
	}

	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		let start = Point::new(sx, sy);
		let node = match self.hit_test(sx, sy) {
			Some(Hit::Node(n)) => Some(n),
			_ => None,
		};
		let anchor = match node.and_then(|n| self.layout.position(n)) {
			Some(p) => {
				let world = self.screen_to_world(sx, sy);
				Point::new(p.x - world.x, p.y - world.y)
			}
			None => self.camera.pan,
		};
		self.press = Some(Press {
			start,
			node,
			anchor,
			moved: false,
		});
	}

	/// Drags the pressed node or pans; otherwise updates hover.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) -> bool {
		let Some(mut press) = self.press else {
			return self.hover_at(sx, sy);
		};
		if !press.moved && press.start.distance(Point::new(sx, sy)) <= self.settings.interaction.drag_threshold {
			return false;
		}
		press.moved = true;
		self.press = Some(press);
		match press.node {
			Some(node) => {
				let world = self.screen_to_world(sx, sy);
				self.layout
					.drag_to(node, Point::new(world.x + press.anchor.x, world.y + press.anchor.y));
			}
			None => {
				let zoom = self.camera.zoom;
				self.camera.jump_pan(Point::new(
					press.anchor.x + (sx - press.start.x) / zoom,
					press.anchor.y + (sy - press.start.y) / zoom,
				));
			}
		}
		false
	}

	/// Ends a press; one that never moved past the drag threshold is a click.
	pub fn pointer_up(&mut self, sx: f64, sy: f64) -> bool {
		let Some(press) = self.press.take() else {
			return false;
		};
		if let Some(node) = press.node {
			self.layout.release(node);
		}
		if press.moved { false } else { self.click_at(sx, sy) }
	}

	pub fn pointer_leave(&mut self) -> bool {
		if let Some(Press { node: Some(node), .. }) = self.press.take() {
			self.layout.release(node);
		}
		self.select(SelectionEvent::SetHover(Hover::None))
	}

	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let origin = self.origin();
		self.camera.zoom_at(Point::new(sx, sy), origin, factor);
	}

	pub fn set_layout_mode(&mut self, mode: LayoutMode) {
		self.layout = Layout::new(mode, &self.graph, &self.settings, self.width, self.height);
		for tier in self.hidden.clone() {
			self.apply_visibility(tier, false);
		}
		info!("Switched to {mode:?} layout");
	}

	pub fn set_tier_visible(&mut self, tier: Tier, visible: bool) {
		let changed = if visible { self.hidden.remove(&tier) } else { self.hidden.insert(tier) };
		if changed {
			self.apply_visibility(tier, visible);
			debug!("{tier:?} nodes visible: {visible}");
		}
	}

	fn apply_visibility(&mut self, tier: Tier, visible: bool) {
		for node in self.graph.nodes().iter().filter(|n| n.tier() == tier) {
			self.layout.set_visible(node.id, visible);
		}
	}

	/// Returns whether the selection changed.
	pub fn dispatch(&mut self, command: GraphCommand) -> bool {
		match command {
			GraphCommand::Select(event) => return self.select(event),
			GraphCommand::StepForward | GraphCommand::StepBack => {
				let forward = command == GraphCommand::StepForward;
				let next = match self.selection.selected_step() {
					Some(step) => self.graph.adjacent_step(step, forward),
					None if forward => self.graph.steps().first().map(|s| s.id),
					None => self.graph.steps().last().map(|s| s.id),
				};
				if let Some(step) = next {
					return self.select(SelectionEvent::SelectStep(step));
				}
			}
			GraphCommand::SetLayout(mode) => self.set_layout_mode(mode),
			GraphCommand::ToggleCentering => self.layout.toggle_centering(),
			GraphCommand::SetTierVisible(tier, visible) => self.set_tier_visible(tier, visible),
			GraphCommand::SetPan(pan) => self.camera.set_pan(pan),
			GraphCommand::SetZoom(zoom) => self.camera.set_zoom(zoom),
			GraphCommand::ZoomBy(factor) => {
				let origin = self.origin();
				self.camera.zoom_at(origin, origin, factor);
			}
		}
		false
	}

	pub fn tick(&mut self) {
		self.layout.tick();
		self.camera.step();
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.layout.resize(width, height);
	}

	pub fn tooltip(&self) -> Option<Tooltip> {
		match self.selection.hover() {
			Hover::Node(id) => self.graph.node(id).map(|n| Tooltip {
				title: n.name.clone(),
				detail: n.description.clone(),
			}),
			Hover::Edge(id) => self.graph.edge(id).map(|e| Tooltip {
				title: e.description.clone(),
				detail: None,
			}),
			Hover::None => None,
		}
	}
}
