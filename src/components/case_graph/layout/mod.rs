//! Node placement: one-shot hierarchical rings or a per-frame force simulation.

mod hierarchy;
mod physics;

use std::collections::HashMap;

pub use hierarchy::hierarchical_layout;
pub use physics::ForceSimulation;

use super::config::{LayoutMode, Settings};
use super::geometry::Point;
use super::types::{CaseGraph, NodeId};

/// World-space node centres.
pub type Positions = HashMap<NodeId, Point>;

pub enum Layout {
	Hierarchical(Positions),
	Physics(ForceSimulation),
}

impl Layout {
	/// The physics strategy starts from the hierarchical placement.
	pub fn new(mode: LayoutMode, graph: &CaseGraph, settings: &Settings, width: f64, height: f64) -> Self {
		let rings = hierarchical_layout(graph.nodes(), &settings.hierarchy);
		match mode {
			LayoutMode::Hierarchical => Layout::Hierarchical(rings),
			LayoutMode::Physics => Layout::Physics(ForceSimulation::new(
				graph,
				&rings,
				settings.physics.clone(),
				width,
				height,
			)),
		}
	}

	pub fn mode(&self) -> LayoutMode {
		match self {
			Layout::Hierarchical(_) => LayoutMode::Hierarchical,
			Layout::Physics(_) => LayoutMode::Physics,
		}
	}

	pub fn position(&self, id: NodeId) -> Option<Point> {
		match self {
			Layout::Hierarchical(positions) => positions.get(&id).copied(),
			Layout::Physics(sim) => sim.position(id),
		}
	}

	pub fn positions(&self) -> Positions {
		match self {
			Layout::Hierarchical(positions) => positions.clone(),
			Layout::Physics(sim) => sim.positions(),
		}
	}

	pub fn tick(&mut self) {
		if let Layout::Physics(sim) = self {
			sim.tick();
		}
	}

	pub fn drag_to(&mut self, id: NodeId, pos: Point) {
		match self {
			Layout::Hierarchical(positions) => {
				if let Some(p) = positions.get_mut(&id) {
					*p = pos;
				}
			}
			Layout::Physics(sim) => sim.drag_to(id, pos),
		}
	}

	pub fn release(&mut self, id: NodeId) {
		if let Layout::Physics(sim) = self {
			sim.release(id);
		}
	}

	/// Hidden bodies stop moving and exert no forces; ring positions are
	/// unaffected.
	pub fn set_visible(&mut self, id: NodeId, visible: bool) {
		if let Layout::Physics(sim) = self {
			sim.set_visible(id, visible);
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		if let Layout::Physics(sim) = self {
			sim.resize(width, height);
		}
	}

	pub fn toggle_centering(&mut self) {
		if let Layout::Physics(sim) = self {
			let enabled = !sim.params().center_enabled;
			sim.set_centering(enabled);
		}
	}
}
