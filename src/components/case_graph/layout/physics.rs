use std::collections::HashMap;

use log::debug;

use super::Positions;
use crate::components::case_graph::config::{Container, PhysicsSettings};
use crate::components::case_graph::geometry::Point;
use crate::components::case_graph::types::{CaseGraph, NodeId, Tier};

#[derive(Clone, Debug, PartialEq)]
pub struct Body {
	pub id: NodeId,
	pub pos: Point,
	pub vx: f64,
	pub vy: f64,
	/// Never moved by forces (tier configured fixed).
	pub pinned: bool,
	pub dragging: bool,
	pub visible: bool,
}

impl Body {
	pub fn fixed(&self) -> bool {
		self.pinned || self.dragging
	}

	fn push(&mut self, fx: f64, fy: f64) {
		if !self.fixed() {
			self.vx += fx;
			self.vy += fy;
		}
	}
}

/// Explicit-Euler spring/repulsion simulation in world space, centred on
/// the origin. Stable only while `damping < 1` and `max_velocity` is finite.
#[derive(Clone, Debug)]
pub struct ForceSimulation {
	bodies: Vec<Body>,
	index: HashMap<NodeId, usize>,
	springs: Vec<(usize, usize)>,
	params: PhysicsSettings,
	half_extent: Point,
}

impl ForceSimulation {
	/// Bodies start at `seed` (origin when absent); springs follow every
	/// non-loop endpoint pair of every edge.
	pub fn new(graph: &CaseGraph, seed: &Positions, params: PhysicsSettings, width: f64, height: f64) -> Self {
		let bodies: Vec<Body> = graph
			.nodes()
			.iter()
			.map(|n| Body {
				id: n.id,
				pos: seed.get(&n.id).copied().unwrap_or_default(),
				vx: 0.0,
				vy: 0.0,
				pinned: match n.tier() {
					Tier::Root => params.fix_roots,
					Tier::Parent => params.fix_parents,
					Tier::Child => params.fix_children,
				},
				dragging: false,
				visible: true,
			})
			.collect();
		let index: HashMap<NodeId, usize> = bodies.iter().enumerate().map(|(i, b)| (b.id, i)).collect();
		let springs: Vec<(usize, usize)> = graph
			.edges()
			.iter()
			.flat_map(|e| e.endpoint_pairs())
			.filter(|(a, b)| a != b)
			.filter_map(|(a, b)| Some((*index.get(&a)?, *index.get(&b)?)))
			.collect();
		debug!("Force simulation: {} bodies, {} springs", bodies.len(), springs.len());

		Self {
			bodies,
			index,
			springs,
			params,
			half_extent: Point::new(width / 2.0, height / 2.0),
		}
	}

	pub fn params(&self) -> &PhysicsSettings {
		&self.params
	}

	pub fn set_centering(&mut self, enabled: bool) {
		self.params.center_enabled = enabled;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.half_extent = Point::new(width / 2.0, height / 2.0);
	}

	/// Half-axes of the container boundary, if one is configured and fits.
	pub fn container_extent(&self) -> Option<Point> {
		let margin = self.params.container_margin;
		let extent = Point::new(self.half_extent.x - margin, self.half_extent.y - margin);
		(self.params.container != Container::None && extent.x > 0.0 && extent.y > 0.0).then_some(extent)
	}

	pub fn body(&self, id: NodeId) -> Option<&Body> {
		self.index.get(&id).map(|&i| &self.bodies[i])
	}

	fn body_mut(&mut self, id: NodeId) -> Option<&mut Body> {
		self.index.get(&id).map(|&i| &mut self.bodies[i])
	}

	pub fn position(&self, id: NodeId) -> Option<Point> {
		self.body(id).map(|b| b.pos)
	}

	pub fn positions(&self) -> Positions {
		self.bodies.iter().map(|b| (b.id, b.pos)).collect()
	}

	pub fn set_visible(&mut self, id: NodeId, visible: bool) {
		if let Some(b) = self.body_mut(id) {
			b.visible = visible;
		}
	}

	/// Moves a body under the pointer and holds it in place.
	pub fn drag_to(&mut self, id: NodeId, pos: Point) {
		if let Some(b) = self.body_mut(id) {
			b.pos = pos;
			b.vx = 0.0;
			b.vy = 0.0;
			b.dragging = true;
		}
	}

	pub fn release(&mut self, id: NodeId) {
		if let Some(b) = self.body_mut(id) {
			b.dragging = false;
		}
	}

	/// One frame: integrate, then accumulate repulsion, springs, centring
	/// and containment into the velocities used by the next frame.
	pub fn tick(&mut self) {
		self.integrate();
		self.repel();
		self.attract();
		if self.params.center_enabled {
			self.center();
		}
		self.contain();
	}

	fn integrate(&mut self) {
		let p = &self.params;
		for b in self.bodies.iter_mut().filter(|b| b.visible && !b.fixed()) {
			b.vx *= p.damping;
			b.vy *= p.damping;
			if b.vx.abs() < p.min_velocity {
				b.vx = 0.0;
			}
			if b.vy.abs() < p.min_velocity {
				b.vy = 0.0;
			}
			let speed = b.vx.hypot(b.vy);
			if speed > p.max_velocity {
				let scale = p.max_velocity / speed;
				b.vx *= scale;
				b.vy *= scale;
			}
			b.pos.x += b.vx;
			b.pos.y += b.vy;
		}
	}

	fn repel(&mut self) {
		let (force, reach) = (self.params.repel_force, self.params.repel_dist);
		let n = self.bodies.len();
		for i in 0..n {
			for j in i + 1..n {
				let (a, b) = (&self.bodies[i], &self.bodies[j]);
				if !a.visible || !b.visible {
					continue;
				}
				let (dx, dy) = (b.pos.x - a.pos.x, b.pos.y - a.pos.y);
				let d = dx.hypot(dy);
				if d == 0.0 || d >= reach {
					continue;
				}
				let f = force / (d * d);
				let (fx, fy) = (f * dx / d, f * dy / d);
				self.bodies[i].push(-fx, -fy);
				self.bodies[j].push(fx, fy);
			}
		}
	}

	fn attract(&mut self) {
		let (stiffness, rest) = (self.params.spring_force, self.params.spring_length);
		for &(i, j) in &self.springs {
			let (a, b) = (&self.bodies[i], &self.bodies[j]);
			if !a.visible || !b.visible {
				continue;
			}
			let (dx, dy) = (b.pos.x - a.pos.x, b.pos.y - a.pos.y);
			let d = dx.hypot(dy);
			if d == 0.0 {
				continue;
			}
			let f = (d - rest) * stiffness;
			let (fx, fy) = (f * dx / d, f * dy / d);
			self.bodies[i].push(fx, fy);
			self.bodies[j].push(-fx, -fy);
		}
	}

	fn center(&mut self) {
		let k = self.params.center_force;
		for b in self.bodies.iter_mut().filter(|b| b.visible) {
			let (fx, fy) = (-b.pos.x * k, -b.pos.y * k);
			b.push(fx, fy);
		}
	}

	fn contain(&mut self) {
		let k = self.params.contain_force;
		let Some(Point { x: a, y: b }) = self.container_extent() else {
			return;
		};
		match self.params.container {
			Container::None => {}
			Container::Ellipse => {
				for body in self.bodies.iter_mut().filter(|b| b.visible) {
					let d = body.pos.x.hypot(body.pos.y);
					if d == 0.0 {
						continue;
					}
					let (cos, sin) = (body.pos.x / d, body.pos.y / d);
					let boundary = a * b / ((b * cos).powi(2) + (a * sin).powi(2)).sqrt();
					if d > boundary {
						let excess = (d - boundary) * k;
						body.push(-excess * cos, -excess * sin);
					}
				}
			}
			Container::Rectangle => {
				let restore = |v: f64, limit: f64| {
					if v < -limit {
						(-limit - v) * k
					} else if v > limit {
						(limit - v) * k
					} else {
						0.0
					}
				};
				for body in self.bodies.iter_mut().filter(|b| b.visible) {
					let (fx, fy) = (restore(body.pos.x, a), restore(body.pos.y, b));
					body.push(fx, fy);
				}
			}
		}
	}
}
