use std::collections::HashMap;
use std::f64::consts::TAU;

use log::debug;

use super::Positions;
use crate::components::case_graph::config::HierarchySettings;
use crate::components::case_graph::geometry::Point;
use crate::components::case_graph::types::{Node, NodeId, Tier};

fn on_circle(center: Point, radius: f64, angle: f64) -> Point {
	Point::new(center.x + angle.cos() * radius, center.y + angle.sin() * radius)
}

/// Groups `nodes` by parent id, keeping first-encounter order of the groups
/// and declaration order inside each group.
fn group_by_parent<'a>(nodes: &[&'a Node]) -> Vec<(NodeId, Vec<&'a Node>)> {
	let mut groups: Vec<(NodeId, Vec<&Node>)> = Vec::new();
	let mut slot = HashMap::new();
	for &node in nodes {
		let Some(parent) = node.parent_id else { continue };
		let i = *slot.entry(parent).or_insert_with(|| {
			groups.push((parent, Vec::new()));
			groups.len() - 1
		});
		groups[i].1.push(node);
	}
	groups
}

/// Deterministic radial placement from the parent/grandparent forest.
///
/// Roots sit on a ring around the origin, parents on a ring around their
/// root, children on a smaller ring around their parent. Parents without a
/// placed root and children without a placed parent are spread on an outer
/// ring, so every node receives a position.
pub fn hierarchical_layout(nodes: &[Node], settings: &HierarchySettings) -> Positions {
	let mut positions = Positions::with_capacity(nodes.len());
	let origin = Point::default();
	let of_tier = |tier: Tier| nodes.iter().filter(|n| n.tier() == tier).collect::<Vec<_>>();
	let (roots, parents, children) = (of_tier(Tier::Root), of_tier(Tier::Parent), of_tier(Tier::Child));

	for (i, node) in roots.iter().enumerate() {
		let angle = i as f64 / roots.len() as f64 * TAU;
		positions.insert(node.id, on_circle(origin, settings.root_radius, angle));
	}

	let mut stray_parents = Vec::new();
	for (root, siblings) in group_by_parent(&parents) {
		let Some(&center) = positions.get(&root) else {
			stray_parents.extend(siblings);
			continue;
		};
		for (i, node) in siblings.iter().enumerate() {
			let angle = i as f64 / siblings.len() as f64 * TAU;
			positions.insert(node.id, on_circle(center, settings.parent_radius, angle));
		}
	}
	for (i, node) in stray_parents.iter().enumerate() {
		let angle = i as f64 / stray_parents.len() as f64 * TAU + settings.orphan_parent_angle;
		positions.insert(node.id, on_circle(origin, settings.root_radius * 1.5, angle));
	}

	for (parent, group) in group_by_parent(&children) {
		let (center, radius) = match positions.get(&parent) {
			Some(&p) => (p, settings.child_radius),
			None => (origin, settings.orphan_radius),
		};
		for (i, node) in group.iter().enumerate() {
			let angle = i as f64 / group.len() as f64 * TAU;
			positions.insert(node.id, on_circle(center, radius, angle));
		}
	}

	debug!(
		"Hierarchical layout: {} roots, {} parents, {} children",
		roots.len(),
		parents.len(),
		children.len()
	);
	positions
}
