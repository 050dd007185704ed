use std::collections::{HashMap, HashSet};

use log::debug;

use super::types::{Edge, EdgeId, NodeId};

/// One drawn strand of an edge: `edge` between `from` and `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Strand {
	pub edge: EdgeId,
	pub from: NodeId,
	pub to: NodeId,
}

/// Lateral displacement of strands that share an unordered node pair.
///
/// Strands alone on their pair, and self-loops, have no entry and are drawn
/// straight (offset 0).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeOffsets {
	offsets: HashMap<Strand, f64>,
}

impl EdgeOffsets {
	/// Always a full rebuild from `edges`.
	pub fn resolve(edges: &[Edge], spacing: f64) -> Self {
		let mut groups: Vec<Vec<Strand>> = Vec::new();
		let mut slot: HashMap<(NodeId, NodeId), usize> = HashMap::new();
		let mut seen = HashSet::new();
		for edge in edges {
			for (from, to) in edge.endpoint_pairs().filter(|(a, b)| a != b) {
				// Repeated endpoint ids would yield the same strand twice.
				if !seen.insert(Strand { edge: edge.id, from, to }) {
					continue;
				}
				let key = (from.min(to), from.max(to));
				let i = *slot.entry(key).or_insert_with(|| {
					groups.push(Vec::new());
					groups.len() - 1
				});
				groups[i].push(Strand { edge: edge.id, from, to });
			}
		}

		let mut offsets = HashMap::new();
		for group in groups.iter().filter(|g| g.len() > 1) {
			let center = (group.len() - 1) as f64 / 2.0;
			for (i, strand) in group.iter().enumerate() {
				offsets.insert(*strand, (i as f64 - center) * spacing);
			}
		}
		debug!("Edge offsets: {} strands across {} node pairs", offsets.len(), slot.len());
		Self { offsets }
	}

	pub fn get(&self, edge: EdgeId, from: NodeId, to: NodeId) -> f64 {
		self.offsets.get(&Strand { edge, from, to }).copied().unwrap_or(0.0)
	}

	pub fn len(&self) -> usize {
		self.offsets.len()
	}
}
