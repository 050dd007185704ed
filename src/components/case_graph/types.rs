use std::collections::HashMap;

pub type NodeId = u32;
pub type EdgeId = u32;
pub type StepId = u32;
pub type DocumentId = u32;

/// Depth of a node in the root → parent → child forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
	Root,
	Parent,
	Child,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: NodeId,
	pub name: String,
	pub description: Option<String>,
	pub parent_id: Option<NodeId>,
	pub grandparent_id: Option<NodeId>,
}

impl Node {
	/// A node without a parent is a root even when a grandparent is recorded.
	pub fn tier(&self) -> Tier {
		match (self.parent_id, self.grandparent_id) {
			(None, _) => Tier::Root,
			(Some(_), None) => Tier::Parent,
			(Some(_), Some(_)) => Tier::Child,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
	pub id: EdgeId,
	pub from_nodes: Vec<NodeId>,
	pub to_nodes: Vec<NodeId>,
	pub description: String,
	pub step_id: StepId,
	pub bidirectional: bool,
	pub unused: bool,
	pub violated: bool,
}

impl Edge {
	/// Cartesian product of `from_nodes × to_nodes`, in declaration order.
	pub fn endpoint_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
		self.from_nodes
			.iter()
			.flat_map(move |&from| self.to_nodes.iter().map(move |&to| (from, to)))
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Step {
	pub id: StepId,
	pub description: String,
	pub date: String,
	pub phase: Option<String>,
	pub document_ids: Vec<DocumentId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
	pub id: DocumentId,
	pub tldr: String,
	pub description: String,
	pub author: String,
	pub date: String,
}

/// Validated records exactly as loaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
	pub nodes: Vec<Node>,
	pub edges: Vec<Edge>,
	pub steps: Vec<Step>,
	pub documents: Vec<Document>,
}

impl Dataset {
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

/// Immutable entity graph with id lookups. Nodes and edges keep
/// declaration order; steps are ordered by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaseGraph {
	data: Dataset,
	node_index: HashMap<NodeId, usize>,
	edge_index: HashMap<EdgeId, usize>,
	step_index: HashMap<StepId, usize>,
}

impl CaseGraph {
	pub fn new(mut data: Dataset) -> Self {
		data.steps.sort_by_key(|s| s.id);
		let node_index = data.nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
		let edge_index = data.edges.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
		let step_index = data.steps.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
		Self {
			data,
			node_index,
			edge_index,
			step_index,
		}
	}

	pub fn nodes(&self) -> &[Node] {
		&self.data.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.data.edges
	}

	pub fn steps(&self) -> &[Step] {
		&self.data.steps
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.node_index.get(&id).map(|&i| &self.data.nodes[i])
	}

	pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
		self.edge_index.get(&id).map(|&i| &self.data.edges[i])
	}

	pub fn step(&self, id: StepId) -> Option<&Step> {
		self.step_index.get(&id).map(|&i| &self.data.steps[i])
	}

	pub fn edges_for_step(&self, step: StepId) -> impl Iterator<Item = &Edge> + '_ {
		self.data.edges.iter().filter(move |e| e.step_id == step)
	}

	/// Runs of consecutive steps sharing a phase, in step order.
	pub fn phase_groups(&self) -> Vec<(Option<&str>, &[Step])> {
		self.data
			.steps
			.chunk_by(|a, b| a.phase == b.phase)
			.map(|run| (run[0].phase.as_deref(), run))
			.collect()
	}

	/// The step before (`forward == false`) or after `current`, by id.
	pub fn adjacent_step(&self, current: StepId, forward: bool) -> Option<StepId> {
		let i = *self.step_index.get(&current)?;
		let j = if forward { i.checked_add(1)? } else { i.checked_sub(1)? };
		self.data.steps.get(j).map(|s| s.id)
	}

	pub fn documents_for_step(&self, step: StepId) -> Vec<&Document> {
		let Some(step) = self.step(step) else {
			return Vec::new();
		};
		step.document_ids
			.iter()
			.filter_map(|id| self.data.documents.iter().find(|d| d.id == *id))
			.collect()
	}
}
