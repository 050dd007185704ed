//! Loading boundary: JSON wire records → validated [`Dataset`].

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::config::LoadingSettings;
use super::types::{Dataset, Document, Edge, Node, NodeId, Step, StepId};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
	#[error("HTTP {status} while fetching {url}")]
	Http { url: String, status: u16 },

	#[error("request for {url} failed: {message}")]
	Network { url: String, message: String },

	#[error("response body of {url} is not text")]
	NotText { url: String },
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RecordError {
	#[error("interaction {0} has no source nodes")]
	NoSources(u32),

	#[error("interaction {0} has no target nodes")]
	NoTargets(u32),
}

/// Accepts `0|1`, booleans, and `null`/absent (false).
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Flag {
		Bool(bool),
		Int(i64),
	}
	Ok(match Option::<Flag>::deserialize(deserializer)? {
		Some(Flag::Bool(b)) => b,
		Some(Flag::Int(n)) => n != 0,
		None => false,
	})
}

#[derive(Deserialize)]
struct NodeRecord {
	node_id: NodeId,
	node_name: String,
	#[serde(default)]
	node_description: Option<String>,
	#[serde(default)]
	node_parent_id: Option<NodeId>,
	#[serde(default)]
	node_grandparent_id: Option<NodeId>,
}

impl From<NodeRecord> for Node {
	fn from(r: NodeRecord) -> Self {
		Node {
			id: r.node_id,
			name: r.node_name,
			description: r.node_description.filter(|d| !d.trim().is_empty()),
			parent_id: r.node_parent_id,
			grandparent_id: r.node_grandparent_id,
		}
	}
}

#[derive(Deserialize)]
struct EdgeRecord {
	interaction_id: u32,
	from_nodes: Vec<NodeId>,
	to_nodes: Vec<NodeId>,
	#[serde(default)]
	interaction_description: String,
	step_id: StepId,
	#[serde(default, deserialize_with = "flag")]
	bidirectional: bool,
	#[serde(default, deserialize_with = "flag")]
	unused: bool,
	#[serde(default, deserialize_with = "flag")]
	violated: bool,
}

/// Drops repeated ids, keeping first occurrences in order.
fn distinct_endpoints(edge: u32, field: &str, ids: Vec<NodeId>) -> Vec<NodeId> {
	let mut seen = HashSet::new();
	let distinct: Vec<NodeId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
	if distinct.len() != ids.len() {
		warn!("edges.json: interaction {edge} repeats ids in {field}; keeping {distinct:?}");
	}
	distinct
}

impl TryFrom<EdgeRecord> for Edge {
	type Error = RecordError;

	fn try_from(r: EdgeRecord) -> Result<Self, Self::Error> {
		if r.from_nodes.is_empty() {
			return Err(RecordError::NoSources(r.interaction_id));
		}
		if r.to_nodes.is_empty() {
			return Err(RecordError::NoTargets(r.interaction_id));
		}
		Ok(Edge {
			id: r.interaction_id,
			from_nodes: distinct_endpoints(r.interaction_id, "from_nodes", r.from_nodes),
			to_nodes: distinct_endpoints(r.interaction_id, "to_nodes", r.to_nodes),
			description: r.interaction_description,
			step_id: r.step_id,
			bidirectional: r.bidirectional,
			unused: r.unused,
			violated: r.violated,
		})
	}
}

#[derive(Deserialize)]
struct StepRecord {
	step_id: StepId,
	#[serde(default)]
	step_description: String,
	#[serde(default)]
	date: String,
	#[serde(default)]
	phase: Option<String>,
	#[serde(default)]
	document_ids: Vec<u32>,
}

impl From<StepRecord> for Step {
	fn from(r: StepRecord) -> Self {
		Step {
			id: r.step_id,
			description: r.step_description,
			date: r.date,
			phase: r.phase,
			document_ids: r.document_ids,
		}
	}
}

#[derive(Deserialize)]
struct DocumentRecord {
	document_id: u32,
	#[serde(default)]
	tldr: String,
	#[serde(default)]
	document_description: String,
	#[serde(default)]
	author: String,
	#[serde(default)]
	date: String,
}

impl From<DocumentRecord> for Document {
	fn from(r: DocumentRecord) -> Self {
		Document {
			id: r.document_id,
			tldr: r.tldr,
			description: r.document_description,
			author: r.author,
			date: r.date,
		}
	}
}

/// Parses a JSON array leniently: a malformed or non-array file is empty,
/// and each record that fails to deserialize is skipped.
fn parse_records<R: DeserializeOwned>(label: &str, text: &str) -> Vec<R> {
	let values = match serde_json::from_str::<serde_json::Value>(text) {
		Ok(serde_json::Value::Array(values)) => values,
		Ok(_) => {
			warn!("{label}: expected a JSON array; treating as empty");
			return Vec::new();
		}
		Err(err) => {
			warn!("{label}: malformed JSON ({err}); treating as empty");
			return Vec::new();
		}
	};
	values
		.into_iter()
		.enumerate()
		.filter_map(|(i, value)| match serde_json::from_value(value) {
			Ok(record) => Some(record),
			Err(err) => {
				warn!("{label}: skipping record #{i}: {err}");
				None
			}
		})
		.collect()
}

/// Raw file contents for one case study; `None` means the file is absent.
#[derive(Clone, Debug, Default)]
pub struct RawFiles {
	pub nodes: Option<String>,
	pub edges: Option<String>,
	pub steps: Option<String>,
	pub documents: Option<String>,
}

pub fn parse_dataset(files: &RawFiles) -> Dataset {
	let text = |t: &Option<String>| t.as_deref().unwrap_or("[]").to_owned();

	let mut seen = HashSet::new();
	let nodes: Vec<Node> = parse_records::<NodeRecord>("nodes.json", &text(&files.nodes))
		.into_iter()
		.map(Node::from)
		.filter(|n| {
			let fresh = seen.insert(n.id);
			if !fresh {
				warn!("nodes.json: duplicate node id {}; keeping the first", n.id);
			}
			fresh
		})
		.collect();

	let edges = parse_records::<EdgeRecord>("edges.json", &text(&files.edges))
		.into_iter()
		.filter_map(|r| match Edge::try_from(r) {
			Ok(edge) => Some(edge),
			Err(err) => {
				warn!("edges.json: {err}; skipped");
				None
			}
		})
		.collect();

	let steps = parse_records::<StepRecord>("steps.json", &text(&files.steps))
		.into_iter()
		.map(Step::from)
		.collect();

	let documents = parse_records::<DocumentRecord>("documents.json", &text(&files.documents))
		.into_iter()
		.map(Document::from)
		.collect();

	let dataset = Dataset {
		nodes,
		edges,
		steps,
		documents,
	};
	info!(
		"Loaded {} nodes, {} edges, {} steps, {} documents",
		dataset.nodes.len(),
		dataset.edges.len(),
		dataset.steps.len(),
		dataset.documents.len()
	);
	validate(&dataset).log();
	dataset
}

/// Non-fatal inconsistencies found after loading.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
	pub missing_nodes: Vec<NodeId>,
	pub missing_steps: Vec<StepId>,
	/// Children whose recorded grandparent is not their parent's parent.
	pub inconsistent_grandparents: Vec<NodeId>,
}

impl ValidationReport {
	pub fn is_clean(&self) -> bool {
		self.missing_nodes.is_empty()
			&& self.missing_steps.is_empty()
			&& self.inconsistent_grandparents.is_empty()
	}

	fn log(&self) {
		if !self.missing_nodes.is_empty() {
			warn!("Edges reference missing nodes: {:?}", self.missing_nodes);
		}
		if !self.missing_steps.is_empty() {
			warn!("Edges reference missing steps: {:?}", self.missing_steps);
		}
		if !self.inconsistent_grandparents.is_empty() {
			warn!(
				"Nodes whose grandparent is not their parent's parent: {:?}",
				self.inconsistent_grandparents
			);
		}
		if self.is_clean() {
			debug!("Data validation passed");
		}
	}
}

pub fn validate(data: &Dataset) -> ValidationReport {
	let node_ids: HashSet<NodeId> = data.nodes.iter().map(|n| n.id).collect();
	let step_ids: HashSet<StepId> = data.steps.iter().map(|s| s.id).collect();
	let mut report = ValidationReport::default();

	for edge in &data.edges {
		for id in edge.from_nodes.iter().chain(&edge.to_nodes) {
			if !node_ids.contains(id) && !report.missing_nodes.contains(id) {
				report.missing_nodes.push(*id);
			}
		}
		if !step_ids.contains(&edge.step_id) && !report.missing_steps.contains(&edge.step_id) {
			report.missing_steps.push(edge.step_id);
		}
	}

	for node in &data.nodes {
		let (Some(parent), Some(grandparent)) = (node.parent_id, node.grandparent_id) else {
			continue;
		};
		let parents_parent = data.nodes.iter().find(|n| n.id == parent).and_then(|p| p.parent_id);
		if parents_parent != Some(grandparent) {
			report.inconsistent_grandparents.push(node.id);
		}
	}
	report
}

/// A load that produced no nodes is replaced by the bundled case study,
/// unless `use_fallback` is off.
pub fn with_fallback(dataset: Dataset, settings: &LoadingSettings) -> Dataset {
	if dataset.is_empty() && settings.use_fallback {
		warn!("No nodes loaded from {}; using the bundled dataset", settings.base_url);
		return bundled_dataset();
	}
	dataset
}

/// The Bell Labs case study shipped with the app.
pub fn bundled_dataset() -> Dataset {
	parse_dataset(&RawFiles {
		nodes: Some(include_str!("../../../data/bell/nodes.json").into()),
		edges: Some(include_str!("../../../data/bell/edges.json").into()),
		steps: Some(include_str!("../../../data/bell/steps.json").into()),
		documents: None,
	})
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
}

impl RetryPolicy {
	pub fn from_settings(settings: &LoadingSettings) -> Self {
		Self {
			max_attempts: settings.max_attempts.max(1),
			base_delay: settings.base_delay(),
		}
	}

	/// Wait before `attempt` (1-based); doubles after every failure.
	pub fn delay_before(&self, attempt: u32) -> Duration {
		match attempt {
			0 | 1 => Duration::ZERO,
			n => self.base_delay.saturating_mul(1 << (n - 2).min(16)),
		}
	}
}

/// Drives `attempt` until it succeeds or the policy is exhausted, awaiting
/// `sleep` between tries. Returns the last error.
pub async fn retry<T, E, F, Fut, S, SFut>(
	policy: RetryPolicy,
	label: &str,
	mut attempt: F,
	mut sleep: S,
) -> Result<T, E>
where
	E: Display,
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, E>>,
	S: FnMut(Duration) -> SFut,
	SFut: Future<Output = ()>,
{
	let mut n = 1;
	loop {
		match attempt(n).await {
			Ok(value) => {
				debug!("{label}: loaded on attempt {n}");
				return Ok(value);
			}
			Err(err) if n < policy.max_attempts => {
				let wait = policy.delay_before(n + 1);
				warn!("{label}: attempt {n} failed ({err}); retrying in {wait:?}");
				sleep(wait).await;
				n += 1;
			}
			Err(err) => {
				warn!("{label}: giving up after {n} attempts: {err}");
				return Err(err);
			}
		}
	}
}

/// Browser fetch, with retries, of a case study's files.
pub mod fetch {
	use std::time::Duration;

	use log::info;
	use wasm_bindgen::{JsCast, JsValue};
	use wasm_bindgen_futures::JsFuture;
	use web_sys::Response;

	use super::super::config::{LoadingSettings, Settings};
	use super::super::types::Dataset;
	use super::{LoadError, RawFiles, RetryPolicy, parse_dataset, retry, with_fallback};

	fn js_message(value: JsValue) -> String {
		value.as_string().unwrap_or_else(|| format!("{value:?}"))
	}

	pub async fn fetch_text(url: &str) -> Result<String, LoadError> {
		let network = |value: JsValue| LoadError::Network {
			url: url.to_string(),
			message: js_message(value),
		};
		let Some(window) = web_sys::window() else {
			return Err(LoadError::Network {
				url: url.to_string(),
				message: "no window".into(),
			});
		};
		let response: Response = JsFuture::from(window.fetch_with_str(url))
			.await
			.map_err(network)?
			.dyn_into()
			.map_err(network)?;
		if !response.ok() {
			return Err(LoadError::Http {
				url: url.to_string(),
				status: response.status(),
			});
		}
		let body = JsFuture::from(response.text().map_err(network)?)
			.await
			.map_err(network)?;
		body.as_string().ok_or_else(|| LoadError::NotText { url: url.to_string() })
	}

	pub async fn sleep(duration: Duration) {
		let ms = duration.as_millis().min(i32::MAX as u128) as i32;
		let promise = js_sys::Promise::new(&mut |resolve, _| {
			let scheduled = web_sys::window().map(|w| {
				w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
			});
			if !matches!(scheduled, Some(Ok(_))) {
				let _ = resolve.call0(&JsValue::NULL);
			}
		});
		let _ = JsFuture::from(promise).await;
	}

	async fn fetch_file(policy: RetryPolicy, url: String) -> Option<String> {
		retry(policy, &url, |_| fetch_text(&url), sleep).await.ok()
	}

	/// Single attempt; absent or malformed settings mean defaults.
	pub async fn load_settings(base_url: &str) -> Settings {
		match fetch_text(&format!("{base_url}/settings.json")).await {
			Ok(text) => Settings::from_json_str(&text),
			Err(err) => {
				info!("No settings loaded ({err}); using defaults");
				Settings::default()
			}
		}
	}

	pub async fn load_case_study(settings: &LoadingSettings) -> Dataset {
		let policy = RetryPolicy::from_settings(settings);
		let base = settings.base_url.trim_end_matches('/');
		let files = RawFiles {
			nodes: fetch_file(policy, format!("{base}/nodes.json")).await,
			edges: fetch_file(policy, format!("{base}/edges.json")).await,
			steps: fetch_file(policy, format!("{base}/steps.json")).await,
			documents: fetch_file(RetryPolicy { max_attempts: 1, ..policy }, format!("{base}/documents.json")).await,
		};
		with_fallback(parse_dataset(&files), settings)
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use futures::executor::block_on;
	use rstest::rstest;

	use super::*;

	fn files(nodes: &str, edges: &str, steps: &str) -> RawFiles {
		RawFiles {
			nodes: Some(nodes.into()),
			edges: Some(edges.into()),
			steps: Some(steps.into()),
			documents: None,
		}
	}

	#[rstest]
	#[case::not_json("{oops")]
	#[case::not_an_array(r#"{"node_id": 1}"#)]
	#[case::empty("[]")]
	fn malformed_files_are_empty(#[case] text: &str) {
		let data = parse_dataset(&files(text, text, text));
		assert_eq!(data, Dataset::default());
	}

	#[test]
	fn bad_records_are_skipped_not_fatal() {
		let data = parse_dataset(&files(
			r#"[{"node_id": 1, "node_name": "A"}, {"node_name": "no id"}, {"node_id": 1, "node_name": "dup"}]"#,
			r#"[
				{"interaction_id": 0, "from_nodes": [1], "to_nodes": [1], "step_id": 0, "violated": true},
				{"interaction_id": 1, "from_nodes": [], "to_nodes": [1], "step_id": 0},
				{"interaction_id": 2, "from_nodes": [1], "to_nodes": [9], "step_id": 0, "unused": 1, "bidirectional": null}
			]"#,
			r#"[{"step_id": 0, "step_description": "s", "date": "1945", "phase": null}]"#,
		));
		assert_eq!(data.nodes.len(), 1);
		assert_eq!(data.nodes[0].name, "A");
		assert_eq!(data.edges.iter().map(|e| e.id).collect::<Vec<_>>(), vec![0, 2]);
		assert!(data.edges[0].violated && data.edges[0].from_nodes == data.edges[0].to_nodes);
		assert!(data.edges[1].unused && !data.edges[1].bidirectional);
		assert_eq!(data.steps[0].phase, None);
	}

	#[test]
	fn repeated_endpoints_collapse() {
		let data = parse_dataset(&files(
			"[]",
			r#"[{"interaction_id": 3, "from_nodes": [1, 1, 2], "to_nodes": [4, 4], "step_id": 0}]"#,
			"[]",
		));
		assert_eq!(data.edges[0].from_nodes, vec![1, 2]);
		assert_eq!(data.edges[0].to_nodes, vec![4]);
	}

	#[rstest]
	#[case::fallback_on(true, 25)]
	#[case::fallback_off(false, 0)]
	fn empty_loads_fall_back_to_the_bundled_case(#[case] use_fallback: bool, #[case] nodes: usize) {
		let settings = LoadingSettings {
			use_fallback,
			..LoadingSettings::default()
		};
		assert_eq!(with_fallback(Dataset::default(), &settings).nodes.len(), nodes);
	}

	#[test]
	fn loaded_data_is_kept_over_the_fallback() {
		let loaded = parse_dataset(&files(r#"[{"node_id": 7, "node_name": "solo"}]"#, "[]", "[]"));
		let kept = with_fallback(loaded.clone(), &LoadingSettings::default());
		assert_eq!(kept, loaded);
	}

	#[test]
	fn validation_reports_dangling_references() {
		let data = parse_dataset(&files(
			r#"[
				{"node_id": 0, "node_name": "root", "node_parent_id": null},
				{"node_id": 1, "node_name": "group", "node_parent_id": 0},
				{"node_id": 2, "node_name": "ok", "node_parent_id": 1, "node_grandparent_id": 0},
				{"node_id": 3, "node_name": "bad", "node_parent_id": 1, "node_grandparent_id": 2}
			]"#,
			r#"[{"interaction_id": 5, "from_nodes": [0, 7], "to_nodes": [1], "step_id": 4}]"#,
			"[]",
		));
		let report = validate(&data);
		assert_eq!(report.missing_nodes, vec![7]);
		assert_eq!(report.missing_steps, vec![4]);
		assert_eq!(report.inconsistent_grandparents, vec![3]);
		assert!(!report.is_clean());
	}

	#[test]
	fn steps_cite_documents_in_their_order() {
		let data = parse_dataset(&RawFiles {
			documents: Some(
				r#"[
					{"document_id": 1, "tldr": "memo", "author": "Kelly", "date": "1945"},
					{"document_id": 2, "tldr": "notebook"}
				]"#
				.into(),
			),
			..files("[]", "[]", r#"[{"step_id": 0, "document_ids": [2, 9, 1]}, {"step_id": 1}]"#)
		});
		let graph = crate::components::case_graph::types::CaseGraph::new(data);
		let cited: Vec<_> = graph.documents_for_step(0).iter().map(|d| d.tldr.as_str()).collect();
		assert_eq!(cited, vec!["notebook", "memo"]);
		assert!(graph.documents_for_step(1).is_empty());
		assert!(graph.documents_for_step(7).is_empty());
	}

	#[test]
	fn bundled_dataset_is_consistent() {
		let data = bundled_dataset();
		assert_eq!(data.nodes.len(), 25);
		assert_eq!(data.steps.len(), 13);
		assert!(validate(&data).missing_nodes.is_empty());
	}

	#[test]
	fn reloading_reproduces_the_same_graph() {
		assert_eq!(bundled_dataset(), bundled_dataset());
	}

	#[test]
	fn backoff_doubles() {
		let policy = RetryPolicy {
			max_attempts: 4,
			base_delay: Duration::from_millis(1000),
		};
		let delays: Vec<_> = (1..=4).map(|n| policy.delay_before(n).as_millis()).collect();
		assert_eq!(delays, vec![0, 1000, 2000, 4000]);
	}

	#[test]
	fn retry_gives_up_after_max_attempts() {
		let slept = RefCell::new(Vec::new());
		let policy = RetryPolicy {
			max_attempts: 3,
			base_delay: Duration::from_millis(10),
		};
		let result: Result<(), String> = block_on(retry(
			policy,
			"test",
			|n| async move { Err(format!("fail {n}")) },
			|d| {
				slept.borrow_mut().push(d);
				async {}
			},
		));
		assert_eq!(result, Err("fail 3".to_string()));
		assert_eq!(
			*slept.borrow(),
			vec![Duration::from_millis(10), Duration::from_millis(20)]
		);
	}

	#[test]
	fn retry_stops_on_success() {
		let calls = RefCell::new(0);
		let result = block_on(retry(
			RetryPolicy {
				max_attempts: 3,
				base_delay: Duration::ZERO,
			},
			"test",
			|n| {
				*calls.borrow_mut() += 1;
				async move { if n == 2 { Ok(n) } else { Err("nope") } }
			},
			|_| async {},
		));
		assert_eq!(result, Ok(2));
		assert_eq!(*calls.borrow(), 2);
	}
}
