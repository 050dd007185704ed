use leptos::prelude::*;
use leptos::task::spawn_local;
use log::info;

use crate::components::case_graph::config::{LayoutMode, LoadingSettings, Settings};
use crate::components::case_graph::data::fetch;
use crate::components::case_graph::geometry::Point;
use crate::components::case_graph::selection::SelectionEvent;
use crate::components::case_graph::state::GraphCommand;
use crate::components::case_graph::types::{CaseGraph, Dataset, Document, Edge, Step, Tier};
use crate::components::case_graph::{CaseGraphCanvas, GraphBus};

/// One row of the step list; clicking it toggles the step.
#[component]
fn StepRow(step: Step, bus: GraphBus) -> impl IntoView {
	let id = step.id;
	let selected = move || bus.selection.with(|s| s.selected_step() == Some(id));

	view! {
		<li
			class:selected=selected
			on:click=move |_| bus.send(GraphCommand::Select(SelectionEvent::SelectStep(id)))
		>
			<span class="step-date">{step.date}</span>
			<span class="step-description">{step.description}</span>
		</li>
	}
}

/// Steps in id order, under a header for each run of a phase.
#[component]
fn StepList(graph: Memo<Option<CaseGraph>>, bus: GraphBus) -> impl IntoView {
	let groups = move || -> Vec<(Option<String>, Vec<Step>)> {
		graph.with(|g| {
			g.as_ref()
				.map(|g| {
					g.phase_groups()
						.into_iter()
						.map(|(phase, run)| (phase.map(str::to_owned), run.to_vec()))
						.collect()
				})
				.unwrap_or_default()
		})
	};

	view! {
		<div class="step-list">
			{move || {
				groups()
					.into_iter()
					.map(|(phase, steps)| {
						view! {
							<section class="step-phase">
								<h3>{phase.unwrap_or_else(|| "Unphased".into())}</h3>
								<ol>
									{steps
										.into_iter()
										.map(|step| view! { <StepRow step=step bus=bus /> })
										.collect_view()}
								</ol>
							</section>
						}
					})
					.collect_view()
			}}
		</div>
	}
}

/// Checkboxes narrowing the selected step to some of its edges.
#[component]
fn EdgeFilter(graph: Memo<Option<CaseGraph>>, bus: GraphBus) -> impl IntoView {
	let edges = move || -> Vec<Edge> {
		let Some(step) = bus.selection.with(|s| s.selected_step()) else {
			return Vec::new();
		};
		graph.with(|g| {
			g.as_ref()
				.map(|g| g.edges_for_step(step).cloned().collect())
				.unwrap_or_default()
		})
	};

	view! {
		<ul class="edge-filter">
			{move || {
				edges()
					.into_iter()
					.map(|edge| {
						let id = edge.id;
						let checked = move || bus.selection.with(|s| s.selected_edges().contains(&id));
						view! {
							<li class:violated=edge.violated class:unused=edge.unused>
								<label>
									<input
										type="checkbox"
										prop:checked=checked
										on:change=move |_| {
											bus.send(GraphCommand::Select(SelectionEvent::ToggleEdge(id)))
										}
									/>
									{edge.description}
								</label>
							</li>
						}
					})
					.collect_view()
			}}
		</ul>
	}
}

/// Source documents cited by the selected step.
#[component]
fn StepDocuments(graph: Memo<Option<CaseGraph>>, bus: GraphBus) -> impl IntoView {
	let documents = move || -> Vec<Document> {
		let Some(step) = bus.selection.with(|s| s.selected_step()) else {
			return Vec::new();
		};
		graph.with(|g| {
			g.as_ref()
				.map(|g| g.documents_for_step(step).into_iter().cloned().collect())
				.unwrap_or_default()
		})
	};

	view! {
		<ul class="step-documents">
			{move || {
				documents()
					.into_iter()
					.map(|doc| {
						view! {
							<li title=doc.description>
								<span class="doc-tldr">{doc.tldr}</span>
								<span class="doc-meta">{format!("{}, {}", doc.author, doc.date)}</span>
							</li>
						}
					})
					.collect_view()
			}}
		</ul>
	}
}

/// Layout switch, physics centring, view reset and per-tier visibility.
#[component]
fn GraphControls(bus: GraphBus) -> impl IntoView {
	let tier_toggle = move |tier: Tier, label: &'static str| {
		view! {
			<label>
				<input
					type="checkbox"
					prop:checked=true
					on:change=move |ev| bus.send(GraphCommand::SetTierVisible(tier, event_target_checked(&ev)))
				/>
				{label}
			</label>
		}
	};

	view! {
		<div class="graph-controls">
			<button on:click=move |_| bus.send(GraphCommand::SetLayout(LayoutMode::Hierarchical))>"Rings"</button>
			<button on:click=move |_| bus.send(GraphCommand::SetLayout(LayoutMode::Physics))>"Physics"</button>
			<button on:click=move |_| bus.send(GraphCommand::ToggleCentering)>"Centering"</button>
			<button on:click=move |_| {
				bus.send(GraphCommand::SetPan(Point::default()));
				bus.send(GraphCommand::SetZoom(1.0));
			}>"Reset view"</button>
			{tier_toggle(Tier::Root, "Organisations")}
			{tier_toggle(Tier::Parent, "Groups")}
			{tier_toggle(Tier::Child, "Individuals")}
		</div>
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let settings = RwSignal::new(Settings::default());
	let data = RwSignal::new(None::<Dataset>);
	let bus = GraphBus::new();
	let graph = Memo::new(move |_| data.get().map(CaseGraph::new));

	spawn_local(async move {
		let loaded = fetch::load_settings(&LoadingSettings::default().base_url).await;
		let dataset = fetch::load_case_study(&loaded.loading).await;
		info!("Case study loaded: {} nodes", dataset.nodes.len());
		settings.set(loaded);
		data.set(Some(dataset));
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<CaseGraphCanvas data=data settings=settings bus=bus fullscreen=true />
				<div class="graph-overlay">
					<h1>"Case Study"</h1>
					<p class="subtitle">
						"Pick a step to follow its interactions. Arrow keys step, Esc clears. Drag nodes, scroll to zoom."
					</p>
					<GraphControls bus=bus />
					<StepList graph=graph bus=bus />
					<EdgeFilter graph=graph bus=bus />
					<StepDocuments graph=graph bus=bus />
				</div>
			</div>
		</ErrorBoundary>
	}
}
