use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::error;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

use super::config::Settings;
use super::render;
use super::selection::{SelectionEvent, SelectionState};
use super::state::{GraphCommand, VisualizationState};
use super::types::Dataset;

/// Channel between the canvas and the rest of the page.
///
/// Page controls queue [`GraphCommand`]s, which the canvas applies at the
/// start of its next frame; the canvas mirrors its selection back into
/// `selection` whenever it changes.
#[derive(Clone, Copy)]
pub struct GraphBus {
	inbox: StoredValue<Vec<GraphCommand>>,
	pub selection: RwSignal<SelectionState>,
}

impl GraphBus {
	pub fn new() -> Self {
		Self {
			inbox: StoredValue::new(Vec::new()),
			selection: RwSignal::new(SelectionState::default()),
		}
	}

	pub fn send(&self, command: GraphCommand) {
		self.inbox.update_value(|inbox| inbox.push(command));
	}

	fn drain(&self) -> Vec<GraphCommand> {
		self.inbox.try_update_value(std::mem::take).unwrap_or_default()
	}

	fn publish(&self, selection: &SelectionState) {
		if self.selection.with_untracked(|current| current != selection) {
			self.selection.set(selection.clone());
		}
	}
}

impl Default for GraphBus {
	fn default() -> Self {
		Self::new()
	}
}

type Callback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((window.inner_width().ok()?.as_f64()?, window.inner_height().ok()?.as_f64()?))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok()??.dyn_into().ok()
}

fn request_frame(cb: &Callback) {
	if let (Some(window), Some(cb)) = (web_sys::window(), cb.borrow().as_ref()) {
		let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
	}
}

/// Case-study graph on a canvas. `data` is `None` while loading.
#[component]
pub fn CaseGraphCanvas(
	#[prop(into)] data: Signal<Option<Dataset>>,
	#[prop(into)] settings: Signal<Settings>,
	bus: GraphBus,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<VisualizationState>>> = Rc::new(RefCell::new(None));
	let animate: Callback = Rc::new(RefCell::new(None));
	let resize_cb: Callback = Rc::new(RefCell::new(None));
	let keydown_cb: Rc<RefCell<Option<Closure<dyn FnMut(KeyboardEvent)>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init) = (state.clone(), animate.clone());

	Effect::new(move |_| {
		let (dataset, settings_now) = (data.get(), settings.get());
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = match window_size(&window).filter(|_| fullscreen) {
			Some(size) => size,
			None => (
				width.unwrap_or_else(|| canvas.parent_element().map(|p| p.client_width() as f64).unwrap_or(800.0)),
				height.unwrap_or_else(|| canvas.parent_element().map(|p| p.client_height() as f64).unwrap_or(600.0)),
			),
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		*state_init.borrow_mut() = dataset.map(|d| VisualizationState::new(d, settings_now, w, h));
		bus.selection.set(SelectionState::default());

		// Listeners and the frame loop outlive dataset reloads.
		if animate_init.borrow().is_some() {
			return;
		}
		let Some(ctx) = context_2d(&canvas) else {
			error!("Canvas has no 2d context");
			return;
		};

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb.borrow() {
				let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		*keydown_cb.borrow_mut() = Some(Closure::new(move |ev: KeyboardEvent| {
			let step = settings.with_untracked(|s| s.camera.key_step);
			let command = match ev.key().as_str() {
				"ArrowRight" | "ArrowDown" => GraphCommand::StepForward,
				"ArrowLeft" | "ArrowUp" => GraphCommand::StepBack,
				"Escape" => GraphCommand::Select(SelectionEvent::ClearStep),
				"+" | "=" => GraphCommand::ZoomBy(step),
				"-" | "_" => GraphCommand::ZoomBy(1.0 / step),
				"c" => GraphCommand::ToggleCentering,
				_ => return,
			};
			ev.prevent_default();
			bus.send(command);
		}));
		if let Some(ref cb) = *keydown_cb.borrow() {
			let _ = window.add_event_listener_with_callback("keydown", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let commands = bus.drain();
			match *state_anim.borrow_mut() {
				Some(ref mut s) => {
					for command in commands {
						s.dispatch(command);
					}
					s.tick();
					bus.publish(s.selection());
					if s.graph().nodes().is_empty() {
						render::render_placeholder(&ctx, s.width, s.height, "No data");
					} else {
						render::render(s, &ctx);
					}
				}
				None => {
					let (cw, ch) = (canvas.width() as f64, canvas.height() as f64);
					render::render_placeholder(&ctx, cw, ch, "Loading data...");
				}
			}
			request_frame(&animate_inner);
		}));
		request_frame(&animate_init);
	});

	let pointer = move |ev: &MouseEvent| {
		let canvas = canvas_ref.get_untracked()?;
		let rect = canvas.get_bounding_client_rect();
		Some((ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top()))
	};
	let set_cursor = move |cursor: &str| {
		if let Some(canvas) = canvas_ref.get_untracked() {
			let _ = HtmlElement::style(&canvas).set_property("cursor", cursor);
		}
	};

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(&ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(&ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(x, y);
			let hovering = s.selection().hovered_node().is_some() || s.selection().hovered_edge().is_some();
			set_cursor(if s.is_dragging() {
				"grabbing"
			} else if hovering {
				"pointer"
			} else {
				"grab"
			});
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(&ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.pointer_up(x, y);
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let mouse: &MouseEvent = &ev;
		let Some((x, y)) = pointer(mouse) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let step = s.settings().camera.wheel_step;
			let factor = if ev.delta_y() < 0.0 { step } else { 1.0 / step };
			s.zoom_at(x, y, factor);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="case-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
