use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::config::Container;
use super::geometry::{
	Point, SelfLoop, arrow_head, circle_entry, curve_control, dashed_curve, dashed_ring, dashed_segments,
};
use super::layout::{Layout, Positions};
use super::selection::{EdgeRelevance, EdgeStyle, NodeRelevance, edge_style, node_style};
use super::state::VisualizationState;
use super::types::{Edge, NodeId, Tier};

const BACKGROUND: &str = "#1e1e24";
const TEXT: (u8, u8, u8) = (242, 242, 242);
const CHILD: (u8, u8, u8) = (93, 192, 217);
const PARENT: (u8, u8, u8) = (120, 180, 120);
const ROOT: (u8, u8, u8) = (150, 150, 150);
const HIGHLIGHTED: (u8, u8, u8) = (255, 165, 0);
const NODE_HOVER: (u8, u8, u8) = (255, 200, 100);
const EDGE_HOVER: (u8, u8, u8) = (255, 255, 100);
const VIOLATED: (u8, u8, u8) = (255, 100, 100);

/// Half the side of the square drawn for a node.
const NODE_RADIUS: f64 = 6.0;
const LOOP_RADIUS: f64 = 25.0;
const ARROW_SIZE: f64 = 8.0;
const BROKEN_SEGMENTS: usize = 8;
const BROKEN_CURVE_SEGMENTS: usize = 20;

fn rgba((r, g, b): (u8, u8, u8), alpha: u8) -> String {
	format!("rgba({r}, {g}, {b}, {})", alpha as f64 / 255.0)
}

fn tier_color(tier: Tier) -> (u8, u8, u8) {
	match tier {
		Tier::Root => ROOT,
		Tier::Parent => PARENT,
		Tier::Child => CHILD,
	}
}

/// Shown until the case study is loaded, or when it has no nodes.
pub fn render_placeholder(ctx: &CanvasRenderingContext2d, width: f64, height: f64, message: &str) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, width, height);
	ctx.set_fill_style_str(&rgba(TEXT, 200));
	ctx.set_font("16px sans-serif");
	ctx.set_text_align("center");
	let _ = ctx.fill_text(message, width / 2.0, height / 2.0);
	ctx.set_text_align("start");
}

pub fn render(state: &VisualizationState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);

	let (camera, origin) = (state.camera(), state.origin());
	ctx.save();
	let _ = ctx.translate(origin.x, origin.y);
	let _ = ctx.scale(camera.zoom, camera.zoom);
	let _ = ctx.translate(camera.pan.x, camera.pan.y);
	let positions: Positions = state
		.layout()
		.positions()
		.into_iter()
		.filter(|(id, _)| state.is_visible(*id))
		.collect();
	draw_container(state, ctx);
	draw_edges(state, &positions, ctx);
	draw_nodes(state, &positions, ctx);
	ctx.restore();

	draw_tooltip(state, ctx);
}

fn draw_edges(state: &VisualizationState, positions: &Positions, ctx: &CanvasRenderingContext2d) {
	for edge in state.graph().edges() {
		let style = edge_style(state.selection(), edge);
		let color = if style.hovered {
			EDGE_HOVER
		} else if edge.violated && style.relevance == EdgeRelevance::Active {
			VIOLATED
		} else if style.relevance == EdgeRelevance::Active {
			PARENT
		} else {
			ROOT
		};
		let stroke = rgba(color, style.alpha);
		ctx.set_stroke_style_str(&stroke);
		ctx.set_fill_style_str(&stroke);
		ctx.set_line_width(style.width);
		for (from, to) in edge.endpoint_pairs() {
			let (Some(&a), Some(&b)) = (positions.get(&from), positions.get(&to)) else {
				continue;
			};
			if from == to {
				draw_self_loop(a, style, ctx);
			} else {
				draw_strand(state, edge, (from, a), (to, b), style, ctx);
			}
		}
	}
}

fn stroke_pieces(pieces: &[(Point, Point)], ctx: &CanvasRenderingContext2d) {
	ctx.begin_path();
	for (p, q) in pieces {
		ctx.move_to(p.x, p.y);
		ctx.line_to(q.x, q.y);
	}
	ctx.stroke();
}

fn fill_triangle([a, b, c]: [Point; 3], ctx: &CanvasRenderingContext2d) {
	ctx.begin_path();
	ctx.move_to(a.x, a.y);
	ctx.line_to(b.x, b.y);
	ctx.line_to(c.x, c.y);
	ctx.close_path();
	ctx.fill();
}

fn draw_strand(
	state: &VisualizationState,
	edge: &Edge,
	(from, a): (NodeId, Point),
	(to, b): (NodeId, Point),
	style: EdgeStyle,
	ctx: &CanvasRenderingContext2d,
) {
	let offset = state.offsets().get(edge.id, from, to);
	match curve_control(a, b, offset).filter(|_| offset != 0.0) {
		Some(control) => {
			if style.broken {
				stroke_pieces(&dashed_curve(a, control, b, BROKEN_CURVE_SEGMENTS), ctx);
			} else {
				ctx.begin_path();
				ctx.move_to(a.x, a.y);
				ctx.bezier_curve_to(control.x, control.y, control.x, control.y, b.x, b.y);
				ctx.stroke();
			}
			// Arrowheads follow the tangent at the curve ends.
			if let Some((tip, dir)) = circle_entry(control, b, NODE_RADIUS * 1.5) {
				fill_triangle(arrow_head(tip, dir, ARROW_SIZE), ctx);
			}
			if edge.bidirectional
				&& let Some((tip, dir)) = circle_entry(control, a, NODE_RADIUS * 1.5)
			{
				fill_triangle(arrow_head(tip, dir, ARROW_SIZE), ctx);
			}
		}
		None => {
			if style.broken {
				stroke_pieces(&dashed_segments(a, b, BROKEN_SEGMENTS), ctx);
			} else {
				stroke_pieces(&[(a, b)], ctx);
			}
			if let Some((tip, dir)) = circle_entry(a, b, NODE_RADIUS * 1.5) {
				fill_triangle(arrow_head(tip, dir, ARROW_SIZE), ctx);
			}
			if edge.bidirectional
				&& let Some((tip, dir)) = circle_entry(b, a, NODE_RADIUS * 1.5)
			{
				fill_triangle(arrow_head(tip, dir, ARROW_SIZE), ctx);
			}
		}
	}
}

fn draw_self_loop(center: Point, style: EdgeStyle, ctx: &CanvasRenderingContext2d) {
	if style.broken {
		stroke_pieces(&dashed_ring(center, NODE_RADIUS + LOOP_RADIUS * 0.7, BROKEN_SEGMENTS), ctx);
		return;
	}
	let lp = SelfLoop::new(center, NODE_RADIUS, LOOP_RADIUS);
	ctx.begin_path();
	ctx.move_to(lp.anchor.x, lp.anchor.y);
	ctx.bezier_curve_to(lp.c1.x, lp.c1.y, lp.c2.x, lp.c2.y, lp.anchor.x, lp.anchor.y);
	ctx.stroke();
	let [p, q] = lp.arrow_strokes(ARROW_SIZE * 0.75);
	stroke_pieces(&[(lp.anchor, p), (lp.anchor, q)], ctx);
}

fn draw_nodes(state: &VisualizationState, positions: &Positions, ctx: &CanvasRenderingContext2d) {
	let (selection, focus) = (state.selection(), state.focus());
	ctx.set_font("10px sans-serif");
	ctx.set_text_align("center");
	ctx.set_line_width(1.0);
	for node in state.graph().nodes() {
		let Some(&p) = positions.get(&node.id) else {
			continue;
		};
		let style = node_style(selection, focus, node);
		let color = match style.relevance {
			_ if style.hovered => NODE_HOVER,
			NodeRelevance::Tier(tier) => tier_color(tier),
			NodeRelevance::Active => CHILD,
			NodeRelevance::HighlightedChild => HIGHLIGHTED,
			NodeRelevance::Dimmed => ROOT,
		};
		let side = NODE_RADIUS * 2.0;
		ctx.set_fill_style_str(&rgba(color, style.alpha));
		ctx.fill_rect(p.x - NODE_RADIUS, p.y - NODE_RADIUS, side, side);
		ctx.set_stroke_style_str(&rgba((255, 255, 255), style.alpha / 2));
		ctx.stroke_rect(p.x - NODE_RADIUS, p.y - NODE_RADIUS, side, side);

		ctx.set_fill_style_str(&rgba(TEXT, style.alpha));
		let _ = ctx.fill_text(&node.name, p.x, p.y - 20.0);
	}
	ctx.set_text_align("start");
}

fn draw_tooltip(state: &VisualizationState, ctx: &CanvasRenderingContext2d) {
	let Some(tip) = state.tooltip().filter(|t| !t.title.is_empty()) else {
		return;
	};
	let Some(anchor) = tooltip_anchor(state) else {
		return;
	};
	let lines: Vec<&str> = std::iter::once(tip.title.as_str()).chain(tip.detail.as_deref()).collect();
	ctx.set_font("12px sans-serif");
	let width = lines
		.iter()
		.filter_map(|l| ctx.measure_text(l).ok())
		.map(|m| m.width())
		.fold(0.0, f64::max);
	let (x, y, line_height) = (anchor.x + 12.0, anchor.y + 12.0, 16.0);
	ctx.set_fill_style_str("rgba(0, 0, 0, 0.8)");
	ctx.fill_rect(x, y, width + 12.0, line_height * lines.len() as f64 + 8.0);
	ctx.set_fill_style_str(&rgba(TEXT, 255));
	for (i, line) in lines.iter().enumerate() {
		let _ = ctx.fill_text(line, x + 6.0, y + 16.0 + i as f64 * line_height);
	}
}

/// Screen position beside the hovered node, or the midpoint of the hovered
/// edge's first drawable strand.
fn tooltip_anchor(state: &VisualizationState) -> Option<Point> {
	let selection = state.selection();
	let world = match (selection.hovered_node(), selection.hovered_edge()) {
		(Some(node), _) => state.node_position(node)?,
		(None, Some(edge)) => {
			let edge = state.graph().edge(edge)?;
			edge.endpoint_pairs().find_map(|(from, to)| {
				Some(state.node_position(from)?.midpoint(state.node_position(to)?))
			})?
		}
		(None, None) => return None,
	};
	Some(state.camera().world_to_screen(world, state.origin()))
}

/// Faint outline of the physics container; nothing for the ring layout.
fn draw_container(state: &VisualizationState, ctx: &CanvasRenderingContext2d) {
	let Layout::Physics(sim) = state.layout() else {
		return;
	};
	let Some(extent) = sim.container_extent() else {
		return;
	};
	ctx.set_stroke_style_str(&rgba(ROOT, 40));
	ctx.set_line_width(1.0 / state.camera().zoom);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(&JsValue::from_f64(6.0), &JsValue::from_f64(6.0)));
	match sim.params().container {
		Container::Ellipse => {
			ctx.begin_path();
			let _ = ctx.ellipse(0.0, 0.0, extent.x, extent.y, 0.0, 0.0, 2.0 * PI);
			ctx.stroke();
		}
		Container::Rectangle => ctx.stroke_rect(-extent.x, -extent.y, extent.x * 2.0, extent.y * 2.0),
		Container::None => {}
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}
