//! Pure 2D helpers for edge drawing and hit-testing.
//!
//! Degenerate inputs never panic or divide by zero: distance queries return
//! `f64::INFINITY` and constructors return `None`.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6, TAU};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(self, other: Point) -> f64 {
		(other.x - self.x).hypot(other.y - self.y)
	}

	pub fn lerp(self, other: Point, t: f64) -> Point {
		Point::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
	}

	pub fn midpoint(self, other: Point) -> Point {
		self.lerp(other, 0.5)
	}
}

pub fn distance_point_to_segment(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len_sq = dx * dx + dy * dy;
	if len_sq == 0.0 {
		return p.distance(a);
	}
	let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
	p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// One axis of a cubic Bézier in Bernstein form.
pub fn cubic_bezier(a: f64, b: f64, c: f64, d: f64, t: f64) -> f64 {
	let u = 1.0 - t;
	u * u * u * a + 3.0 * u * u * t * b + 3.0 * u * t * t * c + t * t * t * d
}

pub fn cubic_bezier_point(p0: Point, c1: Point, c2: Point, p3: Point, t: f64) -> Point {
	Point::new(
		cubic_bezier(p0.x, c1.x, c2.x, p3.x, t),
		cubic_bezier(p0.y, c1.y, c2.y, p3.y, t),
	)
}

/// Control point of an offset curve: the chord midpoint pushed `offset`
/// along the left-hand normal of `from → to`.
pub fn curve_control(from: Point, to: Point, offset: f64) -> Option<Point> {
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	let len = dx.hypot(dy);
	if len == 0.0 {
		return None;
	}
	let mid = from.midpoint(to);
	Some(Point::new(mid.x - dy / len * offset, mid.y + dx / len * offset))
}

/// Point at `t` on the pseudo-cubic whose two control points coincide.
pub fn offset_curve_point(from: Point, control: Point, to: Point, t: f64) -> Point {
	cubic_bezier_point(from, control, control, to, t)
}

/// Sampled (approximate) distance to an offset curve; `samples + 1` points
/// including both ends.
pub fn distance_point_to_curve(p: Point, from: Point, to: Point, offset: f64, samples: usize) -> f64 {
	let Some(control) = curve_control(from, to, offset) else {
		return f64::INFINITY;
	};
	let samples = samples.max(1);
	(0..=samples)
		.map(|i| offset_curve_point(from, control, to, i as f64 / samples as f64))
		.map(|q| p.distance(q))
		.fold(f64::INFINITY, f64::min)
}

/// Alternate dash pieces of a straight line split into `segments` parts.
pub fn dashed_segments(from: Point, to: Point, segments: usize) -> Vec<(Point, Point)> {
	let n = segments.max(1) as f64;
	(0..segments)
		.step_by(2)
		.map(|i| (from.lerp(to, i as f64 / n), from.lerp(to, (i + 1) as f64 / n)))
		.collect()
}

pub fn dashed_curve(from: Point, control: Point, to: Point, segments: usize) -> Vec<(Point, Point)> {
	let n = segments.max(1) as f64;
	(0..segments)
		.step_by(2)
		.map(|i| {
			(
				offset_curve_point(from, control, to, i as f64 / n),
				offset_curve_point(from, control, to, (i + 1) as f64 / n),
			)
		})
		.collect()
}

/// Fixed-size self-loop anchored on a node's perimeter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelfLoop {
	pub anchor: Point,
	pub c1: Point,
	pub c2: Point,
}

impl SelfLoop {
	pub fn new(center: Point, node_radius: f64, loop_radius: f64) -> Self {
		let anchor = Point::new(
			center.x + FRAC_PI_4.cos() * node_radius,
			center.y - FRAC_PI_4.sin() * node_radius,
		);
		let reach = loop_radius * 1.2;
		Self {
			anchor,
			c1: Point::new(center.x + reach, center.y - reach),
			c2: Point::new(center.x + reach, center.y + reach),
		}
	}

	/// The two short strokes of the arrowhead at the anchor.
	pub fn arrow_strokes(&self, size: f64) -> [Point; 2] {
		let end = -FRAC_PI_4 + FRAC_PI_6;
		let a = self.anchor;
		[
			Point::new(a.x + end.cos() * size, a.y + end.sin() * size),
			Point::new(a.x + (end - FRAC_PI_2).cos() * size, a.y + (end - FRAC_PI_2).sin() * size),
		]
	}
}

/// Dash pieces of a broken self-loop: a ring around the node.
pub fn dashed_ring(center: Point, radius: f64, segments: usize) -> Vec<(Point, Point)> {
	let n = segments.max(1) as f64;
	let at = |t: f64| {
		let angle = -FRAC_PI_4 + t * TAU;
		Point::new(center.x + angle.cos() * radius, center.y + angle.sin() * radius)
	};
	(0..segments)
		.step_by(2)
		.map(|i| (at(i as f64 / n), at((i + 1) as f64 / n)))
		.collect()
}

/// Open annulus test used for self-loop picking.
pub fn annulus_contains(p: Point, center: Point, inner: f64, outer: f64) -> bool {
	let d = p.distance(center);
	d > inner && d < outer
}

/// Where the segment `from → to` leaves a circle of `radius` around `to`,
/// together with the unit direction of travel.
pub fn circle_entry(from: Point, to: Point, radius: f64) -> Option<(Point, Point)> {
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	let len = dx.hypot(dy);
	if len <= radius {
		return None;
	}
	let dir = Point::new(dx / len, dy / len);
	Some((Point::new(to.x - dir.x * radius, to.y - dir.y * radius), dir))
}

/// Triangle for an arrowhead whose tip is at `tip`, pointing along `dir`.
pub fn arrow_head(tip: Point, dir: Point, size: f64) -> [Point; 3] {
	let back = Point::new(tip.x - dir.x * size, tip.y - dir.y * size);
	let (px, py) = (-dir.y * size * 0.5, dir.x * size * 0.5);
	[tip, Point::new(back.x + px, back.y + py), Point::new(back.x - px, back.y - py)]
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	pub min: Point,
	pub max: Point,
}

impl Bounds {
	pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
		points.into_iter().fold(None, |acc, p| {
			Some(match acc {
				None => Bounds { min: p, max: p },
				Some(b) => Bounds {
					min: Point::new(b.min.x.min(p.x), b.min.y.min(p.y)),
					max: Point::new(b.max.x.max(p.x), b.max.y.max(p.y)),
				},
			})
		})
	}

	pub fn padded(self, pad: f64) -> Self {
		Bounds {
			min: Point::new(self.min.x - pad, self.min.y - pad),
			max: Point::new(self.max.x + pad, self.max.y + pad),
		}
	}

	pub fn center(&self) -> Point {
		self.min.midpoint(self.max)
	}

	pub fn width(&self) -> f64 {
		self.max.x - self.min.x
	}

	pub fn height(&self) -> f64 {
		self.max.y - self.min.y
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case::on_segment(Point::new(5.0, 0.0), 0.0)]
	#[case::endpoint(Point::new(10.0, 0.0), 0.0)]
	#[case::perpendicular(Point::new(5.0, 5.0), 5.0)]
	#[case::beyond_end(Point::new(13.0, 4.0), 5.0)]
	#[case::before_start(Point::new(-3.0, -4.0), 5.0)]
	fn segment_distance(#[case] p: Point, #[case] expected: f64) {
		let d = distance_point_to_segment(p, Point::new(0.0, 0.0), Point::new(10.0, 0.0));
		assert!((d - expected).abs() < 1e-9, "{d} != {expected}");
	}

	#[test]
	fn zero_length_segment_is_point_distance() {
		let a = Point::new(1.0, 1.0);
		assert_eq!(distance_point_to_segment(Point::new(4.0, 5.0), a, a), 5.0);
	}

	#[test]
	fn bezier_hits_endpoints() {
		assert_eq!(cubic_bezier(1.0, 7.0, -3.0, 4.0, 0.0), 1.0);
		assert_eq!(cubic_bezier(1.0, 7.0, -3.0, 4.0, 1.0), 4.0);
		// Collinear controls make it linear in t.
		assert!((cubic_bezier(0.0, 1.0, 2.0, 3.0, 0.5) - 1.5).abs() < 1e-12);
	}

	#[test]
	fn curve_bulges_toward_left_normal() {
		let (from, to) = (Point::new(0.0, 0.0), Point::new(100.0, 0.0));
		let control = curve_control(from, to, 30.0).unwrap();
		assert_eq!(control, Point::new(50.0, 30.0));
		// Apex of the pseudo-cubic sits at 3/4 of the control offset.
		let apex = offset_curve_point(from, control, to, 0.5);
		assert!((apex.y - 22.5).abs() < 1e-9);
		assert!(distance_point_to_curve(Point::new(50.0, 22.5), from, to, 30.0, 20) < 1e-9);
		assert!(distance_point_to_curve(Point::new(50.0, 0.0), from, to, 30.0, 20) > 20.0);
	}

	#[test]
	fn degenerate_curve_is_infinitely_far() {
		let p = Point::new(3.0, 3.0);
		assert_eq!(curve_control(p, p, 10.0), None);
		assert_eq!(distance_point_to_curve(Point::default(), p, p, 10.0, 20), f64::INFINITY);
	}

	#[test]
	fn dashes_cover_alternate_pieces() {
		let dashes = dashed_segments(Point::new(0.0, 0.0), Point::new(80.0, 0.0), 8);
		assert_eq!(dashes.len(), 4);
		assert_eq!(dashes[0], (Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
		assert_eq!(dashes[3], (Point::new(60.0, 0.0), Point::new(70.0, 0.0)));
	}

	#[test]
	fn annulus_is_open_interval() {
		let c = Point::new(0.0, 0.0);
		assert!(annulus_contains(Point::new(20.0, 0.0), c, 15.0, 35.0));
		assert!(!annulus_contains(Point::new(15.0, 0.0), c, 15.0, 35.0));
		assert!(!annulus_contains(Point::new(2.0, 2.0), c, 15.0, 35.0));
		assert!(!annulus_contains(Point::new(40.0, 0.0), c, 15.0, 35.0));
	}

	#[test]
	fn circle_entry_stops_at_perimeter() {
		let (at, dir) = circle_entry(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 4.0).unwrap();
		assert_eq!(at, Point::new(6.0, 0.0));
		assert_eq!(dir, Point::new(1.0, 0.0));
		assert!(circle_entry(Point::new(0.0, 0.0), Point::new(3.0, 0.0), 4.0).is_none());
	}

	#[test]
	fn bounds_pad_and_center() {
		let b = Bounds::from_points([Point::new(-10.0, 5.0), Point::new(30.0, -15.0)])
			.unwrap()
			.padded(10.0);
		assert_eq!(b.center(), Point::new(10.0, -5.0));
		assert_eq!((b.width(), b.height()), (60.0, 40.0));
		assert!(Bounds::from_points(std::iter::empty()).is_none());
	}

	proptest! {
		#[test]
		fn segment_distance_bounded_by_endpoints(
			px in -500.0..500.0f64, py in -500.0..500.0f64,
			ax in -500.0..500.0f64, ay in -500.0..500.0f64,
			bx in -500.0..500.0f64, by in -500.0..500.0f64,
		) {
			let (p, a, b) = (Point::new(px, py), Point::new(ax, ay), Point::new(bx, by));
			let d = distance_point_to_segment(p, a, b);
			prop_assert!(d >= 0.0);
			prop_assert!(d <= p.distance(a) + 1e-9);
			prop_assert!(d <= p.distance(b) + 1e-9);
		}

		#[test]
		fn points_on_segment_have_zero_distance(t in 0.0..=1.0f64, ax in -100.0..100.0f64, by in -100.0..100.0f64) {
			let (a, b) = (Point::new(ax, 0.0), Point::new(0.0, by));
			prop_assert!(distance_point_to_segment(a.lerp(b, t), a, b) < 1e-6);
		}
	}
}
