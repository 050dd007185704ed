use std::f64::consts::FRAC_PI_4;
use std::time::Duration;

use log::warn;
use serde::Deserialize;

/// Which layout strategy positions the nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
	#[default]
	Hierarchical,
	Physics,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
	None,
	#[default]
	Ellipse,
	Rectangle,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HierarchySettings {
	pub root_radius: f64,
	pub parent_radius: f64,
	pub child_radius: f64,
	pub orphan_radius: f64,
	pub orphan_parent_angle: f64,
}

impl Default for HierarchySettings {
	fn default() -> Self {
		Self {
			root_radius: 300.0,
			parent_radius: 150.0,
			child_radius: 80.0,
			orphan_radius: 600.0,
			orphan_parent_angle: FRAC_PI_4,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
	/// Velocity multiplier per tick; must stay below 1.
	pub damping: f64,
	pub min_velocity: f64,
	pub max_velocity: f64,
	pub repel_force: f64,
	pub repel_dist: f64,
	pub spring_force: f64,
	pub spring_length: f64,
	pub center_enabled: bool,
	pub center_force: f64,
	pub contain_force: f64,
	pub container: Container,
	pub container_margin: f64,
	pub fix_roots: bool,
	pub fix_parents: bool,
	pub fix_children: bool,
}

impl Default for PhysicsSettings {
	fn default() -> Self {
		Self {
			damping: 0.9,
			min_velocity: 0.05,
			max_velocity: 8.0,
			repel_force: 3000.0,
			repel_dist: 250.0,
			spring_force: 0.01,
			spring_length: 120.0,
			center_enabled: true,
			center_force: 0.002,
			contain_force: 0.05,
			container: Container::Ellipse,
			container_margin: 30.0,
			fix_roots: false,
			fix_parents: false,
			fix_children: false,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
	/// World-space pick radius around a node centre.
	pub node_hit_radius: f64,
	pub edge_hit_threshold: f64,
	pub loop_inner_radius: f64,
	pub loop_outer_radius: f64,
	pub offset_spacing: f64,
	pub curve_samples: usize,
	/// Screen pixels a press may travel and still count as a click.
	pub drag_threshold: f64,
}

impl Default for InteractionSettings {
	fn default() -> Self {
		Self {
			node_hit_radius: 20.0,
			edge_hit_threshold: 8.0,
			loop_inner_radius: 15.0,
			loop_outer_radius: 35.0,
			offset_spacing: 30.0,
			curve_samples: 20,
			drag_threshold: 3.0,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
	pub smoothing: f64,
	pub min_zoom: f64,
	pub max_zoom: f64,
	pub wheel_step: f64,
	pub key_step: f64,
	pub fit_padding: f64,
	pub fit_margin: f64,
}

impl Default for CameraSettings {
	fn default() -> Self {
		Self {
			smoothing: 0.05,
			min_zoom: 0.2,
			max_zoom: 3.0,
			wheel_step: 1.05,
			key_step: 1.1,
			fit_padding: 40.0,
			fit_margin: 60.0,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadingSettings {
	pub base_url: String,
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub use_fallback: bool,
}

impl Default for LoadingSettings {
	fn default() -> Self {
		Self {
			base_url: "bell".into(),
			max_attempts: 3,
			base_delay_ms: 1000,
			use_fallback: true,
		}
	}
}

impl LoadingSettings {
	pub fn base_delay(&self) -> Duration {
		Duration::from_millis(self.base_delay_ms)
	}
}

/// Tunables for layout, interaction, camera and loading.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub layout: LayoutMode,
	pub hierarchy: HierarchySettings,
	pub physics: PhysicsSettings,
	pub interaction: InteractionSettings,
	pub camera: CameraSettings,
	pub loading: LoadingSettings,
}

impl Settings {
	pub fn from_json_str(text: &str) -> Self {
		match serde_json::from_str::<Self>(text) {
			Ok(settings) => settings.normalized(),
			Err(err) => {
				warn!("Ignoring malformed settings ({err}); using defaults");
				Self::default()
			}
		}
	}

	/// Repairs values the camera and the integrator cannot run with.
	pub fn normalized(mut self) -> Self {
		let (camera, defaults) = (&mut self.camera, CameraSettings::default());
		if !(camera.min_zoom > 0.0 && camera.min_zoom.is_finite()) {
			warn!("camera.min_zoom {} is not positive; using {}", camera.min_zoom, defaults.min_zoom);
			camera.min_zoom = defaults.min_zoom;
		}
		if !(camera.max_zoom > 0.0 && camera.max_zoom.is_finite()) {
			warn!("camera.max_zoom {} is not positive; using {}", camera.max_zoom, defaults.max_zoom);
			camera.max_zoom = defaults.max_zoom;
		}
		if camera.min_zoom > camera.max_zoom {
			warn!("camera.min_zoom {} exceeds max_zoom {}; swapping", camera.min_zoom, camera.max_zoom);
			std::mem::swap(&mut camera.min_zoom, &mut camera.max_zoom);
		}
		if !(0.0..=1.0).contains(&camera.smoothing) {
			warn!("camera.smoothing {} outside [0, 1]; using {}", camera.smoothing, defaults.smoothing);
			camera.smoothing = defaults.smoothing;
		}

		let (physics, defaults) = (&mut self.physics, PhysicsSettings::default());
		if !(0.0..1.0).contains(&physics.damping) {
			warn!("physics.damping {} outside [0, 1); using {}", physics.damping, defaults.damping);
			physics.damping = defaults.damping;
		}
		if !(physics.max_velocity > 0.0 && physics.max_velocity.is_finite()) {
			warn!(
				"physics.max_velocity {} is not positive; using {}",
				physics.max_velocity, defaults.max_velocity
			);
			physics.max_velocity = defaults.max_velocity;
		}
		self
	}
}
