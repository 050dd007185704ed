//! Node-link canvas for stepping through a case study's interactions.

mod component;
pub mod config;
pub mod data;
pub mod geometry;
pub mod layout;
pub mod offsets;
mod render;
pub mod selection;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use component::{CaseGraphCanvas, GraphBus};
