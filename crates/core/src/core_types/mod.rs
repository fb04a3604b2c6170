//! Core types and utilities

pub mod metadata;
pub mod units;
pub mod vec3;

// Re-export
pub use metadata::{FieldGroup, GroupLayout, SimulationMetadata, UnitConversions};
pub use units::{Dimension, Unit, UnitScaleTable};
pub use vec3::DVec3;
