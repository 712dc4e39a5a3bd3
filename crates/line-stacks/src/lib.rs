//! Line Stacks - Parallel Offset Bands for Duplicate Line Features
//!
//! This library turns a collection of line features into "stacks" of lines that share the
//! same path, and lays every stack out as parallel, non-overlapping offset bands next to the
//! original line. Widths are given in output pixels and converted into map units for the
//! current view, so the bands keep their on-screen size at every scale.
//!
//! # Architecture
//!
//! - **[`FeatureAggregator`]**: Merges features with equal key attributes and counts them
//! - **[`GeometryHasher`]**: Hashes geometries so identical lines end up in one [`Stack`]
//! - **[`OrderComparator`]**: Deterministic ordering of the members of a stack
//! - **[`WidthResolver`]**: Pixel width per member, either [`ClampWidth`] or [`ScriptedWidth`]
//! - **[`MapUnits`]**: Pixel to map unit conversion for the output view
//! - **[`StackProcess`]**: The full pipeline, building the offset output features
//!
//! # Example
//! ```ignore
//! let params = StackParams {
//!     attributes: StackParams::parse_attributes("line_id,color"),
//!     draw_on_both_sides: false,
//!     ..StackParams::default()
//! };
//! let output = StackProcess::new(params).execute(&schema, features, &mut NoProgress)?;
//! ```

mod aggregate;
pub mod debug_sql;
mod feature;
mod hasher;
mod offset;
mod process;
mod script;
mod stack;
mod units;
mod width;

// Public API exports
pub use aggregate::{AggregatedFeature, FeatureAggregator};
pub use feature::{
    AttributeDescriptor, AttributeType, Feature, FeatureCollection, GeometryType, Schema, Value,
};
pub use hasher::GeometryHasher;
pub use offset::{Placement, Side, StackLayout, line_length, offset_line, side_multiplier};
pub use process::{
    AGG_COUNT_ATTRIBUTE_NAME, NoProgress, ProgressListener, StackParams, StackProcess,
    WIDTH_ATTRIBUTE_NAME,
};
pub use script::{RhaiScript, ScriptRuntime, WIDTH_FUNCTION_NAME};
pub use stack::{OrderComparator, Stack, build_stacks};
pub use units::MapUnits;
pub use width::{ClampWidth, ScriptedWidth, WidthResolver};

/// Error types for the stacking pipeline
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("Invalid geometry type: expected {expected:?}, found {found:?}")]
    InvalidGeometryType {
        expected: GeometryType,
        found: GeometryType,
    },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Feature {feature} is missing the aggregation attribute \"{attribute}\"")]
    MissingAttribute { feature: String, attribute: String },

    #[error("Feature {feature} has a non-integer value {value} for order attribute \"{attribute}\"")]
    InvalidOrderValue {
        feature: String,
        attribute: String,
        value: String,
    },

    #[error("Attribute \"{0}\" already exists in the schema")]
    AttributeCollision(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Offset by {distance} map units collapsed")]
    DegenerateOffset { distance: f64 },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StackError>;
