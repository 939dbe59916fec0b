//! Observation side channel for the derivation pipeline.
//!
//! The generator reports resolutions, filter rejections, and derived
//! tokens through a [`PipelineObserver`]. Observers are fire-and-forget:
//! nothing in the pipeline depends on them, and the default
//! [`TracingObserver`] just forwards to `tracing`.

use tracing::{debug, info, warn};

use crate::derive::Field;

/// Pipeline observation points. All methods default to no-ops.
pub trait PipelineObserver {
    /// A field was resolved for a named output value.
    fn field_resolved(&self, value_name: &str, field: Field, value: &str) {
        let _ = (value_name, field, value);
    }

    /// A required attribute could not be resolved.
    fn attribute_missing(&self, message: &str) {
        let _ = message;
    }

    /// A named output value was rejected by a filter on the given field.
    fn value_skipped(&self, value_name: &str, field: Field, value: &str) {
        let _ = (value_name, field, value);
    }

    /// A token was derived for a named output value.
    fn value_derived(&self, value_name: &str, algorithm: &str, payload: &str, token: &str) {
        let _ = (value_name, algorithm, payload, token);
    }
}

/// Default observer forwarding to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn field_resolved(&self, value_name: &str, field: Field, value: &str) {
        info!(value = value_name, field = %field, resolved = value, "field resolved");
    }

    fn attribute_missing(&self, message: &str) {
        warn!("{}", message);
    }

    fn value_skipped(&self, value_name: &str, field: Field, value: &str) {
        debug!(
            value = value_name,
            field = %field,
            resolved = value,
            "value skipped by filter"
        );
    }

    fn value_derived(&self, value_name: &str, algorithm: &str, payload: &str, token: &str) {
        debug!(value = value_name, algorithm, payload, token, "value derived");
    }
}
