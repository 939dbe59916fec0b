//! The per-request derivation pipeline.
//!
//! [`TargetedIdGenerator`] walks every configured named value through the
//! same sequence:
//!
//! 1. Resolve the user identifier and check the user filter.
//! 2. Resolve the target identifier, apply transforms, check the target filter.
//! 3. Resolve the source identifier and take the configured salt.
//! 4. Assemble the payload, hash, prefix, and package the result.
//!
//! A filter rejection skips that value and the loop continues with the
//! next one; nothing in the per-value pipeline fails the request. An
//! unresolvable field degrades to an empty string, which still
//! participates in the payload.

use tracing::info;

use crate::config::{ModuleConfig, NamedConfig};
use crate::derive::{self, DerivedValue, Field, ResolvedFields};
use crate::errors::ConfigError;
use crate::events::{PipelineObserver, TracingObserver};
use crate::filter::{apply_transforms, some_match};
use crate::nameid::{NameIdEncoder, XmlNameIdEncoder};
use crate::state::{resolve_first, AttributePath, RequestState};

/// Attribute name receiving the derived tokens.
pub const OUTPUT_ATTRIBUTE: &str = "eduPersonTargetedID";

/// Per-request targeted-ID generator.
///
/// Constructed once from a [`ModuleConfig`]; the compiled configuration is
/// immutable afterwards and [`process`](Self::process) can be called for
/// any number of requests.
pub struct TargetedIdGenerator {
    values: Vec<NamedConfig>,
    observer: Box<dyn PipelineObserver + Send + Sync>,
    encoder: Box<dyn NameIdEncoder + Send + Sync>,
}

impl TargetedIdGenerator {
    /// Compile `config` into a generator. Fails on any invalid setting.
    pub fn new(config: &ModuleConfig) -> Result<Self, ConfigError> {
        let values = config.build()?;
        info!(values = values.len(), "targeted-id generator initialized");
        Ok(Self {
            values,
            observer: Box::new(TracingObserver),
            encoder: Box::new(XmlNameIdEncoder),
        })
    }

    /// Replace the observation side channel.
    pub fn with_observer(mut self, observer: Box<dyn PipelineObserver + Send + Sync>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the structured-output encoder.
    pub fn with_encoder(mut self, encoder: Box<dyn NameIdEncoder + Send + Sync>) -> Self {
        self.encoder = encoder;
        self
    }

    /// The compiled named values, in emission order.
    pub fn values(&self) -> &[NamedConfig] {
        &self.values
    }

    /// Derive and append tokens for one request.
    ///
    /// The output attribute is reset to an empty list first, so a request
    /// rejected by every filter still carries the (empty) attribute.
    /// Tokens are appended in configured value order.
    pub fn process(&self, state: &mut RequestState) {
        state.reset_attribute(OUTPUT_ATTRIBUTE);

        for named in &self.values {
            if let Some(derived) = self.derive_value(named, state) {
                let output = match derived {
                    DerivedValue::Plain(token) => token,
                    DerivedValue::NameId(name_id) => self.encoder.encode(&name_id),
                };
                state.append_attribute(OUTPUT_ATTRIBUTE, output);
            }
        }
    }

    /// Run the per-value pipeline. Returns `None` when a filter rejects.
    fn derive_value(&self, named: &NamedConfig, state: &RequestState) -> Option<DerivedValue> {
        let cfg = &named.config;
        let name = named.name.as_str();

        // User identifier -- the only one whose absence is worth a warning.
        let user_id = self.resolve_field(
            state,
            &cfg.user_id,
            Some("no user identifier found in request state"),
        );
        if let Some(patterns) = &cfg.if_user {
            if !some_match(&user_id, patterns) {
                self.observer.value_skipped(name, Field::UserId, &user_id);
                return None;
            }
        }
        self.observer.field_resolved(name, Field::UserId, &user_id);

        // Target identifier, transformed before filtering.
        let target_id = self.resolve_field(state, &cfg.target_id, None);
        let target_id = apply_transforms(&target_id, &cfg.target_transform);
        if let Some(patterns) = &cfg.if_target {
            if !some_match(&target_id, patterns) {
                self.observer.value_skipped(name, Field::TargetId, &target_id);
                return None;
            }
        }
        self.observer
            .field_resolved(name, Field::TargetId, &target_id);

        // Source identifier.
        let source_id = self.resolve_field(state, &cfg.source_id, None);
        self.observer
            .field_resolved(name, Field::SourceId, &source_id);

        let resolved = ResolvedFields {
            user_id,
            target_id,
            source_id,
            salt: cfg.salt.clone(),
        };

        let derivation = derive::derive(cfg, &resolved);
        let algorithm = cfg
            .hash_function
            .map_or("none", |algorithm| algorithm.name());
        self.observer.value_derived(
            name,
            algorithm,
            &derivation.payload,
            derivation.value.token(),
        );

        Some(derivation.value)
    }

    /// Resolve an ordered candidate list to a field value.
    ///
    /// An empty candidate list resolves silently to an empty string; a
    /// non-empty list that yields nothing degrades to an empty string and
    /// reports `missing` (when set) through the observer.
    fn resolve_field(
        &self,
        state: &RequestState,
        paths: &[AttributePath],
        missing: Option<&str>,
    ) -> String {
        if paths.is_empty() {
            return String::new();
        }
        match resolve_first(state, paths) {
            Some(value) => value.to_string(),
            None => {
                if let Some(message) = missing {
                    self.observer.attribute_missing(message);
                }
                String::new()
            }
        }
    }
}
