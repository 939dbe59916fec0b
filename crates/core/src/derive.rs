//! Identifier derivation: payload assembly, hashing, and packaging.
//!
//! The payload is the separator-joined concatenation of the non-empty
//! resolved fields, in the configured order. The derived token is its hex
//! digest (or the payload itself when hashing is disabled), with the
//! configured prefix prepended verbatim.

use crate::config::EffectiveConfig;
use crate::nameid::NameIdentifier;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A payload field, named in the `fields` configuration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Salt,
    UserId,
    TargetId,
    SourceId,
}

impl Field {
    /// Parse a configured field name. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "salt" => Some(Self::Salt),
            "user_id" => Some(Self::UserId),
            "target_id" => Some(Self::TargetId),
            "source_id" => Some(Self::SourceId),
            _ => None,
        }
    }

    /// Canonical name, as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Salt => "salt",
            Self::UserId => "user_id",
            Self::TargetId => "target_id",
            Self::SourceId => "source_id",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Field values resolved from one request for one named output value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFields {
    pub user_id: String,
    pub target_id: String,
    pub source_id: String,
    pub salt: String,
}

impl ResolvedFields {
    /// The resolved value for a named payload field.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Salt => &self.salt,
            Field::UserId => &self.user_id,
            Field::TargetId => &self.target_id,
            Field::SourceId => &self.source_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// One derived output value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedValue {
    /// The (possibly prefixed) token itself.
    Plain(String),
    /// The token packaged with its qualifiers for protocol serialization.
    NameId(NameIdentifier),
}

impl DerivedValue {
    /// The derived token, regardless of packaging.
    pub fn token(&self) -> &str {
        match self {
            Self::Plain(token) => token,
            Self::NameId(name_id) => &name_id.value,
        }
    }
}

/// The payload and value derived for one named configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    /// The raw joined payload that was hashed.
    pub payload: String,
    /// The derived output value.
    pub value: DerivedValue,
}

/// Join the non-empty resolved fields in configured order.
///
/// Empty fields are skipped entirely (they contribute neither a value nor
/// a separator); a field name appearing twice contributes twice.
pub fn assemble_payload(fields: &[Field], separator: &str, resolved: &ResolvedFields) -> String {
    let parts: Vec<&str> = fields
        .iter()
        .map(|field| resolved.get(*field))
        .filter(|value| !value.is_empty())
        .collect();
    parts.join(separator)
}

/// Derive the output value for one named configuration.
///
/// The payload is hashed with the configured algorithm (or passed through
/// verbatim when hashing is disabled), the prefix is prepended, and the
/// result is packaged as a name identifier when `name_id` is set. The
/// qualifiers of a packaged identifier are the resolved source and target,
/// omitted when empty.
pub fn derive(config: &EffectiveConfig, resolved: &ResolvedFields) -> Derivation {
    let payload = assemble_payload(&config.fields, &config.field_separator, resolved);

    let mut token = match config.hash_function {
        Some(algorithm) => algorithm.hex_digest(&payload),
        None => payload.clone(),
    };

    if !config.prefix.is_empty() {
        token = format!("{}{}", config.prefix, token);
    }

    let value = if config.name_id {
        DerivedValue::NameId(NameIdentifier {
            value: token,
            source_qualifier: nonempty(&resolved.source_id),
            target_qualifier: nonempty(&resolved.target_id),
        })
    } else {
        DerivedValue::Plain(token)
    };

    Derivation { payload, value }
}

fn nonempty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
