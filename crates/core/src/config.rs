//! Layered TOML configuration for targeted-ID generation.
//!
//! Settings live in three layers: hard-coded defaults, module-level
//! settings, and per-value overrides under `[[values]]`. A key present at
//! a higher layer always wins over the layer below it -- including a
//! present-but-empty value (`[]` or `""`), which explicitly clears an
//! inherited setting. An absent key inherits.
//!
//! All merging, pattern compilation, and validation happens in
//! [`ModuleConfig::build`], before any request is processed, so a bad
//! configuration fails module initialization instead of faulting per
//! request.

use std::path::Path;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::derive::Field;
use crate::errors::ConfigError;
use crate::filter::TransformRule;
use crate::hash::HashAlgorithm;
use crate::state::AttributePath;

// ---------------------------------------------------------------------------
// Raw configuration
// ---------------------------------------------------------------------------

/// One tri-state settings layer.
///
/// Every field is optional: `None` inherits from the layer below, an
/// empty value explicitly clears the inherited setting, and anything else
/// overrides it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueSettings {
    /// Candidate paths identifying the authenticated user, in order of
    /// preference.
    #[serde(default)]
    pub user_id: Option<Vec<String>>,

    /// Regexes admitting users; absent = admit everyone.
    #[serde(default)]
    pub if_user: Option<Vec<String>>,

    /// Candidate paths identifying the requesting service, in order of
    /// preference.
    #[serde(default)]
    pub target_id: Option<Vec<String>>,

    /// Ordered rewrite rules applied to the target identifier.
    #[serde(default)]
    pub target_transform: Option<Vec<TransformRuleConfig>>,

    /// Regexes admitting targets; absent = admit every target.
    #[serde(default)]
    pub if_target: Option<Vec<String>>,

    /// Candidate paths identifying this identity provider.
    #[serde(default)]
    pub source_id: Option<Vec<String>>,

    /// Literal salt mixed into the hashed payload.
    #[serde(default)]
    pub salt: Option<String>,

    /// Digest algorithm name; an empty name disables hashing.
    #[serde(default)]
    pub hash_function: Option<String>,

    /// Payload field order, drawn from salt/user_id/target_id/source_id.
    #[serde(default)]
    pub fields: Option<Vec<String>>,

    /// Separator joining non-empty fields into the payload.
    #[serde(default)]
    pub field_separator: Option<String>,

    /// Literal prefix prepended to the derived token.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Emit a structured name identifier instead of the bare token.
    #[serde(default)]
    pub name_id: Option<bool>,
}

/// A raw `pattern` / `replacement` rewrite rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRuleConfig {
    pub pattern: String,
    pub replacement: String,
}

/// A named per-value override block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedValue {
    /// Name of this output value; tokens are emitted in `[[values]]` order.
    pub name: String,

    #[serde(flatten)]
    pub settings: ValueSettings,
}

/// Top-level module configuration as loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module-level settings, applying to every value unless overridden.
    #[serde(flatten)]
    pub settings: ValueSettings,

    /// Named output values. When empty, a single value named `default`
    /// with no overrides is synthesized.
    #[serde(default)]
    pub values: Vec<NamedValue>,
}

// ---------------------------------------------------------------------------
// Hard defaults
// ---------------------------------------------------------------------------

const DEFAULT_USER_ID: &[&str] = &["UserID"];
const DEFAULT_TARGET_ID: &[&str] = &["saml:RequesterID", "core:SP"];
const DEFAULT_SOURCE_ID: &[&str] = &["Attributes/schacHomeOrganization", "core:IdP"];
const DEFAULT_FIELD_SEPARATOR: &str = "@@";

/// Default payload order. Salt appears at both ends; tokens must keep
/// matching values issued by existing deployments.
const DEFAULT_FIELDS: &[Field] = &[
    Field::Salt,
    Field::UserId,
    Field::TargetId,
    Field::SourceId,
    Field::Salt,
];

// ---------------------------------------------------------------------------
// Effective (compiled) configuration
// ---------------------------------------------------------------------------

/// The merged, compiled parameter set for one named output value.
///
/// Built once when the module is constructed, immutable afterwards, and
/// safe to share across concurrently handled requests.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub user_id: Vec<AttributePath>,
    /// `None` when no user filter is in effect (absent or cleared).
    pub if_user: Option<Vec<Regex>>,
    pub target_id: Vec<AttributePath>,
    pub target_transform: Vec<TransformRule>,
    /// `None` when no target filter is in effect (absent or cleared).
    pub if_target: Option<Vec<Regex>>,
    pub source_id: Vec<AttributePath>,
    pub salt: String,
    /// `None` when hashing was explicitly disabled with an empty name.
    pub hash_function: Option<HashAlgorithm>,
    pub fields: Vec<Field>,
    pub field_separator: String,
    pub prefix: String,
    pub name_id: bool,
}

/// A named, compiled output value.
#[derive(Debug, Clone)]
pub struct NamedConfig {
    pub name: String,
    pub config: EffectiveConfig,
}

// ---------------------------------------------------------------------------
// Loading & building
// ---------------------------------------------------------------------------

impl ModuleConfig {
    /// Load a [`ModuleConfig`] from a TOML file at the given path.
    ///
    /// This does **not** merge or validate -- call [`build`](Self::build)
    /// (or hand the config to the generator) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ModuleConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(values = config.values.len(), "configuration parsed");
        Ok(config)
    }

    /// Merge and compile every named value into its [`EffectiveConfig`].
    ///
    /// When no `[[values]]` blocks are configured, a single value named
    /// `default` with no overrides is synthesized. Fails on the first
    /// invalid setting.
    pub fn build(&self) -> Result<Vec<NamedConfig>, ConfigError> {
        let synthesized;
        let values: &[NamedValue] = if self.values.is_empty() {
            synthesized = [NamedValue {
                name: "default".to_string(),
                settings: ValueSettings::default(),
            }];
            &synthesized
        } else {
            &self.values
        };

        values
            .iter()
            .map(|value| {
                let config = compile(&value.name, &self.settings, &value.settings)?;
                Ok(NamedConfig {
                    name: value.name.clone(),
                    config,
                })
            })
            .collect()
    }
}

/// Layering rule: an override key wins over a module-level key, even when
/// its value is empty; absent keys inherit.
fn pick<'a, T>(over: &'a Option<T>, module: &'a Option<T>) -> Option<&'a T> {
    over.as_ref().or(module.as_ref())
}

/// Merge one value's three layers and compile the result.
fn compile(
    name: &str,
    module: &ValueSettings,
    over: &ValueSettings,
) -> Result<EffectiveConfig, ConfigError> {
    let user_id = match pick(&over.user_id, &module.user_id) {
        Some(paths) => parse_paths(name, paths)?,
        None => parse_paths(name, DEFAULT_USER_ID)?,
    };

    let target_id = match pick(&over.target_id, &module.target_id) {
        Some(paths) => parse_paths(name, paths)?,
        None => parse_paths(name, DEFAULT_TARGET_ID)?,
    };

    let source_id = match pick(&over.source_id, &module.source_id) {
        Some(paths) => parse_paths(name, paths)?,
        None => parse_paths(name, DEFAULT_SOURCE_ID)?,
    };

    let if_user = compile_filter(name, pick(&over.if_user, &module.if_user))?;
    let if_target = compile_filter(name, pick(&over.if_target, &module.if_target))?;

    let target_transform = match pick(&over.target_transform, &module.target_transform) {
        Some(rules) => rules
            .iter()
            .map(|rule| {
                Ok(TransformRule {
                    pattern: compile_pattern(name, &rule.pattern)?,
                    replacement: rule.replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?,
        None => Vec::new(),
    };

    let salt = pick(&over.salt, &module.salt).cloned().unwrap_or_default();

    let hash_function = match pick(&over.hash_function, &module.hash_function) {
        // An explicitly empty name disables hashing for this value.
        Some(algorithm) if algorithm.is_empty() => None,
        Some(algorithm) => Some(HashAlgorithm::parse(algorithm).ok_or_else(|| {
            ConfigError::UnsupportedHashAlgorithm {
                value: name.to_string(),
                algorithm: algorithm.clone(),
            }
        })?),
        None => Some(HashAlgorithm::default()),
    };

    let fields = match pick(&over.fields, &module.fields) {
        Some(names) => names
            .iter()
            .map(|field| {
                Field::parse(field).ok_or_else(|| ConfigError::UnknownField {
                    value: name.to_string(),
                    field: field.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => DEFAULT_FIELDS.to_vec(),
    };

    let field_separator = pick(&over.field_separator, &module.field_separator)
        .cloned()
        .unwrap_or_else(|| DEFAULT_FIELD_SEPARATOR.to_string());

    let prefix = pick(&over.prefix, &module.prefix)
        .cloned()
        .unwrap_or_default();

    let name_id = over.name_id.or(module.name_id).unwrap_or(false);

    Ok(EffectiveConfig {
        user_id,
        if_user,
        target_id,
        target_transform,
        if_target,
        source_id,
        salt,
        hash_function,
        fields,
        field_separator,
        prefix,
        name_id,
    })
}

/// Compile an admission filter. Absent and explicitly-empty pattern lists
/// both mean "no filter" (admit everything).
fn compile_filter(
    name: &str,
    patterns: Option<&Vec<String>>,
) -> Result<Option<Vec<Regex>>, ConfigError> {
    match patterns {
        None => Ok(None),
        Some(patterns) if patterns.is_empty() => Ok(None),
        Some(patterns) => patterns
            .iter()
            .map(|pattern| compile_pattern(name, pattern))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
    }
}

fn compile_pattern(name: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        value: name.to_string(),
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })
}

fn parse_paths<S: AsRef<str>>(name: &str, specs: &[S]) -> Result<Vec<AttributePath>, ConfigError> {
    specs
        .iter()
        .map(|spec| parse_path(name, spec.as_ref()))
        .collect()
}

/// Parse a path specifier: `"Key"` or `"Key/sub"`. A trailing slash is
/// tolerated; deeper paths and empty keys are configuration errors.
fn parse_path(name: &str, spec: &str) -> Result<AttributePath, ConfigError> {
    let invalid = |detail: &str| ConfigError::InvalidPath {
        value: name.to_string(),
        path: spec.to_string(),
        detail: detail.to_string(),
    };

    let mut parts = spec.split('/');
    let key = parts.next().unwrap_or("");
    if key.is_empty() {
        return Err(invalid("empty top-level key"));
    }
    let sub = parts.next().filter(|part| !part.is_empty());
    if parts.next().is_some() {
        return Err(invalid("more than two levels deep"));
    }

    Ok(match sub {
        Some(sub) => AttributePath::nested(key, sub),
        None => AttributePath::top(key),
    })
}
