//! End-to-end tests for the full derivation pipeline: TOML configuration
//! in, JSON request state in, exact tokens out.

use serde_json::json;

use targetedid_core::generator::{TargetedIdGenerator, OUTPUT_ATTRIBUTE};
use targetedid_core::state::AttributeValues;
use targetedid_core::{HashAlgorithm, ModuleConfig, RequestState};

// ===========================================================================
// Helpers
// ===========================================================================

fn generator(toml_str: &str) -> TargetedIdGenerator {
    let config: ModuleConfig = toml::from_str(toml_str).expect("test config");
    TargetedIdGenerator::new(&config).expect("generator")
}

fn state(value: serde_json::Value) -> RequestState {
    serde_json::from_value(value).expect("state json")
}

fn sample_state() -> RequestState {
    state(json!({
        "Attributes": {
            "uid": ["alice"],
            "schacHomeOrganization": "example.org"
        },
        "saml:RequesterID": "sp1",
        "core:IdP": "idp1"
    }))
}

fn output_values(state: &RequestState) -> Vec<String> {
    match state.attribute(OUTPUT_ATTRIBUTE) {
        Some(AttributeValues::Many(values)) => values.clone(),
        Some(AttributeValues::One(value)) => vec![value.clone()],
        None => Vec::new(),
    }
}

const BASE: &str = r#"
salt = "s3cr3t"
user_id = ["Attributes/uid"]
target_id = ["saml:RequesterID"]
source_id = ["core:IdP"]
fields = ["salt", "user_id", "target_id", "source_id"]
"#;

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_sha256_token_for_known_payload() {
    let generator = generator(BASE);
    let mut state = sample_state();
    generator.process(&mut state);

    // sha256("s3cr3t@@alice@@sp1@@idp1")
    assert_eq!(
        output_values(&state),
        vec!["d6b257138300c680f20b35d8560f1487a0e2d7391dabd2ad689435202c51138e".to_string()]
    );
}

#[test]
fn test_prefix_composition() {
    let toml_str = format!("{}\nprefix = \"urn:mace:example:\"\n", BASE);
    let generator = generator(&toml_str);
    let mut state = sample_state();
    generator.process(&mut state);

    assert_eq!(
        output_values(&state),
        vec![
            "urn:mace:example:d6b257138300c680f20b35d8560f1487a0e2d7391dabd2ad689435202c51138e"
                .to_string()
        ]
    );
}

#[test]
fn test_default_field_order_repeats_salt() {
    // Without an explicit `fields` list the default order applies, which
    // carries the salt at both ends of the payload.
    let toml_str = r#"
salt = "s3cr3t"
user_id = ["Attributes/uid"]
target_id = ["saml:RequesterID"]
source_id = ["core:IdP"]
"#;
    let generator = generator(toml_str);
    let mut state = sample_state();
    generator.process(&mut state);

    // sha256("s3cr3t@@alice@@sp1@@idp1@@s3cr3t")
    assert_eq!(
        output_values(&state),
        vec!["925dd45cac7668c908112a2e1c71adb7f7d74533e2ffd15456ceb6658fc9b3f5".to_string()]
    );
}

#[test]
fn test_sha1_module_setting() {
    let toml_str = format!("{}\nhash_function = \"sha1\"\n", BASE);
    let generator = generator(&toml_str);
    let mut state = sample_state();
    generator.process(&mut state);

    // sha1("s3cr3t@@alice@@sp1@@idp1")
    assert_eq!(
        output_values(&state),
        vec!["55a22c1e0dc2add3787e493d96ff540f95748a30".to_string()]
    );
}

#[test]
fn test_missing_user_still_derives_partial_token() {
    let generator = generator(BASE);
    let mut state = state(json!({
        "saml:RequesterID": "sp1",
        "core:IdP": "idp1"
    }));
    generator.process(&mut state);

    // sha256("s3cr3t@@sp1@@idp1") -- the empty user contributes nothing.
    assert_eq!(
        output_values(&state),
        vec!["01156a962b26e6ca551f10b80ee48fc0b639c242dcb513bb858743e38dc4b8c5".to_string()]
    );
}

#[test]
fn test_source_fallback_chain() {
    // schacHomeOrganization is preferred over core:IdP when present.
    let toml_str = r#"
salt = "s3cr3t"
user_id = ["Attributes/uid"]
target_id = ["saml:RequesterID"]
source_id = ["Attributes/schacHomeOrganization", "core:IdP"]
fields = ["salt", "user_id", "target_id", "source_id"]
"#;
    let generator = generator(toml_str);
    let mut state = sample_state();
    generator.process(&mut state);

    assert_eq!(
        output_values(&state),
        vec![HashAlgorithm::Sha256.hex_digest("s3cr3t@@alice@@sp1@@example.org")]
    );

    // Without the attribute, resolution falls through to core:IdP.
    let mut state = state_without_home_org();
    generator.process(&mut state);
    assert_eq!(
        output_values(&state),
        vec![HashAlgorithm::Sha256.hex_digest("s3cr3t@@alice@@sp1@@idp1")]
    );
}

fn state_without_home_org() -> RequestState {
    state(json!({
        "Attributes": { "uid": ["alice"] },
        "saml:RequesterID": "sp1",
        "core:IdP": "idp1"
    }))
}

#[test]
fn test_target_transform_rewrites_entity_id() {
    let toml_str = r#"
salt = "s3cr3t"
user_id = ["Attributes/uid"]
target_id = ["saml:RequesterID"]
source_id = ["core:IdP"]
fields = ["salt", "user_id", "target_id", "source_id"]

[[values]]
name = "default"

[[values.target_transform]]
pattern = '^https?://([^/]+).*$'
replacement = "$1"
"#;
    let generator = generator(toml_str);
    let mut state = state(json!({
        "Attributes": { "uid": ["alice"] },
        "saml:RequesterID": "https://sp.example.org/shibboleth",
        "core:IdP": "idp1"
    }));
    generator.process(&mut state);

    // sha256("s3cr3t@@alice@@sp.example.org@@idp1")
    assert_eq!(
        output_values(&state),
        vec!["c623b8422a38740d9b7327331b6b35b39a0df0e9e7feacce966c3c93f47c3e15".to_string()]
    );
}

#[test]
fn test_two_values_one_filtered() {
    let toml_str = r#"
salt = "s3cr3t"
user_id = ["Attributes/uid"]
target_id = ["saml:RequesterID"]
source_id = ["core:IdP"]
fields = ["salt", "user_id", "target_id", "source_id"]

[[values]]
name = "everyone"

[[values]]
name = "staff-only"
if_user = ["^staff-"]
"#;
    let generator = generator(toml_str);
    let mut state = sample_state();
    generator.process(&mut state);

    let values = output_values(&state);
    assert_eq!(values.len(), 1);
    assert_eq!(
        values[0],
        HashAlgorithm::Sha256.hex_digest("s3cr3t@@alice@@sp1@@idp1")
    );

    // A matching user receives both tokens, in configured order.
    let mut state = state_for_user("staff-bob");
    generator.process(&mut state);
    let values = output_values(&state);
    assert_eq!(values.len(), 2);
    assert_eq!(values[0], values[1]);
}

fn state_for_user(uid: &str) -> RequestState {
    state(json!({
        "Attributes": { "uid": [uid] },
        "saml:RequesterID": "sp1",
        "core:IdP": "idp1"
    }))
}

#[test]
fn test_name_id_value_renders_saml_element() {
    let toml_str = format!("{}\nname_id = true\n", BASE);
    let generator = generator(&toml_str);
    let mut state = sample_state();
    generator.process(&mut state);

    let values = output_values(&state);
    assert_eq!(values.len(), 1);
    let xml = &values[0];
    assert!(xml.starts_with("<saml:NameID "));
    assert!(xml.contains("Format=\"urn:oasis:names:tc:SAML:2.0:nameid-format:persistent\""));
    assert!(xml.contains("NameQualifier=\"idp1\""));
    assert!(xml.contains("SPNameQualifier=\"sp1\""));
    assert!(xml.contains(&HashAlgorithm::Sha256.hex_digest("s3cr3t@@alice@@sp1@@idp1")));
}

#[test]
fn test_disabled_hash_override_emits_raw_payload() {
    let toml_str = format!(
        "{}\n[[values]]\nname = \"default\"\nhash_function = \"\"\n",
        BASE
    );
    let generator = generator(&toml_str);
    let mut state = sample_state();
    generator.process(&mut state);

    assert_eq!(
        output_values(&state),
        vec!["s3cr3t@@alice@@sp1@@idp1".to_string()]
    );
}

#[test]
fn test_unsupported_algorithm_rejected_before_any_request() {
    let toml_str = format!("{}\nhash_function = \"whirlpool\"\n", BASE);
    let config: ModuleConfig = toml::from_str(&toml_str).expect("toml");
    let result = TargetedIdGenerator::new(&config);
    assert!(result.is_err());
    let message = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("unsupported hash algorithm: whirlpool"));
}

#[test]
fn test_process_is_deterministic_across_requests() {
    let generator = generator(BASE);

    let mut first = sample_state();
    generator.process(&mut first);
    let mut second = sample_state();
    generator.process(&mut second);

    assert_eq!(output_values(&first), output_values(&second));
}
