//! Structured name-identifier output.
//!
//! When a value is configured with `name_id = true`, the derived token is
//! packaged with its source/target qualifiers and handed to a
//! [`NameIdEncoder`] for serialization. The default encoder renders a
//! SAML 2.0 `NameID` element; hosts embedding the pipeline in a full
//! protocol stack can supply their own encoder instead.

use serde::{Deserialize, Serialize};

/// SAML 2.0 persistent name-identifier format URN.
pub const FORMAT_PERSISTENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";

/// A derived token with its qualifiers, ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdentifier {
    /// The derived (possibly prefixed) token.
    pub value: String,
    /// Identifier of the issuing identity provider, when resolved.
    pub source_qualifier: Option<String>,
    /// Identifier of the requesting service, when resolved.
    pub target_qualifier: Option<String>,
}

/// Serializer seam for structured output.
pub trait NameIdEncoder {
    /// Render `name_id` for embedding in an outgoing protocol message.
    fn encode(&self, name_id: &NameIdentifier) -> String;
}

/// Default encoder producing a SAML 2.0 `NameID` element with the
/// persistent format.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlNameIdEncoder;

impl NameIdEncoder for XmlNameIdEncoder {
    fn encode(&self, name_id: &NameIdentifier) -> String {
        let mut attrs = format!(
            " xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" Format=\"{}\"",
            FORMAT_PERSISTENT
        );
        if let Some(ref source) = name_id.source_qualifier {
            attrs.push_str(&format!(" NameQualifier=\"{}\"", xml_escape(source)));
        }
        if let Some(ref target) = name_id.target_qualifier {
            attrs.push_str(&format!(" SPNameQualifier=\"{}\"", xml_escape(target)));
        }
        format!(
            "<saml:NameID{}>{}</saml:NameID>",
            attrs,
            xml_escape(&name_id.value)
        )
    }
}

/// Minimal XML escaping for attribute values and text content.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_with_both_qualifiers() {
        let name_id = NameIdentifier {
            value: "abc123".into(),
            source_qualifier: Some("https://idp.example.org".into()),
            target_qualifier: Some("https://sp.example.org".into()),
        };
        let xml = XmlNameIdEncoder.encode(&name_id);
        assert_eq!(
            xml,
            "<saml:NameID xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" \
             Format=\"urn:oasis:names:tc:SAML:2.0:nameid-format:persistent\" \
             NameQualifier=\"https://idp.example.org\" \
             SPNameQualifier=\"https://sp.example.org\">abc123</saml:NameID>"
        );
    }

    #[test]
    fn test_encode_omits_absent_qualifiers() {
        let name_id = NameIdentifier {
            value: "abc123".into(),
            source_qualifier: None,
            target_qualifier: None,
        };
        let xml = XmlNameIdEncoder.encode(&name_id);
        assert!(!xml.contains("NameQualifier"));
        assert!(!xml.contains("SPNameQualifier"));
        assert!(xml.contains(">abc123</saml:NameID>"));
    }

    #[test]
    fn test_encode_escapes_markup() {
        let name_id = NameIdentifier {
            value: "a<b>&\"c".into(),
            source_qualifier: Some("idp&co".into()),
            target_qualifier: None,
        };
        let xml = XmlNameIdEncoder.encode(&name_id);
        assert!(xml.contains("a&lt;b&gt;&amp;&quot;c"));
        assert!(xml.contains("NameQualifier=\"idp&amp;co\""));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("<tag>"), "&lt;tag&gt;");
        assert_eq!(xml_escape("a & b"), "a &amp; b");
    }
}
