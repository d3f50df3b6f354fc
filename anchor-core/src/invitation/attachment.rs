use std::collections::HashSet;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, warn};

use crate::trust::AuthorityKind;
use crate::verifiable::CredentialProof;

use super::detector::decode_base64;
use super::types::Invitation;

/// attachment fields in precedence order, the modern one first
pub const ATTACHMENT_FIELDS: [(&str, AttachmentField); 3] = [
    ("requests_attach", AttachmentField::Modern),
    ("attachments", AttachmentField::Legacy),
    ("requests~attach", AttachmentField::Legacy),
];

pub const CREDENTIAL_ATTACHMENT_IDS: [&str; 3] =
    ["credential-proof", "verifiable-credential", "vc-proof"];

pub const PRESENTATION_REQUEST_IDS: [&str; 2] = ["presentation-request", "request-presentation"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum AttachmentField {
    Modern,
    Legacy,
}

/// `AttachmentEncoding` are the known payload encodings, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum AttachmentEncoding {
    /// `data.json` holding the object itself
    JsonObject,

    /// `data.base64` holding base64 encoded json
    Base64Json,

    /// `data.json` holding a string, either base64 encoded json or json text
    EncodedJsonString,
}

impl AttachmentEncoding {
    pub const PIPELINE: [AttachmentEncoding; 3] = [
        AttachmentEncoding::JsonObject,
        AttachmentEncoding::Base64Json,
        AttachmentEncoding::EncodedJsonString,
    ];

    pub fn decode(&self, data: &Value) -> Option<Value> {
        let decoded = match self {
            AttachmentEncoding::JsonObject => data.get("json").filter(|json| json.is_object()).cloned(),
            AttachmentEncoding::Base64Json => data
                .get("base64")
                .and_then(Value::as_str)
                .and_then(decode_base64)
                .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok()),
            AttachmentEncoding::EncodedJsonString => {
                data.get("json").and_then(Value::as_str).and_then(|text| {
                    serde_json::from_str::<Value>(text)
                        .ok()
                        .filter(Value::is_object)
                        .or_else(|| {
                        decode_base64(text)
                            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
                    })
                })
            }
        };

        decoded.filter(|value| value.is_object())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case", tag = "kind", content = "authority")]
pub enum AttachmentKind {
    AuthorityCredential(AuthorityKind),
    CredentialProof,
    PresentationRequest,
    Unknown,
}

impl AttachmentKind {
    pub fn from_id(id: &str) -> Self {
        if let Some(kind) = AuthorityKind::from_attachment_id(id) {
            return AttachmentKind::AuthorityCredential(kind);
        }

        if CREDENTIAL_ATTACHMENT_IDS.contains(&id) {
            return AttachmentKind::CredentialProof;
        }

        if PRESENTATION_REQUEST_IDS.contains(&id) {
            return AttachmentKind::PresentationRequest;
        }

        AttachmentKind::Unknown
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentPayload {
    Credential(CredentialProof),
    PresentationRequest(Value),
}

/// `ExtractedAttachment` is one decoded attachment with where and how it was found
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAttachment {
    pub id: String,
    pub mime_type: Option<String>,
    pub kind: AttachmentKind,
    pub field: AttachmentField,
    pub encoding: AttachmentEncoding,
    pub payload: AttachmentPayload,
}

impl ExtractedAttachment {
    pub fn credential(&self) -> Option<&CredentialProof> {
        match &self.payload {
            AttachmentPayload::Credential(credential) => Some(credential),
            AttachmentPayload::PresentationRequest(_) => None,
        }
    }

    pub fn authority(&self) -> Option<AuthorityKind> {
        match self.kind {
            AttachmentKind::AuthorityCredential(kind) => Some(kind),
            _ => None,
        }
    }
}

/// `AttachmentExtractor` collects typed attachments from an invitation or any protocol message
///
/// Extraction never fails: an absent field or a payload no decoder understands is logged and
/// skipped, the caller just sees fewer attachments
pub struct AttachmentExtractor;

impl AttachmentExtractor {
    pub fn extract(invitation: &Invitation) -> Vec<ExtractedAttachment> {
        Self::extract_from(invitation.get_body())
    }

    pub fn extract_from(message: &Value) -> Vec<ExtractedAttachment> {
        let mut extracted: Vec<ExtractedAttachment> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (name, field) in ATTACHMENT_FIELDS {
            let Some(entries) = message.get(name).and_then(Value::as_array) else {
                continue;
            };

            for entry in entries {
                let Some(id) = entry
                    .get("@id")
                    .or_else(|| entry.get("id"))
                    .and_then(Value::as_str)
                else {
                    warn!("[extractor:extract] attachment without id in {}", name);
                    continue;
                };

                if seen.contains(id) {
                    debug!("[extractor:extract] skip duplicated attachment: {} in {}", id, name);
                    continue;
                }

                match Self::decode_entry(id, entry, field) {
                    Some(attachment) => {
                        seen.insert(id.to_string());
                        extracted.push(attachment);
                    }
                    None => warn!("[extractor:extract] undecodable attachment: {} in {}", id, name),
                }
            }
        }

        extracted
    }

    /// `credentials` keeps only the credential attachments
    pub fn credentials(message: &Value) -> Vec<ExtractedAttachment> {
        Self::extract_from(message)
            .into_iter()
            .filter(|attachment| attachment.credential().is_some())
            .collect()
    }

    pub fn authority_credential(
        invitation: &Invitation,
        kind: AuthorityKind,
    ) -> Option<CredentialProof> {
        Self::extract(invitation)
            .into_iter()
            .find(|attachment| attachment.authority() == Some(kind))
            .and_then(|attachment| attachment.credential().cloned())
    }

    fn decode_entry(id: &str, entry: &Value, field: AttachmentField) -> Option<ExtractedAttachment> {
        let data = entry.get("data")?;
        let kind = AttachmentKind::from_id(id);
        let mime_type = entry
            .get("mime-type")
            .or_else(|| entry.get("media_type"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let wants_credential = !matches!(kind, AttachmentKind::PresentationRequest);
        let (encoding, value) = AttachmentEncoding::PIPELINE.iter().find_map(|encoding| {
            encoding
                .decode(data)
                .filter(|value| !wants_credential || CredentialProof::has_credential_marker(value))
                .map(|value| (*encoding, value))
        })?;

        let payload = match wants_credential {
            true => AttachmentPayload::Credential(CredentialProof::from_value(&value).ok()?),
            false => AttachmentPayload::PresentationRequest(value),
        };

        Some(ExtractedAttachment {
            id: id.to_string(),
            mime_type,
            kind,
            field,
            encoding,
            payload,
        })
    }
}
