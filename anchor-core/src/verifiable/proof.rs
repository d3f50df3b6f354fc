use std::collections::BTreeMap;

use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Map, Value};

use super::types::VerifiableError;

pub const CREDENTIAL_MARKERS: [&str; 4] =
    ["type", "credentialSubject", "credentialType", "credential_type"];

const TYPE_FIELDS: [&str; 4] = ["type", "@type", "credentialType", "credential_type"];
const ISSUED_FIELDS: [&str; 3] = ["issuanceDate", "validFrom", "issued_at"];
const EXPIRES_FIELDS: [&str; 3] = ["expirationDate", "validUntil", "expires_at"];
const SIGNATURE_FIELDS: [&str; 3] = ["proof", "signature", "jws"];
const DISCLOSED_FIELDS: [&str; 2] = ["disclosed", "revealed"];

/// `CredentialProof` is the decoded payload of a credential attachment
///
/// Senders encode credentials with different field names (`issuanceDate` or `validFrom`,
/// `credentialSubject` or `claims`, ...), [`CredentialProof::from_value`] normalizes them.
/// The claim set may be partial when the presenter used selective disclosure, `revealed` then
/// lists the fields they chose to show. Timestamps are kept as sent and parsed on access so a
/// malformed date is reported by the validator instead of dropping the whole credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(crate = "self::serde")]
pub struct CredentialProof {
    types: Vec<String>,
    issuer: Option<String>,
    subject: Option<String>,
    issued_at: Option<String>,
    expires_at: Option<String>,
    claims: BTreeMap<String, Value>,
    signature: Option<Value>,
    revealed: Option<Vec<String>>,
}

impl CredentialProof {
    pub fn new(types: Vec<String>, issuer: impl Into<String>) -> Self {
        Self {
            types,
            issuer: Some(issuer.into()),
            ..Default::default()
        }
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.claims.insert(name.into(), value);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_validity(mut self, issued_at: Option<String>, expires_at: Option<String>) -> Self {
        self.issued_at = issued_at;
        self.expires_at = expires_at;
        self
    }

    pub fn with_signature(mut self, signature: Value) -> Self {
        self.signature = Some(signature);
        self
    }

    /// `has_credential_marker` tells whether a decoded object looks like a credential at all
    pub fn has_credential_marker(value: &Value) -> bool {
        value
            .as_object()
            .map(|obj| CREDENTIAL_MARKERS.iter().any(|marker| obj.contains_key(*marker)))
            .unwrap_or(false)
    }

    pub fn from_value(value: &Value) -> Result<Self, VerifiableError> {
        let obj = value.as_object().ok_or(VerifiableError::DecodeError(
            "credential payload is not an object".to_string(),
        ))?;

        if !Self::has_credential_marker(value) {
            return Err(VerifiableError::DecodeError(
                "credential marker is missing".to_string(),
            ));
        }

        let types = first_field(obj, &TYPE_FIELDS)
            .map(string_list)
            .unwrap_or_default();

        let issuer = obj
            .get("issuer")
            .or_else(|| obj.get("iss"))
            .and_then(|issuer| match issuer {
                Value::String(id) => Some(id.to_owned()),
                Value::Object(issuer_obj) => issuer_obj
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            });

        let subject_value = match obj.get("credentialSubject") {
            Some(Value::Array(subjects)) => subjects.first().cloned(),
            Some(subject) => Some(subject.to_owned()),
            None => obj.get("claims").cloned(),
        };

        let mut subject = None;
        let mut claims = BTreeMap::new();
        if let Some(Value::Object(fields)) = subject_value {
            for (name, value) in fields {
                if name == "id" {
                    subject = value.as_str().map(str::to_string);
                    continue;
                }

                claims.insert(name, value);
            }
        }

        let issued_at = first_field(obj, &ISSUED_FIELDS).and_then(as_timestamp);
        let expires_at = first_field(obj, &EXPIRES_FIELDS).and_then(as_timestamp);
        let signature = first_field(obj, &SIGNATURE_FIELDS).cloned();
        let revealed = first_field(obj, &DISCLOSED_FIELDS).map(string_list);

        Ok(Self {
            types,
            issuer,
            subject,
            issued_at,
            expires_at,
            claims,
            signature,
            revealed,
        })
    }

    /// `to_value` renders the proof back into a credential shaped JSON object, used when the
    /// proof travels inside an outbound message
    pub fn to_value(&self) -> Value {
        let mut subject = Map::new();
        if let Some(id) = &self.subject {
            subject.insert("id".to_string(), Value::String(id.to_owned()));
        }

        for (name, value) in &self.claims {
            subject.insert(name.to_owned(), value.to_owned());
        }

        let mut obj = Map::new();
        obj.insert(
            "type".to_string(),
            Value::Array(self.types.iter().cloned().map(Value::String).collect()),
        );
        obj.insert("credentialSubject".to_string(), Value::Object(subject));

        if let Some(issuer) = &self.issuer {
            obj.insert("issuer".to_string(), Value::String(issuer.to_owned()));
        }

        if let Some(issued) = &self.issued_at {
            obj.insert("issuanceDate".to_string(), Value::String(issued.to_owned()));
        }

        if let Some(expires) = &self.expires_at {
            obj.insert("expirationDate".to_string(), Value::String(expires.to_owned()));
        }

        if let Some(signature) = &self.signature {
            obj.insert("proof".to_string(), signature.to_owned());
        }

        if let Some(revealed) = &self.revealed {
            obj.insert(
                "disclosed".to_string(),
                Value::Array(revealed.iter().cloned().map(Value::String).collect()),
            );
        }

        Value::Object(obj)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, VerifiableError> {
        serde_json::to_vec(&self.to_value())
            .map_err(|err| VerifiableError::DecodeError(err.to_string()))
    }

    /// `disclose` builds the proof a presenter sends when revealing only `fields`
    ///
    /// Claims outside of `fields` are dropped, requested fields the credential doesn't carry are
    /// simply not revealed
    pub fn disclose(&self, fields: &[String]) -> Self {
        let claims: BTreeMap<String, Value> = self
            .claims
            .iter()
            .filter(|(name, _)| fields.contains(name))
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();

        let revealed = claims.keys().cloned().collect();

        Self {
            claims,
            revealed: Some(revealed),
            ..self.clone()
        }
    }

    /// `disclosed_claims` is the claim view allowed to be rendered
    pub fn disclosed_claims(&self) -> BTreeMap<String, Value> {
        match &self.revealed {
            Some(fields) => self
                .claims
                .iter()
                .filter(|(name, _)| fields.contains(name))
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect(),
            None => self.claims.to_owned(),
        }
    }

    pub fn get_types(&self) -> &[String] {
        &self.types
    }

    pub fn get_issuer(&self) -> Option<String> {
        self.issuer.to_owned()
    }

    pub fn get_subject(&self) -> Option<String> {
        self.subject.to_owned()
    }

    pub fn get_claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn get_claims(&self) -> &BTreeMap<String, Value> {
        &self.claims
    }

    pub fn get_signature(&self) -> Option<&Value> {
        self.signature.as_ref()
    }

    pub fn get_revealed(&self) -> Option<&[String]> {
        self.revealed.as_deref()
    }

    pub fn get_issued_at_raw(&self) -> Option<&str> {
        self.issued_at.as_deref()
    }

    pub fn get_expires_at_raw(&self) -> Option<&str> {
        self.expires_at.as_deref()
    }

    pub fn issued_at(&self) -> Result<Option<DateTime<Utc>>, VerifiableError> {
        parse_timestamp(self.issued_at.as_deref())
    }

    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>, VerifiableError> {
        parse_timestamp(self.expires_at.as_deref())
    }
}

fn first_field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name))
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(single) => vec![single.to_owned()],
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn as_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::String(ts) => Some(ts.to_owned()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, VerifiableError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp(secs, 0)
            .map(Some)
            .ok_or(VerifiableError::DecodeError(format!(
                "timestamp out of range: {}",
                raw
            )));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|err| VerifiableError::DecodeError(format!("invalid timestamp {}: {}", raw, err)))
}
