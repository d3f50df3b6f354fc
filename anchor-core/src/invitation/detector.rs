use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use url::Url;

use rst_common::standard::serde::{self, Deserialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::debug;

use crate::trust::AuthorityKind;

use super::types::{
    ClassifiedInvitation, Dialect, Invitation, InvitationError, InvitationFormat, MessageType,
    INVITATION_QUERY_PARAMS, PEER_DID_PREFIX,
};

#[derive(Deserialize, Default)]
#[serde(crate = "self::serde")]
struct WireBody {
    goal_code: Option<String>,
    goal: Option<String>,

    #[serde(default)]
    accept: Vec<String>,
}

/// `WireHeader` are the invitation fields shared by every dialect, the legacy names are aliases
#[derive(Deserialize)]
#[serde(crate = "self::serde")]
struct WireHeader {
    #[serde(rename = "type", alias = "@type")]
    message_type: Option<String>,

    #[serde(alias = "@id")]
    id: Option<String>,

    #[serde(alias = "did")]
    from: Option<String>,

    label: Option<String>,
    goal_code: Option<String>,
    goal: Option<String>,

    #[serde(default)]
    accept: Option<Vec<String>>,

    #[serde(default)]
    body: Option<WireBody>,
}

/// `FormatDetector` classifies raw invitation text
///
/// Accepted inputs:
///
/// - a bare peer DID (`did:peer:...`)
/// - a URL carrying the encoded invitation in one of [`INVITATION_QUERY_PARAMS`]
/// - the encoded payload alone, or the JSON itself
///
/// Detection is pure, it never touches storage
pub struct FormatDetector;

impl FormatDetector {
    pub fn detect(raw: &str) -> Result<ClassifiedInvitation, InvitationError> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(InvitationError::MalformedInvitation(
                "empty invitation".to_string(),
            ));
        }

        let payload = Self::extract_payload(input)?;
        if payload.starts_with(PEER_DID_PREFIX) {
            debug!("[detector:detect] raw peer identifier");
            return Ok(ClassifiedInvitation::RawIdentifier(Invitation::from_peer_did(
                &payload, raw,
            )));
        }

        let value = Self::decode_json(&payload)?;
        Self::classify(value, raw)
    }

    /// `extract_payload` pulls the encoded invitation out of a URL, other inputs are returned
    /// percent decoded
    fn extract_payload(input: &str) -> Result<String, InvitationError> {
        if input.starts_with(PEER_DID_PREFIX) || input.starts_with('{') {
            return Ok(input.to_string());
        }

        let Ok(url) = Url::parse(input) else {
            let decoded = urlencoding::decode(input)
                .map(|decoded| decoded.into_owned())
                .unwrap_or(input.to_string());
            return Ok(decoded);
        };

        INVITATION_QUERY_PARAMS
            .iter()
            .find_map(|name| {
                url.query_pairs()
                    .find(|(key, value)| key == name && !value.is_empty())
                    .map(|(_, value)| value.into_owned())
            })
            .ok_or(InvitationError::MalformedInvitation(
                "no invitation payload found in url".to_string(),
            ))
    }

    fn decode_json(payload: &str) -> Result<Value, InvitationError> {
        let value = match payload.trim_start().starts_with('{') {
            true => serde_json::from_str::<Value>(payload)
                .map_err(|err| InvitationError::MalformedInvitation(err.to_string()))?,
            false => {
                let bytes = decode_base64(payload).ok_or(InvitationError::MalformedInvitation(
                    "payload is neither json nor base64".to_string(),
                ))?;

                serde_json::from_slice::<Value>(&bytes)
                    .map_err(|err| InvitationError::MalformedInvitation(err.to_string()))?
            }
        };

        match value.is_object() {
            true => Ok(value),
            false => Err(InvitationError::MalformedInvitation(
                "invitation payload is not a json object".to_string(),
            )),
        }
    }

    fn classify(value: Value, raw: &str) -> Result<ClassifiedInvitation, InvitationError> {
        let header = serde_json::from_value::<WireHeader>(value.clone())
            .map_err(|err| InvitationError::MalformedInvitation(err.to_string()))?;

        let body = header.body.unwrap_or_default();
        let goal_code = body.goal_code.or(header.goal_code);
        let goal = body.goal.or(header.goal);
        let accept = match body.accept.is_empty() {
            true => header.accept.unwrap_or_default(),
            false => body.accept,
        };

        let authority = AuthorityKind::from_goal(goal_code.as_deref(), goal.as_deref());
        let format_by_type = header
            .message_type
            .as_deref()
            .and_then(MessageType::parse)
            .and_then(|message_type| message_type.format());

        let format = match (authority, format_by_type) {
            (Some(_), _) => InvitationFormat::Standard,
            (None, Some(format)) => format,
            (None, None) => {
                return Err(InvitationError::MalformedInvitation(format!(
                    "unknown invitation type: {}",
                    header.message_type.unwrap_or("<missing>".to_string())
                )))
            }
        };

        let id = header.id.ok_or(InvitationError::MalformedInvitation(
            "missing invitation id".to_string(),
        ))?;

        let from = header.from.ok_or(InvitationError::MalformedInvitation(
            "missing invitation originator".to_string(),
        ))?;

        let dialect = authority.map(Dialect::Authority).unwrap_or(Dialect::PeerToPeer);
        debug!(
            "[detector:classify] id: {} | format: {:?} | dialect: {:?}",
            id, format, dialect
        );

        let invitation = Invitation::new(
            id,
            from,
            header.label,
            goal_code,
            goal,
            accept,
            header.message_type,
            format,
            dialect,
            value,
            raw.to_string(),
        );

        match format {
            InvitationFormat::Legacy => Ok(ClassifiedInvitation::Legacy(invitation)),
            _ => Ok(ClassifiedInvitation::Standard(invitation)),
        }
    }
}

/// `decode_base64` accepts both alphabets, padded or not. A `+` turned into a space by a query
/// string encoder is restored first
pub(crate) fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let normalized: String = text
        .trim()
        .trim_end_matches('=')
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| match c {
            '+' | ' ' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_NO_PAD.decode(normalized.as_bytes()).ok()
}
