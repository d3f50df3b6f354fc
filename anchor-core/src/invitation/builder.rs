use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use rst_common::standard::serde_json::{self, json, Value};
use rst_common::standard::uuid::Uuid;

use crate::verifiable::CredentialProof;

use super::detector::FormatDetector;
use super::types::{ClassifiedInvitation, InvitationError, OOB_V2_INVITATION_TYPE};

pub const DEFAULT_ACCEPT: [&str; 1] = ["didcomm/v2"];

/// `InvitationBuilder` generates an out-of-band 2.0 invitation for the inviter side
///
/// ```ignore
/// let classified = InvitationBuilder::new("did:peer:2.alice")
///     .label("Alice")
///     .goal("ca-identity-verification", "Verify your identity")
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct InvitationBuilder {
    id: String,
    from: String,
    label: Option<String>,
    goal_code: Option<String>,
    goal: Option<String>,
    accept: Vec<String>,
    attachments: Vec<Value>,
}

impl InvitationBuilder {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from: from.into(),
            label: None,
            goal_code: None,
            goal: None,
            accept: DEFAULT_ACCEPT.iter().map(|media| media.to_string()).collect(),
            attachments: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn goal(mut self, goal_code: impl Into<String>, goal: impl Into<String>) -> Self {
        self.goal_code = Some(goal_code.into());
        self.goal = Some(goal.into());
        self
    }

    /// `attach_credential` embeds the credential as a direct json attachment
    pub fn attach_credential(mut self, attachment_id: &str, credential: &CredentialProof) -> Self {
        self.attachments.push(json!({
            "@id": attachment_id,
            "mime-type": "application/json",
            "data": {"json": credential.to_value()}
        }));
        self
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "type": OOB_V2_INVITATION_TYPE,
            "id": self.id,
            "from": self.from,
            "body": {
                "goal_code": self.goal_code,
                "goal": self.goal,
                "accept": self.accept,
            }
        });

        if let Some(label) = &self.label {
            value["label"] = json!(label);
        }

        if !self.attachments.is_empty() {
            value["requests_attach"] = Value::Array(self.attachments.clone());
        }

        value
    }

    /// `to_url` encodes the invitation into the `oob` query parameter of `base_url`
    pub fn to_url(&self, base_url: &str) -> Result<String, InvitationError> {
        let json = serde_json::to_vec(&self.to_value())
            .map_err(|err| InvitationError::BuildError(err.to_string()))?;

        let separator = match base_url.contains('?') {
            true => '&',
            false => '?',
        };

        Ok(format!(
            "{}{}oob={}",
            base_url,
            separator,
            URL_SAFE_NO_PAD.encode(json)
        ))
    }

    /// `build` runs the generated URL back through [`FormatDetector`], the inviter keeps exactly
    /// what an invitee would parse
    pub fn build(&self, base_url: &str) -> Result<ClassifiedInvitation, InvitationError> {
        let url = self.to_url(base_url)?;
        FormatDetector::detect(&url).map_err(|err| InvitationError::BuildError(err.to_string()))
    }
}
