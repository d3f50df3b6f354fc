use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};

use crate::storage::WalletID;

use super::types::{Invitation, InvitationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum Role {
    Inviter,
    Invitee,
}

/// `Status` is the lifecycle position of an [`InvitationRecord`]
///
/// Inviter: `Generated -> Previewed? -> RequestSent -> Established | Rejected`
///
/// Invitee: `Received -> Previewed -> ConnectionRequestSent -> Established | Rejected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "snake_case")]
pub enum Status {
    Generated,
    Received,
    Previewed,
    RequestSent,
    ConnectionRequestSent,
    Established,
    Rejected,
}

impl Status {
    fn rank(&self) -> u8 {
        match self {
            Status::Generated | Status::Received => 0,
            Status::Previewed => 1,
            Status::RequestSent | Status::ConnectionRequestSent => 2,
            Status::Established | Status::Rejected => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Established | Status::Rejected)
    }

    pub fn is_request_sent(&self) -> bool {
        matches!(self, Status::RequestSent | Status::ConnectionRequestSent)
    }
}

/// `Applied` tells whether a transition changed the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Transition {
    pub status: Status,
    pub at: DateTime<Utc>,
}

/// `InvitationRecord` is the persisted lifecycle of one invitation inside one wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct InvitationRecord {
    wallet: WalletID,
    role: Role,
    status: Status,
    peer_did: Option<String>,
    invitation: Invitation,
    transitions: Vec<Transition>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvitationRecord {
    pub fn generated(wallet: WalletID, invitation: Invitation) -> Self {
        Self::new(wallet, Role::Inviter, Status::Generated, None, invitation)
    }

    pub fn received(wallet: WalletID, invitation: Invitation) -> Self {
        let peer_did = Some(invitation.get_from().to_string());
        Self::new(wallet, Role::Invitee, Status::Received, peer_did, invitation)
    }

    fn new(
        wallet: WalletID,
        role: Role,
        status: Status,
        peer_did: Option<String>,
        invitation: Invitation,
    ) -> Self {
        let now = Utc::now();
        Self {
            wallet,
            role,
            status,
            peer_did,
            invitation,
            transitions: vec![Transition { status, at: now }],
            created_at: now,
            updated_at: now,
        }
    }

    /// `apply` moves the record forward
    ///
    /// - the same or an already passed non terminal status is [`Applied::Unchanged`]
    /// - a different terminal status once terminal is [`InvitationError::InvalidTransition`]
    /// - `Established` requires the request sent status
    /// - the invitee can't skip `Previewed`, the inviter can
    pub fn apply(&mut self, target: Status) -> Result<Applied, InvitationError> {
        self.check_role(target)?;

        if self.status == target {
            return Ok(Applied::Unchanged);
        }

        if self.status.is_terminal() {
            return match target.is_terminal() {
                true => Err(self.invalid(target)),
                false => Ok(Applied::Unchanged),
            };
        }

        match target {
            Status::Rejected => {}
            Status::Established if !self.status.is_request_sent() => {
                return Err(self.invalid(target))
            }
            Status::Established => {}
            _ if target.rank() <= self.status.rank() => return Ok(Applied::Unchanged),
            _ => {
                let skipped = target.rank() - self.status.rank() > 1;
                if skipped && self.role == Role::Invitee {
                    return Err(self.invalid(target));
                }
            }
        }

        let now = Utc::now();
        self.status = target;
        self.updated_at = now;
        self.transitions.push(Transition { status: target, at: now });
        Ok(Applied::Changed)
    }

    fn check_role(&self, target: Status) -> Result<(), InvitationError> {
        let allowed = match target {
            Status::Generated | Status::RequestSent => self.role == Role::Inviter,
            Status::Received | Status::ConnectionRequestSent => self.role == Role::Invitee,
            _ => true,
        };

        match allowed {
            true => Ok(()),
            false => Err(InvitationError::InvalidTransition(format!(
                "{:?} is not a {:?} status",
                target, self.role
            ))),
        }
    }

    fn invalid(&self, target: Status) -> InvitationError {
        InvitationError::InvalidTransition(format!(
            "invitation {}: {:?} -> {:?}",
            self.invitation.get_id(),
            self.status,
            target
        ))
    }

    /// the request sent status matching this record's role
    pub fn request_sent_status(&self) -> Status {
        match self.role {
            Role::Inviter => Status::RequestSent,
            Role::Invitee => Status::ConnectionRequestSent,
        }
    }

    pub fn set_peer_did(&mut self, peer_did: impl Into<String>) {
        self.peer_did = Some(peer_did.into());
        self.updated_at = Utc::now();
    }

    pub fn get_wallet(&self) -> &WalletID {
        &self.wallet
    }

    pub fn get_id(&self) -> &str {
        self.invitation.get_id()
    }

    pub fn get_role(&self) -> Role {
        self.role
    }

    pub fn get_status(&self) -> Status {
        self.status
    }

    pub fn get_peer_did(&self) -> Option<&str> {
        self.peer_did.as_deref()
    }

    pub fn get_invitation(&self) -> &Invitation {
        &self.invitation
    }

    pub fn get_transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
