//! `connection` routes a connection to the local transport or to a remote agent
pub mod types;
pub use types::{
    ConnectionError, ConnectionPair, ConnectionRoute, ExecutionContext, MessageHandler,
    OutboundMessage, RemoteAcceptance, RemoteAgentBuilder, RemoteInvitation, TransportBuilder,
    TransportConnection, TransportState,
};

pub mod retry;
pub use retry::{retry, Attempt, Clock, RetryError, RetryPolicy, TokioClock};

mod repository;
pub use repository::{ConnectionRepository, CONNECTION_KEYSPACE};

mod inbound;
pub use inbound::InboundRelay;

mod router;
pub use router::{
    ConnectionRouter, CreatedInvitation, CredentialResponse, InvitationOptions, RouteOutcome,
};
