use clap::{Args, Subcommand};

pub mod handler;
mod types;

pub use handler::handle_commands as invitation_handler;

#[derive(Args, Clone)]
pub struct InvitationArgs {
    #[command(subcommand)]
    pub commands: InvitationCommands,
}

#[derive(Subcommand, Clone)]
#[command(subcommand_help_heading = "Invitation")]
pub enum InvitationCommands {
    /// Parse an invitation (URL, JSON, base64 or peer DID) and show what it carries, nothing is
    /// recorded
    Inspect(InspectArgs),

    /// List the invitations known by this wallet
    List,
}

#[derive(Args, Clone)]
pub struct InspectArgs {
    #[arg(required(true))]
    pub raw: String,
}
