use clap::{Args, Subcommand};

pub mod handler;
mod types;

pub use handler::handle_commands as pin_handler;

#[derive(Args, Clone)]
pub struct PinArgs {
    #[command(subcommand)]
    pub commands: PinCommands,
}

#[derive(Subcommand, Clone)]
#[command(subcommand_help_heading = "Pin")]
pub enum PinCommands {
    /// List the pinned authority identities
    List,

    /// Forget a pinned authority, the next invitation of that kind is trusted on first use again
    Reset(ResetArgs),
}

#[derive(Args, Clone)]
pub struct ResetArgs {
    /// ca or company
    #[arg(long, required(true))]
    pub kind: String,

    #[arg(long, required(true))]
    pub reason: String,

    /// Required, resetting a pin is never implicit
    #[arg(long)]
    pub confirm: bool,
}
