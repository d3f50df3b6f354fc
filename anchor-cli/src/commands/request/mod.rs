use clap::{Args, Subcommand};

pub mod handler;
mod types;

pub use handler::handle_commands as request_handler;

#[derive(Args, Clone)]
pub struct RequestArgs {
    #[command(subcommand)]
    pub commands: RequestCommands,
}

#[derive(Subcommand, Clone)]
#[command(subcommand_help_heading = "Request")]
pub enum RequestCommands {
    /// List inbound connection requests, oldest first
    List(ListArgs),

    /// Accept a pending request, the agent sends the reply on its next run
    Accept(DecideArgs),

    /// Reject a pending request, it never shows up again
    Reject(DecideArgs),
}

#[derive(Args, Clone)]
pub struct ListArgs {
    /// Include decided requests
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Clone)]
pub struct DecideArgs {
    #[arg(long, required(true))]
    pub id: String,

    #[arg(long)]
    pub note: Option<String>,
}
