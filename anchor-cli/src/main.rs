use clap::{Parser, Subcommand};

use rst_common::with_logging::log::error;
use rst_common::with_tokio::tokio;
use rst_common::with_tracing::tracing_subscriber::{
    self, layer::SubscriberExt, util::SubscriberInitExt,
};

use prople_anchor_cli::commands::handler::ContextHandler;
use prople_anchor_cli::commands::invitation::{invitation_handler, InvitationArgs};
use prople_anchor_cli::commands::pin::{pin_handler, PinArgs};
use prople_anchor_cli::commands::request::{request_handler, RequestArgs};
use prople_anchor_cli::types::CliError;
use prople_anchor_cli::utils::homedir::config_path;

#[derive(Parser)]
#[command(name = "prople-anchor-cli")]
#[command(version = "0.1.0")]
#[command(long_about = None)]
struct Cli {
    /// Wallet configuration file, defaults to ~/.anchor/anchor.toml
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and list invitations
    Invitation(InvitationArgs),

    /// Manage pinned authority identities
    Pin(PinArgs),

    /// Review inbound connection requests
    Request(RequestArgs),
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = ContextHandler::open(config_path(cli.config)?)?;

    match cli.command {
        Commands::Invitation(args) => invitation_handler(&ctx, args.commands).await,
        Commands::Pin(args) => pin_handler(&ctx, args.commands).await,
        Commands::Request(args) => request_handler(&ctx, args.commands).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=info,prople_anchor_core=info,prople_anchor_wallet=info",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    if let Err(err) = run(Cli::parse()).await {
        error!("{}", err);
        std::process::exit(1);
    }
}
