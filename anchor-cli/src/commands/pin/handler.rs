use cli_table::{print_stdout, WithTitle};

use rst_common::with_logging::log::{debug, info, warn};

use prople_anchor_core::trust::{AuthorityKind, RepinConsent};

use crate::commands::handler::ContextHandler;
use crate::types::CliError;

use super::types::PinRow;
use super::{PinCommands, ResetArgs};

pub async fn handle_commands(ctx: &ContextHandler, commands: PinCommands) -> Result<(), CliError> {
    debug!("pin command handler triggered...");

    let wallet = ctx.wallet();
    let pins = wallet.pins();

    match commands {
        PinCommands::List => {
            debug!("[pin:list] triggered...");

            let identities = pins
                .list(&wallet.wallet_id())
                .await
                .map_err(|err| CliError::PinError(err.to_string()))?;

            let rows: Vec<PinRow> = identities.iter().map(PinRow::from).collect();
            print_stdout(rows.with_title()).map_err(|err| CliError::TableError(err.to_string()))?;
        }
        PinCommands::Reset(args) => {
            debug!("[pin:reset] triggered...");

            let (kind, consent) = reset_consent(&args)?;
            let removed = pins
                .unpin(&wallet.wallet_id(), kind, consent)
                .await
                .map_err(|err| CliError::PinError(err.to_string()))?;

            match removed {
                true => info!("[pin:reset] {} pin removed", kind),
                false => warn!("[pin:reset] no {} pin to remove", kind),
            }
        }
    }

    Ok(())
}

/// `reset_consent` turns the command arguments into an explicit consent
pub(crate) fn reset_consent(args: &ResetArgs) -> Result<(AuthorityKind, RepinConsent), CliError> {
    let kind = AuthorityKind::parse(&args.kind).map_err(|err| CliError::PinError(err.to_string()))?;

    if !args.confirm {
        return Err(CliError::PinError(
            "resetting a pin requires --confirm".to_string(),
        ));
    }

    if args.reason.trim().is_empty() {
        return Err(CliError::PinError(
            "resetting a pin requires a reason".to_string(),
        ));
    }

    Ok((kind, RepinConsent::granted(args.reason.trim())))
}
