use cli_table::{print_stdout, WithTitle};

use rst_common::standard::serde_json::{json, Value};
use rst_common::with_logging::log::{debug, info, warn};

use prople_anchor_core::request::Decision;

use crate::commands::handler::ContextHandler;
use crate::types::CliError;

use super::types::RequestRow;
use super::{DecideArgs, RequestCommands};

pub async fn handle_commands(
    ctx: &ContextHandler,
    commands: RequestCommands,
) -> Result<(), CliError> {
    debug!("request command handler triggered...");

    let wallet = ctx.wallet();
    let queue = wallet.requests();

    match commands {
        RequestCommands::List(args) => {
            debug!("[request:list] all: {}", args.all);

            let records = match args.all {
                true => queue.list_all(&wallet.wallet_id()).await,
                false => queue.list_pending(&wallet.wallet_id()).await,
            }
            .map_err(|err| CliError::RequestError(err.to_string()))?;

            let rows: Vec<RequestRow> = records.iter().map(RequestRow::from).collect();
            print_stdout(rows.with_title()).map_err(|err| CliError::TableError(err.to_string()))?;
        }
        RequestCommands::Accept(args) => {
            decide(ctx, args, Decision::Accepted).await?;
        }
        RequestCommands::Reject(args) => {
            decide(ctx, args, Decision::Rejected).await?;
        }
    }

    Ok(())
}

async fn decide(ctx: &ContextHandler, args: DecideArgs, decision: Decision) -> Result<(), CliError> {
    let wallet = ctx.wallet();
    let found = wallet
        .requests()
        .handle_request(&wallet.wallet_id(), &args.id, decision, Some(decision_metadata(&args)))
        .await
        .map_err(|err| CliError::RequestError(err.to_string()))?;

    match found {
        true => info!("[request:decide] request: {} | decision: {:?}", args.id, decision),
        false => warn!("[request:decide] unknown request: {}", args.id),
    }

    Ok(())
}

pub(crate) fn decision_metadata(args: &DecideArgs) -> Value {
    match &args.note {
        Some(note) => json!({"decided_by": "cli", "note": note}),
        None => json!({"decided_by": "cli"}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_metadata() {
        let args = DecideArgs {
            id: "req-1".to_string(),
            note: Some("known colleague".to_string()),
        };
        assert_eq!(decision_metadata(&args)["note"], json!("known colleague"));

        let args = DecideArgs {
            id: "req-1".to_string(),
            note: None,
        };
        assert_eq!(decision_metadata(&args), json!({"decided_by": "cli"}))
    }
}
