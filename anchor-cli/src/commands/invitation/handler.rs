use cli_table::{print_stdout, WithTitle};

use rst_common::with_logging::log::{debug, info};

use prople_anchor_core::invitation::{AttachmentExtractor, AttachmentPayload, FormatDetector};
use prople_anchor_core::verifiable::{ProofValidator, VerifierBuilder};

use crate::commands::handler::ContextHandler;
use crate::types::CliError;

use super::types::{AttachmentRow, InvitationRow, InvitationSummary};
use super::InvitationCommands;

pub async fn handle_commands(
    ctx: &ContextHandler,
    commands: InvitationCommands,
) -> Result<(), CliError> {
    debug!("invitation command handler triggered...");

    match commands {
        InvitationCommands::Inspect(args) => {
            debug!("[invitation:inspect] triggered...");

            let (summary, attachments) = inspect(&ctx.wallet().validator(), &args.raw).await?;
            print_stdout(vec![summary].with_title())
                .map_err(|err| CliError::TableError(err.to_string()))?;

            if !attachments.is_empty() {
                print_stdout(attachments.with_title())
                    .map_err(|err| CliError::TableError(err.to_string()))?;
            }
        }
        InvitationCommands::List => {
            debug!("[invitation:list] triggered...");

            let wallet = ctx.wallet();
            let records = wallet
                .invitations()
                .list(&wallet.wallet_id())
                .await
                .map_err(|err| CliError::InvitationError(err.to_string()))?;

            info!("[invitation:list] total: {}", records.len());
            let rows: Vec<InvitationRow> = records.iter().map(InvitationRow::from).collect();
            print_stdout(rows.with_title()).map_err(|err| CliError::TableError(err.to_string()))?;
        }
    }

    Ok(())
}

/// `inspect` classifies the invitation and validates its credential attachments
pub(crate) async fn inspect<TVerifier>(
    validator: &ProofValidator<TVerifier>,
    raw: &str,
) -> Result<(InvitationSummary, Vec<AttachmentRow>), CliError>
where
    TVerifier: VerifierBuilder,
{
    let classified =
        FormatDetector::detect(raw).map_err(|err| CliError::InvitationError(err.to_string()))?;

    let mut rows = Vec::new();
    for attachment in AttachmentExtractor::extract(classified.invitation()) {
        let result = match &attachment.payload {
            AttachmentPayload::Credential(credential) => Some(validator.validate(credential).await),
            AttachmentPayload::PresentationRequest(_) => None,
        };

        rows.push(AttachmentRow::new(&attachment, result.as_ref()));
    }

    Ok((InvitationSummary::from(&classified), rows))
}
