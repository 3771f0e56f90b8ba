use super::{progress, AppContext, PreconditionFailed};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use list_sync_sources::{AuthError, TokenSet, TraktClient};
use owo_colors::OwoColorize;
use serde_json::json;
use std::process::ExitCode;

pub async fn run_auth(ctx: &mut AppContext, output: &Output) -> Result<ExitCode> {
    if !ctx.config.is_trakt_configured() {
        return Err(PreconditionFailed::new(
            "Trakt client_id and client_secret are not set. Run `trakt-sync config trakt` first.",
        )
        .into());
    }

    let client = ctx.client();
    let tokens = authorize(&client, output).await?;
    save_tokens(ctx, &tokens)?;

    if output.is_human() {
        output.success("Trakt authorization successful!");
        output.info(format!("  Access token expires at: {}", tokens.expires_at.to_rfc3339().bright_green()));
    }
    output.json(&json!({
        "authenticated": true,
        "expires_at": tokens.expires_at.to_rfc3339(),
    }));
    Ok(ExitCode::SUCCESS)
}

/// Run the device flow end to end: show the code, then poll until the user
/// approves, denies, or the code expires.
pub async fn authorize(client: &TraktClient, output: &Output) -> Result<TokenSet> {
    let code = client
        .request_device_code()
        .await
        .map_err(|e| eyre!("Failed to start device authorization: {}", e))?;

    if output.is_human() {
        output.blank();
        output.info(format!(
            "{} Open {} and enter the code {}",
            "→".bright_blue(),
            code.verification_url.bright_white(),
            code.user_code.bold().bright_cyan()
        ));
        output.blank();
    }
    output.json(&json!({
        "type": "device_code",
        "verification_url": code.verification_url,
        "user_code": code.user_code,
        "expires_in": code.expires_after().as_secs(),
    }));

    let spinner = progress::spinner("Waiting for authorization...", output.is_human());
    let result = client.authorize_device(&code).await;
    spinner.finish_and_clear();

    result.map_err(|e| match e {
        AuthError::Denied => eyre!("Authorization was denied in the browser"),
        AuthError::Expired | AuthError::TimedOut(_) => {
            eyre!("The code expired before it was approved. Run `trakt-sync auth` again.")
        }
        other => eyre!("Trakt authorization failed: {}", other),
    })
}

/// Tokens from an explicit authorization must reach disk, unlike refreshes.
fn save_tokens(ctx: &mut AppContext, tokens: &TokenSet) -> Result<()> {
    ctx.credentials.set_trakt_tokens(
        tokens.access_token.clone(),
        tokens.refresh_token.clone(),
        tokens.expires_at,
    );
    ctx.credentials.save().map_err(|e| {
        eyre!(
            "Failed to save credentials to {}: {}",
            ctx.credentials.path().display(),
            e
        )
    })
}
