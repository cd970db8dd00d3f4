//! Session commands.

use serde::Serialize;

use super::{CliError, Context, print_json};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    logged_in: bool,
    connected: bool,
    sp_id: Option<String>,
}

/// `session` - fetch and print the current session.
pub async fn show(ctx: &Context, autologin: bool) -> Result<(), CliError> {
    let session = ctx.identity.get_session(autologin).await?;
    print_json(&session)
}

/// `user` - print the connected user, failing when not connected.
pub async fn user(ctx: &Context) -> Result<(), CliError> {
    let user = ctx.identity.get_user().await?;
    print_json(&user)
}

/// `status` - summary flags; never fails on backend errors.
pub async fn status(ctx: &Context) -> Result<(), CliError> {
    let status = Status {
        logged_in: ctx.identity.is_logged_in().await,
        connected: ctx.identity.is_connected().await,
        sp_id: ctx.identity.get_sp_id().await,
    };
    print_json(&status)
}

/// `logout` - end the session on both backends.
pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    ctx.identity.logout().await?;
    print_json(&serde_json::json!({ "loggedOut": true }))
}
