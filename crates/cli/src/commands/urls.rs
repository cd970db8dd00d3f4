//! URL commands.

use account_sdk::LoginOptions;
use serde_json::json;

use super::{CliError, Context, print_json};

pub fn login_url(ctx: &Context, options: &LoginOptions) -> Result<(), CliError> {
    let url = ctx.identity.login_url(options)?;
    print_json(&json!({ "url": url.as_str(), "state": options.state }))
}

pub fn logout_url(ctx: &Context, redirect_uri: Option<&str>) -> Result<(), CliError> {
    let url = ctx.identity.logout_url(redirect_uri)?;
    print_json(&json!({ "url": url.as_str() }))
}
