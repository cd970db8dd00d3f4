//! Entitlement commands.

use serde_json::json;

use super::{CliError, Context, print_json};

/// `has-access` - print the entitlement record, or `null` when not entitled.
pub async fn has_access(ctx: &Context, products: &[String], user_id: &str) -> Result<(), CliError> {
    let record = ctx.monetization.has_access(products, user_id).await?;
    if record.is_none() {
        tracing::info!(user_id, "No access");
    }
    print_json(&record)
}

/// `clear-access` - drop the cached result.
pub fn clear(ctx: &Context, products: &[String], user_id: &str) -> Result<(), CliError> {
    ctx.monetization.clear_cached_access_result(products, user_id);
    print_json(&json!({ "cleared": true }))
}
