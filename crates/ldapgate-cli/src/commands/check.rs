//! check command - connect and bind the service account

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;

pub fn execute(ctx: &mut CommandContext) -> Result<bool> {
    let url = ctx.connector.config().server_url();
    let user = ctx.connector.config().search_user_name.clone();

    ctx.connector
        .connect()
        .with_context(|| format!("Service bind against {} failed", url))?;

    if ctx.is_json() {
        println!(
            "{}",
            json!({ "server": url, "search_user": user, "status": "bound" })
        );
    } else {
        println!("{} {} as {}", "Bound".green().bold(), url, user);
    }

    Ok(true)
}
