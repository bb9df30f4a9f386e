//! login command - authenticate a user, optionally requiring a group

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use ldapgate_auth::AuthenticationRequest;
use serde_json::json;
use tracing::debug;

pub fn execute(
    ctx: &mut CommandContext,
    username: &str,
    dn: Option<String>,
    group: Option<String>,
    password: &str,
) -> Result<bool> {
    let dn = match dn {
        Some(dn) => dn,
        None => match ctx
            .connector
            .find_by_attribute(username)
            .with_context(|| format!("Failed to resolve DN for {}", username))?
        {
            Some(entry) => entry.dn().to_string(),
            None => {
                report(ctx, username, None, false, "no such user");
                return Ok(false);
            }
        },
    };
    debug!("Authenticating {} as {}", username, dn);

    let group = group.or_else(|| ctx.connector.config().user_group.clone());
    let request = AuthenticationRequest::new(username, dn.as_str(), password).with_group(group);

    let accepted = ctx
        .connector
        .authenticate_request(&request)
        .with_context(|| format!("Authentication of {} could not complete", username))?;

    let reason = match (&request.group, accepted) {
        (_, true) => "accepted",
        (Some(_), false) => "invalid credentials or not a group member",
        (None, false) => "invalid credentials",
    };
    report(ctx, username, Some(&dn), accepted, reason);

    Ok(accepted)
}

fn report(ctx: &CommandContext, username: &str, dn: Option<&str>, accepted: bool, reason: &str) {
    if ctx.is_json() {
        println!(
            "{}",
            json!({
                "username": username,
                "dn": dn,
                "accepted": accepted,
                "reason": reason,
            })
        );
    } else if accepted {
        println!("{} {}", "Accepted".green().bold(), username);
    } else {
        println!("{} {}: {}", "Rejected".red().bold(), username, reason);
    }
}
