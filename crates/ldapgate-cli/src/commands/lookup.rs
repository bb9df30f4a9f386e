//! lookup command - find an entry by login attribute

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use ldapgate_auth::{DirectoryEntry, DirectoryIdentity};

pub fn execute(ctx: &mut CommandContext, value: &str) -> Result<bool> {
    let attribute = ctx.connector.config().login_attribute;

    let Some(entry) = ctx
        .connector
        .find_by_attribute(value)
        .with_context(|| format!("Lookup of {}={} failed", attribute, value))?
    else {
        if ctx.is_json() {
            println!("null");
        } else {
            eprintln!("{} no entry with {}={}", "Not found:".yellow(), attribute, value);
        }
        return Ok(false);
    };

    let identity = DirectoryIdentity::from_entry(&entry, attribute).ok();

    if ctx.is_json() {
        let output = serde_json::json!({ "entry": entry, "identity": identity });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_entry(&entry);
        if let Some(identity) = identity {
            println!();
            println!("  {}: {}", "Username".cyan(), identity.username);
            if let Some(name) = identity.display_name {
                println!("  {}: {}", "Display name".cyan(), name);
            }
            if let Some(email) = identity.email {
                println!("  {}: {}", "Email".cyan(), email);
            }
        }
    }

    Ok(true)
}

fn print_entry(entry: &DirectoryEntry) {
    println!("{}", entry.dn().blue().bold());

    let mut attributes: Vec<_> = entry.attributes().collect();
    attributes.sort_by(|a, b| a.0.cmp(b.0));

    for (name, values) in attributes {
        for value in values {
            println!("  {}: {}", name.cyan(), value);
        }
    }
}
