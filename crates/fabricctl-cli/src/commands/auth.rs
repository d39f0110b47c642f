use anyhow::{Context, Result};
use colored::Colorize;

use fabricctl_client::OrchClient;

use crate::auth::{self, StoredCredentials};
use crate::cli::LoginArgs;
use crate::output::{print_error, print_success};

pub async fn login(host: &str, args: &LoginArgs, profile: &str) -> Result<()> {
    fabricctl_client::validate_base_url(host)?;

    let mut client = OrchClient::new(host);
    client.login(&args.username, &args.password).await?;
    let token = client
        .token()
        .context("Login succeeded but no session token was returned")?;

    auth::save_credentials(
        profile,
        &StoredCredentials {
            host: host.to_string(),
            username: args.username.clone(),
            token: token.to_string(),
        },
    )?;
    print_success(&format!(
        "Logged in to {} as {}",
        host.cyan(),
        args.username.cyan()
    ));
    Ok(())
}

pub fn logout(profile: &str) -> Result<()> {
    if auth::remove_credentials(profile)? {
        print_success("Logged out (credentials removed)");
    } else {
        println!("No credentials found for profile \"{profile}\"");
    }
    Ok(())
}

pub fn whoami(profile: &str) -> Result<()> {
    match auth::load_credentials(profile)? {
        Some(creds) => {
            println!("{}: {}", "Profile".cyan(), profile);
            println!("{}: {}", "Host".cyan(), creds.host.cyan());
            println!("{}: {}", "User".cyan(), creds.username);
            println!("{}: {}", "Token".cyan(), auth::token_preview(&creds.token));
        }
        None => {
            print_error(&format!("Not logged in (profile: \"{profile}\")"));
        }
    }
    Ok(())
}
