//! `clickup auth login|logout|status`

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::io::{self, BufRead};

use clickup::api::ClickUpClient;
use clickup::auth::{self, AuthMethod, OAuthAuthorizer, Session};
use clickup::ui::colors;

use super::can_prompt;

pub fn cmd_login(session: &mut Session, with_token: bool, oauth: bool) -> Result<()> {
    let (token, method) = if with_token {
        (read_token_from_stdin()?, AuthMethod::Token)
    } else if oauth {
        let (client_id, client_secret) = auth::oauth_app_credentials();
        let token = OAuthAuthorizer::new(client_id, client_secret)
            .authorize()
            .context("OAuth flow failed")?;
        (token, AuthMethod::OAuth)
    } else {
        if !atty::is(atty::Stream::Stdin) {
            bail!("no terminal to prompt for a token\n\nPipe one in instead: echo \"pk_12345\" | clickup auth login --with-token");
        }
        println!("Get your API token from: ClickUp > Settings > ClickUp API > API tokens");
        println!();
        let token: String = dialoguer::Password::new()
            .with_prompt("Paste your API token")
            .interact()
            .context("could not read token")?;
        (non_empty(token)?, AuthMethod::Token)
    };

    println!("Validating token...");
    let user = auth::validate_token(&token).context("token validation failed")?;
    session
        .store()
        .store(&token, method)
        .context("failed to store credentials")?;

    println!(
        "{} Logged in as {} ({})",
        colors::success("!"),
        user.username.bold(),
        user.email
    );

    if let Err(e) = select_workspace(session, &token) {
        eprintln!("{} could not set workspace: {:#}", colors::warning("Warning:"), e);
        eprintln!("You can set it later with 'clickup config set workspace <id>'");
    }

    println!();
    println!("{}", colors::secondary("---"));
    println!("{}", colors::secondary("Quick actions:"));
    println!("  {}  clickup space select", colors::secondary("Space:"));
    println!("  {}  clickup inbox", colors::secondary("Inbox:"));
    println!("  {}  clickup auth status", colors::secondary("Status:"));
    Ok(())
}

fn read_token_from_stdin() -> Result<String> {
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read token from stdin")?;
    if read == 0 {
        bail!("failed to read token from stdin");
    }
    non_empty(line)
}

fn non_empty(token: String) -> Result<String> {
    let token = token.trim().to_string();
    if token.is_empty() {
        bail!("token cannot be empty");
    }
    Ok(token)
}

fn select_workspace(session: &mut Session, token: &str) -> Result<()> {
    let teams = ClickUpClient::with_token(token)
        .teams()
        .context("failed to list workspaces")?;

    let chosen = match teams.len() {
        0 => bail!("no workspaces found for this account"),
        1 => &teams[0],
        _ if can_prompt(session) => {
            let options: Vec<String> = teams
                .iter()
                .map(|t| format!("{} ({})", t.name, t.id))
                .collect();
            let index = dialoguer::Select::new()
                .with_prompt("Choose a default workspace")
                .items(&options)
                .default(0)
                .interact()
                .context("workspace selection failed")?;
            &teams[index]
        }
        _ => &teams[0],
    };

    session.config_mut().workspace = chosen.id.clone();
    session.config().save().context("failed to save config")?;
    println!(
        "{} Workspace set to {} ({})",
        colors::success("!"),
        chosen.name.bold(),
        chosen.id
    );
    Ok(())
}

pub fn cmd_logout(session: &Session) -> Result<()> {
    if session.credential().is_none() {
        println!("Not logged in.");
        return Ok(());
    }
    session.store().clear().context("failed to remove credentials")?;
    println!("{} Logged out of ClickUp", colors::success("✓"));
    Ok(())
}

pub fn cmd_status(session: &Session) -> Result<()> {
    let Some(credential) = session.credential() else {
        println!("Not logged in. Run 'clickup auth login' to authenticate.");
        return Ok(());
    };

    let user = session.client()?.current_user()?;
    println!(
        "{} Logged in as {} ({})",
        colors::success("✓"),
        user.username.bold(),
        user.email
    );
    println!("  Method:    {}", credential.method);

    let workspace = &session.config().workspace;
    if workspace.is_empty() {
        println!("  Workspace: {}", colors::warning("not set"));
    } else {
        println!("  Workspace: {}", colors::identifier(workspace));
    }
    Ok(())
}
