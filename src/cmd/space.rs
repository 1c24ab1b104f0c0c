//! `clickup space list|select`

use anyhow::{bail, Context, Result};
use colored::Colorize;

use clickup::api::models::Space;
use clickup::auth::Session;
use clickup::ui::{colors, format};

use super::can_prompt;

fn fetch_spaces(session: &Session) -> Result<Vec<Space>> {
    let team_id = session.config().require_workspace()?;
    session
        .client()?
        .spaces(team_id)
        .context("failed to fetch spaces")
}

pub fn cmd_space_list(session: &Session) -> Result<()> {
    let spaces = fetch_spaces(session)?;
    if spaces.is_empty() {
        println!("No spaces found.");
        return Ok(());
    }

    let current = &session.config().space;
    let mut rows = vec![vec!["ID".to_string(), "NAME".to_string()]];
    rows.extend(
        spaces
            .iter()
            .map(|space| vec![space.id.clone(), space.name.clone()]),
    );
    for (i, line) in format::columns(&rows).into_iter().enumerate() {
        match i {
            0 => println!("  {}", line.bold()),
            _ if spaces[i - 1].id == *current => println!("{} {}", colors::success("*"), line),
            _ => println!("  {}", line),
        }
    }

    println!();
    println!("{}", colors::secondary("---"));
    println!("{}", colors::secondary("Quick actions:"));
    println!("  {}  clickup space select", colors::secondary("Select:"));
    Ok(())
}

pub fn cmd_space_select(session: &mut Session, wanted: Option<&str>, directory: bool) -> Result<()> {
    let spaces = fetch_spaces(session)?;
    if spaces.is_empty() {
        bail!("no spaces found in workspace");
    }

    let chosen = match wanted {
        Some(wanted) => spaces
            .iter()
            .find(|s| s.id == wanted || s.name == wanted)
            .with_context(|| {
                format!(
                    "space {:?} not found. Use 'clickup space list' to see available spaces",
                    wanted
                )
            })?,
        None => {
            if !can_prompt(session) {
                bail!("no space given\n\nPass a space ID or name: clickup space select <id>");
            }
            let names: Vec<String> = spaces
                .iter()
                .map(|s| format!("{} ({})", s.name, s.id))
                .collect();
            let index = dialoguer::Select::new()
                .with_prompt("Select a space")
                .items(&names)
                .default(0)
                .interact()?;
            &spaces[index]
        }
    };
    let (id, name) = (chosen.id.clone(), chosen.name.clone());

    if directory {
        let dir = std::env::current_dir().context("failed to read current directory")?;
        let config = session.config_mut();
        let mut defaults = config
            .directory_defaults
            .get(dir.to_string_lossy().as_ref())
            .cloned()
            .unwrap_or_default();
        defaults.space = id.clone();
        config.set_directory_default(&dir, defaults);
        config.save()?;
        println!(
            "Default space for {} set to {} ({})",
            dir.display(),
            name.bold(),
            id
        );
    } else {
        session.config_mut().space = id.clone();
        session.config().save()?;
        println!("Default space set to {} ({})", name.bold(), id);
    }
    Ok(())
}
