//! `clickup config get|set|path`

use anyhow::Result;

use clickup::auth::Session;
use clickup::config;
use clickup::ui::colors;

pub fn cmd_config_get(session: &Session, key: &str) -> Result<()> {
    println!("{}", session.config().get(key)?);
    Ok(())
}

pub fn cmd_config_set(session: &mut Session, key: &str, value: &str) -> Result<()> {
    session.config_mut().set(key, value)?;
    session.config().save()?;
    println!("{} {} = {}", colors::success("✓"), key, value);
    Ok(())
}

pub fn cmd_config_path() -> Result<()> {
    println!("{}", config::config_path().display());
    Ok(())
}
