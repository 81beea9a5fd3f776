//! Config command implementation.

use std::path::Path;

use anyhow::{Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;

pub fn cmd_config(action: ConfigAction) -> Result<()> {
    let path = Config::path();
    let out = run_config(action, &path)?;
    print!("{}", out);
    Ok(())
}

/// Apply `action` to the config file at `path` and return what to print.
fn run_config(action: ConfigAction, path: &Path) -> Result<String> {
    match action {
        ConfigAction::Path => Ok(format!("{}\n", path.display())),
        ConfigAction::Show => {
            let config = Config::load_from(path);
            Ok(toml::to_string_pretty(&config)?)
        }
        ConfigAction::Get { key } => {
            let config = Config::load_from(path);
            Ok(match config.get(key) {
                Some(value) => format!("{}\n", value),
                None => "(not set)\n".to_string(),
            })
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(path);
            config.set(key, &value)?;
            config.save_to(path)?;
            Ok(format!("Set {} = {}\n", key.name(), value))
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load_from(path);
            config.unset(key);
            config.save_to(path)?;
            Ok(format!("Unset {}\n", key.name()))
        }
        ConfigAction::Init => {
            if path.exists() {
                bail!("Config file already exists: {}", path.display());
            }
            Config::default().save_to(path)?;
            Ok(format!("Created config file: {}\n", path.display()))
        }
    }
}
