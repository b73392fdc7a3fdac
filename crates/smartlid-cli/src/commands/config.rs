use std::path::Path;

use clap::Subcommand;
use smartlid_core::Config;

use super::{config_path, CmdResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective config (file + environment) as JSON, token masked
    List,
    /// Get a config value, token masked
    Get {
        /// Dot-separated key (e.g. "alert.daily_alert_threshold")
        key: String,
    },
    /// Set a value in the config file
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(explicit: Option<&Path>, action: ConfigAction) -> CmdResult {
    let path = config_path(explicit);
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::List => {
            let mut config = Config::load_from(&path)?;
            config.apply_process_env()?;
            let json = serde_json::to_string_pretty(&config.redacted())?;
            println!("{json}");
        }
        ConfigAction::Get { key } => {
            let mut config = Config::load_from(&path)?;
            config.apply_process_env()?;
            match config.redacted().get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            // File values only; environment overrides stay out of the file.
            let mut config = Config::load_from(&path)?;
            config.set_value(&key, &value)?;
            config.validate()?;
            config.save_to(&path)?;
            println!("ok");
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(format!(
                    "config already exists at {} (use --force to overwrite)",
                    path.display()
                )
                .into());
            }
            Config::default().save_to(&path)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
