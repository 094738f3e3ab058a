//! Config command

use anyhow::Result;
use camino::Utf8Path;
use durable_core::{ConfigLoader, ExecutorConfig};

use crate::cli::{ConfigCommands, ConfigShowArgs};

pub fn run(cmd: ConfigCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, config_path),
    }
}

/// Load the effective configuration (file and environment, no CLI flags)
pub fn load(config_path: Option<&Utf8Path>) -> Result<ExecutorConfig> {
    let loader = ConfigLoader::new()?;
    let loader = match config_path {
        Some(path) => loader.with_path(path.to_path_buf()),
        None => loader,
    };
    Ok(loader.load()?)
}

fn show(args: ConfigShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load(config_path)?;

    if args.json {
        let json = serde_json::to_string_pretty(&config)?;
        println!("{}", json);
    } else {
        let yaml = serde_yaml_ng::to_string(&config)?;
        println!("{}", yaml);
    }

    Ok(())
}
