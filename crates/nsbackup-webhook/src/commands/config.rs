//! Config command - print the effective configuration

use std::path::Path;

use nsbackup_core::BackupConfig;

use crate::error::Result;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = BackupConfig::load(config_path)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}
