//! Local source address lookup.

use std::path::Path;

use igdwatch_core::network::resolve_local_ip;

use crate::error::CliError;

pub async fn handle(path: &Path) -> Result<(), CliError> {
    let cfg = super::load(path)?;
    let global = cfg.global().map_err(|e| CliError::config(path, e))?;

    let ip = resolve_local_ip(global.local_ip)
        .await
        .ok_or(CliError::NoLocalIp)?;
    println!("{ip}");
    Ok(())
}
