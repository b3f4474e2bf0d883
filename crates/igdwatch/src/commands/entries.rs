//! Entries subcommand handlers.

use std::path::Path;

use serde::Serialize;

use igdwatch_core::SessionConfig;

use crate::cli::{EntriesArgs, EntriesCommand};
use crate::error::CliError;

/// One configured router with its effective session settings.
#[derive(Debug, Serialize)]
struct EntryRow {
    entry_id: String,
    usn: String,
    hostname: Option<String>,
    unique_id: Option<String>,
    scan_interval_secs: u64,
    discovery_timeout_secs: u64,
}

pub fn handle(args: EntriesArgs, path: &Path) -> Result<(), CliError> {
    match args.command {
        EntriesCommand::List { json } => {
            let cfg = super::load_valid(path)?;
            let global = cfg.global().map_err(|e| CliError::config(path, e))?;
            let entries = cfg.config_entries().map_err(|e| CliError::config(path, e))?;

            let rows: Vec<EntryRow> = entries
                .iter()
                .map(|entry| {
                    let session = SessionConfig::for_entry(entry, &global);
                    EntryRow {
                        entry_id: entry.entry_id.clone(),
                        usn: entry.identity().usn(),
                        hostname: entry.data.hostname.clone(),
                        unique_id: entry.unique_id.clone(),
                        scan_interval_secs: session.scan_interval.as_secs(),
                        discovery_timeout_secs: session.discovery_timeout.as_secs(),
                    }
                })
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            if rows.is_empty() {
                println!("no entries configured");
                return Ok(());
            }
            for row in &rows {
                println!(
                    "{}\t{}\tevery {}s\t{}",
                    row.entry_id,
                    row.usn,
                    row.scan_interval_secs,
                    row.hostname.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
    }
}
