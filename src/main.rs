use std::sync::{Arc, RwLock};

use anyhow::bail;
use clap::Parser;

mod cli;
mod config;
mod index;
mod notes;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod vault;
mod web;

use config::Config;
use index::VaultIndex;

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let config = Arc::new(RwLock::new(Config::load()));

    match args.command {
        cli::Command::Daemon {} => {
            web::start_daemon(config);
            Ok(())
        }

        cli::Command::Related { note, vault } => {
            let index = open_index(config, vault, false)?;
            let entries = index.related_to(&note)?;
            println!("{}", serde_json::to_string_pretty(&entries).unwrap());
            Ok(())
        }

        cli::Command::Note { name, vault } => {
            let index = open_index(config, vault, false)?;
            let note = index.get_note(&name)?;
            println!("{}", serde_json::to_string_pretty(&note).unwrap());
            Ok(())
        }

        cli::Command::Reindex { semantic, vault } => {
            let index = open_index(config, vault, semantic)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "notes": index.note_count(),
                    "similarity_pairs": index.similarity_pair_count(),
                    "semantic_notes": index.semantic_indexed_count(),
                }))
                .unwrap()
            );
            Ok(())
        }
    }
}

fn open_index(
    config: Arc<RwLock<Config>>,
    vault: Option<String>,
    force_semantic_reindex: bool,
) -> anyhow::Result<VaultIndex> {
    let vault_path = match vault {
        Some(path) => path,
        None => config.read().unwrap().vault_path.clone(),
    };

    if vault_path.is_empty() {
        bail!("no vault path: set vault_path in config.yaml or pass --vault");
    }

    Ok(VaultIndex::open_with(
        vault_path,
        config,
        force_semantic_reindex,
    )?)
}
