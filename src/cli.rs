use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start vrel as a service.
    Daemon {},

    /// Show related notes for a note
    Related {
        /// Note name (file stem) to query
        note: String,

        /// Vault root (overrides vault_path from config.yaml)
        #[clap(short, long)]
        vault: Option<String>,
    },

    /// Look up a note by name
    Note {
        /// Note name (file stem)
        name: String,

        /// Vault root (overrides vault_path from config.yaml)
        #[clap(short, long)]
        vault: Option<String>,
    },

    /// Rebuild the vault index
    Reindex {
        /// Re-embed the semantic index instead of reusing the vector cache
        #[clap(long, default_value = "false")]
        semantic: bool,

        /// Vault root (overrides vault_path from config.yaml)
        #[clap(short, long)]
        vault: Option<String>,
    },
}
