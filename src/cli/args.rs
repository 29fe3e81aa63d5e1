//! CLI argument definitions using clap
//!
//! Commands:
//! - kek init [--name <name>]
//! - kek create --name <name> [--attrs <json>]
//! - kek get <id> [--revisions]
//! - kek update <id> --attrs <json> [--patch]
//! - kek delete <id>
//! - kek find [--where field=value]... [--order-by <field>] [--offset <n>] [--limit <n>] [--revisions]
//! - kek verify <id>
//! - kek repair <id>
//!
//! Every command takes `--config <path>` (default `./kek.json`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// kek - embedded document store with revision chains
#[derive(Parser, Debug)]
#[command(name = "kek")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a kekspace in the configured data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Kekspace name (generated when omitted)
        #[arg(long)]
        name: Option<String>,
    },

    /// Create a document
    Create {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Document name
        #[arg(long)]
        name: String,

        /// Attributes as a JSON object
        #[arg(long, default_value = "{}")]
        attrs: String,
    },

    /// Print a document
    Get {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        id: String,

        /// Attach the revision chain
        #[arg(long)]
        revisions: bool,
    },

    /// Replace or patch a document's attributes
    Update {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        id: String,

        /// Attributes as a JSON object
        #[arg(long)]
        attrs: String,

        /// Merge into the current attributes instead of replacing them
        #[arg(long)]
        patch: bool,
    },

    /// Delete a document, its revision chain and its index entries
    Delete {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        id: String,
    },

    /// Search documents by attribute equality
    Find {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Equality predicate, repeatable
        #[arg(long = "where", value_name = "FIELD=VALUE")]
        filters: Vec<String>,

        /// Sort by this string attribute instead of creation time
        #[arg(long)]
        order_by: Option<String>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size; 0 means the configured default for unfiltered listings
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Attach revision chains
        #[arg(long)]
        revisions: bool,
    },

    /// Verify a document's revision chain
    Verify {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        id: String,
    },

    /// Rebuild a document's index entries and realign its revision
    Repair {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_collects_repeated_where() {
        let cli = Cli::try_parse_from([
            "kek", "find", "--where", "color=red", "--where", "size=l", "--limit", "5",
        ])
        .unwrap();

        match cli.command {
            Command::Find {
                config,
                filters,
                limit,
                offset,
                ..
            } => {
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_PATH));
                assert_eq!(filters, vec!["color=red", "size=l"]);
                assert_eq!(limit, 5);
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_update_requires_attrs() {
        assert!(Cli::try_parse_from(["kek", "update", "dd1"]).is_err());
        assert!(Cli::try_parse_from(["kek", "update", "dd1", "--attrs", "{}", "--patch"]).is_ok());
    }
}
