//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// Codeplug manager - one channel library, many radios
#[derive(Parser, Debug)]
#[command(name = "cpm", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.codeplug/data/codeplug.db)
    #[arg(long, global = true, env = "CPM_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "CPM_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the codeplug database
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show entity counts
    Status,

    /// Import a CSV file or an archive directory
    Import(ImportArgs),

    /// Export the codeplug for a radio
    Export(ExportArgs),

    /// Channel management
    Channel {
        #[command(subcommand)]
        command: ChannelCommands,
    },

    /// Zone management
    Zone {
        #[command(subcommand)]
        command: CollectionCommands,
    },

    /// Scan list management
    #[command(name = "scanlist", alias = "scan-list")]
    ScanList {
        #[command(subcommand)]
        command: CollectionCommands,
    },

    /// Talkgroup contacts
    Contact {
        #[command(subcommand)]
        command: ContactCommands,
    },

    /// Operator directory (RadioID)
    Directory {
        #[command(subcommand)]
        command: DirectoryCommands,
    },

    /// Contact filter lists
    #[command(name = "allowlist", alias = "allow-list")]
    AllowList {
        #[command(subcommand)]
        command: AllowListCommands,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Transfer Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// CSV file, or a directory holding an archive
    pub path: PathBuf,

    /// Dialect (generic, chirp, anytone, dm32uv, radioid, auto)
    #[arg(short, long, default_value = "auto")]
    pub dialect: String,

    /// Entity carried by a single file (channels, talkgroups, zones, ...)
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Clear existing channels before importing
    #[arg(long)]
    pub replace: bool,

    /// Append every imported channel to this zone
    #[arg(short, long)]
    pub zone: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file, or a directory for an archive
    pub path: PathBuf,

    /// Dialect (generic, chirp, anytone, dm32uv)
    #[arg(short, long)]
    pub dialect: String,

    /// Entity for a single-file export (default: channels)
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Only export channels in this zone
    #[arg(short, long)]
    pub zone: Option<String>,

    /// Maximum directory entries written
    #[arg(long)]
    pub contact_limit: Option<usize>,

    /// Only export directory entries in this allow list
    #[arg(long)]
    pub allow_list: Option<String>,
}

// ============================================================================
// Channel Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ChannelCommands {
    /// List channels in display order
    List,

    /// Show one channel
    Show {
        /// Channel ID
        id: i64,
    },

    /// Delete a channel
    Delete {
        /// Channel ID
        id: i64,
    },

    /// Renumber channels: the listed IDs become 1..N in this order
    Reorder {
        /// Every channel ID exactly once, in the new order
        #[arg(required = true, num_args = 1.., value_delimiter = ',')]
        ids: Vec<i64>,
    },

    /// Report channels that fail validation
    Validate,

    /// Set analog channels to 25 kHz and digital channels to 12.5 kHz
    FixBandwidths,
}

// ============================================================================
// Zone / Scan List Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum CollectionCommands {
    /// List all
    List,

    /// Show members
    Show {
        /// Name
        name: String,
    },

    /// Create an empty one
    Create {
        /// Name
        name: String,
    },

    /// Delete one (channels are kept)
    Delete {
        /// Name
        name: String,
    },

    /// Set members from channel IDs
    Assign {
        /// Name
        name: String,

        /// Channel IDs in order
        #[arg(required = true, num_args = 1.., value_delimiter = ',')]
        ids: Vec<i64>,

        /// Add after the existing members instead of replacing them
        #[arg(long)]
        append: bool,
    },
}

// ============================================================================
// Contact Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ContactCommands {
    /// List talkgroup contacts
    List,

    /// Show a contact and the channels that use it
    Show {
        /// Contact name (case-insensitive)
        name: String,
    },

    /// Link channels to contacts, creating placeholders for unknown names
    Resolve,
}

// ============================================================================
// Directory Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum DirectoryCommands {
    /// Import a RadioID user.csv
    Import {
        /// Path to the CSV file
        path: PathBuf,

        #[command(flatten)]
        filter: DirectoryFilter,
    },

    /// Download and import the RadioID feed
    Download {
        /// Feed URL (default: CPM_DIRECTORY_URL or the RadioID dump)
        #[arg(long)]
        url: Option<String>,

        #[command(flatten)]
        filter: DirectoryFilter,
    },

    /// Look up a DMR ID, or search by call sign or name
    Lookup {
        /// DMR ID, call sign or name fragment
        query: String,

        /// Maximum search results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Soft-delete a directory entry
    Delete {
        /// DMR ID
        dmr_id: i64,
    },

    /// Count live and deleted entries
    Count,
}

/// Restricts which directory rows are imported.
#[derive(Args, Debug, Default)]
pub struct DirectoryFilter {
    /// Only import IDs seen in a Brandmeister "last heard" export
    #[arg(long)]
    pub last_heard: Option<PathBuf>,

    /// Only import IDs in this stored allow list
    #[arg(long)]
    pub allow_list: Option<String>,
}

// ============================================================================
// Allow List Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum AllowListCommands {
    /// Replace an allow list from a CSV or plain ID list
    Import {
        /// List name
        name: String,

        /// File with a "Radio ID"/"DMR ID"/"ID" column or one ID per line
        file: PathBuf,
    },

    /// List stored allow lists
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_reorder_accepts_comma_and_space_separated_ids() {
        let cli = Cli::try_parse_from(["cpm", "channel", "reorder", "3,1", "2"]).unwrap();
        match cli.command {
            Commands::Channel {
                command: ChannelCommands::Reorder { ids },
            } => assert_eq!(ids, vec![3, 1, 2]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_import_defaults_to_auto_dialect() {
        let cli = Cli::try_parse_from(["cpm", "import", "plug/"]).unwrap();
        match cli.command {
            Commands::Import(args) => {
                assert_eq!(args.dialect, "auto");
                assert!(!args.replace);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_scanlist_alias() {
        let cli = Cli::try_parse_from(["cpm", "scan-list", "create", "Local"]).unwrap();
        assert!(matches!(cli.command, Commands::ScanList { .. }));
    }
}
