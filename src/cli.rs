use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "readcomics")]
#[command(author, version, about = "Comic reader accounts, catalog and profile images")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate configuration and run the thumbnail declaration checks
    Check,

    /// Store an image and its thumbnail through the avatar field
    Thumbnail {
        /// Image file to store
        #[arg(required = true)]
        file: PathBuf,

        /// Storage key (defaults to the upload prefix plus the file name)
        #[arg(long)]
        key: Option<String>,
    },

    /// Register a new user account
    CreateUser {
        username: String,
        email: String,
        password: String,
    },

    /// Replace a user's profile photo
    SetPhoto {
        username: String,

        #[arg(required = true)]
        file: PathBuf,
    },

    /// Remove a user's profile photo
    DeletePhoto { username: String },

    /// Search characters, people and publishers
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Rebuild the search index from the stored catalog
    Reindex,

    /// Display version information
    Version,
}
