use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "flatdoc",
    about = "Flat-file document store with secondary indexes",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (defaults to ./flatdoc.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the storage root from the config file
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read and write JSON documents
    #[command(subcommand)]
    Doc(DocAction),
    /// Read and write blobs and their timestamps
    #[command(subcommand)]
    Blob(BlobAction),
    /// Query and maintain a secondary index
    Index(IndexArgs),
}

#[derive(Subcommand)]
pub enum DocAction {
    /// Print a document
    Get { key: String },
    /// Check whether a document exists
    Exists { key: String },
    /// Create or overwrite a document
    Set { key: String, json: String },
    /// Create a document, failing if the key is taken
    Add { key: String, json: String },
    /// Overwrite a document, failing if it does not exist
    Replace { key: String, json: String },
    /// Delete a document
    Delete { key: String },
    /// Print every document
    Find,
}

#[derive(Subcommand)]
pub enum BlobAction {
    /// Print a blob with its metadata
    Get { key: String },
    /// Create or overwrite a blob
    Set { key: String, json: String },
    /// Delete a blob
    Delete { key: String },
    /// Print every blob with its metadata
    List,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Index name (a directory under <root>/indexes)
    pub name: String,
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand)]
pub enum IndexAction {
    /// Values held by a document, or documents holding --value (KEY may be *)
    Get {
        key: String,
        #[arg(long, default_value = "*")]
        value: String,
    },
    /// Check whether any entry matches
    Exists {
        key: String,
        #[arg(long, default_value = "*")]
        value: String,
    },
    /// Index new values for a document
    Add {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Make a document's indexed values exactly VALUES
    Set { key: String, values: Vec<String> },
    /// Remove matching entries
    Delete {
        key: String,
        #[arg(long, default_value = "*")]
        value: String,
    },
    /// List every indexed value
    Values,
}
