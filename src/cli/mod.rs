//! Command-line interface for entrez-cache.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// entrez-cache - caching front end for NCBI E-utilities searches
#[derive(Debug, Parser)]
#[command(name = "entrez-cache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "web")]
    Serve,

    /// Resolve a single search through the cache and print the result as JSON
    #[command(alias = "s")]
    Search {
        /// Entrez database (pubmed, protein, nuccore, nucleotide, gene)
        db: String,

        /// Search term
        #[arg(required = true)]
        term: Vec<String>,

        /// Maximum number of ids to request (1-100)
        #[arg(long)]
        retmax: Option<String>,

        /// Sort order (relevance, pub_date)
        #[arg(long)]
        sort: Option<String>,

        /// Restrict the search to one field (title, abstract, author)
        #[arg(long)]
        field: Option<String>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}
