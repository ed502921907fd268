//! CLI module - Command-line interface for cinesearch
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// cinesearch - Movie search against a TMDB-compatible catalog
#[derive(Parser)]
#[command(name = "cinesearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for movies and print the accumulated results
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
        /// Number of pages to load
        #[arg(long, short)]
        pages: Option<u32>,
    },

    /// Show details about a movie
    #[command(alias = "i")]
    Info {
        /// Movie ID
        id: String,
    },

    /// Interactive search: each input line is an edit of the search box
    #[command(alias = "b")]
    Browse,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
