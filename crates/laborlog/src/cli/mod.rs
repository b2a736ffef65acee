//! Command-line interface for laborlog.
//!
//! This module provides the CLI structure and output rendering for the
//! `laborlog` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddHospitalArgs, ConfigCommand, ContractionCommand, HospitalCommand, IntervalsCommand,
    ListArgs, OutputFormat, UpdateHospitalArgs,
};

/// laborlog - Time contractions and keep hospital contacts at hand
///
/// Records contractions, derives the rest intervals between them and keeps
/// a small directory of hospitals, either in a local database or through a
/// running `laborlog serve`.
#[derive(Debug, Parser)]
#[command(name = "laborlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Talk to the server at `client.base_url` instead of the local database
    #[arg(short, long, global = true)]
    pub remote: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Record and review contractions
    #[command(subcommand)]
    Contraction(ContractionCommand),

    /// Show intervals between contractions
    Intervals(IntervalsCommand),

    /// Manage hospital contacts
    #[command(subcommand)]
    Hospital(HospitalCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
