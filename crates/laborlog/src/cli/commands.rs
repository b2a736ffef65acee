//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand, ValueEnum};

use crate::model::{HospitalPatch, NewHospital};

/// Contraction commands.
#[derive(Debug, Subcommand)]
pub enum ContractionCommand {
    /// Record the start of a contraction
    Start {
        /// Start time (RFC 3339); defaults to now
        #[arg(long, value_name = "TIME")]
        at: Option<DateTime<Utc>>,
    },

    /// Record the end of a contraction
    Stop {
        /// Contraction to finish; defaults to the newest one in progress
        id: Option<i64>,

        /// End time (RFC 3339); defaults to now
        #[arg(long, value_name = "TIME")]
        at: Option<DateTime<Utc>>,
    },

    /// List recorded contractions, newest first
    List(ListArgs),

    /// Delete a contraction
    Delete {
        /// Contraction ID
        id: i64,
    },

    /// Time a contraction interactively (press Enter to stop)
    Time,
}

/// Intervals command arguments.
#[derive(Debug, Args)]
pub struct IntervalsCommand {
    /// Only show the most recent interval
    #[arg(long)]
    pub latest: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Hospital commands.
#[derive(Debug, Subcommand)]
pub enum HospitalCommand {
    /// List hospitals, primary first
    List(ListArgs),

    /// Add a hospital
    Add(AddHospitalArgs),

    /// Change fields of a hospital
    Update(UpdateHospitalArgs),

    /// Delete a hospital
    Delete {
        /// Hospital ID
        id: i64,
    },

    /// Show the primary hospital
    Primary {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Arguments shared by list commands.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Maximum number of rows
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Hospital add arguments.
#[derive(Debug, Args)]
pub struct AddHospitalArgs {
    /// Hospital name
    pub name: String,

    /// Phone number
    pub phone: String,

    /// Street address
    #[arg(long)]
    pub address: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Make this the primary hospital
    #[arg(long)]
    pub primary: bool,
}

impl From<AddHospitalArgs> for NewHospital {
    fn from(args: AddHospitalArgs) -> Self {
        Self {
            name: args.name,
            phone_number: args.phone,
            address: args.address,
            notes: args.notes,
            is_primary: args.primary,
        }
    }
}

/// Hospital update arguments. Omitted fields are left unchanged.
#[derive(Debug, Args)]
pub struct UpdateHospitalArgs {
    /// Hospital ID
    pub id: i64,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// New address; an empty string clears it
    #[arg(long)]
    pub address: Option<String>,

    /// New notes; an empty string clears them
    #[arg(long)]
    pub notes: Option<String>,

    /// Set or clear the primary flag
    #[arg(long, value_name = "BOOL")]
    pub primary: Option<bool>,
}

impl UpdateHospitalArgs {
    /// The ID and patch this update describes.
    #[must_use]
    pub fn into_patch(self) -> (i64, HospitalPatch) {
        let patch = HospitalPatch {
            name: self.name,
            phone_number: self.phone,
            address: self.address,
            notes: self.notes,
            is_primary: self.primary,
        };
        (self.id, patch)
    }
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
