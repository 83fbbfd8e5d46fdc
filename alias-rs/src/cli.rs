//! Root CLI structure for alias-rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::parse_vec3;

#[derive(Parser)]
#[command(name = "alias-rs")]
#[command(about = "Command-line tools for MDL, MD2, MD3 and IQM models", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display information about a model file
    Info {
        /// Path to the model file
        file: PathBuf,

        /// List scenes, surfaces and bones
        #[arg(short, long)]
        detailed: bool,
    },

    /// List tags or bones with their origin at a frame
    Tags {
        /// Path to the model file
        file: PathBuf,

        /// Frame to sample
        #[arg(short, long, default_value = "0")]
        frame: usize,
    },

    /// Load a model and report whether it is well formed
    Validate {
        /// Path to the model file
        file: PathBuf,
    },

    /// Trace a line against a model
    Trace {
        /// Path to the model file
        file: PathBuf,

        /// Start point as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        start: [f32; 3],

        /// End point as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        end: [f32; 3],

        /// Frame to pose the model at
        #[arg(short, long, default_value = "0")]
        frame: usize,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
