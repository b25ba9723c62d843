//! CLI interface for AgriSage
//!
//! One-shot commands built with clap's derive API.

use crate::planning::PlanningContext;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AgriSage agricultural advisory assistant
///
/// Screens farmer questions against safety policies and answers them with
/// quality-checked, multi-step advisory plans.
#[derive(Parser, Debug)]
#[command(name = "agrisage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the guardrail check on a piece of text
    Check {
        /// Text to check
        text: String,
    },

    /// Ask for an advisory plan
    Ask {
        /// The farmer's question
        query: String,

        /// User the session belongs to
        #[arg(long, default_value = "local")]
        user: String,

        #[command(flatten)]
        farm: FarmArgs,
    },

    /// Show the active configuration
    Config,
}

/// Farm details passed into planning
#[derive(clap::Args, Debug, Default)]
pub struct FarmArgs {
    /// Farm location (district, state)
    #[arg(long)]
    pub location: Option<String>,

    /// Season (kharif, rabi, zaid)
    #[arg(long)]
    pub season: Option<String>,

    /// Crop or comma-separated crops
    #[arg(long)]
    pub crop: Option<String>,

    /// Farm size, e.g. "5 acres"
    #[arg(long)]
    pub farm_size: Option<String>,

    /// Budget available
    #[arg(long)]
    pub budget: Option<String>,

    /// Farming experience
    #[arg(long)]
    pub experience: Option<String>,

    /// Equipment, labour or inputs on hand
    #[arg(long)]
    pub resources: Option<String>,
}

impl From<FarmArgs> for PlanningContext {
    fn from(farm: FarmArgs) -> Self {
        PlanningContext {
            location: farm.location,
            season: farm.season,
            crop_type: farm.crop,
            farm_size: farm.farm_size,
            budget: farm.budget,
            experience: farm.experience,
            resources: farm.resources,
            ..Default::default()
        }
    }
}
