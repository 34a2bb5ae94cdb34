use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fittrack_domain::{Cursor, SyncSettings, SyncStrategy};
use fittrack_storage::{Resolution, RestSettings};

#[derive(Parser, Debug)]
#[command(name = "fittrack", version)]
#[command(about = "Browse the ExerciseDB catalog, with an offline copy kept in SQLite")]
pub struct Cli {
    /// ExerciseDB API key
    #[arg(long, env = "RAPID_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the ExerciseDB API
    #[arg(
        long,
        env = "FITTRACK_BASE_URL",
        default_value = "https://exercisedb.p.rapidapi.com"
    )]
    pub base_url: String,

    /// Path of the local exercise database
    #[arg(long, env = "FITTRACK_DATABASE", default_value = "fittrack.db")]
    pub database: PathBuf,

    /// Age in hours after which the local catalog is synced again
    #[arg(long, env = "FITTRACK_SYNC_INTERVAL_HOURS", default_value_t = 24)]
    pub sync_interval_hours: u32,

    /// How the local catalog is brought in line with the remote catalog
    #[arg(
        long,
        env = "FITTRACK_SYNC_STRATEGY",
        value_enum,
        default_value_t = Strategy::Reconcile
    )]
    pub sync_strategy: Strategy,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn rest_settings(&self) -> RestSettings {
        RestSettings {
            base_url: self.base_url.clone(),
            ..RestSettings::new(self.api_key.clone())
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            interval: chrono::Duration::hours(i64::from(self.sync_interval_hours)),
            strategy: self.sync_strategy.into(),
            ..SyncSettings::default()
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Clear the local catalog before fetching
    Replace,
    /// Update the local catalog in place and remove missing exercises afterwards
    Reconcile,
}

impl From<Strategy> for SyncStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Replace => SyncStrategy::Replace,
            Strategy::Reconcile => SyncStrategy::Reconcile,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Sync the local catalog with the remote catalog
    Sync {
        /// Only sync if the local catalog is empty or outdated
        #[arg(long)]
        if_needed: bool,
    },
    /// Show the state of the local catalog
    Status,
    /// List exercises
    List {
        #[arg(long, conflicts_with_all = ["target", "equipment"])]
        body_part: Option<String>,
        #[arg(long, conflicts_with = "equipment")]
        target: Option<String>,
        #[arg(long)]
        equipment: Option<String>,
        #[command(flatten)]
        page: Page,
    },
    /// Show a single exercise
    Show { id: String },
    /// Search exercises by name, target or equipment
    Search { query: String },
    /// List all body parts
    BodyParts,
    /// List all target muscles
    Targets,
    /// List all equipment
    Equipment,
    /// Print the URL of the animated image of an exercise
    ImageUrl {
        id: String,
        /// One of 180, 360, 720 or 1080
        #[arg(long, default_value = "360")]
        resolution: Resolution,
    },
}

#[derive(clap::Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of exercises
    #[arg(long)]
    pub limit: Option<u32>,
    /// Number of exercises to skip
    #[arg(long, default_value_t = 0, requires = "limit")]
    pub offset: u32,
}

impl Page {
    pub fn cursor(self) -> Option<Cursor> {
        self.limit.map(|limit| Cursor::new(limit, self.offset))
    }
}
