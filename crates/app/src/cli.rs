use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use certprep_core::model::{ExamError, ExamSettings};
use services::config::{DEFAULT_ENRICHMENT_PROBABILITY, DEFAULT_MIN_ENRICHMENT_BATCH};
use services::{ConfigError, PoolSettings, ServiceSettings};

const DEFAULT_TARGET_POOL_SIZE: u32 = 100;

#[derive(Debug, Parser)]
#[command(name = "certprep", about = "Certification practice exams with self-growing question pools")]
pub struct Cli {
    #[arg(long, global = true, env = "CERTPREP_DB_URL", default_value = "sqlite://certprep.sqlite3")]
    pub db: String,

    #[command(flatten)]
    pub pool: PoolArgs,

    #[command(flatten)]
    pub exam: ExamArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the pool-management API.
    Serve(ServeArgs),
    /// Create or refresh the default exams.
    Seed,
    /// Import a JSON array of questions into an exam.
    Import(ImportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "CERTPREP_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(short, long, env = "CERTPREP_PORT", default_value_t = 3030)]
    pub port: u16,
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    #[arg(long)]
    pub exam_type: String,

    pub file: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct PoolArgs {
    #[arg(long, global = true, env = "QUESTION_ENRICHMENT_PROBABILITY", default_value_t = DEFAULT_ENRICHMENT_PROBABILITY)]
    pub enrichment_probability: f64,

    #[arg(long, global = true, env = "MIN_ENRICHMENT_BATCH", default_value_t = DEFAULT_MIN_ENRICHMENT_BATCH)]
    pub min_enrichment_batch: u32,

    /// Overrides every exam's own target when set.
    #[arg(long, global = true, env = "TARGET_POOL_SIZE")]
    pub target_pool_size: Option<u32>,

    #[arg(long, global = true, env = "GENERATION_TIMEOUT_SECS", default_value_t = 60)]
    pub generation_timeout_secs: u64,

    #[arg(long, global = true, env = "SESSION_SAMPLE_SIZE", default_value_t = 50)]
    pub sample_size: u32,
}

#[derive(Debug, Clone, Args)]
pub struct ExamArgs {
    #[arg(long, global = true, env = "SECONDS_PER_QUESTION", default_value_t = 90)]
    pub seconds_per_question: u32,

    #[arg(long, global = true, env = "PASSING_SCORE", default_value_t = 70)]
    pub passing_score: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Pool(#[from] ConfigError),
    #[error(transparent)]
    Exam(#[from] ExamError),
}

impl Cli {
    /// # Errors
    ///
    /// Returns `SettingsError` when a knob is out of range.
    pub fn service_settings(&self) -> Result<ServiceSettings, SettingsError> {
        let pool = PoolSettings::new(
            self.pool.enrichment_probability,
            self.pool.min_enrichment_batch,
            self.pool.target_pool_size,
            Duration::from_secs(self.pool.generation_timeout_secs),
            self.pool.sample_size,
        )?;
        let exam = ExamSettings::new(
            self.pool.sample_size,
            self.pool.target_pool_size.unwrap_or(DEFAULT_TARGET_POOL_SIZE),
            self.exam.seconds_per_question,
            self.exam.passing_score,
        )?;
        Ok(ServiceSettings { pool, exam })
    }
}
