use clap::Parser;
use std::time::Duration;

use crate::error::ConfigError;
use crate::filter::FilterPipeline;
use crate::rate_limit::RateLimitConfig;

// CLI argument structure, fixed for the lifetime of the process
#[derive(Parser, Debug, Clone)]
#[command(name = "tasktrack")]
#[command(about = "Multi-tenant task tracking API with per-client admission control")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Max admitted requests per client within one window
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_window: u64,

    // How often idle client keys are swept, in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval: u64,

    // Workers per search/category pipeline run
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u64).range(1..))]
    pub filter_workers: u64,

    // Give up on a search scan after this many milliseconds
    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    pub filter_deadline_ms: u64,

    // Key clients by the first X-Forwarded-For entry (only behind a trusted proxy)
    #[arg(long, default_value_t = false)]
    pub trust_forwarded_for: bool,
}

impl Args {
    pub fn rate_limit_config(&self) -> Result<RateLimitConfig, ConfigError> {
        RateLimitConfig::new(self.rate_limit, Duration::from_secs(self.rate_window))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn filter_deadline(&self) -> Duration {
        Duration::from_millis(self.filter_deadline_ms)
    }

    pub fn filter_pipeline(&self) -> Result<FilterPipeline, ConfigError> {
        FilterPipeline::with_workers(usize::try_from(self.filter_workers).unwrap_or(usize::MAX))
    }
}
