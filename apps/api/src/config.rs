use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub email_from_address: String,
    pub email_region: String,
    pub company_name: String,
    pub jobs_file: String,
    pub resumes_dir: String,
    /// Upper bound on concurrent model calls during batch runs.
    pub match_workers: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            email_from_address: require_env("EMAIL_FROM_ADDRESS")?,
            email_region: env_or("EMAIL_REGION", "us-east-1"),
            company_name: env_or("COMPANY_NAME", "Our Company"),
            jobs_file: env_or("JOBS_FILE", "data/jobs.json"),
            resumes_dir: env_or("RESUMES_DIR", "data/cvs"),
            match_workers: env_or("MATCH_WORKERS", "4")
                .parse::<usize>()
                .context("MATCH_WORKERS must be a positive integer")?
                .max(1),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
