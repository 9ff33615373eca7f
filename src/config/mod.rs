use crate::report::ReportLayout;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_REPORTS_DIR: &str = "./reports";

/* =======================
CLI ARGS
======================= */

#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Args {
    /// Comma-separated token symbols, overrides TOKENS
    #[arg(short, long)]
    pub tokens: Option<String>,

    /// Only fetch fills at or after this timestamp, overrides START_TIMESTAMP
    #[arg(short, long)]
    pub start: Option<u64>,

    /// Directory for CSV reports, overrides REPORTS_DIR
    #[arg(long)]
    pub reports_dir: Option<PathBuf>,

    /// Write one signed row per rate instead of separate buy/sell rows
    #[arg(long)]
    pub combined: bool,

    /// Also fetch deposit and withdrawal history
    #[arg(long)]
    pub transfers: bool,

    /// Skip writing CSV reports
    #[arg(long)]
    pub no_report: bool,
}

/* =======================
BITKUB CONFIG
======================= */

#[derive(Clone)]
pub struct BitkubConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for BitkubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitkubConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl BitkubConfig {
    /// Read the process environment; call [`load_env`] first
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            base_url: required(&lookup, "BITKUB_API_BASE_URL")?,
            api_key: required(&lookup, "BITKUB_API_KEY")?,
            api_secret: required(&lookup, "BITKUB_API_SECRET")?,
        })
    }
}

/* =======================
MAIN CONFIG
======================= */

#[derive(Debug, Clone)]
pub struct Config {
    pub tokens: Vec<String>,
    pub bitkub: BitkubConfig,
    pub start_timestamp: Option<u64>,
    pub reports_dir: PathBuf,
    pub layout: ReportLayout,
    pub write_reports: bool,
    pub fetch_transfers: bool,
}

impl Config {
    /// Read the process environment; call [`load_env`] first
    pub fn from_env(args: &Args) -> Result<Self> {
        Self::from_lookup(args, |key| env::var(key).ok())
    }

    /// Build from any key lookup; CLI flags win over environment values
    pub fn from_lookup<F>(args: &Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_tokens = match &args.tokens {
            Some(tokens) => tokens.clone(),
            None => required(&lookup, "TOKENS")?,
        };
        let tokens = parse_tokens(&raw_tokens);
        if tokens.is_empty() {
            return Err(anyhow!("no token symbols configured"));
        }

        let start_timestamp = match args.start {
            Some(start) => Some(start),
            None => lookup("START_TIMESTAMP")
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .context("Invalid START_TIMESTAMP")?,
        };

        let reports_dir = args
            .reports_dir
            .clone()
            .or_else(|| lookup("REPORTS_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR));

        Ok(Self {
            tokens,
            bitkub: BitkubConfig::from_lookup(&lookup)?,
            start_timestamp,
            reports_dir,
            layout: if args.combined {
                ReportLayout::Combined
            } else {
                ReportLayout::Split
            },
            write_reports: !args.no_report,
            fetch_transfers: args.transfers,
        })
    }
}

// ==================================================
// ENVIRONMENT HELPERS
// ==================================================

/// An explicit `DOTENV_PATH` must exist; the default `.env` is optional
pub fn load_env() -> Result<()> {
    match env::var("DOTENV_PATH") {
        Ok(path) if !path.is_empty() => {
            dotenv::from_path(&path).with_context(|| format!("loading {}", path))?;
        }
        _ => {
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{} missing in environment", key))
}

/// Split a comma list into uppercase symbols, dropping blanks and repeats
pub fn parse_tokens(raw: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !tokens.contains(&symbol) {
            tokens.push(symbol);
        }
    }
    tokens
}
