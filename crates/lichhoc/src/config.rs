//! Runtime configuration from command-line flags and environment variables.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;

use crate::loader::Source;
use crate::week::WeekStart;

pub const DEFAULT_SOURCE: &str = "public/data.json";
pub const DEFAULT_DB: &str = "lichhoc.db";

pub const SOURCE_VAR: &str = "LICHHOC_SOURCE";
pub const DB_VAR: &str = "LICHHOC_DB";
pub const WEEK_START_VAR: &str = "LICHHOC_WEEK_START";

/// Flags shared by every subcommand; unset values fall back to the environment
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// Schedule JSON: a file path or an http(s) URL [env: LICHHOC_SOURCE]
    #[arg(short, long, global = true)]
    pub source: Option<String>,

    /// Output directory for generated files
    #[arg(short, long, default_value = ".", global = true)]
    pub output: PathBuf,

    /// SQLite database holding preferences [env: LICHHOC_DB]
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// First day of the week: monday or sunday [env: LICHHOC_WEEK_START]
    #[arg(long, global = true)]
    pub week_start: Option<WeekStart>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: Source,
    pub output: PathBuf,
    pub db_path: PathBuf,
    pub week_start: WeekStart,
    pub today_override: Option<NaiveDate>,
}

impl Config {
    /// Build the configuration, reading a `.env` file if present
    pub fn from_args(args: ConfigArgs) -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::resolve(args, |name| std::env::var(name).ok())
    }

    /// Flags win over variables from `lookup`, which win over defaults
    pub fn resolve<F>(args: ConfigArgs, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = args
            .source
            .or_else(|| lookup(SOURCE_VAR))
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        let db_path = args
            .db
            .or_else(|| lookup(DB_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB));

        let week_start = match args.week_start {
            Some(week_start) => week_start,
            None => match lookup(WEEK_START_VAR) {
                Some(value) => value
                    .parse::<WeekStart>()
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("{} is invalid", WEEK_START_VAR))?,
                None => WeekStart::default(),
            },
        };

        Ok(Self {
            source: Source::parse(&source),
            output: args.output,
            db_path,
            week_start,
            today_override: args.today,
        })
    }

    /// The date treated as today
    pub fn today(&self) -> NaiveDate {
        self.today_override
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(ConfigArgs::default(), env(&[])).unwrap();

        assert_eq!(config.source, Source::File(PathBuf::from(DEFAULT_SOURCE)));
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB));
        assert_eq!(config.week_start, WeekStart::Monday);
        assert!(config.today_override.is_none());
    }

    #[test]
    fn test_env_fallback() {
        let config = Config::resolve(
            ConfigArgs::default(),
            env(&[
                (SOURCE_VAR, "https://example.org/data.json"),
                (DB_VAR, "/tmp/prefs.db"),
                (WEEK_START_VAR, "sunday"),
            ]),
        )
        .unwrap();

        assert_eq!(
            config.source,
            Source::Url("https://example.org/data.json".to_string())
        );
        assert_eq!(config.db_path, PathBuf::from("/tmp/prefs.db"));
        assert_eq!(config.week_start, WeekStart::Sunday);
    }

    #[test]
    fn test_flags_override_env() {
        let args = ConfigArgs {
            source: Some("other.json".to_string()),
            week_start: Some(WeekStart::Monday),
            ..Default::default()
        };
        let config = Config::resolve(
            args,
            env(&[(SOURCE_VAR, "env.json"), (WEEK_START_VAR, "sunday")]),
        )
        .unwrap();

        assert_eq!(config.source, Source::File(PathBuf::from("other.json")));
        assert_eq!(config.week_start, WeekStart::Monday);
    }

    #[test]
    fn test_invalid_week_start_env() {
        let result = Config::resolve(ConfigArgs::default(), env(&[(WEEK_START_VAR, "friday")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_today_override() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let args = ConfigArgs {
            today: Some(day),
            ..Default::default()
        };
        let config = Config::resolve(args, env(&[])).unwrap();
        assert_eq!(config.today(), day);
    }
}
