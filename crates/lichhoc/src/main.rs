use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod engine;
mod html;
mod loader;
mod server;
mod settings;
mod subjects;
mod types;
mod week;

use config::{Config, ConfigArgs};
use settings::ThemeSettings;
use types::{FilterCriteria, Session, TimeRange};

#[derive(Parser, Debug)]
#[command(name = "lichhoc")]
#[command(about = "Browse a class schedule: calendar, search, filters and statistics")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Generate a static index.html (no server)
    Build,

    /// List today's sessions
    Today,

    /// List the next sessions within a week
    Upcoming,

    /// Search and filter sessions
    Search {
        /// Text matched against subject, room, group and content
        #[arg(default_value = "")]
        query: String,

        /// Restrict to a subject (repeatable)
        #[arg(long = "subject")]
        subjects: Vec<String>,

        /// all, today, thisWeek, thisMonth or nextWeek
        #[arg(long, default_value = "all")]
        range: TimeRange,
    },

    /// Print schedule statistics
    Stats,
}

fn init_tracing(log_level: &str) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    for directive in ["hyper=warn", "tower_http=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

fn log_sessions(sessions: &[Session]) {
    for session in sessions {
        info!(
            starts = %session
                .starts_at()
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            ends = %session.end_time,
            subject = %session.subject,
            room = %session.room,
            "Session"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let config = Config::from_args(args.config)?;
    let today = config.today();

    match args.command {
        // Default to serve if no command specified
        None => {
            server::serve(8080, config).await?;
        }
        Some(Commands::Serve { port }) => {
            server::serve(port, config).await?;
        }
        Some(Commands::Build) => {
            let store = settings::open_store(&config.db_path);
            let theme = ThemeSettings::load(&*store).unwrap_or_default();
            let html_path = config.output.join("index.html");

            match loader::load(&config.source).await {
                Ok(sessions) => {
                    let criteria = FilterCriteria::default();
                    let view = html::PageView {
                        all: &sessions,
                        criteria: &criteria,
                        today,
                        selected: today,
                        week_start: config.week_start,
                        theme: &theme,
                    };
                    html::generate_html(&view, &html_path)?;
                    info!(path = %html_path.display(), count = sessions.len(), "HTML saved");
                }
                Err(e) => {
                    error!(source = %config.source, error = %e, "Failed to load schedule");
                    let page = html::render_error_page(&e.to_string(), &theme);
                    fs::write(&html_path, page.into_string())?;
                    info!(path = %html_path.display(), "Error page saved");
                    return Err(e.into());
                }
            }
        }
        Some(Commands::Today) => {
            let sessions = loader::load(&config.source).await?;
            let todays = engine::todays_sessions(&sessions, today);
            info!(date = %today, count = todays.len(), "Today's sessions");
            log_sessions(&todays);
        }
        Some(Commands::Upcoming) => {
            let sessions = loader::load(&config.source).await?;
            let upcoming = engine::upcoming_sessions(&sessions, today);
            info!(count = upcoming.len(), "Upcoming sessions");
            log_sessions(&upcoming);
        }
        Some(Commands::Search {
            query,
            subjects,
            range,
        }) => {
            let sessions = loader::load(&config.source).await?;
            let criteria = FilterCriteria {
                search_text: query,
                subjects,
                time_range: range,
            };
            let found = engine::apply_criteria(&sessions, &criteria, today, config.week_start);
            info!(
                count = found.len(),
                query = %criteria.search_text,
                range = %criteria.time_range,
                "Found sessions"
            );
            log_sessions(&found);
        }
        Some(Commands::Stats) => {
            let sessions = loader::load(&config.source).await?;
            let stats = engine::statistics(&sessions, &sessions, today, config.week_start);
            info!(
                unique_subjects = stats.unique_subjects,
                total_sessions = stats.total_sessions,
                today_sessions = stats.today_sessions,
                this_week_sessions = stats.this_week_sessions,
                "Statistics"
            );
        }
    }

    Ok(())
}
