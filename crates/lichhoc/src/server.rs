use axum::{
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Local, NaiveDate};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::engine;
use crate::html::{self, PageView};
use crate::loader::{self, LoadError, Source};
use crate::settings::{self, SettingsError, SettingsStore, ThemeSettings};
use crate::types::{FilterCriteria, Session, Statistics};
use crate::week::{self, WeekStart};

/// Result of the most recent schedule load
pub enum LoadState {
    Ready(Arc<Vec<Session>>),
    Failed(String),
}

/// Application state shared across requests
pub struct AppState {
    pub schedule: RwLock<LoadState>,
    pub source: Source,
    pub week_start: WeekStart,
    pub today_override: Option<NaiveDate>,
    pub settings: Mutex<Box<dyn SettingsStore>>,
}

impl AppState {
    pub fn new(config: &Config, schedule: LoadState, settings: Box<dyn SettingsStore>) -> Self {
        Self {
            schedule: RwLock::new(schedule),
            source: config.source.clone(),
            week_start: config.week_start,
            today_override: config.today_override,
            settings: Mutex::new(settings),
        }
    }

    fn today(&self) -> NaiveDate {
        self.today_override
            .unwrap_or_else(|| Local::now().date_naive())
    }

    async fn sessions(&self) -> Result<Arc<Vec<Session>>, ApiError> {
        match &*self.schedule.read().await {
            LoadState::Ready(sessions) => Ok(Arc::clone(sessions)),
            LoadState::Failed(message) => Err(ApiError::Unavailable(message.clone())),
        }
    }

    /// Load the source again and swap the collection in.
    ///
    /// A failed reload keeps previously loaded sessions.
    pub async fn reload(&self) -> Result<usize, LoadError> {
        match loader::load(&self.source).await {
            Ok(sessions) => {
                let count = sessions.len();
                *self.schedule.write().await = LoadState::Ready(Arc::new(sessions));
                Ok(count)
            }
            Err(e) => {
                let mut schedule = self.schedule.write().await;
                if let LoadState::Failed(_) = *schedule {
                    *schedule = LoadState::Failed(e.to_string());
                }
                Err(e)
            }
        }
    }

    fn theme(&self) -> Result<ThemeSettings, ApiError> {
        let store = self.settings.lock().map_err(|_| ApiError::Internal("settings store poisoned".to_string()))?;
        Ok(ThemeSettings::load(&**store)?)
    }

    fn save_theme(&self, theme: &ThemeSettings) -> Result<(), ApiError> {
        let store = self.settings.lock().map_err(|_| ApiError::Internal("settings store poisoned".to_string()))?;
        Ok(theme.save(&**store)?)
    }
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// The schedule failed to load
    Unavailable(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::InvalidColor(_) => ApiError::BadRequest(err.to_string()),
            SettingsError::Database(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Start the web server with file watching
pub async fn serve(port: u16, config: Config) -> anyhow::Result<()> {
    let schedule = match loader::load(&config.source).await {
        Ok(sessions) => LoadState::Ready(Arc::new(sessions)),
        Err(e) => {
            error!(source = %config.source, error = %e, "Failed to load schedule");
            LoadState::Failed(e.to_string())
        }
    };

    let store = settings::open_store(&config.db_path);
    let state = Arc::new(AppState::new(&config, schedule, store));

    if let Some(path) = config.source.local_path() {
        start_file_watcher(state.clone(), path)?;
    }

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(address = %format!("http://{}", addr), "Server running");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/sessions", get(sessions_handler))
        .route("/api/today", get(today_handler))
        .route("/api/upcoming", get(upcoming_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/subjects", get(subjects_handler))
        .route("/api/day/{date}", get(day_handler))
        .route("/api/theme", get(theme_handler).put(update_theme_handler))
        .route("/api/theme/toggle", post(toggle_theme_handler))
        .route("/api/refresh", get(refresh_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Watch the schedule file for changes
fn start_file_watcher(state: Arc<AppState>, path: &Path) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .ok_or_else(|| anyhow::anyhow!("Schedule path has no file name: {}", path.display()))?;
    let watch_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    // Create a channel to receive events
    let (tx, mut rx) = tokio::sync::mpsc::channel(10);

    // The debouncer is blocking, so it lives on its own thread
    let watched = watch_dir.clone();
    std::thread::spawn(move || {
        let debouncer = new_debouncer(
            Duration::from_secs(2),
            move |result: DebounceEventResult| {
                if let Ok(events) = result {
                    let touched = events
                        .iter()
                        .any(|e| e.path.file_name() == Some(file_name.as_os_str()));
                    if touched {
                        let _ = tx.blocking_send(());
                    }
                }
            },
        );

        let mut debouncer = match debouncer {
            Ok(debouncer) => debouncer,
            Err(e) => {
                error!(error = %e, "Failed to create file watcher");
                return;
            }
        };

        if let Err(e) = debouncer
            .watcher()
            .watch(&watched, RecursiveMode::NonRecursive)
        {
            error!(dir = %watched.display(), error = %e, "Failed to watch directory");
            return;
        }

        // Keep the watcher alive
        loop {
            std::thread::sleep(Duration::from_secs(60));
        }
    });

    info!(dir = %watch_dir.display(), "Watching for schedule changes");

    // Reload whenever the watcher reports a change
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            match state.reload().await {
                Ok(count) => info!(count = count, "Schedule reloaded"),
                Err(e) => warn!(error = %e, "Failed to reload schedule"),
            }
        }
    });

    Ok(())
}

/// Query parameters recognized by the page and the API
#[derive(Debug, Default, PartialEq, Eq)]
struct ViewQuery {
    criteria: FilterCriteria,
    date: Option<String>,
}

/// Parse `q`, `subject` (repeatable), `subjects` (comma-separated), `range` and `date`
fn parse_view_query(pairs: Vec<(String, String)>) -> ViewQuery {
    let mut query = ViewQuery::default();

    for (key, value) in pairs {
        match key.as_str() {
            "q" => query.criteria.search_text = value,
            "subject" => {
                if !value.is_empty() {
                    query.criteria.subjects.push(value);
                }
            }
            "subjects" => query.criteria.subjects.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            "range" => {
                query.criteria.time_range = value.parse().unwrap_or_default();
            }
            "date" => query.date = Some(value),
            _ => {}
        }
    }

    query
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{}'. Expected YYYY-MM-DD", value)))
}

/// Serve the main HTML page
async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let theme = state.theme()?;

    let sessions = match state.sessions().await {
        Ok(sessions) => sessions,
        Err(ApiError::Unavailable(message)) => {
            let markup = html::render_error_page(&message, &theme);
            return Ok((StatusCode::SERVICE_UNAVAILABLE, Html(markup.into_string())).into_response());
        }
        Err(e) => return Err(e),
    };

    let query = parse_view_query(pairs);
    let today = state.today();
    // A date that doesn't parse or has no calendar grid just shows today
    let selected = query
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .filter(|d| week::month_grid(d.year(), d.month(), state.week_start).is_some())
        .unwrap_or(today);

    if !query.criteria.is_empty() {
        let count = engine::apply_criteria(&sessions, &query.criteria, today, state.week_start).len();
        info!(count = count, query = %query.criteria.search_text, "Filtered schedule");
    }

    let view = PageView {
        all: &sessions,
        criteria: &query.criteria,
        today,
        selected,
        week_start: state.week_start,
        theme: &theme,
    };
    Ok(Html(html::render_page(&view).into_string()).into_response())
}

/// Sessions matching the query criteria
async fn filtered(state: &AppState, pairs: Vec<(String, String)>) -> Result<(Arc<Vec<Session>>, Vec<Session>), ApiError> {
    let sessions = state.sessions().await?;
    let query = parse_view_query(pairs);
    let view = engine::apply_criteria(&sessions, &query.criteria, state.today(), state.week_start);
    Ok((sessions, view))
}

/// Return filtered sessions as JSON
async fn sessions_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let (_, view) = filtered(&state, pairs).await?;
    Ok(Json(view))
}

async fn today_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let (_, view) = filtered(&state, pairs).await?;
    Ok(Json(engine::todays_sessions(&view, state.today())))
}

async fn upcoming_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let (_, view) = filtered(&state, pairs).await?;
    Ok(Json(engine::upcoming_sessions(&view, state.today())))
}

async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Statistics>, ApiError> {
    let (all, view) = filtered(&state, pairs).await?;
    Ok(Json(engine::statistics(&all, &view, state.today(), state.week_start)))
}

async fn subjects_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let sessions = state.sessions().await?;
    Ok(Json(engine::unique_subjects(&sessions)))
}

async fn day_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(date): UrlPath<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let date = parse_date(&date)?;
    let (_, view) = filtered(&state, pairs).await?;
    Ok(Json(engine::sessions_by_day(&view, date)))
}

async fn theme_handler(State(state): State<Arc<AppState>>) -> Result<Json<ThemeSettings>, ApiError> {
    Ok(Json(state.theme()?))
}

async fn update_theme_handler(
    State(state): State<Arc<AppState>>,
    Json(theme): Json<ThemeSettings>,
) -> Result<Json<ThemeSettings>, ApiError> {
    state.save_theme(&theme)?;
    info!(mode = theme.mode.as_str(), color = %theme.primary_color, "Theme updated");
    Ok(Json(theme))
}

async fn toggle_theme_handler(State(state): State<Arc<AppState>>) -> Result<Json<ThemeSettings>, ApiError> {
    let mut theme = state.theme()?;
    theme.toggle();
    state.save_theme(&theme)?;
    Ok(Json(theme))
}

#[derive(Serialize)]
struct RefreshResponse {
    count: usize,
}

/// Reload the schedule from its source (manual trigger)
async fn refresh_handler(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>, ApiError> {
    info!("Manual refresh triggered");

    match state.reload().await {
        Ok(count) => Ok(Json(RefreshResponse { count })),
        Err(e) => {
            warn!(error = %e, "Refresh failed");
            Err(ApiError::Unavailable(e.to_string()))
        }
    }
}
