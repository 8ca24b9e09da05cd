//! HTTP surface: the calendar feed and a health check.

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use calbot_core::{Event, Pipeline, render_calendar};
use chrono::{Local, NaiveDate};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::GuideCache;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::fetch::{GuideFetcher, GuideSource};
use crate::guide::{guide_url, publication_thursday};
use crate::signals::ShutdownHandle;

pub const CALENDAR_PATH: &str = "/calbot/soiree/";
pub const HEALTH_PATH: &str = "/healthz";

const CALENDAR_CONTENT_TYPE: &str = "text/calendar";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn GuideSource>,
    cache: Arc<Mutex<GuideCache>>,
    base_url: Url,
    calendar_name: String,
    /// Overrides the local date; `None` outside tests.
    today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(config: &ServerConfig, source: Arc<dyn GuideSource>) -> Self {
        Self {
            source,
            cache: Arc::new(Mutex::new(GuideCache::new(
                config.cache_ttl,
                config.cache_capacity,
            ))),
            base_url: config.base_url.clone(),
            calendar_name: config.calendar_name.clone(),
            today: None,
        }
    }

    /// Pins the date used to locate the current guide.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn cache(&self) -> &Arc<Mutex<GuideCache>> {
        &self.cache
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Events of the guide published on `thursday`, from cache when fresh.
    ///
    /// A partial extraction is served but not cached; one that failed before
    /// producing anything is an error.
    async fn events_for(&self, url: &Url, thursday: NaiveDate) -> ServerResult<Vec<Event>> {
        if let Some(entry) = self.cache.lock().await.get_valid(url.as_str()) {
            debug!(
                url = %url,
                stored_at = %entry.stored_at,
                expires_in = ?entry.time_until_expiry(),
                "Serving cached guide"
            );
            return Ok(entry.events.clone());
        }

        let body = self.source.fetch(url).await?;
        let extraction = Pipeline::new(thursday).extract(Cursor::new(body)).await;

        match extraction.error {
            None => {
                info!(url = %url, events = extraction.events.len(), "Extracted guide");
                self.cache
                    .lock()
                    .await
                    .insert(url.as_str(), extraction.events.clone());
                Ok(extraction.events)
            }
            Some(err) if extraction.events.is_empty() => Err(err.into()),
            Some(err) => {
                warn!(
                    url = %url,
                    error = %err,
                    events = extraction.events.len(),
                    "Serving partial guide without caching it"
                );
                Ok(extraction.events)
            }
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CALENDAR_PATH, get(soiree_calendar))
        .route(HEALTH_PATH, get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn soiree_calendar(State(state): State<AppState>) -> Result<Response, ServerError> {
    let thursday = publication_thursday(state.today());
    let url = guide_url(&state.base_url, thursday)?;
    let events = state.events_for(&url, thursday).await?;
    let body = render_calendar(&events, &state.calendar_name);
    Ok(([(header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE)], body).into_response())
}

async fn healthz() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], "ok")
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = if self.is_upstream() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!(error = %self, %status, "Request failed");
        (
            status,
            [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
            self.to_string(),
        )
            .into_response()
    }
}

/// Binds the listener and serves until `shutdown` is triggered.
///
/// In-flight requests get `config.shutdown_timeout` to finish; after that
/// their connections are dropped.
pub async fn serve(config: ServerConfig, shutdown: ShutdownHandle) -> ServerResult<()> {
    let fetcher = GuideFetcher::new(&config)?;
    let app = router(AppState::new(&config, Arc::new(fetcher)));

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(address = %listener.local_addr()?, "Starting server");

    let graceful = shutdown.signal();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(graceful.wait())
            .await
    };
    let deadline = async {
        shutdown.signal().wait().await;
        info!("Stopping server");
        tokio::time::sleep(config.shutdown_timeout).await;
    };

    tokio::select! {
        result = server => result?,
        () = deadline => warn!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Shutdown deadline reached, dropping open connections"
        ),
    }
    info!("Server stopped");
    Ok(())
}
