//! HTTP control surface
//!
//! Plays the role of the extension's popup and side panel: it opens pages in
//! Chrome, forwards clicks into the capture engine, relays commands and serves
//! the two export documents.

use crate::browser::{ChromeDriver, ConnectionMode};
use crate::config::HunterConfig;
use crate::error::{HunterError, Result};
use crate::export::{automation_file_name, automation_map, detailed_export, detailed_file_name};
use crate::hunter::{query_with_fallback, CaptureEngine, CapturedElement, ClickEvent, Command};
use crate::storage::{origin_of, SnapshotStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

const MAX_BODY_BYTES: u64 = 64 * 1024;

/// How to obtain a Chrome instance when a page is opened
#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    pub chrome_path: Option<String>,
    pub headless: bool,
    pub no_sandbox: bool,
    pub debug_port: Option<u16>,
}

impl BrowserSettings {
    pub fn connection_mode(&self) -> ConnectionMode {
        match self.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: self.chrome_path.clone(),
                no_sandbox: self.no_sandbox,
                headless: self.headless,
            },
        }
    }
}

pub struct AppState {
    pub config: HunterConfig,
    pub store: Arc<dyn SnapshotStore>,
    pub browser: BrowserSettings,
    pub driver: Mutex<Option<ChromeDriver>>,
    pub engine: Mutex<Option<CaptureEngine>>,
}

impl AppState {
    pub fn new(config: HunterConfig, store: Arc<dyn SnapshotStore>, browser: BrowserSettings) -> Self {
        Self {
            config,
            store,
            browser,
            driver: Mutex::new(None),
            engine: Mutex::new(None),
        }
    }

    /// Replace the engine of the current page
    pub async fn install_engine(&self, engine: CaptureEngine) {
        *self.engine.lock().await = Some(engine);
    }

    /// Open `url` in Chrome (launching it if needed) and load an engine for it
    pub async fn open_page(&self, url: &str) -> Result<OpenResponse> {
        let mut driver_guard = self.driver.lock().await;

        if let Some(driver) = driver_guard.as_ref() {
            if !driver.is_alive().await {
                log::warn!("Chrome session DEAD, restarting...");
                *driver_guard = None;
            }
        }
        if driver_guard.is_none() {
            log::info!("Launching new Chrome session...");
            *driver_guard = Some(ChromeDriver::new(self.browser.connection_mode()).await?);
        }
        let driver = driver_guard.as_ref().ok_or(HunterError::NoPage)?;

        driver.navigate(url).await?;
        let page_url = driver.current_url().await?;
        let engine = CaptureEngine::load(self.config.clone(), self.store.clone(), &page_url);
        driver
            .sync_hunt_ui(&self.config.resolver.overlay_id, engine.overlay().as_ref())
            .await?;

        let response = OpenResponse {
            status: "opened",
            url: page_url,
            is_active: engine.is_active(),
            elements: engine.elements().len(),
        };
        // engine is always locked before driver elsewhere
        drop(driver_guard);
        *self.engine.lock().await = Some(engine);
        Ok(response)
    }

    /// Elements and origin of the current session, live or persisted
    pub async fn current_elements(&self) -> Result<(Vec<CapturedElement>, String)> {
        if let Some(engine) = self.engine.lock().await.as_ref() {
            return Ok((engine.elements().to_vec(), origin_of(engine.page_url())));
        }
        let snapshot = self
            .store
            .load(&self.config.storage_key)?
            .filter(|s| s.is_fresh(Utc::now(), self.config.snapshot_ttl()));
        Ok(match snapshot {
            Some(s) => (s.elements, s.url),
            None => (Vec::new(), "unknown".to_string()),
        })
    }

    async fn sync_overlay(&self, engine: &CaptureEngine) {
        if let Some(driver) = self.driver.lock().await.as_ref() {
            self.sync_page(driver, engine).await;
        }
    }

    /// Overlay and hover highlight follow the engine; failures only log
    async fn sync_page(&self, driver: &ChromeDriver, engine: &CaptureEngine) {
        let status = engine.overlay();
        if let Err(e) = driver
            .sync_hunt_ui(&self.config.resolver.overlay_id, status.as_ref())
            .await
        {
            log::warn!("⚠️  Failed to update overlay: {}", e);
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenResponse {
    pub status: &'static str,
    pub url: String,
    pub is_active: bool,
    pub elements: usize,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickResponse {
    pub captured: Option<CapturedElement>,
    pub suppressed: bool,
    pub forwarded: bool,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

fn status_for(err: &HunterError) -> StatusCode {
    match err {
        HunterError::NothingToExport => StatusCode::NOT_FOUND,
        HunterError::EngineNotLoaded => StatusCode::CONFLICT,
        HunterError::ConnectionFailed(_) | HunterError::LaunchFailed(_) | HunterError::NoPage => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        HunterError::NavigationFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: HunterError) -> Response {
    log::error!("❌ {}", err);
    let status = status_for(&err);
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            status: "error",
            message: err.to_string(),
        }),
        status,
    )
    .into_response()
}

fn attachment<T: Serialize>(value: &T, file_name: String) -> Response {
    warp::reply::with_header(
        warp::reply::json(value),
        "content-disposition",
        format!("attachment; filename=\"{}\"", file_name),
    )
    .into_response()
}

fn with_state(state: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let open = warp::path("open")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handle_open);

    let command = warp::path("command")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handle_command);

    let click = warp::path("click")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handle_click);

    let detailed = warp::path!("export" / "detailed")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_detailed_export);

    let automation = warp::path!("export" / "automation")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_automation_export);

    health
        .or(open)
        .or(command)
        .or(click)
        .or(detailed)
        .or(automation)
}

async fn handle_open(req: OpenRequest, state: Arc<AppState>) -> std::result::Result<Response, Infallible> {
    log::info!("Open request: {}", req.url);
    Ok(match state.open_page(&req.url).await {
        Ok(resp) => warp::reply::json(&resp).into_response(),
        Err(e) => error_response(e),
    })
}

async fn handle_command(cmd: Command, state: Arc<AppState>) -> std::result::Result<Response, Infallible> {
    let mut engine_guard = state.engine.lock().await;
    let result = query_with_fallback(
        engine_guard.as_mut(),
        state.store.as_ref(),
        &state.config.storage_key,
        state.config.snapshot_ttl(),
        cmd,
        Utc::now(),
    );

    Ok(match result {
        Ok(reply) => {
            if let Some(engine) = engine_guard.as_ref() {
                state.sync_overlay(engine).await;
            }
            warp::reply::json(&reply).into_response()
        }
        Err(e) => error_response(e),
    })
}

async fn handle_click(req: ClickRequest, state: Arc<AppState>) -> std::result::Result<Response, Infallible> {
    Ok(match click(req, &state).await {
        Ok(resp) => warp::reply::json(&resp).into_response(),
        Err(e) => error_response(e),
    })
}

async fn click(req: ClickRequest, state: &AppState) -> Result<ClickResponse> {
    let mut engine_guard = state.engine.lock().await;
    let engine = engine_guard.as_mut().ok_or(HunterError::EngineNotLoaded)?;
    let driver_guard = state.driver.lock().await;
    let driver = driver_guard.as_ref().ok_or(HunterError::NoPage)?;

    let capture = driver.snapshot_at(req.x, req.y).await?;
    let target = capture.target.or_else(|| capture.stack.first().copied());
    let pending = target.and_then(|target| {
        engine.begin_click(
            &capture.document,
            &ClickEvent {
                stack: capture.stack.clone(),
                target,
            },
        )
    });
    let outcome = match pending {
        Some(mut pending) => {
            if let Some(query) = pending.locators() {
                match driver.count_locators(&query).await {
                    Ok(counts) => pending.set_counts(counts),
                    Err(e) => log::warn!("⚠️  Counting in page failed, keeping snapshot counts: {}", e),
                }
            }
            engine.finish_click(pending)
        }
        None => Default::default(),
    };

    // the capture is already recorded; page-side failures below only log
    let forwarded = !outcome.suppress_default
        && match driver.forward_click(req.x, req.y).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("⚠️  Failed to forward click: {}", e);
                false
            }
        };
    state.sync_page(driver, engine).await;

    Ok(ClickResponse {
        captured: outcome.captured,
        suppressed: outcome.suppress_default,
        forwarded,
        feedback: outcome.feedback.map(|f| f.message),
    })
}

async fn handle_detailed_export(state: Arc<AppState>) -> std::result::Result<Response, Infallible> {
    let result = state.current_elements().await.and_then(|(elements, url)| {
        let now = Utc::now();
        detailed_export(&elements, &url, now).map(|doc| (doc, detailed_file_name(now.date_naive())))
    });
    Ok(match result {
        Ok((doc, file_name)) => attachment(&doc, file_name),
        Err(e) => error_response(e),
    })
}

async fn handle_automation_export(state: Arc<AppState>) -> std::result::Result<Response, Infallible> {
    let result = state.current_elements().await.and_then(|(elements, _)| {
        automation_map(&elements).map(|map| (map, automation_file_name(Utc::now().date_naive())))
    });
    Ok(match result {
        Ok((map, file_name)) => attachment(&map, file_name),
        Err(e) => error_response(e),
    })
}
