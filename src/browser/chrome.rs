use crate::dom::{DomSnapshot, PageCapture};
use crate::error::{HunterError, Result};
use crate::hunter::{LocatorQuery, OverlayStatus, SelectorCounts};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

const DOM_SNAPSHOT_SCRIPT: &str = include_str!("dom_snapshot.js");
const OVERLAY_SCRIPT: &str = include_str!("overlay.js");
const HOVER_SCRIPT: &str = include_str!("hover.js");
const LOCATOR_COUNTS_SCRIPT: &str = include_str!("locator_counts.js");
/// Runs before any page script so `addEventListener("click")` registrations are seen
const CLICK_LISTENERS_SCRIPT: &str = include_str!("click_listeners.js");

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
    /// Targets that already carry the click-listener script
    instrumented: Mutex<HashSet<String>>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Launch a local Chrome with a throwaway profile
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Attach to a Chrome already running with a remote debugging port
    DebugPort(u16),
}

/// Call an embedded `(function (...) { ... })` script with JSON arguments
fn invoke(script: &str, args: &[serde_json::Value]) -> String {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("{}({})", script.trim().trim_end_matches(';'), args.join(", "))
}

impl ChromeDriver {
    /// Current page, skipping Chrome's internal pages; creates one if none exist
    async fn get_active_page(&self) -> Result<chromiumoxide::page::Page> {
        let pages = self.browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| HunterError::Other(format!("Failed to create page: {}", e)))
    }

    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile dir per instance so parallel runs don't share state
                let unique_id = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
                let temp_dir = std::env::temp_dir().join(format!("element-hunter-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    HunterError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };
                config = config.user_data_dir(&temp_dir);

                // Linux AppArmor workaround
                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }
                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                let config = config.build().map_err(|e| {
                    HunterError::LaunchFailed(format!(
                        "{}. Install Chrome or pass --chrome-path /path/to/chrome",
                        e
                    ))
                })?;
                let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
                    HunterError::LaunchFailed(format!(
                        "{}. \n\n\
                         Chrome not found. You can:\n\
                         - Install Chrome: https://www.google.com/chrome/\n\
                         - Or specify path: --chrome-path /path/to/chrome\n\
                         - Linux sandbox issue? Try: --no-sandbox",
                        e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    HunterError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, None)
            }
        };

        log::info!("🌐 Chrome ready");
        Ok(Self {
            browser,
            temp_dir,
            instrumented: Mutex::new(HashSet::new()),
        })
    }

    /// Register the click-listener script on `page` once per target
    async fn instrument(&self, page: &chromiumoxide::page::Page) -> Result<()> {
        let target = page.target_id().inner().clone();
        {
            let instrumented = self
                .instrumented
                .lock()
                .map_err(|_| HunterError::Other("instrumentation lock poisoned".to_string()))?;
            if instrumented.contains(&target) {
                return Ok(());
            }
        }

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(CLICK_LISTENERS_SCRIPT))
            .await?;
        log::debug!("Click-listener tracking installed on {}", target);
        if let Ok(mut instrumented) = self.instrumented.lock() {
            instrumented.insert(target);
        }
        Ok(())
    }

    /// Navigate the active page and wait for its load event
    pub async fn navigate(&self, url: &str) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};

        let normalized_url = if !url.starts_with("http://")
            && !url.starts_with("https://")
            && !url.starts_with("file://")
            && !url.starts_with("about:")
            && !url.starts_with("data:")
        {
            format!("https://{}", url)
        } else {
            url.to_string()
        };
        log::info!("🚀 Navigating to {}", normalized_url);

        let page = self.get_active_page().await?;
        self.instrument(&page).await?;
        let params = NavigateParams::builder()
            .url(&normalized_url)
            .build()
            .map_err(|e| {
                HunterError::NavigationFailed(format!("Invalid URL {}: {}", normalized_url, e))
            })?;

        let response = page.execute(params).await.map_err(|e| {
            if e.to_string().contains("oneshot canceled") {
                HunterError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                HunterError::NavigationFailed(format!(
                    "Failed to navigate to {}: {}",
                    normalized_url, e
                ))
            }
        })?;
        if let Some(error_text) = response.result.error_text.clone() {
            return Err(HunterError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        let load_result = tokio::time::timeout(
            tokio::time::Duration::from_secs(30),
            page.event_listener::<EventLoadEventFired>(),
        )
        .await;
        match load_result {
            Ok(Ok(_)) => log::debug!("Page load event fired"),
            Ok(Err(e)) => log::warn!("⚠️  Could not wait for load event: {}", e),
            Err(_) => {
                return Err(HunterError::NavigationFailed(format!(
                    "Timed out waiting for {} to load",
                    normalized_url
                )))
            }
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        log::info!("✓ Navigation completed");
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        let page = self.get_active_page().await?;
        page.url()
            .await
            .map_err(|e| HunterError::Other(e.to_string()))?
            .ok_or(HunterError::NoPage)
    }

    /// Execute arbitrary JavaScript in the page context
    pub async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.get_active_page().await?;

        let result = page
            .evaluate(script)
            .await
            .map_err(|e| HunterError::Other(format!("Script execution failed: {}", e)))?;

        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    /// Execute JavaScript and deserialize its result
    pub async fn execute_script_typed<T: serde::de::DeserializeOwned>(
        &self,
        script: &str,
    ) -> Result<T> {
        let page = self.get_active_page().await?;

        let result = page
            .evaluate(script)
            .await
            .map_err(|e| HunterError::Other(format!("Script execution failed: {}", e)))?;

        result
            .into_value()
            .map_err(|e| HunterError::Other(format!("Failed to deserialize result: {}", e)))
    }

    /// Snapshot the page's DOM together with the element stack at a viewport point
    pub async fn snapshot_at(&self, x: f64, y: f64) -> Result<PageCapture> {
        let script = invoke(DOM_SNAPSHOT_SCRIPT, &[x.into(), y.into()]);
        let snapshot: DomSnapshot = self.execute_script_typed(&script).await?;
        log::debug!(
            "📸 Snapshot of {} with {} nodes, {} under pointer",
            snapshot.url,
            snapshot.nodes.len(),
            snapshot.stack.len()
        );
        snapshot.into_capture()
    }

    /// Deliver a real click at a viewport point
    pub async fn forward_click(&self, x: f64, y: f64) -> Result<()> {
        let script = format!(
            "(function () {{ const el = document.elementFromPoint({}, {}); if (el) el.click(); return !!el; }})()",
            x, y
        );
        self.execute_script(&script).await?;
        Ok(())
    }

    /// Show, update or (with `None`) remove the status overlay
    pub async fn render_overlay(&self, overlay_id: &str, status: Option<&OverlayStatus>) -> Result<()> {
        let text = match status {
            Some(status) => serde_json::Value::String(status.to_string()),
            None => serde_json::Value::Null,
        };
        let script = invoke(OVERLAY_SCRIPT, &[overlay_id.into(), text]);
        self.execute_script(&script).await?;
        Ok(())
    }

    /// Turn the page-side hover highlight on or off
    ///
    /// Turning it off detaches the listeners and restores every node that is
    /// still highlighted, whether or not its `mouseout` fired. Returns the
    /// number of nodes highlighted afterwards.
    pub async fn set_hover_highlight(&self, overlay_id: &str, enabled: bool) -> Result<usize> {
        let script = invoke(HOVER_SCRIPT, &[overlay_id.into(), enabled.into()]);
        self.execute_script_typed(&script).await
    }

    /// Bring overlay and hover highlight in line with the engine status
    pub async fn sync_hunt_ui(&self, overlay_id: &str, status: Option<&OverlayStatus>) -> Result<()> {
        self.render_overlay(overlay_id, status).await?;
        self.set_hover_highlight(overlay_id, status.is_some()).await?;
        Ok(())
    }

    /// Count each locator with the page's own selector and XPath engines
    pub async fn count_locators(&self, query: &LocatorQuery) -> Result<SelectorCounts> {
        let script = invoke(LOCATOR_COUNTS_SCRIPT, &[serde_json::to_value(query)?]);
        self.execute_script_typed(&script).await
    }

    /// Whether the browser connection still answers
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => match pages.first() {
                Some(page) => matches!(
                    tokio::time::timeout(tokio::time::Duration::from_secs(2), page.url()).await,
                    Ok(Ok(_))
                ),
                None => true,
            },
            Err(_) => false,
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| HunterError::Other(e.to_string()))?;
        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
