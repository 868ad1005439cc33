//! Headless Chrome renderer over the DevTools protocol.
//!
//! One browser process serves every conversion in the process. Each render
//! opens its own tab, loads the markup, prints it and closes the tab, so
//! concurrent conversions never share a page.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::renderer::{DocumentRenderer, PrintOptions, RenderSource, RendererInfo};
use super::shared::{Engine, EngineLauncher, SharedEngine};
use crate::config::RendererConfig;
use crate::error::{Error, Result};

/// A4 in inches, as the DevTools print call expects.
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;
const MM_PER_INCH: f64 = 25.4;

/// A running browser plus the task pumping its websocket.
pub struct ChromeEngine {
    browser: Browser,
    connected: Arc<AtomicBool>,
    handler: JoinHandle<()>,
}

impl Engine for ChromeEngine {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.handler.is_finished()
    }
}

impl Drop for ChromeEngine {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Launches Chrome according to [`RendererConfig`].
pub struct ChromeLauncher {
    config: RendererConfig,
}

#[async_trait]
impl EngineLauncher for ChromeLauncher {
    type Engine = ChromeEngine;

    async fn launch(&self) -> Result<ChromeEngine> {
        let mut builder = BrowserConfig::builder()
            .launch_timeout(Duration::from_secs(self.config.launch_timeout_secs))
            .request_timeout(Duration::from_secs(self.config.navigation_timeout_secs))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if let Some(executable) = &self.config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        if self.config.no_sandbox {
            builder = builder.no_sandbox();
        }
        for arg in &self.config.extra_args {
            builder = builder.arg(arg.as_str());
        }
        let browser_config = builder.build().map_err(Error::BackendUnavailable)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| Error::BackendUnavailable(format!("failed to launch Chrome: {e}")))?;

        let connected = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&connected);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Chrome handler event error: {}", e);
                }
            }
            flag.store(false, Ordering::SeqCst);
            warn!("Chrome connection closed");
        });

        Ok(ChromeEngine {
            browser,
            connected,
            handler,
        })
    }
}

/// [`DocumentRenderer`] backed by a shared headless Chrome.
pub struct ChromeRenderer {
    engine: SharedEngine<ChromeLauncher>,
    navigation_timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(config: RendererConfig) -> Self {
        let navigation_timeout = Duration::from_secs(config.navigation_timeout_secs);
        Self {
            engine: SharedEngine::new(ChromeLauncher { config }),
            navigation_timeout,
        }
    }
}

fn print_params(options: &PrintOptions) -> PrintToPdfParams {
    let header_footer = options.has_header_footer();
    let blank = || "<span></span>".to_string();
    PrintToPdfParams {
        landscape: Some(options.landscape),
        display_header_footer: Some(header_footer),
        print_background: Some(options.print_background),
        scale: Some(options.scale),
        paper_width: Some(A4_WIDTH_IN),
        paper_height: Some(A4_HEIGHT_IN),
        margin_top: Some(options.margins.top / MM_PER_INCH),
        margin_bottom: Some(options.margins.bottom / MM_PER_INCH),
        margin_left: Some(options.margins.left / MM_PER_INCH),
        margin_right: Some(options.margins.right / MM_PER_INCH),
        header_template: header_footer
            .then(|| options.header_template.clone().unwrap_or_else(blank)),
        footer_template: header_footer
            .then(|| options.footer_template.clone().unwrap_or_else(blank)),
        ..Default::default()
    }
}

/// Run one DevTools step, giving up after `limit`.
async fn within<T>(
    limit: Duration,
    what: &'static str,
    step: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, step)
        .await
        .map_err(|_| Error::Timeout {
            what,
            secs: limit.as_secs(),
        })?
}

async fn file_url(path: &Path) -> Result<String> {
    let absolute = tokio::fs::canonicalize(path).await?;
    Ok(format!("file://{}", absolute.display()))
}

#[async_trait]
impl DocumentRenderer for ChromeRenderer {
    fn info(&self) -> RendererInfo {
        RendererInfo {
            name: "chrome",
            shared_engine: true,
        }
    }

    async fn render(&self, source: RenderSource<'_>, options: &PrintOptions) -> Result<Vec<u8>> {
        let engine = self.engine.acquire().await?;

        let page = match engine.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                self.engine.invalidate(&engine).await;
                return Err(Error::BackendUnavailable(format!("could not open a tab: {e}")));
            }
        };

        let result = async {
            let load = async {
                match source {
                    RenderSource::Html(html) => page.set_content(html).await.map(|_| ()),
                    RenderSource::File(path) => {
                        let url = file_url(path).await?;
                        page.goto(url).await.map(|_| ())
                    }
                }
                .map_err(|e| Error::RenderFault(format!("page load failed: {e}")))
            };
            within(self.navigation_timeout, "page load", load).await?;

            let print = async {
                page.pdf(print_params(options))
                    .await
                    .map_err(|e| Error::RenderFault(format!("printing failed: {e}")))
            };
            within(self.navigation_timeout, "printing", print).await
        }
        .await;

        if let Err(e) = page.close().await {
            debug!("Failed to close Chrome tab: {}", e);
        }
        result
    }
}
