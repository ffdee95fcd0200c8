use crate::error::{BrowserError, Result};
use crate::fingerprint::Fingerprint;
use crate::tab::{BrowserTab, ExchangeHandle, ExchangeStream, InterceptedExchange, TabProvider};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, GetResponseBodyParams, RequestId,
    RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::stream::StreamExt;
use pagewire_core::BrowserConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Polling interval while waiting for an element to become visible.
const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Browser automation engine
pub struct BrowserEngine {
    browser: Browser,
    fingerprint: Fingerprint,
    handler: JoinHandle<()>,
}

impl BrowserEngine {
    /// Launch a browser with the given launch configuration
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        config.validate()?;
        let fingerprint = Fingerprint::from_config(config);

        let mut builder = CdpConfig::builder()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .args(config.launch_flags());

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(user_agent) = &fingerprint.user_agent {
            builder = builder.arg(format!("--user-agent={user_agent}"));
        }

        let cdp_config = builder.build().map_err(BrowserError::Launch)?;

        tracing::info!(
            "Launching browser (headless={}, viewport={}x{})",
            config.headless,
            fingerprint.viewport_width,
            fingerprint.viewport_height
        );

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            fingerprint,
            handler,
        })
    }

    /// The identity this browser presents.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Close the browser process.
    pub async fn shutdown(mut self) -> Result<()> {
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Chromium(e.to_string()));
        self.handler.abort();
        result
    }
}

impl Drop for BrowserEngine {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait::async_trait]
impl TabProvider for BrowserEngine {
    async fn open_tab(&self) -> Result<Arc<dyn BrowserTab>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;

        if let Some(user_agent) = &self.fingerprint.user_agent {
            page.execute(SetUserAgentOverrideParams::new(user_agent.clone()))
                .await
                .map_err(|e| BrowserError::Chromium(e.to_string()))?;
        }

        Ok(Arc::new(ChromeTab { page }))
    }
}

/// One chromiumoxide page.
pub struct ChromeTab {
    page: Page,
}

impl ChromeTab {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn evaluate_cdp(
        &self,
        script: &str,
    ) -> std::result::Result<serde_json::Value, EvalFailure> {
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(EvalFailure::Params)?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(EvalFailure::Cdp)?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    fn visibility_script(selector: &str) -> Result<String> {
        let selector =
            serde_json::to_string(selector).map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        Ok(format!(
            "(() => {{ \
                const el = document.querySelector({selector}); \
                if (!el) return false; \
                const style = window.getComputedStyle(el); \
                if (style.display === 'none' || style.visibility === 'hidden') return false; \
                const rect = el.getBoundingClientRect(); \
                return rect.width > 0 || rect.height > 0; \
            }})()"
        ))
    }
}

enum EvalFailure {
    Params(String),
    Cdp(CdpError),
}

/// Classify an evaluation failure while polling for an element.
///
/// `None` means "try again": the execution context is replaced while the
/// page navigates, and slow replies are retried until the deadline. A lost
/// connection ends the wait immediately.
fn poll_failure(failure: EvalFailure) -> Option<BrowserError> {
    let error = match failure {
        EvalFailure::Params(reason) => return Some(BrowserError::Evaluation(reason)),
        EvalFailure::Cdp(error) => error,
    };
    match error {
        CdpError::Ws(_)
        | CdpError::Io(_)
        | CdpError::NoResponse
        | CdpError::ChannelSendError(_) => Some(BrowserError::Closed),
        CdpError::Timeout => None,
        CdpError::Chrome(ref e) if is_context_churn(&e.message) => None,
        CdpError::ChromeMessage(ref message) if is_context_churn(message) => None,
        other => Some(BrowserError::Evaluation(other.to_string())),
    }
}

fn is_context_churn(message: &str) -> bool {
    message.contains("Execution context was destroyed")
        || message.contains("Cannot find context with specified id")
        || message.contains("Inspected target navigated or closed")
}

#[async_trait::async_trait]
impl BrowserTab for ChromeTab {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation(format!("{url}: {e}")))
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let script = Self::visibility_script(selector)?;
        let deadline = Instant::now() + timeout;

        loop {
            let visible = match self.evaluate_cdp(&script).await {
                Ok(value) => value.as_bool().unwrap_or(false),
                Err(e) => match poll_failure(e) {
                    Some(fatal) => return Err(fatal),
                    None => false,
                },
            };
            if visible {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} not visible after {timeout:?}"
                )));
            }
            tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.evaluate_cdp(script).await.map_err(|e| match e {
            EvalFailure::Params(reason) => BrowserError::Evaluation(reason),
            EvalFailure::Cdp(e) => BrowserError::Evaluation(e.to_string()),
        })
    }

    async fn query_nodes(&self, selector: &str) -> Result<usize> {
        self.page
            .find_elements(selector)
            .await
            .map(|elements| elements.len())
            .map_err(|e| BrowserError::Chromium(format!("query {selector}: {e}")))
    }

    async fn enable_interception(&self, url_pattern: &str) -> Result<ExchangeStream> {
        // Subscribe before enabling so the first paused response is not missed
        let events = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| BrowserError::Interception(e.to_string()))?;

        let params = EnableParams {
            patterns: Some(vec![RequestPattern {
                url_pattern: Some(url_pattern.to_string()),
                resource_type: None,
                request_stage: Some(RequestStage::Response),
            }]),
            handle_auth_requests: None,
        };
        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::Interception(e.to_string()))?;

        tracing::debug!("Interception enabled for {}", url_pattern);

        Ok(events
            .map(|event| InterceptedExchange {
                handle: ExchangeHandle::new(event.request_id.inner().clone()),
                url: event.request.url.clone(),
            })
            .boxed())
    }

    async fn read_body(&self, handle: &ExchangeHandle) -> Result<Vec<u8>> {
        let response = self
            .page
            .execute(GetResponseBodyParams::new(RequestId::new(handle.as_str())))
            .await
            .map_err(|e| BrowserError::Interception(format!("read body {handle}: {e}")))?
            .result;

        if response.base64_encoded {
            BASE64
                .decode(response.body.as_bytes())
                .map_err(|e| BrowserError::Interception(format!("decode body {handle}: {e}")))
        } else {
            Ok(response.body.into_bytes())
        }
    }

    async fn release(&self, handle: &ExchangeHandle) -> Result<()> {
        self.page
            .execute(ContinueRequestParams::new(RequestId::new(handle.as_str())))
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Interception(format!("release {handle}: {e}")))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_script_escapes_selector() {
        let script = ChromeTab::visibility_script(r#"[data-e2e="search_top-item-list"]"#)
            .expect("build script");
        assert!(script.contains(r#"document.querySelector("[data-e2e=\"search_top-item-list\"]")"#));
    }

    fn chrome_error(message: &str) -> EvalFailure {
        EvalFailure::Cdp(CdpError::Chrome(chromiumoxide::types::Error {
            code: -32000,
            message: message.to_string(),
        }))
    }

    #[test]
    fn test_poll_retries_while_page_navigates() {
        assert!(poll_failure(chrome_error("Execution context was destroyed.")).is_none());
        assert!(poll_failure(chrome_error("Cannot find context with specified id")).is_none());
        assert!(poll_failure(EvalFailure::Cdp(CdpError::Timeout)).is_none());
    }

    #[test]
    fn test_poll_stops_on_lost_connection() {
        assert!(matches!(
            poll_failure(EvalFailure::Cdp(CdpError::NoResponse)),
            Some(BrowserError::Closed)
        ));
        assert!(matches!(
            poll_failure(chrome_error("Target closed")),
            Some(BrowserError::Evaluation(_))
        ));
        assert!(matches!(
            poll_failure(EvalFailure::Params("missing expression".to_string())),
            Some(BrowserError::Evaluation(_))
        ));
    }

    #[test]
    fn test_launch_rejects_invalid_config() {
        let mut config = BrowserConfig::default();
        config.window_height = 0;

        // Validation fails before any process or runtime work.
        let result = tokio_test::block_on(BrowserEngine::launch(&config));
        assert!(matches!(result, Err(BrowserError::Config(_))));
    }
}
