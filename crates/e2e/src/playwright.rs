//! Playwright browser automation
//!
//! A long-lived `node` process runs the embedded driver script and executes
//! one JSON command per line. Replies carry the request id, so any number of
//! commands can be in flight; unsolicited lines are page events.

use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, trace, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

const DRIVER_SCRIPT: &str = include_str!("driver.js");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Driver(format!("unsupported browser '{}'", other))),
        }
    }
}

/// Load states accepted by `goto` and `wait_for_load_state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

/// Element states accepted by `Locator::wait_for`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// Target of `Page::wait_for_url`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlPattern {
    Glob(String),
    Pattern { source: String, ignore_case: bool },
}

impl UrlPattern {
    pub fn regex(source: impl Into<String>) -> Self {
        UrlPattern::Pattern {
            source: source.into(),
            ignore_case: false,
        }
    }
}

/// Navigation timing entry pulled from `performance`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub load_time: f64,
    pub dom_content_loaded: f64,
    pub response_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A network request that never completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRequest {
    pub url: String,
    pub method: String,
    pub error_text: Option<String>,
}

/// A `console.error` emitted by the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleError {
    pub text: String,
    pub url: Option<String>,
    pub line: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    Ready {
        browser: String,
        version: Option<String>,
    },
    RequestFailed(FailedRequest),
    ConsoleError(ConsoleError),
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// One stdout line from the driver
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DriverLine {
    Reply(Reply),
    Event(PageEvent),
}

type DriverInput = Box<dyn AsyncWrite + Send + Unpin>;

/// Request side of the driver pipe
pub(crate) struct Driver {
    stdin: Mutex<DriverInput>,
    pending: DashMap<u64, oneshot::Sender<Reply>>,
    events: SyncMutex<Vec<PageEvent>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    command_timeout: Duration,
}

impl Driver {
    fn new(stdin: impl AsyncWrite + Send + Unpin + 'static, command_timeout: Duration) -> Self {
        Self {
            stdin: Mutex::new(Box::new(stdin)),
            pending: DashMap::new(),
            events: SyncMutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            command_timeout,
        }
    }

    /// Send one command and wait for its reply
    pub(crate) async fn call(&self, cmd: &str, args: Value) -> E2eResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(E2eError::DriverClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut request = match args {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(E2eError::Driver(format!("arguments must be an object, got {}", other)))
            }
        };
        request.insert("id".to_string(), json!(id));
        request.insert("cmd".to_string(), json!(cmd));

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let line = serde_json::to_string(&request)?;
        trace!("driver <- {}", line);
        {
            let mut stdin = self.stdin.lock().await;
            let written = async {
                stdin.write_all(line.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.flush().await
            }
            .await;
            if let Err(e) = written {
                self.pending.remove(&id);
                return Err(e.into());
            }
        }

        let reply = match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(E2eError::DriverClosed),
            Err(_) => {
                self.pending.remove(&id);
                return Err(E2eError::Timeout(format!("driver reply to '{}'", cmd)));
            }
        };

        if reply.ok {
            Ok(reply.value)
        } else {
            Err(E2eError::Browser {
                command: cmd.to_string(),
                message: reply.error.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    fn dispatch(&self, line: &str) {
        match serde_json::from_str::<DriverLine>(line) {
            Ok(DriverLine::Reply(reply)) => match self.pending.remove(&reply.id) {
                Some((_, tx)) => {
                    let _ = tx.send(reply);
                }
                None => debug!("Dropping reply for abandoned request {}", reply.id),
            },
            Ok(DriverLine::Event(event)) => self.events.lock().push(event),
            Err(e) => warn!("Unparseable driver output ({}): {}", e, line),
        }
    }

    fn shut(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders wakes every waiter with DriverClosed
        self.pending.clear();
    }
}

/// Cheap handle to the single page of a session
#[derive(Clone)]
pub struct Page {
    driver: Arc<Driver>,
    screenshot_dir: PathBuf,
}

impl Page {
    pub(crate) async fn call(&self, cmd: &str, args: Value) -> E2eResult<Value> {
        self.driver.call(cmd, args).await
    }

    /// Build a locator rooted at the page
    pub fn locator(&self, selector: impl Into<String>) -> Locator {
        Locator::new(self.clone(), selector)
    }

    pub async fn goto(&self, url: &str, wait_until: LoadState, timeout_ms: u64) -> E2eResult<Option<u16>> {
        debug!("goto {}", url);
        let status = self
            .call("goto", json!({ "url": url, "wait_until": wait_until, "timeout": timeout_ms }))
            .await?;
        Ok(status.as_u64().map(|s| s as u16))
    }

    pub async fn url(&self) -> E2eResult<String> {
        let value = self.call("url", Value::Null).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn title(&self) -> E2eResult<String> {
        let value = self.call("title", Value::Null).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn wait_for_load_state(&self, state: LoadState, timeout_ms: u64) -> E2eResult<()> {
        self.call("wait_for_load_state", json!({ "state": state, "timeout": timeout_ms }))
            .await?;
        Ok(())
    }

    pub async fn wait_for_url(&self, pattern: UrlPattern, timeout_ms: u64) -> E2eResult<()> {
        self.call("wait_for_url", json!({ "pattern": pattern, "timeout": timeout_ms }))
            .await?;
        Ok(())
    }

    pub async fn go_back(&self, timeout_ms: u64) -> E2eResult<()> {
        self.call("go_back", json!({ "timeout": timeout_ms })).await?;
        Ok(())
    }

    pub async fn reload(&self, timeout_ms: u64) -> E2eResult<()> {
        self.call("reload", json!({ "timeout": timeout_ms })).await?;
        Ok(())
    }

    pub async fn keyboard_press(&self, key: &str) -> E2eResult<()> {
        self.call("keyboard_press", json!({ "key": key })).await?;
        Ok(())
    }

    pub async fn mouse_move(&self, x: f64, y: f64) -> E2eResult<()> {
        self.call("mouse_move", json!({ "x": x, "y": y })).await?;
        Ok(())
    }

    /// Evaluate a JS expression or function source in the page
    pub async fn evaluate(&self, expression: &str) -> E2eResult<Value> {
        self.call("evaluate", json!({ "expression": expression })).await
    }

    pub async fn set_viewport(&self, width: u32, height: u32) -> E2eResult<()> {
        self.call("set_viewport", json!({ "width": width, "height": height }))
            .await?;
        Ok(())
    }

    pub async fn viewport(&self) -> E2eResult<Option<Viewport>> {
        let value = self.call("viewport", Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.call(
            "screenshot",
            json!({ "path": path.to_string_lossy(), "full_page": full_page }),
        )
        .await?;
        Ok(path.to_path_buf())
    }

    /// Full-page screenshot named `<name>-<unix millis>.png`
    pub async fn screenshot_named(&self, name: &str) -> E2eResult<PathBuf> {
        let file = format!("{}-{}.png", name, chrono::Utc::now().timestamp_millis());
        let path = self.screenshot_dir.join(file);
        let path = self.screenshot(&path, true).await?;
        debug!("Screenshot saved: {}", path.display());
        Ok(path)
    }

    /// Abort every request matching the glob
    pub async fn route_abort(&self, pattern: &str) -> E2eResult<()> {
        self.call("route_abort", json!({ "pattern": pattern })).await?;
        Ok(())
    }

    pub async fn unroute(&self, pattern: &str) -> E2eResult<()> {
        self.call("unroute", json!({ "pattern": pattern })).await?;
        Ok(())
    }

    pub async fn cookies(&self) -> E2eResult<Vec<Value>> {
        let value = self.call("cookies", Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn wait(&self, ms: u64) -> E2eResult<()> {
        self.call("wait", json!({ "ms": ms })).await?;
        Ok(())
    }

    /// Events recorded since the previous drain
    pub fn drain_events(&self) -> Vec<PageEvent> {
        std::mem::take(&mut *self.driver.events.lock())
    }

    /// Navigation timing of the current document
    pub async fn performance_metrics(&self) -> E2eResult<PerformanceMetrics> {
        let value = self
            .evaluate(
                r#"() => {
                    const nav = performance.getEntriesByType("navigation")[0];
                    if (!nav) return { loadTime: 0, domContentLoaded: 0, responseTime: 0 };
                    return {
                        loadTime: nav.loadEventEnd - nav.loadEventStart,
                        domContentLoaded: nav.domContentLoadedEventEnd - nav.domContentLoadedEventStart,
                        responseTime: nav.responseEnd - nav.requestStart,
                    };
                }"#,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Default timeout applied to every Playwright action
    pub default_timeout_ms: u64,

    /// How long to wait for any single driver reply
    pub command_timeout: Duration,

    /// Node executable
    pub node_binary: PathBuf,

    /// `node_modules` directory that contains `playwright`
    pub node_modules: Option<PathBuf>,

    pub screenshot_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            default_timeout_ms: 30_000,
            command_timeout: Duration::from_secs(90),
            node_binary: PathBuf::from("node"),
            node_modules: None,
            screenshot_dir: PathBuf::from("test-results/screenshots"),
        }
    }
}

/// A running driver process with one browser page
pub struct Session {
    child: Child,
    driver: Arc<Driver>,
    page: Page,
    _work_dir: tempfile::TempDir,
}

impl Session {
    /// Spawn the driver and wait until the browser is up
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed()?;
        std::fs::create_dir_all(&config.screenshot_dir)?;

        let work_dir = tempfile::tempdir()?;
        let script_path = work_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let options = json!({
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "viewport_width": config.viewport_width,
            "viewport_height": config.viewport_height,
            "default_timeout_ms": config.default_timeout_ms,
        });

        let node_modules = match &config.node_modules {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?.join("node_modules"),
        };

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .arg(options.to_string())
            .env("NODE_PATH", &node_modules)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Driver(format!(
                    "Failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout unavailable".to_string()))?;
        let stderr = child.stderr.take();

        let driver = Arc::new(Driver::new(stdin, config.command_timeout));

        let (ready_tx, ready_rx) = oneshot::channel::<PageEvent>();
        let reader = driver.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut ready_tx = Some(ready_tx);
            while let Ok(Some(line)) = lines.next_line().await {
                trace!("driver -> {}", line);
                if let Some(tx) = ready_tx.take() {
                    match serde_json::from_str::<PageEvent>(&line) {
                        Ok(event @ PageEvent::Ready { .. }) => {
                            let _ = tx.send(event);
                            continue;
                        }
                        _ => ready_tx = Some(tx),
                    }
                }
                reader.dispatch(&line);
            }
            reader.shut();
        });

        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[driver] {}", line);
                }
            });
        }

        match tokio::time::timeout(config.command_timeout, ready_rx).await {
            Ok(Ok(PageEvent::Ready { browser, version })) => {
                info!(
                    "Browser ready: {} {}",
                    browser,
                    version.as_deref().unwrap_or("")
                );
            }
            Ok(_) => {
                return Err(E2eError::Driver(
                    "driver exited before the browser was ready (see debug log)".to_string(),
                ))
            }
            Err(_) => return Err(E2eError::Timeout("browser launch".to_string())),
        }

        let page = Page {
            driver: driver.clone(),
            screenshot_dir: config.screenshot_dir.clone(),
        };

        Ok(Self {
            child,
            driver,
            page,
            _work_dir: work_dir,
        })
    }

    pub fn page(&self) -> Page {
        self.page.clone()
    }

    /// Close the browser and reap the driver process
    pub async fn close(mut self) -> E2eResult<()> {
        if let Err(e) = self.driver.call("close", Value::Null).await {
            debug!("Driver close command failed: {}", e);
        }
        self.driver.shut();

        if tokio::time::timeout(Duration::from_secs(5), self.child.wait())
            .await
            .is_ok()
        {
            return Ok(());
        }

        warn!("Driver did not exit, terminating");
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(Duration::from_millis(500), self.child.wait())
                        .await
                        .is_ok()
                {
                    return Ok(());
                }
            }
        }

        let _ = self.child.kill().await;
        Ok(())
    }
}

/// Check that Playwright is installed
pub fn check_playwright_installed() -> E2eResult<()> {
    let status = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_and_event_lines_are_told_apart() {
        let reply: DriverLine = serde_json::from_str(r#"{"id":7,"ok":true,"value":3}"#).unwrap();
        assert!(matches!(reply, DriverLine::Reply(Reply { id: 7, ok: true, .. })));

        let failure: DriverLine =
            serde_json::from_str(r#"{"id":8,"ok":false,"error":"Timeout 5000ms exceeded"}"#).unwrap();
        match failure {
            DriverLine::Reply(r) => {
                assert!(!r.ok);
                assert_eq!(r.error.as_deref(), Some("Timeout 5000ms exceeded"));
            }
            other => panic!("expected reply, got {:?}", other),
        }

        let event: DriverLine = serde_json::from_str(
            r#"{"event":"request_failed","url":"https://x/a.js","method":"GET","error_text":"net::ERR_FAILED"}"#,
        )
        .unwrap();
        match event {
            DriverLine::Event(PageEvent::RequestFailed(req)) => {
                assert_eq!(req.method, "GET");
                assert_eq!(req.error_text.as_deref(), Some("net::ERR_FAILED"));
            }
            other => panic!("expected request_failed, got {:?}", other),
        }
    }

    #[test]
    fn test_console_error_event_without_location() {
        let event: PageEvent =
            serde_json::from_str(r#"{"event":"console_error","text":"boom","url":null,"line":null}"#).unwrap();
        assert_eq!(
            event,
            PageEvent::ConsoleError(ConsoleError {
                text: "boom".to_string(),
                url: None,
                line: None
            })
        );
    }

    #[test]
    fn test_wire_enums() {
        assert_eq!(serde_json::to_value(LoadState::NetworkIdle).unwrap(), json!("networkidle"));
        assert_eq!(serde_json::to_value(LoadState::DomContentLoaded).unwrap(), json!("domcontentloaded"));
        assert_eq!(serde_json::to_value(WaitState::Visible).unwrap(), json!("visible"));
        assert_eq!(
            serde_json::to_value(UrlPattern::Glob("**/checkout/**".into())).unwrap(),
            json!({ "glob": "**/checkout/**" })
        );
        assert_eq!(
            serde_json::to_value(UrlPattern::regex("/about/")).unwrap(),
            json!({ "pattern": { "source": "/about/", "ignore_case": false } })
        );
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("Firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert_eq!("chrome".parse::<Browser>().unwrap(), Browser::Chromium);
        assert!("lynx".parse::<Browser>().is_err());
    }

    #[test]
    fn test_performance_metrics_from_js_names() {
        let metrics: PerformanceMetrics =
            serde_json::from_value(json!({ "loadTime": 12.5, "domContentLoaded": 3.0, "responseTime": 80.0 }))
                .unwrap();
        assert_eq!(metrics.load_time, 12.5);
        assert_eq!(metrics.dom_content_loaded, 3.0);
    }

    async fn next_request(lines: &mut tokio::io::Lines<BufReader<tokio::io::DuplexStream>>) -> Value {
        let line = lines.next_line().await.unwrap().expect("request line");
        serde_json::from_str(&line).unwrap()
    }

    fn driver_pair(timeout: Duration) -> (Arc<Driver>, tokio::io::Lines<BufReader<tokio::io::DuplexStream>>) {
        let (input, output) = tokio::io::duplex(4096);
        (Arc::new(Driver::new(input, timeout)), BufReader::new(output).lines())
    }

    #[tokio::test]
    async fn test_out_of_order_replies_reach_their_callers() {
        let (driver, mut requests) = driver_pair(Duration::from_secs(5));

        let first = tokio::spawn({
            let driver = driver.clone();
            async move { driver.call("title", Value::Null).await }
        });
        let a = next_request(&mut requests).await;
        let second = tokio::spawn({
            let driver = driver.clone();
            async move { driver.call("url", json!({ "frame": "main" })).await }
        });
        let b = next_request(&mut requests).await;

        assert_eq!(a["cmd"], "title");
        assert_eq!(b["cmd"], "url");
        assert_eq!(b["frame"], "main");
        assert_ne!(a["id"], b["id"]);
        assert_eq!(driver.pending.len(), 2);

        driver.dispatch(&json!({ "id": b["id"], "ok": true, "value": "https://x/cart/" }).to_string());
        driver.dispatch(&json!({ "id": a["id"], "ok": true, "value": "Cart" }).to_string());

        assert_eq!(second.await.unwrap().unwrap(), json!("https://x/cart/"));
        assert_eq!(first.await.unwrap().unwrap(), json!("Cart"));
        assert!(driver.pending.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_reply_ids_and_events_leave_waiters_alone() {
        let (driver, mut requests) = driver_pair(Duration::from_secs(5));

        let call = tokio::spawn({
            let driver = driver.clone();
            async move { driver.call("click", Value::Null).await }
        });
        let req = next_request(&mut requests).await;

        driver.dispatch(r#"{"id":9999,"ok":true,"value":1}"#);
        driver.dispatch(r#"{"event":"console_error","text":"boom","url":null,"line":null}"#);
        driver.dispatch("not json");
        assert_eq!(driver.pending.len(), 1);
        assert_eq!(driver.events.lock().len(), 1);

        driver.dispatch(&json!({ "id": req["id"], "ok": false, "error": "element detached" }).to_string());
        match call.await.unwrap() {
            Err(E2eError::Browser { command, message }) => {
                assert_eq!(command, "click");
                assert_eq!(message, "element detached");
            }
            other => panic!("expected browser error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shut_wakes_pending_callers() {
        let (driver, mut requests) = driver_pair(Duration::from_secs(5));

        let call = tokio::spawn({
            let driver = driver.clone();
            async move { driver.call("goto", json!({ "url": "https://x/" })).await }
        });
        next_request(&mut requests).await;

        driver.shut();
        assert!(matches!(call.await.unwrap(), Err(E2eError::DriverClosed)));
        assert!(matches!(driver.call("title", Value::Null).await, Err(E2eError::DriverClosed)));
    }

    #[tokio::test]
    async fn test_silent_driver_times_out_and_forgets_the_request() {
        let (driver, mut requests) = driver_pair(Duration::from_millis(50));

        let call = tokio::spawn({
            let driver = driver.clone();
            async move { driver.call("title", Value::Null).await }
        });
        let req = next_request(&mut requests).await;

        assert!(matches!(call.await.unwrap(), Err(E2eError::Timeout(_))));
        assert!(driver.pending.is_empty());
        driver.dispatch(&json!({ "id": req["id"], "ok": true, "value": "late" }).to_string());
    }

    #[tokio::test]
    async fn test_non_object_arguments_are_rejected() {
        let (input, _output) = tokio::io::duplex(64);
        let driver = Driver::new(input, Duration::from_secs(1));
        let err = driver.call("title", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, E2eError::Driver(_)));
        assert!(driver.pending.is_empty());
    }
}
