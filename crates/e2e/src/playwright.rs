//! Playwright browser automation
//!
//! A single long-lived Node.js process per browser session runs the
//! Playwright library and executes one command per stdin line, answering
//! with one JSON line on stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::{Driver, DriverFactory, WaitState};
use crate::error::{E2eError, E2eResult};
use crate::locator::Selector;

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

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Default timeout for every element action and navigation
    pub action_timeout_ms: u64,

    /// Directory `require('playwright')` is resolved from
    pub project_dir: PathBuf,

    pub node_binary: String,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout_ms: 5000,
            project_dir: PathBuf::from("."),
            node_binary: "node".to_string(),
        }
    }
}

impl PlaywrightConfig {
    /// How long to wait for the bridge to answer a command.
    ///
    /// The bridge enforces action timeouts itself; this only guards against a
    /// wedged node process, so it always outlasts the longest timeout the
    /// command may use.
    pub fn response_grace(&self, timeout: Option<Duration>) -> Duration {
        let action = Duration::from_millis(self.action_timeout_ms * 2);
        action.max(timeout.unwrap_or_default()) + Duration::from_secs(5)
    }

    /// Build the bridge script run by node
    pub fn build_script(&self) -> String {
        format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  page.setDefaultTimeout({timeout});

  const ops = {{
    goto: async (c) => {{ await page.goto(c.url); return null; }},
    click: async (c) => {{ await page.locator(c.selector).click(); return null; }},
    fill: async (c) => {{ await page.locator(c.selector).fill(c.value); return null; }},
    press: async (c) => {{ await page.locator(c.selector).press(c.key); return null; }},
    wait_for: async (c) => {{
      await page.locator(c.selector).first().waitFor({{ state: c.state, timeout: c.timeout }});
      return null;
    }},
    text_content: (c) => page.locator(c.selector).textContent(),
    all_text_contents: (c) => page.locator(c.selector).allTextContents(),
    attribute: (c) => page.locator(c.selector).getAttribute(c.name),
    count: (c) => page.locator(c.selector).count(),
    screenshot: async () => (await page.screenshot()).toString('base64'),
    current_url: async () => page.url(),
    close: async () => {{ await browser.close(); return null; }},
  }};

  send({{ id: 0, ok: true, value: 'ready' }});

  const rl = readline.createInterface({{ input: process.stdin }});
  for await (const line of rl) {{
    let cmd = {{ id: null, op: null }};
    try {{
      cmd = JSON.parse(line);
      const value = await ops[cmd.op](cmd);
      send({{ id: cmd.id, ok: true, value: value === undefined ? null : value }});
      if (cmd.op === 'close') process.exit(0);
    }} catch (error) {{
      const kind = error.name === 'TimeoutError'
        ? 'timeout'
        : (cmd.op === 'goto' ? 'navigation' : 'error');
      send({{ id: cmd.id, ok: false, kind, error: error.message }});
    }}
  }}
  await browser.close();
}})().catch((error) => {{
  send({{ id: 0, ok: false, kind: 'launch', error: error.message }});
  process.exit(1);
}});
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = self.viewport_width,
            height = self.viewport_height,
            timeout = self.action_timeout_ms,
        )
    }
}

#[async_trait]
impl DriverFactory for PlaywrightConfig {
    async fn launch(&self) -> E2eResult<Arc<dyn Driver>> {
        let driver = PlaywrightDriver::launch(self.clone()).await?;
        Ok(Arc::new(driver))
    }
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    op: &'a str,
    #[serde(flatten)]
    args: Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

struct Bridge {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Bridge {
    async fn read_response(&mut self, id: u64) -> E2eResult<Response> {
        while let Some(line) = self.stdout.next_line().await? {
            match serde_json::from_str::<Response>(&line) {
                Ok(resp) if resp.id == id => return Ok(resp),
                Ok(resp) => debug!("Ignoring stale bridge response #{}", resp.id),
                // Page scripts may print to stdout as well
                Err(_) => debug!("[node] {}", line),
            }
        }
        Err(E2eError::Playwright("bridge process exited".to_string()))
    }
}

/// Playwright browser session driven through a node bridge process
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
    bridge: Mutex<Bridge>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl PlaywrightDriver {
    /// Start node, launch the browser and wait for the bridge to report ready
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config).await?;

        info!(
            "Launching {} (headless: {})",
            config.browser.as_str(),
            config.headless
        );

        let mut child = Command::new(&config.node_binary)
            .arg("-e")
            .arg(config.build_script())
            .current_dir(&config.project_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!("Failed to spawn {}: {}", config.node_binary, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        let mut bridge = Bridge {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let ready = bridge.read_response(0).await?;
        if !ready.ok {
            return Err(E2eError::Playwright(format!(
                "Browser launch failed: {}",
                ready.error.unwrap_or_default()
            )));
        }

        Ok(Self {
            config,
            bridge: Mutex::new(bridge),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let status = Command::new(&config.node_binary)
            .args(["-e", "require.resolve('playwright')"])
            .current_dir(&config.project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn call(&self, op: &str, args: Value, selector: Option<&Selector>) -> E2eResult<Value> {
        self.call_within(op, args, selector, None).await
    }

    /// Send one command; `timeout` is the explicit limit the command carries
    async fn call_within(
        &self,
        op: &str,
        args: Value,
        selector: Option<&Selector>,
        timeout: Option<Duration>,
    ) -> E2eResult<Value> {
        if self.closed.load(Ordering::Acquire) {
            return Err(E2eError::Playwright("browser session is closed".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&Request { id, op, args })?;
        line.push('\n');

        let mut bridge = self.bridge.lock().await;
        bridge.stdin.write_all(line.as_bytes()).await?;
        bridge.stdin.flush().await?;

        let grace = self.config.response_grace(timeout);
        let resp = tokio::time::timeout(grace, bridge.read_response(id))
            .await
            .map_err(|_| E2eError::Timeout(format!("bridge response to '{}'", op)))??;

        if resp.ok {
            return Ok(resp.value);
        }

        let reason = resp.error.unwrap_or_else(|| "unknown error".to_string());
        debug!("{} failed: {}", op, reason);
        Err(match (resp.kind.as_deref(), selector) {
            (Some("timeout"), Some(selector)) => E2eError::ElementNotFound {
                selector: selector.to_string(),
            },
            (Some("timeout"), None) => E2eError::Timeout(format!("{}: {}", op, reason)),
            (Some("navigation"), _) => E2eError::Navigation {
                url: args_url(&reason),
                reason,
            },
            _ => E2eError::Playwright(reason),
        })
    }

    async fn call_unit(&self, op: &str, args: Value, selector: &Selector) -> E2eResult<()> {
        self.call(op, args, Some(selector)).await.map(|_| ())
    }

    /// Terminate the node process, gracefully first
    async fn stop(&self) -> E2eResult<()> {
        let mut bridge = self.bridge.lock().await;

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = bridge.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            }
        }

        if let Err(e) = bridge.child.kill().await {
            debug!("Bridge already exited: {}", e);
        }
        Ok(())
    }
}

fn args_url(reason: &str) -> String {
    reason
        .split_whitespace()
        .find(|w| w.starts_with("http://") || w.starts_with("https://"))
        .unwrap_or("<unknown>")
        .to_string()
}

#[async_trait]
impl Driver for PlaywrightDriver {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("goto {}", url);
        match self.call("goto", json!({ "url": url }), None).await {
            Err(E2eError::Navigation { reason, .. }) => Err(E2eError::Navigation {
                url: url.to_string(),
                reason,
            }),
            other => other.map(|_| ()),
        }
    }

    async fn click(&self, selector: &Selector) -> E2eResult<()> {
        self.call_unit("click", json!({ "selector": selector }), selector).await
    }

    async fn fill(&self, selector: &Selector, value: &str) -> E2eResult<()> {
        self.call_unit("fill", json!({ "selector": selector, "value": value }), selector)
            .await
    }

    async fn press(&self, selector: &Selector, key: &str) -> E2eResult<()> {
        self.call_unit("press", json!({ "selector": selector, "key": key }), selector)
            .await
    }

    async fn wait_for(
        &self,
        selector: &Selector,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        let args = json!({
            "selector": selector,
            "state": state.as_str(),
            "timeout": timeout.as_millis() as u64,
        });
        self.call_within("wait_for", args, Some(selector), Some(timeout))
            .await
            .map(|_| ())
    }

    async fn text_content(&self, selector: &Selector) -> E2eResult<String> {
        let value = self
            .call("text_content", json!({ "selector": selector }), Some(selector))
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn all_text_contents(&self, selector: &Selector) -> E2eResult<Vec<String>> {
        let value = self
            .call("all_text_contents", json!({ "selector": selector }), Some(selector))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn attribute(&self, selector: &Selector, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .call("attribute", json!({ "selector": selector, "name": name }), Some(selector))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn count(&self, selector: &Selector) -> E2eResult<usize> {
        let value = self.call("count", json!({ "selector": selector }), Some(selector)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        let value = self.call("screenshot", json!({}), None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| E2eError::Playwright("screenshot returned no data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| E2eError::Playwright(format!("invalid screenshot payload: {}", e)))
    }

    async fn current_url(&self) -> E2eResult<String> {
        let value = self.call("current_url", json!({}), None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn close(&self) -> E2eResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Err(e) = self.call("close", json!({}), None).await {
            warn!("Browser close failed: {}", e);
        }
        self.closed.store(true, Ordering::Release);
        self.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_from_str() {
        assert_eq!("firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert_eq!("Chrome".parse::<Browser>().unwrap(), Browser::Chromium);
        assert!("lynx".parse::<Browser>().is_err());
    }

    #[test]
    fn test_build_script_uses_config() {
        let config = PlaywrightConfig {
            browser: Browser::Webkit,
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            action_timeout_ms: 750,
            ..Default::default()
        };
        let script = config.build_script();
        assert!(script.contains("await webkit.launch({ headless: false })"));
        assert!(script.contains("viewport: { width: 1920, height: 1080 }"));
        assert!(script.contains("page.setDefaultTimeout(750)"));
    }

    #[test]
    fn test_bridge_survives_malformed_command() {
        let script = PlaywrightConfig::default().build_script();
        let parse = script.find("cmd = JSON.parse(line)").unwrap();
        let guarded = script[..parse].rfind("try {").unwrap();
        let loop_start = script.find("for await (const line of rl)").unwrap();
        assert!(loop_start < guarded, "command parsing must sit inside the try block");
    }

    #[test]
    fn test_response_grace_outlasts_explicit_timeout() {
        let config = PlaywrightConfig {
            action_timeout_ms: 1000,
            ..Default::default()
        };
        assert_eq!(config.response_grace(None), Duration::from_secs(7));
        assert_eq!(config.response_grace(Some(Duration::from_secs(1))), Duration::from_secs(7));
        assert_eq!(
            config.response_grace(Some(Duration::from_secs(30))),
            Duration::from_secs(35)
        );
    }

    #[test]
    fn test_request_flattens_args() {
        let line = serde_json::to_string(&Request {
            id: 3,
            op: "fill",
            args: json!({ "selector": "#q", "value": "rust" }),
        })
        .unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["op"], "fill");
        assert_eq!(parsed["selector"], "#q");
        assert_eq!(parsed["id"], 3);
    }

    #[test]
    fn test_args_url() {
        assert_eq!(
            args_url("net::ERR_NAME_NOT_RESOLVED at https://nope.invalid/"),
            "https://nope.invalid/"
        );
        assert_eq!(args_url("something else"), "<unknown>");
    }
}
