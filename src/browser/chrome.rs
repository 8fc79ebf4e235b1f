use super::{FormNode, FormPage, Role};
use crate::config::{BrowserConfig, TimingConfig};
use crate::error::FillError;
use anyhow::{anyhow, Context, Result};
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::util::Wait;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const READINESS_JS: &str = r#"
(function() {
    return JSON.stringify({
        ready: document.readyState,
        resources: performance.getEntriesByType('resource').length
    });
})();
"#;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A browser plus the one tab the run uses. Dropping it closes the tab, and
/// the browser process too when we launched it.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
    attached: bool,
    timing: TimingConfig,
}

impl ChromeSession {
    pub fn launch(config: &BrowserConfig, timing: &TimingConfig) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((config.window_width, config.window_height)))
            .path(config.chrome_path.clone())
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| anyhow!("Failed to build browser options: {}", e))?;

        let browser = Browser::new(options).map_err(|e| anyhow!("Failed to launch browser: {}", e))?;
        let tab = browser.new_tab().map_err(|e| anyhow!("Failed to open tab: {}", e))?;
        log::info!("[Browser] Launched Chrome (headless: {})", config.headless);

        Ok(Self {
            _browser: browser,
            tab,
            attached: false,
            timing: timing.clone(),
        })
    }

    /// Opens a fresh tab in an already running Chrome reachable at `ws_url`.
    pub fn attach(ws_url: String, timing: &TimingConfig) -> Result<Self> {
        let browser = Browser::connect(ws_url)
            .map_err(|e| anyhow!("Failed to connect to Debugger WebSocket: {}", e))?;
        let tab = browser.new_tab().map_err(|e| anyhow!("Failed to open tab: {}", e))?;
        log::info!("[Browser] Attached to running Chrome");

        Ok(Self {
            _browser: browser,
            tab,
            attached: true,
            timing: timing.clone(),
        })
    }

    pub fn open(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| anyhow!("Failed to navigate: {}", e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| anyhow!("Navigation timeout: {}", e))?;
        let page = self.page();
        let idle = page.wait_for_quiescence(self.timing.idle_timeout());
        log::debug!("[Browser] Initial load idle: {}", idle);
        Ok(())
    }

    pub fn title(&self) -> String {
        self.tab.get_title().unwrap_or_default()
    }

    pub fn page(&self) -> ChromePage<'_> {
        ChromePage {
            tab: &self.tab,
            action_delay: self.timing.action_delay(),
            quiet_window: self.timing.quiet_window(),
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // A launched browser dies with `Browser`; an attached one must keep running.
        if self.attached {
            if let Err(e) = self.tab.close(true) {
                log::warn!("[Browser] Failed to close tab: {}", e);
            }
        }
    }
}

pub struct ChromePage<'t> {
    tab: &'t Tab,
    action_delay: Duration,
    quiet_window: Duration,
}

pub struct ChromeNode<'t> {
    element: Element<'t>,
    action_delay: Duration,
}

fn empty_on_no_match<T>(result: Result<Vec<T>>) -> Result<Vec<T>> {
    match result {
        Err(e) if e.downcast_ref::<NoElementFound>().is_some() => Ok(Vec::new()),
        other => other,
    }
}

impl<'t> ChromePage<'t> {
    fn wrap(&self, elements: Vec<Element<'t>>) -> Vec<ChromeNode<'t>> {
        elements
            .into_iter()
            .map(|element| ChromeNode {
                element,
                action_delay: self.action_delay,
            })
            .collect()
    }

    fn readiness(&self) -> Option<(bool, u64)> {
        let result = self.tab.evaluate(READINESS_JS, false).ok()?;
        let raw = result.value?;
        let parsed: serde_json::Value = serde_json::from_str(raw.as_str()?).ok()?;
        let ready = parsed.get("ready")?.as_str()? == "complete";
        let resources = parsed.get("resources")?.as_u64()?;
        Some((ready, resources))
    }
}

impl<'t> FormPage for ChromePage<'t> {
    type Node<'a> = ChromeNode<'a> where Self: 'a;

    fn by_role(&self, role: Role) -> Result<Vec<ChromeNode<'_>>> {
        let elements = empty_on_no_match(self.tab.find_elements(role.css()))?;
        Ok(self.wrap(elements))
    }

    /// Idle means `readyState == complete` and no new resource entries for
    /// one quiet window.
    fn wait_for_quiescence(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut last_count = None;
        let mut stable_since = Instant::now();

        while Instant::now() < deadline {
            if let Some((ready, count)) = self.readiness() {
                if last_count != Some(count) {
                    last_count = Some(count);
                    stable_since = Instant::now();
                } else if ready && stable_since.elapsed() >= self.quiet_window {
                    return true;
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
        false
    }

    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    fn screenshot(&self, path: &Path) -> Result<()> {
        let body = self
            .tab
            .find_element("body")
            .map_err(|e| anyhow!("Failed to locate page body: {}", e))?;
        let clip = body
            .get_box_model()
            .map_err(|e| anyhow!("Failed to measure page: {}", e))?
            .margin_viewport();
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| anyhow!("Failed to capture screenshot: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, png).context(format!("Failed to write screenshot {:?}", path))?;
        Ok(())
    }
}

impl<'t> FormNode for ChromeNode<'t> {
    fn by_role(&self, role: Role) -> Result<Vec<Self>> {
        let elements = empty_on_no_match(self.element.find_elements(role.css()))?;
        Ok(elements
            .into_iter()
            .map(|element| ChromeNode {
                element,
                action_delay: self.action_delay,
            })
            .collect())
    }

    fn descendants(&self) -> Result<Vec<Self>> {
        let elements = empty_on_no_match(self.element.find_elements("*"))?;
        Ok(elements
            .into_iter()
            .map(|element| ChromeNode {
                element,
                action_delay: self.action_delay,
            })
            .collect())
    }

    fn inner_text(&self) -> Result<String> {
        self.element.get_inner_text()
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.element.get_attribute_value(name)
    }

    fn click(&self, timeout: Duration) -> Result<()> {
        if !self.action_delay.is_zero() {
            thread::sleep(self.action_delay);
        }
        Wait::with_timeout(timeout)
            .until(|| self.element.click().ok().map(|_| ()))
            .map_err(|_| {
                let target = self
                    .accessible_name()
                    .unwrap_or_else(|_| "<unreadable element>".to_string());
                FillError::ClickTimeout { target, timeout }.into()
            })
    }

    fn scroll_into_view(&self, timeout: Duration) -> Result<()> {
        Wait::with_timeout(timeout)
            .until(|| self.element.scroll_into_view().ok().map(|_| ()))
            .map_err(|_| anyhow!("Timed out after {:?} scrolling element into view", timeout))
    }
}
