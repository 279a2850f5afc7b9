//! Browser session against the Siscomex DU-E consultation page

use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Timing;
use crate::error::PipelineError;
use crate::html;
use crate::types::Identifier;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; RucEvents/0.1)";

const MODE_OPTION_SELECTOR: &str = "#opt2 label";
const IDENTIFIER_INPUT_SELECTOR: &str = "#nrRuc";
const SUBMIT_BUTTON_XPATH: &str = "//button[contains(normalize-space(.), 'Consultar')]";
const TABLE_SELECTOR: &str = "table";
const DETAIL_LINK_SELECTOR: &str = "table a";

const CAPTCHA_VISIBLE_JS: &str = r#"(() => {
    const frame = document.querySelector('iframe[title="Widget containing checkbox for hCaptcha security challenge"]');
    if (!frame) { return false; }
    const rect = frame.getBoundingClientRect();
    const style = window.getComputedStyle(frame);
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';
})()"#;

const CLEAR_INPUT_JS: &str = "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }";

/// Page-level primitives the record processor drives.
///
/// Every method takes `&mut self`: the portal keeps one stateful page, so
/// calls are strictly sequenced.
pub trait Portal {
    /// Pick the "search by RUC" option on the landing form
    fn select_mode(&mut self) -> Result<()>;

    /// Clear the identifier field and type the identifier
    fn fill_identifier(&mut self, identifier: &Identifier) -> Result<()>;

    /// Press "Consultar"
    fn submit_search(&mut self) -> Result<()>;

    /// Block until a table is present. `false` once `timeout` elapses.
    fn wait_for_table(&mut self, timeout: Duration) -> bool;

    /// Activate the first result link in document order.
    /// `Ok(false)` when the results table has no links.
    fn open_first_detail_link(&mut self) -> Result<bool>;

    /// Cell texts of the displayed detail table, top to bottom
    fn extract_detail_rows(&mut self) -> Result<Vec<Vec<String>>>;

    fn go_back(&mut self) -> Result<()>;

    /// Whether a CAPTCHA widget is currently visible. Must not interact
    /// with the page.
    fn obstacle_visible(&mut self) -> Result<bool>;

    /// Whether the page still answers commands
    fn is_alive(&mut self) -> bool;

    /// Reload the search page from scratch
    fn reset(&mut self) -> Result<()>;
}

/// Chrome-backed portal session. Owns the browser for the whole run; the
/// browser process is closed when this value is dropped.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
    portal_url: String,
}

/// Check that the portal answers HTTP at all before starting a browser
fn probe_portal(url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;

    client
        .get(url)
        .send()
        .with_context(|| format!("Failed to reach {}", url))?
        .error_for_status()
        .with_context(|| format!("Portal returned an error status for {}", url))?;
    Ok(())
}

impl ChromeSession {
    /// Launch the browser and load the portal.
    ///
    /// Fails with [`PipelineError::PortalUnreachable`] when the portal does
    /// not respond within `timing.navigation_timeout`.
    pub fn open(url: &str, headless: bool, timing: &Timing) -> Result<Self, PipelineError> {
        let unreachable = |source: anyhow::Error| PipelineError::PortalUnreachable {
            url: url.to_string(),
            source,
        };

        probe_portal(url, timing.navigation_timeout).map_err(unreachable)?;

        info!("Launching Chrome (headless: {})", headless);
        let options = LaunchOptions {
            headless,
            window_size: Some((1366, 900)),
            // A human may sit on the CAPTCHA for a long time; keep the
            // DevTools connection open while nothing is sent.
            idle_browser_timeout: Duration::from_secs(24 * 60 * 60),
            args: vec![OsStr::new("--disable-blink-features=AutomationControlled")],
            ..Default::default()
        };

        let browser = Browser::new(options)
            .context("Failed to launch Chrome. Is Chrome/Chromium installed?")
            .map_err(unreachable)?;
        let tab = browser
            .new_tab()
            .context("Failed to create browser tab")
            .map_err(unreachable)?;
        tab.set_default_timeout(timing.navigation_timeout);

        info!("Navigating to {}", url);
        tab.navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .context("Timed out loading the portal")
            .map_err(unreachable)?;

        Ok(Self {
            _browser: browser,
            tab,
            portal_url: url.to_string(),
        })
    }
}

impl Portal for ChromeSession {
    fn select_mode(&mut self) -> Result<()> {
        self.tab
            .find_element(MODE_OPTION_SELECTOR)
            .context("RUC search option not found")?
            .click()?;
        Ok(())
    }

    fn fill_identifier(&mut self, identifier: &Identifier) -> Result<()> {
        let input = self
            .tab
            .find_element(IDENTIFIER_INPUT_SELECTOR)
            .context("RUC input field not found")?;
        input.click()?;
        input.call_js_fn(CLEAR_INPUT_JS, vec![], false)?;
        input.type_into(identifier.as_str())?;
        Ok(())
    }

    fn submit_search(&mut self) -> Result<()> {
        self.tab
            .find_element_by_xpath(SUBMIT_BUTTON_XPATH)
            .context("\"Consultar\" button not found")?
            .click()?;
        Ok(())
    }

    fn wait_for_table(&mut self, timeout: Duration) -> bool {
        match self.tab.wait_for_element_with_custom_timeout(TABLE_SELECTOR, timeout) {
            Ok(_) => true,
            Err(e) => {
                debug!("No table after {:?}: {}", timeout, e);
                false
            }
        }
    }

    fn open_first_detail_link(&mut self) -> Result<bool> {
        let content = self.tab.get_content()?;
        let links = html::detail_links(&content)?;
        if links.is_empty() {
            return Ok(false);
        }

        info!("DU-E links found: {:?}", links);
        self.tab
            .find_element(DETAIL_LINK_SELECTOR)
            .context("DU-E link vanished before click")?
            .click()?;
        Ok(true)
    }

    fn extract_detail_rows(&mut self) -> Result<Vec<Vec<String>>> {
        let content = self.tab.get_content()?;
        html::detail_rows(&content)
    }

    fn go_back(&mut self) -> Result<()> {
        self.tab.evaluate("window.history.back()", false)?;
        Ok(())
    }

    fn obstacle_visible(&mut self) -> Result<bool> {
        let value: Option<serde_json::Value> = self.tab.evaluate(CAPTCHA_VISIBLE_JS, false)?.value;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn is_alive(&mut self) -> bool {
        self.tab.evaluate("document.readyState", false).is_ok()
    }

    fn reset(&mut self) -> Result<()> {
        self.tab
            .navigate_to(&self.portal_url)?
            .wait_until_navigated()
            .context("Failed to reload the search page")?;
        Ok(())
    }
}
