//! Live [`SessionDriver`] over a headless Chrome instance.
//!
//! Elements are resolved in the page itself and parked in a window-side
//! registry (`window.__arv`); every element operation then runs as a script
//! with the registered node bound as `this`. The registry does not survive
//! navigation, which is exactly the lifetime the workflow expects of a
//! handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::HeadlessMode;
use chromiumoxide::page::Page;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::debug;

use super::{
    ElementHandle, ElementState, Locator, SessionDriver, SessionError, SessionResult,
};
use crate::config::Config;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
    next_id: AtomicU64,
}

impl From<chromiumoxide::error::CdpError> for SessionError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        SessionError::Driver(e.to_string())
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// JS expression evaluating to the first matching element, or null.
fn resolver_js(locator: &Locator) -> String {
    match locator {
        Locator::Css(s) => format!("document.querySelector({})", js_string(s)),
        Locator::Id(s) => format!("document.getElementById({})", js_string(s)),
        Locator::Name(s) => {
            format!("document.querySelector({})", js_string(&format!("[name='{s}']")))
        }
        Locator::ClassName(s) => {
            format!("document.querySelector({})", js_string(&format!(".{s}")))
        }
        Locator::XPath(expr) => format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            js_string(expr)
        ),
        Locator::LinkText(text) => format!(
            "(Array.prototype.find.call(document.querySelectorAll('a'), function(a) {{ return a.textContent.trim() === {}; }}) || null)",
            js_string(text)
        ),
    }
}

/// JS expression evaluating to an array of all matching elements.
fn collector_js(locator: &Locator) -> String {
    match locator {
        Locator::Css(s) => format!(
            "Array.prototype.slice.call(document.querySelectorAll({}))",
            js_string(s)
        ),
        Locator::Id(_) | Locator::Name(_) | Locator::ClassName(_) => {
            format!("[{}].filter(Boolean)", resolver_js(locator))
        }
        Locator::XPath(expr) => format!(
            "(function() {{ var snap = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); var out = []; for (var i = 0; i < snap.snapshotLength; i++) out.push(snap.snapshotItem(i)); return out; }})()",
            js_string(expr)
        ),
        Locator::LinkText(text) => format!(
            "Array.prototype.filter.call(document.querySelectorAll('a'), function(a) {{ return a.textContent.trim() === {}; }})",
            js_string(text)
        ),
    }
}

impl ChromeSession {
    pub async fn launch(config: &Config) -> SessionResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if config.headless {
            builder = builder.headless_mode(HeadlessMode::New);
        } else {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(SessionError::Driver)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!(?event, "browser event");
            }
        });
        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
            next_id: AtomicU64::new(1),
        })
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn eval(&self, script: &str) -> SessionResult<Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Runs `body` with the registered node bound as `this`. A vanished node
    /// surfaces as [`SessionError::Stale`].
    async fn eval_on_node(&self, element: &ElementHandle, body: &str) -> SessionResult<Value> {
        let script = format!(
            "(function() {{ var el = window.__arv && window.__arv[{id}]; if (!el) return {{ __stale: true }}; return (function() {{ {body} }}).call(el); }})()",
            id = element.id
        );
        let value = self.eval(&script).await?;
        if value
            .get("__stale")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Err(SessionError::Stale(element.id));
        }
        Ok(value)
    }

    async fn try_find(&self, locator: &Locator) -> SessionResult<ElementHandle> {
        let id = self.alloc_id();
        let script = format!(
            "(function() {{ var el = {resolver}; if (!el) return false; window.__arv = window.__arv || {{}}; window.__arv[{id}] = el; return true; }})()",
            resolver = resolver_js(locator)
        );
        let found = self.eval(&script).await?.as_bool().unwrap_or(false);
        if found {
            Ok(ElementHandle::new(id))
        } else {
            Err(SessionError::NotFound(locator.to_string()))
        }
    }

    async fn state_reached(&self, element: &ElementHandle, state: ElementState) -> bool {
        if state == ElementState::Present {
            return true;
        }
        let body = match state {
            ElementState::Visible => {
                "return !!(this.offsetWidth || this.offsetHeight || this.getClientRects().length);"
            }
            ElementState::Clickable => {
                "return !!(this.offsetWidth || this.offsetHeight || this.getClientRects().length) && !this.disabled;"
            }
            ElementState::Present => unreachable!(),
        };
        match self.eval_on_node(element, body).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl SessionDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        debug!(url, "navigating");
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn find(&self, locator: &Locator) -> SessionResult<ElementHandle> {
        self.try_find(locator).await
    }

    async fn find_all(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        let count_script = format!(
            "(function() {{ window.__arvList = {collector}; return window.__arvList.length; }})()",
            collector = collector_js(locator)
        );
        let count = self.eval(&count_script).await?.as_u64().unwrap_or(0);

        let mut handles = Vec::with_capacity(count as usize);
        for i in 0..count {
            let id = self.alloc_id();
            self.eval(&format!(
                "(function() {{ window.__arv = window.__arv || {{}}; window.__arv[{id}] = window.__arvList[{i}]; return true; }})()"
            ))
            .await?;
            handles.push(ElementHandle::new(id));
        }
        Ok(handles)
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> SessionResult<ElementHandle> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(handle) = self.try_find(locator).await {
                if self.state_reached(&handle, state).await {
                    return Ok(handle);
                }
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout {
                    what: locator.to_string(),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_url_change(&self, from: &str, timeout: Duration) -> SessionResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.current_url().await? != from {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout {
                    what: format!("url change from {from}"),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, element: &ElementHandle) -> SessionResult<()> {
        self.eval_on_node(element, "this.click(); return true;")
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        let body = format!(
            "this.focus(); var v = {text}; if ('value' in this) {{ this.value = (this.value || '') + v; this.dispatchEvent(new Event('input', {{ bubbles: true }})); this.dispatchEvent(new Event('change', {{ bubbles: true }})); }} else {{ this.textContent += v; }} return true;",
            text = js_string(text)
        );
        self.eval_on_node(element, &body).await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> SessionResult<()> {
        self.eval_on_node(
            element,
            "if ('value' in this) { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); } return true;",
        )
        .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> SessionResult<String> {
        let value = self
            .eval_on_node(element, "return (this.innerText || this.textContent || '');")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attr(&self, element: &ElementHandle, name: &str) -> SessionResult<Option<String>> {
        let body = format!("return this.getAttribute({});", js_string(name));
        let value = self.eval_on_node(element, &body).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn is_selected(&self, element: &ElementHandle) -> SessionResult<bool> {
        let value = self.eval_on_node(element, "return !!this.checked;").await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn run_script(
        &self,
        body: &str,
        element: Option<&ElementHandle>,
    ) -> SessionResult<Value> {
        match element {
            Some(element) => self.eval_on_node(element, body).await,
            None => self.eval(&format!("(function() {{ {body} }})()")).await,
        }
    }

    async fn close(&self) -> SessionResult<()> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                debug!(error = %e, "browser close failed");
            }
        }
        self.handler_task.abort();
        Ok(())
    }
}
