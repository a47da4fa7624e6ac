use crate::config::BrowserConfig;
use crate::locator::{Locator, Strategy};
use crate::session::{Element, Session};
use crate::Result;
use async_trait::async_trait;
use eoka::{Browser, Page};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Re-check interval while waiting for a locator to match.
const POLL_INTERVAL_MS: u64 = 250;

/// Shared JS helpers injected ahead of every enumeration: a unique-CSS-path
/// builder (id shortcut, else an nth-child chain up to body) and a
/// visibility check.
const ENUMERATE_HELPERS_JS: &str = r#"
    const cssPath = (el) => {
        if (el.id) return '#' + CSS.escape(el.id);
        const path = [];
        let node = el;
        while (node && node !== document.body) {
            let selector = node.tagName.toLowerCase();
            if (node.id) {
                path.unshift('#' + CSS.escape(node.id));
                break;
            }
            const siblings = Array.from(node.parentNode?.children || []);
            const index = siblings.indexOf(node) + 1;
            if (siblings.length > 1) selector += ':nth-child(' + index + ')';
            path.unshift(selector);
            node = node.parentNode;
        }
        return path.join(' > ');
    };
    const visible = (el) =>
        el.getClientRects().length > 0 &&
        getComputedStyle(el).visibility !== 'hidden';
    const pack = (els) =>
        els.filter(visible).map((el) => ({
            path: cssPath(el),
            text: (el.textContent || el.value || '').trim(),
        }));
"#;

#[derive(Debug, Deserialize)]
struct RawElement {
    path: String,
    text: String,
}

/// Build the enumeration script for one locator. Always evaluates to an
/// array of `{path, text}` objects for the visible matches.
fn enumerate_js(locator: &Locator) -> String {
    // Serializing a String cannot fail.
    let pattern = serde_json::to_string(&locator.pattern).unwrap();
    let candidates = match locator.strategy {
        Strategy::Css => format!("Array.from(document.querySelectorAll({pattern}))"),
        Strategy::Xpath => format!(
            r#"(() => {{
                const snap = document.evaluate(
                    {pattern}, document, null,
                    XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                const els = [];
                for (let i = 0; i < snap.snapshotLength; i++) {{
                    const node = snap.snapshotItem(i);
                    if (node.nodeType === Node.ELEMENT_NODE) els.push(node);
                }}
                return els;
            }})()"#
        ),
        Strategy::Text => format!(
            r#"(() => {{
                const needle = {pattern}.toLowerCase();
                const els = [];
                const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_ELEMENT, null);
                while (walker.nextNode()) {{
                    const el = walker.currentNode;
                    if (!el.matches('a, button, input, select, [role="button"], [onclick]')) continue;
                    if (el.textContent?.trim().toLowerCase().includes(needle)) els.push(el);
                }}
                return els;
            }})()"#
        ),
    };
    format!("(() => {{{ENUMERATE_HELPERS_JS}return pack({candidates});}})()")
}

/// [`Session`] backed by a stealth Chromium instance.
pub struct EokaSession {
    browser: Option<Browser>,
    page: Page,
}

impl EokaSession {
    /// Launch a browser and open a blank page for the cycle.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1920),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(1080),
            ..Default::default()
        };

        debug!(
            "launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser: Some(browser),
            page,
        })
    }

    async fn enumerate(&self, locator: &Locator) -> Result<Vec<Element>> {
        let raw: Vec<RawElement> = self.page.evaluate(&enumerate_js(locator)).await?;
        Ok(raw
            .into_iter()
            .map(|r| Element {
                path: r.path,
                text: r.text,
            })
            .collect())
    }
}

#[async_trait]
impl Session for EokaSession {
    async fn open(&mut self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn find_all(&mut self, locator: &Locator, timeout: Duration) -> Result<Vec<Element>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let elements = self.enumerate(locator).await?;
            if !elements.is_empty() {
                return Ok(elements);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            self.page.wait(POLL_INTERVAL_MS).await;
        }
    }

    async fn fill(&mut self, element: &Element, value: &str) -> Result<()> {
        self.page.fill(&element.path, value).await?;
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: &Element) -> Result<()> {
        let js = format!(
            "document.querySelector({})?.scrollIntoView({{behavior:'smooth',block:'center'}})",
            serde_json::to_string(&element.path).unwrap()
        );
        self.page.execute(&js).await?;
        self.page.wait(200).await;
        Ok(())
    }

    async fn click(&mut self, element: &Element) -> Result<()> {
        self.page.click(&element.path).await?;
        Ok(())
    }

    async fn sleep(&mut self, ms: u64) {
        self.page.wait(ms).await;
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.page.url().await?)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(browser) = self.browser.take() {
            browser.close().await?;
        }
        Ok(())
    }
}
