use crate::locator::Locator;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;

/// An element resolved on the live page.
///
/// The underlying driver addresses elements by a unique CSS path rather than
/// a handle, so a resolved element stays usable for follow-up interactions
/// (scroll, click) without a second lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Unique CSS path to the element.
    pub path: String,
    /// Rendered text at resolution time, used for text constraints.
    pub text: String,
}

/// A live browser session positioned on one page.
///
/// Exclusively owned by the running punch cycle; no other component may
/// touch it concurrently. All waits are blocking with a bounded timeout.
#[async_trait]
pub trait Session: Send {
    /// Navigate to a URL.
    async fn open(&mut self, url: &str) -> Result<()>;

    /// All visible elements matching the locator, waiting up to `timeout`
    /// for at least one to appear. An empty result is a miss, not an error;
    /// `Err` means the session itself failed.
    async fn find_all(&mut self, locator: &Locator, timeout: Duration) -> Result<Vec<Element>>;

    /// Replace the element's content with `value` (idempotent under retry).
    async fn fill(&mut self, element: &Element, value: &str) -> Result<()>;

    async fn scroll_into_view(&mut self, element: &Element) -> Result<()>;

    async fn click(&mut self, element: &Element) -> Result<()>;

    /// Fixed settle pause. The target application gives no completion
    /// signal, so fixed pauses are the synchronization primitive here.
    async fn sleep(&mut self, ms: u64);

    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    async fn current_url(&mut self) -> Result<String>;

    /// Release the underlying browser. Safe to call more than once; only
    /// the first call does work.
    async fn close(&mut self) -> Result<()>;
}

/// Wall clock pinned to a fixed named timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// System time converted into the configured timezone.
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}
