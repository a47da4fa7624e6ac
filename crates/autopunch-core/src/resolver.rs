use crate::locator::{Locator, LocatorSet};
use crate::session::{Element, Session};
use crate::{Error, Result};
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of a single locator attempt.
#[derive(Debug)]
pub enum Resolution {
    Found(Resolved),
    Miss,
}

/// Element plus the locator that produced it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub element: Element,
    pub locator: Locator,
}

/// Try one locator: bounded lookup, then the optional text constraint.
///
/// A timeout or zero matches is an expected miss, not an error. When the
/// structural pattern matches several elements and the locator carries an
/// `expect_text`, the first element whose rendered text contains it wins;
/// none satisfying it is also a miss.
async fn try_locator<S>(
    session: &mut S,
    locator: &Locator,
    timeout: Duration,
) -> Result<Resolution>
where
    S: Session + ?Sized,
{
    let candidates = session.find_all(locator, timeout).await?;
    if candidates.is_empty() {
        debug!("no match for {locator}");
        return Ok(Resolution::Miss);
    }

    let mut candidates = candidates.into_iter();
    let element = match &locator.expect_text {
        Some(text) => candidates.find(|c| c.text.contains(text.as_str())),
        None => candidates.next(),
    };

    match element {
        Some(element) => Ok(Resolution::Found(Resolved {
            element,
            locator: locator.clone(),
        })),
        None => {
            debug!("matches for {locator} lack expected text");
            Ok(Resolution::Miss)
        }
    }
}

/// Walk the set in declared order; the first locator that resolves wins and
/// nothing after it is attempted. Exhausting the whole chain is the one
/// fatal condition, surfaced as [`Error::LocatorSetExhausted`].
pub async fn resolve<S>(
    session: &mut S,
    set: &LocatorSet,
    timeout: Duration,
) -> Result<Resolved>
where
    S: Session + ?Sized,
{
    for locator in &set.locators {
        match try_locator(session, locator, timeout).await? {
            Resolution::Found(found) => {
                info!("resolved '{}' via {}", set.target, found.locator);
                return Ok(found);
            }
            Resolution::Miss => continue,
        }
    }
    Err(Error::LocatorSetExhausted {
        target: set.target.clone(),
    })
}

/// Scroll the element into the viewport, pause for layout to settle,
/// dispatch the click, then pause again before the caller reads any
/// resulting state. Both pauses are fixed: the target page's own action
/// handler is asynchronous and exposes no completion signal.
pub async fn perform_click<S>(
    session: &mut S,
    element: &Element,
    before_ms: u64,
    after_ms: u64,
) -> Result<()>
where
    S: Session + ?Sized,
{
    session.scroll_into_view(element).await?;
    session.sleep(before_ms).await;
    session.click(element).await?;
    session.sleep(after_ms).await;
    Ok(())
}
