//! Per-unit crawl context and the session lifecycle around it

use crate::crawler::pacing::{Clock, Pacer, PacingPolicy};
use crate::crawler::portal::Portal;
use crate::driver::{BrowserDriver, Cookie, FingerprintProfile};
use crate::state::{BackoffState, CrawlUnit, UnitTally};
use crate::TrawlError;

/// Everything one unit's stages share
///
/// Created by [`open_session`] and consumed by [`close_session`]; the
/// orchestrator only gets the backoff state and tally back.
pub struct CrawlContext<S> {
    pub session: S,
    pub identity: FingerprintProfile,
    pub backoff: BackoffState,
    pub unit: CrawlUnit,
    pub tally: UnitTally,
}

/// Starts a browser session for `unit` and loads the landing page
///
/// A block signal on the landing page puts the context into cooldown; the
/// first gate in the unit then waits it out.
///
/// # Errors
///
/// Any failure to start the session or load the landing page. The session
/// is closed before the error is returned.
pub async fn open_session<D, P, C>(
    portal: &Portal<'_, D>,
    driver: &D,
    pacer: &Pacer<P, C>,
    unit: CrawlUnit,
    identity: FingerprintProfile,
    cookies: &[Cookie],
    backoff: BackoffState,
) -> Result<CrawlContext<D::Session>, TrawlError>
where
    D: BrowserDriver,
    P: PacingPolicy,
    C: Clock,
{
    tracing::debug!(unit = %unit, "Opening browser session");
    let session = driver.new_session(&identity, cookies).await?;

    let landing = match portal.land(&session, cookies).await {
        Ok(content) => content,
        Err(e) => {
            if let Err(close_err) = driver.close(session).await {
                tracing::debug!("Closing failed session: {}", close_err);
            }
            return Err(e.into());
        }
    };

    let mut context = CrawlContext {
        session,
        identity,
        backoff,
        unit,
        tally: UnitTally::default(),
    };

    if let Some(signal) = pacer.observe(&landing) {
        tracing::warn!(phrase = %signal.phrase, "Block signal on landing page");
        context.backoff = pacer.enter_cooldown();
    }

    Ok(context)
}

/// Closes the unit's session, handing back its backoff state and tally
pub async fn close_session<D: BrowserDriver>(
    driver: &D,
    context: CrawlContext<D::Session>,
) -> (BackoffState, UnitTally) {
    let CrawlContext {
        session,
        backoff,
        unit,
        tally,
        ..
    } = context;

    if let Err(e) = driver.close(session).await {
        tracing::warn!(unit = %unit, "Failed to close browser session: {}", e);
    }

    (backoff, tally)
}
