use crate::api::{NewsApi, NewsId, Term};
use crate::config::PollingConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Enough terms were observed.
    Satisfied,
    /// The attempt ceiling was reached first.
    Exhausted,
    /// A fetch failed. Polling does not retry.
    Failed,
    /// `stop` was called.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Terms {
        session: SessionId,
        news_id: NewsId,
        attempt: u32,
        terms: Vec<Term>,
    },
    Finished {
        session: SessionId,
        news_id: NewsId,
        attempts: u32,
        reason: StopReason,
    },
}

impl PollEvent {
    pub fn session(&self) -> SessionId {
        match self {
            PollEvent::Terms { session, .. } | PollEvent::Finished { session, .. } => *session,
        }
    }

    pub fn news_id(&self) -> NewsId {
        match self {
            PollEvent::Terms { news_id, .. } | PollEvent::Finished { news_id, .. } => *news_id,
        }
    }
}

/// One running polling session. `stop` is the only way to cancel it; once
/// stopped the session never emits another event.
#[derive(Debug)]
pub struct PollHandle {
    session: SessionId,
    news_id: NewsId,
    alive: Arc<AtomicBool>,
    task: JoinHandle<StopReason>,
}

impl PollHandle {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn news_id(&self) -> NewsId {
        self.news_id
    }

    /// False once stopped. A session that ended on its own stays live so its
    /// last events are still accepted.
    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            self.task.abort();
            debug!(session = self.session, news_id = self.news_id, "term polling stopped");
        }
    }

    pub async fn wait(self) -> StopReason {
        match self.task.await {
            Ok(reason) => reason,
            Err(_) => StopReason::Cancelled,
        }
    }
}

/// Polls an article's term set until extraction looks done.
///
/// Owns at most one session at a time: `start` stops the previous session
/// first. Dropping the poller stops its session.
pub struct TermPoller {
    api: Arc<dyn NewsApi>,
    config: PollingConfig,
    events: UnboundedSender<PollEvent>,
    next_session: SessionId,
    current: Option<PollHandle>,
}

impl TermPoller {
    pub fn new(
        api: Arc<dyn NewsApi>,
        config: PollingConfig,
        events: UnboundedSender<PollEvent>,
    ) -> Self {
        Self {
            api,
            config,
            events,
            next_session: 0,
            current: None,
        }
    }

    pub fn start(&mut self, news_id: NewsId) -> SessionId {
        self.stop();

        self.next_session += 1;
        let session = self.next_session;
        let alive = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(poll_terms(
            self.api.clone(),
            self.config.clone(),
            self.events.clone(),
            session,
            news_id,
            alive.clone(),
        ));

        info!(session, news_id, "term polling started");
        self.current = Some(PollHandle {
            session,
            news_id,
            alive,
            task,
        });
        session
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.stop();
        }
    }

    pub fn current(&self) -> Option<&PollHandle> {
        self.current.as_ref()
    }

    /// Whether events tagged with `session` may still be applied.
    pub fn is_live(&self, session: SessionId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|h| h.session == session && h.is_live())
    }

    pub fn is_polling(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|h| h.is_live() && !h.is_finished())
    }

    /// Waits for the current session to end on its own and returns why.
    pub async fn wait(&mut self) -> Option<StopReason> {
        match self.current.take() {
            Some(handle) => Some(handle.wait().await),
            None => None,
        }
    }
}

impl Drop for TermPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_terms(
    api: Arc<dyn NewsApi>,
    config: PollingConfig,
    events: UnboundedSender<PollEvent>,
    session: SessionId,
    news_id: NewsId,
    alive: Arc<AtomicBool>,
) -> StopReason {
    let is_alive = || alive.load(Ordering::Acquire);
    let finish = |attempts: u32, reason: StopReason| {
        if is_alive() {
            let _ = events.send(PollEvent::Finished {
                session,
                news_id,
                attempts,
                reason,
            });
        }
        debug!(session, news_id, attempts, ?reason, "term polling finished");
        reason
    };

    if config.max_attempts == 0 {
        return finish(0, StopReason::Exhausted);
    }

    let period = config.interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts = 0;
    loop {
        ticker.tick().await;
        attempts += 1;

        let result = api.news_terms(news_id).await;
        if !is_alive() {
            return StopReason::Cancelled;
        }

        match result {
            Ok(terms) => {
                let count = terms.len();
                debug!(session, news_id, attempts, count, "polled terms");
                let _ = events.send(PollEvent::Terms {
                    session,
                    news_id,
                    attempt: attempts,
                    terms,
                });

                if count >= config.term_threshold {
                    return finish(attempts, StopReason::Satisfied);
                }
                if attempts >= config.max_attempts {
                    return finish(attempts, StopReason::Exhausted);
                }
            }
            Err(e) => {
                warn!(session, news_id, attempts, "term polling failed: {}", e);
                return finish(attempts, StopReason::Failed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{term, FakeApi};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn poller(api: Arc<FakeApi>) -> (TermPoller, mpsc::UnboundedReceiver<PollEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TermPoller::new(api, PollingConfig::default(), tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PollEvent>) -> Vec<PollEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_max_attempts_without_enough_terms() {
        let api = Arc::new(FakeApi::new().push_terms(Some(vec![term(1, "금리")])));
        let (mut poller, mut rx) = poller(api.clone());

        let started = Instant::now();
        poller.start(7);
        assert_eq!(poller.wait().await, Some(StopReason::Exhausted));
        assert_eq!(api.term_calls(), 10);
        assert_eq!(started.elapsed(), Duration::from_secs(20));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 11);
        assert_eq!(
            events.last(),
            Some(&PollEvent::Finished {
                session: 1,
                news_id: 7,
                attempts: 10,
                reason: StopReason::Exhausted,
            })
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.term_calls(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_once_threshold_reached() {
        let api = Arc::new(
            FakeApi::new()
                .push_terms(Some(vec![]))
                .push_terms(Some(vec![term(1, "금리")]))
                .push_terms(Some(vec![term(1, "금리"), term(2, "금리인상")])),
        );
        let (mut poller, mut rx) = poller(api.clone());

        poller.start(7);
        assert_eq!(poller.wait().await, Some(StopReason::Satisfied));
        assert_eq!(api.term_calls(), 3);

        let events = drain(&mut rx);
        let counts: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                PollEvent::Terms { terms, .. } => Some(terms.len()),
                PollEvent::Finished { .. } => None,
            })
            .collect();
        assert_eq!(counts, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_waits_one_interval() {
        let api = Arc::new(FakeApi::new().push_terms(Some(vec![term(1, "a"), term(2, "b")])));
        let (mut poller, _rx) = poller(api.clone());

        poller.start(7);
        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(api.term_calls(), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(api.term_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stops_immediately() {
        let api = Arc::new(FakeApi::new().push_terms(Some(vec![])).push_terms(None));
        let (mut poller, mut rx) = poller(api.clone());

        poller.start(7);
        assert_eq!(poller.wait().await, Some(StopReason::Failed));
        assert_eq!(api.term_calls(), 2);

        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(PollEvent::Finished {
                reason: StopReason::Failed,
                attempts: 2,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_response_mutates_nothing() {
        let (api, gate) = FakeApi::new()
            .push_terms(Some(vec![term(1, "a"), term(2, "b")]))
            .gated();
        let api = Arc::new(api);
        let (mut poller, mut rx) = poller(api.clone());

        let session = poller.start(7);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(api.term_calls(), 1);

        poller.stop();
        assert!(!poller.is_live(session));
        gate.notify_waiters();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(drain(&mut rx).is_empty());
        assert_eq!(api.term_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_liveness_discards_in_flight_response() {
        let (api, gate) = FakeApi::new()
            .push_terms(Some(vec![term(1, "a"), term(2, "b")]))
            .gated();
        let api = Arc::new(api);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alive = Arc::new(AtomicBool::new(true));

        // Not aborted: the task must notice the flag on its own.
        let task = tokio::spawn(poll_terms(
            api.clone(),
            PollingConfig::default(),
            tx,
            1,
            7,
            alive.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(api.term_calls(), 1);

        alive.store(false, Ordering::Release);
        gate.notify_one();

        assert_eq!(task.await.unwrap(), StopReason::Cancelled);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(api.term_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_session() {
        let api = Arc::new(FakeApi::new().push_terms(Some(vec![term(1, "a")])));
        let (mut poller, mut rx) = poller(api.clone());

        let first = poller.start(7);
        let second = poller.start(8);
        assert_ne!(first, second);
        assert!(!poller.is_live(first));
        assert!(poller.is_live(second));

        assert_eq!(poller.wait().await, Some(StopReason::Exhausted));
        assert_eq!(api.term_calls(), 10);
        assert!(drain(&mut rx).iter().all(|e| e.session() == second && e.news_id() == 8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let api = Arc::new(FakeApi::new().push_terms(Some(vec![])));
        let (mut poller, mut rx) = poller(api.clone());

        poller.start(7);
        tokio::time::sleep(Duration::from_millis(4100)).await;
        drop(poller);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(api.term_calls(), 2);
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_never_fetches() {
        let api = Arc::new(FakeApi::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = PollingConfig {
            max_attempts: 0,
            ..PollingConfig::default()
        };
        let mut poller = TermPoller::new(api.clone(), config, tx);

        poller.start(1);
        assert_eq!(poller.wait().await, Some(StopReason::Exhausted));
        assert_eq!(api.term_calls(), 0);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let api = Arc::new(FakeApi::new());
        let (mut poller, _rx) = poller(api);
        poller.stop();
        poller.stop();
        assert!(!poller.is_polling());
        assert!(poller.current().is_none());
    }
}
