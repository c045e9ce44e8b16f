//! Polling adapter that wraps one [`EventSource`].
//!
//! An [`Adapter`] owns the timer, the circuit breaker, and the health
//! counters for its source. Each successful poll hands its batch to a
//! [`BatchSink`]; failures stay local and count towards the breaker.
//!
//! # Polling
//!
//! [`Adapter::start`] polls once immediately and then on every interval
//! tick. Each tick spawns an independent poll task, so a slow fetch does
//! not delay the next tick and two polls of the same adapter may be in
//! flight at once. [`Adapter::stop`] cancels the timer only; a poll that
//! is already in flight still delivers its batch.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use worldpulse_types::{Category, DisabledNotice, DisabledReason, Event, StatusRecord};

use crate::breaker::{CircuitBreaker, FailureOutcome};
use crate::source::{AdapterSettings, EventSource, SourceError};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Receiver of adapter output.
///
/// The hub implements this to merge and broadcast batches. Calls may
/// arrive concurrently from different adapters.
pub trait BatchSink: Send + Sync {
    /// Called with every non-empty batch from a successful poll.
    fn on_batch(&self, source: &str, events: Vec<Event>);

    /// Called once when an adapter trips its circuit breaker.
    fn on_disabled(&self, notice: DisabledNotice);
}

/// A sink that drops everything.
pub struct NoOpSink;

impl BatchSink for NoOpSink {
    fn on_batch(&self, _source: &str, _events: Vec<Event>) {}

    fn on_disabled(&self, _notice: DisabledNotice) {}
}

/// What a single poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The adapter is disabled; nothing was fetched.
    Skipped,
    /// The fetch succeeded with no events.
    Empty,
    /// A batch was handed to the sink.
    Delivered {
        /// Number of events in the batch.
        events: usize,
    },
    /// The poll failed and the adapter is still enabled.
    Failed {
        /// Consecutive failures so far.
        error_count: u32,
    },
    /// The poll failed and tripped the circuit breaker.
    Disabled(DisabledNotice),
}

/// Shared, read-only view of an adapter's health.
///
/// The hub keeps an `Arc` to each of these to serve the status surface.
#[derive(Debug)]
pub struct AdapterHealth {
    name: String,
    category: Category,
    interval: Duration,
    breaker: CircuitBreaker,
    running: AtomicBool,
    last_fetch: AtomicI64,
}

impl AdapterHealth {
    fn new(name: String, category: Category, settings: AdapterSettings) -> Self {
        Self {
            name,
            category,
            // tokio intervals reject a zero period
            interval: settings.interval.max(Duration::from_millis(1)),
            breaker: CircuitBreaker::new(settings.max_errors),
            running: AtomicBool::new(false),
            last_fetch: AtomicI64::new(0),
        }
    }

    /// Adapter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category of the events produced.
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Polling interval.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the timer is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the circuit breaker is still closed.
    pub fn is_enabled(&self) -> bool {
        self.breaker.is_enabled()
    }

    /// Enabled with no outstanding failures.
    pub fn is_healthy(&self) -> bool {
        self.breaker.is_enabled() && self.breaker.error_count() == 0
    }

    /// Consecutive failures since the last success.
    pub fn error_count(&self) -> u32 {
        self.breaker.error_count()
    }

    /// Why the adapter was disabled, if it was.
    pub fn disabled_reason(&self) -> Option<DisabledReason> {
        self.breaker.disabled_reason()
    }

    /// Milliseconds since the Unix epoch of the last successful fetch, 0 if never.
    pub fn last_fetch(&self) -> i64 {
        self.last_fetch.load(Ordering::SeqCst)
    }

    /// Snapshot as a wire status record.
    pub fn status(&self) -> StatusRecord {
        let enabled = self.breaker.is_enabled();
        let error_count = self.breaker.error_count();
        StatusRecord {
            name: self.name.clone(),
            category: self.category,
            enabled,
            running: self.is_running(),
            last_fetch: self.last_fetch(),
            error_count,
            interval_ms: u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            max_errors: self.breaker.max_errors(),
            disabled_reason: self.breaker.disabled_reason(),
            healthy: enabled && error_count == 0,
        }
    }
}

/// Drives one source on its own timer.
pub struct Adapter<S> {
    source: S,
    health: Arc<AdapterHealth>,
    timer: Mutex<Option<CancellationToken>>,
}

impl<S: EventSource> Adapter<S> {
    /// Wrap a source using its default settings.
    pub fn new(source: S) -> Self {
        let settings = source.default_settings();
        Self::with_settings(source, settings)
    }

    /// Wrap a source with explicit settings.
    pub fn with_settings(source: S, settings: AdapterSettings) -> Self {
        let health = AdapterHealth::new(source.name().to_owned(), source.category(), settings);
        Self {
            source,
            health: Arc::new(health),
            timer: Mutex::new(None),
        }
    }

    /// The wrapped source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Shared health handle.
    pub const fn health(&self) -> &Arc<AdapterHealth> {
        &self.health
    }

    /// Run one poll outside the timer.
    ///
    /// A poll on a disabled adapter does nothing. Success resets the
    /// failure count and records the fetch time even when the batch is
    /// empty; only non-empty batches reach the sink.
    pub async fn poll_once(&self, sink: &dyn BatchSink) -> PollOutcome {
        let name = self.health.name();
        if !self.health.breaker.is_enabled() {
            debug!(source = name, "Adapter disabled, skipping poll");
            return PollOutcome::Skipped;
        }

        match self.fetch_events().await {
            Ok(events) => {
                self.health.breaker.record_success();
                self.health.last_fetch.store(now_millis(), Ordering::SeqCst);
                if events.is_empty() {
                    debug!(source = name, "Poll returned no events");
                    return PollOutcome::Empty;
                }
                let count = events.len();
                debug!(source = name, events = count, "Poll delivered batch");
                sink.on_batch(name, events);
                PollOutcome::Delivered { events: count }
            }
            Err(err) => match self.health.breaker.record_failure() {
                FailureOutcome::Counted { error_count } => {
                    warn!(
                        source = name,
                        error_count,
                        max_errors = self.health.breaker.max_errors(),
                        error = %err,
                        "Poll failed"
                    );
                    PollOutcome::Failed { error_count }
                }
                FailureOutcome::Tripped { error_count } => {
                    error!(
                        source = name,
                        error_count,
                        error = %err,
                        "Too many consecutive failures, disabling adapter"
                    );
                    self.stop();
                    let notice = DisabledNotice {
                        name: name.to_owned(),
                        reason: self.health.breaker.disabled_reason(),
                        timestamp: now_millis(),
                    };
                    sink.on_disabled(notice.clone());
                    PollOutcome::Disabled(notice)
                }
                FailureOutcome::AlreadyOpen => {
                    debug!(source = name, error = %err, "Late failure on disabled adapter");
                    PollOutcome::Failed {
                        error_count: self.health.breaker.error_count(),
                    }
                }
            },
        }
    }

    async fn fetch_events(&self) -> Result<Vec<Event>, SourceError> {
        let raw = self.source.fetch().await?;
        if !self.source.validate(&raw) {
            return Err(SourceError::Invalid(format!(
                "{} response failed validation",
                self.health.name()
            )));
        }
        self.source.transform(raw)
    }

    /// Start the timer: one poll now, then one per interval.
    ///
    /// Returns `None` without doing anything if the adapter is already
    /// running or has been disabled.
    pub fn start(self: &Arc<Self>, sink: Arc<dyn BatchSink>) -> Option<JoinHandle<()>> {
        let name = self.health.name();
        if !self.health.breaker.is_enabled() {
            warn!(source = name, "Adapter is disabled, not starting");
            return None;
        }

        let token = {
            let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
            if timer.is_some() {
                warn!(source = name, "Adapter already running");
                return None;
            }
            let token = CancellationToken::new();
            *timer = Some(token.clone());
            token
        };
        self.health.running.store(true, Ordering::SeqCst);

        info!(
            source = name,
            interval_ms = u64::try_from(self.health.interval.as_millis()).unwrap_or(u64::MAX),
            "Adapter started"
        );

        let adapter = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(adapter.health.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let poller = Arc::clone(&adapter);
                        let sink = Arc::clone(&sink);
                        tokio::spawn(async move {
                            poller.poll_once(sink.as_ref()).await;
                        });
                    }
                }
            }
            debug!(source = adapter.health.name(), "Adapter timer stopped");
        }))
    }

    /// Cancel the timer. Counters and the enabled flag are untouched.
    pub fn stop(&self) {
        let token = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
            info!(source = self.health.name(), "Adapter stopped");
        }
        self.health.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;

    use super::*;

    /// One scripted poll result, optionally delayed.
    pub(crate) struct Step {
        pub delay: Option<Duration>,
        pub result: Result<Vec<Event>, SourceError>,
    }

    impl Step {
        pub fn ok(events: Vec<Event>) -> Self {
            Self {
                delay: None,
                result: Ok(events),
            }
        }

        pub fn fail() -> Self {
            Self {
                delay: None,
                result: Err(SourceError::Http(String::from("connection refused"))),
            }
        }

        pub fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    /// A source that replays a script, then fails forever.
    pub(crate) struct ScriptedSource {
        pub name: &'static str,
        pub script: Mutex<VecDeque<Step>>,
        pub fetches: Arc<AtomicU32>,
        pub settings: AdapterSettings,
    }

    impl ScriptedSource {
        pub fn new(name: &'static str, steps: Vec<Step>) -> Self {
            Self {
                name,
                script: Mutex::new(steps.into()),
                fetches: Arc::new(AtomicU32::new(0)),
                settings: AdapterSettings {
                    interval: Duration::from_secs(10),
                    max_errors: 3,
                },
            }
        }

        pub const fn max_errors(mut self, max_errors: u32) -> Self {
            self.settings.max_errors = max_errors;
            self
        }
    }

    impl EventSource for ScriptedSource {
        type Raw = Vec<Event>;

        fn name(&self) -> &str {
            self.name
        }

        fn key(&self) -> &str {
            self.name
        }

        fn category(&self) -> Category {
            Category::Earthquake
        }

        fn default_settings(&self) -> AdapterSettings {
            self.settings
        }

        async fn fetch(&self) -> Result<Vec<Event>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            let step = step.unwrap_or_else(Step::fail);
            if let Some(delay) = step.delay {
                tokio::time::sleep(delay).await;
            }
            step.result
        }

        fn validate(&self, raw: &Vec<Event>) -> bool {
            raw.iter().all(|e| !e.id.as_str().is_empty())
        }

        fn transform(&self, raw: Vec<Event>) -> Result<Vec<Event>, SourceError> {
            Ok(raw)
        }
    }

    /// Sink that records everything it receives.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub batches: Mutex<Vec<(String, Vec<Event>)>>,
        pub disabled: Mutex<Vec<DisabledNotice>>,
    }

    impl RecordingSink {
        pub fn batch_count(&self) -> usize {
            self.batches.lock().unwrap().len()
        }

        pub fn disabled_count(&self) -> usize {
            self.disabled.lock().unwrap().len()
        }
    }

    impl BatchSink for RecordingSink {
        fn on_batch(&self, source: &str, events: Vec<Event>) {
            self.batches
                .lock()
                .unwrap()
                .push((source.to_owned(), events));
        }

        fn on_disabled(&self, notice: DisabledNotice) {
            self.disabled.lock().unwrap().push(notice);
        }
    }

    pub(crate) fn quake(id: &str) -> Event {
        Event::new(id, 0, Category::Earthquake)
    }

    #[tokio::test]
    async fn successful_poll_delivers_batch() {
        let adapter = Adapter::new(ScriptedSource::new(
            "quakes",
            vec![Step::ok(vec![quake("q1"), quake("q2")])],
        ));
        let sink = RecordingSink::default();

        let outcome = adapter.poll_once(&sink).await;

        assert_eq!(outcome, PollOutcome::Delivered { events: 2 });
        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches.first().unwrap().0, "quakes");
        assert!(adapter.health().last_fetch() > 0);
    }

    #[tokio::test]
    async fn empty_poll_resets_errors_without_callback() {
        let adapter = Adapter::new(ScriptedSource::new(
            "quakes",
            vec![Step::fail(), Step::ok(Vec::new())],
        ));
        let sink = RecordingSink::default();

        assert_eq!(
            adapter.poll_once(&sink).await,
            PollOutcome::Failed { error_count: 1 }
        );
        assert_eq!(adapter.poll_once(&sink).await, PollOutcome::Empty);

        assert_eq!(adapter.health().error_count(), 0);
        assert!(adapter.health().last_fetch() > 0);
        assert_eq!(sink.batch_count(), 0);
    }

    #[tokio::test]
    async fn validation_failure_counts_as_failure() {
        let adapter = Adapter::new(ScriptedSource::new(
            "quakes",
            vec![Step::ok(vec![quake("")])],
        ));
        let sink = RecordingSink::default();

        assert_eq!(
            adapter.poll_once(&sink).await,
            PollOutcome::Failed { error_count: 1 }
        );
        assert_eq!(sink.batch_count(), 0);
    }

    #[tokio::test]
    async fn breaker_trips_on_threshold_and_notifies_once() {
        let adapter = Adapter::new(ScriptedSource::new("iss", Vec::new()).max_errors(2));
        let sink = RecordingSink::default();

        assert_eq!(
            adapter.poll_once(&sink).await,
            PollOutcome::Failed { error_count: 1 }
        );
        assert!(adapter.health().is_enabled());

        let outcome = adapter.poll_once(&sink).await;
        let PollOutcome::Disabled(notice) = outcome else {
            panic!("expected disabled, got {outcome:?}");
        };
        assert_eq!(notice.name, "iss");
        assert_eq!(notice.reason, Some(DisabledReason::MaxErrors));

        let status = adapter.health().status();
        assert!(!status.enabled);
        assert!(!status.healthy);
        assert_eq!(status.error_count, 2);
        assert_eq!(status.disabled_reason, Some(DisabledReason::MaxErrors));

        // Further polls are no-ops and do not fetch.
        let fetches = adapter.source().fetches.load(Ordering::SeqCst);
        assert_eq!(adapter.poll_once(&sink).await, PollOutcome::Skipped);
        assert_eq!(adapter.source().fetches.load(Ordering::SeqCst), fetches);
        assert_eq!(sink.disabled_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_polls_immediately_then_on_interval() {
        let adapter = Arc::new(Adapter::new(ScriptedSource::new(
            "quakes",
            vec![
                Step::ok(vec![quake("a")]),
                Step::ok(vec![quake("b")]),
                Step::ok(vec![quake("c")]),
            ],
        )));
        let sink = Arc::new(RecordingSink::default());

        let handle = adapter.start(sink.clone());
        assert!(handle.is_some());
        assert!(adapter.health().is_running());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sink.batch_count(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.batch_count(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.batch_count(), 3);

        adapter.stop();
        assert!(!adapter.health().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_ignored() {
        let adapter = Arc::new(Adapter::new(ScriptedSource::new(
            "quakes",
            vec![Step::ok(vec![quake("a")])],
        )));
        let sink: Arc<dyn BatchSink> = Arc::new(NoOpSink);

        assert!(adapter.start(Arc::clone(&sink)).is_some());
        assert!(adapter.start(sink).is_none());
        adapter.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_timer_but_keeps_counters() {
        let adapter = Arc::new(Adapter::new(ScriptedSource::new("quakes", Vec::new())));
        let sink = Arc::new(RecordingSink::default());

        adapter.start(sink.clone());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(adapter.health().error_count(), 1);

        adapter.stop();
        let fetches = adapter.source().fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(adapter.source().fetches.load(Ordering::SeqCst), fetches);
        assert_eq!(adapter.health().error_count(), 1);
        assert!(adapter.health().is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_poll_delivers_after_stop() {
        let adapter = Arc::new(Adapter::new(ScriptedSource::new(
            "quakes",
            vec![Step::ok(vec![quake("late")]).slow(Duration::from_secs(5))],
        )));
        let sink = Arc::new(RecordingSink::default());

        adapter.start(sink.clone());
        tokio::time::sleep(Duration::from_millis(1)).await;
        adapter.stop();
        assert_eq!(sink.batch_count(), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sink.batch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_does_not_block_next_tick() {
        let adapter = Arc::new(Adapter::new(ScriptedSource::new(
            "quakes",
            vec![
                Step::ok(vec![quake("slow")]).slow(Duration::from_secs(25)),
                Step::ok(vec![quake("fast")]),
            ],
        )));
        let sink = Arc::new(RecordingSink::default());

        adapter.start(sink.clone());
        tokio::time::sleep(Duration::from_secs(11)).await;

        // The second tick completed while the first fetch is still pending.
        let batches = sink.batches.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches.first().unwrap().1.first().unwrap().id.as_str(),
            "fast"
        );
        adapter.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn tripping_stops_the_timer() {
        let adapter = Arc::new(Adapter::new(
            ScriptedSource::new("aurora", Vec::new()).max_errors(2),
        ));
        let sink = Arc::new(RecordingSink::default());

        adapter.start(sink.clone());
        tokio::time::sleep(Duration::from_secs(15)).await;

        assert!(!adapter.health().is_enabled());
        assert!(!adapter.health().is_running());
        assert_eq!(sink.disabled_count(), 1);

        let fetches = adapter.source().fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(adapter.source().fetches.load(Ordering::SeqCst), fetches);

        // A disabled adapter cannot be restarted.
        assert!(adapter.start(sink).is_none());
    }
}
