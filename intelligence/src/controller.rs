//! Quote refresh controller
//!
//! A single actor task owns the active swap intent. Commands arrive over an
//! mpsc channel; evaluations run on spawned tasks and report back with the
//! generation they were started for. Only a result whose generation is still
//! the latest is committed, so a late evaluation can never overwrite a newer
//! quote.
//!
//! Status machine: `Idle -> Evaluating -> Ready | Failed`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::OptimizationEngine;
use crate::error::{OptimizationError, Result};
use crate::types::{OptimizationQuote, RequestKey, SwapRequest, UserPreferences};

/// Outcome handed to callers awaiting a quote
pub type QuoteResult = std::result::Result<Arc<OptimizationQuote>, Arc<OptimizationError>>;

/// Current status of the active swap intent
#[derive(Debug, Clone)]
pub enum QuoteStatus {
    Idle,
    Evaluating,
    Ready(Arc<OptimizationQuote>),
    Failed(Arc<OptimizationError>),
}

impl QuoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuoteStatus::Ready(_) | QuoteStatus::Failed(_))
    }

    pub fn quote(&self) -> Option<&Arc<OptimizationQuote>> {
        match self {
            QuoteStatus::Ready(quote) => Some(quote),
            _ => None,
        }
    }
}

/// Status tagged with the generation it belongs to
#[derive(Debug, Clone)]
pub struct QuoteState {
    pub generation: u64,
    pub status: QuoteStatus,
}

/// Transition notification
#[derive(Debug, Clone)]
pub enum QuoteEvent {
    Evaluating { generation: u64 },
    Ready { generation: u64, quote: Arc<OptimizationQuote> },
    Failed { generation: u64, error: Arc<OptimizationError> },
}

impl QuoteEvent {
    pub fn generation(&self) -> u64 {
        match self {
            QuoteEvent::Evaluating { generation }
            | QuoteEvent::Ready { generation, .. }
            | QuoteEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Controller timing
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub debounce: Duration,
    pub refresh_interval: Duration,
    pub event_buffer: usize,
}

impl ControllerSettings {
    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        Self {
            debounce: config.debounce(),
            refresh_interval: config.refresh_interval(),
            event_buffer: config.refresh.event_buffer,
        }
    }
}

enum Command {
    Submit {
        request: SwapRequest,
        reply: oneshot::Sender<u64>,
    },
    UpdatePreferences(UserPreferences),
    RefreshNow,
    Shutdown,
}

struct EvaluationOutcome {
    generation: u64,
    key: RequestKey,
    result: Result<OptimizationQuote>,
}

struct InFlight {
    generation: u64,
    key: RequestKey,
    cancel: CancellationToken,
    /// Published as `Evaluating`; background refreshes are not
    announced: bool,
}

/// Cloneable front end of a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<QuoteState>,
    events: broadcast::Sender<QuoteEvent>,
}

impl ControllerHandle {
    /// Submit a new request; returns the generation it was assigned
    ///
    /// Re-submitting the request that is currently evaluating returns the
    /// generation already in flight.
    pub async fn submit(&self, request: SwapRequest) -> Result<u64> {
        let (reply, generation) = oneshot::channel();
        self.send(Command::Submit { request, reply }).await?;
        generation.await.map_err(|_| OptimizationError::ControllerClosed)
    }

    /// Submit and wait for the evaluation to settle
    ///
    /// Latest request wins: if another submit supersedes this one before it
    /// settles, the newer outcome is returned.
    pub async fn get_optimization_quote(&self, request: SwapRequest) -> QuoteResult {
        let generation = self.submit(request).await.map_err(Arc::new)?;
        let mut state = self.state.clone();

        let settled = state
            .wait_for(|s| s.generation >= generation && s.status.is_terminal())
            .await
            .map_err(|_| Arc::new(OptimizationError::ControllerClosed))?
            .status
            .clone();

        match settled {
            QuoteStatus::Ready(quote) => Ok(quote),
            QuoteStatus::Failed(error) => Err(error),
            QuoteStatus::Idle | QuoteStatus::Evaluating => {
                Err(Arc::new(OptimizationError::internal("quote settled without an outcome")))
            }
        }
    }

    pub async fn update_preferences(&self, preferences: UserPreferences) -> Result<()> {
        preferences.validate()?;
        self.send(Command::UpdatePreferences(preferences)).await
    }

    pub async fn refresh_now(&self) -> Result<()> {
        self.send(Command::RefreshNow).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    /// Snapshot of the current state
    pub fn current(&self) -> QuoteState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<QuoteState> {
        self.state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QuoteEvent> {
        self.events.subscribe()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| OptimizationError::ControllerClosed)
    }
}

/// The actor behind a `ControllerHandle`
pub struct RefreshController {
    engine: OptimizationEngine,
    preferences: UserPreferences,
    settings: ControllerSettings,

    generation: u64,
    latest_request: Option<SwapRequest>,
    debounce_deadline: Option<Instant>,
    in_flight: Option<InFlight>,

    results: mpsc::UnboundedSender<EvaluationOutcome>,
    state: watch::Sender<QuoteState>,
    events: broadcast::Sender<QuoteEvent>,
}

impl RefreshController {
    /// Start the controller task
    pub fn spawn(
        engine: OptimizationEngine,
        preferences: UserPreferences,
        settings: ControllerSettings,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(QuoteState {
            generation: 0,
            status: QuoteStatus::Idle,
        });
        let (event_tx, _) = broadcast::channel(settings.event_buffer.max(1));

        let controller = Self {
            engine,
            preferences,
            settings,
            generation: 0,
            latest_request: None,
            debounce_deadline: None,
            in_flight: None,
            results: result_tx,
            state: state_tx,
            events: event_tx.clone(),
        };

        let handle = ControllerHandle {
            commands: command_tx,
            state: state_rx,
            events: event_tx,
        };

        let task = tokio::spawn(controller.run(command_rx, result_rx));
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut results: mpsc::UnboundedReceiver<EvaluationOutcome>,
    ) {
        let period = self.settings.refresh_interval;
        let mut refresh = tokio::time::interval_at(Instant::now() + period, period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            debounce_ms = self.settings.debounce.as_millis() as u64,
            refresh_secs = period.as_secs(),
            "Refresh controller started"
        );

        loop {
            let deadline = self.debounce_deadline;
            let debounce = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Submit { request, reply }) => {
                        let generation = self.submit(request);
                        let _ = reply.send(generation);
                    }
                    Some(Command::UpdatePreferences(preferences)) => self.update_preferences(preferences),
                    Some(Command::RefreshNow) => self.refresh("manual"),
                    Some(Command::Shutdown) | None => break,
                },
                _ = debounce => {
                    self.debounce_deadline = None;
                    self.start_evaluation();
                }
                Some(outcome) = results.recv() => self.commit(outcome),
                _ = refresh.tick() => self.refresh("periodic"),
            }
        }

        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
        info!("Refresh controller stopped");
    }

    fn submit(&mut self, request: SwapRequest) -> u64 {
        let key = request.key();

        // Background refreshes are not joinable; their generation is already terminal
        let duplicate = self.debounce_deadline.is_none()
            && self
                .in_flight
                .as_ref()
                .is_some_and(|f| f.announced && f.key == key && f.generation == self.generation);
        if duplicate {
            debug!(generation = self.generation, key = %key, "Duplicate submit joined in-flight evaluation");
            return self.generation;
        }

        self.latest_request = Some(request);
        self.supersede()
    }

    fn update_preferences(&mut self, preferences: UserPreferences) {
        self.preferences = preferences;
        if self.latest_request.is_some() {
            self.supersede();
        }
    }

    /// New input: bump the generation, cancel the running evaluation, restart the debounce
    fn supersede(&mut self) -> u64 {
        self.generation += 1;

        if let Some(in_flight) = self.in_flight.take() {
            debug!(
                generation = in_flight.generation,
                latest = self.generation,
                "Cancelling superseded evaluation"
            );
            in_flight.cancel.cancel();
        }

        self.debounce_deadline = Some(Instant::now() + self.settings.debounce);
        self.publish(QuoteStatus::Evaluating);
        self.generation
    }

    /// Re-run the latest request with fresh market data while a quote is shown
    fn refresh(&mut self, trigger: &'static str) {
        if self.latest_request.is_none() || self.in_flight.is_some() || self.debounce_deadline.is_some() {
            debug!(trigger, "Refresh skipped");
            return;
        }
        if let QuoteStatus::Failed(error) = &self.state.borrow().status {
            if !error.is_retryable() {
                debug!(trigger, kind = error.kind(), "Refresh skipped for rejected request");
                return;
            }
        }
        debug!(trigger, generation = self.generation, "Refreshing quote");
        self.spawn_evaluation(false);
    }

    fn start_evaluation(&mut self) {
        self.spawn_evaluation(true);
    }

    fn spawn_evaluation(&mut self, announce: bool) {
        let Some(request) = self.latest_request.clone() else {
            return;
        };

        let generation = self.generation;
        let key = request.key();
        let cancel = CancellationToken::new();

        self.in_flight = Some(InFlight {
            generation,
            key: key.clone(),
            cancel: cancel.clone(),
            announced: announce,
        });
        if announce {
            let _ = self.events.send(QuoteEvent::Evaluating { generation });
        }

        let engine = self.engine.clone();
        let preferences = self.preferences.clone();
        let results = self.results.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(generation, "Evaluation cancelled");
                }
                result = engine.get_optimization_quote(&request, &preferences) => {
                    let _ = results.send(EvaluationOutcome { generation, key, result });
                }
            }
        });
    }

    fn commit(&mut self, outcome: EvaluationOutcome) {
        if outcome.generation != self.generation {
            let stale = OptimizationError::StaleResultDiscarded {
                generation: outcome.generation,
                latest: self.generation,
            };
            debug!(key = %outcome.key, "{}", stale);
            return;
        }

        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == outcome.generation)
        {
            self.in_flight = None;
        }

        let generation = outcome.generation;
        match outcome.result {
            Ok(quote) => {
                let quote = Arc::new(quote);
                self.publish(QuoteStatus::Ready(quote.clone()));
                let _ = self.events.send(QuoteEvent::Ready { generation, quote });
            }
            Err(error) => {
                warn!(generation, kind = error.kind(), error = %error, "Evaluation failed");
                let error = Arc::new(error);
                self.publish(QuoteStatus::Failed(error.clone()));
                let _ = self.events.send(QuoteEvent::Failed { generation, error });
            }
        }
    }

    fn publish(&self, status: QuoteStatus) {
        self.state.send_replace(QuoteState {
            generation: self.generation,
            status,
        });
    }
}
