//! Spin controller - drives one session at a time on the event loop
//!
//! The controller task owns the single active [`SpinSession`]. Each reel's
//! timeline runs as its own interval task and reports back over a channel;
//! the controller counts locks and resolves once. Presentation talks to the
//! controller only through a [`SpinHandle`]: triggers and cancels go in,
//! stage events, the spin-in-progress flag and a read-only snapshot come out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use reel_stage::{AbortReason, Stage, StageEvent};

use crate::config::SpinConfig;
use crate::error::{FetchError, SpinError, TriggerRejected};
use crate::outcome::Outcome;
use crate::reel::{Reel, ReelTick, ReelTimeline};
use crate::server::OutcomeSource;
use crate::session::{RequestId, Resolution, SessionStatus, SpinSession};
use crate::symbols::SymbolCatalog;

/// Stage event buffer per subscriber
const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpinCommand {
    Spin,
    Cancel,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Shutdown,
}

/// Session statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_spins: u64,
    pub wins: u64,
    pub losses: u64,
    pub aborted: u64,
}

impl SessionStats {
    /// Calculate hit rate (% of resolved spins that won)
    pub fn hit_rate(&self) -> f64 {
        let resolved = self.wins + self.losses;
        if resolved > 0 {
            (self.wins as f64 / resolved as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Read-only view of the machine for the presentation layer
#[derive(Debug, Clone, Default, Serialize)]
pub struct MachineView {
    /// Latest (or current) spin request
    pub request_id: Option<RequestId>,
    pub status: Option<SessionStatus>,
    pub reels: Vec<Reel>,
    pub outcome: Option<Outcome>,
    pub stats: SessionStats,
}

/// Presentation-side handle to a running controller
#[derive(Clone)]
pub struct SpinHandle {
    command_tx: mpsc::UnboundedSender<SpinCommand>,
    spinning: Arc<watch::Sender<bool>>,
    event_tx: broadcast::Sender<StageEvent>,
    view: Arc<RwLock<MachineView>>,
    /// Shared by every clone; the view is only written by the controller
    ignored: Arc<AtomicU64>,
    origin: Instant,
}

impl SpinHandle {
    /// Request a spin.
    ///
    /// The spin-in-progress flag is claimed atomically here, so concurrent
    /// triggers cannot both start a session. Rejected triggers are dropped,
    /// never queued.
    pub fn trigger(&self) -> Result<(), TriggerRejected> {
        let claimed = self.spinning.send_if_modified(|spinning| {
            if *spinning {
                false
            } else {
                *spinning = true;
                true
            }
        });

        if !claimed {
            log::debug!("[Spin] trigger ignored, spin in progress");
            self.ignored.fetch_add(1, Ordering::Relaxed);
            let _ = self
                .event_tx
                .send(StageEvent::new(Stage::TriggerIgnored, elapsed_ms(self.origin)));
            return Err(TriggerRejected::InProgress);
        }

        if self.command_tx.send(SpinCommand::Spin).is_err() {
            self.spinning.send_replace(false);
            return Err(TriggerRejected::Closed);
        }
        Ok(())
    }

    /// Abort the active spin, if any. Returns false if the controller is gone.
    pub fn cancel(&self) -> bool {
        self.command_tx.send(SpinCommand::Cancel).is_ok()
    }

    /// Abort the active spin and stop the controller loop
    pub fn shutdown(&self) -> bool {
        self.command_tx.send(SpinCommand::Shutdown).is_ok()
    }

    /// True from an accepted trigger until the cooldown (or abort) ends
    pub fn is_spinning(&self) -> bool {
        *self.spinning.borrow()
    }

    /// Follow the spin-in-progress flag (show/hide the trigger control)
    pub fn watch_spinning(&self) -> watch::Receiver<bool> {
        self.spinning.subscribe()
    }

    /// Subscribe to stage events
    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.event_tx.subscribe()
    }

    /// Triggers rejected so far, across all clones of this handle
    pub fn ignored_triggers(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Copy of the current machine state
    pub fn snapshot(&self) -> MachineView {
        self.view.read().clone()
    }
}

/// Reel task report
#[derive(Debug)]
struct ReelSignal {
    request_id: RequestId,
    reel_index: usize,
    tick: ReelTick,
}

/// Cancellation handles for the reel tasks of one session
struct ReelTimers {
    tasks: Vec<JoinHandle<()>>,
}

impl ReelTimers {
    fn cancel(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for ReelTimers {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Owns the active session and the reels between sessions
pub struct SpinController<S> {
    config: SpinConfig,
    catalog: SymbolCatalog,
    source: S,
    rng: ChaCha8Rng,
    reels: Vec<Reel>,
    next_request: u64,
    command_rx: mpsc::UnboundedReceiver<SpinCommand>,
    signal_tx: mpsc::UnboundedSender<ReelSignal>,
    signal_rx: mpsc::UnboundedReceiver<ReelSignal>,
    spinning: Arc<watch::Sender<bool>>,
    event_tx: broadcast::Sender<StageEvent>,
    view: Arc<RwLock<MachineView>>,
    origin: Instant,
}

impl<S: OutcomeSource> SpinController<S> {
    /// Validate the config and build a controller plus its handle
    pub fn new(config: SpinConfig, source: S) -> Result<(Self, SpinHandle), SpinError> {
        config.validate()?;
        let catalog = config.catalog()?;

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        let reels = Reel::row(config.reel_count, &catalog, &mut rng);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (spinning, _) = watch::channel(false);
        let spinning = Arc::new(spinning);
        let view = Arc::new(RwLock::new(MachineView {
            reels: reels.clone(),
            ..MachineView::default()
        }));
        let origin = Instant::now();

        let handle = SpinHandle {
            command_tx,
            spinning: Arc::clone(&spinning),
            event_tx: event_tx.clone(),
            view: Arc::clone(&view),
            ignored: Arc::new(AtomicU64::new(0)),
            origin,
        };

        let controller = Self {
            config,
            catalog,
            source,
            rng,
            reels,
            next_request: 0,
            command_rx,
            signal_tx,
            signal_rx,
            spinning,
            event_tx,
            view,
            origin,
        };

        Ok((controller, handle))
    }

    pub fn config(&self) -> &SpinConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    /// Run the controller on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process commands until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        log::info!(
            "[Spin] controller started ({} reels, {} symbols)",
            self.config.reel_count,
            self.catalog.len()
        );

        while let Some(command) = self.command_rx.recv().await {
            match command {
                SpinCommand::Spin => {
                    if self.play_spin().await == Flow::Shutdown {
                        break;
                    }
                }
                SpinCommand::Cancel => log::debug!("[Spin] cancel with no active spin"),
                SpinCommand::Shutdown => break,
            }
        }

        self.spinning.send_replace(false);
        log::info!("[Spin] controller stopped");
    }

    async fn play_spin(&mut self) -> Flow {
        self.next_request += 1;
        let request_id = RequestId(self.next_request);
        let reel_count = self.config.reel_count;

        let mut session = SpinSession::begin(request_id, std::mem::take(&mut self.reels));
        self.view.write().stats.total_spins += 1;
        self.publish(&session);
        log::info!("[Spin] {request_id} requested");
        self.emit(request_id, Stage::SpinRequested { reel_count: reel_count as u8 });

        // ═══ AWAITING OUTCOME ═══
        let fetched = {
            let fetch = fetch_outcome(&self.source, reel_count, self.config.outcome_timeout());
            tokio::pin!(fetch);

            loop {
                tokio::select! {
                    result = &mut fetch => break Ok(result),
                    Some(command) = self.command_rx.recv() => match command {
                        SpinCommand::Spin => log::warn!("[Spin] spin command during {request_id}, ignored"),
                        SpinCommand::Cancel => break Err((AbortReason::Cancelled, Flow::Continue)),
                        SpinCommand::Shutdown => break Err((AbortReason::Shutdown, Flow::Shutdown)),
                    },
                }
            }
        };

        let outcome = match fetched {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(error)) => return self.abort(session, abort_reason(&error), Flow::Continue),
            Err((reason, flow)) => return self.abort(session, reason, flow),
        };
        if let Err(error) = session.accept_outcome(outcome.clone(), &self.catalog) {
            return self.abort(session, abort_reason(&error), Flow::Continue);
        }

        // ═══ ANIMATING ═══
        log::debug!("[Spin] {request_id} outcome {:?}", outcome.names());
        self.publish(&session);
        self.emit(request_id, Stage::OutcomeReceived { symbols: outcome.names() });
        let timers = self.start_timelines(request_id, &outcome);

        let resolution = loop {
            tokio::select! {
                Some(signal) = self.signal_rx.recv() => {
                    if signal.request_id != request_id {
                        log::debug!("[Spin] discarding stale reel signal from {}", signal.request_id);
                        continue;
                    }
                    if let Some(resolution) = self.apply_signal(&mut session, signal) {
                        break resolution;
                    }
                }
                Some(command) = self.command_rx.recv() => match command {
                    SpinCommand::Spin => log::warn!("[Spin] spin command during {request_id}, ignored"),
                    SpinCommand::Cancel => {
                        timers.cancel();
                        return self.abort(session, AbortReason::Cancelled, Flow::Continue);
                    }
                    SpinCommand::Shutdown => {
                        timers.cancel();
                        return self.abort(session, AbortReason::Shutdown, Flow::Shutdown);
                    }
                },
            }
        };

        // ═══ RESOLVED ═══
        drop(timers);
        self.reels = session.into_reels();
        {
            let mut view = self.view.write();
            if resolution.verdict.is_win() {
                view.stats.wins += 1;
            } else {
                view.stats.losses += 1;
            }
        }

        tokio::time::sleep(self.config.timing.settle_delay()).await;
        log::info!(
            "[Spin] {request_id} resolved {} {:?}",
            resolution.verdict,
            resolution.outcome.names()
        );
        self.emit(
            request_id,
            Stage::Resolved {
                verdict: resolution.verdict,
                outcome: resolution.outcome.names(),
            },
        );

        let flow = self.cooldown(request_id).await;
        self.finish(request_id);
        flow
    }

    /// Apply one reel report to the session; Some on the final lock
    fn apply_signal(&self, session: &mut SpinSession, signal: ReelSignal) -> Option<Resolution> {
        let request_id = session.request_id();
        let reel_index = signal.reel_index;

        match signal.tick {
            ReelTick::Cycle(symbol) => {
                let name = symbol.to_string();
                session.show(reel_index, symbol);
                self.publish(session);
                self.emit(
                    request_id,
                    Stage::ReelTick { reel_index: reel_index as u8, symbol: name },
                );
                None
            }
            ReelTick::Lock(symbol) => {
                let name = symbol.to_string();
                let resolution = session.lock(reel_index, symbol);
                self.publish(session);
                log::debug!(
                    "[Reel] {request_id} reel {reel_index} locked on {name} ({}/{})",
                    session.locked_count(),
                    session.reel_count()
                );
                self.emit(
                    request_id,
                    Stage::ReelLocked { reel_index: reel_index as u8, symbol: name },
                );
                resolution
            }
        }
    }

    fn start_timelines(&mut self, request_id: RequestId, outcome: &Outcome) -> ReelTimers {
        let plan = self.config.timing.stagger();
        let period = self.config.timing.tick_interval();
        let mut tasks = Vec::with_capacity(outcome.len());

        for (reel_index, symbol) in outcome.symbols().iter().enumerate() {
            let timeline = ReelTimeline::new(reel_index, symbol.clone(), &plan);
            self.emit(
                request_id,
                Stage::ReelSpinning {
                    reel_index: reel_index as u8,
                    total_cycles: timeline.total_cycles(),
                },
            );

            let entropy = ChaCha8Rng::seed_from_u64(self.rng.random());
            tasks.push(tokio::spawn(drive_reel(
                request_id,
                timeline,
                self.catalog.clone(),
                entropy,
                period,
                self.signal_tx.clone(),
            )));
        }

        ReelTimers { tasks }
    }

    /// Post-resolution cooldown. Only shutdown cuts it short.
    async fn cooldown(&mut self, request_id: RequestId) -> Flow {
        let sleep = tokio::time::sleep(self.config.timing.cooldown());
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Flow::Continue,
                Some(command) = self.command_rx.recv() => match command {
                    SpinCommand::Spin => log::warn!("[Spin] spin command during {request_id} cooldown, ignored"),
                    SpinCommand::Cancel => log::debug!("[Spin] {request_id} already resolved, cancel ignored"),
                    SpinCommand::Shutdown => return Flow::Shutdown,
                },
            }
        }
    }

    fn abort(&mut self, mut session: SpinSession, reason: AbortReason, flow: Flow) -> Flow {
        let request_id = session.request_id();
        session.abort();
        log::warn!("[Spin] {request_id} aborted: {reason}");

        self.publish(&session);
        self.view.write().stats.aborted += 1;
        self.reels = session.into_reels();
        self.emit(request_id, Stage::Aborted { reason });
        self.finish(request_id);
        flow
    }

    fn finish(&self, request_id: RequestId) {
        self.spinning.send_replace(false);
        self.emit(request_id, Stage::SpinAvailable);
    }

    fn publish(&self, session: &SpinSession) {
        let mut view = self.view.write();
        view.request_id = Some(session.request_id());
        view.status = Some(session.status());
        view.reels = session.reels().to_vec();
        view.outcome = session.outcome().cloned();
    }

    fn emit(&self, request_id: RequestId, stage: Stage) {
        let event = StageEvent::for_request(stage, elapsed_ms(self.origin), request_id.0);
        // no subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

async fn fetch_outcome<S: OutcomeSource>(
    source: &S,
    reel_count: usize,
    timeout: Option<Duration>,
) -> Result<Outcome, FetchError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, source.request_outcome(reel_count))
            .await
            .map_err(|_| FetchError::Timeout(limit))?,
        None => source.request_outcome(reel_count).await,
    }
}

/// Tick one reel until it locks
async fn drive_reel(
    request_id: RequestId,
    mut timeline: ReelTimeline,
    catalog: SymbolCatalog,
    mut entropy: ChaCha8Rng,
    period: Duration,
    signals: mpsc::UnboundedSender<ReelSignal>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let tick = timeline.tick(&catalog, &mut entropy);
        let locked = tick.is_lock();
        let signal = ReelSignal {
            request_id,
            reel_index: timeline.reel_index(),
            tick,
        };
        if signals.send(signal).is_err() || locked {
            break;
        }
    }
}

fn abort_reason(error: &FetchError) -> AbortReason {
    match error {
        FetchError::Timeout(_) => AbortReason::Timeout,
        other => AbortReason::FetchFailed(other.to_string()),
    }
}

fn elapsed_ms(origin: Instant) -> f64 {
    origin.elapsed().as_secs_f64() * 1000.0
}
