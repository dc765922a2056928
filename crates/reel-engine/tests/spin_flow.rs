//! End-to-end spin sessions on a paused tokio clock

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

use reel_engine::{
    AbortReason, FetchError, LatencyRange, MockServer, Outcome, OutcomeSource, ReelState,
    SessionStatus, SpinConfig, SpinController, SpinHandle, SpinVerdict, Stage, StageEvent, Symbol,
    TimingConfig, TriggerRejected,
};
use reel_stage::TraceCollection;

const LATENCY: Duration = Duration::from_millis(800);

/// Outcome source replaying canned replies
struct ScriptedSource {
    latency: Duration,
    replies: Mutex<VecDeque<Result<Vec<&'static str>, FetchError>>>,
}

impl ScriptedSource {
    fn new(replies: impl IntoIterator<Item = Result<Vec<&'static str>, FetchError>>) -> Self {
        Self {
            latency: LATENCY,
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }
}

impl OutcomeSource for ScriptedSource {
    async fn request_outcome(&self, _reel_count: usize) -> Result<Outcome, FetchError> {
        tokio::time::sleep(self.latency).await;
        let reply = self.replies.lock().pop_front().expect("no scripted reply left");
        reply.map(|names| Outcome::new(names.into_iter().map(Symbol::from).collect()))
    }
}

fn config() -> SpinConfig {
    SpinConfig::default()
        .with_symbols(["Cherry", "Bell", "Bar"])
        .with_seed(7)
}

fn start(
    config: SpinConfig,
    source: ScriptedSource,
) -> (SpinHandle, broadcast::Receiver<StageEvent>) {
    let (controller, handle) = SpinController::new(config, source).unwrap();
    let events = handle.subscribe();
    controller.spawn();
    (handle, events)
}

async fn until(
    events: &mut broadcast::Receiver<StageEvent>,
    done: impl Fn(&Stage) -> bool,
) -> Vec<StageEvent> {
    let mut seen = Vec::new();
    loop {
        let event = events.recv().await.expect("event stream closed");
        let finished = done(&event.stage);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

fn is_available(stage: &Stage) -> bool {
    matches!(stage, Stage::SpinAvailable)
}

fn count(events: &[StageEvent], type_name: &str) -> usize {
    events.iter().filter(|e| e.type_name() == type_name).count()
}

#[tokio::test(start_paused = true)]
async fn test_win_spin_resolves_once_after_all_locks() {
    let (handle, mut events) = start(
        config(),
        ScriptedSource::new([Ok(vec!["Bell", "Bell", "Bell"])]),
    );
    let started = Instant::now();

    handle.trigger().unwrap();
    let seen = until(&mut events, is_available).await;

    // 800 ms fetch + 30 ticks × 50 ms + 100 ms settle + 1200 ms cooldown
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(3600), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3700), "{elapsed:?}");

    assert_eq!(count(&seen, "resolved"), 1);
    assert_eq!(count(&seen, "reel_locked"), 3);
    let last_lock = seen
        .iter()
        .rposition(|e| e.type_name() == "reel_locked")
        .unwrap();
    let resolved = seen.iter().position(|e| e.type_name() == "resolved").unwrap();
    assert!(resolved > last_lock);

    match &seen[resolved].stage {
        Stage::Resolved { verdict, outcome } => {
            assert_eq!(*verdict, SpinVerdict::Win);
            assert_eq!(outcome, &["Bell", "Bell", "Bell"]);
        }
        other => panic!("unexpected stage {other:?}"),
    }

    let traces = TraceCollection::from_events(seen);
    assert_eq!(traces.len(), 1);
    let validation = traces.traces[0].validate();
    assert!(validation.is_valid(), "{:?}", validation.warnings());

    let view = handle.snapshot();
    assert_eq!(view.status, Some(SessionStatus::Resolved));
    assert_eq!(view.stats.wins, 1);
    assert!(view.reels.iter().all(|r| r.state() == ReelState::Locked));
}

#[tokio::test(start_paused = true)]
async fn test_reels_lock_left_to_right_on_outcome() {
    let (handle, mut events) = start(
        config(),
        ScriptedSource::new([Ok(vec!["Cherry", "Bell", "Bar"])]),
    );

    handle.trigger().unwrap();
    let seen = until(&mut events, is_available).await;

    let locks: Vec<(u8, &str, f64)> = seen
        .iter()
        .filter_map(|e| match &e.stage {
            Stage::ReelLocked { reel_index, symbol } => {
                Some((*reel_index, symbol.as_str(), e.timestamp_ms))
            }
            _ => None,
        })
        .collect();

    assert_eq!(
        locks.iter().map(|&(i, s, _)| (i, s)).collect::<Vec<_>>(),
        vec![(0, "Cherry"), (1, "Bell"), (2, "Bar")]
    );

    // reel i locks after (20 + 5·i) ticks of 50 ms
    let outcome_at = seen
        .iter()
        .find(|e| e.type_name() == "outcome_received")
        .unwrap()
        .timestamp_ms;
    for (i, &(_, _, at)) in locks.iter().enumerate() {
        let expected = outcome_at + (20.0 + 5.0 * i as f64) * 50.0;
        assert!((at - expected).abs() < 5.0, "reel {i} locked at {at}, expected {expected}");
    }

    let ticks_per_reel = |reel: u8| {
        seen.iter()
            .filter(|e| matches!(e.stage, Stage::ReelTick { reel_index, .. } if reel_index == reel))
            .count()
    };
    assert_eq!(ticks_per_reel(0), 19);
    assert_eq!(ticks_per_reel(1), 24);
    assert_eq!(ticks_per_reel(2), 29);

    let resolved = seen.iter().find(|e| e.type_name() == "resolved").unwrap();
    assert!(matches!(
        resolved.stage,
        Stage::Resolved { verdict: SpinVerdict::Lose, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_triggers_ignored_until_cooldown_ends() {
    let (handle, mut events) = start(
        config(),
        ScriptedSource::new([
            Ok(vec!["Bar", "Bar", "Cherry"]),
            Ok(vec!["Bell", "Bell", "Bell"]),
        ]),
    );
    let mut spinning = handle.watch_spinning();
    assert!(!*spinning.borrow_and_update());

    handle.trigger().unwrap();
    assert!(handle.is_spinning());
    assert!(spinning.has_changed().unwrap());
    assert_eq!(handle.trigger(), Err(TriggerRejected::InProgress));

    until(&mut events, |s| matches!(s, Stage::ReelLocked { reel_index: 1, .. })).await;
    assert_eq!(handle.trigger(), Err(TriggerRejected::InProgress));

    until(&mut events, |s| matches!(s, Stage::Resolved { .. })).await;
    let resolved_at = Instant::now();
    assert_eq!(handle.trigger(), Err(TriggerRejected::InProgress));
    assert!(handle.is_spinning());

    until(&mut events, is_available).await;
    assert!(resolved_at.elapsed() >= Duration::from_millis(1200));
    assert!(!handle.is_spinning());
    assert!(!*spinning.borrow_and_update());

    handle.trigger().unwrap();
    let second = until(&mut events, is_available).await;
    assert_eq!(count(&second, "resolved"), 1);
    assert_eq!(count(&second, "spin_requested"), 1);

    let stats = handle.snapshot().stats;
    assert_eq!(stats.total_spins, 2);
    assert_eq!(handle.ignored_triggers(), 3);
    assert_eq!((stats.wins, stats.losses), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_triggers_start_one_session() {
    let (handle, mut events) = start(
        config(),
        ScriptedSource::new([Ok(vec!["Bell", "Bar", "Bar"])]),
    );

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.trigger() })
        })
        .collect();
    let mut accepted = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);

    let seen = until(&mut events, is_available).await;
    assert_eq!(count(&seen, "spin_requested"), 1);
    assert_eq!(count(&seen, "trigger_ignored"), 7);
    assert_eq!(count(&seen, "resolved"), 1);

    // Rejections are counted on the handle, the controller's view stays untouched
    assert_eq!(handle.ignored_triggers(), 7);
    let stats = handle.snapshot().stats;
    assert_eq!((stats.total_spins, stats.aborted), (1, 0));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_aborts_without_resolution() {
    let (handle, mut events) = start(
        config(),
        ScriptedSource::new([Err(FetchError::Rejected("maintenance".into()))]),
    );

    handle.trigger().unwrap();
    let seen = until(&mut events, is_available).await;

    assert_eq!(count(&seen, "resolved"), 0);
    assert_eq!(count(&seen, "outcome_received"), 0);
    let aborted = seen.iter().find(|e| e.type_name() == "aborted").unwrap();
    match &aborted.stage {
        Stage::Aborted { reason: AbortReason::FetchFailed(detail) } => {
            assert!(detail.contains("maintenance"));
        }
        other => panic!("unexpected stage {other:?}"),
    }

    let view = handle.snapshot();
    assert_eq!(view.status, Some(SessionStatus::Aborted));
    assert!(view.reels.iter().all(|r| r.state() == ReelState::Idle));
    assert_eq!(view.stats.aborted, 1);
    assert!(!handle.is_spinning());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_outcome_aborts() {
    let (handle, mut events) = start(
        config(),
        ScriptedSource::new([Ok(vec!["Bell", "Bell"]), Ok(vec!["Bell", "Plum", "Bell"])]),
    );

    handle.trigger().unwrap();
    let first = until(&mut events, is_available).await;
    assert!(first.iter().any(|e| matches!(
        &e.stage,
        Stage::Aborted { reason: AbortReason::FetchFailed(d) } if d.contains("expected 3")
    )));

    handle.trigger().unwrap();
    let second = until(&mut events, is_available).await;
    assert!(second.iter().any(|e| matches!(
        &e.stage,
        Stage::Aborted { reason: AbortReason::FetchFailed(d) } if d.contains("Plum")
    )));
    assert_eq!(count(&second, "reel_spinning"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_outcome_timeout_aborts() {
    let mut config = config();
    config.outcome_timeout_ms = Some(500);
    let (handle, mut events) = start(
        config,
        ScriptedSource::new([Ok(vec!["Bell", "Bell", "Bell"])]),
    );
    let started = Instant::now();

    handle.trigger().unwrap();
    let seen = until(&mut events, is_available).await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "{elapsed:?}");
    assert!(seen.iter().any(|e| matches!(
        e.stage,
        Stage::Aborted { reason: AbortReason::Timeout }
    )));
    assert_eq!(count(&seen, "resolved"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_awaiting_outcome() {
    let (handle, mut events) = start(
        config(),
        ScriptedSource::new([Ok(vec!["Bell", "Bell", "Bell"])]),
    );

    handle.trigger().unwrap();
    until(&mut events, |s| matches!(s, Stage::SpinRequested { .. })).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(handle.cancel());

    let seen = until(&mut events, is_available).await;
    assert!(seen.iter().any(|e| matches!(
        e.stage,
        Stage::Aborted { reason: AbortReason::Cancelled }
    )));
    assert_eq!(count(&seen, "outcome_received"), 0);
    assert!(!handle.is_spinning());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_animation_then_spin_again() {
    let (handle, mut events) = start(
        config(),
        ScriptedSource::new([
            Ok(vec!["Bell", "Bell", "Bell"]),
            Ok(vec!["Cherry", "Cherry", "Bar"]),
        ]),
    );

    handle.trigger().unwrap();
    until(&mut events, |s| matches!(s, Stage::OutcomeReceived { .. })).await;
    tokio::time::sleep(Duration::from_millis(1020)).await;
    assert!(handle.cancel());

    let first = until(&mut events, is_available).await;
    assert_eq!(count(&first, "resolved"), 0);
    assert!(first.iter().any(|e| matches!(
        e.stage,
        Stage::Aborted { reason: AbortReason::Cancelled }
    )));
    let view = handle.snapshot();
    assert_eq!(view.status, Some(SessionStatus::Aborted));
    assert!(view.reels.iter().all(|r| r.state() == ReelState::Idle));

    handle.trigger().unwrap();
    let second = until(&mut events, is_available).await;
    let traces = TraceCollection::from_events(second);
    assert_eq!(traces.len(), 1);
    let trace = &traces.traces[0];
    assert_eq!(trace.request_id, 2);
    assert!(trace.validate().is_valid());
    assert_eq!(trace.verdict(), Some(SpinVerdict::Lose));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_controller() {
    let (controller, handle) = SpinController::new(
        config(),
        ScriptedSource::new([Ok(vec!["Bell", "Bell", "Bell"])]),
    )
    .unwrap();
    let mut events = handle.subscribe();
    let task = controller.spawn();

    handle.trigger().unwrap();
    until(&mut events, |s| matches!(s, Stage::ReelLocked { reel_index: 0, .. })).await;
    assert!(handle.shutdown());

    let seen = until(&mut events, is_available).await;
    assert!(seen.iter().any(|e| matches!(
        e.stage,
        Stage::Aborted { reason: AbortReason::Shutdown }
    )));
    task.await.unwrap();

    assert!(!handle.is_spinning());
    assert_eq!(handle.trigger(), Err(TriggerRejected::Closed));
    assert!(!handle.is_spinning());
}

#[tokio::test(start_paused = true)]
async fn test_mock_server_sessions_stay_consistent() {
    let config = SpinConfig::studio().with_seed(42);
    let server = MockServer::seeded(config.generator().unwrap(), LatencyRange::instant(), 42);
    let (controller, handle) = SpinController::new(config, server).unwrap();
    let mut events = handle.subscribe();
    controller.spawn();

    let mut all = Vec::new();
    for _ in 0..40 {
        handle.trigger().unwrap();
        all.extend(until(&mut events, is_available).await);
    }

    let traces = TraceCollection::from_events(all);
    assert_eq!(traces.len(), 40);
    for trace in &traces.traces {
        let validation = trace.validate();
        assert!(validation.is_valid(), "{}: {:?}", trace.trace_id, validation.warnings());
        assert_eq!(validation.resolution_count, 1);
    }

    let stats = traces.stats();
    assert_eq!(stats.wins + stats.losses, 40);
    assert!(stats.wins > 0);
    assert_eq!(handle.snapshot().stats.wins as usize, stats.wins);
}

#[test]
fn test_invalid_config_rejected() {
    let config = config().with_timing(TimingConfig {
        tick_interval_ms: 0,
        ..TimingConfig::normal()
    });
    assert!(SpinController::new(config, ScriptedSource::new([])).is_err());
}
