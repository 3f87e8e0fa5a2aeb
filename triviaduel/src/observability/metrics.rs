//! Duel metrics.
//!
//! Prometheus-compatible counters and histograms. Every `record_*` function
//! is a no-op until [`init_metrics`] installs a recorder, so the engine can
//! call them unconditionally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use triviaduel_core::model::{MatchState, Settlement, Winner};

use crate::error::DuelError;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global metrics recorder.
///
/// With `Some(port)` a Prometheus scrape endpoint listens on
/// `127.0.0.1:<port>`; with `None` metrics are recorded but not exported.
///
/// # Errors
///
/// Returns `DuelError::Io` if the recorder or the HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), DuelError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| DuelError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "triviaduel_matches_started_total",
        "Matches that entered matchmaking"
    );
    describe_counter!(
        "triviaduel_matches_finished_total",
        "Matches that reached the finished state, by winner"
    );
    describe_counter!(
        "triviaduel_rounds_settled_total",
        "Settled rounds, by settlement cause"
    );
    describe_counter!(
        "triviaduel_opponent_answers_total",
        "Simulated opponent answers applied, by lateness"
    );
    describe_counter!(
        "triviaduel_reward_dispatch_total",
        "Reward dispatch attempts, by status"
    );
    describe_counter!(
        "triviaduel_matchmaking_failures_total",
        "Matches aborted because no round slate could be fetched"
    );
    describe_histogram!(
        "triviaduel_answer_latency_ms",
        "Time from round start to player answer in milliseconds"
    );
    describe_gauge!("triviaduel_match_state", "Current match state (1 = active)");
}

/// Records a match entering matchmaking.
pub fn record_match_started() {
    counter!("triviaduel_matches_started_total").increment(1);
}

/// Records a finished match.
pub fn record_match_finished(winner: Winner) {
    counter!("triviaduel_matches_finished_total", "winner" => winner.as_str()).increment(1);
}

/// Records a settled round.
pub fn record_round_settled(settlement: Settlement) {
    counter!("triviaduel_rounds_settled_total", "cause" => settlement.as_str()).increment(1);
}

/// Records an opponent answer reaching the score, `late` once the match
/// has finished.
pub fn record_opponent_answer(late: bool) {
    let late = if late { "true" } else { "false" };
    counter!("triviaduel_opponent_answers_total", "late" => late).increment(1);
}

/// Records the outcome of a reward dispatch.
pub fn record_reward_dispatch(success: bool) {
    let status = if success { "granted" } else { "failed" };
    counter!("triviaduel_reward_dispatch_total", "status" => status).increment(1);
}

/// Records a matchmaking abort.
pub fn record_matchmaking_failure() {
    counter!("triviaduel_matchmaking_failures_total").increment(1);
}

/// Records how long the player took to answer.
pub fn record_answer_latency(latency: Duration) {
    histogram!("triviaduel_answer_latency_ms").record(latency.as_secs_f64() * 1000.0);
}

/// Moves the state gauge from `previous` to `state`.
pub fn set_match_state(state: MatchState, previous: MatchState) {
    if previous != state {
        gauge!("triviaduel_match_state", "state" => previous.as_str()).set(0.0);
    }
    gauge!("triviaduel_match_state", "state" => state.as_str()).set(1.0);
}
