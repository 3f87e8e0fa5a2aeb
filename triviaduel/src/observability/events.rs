//! Structured match event stream.
//!
//! Discrete, typed events emitted as a match progresses, serialized as
//! newline-delimited JSON with a monotonically increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use triviaduel_core::model::{MatchState, Settlement, Winner};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete match event, tagged with `"type"` when serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The player asked for a match.
    MatchSearching {
        /// When matchmaking started.
        timestamp: DateTime<Utc>,
        /// Match epoch.
        epoch: u64,
        /// Player id.
        player_id: String,
    },

    /// Matchmaking finished and round 0 started.
    MatchStarted {
        /// When the first round started.
        timestamp: DateTime<Utc>,
        /// Match epoch.
        epoch: u64,
        /// Display name of the simulated opponent.
        opponent: String,
        /// Rounds in the match.
        rounds: usize,
    },

    /// A round recorded the player's outcome.
    RoundSettled {
        /// When the round settled.
        timestamp: DateTime<Utc>,
        /// Match epoch.
        epoch: u64,
        /// Zero-based round index.
        round: usize,
        /// What settled the round.
        settlement: Settlement,
        /// Whether the player's answer was correct.
        correct: bool,
    },

    /// A simulated opponent answer resolved.
    OpponentAnswered {
        /// When the answer resolved.
        timestamp: DateTime<Utc>,
        /// Match epoch.
        epoch: u64,
        /// Round the answer belongs to.
        round: usize,
        /// Whether it was correct.
        correct: bool,
        /// Whether it resolved after the match finished.
        late: bool,
    },

    /// The last round settled and the result was frozen.
    MatchFinished {
        /// When the match finished.
        timestamp: DateTime<Utc>,
        /// Match epoch.
        epoch: u64,
        /// Final player score.
        player_score: u32,
        /// Opponent score at the moment of finishing.
        opponent_score: u32,
        /// Winner.
        winner: Winner,
    },

    /// Reward dispatch completed.
    RewardsDispatched {
        /// When the stats collaborator answered.
        timestamp: DateTime<Utc>,
        /// Match epoch.
        epoch: u64,
        /// Whether the increment was accepted.
        success: bool,
        /// Failure reason, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Matchmaking failed and the match fell back to the lobby.
    MatchAborted {
        /// When the match was aborted.
        timestamp: DateTime<Utc>,
        /// Match epoch.
        epoch: u64,
        /// Why.
        reason: String,
    },

    /// The match was reset to the lobby.
    MatchReset {
        /// When the reset happened.
        timestamp: DateTime<Utc>,
        /// Epoch of the match that was discarded.
        epoch: u64,
        /// State the match was in.
        from_state: MatchState,
    },
}

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization and I/O failures are dropped; the event stream never
/// interrupts a match.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to `writer`.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Discards every event.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Writes to a newly created file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits `event` as one JSON line.
    pub fn emit(&self, event: Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope { sequence, event };

        if let Ok(mut w) = self.writer.lock()
            && let Ok(line) = serde_json::to_string(&envelope)
        {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
