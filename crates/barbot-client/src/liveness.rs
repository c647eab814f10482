// crates/barbot-client/src/liveness.rs
// ============================================================================
// Module: Liveness Monitor
// Description: Online/busy state machine driven by status heartbeats.
// Purpose: Turn an intermittent heartbeat stream into stable display state.
// Dependencies: barbot-core, tokio
// ============================================================================

//! ## Overview
//! [`LivenessMonitor`] keeps two independent facets, `online` and `busy`,
//! each with its own single-slot watchdog timer.
//!
//! - Online: a heartbeat aged `age` ms sets online iff `age < window`, and
//!   arms a timer that flips online to false after `window - age` ms.
//! - Busy: `remainingJobTime > 0` sets busy and arms a timer that flips busy
//!   to false after `remainingJobTime * 1000` ms. Zero or less clears busy
//!   immediately.
//!
//! Arming a timer always cancels the one it replaces. Every timer carries the
//! generation it was armed with and only fires if that generation is still
//! current, so a timer that was already waking up when it was replaced
//! cannot flip state. The busy delay does not subtract the heartbeat's age;
//! the online delay does.
//!
//! Only the most recently processed heartbeat matters. Out-of-order delivery
//! is not detected: a stale heartbeat processed last rearms both timers with
//! its own data.
//!
//! # Invariants
//! - At most one online timer and one busy timer are pending.
//! - Timers are aborted on [`LivenessMonitor::shutdown`] and when the last
//!   handle is dropped.
//! - Malformed heartbeats never touch state or pending timers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::Weak;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use barbot_core::StatusMessage;
use barbot_core::StatusParseError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::log::ClientEvent;
use crate::log::ClientLog;
use crate::log::NoopClientLog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default online window in milliseconds.
pub const ONLINE_WINDOW_MS: u64 = 4_000;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the local wall-clock time heartbeats are aged against.
pub trait Clock: Send + Sync {
    /// Returns the current time in epoch milliseconds.
    fn now_ms(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Clock that advances with the tokio timer, anchored at a fixed epoch value.
///
/// Under a paused test runtime it moves only when tokio time is advanced.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    /// Epoch milliseconds at `anchor`.
    origin_ms: i64,
    /// Tokio instant matching `origin_ms`.
    anchor: Instant,
}

impl TokioClock {
    /// Creates a clock reading `origin_ms` now.
    #[must_use]
    pub fn starting_at(origin_ms: i64) -> Self {
        Self {
            origin_ms,
            anchor: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin_ms.saturating_add(elapsed)
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Derived display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LivenessState {
    /// A recent heartbeat was seen.
    pub online: bool,
    /// The last heartbeat reported a job still running.
    pub busy: bool,
}

/// Combined phase shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessPhase {
    /// No recent heartbeat.
    Offline,
    /// Reachable and idle.
    OnlineIdle,
    /// Reachable and mixing.
    OnlineBusy,
}

impl LivenessPhase {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::OnlineIdle => "online_idle",
            Self::OnlineBusy => "online_busy",
        }
    }
}

impl LivenessState {
    /// Returns the combined phase; offline wins over a remembered busy flag.
    #[must_use]
    pub const fn phase(self) -> LivenessPhase {
        match (self.online, self.busy) {
            (false, _) => LivenessPhase::Offline,
            (true, false) => LivenessPhase::OnlineIdle,
            (true, true) => LivenessPhase::OnlineBusy,
        }
    }
}

// ============================================================================
// SECTION: Watchdogs
// ============================================================================

/// Which facet a watchdog guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Facet {
    /// Online/offline.
    Online,
    /// Busy/idle.
    Busy,
}

/// Single-slot timer handle.
#[derive(Debug, Default)]
struct Watchdog {
    /// Incremented on every arm and cancel.
    generation: u64,
    /// Pending timer task.
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Cancels the pending timer and returns the new generation.
    fn cancel(&mut self) -> u64 {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

/// Both watchdogs.
#[derive(Debug, Default)]
struct Watchdogs {
    /// Online timeout.
    online: Watchdog,
    /// Busy timeout.
    busy: Watchdog,
}

impl Watchdogs {
    /// Returns the watchdog for `facet`.
    const fn slot(&mut self, facet: Facet) -> &mut Watchdog {
        match facet {
            Facet::Online => &mut self.online,
            Facet::Busy => &mut self.busy,
        }
    }
}

// ============================================================================
// SECTION: Monitor
// ============================================================================

/// Shared monitor internals.
struct Inner {
    /// Local clock.
    clock: Arc<dyn Clock>,
    /// Online window.
    window_ms: u64,
    /// Published state.
    state: watch::Sender<LivenessState>,
    /// Pending timers.
    watchdogs: Mutex<Watchdogs>,
    /// Event sink for discarded heartbeats.
    log: Arc<dyn ClientLog>,
}

impl Inner {
    /// Locks the watchdogs, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, Watchdogs> {
        self.watchdogs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Sets one facet and notifies watchers when it changed.
    fn set(&self, facet: Facet, value: bool) {
        self.state.send_if_modified(|state| {
            let field = match facet {
                Facet::Online => &mut state.online,
                Facet::Busy => &mut state.busy,
            };
            let changed = *field != value;
            *field = value;
            changed
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let watchdogs =
            self.watchdogs.get_mut().unwrap_or_else(std::sync::PoisonError::into_inner);
        watchdogs.online.cancel();
        watchdogs.busy.cancel();
    }
}

/// Online/busy state machine fed by status heartbeats.
///
/// Cloning yields another handle to the same machine. Timers are spawned on
/// the current tokio runtime, so heartbeats must be applied from within one.
#[derive(Clone)]
pub struct LivenessMonitor {
    /// Shared internals.
    inner: Arc<Inner>,
}

impl LivenessMonitor {
    /// Creates a monitor with the system clock and default window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), ONLINE_WINDOW_MS, Arc::new(NoopClientLog))
    }

    /// Creates a monitor with an explicit clock, window, and event sink.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, window_ms: u64, log: Arc<dyn ClientLog>) -> Self {
        let (state, _) = watch::channel(LivenessState::default());
        Self {
            inner: Arc::new(Inner {
                clock,
                window_ms,
                state,
                watchdogs: Mutex::new(Watchdogs::default()),
                log,
            }),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> LivenessState {
        *self.inner.state.borrow()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<LivenessState> {
        self.inner.state.subscribe()
    }

    /// Returns the online window in milliseconds.
    #[must_use]
    pub fn window_ms(&self) -> u64 {
        self.inner.window_ms
    }

    /// Parses and applies a heartbeat in its JSON text form.
    ///
    /// # Errors
    ///
    /// Returns [`StatusParseError`] for malformed text; the message is logged
    /// and discarded and pending timers keep their schedule.
    pub fn handle_text(&self, text: &str) -> Result<LivenessState, StatusParseError> {
        match StatusMessage::parse(text) {
            Ok(status) => Ok(self.apply(status)),
            Err(err) => {
                self.inner.log.record(&ClientEvent::malformed_status(err.to_string()));
                Err(err)
            }
        }
    }

    /// Applies a parsed heartbeat and returns the resulting state.
    pub fn apply(&self, status: StatusMessage) -> LivenessState {
        let now_ms = self.inner.clock.now_ms();
        let age_ms = status.age_ms(now_ms);
        let window_ms = i64::try_from(self.inner.window_ms).unwrap_or(i64::MAX);

        let mut watchdogs = self.inner.lock();

        if age_ms < window_ms {
            self.inner.set(Facet::Online, true);
            let remaining = u64::try_from(window_ms.saturating_sub(age_ms)).unwrap_or(u64::MAX);
            self.arm(&mut watchdogs, Facet::Online, Duration::from_millis(remaining));
        } else {
            watchdogs.online.cancel();
            self.inner.set(Facet::Online, false);
        }

        if status.is_busy() {
            self.inner.set(Facet::Busy, true);
            let delay = Duration::try_from_secs_f64(status.remaining_job_time)
                .unwrap_or(Duration::MAX);
            self.arm(&mut watchdogs, Facet::Busy, delay);
        } else {
            watchdogs.busy.cancel();
            self.inner.set(Facet::Busy, false);
        }

        drop(watchdogs);
        self.state()
    }

    /// Cancels both timers; state keeps its current value.
    pub fn shutdown(&self) {
        let mut watchdogs = self.inner.lock();
        watchdogs.online.cancel();
        watchdogs.busy.cancel();
    }

    /// Replaces the timer for `facet` with one firing after `delay`.
    fn arm(&self, watchdogs: &mut Watchdogs, facet: Facet, delay: Duration) {
        let slot = watchdogs.slot(facet);
        let generation = slot.cancel();
        let deadline = Instant::now().checked_add(delay);
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        slot.handle = Some(tokio::spawn(async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut watchdogs = inner.lock();
            let slot = watchdogs.slot(facet);
            if slot.generation != generation {
                return;
            }
            slot.handle = None;
            inner.set(facet, false);
            drop(watchdogs);
        }));
    }
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LivenessMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessMonitor")
            .field("window_ms", &self.inner.window_ms)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
