/// Ad SDK display session and presenter strategy.
///
/// Callback-style SDK bindings are adapted to the core through a small state
/// machine: whichever settling event arrives first is authoritative and every
/// later callback is ignored. The machine also owns the two timing ceilings
/// the bindings share: a probe window while waiting for the SDK to become
/// callable, and a settle window once the ad is showing.

/// How long to keep probing for an SDK binding before declaring a skip.
pub const SDK_WAIT_MAX_MS: u64 = 2_000;
/// Placement-style calls default to a skip if nothing settles within this.
pub const PLACEMENT_SETTLE_TIMEOUT_MS: u64 = 8_000;

/// Terminal outcome of one display attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdOutcome {
    /// View completed; token present when the SDK issues one.
    Viewed { token: Option<String> },
    /// User closed or skipped the ad, or no SDK was available.
    Dismissed,
    /// The SDK reported or threw an error.
    Error(String),
}

/// Events a binding can deliver. `BreakDone` is the placement API's terminal
/// callback and counts as a dismissal when nothing else settled first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkEvent {
    Viewed { token: Option<String> },
    Dismissed,
    BreakDone,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkPhase {
    WaitingForSdk,
    Showing,
    Settled,
}

/// Exactly-once display session.
#[derive(Debug, Clone)]
pub struct SdkSession {
    phase: SdkPhase,
    started_at_ms: u64,
    show_deadline_ms: Option<u64>,
    outcome: Option<AdOutcome>,
}

impl SdkSession {
    pub fn begin(now_ms: u64) -> Self {
        Self {
            phase: SdkPhase::WaitingForSdk,
            started_at_ms: now_ms,
            show_deadline_ms: None,
            outcome: None,
        }
    }

    pub fn phase(&self) -> SdkPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<&AdOutcome> {
        self.outcome.as_ref()
    }

    /// The binding reports the SDK became callable; arms the settle timer.
    pub fn sdk_ready(&mut self, now_ms: u64) {
        if self.phase == SdkPhase::WaitingForSdk {
            self.phase = SdkPhase::Showing;
            self.show_deadline_ms = Some(now_ms + PLACEMENT_SETTLE_TIMEOUT_MS);
        }
    }

    /// Delivers a callback event. The first settling event wins.
    pub fn handle(&mut self, event: SdkEvent) -> Option<&AdOutcome> {
        let outcome = match event {
            SdkEvent::Viewed { token } => AdOutcome::Viewed { token },
            SdkEvent::Dismissed | SdkEvent::BreakDone => AdOutcome::Dismissed,
            SdkEvent::Error(detail) => AdOutcome::Error(detail),
        };
        self.settle(outcome);
        self.outcome.as_ref()
    }

    /// Time-based tick: enforces the probe ceiling while waiting for an SDK
    /// and the settle ceiling while showing, both defaulting to a skip.
    pub fn poll(&mut self, now_ms: u64) -> Option<&AdOutcome> {
        match self.phase {
            SdkPhase::WaitingForSdk
                if now_ms.saturating_sub(self.started_at_ms) >= SDK_WAIT_MAX_MS =>
            {
                self.settle(AdOutcome::Dismissed);
            }
            SdkPhase::Showing => {
                if matches!(self.show_deadline_ms, Some(deadline) if now_ms >= deadline) {
                    self.settle(AdOutcome::Dismissed);
                }
            }
            _ => {}
        }
        self.outcome.as_ref()
    }

    fn settle(&mut self, outcome: AdOutcome) {
        if self.phase == SdkPhase::Settled {
            return;
        }
        self.phase = SdkPhase::Settled;
        self.outcome = Some(outcome);
    }
}

/// Strategy interface over the pluggable SDK bindings. The adapter creates
/// the session when its display phase starts and calls `display` on every
/// poll until an outcome is produced.
pub trait AdPresenter {
    fn display(&mut self, session: &mut SdkSession, now_ms: u64) -> Option<AdOutcome>;
}

/// Presenter used when no SDK binding is installed: waits out the probe
/// window, then reports the ad as skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSdkPresenter;

impl AdPresenter for UnavailableSdkPresenter {
    fn display(&mut self, session: &mut SdkSession, now_ms: u64) -> Option<AdOutcome> {
        session.poll(now_ms).cloned()
    }
}
