use std::time::{Duration, Instant};

/// Health endpoint exposed by the Spring Boot backend.
pub(crate) const HEALTH_PATH: &str = "/actuator/health";

/// Delay between two consecutive health probes.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-attempt request timeout. Short, so a black-holed connection cannot
/// eat a large slice of the overall budget.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// The readiness sentinel in the health payload's `status` field.
const READY_STATUS: &str = "UP";

// ---------------------------------------------------------------------------
// Poll state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollState {
    Polling,
    Succeeded,
    TimedOut,
}

impl PollState {
    pub(crate) fn is_terminal(self) -> bool {
        !matches!(self, PollState::Polling)
    }
}

/// One poll sequence. The deadline is held centrally here, never extended
/// by individual attempts, and terminal states absorb further ticks.
pub(crate) struct HealthPoll {
    state: PollState,
    deadline: Instant,
}

impl HealthPoll {
    pub(crate) fn new(deadline: Instant) -> Self {
        Self {
            state: PollState::Polling,
            deadline,
        }
    }

    /// Advance the machine by one observed attempt. A ready observation wins
    /// even on the tick that crosses the deadline.
    pub(crate) fn on_tick(&mut self, ready: bool, now: Instant) -> PollState {
        if self.state == PollState::Polling {
            if ready {
                self.state = PollState::Succeeded;
            } else if now >= self.deadline {
                self.state = PollState::TimedOut;
            }
        }
        self.state
    }

    /// Force the timed-out state; used when the wall-clock budget expires
    /// while an attempt is still in flight.
    pub(crate) fn expire(&mut self) {
        if self.state == PollState::Polling {
            self.state = PollState::TimedOut;
        }
    }

    pub(crate) fn state(&self) -> PollState {
        self.state
    }
}

// ---------------------------------------------------------------------------
// Polling driver
// ---------------------------------------------------------------------------

/// One probe: healthy only on a 2xx response whose JSON body carries
/// `"status": "UP"`. Connection errors, other statuses, and unparseable
/// bodies all mean "not yet", never a hard failure.
async fn attempt(client: &reqwest::Client, url: &str) -> bool {
    let resp = match client.get(url).send().await {
        Ok(r) => r,
        Err(_) => return false,
    };
    if !resp.status().is_success() {
        return false;
    }
    match resp.json::<serde_json::Value>().await {
        Ok(body) => body.get("status").and_then(|s| s.as_str()) == Some(READY_STATUS),
        Err(_) => false,
    }
}

/// Poll `{base_url}/actuator/health` every [`POLL_INTERVAL`] until the
/// backend reports ready or `timeout` of wall-clock time has elapsed.
/// Returns `true` on the first healthy observation. The outer timeout
/// abandons any in-flight attempt at the deadline, so the caller is never
/// blocked past `timeout` plus scheduling slack. Every call starts a fresh
/// sequence; nothing is cached.
pub(crate) async fn wait_until_healthy(base_url: &str, timeout: Duration) -> bool {
    let url = format!("{}{}", base_url.trim_end_matches('/'), HEALTH_PATH);
    let client = match reqwest::Client::builder().timeout(ATTEMPT_TIMEOUT).build() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[Health] Failed to build HTTP client: {e}");
            return false;
        }
    };

    let mut poll = HealthPoll::new(Instant::now() + timeout);
    let outcome = tokio::time::timeout(timeout, async {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let ready = attempt(&client, &url).await;
            if poll.on_tick(ready, Instant::now()).is_terminal() {
                break;
            }
        }
    })
    .await;

    if outcome.is_err() {
        poll.expire();
    }

    match poll.state() {
        PollState::Succeeded => {
            eprintln!("[Health] Backend ready at {url}");
            true
        }
        _ => {
            eprintln!(
                "[Health] Backend not ready at {url} after {}s",
                timeout.as_secs()
            );
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
