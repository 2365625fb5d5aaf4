use std::time::Duration;

use tokio::{
    sync::mpsc::WeakUnboundedSender,
    task::JoinHandle,
    time::{sleep_until, Instant},
};

use crate::actor::Command;

/// The ticker task of a running autoplay. Dropping it does not stop the task;
/// call [`Autoplay::cancel`].
pub(crate) struct Autoplay {
    pub(crate) generation: u64,
    ticker: JoinHandle<()>,
}

impl Autoplay {
    pub(crate) fn start(
        period: Duration,
        generation: u64,
        commands: WeakUnboundedSender<Command>,
    ) -> Self {
        let ticker = tokio::spawn(async move {
            let mut deadline = Instant::now() + period;
            loop {
                sleep_until(deadline).await;
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                if commands.send(Command::AutoplayTick(generation)).is_err() {
                    break;
                }
                deadline = next_deadline(deadline, period, Instant::now());
            }
        });
        Self { generation, ticker }
    }

    pub(crate) fn cancel(self) {
        self.ticker.abort();
    }
}

/// Next fire time on the fixed grid `start + k * period`, skipping any slots
/// already in the past. `period` must be non-zero.
pub(crate) fn next_deadline(previous: Instant, period: Duration, now: Instant) -> Instant {
    let mut next = previous + period;
    if next <= now {
        let behind = now.duration_since(next).as_nanos();
        let missed = behind / period.as_nanos() + 1;
        let missed = u32::try_from(missed).unwrap_or(u32::MAX);
        next += period.saturating_mul(missed);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_time_tick_advances_one_period() {
        let start = Instant::now();
        let period = Duration::from_millis(500);
        let next = next_deadline(start, period, start + Duration::from_millis(3));
        assert_eq!(next, start + period);
    }

    #[test]
    fn late_tick_does_not_accumulate_drift() {
        let start = Instant::now();
        let period = Duration::from_millis(500);
        // Woke 120ms late; the grid stays anchored on `start`.
        let next = next_deadline(start, period, start + Duration::from_millis(120));
        assert_eq!(next, start + period);
    }

    #[test]
    fn missed_slots_are_skipped_not_replayed() {
        let start = Instant::now();
        let period = Duration::from_millis(500);
        let next = next_deadline(start, period, start + Duration::from_millis(1_600));
        assert_eq!(next, start + Duration::from_millis(2_000));

        let exact = next_deadline(start, period, start + Duration::from_millis(1_500));
        assert_eq!(exact, start + Duration::from_millis(2_000));
    }
}
