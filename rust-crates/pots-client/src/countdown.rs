use crate::types::GameState;
use chrono::Utc;
use std::time::Duration;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time,
};

pub const TIME_UP: &str = "Time's up!";
pub const TICK_PERIOD: Duration = Duration::from_millis(1000);

const MS_PER_SECOND: i128 = 1000;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const SECONDS_PER_HOUR: u64 = 60 * 60;
const SECONDS_PER_MINUTE: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    PendingStart,
    Active,
    Ended,
}

impl RoundPhase {
    pub fn at(state: &GameState, now_ms: i64) -> Self {
        let now = i128::from(now_ms);
        if now < start_ms(state) {
            RoundPhase::PendingStart
        } else if now < end_ms(state) {
            RoundPhase::Active
        } else {
            RoundPhase::Ended
        }
    }
}

/// Time left in the current phase, derived from the last fetched round timing and the local
/// clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    pub phase: RoundPhase,
    pub seconds_left: u64,
}

impl Countdown {
    pub fn derive(state: &GameState, now_ms: i64) -> Self {
        let now = i128::from(now_ms);
        let phase = RoundPhase::at(state, now_ms);
        let remaining_ms = match phase {
            RoundPhase::PendingStart => start_ms(state) - now,
            RoundPhase::Active => end_ms(state) - now,
            RoundPhase::Ended => 0,
        };
        let seconds_left = u64::try_from(remaining_ms / MS_PER_SECOND).unwrap_or(u64::MAX);
        Self {
            phase,
            seconds_left,
        }
    }

    pub fn is_counting_down_to_start(&self) -> bool {
        self.phase == RoundPhase::PendingStart
    }

    pub fn human(&self) -> String {
        format_time_left(self.seconds_left)
    }
}

/// `"{d}d {h}h {m}m {s}s"`, or [`TIME_UP`] once nothing is left.
pub fn format_time_left(seconds: u64) -> String {
    if seconds == 0 {
        return TIME_UP.to_string();
    }
    let days = seconds / SECONDS_PER_DAY;
    let hours = (seconds / SECONDS_PER_HOUR) % 24;
    let minutes = (seconds / SECONDS_PER_MINUTE) % 60;
    let secs = seconds % 60;
    format!("{days}d {hours}h {minutes}m {secs}s")
}

/// True when the round was still running at `prev_ms` and is over at `now_ms`.
pub fn round_ended(state: &GameState, prev_ms: i64, now_ms: i64) -> bool {
    RoundPhase::at(state, prev_ms) != RoundPhase::Ended
        && RoundPhase::at(state, now_ms) == RoundPhase::Ended
}

fn start_ms(state: &GameState) -> i128 {
    i128::from(state.start_time) * MS_PER_SECOND
}

fn end_ms(state: &GameState) -> i128 {
    i128::from(state.end_time) * MS_PER_SECOND
}

pub fn wall_clock_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Local "current time" in epoch milliseconds, advanced by a background tick. The tick task
/// only updates the published value; it never does I/O.
pub struct Clock {
    now: watch::Receiver<i64>,
    handle: Option<JoinHandle<()>>,
}

impl Clock {
    /// Start ticking every [`TICK_PERIOD`] from the wall clock.
    pub fn start() -> Self {
        Self::start_with(TICK_PERIOD, wall_clock_ms)
    }

    pub fn start_with<F>(period: Duration, source: F) -> Self
    where
        F: Fn() -> i64 + Send + 'static,
    {
        let (tx, now) = watch::channel(source());
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            // the first tick completes immediately and the initial value is already published
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(source()).is_err() {
                    break;
                }
            }
        });
        Self {
            now,
            handle: Some(handle),
        }
    }

    pub fn now_ms(&self) -> i64 {
        *self.now.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.now.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;
    use std::sync::{
        Arc,
        atomic::{
            AtomicI64,
            Ordering,
        },
    };

    fn state(start_time: u64, end_time: u64) -> GameState {
        GameState {
            round_count: 1,
            extend_count: 0,
            start_time,
            end_time,
        }
    }

    #[test]
    fn derive__before_start__counts_down_to_start() {
        // given
        let game = state(1_000, 2_000);
        let now_ms = 990_500;

        // when
        let countdown = Countdown::derive(&game, now_ms);

        // then
        assert!(countdown.is_counting_down_to_start());
        assert_eq!(countdown.seconds_left, 9);
    }

    #[test]
    fn derive__during_round__counts_down_to_end() {
        let countdown = Countdown::derive(&state(1_000, 2_000), 1_000_000);
        assert_eq!(countdown.phase, RoundPhase::Active);
        assert_eq!(countdown.seconds_left, 1_000);
    }

    #[test]
    fn derive__after_end__times_up() {
        let countdown = Countdown::derive(&state(1_000, 2_000), 2_000_000);
        assert_eq!(countdown.phase, RoundPhase::Ended);
        assert_eq!(countdown.seconds_left, 0);
        assert_eq!(countdown.human(), TIME_UP);
    }

    #[test]
    fn format_time_left__one_of_each_unit() {
        assert_eq!(format_time_left(90_061), "1d 1h 1m 1s");
    }

    #[test]
    fn format_time_left__sub_minute() {
        assert_eq!(format_time_left(59), "0d 0h 0m 59s");
    }

    #[test]
    fn round_ended__crossing_end__detected_once() {
        let game = state(1_000, 2_000);
        assert!(round_ended(&game, 1_999_000, 2_000_000));
        assert!(!round_ended(&game, 2_000_000, 2_001_000));
        assert!(!round_ended(&game, 1_500_000, 1_501_000));
    }

    proptest! {
        #[test]
        fn derive__pending_start__remaining_is_floor_to_start(
            start in 1u64..4_000_000_000,
            len in 1u64..1_000_000,
            before_ms in 1i64..10_000_000,
        ) {
            let game = state(start, start + len);
            let start_ms = start as i64 * 1000;
            let now = start_ms - before_ms;
            let countdown = Countdown::derive(&game, now);
            prop_assert_eq!(countdown.phase, RoundPhase::PendingStart);
            prop_assert_eq!(countdown.seconds_left as i64, (start_ms - now) / 1000);
        }

        #[test]
        fn derive__active__remaining_is_floor_to_end(
            start in 0u64..4_000_000_000,
            len in 1u64..1_000_000,
            offset in 0u64..1_000_000_000,
        ) {
            let game = state(start, start + len);
            let start_ms = start as i64 * 1000;
            let end_ms = (start + len) as i64 * 1000;
            let now = start_ms + (offset % (len * 1000)) as i64;
            let countdown = Countdown::derive(&game, now);
            prop_assert_eq!(countdown.phase, RoundPhase::Active);
            prop_assert_eq!(countdown.seconds_left as i64, (end_ms - now) / 1000);
        }

        #[test]
        fn derive__after_end__always_zero(
            start in 0u64..4_000_000_000,
            len in 0u64..1_000_000,
            after_ms in 0i64..10_000_000,
        ) {
            let game = state(start, start + len);
            let now = (start + len) as i64 * 1000 + after_ms;
            let countdown = Countdown::derive(&game, now);
            prop_assert_eq!(countdown.seconds_left, 0);
            prop_assert_eq!(countdown.human(), TIME_UP);
        }

        #[test]
        fn format_time_left__decomposition_recomposes(seconds in 1u64..100_000_000) {
            let text = format_time_left(seconds);
            let parts: Vec<u64> = text
                .split(' ')
                .map(|p| p[..p.len() - 1].parse().unwrap())
                .collect();
            prop_assert_eq!(parts.len(), 4);
            prop_assert!(parts[1] < 24 && parts[2] < 60 && parts[3] < 60);
            prop_assert_eq!(parts[0] * 86_400 + parts[1] * 3_600 + parts[2] * 60 + parts[3], seconds);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clock__ticks__publishes_source_values() {
        // given
        let counter = Arc::new(AtomicI64::new(0));
        let source = {
            let counter = counter.clone();
            move || counter.fetch_add(1, Ordering::SeqCst)
        };

        // when
        let clock = Clock::start_with(TICK_PERIOD, source);
        let mut rx = clock.subscribe();
        rx.changed().await.unwrap();
        let first = *rx.borrow_and_update();
        rx.changed().await.unwrap();
        let second = *rx.borrow_and_update();

        // then
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert!(clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn clock__stop__cancels_tick_task() {
        // given
        let mut clock = Clock::start_with(TICK_PERIOD, || 7);

        // when
        clock.stop();
        tokio::task::yield_now().await;

        // then
        assert!(!clock.is_running());
        assert_eq!(clock.now_ms(), 7);
    }
}
