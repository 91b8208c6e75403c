//! Egg-turning schedule.
//!
//! The scheduler is pull-based: it is evaluated on every status request and
//! the caller persists the returned state. There is no timer. Two callers
//! evaluating the same stored state concurrently both advance it from the
//! same boundary, so the last writer wins and the schedule drifts by at most
//! one slot.

use crate::config::{StepperPolicy, MAX_PULSE_MINUTES};
use crate::model::{Parameters, StepperState};
use crate::types::Switch;
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

/// Time of day at which a freshly armed schedule first fires.
pub const ARM_BOUNDARIES: [u32; 3] = [6, 12, 18];

/// On-window per stepper: one hour shared round-robin between `stepper_count`
/// units. `None` when the count is not positive.
pub fn slot_duration(stepper_count: i32) -> Option<Duration> {
    if stepper_count <= 0 {
        return None;
    }
    Some(Duration::hours(1) / stepper_count)
}

/// Schedule for a newly submitted parameter record: the first quarter-day
/// boundary at or after the current hour, wrapping to 06:00 after 18:xx.
pub fn arm(now: NaiveDateTime) -> StepperState {
    let hour = now.hour();
    let boundary = ARM_BOUNDARIES
        .iter()
        .copied()
        .find(|b| hour <= *b)
        .unwrap_or(ARM_BOUNDARIES[0]);
    StepperState {
        next_run_at: NaiveTime::from_hms_opt(boundary, 0, 0).unwrap_or(NaiveTime::MIN),
        is_on: false,
    }
}

/// Offset of `now` past `run_at`, wrapped into `[0, 24h)`.
fn since_boundary(now: NaiveTime, run_at: NaiveTime) -> Duration {
    let diff = now.signed_duration_since(run_at);
    if diff < Duration::zero() {
        diff + Duration::days(1)
    } else {
        diff
    }
}

impl StepperPolicy {
    /// State used when nothing has been stored yet.
    pub fn initial_state(&self) -> StepperState {
        StepperState {
            next_run_at: self.default_run_at,
            is_on: false,
        }
    }

    /// Pulse length, clamped to `[0, 60]` minutes.
    pub fn pulse(&self) -> Duration {
        Duration::minutes(self.pulse_minutes.clamp(0, MAX_PULSE_MINUTES))
    }

    /// Evaluate the schedule at `now`, returning the state to persist and the
    /// command for the stepper.
    pub fn evaluate(
        &self,
        state: &StepperState,
        parameters: &Parameters,
        now: NaiveDateTime,
    ) -> (StepperState, Switch) {
        let elapsed = parameters.elapsed_days(now.date());
        if elapsed >= i64::from(parameters.cycle_length_days) {
            tracing::debug!(
                elapsed,
                cycle_length_days = parameters.cycle_length_days,
                "cycle complete; stepper halted"
            );
            let halted = StepperState {
                is_on: false,
                ..*state
            };
            return (halted, Switch::Off);
        }

        if !parameters.stepper_enabled {
            tracing::debug!("stepper disabled in parameters");
            return (*state, Switch::Off);
        }

        let Some(slot) = slot_duration(parameters.stepper_count) else {
            tracing::debug!(
                stepper_count = parameters.stepper_count,
                "non-positive stepper count; stepper held off"
            );
            return (*state, Switch::Off);
        };

        let next_boundary = state.next_run_at + slot;
        let in_pulse = since_boundary(now.time(), state.next_run_at) <= self.pulse();
        let command = Switch::from_bool(in_pulse);

        tracing::debug!(
            run_at = %state.next_run_at,
            next_run_at = %next_boundary,
            now = %now.time(),
            command = %command,
            "stepper evaluation"
        );

        (
            StepperState {
                next_run_at: next_boundary,
                is_on: command.is_on(),
            },
            command,
        )
    }
}

/// [`StepperPolicy::evaluate`] with the stock two-minute pulse.
pub fn evaluate(
    state: &StepperState,
    parameters: &Parameters,
    now: NaiveDateTime,
) -> (StepperState, Switch) {
    StepperPolicy::default().evaluate(state, parameters, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Species;
    use chrono::NaiveDate;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn params(stepper_count: i32) -> Parameters {
        Parameters {
            target_temperature: 37.5,
            target_humidity: 45.0,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            stepper_enabled: true,
            stepper_count,
            species: Species::Poule,
            cycle_length_days: 21,
        }
    }

    fn state_at(h: u32, m: u32) -> StepperState {
        StepperState {
            next_run_at: time(h, m),
            is_on: false,
        }
    }

    #[test]
    fn pulse_length_is_clamped() {
        let mut policy = StepperPolicy::default();
        policy.pulse_minutes = i64::MAX;
        assert_eq!(policy.pulse(), Duration::minutes(60));
        policy.pulse_minutes = -5;
        assert_eq!(policy.pulse(), Duration::zero());

        policy.pulse_minutes = i64::MAX;
        let (_, cmd) = policy.evaluate(&state_at(6, 0), &params(3), at(5, 6, 59));
        assert_eq!(cmd, Switch::On);
    }

    #[test]
    fn on_inside_pulse_window() {
        let (next, cmd) = evaluate(&state_at(6, 0), &params(3), at(5, 6, 1));
        assert_eq!(cmd, Switch::On);
        assert!(next.is_on);
        assert_eq!(next.next_run_at, time(6, 20));
    }

    #[test]
    fn off_outside_pulse_window() {
        let (next, cmd) = evaluate(&state_at(6, 0), &params(3), at(5, 6, 5));
        assert_eq!(cmd, Switch::Off);
        assert!(!next.is_on);
        assert_eq!(next.next_run_at, time(6, 20));
    }

    #[test]
    fn pulse_window_is_inclusive() {
        let (_, cmd) = evaluate(&state_at(6, 0), &params(3), at(5, 6, 0));
        assert_eq!(cmd, Switch::On);
        let (_, cmd) = evaluate(&state_at(6, 0), &params(3), at(5, 6, 2));
        assert_eq!(cmd, Switch::On);
        let (_, cmd) = evaluate(&state_at(6, 0), &params(3), at(5, 5, 59));
        assert_eq!(cmd, Switch::Off);
    }

    #[test]
    fn same_inputs_same_outcome() {
        let state = state_at(6, 0);
        let p = params(3);
        let first = evaluate(&state, &p, at(5, 6, 1));
        let second = evaluate(&state, &p, at(5, 6, 1));
        assert_eq!(first, second);
    }

    #[test]
    fn slot_shrinks_with_stepper_count() {
        assert_eq!(slot_duration(1), Some(Duration::hours(1)));
        assert_eq!(slot_duration(2), Some(Duration::minutes(30)));
        assert_eq!(slot_duration(4), Some(Duration::minutes(15)));
        assert_eq!(slot_duration(0), None);
        assert_eq!(slot_duration(-2), None);
    }

    #[test]
    fn non_positive_count_holds_state() {
        let state = state_at(6, 0);
        let (next, cmd) = evaluate(&state, &params(0), at(5, 6, 1));
        assert_eq!(cmd, Switch::Off);
        assert_eq!(next, state);
    }

    #[test]
    fn disabled_stepper_holds_state() {
        let state = state_at(6, 0);
        let mut p = params(3);
        p.stepper_enabled = false;
        let (next, cmd) = evaluate(&state, &p, at(5, 6, 1));
        assert_eq!(cmd, Switch::Off);
        assert_eq!(next, state);
    }

    #[test]
    fn completed_cycle_halts() {
        let state = StepperState {
            next_run_at: time(6, 0),
            is_on: true,
        };
        // 2024-01-22 is 21 days after the start
        let (next, cmd) = evaluate(&state, &params(3), at(22, 6, 1));
        assert_eq!(cmd, Switch::Off);
        assert!(!next.is_on);
        assert_eq!(next.next_run_at, time(6, 0));
    }

    #[test]
    fn last_day_of_cycle_still_turns() {
        let (_, cmd) = evaluate(&state_at(6, 0), &params(3), at(21, 6, 1));
        assert_eq!(cmd, Switch::On);
    }

    #[test]
    fn boundary_wraps_past_midnight() {
        let (next, cmd) = evaluate(&state_at(23, 50), &params(3), at(5, 23, 51));
        assert_eq!(cmd, Switch::On);
        assert_eq!(next.next_run_at, time(0, 10));
    }

    #[test]
    fn pulse_window_spans_midnight() {
        let (_, cmd) = evaluate(&state_at(23, 59), &params(3), at(6, 0, 0));
        assert_eq!(cmd, Switch::On);
    }

    #[test]
    fn arm_picks_quarter_day_boundary() {
        assert_eq!(arm(at(5, 3, 15)).next_run_at, time(6, 0));
        assert_eq!(arm(at(5, 6, 45)).next_run_at, time(6, 0));
        assert_eq!(arm(at(5, 7, 0)).next_run_at, time(12, 0));
        assert_eq!(arm(at(5, 12, 30)).next_run_at, time(12, 0));
        assert_eq!(arm(at(5, 18, 59)).next_run_at, time(18, 0));
        assert_eq!(arm(at(5, 19, 0)).next_run_at, time(6, 0));
        assert!(!arm(at(5, 9, 0)).is_on);
    }

    #[test]
    fn initial_state_uses_policy_default() {
        let policy = StepperPolicy::default();
        assert_eq!(policy.initial_state().next_run_at, time(6, 0));
        assert!(!policy.initial_state().is_on);
    }
}
