//! SM-2 variant grade table. Pure functions over `SrsState` plus the
//! `Review` row they produce; no I/O in here, same shape as `amas::elo`.

use chrono::{DateTime, Utc};

use crate::constants::{DEFAULT_EASE, MAX_EASE, MIN_EASE};
use crate::store::operations::srs::{Review, SrsState};

/// `0 = again (forgot)`, `1 = hard`, `2 = good`, `3 = easy`.
pub type Grade = u8;

/// Applies a grade to `state` in place and returns the `Review` row to be
/// appended in the same transaction as the state write.
pub fn apply(state: &mut SrsState, grade: Grade, elapsed_ms: Option<u64>, now: DateTime<Utc>) -> Review {
    let prev_interval = state.interval;
    let ease = state.ease;
    let reps = state.reps;

    let (new_reps, new_interval, new_ease, new_lapses) = match grade {
        0 => (0, 1, (ease - 0.20).max(MIN_EASE), state.lapses + 1),
        1 => {
            let interval = match reps {
                0 => 1,
                1 => 3,
                _ => ceil_days(prev_interval as f64 * (ease - 0.15).max(1.2)),
            };
            (reps + 1, interval, (ease - 0.15).max(MIN_EASE), state.lapses)
        }
        2 => {
            let interval = match reps {
                0 => 1,
                1 => 3,
                _ => ceil_days(prev_interval as f64 * ease),
            };
            (reps + 1, interval, ease, state.lapses)
        }
        _ => {
            let interval = match reps {
                0 => 2,
                1 => 5,
                _ => ceil_days(prev_interval as f64 * ease * 1.3),
            };
            (reps + 1, interval, (ease + 0.10).min(MAX_EASE), state.lapses)
        }
    };

    state.reps = new_reps;
    state.interval = new_interval;
    state.ease = new_ease;
    state.lapses = new_lapses;
    state.due = now + chrono::Duration::days(new_interval as i64);
    state.last_grade = Some(grade);
    state.last_reviewed_at = Some(now);

    Review {
        id: uuid::Uuid::new_v4().to_string(),
        card_id: state.card_id.clone(),
        ts: now,
        grade,
        elapsed_ms,
        prev_interval,
        new_interval,
    }
}

fn ceil_days(value: f64) -> u32 {
    value.ceil().max(0.0) as u32
}

/// `lapses ≥ 8` marks a card a leech on its Word.
pub fn is_leech(state: &SrsState) -> bool {
    state.lapses >= crate::constants::LEECH_LAPSES_THRESHOLD
}

pub fn default_ease() -> f64 {
    DEFAULT_EASE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_state() -> SrsState {
        SrsState::new_for_card("c1", Utc::now())
    }

    #[test]
    fn again_resets_reps_and_lowers_ease() {
        let mut state = fresh_state();
        state.reps = 3;
        state.ease = 2.5;
        let now = Utc::now();
        apply(&mut state, 0, None, now);

        assert_eq!(state.reps, 0);
        assert_eq!(state.interval, 1);
        assert!((state.ease - 2.3).abs() < 1e-9);
        assert_eq!(state.lapses, 1);
    }

    #[test]
    fn good_on_new_card_sets_interval_one_day() {
        let mut state = fresh_state();
        let now = Utc::now();
        apply(&mut state, 2, None, now);
        assert_eq!(state.reps, 1);
        assert_eq!(state.interval, 1);
        assert_eq!(state.due, now + chrono::Duration::days(1));
    }

    #[test]
    fn easy_grows_interval_using_ease_times_1_3_after_second_rep() {
        let mut state = fresh_state();
        state.reps = 2;
        state.interval = 10;
        state.ease = 2.5;
        apply(&mut state, 3, None, Utc::now());
        // ceil(10 * 2.5 * 1.3) = ceil(32.5) = 33
        assert_eq!(state.interval, 33);
        assert!((state.ease - 2.6).abs() < 1e-9);
    }

    #[test]
    fn ease_never_drops_below_minimum() {
        let mut state = fresh_state();
        state.ease = MIN_EASE;
        apply(&mut state, 0, None, Utc::now());
        assert_eq!(state.ease, MIN_EASE);
    }

    #[test]
    fn leech_threshold_is_eight_lapses() {
        let mut state = fresh_state();
        state.lapses = 7;
        assert!(!is_leech(&state));
        state.lapses = 8;
        assert!(is_leech(&state));
    }
}
