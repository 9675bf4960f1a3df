//! Pure read models over Reviews, SRSState and Words.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::scheduler::{self, QueueOptions};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Today {
    pub total_cards: u64,
    pub due_today: u64,
    pub new_cards: u64,
    pub rolling_reviews: u64,
    pub reviewed_today: u64,
    pub study_queue_size: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub date: NaiveDate,
    pub reviews: u64,
    pub average_grade: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub days: Vec<DayBucket>,
    pub total_reviews: u64,
    pub active_days: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueForecastDay {
    pub date: NaiveDate,
    pub due_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueForecast {
    pub days: Vec<DueForecastDay>,
}

/// Computed by running the Scheduler in dry-run mode so these numbers
/// match what the learner would actually see in the queue.
pub fn today(store: &Store, now: DateTime<Utc>) -> Result<Today, StoreError> {
    let wordbook_id = store.get_active_wordbook()?.map(|w| w.id);
    let total_cards = match &wordbook_id {
        Some(id) => store.list_cards_by_wordbook(id)?.len() as u64,
        None => 0,
    };

    let options = QueueOptions {
        wordbook_id,
        now,
        ..Default::default()
    };
    let (_, queue_stats) = scheduler::next_queue(store, &options)?;

    Ok(Today {
        total_cards,
        due_today: queue_stats.due_count,
        new_cards: queue_stats.new_count,
        rolling_reviews: queue_stats.rolling_count,
        reviewed_today: queue_stats.reviewed_today,
        study_queue_size: queue_stats.study_queue_size,
    })
}

/// Per-day buckets of `(date, reviews, average_grade)` over the trailing
/// `days` window. `average_grade` over zero reviews reports `0`, not an
/// error.
pub fn progress(store: &Store, now: DateTime<Utc>, days: u32) -> Result<Progress, StoreError> {
    let today = now.date_naive();
    let start = today - chrono::Duration::days(days as i64 - 1);

    let mut buckets: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    let mut d = start;
    while d <= today {
        buckets.insert(d, (0, 0));
        d += chrono::Duration::days(1);
    }

    for review in store.list_all_reviews()? {
        let date = review.ts.date_naive();
        if let Some(entry) = buckets.get_mut(&date) {
            entry.0 += 1;
            entry.1 += review.grade as u64;
        }
    }

    let mut total_reviews = 0u64;
    let mut active_days = 0u64;
    let day_buckets = buckets
        .into_iter()
        .map(|(date, (count, grade_sum))| {
            total_reviews += count;
            if count > 0 {
                active_days += 1;
            }
            let average_grade = if count > 0 {
                grade_sum as f64 / count as f64
            } else {
                0.0
            };
            DayBucket {
                date,
                reviews: count,
                average_grade,
            }
        })
        .collect();

    Ok(Progress {
        days: day_buckets,
        total_reviews,
        active_days,
    })
}

/// Per-day count of cards whose current `due` falls in each future day.
pub fn due_forecast(store: &Store, now: DateTime<Utc>, days: u32) -> Result<DueForecast, StoreError> {
    let today = now.date_naive();
    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut d = today;
    while d <= today + chrono::Duration::days(days as i64 - 1) {
        counts.insert(d, 0);
        d += chrono::Duration::days(1);
    }

    let Some(wordbook) = store.get_active_wordbook()? else {
        return Ok(DueForecast {
            days: counts
                .into_iter()
                .map(|(date, due_count)| DueForecastDay { date, due_count })
                .collect(),
        });
    };

    for card in store.list_cards_by_wordbook(&wordbook.id)? {
        if let Some(state) = store.get_srs_state(&card.id)? {
            let due_date = state.due.date_naive();
            if let Some(count) = counts.get_mut(&due_date) {
                *count += 1;
            }
        }
    }

    Ok(DueForecast {
        days: counts
            .into_iter()
            .map(|(date, due_count)| DueForecastDay { date, due_count })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn progress_reports_zero_average_for_days_without_reviews() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let result = progress(&store, Utc::now(), 7).unwrap();
        assert_eq!(result.days.len(), 7);
        assert!(result.days.iter().all(|d| d.average_grade == 0.0));
        assert_eq!(result.active_days, 0);
    }

    #[test]
    fn due_forecast_spans_requested_days_with_no_active_wordbook() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let forecast = due_forecast(&store, Utc::now(), 7).unwrap();
        assert_eq!(forecast.days.len(), 7);
    }
}
