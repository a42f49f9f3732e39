//! Progress that outlives a single session: personal best and daily streak.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Mode;
use crate::error::StoreError;
use crate::store::{
    parse_value, KeyValueStore, LAST_PRACTICE_KEY, PERSONAL_BEST_KEY, STREAK_KEY,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// highest finalized timed-mode wpm
    pub personal_best: u32,
    pub daily_streak: u32,
    pub last_practice_date: Option<NaiveDate>,
}

/// Parse a stored practice date. Plain `YYYY-MM-DD` is what we write, but a
/// full RFC 3339 timestamp is accepted too.
pub fn parse_practice_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Parse the stored streak count and last practice date.
pub fn parse_streak(raw_streak: &str, raw_date: &str) -> Result<(u32, NaiveDate), StoreError> {
    let streak = parse_value(STREAK_KEY, raw_streak)?;
    let last = parse_practice_date(raw_date)
        .ok_or_else(|| StoreError::corrupt(LAST_PRACTICE_KEY, raw_date))?;
    Ok((streak, last))
}

impl Progress {
    /// Read progress from `store`, dropping a streak whose last practice day is
    /// neither today nor yesterday. A dropped streak is also removed from the store.
    pub fn load<S: KeyValueStore + ?Sized>(
        store: &mut S,
        today: NaiveDate,
    ) -> Result<Self, StoreError> {
        let mut progress = Progress {
            personal_best: load_personal_best(store)?,
            ..Progress::default()
        };

        let streak_key = store.get(STREAK_KEY)?;
        let date_key = store.get(LAST_PRACTICE_KEY)?;
        let (Some(raw_streak), Some(raw_date)) = (streak_key, date_key) else {
            return Ok(progress);
        };

        match parse_streak(&raw_streak, &raw_date) {
            Ok((streak, last)) if last == today || Some(last) == today.pred_opt() => {
                progress.daily_streak = streak;
                progress.last_practice_date = Some(last);
            }
            other => {
                match other {
                    Ok(_) => info!(date = %raw_date, "streak broken"),
                    Err(e) => warn!(error = %e, "discarding corrupt streak"),
                }
                store.remove(STREAK_KEY)?;
                store.remove(LAST_PRACTICE_KEY)?;
            }
        }

        Ok(progress)
    }

    /// Count a finished session towards the streak.
    ///
    /// A different calendar day than the last recorded one increments the
    /// streak, without checking that the gap is a single day; the gap is only
    /// enforced by [`Progress::load`]. Returns whether anything changed.
    pub fn record_practice(&mut self, today: NaiveDate) -> bool {
        match self.last_practice_date {
            Some(last) if last == today => false,
            Some(_) => {
                self.daily_streak += 1;
                self.last_practice_date = Some(today);
                true
            }
            None => {
                self.daily_streak = 1;
                self.last_practice_date = Some(today);
                true
            }
        }
    }

    /// Returns true if `wpm` is a new timed-mode personal best, updating it.
    pub fn record_score(&mut self, wpm: u32, mode: Mode) -> bool {
        let is_new_best = wpm > self.personal_best && mode == Mode::Timed;
        if is_new_best {
            self.personal_best = wpm;
        }
        is_new_best
    }

    pub fn save_streak<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), StoreError> {
        store.set(STREAK_KEY, &self.daily_streak.to_string())?;
        if let Some(date) = self.last_practice_date {
            store.set(LAST_PRACTICE_KEY, &date.format("%Y-%m-%d").to_string())?;
        }
        Ok(())
    }

    pub fn save_personal_best<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<(), StoreError> {
        store.set(PERSONAL_BEST_KEY, &self.personal_best.to_string())
    }
}

fn load_personal_best<S: KeyValueStore + ?Sized>(store: &S) -> Result<u32, StoreError> {
    let Some(raw) = store.get(PERSONAL_BEST_KEY)? else {
        return Ok(0);
    };
    match parse_value(PERSONAL_BEST_KEY, &raw) {
        Ok(best) => Ok(best),
        Err(e) => {
            warn!(error = %e, "ignoring stored personal best");
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn parse_date_formats() {
        assert_eq!(parse_practice_date("2024-03-05"), Some(day(5)));
        assert_eq!(
            parse_practice_date("2024-03-05T10:11:12.000Z"),
            Some(day(5))
        );
        assert_eq!(parse_practice_date("yesterday"), None);
    }

    #[test]
    fn corrupt_streak_values_are_reported() {
        assert_eq!(parse_streak("4", "2024-03-05").unwrap(), (4, day(5)));
        assert_matches!(
            parse_streak("many", "2024-03-05"),
            Err(StoreError::Corrupt { key, .. }) if key == STREAK_KEY
        );
        assert_matches!(
            parse_streak("4", "last tuesday"),
            Err(StoreError::Corrupt { key, value })
                if key == LAST_PRACTICE_KEY && value == "last tuesday"
        );
    }

    #[test]
    fn load_discards_corrupt_streak_and_personal_best() {
        let mut store = MemoryStore::new();
        store.set(STREAK_KEY, "lots").unwrap();
        store.set(LAST_PRACTICE_KEY, "2024-03-05").unwrap();
        store.set(PERSONAL_BEST_KEY, "fast").unwrap();

        let progress = Progress::load(&mut store, day(5)).unwrap();
        assert_eq!(progress, Progress::default());
        assert!(store.get(STREAK_KEY).unwrap().is_none());
        assert!(store.get(LAST_PRACTICE_KEY).unwrap().is_none());
    }

    #[test]
    fn first_practice_starts_streak() {
        let mut progress = Progress::default();
        assert!(progress.record_practice(day(1)));
        assert_eq!(progress.daily_streak, 1);
        assert_eq!(progress.last_practice_date, Some(day(1)));
    }

    #[test]
    fn same_day_practice_does_not_increment() {
        let mut progress = Progress::default();
        progress.record_practice(day(1));
        assert!(!progress.record_practice(day(1)));
        assert_eq!(progress.daily_streak, 1);
    }

    #[test]
    fn increment_ignores_gap_length() {
        let mut progress = Progress {
            personal_best: 0,
            daily_streak: 4,
            last_practice_date: Some(day(1)),
        };
        assert!(progress.record_practice(day(9)));
        assert_eq!(progress.daily_streak, 5);
    }

    #[test]
    fn load_keeps_streak_from_yesterday() {
        let mut store = MemoryStore::new();
        store.set(STREAK_KEY, "3").unwrap();
        store.set(LAST_PRACTICE_KEY, "2024-03-04").unwrap();

        let progress = Progress::load(&mut store, day(5)).unwrap();
        assert_eq!(progress.daily_streak, 3);
        assert_eq!(progress.last_practice_date, Some(day(4)));
    }

    #[test]
    fn load_resets_stale_streak_and_clears_store() {
        let mut store = MemoryStore::new();
        store.set(STREAK_KEY, "7").unwrap();
        store.set(LAST_PRACTICE_KEY, "2024-03-01").unwrap();
        store.set(PERSONAL_BEST_KEY, "72").unwrap();

        let progress = Progress::load(&mut store, day(5)).unwrap();
        assert_eq!(progress.daily_streak, 0);
        assert_eq!(progress.last_practice_date, None);
        assert_eq!(progress.personal_best, 72);
        assert!(store.get(STREAK_KEY).unwrap().is_none());
        assert!(store.get(LAST_PRACTICE_KEY).unwrap().is_none());
    }

    #[test]
    fn load_requires_both_streak_values() {
        let mut store = MemoryStore::new();
        store.set(STREAK_KEY, "3").unwrap();

        let progress = Progress::load(&mut store, day(5)).unwrap();
        assert_eq!(progress.daily_streak, 0);
        assert_eq!(store.get(STREAK_KEY).unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn personal_best_only_counts_timed_mode() {
        let mut progress = Progress {
            personal_best: 60,
            ..Progress::default()
        };
        assert!(!progress.record_score(90, Mode::Practice));
        assert!(progress.record_score(80, Mode::Timed));
        assert!(!progress.record_score(80, Mode::Timed));
        assert_eq!(progress.personal_best, 80);
    }

    #[test]
    fn save_roundtrip() {
        let mut store = MemoryStore::new();
        let mut progress = Progress::default();
        progress.record_practice(day(5));
        progress.record_score(55, Mode::Timed);
        progress.save_streak(&mut store).unwrap();
        progress.save_personal_best(&mut store).unwrap();

        assert_eq!(Progress::load(&mut store, day(6)).unwrap(), progress);
    }
}
