//! Summary over every logged score: totals, per-language bests and daily activity.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use itertools::Itertools;

use crate::config::Language;
use crate::metrics;
use crate::score_log::ScoreRecord;

/// Daily counts are scaled against at least this many tests.
const MIN_ACTIVITY_SCALE: u32 = 4;

/// Accuracy-weighted speed, used to rank scores.
pub fn weighted_score(wpm: u32, accuracy: u32) -> f64 {
    wpm as f64 * (accuracy as f64 / 100.0)
}

/// Intensity bucket 0..=4 for a day with `count` tests.
pub fn activity_level(count: u32, max_count: u32) -> u8 {
    if count == 0 {
        return 0;
    }
    let intensity = (count as f64 / max_count.max(MIN_ACTIVITY_SCALE) as f64).min(1.0);
    if intensity <= 0.25 {
        1
    } else if intensity <= 0.5 {
        2
    } else if intensity <= 0.75 {
        3
    } else {
        4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageBest {
    pub language: Language,
    pub tests: usize,
    pub best_wpm: u32,
    /// rounded best [`weighted_score`] for the language
    pub best_weighted: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySummary {
    pub tests_completed: usize,
    pub best_wpm: u32,
    pub average_wpm: u32,
    pub average_accuracy: u32,
    /// best weighted score first
    pub languages: Vec<LanguageBest>,
    /// tests logged per local calendar day
    pub activity: BTreeMap<NaiveDate, u32>,
}

impl HistorySummary {
    pub fn from_records(records: &[ScoreRecord]) -> Self {
        let wpms: Vec<f64> = records.iter().map(|r| r.score.wpm as f64).collect();
        let accuracies: Vec<f64> = records.iter().map(|r| r.score.accuracy as f64).collect();

        let languages = records
            .iter()
            .into_group_map_by(|r| r.score.language)
            .into_iter()
            .map(|(language, scores)| LanguageBest {
                language,
                tests: scores.len(),
                best_wpm: scores.iter().map(|r| r.score.wpm).max().unwrap_or(0),
                best_weighted: scores
                    .iter()
                    .map(|r| weighted_score(r.score.wpm, r.score.accuracy))
                    .fold(0.0, f64::max)
                    .round() as u32,
            })
            .sorted_by(|a, b| {
                b.best_weighted
                    .cmp(&a.best_weighted)
                    .then(b.best_wpm.cmp(&a.best_wpm))
                    .then(a.language.cmp(&b.language))
            })
            .collect();

        let mut activity = BTreeMap::new();
        for record in records {
            *activity.entry(record.logged_at.date_naive()).or_insert(0) += 1;
        }

        Self {
            tests_completed: records.len(),
            best_wpm: records.iter().map(|r| r.score.wpm).max().unwrap_or(0),
            average_wpm: metrics::mean(&wpms).unwrap_or(0.0).round() as u32,
            average_accuracy: metrics::mean(&accuracies).unwrap_or(0.0).round() as u32,
            languages,
            activity,
        }
    }

    pub fn language(&self, language: Language) -> Option<&LanguageBest> {
        self.languages.iter().find(|l| l.language == language)
    }

    pub fn activity_on(&self, date: NaiveDate) -> u32 {
        self.activity.get(&date).copied().unwrap_or(0)
    }

    pub fn active_days(&self) -> usize {
        self.activity.values().filter(|&&count| count > 0).count()
    }

    pub fn max_daily(&self) -> u32 {
        self.activity.values().copied().max().unwrap_or(0)
    }

    /// Counts for the `days` days ending at `today`, oldest first.
    pub fn recent_activity(&self, today: NaiveDate, days: u64) -> Vec<(NaiveDate, u32)> {
        (0..days)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|date| (date, self.activity_on(date)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score_log::ScoreSubmission;
    use chrono::{Local, TimeZone};

    fn record(day: u32, wpm: u32, accuracy: u32, language: Language) -> ScoreRecord {
        ScoreRecord {
            logged_at: Local.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            score: ScoreSubmission {
                wpm,
                accuracy,
                language,
                duration: 30,
            },
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn empty_history_is_all_zero() {
        let summary = HistorySummary::from_records(&[]);
        assert_eq!(summary, HistorySummary::default());
        assert_eq!(summary.max_daily(), 0);
    }

    #[test]
    fn totals_and_averages() {
        let summary = HistorySummary::from_records(&[
            record(1, 60, 90, Language::Rust),
            record(1, 81, 100, Language::Rust),
            record(2, 50, 95, Language::Go),
        ]);
        assert_eq!(summary.tests_completed, 3);
        assert_eq!(summary.best_wpm, 81);
        // 191 / 3
        assert_eq!(summary.average_wpm, 64);
        // 285 / 3
        assert_eq!(summary.average_accuracy, 95);
    }

    #[test]
    fn languages_rank_by_weighted_score() {
        let summary = HistorySummary::from_records(&[
            record(1, 100, 50, Language::Python),
            record(1, 70, 100, Language::Rust),
            record(2, 90, 90, Language::Python),
        ]);

        let ranked: Vec<(Language, u32)> = summary
            .languages
            .iter()
            .map(|l| (l.language, l.best_weighted))
            .collect();
        // python: max(50, 81); rust: 70
        assert_eq!(ranked, vec![(Language::Python, 81), (Language::Rust, 70)]);

        let python = summary.language(Language::Python).unwrap();
        assert_eq!(python.tests, 2);
        assert_eq!(python.best_wpm, 100);
        assert!(summary.language(Language::Java).is_none());
    }

    #[test]
    fn activity_counts_per_day() {
        let summary = HistorySummary::from_records(&[
            record(1, 60, 90, Language::Rust),
            record(1, 61, 90, Language::Rust),
            record(3, 62, 90, Language::Rust),
        ]);
        assert_eq!(summary.activity_on(date(1)), 2);
        assert_eq!(summary.activity_on(date(2)), 0);
        assert_eq!(summary.active_days(), 2);
        assert_eq!(summary.max_daily(), 2);

        assert_eq!(
            summary.recent_activity(date(3), 3),
            vec![(date(1), 2), (date(2), 0), (date(3), 1)]
        );
    }

    #[test]
    fn activity_levels_scale_with_busiest_day() {
        assert_eq!(activity_level(0, 10), 0);
        // small histories scale against four tests
        assert_eq!(activity_level(1, 1), 1);
        assert_eq!(activity_level(2, 2), 2);
        assert_eq!(activity_level(3, 3), 3);
        assert_eq!(activity_level(4, 4), 4);
        assert_eq!(activity_level(5, 20), 1);
        assert_eq!(activity_level(20, 20), 4);
    }

    #[test]
    fn weighted_score_discounts_accuracy() {
        assert_eq!(weighted_score(80, 100), 80.0);
        assert_eq!(weighted_score(80, 50), 40.0);
        assert_eq!(weighted_score(0, 100), 0.0);
    }
}
