//! In-memory record of finished tests, summarised for the results screen.
//! Nothing here touches disk.

use crate::session::SessionResult;
use crate::util::{mean, std_dev};
use chrono::{DateTime, Local};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub wpm: u32,
    pub accuracy: u32,
    pub errors: usize,
    pub timestamp: DateTime<Local>,
}

impl HistoryEntry {
    pub fn from_result(result: &SessionResult, timestamp: DateTime<Local>) -> Self {
        Self {
            wpm: result.wpm,
            accuracy: result.accuracy,
            errors: result.error_count,
            timestamp,
        }
    }
}

/// One point of the performance chart
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub label: String,
    pub wpm: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistorySummary {
    pub points: Vec<HistoryPoint>,
    pub best_wpm: Option<u32>,
    pub mean_wpm: Option<f64>,
    pub mean_accuracy: Option<f64>,
    pub wpm_std_dev: Option<f64>,
}

impl HistorySummary {
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        let points = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| HistoryPoint {
                label: format!("Test {}", idx + 1),
                wpm: entry.wpm as f64,
                accuracy: entry.accuracy as f64,
            })
            .collect::<Vec<_>>();

        let wpms = points.iter().map(|p| p.wpm).collect::<Vec<_>>();
        let accuracies = points.iter().map(|p| p.accuracy).collect::<Vec<_>>();

        Self {
            best_wpm: entries.iter().map(|e| e.wpm).max(),
            mean_wpm: mean(&wpms),
            mean_accuracy: mean(&accuracies),
            wpm_std_dev: std_dev(&wpms),
            points,
        }
    }

    /// `(test number, wpm)` pairs for charting
    pub fn wpm_coords(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .enumerate()
            .map(|(idx, p)| ((idx + 1) as f64, p.wpm))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(wpm: u32, accuracy: u32) -> HistoryEntry {
        HistoryEntry {
            wpm,
            accuracy,
            errors: 0,
            timestamp: Local::now(),
        }
    }

    #[test]
    fn test_empty_history() {
        let summary = HistorySummary::from_entries(&[]);

        assert!(summary.points.is_empty());
        assert_eq!(summary.best_wpm, None);
        assert_eq!(summary.mean_wpm, None);
        assert_eq!(summary.wpm_std_dev, None);
        assert!(summary.wpm_coords().is_empty());
    }

    #[test]
    fn test_summary_labels_and_aggregates() {
        let summary =
            HistorySummary::from_entries(&[entry(40, 90), entry(60, 100), entry(50, 95)]);

        let labels = summary.points.iter().map(|p| p.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["Test 1", "Test 2", "Test 3"]);
        assert_eq!(summary.best_wpm, Some(60));
        assert_eq!(summary.mean_wpm, Some(50.0));
        assert_eq!(summary.mean_accuracy, Some(95.0));

        let sd = summary.wpm_std_dev.unwrap();
        assert!((sd - 8.16496580927726).abs() < 1e-9);
        assert_eq!(summary.wpm_coords()[1], (2.0, 60.0));
    }

    #[test]
    fn test_entry_from_result() {
        let result = SessionResult {
            wpm: 72,
            accuracy: 97,
            elapsed_secs: 30.0,
            characters_typed: 190,
            error_count: 4,
        };
        let now = Local::now();

        let e = HistoryEntry::from_result(&result, now);
        assert_eq!(e.wpm, 72);
        assert_eq!(e.accuracy, 97);
        assert_eq!(e.errors, 4);
        assert_eq!(e.timestamp, now);
    }
}
