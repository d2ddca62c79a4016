//! Core domain types for falcon
//!
//! These types are the persisted documents. They are plain data: the store
//! loads them, callers mutate a copy, and the store writes them back whole.
//!
//! ## Ordering
//!
//! [`History::generations`] is stored oldest-first so appending is a push.
//! Views that want newest-first use [`History::newest_first`].

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{AspectRatio, Resolution};

/// Maximum number of generations kept in history.
pub const HISTORY_LIMIT: usize = 100;

// ============================================
// Generation
// ============================================

/// One recorded successful remote image operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Prompt, or a derived label such as `[upscale 2x] <prompt>`
    pub prompt: String,
    /// Model id from the registry
    pub model: String,
    pub aspect: AspectRatio,
    pub resolution: Resolution,
    /// Absolute path of the saved image
    pub output: PathBuf,
    /// Estimated cost in dollars
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
    /// Source image for edits, upscales and background removals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_from: Option<PathBuf>,
}

impl Generation {
    /// Create a generation stamped with a fresh id and the current time.
    pub fn new(
        prompt: impl Into<String>,
        model: impl Into<String>,
        aspect: AspectRatio,
        resolution: Resolution,
        output: PathBuf,
        cost: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            model: model.into(),
            aspect,
            resolution,
            output,
            cost,
            timestamp: Utc::now(),
            edited_from: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.edited_from = Some(source.into());
        self
    }

    /// File name of the output, for compact display.
    pub fn file_name(&self) -> String {
        self.output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output.display().to_string())
    }
}

// ============================================
// History
// ============================================

/// Running cost counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTotals {
    pub session: f64,
    pub today: f64,
    pub all_time: f64,
}

/// The history document: generation log plus cost counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Oldest first. Entries that fail to parse are dropped on load.
    #[serde(deserialize_with = "readable_generations")]
    pub generations: Vec<Generation>,
    pub total_cost: CostTotals,
    /// Calendar day (`YYYY-MM-DD`) the counters belong to
    pub last_session_date: NaiveDate,
}

impl History {
    /// An empty history dated `today`.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            generations: Vec::new(),
            total_cost: CostTotals::default(),
            last_session_date: today,
        }
    }

    /// Reset the session and daily counters if `today` is a new day.
    ///
    /// Returns true if a reset happened. `all_time` and the log are untouched.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_session_date == today {
            return false;
        }
        self.total_cost.session = 0.0;
        self.total_cost.today = 0.0;
        self.last_session_date = today;
        true
    }

    /// Append a generation, update every counter and enforce the size cap.
    pub fn record(&mut self, generation: Generation, today: NaiveDate) {
        self.roll_over(today);

        self.total_cost.session += generation.cost;
        self.total_cost.today += generation.cost;
        self.total_cost.all_time += generation.cost;
        self.generations.push(generation);

        if self.generations.len() > HISTORY_LIMIT {
            let overflow = self.generations.len() - HISTORY_LIMIT;
            self.generations.drain(..overflow);
        }
    }

    /// Most recent generation.
    pub fn last(&self) -> Option<&Generation> {
        self.generations.last()
    }

    /// Generations newest first, for display.
    pub fn newest_first(&self) -> impl Iterator<Item = &Generation> {
        self.generations.iter().rev()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }
}

/// Parse each entry on its own so one bad record does not discard the log.
fn readable_generations<'de, D>(deserializer: D) -> Result<Vec<Generation>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping unreadable history entry");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn gen(prompt: &str, cost: f64) -> Generation {
        Generation::new(
            prompt,
            "banana",
            AspectRatio::Square,
            Resolution::TwoK,
            PathBuf::from(format!("/tmp/{}.png", prompt)),
            cost,
        )
    }

    #[test]
    fn test_record_updates_all_counters() {
        let mut history = History::empty(day(1));
        history.record(gen("a", 0.15), day(1));
        history.record(gen("b", 0.039), day(1));

        assert_eq!(history.len(), 2);
        assert!((history.total_cost.session - 0.189).abs() < 1e-9);
        assert!((history.total_cost.today - 0.189).abs() < 1e-9);
        assert!((history.total_cost.all_time - 0.189).abs() < 1e-9);
        assert_eq!(history.last().unwrap().prompt, "b");
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut history = History::empty(day(1));
        for i in 0..=HISTORY_LIMIT {
            history.record(gen(&format!("p{}", i), 0.01), day(1));
        }

        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.generations.first().unwrap().prompt, "p1");
        assert_eq!(history.generations.last().unwrap().prompt, "p100");
    }

    #[test]
    fn test_all_time_spans_days() {
        let mut history = History::empty(day(1));
        let costs = [0.13, 0.15, 0.30, 0.02, 0.039];
        for (i, cost) in costs.iter().enumerate() {
            history.record(gen("x", *cost), day(1 + i as u32));
        }

        let expected: f64 = costs.iter().sum();
        assert!((history.total_cost.all_time - expected).abs() < 1e-9);
        // Only the last day's generation counts toward today
        assert!((history.total_cost.today - 0.039).abs() < 1e-9);
        assert_eq!(history.last_session_date, day(5));
    }

    #[test]
    fn test_roll_over_keeps_log_and_all_time() {
        let mut history = History::empty(day(1));
        history.record(gen("a", 0.15), day(1));

        assert!(!history.roll_over(day(1)));
        assert!(history.roll_over(day(2)));
        assert_eq!(history.total_cost.session, 0.0);
        assert_eq!(history.total_cost.today, 0.0);
        assert_eq!(history.total_cost.all_time, 0.15);
        assert_eq!(history.len(), 1);
        assert_eq!(history.last_session_date, day(2));
    }

    #[test]
    fn test_newest_first_reverses_storage_order() {
        let mut history = History::empty(day(1));
        history.record(gen("old", 0.0), day(1));
        history.record(gen("new", 0.0), day(1));

        let prompts: Vec<_> = history.newest_first().map(|g| g.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["new", "old"]);
    }

    #[test]
    fn test_history_json_shape() {
        let mut history = History::empty(day(9));
        history.record(gen("a", 0.5).with_source("/src.png"), day(9));

        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["lastSessionDate"], "2025-03-09");
        assert_eq!(json["totalCost"]["allTime"], 0.5);
        assert_eq!(json["generations"][0]["aspect"], "1:1");
        assert_eq!(json["generations"][0]["editedFrom"], "/src.png");
    }

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let mut history = History::empty(day(9));
        history.record(gen("kept", 0.5), day(9));
        history.record(gen("edited", 0.5), day(9));

        let mut json = serde_json::to_value(&history).unwrap();
        json["generations"][1]["aspect"] = "7:3".into();
        let loaded: History = serde_json::from_value(json).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.generations[0].prompt, "kept");
        assert_eq!(loaded.total_cost.all_time, 1.0);
    }
}
