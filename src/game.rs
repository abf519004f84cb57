use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// The fixed vocabulary of object classes eligible for scoring. Matching is
/// case-insensitive; anything outside the set may be drawn but never scores.
#[derive(Debug, Clone)]
pub struct RecognizedLabels(HashSet<String>);

impl RecognizedLabels {
    pub fn new(labels: &[String]) -> Self {
        Self(labels.iter().map(|l| l.to_lowercase()).collect())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(&label.to_lowercase())
    }
}

/// One geotagged inventory record, appended per recognized detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedItem {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyChallenge {
    pub date: NaiveDate,
    pub progress: u32,
    pub goal: u32,
    pub completed: bool,
}

impl DailyChallenge {
    fn new(goal: u32) -> Self {
        Self {
            date: Utc::now().date_naive(),
            progress: 0,
            goal,
            completed: false,
        }
    }
}

/// Process-wide game state: score, inventory, daily challenge. One shared
/// instance, mutated only through the increment/append operations below (all
/// invoked from the scoring loop); reads are safe from any task.
pub struct GameState {
    score: AtomicU64,
    detected_items: Mutex<Vec<DetectedItem>>,
    daily_challenge: Mutex<DailyChallenge>,
}

impl GameState {
    pub fn new(daily_challenge_goal: u32) -> Self {
        Self {
            score: AtomicU64::new(0),
            detected_items: Mutex::new(Vec::new()),
            daily_challenge: Mutex::new(DailyChallenge::new(daily_challenge_goal)),
        }
    }

    pub fn add_points(&self, points: u64) {
        self.score.fetch_add(points, Ordering::Relaxed);
    }

    pub fn add_detected_item(&self, label: &str, latitude: f64, longitude: f64) {
        let item = DetectedItem {
            label: label.to_string(),
            latitude,
            longitude,
            detected_at: Utc::now(),
        };
        self.detected_items
            .lock()
            .expect("inventory lock poisoned")
            .push(item);
    }

    /// Advances today's challenge by one item, rolling the window over on a
    /// date change.
    pub fn update_daily_challenge(&self) {
        let mut challenge = self
            .daily_challenge
            .lock()
            .expect("challenge lock poisoned");
        let today = Utc::now().date_naive();
        if challenge.date != today {
            challenge.date = today;
            challenge.progress = 0;
            challenge.completed = false;
        }
        challenge.progress += 1;
        if !challenge.completed && challenge.progress >= challenge.goal {
            challenge.completed = true;
            tracing::info!("Daily challenge completed ({} items)", challenge.goal);
        }
    }

    pub fn score(&self) -> u64 {
        self.score.load(Ordering::Relaxed)
    }

    pub fn detected_items_count(&self) -> usize {
        self.detected_items
            .lock()
            .expect("inventory lock poisoned")
            .len()
    }

    pub fn detected_items(&self) -> Vec<DetectedItem> {
        self.detected_items
            .lock()
            .expect("inventory lock poisoned")
            .clone()
    }

    pub fn daily_challenge(&self) -> DailyChallenge {
        self.daily_challenge
            .lock()
            .expect("challenge lock poisoned")
            .clone()
    }

    /// JSON snapshot of the inventory for the UI collaborator.
    pub fn inventory_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.detected_items())
    }
}
