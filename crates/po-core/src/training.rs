//! Bounded history of observations the advanced analysis agent learns from.
//!
//! Each [`Category`] keeps at most `capacity` samples; recording past that
//! evicts the oldest. The store is owned by whoever builds the agent and is
//! shared through an `Arc`, so its lifetime is explicit rather than global.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Velocity,
    StoryComplexity,
    TeamPerformance,
    RiskPatterns,
    SuccessMetrics,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Velocity,
            Category::StoryComplexity,
            Category::TeamPerformance,
            Category::RiskPatterns,
            Category::SuccessMetrics,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Velocity => "velocity",
            Category::StoryComplexity => "story_complexity",
            Category::TeamPerformance => "team_performance",
            Category::RiskPatterns => "risk_patterns",
            Category::SuccessMetrics => "success_metrics",
        }
    }
}

/// One recorded observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub recorded_at: DateTime<Utc>,
    pub value: f64,
    /// What the value describes, e.g. a sprint name or a risk description.
    pub label: String,
}

pub struct TrainingStore {
    capacity: usize,
    samples: Mutex<HashMap<Category, VecDeque<Sample>>>,
}

impl TrainingStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Category, VecDeque<Sample>>> {
        // A panic while holding the lock cannot leave a half-written deque.
        self.samples.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, category: Category, value: f64, label: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        let mut samples = self.lock();
        let queue = samples.entry(category).or_default();
        while queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(Sample {
            recorded_at: Utc::now(),
            value,
            label: label.into(),
        });
    }

    /// Samples for `category`, oldest first.
    pub fn samples(&self, category: Category) -> Vec<Sample> {
        self.lock()
            .get(&category)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn values(&self, category: Category) -> Vec<f64> {
        self.lock()
            .get(&category)
            .map(|q| q.iter().map(|s| s.value).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, category: Category) -> usize {
        self.lock().get(&category).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values().all(VecDeque::is_empty)
    }

    /// Mean of the recorded values, if any.
    pub fn mean(&self, category: Category) -> Option<f64> {
        let values = self.values(category);
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

impl Default for TrainingStore {
    fn default() -> Self {
        Self::new(crate::config::TrainingConfig::default().capacity)
    }
}
