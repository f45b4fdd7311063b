use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A set as it is handed to the session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSet {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration_secs: Option<u32>,
    pub rest_secs: u32,
    pub completed: bool,
    pub note: String,
}

impl RecordedSet {
    /// reps × weight, zero when either is missing
    pub fn volume(&self) -> f64 {
        match (self.reps, self.weight) {
            (Some(reps), Some(weight)) => reps as f64 * weight,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedExercise {
    pub exercise_id: String,
    pub name: String,
    pub note: String,
    pub sets: Vec<RecordedSet>,
}

/// Immutable result of one finalized workout session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub template_id: String,
    pub template_name: String,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub elapsed_secs: u64,
    pub notes: String,
    pub completed: bool,
    pub exercises: Vec<RecordedExercise>,
}

impl WorkoutRecord {
    pub fn completed_sets(&self) -> usize {
        self.sets().filter(|s| s.completed).count()
    }

    pub fn total_sets(&self) -> usize {
        self.sets().count()
    }

    /// Volume over completed sets only
    pub fn total_volume(&self) -> f64 {
        self.sets().filter(|s| s.completed).map(RecordedSet::volume).sum()
    }

    fn sets(&self) -> impl Iterator<Item = &RecordedSet> {
        self.exercises.iter().flat_map(|e| e.sets.iter())
    }
}
