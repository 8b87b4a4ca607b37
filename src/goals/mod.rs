//! Personal goal tracking.
//!
//! A goal is a small persistent record with an optional numeric target
//! (e.g. 70 km, 12 books) and a derived completion percentage. The store
//! keeps all goals in a single JSON file; see [`store`].

pub mod store;

pub use store::{GoalChanges, GoalStore, NewGoal};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by goal store operations.
#[derive(Debug, Error)]
pub enum GoalError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Goal with id '{0}' not found")]
    NotFound(String),
    #[error("Invalid status '{0}'")]
    InvalidStatus(String),
    #[error("goal store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("goal store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Goal lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalStatus::Active => write!(f, "active"),
            GoalStatus::Completed => write!(f, "completed"),
            GoalStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for GoalStatus {
    type Err = GoalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "archived" => Ok(GoalStatus::Archived),
            other => Err(GoalError::InvalidStatus(other.to_string())),
        }
    }
}

/// A dated note appended to a goal's history. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

/// A single tracked goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_date: Option<String>,
    /// Percentage complete, 0..=100. Derived from progress_value/target_value
    /// whenever both are present.
    #[serde(default)]
    pub progress: u8,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub target_unit: Option<String>,
    #[serde(default)]
    pub target_period: Option<String>,
    #[serde(default)]
    pub progress_value: Option<f64>,
}

impl Goal {
    /// First 8 characters of the id, for disambiguation listings.
    pub fn short_id(&self) -> &str {
        let end = self.id.len().min(8);
        &self.id[..end]
    }

    /// Re-derive `progress` from `progress_value` vs `target_value` when
    /// both are available; otherwise leave `progress` untouched. Hitting
    /// 100% promotes the goal to completed unless it is already
    /// completed or archived.
    pub(crate) fn recompute_progress(&mut self) {
        let target = match self.target_value {
            Some(v) if v > 0.0 => v,
            _ => return,
        };
        let Some(progress_value) = self.progress_value else {
            return;
        };
        let ratio = progress_value.max(0.0) / target;
        let pct = (ratio.min(1.0) * 100.0).round() as u8;
        self.progress = pct;
        if pct >= 100 && !matches!(self.status, GoalStatus::Completed | GoalStatus::Archived) {
            self.status = GoalStatus::Completed;
        }
    }

    /// One-line progress summary, e.g. "25% (3/12 books)".
    pub fn progress_summary(&self) -> String {
        match (self.target_value, self.progress_value) {
            (Some(target), Some(done)) if target > 0.0 => {
                let unit = self.target_unit.as_deref().unwrap_or("");
                let sep = if unit.is_empty() { "" } else { " " };
                format!(
                    "{}% ({}/{}{}{})",
                    self.progress,
                    trim_float(done),
                    trim_float(target),
                    sep,
                    unit
                )
            }
            _ => format!("{}%", self.progress),
        }
    }
}

/// Render a float without a trailing ".0" for whole numbers.
pub(crate) fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_with(target: Option<f64>, done: Option<f64>) -> Goal {
        Goal {
            id: "abc123".to_string(),
            title: "Read 12 books".to_string(),
            description: String::new(),
            target_date: None,
            progress: 0,
            status: GoalStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            history: Vec::new(),
            target_value: target,
            target_unit: Some("books".to_string()),
            target_period: None,
            progress_value: done,
        }
    }

    #[test]
    fn test_recompute_derives_percentage() {
        let mut goal = goal_with(Some(12.0), Some(3.0));
        goal.recompute_progress();
        assert_eq!(goal.progress, 25);
        assert_eq!(goal.status, GoalStatus::Active);
    }

    #[test]
    fn test_recompute_caps_at_100_and_completes() {
        let mut goal = goal_with(Some(12.0), Some(15.0));
        goal.recompute_progress();
        assert_eq!(goal.progress, 100);
        assert_eq!(goal.status, GoalStatus::Completed);
    }

    #[test]
    fn test_recompute_does_not_regress_archived() {
        let mut goal = goal_with(Some(10.0), Some(10.0));
        goal.status = GoalStatus::Archived;
        goal.recompute_progress();
        assert_eq!(goal.progress, 100);
        assert_eq!(goal.status, GoalStatus::Archived);
    }

    #[test]
    fn test_recompute_without_target_leaves_progress() {
        let mut goal = goal_with(None, Some(3.0));
        goal.progress = 40;
        goal.recompute_progress();
        assert_eq!(goal.progress, 40);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Active".parse::<GoalStatus>().unwrap(), GoalStatus::Active);
        assert!(matches!(
            "paused".parse::<GoalStatus>(),
            Err(GoalError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_progress_summary() {
        let goal = goal_with(Some(12.0), Some(3.0));
        let mut goal = goal;
        goal.recompute_progress();
        assert_eq!(goal.progress_summary(), "25% (3/12 books)");
    }
}
