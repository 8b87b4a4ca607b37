//! Persistent goal store backed by a single JSON file.
//!
//! Every operation runs under one process-wide lock around a full
//! read-modify-write of the file. Writes go to a sibling `.tmp` file which
//! is then renamed over the original, so readers never observe a partial
//! document. Lookups are linear scans; fine at personal-list scale.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Goal, GoalError, GoalStatus, HistoryEntry};

/// Input for [`GoalStore::create`]. Title is the only required field.
#[derive(Debug, Clone, Default)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<String>,
    pub target_value: Option<f64>,
    pub target_unit: Option<String>,
    pub target_period: Option<String>,
    pub progress_value: Option<f64>,
}

/// Sparse field set for [`GoalStore::update`]. `None` leaves a field
/// untouched. For `target_value` the outer option marks "supplied" and the
/// inner one the new value, so a caller can clear a target explicitly.
/// An empty string clears `target_unit`/`target_period`.
#[derive(Debug, Clone, Default)]
pub struct GoalChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<String>,
    pub target_value: Option<Option<f64>>,
    pub target_unit: Option<String>,
    pub target_period: Option<String>,
    pub progress: Option<i64>,
    pub progress_value: Option<f64>,
    pub status: Option<String>,
    pub note: Option<String>,
}

/// JSON-file goal store. Cheap to share behind an `Arc`.
pub struct GoalStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl GoalStore {
    /// Open (creating if necessary) the store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, GoalError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            fs::write(&path, "[]")?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List all goals, optionally filtered by status (case-insensitive).
    pub fn list(&self, status: Option<&str>) -> Vec<Goal> {
        let goals = {
            let _guard = self.guard();
            self.read_all()
        };
        match status {
            Some(filter) => {
                let filter = filter.to_lowercase();
                goals
                    .into_iter()
                    .filter(|g| g.status.to_string() == filter)
                    .collect()
            }
            None => goals,
        }
    }

    /// Look up a goal by id.
    pub fn get(&self, id: &str) -> Option<Goal> {
        let _guard = self.guard();
        self.read_all().into_iter().find(|g| g.id == id)
    }

    /// Create a new goal. Fails with `InvalidInput` when the title is empty
    /// or whitespace-only; nothing is persisted in that case.
    pub fn create(&self, input: NewGoal) -> Result<Goal, GoalError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(GoalError::InvalidInput("Goal title is required.".to_string()));
        }

        let now = Utc::now();
        let target_value = input.target_value.filter(|v| *v > 0.0);
        let progress_value = input.progress_value.map(|v| v.max(0.0));

        let mut goal = Goal {
            id: Uuid::new_v4().simple().to_string(),
            title: title.to_string(),
            description: input.description.unwrap_or_default().trim().to_string(),
            target_date: input.target_date,
            progress: 0,
            status: GoalStatus::Active,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
            target_value,
            target_unit: clean_label(input.target_unit),
            target_period: clean_label(input.target_period),
            progress_value,
        };
        goal.recompute_progress();

        let _guard = self.guard();
        let mut goals = self.read_all();
        goals.push(goal.clone());
        self.write_all(&goals)?;
        info!(goal_id = %goal.id, title = %goal.title, "created goal");
        Ok(goal)
    }

    /// Apply a sparse set of field changes. Fields equal to their current
    /// value are no-ops; a `note` always counts as a modification. Derived
    /// fields are recomputed only when one of their inputs changed.
    pub fn update(&self, id: &str, changes: GoalChanges) -> Result<Goal, GoalError> {
        let _guard = self.guard();
        let mut goals = self.read_all();
        let Some(goal) = goals.iter_mut().find(|g| g.id == id) else {
            return Err(GoalError::NotFound(id.to_string()));
        };

        let mut modified = false;
        let mut needs_recompute = false;

        if let Some(title) = changes.title {
            let title = title.trim();
            if !title.is_empty() && title != goal.title {
                goal.title = title.to_string();
                modified = true;
            }
        }
        if let Some(description) = changes.description {
            if description != goal.description {
                goal.description = description;
                modified = true;
            }
        }
        if let Some(target_date) = changes.target_date {
            if goal.target_date.as_deref() != Some(target_date.as_str()) {
                goal.target_date = Some(target_date);
                modified = true;
            }
        }
        if let Some(target_value) = changes.target_value {
            let target_value = target_value.filter(|v| *v > 0.0);
            if target_value != goal.target_value {
                goal.target_value = target_value;
                modified = true;
                needs_recompute = true;
            }
        }
        if let Some(unit) = changes.target_unit {
            let unit = clean_label(Some(unit));
            if unit != goal.target_unit {
                goal.target_unit = unit;
                modified = true;
            }
        }
        if let Some(period) = changes.target_period {
            let period = clean_label(Some(period));
            if period != goal.target_period {
                goal.target_period = period;
                modified = true;
            }
        }
        if let Some(progress) = changes.progress {
            let pct = progress.clamp(0, 100) as u8;
            if pct != goal.progress {
                goal.progress = pct;
                modified = true;
                needs_recompute = true;
            }
            if pct == 100 && goal.status != GoalStatus::Completed {
                // Direct 100% always completes; an explicit status in the
                // same call is applied below and wins.
                goal.status = GoalStatus::Completed;
                modified = true;
            }
            if let Some(target) = goal.target_value.filter(|v| *v > 0.0) {
                let back = target * f64::from(pct) / 100.0;
                if goal.progress_value != Some(back) {
                    goal.progress_value = Some(back);
                    modified = true;
                }
            }
        }
        if let Some(progress_value) = changes.progress_value {
            let progress_value = progress_value.max(0.0);
            if goal.progress_value != Some(progress_value) {
                goal.progress_value = Some(progress_value);
                modified = true;
                needs_recompute = true;
            }
        }
        if let Some(status) = changes.status {
            let parsed: GoalStatus = status.parse()?;
            if parsed != goal.status {
                goal.status = parsed;
                modified = true;
            }
        }
        if let Some(note) = changes.note {
            let note = note.trim();
            if !note.is_empty() {
                goal.history.push(HistoryEntry {
                    timestamp: Utc::now(),
                    note: note.to_string(),
                });
                modified = true;
            }
        }

        if modified {
            if needs_recompute {
                goal.recompute_progress();
            }
            goal.updated_at = Utc::now();
            let updated = goal.clone();
            self.write_all(&goals)?;
            info!(goal_id = %id, "updated goal");
            return Ok(updated);
        }
        Ok(goal.clone())
    }

    /// Remove a goal by id. Returns false when the id was absent; that is
    /// not an error.
    pub fn delete(&self, id: &str) -> Result<bool, GoalError> {
        let _guard = self.guard();
        let goals = self.read_all();
        let before = goals.len();
        let remaining: Vec<Goal> = goals.into_iter().filter(|g| g.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.write_all(&remaining)?;
        info!(goal_id = %id, "deleted goal");
        Ok(true)
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the whole store. A missing or unreadable file is treated as
    /// empty rather than an error, matching how the assistant degrades when
    /// the file was hand-edited badly.
    fn read_all(&self) -> Vec<Goal> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&contents) {
            Ok(goals) => goals,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "goal file unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    fn write_all(&self, goals: &[Goal]) -> Result<(), GoalError> {
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(goals)?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn clean_label(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, GoalStore) {
        let dir = tempdir().unwrap();
        let store = GoalStore::new(dir.path().join("goals.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_create_requires_title() {
        let (_dir, store) = store();
        assert!(matches!(
            store.create(NewGoal::default()),
            Err(GoalError::InvalidInput(_))
        ));
        assert!(matches!(
            store.create(NewGoal {
                title: "   ".to_string(),
                ..NewGoal::default()
            }),
            Err(GoalError::InvalidInput(_))
        ));
        assert!(store.list(None).is_empty());
    }

    #[test]
    fn test_create_derives_progress() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Read 12 books".to_string(),
                target_value: Some(12.0),
                target_unit: Some("books".to_string()),
                progress_value: Some(3.0),
                ..NewGoal::default()
            })
            .unwrap();
        assert_eq!(goal.progress, 25);
        assert_eq!(goal.status, GoalStatus::Active);
    }

    #[test]
    fn test_create_ignores_nonpositive_target() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Stretch".to_string(),
                target_value: Some(-5.0),
                progress_value: Some(-2.0),
                ..NewGoal::default()
            })
            .unwrap();
        assert_eq!(goal.target_value, None);
        assert_eq!(goal.progress_value, Some(0.0));
        assert_eq!(goal.progress, 0);
    }

    #[test]
    fn test_update_progress_value_completes() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Run 70 km".to_string(),
                target_value: Some(70.0),
                target_unit: Some("km".to_string()),
                ..NewGoal::default()
            })
            .unwrap();
        let updated = store
            .update(
                &goal.id,
                GoalChanges {
                    progress_value: Some(70.0),
                    ..GoalChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.progress, 100);
        assert_eq!(updated.status, GoalStatus::Completed);
    }

    #[test]
    fn test_update_direct_progress_backfills_value() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Save $500".to_string(),
                target_value: Some(500.0),
                target_unit: Some("$".to_string()),
                ..NewGoal::default()
            })
            .unwrap();
        let updated = store
            .update(
                &goal.id,
                GoalChanges {
                    progress: Some(50),
                    ..GoalChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.progress, 50);
        assert_eq!(updated.progress_value, Some(250.0));
    }

    #[test]
    fn test_update_progress_100_forces_completed() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Ship the thing".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        let updated = store
            .update(
                &goal.id,
                GoalChanges {
                    progress: Some(100),
                    ..GoalChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, GoalStatus::Completed);
    }

    #[test]
    fn test_update_explicit_status_wins_in_same_call() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Old project".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        let updated = store
            .update(
                &goal.id,
                GoalChanges {
                    progress: Some(100),
                    status: Some("archived".to_string()),
                    ..GoalChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.progress, 100);
        assert_eq!(updated.status, GoalStatus::Archived);
    }

    #[test]
    fn test_update_rejects_unknown_status() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "A goal".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        assert!(matches!(
            store.update(
                &goal.id,
                GoalChanges {
                    status: Some("paused".to_string()),
                    ..GoalChanges::default()
                }
            ),
            Err(GoalError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_update_unknown_id() {
        let (_dir, store) = store();
        assert!(matches!(
            store.update("nope", GoalChanges::default()),
            Err(GoalError::NotFound(_))
        ));
    }

    #[test]
    fn test_note_always_appends() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Practice piano".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        let updated = store
            .update(
                &goal.id,
                GoalChanges {
                    note: Some("30 minutes today".to_string()),
                    ..GoalChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].note, "30 minutes today");
        assert!(updated.updated_at >= goal.updated_at);
    }

    #[test]
    fn test_noop_update_does_not_bump_updated_at() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Stable".to_string(),
                description: Some("same".to_string()),
                ..NewGoal::default()
            })
            .unwrap();
        let updated = store
            .update(
                &goal.id,
                GoalChanges {
                    description: Some("same".to_string()),
                    ..GoalChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.updated_at, goal.updated_at);
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "Short-lived".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        assert!(store.delete(&goal.id).unwrap());
        assert!(!store.delete(&goal.id).unwrap());
        assert!(store.list(None).is_empty());
    }

    #[test]
    fn test_list_status_filter_case_insensitive() {
        let (_dir, store) = store();
        let goal = store
            .create(NewGoal {
                title: "One".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        store
            .update(
                &goal.id,
                GoalChanges {
                    status: Some("archived".to_string()),
                    ..GoalChanges::default()
                },
            )
            .unwrap();
        store
            .create(NewGoal {
                title: "Two".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        assert_eq!(store.list(Some("ARCHIVED")).len(), 1);
        assert_eq!(store.list(Some("active")).len(), 1);
        assert_eq!(store.list(None).len(), 2);
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("goals.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = GoalStore::new(&path).unwrap();
        assert!(store.list(None).is_empty());
    }
}
