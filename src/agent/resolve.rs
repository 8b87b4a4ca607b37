//! Entity resolution: free-text references to concrete events or goals.
//!
//! Event matching is a deliberate simplicity choice: the query is split on
//! conjunctions and an event matches when its title contains ANY part
//! (case-insensitive substring). Goal references must resolve uniquely;
//! multiple matches are returned for disambiguation, never guessed at.

use chrono::{DateTime, Duration, Utc};

use crate::calendar::{CalendarGateway, Event};
use crate::goals::{Goal, GoalStore};
use crate::timefmt::TimeFormatter;

use super::HandlerError;

/// Fallback window when neither a preset nor explicit bounds are given.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Cap on the disambiguation listing.
const MAX_CANDIDATES: usize = 5;

/// Half-open search window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Compute the search window from a named preset or explicit bounds.
/// Presets are evaluated in the deployment's reference timezone.
pub fn resolve_window(
    timeframe: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    fmt: &TimeFormatter,
) -> Result<TimeWindow, HandlerError> {
    if let Some(preset) = timeframe.map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match preset {
            "today" => fmt.day_window(0),
            "tomorrow" => fmt.day_window(1),
            "this_week" => fmt.week_window(0),
            "next_week" => fmt.week_window(1),
            other => {
                return Err(HandlerError::InvalidInput(format!(
                    "I don't recognize the timeframe '{}'. Try today, tomorrow, this_week, or next_week.",
                    other
                )))
            }
        };
        return Ok(TimeWindow { start, end });
    }

    let parse = |text: &str| {
        fmt.parse_point(text).map_err(|_| {
            HandlerError::InvalidInput(format!(
                "I couldn't read the date '{}'. Could you give it like 2025-11-22?",
                text
            ))
        })
    };

    let window = match (start, end) {
        (Some(s), Some(e)) => {
            let start = parse(s)?;
            let end = parse(e)?;
            if end <= start {
                return Err(HandlerError::InvalidInput(
                    "That window ends before it starts. Could you check the dates?".to_string(),
                ));
            }
            TimeWindow { start, end }
        }
        (Some(s), None) => {
            let start = parse(s)?;
            TimeWindow {
                start,
                end: start + Duration::days(DEFAULT_WINDOW_DAYS),
            }
        }
        (None, Some(e)) => {
            let end = parse(e)?;
            TimeWindow {
                end,
                start: end - Duration::days(DEFAULT_WINDOW_DAYS),
            }
        }
        (None, None) => {
            let now = Utc::now();
            TimeWindow {
                start: now - Duration::days(DEFAULT_WINDOW_DAYS),
                end: now + Duration::days(DEFAULT_WINDOW_DAYS),
            }
        }
    };
    Ok(window)
}

/// Split a query on "and"/"&" conjunctions into lowercase keyword parts.
pub fn keyword_parts(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split('&')
        .flat_map(|chunk| chunk.split(" and "))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// OR semantics: the title matches when it contains any keyword part.
pub fn summary_matches(summary: &str, parts: &[String]) -> bool {
    let summary = summary.to_lowercase();
    parts.iter().any(|part| summary.contains(part))
}

/// Fetch candidate events in the window and keep those matching the query.
/// An absent or blank query keeps everything the window returned.
pub async fn find_matching_events(
    gateway: &dyn CalendarGateway,
    query: Option<&str>,
    window: TimeWindow,
    max_results: u32,
) -> Result<Vec<Event>, HandlerError> {
    let events = gateway
        .find_events(window.start, window.end, max_results)
        .await?;
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(events);
    };
    let parts = keyword_parts(query);
    Ok(events
        .into_iter()
        .filter(|event| summary_matches(&event.summary, &parts))
        .collect())
}

/// Resolve a goal reference: a known id wins outright, otherwise the id or
/// title fragment is matched against all goal titles. Zero matches is
/// NotFound, more than one is Ambiguous with a short candidate listing.
pub fn resolve_goal(
    store: &GoalStore,
    goal_id: Option<&str>,
    goal_title: Option<&str>,
) -> Result<Goal, HandlerError> {
    if let Some(id) = goal_id.map(str::trim).filter(|id| !id.is_empty()) {
        if let Some(goal) = store.get(id) {
            return Ok(goal);
        }
    }

    let fragment = goal_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| goal_id.map(str::trim).filter(|id| !id.is_empty()));
    let Some(fragment) = fragment else {
        return Err(HandlerError::InvalidInput(
            "Which goal do you mean? Give me its title or id.".to_string(),
        ));
    };

    let needle = fragment.to_lowercase();
    let mut matches: Vec<Goal> = store
        .list(None)
        .into_iter()
        .filter(|goal| goal.title.to_lowercase().contains(&needle))
        .collect();

    match matches.len() {
        0 => Err(HandlerError::NotFound(format!(
            "a goal matching '{}'",
            fragment
        ))),
        1 => Ok(matches.remove(0)),
        _ => Err(HandlerError::Ambiguous(
            matches
                .iter()
                .take(MAX_CANDIDATES)
                .map(|goal| format!("{} ({})", goal.title, goal.short_id()))
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::NewGoal;
    use tempfile::tempdir;

    #[test]
    fn test_keyword_parts_splits_conjunctions() {
        assert_eq!(keyword_parts("gym"), vec!["gym"]);
        assert_eq!(keyword_parts("Gym and Dentist"), vec!["gym", "dentist"]);
        assert_eq!(keyword_parts("gym & dentist"), vec!["gym", "dentist"]);
        // "sandwich" contains "and" but is a single word
        assert_eq!(keyword_parts("sandwich run"), vec!["sandwich run"]);
    }

    #[test]
    fn test_summary_matches_is_or_semantics() {
        let parts = keyword_parts("gym and dentist");
        assert!(summary_matches("Gym session", &parts));
        assert!(summary_matches("DENTIST checkup", &parts));
        assert!(!summary_matches("Team meeting", &parts));
    }

    #[test]
    fn test_resolve_window_rejects_unknown_preset() {
        let fmt = TimeFormatter::from_name("UTC").unwrap();
        assert!(matches!(
            resolve_window(Some("someday"), None, None, &fmt),
            Err(HandlerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_resolve_window_presets() {
        let fmt = TimeFormatter::from_name("UTC").unwrap();
        let today = resolve_window(Some("today"), None, None, &fmt).unwrap();
        assert_eq!(today.end - today.start, Duration::days(1));

        let week = resolve_window(Some("next_week"), None, None, &fmt).unwrap();
        assert_eq!(week.end - week.start, Duration::weeks(1));
        assert!(week.start > today.start);
    }

    #[test]
    fn test_resolve_window_explicit_bounds() {
        let fmt = TimeFormatter::from_name("UTC").unwrap();
        let window =
            resolve_window(None, Some("2025-11-01"), Some("2025-11-08"), &fmt).unwrap();
        assert_eq!(window.end - window.start, Duration::days(7));

        assert!(matches!(
            resolve_window(None, Some("2025-11-08"), Some("2025-11-01"), &fmt),
            Err(HandlerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_resolve_window_default_spans_sixty_days() {
        let fmt = TimeFormatter::from_name("UTC").unwrap();
        let window = resolve_window(None, None, None, &fmt).unwrap();
        assert_eq!(window.end - window.start, Duration::days(60));
    }

    fn seeded_store() -> (tempfile::TempDir, GoalStore) {
        let dir = tempdir().unwrap();
        let store = GoalStore::new(dir.path().join("goals.json")).unwrap();
        store
            .create(NewGoal {
                title: "Read 12 books".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        store
            .create(NewGoal {
                title: "Read the paper daily".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        store
            .create(NewGoal {
                title: "Run 70 km".to_string(),
                ..NewGoal::default()
            })
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_resolve_goal_by_id() {
        let (_dir, store) = seeded_store();
        let id = store.list(None)[0].id.clone();
        let goal = resolve_goal(&store, Some(&id), None).unwrap();
        assert_eq!(goal.id, id);
    }

    #[test]
    fn test_resolve_goal_unique_title_fragment() {
        let (_dir, store) = seeded_store();
        let goal = resolve_goal(&store, None, Some("run")).unwrap();
        assert_eq!(goal.title, "Run 70 km");
    }

    #[test]
    fn test_resolve_goal_zero_matches_is_not_found() {
        let (_dir, store) = seeded_store();
        assert!(matches!(
            resolve_goal(&store, None, Some("meditate")),
            Err(HandlerError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_goal_multiple_matches_is_ambiguous() {
        let (_dir, store) = seeded_store();
        match resolve_goal(&store, None, Some("read")) {
            Err(HandlerError::Ambiguous(candidates)) => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates[0].contains("Read"));
            }
            other => panic!("expected Ambiguous, got {:?}", other.map(|g| g.title)),
        }
    }

    #[test]
    fn test_resolve_goal_without_reference_asks() {
        let (_dir, store) = seeded_store();
        assert!(matches!(
            resolve_goal(&store, None, None),
            Err(HandlerError::InvalidInput(_))
        ));
    }
}
