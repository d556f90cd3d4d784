//! Schedule engine: search, filters and derived views over the loaded sessions.
//!
//! Every function borrows the collection and returns a fresh vector; the loaded
//! sessions are never modified. The current date is always supplied by the
//! caller so results only depend on the arguments.

use chrono::{Days, NaiveDate};
use std::collections::{BTreeMap, HashSet};

use crate::types::{FilterCriteria, Session, Statistics, TimeRange};
use crate::week::{self, WeekStart};

/// Maximum number of sessions returned by [`upcoming_sessions`]
pub const UPCOMING_LIMIT: usize = 5;

/// Length in days of the upcoming window, counted from today
pub const UPCOMING_WINDOW_DAYS: u64 = 7;

/// Case-insensitive substring search over subject, room, content and group.
///
/// An empty query returns the collection unchanged. Only simple lowercasing is
/// applied: accented and unaccented spellings do not match each other.
pub fn search(sessions: &[Session], query: &str) -> Vec<Session> {
    if query.is_empty() {
        return sessions.to_vec();
    }

    let needle = query.to_lowercase();
    sessions
        .iter()
        .filter(|session| matches_text(session, &needle))
        .cloned()
        .collect()
}

fn matches_text(session: &Session, needle: &str) -> bool {
    [
        &session.subject,
        &session.room,
        &session.content,
        &session.group,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Apply the subject restriction, then the time-range restriction.
///
/// An empty subject list or `TimeRange::All` leaves that axis unrestricted.
/// The search text of `criteria` is ignored here, see [`apply_criteria`].
pub fn filter(
    sessions: &[Session],
    criteria: &FilterCriteria,
    today: NaiveDate,
    week_start: WeekStart,
) -> Vec<Session> {
    sessions
        .iter()
        .filter(|session| {
            criteria.subjects.is_empty() || criteria.subjects.contains(&session.subject)
        })
        .filter(|session| in_time_range(session, criteria.time_range, today, week_start))
        .cloned()
        .collect()
}

fn in_time_range(
    session: &Session,
    range: TimeRange,
    today: NaiveDate,
    week_start: WeekStart,
) -> bool {
    // Sessions without a real date only pass the unrestricted range
    let Some(date) = session.date() else {
        return range == TimeRange::All;
    };

    match range {
        TimeRange::All => true,
        TimeRange::Today => date == today,
        TimeRange::ThisWeek => week::same_week(date, today, week_start),
        TimeRange::ThisMonth => week::same_month(date, today),
        TimeRange::NextWeek => today
            .checked_add_days(Days::new(7))
            .is_some_and(|next| week::same_week(date, next, week_start)),
    }
}

/// Search followed by filter: the view shown for the current criteria
pub fn apply_criteria(
    sessions: &[Session],
    criteria: &FilterCriteria,
    today: NaiveDate,
    week_start: WeekStart,
) -> Vec<Session> {
    filter(
        &search(sessions, &criteria.search_text),
        criteria,
        today,
        week_start,
    )
}

/// Sessions held today, earliest first
pub fn todays_sessions(sessions: &[Session], today: NaiveDate) -> Vec<Session> {
    sessions_by_day(sessions, today)
}

/// The next sessions after today, within the upcoming window.
///
/// Today and the day `UPCOMING_WINDOW_DAYS` ahead are both excluded. Sessions
/// starting at the same instant keep their original relative order.
pub fn upcoming_sessions(sessions: &[Session], today: NaiveDate) -> Vec<Session> {
    let horizon = today
        .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MAX);

    let mut upcoming: Vec<(NaiveDate, &Session)> = sessions
        .iter()
        .filter_map(|session| session.date().map(|date| (date, session)))
        .filter(|(date, _)| *date > today && *date < horizon)
        .collect();

    upcoming.sort_by(|(date_a, a), (date_b, b)| {
        date_a
            .cmp(date_b)
            .then_with(|| a.start_time.cmp(&b.start_time))
    });

    upcoming
        .into_iter()
        .take(UPCOMING_LIMIT)
        .map(|(_, session)| session.clone())
        .collect()
}

/// Summary counts.
///
/// Subject and total counts describe the whole collection (`all`); the today
/// and this-week counts describe the currently visible `view`. Pass the full
/// collection as `view` for unfiltered numbers.
pub fn statistics(
    all: &[Session],
    view: &[Session],
    today: NaiveDate,
    week_start: WeekStart,
) -> Statistics {
    let this_week_sessions = view
        .iter()
        .filter(|session| {
            session
                .date()
                .is_some_and(|date| week::same_week(date, today, week_start))
        })
        .count();

    Statistics {
        unique_subjects: unique_subjects(all).len(),
        total_sessions: all.len(),
        today_sessions: todays_sessions(view, today).len(),
        this_week_sessions,
    }
}

/// Sessions on one calendar day, ordered by start time
pub fn sessions_by_day(sessions: &[Session], date: NaiveDate) -> Vec<Session> {
    let mut day: Vec<Session> = sessions
        .iter()
        .filter(|session| session.date() == Some(date))
        .cloned()
        .collect();
    day.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    day
}

/// Distinct subjects in first-seen order
pub fn unique_subjects(sessions: &[Session]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    sessions
        .iter()
        .filter(|session| seen.insert(session.subject.as_str()))
        .map(|session| session.subject.clone())
        .collect()
}

/// Bucket sessions by date for the calendar; each day is ordered by start time.
/// Sessions without a valid date are left out.
pub fn group_by_day(sessions: &[Session]) -> BTreeMap<NaiveDate, Vec<Session>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
    for session in sessions {
        if let Some(date) = session.date() {
            by_day.entry(date).or_default().push(session.clone());
        }
    }

    for day in by_day.values_mut() {
        day.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    }

    by_day
}
