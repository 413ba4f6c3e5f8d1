use apollo_shared::{Schedule, ScheduleCreate};
use chrono::{Days, NaiveDate};
use std::collections::HashSet;

/// Which days receive the copied showtimes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyTargets {
    /// The N days following the source day. N below 1 counts as 1.
    NextDays(u32),
    /// Explicitly picked dates, in the order given. Each must fall within
    /// the request's picker horizon.
    Dates(Vec<NaiveDate>),
}

#[derive(Debug, Clone)]
pub struct CopyRequest {
    pub source_day: NaiveDate,
    pub halls: Vec<u32>,
    pub targets: CopyTargets,
    pub skip_duplicates: bool,
    /// How many days after the source day may be picked as targets.
    pub picker_days: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CopyError {
    #[error("Select at least one hall to copy")]
    NoHalls,

    #[error("Select at least one target day")]
    NoTargets,

    #[error("{0} is not within the next {1} days")]
    TargetOutOfRange(NaiveDate, u32),

    #[error("No showtimes on {0} to copy")]
    NoSourceShowtimes(NaiveDate),

    #[error("Nothing to copy (duplicates or incomplete showtimes)")]
    NothingToCopy,
}

/// The `count` days after `day`, nearest first.
pub fn upcoming_days(day: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (1..=count as u64)
        .filter_map(|offset| day.checked_add_days(Days::new(offset)))
        .collect()
}

/// Build create payloads that replicate the source day's showtimes in the
/// chosen halls onto the target days.
///
/// Target days are not checked for overlaps, only for exact
/// `(date, hall, time)` duplicates when `skip_duplicates` is set.
pub fn plan_copy(schedules: &[Schedule], request: &CopyRequest) -> Result<Vec<ScheduleCreate>, CopyError> {
    if request.halls.is_empty() {
        return Err(CopyError::NoHalls);
    }

    let targets = match &request.targets {
        CopyTargets::NextDays(n) => upcoming_days(request.source_day, (*n).max(1)),
        CopyTargets::Dates(dates) if dates.is_empty() => return Err(CopyError::NoTargets),
        CopyTargets::Dates(dates) => {
            let offered = upcoming_days(request.source_day, request.picker_days);
            if let Some(date) = dates.iter().find(|d| !offered.contains(d)) {
                return Err(CopyError::TargetOutOfRange(*date, request.picker_days));
            }
            dates.clone()
        }
    };

    let source: Vec<&Schedule> = schedules
        .iter()
        .filter(|s| s.date == request.source_day)
        .filter(|s| s.hall.is_some_and(|h| request.halls.contains(&h)))
        .collect();
    if source.is_empty() {
        return Err(CopyError::NoSourceShowtimes(request.source_day));
    }

    let existing: HashSet<(NaiveDate, u32, &str)> = schedules
        .iter()
        .filter_map(|s| Some((s.date, s.hall?, s.start_time())))
        .collect();

    let mut seen: HashSet<(NaiveDate, u32, String)> = HashSet::new();
    let mut payloads = Vec::new();

    for target in targets {
        for schedule in &source {
            let (Some(hall), time) = (schedule.hall, schedule.start_time()) else {
                continue;
            };
            if time.is_empty() {
                continue;
            }
            if request.skip_duplicates
                && (existing.contains(&(target, hall, time)) || seen.contains(&(target, hall, time.to_string())))
            {
                continue;
            }
            let Some(movie_id) = schedule.movie_id() else {
                continue;
            };

            payloads.push(ScheduleCreate {
                movie_id,
                date: target,
                time: time.to_string(),
                movie_type: schedule
                    .movie_type
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
                hall,
            });
            seen.insert((target, hall, time.to_string()));
        }
    }

    if payloads.is_empty() {
        return Err(CopyError::NothingToCopy);
    }

    tracing::info!(
        source_day = %request.source_day,
        count = payloads.len(),
        "Planned showtime copy"
    );
    Ok(payloads)
}
