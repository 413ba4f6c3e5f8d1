use apollo_shared::{Movie, Schedule, ScheduleCreate, ScheduleUpdate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::draft::{DraftEntry, DraftPlan};
use crate::interval::Interval;
use crate::time::{format_hhmm, parse_duration, parse_hhmm};
use crate::PlannerSettings;

/// A persisted showtime as it occupies its hall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: i64,
    pub interval: Interval,
    pub label: String,
}

/// What a draft row collides with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictWith {
    DraftRow { index: usize },
    Existing { schedule_id: i64, label: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub hall: u32,
    pub row: usize,
    pub with: ConflictWith,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.with {
            ConflictWith::DraftRow { index } => {
                write!(f, "hall {}: row {} overlaps row {}", self.hall, self.row + 1, index + 1)
            }
            ConflictWith::Existing { schedule_id, label } => write!(
                f,
                "hall {}: row {} overlaps showtime #{} ({})",
                self.hall,
                self.row + 1,
                schedule_id,
                label
            ),
        }
    }
}

/// Proposed change to a persisted showtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingEdit {
    pub time: String,
    pub movie_type: Option<String>,
    pub hall: Option<u32>,
}

impl ExistingEdit {
    pub fn from_schedule(schedule: &Schedule, default_movie_type: &str) -> Self {
        Self {
            time: schedule.time.clone(),
            movie_type: Some(
                schedule
                    .movie_type
                    .clone()
                    .unwrap_or_else(|| default_movie_type.to_string()),
            ),
            hall: schedule.hall,
        }
    }

    pub fn to_update(&self) -> ScheduleUpdate {
        ScheduleUpdate {
            time: Some(self.time.trim().to_string()),
            movie_type: self.movie_type.clone().filter(|t| !t.trim().is_empty()),
            hall: self.hall,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("No showtimes to save")]
    EmptyPlan,

    #[error("Cannot save: {} time conflict(s) in the plan", .0.len())]
    Conflicts(Vec<Conflict>),

    #[error("Time conflict while editing showtime #{schedule_id}")]
    EditConflict { schedule_id: i64 },

    #[error("Unknown showtime #{0}")]
    UnknownSchedule(i64),
}

/// Overlap checks for one day's plan against the showtimes already stored.
pub struct ConflictDetector {
    day: NaiveDate,
    halls: Vec<u32>,
    cleaning_buffer: u32,
    durations: HashMap<i64, Option<u32>>,
    schedules: Vec<Schedule>,
}

impl ConflictDetector {
    pub fn new(movies: &[Movie], schedules: Vec<Schedule>, day: NaiveDate, settings: &PlannerSettings) -> Self {
        let durations = movies
            .iter()
            .map(|m| (m.id, parse_duration(&m.duration)))
            .collect();

        Self {
            day,
            halls: settings.halls.clone(),
            cleaning_buffer: settings.cleaning_buffer_min,
            durations,
            schedules,
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn halls(&self) -> &[u32] {
        &self.halls
    }

    pub fn cleaning_buffer(&self) -> u32 {
        self.cleaning_buffer
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    pub fn movie_duration(&self, movie_id: Option<i64>) -> Option<u32> {
        self.durations.get(&movie_id?).copied().flatten()
    }

    /// Runtime of a persisted showtime: the embedded movie's duration when
    /// the payload carries one, the catalogue's otherwise.
    pub fn schedule_duration(&self, schedule: &Schedule) -> Option<u32> {
        match schedule.movie.as_ref().and_then(|m| m.duration.as_deref()) {
            Some(duration) => parse_duration(duration),
            None => self.movie_duration(schedule.movie_id()),
        }
    }

    pub fn schedule_interval(&self, schedule: &Schedule) -> Option<Interval> {
        let start = parse_hhmm(&schedule.time)?;
        let duration = self.schedule_duration(schedule)?;
        Some(Interval::new(start, duration, self.cleaning_buffer))
    }

    pub fn row_interval(&self, row: &DraftEntry) -> Option<Interval> {
        let start = parse_hhmm(&row.time)?;
        let duration = self.movie_duration(row.movie_id)?;
        Some(Interval::new(start, duration, self.cleaning_buffer))
    }

    /// Persisted showtimes on this day in the given hall.
    pub fn existing_for_hall(&self, hall: u32) -> impl Iterator<Item = &Schedule> + '_ {
        self.schedules
            .iter()
            .filter(move |s| s.date == self.day && s.hall == Some(hall))
    }

    /// Same as [`existing_for_hall`](Self::existing_for_hall), by start time
    /// and then title.
    pub fn existing_for_hall_sorted(&self, hall: u32) -> Vec<&Schedule> {
        let mut list: Vec<&Schedule> = self.existing_for_hall(hall).collect();
        list.sort_by(|a, b| {
            let ta = parse_hhmm(&a.time).unwrap_or(0);
            let tb = parse_hhmm(&b.time).unwrap_or(0);
            ta.cmp(&tb).then_with(|| a.title().cmp(b.title()))
        });
        list
    }

    /// Occupied spans per configured hall. Showtimes without a readable
    /// time or runtime, or in an unknown hall, are left out.
    pub fn existing_blocks(&self) -> BTreeMap<u32, Vec<Block>> {
        let mut blocks: BTreeMap<u32, Vec<Block>> = self.halls.iter().map(|h| (*h, Vec::new())).collect();

        for schedule in self.schedules.iter().filter(|s| s.date == self.day) {
            let Some(hall) = schedule.hall else {
                continue;
            };
            let Some(interval) = self.schedule_interval(schedule) else {
                continue;
            };
            let Some(list) = blocks.get_mut(&hall) else {
                continue;
            };
            let label = format!(
                "{}–{} {}",
                format_hhmm(interval.start),
                format_hhmm(interval.end),
                schedule.title()
            )
            .trim()
            .to_string();
            list.push(Block { id: schedule.id, interval, label });
        }

        blocks
    }

    pub(crate) fn blocks_for_hall(&self, hall: u32) -> Vec<Block> {
        self.existing_blocks().remove(&hall).unwrap_or_default()
    }

    pub fn row_conflicts_within_plan(&self, plan: &DraftPlan, hall: u32, index: usize) -> bool {
        !self.plan_collisions(plan, hall, index).is_empty()
    }

    pub fn row_conflicts_with_existing(&self, plan: &DraftPlan, hall: u32, index: usize) -> bool {
        !self.existing_collisions(plan, hall, index, &self.blocks_for_hall(hall)).is_empty()
    }

    pub fn has_any_conflicts(&self, plan: &DraftPlan) -> bool {
        !self.find_conflicts(plan).is_empty()
    }

    /// Every collision of a draft row with another draft row (reported once
    /// per pair) or with a persisted showtime in the same hall.
    pub fn find_conflicts(&self, plan: &DraftPlan) -> Vec<Conflict> {
        let blocks = self.existing_blocks();
        let mut conflicts = Vec::new();

        for hall in &self.halls {
            let hall_blocks = blocks.get(hall).map(Vec::as_slice).unwrap_or(&[]);
            for index in 0..plan.rows(*hall).len() {
                for other in self.plan_collisions(plan, *hall, index) {
                    if other > index {
                        conflicts.push(Conflict {
                            hall: *hall,
                            row: index,
                            with: ConflictWith::DraftRow { index: other },
                        });
                    }
                }
                for block in self.existing_collisions(plan, *hall, index, hall_blocks) {
                    conflicts.push(Conflict {
                        hall: *hall,
                        row: index,
                        with: ConflictWith::Existing {
                            schedule_id: block.id,
                            label: block.label.clone(),
                        },
                    });
                }
            }
        }

        conflicts
    }

    /// Gate for saving a plan: the payloads to create, or why nothing may be
    /// saved. A plan with any conflict is rejected as a whole.
    pub fn validate_save(&self, plan: &DraftPlan) -> Result<Vec<ScheduleCreate>, PlanError> {
        let payloads = plan.to_payloads(self.day, &self.halls);
        if payloads.is_empty() {
            return Err(PlanError::EmptyPlan);
        }

        let conflicts = self.find_conflicts(plan);
        if !conflicts.is_empty() {
            tracing::warn!(day = %self.day, conflicts = conflicts.len(), "Plan rejected");
            return Err(PlanError::Conflicts(conflicts));
        }

        Ok(payloads)
    }

    /// Checks an edit of a persisted showtime against the other showtimes in
    /// the target hall and that hall's draft rows.
    pub fn check_edit(&self, schedule_id: i64, edit: &ExistingEdit, plan: &DraftPlan) -> Result<(), PlanError> {
        let schedule = self
            .schedules
            .iter()
            .find(|s| s.id == schedule_id)
            .ok_or(PlanError::UnknownSchedule(schedule_id))?;

        let hall = self.edit_hall(schedule, edit);
        let (Some(start), Some(duration)) = (parse_hhmm(&edit.time), self.schedule_duration(schedule)) else {
            return Ok(());
        };
        let current = Interval::new(start, duration, self.cleaning_buffer);

        let hits_existing = self
            .existing_for_hall(hall)
            .filter(|other| other.id != schedule_id)
            .filter_map(|other| self.schedule_interval(other))
            .any(|other| current.overlaps(&other));

        let hits_plan = plan
            .rows(hall)
            .iter()
            .filter_map(|row| self.row_interval(row))
            .any(|row| current.overlaps(&row));

        if hits_existing || hits_plan {
            tracing::warn!(schedule_id, hall, time = %edit.time, "Edit rejected");
            return Err(PlanError::EditConflict { schedule_id });
        }
        Ok(())
    }

    /// Hall an edit targets, falling back to the showtime's own hall and
    /// then the first configured hall.
    pub fn edit_hall(&self, schedule: &Schedule, edit: &ExistingEdit) -> u32 {
        edit.hall
            .or(schedule.hall)
            .or_else(|| self.halls.first().copied())
            .unwrap_or(1)
    }

    /// `"10:00–11:45 (incl. +15 min cleaning)"`, or `None` while the row
    /// lacks a time or a movie with a known runtime.
    pub fn end_label(&self, row: &DraftEntry) -> Option<String> {
        let interval = self.row_interval(row)?;
        Some(format!(
            "{}–{} (incl. +{} min cleaning)",
            format_hhmm(interval.start),
            format_hhmm(interval.end),
            self.cleaning_buffer
        ))
    }

    fn plan_collisions(&self, plan: &DraftPlan, hall: u32, index: usize) -> Vec<usize> {
        let rows = plan.rows(hall);
        let Some(current) = rows.get(index).and_then(|row| self.row_interval(row)) else {
            return Vec::new();
        };
        rows.iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .filter_map(|(i, row)| self.row_interval(row).map(|iv| (i, iv)))
            .filter(|(_, iv)| current.overlaps(iv))
            .map(|(i, _)| i)
            .collect()
    }

    fn existing_collisions<'b>(&self, plan: &DraftPlan, hall: u32, index: usize, blocks: &'b [Block]) -> Vec<&'b Block> {
        let Some(current) = plan.rows(hall).get(index).and_then(|row| self.row_interval(row)) else {
            return Vec::new();
        };
        blocks.iter().filter(|b| current.overlaps(&b.interval)).collect()
    }
}
