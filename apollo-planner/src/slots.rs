use std::collections::HashSet;

use crate::conflicts::ConflictDetector;
use crate::draft::DraftPlan;
use crate::interval::Interval;
use crate::time::{format_hhmm, parse_hhmm};
use crate::PlannerSettings;

/// Fixed grid of candidate start times offered by the time pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    pub day_start: u32,
    pub day_end: u32,
    pub step: u32,
}

impl SlotGrid {
    pub fn from_settings(settings: &PlannerSettings) -> Self {
        Self {
            day_start: settings.day_start_min,
            day_end: settings.day_end_min,
            step: settings.slot_step_min.max(1),
        }
    }

    /// Every start time from day start to day end inclusive.
    pub fn candidates(&self) -> Vec<String> {
        (self.day_start..=self.day_end)
            .step_by(self.step as usize)
            .map(format_hhmm)
            .collect()
    }
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self::from_settings(&PlannerSettings::default())
    }
}

impl ConflictDetector {
    /// Start times a draft row may pick. The row's current time is always
    /// offered. Times already taken in the hall are dropped, and once a movie
    /// is chosen so is every time whose screening would overlap.
    pub fn available_times_for_row(
        &self,
        grid: &SlotGrid,
        plan: &DraftPlan,
        hall: u32,
        index: usize,
        current_time: Option<&str>,
    ) -> Vec<String> {
        let rows = plan.rows(hall);

        let mut used: HashSet<String> = self.used_existing_times(hall, None);
        used.extend(
            rows.iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, r)| r.time.trim().to_string())
                .filter(|t| !t.is_empty()),
        );

        let duration = rows.get(index).and_then(|row| self.movie_duration(row.movie_id));

        let mut taken: Vec<Interval> = self.blocks_for_hall(hall).into_iter().map(|b| b.interval).collect();
        taken.extend(
            rows.iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .filter_map(|(_, r)| self.row_interval(r)),
        );

        self.filter_candidates(grid, current_time, &used, duration, &taken)
    }

    /// Start times an existing showtime may be moved to within `hall`.
    pub fn available_times_for_existing(
        &self,
        grid: &SlotGrid,
        plan: &DraftPlan,
        hall: u32,
        schedule_id: i64,
        current_time: Option<&str>,
    ) -> Vec<String> {
        let rows = plan.rows(hall);

        let mut used = self.used_existing_times(hall, Some(schedule_id));
        used.extend(
            rows.iter()
                .map(|r| r.time.trim().to_string())
                .filter(|t| !t.is_empty()),
        );

        let duration = self
            .schedules()
            .iter()
            .find(|s| s.id == schedule_id)
            .and_then(|s| self.schedule_duration(s));

        let mut taken: Vec<Interval> = self
            .existing_for_hall(hall)
            .filter(|s| s.id != schedule_id)
            .filter_map(|s| self.schedule_interval(s))
            .collect();
        taken.extend(rows.iter().filter_map(|r| self.row_interval(r)));

        self.filter_candidates(grid, current_time, &used, duration, &taken)
    }

    fn used_existing_times(&self, hall: u32, except: Option<i64>) -> HashSet<String> {
        self.existing_for_hall(hall)
            .filter(|s| Some(s.id) != except)
            .map(|s| s.time.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn filter_candidates(
        &self,
        grid: &SlotGrid,
        current_time: Option<&str>,
        used: &HashSet<String>,
        duration: Option<u32>,
        taken: &[Interval],
    ) -> Vec<String> {
        let current = current_time.unwrap_or("");
        grid.candidates()
            .into_iter()
            .filter(|slot| {
                if slot == current {
                    return true;
                }
                if used.contains(slot) {
                    return false;
                }
                let (Some(duration), Some(start)) = (duration, parse_hhmm(slot)) else {
                    return true;
                };
                let candidate = Interval::new(start, duration, self.cleaning_buffer());
                !taken.iter().any(|t| candidate.overlaps(t))
            })
            .collect()
    }
}
