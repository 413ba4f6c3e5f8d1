//! Showtime planning for theater admins: draft plans per hall, overlap
//! detection against persisted showtimes, start-time pickers and
//! copy-to-days.

pub mod conflicts;
pub mod copy;
pub mod draft;
pub mod interval;
pub mod slots;
pub mod time;

pub use conflicts::{Block, Conflict, ConflictDetector, ConflictWith, ExistingEdit, PlanError};
pub use copy::{plan_copy, upcoming_days, CopyError, CopyRequest, CopyTargets};
pub use draft::{DraftEntry, DraftPlan};
pub use interval::Interval;
pub use slots::SlotGrid;

use serde::{Deserialize, Serialize};

/// Tunables of the admin planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub halls: Vec<u32>,
    /// Minutes the hall stays closed after a screening.
    pub cleaning_buffer_min: u32,
    pub day_start_min: u32,
    pub day_end_min: u32,
    pub slot_step_min: u32,
    /// How many days after the source day the copy picker offers.
    pub picker_days: u32,
    pub default_movie_type: String,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            halls: vec![1, 2, 3, 4],
            cleaning_buffer_min: 15,
            day_start_min: 8 * 60,
            day_end_min: 23 * 60 + 30,
            slot_step_min: 30,
            picker_days: 14,
            default_movie_type: "napisy".to_string(),
        }
    }
}
