use apollo_shared::ScheduleCreate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::time::parse_hhmm;

/// A proposed, not yet persisted showtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEntry {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub movie_id: Option<i64>,
    #[serde(default)]
    pub movie_type: Option<String>,
}

impl DraftEntry {
    /// Rows without a movie or a start time are not saved.
    pub fn is_complete(&self) -> bool {
        self.movie_id.is_some() && !self.time.trim().is_empty()
    }
}

/// An admin's in-progress plan: an ordered row list per hall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftPlan {
    halls: BTreeMap<u32, Vec<DraftEntry>>,
}

impl DraftPlan {
    /// Empty plan with a row list for every hall.
    pub fn new(halls: &[u32]) -> Self {
        let mut plan = Self::default();
        plan.ensure_halls(halls);
        plan
    }

    pub fn ensure_halls(&mut self, halls: &[u32]) {
        for hall in halls {
            self.halls.entry(*hall).or_default();
        }
    }

    pub fn rows(&self, hall: u32) -> &[DraftEntry] {
        self.halls.get(&hall).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn halls(&self) -> impl Iterator<Item = u32> + '_ {
        self.halls.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.halls.values().all(Vec::is_empty)
    }

    /// Append a blank row and return its index.
    pub fn add_row(&mut self, hall: u32, default_movie: Option<i64>, movie_type: &str) -> usize {
        let rows = self.halls.entry(hall).or_default();
        rows.push(DraftEntry {
            time: String::new(),
            movie_id: default_movie,
            movie_type: Some(movie_type.to_string()),
        });
        rows.len() - 1
    }

    pub fn push(&mut self, hall: u32, entry: DraftEntry) {
        self.halls.entry(hall).or_default().push(entry);
    }

    pub fn remove_row(&mut self, hall: u32, index: usize) -> Option<DraftEntry> {
        let rows = self.halls.get_mut(&hall)?;
        (index < rows.len()).then(|| rows.remove(index))
    }

    pub fn row_mut(&mut self, hall: u32, index: usize) -> Option<&mut DraftEntry> {
        self.halls.get_mut(&hall)?.get_mut(index)
    }

    /// Order a hall's rows by start time. Rows without a readable time sort
    /// as midnight; ties keep their order.
    pub fn sort_hall(&mut self, hall: u32) {
        if let Some(rows) = self.halls.get_mut(&hall) {
            rows.sort_by_key(|row| parse_hhmm(&row.time).unwrap_or(0));
        }
    }

    /// Drag-and-drop reorder inside one hall.
    pub fn move_row(&mut self, hall: u32, from: usize, to: usize) -> bool {
        let Some(rows) = self.halls.get_mut(&hall) else {
            return false;
        };
        if from == to || from >= rows.len() || to >= rows.len() {
            return false;
        }
        let item = rows.remove(from);
        rows.insert(to, item);
        true
    }

    /// Drop every row, keeping the hall lists.
    pub fn clear(&mut self) {
        for rows in self.halls.values_mut() {
            rows.clear();
        }
    }

    /// Create payloads for the complete rows of the given halls, hall order first.
    pub fn to_payloads(&self, day: NaiveDate, halls: &[u32]) -> Vec<ScheduleCreate> {
        let mut halls = halls.to_vec();
        halls.sort_unstable();
        halls.dedup();

        halls
            .into_iter()
            .flat_map(|hall| {
                self.rows(hall).iter().filter_map(move |row| {
                    let movie_id = row.movie_id?;
                    let time = row.time.trim();
                    if time.is_empty() {
                        return None;
                    }
                    Some(ScheduleCreate {
                        movie_id,
                        date: day,
                        time: time.to_string(),
                        movie_type: row
                            .movie_type
                            .as_deref()
                            .map(str::trim)
                            .filter(|t| !t.is_empty())
                            .map(str::to_string),
                        hall,
                    })
                })
            })
            .collect()
    }
}
