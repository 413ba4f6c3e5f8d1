use apollo_shared::SeatCoord;
use std::collections::HashSet;

/// Venue layout for one hall plus the seats currently held by anyone.
#[derive(Debug, Clone, Default)]
pub struct SeatMap {
    /// `layout[row][col]` is false where there is no seat (aisle, broken seat).
    layout: Vec<Vec<bool>>,
    blocked: HashSet<SeatCoord>,
}

impl SeatMap {
    pub fn new(layout: Vec<Vec<bool>>) -> Self {
        Self {
            layout,
            blocked: HashSet::new(),
        }
    }

    /// Rectangular hall with the listed positions missing.
    pub fn with_dimensions(rows: u32, cols: u32, unavailable: &[SeatCoord]) -> Self {
        let layout = (0..rows)
            .map(|r| {
                (0..cols)
                    .map(|c| !unavailable.contains(&SeatCoord::new(r, c)))
                    .collect()
            })
            .collect();
        Self::new(layout)
    }

    pub fn rows(&self) -> u32 {
        self.layout.len() as u32
    }

    pub fn cols(&self, row: u32) -> u32 {
        self.layout.get(row as usize).map_or(0, |r| r.len() as u32)
    }

    /// True if the layout has a seat at this position. Out of range is false.
    pub fn exists(&self, row: u32, col: u32) -> bool {
        self.layout
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_blocked(&self, row: u32, col: u32) -> bool {
        self.blocked.contains(&SeatCoord::new(row, col))
    }

    pub fn is_seat_available(&self, row: u32, col: u32) -> bool {
        self.exists(row, col) && !self.is_blocked(row, col)
    }

    /// Swap in the server's blocked set wholesale.
    pub fn replace_blocked(&mut self, blocked: impl IntoIterator<Item = SeatCoord>) {
        self.blocked = blocked.into_iter().collect();
    }

    pub fn blocked(&self) -> &HashSet<SeatCoord> {
        &self.blocked
    }

    pub fn available_count(&self) -> usize {
        self.layout
            .iter()
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(c, seat)| **seat && !self.is_blocked(r as u32, *c as u32))
                    .count()
            })
            .sum()
    }
}
