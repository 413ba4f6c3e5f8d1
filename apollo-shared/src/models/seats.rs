use serde::{Deserialize, Serialize};
use std::fmt;

/// A seat position inside a schedule's seat matrix.
///
/// On the wire a coordinate is a two-element array `[row, col]`, which is the
/// shape used by bulk release and blocked-seat queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct SeatCoord {
    pub row: u32,
    pub col: u32,
}

impl SeatCoord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl From<(u32, u32)> for SeatCoord {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

impl From<SeatCoord> for (u32, u32) {
    fn from(seat: SeatCoord) -> Self {
        (seat.row, seat.col)
    }
}

impl fmt::Display for SeatCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// POST /movie/schedules/{id}/block-seat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSeatRequest {
    pub row: u32,
    pub col: u32,
}

impl From<SeatCoord> for BlockSeatRequest {
    fn from(seat: SeatCoord) -> Self {
        Self { row: seat.row, col: seat.col }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSeatResponse {
    pub status: String,
    /// Raw expiry timestamp as sent by the server; parsed by the hold manager.
    pub expires: String,
}

/// POST /movie/schedules/{id}/release-seat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSeatRequest {
    pub row: u32,
    pub col: u32,
}

impl From<SeatCoord> for ReleaseSeatRequest {
    fn from(seat: SeatCoord) -> Self {
        Self { row: seat.row, col: seat.col }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSeatResponse {
    pub status: String,
}

/// Response of POST /movie/schedules/{id}/release-seats. The request body is a
/// bare `[[row, col], ...]` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSeatsResponse {
    pub released: u32,
}

/// GET /movie/schedules/{id}/blocked-seats
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockedSeatsResponse {
    #[serde(default)]
    pub blocked_seats: Vec<SeatCoord>,
}
