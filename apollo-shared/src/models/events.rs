use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::seats::SeatCoord;

/// Events published by a shopper's hold session.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HoldEvent {
    SeatHeld {
        session_id: Uuid,
        schedule_id: i64,
        seat: SeatCoord,
        expires_at: Option<DateTime<Utc>>,
    },
    SeatReleased {
        session_id: Uuid,
        schedule_id: i64,
        seat: SeatCoord,
    },
    HoldFailed {
        session_id: Uuid,
        schedule_id: i64,
        seat: SeatCoord,
        reason: String,
    },
    SeatLimitReached {
        session_id: Uuid,
        max_seats: usize,
    },
    BlockedSeatsRefreshed {
        session_id: Uuid,
        schedule_id: i64,
        blocked: usize,
    },
    CountdownTick {
        session_id: Uuid,
        remaining_secs: i64,
    },
    HoldExpired {
        session_id: Uuid,
        schedule_id: i64,
        released: Vec<SeatCoord>,
    },
}
