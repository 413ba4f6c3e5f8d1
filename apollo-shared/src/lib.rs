pub mod models;

pub use models::events::HoldEvent;
pub use models::payments::{CheckoutSeat, CheckoutSession, CheckoutSessionRequest};
pub use models::prices::TicketPriceRow;
pub use models::schedule::{Movie, MovieSummary, Schedule, ScheduleCreate, ScheduleUpdate};
pub use models::seats::{
    BlockSeatRequest, BlockSeatResponse, BlockedSeatsResponse, ReleaseSeatRequest,
    ReleaseSeatResponse, ReleaseSeatsResponse, SeatCoord,
};

use serde::{Deserialize, Serialize};

/// Error body returned by the API (`{"detail": "..."}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}
