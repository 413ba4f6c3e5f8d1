use apollo_shared::{
    BlockSeatResponse, Movie, ReleaseSeatResponse, ReleaseSeatsResponse, Schedule, ScheduleCreate,
    ScheduleUpdate, SeatCoord, TicketPriceRow,
};
use async_trait::async_trait;

/// Failure talking to the ticketing API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Api { status: u16, detail: Option<String> },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Message to show a user: the server's `detail` verbatim when it sent
    /// one, otherwise the caller's generic fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            GatewayError::Api { detail: Some(detail), .. } if !detail.trim().is_empty() => {
                detail.clone()
            }
            _ => fallback.to_string(),
        }
    }

    /// True for 409 responses (seat already held or sold).
    pub fn is_conflict(&self) -> bool {
        matches!(self, GatewayError::Api { status: 409, .. })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Server-side seat holds for one schedule.
#[async_trait]
pub trait SeatHoldGateway: Send + Sync {
    async fn block_seat(&self, schedule_id: i64, seat: SeatCoord) -> GatewayResult<BlockSeatResponse>;

    async fn release_seat(&self, schedule_id: i64, seat: SeatCoord) -> GatewayResult<ReleaseSeatResponse>;

    async fn release_seats(
        &self,
        schedule_id: i64,
        seats: &[SeatCoord],
    ) -> GatewayResult<ReleaseSeatsResponse>;

    /// Authoritative set of seats currently held by any shopper.
    async fn blocked_seats(&self, schedule_id: i64) -> GatewayResult<Vec<SeatCoord>>;
}

/// Movies and showtimes, used by the admin planner.
#[async_trait]
pub trait ScheduleGateway: Send + Sync {
    async fn list_movies(&self) -> GatewayResult<Vec<Movie>>;

    async fn list_schedules(&self) -> GatewayResult<Vec<Schedule>>;

    async fn get_schedule(&self, schedule_id: i64) -> GatewayResult<Schedule>;

    async fn create_schedule(&self, schedule: &ScheduleCreate) -> GatewayResult<Schedule>;

    async fn update_schedule(&self, schedule_id: i64, update: &ScheduleUpdate) -> GatewayResult<Schedule>;
}

#[async_trait]
pub trait PriceListGateway: Send + Sync {
    async fn ticket_prices(&self) -> GatewayResult<Vec<TicketPriceRow>>;
}
