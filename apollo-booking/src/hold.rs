use apollo_catalog::{CheckoutCart, CheckoutError, PricingEngine};
use apollo_core::{Clock, GatewayResult, SeatHoldGateway};
use apollo_shared::{HoldEvent, SeatCoord};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::expiry::parse_expiry;
use crate::seat_map::SeatMap;

/// Most seats one shopper may hold at a time.
pub const MAX_SEATS: usize = 10;

const HOLD_FAILED: &str = "Seat could not be held";
const SEAT_TAKEN: &str = "Seat was just taken by another customer";

/// Lifecycle of one shopper's seat selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPhase {
    Idle,
    Selecting,
    HoldPending,
    Held,
    Paying,
    Expired,
    Deselected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// Server accepted the hold. `expires_at` is the new shared deadline.
    Held { expires_at: Option<DateTime<Utc>> },
    /// Server refused or was unreachable. The seat stays selected locally
    /// and the blocked set has been resynced.
    HoldFailed { reason: String },
    Released,
    /// Seat does not exist or someone else holds it.
    NotSelectable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No countdown running.
    Inactive,
    Remaining(i64),
    /// Deadline passed; these seats were released in bulk.
    Expired(Vec<SeatCoord>),
}

#[derive(Debug, thiserror::Error)]
pub enum HoldError {
    #[error("You can select at most {max} seats")]
    SeatLimit { max: usize },

    #[error("No seats selected")]
    EmptySelection,

    #[error("Cannot {action} while {phase:?}")]
    InvalidPhase { action: &'static str, phase: HoldPhase },

    #[error("Hold session closed")]
    SessionClosed,

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

/// Point-in-time view of a hold session.
#[derive(Debug, Clone, Serialize)]
pub struct HoldSnapshot {
    pub session_id: Uuid,
    pub schedule_id: i64,
    pub phase: HoldPhase,
    pub selected: Vec<SeatCoord>,
    pub blocked: Vec<SeatCoord>,
    pub expires_at: Option<DateTime<Utc>>,
    pub remaining_secs: Option<i64>,
    pub session_expired: bool,
}

/// Seat selection for one shopper and one showtime.
///
/// Every held seat shares a single deadline: the expiry returned by the most
/// recent successful hold. When it passes, the whole selection is released at
/// once.
pub struct HoldManager {
    session_id: Uuid,
    schedule_id: i64,
    gateway: Arc<dyn SeatHoldGateway>,
    clock: Arc<dyn Clock>,
    seat_map: SeatMap,
    selected: Vec<SeatCoord>,
    expires_at: Option<DateTime<Utc>>,
    session_expired: bool,
    phase: HoldPhase,
    max_seats: usize,
    cart: Option<CheckoutCart>,
    events: broadcast::Sender<HoldEvent>,
}

impl HoldManager {
    pub fn new(
        schedule_id: i64,
        seat_map: SeatMap,
        gateway: Arc<dyn SeatHoldGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            session_id: Uuid::new_v4(),
            schedule_id,
            gateway,
            clock,
            seat_map,
            selected: Vec::new(),
            expires_at: None,
            session_expired: false,
            phase: HoldPhase::Idle,
            max_seats: MAX_SEATS,
            cart: None,
            events,
        }
    }

    pub fn with_max_seats(mut self, max_seats: usize) -> Self {
        self.max_seats = max_seats;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn schedule_id(&self) -> i64 {
        self.schedule_id
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn selected(&self) -> &[SeatCoord] {
        &self.selected
    }

    pub fn seat_map(&self) -> &SeatMap {
        &self.seat_map
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn session_expired(&self) -> bool {
        self.session_expired
    }

    pub fn is_countdown_active(&self) -> bool {
        self.expires_at.is_some()
    }

    pub fn cart(&self) -> Option<&CheckoutCart> {
        self.cart.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HoldEvent> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<HoldEvent> {
        self.events.clone()
    }

    pub fn is_selected(&self, seat: SeatCoord) -> bool {
        self.selected.contains(&seat)
    }

    /// A seat can be picked if it is free, or if it is already ours (our own
    /// holds show up in the server's blocked set too).
    pub fn is_selectable(&self, seat: SeatCoord) -> bool {
        self.seat_map.is_seat_available(seat.row, seat.col) || self.is_selected(seat)
    }

    /// Seconds left on the shared countdown, rounded up, never negative.
    pub fn remaining(&self) -> Option<i64> {
        self.expires_at.map(|deadline| {
            let millis = (deadline - self.clock.now()).num_milliseconds();
            (millis + 999).div_euclid(1000).max(0)
        })
    }

    pub fn snapshot(&self) -> HoldSnapshot {
        let mut blocked: Vec<SeatCoord> = self.seat_map.blocked().iter().copied().collect();
        blocked.sort();
        HoldSnapshot {
            session_id: self.session_id,
            schedule_id: self.schedule_id,
            phase: self.phase,
            selected: self.selected.clone(),
            blocked,
            expires_at: self.expires_at,
            remaining_secs: self.remaining(),
            session_expired: self.session_expired,
        }
    }

    /// Select or deselect a seat.
    pub async fn toggle_seat(&mut self, row: u32, col: u32) -> Result<ToggleOutcome, HoldError> {
        let seat = SeatCoord::new(row, col);

        if self.phase == HoldPhase::Paying {
            return Err(HoldError::InvalidPhase { action: "change seats", phase: self.phase });
        }

        if self.is_selected(seat) {
            self.release(seat).await;
            return Ok(ToggleOutcome::Released);
        }

        if !self.is_selectable(seat) {
            tracing::debug!(session_id = %self.session_id, %seat, "Seat not selectable");
            return Ok(ToggleOutcome::NotSelectable);
        }

        if self.selected.len() >= self.max_seats {
            self.emit(HoldEvent::SeatLimitReached {
                session_id: self.session_id,
                max_seats: self.max_seats,
            });
            return Err(HoldError::SeatLimit { max: self.max_seats });
        }

        if self.session_expired {
            tracing::info!(session_id = %self.session_id, "New selection after expiry");
            self.session_expired = false;
        }

        self.selected.push(seat);
        self.phase = HoldPhase::HoldPending;

        Ok(self.hold(seat).await)
    }

    async fn hold(&mut self, seat: SeatCoord) -> ToggleOutcome {
        match self.gateway.block_seat(self.schedule_id, seat).await {
            Ok(response) => {
                match parse_expiry(&response.expires) {
                    Ok(deadline) => self.expires_at = Some(deadline),
                    Err(e) => tracing::warn!(
                        session_id = %self.session_id,
                        "Keeping previous deadline: {}",
                        e
                    ),
                }
                self.phase = HoldPhase::Held;
                tracing::info!(
                    session_id = %self.session_id,
                    schedule_id = self.schedule_id,
                    %seat,
                    expires_at = ?self.expires_at,
                    "Seat held"
                );
                self.emit(HoldEvent::SeatHeld {
                    session_id: self.session_id,
                    schedule_id: self.schedule_id,
                    seat,
                    expires_at: self.expires_at,
                });
                ToggleOutcome::Held { expires_at: self.expires_at }
            }
            Err(e) => {
                let reason = e.user_message(if e.is_conflict() { SEAT_TAKEN } else { HOLD_FAILED });
                tracing::warn!(
                    session_id = %self.session_id,
                    schedule_id = self.schedule_id,
                    %seat,
                    "Hold failed: {}",
                    e
                );
                self.phase = if self.expires_at.is_some() {
                    HoldPhase::Held
                } else {
                    HoldPhase::Selecting
                };
                self.emit(HoldEvent::HoldFailed {
                    session_id: self.session_id,
                    schedule_id: self.schedule_id,
                    seat,
                    reason: reason.clone(),
                });
                self.resync().await;
                ToggleOutcome::HoldFailed { reason }
            }
        }
    }

    async fn release(&mut self, seat: SeatCoord) {
        self.selected.retain(|s| *s != seat);
        if self.selected.is_empty() {
            self.expires_at = None;
            self.phase = HoldPhase::Deselected;
        }

        match self.gateway.release_seat(self.schedule_id, seat).await {
            Ok(_) => tracing::info!(session_id = %self.session_id, %seat, "Seat released"),
            Err(e) => tracing::warn!(session_id = %self.session_id, %seat, "Release failed: {}", e),
        }
        self.emit(HoldEvent::SeatReleased {
            session_id: self.session_id,
            schedule_id: self.schedule_id,
            seat,
        });
        self.resync().await;
    }

    /// Replace the blocked cache with the server's set.
    pub async fn refresh_blocked(&mut self) -> GatewayResult<usize> {
        let blocked = self.gateway.blocked_seats(self.schedule_id).await?;
        let count = blocked.len();
        self.seat_map.replace_blocked(blocked);
        self.emit(HoldEvent::BlockedSeatsRefreshed {
            session_id: self.session_id,
            schedule_id: self.schedule_id,
            blocked: count,
        });
        Ok(count)
    }

    /// Refresh, logging instead of failing. Used after every hold or release
    /// call whatever its outcome.
    pub(crate) async fn resync(&mut self) {
        if let Err(e) = self.refresh_blocked().await {
            tracing::warn!(session_id = %self.session_id, "Blocked seat refresh failed: {}", e);
        }
    }

    /// One countdown step. Expires the selection once the deadline passes.
    pub async fn tick(&mut self) -> TickOutcome {
        let Some(remaining) = self.remaining() else {
            return TickOutcome::Inactive;
        };
        if remaining > 0 {
            self.emit(HoldEvent::CountdownTick {
                session_id: self.session_id,
                remaining_secs: remaining,
            });
            return TickOutcome::Remaining(remaining);
        }
        TickOutcome::Expired(self.expire().await)
    }

    /// Drop the whole selection in one bulk release.
    pub async fn expire(&mut self) -> Vec<SeatCoord> {
        let released = std::mem::take(&mut self.selected);
        self.expires_at = None;
        self.session_expired = true;
        self.phase = HoldPhase::Expired;
        self.cart = None;

        tracing::info!(
            session_id = %self.session_id,
            schedule_id = self.schedule_id,
            seats = released.len(),
            "Hold expired"
        );

        if !released.is_empty() {
            if let Err(e) = self.gateway.release_seats(self.schedule_id, &released).await {
                tracing::warn!(session_id = %self.session_id, "Bulk release failed: {}", e);
            }
        }
        self.emit(HoldEvent::HoldExpired {
            session_id: self.session_id,
            schedule_id: self.schedule_id,
            released: released.clone(),
        });
        self.resync().await;
        released
    }

    /// Freeze the selection into a priced cart. The countdown keeps running.
    pub fn begin_checkout(
        &mut self,
        engine: &PricingEngine,
        date: NaiveDate,
        time: &str,
        default_type: &str,
    ) -> Result<&CheckoutCart, HoldError> {
        match self.phase {
            HoldPhase::Paying | HoldPhase::Expired | HoldPhase::HoldPending => {
                return Err(HoldError::InvalidPhase { action: "start checkout", phase: self.phase });
            }
            _ => {}
        }
        if self.selected.is_empty() {
            return Err(HoldError::EmptySelection);
        }

        let cart = CheckoutCart::new(
            &self.selected,
            default_type,
            date,
            time,
            engine,
            self.clock.local_now(),
        )?;
        self.phase = HoldPhase::Paying;
        Ok(self.cart.insert(cart))
    }

    /// Change one ticket's type and return the new total.
    pub fn set_ticket_type(
        &mut self,
        index: usize,
        ticket_type: &str,
        engine: &PricingEngine,
    ) -> Result<f64, HoldError> {
        let now = self.clock.local_now();
        let phase = self.phase;
        let cart = self
            .cart
            .as_mut()
            .ok_or(HoldError::InvalidPhase { action: "change ticket type", phase })?;
        Ok(cart.set_type(index, ticket_type, engine, now)?)
    }

    /// Leave checkout and go back to the held selection.
    pub fn cancel_checkout(&mut self) {
        if self.phase == HoldPhase::Paying {
            self.cart = None;
            self.phase = HoldPhase::Held;
        }
    }

    /// Payment went through; the server has consumed the holds.
    pub fn complete_payment(&mut self) -> Result<CheckoutCart, HoldError> {
        if self.phase != HoldPhase::Paying {
            return Err(HoldError::InvalidPhase { action: "complete payment", phase: self.phase });
        }
        let cart = self.cart.take().ok_or(HoldError::EmptySelection)?;
        self.selected.clear();
        self.expires_at = None;
        self.phase = HoldPhase::Idle;
        tracing::info!(session_id = %self.session_id, seats = cart.items().len(), "Payment completed");
        Ok(cart)
    }

    fn emit(&self, event: HoldEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
