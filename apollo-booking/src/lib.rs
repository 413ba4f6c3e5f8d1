//! Shopper side of the seat-hold protocol: seat availability, the hold
//! state machine with its shared countdown, the task that drives it, and
//! the hand-off to payment.

pub mod expiry;
pub mod hold;
pub mod orchestrator;
pub mod scheduler;
pub mod seat_map;

#[cfg(test)]
mod hold_tests;

pub use expiry::{parse_expiry, ExpiryParseError};
pub use hold::{HoldError, HoldManager, HoldPhase, HoldSnapshot, TickOutcome, ToggleOutcome, MAX_SEATS};
pub use orchestrator::{CheckoutOrchestrator, PaymentError, PAYMENT_FALLBACK_MESSAGE};
pub use scheduler::{HoldSession, SchedulerConfig};
pub use seat_map::SeatMap;
