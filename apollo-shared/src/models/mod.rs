pub mod events;
pub mod payments;
pub mod prices;
pub mod schedule;
pub mod seats;
