pub mod clock;
pub mod gateway;
pub mod payment;
pub mod session;

pub use clock::{Clock, FixedClock, SystemClock};
pub use gateway::{GatewayError, GatewayResult, PriceListGateway, ScheduleGateway, SeatHoldGateway};
pub use payment::{MockPaymentGateway, PaymentGateway};
pub use session::SessionStore;
