pub mod checkout;
pub mod pricing;

pub use checkout::{row_label, CheckoutCart, CheckoutError, CheckoutItem};
pub use pricing::{PriceTable, PriceTier, PricingEngine, Quote};
