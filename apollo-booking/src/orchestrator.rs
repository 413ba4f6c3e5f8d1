use apollo_catalog::CheckoutCart;
use apollo_core::PaymentGateway;
use apollo_shared::CheckoutSession;
use std::sync::Arc;

/// Shown when the API gives no reason of its own.
pub const PAYMENT_FALLBACK_MESSAGE: &str = "Could not start the payment. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("No tickets to pay for")]
    EmptyCart,

    /// Message for the shopper, already resolved to server detail or fallback.
    #[error("{0}")]
    Failed(String),
}

/// Hands a priced cart to the payment provider. Failures are reported once,
/// never retried.
pub struct CheckoutOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    pub async fn start_payment(
        &self,
        cart: &CheckoutCart,
        schedule_id: i64,
        hall: Option<u32>,
    ) -> Result<CheckoutSession, PaymentError> {
        if cart.items().is_empty() {
            return Err(PaymentError::EmptyCart);
        }

        let request = cart.to_session_request(schedule_id, hall);
        match self.gateway.create_checkout_session(&request).await {
            Ok(session) => {
                tracing::info!(
                    schedule_id,
                    seats = request.seats.len(),
                    total = cart.total(),
                    "Checkout session {} created",
                    session.id
                );
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(schedule_id, "Checkout session failed: {}", e);
                Err(PaymentError::Failed(e.user_message(PAYMENT_FALLBACK_MESSAGE)))
            }
        }
    }
}
