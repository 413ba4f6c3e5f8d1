use apollo_shared::{CheckoutSession, CheckoutSessionRequest};
use async_trait::async_trait;

use crate::gateway::GatewayResult;

/// Hosted checkout provider, reached through the ticketing API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment session for the given seats. The API releases the
    /// seat holds itself once the payment is confirmed.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> GatewayResult<CheckoutSession>;
}

/// Payment gateway that accepts every request, for local runs without a
/// payment provider.
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> GatewayResult<CheckoutSession> {
        let id = format!("mock_cs_{}", uuid::Uuid::new_v4().simple());
        tracing::info!(
            schedule_id = request.schedule_id,
            seats = request.seats.len(),
            "Mock checkout session {}",
            id
        );
        Ok(CheckoutSession {
            url: format!("https://checkout.invalid/{}", id),
            id,
        })
    }
}
