use serde::{Deserialize, Serialize};

/// A seat line inside a checkout-session request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSeat {
    pub row_index: u32,
    pub col_index: u32,
    pub row_label: String,
    pub seat_number: u32,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub price: f64,
}

/// POST /payments/create-checkout-session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    pub schedule_id: i64,
    pub hall: Option<u32>,
    pub seats: Vec<CheckoutSeat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
}

/// Hosted payment session created by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}
