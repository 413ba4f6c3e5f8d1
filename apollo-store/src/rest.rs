//! HTTP client for the cinema ticketing API.

use apollo_core::{
    GatewayError, GatewayResult, PaymentGateway, PriceListGateway, ScheduleGateway, SeatHoldGateway,
    SessionStore,
};
use apollo_shared::{
    ApiErrorBody, BlockSeatRequest, BlockSeatResponse, BlockedSeatsResponse, CheckoutSession,
    CheckoutSessionRequest, Movie, ReleaseSeatRequest, ReleaseSeatResponse, ReleaseSeatsResponse, Schedule,
    ScheduleCreate, ScheduleUpdate, SeatCoord, TicketPriceRow,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::ApiConfig;

/// Implements every gateway over one base URL. The bearer token is read from
/// the session store on each request.
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl RestClient {
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, &config.base_url, session))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        tracing::debug!(%method, path, "API request");
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: reqwest::RequestBuilder) -> GatewayResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let response = Self::ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Map a non-2xx response to [`GatewayError::Api`], keeping the server's
    /// `detail` message when the body carries one.
    async fn ensure_success(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail);
        tracing::debug!(status = status.as_u16(), ?detail, "API error response");
        Err(GatewayError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl SeatHoldGateway for RestClient {
    async fn block_seat(&self, schedule_id: i64, seat: SeatCoord) -> GatewayResult<BlockSeatResponse> {
        let path = format!("/movie/schedules/{}/block-seat", schedule_id);
        Self::send(self.request(Method::POST, &path).json(&BlockSeatRequest::from(seat))).await
    }

    async fn release_seat(&self, schedule_id: i64, seat: SeatCoord) -> GatewayResult<ReleaseSeatResponse> {
        let path = format!("/movie/schedules/{}/release-seat", schedule_id);
        Self::send(self.request(Method::POST, &path).json(&ReleaseSeatRequest::from(seat))).await
    }

    async fn release_seats(
        &self,
        schedule_id: i64,
        seats: &[SeatCoord],
    ) -> GatewayResult<ReleaseSeatsResponse> {
        let path = format!("/movie/schedules/{}/release-seats", schedule_id);
        Self::send(self.request(Method::POST, &path).json(seats)).await
    }

    async fn blocked_seats(&self, schedule_id: i64) -> GatewayResult<Vec<SeatCoord>> {
        let path = format!("/movie/schedules/{}/blocked-seats", schedule_id);
        let response: BlockedSeatsResponse = Self::send(self.request(Method::GET, &path)).await?;
        Ok(response.blocked_seats)
    }
}

#[async_trait]
impl ScheduleGateway for RestClient {
    async fn list_movies(&self) -> GatewayResult<Vec<Movie>> {
        Self::send(self.request(Method::GET, "/movie/movies")).await
    }

    async fn list_schedules(&self) -> GatewayResult<Vec<Schedule>> {
        Self::send(self.request(Method::GET, "/movie/get-schedules")).await
    }

    async fn get_schedule(&self, schedule_id: i64) -> GatewayResult<Schedule> {
        let path = format!("/movie/schedules/{}", schedule_id);
        Self::send(self.request(Method::GET, &path)).await
    }

    async fn create_schedule(&self, schedule: &ScheduleCreate) -> GatewayResult<Schedule> {
        Self::send(self.request(Method::POST, "/movie/schedules").json(schedule)).await
    }

    async fn update_schedule(&self, schedule_id: i64, update: &ScheduleUpdate) -> GatewayResult<Schedule> {
        let path = format!("/movie/schedules/{}", schedule_id);
        Self::send(self.request(Method::PATCH, &path).json(update)).await
    }
}

#[async_trait]
impl PriceListGateway for RestClient {
    async fn ticket_prices(&self) -> GatewayResult<Vec<TicketPriceRow>> {
        Self::send(self.request(Method::GET, "/general/ticket-prices")).await
    }
}

#[async_trait]
impl PaymentGateway for RestClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> GatewayResult<CheckoutSession> {
        Self::send(self.request(Method::POST, "/payments/create-checkout-session").json(request)).await
    }
}
