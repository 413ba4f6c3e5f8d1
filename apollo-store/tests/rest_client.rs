use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use apollo_core::{PaymentGateway, PriceListGateway, ScheduleGateway, SeatHoldGateway, SessionStore};
use apollo_shared::{CheckoutSessionRequest, ScheduleUpdate, SeatCoord};
use apollo_store::{ApiConfig, RestClient};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Default)]
struct FakeApi {
    held: Mutex<HashSet<(u32, u32)>>,
    last_body: Mutex<Option<Value>>,
    last_auth: Mutex<Option<String>>,
}

type Shared = Arc<FakeApi>;
type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

async fn block_seat(State(api): State<Shared>, Path(_id): Path<i64>, headers: HeaderMap, Json(body): Json<Value>) -> ApiResult {
    *api.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let row = body["row"].as_u64().unwrap() as u32;
    let col = body["col"].as_u64().unwrap() as u32;
    if !api.held.lock().unwrap().insert((row, col)) {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({"detail": "Seat is blocked until 2025-03-15 18:02:00"})),
        ));
    }
    Ok(Json(json!({"status": "blocked", "expires": "2025-03-15 18:02:00.123456"})))
}

async fn release_seat(State(api): State<Shared>, Path(_id): Path<i64>, Json(body): Json<Value>) -> ApiResult {
    let seat = (body["row"].as_u64().unwrap() as u32, body["col"].as_u64().unwrap() as u32);
    if api.held.lock().unwrap().remove(&seat) {
        Ok(Json(json!({"status": "released"})))
    } else {
        Err((StatusCode::NOT_FOUND, Json(json!({"detail": "Seat is not blocked"}))))
    }
}

async fn release_seats(State(api): State<Shared>, Path(_id): Path<i64>, Json(body): Json<Value>) -> Json<Value> {
    let seats: Vec<(u32, u32)> = serde_json::from_value(body.clone()).unwrap();
    *api.last_body.lock().unwrap() = Some(body);
    let mut held = api.held.lock().unwrap();
    let released = seats.iter().filter(|s| held.remove(s)).count();
    Json(json!({"released": released}))
}

async fn blocked_seats(State(api): State<Shared>, Path(_id): Path<i64>) -> Json<Value> {
    let mut seats: Vec<(u32, u32)> = api.held.lock().unwrap().iter().copied().collect();
    seats.sort();
    Json(json!({"blocked_seats": seats}))
}

async fn schedules() -> Json<Value> {
    Json(json!([
        {"id": 1, "movie_id": 3, "date": "2025-03-15", "time": "18:00", "hall": "Sala 2", "movie_type": "napisy"},
        {"id": 2, "date": "2025-03-15", "time": "20:00", "hall": 4,
         "movie": {"id": 5, "title": "Dune", "duration": "2h 46m"}},
        {"id": 3, "movie_id": 3, "date": "2025-03-16", "time": "10:00", "hall": "lobby"}
    ]))
}

async fn get_schedule(Path(id): Path<i64>) -> Result<Json<Value>, (StatusCode, &'static str)> {
    if id == 1 {
        Ok(Json(json!({"id": 1, "movie_id": 3, "date": "2025-03-15", "time": "18:00", "hall": 2})))
    } else {
        Err((StatusCode::NOT_FOUND, "Not Found"))
    }
}

async fn update_schedule(State(api): State<Shared>, Path(id): Path<i64>, Json(body): Json<Value>) -> Json<Value> {
    *api.last_body.lock().unwrap() = Some(body.clone());
    Json(json!({"id": id, "movie_id": 3, "date": "2025-03-15", "time": body["time"], "hall": 2}))
}

async fn ticket_prices() -> Json<Value> {
    Json(json!([
        {"id": 1, "type": "Normalny", "cheap_thursday": "20", "three_days_before": 22,
         "two_days_before": "23,50", "one_day_before": "", "same_day": "25.00"}
    ]))
}

async fn checkout() -> ApiResult {
    Err((StatusCode::BAD_REQUEST, Json(json!({"detail": "Seat (1, 2) is already sold"}))))
}

async fn spawn(api: Shared) -> String {
    let app = Router::new()
        .route("/movie/schedules/{id}/block-seat", post(block_seat))
        .route("/movie/schedules/{id}/release-seat", post(release_seat))
        .route("/movie/schedules/{id}/release-seats", post(release_seats))
        .route("/movie/schedules/{id}/blocked-seats", get(blocked_seats))
        .route("/movie/get-schedules", get(schedules))
        .route("/movie/schedules/{id}", get(get_schedule).patch(update_schedule))
        .route("/general/ticket-prices", get(ticket_prices))
        .route("/payments/create-checkout-session", post(checkout))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

async fn client() -> (RestClient, Shared, Arc<SessionStore>) {
    let api = Shared::default();
    let base_url = spawn(api.clone()).await;
    let session = Arc::new(SessionStore::new());
    let config = ApiConfig { base_url, timeout_secs: 5, token: None };
    (RestClient::new(&config, session.clone()).unwrap(), api, session)
}

#[tokio::test]
async fn test_held_seat_is_reported_as_blocked() {
    let (client, _api, _session) = client().await;

    let response = client.block_seat(9, SeatCoord::new(1, 2)).await.unwrap();
    assert_eq!(response.status, "blocked");
    assert_eq!(response.expires, "2025-03-15 18:02:00.123456");

    let blocked = client.blocked_seats(9).await.unwrap();
    assert_eq!(blocked, vec![SeatCoord::new(1, 2)]);
}

#[tokio::test]
async fn test_second_hold_is_a_conflict_with_detail() {
    let (client, _api, _session) = client().await;
    client.block_seat(9, SeatCoord::new(0, 0)).await.unwrap();

    let err = client.block_seat(9, SeatCoord::new(0, 0)).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.user_message("fallback"), "Seat is blocked until 2025-03-15 18:02:00");
}

#[tokio::test]
async fn test_release_and_bulk_release_payload() {
    let (client, api, _session) = client().await;
    for (r, c) in [(0, 0), (0, 1), (3, 4)] {
        client.block_seat(9, SeatCoord::new(r, c)).await.unwrap();
    }

    client.release_seat(9, SeatCoord::new(0, 0)).await.unwrap();
    let err = client.release_seat(9, SeatCoord::new(0, 0)).await.unwrap_err();
    assert_eq!(err.user_message("fallback"), "Seat is not blocked");

    let released = client
        .release_seats(9, &[SeatCoord::new(0, 1), SeatCoord::new(3, 4)])
        .await
        .unwrap();
    assert_eq!(released.released, 2);
    assert_eq!(api.last_body.lock().unwrap().clone(), Some(json!([[0, 1], [3, 4]])));
    assert!(client.blocked_seats(9).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bearer_token_comes_from_session() {
    let (client, api, session) = client().await;

    client.block_seat(1, SeatCoord::new(0, 0)).await.unwrap();
    assert_eq!(*api.last_auth.lock().unwrap(), None);

    session.start("secret-token");
    client.block_seat(1, SeatCoord::new(0, 1)).await.unwrap();
    assert_eq!(api.last_auth.lock().unwrap().as_deref(), Some("Bearer secret-token"));

    session.clear();
    client.block_seat(1, SeatCoord::new(0, 2)).await.unwrap();
    assert_eq!(*api.last_auth.lock().unwrap(), None);
}

#[tokio::test]
async fn test_schedules_decode_tolerantly() {
    let (client, _api, _session) = client().await;
    let schedules = client.list_schedules().await.unwrap();

    assert_eq!(schedules[0].hall, Some(2));
    assert_eq!(schedules[1].hall, Some(4));
    assert_eq!(schedules[1].movie_id(), Some(5));
    assert_eq!(schedules[1].title(), "Dune");
    assert_eq!(schedules[2].hall, None);
}

#[tokio::test]
async fn test_missing_schedule_without_json_body() {
    let (client, _api, _session) = client().await;
    assert_eq!(client.get_schedule(1).await.unwrap().hall, Some(2));

    let err = client.get_schedule(99).await.unwrap_err();
    assert!(matches!(err, apollo_core::GatewayError::Api { status: 404, detail: None }));
}

#[tokio::test]
async fn test_update_sends_only_changed_fields() {
    let (client, api, _session) = client().await;
    let update = ScheduleUpdate { time: Some("19:30".into()), ..Default::default() };

    let schedule = client.update_schedule(1, &update).await.unwrap();
    assert_eq!(schedule.time, "19:30");
    assert_eq!(api.last_body.lock().unwrap().clone(), Some(json!({"time": "19:30"})));
}

#[tokio::test]
async fn test_ticket_prices_accept_strings_and_numbers() {
    let (client, _api, _session) = client().await;
    let prices = client.ticket_prices().await.unwrap();

    let row = &prices[0];
    assert_eq!(row.ticket_type, "Normalny");
    assert_eq!(row.cheap_thursday, Some(20.0));
    assert_eq!(row.three_days_before, Some(22.0));
    assert_eq!(row.two_days_before, Some(23.5));
    assert_eq!(row.one_day_before, None);
    assert_eq!(row.same_day, Some(25.0));
}

#[tokio::test]
async fn test_payment_error_keeps_server_detail() {
    let (client, _api, _session) = client().await;
    let request = CheckoutSessionRequest {
        schedule_id: 1,
        hall: Some(2),
        seats: vec![],
        success_url: None,
        cancel_url: None,
    };

    let err = client.create_checkout_session(&request).await.unwrap_err();
    assert_eq!(err.user_message("Payment failed"), "Seat (1, 2) is already sold");
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let session = Arc::new(SessionStore::new());
    let config = ApiConfig { base_url: "http://127.0.0.1:9".into(), timeout_secs: 1, token: None };
    let client = RestClient::new(&config, session).unwrap();

    let err = client.blocked_seats(1).await.unwrap_err();
    assert!(matches!(err, apollo_core::GatewayError::Transport(_)));
}
