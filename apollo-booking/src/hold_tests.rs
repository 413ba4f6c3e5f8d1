use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use apollo_catalog::{PriceTable, PricingEngine};
use apollo_core::{Clock, FixedClock, GatewayError, GatewayResult, SeatHoldGateway};
use apollo_shared::{
    BlockSeatResponse, HoldEvent, ReleaseSeatResponse, ReleaseSeatsResponse, SeatCoord, TicketPriceRow,
};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use crate::hold::{HoldError, HoldManager, HoldPhase, TickOutcome, ToggleOutcome, MAX_SEATS};
use crate::seat_map::SeatMap;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Block(SeatCoord),
    Release(SeatCoord),
    ReleaseMany(Vec<SeatCoord>),
    Blocked,
}

/// In-memory stand-in for the API's seat lock store.
pub(crate) struct FakeHoldGateway {
    clock: Arc<dyn Clock>,
    pub(crate) calls: Mutex<Vec<Call>>,
    held: Mutex<HashSet<SeatCoord>>,
    fail_block: Mutex<bool>,
    fail_bulk_release: Mutex<bool>,
    conflict_detail: Mutex<Option<String>>,
    hold_secs: i64,
}

impl FakeHoldGateway {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            calls: Mutex::new(Vec::new()),
            held: Mutex::new(HashSet::new()),
            fail_block: Mutex::new(false),
            fail_bulk_release: Mutex::new(false),
            conflict_detail: Mutex::new(Some("Seat already blocked".into())),
            hold_secs: 120,
        }
    }

    /// Someone else already holds this seat.
    pub(crate) fn hold_elsewhere(&self, seat: SeatCoord) {
        self.held.lock().unwrap().insert(seat);
    }

    pub(crate) fn fail_blocks(&self, fail: bool) {
        *self.fail_block.lock().unwrap() = fail;
    }

    pub(crate) fn fail_bulk_releases(&self, fail: bool) {
        *self.fail_bulk_release.lock().unwrap() = fail;
    }

    /// Body detail sent with 409 responses; `None` sends none.
    pub(crate) fn conflict_detail(&self, detail: Option<&str>) {
        *self.conflict_detail.lock().unwrap() = detail.map(str::to_string);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl SeatHoldGateway for FakeHoldGateway {
    async fn block_seat(&self, _schedule_id: i64, seat: SeatCoord) -> GatewayResult<BlockSeatResponse> {
        self.calls.lock().unwrap().push(Call::Block(seat));
        if *self.fail_block.lock().unwrap() {
            return Err(GatewayError::Transport("connection reset".into()));
        }
        let mut held = self.held.lock().unwrap();
        if !held.insert(seat) {
            return Err(GatewayError::Api { status: 409, detail: self.conflict_detail.lock().unwrap().clone() });
        }
        let expires = self.clock.now() + Duration::seconds(self.hold_secs);
        Ok(BlockSeatResponse {
            status: "blocked".into(),
            expires: expires.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        })
    }

    async fn release_seat(&self, _schedule_id: i64, seat: SeatCoord) -> GatewayResult<ReleaseSeatResponse> {
        self.calls.lock().unwrap().push(Call::Release(seat));
        if self.held.lock().unwrap().remove(&seat) {
            Ok(ReleaseSeatResponse { status: "released".into() })
        } else {
            Err(GatewayError::Api { status: 404, detail: Some("Seat not blocked".into()) })
        }
    }

    async fn release_seats(&self, _schedule_id: i64, seats: &[SeatCoord]) -> GatewayResult<ReleaseSeatsResponse> {
        self.calls.lock().unwrap().push(Call::ReleaseMany(seats.to_vec()));
        if *self.fail_bulk_release.lock().unwrap() {
            return Err(GatewayError::Api { status: 500, detail: None });
        }
        let mut held = self.held.lock().unwrap();
        let released = seats.iter().filter(|s| held.remove(s)).count() as u32;
        Ok(ReleaseSeatsResponse { released })
    }

    async fn blocked_seats(&self, _schedule_id: i64) -> GatewayResult<Vec<SeatCoord>> {
        self.calls.lock().unwrap().push(Call::Blocked);
        let mut seats: Vec<SeatCoord> = self.held.lock().unwrap().iter().copied().collect();
        seats.sort();
        Ok(seats)
    }
}

fn setup() -> (HoldManager, Arc<FakeHoldGateway>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 15, 17, 0, 0).unwrap()));
    let gateway = Arc::new(FakeHoldGateway::new(clock.clone()));
    let manager = HoldManager::new(7, SeatMap::with_dimensions(5, 6, &[SeatCoord::new(4, 0)]), gateway.clone(), clock.clone());
    (manager, gateway, clock)
}

fn seat(r: u32, c: u32) -> SeatCoord {
    SeatCoord::new(r, c)
}

#[tokio::test]
async fn test_hold_sets_shared_deadline() {
    let (mut manager, gateway, clock) = setup();

    let outcome = manager.toggle_seat(0, 0).await.unwrap();
    let first = clock.now() + Duration::seconds(120);
    assert_eq!(outcome, ToggleOutcome::Held { expires_at: Some(first) });
    assert_eq!(manager.phase(), HoldPhase::Held);
    assert_eq!(manager.remaining(), Some(120));

    // A later hold restarts the single countdown for the whole selection.
    clock.advance(Duration::seconds(60));
    manager.toggle_seat(0, 1).await.unwrap();
    assert_eq!(manager.expires_at(), Some(first + Duration::seconds(60)));
    assert_eq!(manager.remaining(), Some(120));
    assert_eq!(manager.selected(), &[seat(0, 0), seat(0, 1)]);
    assert_eq!(gateway.count(|c| matches!(c, Call::Block(_))), 2);
}

#[tokio::test]
async fn test_limit_never_calls_or_mutates() {
    let (manager, gateway, _clock) = setup();
    let mut manager = manager.with_max_seats(2);
    let mut events = manager.subscribe();

    manager.toggle_seat(0, 0).await.unwrap();
    manager.toggle_seat(0, 1).await.unwrap();
    gateway.clear_calls();

    let err = manager.toggle_seat(0, 2).await.unwrap_err();
    assert!(matches!(err, HoldError::SeatLimit { max: 2 }));
    assert!(gateway.calls().is_empty());
    assert_eq!(manager.selected(), &[seat(0, 0), seat(0, 1)]);

    let mut saw_limit = false;
    while let Ok(event) = events.try_recv() {
        saw_limit |= matches!(event, HoldEvent::SeatLimitReached { max_seats: 2, .. });
    }
    assert!(saw_limit);
}

#[tokio::test]
async fn test_default_limit_is_ten() {
    let (mut manager, gateway, _clock) = setup();
    for c in 0..6 {
        manager.toggle_seat(0, c).await.unwrap();
    }
    for c in 0..4 {
        manager.toggle_seat(1, c).await.unwrap();
    }
    assert_eq!(manager.selected().len(), MAX_SEATS);

    gateway.clear_calls();
    assert!(manager.toggle_seat(2, 0).await.is_err());
    assert!(gateway.calls().is_empty());
    assert_eq!(manager.selected().len(), MAX_SEATS);
}

#[tokio::test]
async fn test_deselect_is_one_release_then_one_resync() {
    let (mut manager, gateway, _clock) = setup();
    manager.toggle_seat(2, 2).await.unwrap();
    gateway.clear_calls();

    let outcome = manager.toggle_seat(2, 2).await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Released);
    assert_eq!(gateway.calls(), vec![Call::Release(seat(2, 2)), Call::Blocked]);
    assert!(manager.selected().is_empty());
    assert_eq!(manager.phase(), HoldPhase::Deselected);
    assert!(!manager.is_countdown_active());
}

#[tokio::test]
async fn test_deselect_resyncs_even_when_release_fails() {
    let (mut manager, gateway, _clock) = setup();
    gateway.fail_blocks(true);
    manager.toggle_seat(1, 1).await.unwrap();
    gateway.clear_calls();

    // The server never held it, so release answers 404.
    manager.toggle_seat(1, 1).await.unwrap();
    assert_eq!(gateway.calls(), vec![Call::Release(seat(1, 1)), Call::Blocked]);
}

#[tokio::test]
async fn test_unselectable_seats_are_a_no_op() {
    let (mut manager, gateway, _clock) = setup();
    gateway.hold_elsewhere(seat(3, 3));
    manager.refresh_blocked().await.unwrap();
    gateway.clear_calls();

    assert_eq!(manager.toggle_seat(3, 3).await.unwrap(), ToggleOutcome::NotSelectable);
    assert_eq!(manager.toggle_seat(4, 0).await.unwrap(), ToggleOutcome::NotSelectable);
    assert_eq!(manager.toggle_seat(40, 0).await.unwrap(), ToggleOutcome::NotSelectable);
    assert!(gateway.calls().is_empty());
    assert!(manager.selected().is_empty());
}

#[tokio::test]
async fn test_own_held_seat_stays_selectable() {
    let (mut manager, _gateway, _clock) = setup();
    manager.toggle_seat(0, 3).await.unwrap();
    manager.refresh_blocked().await.unwrap();

    assert!(!manager.seat_map().is_seat_available(0, 3));
    assert!(manager.is_selectable(seat(0, 3)));
    assert_eq!(manager.toggle_seat(0, 3).await.unwrap(), ToggleOutcome::Released);
}

#[tokio::test]
async fn test_failed_hold_keeps_selection_and_resyncs() {
    let (mut manager, gateway, _clock) = setup();
    gateway.fail_blocks(true);

    let outcome = manager.toggle_seat(1, 2).await.unwrap();
    assert!(matches!(outcome, ToggleOutcome::HoldFailed { .. }));
    assert_eq!(manager.selected(), &[seat(1, 2)]);
    assert_eq!(manager.phase(), HoldPhase::Selecting);
    assert_eq!(gateway.calls(), vec![Call::Block(seat(1, 2)), Call::Blocked]);
}

#[tokio::test]
async fn test_conflict_surfaces_server_detail() {
    let (mut manager, gateway, _clock) = setup();
    // Taken between our last refresh and the click.
    gateway.hold_elsewhere(seat(0, 5));

    let outcome = manager.toggle_seat(0, 5).await.unwrap();
    assert_eq!(outcome, ToggleOutcome::HoldFailed { reason: "Seat already blocked".into() });
    assert!(manager.seat_map().is_blocked(0, 5));
}

#[tokio::test]
async fn test_conflict_without_detail_says_seat_was_taken() {
    let (mut manager, gateway, _clock) = setup();
    gateway.hold_elsewhere(seat(1, 1));
    gateway.conflict_detail(None);

    let outcome = manager.toggle_seat(1, 1).await.unwrap();
    assert_eq!(
        outcome,
        ToggleOutcome::HoldFailed { reason: "Seat was just taken by another customer".into() }
    );

    gateway.fail_blocks(true);
    let outcome = manager.toggle_seat(0, 0).await.unwrap();
    assert_eq!(outcome, ToggleOutcome::HoldFailed { reason: "Seat could not be held".into() });
}

#[tokio::test]
async fn test_countdown_expiry_releases_everything_at_once() {
    let (mut manager, gateway, clock) = setup();
    manager.toggle_seat(0, 0).await.unwrap();
    manager.toggle_seat(0, 1).await.unwrap();
    manager.toggle_seat(3, 4).await.unwrap();
    gateway.clear_calls();

    clock.advance(Duration::seconds(119));
    assert_eq!(manager.tick().await, TickOutcome::Remaining(1));
    assert!(gateway.calls().is_empty());

    clock.advance(Duration::seconds(1));
    let outcome = manager.tick().await;
    let expected = vec![seat(0, 0), seat(0, 1), seat(3, 4)];
    assert_eq!(outcome, TickOutcome::Expired(expected.clone()));

    assert!(manager.selected().is_empty());
    assert!(manager.session_expired());
    assert_eq!(manager.phase(), HoldPhase::Expired);
    assert!(!manager.is_countdown_active());
    assert_eq!(gateway.calls(), vec![Call::ReleaseMany(expected), Call::Blocked]);

    // Countdown stopped.
    assert_eq!(manager.tick().await, TickOutcome::Inactive);
}

#[tokio::test]
async fn test_expiry_clears_selection_when_bulk_release_fails() {
    let (mut manager, gateway, clock) = setup();
    manager.toggle_seat(0, 0).await.unwrap();
    manager.toggle_seat(2, 3).await.unwrap();
    gateway.fail_bulk_releases(true);
    gateway.clear_calls();

    clock.advance(Duration::seconds(120));
    let expected = vec![seat(0, 0), seat(2, 3)];
    assert_eq!(manager.tick().await, TickOutcome::Expired(expected.clone()));

    assert!(manager.selected().is_empty());
    assert!(manager.session_expired());
    assert_eq!(manager.phase(), HoldPhase::Expired);
    assert_eq!(gateway.calls(), vec![Call::ReleaseMany(expected), Call::Blocked]);
    // Server still holds them until its own timeout.
    assert!(manager.seat_map().is_blocked(2, 3));
}

#[tokio::test]
async fn test_reselecting_after_expiry_starts_over() {
    let (mut manager, _gateway, clock) = setup();
    manager.toggle_seat(0, 0).await.unwrap();
    clock.advance(Duration::seconds(121));
    manager.tick().await;
    assert!(manager.session_expired());

    manager.toggle_seat(1, 0).await.unwrap();
    assert!(!manager.session_expired());
    assert_eq!(manager.phase(), HoldPhase::Held);
    assert_eq!(manager.remaining(), Some(120));
}

#[tokio::test]
async fn test_held_seat_shows_up_in_blocked_set() {
    let (mut manager, _gateway, _clock) = setup();
    manager.toggle_seat(2, 4).await.unwrap();
    manager.refresh_blocked().await.unwrap();
    assert!(manager.seat_map().blocked().contains(&seat(2, 4)));
}

#[tokio::test]
async fn test_refresh_failure_keeps_cache() {
    struct DownGateway;

    #[async_trait]
    impl SeatHoldGateway for DownGateway {
        async fn block_seat(&self, _: i64, _: SeatCoord) -> GatewayResult<BlockSeatResponse> {
            Err(GatewayError::Transport("down".into()))
        }
        async fn release_seat(&self, _: i64, _: SeatCoord) -> GatewayResult<ReleaseSeatResponse> {
            Err(GatewayError::Transport("down".into()))
        }
        async fn release_seats(&self, _: i64, _: &[SeatCoord]) -> GatewayResult<ReleaseSeatsResponse> {
            Err(GatewayError::Transport("down".into()))
        }
        async fn blocked_seats(&self, _: i64) -> GatewayResult<Vec<SeatCoord>> {
            Err(GatewayError::Transport("down".into()))
        }
    }

    let mut map = SeatMap::with_dimensions(2, 2, &[]);
    map.replace_blocked([seat(0, 0)]);
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let mut manager = HoldManager::new(1, map, Arc::new(DownGateway), clock);

    assert!(manager.refresh_blocked().await.is_err());
    assert!(manager.seat_map().is_blocked(0, 0));

    // Failed hold: seat kept locally, no panic on the failed resync.
    let outcome = manager.toggle_seat(1, 1).await.unwrap();
    assert!(matches!(outcome, ToggleOutcome::HoldFailed { .. }));
    assert_eq!(manager.selected(), &[seat(1, 1)]);
}

fn engine() -> PricingEngine {
    PricingEngine::new(PriceTable::new(vec![
        TicketPriceRow { ticket_type: "normalny".into(), same_day: Some(25.0), ..Default::default() },
        TicketPriceRow { ticket_type: "ulgowy".into(), same_day: Some(18.0), ..Default::default() },
    ]))
}

#[tokio::test]
async fn test_checkout_and_payment() {
    let (mut manager, gateway, _clock) = setup();
    let engine = engine();
    let date = "2025-03-15".parse().unwrap();

    assert!(matches!(
        manager.begin_checkout(&engine, date, "20:00", "normalny"),
        Err(HoldError::EmptySelection)
    ));

    manager.toggle_seat(0, 0).await.unwrap();
    manager.toggle_seat(0, 1).await.unwrap();

    let cart = manager.begin_checkout(&engine, date, "20:00", "normalny").unwrap();
    assert_eq!(cart.total(), 50.0);
    assert_eq!(manager.phase(), HoldPhase::Paying);

    assert_eq!(manager.set_ticket_type(1, "ulgowy", &engine).unwrap(), 43.0);
    assert!(matches!(manager.toggle_seat(0, 2).await, Err(HoldError::InvalidPhase { .. })));

    gateway.clear_calls();
    let cart = manager.complete_payment().unwrap();
    assert_eq!(cart.items().len(), 2);
    assert_eq!(manager.phase(), HoldPhase::Idle);
    assert!(manager.selected().is_empty());
    assert!(!manager.is_countdown_active());
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_checkout_returns_to_held() {
    let (mut manager, _gateway, _clock) = setup();
    manager.toggle_seat(0, 0).await.unwrap();
    manager.begin_checkout(&engine(), "2025-03-15".parse().unwrap(), "20:00", "normalny").unwrap();
    manager.cancel_checkout();
    assert_eq!(manager.phase(), HoldPhase::Held);
    assert!(manager.cart().is_none());
    assert!(manager.complete_payment().is_err());
}
