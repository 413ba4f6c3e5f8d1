use apollo_catalog::{CheckoutCart, PricingEngine};
use apollo_core::GatewayResult;
use apollo_shared::HoldEvent;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::hold::{HoldError, HoldManager, HoldSnapshot, ToggleOutcome};

/// Timer periods for a hold session.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub countdown: Duration,
    pub poll: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(1),
            poll: Duration::from_secs(20),
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, HoldError>>;

enum Command {
    Toggle { row: u32, col: u32, reply: Reply<ToggleOutcome> },
    Refresh { reply: oneshot::Sender<GatewayResult<usize>> },
    Snapshot { reply: oneshot::Sender<HoldSnapshot> },
    BeginCheckout {
        engine: Arc<PricingEngine>,
        date: NaiveDate,
        time: String,
        default_type: String,
        reply: Reply<CheckoutCart>,
    },
    SetTicketType {
        engine: Arc<PricingEngine>,
        index: usize,
        ticket_type: String,
        reply: Reply<f64>,
    },
    CancelCheckout,
    CompletePayment { reply: Reply<CheckoutCart> },
}

/// Handle to a running hold session.
///
/// A single task owns the [`HoldManager`]. Each loop turn serves, in order:
/// teardown, one queued command, the countdown tick, the blocked-seat poll.
/// Once the session is shut down no gateway response can reach the state.
pub struct HoldSession {
    session_id: Uuid,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<HoldEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HoldSession {
    pub fn spawn(manager: HoldManager, config: SchedulerConfig) -> Self {
        let (commands, rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let session_id = manager.session_id();
        let events = manager.event_sender();

        let task = tokio::spawn(run(manager, rx, cancel.clone(), config));

        Self {
            session_id,
            commands,
            events,
            cancel,
            task: Some(task),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HoldEvent> {
        self.events.subscribe()
    }

    pub async fn toggle_seat(&self, row: u32, col: u32) -> Result<ToggleOutcome, HoldError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Toggle { row, col, reply }).await?;
        rx.await.map_err(|_| HoldError::SessionClosed)?
    }

    pub async fn refresh(&self) -> Result<GatewayResult<usize>, HoldError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Refresh { reply }).await?;
        rx.await.map_err(|_| HoldError::SessionClosed)
    }

    pub async fn snapshot(&self) -> Result<HoldSnapshot, HoldError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| HoldError::SessionClosed)
    }

    pub async fn begin_checkout(
        &self,
        engine: Arc<PricingEngine>,
        date: NaiveDate,
        time: &str,
        default_type: &str,
    ) -> Result<CheckoutCart, HoldError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::BeginCheckout {
            engine,
            date,
            time: time.to_string(),
            default_type: default_type.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| HoldError::SessionClosed)?
    }

    pub async fn set_ticket_type(
        &self,
        engine: Arc<PricingEngine>,
        index: usize,
        ticket_type: &str,
    ) -> Result<f64, HoldError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetTicketType {
            engine,
            index,
            ticket_type: ticket_type.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| HoldError::SessionClosed)?
    }

    pub async fn cancel_checkout(&self) -> Result<(), HoldError> {
        self.send(Command::CancelCheckout).await
    }

    pub async fn complete_payment(&self) -> Result<CheckoutCart, HoldError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CompletePayment { reply }).await?;
        rx.await.map_err(|_| HoldError::SessionClosed)?
    }

    /// Stop both timers and drop the session state. Seats still held on the
    /// server run out on their own.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(session_id = %self.session_id, "Hold session task failed: {}", e);
            }
        }
    }

    async fn send(&self, command: Command) -> Result<(), HoldError> {
        if self.cancel.is_cancelled() {
            return Err(HoldError::SessionClosed);
        }
        self.commands
            .send(command)
            .await
            .map_err(|_| HoldError::SessionClosed)
    }
}

impl Drop for HoldSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut manager: HoldManager,
    mut commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    config: SchedulerConfig,
) {
    let session_id = manager.session_id();
    tracing::info!(%session_id, schedule_id = manager.schedule_id(), "Hold session started");

    let mut countdown = tokio::time::interval(config.countdown);
    countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First poll fires immediately and loads the blocked set.
    let mut poll = tokio::time::interval(config.poll);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            command = commands.recv() => {
                let Some(command) = command else { break };
                if !until_cancelled(&cancel, handle(&mut manager, command)).await {
                    break;
                }
            }

            _ = countdown.tick() => {
                if manager.is_countdown_active() && !until_cancelled(&cancel, manager.tick()).await {
                    break;
                }
            }

            _ = poll.tick() => {
                let refreshed = until_cancelled(&cancel, async {
                    if let Err(e) = manager.refresh_blocked().await {
                        tracing::warn!(%session_id, "Periodic refresh failed: {}", e);
                    }
                })
                .await;
                if !refreshed {
                    break;
                }
            }
        }
    }

    tracing::info!(%session_id, "Hold session stopped");
}

/// Drive `work` unless teardown happens first. Returns false on teardown,
/// in which case the work and anything it would have written are dropped.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, work: F) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = work => true,
    }
}

async fn handle(manager: &mut HoldManager, command: Command) {
    match command {
        Command::Toggle { row, col, reply } => {
            let _ = reply.send(manager.toggle_seat(row, col).await);
        }
        Command::Refresh { reply } => {
            let _ = reply.send(manager.refresh_blocked().await);
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(manager.snapshot());
        }
        Command::BeginCheckout { engine, date, time, default_type, reply } => {
            let result = manager
                .begin_checkout(&engine, date, &time, &default_type)
                .map(Clone::clone);
            let _ = reply.send(result);
        }
        Command::SetTicketType { engine, index, ticket_type, reply } => {
            let _ = reply.send(manager.set_ticket_type(index, &ticket_type, &engine));
        }
        Command::CancelCheckout => manager.cancel_checkout(),
        Command::CompletePayment { reply } => {
            let _ = reply.send(manager.complete_payment());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hold::HoldPhase;
    use crate::hold_tests::{Call, FakeHoldGateway};
    use crate::seat_map::SeatMap;
    use apollo_core::Clock;
    use apollo_shared::SeatCoord;
    use chrono::{DateTime, TimeZone, Utc};

    /// Wall clock that follows tokio's paused time.
    struct TokioClock {
        origin: DateTime<Utc>,
        started: tokio::time::Instant,
    }

    impl TokioClock {
        fn new() -> Self {
            Self {
                origin: Utc.with_ymd_and_hms(2025, 3, 15, 17, 0, 0).unwrap(),
                started: tokio::time::Instant::now(),
            }
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = tokio::time::Instant::now() - self.started;
            self.origin + chrono::Duration::from_std(elapsed).unwrap()
        }

        fn local_now(&self) -> chrono::NaiveDateTime {
            self.now().naive_utc()
        }
    }

    fn start() -> (HoldSession, Arc<FakeHoldGateway>) {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());
        let gateway = Arc::new(FakeHoldGateway::new(clock.clone()));
        let manager = HoldManager::new(7, SeatMap::with_dimensions(4, 4, &[]), gateway.clone(), clock);
        (HoldSession::spawn(manager, SchedulerConfig::default()), gateway)
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_expires_whole_selection() {
        let (session, gateway) = start();
        let mut events = session.subscribe();

        session.toggle_seat(0, 0).await.unwrap();
        session.toggle_seat(1, 1).await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, HoldPhase::Held);
        assert_eq!(snapshot.selected.len(), 2);

        tokio::time::sleep(Duration::from_secs(62)).await;
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, HoldPhase::Expired);
        assert!(snapshot.selected.is_empty());
        assert!(snapshot.session_expired);

        let bulk: Vec<Call> = gateway
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ReleaseMany(_)))
            .collect();
        assert_eq!(bulk, vec![Call::ReleaseMany(vec![SeatCoord::new(0, 0), SeatCoord::new(1, 1)])]);

        // Countdown ticks overflow the channel; only the tail matters.
        let mut expired = false;
        loop {
            match events.try_recv() {
                Ok(event) => expired |= matches!(event, HoldEvent::HoldExpired { .. }),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(expired);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_refreshes_every_twenty_seconds() {
        let (session, gateway) = start();
        // Let the immediate first poll run.
        tokio::time::sleep(Duration::from_millis(10)).await;
        gateway.hold_elsewhere(SeatCoord::new(2, 2));

        tokio::time::sleep(Duration::from_secs(21)).await;
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.blocked, vec![SeatCoord::new(2, 2)]);
        assert_eq!(gateway.count(|c| *c == Call::Blocked), 2);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_commands_after_shutdown() {
        let (session, gateway) = start();
        session.toggle_seat(0, 0).await.unwrap();

        let commands = session.commands.clone();
        session.shutdown().await;

        let (reply, rx) = oneshot::channel();
        assert!(commands.send(Command::Snapshot { reply }).await.is_err());
        assert!(rx.await.is_err());

        let before = gateway.calls().len();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(gateway.calls().len(), before);
    }
}
