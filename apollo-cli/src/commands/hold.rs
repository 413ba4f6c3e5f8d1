use std::sync::Arc;
use std::time::Duration;

use apollo_booking::{
    CheckoutOrchestrator, HoldError, HoldManager, HoldSession, SchedulerConfig, ToggleOutcome,
};
use apollo_catalog::{PriceTable, PricingEngine};
use apollo_core::{MockPaymentGateway, PaymentGateway, PriceListGateway, ScheduleGateway};
use apollo_shared::{HoldEvent, SeatCoord};
use apollo_store::BookingConfig;
use clap::Args;
use tokio::sync::broadcast::error::RecvError;

use super::{parse_seat, seats, Context};

#[derive(Debug, Args)]
pub struct HoldArgs {
    /// Showtime id
    pub schedule_id: i64,

    /// Seats as ROW:COL, zero-based
    #[arg(required = true, value_parser = parse_seat)]
    pub seats: Vec<SeatCoord>,

    /// Check out the held seats and open a payment session
    #[arg(long)]
    pub checkout: bool,

    /// Ticket type for every seat at checkout
    #[arg(long, requires = "checkout")]
    pub ticket_type: Option<String>,

    /// Keep the seats held until the countdown runs out
    #[arg(long, conflicts_with = "checkout")]
    pub wait: bool,
}

fn scheduler_config(booking: &BookingConfig) -> SchedulerConfig {
    SchedulerConfig {
        countdown: Duration::from_secs(booking.countdown_secs.max(1)),
        poll: Duration::from_secs(booking.poll_secs.max(1)),
    }
}

pub async fn execute(args: &HoldArgs, ctx: &Context) -> anyhow::Result<()> {
    let booking = &ctx.config.booking;
    let manager = HoldManager::new(args.schedule_id, ctx.seat_map(), ctx.client.clone(), ctx.clock.clone())
        .with_max_seats(booking.max_seats);
    let session = HoldSession::spawn(manager, scheduler_config(booking));
    let mut events = session.subscribe();

    let result = run(args, ctx, &session, &mut events).await;
    session.shutdown().await;
    result
}

async fn run(
    args: &HoldArgs,
    ctx: &Context,
    session: &HoldSession,
    events: &mut tokio::sync::broadcast::Receiver<HoldEvent>,
) -> anyhow::Result<()> {
    session.refresh().await??;

    for seat in &args.seats {
        match session.toggle_seat(seat.row, seat.col).await {
            Ok(ToggleOutcome::Held { expires_at }) => match expires_at {
                Some(at) => println!("Held {}:{} until {}", seat.row, seat.col, at.format("%H:%M:%S")),
                None => println!("Held {}:{}", seat.row, seat.col),
            },
            Ok(ToggleOutcome::HoldFailed { reason }) => println!("Could not hold {}:{}: {}", seat.row, seat.col, reason),
            Ok(ToggleOutcome::Released) => println!("Released {}:{}", seat.row, seat.col),
            Ok(ToggleOutcome::NotSelectable) => println!("Seat {}:{} is not available", seat.row, seat.col),
            Err(HoldError::SeatLimit { max }) => {
                println!("You can select at most {} seats", max);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let snapshot = session.snapshot().await?;
    if !ctx.is_json() {
        let mut map = ctx.seat_map();
        map.replace_blocked(snapshot.blocked.iter().copied());
        println!("{}", seats::render(&map, &snapshot.selected));
    }
    if snapshot.selected.is_empty() {
        return ctx.emit(&snapshot, || "No seats held".to_string());
    }

    if args.checkout {
        checkout(args, ctx, session).await
    } else if args.wait {
        wait_for_expiry(ctx, events).await
    } else {
        ctx.emit(&snapshot, || match snapshot.remaining_secs {
            Some(secs) => format!("{} seat(s) held, {}s left", snapshot.selected.len(), secs),
            None => format!("{} seat(s) selected", snapshot.selected.len()),
        })
    }
}

async fn checkout(args: &HoldArgs, ctx: &Context, session: &HoldSession) -> anyhow::Result<()> {
    let schedule = ctx.client.get_schedule(args.schedule_id).await?;
    let prices = ctx.client.ticket_prices().await?;
    let engine = Arc::new(PricingEngine::new(PriceTable::new(prices)));

    let ticket_type = args
        .ticket_type
        .as_deref()
        .unwrap_or(&ctx.config.booking.default_ticket_type);
    let cart = session
        .begin_checkout(engine, schedule.date, &schedule.time, ticket_type)
        .await?;

    if !ctx.is_json() {
        for item in cart.items() {
            println!("{}{}  {:<12} {:>8.2}", item.row_label, item.seat_number, item.ticket_type, item.price);
        }
        println!("Total {:>22.2}", cart.total());
    }

    let payments: Arc<dyn PaymentGateway> = if ctx.config.booking.mock_payments {
        Arc::new(MockPaymentGateway)
    } else {
        ctx.client.clone()
    };
    let orchestrator = CheckoutOrchestrator::new(payments);

    match orchestrator.start_payment(&cart, args.schedule_id, schedule.hall).await {
        Ok(checkout) => {
            if ctx.config.booking.mock_payments {
                session.complete_payment().await?;
            }
            ctx.emit(&checkout, || format!("Pay at {}", checkout.url))
        }
        Err(e) => {
            session.cancel_checkout().await?;
            Err(e.into())
        }
    }
}

async fn wait_for_expiry(
    ctx: &Context,
    events: &mut tokio::sync::broadcast::Receiver<HoldEvent>,
) -> anyhow::Result<()> {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted, seats stay held until their deadline");
                return Ok(());
            }
        };

        match event {
            Ok(HoldEvent::CountdownTick { remaining_secs, .. }) => {
                if remaining_secs % 10 == 0 && !ctx.is_json() {
                    println!("{}s left", remaining_secs);
                }
            }
            Ok(HoldEvent::HoldFailed { seat, reason, .. }) => {
                println!("Hold on {}:{} failed: {}", seat.row, seat.col, reason);
            }
            Ok(event @ HoldEvent::HoldExpired { .. }) => {
                return ctx.emit(&event, || match &event {
                    HoldEvent::HoldExpired { released, .. } => {
                        format!("Time is up, released {} seat(s)", released.len())
                    }
                    _ => String::new(),
                });
            }
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
