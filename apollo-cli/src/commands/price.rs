use apollo_catalog::{PriceTable, PriceTier, PricingEngine};
use apollo_core::{PriceListGateway, ScheduleGateway};
use clap::Args;
use serde::Serialize;

use super::Context;

#[derive(Debug, Args)]
pub struct PriceArgs {
    /// Showtime id
    pub schedule_id: i64,

    /// Quote only this ticket type
    #[arg(long)]
    pub ticket_type: Option<String>,
}

#[derive(Serialize)]
struct PriceLine {
    ticket_type: String,
    tier: PriceTier,
    price: f64,
}

pub async fn execute(args: &PriceArgs, ctx: &Context) -> anyhow::Result<()> {
    let schedule = ctx.client.get_schedule(args.schedule_id).await?;
    let engine = PricingEngine::new(PriceTable::new(ctx.client.ticket_prices().await?));
    let now = ctx.clock.local_now();

    let types: Vec<String> = match &args.ticket_type {
        Some(t) => vec![t.clone()],
        None => engine.table().ticket_types().into_iter().map(str::to_string).collect(),
    };
    if types.is_empty() {
        anyhow::bail!("The price list is empty");
    }

    let lines: Vec<PriceLine> = types
        .into_iter()
        .map(|ticket_type| {
            let quote = engine.quote(&ticket_type, schedule.date, &schedule.time, now);
            PriceLine { ticket_type, tier: quote.tier, price: quote.price }
        })
        .collect();

    ctx.emit(&lines, || {
        let mut out = format!("{} {} {}", schedule.title(), schedule.date, schedule.start_time());
        for line in &lines {
            out.push_str(&format!("\n  {:<14} {:>8.2}  ({:?})", line.ticket_type, line.price, line.tier));
        }
        out
    })
}
