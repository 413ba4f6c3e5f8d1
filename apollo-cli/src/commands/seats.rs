use apollo_booking::SeatMap;
use apollo_catalog::row_label;
use apollo_core::SeatHoldGateway;
use apollo_shared::SeatCoord;
use clap::Args;
use serde::Serialize;

use super::Context;

#[derive(Debug, Args)]
pub struct SeatsArgs {
    /// Showtime id
    pub schedule_id: i64,
}

#[derive(Serialize)]
struct SeatsView {
    schedule_id: i64,
    available: usize,
    blocked: Vec<SeatCoord>,
}

pub async fn execute(args: &SeatsArgs, ctx: &Context) -> anyhow::Result<()> {
    let mut map = ctx.seat_map();
    let blocked = ctx.client.blocked_seats(args.schedule_id).await?;
    map.replace_blocked(blocked);

    let mut blocked: Vec<SeatCoord> = map.blocked().iter().copied().collect();
    blocked.sort();
    let view = SeatsView {
        schedule_id: args.schedule_id,
        available: map.available_count(),
        blocked,
    };
    ctx.emit(&view, || {
        format!(
            "{}\n{} seats available, {} blocked",
            render(&map, &[]),
            view.available,
            view.blocked.len()
        )
    })
}

/// Text grid of the hall: `.` free, `x` blocked, `o` selected by us, blank
/// where there is no seat.
pub fn render(map: &SeatMap, selected: &[SeatCoord]) -> String {
    let width = (0..map.rows()).map(|r| map.cols(r)).max().unwrap_or(0);

    let mut out = String::from("    ");
    for col in 0..width {
        out.push_str(&format!("{:>3}", col + 1));
    }

    for row in 0..map.rows() {
        out.push_str(&format!("\n{:>3} ", row_label(row)));
        for col in 0..width {
            let mark = if selected.contains(&SeatCoord::new(row, col)) {
                'o'
            } else if !map.exists(row, col) {
                ' '
            } else if map.is_blocked(row, col) {
                'x'
            } else {
                '.'
            };
            out.push_str(&format!("{:>3}", mark));
        }
    }
    out
}
