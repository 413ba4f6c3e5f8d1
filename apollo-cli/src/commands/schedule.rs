use std::path::PathBuf;

use apollo_core::ScheduleGateway;
use apollo_planner::ExistingEdit;
use apollo_shared::models::schedule::normalize_hall;
use clap::{Args, Subcommand};

use super::{load_plan, plan::detector, Context};

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Move a showtime or change its hall or language version
    Edit {
        /// Showtime id
        id: i64,
        /// New start time, HH:MM
        #[arg(long)]
        time: Option<String>,
        /// New hall, e.g. `3` or `Sala 3`
        #[arg(long)]
        hall: Option<String>,
        #[arg(long)]
        movie_type: Option<String>,
        /// Draft plan of the same day to check against
        #[arg(long)]
        plan: Option<PathBuf>,
    },
}

pub async fn execute(args: &ScheduleArgs, ctx: &Context) -> anyhow::Result<()> {
    let ScheduleCommand::Edit { id, time, hall, movie_type, plan } = &args.command;

    let schedule = ctx.client.get_schedule(*id).await?;
    let mut edit = ExistingEdit::from_schedule(&schedule, &ctx.config.planner.default_movie_type);
    if let Some(time) = time {
        if apollo_planner::time::parse_hhmm(time).is_none() {
            anyhow::bail!("Invalid start time '{}', expected HH:MM", time);
        }
        edit.time = time.trim().to_string();
    }
    if let Some(raw) = hall {
        let hall = normalize_hall(raw).ok_or_else(|| anyhow::anyhow!("Unknown hall '{}'", raw))?;
        edit.hall = Some(hall);
    }
    if let Some(movie_type) = movie_type {
        edit.movie_type = Some(movie_type.clone());
    }

    let detector = detector(ctx, schedule.date).await?;
    let plan = load_plan(plan.as_deref(), detector.halls())?;
    detector.check_edit(*id, &edit, &plan)?;

    let updated = ctx.client.update_schedule(*id, &edit.to_update()).await?;
    tracing::info!(schedule_id = id, time = %updated.time, hall = ?updated.hall, "Showtime updated");
    ctx.emit(&updated, || {
        format!(
            "#{} {} {} hall {}",
            updated.id,
            updated.date,
            updated.start_time(),
            updated.hall.map(|h| h.to_string()).unwrap_or_else(|| "?".to_string())
        )
    })
}
