use std::path::{Path, PathBuf};

use apollo_core::ScheduleGateway;
use apollo_planner::{plan_copy, ConflictDetector, CopyRequest, CopyTargets, PlanError, SlotGrid};
use apollo_shared::{Schedule, ScheduleCreate};
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use super::{load_plan, Context};

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub command: PlanCommand,
}

#[derive(Debug, Subcommand)]
pub enum PlanCommand {
    /// Existing showtimes of a day, per hall
    Show {
        day: NaiveDate,
    },
    /// Check a draft plan for overlaps and optionally save it
    Check {
        day: NaiveDate,
        /// Draft plan as JSON: `{"1": [{"time": "10:00", "movie_id": 3}]}`
        #[arg(long)]
        plan: PathBuf,
        /// Create the showtimes when the plan is clean
        #[arg(long)]
        save: bool,
    },
    /// Start times a draft row or an existing showtime may use
    Slots {
        day: NaiveDate,
        #[arg(long)]
        hall: u32,
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Draft row index, zero-based; defaults to a new row
        #[arg(long, conflicts_with = "schedule")]
        row: Option<usize>,
        /// Existing showtime id
        #[arg(long)]
        schedule: Option<i64>,
    },
    /// Copy a day's showtimes to other days
    Copy {
        day: NaiveDate,
        /// Halls to copy; all configured halls when omitted
        #[arg(long, value_delimiter = ',')]
        halls: Vec<u32>,
        /// Copy to the N days after DAY
        #[arg(long, conflicts_with = "dates")]
        days: Option<u32>,
        /// Copy to these dates, each within `planner.picker_days` after DAY
        #[arg(long, value_delimiter = ',')]
        dates: Vec<NaiveDate>,
        /// Also copy showtimes whose date, hall and time already exist
        #[arg(long)]
        allow_duplicates: bool,
        /// Print the showtimes without creating them
        #[arg(long)]
        dry_run: bool,
    },
}

pub async fn execute(args: &PlanArgs, ctx: &Context) -> anyhow::Result<()> {
    match &args.command {
        PlanCommand::Show { day } => show(ctx, *day).await,
        PlanCommand::Check { day, plan, save } => check(ctx, *day, plan, *save).await,
        PlanCommand::Slots { day, hall, plan, row, schedule } => {
            slots(ctx, *day, *hall, plan.as_deref(), *row, *schedule).await
        }
        PlanCommand::Copy { day, halls, days, dates, allow_duplicates, dry_run } => {
            let halls = if halls.is_empty() { ctx.config.planner.halls.clone() } else { halls.clone() };
            let targets = if dates.is_empty() {
                CopyTargets::NextDays(days.unwrap_or(1))
            } else {
                CopyTargets::Dates(dates.clone())
            };
            let request = CopyRequest {
                source_day: *day,
                halls,
                targets,
                skip_duplicates: !allow_duplicates,
                picker_days: ctx.config.planner.picker_days,
            };
            copy(ctx, &request, *dry_run).await
        }
    }
}

pub(crate) async fn detector(ctx: &Context, day: NaiveDate) -> anyhow::Result<ConflictDetector> {
    let movies = ctx.client.list_movies().await?;
    let schedules = ctx.client.list_schedules().await?;
    Ok(ConflictDetector::new(&movies, schedules, day, &ctx.config.planner))
}

async fn show(ctx: &Context, day: NaiveDate) -> anyhow::Result<()> {
    let detector = detector(ctx, day).await?;
    let blocks = detector.existing_blocks();

    ctx.emit(&blocks, || {
        let mut out = format!("Showtimes on {}", day);
        for hall in detector.halls() {
            out.push_str(&format!("\nHall {}", hall));
            match blocks.get(hall) {
                Some(list) if !list.is_empty() => {
                    for block in list {
                        out.push_str(&format!("\n  #{:<5} {}", block.id, block.label));
                    }
                }
                _ => out.push_str("\n  (none)"),
            }
        }
        out
    })
}

async fn check(ctx: &Context, day: NaiveDate, path: &Path, save: bool) -> anyhow::Result<()> {
    let detector = detector(ctx, day).await?;
    let plan = load_plan(Some(path), detector.halls())?;

    if !ctx.is_json() {
        for hall in plan.halls() {
            for (i, row) in plan.rows(hall).iter().enumerate() {
                let span = detector.end_label(row).unwrap_or_else(|| "incomplete".to_string());
                println!("Hall {} row {}: {}", hall, i + 1, span);
            }
        }
    }

    let payloads = match detector.validate_save(&plan) {
        Ok(payloads) => payloads,
        Err(PlanError::Conflicts(conflicts)) => {
            ctx.emit(&conflicts, || {
                conflicts.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
            })?;
            anyhow::bail!("{} time conflict(s), nothing saved", conflicts.len());
        }
        Err(e) => return Err(e.into()),
    };

    if !save {
        return ctx.emit(&payloads, || format!("No conflicts, {} showtime(s) ready to save", payloads.len()));
    }
    let created = create_all(ctx, &payloads, "Error while saving showtimes").await?;
    ctx.emit(&created, || format!("Saved {} showtime(s)", created.len()))
}

async fn slots(
    ctx: &Context,
    day: NaiveDate,
    hall: u32,
    plan: Option<&Path>,
    row: Option<usize>,
    schedule: Option<i64>,
) -> anyhow::Result<()> {
    let detector = detector(ctx, day).await?;
    let plan = load_plan(plan, detector.halls())?;
    let grid = SlotGrid::from_settings(&ctx.config.planner);

    let times = match schedule {
        Some(id) => {
            let current = detector
                .schedules()
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.start_time().to_string())
                .ok_or_else(|| anyhow::anyhow!(PlanError::UnknownSchedule(id)))?;
            detector.available_times_for_existing(&grid, &plan, hall, id, Some(current.as_str()))
        }
        None => {
            let index = row.unwrap_or(plan.rows(hall).len());
            let current = plan.rows(hall).get(index).map(|r| r.time.clone());
            detector.available_times_for_row(&grid, &plan, hall, index, current.as_deref())
        }
    };

    ctx.emit(&times, || times.join(" "))
}

async fn copy(ctx: &Context, request: &CopyRequest, dry_run: bool) -> anyhow::Result<()> {
    let schedules = ctx.client.list_schedules().await?;
    let payloads = plan_copy(&schedules, request)?;

    if dry_run {
        return ctx.emit(&payloads, || {
            payloads
                .iter()
                .map(|p| format!("{} {} hall {} movie {}", p.date, p.time, p.hall, p.movie_id))
                .collect::<Vec<_>>()
                .join("\n")
        });
    }
    let created = create_all(ctx, &payloads, "Error while copying showtimes").await?;
    ctx.emit(&created, || format!("Copied {} showtime(s)", created.len()))
}

/// Create showtimes one by one, stopping at the first failure. Earlier ones
/// stay created.
async fn create_all(ctx: &Context, payloads: &[ScheduleCreate], fallback: &str) -> anyhow::Result<Vec<Schedule>> {
    let mut created = Vec::with_capacity(payloads.len());
    for payload in payloads {
        match ctx.client.create_schedule(payload).await {
            Ok(schedule) => created.push(schedule),
            Err(e) => {
                tracing::warn!(done = created.len(), total = payloads.len(), "Create failed: {}", e);
                anyhow::bail!("{} ({} of {} created)", e.user_message(fallback), created.len(), payloads.len());
            }
        }
    }
    tracing::info!(count = created.len(), "Showtimes created");
    Ok(created)
}
