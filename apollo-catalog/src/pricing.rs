use apollo_shared::TicketPriceRow;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Price tier applied to a ticket, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    CheapThursday,
    ThreeDaysBefore,
    TwoDaysBefore,
    OneDayBefore,
    SameDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub tier: PriceTier,
    pub price: f64,
}

/// Ticket price list keyed by ticket type, case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    rows: HashMap<String, TicketPriceRow>,
}

impl PriceTable {
    pub fn new(rows: Vec<TicketPriceRow>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| (normalize_type(&row.ticket_type), row))
            .collect();
        Self { rows }
    }

    pub fn get(&self, ticket_type: &str) -> Option<&TicketPriceRow> {
        self.rows.get(&normalize_type(ticket_type))
    }

    /// Ticket type names as the API spells them, sorted.
    pub fn ticket_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.rows.values().map(|r| r.ticket_type.as_str()).collect();
        types.sort_unstable();
        types
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn normalize_type(ticket_type: &str) -> String {
    ticket_type.trim().to_lowercase()
}

/// Resolves a per-seat price from the ticket type and how far away the
/// showtime is.
pub struct PricingEngine {
    table: PriceTable,
}

impl PricingEngine {
    pub fn new(table: PriceTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }

    /// Price for one seat. Unknown ticket types price at 0.
    pub fn price(&self, ticket_type: &str, date: NaiveDate, time: &str, now: NaiveDateTime) -> f64 {
        self.quote(ticket_type, date, time, now).price
    }

    /// First matching tier wins: cheap Thursday, then 3+, 2 and 1 days
    /// before, then same day.
    pub fn quote(&self, ticket_type: &str, date: NaiveDate, time: &str, now: NaiveDateTime) -> Quote {
        let showtime = showtime_datetime(date, time);
        let days = days_until(showtime, now);

        let Some(row) = self.table.get(ticket_type) else {
            tracing::debug!(ticket_type, "No price row for ticket type");
            return Quote { tier: PriceTier::SameDay, price: 0.0 };
        };

        let thursday = showtime.weekday() == Weekday::Thu || now.weekday() == Weekday::Thu;

        let candidates = [
            (thursday, PriceTier::CheapThursday, row.cheap_thursday),
            (days >= 3, PriceTier::ThreeDaysBefore, row.three_days_before),
            (days == 2, PriceTier::TwoDaysBefore, row.two_days_before),
            (days == 1, PriceTier::OneDayBefore, row.one_day_before),
        ];

        candidates
            .into_iter()
            .find_map(|(applies, tier, price)| match (applies, price) {
                (true, Some(price)) => Some(Quote { tier, price }),
                _ => None,
            })
            .unwrap_or(Quote {
                tier: PriceTier::SameDay,
                price: row.same_day.unwrap_or(0.0),
            })
    }
}

/// Showtime date with its `HH:MM` applied. Missing or garbled parts count as 0.
pub fn showtime_datetime(date: NaiveDate, time: &str) -> NaiveDateTime {
    let mut parts = time.trim().split(':');
    let hour = parts.next().and_then(|h| h.trim().parse::<u32>().ok()).unwrap_or(0);
    let minute = parts.next().and_then(|m| m.trim().parse::<u32>().ok()).unwrap_or(0);
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time)
}

/// Whole days between now and the showtime, rounded down. A showtime 1 day
/// and 23 hours away is 1 day out, one already started is negative.
pub fn days_until(showtime: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (showtime - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}
