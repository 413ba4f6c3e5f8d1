use apollo_shared::{CheckoutSeat, CheckoutSessionRequest, SeatCoord};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::pricing::PricingEngine;

/// One ticket line at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub row: u32,
    pub col: u32,
    pub row_label: String,
    pub seat_number: u32,
    pub ticket_type: String,
    pub price: f64,
}

/// Tickets for the seats a shopper holds, priced against one showtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCart {
    date: NaiveDate,
    time: String,
    items: Vec<CheckoutItem>,
}

impl CheckoutCart {
    /// Snapshot the selection at the moment checkout begins, every seat with
    /// `default_type`.
    pub fn new(
        seats: &[SeatCoord],
        default_type: &str,
        date: NaiveDate,
        time: &str,
        engine: &PricingEngine,
        now: NaiveDateTime,
    ) -> Result<Self, CheckoutError> {
        if seats.is_empty() {
            return Err(CheckoutError::Empty);
        }

        let price = engine.price(default_type, date, time, now);
        let items = seats
            .iter()
            .map(|seat| CheckoutItem {
                row: seat.row,
                col: seat.col,
                row_label: row_label(seat.row),
                seat_number: seat.col + 1,
                ticket_type: default_type.to_string(),
                price,
            })
            .collect();

        Ok(Self { date, time: time.to_string(), items })
    }

    pub fn items(&self) -> &[CheckoutItem] {
        &self.items
    }

    /// Change one ticket's type and reprice that ticket only. Returns the
    /// new running total.
    pub fn set_type(
        &mut self,
        index: usize,
        ticket_type: &str,
        engine: &PricingEngine,
        now: NaiveDateTime,
    ) -> Result<f64, CheckoutError> {
        let price = engine.price(ticket_type, self.date, &self.time, now);
        let item = self
            .items
            .get_mut(index)
            .ok_or(CheckoutError::NoSuchItem(index))?;
        item.ticket_type = ticket_type.to_string();
        item.price = price;
        Ok(self.total())
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(|item| item.price).sum()
    }

    pub fn seats(&self) -> Vec<SeatCoord> {
        self.items.iter().map(|i| SeatCoord::new(i.row, i.col)).collect()
    }

    pub fn to_session_request(&self, schedule_id: i64, hall: Option<u32>) -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            schedule_id,
            hall,
            seats: self
                .items
                .iter()
                .map(|item| CheckoutSeat {
                    row_index: item.row,
                    col_index: item.col,
                    row_label: item.row_label.clone(),
                    seat_number: item.seat_number,
                    ticket_type: item.ticket_type.clone(),
                    price: item.price,
                })
                .collect(),
            success_url: None,
            cancel_url: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("No seats selected")]
    Empty,

    #[error("No checkout item at position {0}")]
    NoSuchItem(usize),
}

/// Spreadsheet-style row label: 0 is `A`, 25 is `Z`, 26 is `AA`.
pub fn row_label(index: u32) -> String {
    let mut label = Vec::new();
    let mut n = index as u64 + 1;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        label.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}
