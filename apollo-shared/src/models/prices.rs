use serde::{Deserialize, Deserializer, Serialize};

/// One row of GET /general/ticket-prices.
///
/// The API stores tier prices as text, so every tier is decoded leniently:
/// numbers and numeric strings are accepted, anything else means "no price
/// for this tier".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketPriceRow {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub ticket_type: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub cheap_thursday: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub three_days_before: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub two_days_before: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub one_day_before: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub same_day: Option<f64>,
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim().replace(',', ".");
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok().filter(|p| p.is_finite())
            }
        }
        _ => None,
    })
}
