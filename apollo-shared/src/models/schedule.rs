use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A movie as listed by GET /movie/movies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub genre: Option<String>,
    /// Free-form runtime: `"2h 15m"`, `"2:15"` or `"135"`.
    pub duration: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Movie fields embedded in a schedule payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieSummary {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// A persisted showtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    #[serde(default)]
    pub movie_id: Option<i64>,
    pub date: NaiveDate,
    pub time: String,
    #[serde(default, deserialize_with = "deserialize_hall")]
    pub hall: Option<u32>,
    #[serde(default)]
    pub movie_type: Option<String>,
    #[serde(default)]
    pub movie: Option<MovieSummary>,
}

impl Schedule {
    /// Movie id, falling back to the embedded movie when the flat field is absent.
    pub fn movie_id(&self) -> Option<i64> {
        self.movie
            .as_ref()
            .and_then(|m| m.id)
            .or(self.movie_id)
    }

    pub fn title(&self) -> &str {
        self.movie
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .unwrap_or("")
    }

    /// Trimmed start time as entered by the admin.
    pub fn start_time(&self) -> &str {
        self.time.trim()
    }
}

/// POST /movie/schedules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCreate {
    pub movie_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub movie_type: Option<String>,
    pub hall: u32,
}

/// PATCH /movie/schedules/{id}; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hall: Option<u32>,
}

/// Normalises a hall label such as `"3"`, `"Sala 3"` or `"sala-3"` to its number.
/// Hall `0` is treated as "no hall".
pub fn normalize_hall(raw: &str) -> Option<u32> {
    let mut s = raw.trim();
    if s.to_lowercase().starts_with("sala") {
        s = match s.split_once(char::is_whitespace) {
            Some((_, rest)) => rest,
            None => s.get(4..).unwrap_or(""),
        };
        s = s.trim().trim_start_matches('-').trim();
    }
    s.parse::<u32>().ok().filter(|h| *h > 0)
}

fn deserialize_hall<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .and_then(|h| u32::try_from(h).ok())
            .filter(|h| *h > 0),
        Some(serde_json::Value::String(s)) => normalize_hall(&s),
        _ => None,
    })
}
