//! Data models for the station pipeline.
//!
//! `GatewayUpload` is what the station gateway posts, `FieldUpdate` is what
//! the message bus delivers, and both normalize into a `Reading`, the only
//! shape the rest of the pipeline deals with.

use std::collections::HashMap;

use chrono::{Datelike, Local, TimeZone, Utc};
use serde::Serialize;

use crate::units::{
    fahrenheit_to_celsius, finite_or_default, inches_to_mm, inhg_to_hpa, mph_to_kmh,
    parse_or_default, round_to,
};

// ---

/// Rain accumulations in millimetres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct RainTotals {
    // ---
    pub rainrate_mm: f64,
    pub event_mm: f64,
    pub hourly_mm: f64,
    pub last24h_mm: f64,
    pub daily_mm: f64,
    pub weekly_mm: f64,
    pub monthly_mm: f64,
    pub yearly_mm: f64,
}

impl RainTotals {
    /// Copy with every total rounded to `decimals` places.
    pub fn rounded(&self, decimals: i32) -> RainTotals {
        RainTotals {
            rainrate_mm: round_to(self.rainrate_mm, decimals),
            event_mm: round_to(self.event_mm, decimals),
            hourly_mm: round_to(self.hourly_mm, decimals),
            last24h_mm: round_to(self.last24h_mm, decimals),
            daily_mm: round_to(self.daily_mm, decimals),
            weekly_mm: round_to(self.weekly_mm, decimals),
            monthly_mm: round_to(self.monthly_mm, decimals),
            yearly_mm: round_to(self.yearly_mm, decimals),
        }
    }
}

/// One normalized observation. Metric units throughout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct Reading {
    // ---
    #[sqlx(rename = "ts")]
    pub timestamp: i64,
    pub location: String,
    /// °C
    pub temperature: f64,
    /// %, 0..=100
    pub humidity: i64,
    /// km/h
    pub windspeed: f64,
    /// degrees
    pub winddir: f64,
    /// hPa
    pub pressure: f64,
    /// W/m²
    pub solarradiation: f64,
    pub uv: f64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub rain: RainTotals,
}

/// One row per local calendar day with the last rain totals seen that day.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct DailyRollup {
    // ---
    /// YYYYMMDD
    pub day: i64,
    /// Timestamp of the last update applied to this day.
    pub ts: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub rain: RainTotals,
}

impl DailyRollup {
    pub fn from_reading(reading: &Reading) -> Self {
        DailyRollup {
            day: calendar_day(reading.timestamp),
            ts: reading.timestamp,
            rain: reading.rain.clone(),
        }
    }
}

/// Local calendar day of an epoch timestamp as `YYYYMMDD`.
pub fn calendar_day(ts: i64) -> i64 {
    // ---
    let (year, month, day) = match Local.timestamp_opt(ts, 0).earliest() {
        Some(local) => (local.year(), local.month(), local.day()),
        None => {
            let utc = Utc.timestamp_opt(ts, 0).earliest().unwrap_or_default();
            (utc.year(), utc.month(), utc.day())
        }
    };
    i64::from(year) * 10_000 + i64::from(month) * 100 + i64::from(day)
}

/// Every metric the pipeline tracks, in the fixed order used for trend
/// classification and history output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Temperature,
    Humidity,
    WindSpeed,
    WindDir,
    Pressure,
    SolarRadiation,
    Uv,
    RainRate,
    RainEvent,
    RainHourly,
    RainLast24h,
    RainDaily,
    RainWeekly,
    RainMonthly,
    RainYearly,
}

impl Metric {
    pub const ALL: [Metric; 15] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::WindSpeed,
        Metric::WindDir,
        Metric::Pressure,
        Metric::SolarRadiation,
        Metric::Uv,
        Metric::RainRate,
        Metric::RainEvent,
        Metric::RainHourly,
        Metric::RainLast24h,
        Metric::RainDaily,
        Metric::RainWeekly,
        Metric::RainMonthly,
        Metric::RainYearly,
    ];

    /// Metrics that carry an up/down/same trend on the latest snapshot.
    pub const TRENDED: [Metric; 8] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::WindSpeed,
        Metric::WindDir,
        Metric::Pressure,
        Metric::SolarRadiation,
        Metric::Uv,
        Metric::RainRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::WindSpeed => "windspeed",
            Metric::WindDir => "winddir",
            Metric::Pressure => "pressure",
            Metric::SolarRadiation => "solarradiation",
            Metric::Uv => "uv",
            Metric::RainRate => "rainrate_mm",
            Metric::RainEvent => "event_mm",
            Metric::RainHourly => "hourly_mm",
            Metric::RainLast24h => "last24h_mm",
            Metric::RainDaily => "daily_mm",
            Metric::RainWeekly => "weekly_mm",
            Metric::RainMonthly => "monthly_mm",
            Metric::RainYearly => "yearly_mm",
        }
    }

    pub fn from_key(key: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.as_str() == key)
    }

    /// Decimal places kept on ingest. Rain totals are stored at full
    /// precision and only rounded for display.
    fn precision(self) -> Option<i32> {
        match self {
            Metric::Temperature | Metric::WindSpeed | Metric::Pressure => Some(2),
            Metric::WindDir | Metric::SolarRadiation | Metric::Uv => Some(1),
            Metric::Humidity => Some(0),
            _ => None,
        }
    }
}

impl Reading {
    pub fn metric(&self, metric: Metric) -> f64 {
        // ---
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity as f64,
            Metric::WindSpeed => self.windspeed,
            Metric::WindDir => self.winddir,
            Metric::Pressure => self.pressure,
            Metric::SolarRadiation => self.solarradiation,
            Metric::Uv => self.uv,
            Metric::RainRate => self.rain.rainrate_mm,
            Metric::RainEvent => self.rain.event_mm,
            Metric::RainHourly => self.rain.hourly_mm,
            Metric::RainLast24h => self.rain.last24h_mm,
            Metric::RainDaily => self.rain.daily_mm,
            Metric::RainWeekly => self.rain.weekly_mm,
            Metric::RainMonthly => self.rain.monthly_mm,
            Metric::RainYearly => self.rain.yearly_mm,
        }
    }

    /// Store a metric value, applying the snapshot rounding and the
    /// finite/humidity-range invariants.
    pub fn set_metric(&mut self, metric: Metric, value: f64) {
        // ---
        let value = finite_or_default(value);
        let value = match metric.precision() {
            Some(decimals) => finite_or_default(round_to(value, decimals)),
            None => value,
        };
        let slot = match metric {
            Metric::Humidity => {
                self.humidity = value.clamp(0.0, 100.0) as i64;
                return;
            }
            Metric::Temperature => &mut self.temperature,
            Metric::WindSpeed => &mut self.windspeed,
            Metric::WindDir => &mut self.winddir,
            Metric::Pressure => &mut self.pressure,
            Metric::SolarRadiation => &mut self.solarradiation,
            Metric::Uv => &mut self.uv,
            Metric::RainRate => &mut self.rain.rainrate_mm,
            Metric::RainEvent => &mut self.rain.event_mm,
            Metric::RainHourly => &mut self.rain.hourly_mm,
            Metric::RainLast24h => &mut self.rain.last24h_mm,
            Metric::RainDaily => &mut self.rain.daily_mm,
            Metric::RainWeekly => &mut self.rain.weekly_mm,
            Metric::RainMonthly => &mut self.rain.monthly_mm,
            Metric::RainYearly => &mut self.rain.yearly_mm,
        };
        *slot = value;
    }
}

/// Raw form fields posted by the station gateway (imperial units, strings).
#[derive(Debug, Clone, Default)]
pub struct GatewayUpload {
    pub fields: HashMap<String, String>,
}

/// Gateway field name and the conversion into the metric it feeds.
const GATEWAY_FIELDS: [(&str, Metric, fn(f64) -> f64); 15] = [
    ("tempf", Metric::Temperature, fahrenheit_to_celsius),
    ("humidity", Metric::Humidity, identity),
    ("windspeedmph", Metric::WindSpeed, mph_to_kmh),
    ("winddir", Metric::WindDir, identity),
    ("baromrelin", Metric::Pressure, inhg_to_hpa),
    ("solarradiation", Metric::SolarRadiation, identity),
    ("uv", Metric::Uv, identity),
    ("rainratein", Metric::RainRate, inches_to_mm),
    ("eventrainin", Metric::RainEvent, inches_to_mm),
    ("hourlyrainin", Metric::RainHourly, inches_to_mm),
    ("last24hrainin", Metric::RainLast24h, inches_to_mm),
    ("dailyrainin", Metric::RainDaily, inches_to_mm),
    ("weeklyrainin", Metric::RainWeekly, inches_to_mm),
    ("monthlyrainin", Metric::RainMonthly, inches_to_mm),
    ("yearlyrainin", Metric::RainYearly, inches_to_mm),
];

fn identity(v: f64) -> f64 {
    v
}

impl GatewayUpload {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Normalize into a full `Reading`. Missing or malformed fields become 0.
    pub fn to_reading(&self, location: &str, timestamp: i64) -> Reading {
        // ---
        let mut reading = Reading {
            timestamp,
            location: location.to_string(),
            ..Reading::default()
        };
        for (field, metric, convert) in GATEWAY_FIELDS {
            let raw = parse_or_default(self.fields.get(field).map(String::as_str));
            reading.set_metric(metric, convert(raw));
        }
        reading
    }
}

/// Partial update of already-normalized values, as delivered by the bus.
#[derive(Debug, Clone, Default)]
pub struct FieldUpdate {
    pub values: HashMap<Metric, f64>,
}

impl FieldUpdate {
    /// Build from a JSON object. Unknown keys are ignored, values may be
    /// numbers or numeric strings.
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        // ---
        let values = object
            .iter()
            .filter_map(|(key, value)| {
                let metric = Metric::from_key(key)?;
                let v = match value {
                    serde_json::Value::Number(n) => finite_or_default(n.as_f64().unwrap_or(0.0)),
                    serde_json::Value::String(s) => parse_or_default(Some(s.as_str())),
                    _ => 0.0,
                };
                Some((metric, v))
            })
            .collect();
        Self { values }
    }

    /// Apply on top of `current`; metrics absent from the update keep their
    /// current value.
    pub fn merge_into(&self, current: &Reading, location: &str, timestamp: i64) -> Reading {
        // ---
        let mut reading = current.clone();
        reading.timestamp = timestamp;
        reading.location = location.to_string();
        for metric in Metric::ALL {
            if let Some(v) = self.values.get(&metric) {
                reading.set_metric(metric, *v);
            }
        }
        reading
    }
}
