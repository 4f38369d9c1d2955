//! One flat row per calendar day, in the fixed column order of the output.

use crate::domains::activities::ActivityTotals;
use crate::domains::body::{BloodPressure, BodyMetrics};
use crate::domains::hrv::HrvMetrics;
use crate::domains::sleep::SleepMetrics;
use crate::domains::summary::SummaryMetrics;
use crate::domains::training::TrainingMetrics;
use chrono::NaiveDate;
use serde_json::Value;
use std::fmt;

/// Column headers, in output order. Column A is always the date.
pub const HEADERS: [&str; 30] = [
    "Date",
    "Sleep Score",
    "Sleep Length",
    "HRV (ms)",
    "HRV Status",
    "Weight (kg)",
    "Body Fat %",
    "Blood Pressure Systolic",
    "Blood Pressure Diastolic",
    "Active Calories",
    "Resting Calories",
    "Resting Heart Rate",
    "Average Stress",
    "Training Status",
    "VO2 Max Running",
    "VO2 Max Cycling",
    "Intensity Minutes",
    "All Activity Count",
    "Running Activity Count",
    "Running Distance (km)",
    "Cycling Activity Count",
    "Cycling Distance (km)",
    "Strength Activity Count",
    "Strength Duration",
    "Cardio Activity Count",
    "Cardio Duration",
    "Tennis Activity Count",
    "Tennis Activity Duration",
    "Steps",
    "Activity Calories",
];

/// A single output value.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    /// Rounded to two decimals when rendered.
    Float(f64),
    Text(String),
}

impl Cell {
    /// JSON value for the Sheets API; blanks are sent as `""`.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::String(String::new()),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(round2(*f))
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(String::new())),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(v) if v.is_finite() => write!(f, "{}", round2(*v)),
            Cell::Float(_) => Ok(()),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<Option<i64>> for Cell {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Cell::Empty, Cell::Int)
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Cell::Empty, Cell::Float)
    }
}

impl From<Option<String>> for Cell {
    fn from(v: Option<String>) -> Self {
        v.map_or(Cell::Empty, Cell::Text)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Every metric collected for one day. Any part may be blank.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub sleep: SleepMetrics,
    pub hrv: HrvMetrics,
    pub body: BodyMetrics,
    pub blood_pressure: BloodPressure,
    pub summary: SummaryMetrics,
    pub training: TrainingMetrics,
    /// `None` on days without any recorded activity.
    pub activities: Option<ActivityTotals>,
}

impl DailyRecord {
    /// A record with only the date set.
    pub fn blank(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    /// ISO `YYYY-MM-DD` key used to match existing spreadsheet rows.
    pub fn date_key(&self) -> String {
        self.date.format(crate::date_range::DATE_FORMAT).to_string()
    }

    /// True when nothing but the date was collected.
    pub fn is_blank(&self) -> bool {
        self.to_row().iter().skip(1).all(|c| *c == Cell::Empty)
    }

    /// Cells in [`HEADERS`] order.
    pub fn to_row(&self) -> Vec<Cell> {
        let act = self.activities.as_ref();
        let count = |f: fn(&ActivityTotals) -> i64| Cell::from(act.map(f));
        let amount = |f: fn(&ActivityTotals) -> f64| Cell::from(act.map(f));

        vec![
            Cell::Text(self.date_key()),
            self.sleep.score.into(),
            self.sleep.length_hours.into(),
            self.hrv.last_night_avg.into(),
            self.hrv.status.clone().into(),
            self.body.weight_kg.into(),
            self.body.body_fat_pct.into(),
            self.blood_pressure.systolic.into(),
            self.blood_pressure.diastolic.into(),
            self.summary.active_calories.into(),
            self.summary.resting_calories.into(),
            self.summary.resting_heart_rate.into(),
            self.summary.average_stress.into(),
            self.training.status.clone().into(),
            self.training.vo2max_running.into(),
            self.training.vo2max_cycling.into(),
            self.summary.intensity_minutes.into(),
            count(|a| a.all_count),
            count(|a| a.running_count),
            amount(|a| a.running_distance_km),
            count(|a| a.cycling_count),
            amount(|a| a.cycling_distance_km),
            count(|a| a.strength_count),
            amount(|a| a.strength_minutes),
            count(|a| a.cardio_count),
            amount(|a| a.cardio_minutes),
            count(|a| a.tennis_count),
            amount(|a| a.tennis_minutes),
            self.summary.steps.into(),
            act.and_then(|a| a.calories).into(),
        ]
    }
}
