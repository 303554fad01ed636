//! Date toolpack

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};

use super::Tool;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub const INVALID_DATE: &str = "Invalid date format. Please use YYYY-MM-DD";

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(TodayDate),
        Arc::new(CurrentWeek),
        Arc::new(WeekdayFromDate),
    ]
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// ISO week number with the calendar year, e.g. "Week 1, 2024"
pub fn week_label(date: NaiveDate) -> String {
    format!("Week {}, {}", date.iso_week().week(), date.year())
}

/// English weekday name of a `YYYY-MM-DD` date
pub fn weekday_name(date: &str) -> String {
    match NaiveDate::parse_from_str(date.trim(), DATE_FORMAT) {
        Ok(date) => date.format("%A").to_string(),
        Err(_) => INVALID_DATE.to_string(),
    }
}

pub struct TodayDate;

#[async_trait]
impl Tool for TodayDate {
    fn name(&self) -> &str {
        "get_today_date"
    }

    fn description(&self) -> &str {
        "Get today's date in YYYY-MM-DD format."
    }

    async fn call(&self, _args: &serde_json::Value) -> Result<String> {
        Ok(today().format(DATE_FORMAT).to_string())
    }
}

pub struct CurrentWeek;

#[async_trait]
impl Tool for CurrentWeek {
    fn name(&self) -> &str {
        "get_current_week"
    }

    fn description(&self) -> &str {
        "Get the current week number and year."
    }

    async fn call(&self, _args: &serde_json::Value) -> Result<String> {
        Ok(week_label(today()))
    }
}

pub struct WeekdayFromDate;

#[async_trait]
impl Tool for WeekdayFromDate {
    fn name(&self) -> &str {
        "get_weekday_from_date"
    }

    fn description(&self) -> &str {
        "Get the day of the week (e.g. 'Monday') from a date string."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "date_str": {
                    "type": "string",
                    "description": "Date in YYYY-MM-DD format"
                }
            },
            "required": ["date_str"]
        })
    }

    async fn call(&self, args: &serde_json::Value) -> Result<String> {
        let date = args
            .get("date_str")
            .and_then(|v| v.as_str())
            .context("Missing string argument 'date_str'")?;
        Ok(weekday_name(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekday_name() {
        assert_eq!(weekday_name("2024-01-01"), "Monday");
        assert_eq!(weekday_name("2000-02-29"), "Tuesday");
        assert_eq!(weekday_name("01/02/2024"), INVALID_DATE);
        assert_eq!(weekday_name("2023-02-29"), INVALID_DATE);
    }

    #[test]
    fn test_week_label_uses_calendar_year() {
        assert_eq!(week_label(date(2024, 3, 15)), "Week 11, 2024");
        // ISO week 1 of 2025 starts on 2024-12-30
        assert_eq!(week_label(date(2024, 12, 30)), "Week 1, 2024");
    }

    #[tokio::test]
    async fn test_today_matches_local_clock() {
        let before = today();
        let text = TodayDate.call(&serde_json::json!({})).await.unwrap();
        let parsed = NaiveDate::parse_from_str(&text, DATE_FORMAT).unwrap();
        assert!(parsed == before || parsed == today());

        let week = CurrentWeek.call(&serde_json::json!({})).await.unwrap();
        assert!(week.starts_with("Week "));
    }
}
