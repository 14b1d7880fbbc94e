use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{Result, TrainingError};

/// Ordered, immutable close prices. Every value is finite and positive.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceSeries {
    closes: Vec<f64>,
    dates: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close")]
    close: f64,
}

impl PriceSeries {
    pub fn new(closes: Vec<f64>) -> Result<Self> {
        if closes.is_empty() {
            return Err(TrainingError::EmptySeries);
        }
        if let Some((index, &value)) = closes
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p <= 0.0)
        {
            return Err(TrainingError::InvalidPrice { index, value });
        }
        Ok(Self {
            closes,
            dates: None,
        })
    }

    /// Reads a CSV with `Date` and `Close` columns and orders it oldest first.
    ///
    /// Dates are day-first (`DD/MM/YYYY`) or ISO (`YYYY-MM-DD`). Rows sharing
    /// a date keep their file order. The raw date strings are kept as labels.
    ///
    /// # Errors
    /// `InvalidDate` naming the first data row (0-based) whose date parses in neither format
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for (row, record) in reader.deserialize::<CsvRow>().enumerate() {
            let record = record?;
            let date = parse_date(&record.date).ok_or_else(|| TrainingError::InvalidDate {
                row,
                value: record.date.clone(),
            })?;
            rows.push((date, record));
        }
        rows.sort_by_key(|(date, _)| *date);

        let (dates, closes): (Vec<String>, Vec<f64>) = rows
            .into_iter()
            .map(|(_, record)| (record.date, record.close))
            .unzip();
        let mut series = Self::new(closes)?;
        series.dates = Some(dates);
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.closes.get(index).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.closes
    }

    pub fn dates(&self) -> Option<&[String]> {
        self.dates.as_deref()
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}
