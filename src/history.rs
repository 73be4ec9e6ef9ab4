use crate::errors::StoreError;
use crate::models::{ChartSeries, HealthMetric, HistoryResponse};
use crate::store::HealthStore;
use chrono::{Duration, NaiveDate};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_RANGE_DAYS: i64 = 30;
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("start date {start} is after end date {end}")]
pub struct InvertedRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Fills in whatever bound is missing: `end` defaults to today and
    /// `start` to `DEFAULT_RANGE_DAYS` before `end`.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, InvertedRange> {
        let end = end.unwrap_or(today);
        let start = start.unwrap_or_else(|| {
            end.checked_sub_signed(Duration::days(DEFAULT_RANGE_DAYS))
                .unwrap_or(NaiveDate::MIN)
        });
        if start > end {
            return Err(InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Records in the range, most recent first.
pub async fn query_history(
    store: &dyn HealthStore,
    user_id: Uuid,
    range: DateRange,
) -> Result<Vec<HealthMetric>, StoreError> {
    store.metrics_in_range(user_id, range.start, range.end).await
}

/// Chart data runs oldest to newest, the reverse of the table order.
pub fn chart_series(records: &[HealthMetric]) -> ChartSeries {
    let ascending: Vec<&HealthMetric> = records.iter().rev().collect();
    ChartSeries {
        labels: ascending
            .iter()
            .map(|r| r.date.format("%b %d").to_string())
            .collect(),
        steps: ascending.iter().map(|r| r.steps).collect(),
        water: ascending.iter().map(|r| r.water_intake).collect(),
    }
}

pub fn build_history(range: DateRange, records: Vec<HealthMetric>) -> HistoryResponse {
    let chart = chart_series(&records);
    HistoryResponse {
        start: range.start,
        end: range.end,
        records,
        chart,
    }
}

#[derive(Debug)]
pub struct Page<'a> {
    pub rows: &'a [HealthMetric],
    /// 1-based.
    pub number: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

/// Requested pages outside `1..=total_pages` are clamped into it.
pub fn paginate(rows: &[HealthMetric], requested: Option<usize>) -> Page<'_> {
    let total_pages = rows.len().div_ceil(PAGE_SIZE).max(1);
    let number = requested.unwrap_or(1).clamp(1, total_pages);
    let start = (number - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(rows.len());
    Page {
        rows: rows.get(start..end).unwrap_or(&[]),
        number,
        total_pages,
        total_rows: rows.len(),
    }
}

pub fn format_table_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

pub fn format_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
