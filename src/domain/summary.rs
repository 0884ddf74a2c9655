use crate::domain::payment::{parse_timestamp, Payment, ProcessorKind};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorTotals {
    pub total_requests: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl ProcessorTotals {
    pub fn add(&mut self, other: &ProcessorTotals) {
        self.total_requests += other.total_requests;
        self.total_amount += other.total_amount;
    }
}

/// Aggregate served by `/payments-summary`. `default` counts payments handled
/// by the principal processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentsSummary {
    pub default: ProcessorTotals,
    pub fallback: ProcessorTotals,
}

impl PaymentsSummary {
    pub fn record(&mut self, payment: &Payment) {
        let totals = match payment.processed_by {
            Some(ProcessorKind::Fallback) => &mut self.fallback,
            _ => &mut self.default,
        };
        totals.total_requests += 1;
        totals.total_amount += payment.amount;
    }

    pub fn merge(&mut self, other: &PaymentsSummary) {
        self.default.add(&other.default);
        self.fallback.add(&other.fallback);
    }

    pub fn rounded(mut self) -> Self {
        self.default.total_amount = round_amount(self.default.total_amount);
        self.fallback.total_amount = round_amount(self.fallback.total_amount);
        self
    }

    pub fn total_requests(&self) -> u64 {
        self.default.total_requests + self.fallback.total_requests
    }
}

/// Half-up at two decimal places.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, thiserror::Error)]
#[error("invalid `{field}` timestamp {value:?}")]
pub struct TimeRangeError {
    pub field: &'static str,
    pub value: String,
}

/// Summary window. Both bounds are exclusive; an absent bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Empty strings are treated as absent, matching how query strings arrive.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, TimeRangeError> {
        Ok(Self {
            from: parse_bound("from", from)?,
            to: parse_bound("to", to)?,
        })
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| *at > from) && self.to.map_or(true, |to| *at < to)
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from >= to)
    }
}

fn parse_bound(field: &'static str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, TimeRangeError> {
    match raw.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => parse_timestamp(value).map(Some).map_err(|_| TimeRangeError {
            field,
            value: value.to_string(),
        }),
    }
}
