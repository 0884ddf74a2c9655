use crate::domain::payment::Payment;
use crate::domain::summary::{PaymentsSummary, TimeRange};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transient; the write may succeed if retried.
    #[error("payment store unavailable: {0}")]
    Unavailable(String),
    /// The record itself is unusable. Retrying will not help.
    #[error("corrupt payment record {correlation_id}: {reason}")]
    CorruptRecord { correlation_id: String, reason: String },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub trait PaymentStore: Send + Sync {
    fn save(&self, payment: &Payment) -> Result<(), StoreError>;

    fn summarize(&self, range: &TimeRange) -> Result<PaymentsSummary, StoreError>;

    fn len(&self) -> Result<usize, StoreError>;
}

/// Process-lifetime store keyed by `requested_at`. Several payments can land
/// in the same millisecond, so each key holds a bucket in insertion order.
/// Entries are never removed.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    buckets: Mutex<BTreeMap<DateTime<Utc>, Vec<Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutations are single pushes; a poisoned lock still guards a consistent map.
    fn locked(&self) -> MutexGuard<'_, BTreeMap<DateTime<Utc>, Vec<Payment>>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every stored payment, oldest bucket first.
    pub fn payments(&self) -> Vec<Payment> {
        self.locked().values().flatten().cloned().collect()
    }

    pub fn bucket(&self, at: &DateTime<Utc>) -> Vec<Payment> {
        self.locked().get(at).cloned().unwrap_or_default()
    }
}

impl PaymentStore for InMemoryPaymentStore {
    fn save(&self, payment: &Payment) -> Result<(), StoreError> {
        if payment.processed_by.is_none() {
            return Err(StoreError::CorruptRecord {
                correlation_id: payment.correlation_id.clone(),
                reason: "no processor recorded".to_string(),
            });
        }

        let mut buckets = self.locked();
        buckets
            .entry(payment.requested_at)
            .or_default()
            .push(payment.clone());
        Ok(())
    }

    fn summarize(&self, range: &TimeRange) -> Result<PaymentsSummary, StoreError> {
        let mut summary = PaymentsSummary::default();
        if range.is_empty() {
            return Ok(summary);
        }

        let lower = range.from.map_or(Bound::Unbounded, Bound::Excluded);
        let upper = range.to.map_or(Bound::Unbounded, Bound::Excluded);

        let buckets = self.locked();
        for payment in buckets.range((lower, upper)).flat_map(|(_, bucket)| bucket.iter()) {
            summary.record(payment);
        }
        Ok(summary)
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.locked().values().map(Vec::len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{parse_timestamp, ProcessorKind};
    use rust_decimal_macros::dec;

    fn saved(id: &str, amount: rust_decimal::Decimal, at: &str, by: ProcessorKind) -> Payment {
        let mut p = Payment::new(id, amount);
        p.requested_at = parse_timestamp(at).unwrap();
        p.processed_by = Some(by);
        p
    }

    #[test]
    fn same_millisecond_payments_share_a_bucket() {
        let store = InMemoryPaymentStore::new();
        let a = saved("a", dec!(1), "2025-07-15T12:00:00.000Z", ProcessorKind::Principal);
        let b = saved("b", dec!(2), "2025-07-15T12:00:00.000Z", ProcessorKind::Fallback);
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        let bucket = store.bucket(&a.requested_at);
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].correlation_id, "a");
        assert_eq!(bucket[1].correlation_id, "b");
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn range_excludes_exact_bounds() {
        let store = InMemoryPaymentStore::new();
        for (id, at) in [
            ("at_from", "2025-07-15T12:00:00.000Z"),
            ("inside", "2025-07-15T12:00:00.001Z"),
            ("at_to", "2025-07-15T12:00:01.000Z"),
        ] {
            store.save(&saved(id, dec!(10), at, ProcessorKind::Principal)).unwrap();
        }

        let range = TimeRange::parse(Some("2025-07-15T12:00:00.000Z"), Some("2025-07-15T12:00:01.000Z")).unwrap();
        let s = store.summarize(&range).unwrap();
        assert_eq!(s.default.total_requests, 1);
        assert_eq!(s.default.total_amount, dec!(10));

        let all = store.summarize(&TimeRange::unbounded()).unwrap();
        assert_eq!(all.default.total_requests, 3);
    }

    #[test]
    fn inverted_range_is_empty() {
        let store = InMemoryPaymentStore::new();
        store
            .save(&saved("a", dec!(1), "2025-07-15T12:00:00.500Z", ProcessorKind::Principal))
            .unwrap();
        let range = TimeRange::parse(Some("2025-07-15T12:00:01.000Z"), Some("2025-07-15T12:00:00.000Z")).unwrap();
        assert_eq!(store.summarize(&range).unwrap(), PaymentsSummary::default());
        let same = TimeRange::parse(Some("2025-07-15T12:00:00.500Z"), Some("2025-07-15T12:00:00.500Z")).unwrap();
        assert_eq!(store.summarize(&same).unwrap(), PaymentsSummary::default());
    }

    #[test]
    fn rejects_undelivered_record() {
        let store = InMemoryPaymentStore::new();
        let err = store.save(&Payment::new("a", dec!(1))).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn keeps_serving_after_a_panic_under_the_lock() {
        let store = InMemoryPaymentStore::new();
        store
            .save(&saved("before", dec!(1), "2025-07-15T12:00:00.000Z", ProcessorKind::Principal))
            .unwrap();

        let crashed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _held = store.buckets.lock().unwrap();
            panic!("worker crashed while holding the store");
        }));
        assert!(crashed.is_err());
        assert!(store.buckets.is_poisoned());

        store
            .save(&saved("after", dec!(2), "2025-07-15T12:00:00.001Z", ProcessorKind::Fallback))
            .unwrap();
        assert_eq!(store.len().unwrap(), 2);
        let s = store.summarize(&TimeRange::unbounded()).unwrap();
        assert_eq!(s.default.total_amount + s.fallback.total_amount, dec!(3));
    }
}
