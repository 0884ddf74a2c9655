use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wire format for every timestamp this service reads or writes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Principal,
    Fallback,
}

impl ProcessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::Principal => "principal",
            ProcessorKind::Fallback => "fallback",
        }
    }
}

/// Where a payment sits in its delivery lifecycle.
///
/// `PendingSave` means a processor already accepted the payment and only the
/// store write is outstanding. It is never reset, and a payment in this stage
/// is never delivered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    PendingSend,
    PendingSave,
}

/// Body posted by clients to the balancer and relayed verbatim over the duplex
/// channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSubmission {
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub correlation_id: String,
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
    pub processed_by: Option<ProcessorKind>,
    pub stage: Stage,
    pub attempts: u32,
}

impl Payment {
    pub fn new(correlation_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            amount,
            requested_at: now_millis(),
            processed_by: None,
            stage: Stage::PendingSend,
            attempts: 0,
        }
    }

    /// Decodes a raw duplex-channel message. Anything that is not a well-formed
    /// submission with a non-empty id and a non-negative amount is rejected.
    pub fn decode(raw: &[u8]) -> anyhow::Result<Self> {
        let submission: PaymentSubmission = serde_json::from_slice(raw)?;
        if submission.correlation_id.is_empty() {
            anyhow::bail!("correlationId is empty");
        }
        if submission.amount.is_sign_negative() {
            anyhow::bail!("amount {} is negative", submission.amount);
        }
        Ok(Self::new(submission.correlation_id, submission.amount))
    }

    pub fn stamp(&mut self, at: DateTime<Utc>) {
        self.requested_at = truncate_millis(at);
    }

    pub fn to_processor_request(&self) -> ProcessorRequest {
        ProcessorRequest {
            correlation_id: self.correlation_id.clone(),
            amount: self.amount,
            requested_at: self.requested_at,
        }
    }
}

/// Payload sent to a downstream processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorRequest {
    pub correlation_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "wire_timestamp")]
    pub requested_at: DateTime<Utc>,
}

pub fn now_millis() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

pub fn truncate_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(at)
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    chrono::NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

pub mod wire_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn decodes_submission() {
        let p = Payment::decode(br#"{"correlationId":"abc","amount":19.9}"#).unwrap();
        assert_eq!(p.correlation_id, "abc");
        assert_eq!(p.amount, dec!(19.9));
        assert_eq!(p.attempts, 0);
        assert_eq!(p.stage, Stage::PendingSend);
        assert!(p.processed_by.is_none());
    }

    #[test]
    fn rejects_malformed_submissions() {
        assert!(Payment::decode(b"not json").is_err());
        assert!(Payment::decode(br#"{"correlationId":"","amount":1}"#).is_err());
        assert!(Payment::decode(br#"{"correlationId":"x","amount":-1}"#).is_err());
        assert!(Payment::decode(br#"{"amount":1}"#).is_err());
    }

    #[test]
    fn timestamps_use_millisecond_wire_format() {
        let at = Utc.with_ymd_and_hms(2025, 7, 15, 12, 34, 56).unwrap() + TimeDelta::microseconds(789_123);
        let at = truncate_millis(at);
        assert_eq!(format_timestamp(&at), "2025-07-15T12:34:56.789Z");
        assert_eq!(parse_timestamp("2025-07-15T12:34:56.789Z").unwrap(), at);
        assert!(parse_timestamp("2025-07-15 12:34:56").is_err());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn processor_request_serializes_camel_case() {
        let mut p = Payment::new("c1", dec!(10.5));
        p.stamp(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let v = serde_json::to_value(p.to_processor_request()).unwrap();
        assert_eq!(v["correlationId"], "c1");
        assert_eq!(v["amount"], 10.5);
        assert_eq!(v["requestedAt"], "2025-01-01T00:00:00.000Z");
    }
}
