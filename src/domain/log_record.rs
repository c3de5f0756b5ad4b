use chrono::{DateTime, Utc};
use uuid::Uuid;

/// In-memory copy of one outbox row, fetched per claim cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub id: i64,
    pub event_type: String,
    pub body: String,
    pub flow_id: Option<String>,
    pub compaction_key: Option<String>,
    pub eid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub locked_by: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LogRecord {
    /// Stable event id: the explicit one if set at creation, otherwise the
    /// row id zero-padded into the low bits of a UUID.
    pub fn eid(&self) -> Uuid {
        self.eid.unwrap_or_else(|| derive_eid(self.id))
    }

    pub fn is_claimable_at(&self, now: DateTime<Utc>) -> bool {
        match self.locked_until {
            None => true,
            Some(until) => until < now,
        }
    }
}

pub fn derive_eid(id: i64) -> Uuid {
    Uuid::from_u128(id as u64 as u128)
}

/// A record ready to be persisted. Timestamps are stamped by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogRecord {
    pub event_type: String,
    pub body: String,
    pub flow_id: Option<String>,
    pub compaction_key: Option<String>,
    pub eid: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(id: i64, eid: Option<Uuid>) -> LogRecord {
        let now = Utc::now();
        LogRecord {
            id,
            event_type: "order.created".to_string(),
            body: "{}".to_string(),
            flow_id: None,
            compaction_key: None,
            eid,
            created_at: now,
            last_modified_at: now,
            locked_by: None,
            locked_until: None,
        }
    }

    #[test]
    fn derived_eid_is_stable_across_reads() {
        let first = record(213, None);
        let second = record(213, None);
        assert_eq!(first.eid(), second.eid());
        assert_eq!(
            first.eid().to_string(),
            "00000000-0000-0000-0000-0000000000d5"
        );
    }

    #[test]
    fn explicit_eid_wins_over_derived() {
        let explicit = Uuid::new_v4();
        assert_eq!(record(213, Some(explicit)).eid(), explicit);
    }

    #[test]
    fn claimable_when_unlocked_or_expired() {
        let now = Utc::now();
        let mut r = record(1, None);
        assert!(r.is_claimable_at(now));

        r.locked_until = Some(now - Duration::seconds(1));
        assert!(r.is_claimable_at(now));

        r.locked_until = Some(now + Duration::seconds(1));
        assert!(!r.is_claimable_at(now));
    }
}
