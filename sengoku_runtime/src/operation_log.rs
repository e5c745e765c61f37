//! Audit trail of committed operations, newest first, capped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ID_PREFIX: &str = "op-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OperationRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Game year the operation was committed in.
    pub year: u32,
    pub actor: String,
    pub action: String,
    pub details: Value,
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

fn serial_of(id: &str) -> Option<u64> {
    id.strip_prefix(ID_PREFIX)?.parse().ok()
}

#[derive(Debug, Clone)]
pub struct OperationLog {
    records: Vec<OperationRecord>,
    capacity: usize,
    next_serial: u64,
}

impl OperationLog {
    /// Resume from persisted records; IDs continue after the highest seen.
    pub fn from_records(mut records: Vec<OperationRecord>, capacity: usize) -> Self {
        records.truncate(capacity);
        let next_serial = records
            .iter()
            .filter_map(|r| serial_of(&r.id))
            .max()
            .map_or(1, |s| s + 1);
        Self {
            records,
            capacity,
            next_serial,
        }
    }

    /// Prepend a record, dropping the oldest beyond capacity.
    pub fn record(
        &mut self,
        year: u32,
        actor: impl Into<String>,
        action: impl Into<String>,
        details: Value,
    ) -> OperationRecord {
        let record = OperationRecord {
            id: format!("{ID_PREFIX}{:06}", self.next_serial),
            timestamp: Utc::now(),
            year,
            actor: actor.into(),
            action: action.into(),
            details,
            snapshot_id: None,
        };
        self.next_serial += 1;
        self.records.insert(0, record.clone());
        self.records.truncate(self.capacity);
        record
    }

    /// Attach a snapshot to an already recorded operation.
    pub fn link_snapshot(&mut self, operation_id: &str, snapshot_id: &str) -> bool {
        match self.records.iter_mut().find(|r| r.id == operation_id) {
            Some(record) => {
                record.snapshot_id = Some(snapshot_id.to_string());
                true
            }
            None => false,
        }
    }

    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    pub fn recent(&self, limit: usize) -> &[OperationRecord] {
        &self.records[..limit.min(self.records.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn newest_first_and_capped() {
        let mut log = OperationLog::from_records(Vec::new(), 3);
        for i in 0..5 {
            log.record(1, "oda", "recruit_soldiers", json!({ "count": i }));
        }
        let ids: Vec<&str> = log.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["op-000005", "op-000004", "op-000003"]);
        assert_eq!(log.recent(1)[0].details["count"], 4);
        assert_eq!(log.recent(10).len(), 3);
    }

    #[test]
    fn resumes_numbering() {
        let mut log = OperationLog::from_records(Vec::new(), 100);
        log.record(1, "admin", "set_lock", json!({}));
        log.record(1, "admin", "set_lock", json!({}));
        let mut resumed = OperationLog::from_records(log.records().to_vec(), 100);
        let next = resumed.record(1, "admin", "advance_year", json!({}));
        assert_eq!(next.id, "op-000003");
    }

    #[test]
    fn link_snapshot_by_id() {
        let mut log = OperationLog::from_records(Vec::new(), 10);
        let op = log.record(2, "admin", "advance_year", json!({}));
        assert!(log.link_snapshot(&op.id, "snap-000001"));
        assert!(!log.link_snapshot("op-999999", "snap-000001"));
        assert_eq!(log.records()[0].snapshot_id.as_deref(), Some("snap-000001"));
    }
}
