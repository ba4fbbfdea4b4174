//! Last-writer-wins merge of local and remote collections.

use std::collections::{HashMap, HashSet};

use nlgd_storage::Record;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub kept_local: usize,
    pub took_remote: usize,
    pub inserted_remote: usize,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        self.took_remote > 0 || self.inserted_remote > 0
    }
}

/// Local order is kept; remote-only records follow in remote order. On an
/// id collision the remote copy wins only when strictly newer.
pub fn merge_by_recency<T: Record>(local: Vec<T>, remote: Vec<T>) -> (Vec<T>, MergeReport) {
    let local_ids: HashSet<String> = local.iter().map(|r| r.id().to_string()).collect();
    let mut report = MergeReport::default();
    let mut remote_only = Vec::new();
    let mut remote_by_id: HashMap<String, T> = HashMap::new();

    for record in remote {
        if local_ids.contains(record.id()) {
            remote_by_id.insert(record.id().to_string(), record);
        } else if !remote_only.iter().any(|r: &T| r.id() == record.id()) {
            remote_only.push(record);
        }
    }

    let mut merged = Vec::with_capacity(local.len() + remote_only.len());
    for record in local {
        match remote_by_id.remove(record.id()) {
            Some(theirs) if theirs.updated_at() > record.updated_at() => {
                report.took_remote += 1;
                merged.push(theirs);
            }
            _ => {
                report.kept_local += 1;
                merged.push(record);
            }
        }
    }
    report.inserted_remote = remote_only.len();
    merged.extend(remote_only);
    (merged, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use nlgd_core::document::create_blank_estimate;
    use nlgd_core::Estimate;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("ts")
            .with_timezone(&Utc)
            + Duration::seconds(seconds)
    }

    fn estimate(id: &str, notes: &str, updated: i64) -> Estimate {
        let mut e = create_blank_estimate("NL-2026-001", None);
        e.id = id.to_string();
        e.notes = notes.to_string();
        e.updated_at = at(updated);
        e
    }

    #[test]
    fn strictly_newer_remote_wins() {
        let local = vec![
            estimate("a", "local", 10),
            estimate("b", "local", 10),
            estimate("c", "local", 10),
        ];
        let remote = vec![
            estimate("a", "remote", 20),
            estimate("b", "remote", 5),
            estimate("c", "remote", 10),
        ];
        let (merged, report) = merge_by_recency(local, remote);
        let notes: Vec<_> = merged.iter().map(|e| e.notes.as_str()).collect();
        assert_eq!(notes, vec!["remote", "local", "local"]);
        assert_eq!(
            report,
            MergeReport {
                kept_local: 2,
                took_remote: 1,
                inserted_remote: 0
            }
        );
    }

    #[test]
    fn remote_only_records_append_in_order() {
        let local = vec![estimate("a", "local", 10)];
        let remote = vec![estimate("z", "remote", 1), estimate("y", "remote", 2)];
        let (merged, report) = merge_by_recency(local, remote);
        let ids: Vec<_> = merged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z", "y"]);
        assert_eq!(report.inserted_remote, 2);
        assert!(report.changed());
    }

    #[test]
    fn merge_is_idempotent() {
        let local = vec![estimate("a", "local", 10)];
        let remote = vec![estimate("a", "remote", 20), estimate("b", "remote", 1)];
        let (once, _) = merge_by_recency(local, remote.clone());
        let (twice, report) = merge_by_recency(once.clone(), remote);
        assert_eq!(once, twice);
        assert!(!report.changed());
    }
}
