//! Moderation queue records.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{ModerationId, ServiceId, UserId};
use crate::domains::services::models::ServiceDiff;

/// Reviewer decision on an open record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approved => write!(f, "approved"),
            Decision::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            _ => Err(anyhow::anyhow!("Invalid decision: {}", s)),
        }
    }
}

/// One review-queue entry. Open while `decision` is unset; resolved records
/// are retained for history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub id: ModerationId,
    pub service_id: ServiceId,
    pub submitted_by: UserId,
    pub submitted_at: DateTime<Utc>,
    /// The edit under review.
    pub diff: ServiceDiff,
    pub reviewer_id: Option<UserId>,
    pub decision: Option<Decision>,
    pub reason: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ModerationRecord {
    pub fn new(
        service_id: ServiceId,
        submitted_by: UserId,
        diff: ServiceDiff,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ModerationId::new(),
            service_id,
            submitted_by,
            submitted_at,
            diff,
            reviewer_id: None,
            decision: None,
            reason: None,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.decision.is_none()
    }

    /// Past the review deadline and still open. Surfaced to moderators;
    /// never auto-resolved.
    pub fn is_overdue(&self, now: DateTime<Utc>, deadline: Duration) -> bool {
        self.is_open() && now - self.submitted_at > deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overdue_only_while_open() {
        let mut record = ModerationRecord::new(
            ServiceId::new(),
            UserId::new(),
            ServiceDiff::default(),
            Utc::now() - Duration::hours(30),
        );
        let now = Utc::now();
        assert!(record.is_overdue(now, Duration::hours(24)));

        record.decision = Some(Decision::Approved);
        record.resolved_at = Some(now);
        assert!(!record.is_overdue(now, Duration::hours(24)));
    }

    #[test]
    fn test_fresh_record_is_not_overdue() {
        let record = ModerationRecord::new(
            ServiceId::new(),
            UserId::new(),
            ServiceDiff::default(),
            Utc::now(),
        );
        assert!(!record.is_overdue(Utc::now(), Duration::hours(24)));
        assert!(record.is_open());
    }
}
