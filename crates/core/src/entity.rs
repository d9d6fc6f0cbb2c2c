//! Audit fields shared by every persisted entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation/update stamps plus the soft-delete marker.
///
/// The store owns these fields: `created_at` is assigned once when an entity
/// is first persisted, `updated_at` on every persisted change, and `deleted`
/// is flipped instead of removing the row. Domain code never writes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted: bool,
    /// Actor attribution for the soft delete, when known.
    pub deleted_by: Option<String>,
}

impl AuditInfo {
    /// Audit state of an entity that has never been persisted.
    pub fn unsaved() -> Self {
        Self {
            created_at: None,
            updated_at: None,
            deleted: false,
            deleted_by: None,
        }
    }

    /// Stamp for first persistence.
    pub fn stamp_created(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
        self.updated_at = Some(at);
    }

    /// Stamp for a subsequent persisted change.
    pub fn stamp_updated(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }

    /// Mark the entity as soft-deleted, attribute the actor and stamp the change.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>, by: Option<String>) {
        self.deleted = true;
        self.deleted_by = by;
        self.updated_at = Some(at);
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl Default for AuditInfo {
    fn default() -> Self {
        Self::unsaved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsaved_has_no_stamps() {
        let audit = AuditInfo::unsaved();
        assert!(audit.created_at.is_none());
        assert!(audit.updated_at.is_none());
        assert!(!audit.is_deleted());
    }

    #[test]
    fn update_stamp_leaves_created_at_alone() {
        let mut audit = AuditInfo::unsaved();
        let t0 = Utc::now();
        audit.stamp_created(t0);
        let t1 = t0 + chrono::Duration::seconds(5);
        audit.stamp_updated(t1);
        assert_eq!(audit.created_at, Some(t0));
        assert_eq!(audit.updated_at, Some(t1));
    }

    #[test]
    fn soft_delete_flips_marker_and_attributes_actor() {
        let mut audit = AuditInfo::unsaved();
        let t0 = Utc::now();
        audit.stamp_created(t0);
        let t1 = t0 + chrono::Duration::seconds(1);
        audit.mark_deleted(t1, Some("admin".into()));
        assert!(audit.is_deleted());
        assert_eq!(audit.deleted_by.as_deref(), Some("admin"));
        assert_eq!(audit.updated_at, Some(t1));
    }
}
