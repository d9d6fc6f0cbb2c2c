//! User aggregate: account identity, contact email, roles and activation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopkeep_core::{AggregateRoot, AuditInfo, DomainError, DomainResult, Email, UserId};
use shopkeep_events::DomainEvent;

/// Events raised by user state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UserEvent {
    Created(UserCreated),
    ProfileUpdated(UserProfileUpdated),
    EmailConfirmed(UserEmailConfirmed),
    Activated(UserActivated),
    Deactivated(UserDeactivated),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileUpdated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEmailConfirmed {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub user_id: UserId,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeactivated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub user_id: UserId,
}

impl DomainEvent for UserEvent {
    fn kind(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => "user.created",
            UserEvent::ProfileUpdated(_) => "user.profile_updated",
            UserEvent::EmailConfirmed(_) => "user.email_confirmed",
            UserEvent::Activated(_) => "user.activated",
            UserEvent::Deactivated(_) => "user.deactivated",
        }
    }

    fn event_id(&self) -> Uuid {
        match self {
            UserEvent::Created(e) => e.event_id,
            UserEvent::ProfileUpdated(e) => e.event_id,
            UserEvent::EmailConfirmed(e) => e.event_id,
            UserEvent::Activated(e) => e.event_id,
            UserEvent::Deactivated(e) => e.event_id,
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Created(e) => e.occurred_on,
            UserEvent::ProfileUpdated(e) => e.occurred_on,
            UserEvent::EmailConfirmed(e) => e.occurred_on,
            UserEvent::Activated(e) => e.occurred_on,
            UserEvent::Deactivated(e) => e.occurred_on,
        }
    }

    fn subject_id(&self) -> Uuid {
        let id = match self {
            UserEvent::Created(e) => e.user_id,
            UserEvent::ProfileUpdated(e) => e.user_id,
            UserEvent::EmailConfirmed(e) => e.user_id,
            UserEvent::Activated(e) => e.user_id,
            UserEvent::Deactivated(e) => e.user_id,
        };
        *id.as_uuid()
    }
}

/// A registered account.
///
/// Every successful state transition (except the pure bookkeeping ones noted
/// on the methods) appends exactly one event to the pending list; the unit of
/// work drains that list after the change has been committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    first_name: String,
    last_name: String,
    email: Email,
    password_hash: String,
    is_email_confirmed: bool,
    last_login_at: Option<DateTime<Utc>>,
    is_active: bool,
    roles: Vec<String>,
    audit: AuditInfo,

    /// Transient; never persisted, drained on commit.
    #[serde(skip, default)]
    pending_events: Vec<UserEvent>,
}

impl User {
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: Email,
        password_hash: &str,
    ) -> DomainResult<Self> {
        let first_name = required_trimmed(first_name, "first name")?;
        let last_name = required_trimmed(last_name, "last name")?;
        if password_hash.trim().is_empty() {
            return Err(DomainError::invalid_argument("password hash cannot be empty"));
        }

        let id = UserId::new();
        let mut user = Self {
            id,
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            email: email.clone(),
            password_hash: password_hash.to_string(),
            is_email_confirmed: false,
            last_login_at: None,
            is_active: true,
            roles: Vec::new(),
            audit: AuditInfo::unsaved(),
            pending_events: Vec::new(),
        };
        user.record(UserEvent::Created(UserCreated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            user_id: id,
            email: email.as_str().to_string(),
            first_name,
            last_name,
        }));
        Ok(user)
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn is_email_confirmed(&self) -> bool {
        self.is_email_confirmed
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn update_profile(&mut self, first_name: &str, last_name: &str) -> DomainResult<()> {
        let first_name = required_trimmed(first_name, "first name")?;
        let last_name = required_trimmed(last_name, "last name")?;
        self.first_name = first_name.clone();
        self.last_name = last_name.clone();
        self.record(UserEvent::ProfileUpdated(UserProfileUpdated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            user_id: self.id,
            first_name,
            last_name,
        }));
        Ok(())
    }

    /// Confirm the email address. One-way: confirming twice is an error.
    pub fn confirm_email(&mut self) -> DomainResult<()> {
        if self.is_email_confirmed {
            return Err(DomainError::invalid_state("email is already confirmed"));
        }
        self.is_email_confirmed = true;
        self.record(UserEvent::EmailConfirmed(UserEmailConfirmed {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            user_id: self.id,
            email: self.email.as_str().to_string(),
        }));
        Ok(())
    }

    /// Bookkeeping only: timestamp bump, no event.
    pub fn update_last_login(&mut self, at: DateTime<Utc>) {
        self.last_login_at = Some(at);
        self.touch();
    }

    /// Emits even when already active.
    pub fn activate(&mut self) {
        self.is_active = true;
        self.record(UserEvent::Activated(UserActivated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            user_id: self.id,
        }));
    }

    /// Emits even when already inactive.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.record(UserEvent::Deactivated(UserDeactivated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            user_id: self.id,
        }));
    }

    /// Grant a role. Idempotent; timestamp bump on change, no event.
    pub fn add_role(&mut self, role: &str) -> DomainResult<()> {
        let role = required_trimmed(role, "role")?;
        if !self.roles.contains(&role) {
            self.roles.push(role);
            self.touch();
        }
        Ok(())
    }

    /// Revoke a role if present. Timestamp bump on change, no event.
    pub fn remove_role(&mut self, role: &str) {
        let before = self.roles.len();
        self.roles.retain(|r| r != role);
        if self.roles.len() != before {
            self.touch();
        }
    }

    fn record(&mut self, event: UserEvent) {
        self.pending_events.push(event);
        self.touch();
    }

    /// Mark the aggregate as modified. The commit-time stamp written by the
    /// unit of work remains the authoritative persisted value.
    fn touch(&mut self) {
        self.audit.stamp_updated(Utc::now());
    }
}

impl AggregateRoot for User {
    type Id = UserId;
    type Event = UserEvent;

    fn id(&self) -> UserId {
        self.id
    }

    fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit
    }

    fn pending_events(&self) -> &[UserEvent] {
        &self.pending_events
    }

    fn take_events(&mut self) -> Vec<UserEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

fn required_trimmed(value: &str, field: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_argument(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(trimmed.to_string())
}
