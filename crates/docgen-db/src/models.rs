//! Database row types. These map directly to SQLite rows and are converted
//! into docgen-types models at the edge.

use chrono::{DateTime, NaiveDateTime, Utc};
use docgen_types::models::{DocumentRecord, DocumentStats, Role, Stats, User, UserStats};
use tracing::warn;
use uuid::Uuid;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub password: String,
    pub role: String,
    pub is_active: bool,
    pub documents_generated: i64,
    pub created_at: String,
    pub last_login: Option<String>,
}

pub struct NewUser<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub username: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: Role,
}

pub struct DocumentRow {
    pub id: String,
    pub user_id: Option<String>,
    pub template: String,
    pub recipient_email: String,
    pub order_number: String,
    pub full_name: String,
    pub created_at: String,
    pub email_sent: bool,
    pub email_sent_at: Option<String>,
    pub email_error: Option<String>,
}

pub struct NewDocument<'a> {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub template: &'a str,
    pub recipient_email: &'a str,
    pub order_number: &'a str,
    pub full_name: &'a str,
    pub email_sent: bool,
    pub email_error: Option<&'a str>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsRow {
    pub users_total: u64,
    pub users_active: u64,
    pub admins: u64,
    pub documents_total: u64,
    pub documents_sent: u64,
}

impl StatsRow {
    pub fn to_api(self) -> Stats {
        Stats {
            users: UserStats {
                total: self.users_total,
                active: self.users_active,
                inactive: self.users_total.saturating_sub(self.users_active),
            },
            documents: DocumentStats {
                total: self.documents_total,
                sent: self.documents_sent,
                failed: self.documents_total.saturating_sub(self.documents_sent),
            },
        }
    }
}

impl UserRow {
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_else(|e| {
            warn!("Corrupt role on user '{}': {}", self.id, e);
            Role::User
        })
    }

    pub fn to_api(&self) -> User {
        User {
            id: parse_id(&self.id),
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role(),
            is_active: self.is_active,
            documents_generated: self.documents_generated.max(0) as u64,
            created_at: parse_timestamp(&self.created_at),
            last_login: self.last_login.as_deref().map(parse_timestamp),
        }
    }
}

impl DocumentRow {
    pub fn to_api(&self) -> DocumentRecord {
        DocumentRecord {
            id: parse_id(&self.id),
            user_id: self.user_id.as_deref().map(parse_id),
            template: self.template.clone(),
            recipient_email: self.recipient_email.clone(),
            order_number: self.order_number.clone(),
            full_name: self.full_name.clone(),
            created_at: parse_timestamp(&self.created_at),
            email_sent: self.email_sent,
            email_sent_at: self.email_sent_at.as_deref().map(parse_timestamp),
            email_error: self.email_error.clone(),
        }
    }
}

fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
