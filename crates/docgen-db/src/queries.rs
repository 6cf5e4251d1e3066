use crate::Database;
use crate::models::{DocumentRow, NewDocument, NewUser, StatsRow, UserRow};
use anyhow::Result;
use docgen_types::models::Role;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str =
    "id, email, username, password, role, is_active, documents_generated, created_at, last_login";

const DOCUMENT_COLUMNS: &str = "id, user_id, template, recipient_email, order_number, full_name, \
     created_at, email_sent, email_sent_at, email_error";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, password, role) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    user.id.to_string(),
                    user.email,
                    user.username,
                    user.password_hash,
                    user.role.as_str(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when no user had that id.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0))
    }

    /// Returns false when no user had that id.
    pub fn set_user_active(&self, id: &str, active: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_active = ?2 WHERE id = ?1",
                rusqlite::params![id, active],
            )?;
            Ok(changed > 0)
        })
    }

    /// Replace the password hash and role of an existing account, re-enabling it.
    pub fn reset_credentials(&self, email: &str, password_hash: &str, role: Role) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2, role = ?3, is_active = 1 WHERE email = ?1",
                rusqlite::params![email, password_hash, role.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn record_login(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET last_login = datetime('now') WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Documents --

    /// Store a document record and bump the owner's counter in one transaction.
    pub fn insert_document(&self, doc: &NewDocument<'_>) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let user_id = doc.user_id.map(|id| id.to_string());
            tx.execute(
                "INSERT INTO documents
                    (id, user_id, template, recipient_email, order_number, full_name,
                     email_sent, email_sent_at, email_error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                     CASE WHEN ?7 THEN datetime('now') END, ?8)",
                rusqlite::params![
                    doc.id.to_string(),
                    user_id,
                    doc.template,
                    doc.recipient_email,
                    doc.order_number,
                    doc.full_name,
                    doc.email_sent,
                    doc.email_error,
                ],
            )?;
            if let Some(user_id) = &user_id {
                tx.execute(
                    "UPDATE users SET documents_generated = documents_generated + 1 WHERE id = ?1",
                    [user_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Newest first. `user_id` restricts the listing to one owner.
    pub fn list_documents(
        &self,
        user_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DocumentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents
                 WHERE ?1 IS NULL OR user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit, offset], document_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
                [id],
                document_from_row,
            )
            .optional()
        })
    }

    // -- Stats --

    pub fn stats(&self) -> Result<StatsRow> {
        self.with_conn(|conn| {
            let (users_total, users_active, admins) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(is_active), 0),
                        COALESCE(SUM(role = 'admin'), 0)
                 FROM users",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
            )?;
            let (documents_total, documents_sent) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(email_sent), 0) FROM documents",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )?;
            Ok(StatsRow {
                users_total: users_total as u64,
                users_active: users_active as u64,
                admins: admins as u64,
                documents_total: documents_total as u64,
                documents_sent: documents_sent as u64,
            })
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
        [value],
        user_from_row,
    )
    .optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        is_active: row.get(5)?,
        documents_generated: row.get(6)?,
        created_at: row.get(7)?,
        last_login: row.get(8)?,
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        template: row.get(2)?,
        recipient_email: row.get(3)?,
        order_number: row.get(4)?,
        full_name: row.get(5)?,
        created_at: row.get(6)?,
        email_sent: row.get(7)?,
        email_sent_at: row.get(8)?,
        email_error: row.get(9)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
