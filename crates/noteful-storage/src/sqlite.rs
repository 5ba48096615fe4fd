use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use noteful_core::*;

/// Default number of connections in the pool.
/// SQLite WAL mode supports 1 writer + N readers, so even a small pool
/// eliminates head-of-line blocking for concurrent read queries.
const DEFAULT_POOL_SIZE: usize = 4;

const NOTE_COLUMNS: &str = "id, title, content, folder_id, tags, created_at, updated_at";

/// SQLite implementation of all four Noteful store traits. The collections
/// deliberately carry no foreign keys between them; cross-collection
/// consistency is the delete cascade's job, one level up.
pub struct SqliteStore {
    /// Connection pool, round-robin across `DEFAULT_POOL_SIZE` connections.
    /// Each connection is independently protected by a Mutex so callers can
    /// run synchronous rusqlite operations without holding an async lock.
    pool: Vec<Mutex<Connection>>,
    next_slot: AtomicUsize,
}

impl SqliteStore {
    /// Execute a synchronous closure with a pooled database connection.
    ///
    /// Picks the next connection via round-robin, locks it, runs the
    /// closure, then releases. Because the closure is `FnOnce` (not async),
    /// the `MutexGuard` is guaranteed to drop before any `.await`, making
    /// the enclosing future `Send`.
    fn with_conn<F, T>(&self, f: F) -> NfResult<T>
    where
        F: FnOnce(&Connection) -> NfResult<T>,
    {
        let idx = self.next_slot.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        let conn = self.pool[idx]
            .lock()
            .map_err(|e| NotefulError::Storage(e.to_string()))?;
        f(&conn)
    }

    fn open_connection(path: &Path) -> NfResult<Connection> {
        let conn = Connection::open(path)
            .map_err(|e| NotefulError::Storage(format!("failed to open sqlite: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(|e| NotefulError::Storage(format!("pragma error: {e}")))?;

        Ok(conn)
    }

    pub fn open(path: &Path) -> NfResult<Self> {
        let mut pool = Vec::with_capacity(DEFAULT_POOL_SIZE);
        for _ in 0..DEFAULT_POOL_SIZE {
            pool.push(Mutex::new(Self::open_connection(path)?));
        }

        let store = Self {
            pool,
            next_slot: AtomicUsize::new(0),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn open_in_memory() -> NfResult<Self> {
        // In-memory DBs: use a shared cache URI so all pool connections see
        // the same data. Without this, each Connection::open_in_memory()
        // gets its own isolated database.
        let uri = format!("file:memdb{}?mode=memory&cache=shared", Uuid::now_v7());
        let flags = rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
            | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
            | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX
            | rusqlite::OpenFlags::SQLITE_OPEN_URI;
        let mut pool = Vec::with_capacity(DEFAULT_POOL_SIZE);
        for _ in 0..DEFAULT_POOL_SIZE {
            let conn = Connection::open_with_flags(&uri, flags).map_err(|e| {
                NotefulError::Storage(format!("failed to open in-memory sqlite: {e}"))
            })?;
            pool.push(Mutex::new(conn));
        }

        let store = Self {
            pool,
            next_slot: AtomicUsize::new(0),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> NfResult<()> {
        // Migrations run on slot 0 only; they need exclusive access.
        let conn = self.pool[0]
            .lock()
            .map_err(|e| NotefulError::Storage(e.to_string()))?;

        const MIGRATIONS: &[(i64, &str)] =
            &[(1, include_str!("../migrations/001_initial.sql"))];

        for &(version, sql) in MIGRATIONS {
            conn.execute_batch(sql)
                .map_err(|e| NotefulError::Storage(format!("migration {version:03} failed: {e}")))?;
        }

        tracing::debug!(
            applied_up_to = MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0),
            "Migrations complete"
        );

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row / value helpers
// ---------------------------------------------------------------------------

/// Timestamps are stored as fixed-width RFC 3339 (UTC, microseconds) so the
/// string collation order matches chronological order.
fn now_string() -> String {
    now_trunc().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time truncated to the precision we persist, so a value returned
/// from an insert compares equal to the same value read back later.
fn now_trunc() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(chrono::Duration::microseconds(1))
        .unwrap_or(now)
}

fn dt_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(column: usize, message: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            message.into(),
        )),
    )
}

fn parse_uuid_col(column: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| conversion_error(column, format!("bad uuid: {e}")))
}

fn parse_dt_col(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, format!("bad timestamp: {e}")))
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    let id: String = row.get(0)?;
    let title: String = row.get(1)?;
    let content: Option<String> = row.get(2)?;
    let folder_id: Option<String> = row.get(3)?;
    let tags_json: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    let folder_id = match folder_id {
        Some(raw) => Some(parse_uuid_col(3, &raw)?),
        None => None,
    };
    let tags: Vec<Uuid> = serde_json::from_str(&tags_json)
        .map_err(|e| conversion_error(4, format!("bad tag list: {e}")))?;

    Ok(Note {
        id: parse_uuid_col(0, &id)?,
        title,
        content,
        folder_id,
        tags,
        created_at: parse_dt_col(5, &created_at)?,
        updated_at: parse_dt_col(6, &updated_at)?,
    })
}

fn storage_err(e: rusqlite::Error) -> NotefulError {
    NotefulError::Storage(e.to_string())
}

/// Escape the LIKE wildcards (`%`, `_`) and the escape character itself so a
/// search term always matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Re-label a unique-constraint failure as the distinguishable duplicate-name
/// condition; anything else stays a plain storage error.
fn constraint_err(resource: &'static str, e: rusqlite::Error) -> NotefulError {
    if let rusqlite::Error::SqliteFailure(inner, _) = &e {
        if inner.code == rusqlite::ErrorCode::ConstraintViolation {
            return NotefulError::DuplicateName(resource);
        }
    }
    storage_err(e)
}

// ---------------------------------------------------------------------------
// NoteStore
// ---------------------------------------------------------------------------

#[async_trait]
impl NoteStore for SqliteStore {
    async fn insert(&self, new: NewNote) -> NfResult<Note> {
        self.with_conn(|conn| {
            let now = now_trunc();
            let note = Note {
                id: Uuid::now_v7(),
                title: new.title,
                content: new.content,
                folder_id: new.folder_id,
                tags: new.tags,
                created_at: now,
                updated_at: now,
            };
            let tags_json = serde_json::to_string(&note.tags)?;
            conn.execute(
                "INSERT INTO notes (id, title, content, folder_id, tags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    note.id.to_string(),
                    note.title,
                    note.content,
                    note.folder_id.map(|id| id.to_string()),
                    tags_json,
                    dt_string(note.created_at),
                    dt_string(note.updated_at),
                ],
            )
            .map_err(|e| constraint_err("note title", e))?;
            Ok(note)
        })
    }

    async fn get(&self, id: Uuid) -> NfResult<Option<Note>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                params![id.to_string()],
                row_to_note,
            )
            .optional()
            .map_err(storage_err)
        })
    }

    async fn update(&self, id: Uuid, changes: NoteChanges) -> NfResult<Option<Note>> {
        self.with_conn(|conn| {
            let existing = conn
                .query_row(
                    &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                    params![id.to_string()],
                    row_to_note,
                )
                .optional()
                .map_err(storage_err)?;

            let Some(mut note) = existing else {
                return Ok(None);
            };

            if let Some(title) = changes.title {
                note.title = title;
            }
            if let Some(content) = changes.content {
                note.content = Some(content);
            }
            if let Some(folder_id) = changes.folder_id {
                note.folder_id = Some(folder_id);
            }
            if let Some(tags) = changes.tags {
                note.tags = tags;
            }
            note.updated_at = now_trunc();

            let tags_json = serde_json::to_string(&note.tags)?;
            conn.execute(
                "UPDATE notes
                 SET title = ?1, content = ?2, folder_id = ?3, tags = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    note.title,
                    note.content,
                    note.folder_id.map(|f| f.to_string()),
                    tags_json,
                    dt_string(note.updated_at),
                    note.id.to_string(),
                ],
            )
            .map_err(|e| constraint_err("note title", e))?;

            Ok(Some(note))
        })
    }

    async fn delete(&self, id: Uuid) -> NfResult<bool> {
        self.with_conn(|conn| {
            let changed = conn
                .execute("DELETE FROM notes WHERE id = ?1", params![id.to_string()])
                .map_err(storage_err)?;
            Ok(changed > 0)
        })
    }

    async fn list(&self, filter: &NoteFilter) -> NfResult<Vec<Note>> {
        self.with_conn(|conn| {
            let mut sql = format!("SELECT {NOTE_COLUMNS} FROM notes");
            let mut clauses: Vec<&str> = Vec::new();
            let mut args: Vec<String> = Vec::new();

            if let Some(term) = &filter.search_term {
                // LIKE without an explicit collation is case-insensitive
                // for ASCII. Wildcards in the term are escaped so they
                // match literally.
                clauses.push(
                    "(title LIKE '%' || ? || '%' ESCAPE '\\' \
                     OR content LIKE '%' || ? || '%' ESCAPE '\\')",
                );
                let escaped = escape_like(term);
                args.push(escaped.clone());
                args.push(escaped);
            }
            if let Some(folder_id) = filter.folder_id {
                clauses.push("folder_id = ?");
                args.push(folder_id.to_string());
            }
            if let Some(tag_id) = filter.tag_id {
                clauses.push(
                    "EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = ?)",
                );
                args.push(tag_id.to_string());
            }

            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            // Secondary sort on the time-ordered id keeps ties deterministic.
            sql.push_str(" ORDER BY updated_at DESC, id DESC");

            let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
            let notes = stmt
                .query_map(params_from_iter(args.iter()), row_to_note)
                .map_err(storage_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err)?;
            Ok(notes)
        })
    }

    async fn clear_folder(&self, folder_id: Uuid) -> NfResult<usize> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notes SET folder_id = NULL, updated_at = ?1 WHERE folder_id = ?2",
                params![now_string(), folder_id.to_string()],
            )
            .map_err(storage_err)
        })
    }

    async fn detach_tag(&self, tag_id: Uuid) -> NfResult<usize> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, tags FROM notes
                     WHERE EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = ?1)",
                )
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(params![tag_id.to_string()], |row| {
                    let id: String = row.get(0)?;
                    let tags: String = row.get(1)?;
                    Ok((id, tags))
                })
                .map_err(storage_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err)?;

            let now = now_string();
            let mut touched = 0;
            for (note_id, tags_json) in rows {
                let mut tags: Vec<Uuid> = serde_json::from_str(&tags_json)?;
                tags.retain(|t| *t != tag_id);
                conn.execute(
                    "UPDATE notes SET tags = ?1, updated_at = ?2 WHERE id = ?3",
                    params![serde_json::to_string(&tags)?, now, note_id],
                )
                .map_err(storage_err)?;
                touched += 1;
            }
            Ok(touched)
        })
    }
}

// ---------------------------------------------------------------------------
// Folders and tags share a shape; the helpers below are parameterized over
// the table so the two stores stay byte-for-byte consistent.
// ---------------------------------------------------------------------------

fn row_to_named(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Uuid, String, DateTime<Utc>, DateTime<Utc>)> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let created_at: String = row.get(2)?;
    let updated_at: String = row.get(3)?;
    Ok((
        parse_uuid_col(0, &id)?,
        name,
        parse_dt_col(2, &created_at)?,
        parse_dt_col(3, &updated_at)?,
    ))
}

impl SqliteStore {
    fn insert_named(
        &self,
        table: &str,
        resource: &'static str,
        name: &str,
    ) -> NfResult<(Uuid, String, DateTime<Utc>)> {
        self.with_conn(|conn| {
            let id = Uuid::now_v7();
            let now = now_trunc();
            conn.execute(
                &format!(
                    "INSERT INTO {table} (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)"
                ),
                params![id.to_string(), name, dt_string(now), dt_string(now)],
            )
            .map_err(|e| constraint_err(resource, e))?;
            Ok((id, name.to_string(), now))
        })
    }

    fn get_named(
        &self,
        table: &str,
        id: Uuid,
    ) -> NfResult<Option<(Uuid, String, DateTime<Utc>, DateTime<Utc>)>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT id, name, created_at, updated_at FROM {table} WHERE id = ?1"),
                params![id.to_string()],
                row_to_named,
            )
            .optional()
            .map_err(storage_err)
        })
    }

    fn update_named(
        &self,
        table: &str,
        resource: &'static str,
        id: Uuid,
        name: &str,
    ) -> NfResult<Option<(Uuid, String, DateTime<Utc>, DateTime<Utc>)>> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    &format!("UPDATE {table} SET name = ?1, updated_at = ?2 WHERE id = ?3"),
                    params![name, now_string(), id.to_string()],
                )
                .map_err(|e| constraint_err(resource, e))?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT id, name, created_at, updated_at FROM {table} WHERE id = ?1"),
                params![id.to_string()],
                row_to_named,
            )
            .optional()
            .map_err(storage_err)
        })
    }

    fn delete_named(&self, table: &str, id: Uuid) -> NfResult<bool> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    &format!("DELETE FROM {table} WHERE id = ?1"),
                    params![id.to_string()],
                )
                .map_err(storage_err)?;
            Ok(changed > 0)
        })
    }

    fn list_named(&self, table: &str) -> NfResult<Vec<(Uuid, String, DateTime<Utc>, DateTime<Utc>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT id, name, created_at, updated_at FROM {table} ORDER BY name ASC"
                ))
                .map_err(storage_err)?;
            let rows = stmt
                .query_map([], row_to_named)
                .map_err(storage_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err)?;
            Ok(rows)
        })
    }
}

fn folder_from(parts: (Uuid, String, DateTime<Utc>, DateTime<Utc>)) -> Folder {
    Folder {
        id: parts.0,
        name: parts.1,
        created_at: parts.2,
        updated_at: parts.3,
    }
}

fn tag_from(parts: (Uuid, String, DateTime<Utc>, DateTime<Utc>)) -> Tag {
    Tag {
        id: parts.0,
        name: parts.1,
        created_at: parts.2,
        updated_at: parts.3,
    }
}

#[async_trait]
impl FolderStore for SqliteStore {
    async fn insert(&self, name: &str) -> NfResult<Folder> {
        let (id, name, now) = self.insert_named("folders", "folder name", name)?;
        Ok(Folder {
            id,
            name,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: Uuid) -> NfResult<Option<Folder>> {
        Ok(self.get_named("folders", id)?.map(folder_from))
    }

    async fn update(&self, id: Uuid, name: &str) -> NfResult<Option<Folder>> {
        Ok(self
            .update_named("folders", "folder name", id, name)?
            .map(folder_from))
    }

    async fn delete(&self, id: Uuid) -> NfResult<bool> {
        self.delete_named("folders", id)
    }

    async fn list(&self) -> NfResult<Vec<Folder>> {
        Ok(self
            .list_named("folders")?
            .into_iter()
            .map(folder_from)
            .collect())
    }
}

#[async_trait]
impl TagStore for SqliteStore {
    async fn insert(&self, name: &str) -> NfResult<Tag> {
        let (id, name, now) = self.insert_named("tags", "tag name", name)?;
        Ok(Tag {
            id,
            name,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: Uuid) -> NfResult<Option<Tag>> {
        Ok(self.get_named("tags", id)?.map(tag_from))
    }

    async fn update(&self, id: Uuid, name: &str) -> NfResult<Option<Tag>> {
        Ok(self
            .update_named("tags", "tag name", id, name)?
            .map(tag_from))
    }

    async fn delete(&self, id: Uuid) -> NfResult<bool> {
        self.delete_named("tags", id)
    }

    async fn list(&self) -> NfResult<Vec<Tag>> {
        Ok(self
            .list_named("tags")?
            .into_iter()
            .map(tag_from)
            .collect())
    }

    async fn get_many(&self, ids: &[Uuid]) -> NfResult<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT id, name, created_at, updated_at FROM tags WHERE id IN ({placeholders})"
                ))
                .map_err(storage_err)?;
            let args: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            let rows = stmt
                .query_map(params_from_iter(args.iter()), row_to_named)
                .map_err(storage_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err)?;
            Ok(rows.into_iter().map(tag_from).collect())
        })
    }
}

// ---------------------------------------------------------------------------
// UserStore
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for SqliteStore {
    async fn insert(&self, new: NewUser) -> NfResult<User> {
        self.with_conn(|conn| {
            let user = User {
                id: Uuid::now_v7(),
                fullname: new.fullname,
                username: new.username,
                password: new.password,
            };
            conn.execute(
                "INSERT INTO users (id, fullname, username, password) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.to_string(),
                    user.fullname,
                    user.username,
                    user.password,
                ],
            )
            .map_err(|e| constraint_err("username", e))?;
            Ok(user)
        })
    }

    async fn count_by_username(&self, username: &str) -> NfResult<usize> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1",
                params![username],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count as usize)
            .map_err(storage_err)
        })
    }
}
