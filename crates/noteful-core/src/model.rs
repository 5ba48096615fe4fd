use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Note
// ---------------------------------------------------------------------------

/// A stored note. `folder_id` and `tags` are plain references into the folder
/// and tag collections; nothing enforces them at write time. Consistency is
/// maintained reactively by the delete cascade, never preventively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a note. The store assigns id and timestamps.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub content: Option<String>,
    pub folder_id: Option<Uuid>,
    pub tags: Vec<Uuid>,
}

/// Partial update: a present field overwrites the stored value, an absent
/// field is left untouched. There is no way to clear a field through an
/// update.
#[derive(Debug, Clone, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder_id: Option<Uuid>,
    pub tags: Option<Vec<Uuid>>,
}

/// List filters for notes. All filters are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    /// Case-insensitive substring match against title or content.
    pub search_term: Option<String>,
    pub folder_id: Option<Uuid>,
    /// Matches notes whose tag list contains this id.
    pub tag_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Folder / Tag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user. The password is stored verbatim and is never
/// serialized into any public representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl User {
    /// Verbatim comparison; passwords are stored exactly as submitted.
    pub fn verify_password(&self, password: &str) -> bool {
        password == self.password
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub fullname: Option<String>,
    pub username: String,
    pub password: String,
}
