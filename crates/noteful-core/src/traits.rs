use async_trait::async_trait;
use uuid::Uuid;

use crate::error::NfResult;
use crate::model::*;

/// Storage backend for notes.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert(&self, new: NewNote) -> NfResult<Note>;
    async fn get(&self, id: Uuid) -> NfResult<Option<Note>>;
    /// Applies the supplied fields, leaves the rest untouched. Returns `None`
    /// when no note exists at that id.
    async fn update(&self, id: Uuid, changes: NoteChanges) -> NfResult<Option<Note>>;
    async fn delete(&self, id: Uuid) -> NfResult<bool>;
    /// Filtered listing, sorted by `updated_at` descending.
    async fn list(&self, filter: &NoteFilter) -> NfResult<Vec<Note>>;
    /// Unsets `folder_id` on every note referencing the folder. Returns the
    /// number of notes touched. Issued by the delete cascade.
    async fn clear_folder(&self, folder_id: Uuid) -> NfResult<usize>;
    /// Removes the tag id from every note's tag list. Returns the number of
    /// notes touched. Issued by the delete cascade.
    async fn detach_tag(&self, tag_id: Uuid) -> NfResult<usize>;
}

/// Storage backend for folders.
#[async_trait]
pub trait FolderStore: Send + Sync {
    async fn insert(&self, name: &str) -> NfResult<Folder>;
    async fn get(&self, id: Uuid) -> NfResult<Option<Folder>>;
    async fn update(&self, id: Uuid, name: &str) -> NfResult<Option<Folder>>;
    async fn delete(&self, id: Uuid) -> NfResult<bool>;
    /// All folders, sorted by name ascending.
    async fn list(&self) -> NfResult<Vec<Folder>>;
}

/// Storage backend for tags.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn insert(&self, name: &str) -> NfResult<Tag>;
    async fn get(&self, id: Uuid) -> NfResult<Option<Tag>>;
    async fn update(&self, id: Uuid, name: &str) -> NfResult<Option<Tag>>;
    async fn delete(&self, id: Uuid) -> NfResult<bool>;
    /// All tags, sorted by name ascending.
    async fn list(&self) -> NfResult<Vec<Tag>>;
    /// Resolve a batch of tag references. Unknown ids are simply absent from
    /// the result.
    async fn get_many(&self, ids: &[Uuid]) -> NfResult<Vec<Tag>>;
}

/// Storage backend for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, new: NewUser) -> NfResult<User>;
    async fn count_by_username(&self, username: &str) -> NfResult<usize>;
}
