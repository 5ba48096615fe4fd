//! Referential-integrity coordinator.
//!
//! The store has no foreign keys between collections, so deleting a folder or
//! tag must also repair the notes that reference it. The two operations are
//! issued together as a joined future pair: the caller's response waits for
//! both, and a failure of either fails the whole request. There is no
//! transaction spanning the two collections: if the process dies between
//! them, one side may have been applied without the other. That window is an
//! accepted limitation of the design, not something this module hides.

use uuid::Uuid;

use noteful_core::{FolderStore, NfResult, NoteStore, TagStore};

use crate::state::AppState;

/// Delete a folder and clear `folder_id` on every note that referenced it.
/// Returns whether the folder existed and how many notes were touched.
pub async fn delete_folder(state: &AppState, id: Uuid) -> NfResult<(bool, usize)> {
    let (deleted, cleared) = tokio::try_join!(state.folders.delete(id), state.notes.clear_folder(id))?;
    tracing::debug!(folder_id = %id, deleted, cleared, "folder delete cascade complete");
    Ok((deleted, cleared))
}

/// Delete a tag and remove its id from every note's tag list. This is a
/// membership removal; the notes themselves survive.
pub async fn delete_tag(state: &AppState, id: Uuid) -> NfResult<(bool, usize)> {
    let (deleted, detached) = tokio::try_join!(state.tags.delete(id), state.notes.detach_tag(id))?;
    tracing::debug!(tag_id = %id, deleted, detached, "tag delete cascade complete");
    Ok((deleted, detached))
}
