// SPDX-License-Identifier: MPL-2.0
//! Gallery of saved images with a short undo window for deletions.

use crate::application::port::{GalleryStore, StorageError};
use crate::domain::gallery::{GalleryImage, GallerySort, BASE_IMAGE_PROMPT};
use crate::domain::media::EncodedImage;
use crate::domain::session::SessionState;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// How long deleted items can be brought back.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_millis(7000);

/// Items removed by the last delete, restorable until `deadline`.
#[derive(Debug)]
struct PendingUndo {
    items: Vec<GalleryImage>,
    deadline: Instant,
}

/// Gallery operations over a [`GalleryStore`].
pub struct GalleryService {
    store: Arc<dyn GalleryStore>,
    undo_window: Duration,
    pending: Mutex<Option<PendingUndo>>,
    sequence: AtomicU32,
}

impl std::fmt::Debug for GalleryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryService")
            .field("undo_window", &self.undo_window)
            .field("can_undo", &self.can_undo())
            .finish_non_exhaustive()
    }
}

impl GalleryService {
    #[must_use]
    pub fn new(store: Arc<dyn GalleryStore>, undo_window: Duration) -> Self {
        Self {
            store,
            undo_window,
            pending: Mutex::new(None),
            sequence: AtomicU32::new(0),
        }
    }

    /// All items in `sort` order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read.
    pub async fn list(&self, sort: GallerySort) -> Result<Vec<GalleryImage>, StorageError> {
        self.search("", sort).await
    }

    /// Items whose prompt contains every term of `query`, in `sort` order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read.
    pub async fn search(
        &self,
        query: &str,
        sort: GallerySort,
    ) -> Result<Vec<GalleryImage>, StorageError> {
        let mut items: Vec<_> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|item| item.matches(query))
            .collect();
        sort.apply(&mut items);
        Ok(items)
    }

    /// Saves the session's results that are not stored yet.
    ///
    /// The comparison image goes first, under the base-image prompt. Images
    /// are compared by content, so saving twice adds nothing. Returns the
    /// saved records.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read or written.
    /// Records written before the failure stay saved.
    pub async fn save_current(
        &self,
        state: &SessionState,
    ) -> Result<Vec<GalleryImage>, StorageError> {
        let mut known: HashSet<blake3::Hash> = self
            .store
            .list()
            .await?
            .iter()
            .map(|item| content_hash(&item.image))
            .collect();

        let candidates = state
            .comparison_image
            .iter()
            .map(|image| (image, BASE_IMAGE_PROMPT))
            .chain(
                state
                    .generated_images
                    .iter()
                    .flatten()
                    .map(|image| (image, state.prompt.as_str())),
            );

        let now = Utc::now();
        let mut saved = Vec::new();
        for (image, prompt) in candidates {
            if !known.insert(content_hash(image)) {
                continue;
            }
            let offset = saved.len();
            let created_at = now + ChronoDuration::milliseconds(offset as i64);
            let record = GalleryImage {
                id: self.next_id(created_at.timestamp_millis()),
                image: image.clone(),
                created_at,
                is_favorite: false,
                prompt: prompt.to_string(),
            };
            self.store.put(&record).await?;
            saved.push(record);
        }

        tracing::info!(count = saved.len(), "saved images to gallery");
        Ok(saved)
    }

    fn next_id(&self, millis: i64) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{millis:013}-{sequence:04}")
    }

    /// Flips the favourite flag and returns its new value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an unknown id.
    pub async fn toggle_favorite(&self, id: &str) -> Result<bool, StorageError> {
        let mut item = self.find(id).await?;
        item.is_favorite = !item.is_favorite;
        self.store.put(&item).await?;
        Ok(item.is_favorite)
    }

    async fn find(&self, id: &str) -> Result<GalleryImage, StorageError> {
        self.store
            .list()
            .await?
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    // =========================================================================
    // Deletion and undo
    // =========================================================================

    /// Deletes one item, keeping it for undo.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an unknown id.
    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let item = self.find(id).await?;
        self.store.delete(id).await?;
        self.hold_for_undo(vec![item]);
        Ok(())
    }

    /// Deletes everything, keeping the items for undo. Returns how many
    /// items were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read or cleared.
    pub async fn clear_all(&self) -> Result<usize, StorageError> {
        let items = self.store.list().await?;
        self.store.clear().await?;
        let count = items.len();
        self.hold_for_undo(items);
        Ok(count)
    }

    fn hold_for_undo(&self, items: Vec<GalleryImage>) {
        tracing::debug!(count = items.len(), "gallery deletion held for undo");
        *self.lock_pending() = Some(PendingUndo {
            items,
            deadline: Instant::now() + self.undo_window,
        });
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<PendingUndo>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the last deletion can still be undone.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.lock_pending()
            .as_ref()
            .is_some_and(|pending| Instant::now() < pending.deadline)
    }

    /// Restores the last deletion if its window is still open. Returns how
    /// many items came back.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if an item cannot be written back.
    pub async fn undo_delete(&self) -> Result<usize, StorageError> {
        let pending = self.lock_pending().take();
        let Some(pending) = pending else {
            return Ok(0);
        };
        if Instant::now() >= pending.deadline {
            tracing::debug!("gallery undo window elapsed");
            return Ok(0);
        }
        for item in &pending.items {
            self.store.put(item).await?;
        }
        tracing::info!(count = pending.items.len(), "gallery deletion undone");
        Ok(pending.items.len())
    }

    /// Drops the undo buffer.
    pub fn expire_undo(&self) {
        self.lock_pending().take();
    }
}

fn content_hash(image: &EncodedImage) -> blake3::Hash {
    blake3::hash(image.bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::ImageKind;
    use crate::infrastructure::memory::MemoryGalleryStore;

    fn image(tag: u8) -> EncodedImage {
        EncodedImage::new(vec![tag; 16], ImageKind::Png, 2, 2)
    }

    fn service() -> GalleryService {
        GalleryService::new(Arc::new(MemoryGalleryStore::default()), DEFAULT_UNDO_WINDOW)
    }

    fn state_with_batch() -> SessionState {
        SessionState {
            prompt: "Red Fox in snow".into(),
            generated_images: Some(vec![image(1), image(2)]),
            comparison_image: Some(image(9)),
            ..SessionState::default()
        }
    }

    #[tokio::test]
    async fn saving_twice_does_not_duplicate() {
        let gallery = service();
        let first = gallery.save_current(&state_with_batch()).await.expect("save");
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].prompt, BASE_IMAGE_PROMPT);
        assert_eq!(first[1].prompt, "Red Fox in snow");

        let second = gallery.save_current(&state_with_batch()).await.expect("save");
        assert!(second.is_empty());
        assert_eq!(gallery.list(GallerySort::Newest).await.expect("list").len(), 3);
    }

    #[tokio::test]
    async fn identical_images_in_one_batch_are_saved_once() {
        let gallery = service();
        let state = SessionState {
            generated_images: Some(vec![image(4), image(4)]),
            ..SessionState::default()
        };
        assert_eq!(gallery.save_current(&state).await.expect("save").len(), 1);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let gallery = service();
        let saved = gallery.save_current(&state_with_batch()).await.expect("save");
        let ids: HashSet<_> = saved.iter().map(|item| item.id.clone()).collect();
        assert_eq!(ids.len(), saved.len());
    }

    #[tokio::test]
    async fn search_matches_every_term() {
        let gallery = service();
        gallery.save_current(&state_with_batch()).await.expect("save");
        let hits = gallery
            .search("fox RED", GallerySort::Oldest)
            .await
            .expect("search");
        assert_eq!(hits.len(), 2);
        assert!(gallery
            .search("wolf", GallerySort::Newest)
            .await
            .expect("search")
            .is_empty());
    }

    #[tokio::test]
    async fn favorites_sort_first() {
        let gallery = service();
        let saved = gallery.save_current(&state_with_batch()).await.expect("save");
        assert!(gallery.toggle_favorite(&saved[0].id).await.expect("toggle"));

        let listed = gallery.list(GallerySort::FavoritesFirst).await.expect("list");
        assert_eq!(listed[0].id, saved[0].id);
        assert!(!gallery.toggle_favorite(&saved[0].id).await.expect("toggle"));
        assert!(matches!(
            gallery.toggle_favorite("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deletion_can_be_undone_within_the_window() {
        let gallery = service();
        let saved = gallery.save_current(&state_with_batch()).await.expect("save");
        gallery.delete(&saved[1].id).await.expect("delete");
        assert_eq!(gallery.list(GallerySort::Newest).await.expect("list").len(), 2);

        tokio::time::advance(Duration::from_millis(6000)).await;
        assert!(gallery.can_undo());
        assert_eq!(gallery.undo_delete().await.expect("undo"), 1);
        assert_eq!(gallery.list(GallerySort::Newest).await.expect("list").len(), 3);
        assert!(!gallery.can_undo());
    }

    #[tokio::test(start_paused = true)]
    async fn undo_window_expires() {
        let gallery = service();
        gallery.save_current(&state_with_batch()).await.expect("save");
        assert_eq!(gallery.clear_all().await.expect("clear"), 3);

        tokio::time::advance(Duration::from_millis(7001)).await;
        assert!(!gallery.can_undo());
        assert_eq!(gallery.undo_delete().await.expect("undo"), 0);
        assert!(gallery.list(GallerySort::Newest).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn a_new_deletion_replaces_the_undo_buffer() {
        let gallery = service();
        let saved = gallery.save_current(&state_with_batch()).await.expect("save");
        gallery.delete(&saved[0].id).await.expect("delete");
        gallery.delete(&saved[1].id).await.expect("delete");

        assert_eq!(gallery.undo_delete().await.expect("undo"), 1);
        let ids: Vec<_> = gallery
            .list(GallerySort::Newest)
            .await
            .expect("list")
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert!(ids.contains(&saved[1].id));
        assert!(!ids.contains(&saved[0].id));
    }

    #[tokio::test]
    async fn expired_buffer_cannot_be_restored() {
        let gallery = service();
        let saved = gallery.save_current(&state_with_batch()).await.expect("save");
        gallery.delete(&saved[2].id).await.expect("delete");
        gallery.expire_undo();
        assert_eq!(gallery.undo_delete().await.expect("undo"), 0);
    }
}
