use std::sync::Arc;

use inv_types::{ItemId, ItemView};

use crate::error::StoreResult;
use crate::item::ItemStore;

/// Read-only projections over an [`ItemStore`].
#[derive(Clone, Debug)]
pub struct QueryView {
    store: Arc<ItemStore>,
}

impl QueryView {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }

    /// Fetch an item and project it, dropping the photo reference unless
    /// `include_photo` is set.
    pub async fn get_projected(&self, id: &ItemId, include_photo: bool) -> StoreResult<ItemView> {
        let item = self.store.get(id).await?;
        Ok(ItemView::project(&item, include_photo))
    }

    /// Project every readable item.
    pub async fn list_projected(&self, include_photo: bool) -> StoreResult<Vec<ItemView>> {
        let items = self.store.list().await?;
        Ok(items
            .iter()
            .map(|item| ItemView::project(item, include_photo))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use inv_types::{NewItem, PhotoUpload};

    use super::*;
    use crate::config::StoreConfig;
    use crate::error::StoreError;

    async fn view() -> (tempfile::TempDir, Arc<ItemStore>, QueryView) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ItemStore::open(StoreConfig::new(dir.path())).await.unwrap());
        let view = QueryView::new(Arc::clone(&store));
        (dir, store, view)
    }

    #[tokio::test]
    async fn projection_hides_photo_on_request() {
        let (_dir, store, view) = view().await;
        let item = store
            .create(
                NewItem::new("Cat picture").with_description("x"),
                Some(PhotoUpload::new(&b"12345"[..], "cat.jpg", "photo")),
            )
            .await
            .unwrap();

        let bare = view.get_projected(&item.id, false).await.unwrap();
        assert_eq!(bare.id, item.id);
        assert_eq!(bare.name, "Cat picture");
        assert_eq!(bare.description, "x");
        assert_eq!(bare.photo_url, None);

        let full = view.get_projected(&item.id, true).await.unwrap();
        assert_eq!(full.photo_url, Some(format!("/inventory/{}/photo", item.id)));
    }

    #[tokio::test]
    async fn item_without_photo_has_no_url_either_way() {
        let (_dir, store, view) = view().await;
        let item = store.create(NewItem::new("Lamp"), None).await.unwrap();
        assert_eq!(view.get_projected(&item.id, true).await.unwrap().photo_url, None);
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let (_dir, _store, view) = view().await;
        let err = view
            .get_projected(&ItemId::parse("ghost").unwrap(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn list_projects_every_item() {
        let (_dir, store, view) = view().await;
        store.create(NewItem::new("a"), None).await.unwrap();
        store.create(NewItem::new("b"), None).await.unwrap();
        let views = view.list_projected(false).await.unwrap();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|v| v.photo_url.is_none()));
    }
}
