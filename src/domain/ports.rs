use crate::domain::model::{CardCollection, CollectionLocator, Selector, ViewportProfile};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 瀏覽器自動化的協作介面，代表一個已開啟的分頁
///
/// Page loads, element waiting and timeouts are the implementor's concern.
/// Errors are returned as-is to the caller; nothing above this trait retries.
#[async_trait]
pub trait PageDriver: Send {
    async fn set_viewport(&mut self, profile: &ViewportProfile) -> Result<()>;

    async fn goto(&mut self, url: &str) -> Result<()>;

    async fn reload(&mut self) -> Result<()>;

    /// `None` when the container is not on the page, `Some(empty)` when it holds no items.
    async fn fetch_collection(&mut self, locator: &CollectionLocator)
        -> Result<Option<CardCollection>>;

    async fn is_visible(&mut self, selector: &Selector) -> Result<bool>;

    /// Computed style of the first match, `None` when nothing matches.
    async fn css_value(&mut self, selector: &Selector, property: &str) -> Result<Option<String>>;

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
