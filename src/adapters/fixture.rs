//! Offline page driver backed by captured snapshots.
//!
//! A fixture file maps page URLs to what the browser saw there. Selectors
//! are not evaluated: the captured collection is returned for whatever
//! locator the suite uses, and styles and visibility are looked up by the
//! selector's string form. The container selector of the last fetched
//! locator is displayed whenever the section exists, unless the page sets
//! `section_hidden`.

use crate::domain::model::{Card, CardCollection, CollectionLocator, Selector, ViewportProfile};
use crate::domain::ports::PageDriver;
use crate::utils::error::{AuditError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

type StyleMap = HashMap<String, HashMap<String, String>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureSite {
    pub pages: HashMap<String, PageFixture>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFixture {
    /// `null` 或省略代表區塊不存在
    pub collection: Option<Vec<Card>>,
    pub after_reload: Option<Vec<Card>>,
    /// 區塊存在於 DOM 但未顯示
    pub section_hidden: bool,
    pub visible_texts: Vec<String>,
    pub visible_selectors: Vec<String>,
    pub styles: StyleMap,
    pub viewport_styles: HashMap<String, StyleMap>,
}

#[derive(Debug, Clone)]
pub struct FixtureDriver {
    site: FixtureSite,
    current: Option<String>,
    viewport: ViewportProfile,
    reloads: usize,
    container: Option<Selector>,
}

impl FixtureDriver {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site,
            current: None,
            viewport: ViewportProfile::default(),
            reloads: 0,
            container: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let site: FixtureSite = serde_json::from_str(content)?;
        tracing::debug!("Loaded fixtures for {} page(s)", site.pages.len());
        Ok(Self::new(site))
    }

    pub fn viewport(&self) -> &ViewportProfile {
        &self.viewport
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn page(&self) -> Result<&PageFixture> {
        let url = self
            .current
            .as_deref()
            .ok_or_else(|| AuditError::NavigationError {
                url: "about:blank".to_string(),
                message: "no page has been opened".to_string(),
            })?;
        self.site
            .pages
            .get(url)
            .ok_or_else(|| AuditError::NavigationError {
                url: url.to_string(),
                message: "no fixture recorded for this URL".to_string(),
            })
    }

    fn rendered_cards(&self) -> Result<Option<&Vec<Card>>> {
        let page = self.page()?;
        Ok(match (&page.after_reload, self.reloads) {
            (Some(reloaded), n) if n > 0 => Some(reloaded),
            _ => page.collection.as_ref(),
        })
    }
}

#[async_trait]
impl PageDriver for FixtureDriver {
    async fn set_viewport(&mut self, profile: &ViewportProfile) -> Result<()> {
        self.viewport = profile.clone();
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        if !self.site.pages.contains_key(url) {
            return Err(AuditError::NavigationError {
                url: url.to_string(),
                message: "no fixture recorded for this URL".to_string(),
            });
        }
        self.current = Some(url.to_string());
        self.reloads = 0;
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        self.page()?;
        self.reloads += 1;
        Ok(())
    }

    async fn fetch_collection(
        &mut self,
        locator: &CollectionLocator,
    ) -> Result<Option<CardCollection>> {
        let collection = self
            .rendered_cards()?
            .map(|cards| CardCollection::new(cards.clone()));
        self.container = Some(locator.container.clone());
        Ok(collection)
    }

    async fn is_visible(&mut self, selector: &Selector) -> Result<bool> {
        let page = self.page()?;
        let visible = match selector {
            // text= 與 Playwright 相同：不分大小寫的子字串比對
            Selector::Text(text) => {
                let needle = text.to_lowercase();
                page.visible_texts
                    .iter()
                    .any(|shown| shown.to_lowercase().contains(&needle))
            }
            other if self.container.as_ref() == Some(other) => {
                !page.section_hidden && self.rendered_cards()?.is_some()
            }
            other => {
                let key = other.to_string();
                page.visible_selectors.iter().any(|shown| *shown == key)
            }
        };
        Ok(visible)
    }

    async fn css_value(&mut self, selector: &Selector, property: &str) -> Result<Option<String>> {
        let page = self.page()?;
        let key = selector.to_string();
        let lookup = |styles: &StyleMap| {
            styles
                .get(&key)
                .and_then(|props| props.get(property))
                .cloned()
        };

        Ok(page
            .viewport_styles
            .get(&self.viewport.name)
            .and_then(lookup)
            .or_else(|| lookup(&page.styles)))
    }
}
