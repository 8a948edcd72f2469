use crate::utils::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 清單中單一商品卡片的快照
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price_text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_label: Option<String>,
    /// 卡片元素的完整文字內容，用於重新整理前後比對
    #[serde(default)]
    pub text: String,
}

impl Card {
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn has_price(&self) -> bool {
        !self.price_text.trim().is_empty()
    }

    pub fn has_image(&self) -> bool {
        self.image_url
            .as_deref()
            .map(|src| !src.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardCollection {
    cards: Vec<Card>,
}

impl CardCollection {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn first(&self) -> Option<&Card> {
        self.cards.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Card> {
        self.cards.iter()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl From<Vec<Card>> for CardCollection {
    fn from(cards: Vec<Card>) -> Self {
        Self::new(cards)
    }
}

impl<'a> IntoIterator for &'a CardCollection {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

const IPHONE_13_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1";
const PIXEL_5_UA: &str = "Mozilla/5.0 (Linux; Android 11; Pixel 5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.91 Mobile Safari/537.36";

/// 裝置模擬設定；`mobile` 為 true 時由瀏覽器端套用行動裝置模式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub mobile: bool,
    pub device_scale_factor: f64,
    pub user_agent: Option<String>,
}

impl ViewportProfile {
    pub const PRESETS: [&'static str; 3] = ["desktop", "iphone-13", "pixel-5"];

    pub fn desktop() -> Self {
        Self {
            name: "desktop".to_string(),
            width: 1280,
            height: 720,
            mobile: false,
            device_scale_factor: 1.0,
            user_agent: None,
        }
    }

    /// 依名稱取得預設裝置
    pub fn preset(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let (width, height, scale, user_agent) = match name.as_str() {
            "desktop" => return Some(Self::desktop()),
            "iphone-13" | "iphone13" => (390, 664, 3.0, IPHONE_13_UA),
            "pixel-5" | "pixel5" => (393, 727, 2.75, PIXEL_5_UA),
            _ => return None,
        };
        Some(Self {
            name,
            width,
            height,
            mobile: true,
            device_scale_factor: scale,
            user_agent: Some(user_agent.to_string()),
        })
    }
}

impl Default for ViewportProfile {
    fn default() -> Self {
        Self::desktop()
    }
}

/// Element selector in Playwright notation: `xpath=...`, `text=...`, otherwise CSS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Selector {
    Css(String),
    XPath(String),
    Text(String),
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let selector = if let Some(rest) = trimmed.strip_prefix("xpath=") {
            Selector::XPath(rest.trim().to_string())
        } else if let Some(rest) = trimmed.strip_prefix("text=") {
            Selector::Text(rest.trim().to_string())
        } else if trimmed.starts_with("//") || trimmed.starts_with("./") {
            Selector::XPath(trimmed.to_string())
        } else {
            Selector::Css(trimmed.to_string())
        };

        if selector.body().is_empty() {
            return Err(AuditError::InvalidSelector {
                selector: raw.to_string(),
                reason: "selector body is empty".to_string(),
            });
        }
        Ok(selector)
    }

    pub fn body(&self) -> &str {
        match self {
            Selector::Css(s) | Selector::XPath(s) | Selector::Text(s) => s,
        }
    }

    /// 文字選擇器轉成 XPath：不分大小寫，取最內層包含該文字的元素
    ///
    /// XPath 1.0 has no `lower-case()`, so both sides are folded with `translate()`.
    /// Literals holding both quote kinds are built with `concat()`.
    pub fn text_xpath(text: &str) -> String {
        const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

        let text = text.to_lowercase();
        let literal = if !text.contains('"') {
            format!("\"{}\"", text)
        } else if !text.contains('\'') {
            format!("'{}'", text)
        } else {
            let parts: Vec<String> = text.split('"').map(|p| format!("\"{}\"", p)).collect();
            format!("concat({})", parts.join(", '\"', "))
        };
        let folded = format!("translate(normalize-space(.), '{}', '{}')", UPPER, LOWER);
        format!(
            "//*[contains({folded}, {literal})][not(*[contains({folded}, {literal})])]",
            folded = folded,
            literal = literal
        )
    }
}

impl TryFrom<String> for Selector {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self> {
        Selector::parse(&value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "{}", s),
            Selector::XPath(s) => write!(f, "xpath={}", s),
            Selector::Text(s) => write!(f, "text={}", s),
        }
    }
}

/// 定位清單區塊與卡片欄位的選擇器組合
///
/// `item` 相對於 `container`，欄位選擇器相對於每張卡片。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionLocator {
    pub container: Selector,
    pub item: Selector,
    pub title: Selector,
    pub price: Selector,
    pub image: Selector,
    #[serde(default)]
    pub category: Option<Selector>,
}
