use crate::domain::model::{Card, CardCollection, CollectionLocator, Selector, ViewportProfile};
use crate::domain::ports::PageDriver;
use crate::utils::error::{AuditError, Result};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::wd::WebDriverCompatibleCommand;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 透過 W3C WebDriver 操作真實瀏覽器的分頁
pub struct WebDriverPage {
    client: Client,
    wait_timeout: Duration,
    /// 目前是否套用了行動裝置模擬
    emulating: bool,
}

/// chromedriver 的 `goog/cdp/execute` 擴充指令
#[derive(Debug, Clone, PartialEq)]
pub struct CdpCommand {
    pub cmd: String,
    pub params: serde_json::Value,
}

impl CdpCommand {
    pub fn new(cmd: &str, params: serde_json::Value) -> Self {
        Self {
            cmd: cmd.to_string(),
            params,
        }
    }
}

impl WebDriverCompatibleCommand for CdpCommand {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> std::result::Result<url::Url, url::ParseError> {
        base_url.join(&format!(
            "session/{}/goog/cdp/execute",
            session_id.unwrap_or_default()
        ))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        let body = json!({ "cmd": self.cmd, "params": self.params });
        (http::Method::POST, Some(body.to_string()))
    }
}

/// 切換裝置時要送出的 CDP 指令
///
/// Mobile profiles override device metrics and, when given, the user agent.
/// A desktop profile clears a previous override; with none active nothing is
/// sent, so drivers without the CDP extension keep working on desktop.
pub fn emulation_commands(profile: &ViewportProfile, emulating: bool) -> Vec<CdpCommand> {
    if profile.mobile {
        let mut commands = vec![CdpCommand::new(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": profile.width,
                "height": profile.height,
                "deviceScaleFactor": profile.device_scale_factor,
                "mobile": true,
            }),
        )];
        if let Some(user_agent) = &profile.user_agent {
            commands.push(CdpCommand::new(
                "Emulation.setUserAgentOverride",
                json!({ "userAgent": user_agent }),
            ));
        }
        commands
    } else if emulating {
        vec![
            CdpCommand::new("Emulation.clearDeviceMetricsOverride", json!({})),
            CdpCommand::new("Emulation.setUserAgentOverride", json!({ "userAgent": "" })),
        ]
    } else {
        Vec::new()
    }
}

impl WebDriverPage {
    /// 檢查 WebDriver 伺服器的 `/status`，回傳是否可建立新工作階段
    pub async fn check_status(webdriver_url: &str) -> Result<bool> {
        let status_url = format!("{}/status", webdriver_url.trim_end_matches('/'));
        tracing::debug!("Checking WebDriver status at {}", status_url);

        let response = reqwest::Client::new().get(&status_url).send().await?;
        if !response.status().is_success() {
            tracing::warn!("WebDriver status returned {}", response.status());
            return Ok(false);
        }

        let body: serde_json::Value = response.json().await?;
        Ok(body
            .pointer("/value/ready")
            .and_then(|ready| ready.as_bool())
            .unwrap_or(false))
    }

    pub async fn connect(webdriver_url: &str, headless: bool) -> Result<Self> {
        if !Self::check_status(webdriver_url).await? {
            return Err(AuditError::NavigationError {
                url: webdriver_url.to_string(),
                message: "WebDriver server is not ready for new sessions".to_string(),
            });
        }

        let mut args = vec!["--no-sandbox".to_string()];
        if headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
            args.push("--disable-dev-shm-usage".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        tracing::debug!("Connecting to WebDriver at {}", webdriver_url);
        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(webdriver_url)
            .await?;

        Ok(Self {
            client,
            wait_timeout: Duration::from_secs(5),
            emulating: false,
        })
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// 輪詢直到出現符合的元素或逾時，逾時回傳空清單
    async fn wait_for_all(&self, selector: &Selector) -> Result<Vec<Element>> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let found = find_all_in_page(&self.client, selector).await?;
            if !found.is_empty() || Instant::now() >= deadline {
                return Ok(found);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn read_card(&self, item: &Element, locator: &CollectionLocator) -> Result<Card> {
        let title = first_visible_text(item, &locator.title).await?;
        let price_text = first_visible_text(item, &locator.price).await?;
        let image_url = match first_visible(item, &locator.image).await? {
            Some(image) => image.attr("src").await?,
            None => None,
        };
        let category_label = match &locator.category {
            Some(selector) => first_visible_text(item, selector)
                .await
                .map(|text| Some(text).filter(|t| !t.is_empty()))?,
            None => None,
        };

        Ok(Card {
            title,
            price_text,
            image_url,
            category_label,
            text: item.text().await?,
        })
    }
}

fn xpath_for(selector: &Selector) -> Option<String> {
    match selector {
        Selector::XPath(xpath) => Some(xpath.clone()),
        Selector::Text(text) => Some(Selector::text_xpath(text)),
        Selector::Css(_) => None,
    }
}

async fn find_all_in_page(client: &Client, selector: &Selector) -> Result<Vec<Element>> {
    let elements = match xpath_for(selector) {
        Some(xpath) => client.find_all(Locator::XPath(&xpath)).await?,
        None => client.find_all(Locator::Css(selector.body())).await?,
    };
    Ok(elements)
}

async fn find_all_in(element: &Element, selector: &Selector) -> Result<Vec<Element>> {
    let elements = match xpath_for(selector) {
        Some(xpath) => element.find_all(Locator::XPath(&xpath)).await?,
        None => element.find_all(Locator::Css(selector.body())).await?,
    };
    Ok(elements)
}

async fn first_visible(element: &Element, selector: &Selector) -> Result<Option<Element>> {
    for candidate in find_all_in(element, selector).await? {
        if candidate.is_displayed().await? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// 隱藏或不存在的欄位回傳空字串
async fn first_visible_text(element: &Element, selector: &Selector) -> Result<String> {
    match first_visible(element, selector).await? {
        Some(found) => Ok(found.text().await?),
        None => Ok(String::new()),
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    async fn set_viewport(&mut self, profile: &ViewportProfile) -> Result<()> {
        tracing::debug!(
            "Setting viewport to {} ({}x{})",
            profile.name,
            profile.width,
            profile.height
        );
        self.client
            .set_window_size(profile.width, profile.height)
            .await?;

        for command in emulation_commands(profile, self.emulating) {
            tracing::debug!("CDP {}", command.cmd);
            self.client.issue_cmd(command).await?;
        }
        self.emulating = profile.mobile;
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .map_err(|e| AuditError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn reload(&mut self) -> Result<()> {
        self.client.refresh().await?;
        Ok(())
    }

    async fn fetch_collection(
        &mut self,
        locator: &CollectionLocator,
    ) -> Result<Option<CardCollection>> {
        let containers = self.wait_for_all(&locator.container).await?;
        let Some(container) = containers.first() else {
            return Ok(None);
        };

        let items = find_all_in(container, &locator.item).await?;
        tracing::debug!("Found {} item(s) under {}", items.len(), locator.container);

        let mut cards = Vec::with_capacity(items.len());
        for item in &items {
            cards.push(self.read_card(item, locator).await?);
        }
        Ok(Some(CardCollection::new(cards)))
    }

    async fn is_visible(&mut self, selector: &Selector) -> Result<bool> {
        for element in find_all_in_page(&self.client, selector).await? {
            if element.is_displayed().await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn css_value(&mut self, selector: &Selector, property: &str) -> Result<Option<String>> {
        match find_all_in_page(&self.client, selector).await?.first() {
            Some(element) => Ok(Some(element.css_value(property).await?)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_command_request() {
        let command = CdpCommand::new("Emulation.clearDeviceMetricsOverride", json!({}));
        let base = url::Url::parse("http://localhost:9515/").unwrap();

        let endpoint = command.endpoint(&base, Some("abc123")).unwrap();
        assert_eq!(
            endpoint.as_str(),
            "http://localhost:9515/session/abc123/goog/cdp/execute"
        );

        let (method, body) = command.method_and_body(&endpoint);
        assert_eq!(method, http::Method::POST);
        let body: serde_json::Value = serde_json::from_str(&body.unwrap()).unwrap();
        assert_eq!(body["cmd"], "Emulation.clearDeviceMetricsOverride");
        assert_eq!(body["params"], json!({}));
    }

    #[test]
    fn test_mobile_profile_overrides_metrics_and_user_agent() {
        let phone = ViewportProfile::preset("pixel-5").unwrap();
        let commands = emulation_commands(&phone, false);

        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].cmd, "Emulation.setDeviceMetricsOverride");
        assert_eq!(commands[0].params["mobile"], true);
        assert_eq!(commands[0].params["width"], 393);
        assert_eq!(commands[0].params["deviceScaleFactor"], 2.75);
        assert_eq!(commands[1].cmd, "Emulation.setUserAgentOverride");
        assert!(commands[1].params["userAgent"]
            .as_str()
            .unwrap()
            .contains("Pixel 5"));
    }

    #[test]
    fn test_desktop_profile_clears_only_active_override() {
        let desktop = ViewportProfile::desktop();
        assert!(emulation_commands(&desktop, false).is_empty());

        let commands = emulation_commands(&desktop, true);
        let names: Vec<&str> = commands.iter().map(|c| c.cmd.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Emulation.clearDeviceMetricsOverride",
                "Emulation.setUserAgentOverride"
            ]
        );
        assert_eq!(commands[1].params["userAgent"], "");
    }
}
