use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
    SetInterceptFileChooserDialogParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::layout;
use chromiumoxide::page::{Page, ScreenshotParams};
use courier_logging::{courier_debug, courier_info};
use futures_util::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::{BrowserLauncher, DriverError, PageDriver, Point, Rect};

const HIDE_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

const RECT_FN: &str = "function() { const r = this.getBoundingClientRect(); \
     return JSON.stringify({ x: r.x, y: r.y, width: r.width, height: r.height }); }";

const INTERACTABLE_FN: &str = "function() { const r = this.getBoundingClientRect(); \
     const s = window.getComputedStyle(this); \
     return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' \
     && s.display !== 'none' && !this.disabled; }";

const VALUE_FN: &str =
    "function() { return this.value === undefined ? null : String(this.value); }";

// Goes through the native setter so framework-controlled inputs notice.
const CLEAR_FN: &str = "function() { \
     if (this.isContentEditable) { this.textContent = ''; return; } \
     const desc = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(this), 'value'); \
     if (desc && desc.set) { desc.set.call(this, ''); } else { this.value = ''; } \
     this.dispatchEvent(new Event('input', { bubbles: true })); }";

fn cdp(err: CdpError) -> DriverError {
    DriverError::Browser(err.to_string())
}

/// How the browser is started.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: String,
    pub locale: String,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1280,
            window_height: 900,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            locale: "ja-JP".to_string(),
            chrome_executable: None,
        }
    }
}

pub struct ChromiumLauncher {
    options: BrowserOptions,
}

impl ChromiumLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    fn config(&self) -> Result<BrowserConfig, DriverError> {
        let options = &self.options;
        let mut builder = BrowserConfig::builder()
            .window_size(options.window_width, options.window_height)
            .viewport(Viewport {
                width: options.window_width,
                height: options.window_height,
                ..Viewport::default()
            })
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--lang={}", options.locale));
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(DriverError::Browser)
    }
}

/// A launched browser with its single working tab.
pub struct ChromiumPage {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Page = ChromiumPage;

    async fn launch(&self) -> Result<ChromiumPage, DriverError> {
        let (browser, mut events) = Browser::launch(self.config()?).await.map_err(cdp)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(cdp)?;
        let agent = SetUserAgentOverrideParams::builder()
            .user_agent(self.options.user_agent.clone())
            .accept_language(self.options.locale.clone())
            .build()
            .map_err(DriverError::Browser)?;
        page.execute(agent).await.map_err(cdp)?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(HIDE_WEBDRIVER))
            .await
            .map_err(cdp)?;
        page.execute(SetInterceptFileChooserDialogParams::new(true))
            .await
            .map_err(cdp)?;

        courier_info!(
            "browser started ({}x{}, headless: {})",
            self.options.window_width,
            self.options.window_height,
            self.options.headless
        );
        Ok(ChromiumPage {
            browser,
            page,
            handler,
        })
    }

    async fn close(&self, mut page: ChromiumPage) -> Result<(), DriverError> {
        let closed = page.browser.close().await.map_err(cdp);
        if closed.is_ok() {
            page.browser.wait().await.map_err(|e| DriverError::Browser(e.to_string()))?;
        }
        page.handler.abort();
        closed.map(|_| ())
    }
}

impl ChromiumPage {
    async fn call(&self, element: &Element, function: &str) -> Result<Option<Value>, DriverError> {
        let returns = element.call_js_fn(function, false).await.map_err(cdp)?;
        Ok(returns.result.value)
    }

    async fn evaluate_string(&self, script: String) -> Result<Option<String>, DriverError> {
        let result = self.page.evaluate(script).await.map_err(cdp)?;
        Ok(result.value().and_then(Value::as_str).map(str::to_string))
    }

    async fn key(&self, key: &str, code: &str, key_code: i64, text: Option<&str>) -> Result<(), DriverError> {
        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key)
            .code(code)
            .windows_virtual_key_code(key_code)
            .native_virtual_key_code(key_code);
        if let Some(text) = text {
            down = down.text(text);
        }
        let down = down.build().map_err(DriverError::Browser)?;
        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key)
            .code(code)
            .windows_virtual_key_code(key_code)
            .native_virtual_key_code(key_code)
            .build()
            .map_err(DriverError::Browser)?;
        self.page.execute(down).await.map_err(cdp)?;
        self.page.execute(up).await.map_err(cdp)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromiumPage {
    type Element = Element;

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.page.url().await.map_err(cdp)?.unwrap_or_default())
    }

    async fn query_css(&self, selector: &str) -> Result<Vec<Element>, DriverError> {
        match self.page.find_elements(selector).await {
            Ok(found) => Ok(found),
            // No match is reported as an error by the protocol.
            Err(CdpError::NotFound) => Ok(Vec::new()),
            Err(err) => Err(cdp(err)),
        }
    }

    async fn query_text(&self, tag: &str, text: &str, exact: bool) -> Result<Vec<Element>, DriverError> {
        let literal = xpath_literal(text);
        let xpath = if exact {
            format!("//{tag}[normalize-space(.)={literal}]")
        } else {
            format!("//{tag}[contains(normalize-space(.), {literal})]")
        };
        match self.page.find_xpaths(xpath).await {
            Ok(found) => Ok(found),
            Err(CdpError::NotFound) => Ok(Vec::new()),
            Err(err) => Err(cdp(err)),
        }
    }

    async fn script_query(&self, text: &str) -> Result<Vec<Point>, DriverError> {
        let needle = serde_json::to_string(text).map_err(|e| DriverError::Browser(e.to_string()))?;
        let script = format!(
            r#"(() => {{
  const needle = {needle};
  const found = [];
  const visit = (root) => {{
    for (const el of root.querySelectorAll('button, [role="button"]')) {{
      if ((el.innerText || el.textContent || '').trim() !== needle) continue;
      const r = el.getBoundingClientRect();
      if (r.width > 0 && r.height > 0) found.push({{ x: r.x + r.width / 2, y: r.y + r.height / 2 }});
    }}
    for (const el of root.querySelectorAll('*')) {{
      if (el.shadowRoot) visit(el.shadowRoot);
    }}
  }};
  visit(document);
  return JSON.stringify(found);
}})()"#
        );
        let Some(json) = self.evaluate_string(script).await? else {
            return Ok(Vec::new());
        };
        let points: Vec<Value> =
            serde_json::from_str(&json).map_err(|e| DriverError::Browser(e.to_string()))?;
        Ok(points
            .iter()
            .filter_map(|p| {
                Some(Point {
                    x: p.get("x")?.as_f64()?,
                    y: p.get("y")?.as_f64()?,
                })
            })
            .collect())
    }

    async fn locate_text(&self, text: &str, exact: bool) -> Result<Option<Rect>, DriverError> {
        let needle = serde_json::to_string(text).map_err(|e| DriverError::Browser(e.to_string()))?;
        let script = format!(
            r#"(() => {{
  const needle = {needle};
  const exact = {exact};
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
  let node;
  while ((node = walker.nextNode())) {{
    const text = node.textContent.trim();
    if (exact ? text !== needle : !text.includes(needle)) continue;
    const range = document.createRange();
    range.selectNodeContents(node);
    const r = range.getBoundingClientRect();
    if (r.width === 0 && r.height === 0) continue;
    if (r.bottom < 0 || r.top > window.innerHeight) continue;
    return JSON.stringify({{ x: r.x, y: r.y, width: r.width, height: r.height }});
  }}
  return null;
}})()"#
        );
        Ok(self.evaluate_string(script).await?.as_deref().and_then(rect_from_json))
    }

    async fn bounding_box(&self, element: &Element) -> Result<Option<Rect>, DriverError> {
        let value = self.call(element, RECT_FN).await?;
        Ok(value.as_ref().and_then(Value::as_str).and_then(rect_from_json))
    }

    async fn is_interactable(&self, element: &Element) -> Result<bool, DriverError> {
        let value = self.call(element, INTERACTABLE_FN).await?;
        Ok(value.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    async fn input_value(&self, element: &Element) -> Result<Option<String>, DriverError> {
        let value = self.call(element, VALUE_FN).await?;
        Ok(value.as_ref().and_then(Value::as_str).map(str::to_string))
    }

    async fn click(&self, element: &Element) -> Result<(), DriverError> {
        element.click().await.map_err(cdp)?;
        Ok(())
    }

    async fn click_at(&self, point: Point) -> Result<(), DriverError> {
        self.page
            .click(layout::Point::new(point.x, point.y))
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn clear(&self, element: &Element) -> Result<(), DriverError> {
        self.call(element, CLEAR_FN).await?;
        Ok(())
    }

    async fn type_text(
        &self,
        element: &Element,
        text: &str,
        per_char_delay: Duration,
    ) -> Result<(), DriverError> {
        element.focus().await.map_err(cdp)?;
        for ch in text.chars() {
            if ch == '\n' {
                self.key("Enter", "Enter", 13, Some("\r")).await?;
            } else {
                self.page
                    .execute(InsertTextParams::new(ch.to_string()))
                    .await
                    .map_err(cdp)?;
            }
            if !per_char_delay.is_zero() {
                tokio::time::sleep(per_char_delay).await;
            }
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        match key {
            "Enter" => self.key("Enter", "Enter", 13, Some("\r")).await,
            "Escape" => self.key("Escape", "Escape", 27, None).await,
            other => self.key(other, other, 0, None).await,
        }
    }

    async fn attach_file(&self, path: &Path) -> Result<(), DriverError> {
        let inputs = self.query_css("input[type=\"file\"]").await?;
        let Some(input) = inputs.last() else {
            return Err(DriverError::Browser("page has no file input".to_string()));
        };
        let mut params = SetFileInputFilesParams::new(vec![path.display().to_string()]);
        params.backend_node_id = Some(input.backend_node_id.clone());
        self.page.execute(params).await.map_err(cdp)?;
        courier_debug!("attached {}", path.display());
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<(), DriverError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {dy})"))
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<(), DriverError> {
        self.page.evaluate("window.scrollTo(0, 0)").await.map_err(cdp)?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page.save_screenshot(params, path).await.map_err(cdp)?;
        Ok(())
    }
}

fn rect_from_json(json: &str) -> Option<Rect> {
    let value: Value = serde_json::from_str(json).ok()?;
    Some(Rect::new(
        value.get("x")?.as_f64()?,
        value.get("y")?.as_f64()?,
        value.get("width")?.as_f64()?,
        value.get("height")?.as_f64()?,
    ))
}

/// Quotes `text` as an XPath 1.0 string literal.
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{text}'")
    } else if !text.contains('"') {
        format!("\"{text}\"")
    } else {
        let parts: Vec<String> = text.split('\'').map(|part| format!("'{part}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
