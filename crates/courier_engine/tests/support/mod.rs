#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use courier_engine::{BrowserLauncher, DriverError, PageDriver, Point, PublishSettings, Rect};

pub const LOGIN_URL: &str = "https://note.com/login";
pub const HOME_URL: &str = "https://note.com/";
pub const EDITOR_URL: &str = "https://note.com/notes/new";
pub const PUBLISHED_URL: &str = "https://note.com/n/n0000published";

const VIEWPORT_HEIGHT: f64 = 900.0;

pub fn init_logging() {
    courier_logging::initialize_for_tests();
}

pub fn fast_settings() -> PublishSettings {
    PublishSettings {
        element_timeout: Duration::from_millis(30),
        navigation_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        settle_delay: Duration::ZERO,
        typing_delay: Duration::ZERO,
        tag_pacing: Duration::ZERO,
        overlay_timeout: Duration::from_millis(30),
        submit_settle: Duration::ZERO,
        capture_timeout: Duration::from_secs(1),
        ..PublishSettings::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Blank,
    Login,
    Home,
    Editor,
    Settings,
    PaidArea,
    Any,
}

#[derive(Debug, Clone)]
pub enum Effect {
    Login,
    Surface(Surface),
    Reveal(&'static str),
    Hide(&'static str),
    Submit,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: &'static str,
    pub surface: Surface,
    pub tag: &'static str,
    pub selectors: Vec<&'static str>,
    pub text: String,
    pub rect: Rect,
    pub hidden: bool,
    pub value: Option<String>,
    pub on_click: Vec<Effect>,
    /// Only reachable through script queries.
    pub shadow: bool,
}

impl Node {
    pub fn new(name: &'static str, surface: Surface, tag: &'static str) -> Self {
        Self {
            name,
            surface,
            tag,
            selectors: Vec::new(),
            text: String::new(),
            rect: Rect::new(100.0, 0.0, 200.0, 30.0),
            hidden: false,
            value: None,
            on_click: Vec::new(),
            shadow: false,
        }
    }

    pub fn css(mut self, selector: &'static str) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn at(mut self, y: f64) -> Self {
        self.rect.y = y;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.on_click.push(effect);
        self
    }

    pub fn shadow(mut self) -> Self {
        self.shadow = true;
        self
    }
}

/// In-memory stand-in for the note.com login page, editor and publish
/// settings, detailed enough to walk every stage.
#[derive(Debug)]
pub struct State {
    pub url: String,
    pub surface: Surface,
    pub logged_in: bool,
    pub accept_login: bool,
    pub bounce_editor: bool,
    pub confirms_upload: bool,
    pub screenshot_fails: bool,
    pub fail_launch: bool,
    /// Rejected logins reload the login page with an error query.
    pub login_error_redirect: bool,
    pub value_read_fails: bool,
    pub text_search_fails: bool,
    pub nodes: Vec<Node>,
    pub focused: Option<usize>,
    pub scroll_y: f64,
    pub body: String,
    pub body_top: f64,
    pub line_height: f64,
    pub attached: Vec<PathBuf>,
    pub confirmed_tags: Vec<String>,
    pub events: Vec<String>,
    pub launches: usize,
    pub closes: usize,
}

impl State {
    pub fn note_site() -> Self {
        use Surface::{Editor, Login, PaidArea, Settings};

        let nodes = vec![
            Node::new("email", Login, "input").css("input#email").at(100.0).value(""),
            Node::new("password", Login, "input").css("input#password").at(160.0).value(""),
            Node::new("login_button", Login, "button")
                .text("ログイン")
                .at(220.0)
                .on_click(Effect::Login),
            Node::new("title", Editor, "textarea")
                .css("textarea[placeholder=\"記事タイトル\"]")
                .css("textarea")
                .at(120.0)
                .value(""),
            Node::new("body", Editor, "div").css(".ProseMirror").at(250.0),
            Node::new("image_button", Editor, "button")
                .css("button[aria-label*=\"画像\"]")
                .css("button:has(svg)")
                .at(110.0)
                .on_click(Effect::Reveal("upload_item"))
                .on_click(Effect::Reveal("overlay_close")),
            Node::new("upload_item", Editor, "button")
                .text("画像をアップロード")
                .at(150.0)
                .hidden(),
            Node::new("crop_confirm", Editor, "button")
                .text("保存")
                .at(600.0)
                .hidden()
                .on_click(Effect::Hide("crop_confirm"))
                .on_click(Effect::Hide("upload_item"))
                .on_click(Effect::Hide("overlay_close")),
            Node::new("overlay_close", Editor, "button")
                .css("[aria-label=\"閉じる\"]")
                .at(60.0)
                .hidden()
                .on_click(Effect::Hide("crop_confirm"))
                .on_click(Effect::Hide("upload_item"))
                .on_click(Effect::Hide("overlay_close")),
            Node::new("publish_button", Editor, "button")
                .text("公開に進む")
                .at(40.0)
                .on_click(Effect::Surface(Settings)),
            Node::new("tag_input", Settings, "input")
                .css("input[placeholder=\"ハッシュタグを追加する\"]")
                .css("input")
                .at(100.0)
                .value(""),
            Node::new("paid_toggle", Settings, "label")
                .css("label[for=\"paid\"]")
                .text("有料")
                .at(200.0)
                .on_click(Effect::Reveal("price_input")),
            Node::new("price_input", Settings, "input")
                .css("input")
                .at(260.0)
                .value("300")
                .hidden(),
            Node::new("paid_area_button", Settings, "button")
                .text("有料エリア設定")
                .at(320.0)
                .on_click(Effect::Surface(PaidArea)),
            Node::new("submit", Settings, "button")
                .text("投稿する")
                .at(400.0)
                .on_click(Effect::Submit),
            Node::new("paid_submit", PaidArea, "button")
                .text("投稿する")
                .at(40.0)
                .on_click(Effect::Submit),
        ];

        let mut state = Self {
            url: "about:blank".to_string(),
            surface: Surface::Blank,
            logged_in: false,
            accept_login: true,
            bounce_editor: false,
            confirms_upload: true,
            screenshot_fails: false,
            fail_launch: false,
            login_error_redirect: false,
            value_read_fails: false,
            text_search_fails: false,
            nodes,
            focused: None,
            scroll_y: 0.0,
            body: String::new(),
            body_top: 250.0,
            line_height: 50.0,
            attached: Vec::new(),
            confirmed_tags: Vec::new(),
            events: Vec::new(),
            launches: 0,
            closes: 0,
        };
        state.set_split_controls(&[100.0, 300.0, 500.0]);
        state
    }

    pub fn set_split_controls(&mut self, ys: &[f64]) {
        const NAMES: [&str; 6] = ["split_0", "split_1", "split_2", "split_3", "split_4", "split_5"];
        self.nodes.retain(|node| !node.name.starts_with("split_"));
        for (name, y) in NAMES.iter().zip(ys) {
            self.nodes.push(
                Node::new(*name, Surface::PaidArea, "button")
                    .text("ラインをこの場所に変更")
                    .at(*y),
            );
        }
    }

    pub fn without(mut self, name: &str) -> Self {
        self.nodes.retain(|node| node.name != name);
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn clicked(&self, name: &str) -> bool {
        let wanted = format!("click:{name}");
        self.events.iter().any(|event| *event == wanted)
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    fn on_surface(&self, node: &Node) -> bool {
        node.surface == Surface::Any || node.surface == self.surface
    }

    fn viewport_rect(&self, node: &Node) -> Rect {
        Rect::new(node.rect.x, node.rect.y - self.scroll_y, node.rect.width, node.rect.height)
    }

    fn interactable(&self, index: usize) -> bool {
        self.nodes
            .get(index)
            .is_some_and(|node| self.on_surface(node) && !node.hidden)
    }

    fn press(&mut self, index: usize) -> Result<(), DriverError> {
        if !self.interactable(index) {
            return Err(DriverError::Browser("element is not clickable".to_string()));
        }
        self.focused = Some(index);
        let node = self.nodes[index].clone();
        self.events.push(format!("click:{}", node.name));
        for effect in node.on_click {
            self.apply(effect);
        }
        Ok(())
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Login => {
                let filled = |name: &str| {
                    self.node(name)
                        .and_then(|node| node.value.as_deref())
                        .is_some_and(|value| !value.is_empty())
                };
                if self.accept_login && filled("email") && filled("password") {
                    self.logged_in = true;
                    self.url = HOME_URL.to_string();
                    self.surface = Surface::Home;
                } else {
                    self.events.push("login-rejected".to_string());
                    if self.login_error_redirect {
                        self.url = format!("{LOGIN_URL}?error=invalid");
                    }
                }
            }
            Effect::Surface(surface) => {
                self.surface = surface;
                self.scroll_y = 0.0;
            }
            Effect::Reveal(name) => self.set_hidden(name, false),
            Effect::Hide(name) => self.set_hidden(name, true),
            Effect::Submit => {
                self.events.push("submitted".to_string());
                self.url = PUBLISHED_URL.to_string();
            }
        }
    }

    fn set_hidden(&mut self, name: &str, hidden: bool) {
        for node in self.nodes.iter_mut().filter(|node| node.name == name) {
            node.hidden = hidden;
        }
    }
}

#[derive(Debug)]
pub struct FakeElement(usize);

#[derive(Clone)]
pub struct FakePage {
    state: Arc<Mutex<State>>,
}

impl FakePage {
    pub fn new(state: State) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Opens the editor as a logged-in user.
    pub fn logged_in(self) -> Self {
        {
            let mut state = self.state();
            state.logged_in = true;
            state.url = EDITOR_URL.to_string();
            state.surface = Surface::Editor;
        }
        self
    }
}

#[async_trait::async_trait]
impl PageDriver for FakePage {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.events.push(format!("goto:{url}"));
        state.scroll_y = 0.0;
        if url == LOGIN_URL {
            state.url = LOGIN_URL.to_string();
            state.surface = Surface::Login;
        } else if url == EDITOR_URL {
            if state.logged_in && !state.bounce_editor {
                state.url = EDITOR_URL.to_string();
                state.surface = Surface::Editor;
            } else {
                state.url = format!("{LOGIN_URL}?redirectPath=%2Fnotes%2Fnew");
                state.surface = Surface::Login;
            }
        } else {
            state.url = url.to_string();
            state.surface = Surface::Home;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state().url.clone())
    }

    async fn query_css(&self, selector: &str) -> Result<Vec<FakeElement>, DriverError> {
        let state = self.state();
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                state.on_surface(node)
                    && !node.shadow
                    && node.selectors.iter().any(|s| *s == selector)
            })
            .map(|(index, _)| FakeElement(index))
            .collect())
    }

    async fn query_text(
        &self,
        tag: &str,
        text: &str,
        exact: bool,
    ) -> Result<Vec<FakeElement>, DriverError> {
        let state = self.state();
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                let shown = node.text.trim();
                state.on_surface(node)
                    && !node.shadow
                    && (tag == "*" || node.tag == tag)
                    && !shown.is_empty()
                    && if exact { shown == text } else { shown.contains(text) }
            })
            .map(|(index, _)| FakeElement(index))
            .collect())
    }

    async fn script_query(&self, text: &str) -> Result<Vec<Point>, DriverError> {
        let state = self.state();
        Ok(state
            .nodes
            .iter()
            .filter(|node| {
                state.on_surface(node)
                    && !node.hidden
                    && node.tag == "button"
                    && node.text.trim() == text
            })
            .map(|node| state.viewport_rect(node).center())
            .collect())
    }

    async fn locate_text(&self, text: &str, exact: bool) -> Result<Option<Rect>, DriverError> {
        let state = self.state();
        if state.text_search_fails {
            return Err(DriverError::Browser("evaluate failed".to_string()));
        }
        if !matches!(state.surface, Surface::Editor | Surface::PaidArea) {
            return Ok(None);
        }
        for (index, line) in state.body.lines().enumerate() {
            let shown = line.trim();
            let matched = if exact { shown == text } else { shown.contains(text) };
            if !matched {
                continue;
            }
            let y = state.body_top + index as f64 * state.line_height - state.scroll_y;
            if (0.0..VIEWPORT_HEIGHT).contains(&y) {
                return Ok(Some(Rect::new(100.0, y, 600.0, state.line_height)));
            }
        }
        Ok(None)
    }

    async fn bounding_box(&self, element: &FakeElement) -> Result<Option<Rect>, DriverError> {
        let state = self.state();
        Ok(state.nodes.get(element.0).map(|node| state.viewport_rect(node)))
    }

    async fn is_interactable(&self, element: &FakeElement) -> Result<bool, DriverError> {
        Ok(self.state().interactable(element.0))
    }

    async fn input_value(&self, element: &FakeElement) -> Result<Option<String>, DriverError> {
        let state = self.state();
        if state.value_read_fails {
            return Err(DriverError::Browser("value read failed".to_string()));
        }
        Ok(state.nodes.get(element.0).and_then(|node| node.value.clone()))
    }

    async fn click(&self, element: &FakeElement) -> Result<(), DriverError> {
        self.state().press(element.0)
    }

    async fn click_at(&self, point: Point) -> Result<(), DriverError> {
        let mut state = self.state();
        let hit = state.nodes.iter().position(|node| {
            state.on_surface(node) && !node.hidden && state.viewport_rect(node).contains(point)
        });
        match hit {
            Some(index) => state.press(index),
            None => Err(DriverError::Browser(format!("nothing at {point:?}"))),
        }
    }

    async fn clear(&self, element: &FakeElement) -> Result<(), DriverError> {
        let mut state = self.state();
        if state.nodes[element.0].name == "body" {
            state.body.clear();
        } else if let Some(value) = state.nodes[element.0].value.as_mut() {
            value.clear();
        }
        Ok(())
    }

    async fn type_text(
        &self,
        element: &FakeElement,
        text: &str,
        _per_char_delay: Duration,
    ) -> Result<(), DriverError> {
        let mut state = self.state();
        let name = state.nodes[element.0].name;
        state.events.push(format!("type:{name}"));
        if name == "body" {
            state.body.push_str(text);
        } else {
            let node = &mut state.nodes[element.0];
            node.value.get_or_insert_with(String::new).push_str(text);
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.events.push(format!("key:{key}"));
        if key != "Enter" {
            return Ok(());
        }
        let Some(index) = state.focused else {
            return Ok(());
        };
        if state.nodes[index].name == "tag_input" {
            let typed = state.nodes[index].value.take().unwrap_or_default();
            state.nodes[index].value = Some(String::new());
            if !typed.is_empty() {
                state.confirmed_tags.push(typed);
            }
        }
        Ok(())
    }

    async fn attach_file(&self, path: &Path) -> Result<(), DriverError> {
        let mut state = self.state();
        state.events.push("attach".to_string());
        state.attached.push(path.to_path_buf());
        if state.confirms_upload {
            state.set_hidden("crop_confirm", false);
        }
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<(), DriverError> {
        self.state().scroll_y += dy;
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<(), DriverError> {
        self.state().scroll_y = 0.0;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        if self.state().screenshot_fails {
            return Err(DriverError::Browser("capture failed".to_string()));
        }
        std::fs::write(path, b"png").map_err(|e| DriverError::Browser(e.to_string()))
    }
}

/// Hands out pages over one shared site so tests can inspect it afterwards.
pub struct FakeLauncher {
    page: FakePage,
}

impl FakeLauncher {
    pub fn new(state: State) -> Self {
        Self {
            page: FakePage::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.page.state()
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for FakeLauncher {
    type Page = FakePage;

    async fn launch(&self) -> Result<FakePage, DriverError> {
        {
            let mut state = self.page.state();
            if state.fail_launch {
                return Err(DriverError::Browser("chrome not found".to_string()));
            }
            state.launches += 1;
            state.logged_in = false;
            state.url = "about:blank".to_string();
            state.surface = Surface::Blank;
            state.body.clear();
            state.focused = None;
            state.scroll_y = 0.0;
        }
        Ok(self.page.clone())
    }

    async fn close(&self, page: FakePage) -> Result<(), DriverError> {
        page.state().closes += 1;
        Ok(())
    }
}
