use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A control the publisher needs, named by what it is for rather than how it
/// is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    EmailField,
    PasswordField,
    LoginButton,
    TitleField,
    BodyEditor,
    ImageAffordance,
    ImageUploadMenuItem,
    CropConfirm,
    OverlayClose,
    PublishSettingsButton,
    TagInput,
    PaidToggle,
    PriceField,
    PaidAreaButton,
    SplitPointControl,
    PaidSubmitButton,
    SubmitButton,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::EmailField => "email field",
            Intent::PasswordField => "password field",
            Intent::LoginButton => "login button",
            Intent::TitleField => "title field",
            Intent::BodyEditor => "body editor",
            Intent::ImageAffordance => "cover image affordance",
            Intent::ImageUploadMenuItem => "image upload menu item",
            Intent::CropConfirm => "crop confirm button",
            Intent::OverlayClose => "overlay close button",
            Intent::PublishSettingsButton => "publish settings button",
            Intent::TagInput => "tag input",
            Intent::PaidToggle => "paid toggle",
            Intent::PriceField => "price field",
            Intent::PaidAreaButton => "paid area button",
            Intent::SplitPointControl => "split point control",
            Intent::PaidSubmitButton => "paid submit button",
            Intent::SubmitButton => "submit button",
        };
        f.write_str(name)
    }
}

/// One way of locating a control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    /// CSS selector keyed on attributes (id, placeholder, data-*, aria-*).
    AttributeMatch { selector: String },
    /// Element of `tag` (`*` for any) whose visible text equals or contains `text`.
    TextMatch {
        tag: String,
        text: String,
        #[serde(default)]
        exact: bool,
    },
    /// Generic selector; the visible match at `index` in document order.
    StructuralFallback {
        selector: String,
        #[serde(default)]
        index: usize,
    },
    /// Candidates whose top edge is less than `max_offset` pixels from the anchor's.
    SpatialProximity {
        anchor: Intent,
        candidates: String,
        max_offset: f64,
    },
    /// In-page traversal through shadow and portal roots for a button with
    /// exactly this text. Yields coordinates, not element handles.
    ScriptQuery { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    AttributeMatch,
    TextMatch,
    StructuralFallback,
    SpatialProximity,
    ScriptQuery,
}

impl ResolutionStrategy {
    pub fn attribute(selector: impl Into<String>) -> Self {
        ResolutionStrategy::AttributeMatch {
            selector: selector.into(),
        }
    }

    pub fn text(tag: impl Into<String>, text: impl Into<String>, exact: bool) -> Self {
        ResolutionStrategy::TextMatch {
            tag: tag.into(),
            text: text.into(),
            exact,
        }
    }

    pub fn structural(selector: impl Into<String>, index: usize) -> Self {
        ResolutionStrategy::StructuralFallback {
            selector: selector.into(),
            index,
        }
    }

    pub fn spatial(anchor: Intent, candidates: impl Into<String>, max_offset: f64) -> Self {
        ResolutionStrategy::SpatialProximity {
            anchor,
            candidates: candidates.into(),
            max_offset,
        }
    }

    pub fn script(text: impl Into<String>) -> Self {
        ResolutionStrategy::ScriptQuery { text: text.into() }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            ResolutionStrategy::AttributeMatch { .. } => StrategyKind::AttributeMatch,
            ResolutionStrategy::TextMatch { .. } => StrategyKind::TextMatch,
            ResolutionStrategy::StructuralFallback { .. } => StrategyKind::StructuralFallback,
            ResolutionStrategy::SpatialProximity { .. } => StrategyKind::SpatialProximity,
            ResolutionStrategy::ScriptQuery { .. } => StrategyKind::ScriptQuery,
        }
    }
}

/// Ordered strategies per intent. Loaded once and handed to the resolver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyBook {
    entries: BTreeMap<Intent, Vec<ResolutionStrategy>>,
}

impl StrategyBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, intent: Intent) -> &[ResolutionStrategy] {
        self.entries.get(&intent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, intent: Intent, strategies: Vec<ResolutionStrategy>) {
        self.entries.insert(intent, strategies);
    }

    pub fn with(mut self, intent: Intent, strategies: Vec<ResolutionStrategy>) -> Self {
        self.set(intent, strategies);
        self
    }

    /// Replaces the list of every intent present in `overrides`.
    pub fn with_overrides(mut self, overrides: BTreeMap<Intent, Vec<ResolutionStrategy>>) -> Self {
        for (intent, strategies) in overrides {
            self.set(intent, strategies);
        }
        self
    }

    pub fn intents(&self) -> impl Iterator<Item = Intent> + '_ {
        self.entries.keys().copied()
    }

    /// Strategies for the note.com editor as observed in its current markup.
    pub fn note_defaults() -> Self {
        use ResolutionStrategy as S;

        Self::new()
            .with(
                Intent::EmailField,
                vec![
                    S::attribute("input#email"),
                    S::attribute("input[type=\"email\"]"),
                    S::structural("input", 0),
                ],
            )
            .with(
                Intent::PasswordField,
                vec![
                    S::attribute("input#password"),
                    S::attribute("input[type=\"password\"]"),
                ],
            )
            .with(
                Intent::LoginButton,
                vec![
                    S::text("button", "ログイン", true),
                    S::attribute("button[type=\"submit\"]"),
                    S::script("ログイン"),
                ],
            )
            .with(
                Intent::TitleField,
                vec![
                    S::attribute("textarea[placeholder=\"記事タイトル\"]"),
                    S::attribute("textarea[placeholder*=\"タイトル\"]"),
                    S::attribute("textarea.title"),
                    S::attribute("[data-testid=\"title-input\"]"),
                    S::structural("textarea", 0),
                ],
            )
            .with(
                Intent::BodyEditor,
                vec![
                    S::attribute(".ProseMirror"),
                    S::attribute("[contenteditable=\"true\"]"),
                    S::structural("[contenteditable]", 0),
                ],
            )
            .with(
                Intent::ImageAffordance,
                vec![
                    S::attribute("button[aria-label*=\"画像\"]"),
                    S::attribute("[class*=\"eyecatch\"] button"),
                    S::spatial(Intent::TitleField, "button:has(svg)", 120.0),
                ],
            )
            .with(
                Intent::ImageUploadMenuItem,
                vec![
                    S::text("button", "画像をアップロード", false),
                    S::attribute("[role=\"menuitem\"]"),
                    S::script("画像をアップロード"),
                ],
            )
            .with(
                Intent::CropConfirm,
                vec![
                    S::text("button", "保存", true),
                    S::text("button", "適用", true),
                    S::script("保存"),
                ],
            )
            .with(
                Intent::OverlayClose,
                vec![
                    S::attribute("[aria-label=\"閉じる\"]"),
                    S::text("button", "キャンセル", true),
                    S::script("キャンセル"),
                ],
            )
            .with(
                Intent::PublishSettingsButton,
                vec![S::text("button", "公開に進む", false), S::script("公開に進む")],
            )
            .with(
                Intent::TagInput,
                vec![
                    S::attribute("input[placeholder=\"ハッシュタグを追加する\"]"),
                    S::attribute("input[placeholder*=\"ハッシュタグ\"]"),
                ],
            )
            .with(
                Intent::PaidToggle,
                vec![
                    S::attribute("label[for=\"paid\"]"),
                    S::text("*", "有料", true),
                    S::attribute("input#paid"),
                ],
            )
            .with(Intent::PriceField, vec![S::attribute("input")])
            .with(
                Intent::PaidAreaButton,
                vec![
                    S::text("button", "有料エリア設定", false),
                    S::script("有料エリア設定"),
                ],
            )
            .with(
                Intent::SplitPointControl,
                vec![
                    S::text("button", "ラインをこの場所に変更", false),
                    S::text("button", "この場所に変更", false),
                    S::text("button", "ここに設定", false),
                    S::attribute("[class*=\"line\"] button"),
                ],
            )
            .with(
                Intent::PaidSubmitButton,
                vec![S::text("button", "投稿する", false), S::script("投稿する")],
            )
            .with(
                Intent::SubmitButton,
                vec![S::text("button", "投稿する", false), S::script("投稿する")],
            )
    }
}
