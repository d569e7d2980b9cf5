use std::fmt;

use crate::Article;

/// One named step of a publish attempt, in strict forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Authenticated,
    Navigated,
    TitleSet,
    BodyTyped,
    ImageAttached,
    AdvancedToPublishSettings,
    TagsSet,
    MonetizationSet,
    SplitPointPlaced,
    Submitted,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::Authenticated,
        Stage::Navigated,
        Stage::TitleSet,
        Stage::BodyTyped,
        Stage::ImageAttached,
        Stage::AdvancedToPublishSettings,
        Stage::TagsSet,
        Stage::MonetizationSet,
        Stage::SplitPointPlaced,
        Stage::Submitted,
    ];

    /// Optional stages may be skipped without failing the attempt.
    pub fn is_optional(self) -> bool {
        matches!(self, Stage::ImageAttached | Stage::TagsSet)
    }

    /// Short snake-case label, used in diagnostics file names.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Authenticated => "authenticated",
            Stage::Navigated => "navigated",
            Stage::TitleSet => "title_set",
            Stage::BodyTyped => "body_typed",
            Stage::ImageAttached => "image_attached",
            Stage::AdvancedToPublishSettings => "advanced_to_publish_settings",
            Stage::TagsSet => "tags_set",
            Stage::MonetizationSet => "monetization_set",
            Stage::SplitPointPlaced => "split_point_placed",
            Stage::Submitted => "submitted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stages an article will go through. Conditional stages only appear when
/// the article needs them: an image for `ImageAttached`, tags for `TagsSet`,
/// a price for `MonetizationSet` and `SplitPointPlaced`.
pub fn plan_for(article: &Article) -> Vec<Stage> {
    Stage::ALL
        .into_iter()
        .filter(|stage| match stage {
            Stage::ImageAttached => article.image().is_some(),
            Stage::TagsSet => !article.tags().is_empty(),
            Stage::MonetizationSet | Stage::SplitPointPlaced => article.is_priced(),
            _ => true,
        })
        .collect()
}
