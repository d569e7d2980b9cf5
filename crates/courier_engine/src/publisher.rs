use std::sync::Arc;
use std::time::Duration;

use courier_core::{
    choose_split_control, pick_price_field, plan_for, sanitize, Article, FailureKind,
    FallbackReason, Intent, PublishRun, SplitChoice, Stage, StageFailure, StageReport, Transition,
};
use courier_logging::{courier_debug, courier_error, courier_info, courier_warn};

use crate::resolver::{click_handle, handle_top};
use crate::{
    is_login_surface, Credentials, DiagnosticsSink, DriverError, ElementResolver, Handle,
    PageDriver, PublishSettings, SessionAuthenticator,
};

type StageResult = Result<StageReport, StageFailure>;

fn driver_failure(err: DriverError) -> StageFailure {
    StageFailure::new(FailureKind::Driver, err.to_string())
}

/// Drives one article through the editor, stage by stage.
///
/// Each stage either completes, is skipped with a soft failure, or aborts
/// the attempt; the bookkeeping lives in [`PublishRun`].
pub struct PublishStateMachine {
    resolver: Arc<ElementResolver>,
    settings: PublishSettings,
}

impl PublishStateMachine {
    pub fn new(resolver: Arc<ElementResolver>, settings: PublishSettings) -> Self {
        Self { resolver, settings }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    pub async fn run<P: PageDriver>(
        &self,
        page: &P,
        article: &Article,
        auth: &mut SessionAuthenticator,
        credentials: &Credentials,
        diagnostics: &mut DiagnosticsSink,
    ) -> PublishRun {
        let mut run = PublishRun::new(plan_for(article));
        let body = sanitize(article.body());

        if article.is_priced() {
            let scan = self.settings.marker.scan(&body);
            match scan.first_line {
                None => courier_warn!("priced article has no publish marker; first split point will be used"),
                Some(line) if scan.occurrences > 1 => courier_warn!(
                    "publish marker appears {} times; using line {}",
                    scan.occurrences,
                    line + 1
                ),
                Some(line) => courier_debug!("publish marker on line {}", line + 1),
            }
        }

        while let Some(stage) = run.current() {
            courier_info!("stage {stage}");
            let result = match stage {
                Stage::Authenticated => auth
                    .authenticate(page, credentials)
                    .await
                    .map(|_| StageReport::done())
                    .map_err(|err| {
                        StageFailure::new(FailureKind::AuthenticationFailure, err.to_string())
                    }),
                Stage::Navigated => self.navigate(page, diagnostics).await,
                Stage::TitleSet => self.set_title(page, article.title()).await,
                Stage::BodyTyped => self.type_body(page, &body).await,
                Stage::ImageAttached => self.attach_image(page, article).await,
                Stage::AdvancedToPublishSettings => {
                    self.click_required(page, Intent::PublishSettingsButton).await
                }
                Stage::TagsSet => self.set_tags(page, article.tags()).await,
                Stage::MonetizationSet => self.set_monetization(page, article.price()).await,
                Stage::SplitPointPlaced => self.place_split_point(page, diagnostics).await,
                Stage::Submitted => self.submit(page, article.is_priced()).await,
            };

            let soft = result.as_ref().err().cloned();
            match run.record(stage, result) {
                Transition::Aborted(stage) => {
                    if let Some(failure) = run.fatal() {
                        courier_error!("aborted in {stage}: {failure}");
                    }
                    diagnostics
                        .capture(page, &format!("abort-{}", stage.label()))
                        .await;
                    break;
                }
                Transition::Continue(_) | Transition::Completed => {
                    if let Some(failure) = soft {
                        courier_warn!("{stage} skipped: {failure}");
                        diagnostics
                            .capture(page, &format!("skipped-{}", stage.label()))
                            .await;
                    }
                }
                Transition::OutOfOrder { expected, got } => {
                    courier_error!("stage {got} recorded while expecting {expected:?}");
                    break;
                }
            }
        }

        if run.current().is_none() && run.aborted_at().is_none() {
            courier_info!("published after {} stages", run.history().len());
        }
        run
    }

    async fn navigate<P: PageDriver>(
        &self,
        page: &P,
        diagnostics: &mut DiagnosticsSink,
    ) -> StageResult {
        diagnostics.capture(page, "navigated").await;
        page.goto(&self.settings.editor_url)
            .await
            .map_err(|err| StageFailure::new(FailureKind::Navigation, err.to_string()))?;
        self.settle().await;

        let url = page.current_url().await.map_err(driver_failure)?;
        if is_login_surface(&url, &self.settings.login_url) {
            return Err(StageFailure::new(
                FailureKind::Navigation,
                format!("editor redirected to login ({url})"),
            ));
        }
        Ok(StageReport::done())
    }

    async fn set_title<P: PageDriver>(&self, page: &P, title: &str) -> StageResult {
        let field = self.required_element(page, Intent::TitleField).await?;
        page.click(&field).await.map_err(driver_failure)?;
        page.clear(&field).await.map_err(driver_failure)?;
        page.type_text(&field, title, Duration::ZERO)
            .await
            .map_err(driver_failure)?;
        Ok(StageReport::done())
    }

    async fn type_body<P: PageDriver>(&self, page: &P, body: &str) -> StageResult {
        let editor = self.required_element(page, Intent::BodyEditor).await?;
        page.click(&editor).await.map_err(driver_failure)?;
        courier_debug!("typing {} characters", body.chars().count());
        page.type_text(&editor, body, self.settings.typing_delay)
            .await
            .map_err(driver_failure)?;
        Ok(StageReport::done())
    }

    async fn attach_image<P: PageDriver>(&self, page: &P, article: &Article) -> StageResult {
        let Some(path) = article.image() else {
            return Ok(StageReport::done());
        };

        let affordance = self
            .resolver
            .resolve(page, Intent::ImageAffordance)
            .await
            .map_err(|nf| {
                StageFailure::new(
                    FailureKind::OptionalControlNotFound { intent: nf.intent },
                    nf.to_string(),
                )
            })?;

        let attempt = async {
            click_handle(page, &affordance).await.map_err(driver_failure)?;
            let menu_item = self.optional(page, Intent::ImageUploadMenuItem).await?;
            click_handle(page, &menu_item).await.map_err(driver_failure)?;
            page.attach_file(path).await.map_err(driver_failure)?;

            let confirm = self
                .resolver
                .resolve_within(
                    page,
                    Intent::CropConfirm,
                    self.settings.overlay_timeout,
                    self.settings.poll_interval,
                )
                .await
                .map_err(|_| {
                    StageFailure::new(
                        FailureKind::UploadNotConfirmed,
                        format!("no confirmation within {:?}", self.settings.overlay_timeout),
                    )
                })?;
            click_handle(page, &confirm).await.map_err(driver_failure)?;
            self.settle().await;
            Ok::<_, StageFailure>(StageReport::done())
        };

        let result = attempt.await;
        if result.is_err() {
            self.close_overlay(page).await;
        }
        result
    }

    async fn close_overlay<P: PageDriver>(&self, page: &P) {
        if let Err(err) = page.press_key("Escape").await {
            courier_debug!("escape failed: {err}");
        }
        if let Ok(close) = self.resolver.resolve(page, Intent::OverlayClose).await {
            if let Err(err) = click_handle(page, &close).await {
                courier_debug!("overlay close failed: {err}");
            }
        }
        self.settle().await;
    }

    async fn set_tags<P: PageDriver>(&self, page: &P, tags: &[String]) -> StageResult {
        for tag in tags {
            // The input is re-rendered after every committed tag.
            let input = self
                .optional(page, Intent::TagInput)
                .await?
                .into_element()
                .ok_or_else(|| {
                    StageFailure::new(
                        FailureKind::OptionalControlNotFound {
                            intent: Intent::TagInput,
                        },
                        "tag input is not typeable",
                    )
                })?;
            page.click(&input).await.map_err(driver_failure)?;
            page.clear(&input).await.map_err(driver_failure)?;
            page.type_text(&input, tag, Duration::ZERO)
                .await
                .map_err(driver_failure)?;
            page.press_key("Enter").await.map_err(driver_failure)?;
            courier_debug!("tag '{tag}' committed");
            tokio::time::sleep(self.settings.tag_pacing).await;
        }
        Ok(StageReport::done())
    }

    /// Only the paid toggle is required; anything after it degrades to a
    /// note on the completed stage.
    async fn set_monetization<P: PageDriver>(&self, page: &P, price: u32) -> StageResult {
        self.click_required(page, Intent::PaidToggle).await?;

        match self.set_price(page, price).await {
            Ok(report) => Ok(report),
            Err(failure) => {
                courier_warn!("price not set: {failure}");
                Ok(StageReport::done().with_note(StageFailure::new(
                    FailureKind::OptionalControlNotFound {
                        intent: Intent::PriceField,
                    },
                    failure.detail,
                )))
            }
        }
    }

    async fn set_price<P: PageDriver>(&self, page: &P, price: u32) -> StageResult {
        let candidates = self
            .resolver
            .resolve_all(page, Intent::PriceField)
            .await
            .unwrap_or_default();
        let mut values = Vec::with_capacity(candidates.len());
        for handle in &candidates {
            let value = match handle.element() {
                Some(element) => page.input_value(element).await.map_err(driver_failure)?,
                None => None,
            };
            values.push(value);
        }

        let Some(index) = pick_price_field(&values, self.settings.minimum_price_value) else {
            return Ok(StageReport::done().with_note(StageFailure::new(
                FailureKind::OptionalControlNotFound {
                    intent: Intent::PriceField,
                },
                format!("no numeric input >= {}", self.settings.minimum_price_value),
            )));
        };
        let Some(field) = candidates[index].element() else {
            return Ok(StageReport::done());
        };

        page.click(field).await.map_err(driver_failure)?;
        page.clear(field).await.map_err(driver_failure)?;
        page.type_text(field, &price.to_string(), Duration::ZERO)
            .await
            .map_err(driver_failure)?;
        courier_info!("price set to {price}");
        Ok(StageReport::done())
    }

    async fn place_split_point<P: PageDriver>(
        &self,
        page: &P,
        diagnostics: &mut DiagnosticsSink,
    ) -> StageResult {
        self.click_required(page, Intent::PaidAreaButton).await?;
        if let Err(err) = page.scroll_to_top().await {
            courier_debug!("scroll to top failed: {err}");
        }

        if self
            .resolver
            .resolve_within(
                page,
                Intent::SplitPointControl,
                self.settings.element_timeout,
                self.settings.poll_interval,
            )
            .await
            .is_err()
        {
            return Ok(StageReport::done().with_note(StageFailure::new(
                FailureKind::OptionalControlNotFound {
                    intent: Intent::SplitPointControl,
                },
                "paid area shows no split point controls",
            )));
        }

        let marker_top = self.find_marker(page).await;
        let controls = self
            .resolver
            .resolve_all(page, Intent::SplitPointControl)
            .await
            .unwrap_or_default();
        let mut tops = Vec::with_capacity(controls.len());
        for control in &controls {
            tops.push(handle_top(page, control).await.unwrap_or(f64::INFINITY));
        }

        let Some(choice) = choose_split_control(&tops, marker_top) else {
            return Ok(StageReport::done().with_note(StageFailure::new(
                FailureKind::OptionalControlNotFound {
                    intent: Intent::SplitPointControl,
                },
                "split point controls vanished",
            )));
        };

        click_handle(page, &controls[choice.index()])
            .await
            .map_err(driver_failure)?;
        self.settle().await;

        let report = StageReport::done();
        match choice {
            SplitChoice::NearestAbove { index, distance } => {
                courier_info!("split point {index} placed {distance:.0}px above marker");
                Ok(report)
            }
            SplitChoice::Fallback { index, reason } => {
                let (kind, detail) = match reason {
                    FallbackReason::MarkerNotFound => (
                        FailureKind::MarkerNotFound,
                        format!("marker not visible; used split point {index}"),
                    ),
                    FallbackReason::NoControlAboveMarker => (
                        FailureKind::OptionalControlNotFound {
                            intent: Intent::SplitPointControl,
                        },
                        format!("no split point above marker; used split point {index}"),
                    ),
                };
                diagnostics.note("split-fallback", &detail);
                diagnostics.capture(page, "split-fallback").await;
                Ok(report.with_note(StageFailure::new(kind, detail)))
            }
        }
    }

    /// Scrolls down from the top looking for the sentinel, then the looser
    /// phrases. Returns the marker's vertical position. A driver error ends
    /// the search as if the marker were absent.
    async fn find_marker<P: PageDriver>(&self, page: &P) -> Option<f64> {
        match self.search_marker(page).await {
            Ok(top) => top,
            Err(err) => {
                courier_warn!("marker search failed: {err}");
                None
            }
        }
    }

    async fn search_marker<P: PageDriver>(&self, page: &P) -> Result<Option<f64>, DriverError> {
        let marker = &self.settings.marker;
        for attempt in 0..=self.settings.marker_scroll_attempts {
            if attempt > 0 {
                page.scroll_by(self.settings.marker_scroll_step).await?;
            }
            for phrase in marker.search_phrases() {
                let exact = phrase == marker.sentinel;
                if let Some(rect) = page.locate_text(phrase, exact).await? {
                    courier_debug!("marker '{phrase}' found after {attempt} scrolls");
                    return Ok(Some(rect.y));
                }
            }
        }
        Ok(None)
    }

    async fn submit<P: PageDriver>(&self, page: &P, priced: bool) -> StageResult {
        let intent = if priced {
            Intent::PaidSubmitButton
        } else {
            Intent::SubmitButton
        };
        self.click_required(page, intent).await?;
        tokio::time::sleep(self.settings.submit_settle).await;
        Ok(StageReport::done())
    }

    async fn click_required<P: PageDriver>(&self, page: &P, intent: Intent) -> StageResult {
        let handle = self.required(page, intent).await?;
        click_handle(page, &handle).await.map_err(driver_failure)?;
        self.settle().await;
        Ok(StageReport::done())
    }

    async fn required<P: PageDriver>(
        &self,
        page: &P,
        intent: Intent,
    ) -> Result<Handle<P::Element>, StageFailure> {
        self.resolver
            .resolve_within(
                page,
                intent,
                self.settings.element_timeout,
                self.settings.poll_interval,
            )
            .await
            .map_err(|nf| {
                StageFailure::new(FailureKind::RequiredControlNotFound { intent }, nf.to_string())
            })
    }

    async fn required_element<P: PageDriver>(
        &self,
        page: &P,
        intent: Intent,
    ) -> Result<P::Element, StageFailure> {
        self.required(page, intent).await?.into_element().ok_or_else(|| {
            StageFailure::new(
                FailureKind::RequiredControlNotFound { intent },
                "only a coordinate was found; text cannot be typed into it",
            )
        })
    }

    async fn optional<P: PageDriver>(
        &self,
        page: &P,
        intent: Intent,
    ) -> Result<Handle<P::Element>, StageFailure> {
        self.resolver
            .resolve_within(
                page,
                intent,
                self.settings.element_timeout,
                self.settings.poll_interval,
            )
            .await
            .map_err(|nf| {
                StageFailure::new(FailureKind::OptionalControlNotFound { intent }, nf.to_string())
            })
    }

    async fn settle(&self) {
        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }
    }
}
