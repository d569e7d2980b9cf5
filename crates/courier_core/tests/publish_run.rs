use std::sync::Once;

use courier_core::{
    plan_for, Article, FailureKind, Intent, PublishOutcome, PublishRun, RunStatus, Stage,
    StageFailure, StageReport, StageStatus, Transition,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(courier_logging::initialize_for_tests);
}

fn complete_all(run: &mut PublishRun) -> Transition {
    let mut last = Transition::Completed;
    while let Some(stage) = run.current() {
        last = run.record(stage, Ok(StageReport::done()));
    }
    last
}

#[test]
fn free_article_plan_skips_monetization() {
    init_logging();
    let article = Article::new("T", "body");
    assert_eq!(
        plan_for(&article),
        vec![
            Stage::Authenticated,
            Stage::Navigated,
            Stage::TitleSet,
            Stage::BodyTyped,
            Stage::AdvancedToPublishSettings,
            Stage::Submitted,
        ]
    );
}

#[test]
fn priced_article_with_extras_plans_every_stage() {
    let article = Article::new("T", "body")
        .with_tags(["a", " ", "b"])
        .with_price(300)
        .with_image("cover.png");
    assert_eq!(plan_for(&article), Stage::ALL.to_vec());
    assert_eq!(article.tags(), ["a".to_string(), "b".to_string()]);
}

#[test]
fn clean_run_completes_and_reaches_submitted() {
    let mut run = PublishRun::new(plan_for(&Article::new("T", "b").with_price(100)));
    assert_eq!(complete_all(&mut run), Transition::Completed);
    assert_eq!(run.status(), RunStatus::Succeeded);
    assert_eq!(run.stage_reached(), Some(Stage::Submitted));
    assert!(run.entered(Stage::SplitPointPlaced));

    let outcome = PublishOutcome::from_run(&run, Vec::new(), None);
    assert!(outcome.succeeded);
    assert_eq!(outcome.aborted_at, None);
    assert_eq!(outcome.error_detail, None);
}

#[test]
fn required_control_missing_aborts_with_stage() {
    let mut run = PublishRun::new(plan_for(&Article::new("T", "b")));
    run.record(Stage::Authenticated, Ok(StageReport::done()));
    run.record(Stage::Navigated, Ok(StageReport::done()));
    let transition = run.record(
        Stage::TitleSet,
        Err(StageFailure::new(
            FailureKind::RequiredControlNotFound {
                intent: Intent::TitleField,
            },
            "no strategy matched",
        )),
    );

    assert_eq!(transition, Transition::Aborted(Stage::TitleSet));
    assert_eq!(run.current(), None);
    assert_eq!(run.stage_reached(), Some(Stage::Navigated));

    let outcome = PublishOutcome::from_run(&run, Vec::new(), None);
    assert!(!outcome.succeeded);
    assert_eq!(outcome.aborted_at, Some(Stage::TitleSet));
    assert_eq!(
        outcome.error_detail.as_deref(),
        Some("required control not found: title field: no strategy matched")
    );
}

#[test]
fn soft_failure_skips_the_stage_and_continues() {
    let article = Article::new("T", "b").with_image("cover.png");
    let mut run = PublishRun::new(plan_for(&article));
    for stage in [Stage::Authenticated, Stage::Navigated, Stage::TitleSet, Stage::BodyTyped] {
        run.record(stage, Ok(StageReport::done()));
    }
    let transition = run.record(
        Stage::ImageAttached,
        Err(StageFailure::new(FailureKind::UploadNotConfirmed, "")),
    );
    assert_eq!(transition, Transition::Continue(Stage::AdvancedToPublishSettings));
    assert_eq!(complete_all(&mut run), Transition::Completed);

    assert_eq!(run.soft_failures().len(), 1);
    assert_eq!(run.soft_failures()[0].stage, Stage::ImageAttached);
    let image = run
        .history()
        .iter()
        .find(|record| record.stage == Stage::ImageAttached)
        .map(|record| record.status);
    assert_eq!(image, Some(StageStatus::Skipped));
}

#[test]
fn driver_error_is_soft_only_in_optional_stages() {
    assert!(!FailureKind::Driver.is_fatal_in(Stage::TagsSet));
    assert!(!FailureKind::Driver.is_fatal_in(Stage::ImageAttached));
    assert!(FailureKind::Driver.is_fatal_in(Stage::BodyTyped));
    assert!(FailureKind::Navigation.is_fatal_in(Stage::Navigated));
    assert!(!FailureKind::MarkerNotFound.is_fatal_in(Stage::SplitPointPlaced));
}

#[test]
fn notes_on_completed_stage_are_soft_failures() {
    let mut run = PublishRun::new(vec![Stage::MonetizationSet]);
    let report = StageReport::done().with_note(StageFailure::new(
        FailureKind::OptionalControlNotFound {
            intent: Intent::PaidToggle,
        },
        "price field",
    ));
    assert_eq!(run.record(Stage::MonetizationSet, Ok(report)), Transition::Completed);
    assert_eq!(run.stage_reached(), Some(Stage::MonetizationSet));
    assert_eq!(run.soft_failures().len(), 1);
}

#[test]
fn stages_cannot_be_recorded_out_of_order() {
    let mut run = PublishRun::new(plan_for(&Article::new("T", "b")));
    assert_eq!(
        run.record(Stage::TitleSet, Ok(StageReport::done())),
        Transition::OutOfOrder {
            expected: Some(Stage::Authenticated),
            got: Stage::TitleSet
        }
    );
    run.record(
        Stage::Authenticated,
        Err(StageFailure::new(FailureKind::AuthenticationFailure, "bad")),
    );
    assert!(run.is_finished());
    assert!(matches!(
        run.record(Stage::Navigated, Ok(StageReport::done())),
        Transition::OutOfOrder { expected: None, .. }
    ));
    assert_eq!(run.stage_reached(), None);
}
