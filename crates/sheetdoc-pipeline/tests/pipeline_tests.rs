//! Orchestrator tests over in-memory workbooks and scripted providers

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use sheetdoc_core::{FieldType, Level, ParagraphTask, SheetTask, TaskConfig, TaskTable};
use sheetdoc_pipeline::{Pipeline, RunReport, RunState};
use sheetdoc_test_utils::{
    fields, providers_with, Call, FailingRenderer, Fixture, InMemoryWorkbook, RecordingRenderer,
    ScriptedCompletion,
};
use std::sync::Arc;

const EXTRACT_PROMPT: &str = "prompts/extract.hbs";
const SUMMARY_PROMPT: &str = "prompts/summary.hbs";

fn fixture() -> Fixture {
    let fx = Fixture::new();
    fx.write_config(
        EXTRACT_PROMPT,
        "Extract {{#each keys}}{{this}} {{/each}}from:\n{{table}}",
    );
    fx.write_config(SUMMARY_PROMPT, "Rate={{data.Safety.Rate}}");
    fx
}

fn safety_workbook() -> InMemoryWorkbook {
    InMemoryWorkbook::new()
        .with_sheet("Safety", &["Metric", "Value"], &[&["Rate", "50%"]])
}

fn safety_task() -> SheetTask {
    SheetTask::new(EXTRACT_PROMPT, fields(&[("Rate", FieldType::Number)]))
}

fn tasks(sheets: Vec<(&str, SheetTask)>, paragraphs: Vec<(&str, ParagraphTask)>) -> TaskConfig {
    let mut sheet_table = TaskTable::new();
    for (name, task) in sheets {
        sheet_table.insert(name, task);
    }
    let mut paragraph_table = TaskTable::new();
    for (id, task) in paragraphs {
        paragraph_table.insert(id, task);
    }
    TaskConfig::new(sheet_table, paragraph_table)
}

fn at<'a>(report: &'a RunReport, location: &str) -> Vec<&'a str> {
    report
        .diagnostics
        .iter()
        .filter(|d| d.location == location)
        .map(|d| d.msg.as_str())
        .collect()
}

async fn run(
    fx: &Fixture,
    svc: &Arc<ScriptedCompletion>,
    tasks: &TaskConfig,
    workbook: &InMemoryWorkbook,
) -> (RunReport, RecordingRenderer) {
    let renderer = RecordingRenderer::new();
    let report = Pipeline::new(fx.settings())
        .with_providers(providers_with(svc))
        .with_renderer(renderer.clone())
        .run(tasks, workbook)
        .await;
    (report, renderer)
}

#[tokio::test]
async fn test_percent_cell_reaches_render_context() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "50%"}))
        .into_shared();
    let tasks = tasks(
        vec![("Safety", safety_task())],
        vec![("safety_table", ParagraphTask::fill(vec!["Safety.Rate".into()]))],
    );

    let (report, renderer) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    assert_eq!(report.state, RunState::Summarized);
    assert_eq!(report.counts.errors, 0);
    assert_eq!(report.context["Safety"], json!({"Rate": 0.5}));
    assert_eq!(renderer.last_context(), Some(report.context.clone()));
    assert!(report.is_rendered());
    assert_eq!(
        svc.calls(),
        vec![Call::Structured {
            prompt: "Extract Rate from:\nMetric,Value\nRate,50%\n".into(),
            fields: vec!["Rate".into()],
        }]
    );
}

#[tokio::test]
async fn test_diagnostics_artifact_counts_match_items() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "abc"}))
        .into_shared();
    let tasks = tasks(
        vec![("Safety", safety_task()), ("Finance", safety_task())],
        vec![("table", ParagraphTask::fill(vec!["Finance.Revenue".into()]))],
    );

    let (report, _) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    let artifact = fx.read_diagnostics();
    let items = artifact["items"].as_array().unwrap();
    let errors = artifact["counts"]["errors"].as_u64().unwrap();
    let warnings = artifact["counts"]["warnings"].as_u64().unwrap();
    assert_eq!((errors + warnings) as usize, items.len());
    assert_eq!(items.len(), report.diagnostics.len());
    assert!(artifact["generated_at"].is_string());
    assert_eq!(report.diagnostics_path, Some(fx.output_dir().join("diagnostics.json")));
}

#[tokio::test]
async fn test_absent_sheet_warns_once_and_leaves_no_key() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted").into_shared();
    let tasks = tasks(vec![("Finance", safety_task())], vec![]);

    let (report, _) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    assert_eq!(report.counts.warnings, 1);
    assert_eq!(report.counts.errors, 0);
    assert_eq!(at(&report, "SHEET:Finance").len(), 1);
    assert!(!report.context.contains_key("Finance"));
    assert!(report.skipped.is_sheet_skipped("Finance"));
    assert_eq!(svc.structured_calls(), 0);
}

#[tokio::test]
async fn test_unresolved_dependency_skips_generation_and_fill_injects_default() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted").into_shared();
    let tasks = tasks(
        vec![],
        vec![
            (
                "summary",
                ParagraphTask::generate(SUMMARY_PROMPT, vec!["Finance.Revenue".into()]),
            ),
            ("table", ParagraphTask::fill(vec!["Finance.Revenue".into()])),
        ],
    );

    let (report, _) = run(&fx, &svc, &tasks, &InMemoryWorkbook::new()).await;

    assert_eq!(svc.text_calls(), 0);
    assert_eq!(at(&report, "PARA:summary").len(), 1);
    assert!(at(&report, "PARA:summary")[0].contains("Finance.Revenue"));
    assert_eq!(at(&report, "PARA:table").len(), 1);
    assert!(!report.generated.contains_key("summary"));
    assert!(!report.context.contains_key("summary"));
    assert_eq!(report.context["Finance"]["Revenue"], json!("-"));
    assert_eq!(report.counts.errors, 0);
}

#[tokio::test]
async fn test_fill_default_is_visible_to_later_paragraphs() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted")
        .with_text("Revenue unknown")
        .into_shared();
    let tasks = tasks(
        vec![],
        vec![
            ("table", ParagraphTask::fill(vec!["Finance.Revenue".into()])),
            (
                "summary",
                ParagraphTask::generate(SUMMARY_PROMPT, vec!["Finance.Revenue".into()]),
            ),
        ],
    );

    let (report, _) = run(&fx, &svc, &tasks, &InMemoryWorkbook::new()).await;

    assert_eq!(svc.text_calls(), 1);
    assert_eq!(report.generated["summary"], "Revenue unknown");
}

#[tokio::test]
async fn test_generated_text_is_trimmed_and_aliased() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "50%"}))
        .with_text("  Rates are fine.\n")
        .into_shared();
    let tasks = tasks(
        vec![("Safety", safety_task())],
        vec![(
            "summary",
            ParagraphTask::generate(SUMMARY_PROMPT, vec!["Safety.Rate".into()])
                .with_placeholder("SUMMARY_TEXT"),
        )],
    );

    let (report, _) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    assert_eq!(report.generated["summary"], "Rates are fine.");
    assert_eq!(report.context["summary"], json!("Rates are fine."));
    assert_eq!(report.context["SUMMARY_TEXT"], json!("Rates are fine."));
    assert_eq!(
        svc.calls().last(),
        Some(&Call::Text {
            prompt: "Rate=0.5".into()
        })
    );
    assert_eq!(report.counts.errors, 0);
}

#[tokio::test]
async fn test_generated_text_replaces_same_named_sheet() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "50%"}))
        .with_text("narrative")
        .into_shared();
    let tasks = tasks(
        vec![("Safety", safety_task())],
        vec![(
            "Safety",
            ParagraphTask::generate(SUMMARY_PROMPT, vec!["Safety.Rate".into()]),
        )],
    );

    let (report, _) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    assert_eq!(at(&report, "PARAGRAPH:Safety").len(), 1);
    assert_eq!(report.context["Safety"], json!("narrative"));
}

#[tokio::test]
async fn test_coercion_failure_is_degraded_value() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "abc"}))
        .into_shared();
    let tasks = tasks(vec![("Safety", safety_task())], vec![]);

    let (report, _) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    assert_eq!(at(&report, "COERCE:Safety.Rate").len(), 1);
    assert_eq!(report.context["Safety"]["Rate"], json!(null));
    assert_eq!(report.counts.errors, 0);
}

#[tokio::test]
async fn test_fill_over_coerced_null_renders_default() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "abc"}))
        .with_text("Rate recorded")
        .into_shared();
    let tasks = tasks(
        vec![("Safety", safety_task())],
        vec![
            ("safety_table", ParagraphTask::fill(vec!["Safety.Rate".into()])),
            (
                "summary",
                ParagraphTask::generate(SUMMARY_PROMPT, vec!["Safety.Rate".into()]),
            ),
        ],
    );

    let (report, renderer) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    assert_eq!(at(&report, "COERCE:Safety.Rate").len(), 1);
    assert_eq!(at(&report, "PARA:safety_table").len(), 1);
    assert_eq!(report.context["Safety"]["Rate"], json!("-"));
    assert_eq!(
        renderer.last_context().map(|c| c["Safety"]["Rate"].clone()),
        Some(json!("-"))
    );
    assert_eq!(
        svc.calls().last(),
        Some(&Call::Text {
            prompt: "Rate=-".into()
        })
    );
    assert_eq!(report.generated["summary"], "Rate recorded");
    assert_eq!(report.counts.errors, 0);
}

#[tokio::test]
async fn test_fill_skips_unqualified_dependency() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted").into_shared();
    let tasks = tasks(vec![], vec![("table", ParagraphTask::fill(vec!["Rate".into()]))]);

    let (report, _) = run(&fx, &svc, &tasks, &InMemoryWorkbook::new()).await;

    assert!(!report.context.contains_key("Rate"));
    assert_eq!(at(&report, "PARA:table").len(), 1);
    assert_eq!(report.counts.errors, 0);
}

#[tokio::test]
async fn test_unknown_agent_fails_only_its_sheet() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "10"}))
        .into_shared();
    let tasks = tasks(
        vec![
            ("Broken", safety_task().with_agent("NoSuchExtractor")),
            ("Safety", safety_task()),
        ],
        vec![],
    );
    let workbook = safety_workbook().with_sheet("Broken", &["Rate"], &[&["1"]]);

    let (report, _) = run(&fx, &svc, &tasks, &workbook).await;

    let errors = at(&report, "EXTRACT:Broken");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("NoSuchExtractor"));
    assert!(!report.context.contains_key("Broken"));
    assert_eq!(report.context["Safety"]["Rate"], json!(10));
    assert_eq!(report.state, RunState::Summarized);
}

#[tokio::test]
async fn test_provider_failure_is_unit_failure() {
    let fx = fixture();
    let svc = ScriptedCompletion::failing("scripted", "quota exceeded").into_shared();
    let tasks = tasks(vec![("Safety", safety_task())], vec![]);

    let (report, _) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    let errors = at(&report, "EXTRACT:Safety");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("quota exceeded"));
    assert!(!report.context.contains_key("Safety"));
}

#[tokio::test]
async fn test_unreadable_sheet_is_unit_failure() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted").into_shared();
    let tasks = tasks(vec![("Safety", safety_task())], vec![]);
    let workbook = InMemoryWorkbook::new().with_unreadable("Safety");

    let (report, _) = run(&fx, &svc, &tasks, &workbook).await;

    assert_eq!(at(&report, "EXTRACT:Safety").len(), 1);
    assert_eq!(svc.structured_calls(), 0);
}

#[tokio::test]
async fn test_unregistered_provider_fails_paragraph() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted").into_shared();
    let tasks = tasks(
        vec![],
        vec![(
            "summary",
            ParagraphTask::generate(SUMMARY_PROMPT, vec![]).with_provider("elsewhere"),
        )],
    );

    let (report, _) = run(&fx, &svc, &tasks, &InMemoryWorkbook::new()).await;

    let errors = at(&report, "PARA:summary");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("elsewhere"));
    assert_eq!(svc.text_calls(), 0);
}

#[tokio::test]
async fn test_failing_renderer_still_summarizes() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted").into_shared();
    let tasks = tasks(vec![], vec![]);

    let report = Pipeline::new(fx.settings())
        .with_providers(providers_with(&svc))
        .with_renderer(FailingRenderer)
        .run(&tasks, &InMemoryWorkbook::new())
        .await;

    assert_eq!(report.state, RunState::Summarized);
    assert!(!report.is_rendered());
    let render_errors: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.location.starts_with("RENDER:"))
        .collect();
    assert_eq!(render_errors.len(), 1);
    assert_eq!(render_errors[0].level, Level::Error);
    assert!(fx.output_dir().join("diagnostics.json").is_file());
}

#[tokio::test]
async fn test_missing_template_setting_is_render_error() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted").into_shared();
    let mut settings = fx.settings();
    settings.template = None;
    let renderer = RecordingRenderer::new();

    let report = Pipeline::new(settings)
        .with_providers(providers_with(&svc))
        .with_renderer(renderer.clone())
        .run(&tasks(vec![], vec![]), &InMemoryWorkbook::new())
        .await;

    assert!(!report.is_rendered());
    assert_eq!(renderer.render_count(), 0);
    assert_eq!(report.counts.errors, 1);
    assert_eq!(report.state, RunState::Summarized);
}

#[tokio::test]
async fn test_validation_skip_prevents_model_call() {
    let fx = fixture();
    let svc = ScriptedCompletion::new("scripted").into_shared();
    let tasks = tasks(
        vec![(
            "Safety",
            SheetTask::new("prompts/missing.hbs", fields(&[("Rate", FieldType::Number)])),
        )],
        vec![],
    );

    let (report, _) = run(&fx, &svc, &tasks, &safety_workbook()).await;

    assert!(report.skipped.is_sheet_skipped("Safety"));
    assert_eq!(at(&report, "SHEET:Safety").len(), 1);
    assert_eq!(svc.structured_calls(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_counts_always_match_items(
        absent in proptest::collection::btree_set("[A-Z][a-z]{2,6}", 0..4),
        fills in proptest::collection::vec("[A-Z][a-z]{2,6}\\.[A-Z][a-z]{2,6}", 0..4),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let fx = fixture();
        let svc = ScriptedCompletion::new("scripted").into_shared();
        let sheets: Vec<(&str, SheetTask)> =
            absent.iter().map(|s| (s.as_str(), safety_task())).collect();
        let ids: Vec<String> = (0..fills.len()).map(|i| format!("p{i}")).collect();
        let paragraphs: Vec<(&str, ParagraphTask)> = ids
            .iter()
            .zip(&fills)
            .map(|(id, dep)| (id.as_str(), ParagraphTask::fill(vec![dep.clone()])))
            .collect();
        let tasks = tasks(sheets, paragraphs);

        let (report, _) = runtime.block_on(run(&fx, &svc, &tasks, &InMemoryWorkbook::new()));

        prop_assert_eq!(report.state, RunState::Summarized);
        prop_assert_eq!(report.counts.errors + report.counts.warnings, report.diagnostics.len());
        prop_assert_eq!(svc.structured_calls(), 0);
        for dep in &fills {
            let (sheet, field) = dep.split_once('.').unwrap();
            prop_assert_eq!(&report.context[sheet][field], &json!("-"));
        }
    }
}
