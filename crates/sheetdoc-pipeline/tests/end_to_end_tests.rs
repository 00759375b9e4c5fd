//! Runs over CSV sources, YAML task tables and Handlebars templates on disk

use pretty_assertions::assert_eq;
use serde_json::json;
use sheetdoc_pipeline::{check, load_inputs, load_settings, Pipeline, RunState, Workbook};
use sheetdoc_test_utils::{providers_with, Fixture, ScriptedCompletion};

fn write_safety_project(fx: &Fixture) {
    fx.write_csv("Safety", "Metric,Value\nRate,50%\nIncidents,\"1,234\"\n");
    fx.write_config(
        "prompts/safety.hbs",
        "Read the table and return {{#each keys}}{{this}}, {{/each}}\n\n{{table}}",
    );
    fx.write_config("prompts/summary.hbs", "Summarize: rate {{data.Safety.Rate}}");
    fx.write_sheet_tasks(
        "Safety:\n  prompt: prompts/safety.hbs\n  fields:\n    Rate: number\n    Incidents: number\n",
    );
    fx.write_paragraph_tasks(
        "summary:\n  prompt: prompts/summary.hbs\n  depends_on: [Safety.Rate]\n  placeholder: SUMMARY\nsafety_table:\n  mode: fill\n  depends_on: [Safety.Rate, Safety.Incidents]\n",
    );
    fx.write_template(
        "# Safety report\n\n{{SUMMARY}}\n\n| Rate | Incidents |\n|---|---|\n| {{Safety.Rate}} | {{Safety.Incidents}} |\n",
    );
}

#[tokio::test]
async fn test_csv_to_markdown_report() {
    let fx = Fixture::new();
    write_safety_project(&fx);
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "50%", "Incidents": "1,234"}))
        .with_text("Safety held steady & improved.")
        .into_shared();

    let settings = fx.settings();
    let (tasks, workbook) = load_inputs(&settings, &fx.data_dir()).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Safety"]);

    let report = Pipeline::new(settings)
        .with_providers(providers_with(&svc))
        .run(&tasks, &workbook)
        .await;

    assert_eq!(report.state, RunState::Summarized);
    assert_eq!(report.counts.errors, 0, "{:#?}", report.diagnostics);
    assert_eq!(report.output, Some(fx.output_dir().join("report.md")));
    assert_eq!(
        fx.read_output("report.md"),
        "# Safety report\n\nSafety held steady & improved.\n\n| Rate | Incidents |\n|---|---|\n| 0.5 | 1234 |\n"
    );
    assert_eq!(fx.read_diagnostics()["counts"]["errors"], 0);
}

#[tokio::test]
async fn test_percent_kept_whole_when_disabled() {
    let fx = Fixture::new();
    write_safety_project(&fx);
    let svc = ScriptedCompletion::new("scripted")
        .with_structured(json!({"Rate": "85%", "Incidents": "2"}))
        .with_text("ok")
        .into_shared();

    let settings = fx.settings().with_percent_as_fraction(false);
    let (tasks, workbook) = load_inputs(&settings, &fx.data_dir()).unwrap();
    let report = Pipeline::new(settings)
        .with_providers(providers_with(&svc))
        .run(&tasks, &workbook)
        .await;

    assert_eq!(report.context["Safety"]["Rate"], json!(85));
}

#[test]
fn test_check_reports_skips_without_calling_a_model() {
    let fx = Fixture::new();
    write_safety_project(&fx);
    fx.write_sheet_tasks(
        "Safety:\n  prompt: prompts/safety.hbs\n  fields: {Rate: number}\nFinance:\n  prompt: prompts/finance.hbs\n  fields: {Revenue: number}\nBad: [1, 2]\n",
    );

    let report = check(&fx.settings(), &fx.data_dir()).unwrap();

    assert_eq!(report.sheets, vec!["Safety"]);
    let skipped: Vec<&str> = report.skipped.skipped_sheets().collect();
    assert!(skipped.contains(&"Finance"));
    assert!(skipped.contains(&"Bad"));
    assert!(!skipped.contains(&"Safety"));
    assert!(report.counts.errors >= 1);
    assert_eq!(
        report.counts.errors + report.counts.warnings,
        report.diagnostics.len()
    );
}

#[test]
fn test_settings_file_is_applied() {
    let fx = Fixture::new();
    fx.write_config(
        "pipeline.yaml",
        "template: report.md.hbs\noutput_name: safety.md\nfill_placeholder: n/a\n",
    );

    let settings = load_settings(&fx.config_dir()).unwrap();

    assert_eq!(settings.template, Some(fx.template_path()));
    assert_eq!(settings.output_name, "safety.md");
    assert_eq!(settings.fill_placeholder, "n/a");
}

#[test]
fn test_unparseable_task_table_is_fatal() {
    let fx = Fixture::new();
    fx.write_sheet_tasks("Safety: [unclosed\n");
    fx.write_paragraph_tasks("{}\n");

    let err = load_inputs(&fx.settings(), &fx.data_dir()).unwrap_err();

    assert!(!err.is_source_missing());
    assert!(err.to_string().contains("configuration error"));
    assert_eq!(fx.read_diagnostics()["counts"]["errors"], 1);
}
