//! `sheetdoc` command-line interface

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sheetdoc_pipeline::{check, execute, load_settings, CheckReport, PipelineSettings, RunReport};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Document could not be rendered
const EXIT_NOT_RENDERED: u8 = 2;

fn cli() -> Command {
    let source = Arg::new("source")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Directory of .csv sheets, or a single .csv file");
    let config = Arg::new("config")
        .short('c')
        .long("config")
        .default_value("config")
        .value_parser(value_parser!(PathBuf))
        .help("Directory holding sheet_tasks.yaml, paragraph_tasks.yaml and pipeline.yaml");

    Command::new("sheetdoc")
        .version(sheetdoc_pipeline::VERSION)
        .about("Turn workbook sheets into a rendered report")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("run")
                .about("Extract, resolve and render")
                .arg(source.clone())
                .arg(config.clone())
                .arg(
                    Arg::new("output-name")
                        .short('o')
                        .long("output-name")
                        .help("Rendered document file name"),
                )
                .arg(
                    Arg::new("output-dir")
                        .long("output-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for the document and diagnostics"),
                )
                .arg(
                    Arg::new("template")
                        .long("template")
                        .value_parser(value_parser!(PathBuf))
                        .help("Document template"),
                )
                .arg(
                    Arg::new("no-percent-fraction")
                        .long("no-percent-fraction")
                        .action(ArgAction::SetTrue)
                        .help("Keep percentages as written (85% -> 85.0)"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Validate configuration against the source without calling any model")
                .arg(source)
                .arg(config)
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing argument <{name}>"))
}

fn run_settings(args: &ArgMatches) -> Result<PipelineSettings> {
    let mut settings = load_settings(path_arg(args, "config")?)?;
    if let Some(name) = args.get_one::<String>("output-name") {
        settings = settings.with_output_name(name);
    }
    if let Some(dir) = args.get_one::<PathBuf>("output-dir") {
        settings = settings.with_output_dir(dir);
    }
    if let Some(template) = args.get_one::<PathBuf>("template") {
        settings = settings.with_template(template);
    }
    if args.get_flag("no-percent-fraction") {
        settings = settings.with_percent_as_fraction(false);
    }
    Ok(settings)
}

fn print_run(report: &RunReport) {
    println!("State: {:?}", report.state);
    match &report.output {
        Some(path) => println!("Document: {}", path.display()),
        None => println!("Document: not rendered"),
    }
    if let Some(path) = &report.diagnostics_path {
        println!("Diagnostics: {}", path.display());
    }
    println!(
        "Errors: {}  Warnings: {}",
        report.counts.errors, report.counts.warnings
    );
}

fn print_check(report: &CheckReport) {
    println!("Sheets: {}", report.sheets.join(", "));
    let sheets: Vec<&str> = report.skipped.skipped_sheets().collect();
    let paragraphs: Vec<&str> = report.skipped.skipped_paragraphs().collect();
    println!("Skipped sheets: {}", sheets.join(", "));
    println!("Skipped paragraphs: {}", paragraphs.join(", "));
    for item in &report.diagnostics {
        println!("  [{:?}] {}: {}", item.level, item.location, item.msg);
    }
    println!(
        "Errors: {}  Warnings: {}",
        report.counts.errors, report.counts.warnings
    );
}

async fn dispatch(matches: &ArgMatches) -> Result<ExitCode> {
    match matches.subcommand() {
        Some(("run", args)) => {
            let settings = run_settings(args)?;
            let report = execute(settings, path_arg(args, "source")?).await?;
            print_run(&report);
            Ok(if report.is_rendered() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_NOT_RENDERED)
            })
        }
        Some(("check", args)) => {
            let settings = load_settings(path_arg(args, "config")?)?;
            let report = check(&settings, path_arg(args, "source")?)?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_check(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => anyhow::bail!("unknown command"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match dispatch(&matches).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let matches = cli()
            .try_get_matches_from([
                "sheetdoc",
                "run",
                "data",
                "-c",
                "cfg",
                "-o",
                "doc.md",
                "--no-percent-fraction",
                "--log-json",
            ])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(path_arg(args, "source").unwrap(), Path::new("data"));
        assert_eq!(path_arg(args, "config").unwrap(), Path::new("cfg"));
        assert_eq!(args.get_one::<String>("output-name").unwrap(), "doc.md");
        assert!(args.get_flag("no-percent-fraction"));
    }

    #[test]
    fn config_defaults() {
        let matches = cli().try_get_matches_from(["sheetdoc", "check", "data"]).unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(path_arg(args, "config").unwrap(), Path::new("config"));
    }
}
