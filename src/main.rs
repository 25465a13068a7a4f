use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use economy_xml_lint::config::{Args, CheckArgs, Command, Config};
use economy_xml_lint::report::{self, FileReport, OutputFormat};
use economy_xml_lint::structural::{validate_and_parse, RoxmlParser};
use economy_xml_lint::ValidationResult;

const STDIN_NAME: &str = "<stdin>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries reports or the LSP transport
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    match args.command {
        Command::Check(check) => run_check(check),
        Command::Serve(serve) => {
            let config = Config::from_validation_args(&serve.validation)?;
            economy_xml_lint::lsp::server::serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_check(args: CheckArgs) -> Result<ExitCode> {
    let config = Config::from_validation_args(&args.validation)?;
    if let Some(path) = &config.project_config_path {
        log::info!("Using project config {}", path.display());
    }
    let validator = config.validator();

    let inputs = read_inputs(&args.files)?;
    let mut results = Vec::with_capacity(inputs.len());

    for (name, text) in &inputs {
        let result = if args.no_parse {
            validator.validate(text)
        } else {
            let checked = validate_and_parse(&validator, &RoxmlParser, text);
            if let Some(document) = &checked.document {
                log::debug!(
                    "{}: parsed <{}> with {} entries",
                    name,
                    document.root.name,
                    document.root.elements().count()
                );
            }
            checked.result
        };
        results.push(result);
    }

    let reports: Vec<FileReport<'_>> = inputs
        .iter()
        .zip(&results)
        .map(|((name, _), result)| FileReport {
            source: name,
            result,
        })
        .collect();

    match args.format {
        OutputFormat::Text => {
            for file_report in &reports {
                print!("{}", report::render_text(file_report));
            }
        }
        OutputFormat::Json => println!("{}", report::render_json(&reports)?),
    }

    let all_valid = results.iter().all(ValidationResult::is_valid);
    Ok(if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Read every named file, or stdin for `-` or an empty list
fn read_inputs(files: &[std::path::PathBuf]) -> Result<Vec<(String, String)>> {
    if files.is_empty() {
        return Ok(vec![(STDIN_NAME.to_string(), read_stdin()?)]);
    }

    files
        .iter()
        .map(|path| -> Result<(String, String)> {
            if path == Path::new("-") {
                return Ok((STDIN_NAME.to_string(), read_stdin()?));
            }
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok((path.display().to_string(), text))
        })
        .collect()
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stdin")?;
    Ok(text)
}
