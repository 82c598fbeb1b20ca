// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sheetgrade CLI: grade a photographed answer sheet against a JSON answer key.

mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use image::DynamicImage;
use sheetgrade_core::GradeConfig;
use sheetgrade_core::human_errors::humanize_error;
use sheetgrade_core::types::ErrorResponse;
use sheetgrade_vision::{ImageProcessor, SheetGrader};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "sheetgrade")]
#[command(about = "Grade photographed multiple-choice answer sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one answer sheet photo.
    Grade(GradeArgs),

    /// Deskew and perspective-correct a photo without grading it.
    Normalize(NormalizeArgs),

    /// Print the default configuration as JSON.
    Config {
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct GradeArgs {
    /// Path to the answer sheet photo.
    #[arg(long)]
    image: PathBuf,

    /// Path to the answer key (JSON array of question/correct_answer).
    #[arg(long)]
    key: PathBuf,

    /// Optional JSON configuration overriding the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write the result (JSON). Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path to write the corrected sheet with detected marks outlined.
    #[arg(long)]
    annotated: Option<PathBuf>,

    /// Emit the full grading report instead of the scoring result.
    #[arg(long)]
    report: bool,
}

#[derive(Debug, Clone, Args)]
struct NormalizeArgs {
    /// Path to the answer sheet photo.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the corrected image; the format follows the extension.
    #[arg(long)]
    out: PathBuf,

    /// Optional JSON configuration overriding the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grade(args) => run_grade(&args),
        Commands::Normalize(args) => run_normalize(&args),
        Commands::Config { out } => output::write_json(&GradeConfig::default(), out.as_deref()),
    }
}

// ── grade ──────────────────────────────────────────────────────────────

fn run_grade(args: &GradeArgs) -> CliResult<()> {
    let config = output::load_config(args.config.as_deref())?;
    let key = output::load_key(&args.key)?;
    let grader = SheetGrader::new(config)?;

    tracing::info!("Loading image: {}", args.image.display());
    let bytes = std::fs::read(&args.image).map_err(|e| -> CliError {
        format!("Failed to read image {}: {}", args.image.display(), e).into()
    })?;

    let report = match grader.grade_report(&bytes, &key) {
        Ok(report) => report,
        Err(err) => {
            let human = humanize_error(&err);
            tracing::warn!("{} {}", human.message, human.suggestion);
            output::write_json(&ErrorResponse::from(&err), args.out.as_deref())?;
            return Err(err.into());
        }
    };

    tracing::info!(
        "Graded submission {}: {} correct, {} incorrect",
        report.submission_id,
        report.result.total_correct,
        report.result.total_incorrect,
    );

    if let Some(path) = &args.annotated {
        ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(report.annotated.clone()))
            .save(path)?;
        tracing::info!("Annotated sheet written to {}", path.display());
    }

    if args.report {
        output::write_json(&report, args.out.as_deref())
    } else {
        output::write_json(&report.result, args.out.as_deref())
    }
}

// ── normalize ──────────────────────────────────────────────────────────

fn run_normalize(args: &NormalizeArgs) -> CliResult<()> {
    let config = output::load_config(args.config.as_deref())?;
    let grader = SheetGrader::new(config)?;

    let image = ImageProcessor::open(&args.image)?.into_dynamic();
    tracing::info!("Image size: {}x{}", image.width(), image.height());

    let corrected = grader.normalize_and_correct(&image)?;
    tracing::info!(
        "Corrected to {}x{} (enhanced: {})",
        corrected.image.width(),
        corrected.image.height(),
        corrected.enhanced,
    );

    ImageProcessor::from_dynamic(corrected.image).save(&args.out)?;
    tracing::info!("Corrected image written to {}", args.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn grade_arguments_parse() {
        let cli = Cli::try_parse_from([
            "sheetgrade",
            "grade",
            "--image",
            "sheet.jpg",
            "--key",
            "key.json",
            "--annotated",
            "marked.png",
        ])
        .unwrap();
        match cli.command {
            Commands::Grade(args) => {
                assert_eq!(args.image, PathBuf::from("sheet.jpg"));
                assert_eq!(args.annotated, Some(PathBuf::from("marked.png")));
                assert!(args.out.is_none());
                assert!(!args.report);
            }
            _ => panic!("expected grade subcommand"),
        }
    }

    #[test]
    fn grade_requires_a_key() {
        assert!(Cli::try_parse_from(["sheetgrade", "grade", "--image", "sheet.jpg"]).is_err());
    }

    #[test]
    fn undecodable_upload_writes_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("sheet.jpg");
        let key = dir.path().join("key.json");
        let out = dir.path().join("result.json");
        std::fs::write(&image, b"definitely not a jpeg").unwrap();
        std::fs::write(&key, r#"[{"question": "1", "correct_answer": "A"}]"#).unwrap();

        let args = GradeArgs {
            image,
            key,
            config: None,
            out: Some(out.clone()),
            annotated: None,
            report: false,
        };
        assert!(run_grade(&args).is_err());

        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("could not process the submitted image")
        );
    }
}
