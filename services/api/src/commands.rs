use clap::Args;
use credit_score::config::AppConfig;
use credit_score::error::AppError;
use credit_score::scoring::{
    load_context, CreditApplication, ScoringContext, ScoringError, ValidationError,
    GUARANTEE_FLAG,
};
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding one credit application in the form's wire format
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Model artifact to score with (defaults to CREDIT_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct InspectModelArgs {
    /// Model artifact to describe (defaults to CREDIT_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
}

/// Score one application file and print the result as JSON.
pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let context = load_model(args.model)?;
    let application = read_application(&args.input)?;
    let result = context.score(&application)?;
    info!(
        client = %result.client,
        score = result.credit_score,
        "processed application"
    );

    let rendered = serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_inspect_model(args: InspectModelArgs) -> Result<(), AppError> {
    let context = load_model(args.model)?;
    print!("{}", render_model_summary(&context));
    Ok(())
}

fn load_model(override_path: Option<PathBuf>) -> Result<ScoringContext, AppError> {
    let path = match override_path {
        Some(path) => path,
        None => AppConfig::load()?.model.artifact_path,
    };
    let context = load_context(&path)?;
    info!(
        path = %path.display(),
        version = context.model_version(),
        features = context.feature_names().len(),
        "model loaded"
    );
    Ok(context)
}

pub(crate) fn read_application(path: &Path) -> Result<CreditApplication, AppError> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|err| {
        AppError::Scoring(ScoringError::Validation(ValidationError::Malformed(
            err.to_string(),
        )))
    })
}

pub(crate) fn render_model_summary(context: &ScoringContext) -> String {
    let schema = context.schema();
    let mut out = String::new();

    let _ = writeln!(out, "Model version: {}", context.model_version());
    let _ = writeln!(out, "Expected features ({}):", context.feature_names().len());
    for (index, feature) in context.feature_names().iter().enumerate() {
        let kind = if schema.is_numeric(feature) {
            "numeric"
        } else if schema.is_categorical(feature) {
            "categorical"
        } else if feature == GUARANTEE_FLAG {
            "flag"
        } else {
            "unknown"
        };
        let _ = writeln!(out, "  {:>2}. {feature} ({kind})", index + 1);
    }

    let _ = writeln!(out, "Categorical vocabularies:");
    for (feature, vocabulary) in schema.vocabularies() {
        let _ = writeln!(
            out,
            "  {feature}: {} labels, fallback '{}'",
            vocabulary.len(),
            vocabulary.fallback_label()
        );
    }

    out
}
