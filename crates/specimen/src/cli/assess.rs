//! The `specimen assess` command: classify a photo's background without changing it.

use clap::Args;
use specimen_core::pipeline::Validator;
use specimen_core::{BackgroundAssessment, BackgroundClassifier, Config};
use std::path::{Path, PathBuf};

/// Arguments for the `assess` command.
#[derive(Args, Debug)]
pub struct AssessArgs {
    /// Image file to assess
    #[arg(required = true)]
    pub input: PathBuf,
}

/// Execute the assess command.
pub async fn execute(args: AssessArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let assessment = assess_file(&config, &args.input)?;

    tracing::info!(
        "{:?}: white ratio {:.3} ({} of {} perimeter pixels)",
        args.input,
        assessment.white_ratio,
        assessment.white_pixels,
        assessment.sampled_pixels
    );
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}

fn assess_file(config: &Config, path: &Path) -> anyhow::Result<BackgroundAssessment> {
    let validator = Validator::new(config.limits.clone());
    validator.validate_path(path)?;

    let bytes = std::fs::read(path)?;
    validator.validate_bytes(&bytes)?;

    let classifier = BackgroundClassifier::new(config.classifier.clone());
    Ok(classifier.assess(&bytes))
}
