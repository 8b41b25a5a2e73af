//! Processor setup: config overrides and remover wiring.

use std::sync::Arc;

use specimen_core::{Config, ImageProcessor, OutputFormat as CoreOutputFormat, ProcessOptions};

use super::{ProcessArgs, ProcessContext};

/// Validate input, load config, and assemble everything needed for processing.
pub fn setup_processor(args: &ProcessArgs) -> anyhow::Result<ProcessContext> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    let mut config = Config::load()?;
    apply_overrides(&mut config, args);

    let processor = ImageProcessor::new(&config);
    tracing::debug!("Background removal available: {}", processor.has_remover());

    Ok(context_from(config, processor, args))
}

/// Apply CLI flags on top of the loaded configuration.
pub(crate) fn apply_overrides(config: &mut Config, args: &ProcessArgs) {
    if let Some(parallel) = args.parallel {
        config.batch.parallel_workers = parallel.max(1);
    }
    if args.no_removal {
        config.removal.enabled = false;
    }
    if let Some(ref key) = args.api_key {
        config.removal.api_key = key.clone();
    }
}

/// Build the processing context once the processor exists.
pub(crate) fn context_from(
    config: Config,
    processor: ImageProcessor,
    args: &ProcessArgs,
) -> ProcessContext {
    let report_format = match args.format {
        Some(format) => format.into(),
        None => CoreOutputFormat::parse(&config.output.format).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown output format {:?} in config, using jsonl",
                config.output.format
            );
            CoreOutputFormat::JsonLines
        }),
    };

    ProcessContext {
        processor: Arc::new(processor),
        options: ProcessOptions {
            skip_removal: args.no_removal,
        },
        report_format,
        pretty: config.output.pretty,
        config,
    }
}
