use rayon::prelude::*;
use tracing::{info, warn};

use crate::analyze::analyze_file;
use crate::config::AnalyzerConfig;
use crate::discover::discover;
use crate::error::AnalyzerError;
use crate::model::AnalyzerResult;
use crate::output::aggregate;

/// Analyze the function under `config.root`.
///
/// Files are analyzed in parallel; results are merged in walk order once
/// every file is done. A file that fails to read or parse becomes a warning.
pub fn run(config: &AnalyzerConfig) -> Result<AnalyzerResult, AnalyzerError> {
    let mut discovery = discover(&config.root, &config.exclude)?;

    let results: Vec<_> = discovery.sources.par_iter().map(analyze_file).collect();

    let mut files = Vec::with_capacity(results.len());
    for (source, result) in discovery.sources.iter().zip(results) {
        match result {
            Ok(analysis) => files.push(analysis),
            Err(e) => {
                let message = format!("{}: {}", source.display_path, e.reason());
                warn!("{message}");
                discovery.warnings.push(message);
            }
        }
    }

    info!(
        analyzed = files.len(),
        skipped = discovery.sources.len() - files.len(),
        tests = discovery.tests.len(),
        "analysis complete"
    );
    Ok(aggregate(discovery, files))
}
