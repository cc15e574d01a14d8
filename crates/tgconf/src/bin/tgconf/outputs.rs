//! dependency outputs stored as files

use std::path::PathBuf;
use tgconf::dependency::{parse_output_json, Dependency, OutputMap, OutputRetriever};
use tgconf::error::RetrievalError;

/// Reads the outputs of dependency `<name>` from `<directory>/<name>.json`
///
/// A missing file means the dependency has no outputs.
#[derive(Debug, derive_new::new)]
pub struct DirectoryOutputs {
    directory: PathBuf,
}

impl OutputRetriever for DirectoryOutputs {
    fn retrieve(&self, dependency: &Dependency) -> Result<Option<OutputMap>, RetrievalError> {
        let path = self.directory.join(format!("{}.json", dependency.name));
        if !path.is_file() {
            tracing::debug!(path=%path.display(), "no outputs file");
            return Ok(None);
        }

        tracing::info!(path=%path.display(), "loading outputs");
        let content = std::fs::read(&path)?;
        Ok(Some(parse_output_json(&content)?))
    }
}
