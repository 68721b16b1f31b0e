use proxybench_common::{BenchError, Prompt, Result};
use std::path::Path;

/// Read the ordered prompt list from a JSON array of `{"text": ...}` objects.
///
/// A missing or malformed file is a setup error and aborts the run.
pub fn load_prompts(path: &Path) -> Result<Vec<Prompt>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| BenchError::PromptsUnavailable(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| BenchError::PromptsUnavailable(format!("{}: {e}", path.display())))
}
