use std::path::Path;

use sha2::Digest;

use nafl_model::PipelineError;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}

/// Digest of a file's full contents.
pub fn sha256_file(path: &Path) -> Result<String, PipelineError> {
    let bytes = std::fs::read(path).map_err(|source| PipelineError::io(path, source))?;
    Ok(sha256_hex(&bytes))
}
