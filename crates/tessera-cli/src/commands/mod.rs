pub mod expose;
pub mod plan;
pub mod platforms;
pub mod verify;

use std::path::Path;
use tessera_schema::{LockFile, Manifest, VerifiedLock};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn ok_marker(msg: &str) -> String {
    format!("{} {msg}", console::style("✓").green())
}

pub fn fail_marker(msg: &str) -> String {
    format!("{} {msg}", console::style("✗").red())
}

/// Load and verify manifest + lock. On failure the error is already
/// printed; the returned code is the process exit code to use.
pub fn load_verified(
    manifest_path: &Path,
    lock_path: &Path,
) -> Result<(Manifest, VerifiedLock), u8> {
    let manifest = match tessera_schema::parse_manifest_file(manifest_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", fail_marker(&format!("manifest: {e}")));
            return Err(EXIT_MANIFEST_ERROR);
        }
    };
    let lock = match LockFile::load(lock_path) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}", fail_marker(&format!("lock: {e}")));
            return Err(EXIT_MANIFEST_ERROR);
        }
    };
    match lock.verify(&manifest) {
        Ok(verified) => Ok((manifest, verified)),
        Err(e) => {
            eprintln!("{}", fail_marker(&format!("lock: {e}")));
            Err(EXIT_MANIFEST_ERROR)
        }
    }
}
