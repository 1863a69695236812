use super::{json_pretty, load_verified, ok_marker, EXIT_SUCCESS};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct VerifyReport<'a> {
    name: &'a str,
    version: String,
    dependencies: usize,
    lock_entries: usize,
    lock_digest: String,
}

pub fn run(manifest_path: &Path, lock_path: &Path, json: bool) -> Result<u8, String> {
    let (manifest, verified) = match load_verified(manifest_path, lock_path) {
        Ok(pair) => pair,
        Err(code) => return Ok(code),
    };

    let digest = verified.digest();
    if json {
        let report = VerifyReport {
            name: &manifest.name,
            version: manifest.version.to_string(),
            dependencies: manifest.dependencies.len(),
            lock_entries: verified.entries().len(),
            lock_digest: digest.into_inner(),
        };
        println!("{}", json_pretty(&report)?);
    } else {
        println!(
            "{}",
            ok_marker(&format!(
                "{} ({} dependencies, {} lock entries)",
                manifest.identity(),
                manifest.dependencies.len(),
                verified.entries().len()
            ))
        );
        println!("lock digest: {digest}");
    }
    Ok(EXIT_SUCCESS)
}
