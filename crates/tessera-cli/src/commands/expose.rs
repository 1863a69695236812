use super::{json_pretty, load_verified, ok_marker, EXIT_SUCCESS};
use std::path::Path;
use std::sync::Arc;
use tessera_core::{compose, ExposureTable, MockBuilder, PackageSet, PlatformRegistry};
use tessera_schema::{hash_source_tree, PlatformId};

pub fn run(
    platform: &str,
    manifest_path: &Path,
    lock_path: &Path,
    source_dir: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let platform = PlatformId::from(platform);

    let (manifest, verified) = match load_verified(manifest_path, lock_path) {
        Ok(pair) => pair,
        Err(code) => return Ok(code),
    };

    let source_root = match source_dir {
        Some(dir) => dir.to_path_buf(),
        None => manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };
    let source = hash_source_tree(&source_root).map_err(|e| e.to_string())?;

    let set = compose(
        PackageSet::for_package(manifest, verified, source),
        Vec::new(),
    );
    let table = ExposureTable::new(PlatformRegistry::builtin(), Arc::new(MockBuilder::new()));
    let entry = table.expose(&set, &platform).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&*entry)?);
    } else {
        println!(
            "{}",
            ok_marker(&format!("exposed for {} (default: {})", entry.platform, entry.default))
        );
        println!("packages:");
        for (name, artifact) in &entry.packages {
            println!("  {name:<16} {}", artifact.store_path);
        }
        println!("apps:");
        for (name, app) in &entry.apps {
            println!("  {name:<16} {}", app.program);
        }
    }
    Ok(EXIT_SUCCESS)
}
