use super::{json_pretty, load_verified, EXIT_SUCCESS};
use std::path::Path;
use tessera_core::PlatformRegistry;
use tessera_schema::{hash_source_tree, BuildPlan, PlatformId};

pub fn run(
    platform: &str,
    manifest_path: &Path,
    lock_path: &Path,
    source_dir: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let platform = PlatformId::from(platform);
    PlatformRegistry::builtin()
        .require(&platform)
        .map_err(|e| e.to_string())?;

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

    let plan = BuildPlan::derive(&manifest, &verified, &source, &platform);
    if json {
        println!("{}", json_pretty(&plan)?);
    } else {
        println!("plan      {} ({})", plan.plan_id(), plan.short_id());
        println!("package   {}@{}", plan.name, plan.version);
        println!("platform  {}", plan.platform);
        println!("lock      {}", plan.lock_digest);
        println!("source    {}", plan.source_digest);
    }
    Ok(EXIT_SUCCESS)
}
