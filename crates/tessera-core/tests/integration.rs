use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use tessera_core::{
    compose, Builder, EvalError, ExposureTable, MockBuilder, Overlay, PackageSet,
    PlatformRegistry, Recipe, UndefinedPackageError,
};
use tessera_schema::{
    hash_source_tree, parse_manifest_file, BuildPlan, LockFile, PlatformId, SourceRef,
};

fn write_project(dir: &Path, name: &str) {
    fs::write(
        dir.join("tessera.toml"),
        format!(
            r#"
[package]
name = "{name}"
version = "0.3.1"

[dependencies]
anyhow = "1"
serde = "^1.0"
"#
        ),
    )
    .unwrap();
    fs::write(
        dir.join("tessera.lock"),
        r#"
lock_version = 1

[[package]]
name = "anyhow"
version = "1.0.86"
checksum = "cs-anyhow"

[[package]]
name = "serde"
version = "1.0.203"
checksum = "cs-serde"
"#,
    )
    .unwrap();
    let src = dir.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("main.rs"), "fn main() {}").unwrap();
}

fn project_set(dir: &Path) -> tessera_core::ComposedSet {
    let manifest = parse_manifest_file(dir.join("tessera.toml")).unwrap();
    let lock = LockFile::load(dir.join("tessera.lock"))
        .unwrap()
        .verify(&manifest)
        .unwrap();
    let source = hash_source_tree(dir).unwrap();
    compose(PackageSet::for_package(manifest, lock, source), Vec::new())
}

#[test]
fn end_to_end_exposure_from_disk() {
    let project = tempfile::tempdir().unwrap();
    write_project(project.path(), "watchbuild");

    let table = ExposureTable::new(PlatformRegistry::builtin(), Arc::new(MockBuilder::new()));
    let set = project_set(project.path());

    let entry = table
        .expose(&set, &PlatformId::from("x86_64-linux"))
        .unwrap();
    assert_eq!(entry.default, "watchbuild");
    assert!(entry.packages.contains_key("watchbuild"));
    assert!(entry.packages.contains_key("default"));
    assert!(entry.apps["default"].program.ends_with("/bin/watchbuild"));
}

#[test]
fn identical_projects_share_content_addresses() {
    let p1 = tempfile::tempdir().unwrap();
    let p2 = tempfile::tempdir().unwrap();
    write_project(p1.path(), "watchbuild");
    write_project(p2.path(), "watchbuild");

    let builder = Arc::new(MockBuilder::new());
    let table = ExposureTable::new(
        PlatformRegistry::builtin(),
        Arc::<MockBuilder>::clone(&builder) as Arc<dyn Builder>,
    );

    let s1 = project_set(p1.path());
    let s2 = project_set(p2.path());
    let platform = PlatformId::from("aarch64-linux");

    let e1 = table.expose(&s1, &platform).unwrap();
    let e2 = table.expose(&s2, &platform).unwrap();

    assert_eq!(e1.packages["watchbuild"], e2.packages["watchbuild"]);
    assert_eq!(
        builder.builds(),
        1,
        "identical plans across sets must share one build"
    );
}

#[test]
fn lock_reordering_does_not_change_exposure() {
    let project = tempfile::tempdir().unwrap();
    write_project(project.path(), "watchbuild");

    let manifest = parse_manifest_file(project.path().join("tessera.toml")).unwrap();
    let lock = LockFile::load(project.path().join("tessera.lock")).unwrap();
    let mut reordered = lock.clone();
    reordered.entries.reverse();

    let source = hash_source_tree(project.path()).unwrap();
    let platform = PlatformId::from("x86_64-linux");

    let p1 = BuildPlan::derive(
        &manifest,
        &lock.verify(&manifest).unwrap(),
        &source,
        &platform,
    );
    let p2 = BuildPlan::derive(
        &manifest,
        &reordered.verify(&manifest).unwrap(),
        &source,
        &platform,
    );
    assert_eq!(p1.plan_id(), p2.plan_id());
}

#[test]
fn overlay_chain_shadowing_and_self_reference() {
    let project = tempfile::tempdir().unwrap();
    write_project(project.path(), "watchbuild");

    let manifest = parse_manifest_file(project.path().join("tessera.toml")).unwrap();
    let lock = LockFile::load(project.path().join("tessera.lock"))
        .unwrap()
        .verify(&manifest)
        .unwrap();
    let source = hash_source_tree(project.path()).unwrap();
    let base = PackageSet::for_package(manifest.clone(), lock.clone(), source);

    // A debug flavor overrides the main package with different sources...
    let debug_source = SourceRef::from_digest(tessera_schema::ContentDigest::new("e".repeat(64)));
    let override_main: Overlay = Box::new(move |_, _| {
        let data = Arc::new((manifest.clone(), lock.clone(), debug_source.clone()));
        let recipe: Recipe = Arc::new(move |platform, _| {
            let (manifest, lock, source) = data.as_ref();
            Ok(BuildPlan::derive(manifest, lock, source, platform))
        });
        PackageSet::new().with("watchbuild", recipe)
    });

    // ...and an alias defined *before* the override still sees the final one.
    let alias: Overlay = Box::new(|_, _| {
        let recipe: Recipe = Arc::new(|platform, fin| fin.plan("watchbuild", platform));
        PackageSet::new().with("watchbuild-dbg", recipe)
    });

    let composed = compose(base, vec![alias, override_main]);
    let platform = PlatformId::from("x86_64-linux");

    let main_plan = composed.plan("watchbuild", &platform).unwrap();
    let alias_plan = composed.plan("watchbuild-dbg", &platform).unwrap();
    assert_eq!(
        main_plan.source_digest.as_str(),
        "e".repeat(64),
        "override must shadow the base sources"
    );
    assert_eq!(alias_plan.plan_id(), main_plan.plan_id());
}

#[test]
fn concurrent_exposure_builds_each_artifact_once() {
    let project = tempfile::tempdir().unwrap();
    write_project(project.path(), "watchbuild");

    let builder = Arc::new(MockBuilder::new());
    let table = Arc::new(ExposureTable::new(
        PlatformRegistry::builtin(),
        Arc::<MockBuilder>::clone(&builder) as Arc<dyn Builder>,
    ));
    let set = Arc::new(project_set(project.path()));
    let platform = PlatformId::from("x86_64-linux");

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let table = Arc::clone(&table);
            let set = Arc::clone(&set);
            let platform = platform.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                table.expose(&set, &platform).unwrap()
            })
        })
        .collect();

    let entries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(builder.builds(), 1, "one package, one platform, one build");
    for entry in &entries {
        assert!(Arc::ptr_eq(entry, &entries[0]), "all callers share the entry");
    }
}

#[test]
fn per_platform_partial_success() {
    let project = tempfile::tempdir().unwrap();
    write_project(project.path(), "watchbuild");

    // A registry reduced for the test, as the design allows.
    let registry = PlatformRegistry::new([
        PlatformId::from("x86_64-linux"),
        PlatformId::from("aarch64-darwin"),
    ]);
    let table = ExposureTable::new(registry, Arc::new(MockBuilder::new()));
    let set = project_set(project.path());

    let ok = table.expose(&set, &PlatformId::from("x86_64-linux")).unwrap();

    let err = table
        .expose(&set, &PlatformId::from("sparc64-plan9"))
        .unwrap_err();
    assert!(matches!(err, EvalError::UnknownPlatform(_)));

    // The failed request left the successful exposure untouched.
    let again = table.expose(&set, &PlatformId::from("x86_64-linux")).unwrap();
    assert!(Arc::ptr_eq(&ok, &again));

    let results = table.expose_all(&set);
    assert!(results.iter().all(|(_, r)| r.is_ok()));
}

#[test]
fn missing_default_fails_only_that_set() {
    let project = tempfile::tempdir().unwrap();
    write_project(project.path(), "watchbuild");

    let table = ExposureTable::new(PlatformRegistry::builtin(), Arc::new(MockBuilder::new()));
    let platform = PlatformId::from("x86_64-linux");

    let good = project_set(project.path());
    assert!(table.expose(&good, &platform).is_ok());

    let manifest = parse_manifest_file(project.path().join("tessera.toml")).unwrap();
    let lock = LockFile::load(project.path().join("tessera.lock"))
        .unwrap()
        .verify(&manifest)
        .unwrap();
    let source = hash_source_tree(project.path()).unwrap();
    let undesignated: Overlay = Box::new(move |_, _| {
        let data = Arc::new((manifest.clone(), lock.clone(), source.clone()));
        let recipe: Recipe = Arc::new(move |platform, _| {
            let (manifest, lock, source) = data.as_ref();
            Ok(BuildPlan::derive(manifest, lock, source, platform))
        });
        PackageSet::new().with("anon", recipe)
    });
    let bad = compose(PackageSet::new(), vec![undesignated]);

    let err = table.expose(&bad, &platform).unwrap_err();
    assert!(matches!(
        err,
        EvalError::UndefinedPackage(UndefinedPackageError::NoDefault)
    ));

    // The good set's exposure still works afterwards.
    assert!(table.expose(&good, &platform).is_ok());
}
