//! Incremental build integration tests.
//!
//! Every scenario drives the full pipeline against a small metabase and
//! verifies the invariant the cache is built around: after any sequence of
//! warm builds, the output directory holds exactly the bytes a cold build of
//! the same inputs would produce.

use std::fs;
use std::path::Path;

use bridgegen::codegen::BOOTSTRAP_FILENAME;
use bridgegen::prelude::*;
use pretty_assertions::assert_eq;

const METABASE: &str = r#"{
    "classes": {
        "UIResponder": { "name": "UIResponder", "framework": "UIKit" },
        "UIView": { "name": "UIView", "framework": "UIKit", "superclass": "UIResponder",
            "methods": {
                "addSubview": { "name": "addSubview", "selector": "addSubview:", "instance": true,
                    "arguments": [ { "name": "view", "type": "objc_interface", "value": "UIView *", "encoding": "@" } ] }
            },
            "properties": {
                "frame": { "name": "frame", "type": "struct", "value": "CGRect",
                           "encoding": "{CGRect={CGPoint=dd}{CGSize=dd}}", "attributes": [] }
            } },
        "UILabel": { "name": "UILabel", "framework": "UIKit", "superclass": "UIView",
            "properties": {
                "text": { "name": "text", "type": "objc_interface", "value": "NSString *",
                          "encoding": "@", "attributes": [] }
            } }
    },
    "structs": {
        "CGRect": { "name": "CGRect", "framework": "CoreGraphics",
            "fields": [ { "name": "origin", "encoding": "{CGPoint=dd}" },
                        { "name": "size", "encoding": "{CGSize=dd}" } ] },
        "CGPoint": { "name": "CGPoint", "framework": "CoreGraphics",
            "fields": [ { "name": "x", "encoding": "d" }, { "name": "y", "encoding": "d" } ] },
        "CGSize": { "name": "CGSize", "framework": "CoreGraphics",
            "fields": [ { "name": "width", "encoding": "d" }, { "name": "height", "encoding": "d" } ] }
    },
    "functions": {
        "CGRectMake": { "name": "CGRectMake", "framework": "CoreGraphics",
            "arguments": [ { "name": "x" }, { "name": "y" }, { "name": "width" }, { "name": "height" } ],
            "returns": { "type": "struct", "value": "CGRect", "encoding": "{CGRect={CGPoint=dd}{CGSize=dd}}" } }
    }
}"#;

fn metabase() -> Metabase {
    Metabase::from_json(METABASE).expect("fixture metabase parses")
}

fn references(types: &[&str]) -> ReferenceMap {
    let mut map = ReferenceMap::new();
    let entry = map.entry("app.js");
    for name in types {
        entry.require_type(*name);
    }
    map
}

/// References the way the scanner reports a called free function: the name
/// lands in the used types and in the member table.
fn references_with_call(types: &[&str], function: &str) -> ReferenceMap {
    let mut map = references(types);
    map.entry("app.js")
        .require_type(function)
        .reference_member(function, MemberRefs::FUNCTION);
    map
}

fn run(references: ReferenceMap, out: &Path) -> BuildReport {
    BuildPipeline::new(metabase(), references, out)
        .run()
        .expect("pipeline run succeeds")
}

/// Snapshot every file under a directory as `(relative path, contents)`.
fn snapshot(dir: &Path) -> Vec<(String, String)> {
    fn walk(root: &Path, dir: &Path, into: &mut Vec<(String, String)>) {
        for entry in fs::read_dir(dir).expect("readable output directory") {
            let path = entry.expect("directory entry").path();
            if path.is_dir() {
                walk(root, &path, into);
            } else {
                let relative = path
                    .strip_prefix(root)
                    .expect("path under root")
                    .to_string_lossy()
                    .replace('\\', "/");
                into.push((relative, fs::read_to_string(&path).expect("readable file")));
            }
        }
    }
    let mut files = Vec::new();
    walk(dir, dir, &mut files);
    files.sort();
    files
}

#[test]
fn test_cold_build_writes_closure_and_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let report = run(references_with_call(&["UILabel"], "CGRectMake"), &out);
    assert!(report.cold);

    // superclass chain, referenced struct and module all land on disk
    assert!(out.join("uikit/uilabel.js").exists());
    assert!(out.join("uikit/uiview.js").exists());
    assert!(out.join("uikit/uiresponder.js").exists());
    assert!(out.join("coregraphics/cgrect.js").exists());
    assert!(out.join("coregraphics/coregraphics.js").exists());

    let bootstrap = fs::read_to_string(out.join(BOOTSTRAP_FILENAME)).unwrap();
    assert!(bootstrap.contains("binding.redirect('UIKit/UILabel', '/bridge/uikit/uilabel');"));
    assert!(bootstrap
        .contains("binding.redirect('CoreGraphics', '/bridge/coregraphics/coregraphics');"));
}

#[test]
fn test_incremental_build_matches_cold_build_exactly() {
    let dir = tempfile::tempdir().unwrap();

    // warm path: build with UIView, then grow to UILabel + CGRectMake
    let warm_out = dir.path().join("warm");
    run(references(&["UIView"]), &warm_out);
    let report = run(references_with_call(&["UILabel"], "CGRectMake"), &warm_out);
    assert!(!report.cold);

    // cold path: build the final references from scratch
    let cold_out = dir.path().join("cold");
    run(references_with_call(&["UILabel"], "CGRectMake"), &cold_out);

    let warm_files = snapshot(&warm_out);
    let cold_files = snapshot(&cold_out);
    assert_eq!(warm_files, cold_files);
}

#[test]
fn test_shrinking_references_deletes_stale_wrappers() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    run(references(&["UILabel"]), &out);
    assert!(out.join("uikit/uilabel.js").exists());

    let report = run(references(&["UIView"]), &out);
    assert!(report.removed.contains(&"uikit/uilabel.js".to_string()));
    assert!(!out.join("uikit/uilabel.js").exists());
    assert!(out.join("uikit/uiview.js").exists());

    // the bootstrap no longer mentions the removed wrapper
    let bootstrap = fs::read_to_string(out.join(BOOTSTRAP_FILENAME)).unwrap();
    assert!(!bootstrap.contains("UILabel"));
    assert!(bootstrap.contains("UIKit/UIView"));
}

#[test]
fn test_unchanged_rerun_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    run(references(&["UILabel"]), &out);
    let before = snapshot(&out);

    let report = run(references(&["UILabel"]), &out);
    assert!(!report.cold);
    assert!(report.written.is_empty());
    assert!(report.removed.is_empty());
    assert_eq!(snapshot(&out), before);
}

#[test]
fn test_member_reference_change_rewrites_retained_wrappers() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    run(references(&["UIView"]), &out);

    // same types, but now only `frame` is referenced, so the retained
    // wrapper's contents change
    let mut narrowed = references(&["UIView"]);
    narrowed
        .entry("app.js")
        .reference_member("frame", MemberRefs::GETTER);
    let report = BuildPipeline::new(metabase(), narrowed.clone(), &out)
        .run()
        .unwrap();
    assert!(!report.cold);
    assert!(report.written.contains(&"uikit/uiview.js".to_string()));

    let cold_out = dir.path().join("cold");
    BuildPipeline::new(metabase(), narrowed, &cold_out)
        .run()
        .unwrap();
    assert_eq!(snapshot(&out), snapshot(&cold_out));
}

#[test]
fn test_damaged_cache_degrades_to_cold_build() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let cache = dir.path().join("cache");

    BuildPipeline::new(metabase(), references(&["UILabel"]), &out)
        .with_cache_dir(&cache)
        .run()
        .unwrap();
    fs::write(cache.join("classes.json"), "not json at all").unwrap();

    let report = BuildPipeline::new(metabase(), references(&["UILabel"]), &out)
        .with_cache_dir(&cache)
        .run()
        .unwrap();
    assert!(report.cold);
    assert_eq!(report.written.len(), report.total);
    assert!(out.join("uikit/uilabel.js").exists());
}

#[test]
fn test_extra_seed_survives_with_no_references() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let mut pipeline = BuildPipeline::new(metabase(), references(&["UIView"]), &out);
    pipeline.require_type("UILabel");
    pipeline.run().unwrap();

    // UILabel is kept even though no source file requires it
    assert!(out.join("uikit/uilabel.js").exists());
}
