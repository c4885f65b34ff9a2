//! Layering guardrails for the workspace.
//!
//! `svconform_core` holds pure semantics and must stay free of IO, async and process handling.
//! `svconform_syntax` scans text and must not pull in the runtime or the report layer.
//! These tests scan the member manifests and fail if a forbidden crate appears in `[dependencies]`.

fn dependencies(manifest: &str) -> Vec<String> {
    let mut in_dependencies = false;
    let mut names = Vec::new();

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        if let Some((name, _)) = line_no_comment.split_once('=') {
            names.push(name.trim().to_string());
        }
    }
    names
}

#[test]
fn core_has_no_runtime_dependencies() {
    let manifest = include_str!("../crates/svconform_core/Cargo.toml");
    let deps = dependencies(manifest);
    assert_eq!(deps, vec!["serde".to_string()], "svconform_core may only depend on optional serde");
    let serde_line = manifest.lines().find(|l| l.trim_start().starts_with("serde")).unwrap();
    assert!(serde_line.contains("optional = true"), "serde must stay optional in svconform_core: {}", serde_line);
}

#[test]
fn syntax_does_not_depend_on_runtime_or_reporting() {
    let deps = dependencies(include_str!("../crates/svconform_syntax/Cargo.toml"));
    for forbidden in ["tokio", "serde_json", "toml", "tempfile", "clap"] {
        assert!(
            !deps.iter().any(|d| d == forbidden),
            "`{}` must not appear in svconform_syntax [dependencies]",
            forbidden
        );
    }
    assert!(deps.iter().any(|d| d == "svconform_core"));
}
