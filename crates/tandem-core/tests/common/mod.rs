#![allow(dead_code)]
use tandem_core::{ArtifactTree, GitMetadata, ResourceId};

pub const PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAI tandem";

/// Returns complete metadata for a root resource.
pub fn root_metadata(root: &str) -> GitMetadata {
    GitMetadata::for_root(
        ResourceId::new(root),
        "inventory",
        "git@github.com:acme/inventory.git",
        "main",
        PUBLIC_KEY,
    )
}

/// Returns a small artifact tree with nested documents.
pub fn sample_artifact() -> ArtifactTree {
    ArtifactTree::new()
        .with_file("application.json", r#"{"name":"Inventory"}"#)
        .and_then(|t| t.with_file("pages/home/page.json", r#"{"layout":[]}"#))
        .and_then(|t| t.with_file("pages/home/queries/list.json", r#"{"sql":"select 1"}"#))
        .expect("valid artifact paths")
}
