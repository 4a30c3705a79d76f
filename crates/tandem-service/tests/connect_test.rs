//! Integration tests for connecting and disconnecting a lineage.

mod common;

use std::fs;

use common::{Harness, PUBLIC_KEY, ROOT, WORKSPACE, author, git};
use tandem_core::{Caller, GitProfile, GitSyncError, Resource, ResourceId};
use tandem_git::worktree::SEED_MESSAGE;
use tandem_service::ConnectRequest;

#[tokio::test]
async fn test_connect_persists_default_branch_and_seed() {
    let h = Harness::new().await;

    let root = h
        .service
        .connect(&h.caller, &h.root_id, h.connect_request())
        .await
        .unwrap();

    let git = root.git.as_ref().unwrap();
    assert_eq!(git.branch_name(), Some("main"));
    assert_eq!(git.repo_name.as_deref(), Some("app"));
    assert_eq!(git.cached_public_key.as_deref(), Some(PUBLIC_KEY));
    assert_eq!(git.credential_ref.as_ref(), Some(&h.root_id));
    assert!(root.is_root());
    assert_eq!(h.root(), root);

    let seed = fs::read_to_string(h.worktree().join("README.md")).unwrap();
    assert!(seed.contains("https://app.example/app1/applications/pages/home"));
    assert!(seed.contains("https://app.example/app1/applications/pages/home/edit"));
}

#[tokio::test]
async fn test_connect_commits_seed_as_caller() {
    let h = Harness::connected().await;

    let history = h
        .service
        .get_commit_history(&h.caller, &h.root_id, "main")
        .await
        .unwrap();
    let messages: Vec<&str> = history.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec![SEED_MESSAGE, "Initial commit"]);
    assert_eq!(history[0].author_name, "Jane Doe");
    assert_eq!(git(&h.worktree(), &["ls-files"]).trim(), "README.md");
}

#[tokio::test]
async fn test_connect_to_empty_remote_has_born_branch() {
    let h = Harness::connected_to_empty().await;

    let history = h
        .service
        .get_commit_history(&h.caller, &h.root_id, "main")
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message, SEED_MESSAGE);
    assert!(h.worktree().join(".git/refs/heads").is_dir());

    let status = h
        .service
        .get_status(&h.caller, &h.root_id, "main")
        .await
        .unwrap();
    assert!(status.is_clean);
}

#[tokio::test]
async fn test_connect_requires_author_profile() {
    let h = Harness::new().await;

    let err = h
        .service
        .connect(&Caller::new("stranger"), &h.root_id, h.connect_request())
        .await
        .unwrap_err();

    assert!(err.is_invalid_configuration());
    assert!(!h.worktree().exists());
    assert!(h.root().git.is_none());
}

#[tokio::test]
async fn test_failed_seed_rolls_back_connection() {
    let h = Harness::new().await;
    let worktree = h.worktree();
    // runs between the clone and the seed write
    h.resources.on_connected_save(move |_| {
        fs::create_dir_all(worktree.join("README.md")).unwrap();
    });

    let err = h
        .service
        .connect(&h.caller, &h.root_id, h.connect_request())
        .await
        .unwrap_err();

    assert!(matches!(err, GitSyncError::Io(_)), "{:?}", err);
    assert!(h.root().git.is_none());
    assert!(!h.worktree().exists());

    let root = h
        .service
        .connect(&h.caller, &h.root_id, h.connect_request())
        .await
        .unwrap();
    assert_eq!(root.branch_name(), Some("main"));
}

#[tokio::test]
async fn test_connect_refuses_non_empty_remote() {
    let h = Harness::new().await;
    h.remote.push_change("main", "notes.txt", "hello", "Add notes");

    let err = h
        .service
        .connect(&h.caller, &h.root_id, h.connect_request())
        .await
        .unwrap_err();

    assert!(matches!(err, GitSyncError::InvalidRepoState(_)));
    assert!(!h.worktree().exists());
    assert!(h.root().git.is_none());
}

#[tokio::test]
async fn test_connect_refuses_non_empty_worktree() {
    let h = Harness::new().await;
    fs::create_dir_all(h.worktree()).unwrap();
    fs::write(h.worktree().join("stray.txt"), "left behind").unwrap();

    let err = h
        .service
        .connect(&h.caller, &h.root_id, h.connect_request())
        .await
        .unwrap_err();

    assert!(matches!(err, GitSyncError::InvalidRepoState(_)));
    assert!(h.worktree().join("stray.txt").exists());
}

#[tokio::test]
async fn test_connect_validates_inputs() {
    let h = Harness::new().await;

    let err = h
        .service
        .connect(&h.caller, &h.root_id, ConnectRequest::new("  ", "https://app.example"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_parameter());

    let err = h
        .service
        .connect(&h.caller, &h.root_id, ConnectRequest::new(&h.remote.remote_url, ""))
        .await
        .unwrap_err();
    assert!(err.is_invalid_parameter());

    let err = h
        .service
        .connect(
            &h.caller,
            &h.root_id,
            ConnectRequest::new("git@github.com:user/app", "https://app.example"),
        )
        .await
        .unwrap_err();
    assert!(err.is_invalid_configuration());
}

#[tokio::test]
async fn test_connect_requires_credential() {
    let h = Harness::new().await;
    let other = ResourceId::new("app2");
    h.resources.insert(Resource::new(other.clone(), WORKSPACE, "Orders"));

    let err = h
        .service
        .connect(&h.caller, &other, h.connect_request())
        .await
        .unwrap_err();

    assert!(matches!(err, GitSyncError::InvalidGitCredentials(_)));
}

#[tokio::test]
async fn test_connect_unknown_resource() {
    let h = Harness::new().await;

    let err = h
        .service
        .connect(&h.caller, &ResourceId::new("missing"), h.connect_request())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_connect_stores_lineage_profile() {
    let h = Harness::new().await;
    let profile = GitProfile::new("Ada", "ada@work.example");

    h.service
        .connect(
            &h.caller,
            &h.root_id,
            h.connect_request().with_profile(profile.clone(), false),
        )
        .await
        .unwrap();

    let lineage = h
        .service
        .get_profile(&h.caller, Some(&h.root_id))
        .await
        .unwrap();
    let default = h.service.get_profile(&h.caller, None).await.unwrap();

    assert_eq!(lineage, Some(profile));
    assert_eq!(default, Some(author()));
}

#[tokio::test]
async fn test_denied_caller_sees_not_found() {
    let h = Harness::new().await;
    h.authorizer.deny(&h.root_id);

    let err = h
        .service
        .connect(&h.caller, &h.root_id, h.connect_request())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(h.root().git.is_none());
}

#[tokio::test]
async fn test_get_metadata_view() {
    let h = Harness::connected().await;

    let view = h
        .service
        .get_metadata(&h.caller, &h.root_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view.public_key, PUBLIC_KEY);
    assert_eq!(view.metadata.branch_name(), Some("main"));
    assert_eq!(view.profiles.default, Some(author()));
    assert_eq!(view.profiles.lineage, None);

    let json = serde_json::to_string(&view).unwrap();
    assert!(!json.contains("PRIVATE KEY"));
}

#[tokio::test]
async fn test_get_metadata_of_unconnected_root_is_none() {
    let h = Harness::new().await;

    let view = h.service.get_metadata(&h.caller, &h.root_id).await.unwrap();

    assert!(view.is_none());
}

#[tokio::test]
async fn test_get_metadata_rejects_branch_record() {
    let h = Harness::connected().await;
    let branch = h
        .service
        .create_branch(&h.caller, &h.root_id, "main", "feature")
        .await
        .unwrap();

    let err = h
        .service
        .get_metadata(&h.caller, &branch.id)
        .await
        .unwrap_err();

    assert!(err.is_invalid_parameter());
}

#[tokio::test]
async fn test_disconnect_clears_lineage() {
    let h = Harness::connected().await;
    let branch = h
        .service
        .create_branch(&h.caller, &h.root_id, "main", "feature")
        .await
        .unwrap();

    let root = h.service.disconnect(&h.caller, &h.root_id).await.unwrap();

    assert_eq!(root.id.as_str(), ROOT);
    assert!(root.git.is_none());
    assert!(h.resources.get(&branch.id).unwrap().git.is_none());
    assert!(!h.worktree().exists());
    assert!(
        h.service
            .get_metadata(&h.caller, &h.root_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_disconnect_unconnected_is_noop() {
    let h = Harness::new().await;

    let root = h.service.disconnect(&h.caller, &h.root_id).await.unwrap();

    assert_eq!(root, h.root());
    assert!(root.git.is_none());
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let h = Harness::connected().await;
    h.service.disconnect(&h.caller, &h.root_id).await.unwrap();

    let root = h
        .service
        .connect(&h.caller, &h.root_id, h.connect_request())
        .await
        .unwrap();

    assert_eq!(root.branch_name(), Some("main"));
}
