//! Integration tests for tree structure maintenance.

mod helpers;

use drivebox_core::error::ErrorKind;
use drivebox_service::folder::MoveNodeRequest;
use drivebox_service::NodeSelection;
use helpers::TestDrive;

#[tokio::test]
async fn test_bounds_stay_tiled_through_mixed_mutations() {
    let drive = TestDrive::new();
    let owner = drive.owner;
    let index = &drive.engine.index;

    drive.mkdir(None, "Docs").await;
    index.verify(owner).await.unwrap();

    drive.upload(Some("/Docs"), "a.txt", b"alpha").await;
    index.verify(owner).await.unwrap();

    let sub = drive.mkdir(Some("/Docs"), "Sub").await;
    index.verify(owner).await.unwrap();

    drive.upload(Some("/Docs/Sub"), "b.txt", b"beta").await;
    index.verify(owner).await.unwrap();

    drive
        .engine
        .folders
        .move_node(
            owner,
            MoveNodeRequest {
                id: sub.id,
                new_parent_path: None,
            },
        )
        .await
        .unwrap();
    index.verify(owner).await.unwrap();

    drive
        .engine
        .trash
        .move_to_trash(owner, &NodeSelection::of_ids(vec![sub.id]))
        .await
        .unwrap();
    index.verify(owner).await.unwrap();

    drive
        .engine
        .trash
        .delete_forever(owner, &NodeSelection::of_ids(vec![sub.id]))
        .await
        .unwrap();
    index.verify(owner).await.unwrap();
}

#[tokio::test]
async fn test_new_nodes_are_leaves() {
    let drive = TestDrive::new();
    let file = drive.upload(None, "single.txt", b"x").await;
    assert_eq!(file.rgt - file.lft, 1);

    let subtree = drive
        .engine
        .index
        .subtree(drive.owner, file.id)
        .await
        .unwrap();
    assert_eq!(subtree.len(), 1);
    assert_eq!(subtree[0].id, file.id);
}

#[tokio::test]
async fn test_subtree_starts_with_the_node_itself() {
    let drive = TestDrive::new();
    let docs = drive.mkdir(None, "Docs").await;
    drive.upload(Some("/Docs"), "a.txt", b"a").await;
    drive.mkdir(Some("/Docs"), "Sub").await;

    let subtree = drive
        .engine
        .index
        .subtree(drive.owner, docs.id)
        .await
        .unwrap();
    assert_eq!(subtree[0].id, docs.id);
    assert_eq!(subtree.len(), 3);
    // lft ascending means parents come before their contents.
    assert!(subtree.windows(2).all(|w| w[0].lft < w[1].lft));
}

#[tokio::test]
async fn test_move_rewrites_nested_paths() {
    let drive = TestDrive::new();
    let owner = drive.owner;
    let a = drive.mkdir(None, "A").await;
    drive.mkdir(Some("/A"), "B").await;
    drive.upload(Some("/A/B"), "c.txt", b"c").await;
    drive.mkdir(None, "D").await;

    drive
        .engine
        .folders
        .move_node(
            owner,
            MoveNodeRequest {
                id: a.id,
                new_parent_path: Some("/D".into()),
            },
        )
        .await
        .unwrap();

    let index = &drive.engine.index;
    assert!(index
        .find_by_path(owner, "/D/A/B/c.txt")
        .await
        .unwrap()
        .is_some());
    assert!(index.find_by_path(owner, "/A").await.unwrap().is_none());
    index.verify(owner).await.unwrap();
}

#[tokio::test]
async fn test_move_into_descendant_is_rejected() {
    let drive = TestDrive::new();
    let a = drive.mkdir(None, "A").await;
    drive.mkdir(Some("/A"), "B").await;

    let err = drive
        .engine
        .folders
        .move_node(
            drive.owner,
            MoveNodeRequest {
                id: a.id,
                new_parent_path: Some("/A/B".into()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cycle);

    // Nothing moved, bounds untouched.
    assert!(drive
        .engine
        .index
        .find_by_path(drive.owner, "/A/B")
        .await
        .unwrap()
        .is_some());
    drive.engine.index.verify(drive.owner).await.unwrap();
}

#[tokio::test]
async fn test_owners_never_see_each_other() {
    let drive = TestDrive::new();
    let docs = drive.mkdir(None, "Docs").await;

    let other = uuid::Uuid::new_v4();
    assert!(drive
        .engine
        .index
        .find(other, docs.id)
        .await
        .unwrap()
        .is_none());

    // The other owner can use the same folder name freely.
    drive
        .engine
        .folders
        .create_folder(
            other,
            drivebox_service::folder::CreateFolderRequest {
                parent_path: None,
                name: "Docs".into(),
            },
        )
        .await
        .unwrap();
    drive.engine.index.verify(other).await.unwrap();
}
