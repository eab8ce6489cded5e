//! Evidence uploader: validation, storage layout and rollback.

use std::sync::atomic::Ordering;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use tcm_lib::error::AppError;
use tcm_lib::models::{
    AttachmentMetadata, CaptureRequest, EvidenceFile, Execution, Outcome,
};

use super::test_helpers::*;

async fn open_execution(world: &World) -> Execution {
    let (suite, _) = world.seed_suite(&[2, 1]).await;
    world.start(suite.id).await.current_execution.unwrap()
}

fn png(len: usize) -> EvidenceFile {
    EvidenceFile {
        file_name: "checkout.png".to_string(),
        content_type: "image/png".to_string(),
        data: png_bytes(len),
    }
}

fn metadata_for(execution: &Execution) -> AttachmentMetadata {
    let (test_case_id, platform_test_case_id) = execution.case.to_columns();
    AttachmentMetadata {
        test_case_id,
        platform_test_case_id,
        step_number: Some(1),
        description: Some("After submit".to_string()),
    }
}

#[actix_rt::test]
async fn test_upload_stores_object_and_row() {
    let world = World::new();
    let execution = open_execution(&world).await;
    let file = png(1024);
    let expected_checksum = hex::encode(Sha256::digest(&file.data));

    let attachment = world
        .services
        .evidence
        .upload(&world.user, execution.id, file, metadata_for(&execution))
        .await
        .unwrap();

    assert!(attachment.storage_path.starts_with(&format!(
        "{}/executions/{}/",
        world.user.user_id, execution.id
    )));
    assert!(attachment.storage_path.ends_with(".png"));
    assert_eq!(attachment.size_bytes, 1024);
    assert_eq!(attachment.checksum_sha256, expected_checksum);
    assert_eq!(attachment.step_number, Some(1));
    assert_eq!(world.objects.keys(), vec![attachment.storage_path.clone()]);
    assert_eq!(world.db.attachment_count(), 1);

    let listed = world
        .services
        .evidence
        .list(&world.user, execution.id)
        .await
        .unwrap();
    assert_eq!(listed, vec![attachment]);
}

#[actix_rt::test]
async fn test_rejected_uploads_create_nothing() {
    let world = World::new();
    let execution = open_execution(&world).await;
    let evidence = &world.services.evidence;

    let mut svg = png(100);
    svg.content_type = "image/svg+xml".to_string();
    let err = evidence
        .upload(&world.user, execution.id, svg, metadata_for(&execution))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnsupportedMediaType(_)));

    let err = evidence
        .upload(
            &world.user,
            execution.id,
            png(MAX_ATTACHMENT_SIZE + 1),
            metadata_for(&execution),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge(_)));

    let mut other_case = metadata_for(&execution);
    other_case.test_case_id = Some(uuid::Uuid::new_v4());
    other_case.platform_test_case_id = None;
    let err = evidence
        .upload(&world.user, execution.id, png(10), other_case)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = evidence
        .upload(&world.stranger(), execution.id, png(10), metadata_for(&execution))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    assert!(world.objects.keys().is_empty());
    assert_eq!(world.db.attachment_count(), 0);
}

#[actix_rt::test]
async fn test_size_ceiling_is_inclusive() {
    let world = World::new();
    let execution = open_execution(&world).await;

    world
        .services
        .evidence
        .upload(
            &world.user,
            execution.id,
            png(MAX_ATTACHMENT_SIZE),
            metadata_for(&execution),
        )
        .await
        .unwrap();
}

#[actix_rt::test]
async fn test_failed_insert_rolls_back_object() {
    let world = World::new();
    let execution = open_execution(&world).await;
    world.db.fail_attachment_insert.store(true, Ordering::SeqCst);

    let err = world
        .services
        .evidence
        .upload(&world.user, execution.id, png(64), metadata_for(&execution))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert!(world.objects.keys().is_empty());
    assert_eq!(world.db.attachment_count(), 0);
}

#[actix_rt::test]
async fn test_failed_rollback_still_reports_insert_error() {
    let world = World::new();
    let execution = open_execution(&world).await;
    world.db.fail_attachment_insert.store(true, Ordering::SeqCst);
    world.objects.fail_delete.store(true, Ordering::SeqCst);

    let err = world
        .services
        .evidence
        .upload(&world.user, execution.id, png(64), metadata_for(&execution))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    // Orphaned object stays behind; no row references it
    assert_eq!(world.objects.keys().len(), 1);
    assert_eq!(world.db.attachment_count(), 0);
}

#[actix_rt::test]
async fn test_failed_put_records_nothing() {
    let world = World::new();
    let execution = open_execution(&world).await;
    world.objects.fail_put.store(true, Ordering::SeqCst);

    let err = world
        .services
        .evidence
        .upload(&world.user, execution.id, png(64), metadata_for(&execution))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
    assert_eq!(world.db.attachment_count(), 0);
}

#[actix_rt::test]
async fn test_upload_allowed_after_finalize() {
    let world = World::new();
    let execution = open_execution(&world).await;
    world
        .services
        .executor
        .finalize(&world.user, execution.id, finalize_req(Outcome::Failed, Some("broken")))
        .await
        .unwrap();

    world
        .services
        .evidence
        .upload(&world.user, execution.id, png(32), metadata_for(&execution))
        .await
        .unwrap();
}

#[actix_rt::test]
async fn test_capture_decodes_data_url() {
    let world = World::new();
    let execution = open_execution(&world).await;
    let bytes = png_bytes(300);
    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));

    let attachment = world
        .services
        .evidence
        .capture(
            &world.user,
            execution.id,
            CaptureRequest {
                data_url,
                file_name: None,
                metadata: metadata_for(&execution),
            },
        )
        .await
        .unwrap();

    assert_eq!(attachment.size_bytes, 300);
    assert_eq!(world.objects.get(&attachment.storage_path), Some(bytes));
}

#[actix_rt::test]
async fn test_signed_url_and_delete() {
    let world = World::new();
    let execution = open_execution(&world).await;
    let evidence = &world.services.evidence;
    let attachment = evidence
        .upload(&world.user, execution.id, png(64), metadata_for(&execution))
        .await
        .unwrap();

    let signed = evidence.signed_url(&world.user, attachment.id).await.unwrap();
    assert!(signed.url.contains(&attachment.storage_path));
    assert_eq!(signed.expires_in_secs, 600);

    let err = evidence
        .signed_url(&world.stranger(), attachment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Object removal failure does not fail the delete
    world.objects.fail_delete.store(true, Ordering::SeqCst);
    evidence.delete(&world.user, attachment.id).await.unwrap();
    assert_eq!(world.db.attachment_count(), 0);

    let err = evidence.delete(&world.user, attachment.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
