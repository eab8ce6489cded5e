//! Database queries for evidence attachments.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::entity::attachment::{self, ActiveModel, Entity as AttachmentEntity};
use crate::error::{AppError, AppResult};
use crate::models::{Attachment, CaseRef};
use crate::repository::AttachmentRepository;

use super::{DbPool, read_error, write_error};

impl TryFrom<attachment::Model> for Attachment {
    type Error = AppError;

    fn try_from(m: attachment::Model) -> AppResult<Self> {
        Ok(Attachment {
            id: m.id,
            user_id: m.user_id,
            execution_id: m.execution_id,
            case: CaseRef::from_columns(m.test_case_id, m.platform_test_case_id)?,
            step_number: m.step_number,
            description: m.description,
            file_name: m.file_name,
            storage_path: m.storage_path,
            content_type: m.content_type,
            size_bytes: m.size_bytes,
            checksum_sha256: m.checksum_sha256,
            created_at: m.created_at,
        })
    }
}

#[async_trait]
impl AttachmentRepository for DbPool {
    async fn insert_attachment(&self, a: &Attachment) -> AppResult<()> {
        let (test_case_id, platform_test_case_id) = a.case.to_columns();
        let model = ActiveModel {
            id: Set(a.id),
            user_id: Set(a.user_id),
            execution_id: Set(a.execution_id),
            test_case_id: Set(test_case_id),
            platform_test_case_id: Set(platform_test_case_id),
            step_number: Set(a.step_number),
            description: Set(a.description.clone()),
            file_name: Set(a.file_name.clone()),
            storage_path: Set(a.storage_path.clone()),
            content_type: Set(a.content_type.clone()),
            size_bytes: Set(a.size_bytes),
            checksum_sha256: Set(a.checksum_sha256.clone()),
            created_at: Set(a.created_at),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| write_error("insert attachment", e))?;

        Ok(())
    }

    async fn get_attachment(&self, id: Uuid) -> AppResult<Option<Attachment>> {
        AttachmentEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| read_error("get attachment", e))?
            .map(Attachment::try_from)
            .transpose()
    }

    async fn list_attachments(&self, execution_id: Uuid) -> AppResult<Vec<Attachment>> {
        AttachmentEntity::find()
            .filter(attachment::Column::ExecutionId.eq(execution_id))
            .order_by_asc(attachment::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| read_error("list attachments", e))?
            .into_iter()
            .map(Attachment::try_from)
            .collect()
    }

    async fn delete_attachment(&self, id: Uuid) -> AppResult<bool> {
        let result = AttachmentEntity::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| write_error("delete attachment", e))?;

        Ok(result.rows_affected > 0)
    }
}
