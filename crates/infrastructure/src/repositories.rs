use crate::models::{TaskItem, ATTR_COMPLETED, ATTR_DEADLINE, ATTR_ID, ATTR_TEXT};
use crate::{DynamoDbClient, TaskStore};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use domain::{NewTask, Task, TaskError, TaskId, TaskPatch};
use std::collections::HashMap;
use tracing::{debug, error, info};

/// DynamoDB の tasks テーブルを使うタスクストア
#[derive(Clone)]
pub struct DynamoTaskStore {
    db: DynamoDbClient,
}

impl DynamoTaskStore {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for DynamoTaskStore {
    async fn list_all(&self) -> Result<Vec<Task>, TaskError> {
        info!(table = %self.db.table_name(), "タスク一覧を取得中");

        let mut tasks = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = self
                .db
                .client()
                .scan()
                .table_name(self.db.table_name())
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| self.db.convert_error(e))?;

            for item in output.items() {
                match TaskItem::from_attribute_map(item) {
                    Ok(item) => tasks.push(item.into_task()),
                    Err(e) => {
                        error!("タスクアイテムの変換エラー: {}", e);
                        continue;
                    }
                }
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!("タスク一覧取得完了: {} 件", tasks.len());
        Ok(tasks)
    }

    async fn create(&self, task: NewTask) -> Result<TaskId, TaskError> {
        let id = TaskId::from_string(ulid::Ulid::new().to_string())?;
        info!(task_id = %id, "タスクを作成中");

        let item = TaskItem::new(id.clone(), task);

        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item.to_attribute_map()))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", ATTR_ID)
            .send()
            .await
            .map_err(|e| self.db.convert_error(e))?;

        debug!(task_id = %id, "タスク作成完了");
        Ok(id)
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskError> {
        if patch.is_empty() {
            debug!(task_id = %id, "更新するフィールドがありません");
            return Ok(());
        }

        info!(task_id = %id, "タスクを更新中");

        let mut update_parts = Vec::new();
        let mut builder = self
            .db
            .client()
            .update_item()
            .table_name(self.db.table_name())
            .key(ATTR_ID, AttributeValue::S(id.as_str().to_string()))
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", ATTR_ID);

        if let Some(text) = patch.text {
            update_parts.push("#text = :text");
            builder = builder
                .expression_attribute_names("#text", ATTR_TEXT)
                .expression_attribute_values(":text", AttributeValue::S(text));
        }

        if let Some(completed) = patch.completed {
            update_parts.push("#completed = :completed");
            builder = builder
                .expression_attribute_names("#completed", ATTR_COMPLETED)
                .expression_attribute_values(":completed", AttributeValue::Bool(completed));
        }

        if let Some(deadline) = patch.deadline {
            update_parts.push("#deadline = :deadline");
            builder = builder
                .expression_attribute_names("#deadline", ATTR_DEADLINE)
                .expression_attribute_values(":deadline", AttributeValue::S(deadline));
        }

        builder
            .update_expression(format!("SET {}", update_parts.join(", ")))
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|err| err.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if missing {
                    TaskError::NotFound(id.to_string())
                } else {
                    self.db.convert_error(e)
                }
            })?;

        debug!(task_id = %id, "タスク更新完了");
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), TaskError> {
        info!(task_id = %id, "タスクを削除中");

        self.db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .key(ATTR_ID, AttributeValue::S(id.as_str().to_string()))
            .send()
            .await
            .map_err(|e| self.db.convert_error(e))?;

        debug!(task_id = %id, "タスク削除完了");
        Ok(())
    }
}
