use aws_sdk_dynamodb::types::AttributeValue;
use domain::{NewTask, Task, TaskId};
use std::collections::HashMap;

/// tasks テーブルの属性名
pub const ATTR_ID: &str = "id";
pub const ATTR_TEXT: &str = "text";
pub const ATTR_COMPLETED: &str = "completed";
pub const ATTR_DEADLINE: &str = "deadline";

/// tasks テーブルのアイテム
#[derive(Debug, Clone)]
pub struct TaskItem {
    pub id: TaskId,
    pub document: NewTask,
}

impl TaskItem {
    pub fn new(id: TaskId, document: NewTask) -> Self {
        Self { id, document }
    }

    /// DynamoDB AttributeValue マップに変換
    pub fn to_attribute_map(&self) -> HashMap<String, AttributeValue> {
        let mut map = HashMap::new();

        map.insert(ATTR_ID.to_string(), AttributeValue::S(self.id.as_str().to_string()));
        map.insert(ATTR_TEXT.to_string(), AttributeValue::S(self.document.text.clone()));
        map.insert(
            ATTR_COMPLETED.to_string(),
            AttributeValue::Bool(self.document.completed),
        );
        map.insert(
            ATTR_DEADLINE.to_string(),
            AttributeValue::S(self.document.deadline.clone()),
        );

        map
    }

    /// DynamoDB AttributeValue マップから復元
    pub fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Result<Self, String> {
        let id = map
            .get(ATTR_ID)
            .and_then(|v| v.as_s().ok())
            .ok_or("Missing id")?
            .clone();
        let id = TaskId::from_string(id).map_err(|e| e.to_string())?;

        let text = map
            .get(ATTR_TEXT)
            .and_then(|v| v.as_s().ok())
            .ok_or("Missing text")?
            .clone();

        // 欠けている completed は未完了として扱う
        let completed = map
            .get(ATTR_COMPLETED)
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(false);

        let deadline = map
            .get(ATTR_DEADLINE)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            id,
            document: NewTask {
                text,
                completed,
                deadline,
            },
        })
    }

    pub fn into_task(self) -> Task {
        Task::from_new(self.id, self.document)
    }
}
