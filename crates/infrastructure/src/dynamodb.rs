use crate::models::ATTR_ID;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use domain::TaskError;
use shared::Config;
use tracing::{debug, info};

/// tasks テーブルへの接続ハンドル
#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
}

impl DynamoDbClient {
    /// 設定からクライアントを作成
    /// DYNAMODB_ENDPOINT が指定されていれば DynamoDB Local などへ接続する
    pub async fn new(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));

        if let Some(endpoint) = &config.dynamodb_endpoint {
            debug!(endpoint = %endpoint, "DynamoDB エンドポイントを上書き");
            loader = loader.endpoint_url(endpoint);
        }

        let aws_config = loader.load().await;

        Self {
            client: Client::new(&aws_config),
            table_name: config.dynamodb_table.clone(),
        }
    }

    /// 既存の SDK クライアントから作成（テスト用の接続設定などに使う）
    pub fn from_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// SDK エラーを TaskError に変換
    pub fn convert_error<E, R>(&self, error: SdkError<E, R>) -> TaskError
    where
        E: std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        TaskError::DynamoDb(format!(
            "{} ({})",
            DisplayErrorContext(&error),
            self.table_name
        ))
    }

    /// テーブルが無ければ作成する（ローカル環境向け）
    pub async fn ensure_table(&self) -> Result<(), TaskError> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => {
                debug!(table = %self.table_name, "テーブルは既に存在します");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .map(|err| err.is_resource_not_found_exception())
                    .unwrap_or(false) =>
            {
                self.create_table().await
            }
            Err(e) => Err(self.convert_error(e)),
        }
    }

    async fn create_table(&self) -> Result<(), TaskError> {
        info!(table = %self.table_name, "テーブルを作成中");

        let key_attribute = AttributeDefinition::builder()
            .attribute_name(ATTR_ID)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| TaskError::Internal(e.to_string()))?;

        let key_schema = KeySchemaElement::builder()
            .attribute_name(ATTR_ID)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| TaskError::Internal(e.to_string()))?;

        self.client
            .create_table()
            .table_name(&self.table_name)
            .billing_mode(BillingMode::PayPerRequest)
            .attribute_definitions(key_attribute)
            .key_schema(key_schema)
            .send()
            .await
            .map_err(|e| self.convert_error(e))?;

        info!(table = %self.table_name, "テーブル作成完了");
        Ok(())
    }
}
