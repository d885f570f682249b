//! [`StoreClient`] backed by an Amazon DynamoDB table.
//!
//! The table has a String partition key `entityId` and a String sort key
//! `sortKey`. Secondary-index names come from the caller; the indexes
//! themselves are provisioned outside this crate.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::StoreError;
use crate::record::{ENTITY_ID, SORT_KEY};

use super::{Condition, Item, RecordKey, StoreClient, StoreResult, WriteOp};

/// DynamoDB's cap on operations in one TransactWriteItems call.
pub const MAX_TRANSACTION_ITEMS: usize = 25;

/// DynamoDB store configuration.
#[derive(Debug, Clone)]
pub struct DynamoConfig {
    pub table_name: String,
    /// AWS region (uses the SDK default if not specified).
    pub region: Option<String>,
    /// Endpoint override, e.g. LocalStack.
    pub endpoint: Option<String>,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table_name: "Book".to_string(),
            region: None,
            endpoint: None,
        }
    }
}

/// Book table in DynamoDB.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
}

impl std::fmt::Debug for DynamoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl DynamoStore {
    /// Build a client from the shared SDK configuration plus overrides.
    pub fn new(sdk_config: &aws_config::SdkConfig, config: DynamoConfig) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region));
        }
        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Self {
            client: Client::from_conf(builder.build()),
            table_name: config.table_name,
        }
    }

    /// Create from a pre-built client.
    pub fn from_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Run a key-condition query, following pagination to the end.
    async fn query_all(
        &self,
        index_name: Option<&str>,
        attribute: &str,
        value: AttributeValue,
    ) -> StoreResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let response = self
                .client
                .query()
                .table_name(&self.table_name)
                .set_index_name(index_name.map(str::to_string))
                .key_condition_expression("#k = :v")
                .expression_attribute_names("#k", attribute)
                .expression_attribute_values(":v", value.clone())
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    StoreError::backend(format!(
                        "DynamoDB Query failed: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;

            items.extend(response.items().iter().map(from_attribute_map));

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(items)
    }

    fn transact_item(&self, op: WriteOp) -> StoreResult<TransactWriteItem> {
        match op {
            WriteOp::Put {
                item, condition, ..
            } => {
                let mut put = Put::builder()
                    .table_name(&self.table_name)
                    .set_item(Some(to_attribute_map(&item)?));
                if let Some(Condition::AttributeNotExists(attr)) = condition {
                    put = put
                        .condition_expression("attribute_not_exists(#c)")
                        .expression_attribute_names("#c", attr);
                }
                let put = put
                    .build()
                    .map_err(|e| StoreError::MalformedItem(e.to_string()))?;
                Ok(TransactWriteItem::builder().put(put).build())
            }
            WriteOp::Delete { key } => {
                let delete = Delete::builder()
                    .table_name(&self.table_name)
                    .key(ENTITY_ID, AttributeValue::S(key.entity_id))
                    .key(SORT_KEY, AttributeValue::S(key.sort_key))
                    .build()
                    .map_err(|e| StoreError::MalformedItem(e.to_string()))?;
                Ok(TransactWriteItem::builder().delete(delete).build())
            }
        }
    }
}

#[async_trait]
impl StoreClient for DynamoStore {
    async fn get_by_key(&self, key: &RecordKey) -> StoreResult<Option<Item>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ENTITY_ID, AttributeValue::S(key.entity_id.clone()))
            .key(SORT_KEY, AttributeValue::S(key.sort_key.clone()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                StoreError::backend(format!(
                    "DynamoDB GetItem failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(response.item().map(from_attribute_map))
    }

    async fn query_index(
        &self,
        index_name: &str,
        key_attribute: &str,
        value: &Value,
    ) -> StoreResult<Vec<Item>> {
        self.query_all(Some(index_name), key_attribute, to_attribute(value))
            .await
    }

    async fn query_by_partition(&self, entity_id: &str) -> StoreResult<Vec<Item>> {
        self.query_all(None, ENTITY_ID, AttributeValue::S(entity_id.to_string()))
            .await
    }

    async fn scan(
        &self,
        filter_attribute: &str,
        filter_value: &Value,
        limit: usize,
    ) -> StoreResult<Vec<Item>> {
        let mut items = Vec::new();
        if limit == 0 {
            return Ok(items);
        }
        let page_limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let mut start_key = None;
        loop {
            let response = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("#f = :v")
                .expression_attribute_names("#f", filter_attribute)
                .expression_attribute_values(":v", to_attribute(filter_value))
                .limit(page_limit)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    StoreError::backend(format!(
                        "DynamoDB Scan failed: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;

            let remaining = limit - items.len();
            items.extend(
                response
                    .items()
                    .iter()
                    .take(remaining)
                    .map(from_attribute_map),
            );
            if items.len() >= limit {
                break;
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(items)
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        if ops.len() > MAX_TRANSACTION_ITEMS {
            return Err(StoreError::TooManyItems {
                max: MAX_TRANSACTION_ITEMS,
                actual: ops.len(),
            });
        }

        let keys: Vec<RecordKey> = ops.iter().map(|op| op.key().clone()).collect();
        let items = ops
            .into_iter()
            .map(|op| self.transact_item(op))
            .collect::<StoreResult<Vec<_>>>()?;

        debug!(table = %self.table_name, items = items.len(), "TransactWriteItems");
        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|e| transact_error(e, &keys))?;
        Ok(())
    }
}

/// Map a failed TransactWriteItems call, pinning a failed condition to the key
/// of the operation that caused it.
fn transact_error<R>(err: SdkError<TransactWriteItemsError, R>, keys: &[RecordKey]) -> StoreError
where
    R: std::fmt::Debug,
{
    if let Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) =
        err.as_service_error()
        && let Some(position) = cancelled
            .cancellation_reasons()
            .iter()
            .position(|reason| reason.code() == Some("ConditionalCheckFailed"))
        && let Some(key) = keys.get(position)
    {
        return StoreError::ConditionFailed { key: key.clone() };
    }
    StoreError::backend(format!(
        "DynamoDB TransactWriteItems failed: {}",
        DisplayErrorContext(&err)
    ))
}

fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

fn to_attribute_map(item: &Item) -> StoreResult<HashMap<String, AttributeValue>> {
    match item {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), to_attribute(v)))
            .collect()),
        other => Err(StoreError::MalformedItem(format!(
            "item must be an object, got {other}"
        ))),
    }
}

fn from_attribute(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::L(values) => Value::Array(values.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute(v)))
                .collect(),
        ),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => Value::Array(values.iter().map(|n| parse_number(n)).collect()),
        _ => Value::Null,
    }
}

fn parse_number(n: &str) -> Value {
    n.parse::<i64>()
        .map(Value::from)
        .or_else(|_| n.parse::<f64>().map(Value::from))
        .unwrap_or_else(|_| Value::String(n.to_string()))
}

fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Item {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), from_attribute(v)))
            .collect::<Map<String, Value>>(),
    )
}
