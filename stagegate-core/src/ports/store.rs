use std::collections::BTreeMap;

use async_trait::async_trait;
use stagegate_model::{DependencyRecord, DependencyStatus, ModelError, fields};

use crate::error::Result;

/// Single attribute value of a stored item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    S(String),
    N(i64),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(value) => Some(value),
            Self::N(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::N(value) => Some(*value),
            Self::S(raw) => raw.parse().ok(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::N(value)
    }
}

pub type Item = BTreeMap<String, AttributeValue>;

/// Composite primary key of a table: one hash and one range attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub hash_field: String,
    pub hash_value: String,
    pub range_field: String,
    pub range_value: String,
}

impl ItemKey {
    pub fn new(
        hash_field: &str,
        hash_value: impl Into<String>,
        range_field: &str,
        range_value: impl Into<String>,
    ) -> Self {
        Self {
            hash_field: hash_field.to_string(),
            hash_value: hash_value.into(),
            range_field: range_field.to_string(),
            range_value: range_value.into(),
        }
    }

    /// Key of a row in the status table.
    pub fn status(
        correlation_id: impl Into<String>,
        data_product: impl Into<String>,
    ) -> Self {
        Self::new(
            fields::CORRELATION_ID,
            correlation_id,
            fields::DATA_PRODUCT,
            data_product,
        )
    }

    /// Key of a row in the per-collection table.
    pub fn collection(
        correlation_id: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self::new(
            fields::collection::CORRELATION_ID,
            correlation_id,
            fields::collection::COLLECTION_NAME,
            collection,
        )
    }

    pub fn matches(&self, item: &Item) -> bool {
        string_field(item, &self.hash_field) == Some(self.hash_value.as_str())
            && string_field(item, &self.range_field) == Some(self.range_value.as_str())
    }

    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(self.hash_field.clone(), self.hash_value.as_str().into());
        item.insert(self.range_field.clone(), self.range_value.as_str().into());
        item
    }
}

/// Filtered scan over a whole table, one page at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub table: String,
    /// Equality filters on string attributes, all of which must match.
    pub filters: Vec<(String, String)>,
    pub exclusive_start_key: Option<ItemKey>,
}

impl ScanRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            exclusive_start_key: None,
        }
    }

    pub fn filter(mut self, field: &str, value: impl Into<String>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| string_field(item, field) == Some(value.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Present while more of the table remains to be scanned.
    pub last_evaluated_key: Option<ItemKey>,
}

/// Guard evaluated atomically with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCondition {
    None,
    /// Reject the update unless an item with the key already exists.
    ItemExists,
}

/// Key/value table holding stage status rows.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Point lookup. A missing item is `Ok(None)`, not an error.
    async fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>>;

    async fn scan(&self, request: &ScanRequest) -> Result<ScanPage>;

    /// Inserts or fully replaces the item with the same key.
    async fn put_item(&self, table: &str, item: Item) -> Result<()>;

    /// Sets the given attributes on the keyed item.
    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        updates: Item,
        condition: UpdateCondition,
    ) -> Result<()>;
}

/// Follows scan continuation keys until an item passes the request's filters.
pub async fn find_first(
    store: &dyn StatusStore,
    request: ScanRequest,
) -> Result<Option<Item>> {
    let mut request = request;
    loop {
        let page = store.scan(&request).await?;
        if let Some(item) = page.items.into_iter().find(|item| request.matches(item)) {
            return Ok(Some(item));
        }
        match page.last_evaluated_key {
            Some(key) => request.exclusive_start_key = Some(key),
            None => return Ok(None),
        }
    }
}

pub fn string_field<'a>(item: &'a Item, field: &str) -> Option<&'a str> {
    item.get(field).and_then(AttributeValue::as_str)
}

fn required<'a>(
    item: &'a Item,
    field: &'static str,
) -> std::result::Result<&'a str, ModelError> {
    string_field(item, field).ok_or(ModelError::MissingField(field))
}

fn optional(item: &Item, field: &str) -> Option<String> {
    string_field(item, field)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Reads a status-table row.
pub fn decode_dependency(item: &Item) -> Result<DependencyRecord> {
    Ok(DependencyRecord {
        correlation_id: required(item, fields::CORRELATION_ID)?.to_string(),
        data_product: required(item, fields::DATA_PRODUCT)?.to_string(),
        export_date: optional(item, fields::DATE).unwrap_or_default(),
        status: DependencyStatus::parse(required(item, fields::STATUS)?),
        cluster_id: optional(item, fields::CLUSTER_ID),
        snapshot_type: optional(item, fields::SNAPSHOT_TYPE),
        dataset_prefix: optional(item, fields::S3_PREFIX_ANALYTICAL_DATASET),
        snapshots_prefix: optional(item, fields::S3_PREFIX_SNAPSHOTS),
        time_to_live: item
            .get(fields::TIME_TO_EXIST)
            .and_then(AttributeValue::as_number),
    })
}

/// Writes a status-table row, omitting absent optional fields.
pub fn encode_dependency(record: &DependencyRecord) -> Item {
    let key = ItemKey::status(&record.correlation_id, &record.data_product);
    let mut item = key.to_item();
    item.insert(fields::DATE.to_string(), record.export_date.as_str().into());
    item.insert(fields::STATUS.to_string(), record.status.as_str().into());

    let optional_fields = [
        (fields::CLUSTER_ID, &record.cluster_id),
        (fields::SNAPSHOT_TYPE, &record.snapshot_type),
        (fields::S3_PREFIX_ANALYTICAL_DATASET, &record.dataset_prefix),
        (fields::S3_PREFIX_SNAPSHOTS, &record.snapshots_prefix),
    ];
    for (field, value) in optional_fields {
        if let Some(value) = value {
            item.insert(field.to_string(), value.as_str().into());
        }
    }
    if let Some(ttl) = record.time_to_live {
        item.insert(fields::TIME_TO_EXIST.to_string(), ttl.into());
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;

    #[test]
    fn decode_reads_wire_field_names() {
        let mut item = ItemKey::status("corr-1", "ADG-full").to_item();
        item.insert(fields::DATE.into(), "2024-02-01".into());
        item.insert(fields::STATUS.into(), "Completed".into());
        item.insert(fields::S3_PREFIX_SNAPSHOTS.into(), "snap/".into());
        item.insert(fields::SNAPSHOT_TYPE.into(), "".into());
        item.insert(fields::TIME_TO_EXIST.into(), AttributeValue::N(1_700_000_000));

        let record = decode_dependency(&item).unwrap();
        assert_eq!(record.correlation_id, "corr-1");
        assert_eq!(record.data_product, "ADG-full");
        assert_eq!(record.export_date, "2024-02-01");
        assert!(record.status.is_success());
        assert_eq!(record.snapshots_prefix.as_deref(), Some("snap/"));
        assert_eq!(record.snapshot_type, None);
        assert_eq!(record.time_to_live, Some(1_700_000_000));
    }

    #[test]
    fn decode_requires_status() {
        let item = ItemKey::status("corr-1", "ADG-full").to_item();
        assert!(matches!(
            decode_dependency(&item),
            Err(StageError::InvalidRecord(ModelError::MissingField("Status")))
        ));
    }

    #[test]
    fn encode_omits_absent_fields() {
        let record = DependencyRecord::new("c", "P", "2024-01-01", DependencyStatus::Started);
        let item = encode_dependency(&record);
        assert!(!item.contains_key(fields::CLUSTER_ID));
        assert!(!item.contains_key(fields::TIME_TO_EXIST));
        assert_eq!(string_field(&item, fields::STATUS), Some("Started"));
        assert_eq!(decode_dependency(&item).unwrap(), record);
    }

    #[test]
    fn scan_filters_require_every_field() {
        let request = ScanRequest::new("t")
            .filter(fields::DATA_PRODUCT, "P")
            .filter(fields::DATE, "2024-01-01");
        let mut item = ItemKey::status("c", "P").to_item();
        assert!(!request.matches(&item));
        item.insert(fields::DATE.into(), "2024-01-01".into());
        assert!(request.matches(&item));
    }
}
