use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use stagegate_model::fields;
use tokio::sync::RwLock;

use crate::config::StageConfig;
use crate::error::{Result, StageError};
use crate::ports::store::{
    Item, ItemKey, ScanPage, ScanRequest, StatusStore, UpdateCondition, string_field,
};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct Table {
    hash_field: String,
    range_field: String,
    items: Vec<Item>,
}

impl Table {
    fn key_of(&self, item: &Item) -> Option<ItemKey> {
        Some(ItemKey::new(
            &self.hash_field,
            string_field(item, &self.hash_field)?,
            &self.range_field,
            string_field(item, &self.range_field)?,
        ))
    }

    fn position(&self, key: &ItemKey) -> Option<usize> {
        self.items.iter().position(|item| key.matches(item))
    }
}

/// In-process status store with paginated scans.
///
/// Scans evaluate `page_size` items per call and apply filters afterwards, so
/// a page can come back empty while a continuation key is still returned.
#[derive(Debug)]
pub struct MemoryStatusStore {
    tables: RwLock<HashMap<String, Table>>,
    page_size: usize,
    get_calls: AtomicUsize,
    scan_calls: AtomicUsize,
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            get_calls: AtomicUsize::new(0),
            scan_calls: AtomicUsize::new(0),
        }
    }
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the status and per-collection tables named by `config`.
    pub fn for_config(config: &StageConfig) -> Self {
        Self::new()
            .with_table(
                &config.status_table_name,
                fields::CORRELATION_ID,
                fields::DATA_PRODUCT,
            )
            .with_table(
                &config.collection_status_table_name,
                fields::collection::CORRELATION_ID,
                fields::collection::COLLECTION_NAME,
            )
    }

    pub fn with_table(
        mut self,
        name: &str,
        hash_field: &str,
        range_field: &str,
    ) -> Self {
        self.tables.get_mut().insert(
            name.to_string(),
            Table {
                hash_field: hash_field.to_string(),
                range_field: range_field.to_string(),
                items: Vec::new(),
            },
        );
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }
}

fn unknown_table(table: &str) -> StageError {
    StageError::Store(format!("table {table} does not exist"))
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().await;
        let table = tables.get(table).ok_or_else(|| unknown_table(table))?;
        Ok(table.position(key).map(|index| table.items[index].clone()))
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanPage> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().await;
        let table = tables
            .get(&request.table)
            .ok_or_else(|| unknown_table(&request.table))?;

        let start = match &request.exclusive_start_key {
            Some(key) => table.position(key).map(|index| index + 1).ok_or_else(|| {
                StageError::Store(format!("stale scan start key {}", key.hash_value))
            })?,
            None => 0,
        };
        let end = (start + self.page_size).min(table.items.len());
        let evaluated = &table.items[start.min(end)..end];

        let last_evaluated_key = if end < table.items.len() {
            evaluated.last().and_then(|item| table.key_of(item))
        } else {
            None
        };

        Ok(ScanPage {
            items: evaluated
                .iter()
                .filter(|item| request.matches(item))
                .cloned()
                .collect(),
            last_evaluated_key,
        })
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| unknown_table(table))?;
        let key = table.key_of(&item).ok_or_else(|| {
            StageError::Store(format!(
                "item is missing key attributes {}/{}",
                table.hash_field, table.range_field
            ))
        })?;
        match table.position(&key) {
            Some(index) => table.items[index] = item,
            None => table.items.push(item),
        }
        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        updates: Item,
        condition: UpdateCondition,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| unknown_table(table))?;
        match (table.position(key), condition) {
            (Some(index), _) => table.items[index].extend(updates),
            (None, UpdateCondition::ItemExists) => {
                return Err(StageError::ConditionFailed(format!(
                    "no item for {}={} {}={}",
                    key.hash_field, key.hash_value, key.range_field, key.range_value
                )));
            }
            (None, UpdateCondition::None) => {
                let mut item = key.to_item();
                item.extend(updates);
                table.items.push(item);
            }
        }
        Ok(())
    }
}
