use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::buffer::BufferPoolManager;
use crate::common::{DbConfig, HeapDbError, RecordId, Result};
use crate::execution::{
    Condition, ProjectOperator, Projection, RecordIterator, RelationScanner, SelectOperator,
};
use crate::heap::HeapRelation;
use crate::storage::disk::DiskManager;
use crate::tuple::{Record, Schema, Value};

use super::persistence::{read_catalog, write_catalog, CatalogEntry};

/// A database instance: the page allocator, the buffer pool and the tables
/// registered on top of them.
///
/// The table list survives restarts through the catalog file written by
/// [`Database::save_state`]; record data survives through the pages the buffer
/// pool writes back.
pub struct Database {
    config: DbConfig,
    disk_manager: Arc<DiskManager>,
    bpm: Arc<BufferPoolManager>,
    /// Tables by name
    tables: BTreeMap<String, HeapRelation>,
}

impl Database {
    /// Opens the database rooted at `config.db_path`, reloading the catalog
    /// file when one exists.
    pub fn open(config: DbConfig) -> Result<Self> {
        let disk_manager = Arc::new(DiskManager::from_config(&config)?);
        let bpm = Arc::new(BufferPoolManager::new(
            config.buffer_count,
            config.policy,
            Arc::clone(&disk_manager),
        ));

        let mut tables = BTreeMap::new();
        for entry in read_catalog(&config.catalog_path())? {
            if tables.contains_key(&entry.name) {
                warn!("skipping duplicate catalog entry {}", entry.name);
                continue;
            }
            let schema = Arc::new(Schema::new(entry.columns));
            match HeapRelation::open(
                entry.name.clone(),
                schema,
                entry.header_page_id,
                Arc::clone(&disk_manager),
                Arc::clone(&bpm),
            ) {
                Ok(relation) => {
                    tables.insert(entry.name, relation);
                }
                Err(e) => warn!("skipping catalog entry {}: {}", entry.name, e),
            }
        }

        info!(
            "database at {} ready with {} tables ({} buffers, {})",
            config.db_path.display(),
            tables.len(),
            config.buffer_count,
            config.policy
        );

        Ok(Self {
            config,
            disk_manager,
            bpm,
            tables,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    /// Creates an empty table.
    pub fn create_table(&mut self, name: &str, schema: Schema) -> Result<&HeapRelation> {
        if self.tables.contains_key(name) {
            return Err(HeapDbError::TableAlreadyExists(name.to_string()));
        }
        let relation = HeapRelation::create(
            name,
            Arc::new(schema),
            Arc::clone(&self.disk_manager),
            Arc::clone(&self.bpm),
        )?;
        Ok(self.tables.entry(name.to_string()).or_insert(relation))
    }

    /// Removes a table and releases all of its pages.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.table(name)?.destroy()?;
        self.tables.remove(name);
        Ok(())
    }

    /// Removes every table. Stops at the first table that cannot be released,
    /// which stays registered along with the ones after it.
    pub fn drop_all_tables(&mut self) -> Result<()> {
        let names: Vec<String> = self.tables.keys().cloned().collect();
        for name in &names {
            self.drop_table(name)?;
        }
        info!("dropped all {} tables", names.len());
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&HeapRelation> {
        self.tables
            .get(name)
            .ok_or_else(|| HeapDbError::TableNotFound(name.to_string()))
    }

    /// Table names in ascending order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Formats a table as `Name (col:TYPE,col:TYPE)`.
    pub fn describe_table(&self, name: &str) -> Result<String> {
        let relation = self.table(name)?;
        Ok(format!("{} ({})", relation.name(), relation.schema()))
    }

    /// Describes every table, in name order.
    pub fn describe_tables(&self) -> Vec<String> {
        self.tables
            .values()
            .map(|relation| format!("{} ({})", relation.name(), relation.schema()))
            .collect()
    }

    pub fn insert(&self, name: &str, record: &Record) -> Result<RecordId> {
        self.table(name)?.insert(record)
    }

    /// Inserts one record per line of a headerless CSV file and returns how many
    /// were inserted. Each field is converted to its column's type; blank lines
    /// are skipped.
    pub fn append_csv(&self, name: &str, path: impl AsRef<Path>) -> Result<usize> {
        let relation = self.table(name)?;
        let schema = relation.schema();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        let mut inserted = 0;
        for row in reader.records() {
            let row = row?;
            if row.iter().all(str::is_empty) {
                continue;
            }
            if row.len() != schema.column_count() {
                return Err(HeapDbError::SchemaMismatch {
                    expected: schema.column_count(),
                    actual: row.len(),
                });
            }

            let values = schema
                .columns()
                .zip(row.iter())
                .map(|(column, field)| Value::from(field).coerce_to(column.data_type()))
                .collect::<Result<Vec<_>>>()?;
            relation.insert(&Record::new(values))?;
            inserted += 1;
        }

        info!(
            "appended {} records to {} from {}",
            inserted,
            name,
            path.as_ref().display()
        );
        Ok(inserted)
    }

    /// Runs `scan -> select -> project` over a table and returns every result.
    pub fn select(
        &self,
        name: &str,
        conditions: Vec<Condition>,
        projection: Projection,
    ) -> Result<Vec<Record>> {
        let relation = self.table(name)?;
        let scan = RelationScanner::new(relation)?;
        let select = SelectOperator::new(scan, Arc::clone(relation.schema()), conditions);
        let mut project = ProjectOperator::new(select, projection);
        project.collect_records()
    }

    /// Deletes every record matching all conditions; returns the count.
    pub fn delete_where(&self, name: &str, conditions: &[Condition]) -> Result<usize> {
        let relation = self.table(name)?;
        let targets = matching_records(relation, conditions)?;

        for (rid, _) in &targets {
            relation.delete(*rid)?;
        }
        info!("deleted {} records from {}", targets.len(), name);
        Ok(targets.len())
    }

    /// Sets `column = value` for every assignment on each record matching all
    /// conditions; returns the count.
    pub fn update_where(
        &self,
        name: &str,
        assignments: &[(usize, Value)],
        conditions: &[Condition],
    ) -> Result<usize> {
        let relation = self.table(name)?;
        let schema = relation.schema();

        let mut coerced = Vec::with_capacity(assignments.len());
        for (index, value) in assignments {
            let column = schema.column(*index).ok_or(HeapDbError::ColumnOutOfRange {
                index: *index,
                count: schema.column_count(),
            })?;
            coerced.push((*index, value.coerce_to(column.data_type())?));
        }

        let targets = matching_records(relation, conditions)?;
        for (rid, mut record) in targets.iter().cloned() {
            for (index, value) in &coerced {
                record.set_value(*index, value.clone());
            }
            relation.update(rid, &record)?;
        }
        info!("updated {} records in {}", targets.len(), name);
        Ok(targets.len())
    }

    /// Writes the catalog file.
    pub fn save_state(&self) -> Result<()> {
        let entries: Vec<CatalogEntry> = self
            .tables
            .values()
            .map(|relation| CatalogEntry {
                name: relation.name().to_string(),
                header_page_id: relation.header_page_id(),
                columns: relation.schema().columns().cloned().collect(),
            })
            .collect();

        write_catalog(&self.config.catalog_path(), &entries)?;
        info!("saved catalog with {} tables", entries.len());
        Ok(())
    }

    /// Persists the catalog, writes back every dirty page and syncs the data
    /// files.
    pub fn finish(self) -> Result<()> {
        self.save_state()?;
        self.bpm.flush_all_pages()?;
        self.disk_manager.shutdown()?;
        info!("database at {} closed", self.config.db_path.display());
        Ok(())
    }
}

/// Collects the address and contents of every record matching all conditions
/// before any of them is modified.
fn matching_records(
    relation: &HeapRelation,
    conditions: &[Condition],
) -> Result<Vec<(RecordId, Record)>> {
    let schema = relation.schema();
    let mut matches = Vec::new();
    for (rid, record) in relation.records_with_ids()? {
        let mut keep = true;
        for condition in conditions {
            if !condition.evaluate(&record, schema)? {
                keep = false;
                break;
            }
        }
        if keep {
            matches.push((rid, record));
        }
    }
    Ok(matches)
}
