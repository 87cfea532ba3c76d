use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::common::{
    cleanup_base, count_rows, create_manager, delete_by_condition, fetch_rows, id_list, new_id,
    resource_type_base, search_attributes_base, timestamp, Manager,
};
use crate::context::Context;
use crate::criteria::{CompareOp, ParamType, SearchAttribute, SearchCriteria};
use crate::error::{StoreError, StoreResult};

const PREFIX: &str = "customer.property.type.";
const CONFIG_PATH: &str = "customer/manager/property/type/standard/";
const SUBMANAGERS_PATH: &str = "customer/manager/property/type/submanagers";
const RESOURCE: &str = "db-customer";

static SEARCH_CONFIG: Lazy<Vec<SearchAttribute>> = Lazy::new(|| {
    vec![
        SearchAttribute::new(
            "customer.property.type.id",
            "cpt.\"id\"",
            "Property type ID",
            ParamType::Int,
        )
        .internal(),
        SearchAttribute::new(
            "customer.property.type.siteid",
            "cpt.\"siteid\"",
            "Property type site ID",
            ParamType::Int,
        )
        .internal(),
        SearchAttribute::new(
            "customer.property.type.label",
            "cpt.\"label\"",
            "Property type label",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.property.type.code",
            "cpt.\"code\"",
            "Property type code",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.property.type.domain",
            "cpt.\"domain\"",
            "Property type domain",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.property.type.position",
            "cpt.\"pos\"",
            "Property type position",
            ParamType::Int,
        ),
        SearchAttribute::new(
            "customer.property.type.status",
            "cpt.\"status\"",
            "Property type status",
            ParamType::Int,
        ),
        SearchAttribute::new(
            "customer.property.type.ctime",
            "cpt.\"ctime\"",
            "Property type create date/time",
            ParamType::DateTime,
        )
        .internal(),
        SearchAttribute::new(
            "customer.property.type.mtime",
            "cpt.\"mtime\"",
            "Property type modify date",
            ParamType::DateTime,
        )
        .internal(),
        SearchAttribute::new(
            "customer.property.type.editor",
            "cpt.\"editor\"",
            "Property type editor",
            ParamType::Str,
        )
        .internal(),
    ]
});

/// A typed lookup entry classifying customer properties.
///
/// Same lifecycle as every other item: no ID means the record is new and
/// will be inserted, saving an unmodified item does nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyTypeItem {
    id: Option<i64>,
    site_id: i64,
    code: String,
    domain: String,
    label: String,
    position: i64,
    status: i64,
    mtime: String,
    ctime: String,
    editor: String,
    #[serde(skip)]
    modified: bool,
}

impl PropertyTypeItem {
    pub fn new(site_id: i64) -> Self {
        Self {
            id: None,
            site_id,
            code: String::new(),
            domain: String::new(),
            label: String::new(),
            position: 0,
            status: 1,
            mtime: String::new(),
            ctime: String::new(),
            editor: String::new(),
            modified: false,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Assigning an ID marks the item unmodified while clearing it turns
    /// the item into a new one that will be inserted
    pub fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
        self.modified = id.is_none();
    }

    pub fn site_id(&self) -> i64 {
        self.site_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn set_code(&mut self, value: &str) {
        self.code = value.to_string();
        self.modified = true;
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn set_domain(&mut self, value: &str) {
        self.domain = value.to_string();
        self.modified = true;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, value: &str) {
        self.label = value.to_string();
        self.modified = true;
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn set_position(&mut self, value: i64) {
        self.position = value;
        self.modified = true;
    }

    pub fn status(&self) -> i64 {
        self.status
    }

    pub fn set_status(&mut self, value: i64) {
        self.status = value;
        self.modified = true;
    }

    pub fn mtime(&self) -> &str {
        &self.mtime
    }

    pub fn ctime(&self) -> &str {
        &self.ctime
    }

    pub fn editor(&self) -> &str {
        &self.editor
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        let read = |e: sqlx::Error| StoreError::Database(e.to_string());

        Ok(Self {
            id: Some(row.try_get("id").map_err(read)?),
            site_id: row.try_get("siteid").map_err(read)?,
            code: row.try_get("code").map_err(read)?,
            domain: row.try_get("domain").map_err(read)?,
            label: row.try_get("label").map_err(read)?,
            position: row.try_get("pos").map_err(read)?,
            status: row.try_get("status").map_err(read)?,
            mtime: row.try_get("mtime").map_err(read)?,
            ctime: row.try_get("ctime").map_err(read)?,
            editor: row.try_get("editor").map_err(read)?,
            modified: false,
        })
    }
}

/// Default customer property type manager
pub struct CustomerPropertyTypeManager {
    ctx: Context,
}

impl CustomerPropertyTypeManager {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Configuration namespace the SQL templates are looked up under
    pub fn config_path(&self) -> &'static str {
        CONFIG_PATH
    }

    /// Creates an empty, enabled item bound to the current site
    pub fn create_item(&self) -> PropertyTypeItem {
        PropertyTypeItem::new(self.ctx.locale().site_id())
    }

    /// Returns the property type with the given ID from the visible sites
    pub async fn get_item(&self, id: i64) -> StoreResult<PropertyTypeItem> {
        let first = SEARCH_CONFIG.first().ok_or_else(|| {
            StoreError::Config("Property type search configuration not available".to_string())
        })?;

        let search = SearchCriteria::new().compare(CompareOp::Eq, &first.code, Value::from(id));
        let mut items = self.search_items(&search).await?;

        items.remove(&id).ok_or_else(|| {
            StoreError::NotFound(format!("Property type item with ID \"{}\" not found", id))
        })
    }

    /// Inserts or updates the item, depending on whether it has an ID yet
    pub async fn save_item(&self, item: &mut PropertyTypeItem) -> StoreResult<()> {
        if !item.is_modified() {
            return Ok(());
        }

        let id = item.id();
        let date = timestamp();
        let operation = if id.is_none() { "insert" } else { "update" };
        let sql = self
            .ctx
            .config()
            .sql(&format!("{}{}", CONFIG_PATH, operation))?;

        tracing::debug!(operation, code = item.code(), "saving property type item");

        let mut conn = self.ctx.db().acquire(RESOURCE).await?;

        let mut query = sqlx::query(sql)
            .bind(item.code())
            .bind(item.domain())
            .bind(item.label())
            .bind(item.position())
            .bind(item.status())
            .bind(date.as_str())
            .bind(self.ctx.editor())
            .bind(self.ctx.locale().site_id());

        query = match id {
            Some(id) => query.bind(id),
            None => query.bind(date.as_str()), // ctime
        };

        query
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match id {
            Some(id) => item.set_id(Some(id)),
            None => {
                let path = format!("{}newid", CONFIG_PATH);
                let generated = new_id(&mut conn, &self.ctx, &path).await?;
                item.set_id(Some(generated));
            }
        }

        Ok(())
    }

    /// Returns the items matching the criteria, keyed by their identifier
    pub async fn search_items(
        &self,
        search: &SearchCriteria,
    ) -> StoreResult<HashMap<i64, PropertyTypeItem>> {
        let path = format!("{}search", CONFIG_PATH);
        let rows = fetch_rows(&self.ctx, RESOURCE, &path, &SEARCH_CONFIG, PREFIX, search).await?;

        let mut items = HashMap::with_capacity(rows.len());
        for row in &rows {
            let item = PropertyTypeItem::from_row(row)?;
            if let Some(id) = item.id() {
                items.insert(id, item);
            }
        }

        Ok(items)
    }

    /// Number of records matching the criteria, ignoring the slice window
    pub async fn count_items(&self, search: &SearchCriteria) -> StoreResult<u64> {
        let path = format!("{}count", CONFIG_PATH);
        count_rows(&self.ctx, RESOURCE, &path, &SEARCH_CONFIG, PREFIX, search).await
    }

    /// Removes the records with the given IDs from the current site
    pub async fn delete_items(&self, ids: &[i64]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let cond = format!(
            "\"id\" IN ( {} ) AND \"siteid\" = {}",
            id_list(ids),
            self.ctx.locale().site_id()
        );
        let path = format!("{}delete", CONFIG_PATH);
        delete_by_condition(&self.ctx, RESOURCE, &path, &cond).await?;
        Ok(())
    }
}

#[async_trait]
impl Manager for CustomerPropertyTypeManager {
    fn resource_type(&self, with_sub: bool) -> StoreResult<Vec<String>> {
        resource_type_base(
            self,
            &self.ctx,
            "customer/property/type",
            SUBMANAGERS_PATH,
            with_sub,
        )
    }

    fn search_attributes(&self, with_sub: bool) -> StoreResult<Vec<SearchAttribute>> {
        search_attributes_base(self, &self.ctx, &SEARCH_CONFIG, SUBMANAGERS_PATH, with_sub)
    }

    fn sub_manager(&self, name: &str) -> StoreResult<Box<dyn Manager>> {
        create_manager(&self.ctx, "customer", &format!("property/type/{}", name), None)
    }

    async fn cleanup(&self, site_ids: &[i64]) -> StoreResult<()> {
        let path = format!("{}delete", CONFIG_PATH);
        cleanup_base(self, &self.ctx, RESOURCE, SUBMANAGERS_PATH, &path, site_ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_items_are_enabled_and_unmodified() {
        let item = PropertyTypeItem::new(3);

        assert_eq!(item.site_id(), 3);
        assert_eq!(item.status(), 1);
        assert!(item.id().is_none());
        assert!(!item.is_modified());
    }

    #[test]
    fn search_config_covers_the_declared_fields() {
        let codes: Vec<&str> = SEARCH_CONFIG.iter().map(|a| a.code.as_str()).collect();

        for field in ["id", "siteid", "label", "code", "domain", "position", "status"] {
            let code = format!("customer.property.type.{}", field);
            assert!(codes.contains(&code.as_str()), "missing {}", code);
        }
    }
}
