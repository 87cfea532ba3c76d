use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{
    cleanup_base, count_rows, create_manager, delete_by_condition, fetch_rows, id_list, new_id,
    resource_type_base, search_attributes_base, timestamp, Manager,
};
use crate::context::Context;
use crate::criteria::{CompareOp, SearchAttribute, SearchCriteria};
use crate::error::{StoreError, StoreResult};

/// A delivery or billing address attached to a parent record.
///
/// An item without an ID is new and will be inserted on save; items loaded
/// from the database or saved once are updated instead. Mutators flip the
/// modified flag, and saving an unmodified item is a no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressItem {
    id: Option<i64>,
    site_id: i64,
    parent_id: i64,
    company: String,
    vat_id: String,
    salutation: String,
    title: String,
    firstname: String,
    lastname: String,
    address1: String,
    address2: String,
    address3: String,
    postal: String,
    city: String,
    state: String,
    country_id: Option<String>,
    language_id: Option<String>,
    telephone: String,
    email: String,
    telefax: String,
    website: String,
    longitude: Option<f64>,
    latitude: Option<f64>,
    flag: i64,
    position: i64,
    mtime: String,
    ctime: String,
    editor: String,
    #[serde(skip)]
    modified: bool,
}

impl AddressItem {
    pub fn new(site_id: i64) -> Self {
        Self {
            site_id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Sets the identifier. Assigning an ID marks the item unmodified while
    /// clearing it turns the item into a new one that will be inserted.
    pub fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
        self.modified = id.is_none();
    }

    pub fn site_id(&self) -> i64 {
        self.site_id
    }

    pub fn parent_id(&self) -> i64 {
        self.parent_id
    }

    pub fn set_parent_id(&mut self, value: i64) {
        self.parent_id = value;
        self.modified = true;
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn set_company(&mut self, value: &str) {
        self.company = value.to_string();
        self.modified = true;
    }

    pub fn vat_id(&self) -> &str {
        &self.vat_id
    }

    pub fn set_vat_id(&mut self, value: &str) {
        self.vat_id = value.to_string();
        self.modified = true;
    }

    pub fn salutation(&self) -> &str {
        &self.salutation
    }

    pub fn set_salutation(&mut self, value: &str) {
        self.salutation = value.to_string();
        self.modified = true;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, value: &str) {
        self.title = value.to_string();
        self.modified = true;
    }

    pub fn firstname(&self) -> &str {
        &self.firstname
    }

    pub fn set_firstname(&mut self, value: &str) {
        self.firstname = value.to_string();
        self.modified = true;
    }

    pub fn lastname(&self) -> &str {
        &self.lastname
    }

    pub fn set_lastname(&mut self, value: &str) {
        self.lastname = value.to_string();
        self.modified = true;
    }

    pub fn address1(&self) -> &str {
        &self.address1
    }

    pub fn set_address1(&mut self, value: &str) {
        self.address1 = value.to_string();
        self.modified = true;
    }

    pub fn address2(&self) -> &str {
        &self.address2
    }

    pub fn set_address2(&mut self, value: &str) {
        self.address2 = value.to_string();
        self.modified = true;
    }

    pub fn address3(&self) -> &str {
        &self.address3
    }

    pub fn set_address3(&mut self, value: &str) {
        self.address3 = value.to_string();
        self.modified = true;
    }

    pub fn postal(&self) -> &str {
        &self.postal
    }

    pub fn set_postal(&mut self, value: &str) {
        self.postal = value.to_string();
        self.modified = true;
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn set_city(&mut self, value: &str) {
        self.city = value.to_string();
        self.modified = true;
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn set_state(&mut self, value: &str) {
        self.state = value.to_string();
        self.modified = true;
    }

    pub fn country_id(&self) -> Option<&str> {
        self.country_id.as_deref()
    }

    pub fn set_country_id(&mut self, value: Option<&str>) {
        self.country_id = value.map(str::to_string);
        self.modified = true;
    }

    pub fn language_id(&self) -> Option<&str> {
        self.language_id.as_deref()
    }

    pub fn set_language_id(&mut self, value: Option<&str>) {
        self.language_id = value.map(str::to_string);
        self.modified = true;
    }

    pub fn telephone(&self) -> &str {
        &self.telephone
    }

    pub fn set_telephone(&mut self, value: &str) {
        self.telephone = value.to_string();
        self.modified = true;
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, value: &str) {
        self.email = value.to_string();
        self.modified = true;
    }

    pub fn telefax(&self) -> &str {
        &self.telefax
    }

    pub fn set_telefax(&mut self, value: &str) {
        self.telefax = value.to_string();
        self.modified = true;
    }

    pub fn website(&self) -> &str {
        &self.website
    }

    pub fn set_website(&mut self, value: &str) {
        self.website = value.to_string();
        self.modified = true;
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn set_coordinates(&mut self, longitude: Option<f64>, latitude: Option<f64>) {
        self.longitude = longitude;
        self.latitude = latitude;
        self.modified = true;
    }

    pub fn flag(&self) -> i64 {
        self.flag
    }

    pub fn set_flag(&mut self, value: i64) {
        self.flag = value;
        self.modified = true;
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn set_position(&mut self, value: i64) {
        self.position = value;
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

    pub(crate) fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        let read = |e: sqlx::Error| StoreError::Database(e.to_string());

        Ok(Self {
            id: Some(row.try_get("id").map_err(read)?),
            site_id: row.try_get("siteid").map_err(read)?,
            parent_id: row.try_get("parentid").map_err(read)?,
            company: row.try_get("company").map_err(read)?,
            vat_id: row.try_get("vatid").map_err(read)?,
            salutation: row.try_get("salutation").map_err(read)?,
            title: row.try_get("title").map_err(read)?,
            firstname: row.try_get("firstname").map_err(read)?,
            lastname: row.try_get("lastname").map_err(read)?,
            address1: row.try_get("address1").map_err(read)?,
            address2: row.try_get("address2").map_err(read)?,
            address3: row.try_get("address3").map_err(read)?,
            postal: row.try_get("postal").map_err(read)?,
            city: row.try_get("city").map_err(read)?,
            state: row.try_get("state").map_err(read)?,
            country_id: row.try_get("countryid").map_err(read)?,
            language_id: row.try_get("langid").map_err(read)?,
            telephone: row.try_get("telephone").map_err(read)?,
            email: row.try_get("email").map_err(read)?,
            telefax: row.try_get("telefax").map_err(read)?,
            website: row.try_get("website").map_err(read)?,
            longitude: row.try_get("longitude").map_err(read)?,
            latitude: row.try_get("latitude").map_err(read)?,
            flag: row.try_get("flag").map_err(read)?,
            position: row.try_get("pos").map_err(read)?,
            mtime: row.try_get("mtime").map_err(read)?,
            ctime: row.try_get("ctime").map_err(read)?,
            editor: row.try_get("editor").map_err(read)?,
            modified: false,
        })
    }
}

/// Site-scoped address manager driven by a declarative search configuration.
///
/// The same implementation serves every domain that stores addresses; the
/// concrete search configuration, template path and database resource are
/// supplied at construction time.
pub struct AddressManager {
    ctx: Context,
    attrs: Vec<SearchAttribute>,
    prefix: String,
    config_path: String,
    submanagers_path: String,
    resource: String,
}

impl AddressManager {
    /// Builds a manager from its declarative parts.
    ///
    /// The field prefix is derived from the code of the first search
    /// configuration entry, up to and including its last dot. An empty
    /// configuration or an undotted code is rejected.
    pub fn new(
        ctx: Context,
        resource: &str,
        config_path: &str,
        submanagers_path: &str,
        attrs: Vec<SearchAttribute>,
    ) -> StoreResult<Self> {
        let first = attrs
            .first()
            .ok_or_else(|| StoreError::Config("Search configuration not available".to_string()))?;

        let pos = first.code.rfind('.').ok_or_else(|| {
            StoreError::Config(format!(
                "Search configuration for \"{}\" not available",
                first.code
            ))
        })?;
        let prefix = first.code[..=pos].to_string();

        Ok(Self {
            ctx,
            attrs,
            prefix,
            config_path: config_path.to_string(),
            submanagers_path: submanagers_path.to_string(),
            resource: resource.to_string(),
        })
    }

    /// Search key and item prefix, e.g. "customer.address."
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Creates an empty item bound to the current site
    pub fn create_item(&self) -> AddressItem {
        AddressItem::new(self.ctx.locale().site_id())
    }

    /// Returns the address with the given ID from the visible sites
    pub async fn get_item(&self, id: i64) -> StoreResult<AddressItem> {
        let first = self.attrs.first().ok_or_else(|| {
            StoreError::Config("Address search configuration not available".to_string())
        })?;

        let search = SearchCriteria::new().compare(CompareOp::Eq, &first.code, Value::from(id));
        let mut items = self.search_items(&search).await?;

        items.remove(&id).ok_or_else(|| {
            StoreError::NotFound(format!("Address item with ID \"{}\" not found", id))
        })
    }

    /// Inserts or updates the item, depending on whether it has an ID yet.
    ///
    /// Unmodified items are left untouched without a database call. On
    /// insert the generated identifier is read back and stored in the item.
    pub async fn save_item(&self, item: &mut AddressItem) -> StoreResult<()> {
        if !item.is_modified() {
            return Ok(());
        }

        let id = item.id();
        let date = timestamp();
        let operation = if id.is_none() { "insert" } else { "update" };
        let sql = self
            .ctx
            .config()
            .sql(&format!("{}{}", self.config_path, operation))?;

        tracing::debug!(prefix = %self.prefix, operation, "saving address item");

        let mut conn = self.ctx.db().acquire(&self.resource).await?;

        let mut query = sqlx::query(sql)
            .bind(item.parent_id())
            .bind(item.company())
            .bind(item.vat_id())
            .bind(item.salutation())
            .bind(item.title())
            .bind(item.firstname())
            .bind(item.lastname())
            .bind(item.address1())
            .bind(item.address2())
            .bind(item.address3())
            .bind(item.postal())
            .bind(item.city())
            .bind(item.state())
            .bind(item.country_id())
            .bind(item.language_id())
            .bind(item.telephone())
            .bind(item.email())
            .bind(item.telefax())
            .bind(item.website())
            .bind(item.longitude())
            .bind(item.latitude())
            .bind(item.flag())
            .bind(item.position())
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
                let path = format!("{}newid", self.config_path);
                let generated = new_id(&mut conn, &self.ctx, &path).await?;
                item.set_id(Some(generated));
            }
        }

        Ok(())
    }

    /// Returns the items matching the criteria, keyed by their identifier.
    ///
    /// Only records from sites in the locale's visibility path are returned.
    pub async fn search_items(
        &self,
        search: &SearchCriteria,
    ) -> StoreResult<HashMap<i64, AddressItem>> {
        let required = self.prefix.trim_end_matches('.');
        if required.is_empty() {
            return Err(StoreError::Config("No configuration available".to_string()));
        }

        tracing::debug!(domain = required, "searching address items");

        let path = format!("{}search", self.config_path);
        let rows = fetch_rows(
            &self.ctx,
            &self.resource,
            &path,
            &self.attrs,
            &self.prefix,
            search,
        )
        .await?;

        let mut items = HashMap::with_capacity(rows.len());
        for row in &rows {
            let item = AddressItem::from_row(row)?;
            if let Some(id) = item.id() {
                items.insert(id, item);
            }
        }

        Ok(items)
    }

    /// Number of records matching the criteria, ignoring the slice window
    pub async fn count_items(&self, search: &SearchCriteria) -> StoreResult<u64> {
        let path = format!("{}count", self.config_path);
        count_rows(
            &self.ctx,
            &self.resource,
            &path,
            &self.attrs,
            &self.prefix,
            search,
        )
        .await
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
        let path = format!("{}delete", self.config_path);
        delete_by_condition(&self.ctx, &self.resource, &path, &cond).await?;
        Ok(())
    }

    fn type_path(&self) -> String {
        self.prefix.trim_end_matches('.').replace('.', "/")
    }
}

#[async_trait]
impl Manager for AddressManager {
    fn resource_type(&self, with_sub: bool) -> StoreResult<Vec<String>> {
        resource_type_base(
            self,
            &self.ctx,
            &self.type_path(),
            &self.submanagers_path,
            with_sub,
        )
    }

    fn search_attributes(&self, with_sub: bool) -> StoreResult<Vec<SearchAttribute>> {
        search_attributes_base(self, &self.ctx, &self.attrs, &self.submanagers_path, with_sub)
    }

    fn sub_manager(&self, name: &str) -> StoreResult<Box<dyn Manager>> {
        create_manager(&self.ctx, "common", &format!("address/{}", name), None)
    }

    async fn cleanup(&self, site_ids: &[i64]) -> StoreResult<()> {
        let path = format!("{}delete", self.config_path);
        cleanup_base(
            self,
            &self.ctx,
            &self.resource,
            &self.submanagers_path,
            &path,
            site_ids,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::Locale;
    use crate::criteria::ParamType;
    use crate::database::DatabaseManager;

    async fn context() -> Context {
        let config = Config::default();
        let db = DatabaseManager::connect(&config).await.unwrap();
        Context::new(config, db, Locale::new(1), "tester")
    }

    #[tokio::test]
    async fn empty_search_configuration_is_rejected() {
        let ctx = context().await;

        let result = AddressManager::new(
            ctx,
            "db",
            "customer/manager/address/standard/",
            "customer/manager/address/submanagers",
            Vec::new(),
        );

        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[tokio::test]
    async fn undotted_search_code_is_rejected() {
        let ctx = context().await;
        let attrs = vec![SearchAttribute::new("id", "t.\"id\"", "ID", ParamType::Int)];

        let result = AddressManager::new(
            ctx,
            "db",
            "customer/manager/address/standard/",
            "customer/manager/address/submanagers",
            attrs,
        );

        match result {
            Err(StoreError::Config(msg)) => assert!(msg.contains("id")),
            _ => panic!("expected config error"),
        }
    }

    #[tokio::test]
    async fn prefix_is_derived_from_the_first_entry() {
        let ctx = context().await;
        let attrs = vec![SearchAttribute::new(
            "customer.address.id",
            "cad.\"id\"",
            "ID",
            ParamType::Int,
        )];

        let manager = AddressManager::new(
            ctx,
            "db",
            "customer/manager/address/standard/",
            "customer/manager/address/submanagers",
            attrs,
        )
        .unwrap();

        assert_eq!(manager.prefix(), "customer.address.");
    }

    #[test]
    fn mutators_flip_the_modified_flag() {
        let mut item = AddressItem::new(1);
        assert!(!item.is_modified());

        item.set_city("Hamburg");
        assert!(item.is_modified());

        item.set_id(Some(5));
        assert!(!item.is_modified());

        item.set_id(None);
        assert!(item.is_modified());
    }
}
