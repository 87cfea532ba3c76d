pub mod address;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};

use crate::context::Context;
use crate::criteria::{self, SearchAttribute, SearchCriteria, SqlValue};
use crate::error::{StoreError, StoreResult};

/// Generic surface shared by all entity managers and their sub-managers
#[async_trait]
pub trait Manager: Send + Sync {
    /// Declared resource type path, optionally followed by the paths of the
    /// configured sub-managers
    fn resource_type(&self, with_sub: bool) -> StoreResult<Vec<String>>;

    /// Declared search attribute catalogue, optionally merged with the
    /// catalogues of the configured sub-managers
    fn search_attributes(&self, with_sub: bool) -> StoreResult<Vec<SearchAttribute>>;

    /// Returns a delegated manager handling a narrower slice of the entity
    /// data, resolved through the configured implementation name
    fn sub_manager(&self, name: &str) -> StoreResult<Box<dyn Manager>>;

    /// Removes all records belonging to the given sites, cascading to the
    /// configured sub-managers first
    async fn cleanup(&self, site_ids: &[i64]) -> StoreResult<()>;
}

/// Resolves a manager implementation by domain, path and implementation name.
///
/// Without an explicit name the configured one is used ("Standard" when the
/// configuration is silent). Unknown combinations are setup faults.
pub fn create_manager(
    ctx: &Context,
    domain: &str,
    path: &str,
    name: Option<&str>,
) -> StoreResult<Box<dyn Manager>> {
    let cfg_key = format!("{}/manager/{}/name", domain, path);
    let name = match name {
        Some(name) => name.to_string(),
        None => ctx.config().string_or(&cfg_key, "Standard").to_string(),
    };

    match (domain, path, name.as_str()) {
        ("customer", "address", "Standard") => {
            Ok(Box::new(crate::customer::address::standard(ctx.clone())?))
        }
        ("customer", "property/type", "Standard") => Ok(Box::new(
            crate::customer::property_type::CustomerPropertyTypeManager::new(ctx.clone()),
        )),
        _ => Err(StoreError::Config(format!(
            "No manager implementation \"{}\" available for \"{}/{}\"",
            name, domain, path
        ))),
    }
}

/// Current timestamp in the storage format shared by all tables
pub(crate) fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Renders an ID list for inlining into a ":cond" substitution
pub(crate) fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Binds a typed value to the next placeholder of a statement
pub(crate) fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Null => query.bind(Option::<String>::None),
    }
}

/// Site visibility clause for searches: records from any site in the path
fn site_condition(
    map: &criteria::AttributeMap<'_>,
    prefix: &str,
    ctx: &Context,
) -> StoreResult<String> {
    let key = format!("{}siteid", prefix);
    let attr = map
        .get(key.as_str())
        .ok_or_else(|| StoreError::Config(format!("Unknown search key \"{}\"", key)))?;

    Ok(format!(
        "{} IN ( {} )",
        attr.internal_code,
        id_list(ctx.locale().site_path())
    ))
}

/// Executes the configured search template for the given criteria.
///
/// Substitutes ":joins", ":cond", ":order", ":start" and ":size", binds the
/// condition values in order and fetches all matching rows.
pub(crate) async fn fetch_rows(
    ctx: &Context,
    resource: &str,
    cfg_path: &str,
    attrs: &[SearchAttribute],
    prefix: &str,
    search: &SearchCriteria,
) -> StoreResult<Vec<SqliteRow>> {
    let template = ctx.config().sql(cfg_path)?;
    let map = criteria::attribute_map(attrs);

    let (cond, params) = criteria::render_conditions(search.conditions(), &map)?;
    let site = site_condition(&map, prefix, ctx)?;
    let order = criteria::render_sortation(search, &map, &format!("{}id", prefix))?;
    let joins = criteria::collect_joins(search, &map);

    let sql = template
        .replace(":joins", &joins)
        .replace(":cond", &format!("{} AND {}", site, cond))
        .replace(":order", &order)
        .replace(":start", &search.start().to_string())
        .replace(":size", &search.size().to_string());

    tracing::debug!(resource, path = cfg_path, "executing search statement");

    let mut query = sqlx::query(&sql);
    for param in &params {
        query = bind_value(query, param);
    }

    let mut conn = ctx.db().acquire(resource).await?;
    query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))
}

/// Counts the records matching the criteria via the configured count template
pub(crate) async fn count_rows(
    ctx: &Context,
    resource: &str,
    cfg_path: &str,
    attrs: &[SearchAttribute],
    prefix: &str,
    search: &SearchCriteria,
) -> StoreResult<u64> {
    let template = ctx.config().sql(cfg_path)?;
    let map = criteria::attribute_map(attrs);

    let (cond, params) = criteria::render_conditions(search.conditions(), &map)?;
    let site = site_condition(&map, prefix, ctx)?;
    let joins = criteria::collect_joins(search, &map);

    let sql = template
        .replace(":joins", &joins)
        .replace(":cond", &format!("{} AND {}", site, cond));

    tracing::debug!(resource, path = cfg_path, "executing count statement");

    let mut query = sqlx::query(&sql);
    for param in &params {
        query = bind_value(query, param);
    }

    let mut conn = ctx.db().acquire(resource).await?;
    let row = query
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    let count: i64 = row
        .try_get("count")
        .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(count.max(0) as u64)
}

/// Executes the configured delete template with the given ":cond" substitution
pub(crate) async fn delete_by_condition(
    ctx: &Context,
    resource: &str,
    cfg_path: &str,
    cond: &str,
) -> StoreResult<u64> {
    let template = ctx.config().sql(cfg_path)?;
    let sql = template.replace(":cond", cond);

    tracing::debug!(resource, path = cfg_path, "executing delete statement");

    let mut conn = ctx.db().acquire(resource).await?;
    let result = sqlx::query(&sql)
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(result.rows_affected())
}

/// Fetches the identifier generated for the last inserted record.
///
/// Must run on the connection that executed the insert.
pub(crate) async fn new_id(
    conn: &mut PoolConnection<Sqlite>,
    ctx: &Context,
    cfg_path: &str,
) -> StoreResult<i64> {
    let sql = ctx.config().sql(cfg_path)?;
    let row = sqlx::query(sql)
        .fetch_one(&mut **conn)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    row.try_get("id")
        .map_err(|e| StoreError::Database(e.to_string()))
}

/// Own type path plus the paths of the configured sub-managers
pub(crate) fn resource_type_base(
    manager: &dyn Manager,
    ctx: &Context,
    type_path: &str,
    submanagers_path: &str,
    with_sub: bool,
) -> StoreResult<Vec<String>> {
    let mut types = vec![type_path.to_string()];

    if with_sub {
        for name in ctx.config().list(submanagers_path) {
            types.extend(manager.sub_manager(&name)?.resource_type(true)?);
        }
    }

    Ok(types)
}

/// Own attribute catalogue plus the catalogues of the configured sub-managers
pub(crate) fn search_attributes_base(
    manager: &dyn Manager,
    ctx: &Context,
    own: &[SearchAttribute],
    submanagers_path: &str,
    with_sub: bool,
) -> StoreResult<Vec<SearchAttribute>> {
    let mut attrs = own.to_vec();

    if with_sub {
        for name in ctx.config().list(submanagers_path) {
            attrs.extend(manager.sub_manager(&name)?.search_attributes(true)?);
        }
    }

    Ok(attrs)
}

/// Cascades cleanup to the configured sub-managers, then deletes the local
/// records belonging to the given sites
pub(crate) async fn cleanup_base(
    manager: &dyn Manager,
    ctx: &Context,
    resource: &str,
    submanagers_path: &str,
    delete_cfg_path: &str,
    site_ids: &[i64],
) -> StoreResult<()> {
    for name in ctx.config().list(submanagers_path) {
        manager.sub_manager(&name)?.cleanup(site_ids).await?;
    }

    if site_ids.is_empty() {
        return Ok(());
    }

    let cond = format!("\"siteid\" IN ( {} )", id_list(site_ids));
    delete_by_condition(ctx, resource, delete_cfg_path, &cond).await?;
    Ok(())
}
