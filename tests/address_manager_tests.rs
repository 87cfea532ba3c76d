//! Integration tests for the customer address manager covering the full
//! save/search/delete lifecycle against a real database.

use mercado::customer::address;
use mercado::{
    schema, AddressManager, CompareOp, Config, Context, DatabaseManager, Locale, Manager,
    SearchCriteria, SortDirection, StoreError,
};
use serde_json::json;
use tempfile::TempDir;

/// Context backed by a private in-memory database
async fn memory_context(site_id: i64) -> Context {
    let config = Config::default();
    let db = DatabaseManager::connect(&config).await.expect("connect");
    let ctx = Context::new(config, db, Locale::new(site_id), "tester");
    schema::create_tables(ctx.db()).await.expect("schema");
    ctx
}

/// Context backed by a database file shared between cloned contexts
async fn file_context(dir: &TempDir, site_id: i64) -> Context {
    let url = format!("sqlite://{}", dir.path().join("shop.db").display());
    let mut config = Config::default();
    config.set("resources/db", toml::Value::String(url));

    let db = DatabaseManager::connect(&config).await.expect("connect");
    let ctx = Context::new(config, db, Locale::new(site_id), "tester");
    schema::create_tables(ctx.db()).await.expect("schema");
    ctx
}

fn sample_address(manager: &AddressManager) -> mercado::AddressItem {
    let mut item = manager.create_item();
    item.set_parent_id(7);
    item.set_company("Example Commerce GmbH");
    item.set_vat_id("DE999999999");
    item.set_salutation("ms");
    item.set_title("Dr.");
    item.set_firstname("Erika");
    item.set_lastname("Mustermann");
    item.set_address1("Deichstrasse");
    item.set_address2("12");
    item.set_address3("Hinterhof");
    item.set_postal("20459");
    item.set_city("Hamburg");
    item.set_state("HH");
    item.set_country_id(Some("DE"));
    item.set_language_id(Some("de"));
    item.set_telephone("+4940123456");
    item.set_email("erika@example.com");
    item.set_telefax("+4940123457");
    item.set_website("https://example.com");
    item.set_coordinates(Some(9.984), Some(53.548));
    item.set_flag(1);
    item.set_position(2);
    item
}

#[tokio::test]
async fn saving_a_new_address_assigns_an_id_and_round_trips() {
    let ctx = memory_context(1).await;
    let manager = address::standard(ctx).expect("manager");

    let mut item = sample_address(&manager);
    assert!(item.id().is_none());

    manager.save_item(&mut item).await.expect("save");

    let id = item.id().expect("generated id");
    assert!(!item.is_modified());

    let fetched = manager.get_item(id).await.expect("fetch");
    assert_eq!(fetched.site_id(), 1);
    assert_eq!(fetched.parent_id(), 7);
    assert_eq!(fetched.company(), "Example Commerce GmbH");
    assert_eq!(fetched.vat_id(), "DE999999999");
    assert_eq!(fetched.salutation(), "ms");
    assert_eq!(fetched.title(), "Dr.");
    assert_eq!(fetched.firstname(), "Erika");
    assert_eq!(fetched.lastname(), "Mustermann");
    assert_eq!(fetched.address1(), "Deichstrasse");
    assert_eq!(fetched.address2(), "12");
    assert_eq!(fetched.address3(), "Hinterhof");
    assert_eq!(fetched.postal(), "20459");
    assert_eq!(fetched.city(), "Hamburg");
    assert_eq!(fetched.state(), "HH");
    assert_eq!(fetched.country_id(), Some("DE"));
    assert_eq!(fetched.language_id(), Some("de"));
    assert_eq!(fetched.telephone(), "+4940123456");
    assert_eq!(fetched.email(), "erika@example.com");
    assert_eq!(fetched.telefax(), "+4940123457");
    assert_eq!(fetched.website(), "https://example.com");
    assert_eq!(fetched.longitude(), Some(9.984));
    assert_eq!(fetched.latitude(), Some(53.548));
    assert_eq!(fetched.flag(), 1);
    assert_eq!(fetched.position(), 2);
    assert_eq!(fetched.editor(), "tester");
    assert!(!fetched.mtime().is_empty());
    assert!(!fetched.ctime().is_empty());
    assert!(!fetched.is_modified());
}

#[tokio::test]
async fn saving_an_unmodified_item_performs_no_database_call() {
    let ctx = memory_context(1).await;
    let manager = address::standard(ctx.clone()).expect("manager");

    let mut item = sample_address(&manager);
    manager.save_item(&mut item).await.expect("save");

    // Remove the table behind the manager's back: a save that executes any
    // statement from here on has to fail.
    {
        let mut conn = ctx.db().acquire("db-customer").await.expect("acquire");
        sqlx::query("DROP TABLE \"shop_customer_address\"")
            .execute(&mut *conn)
            .await
            .expect("drop table");
    }

    manager
        .save_item(&mut item)
        .await
        .expect("unmodified save must not touch the database");

    item.set_city("Altona");
    assert!(matches!(
        manager.save_item(&mut item).await,
        Err(StoreError::Database(_))
    ));
}

#[tokio::test]
async fn updating_keeps_the_identifier() {
    let ctx = memory_context(1).await;
    let manager = address::standard(ctx).expect("manager");

    let mut item = sample_address(&manager);
    manager.save_item(&mut item).await.expect("insert");
    let id = item.id().expect("id");

    item.set_city("Bremen");
    manager.save_item(&mut item).await.expect("update");
    assert_eq!(item.id(), Some(id));

    let fetched = manager.get_item(id).await.expect("fetch");
    assert_eq!(fetched.city(), "Bremen");

    let total = manager
        .count_items(&SearchCriteria::new())
        .await
        .expect("count");
    assert_eq!(total, 1);
}

#[tokio::test]
async fn delete_items_only_affects_the_callers_site() {
    let dir = TempDir::new().expect("tempdir");
    let ctx1 = file_context(&dir, 1).await;
    let ctx2 = ctx1.clone().with_locale(Locale::new(2));

    let manager1 = address::standard(ctx1).expect("manager");
    let manager2 = address::standard(ctx2).expect("manager");

    let mut first = sample_address(&manager1);
    manager1.save_item(&mut first).await.expect("save site 1");
    let first_id = first.id().expect("id");

    let mut second = sample_address(&manager2);
    manager2.save_item(&mut second).await.expect("save site 2");
    let second_id = second.id().expect("id");

    // Deleting a foreign site's record from site 1 must not remove it
    manager1.delete_items(&[second_id]).await.expect("delete");
    assert!(manager2.get_item(second_id).await.is_ok());

    manager1.delete_items(&[first_id]).await.expect("delete");
    assert!(matches!(
        manager1.get_item(first_id).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn search_respects_the_site_visibility_scope() {
    let dir = TempDir::new().expect("tempdir");
    let ctx1 = file_context(&dir, 1).await;
    let ctx2 = ctx1.clone().with_locale(Locale::new(2));

    let manager1 = address::standard(ctx1.clone()).expect("manager");
    let manager2 = address::standard(ctx2).expect("manager");

    let mut first = sample_address(&manager1);
    manager1.save_item(&mut first).await.expect("save");
    let first_id = first.id().expect("id");

    let mut second = sample_address(&manager2);
    manager2.save_item(&mut second).await.expect("save");
    let second_id = second.id().expect("id");

    let items = manager1
        .search_items(&SearchCriteria::new())
        .await
        .expect("search");
    assert_eq!(items.len(), 1);
    assert!(items.contains_key(&first_id));

    // A locale seeing both sites returns both records, keyed by ID
    let wide = ctx1.with_locale(Locale::new(1).with_site_path(vec![1, 2]));
    let manager_wide = address::standard(wide).expect("manager");

    let items = manager_wide
        .search_items(&SearchCriteria::new())
        .await
        .expect("search");
    assert_eq!(items.len(), 2);
    assert!(items.contains_key(&first_id));
    assert!(items.contains_key(&second_id));
}

#[tokio::test]
async fn search_filters_sorts_and_pages() {
    let ctx = memory_context(1).await;
    let manager = address::standard(ctx).expect("manager");

    for (position, city) in [(0, "Hamburg"), (1, "Hannover"), (2, "Bremen")] {
        let mut item = sample_address(&manager);
        item.set_position(position);
        item.set_city(city);
        manager.save_item(&mut item).await.expect("save");
    }

    let criteria = SearchCriteria::new()
        .compare(CompareOp::Like, "customer.address.city", json!("Ha%"))
        .sort_by("customer.address.position", SortDirection::Asc);

    let items = manager.search_items(&criteria).await.expect("search");
    assert_eq!(items.len(), 2);
    assert!(items.values().all(|item| item.city().starts_with("Ha")));

    // The slice window limits the page while the count ignores it
    let paged = SearchCriteria::new()
        .sort_by("customer.address.position", SortDirection::Asc)
        .slice(1, 2);

    let items = manager.search_items(&paged).await.expect("search");
    assert_eq!(items.len(), 2);
    assert!(items.values().all(|item| item.position() >= 1));

    let total = manager.count_items(&paged).await.expect("count");
    assert_eq!(total, 3);
}

#[tokio::test]
async fn get_item_outside_the_visible_sites_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let ctx1 = file_context(&dir, 1).await;
    let ctx2 = ctx1.clone().with_locale(Locale::new(2));

    let manager1 = address::standard(ctx1).expect("manager");
    let manager2 = address::standard(ctx2).expect("manager");

    let mut item = sample_address(&manager1);
    manager1.save_item(&mut item).await.expect("save");
    let id = item.id().expect("id");

    assert!(matches!(
        manager2.get_item(id).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn unknown_search_keys_are_rejected_before_execution() {
    let ctx = memory_context(1).await;
    let manager = address::standard(ctx).expect("manager");

    let criteria = SearchCriteria::new().compare(CompareOp::Eq, "customer.address.nope", json!(1));

    match manager.search_items(&criteria).await {
        Err(StoreError::Config(msg)) => assert!(msg.contains("customer.address.nope")),
        other => panic!("expected config error, got {:?}", other.map(|i| i.len())),
    }
}

#[tokio::test]
async fn catalogue_reports_types_and_attribute_visibility() {
    let ctx = memory_context(1).await;
    let manager = address::standard(ctx).expect("manager");

    assert_eq!(
        manager.resource_type(true).expect("types"),
        vec!["customer/address".to_string()]
    );

    let attrs = manager.search_attributes(true).expect("attributes");
    assert_eq!(attrs.len(), 28);

    let siteid = attrs
        .iter()
        .find(|a| a.code == "customer.address.siteid")
        .expect("siteid attribute");
    assert!(!siteid.public);

    let city = attrs
        .iter()
        .find(|a| a.code == "customer.address.city")
        .expect("city attribute");
    assert!(city.public);
}

#[tokio::test]
async fn sub_manager_names_must_be_registered() {
    let ctx = memory_context(1).await;
    let manager = address::standard(ctx).expect("manager");

    assert!(matches!(
        manager.sub_manager("type"),
        Err(StoreError::Config(_))
    ));
}
