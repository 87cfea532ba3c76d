//! Tests for the configuration-driven manager factory.

use mercado::{create_manager, Config, Context, DatabaseManager, Locale, Manager, StoreError};

async fn context(config: Config) -> Context {
    let db = DatabaseManager::connect(&config).await.expect("connect");
    Context::new(config, db, Locale::new(1), "tester")
}

#[tokio::test]
async fn known_managers_are_created_by_domain_and_path() {
    let ctx = context(Config::default()).await;

    let manager = create_manager(&ctx, "customer", "address", None).expect("manager");
    assert_eq!(
        manager.resource_type(false).expect("types"),
        vec!["customer/address".to_string()]
    );

    let manager = create_manager(&ctx, "customer", "property/type", None).expect("manager");
    assert_eq!(
        manager.resource_type(false).expect("types"),
        vec!["customer/property/type".to_string()]
    );
}

#[tokio::test]
async fn explicit_implementation_names_override_the_configuration() {
    let ctx = context(Config::default()).await;

    match create_manager(&ctx, "customer", "address", Some("Fancy")) {
        Err(StoreError::Config(msg)) => assert!(msg.contains("Fancy")),
        _ => panic!("expected config error"),
    }
}

#[tokio::test]
async fn configured_implementation_names_are_honoured() {
    let mut config = Config::default();
    config.set(
        "customer/manager/address/name",
        toml::Value::String("Custom".into()),
    );
    let ctx = context(config).await;

    match create_manager(&ctx, "customer", "address", None) {
        Err(StoreError::Config(msg)) => assert!(msg.contains("Custom")),
        _ => panic!("expected config error"),
    }
}

#[tokio::test]
async fn unknown_domains_are_config_errors() {
    let ctx = context(Config::default()).await;

    assert!(matches!(
        create_manager(&ctx, "order", "address", None),
        Err(StoreError::Config(_))
    ));
}
