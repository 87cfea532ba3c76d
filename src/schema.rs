use crate::database::DatabaseManager;
use crate::error::{StoreError, StoreResult};

/// Creates the persistence tables and indexes if they do not exist yet.
///
/// All tables share the id/siteid/mtime/editor/ctime column convention.
pub async fn create_tables(db: &DatabaseManager) -> StoreResult<()> {
    let mut conn = db.acquire("db-customer").await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "shop_customer_address" (
            "id" INTEGER PRIMARY KEY AUTOINCREMENT,
            "parentid" INTEGER NOT NULL DEFAULT 0,
            "siteid" INTEGER NOT NULL,
            "company" TEXT NOT NULL DEFAULT '',
            "vatid" TEXT NOT NULL DEFAULT '',
            "salutation" TEXT NOT NULL DEFAULT '',
            "title" TEXT NOT NULL DEFAULT '',
            "firstname" TEXT NOT NULL DEFAULT '',
            "lastname" TEXT NOT NULL DEFAULT '',
            "address1" TEXT NOT NULL DEFAULT '',
            "address2" TEXT NOT NULL DEFAULT '',
            "address3" TEXT NOT NULL DEFAULT '',
            "postal" TEXT NOT NULL DEFAULT '',
            "city" TEXT NOT NULL DEFAULT '',
            "state" TEXT NOT NULL DEFAULT '',
            "countryid" TEXT,
            "langid" TEXT,
            "telephone" TEXT NOT NULL DEFAULT '',
            "email" TEXT NOT NULL DEFAULT '',
            "telefax" TEXT NOT NULL DEFAULT '',
            "website" TEXT NOT NULL DEFAULT '',
            "longitude" REAL,
            "latitude" REAL,
            "flag" INTEGER NOT NULL DEFAULT 0,
            "pos" INTEGER NOT NULL DEFAULT 0,
            "mtime" TEXT NOT NULL,
            "editor" TEXT NOT NULL,
            "ctime" TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS "idx_scusad_sid_pid"
            ON "shop_customer_address" ("siteid", "parentid")
        "#,
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS "idx_scusad_sid_lastname"
            ON "shop_customer_address" ("siteid", "lastname")
        "#,
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "shop_customer_property_type" (
            "id" INTEGER PRIMARY KEY AUTOINCREMENT,
            "siteid" INTEGER NOT NULL,
            "code" TEXT NOT NULL,
            "domain" TEXT NOT NULL,
            "label" TEXT NOT NULL,
            "pos" INTEGER NOT NULL DEFAULT 0,
            "status" INTEGER NOT NULL DEFAULT 1,
            "mtime" TEXT NOT NULL,
            "editor" TEXT NOT NULL,
            "ctime" TEXT NOT NULL,
            UNIQUE ("siteid", "domain", "code")
        )
        "#,
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS "idx_scusprty_sid_status"
            ON "shop_customer_property_type" ("siteid", "status")
        "#,
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(())
}
