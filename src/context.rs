use std::sync::Arc;

use crate::config::Config;
use crate::database::DatabaseManager;

/// Tenant scope: the current site and the sites visible from it
#[derive(Debug, Clone)]
pub struct Locale {
    site_id: i64,
    site_path: Vec<i64>,
}

impl Locale {
    /// Creates a locale for a single site without inherited visibility
    pub fn new(site_id: i64) -> Self {
        Self {
            site_id,
            site_path: vec![site_id],
        }
    }

    /// Sets the full list of site IDs visible from the current site.
    ///
    /// The list should contain the current site itself.
    pub fn with_site_path(mut self, site_path: Vec<i64>) -> Self {
        self.site_path = site_path;
        self
    }

    /// Site ID all writes and deletes are bound to
    pub fn site_id(&self) -> i64 {
        self.site_id
    }

    /// Site IDs searches may return records from
    pub fn site_path(&self) -> &[i64] {
        &self.site_path
    }
}

/// Shared handles every manager operates with: configuration, connection
/// pools, the tenant locale and the editor identity stamped into writes
#[derive(Debug, Clone)]
pub struct Context {
    config: Arc<Config>,
    db: Arc<DatabaseManager>,
    locale: Locale,
    editor: String,
}

impl Context {
    pub fn new(config: Config, db: DatabaseManager, locale: Locale, editor: &str) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(db),
            locale,
            editor: editor.to_string(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Identity recorded in the editor column of every saved record
    pub fn editor(&self) -> &str {
        &self.editor
    }

    /// Returns a context for another tenant scope sharing the same pools
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}
