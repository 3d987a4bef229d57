use mysql_async::{Opts, OptsBuilder};

use crate::error::SqlBridgeError;

/// Options applied on top of the connection URL. Set values win over the URL's.
#[derive(Debug, Clone, Default)]
pub struct MySqlConnectionOptions {
    pub stmt_cache_size: Option<usize>,
    /// Statements run once after every connect.
    pub init_statements: Vec<String>,
}

impl MySqlConnectionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stmt_cache_size(mut self, size: usize) -> Self {
        self.stmt_cache_size = Some(size);
        self
    }

    #[must_use]
    pub fn init_statement(mut self, sql: impl Into<String>) -> Self {
        self.init_statements.push(sql.into());
        self
    }

    /// Parse `url` and apply these options over it.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConfigError` for a malformed URL.
    pub fn opts(&self, url: &str) -> Result<Opts, SqlBridgeError> {
        let base = Opts::from_url(url)
            .map_err(|e| SqlBridgeError::ConfigError(format!("invalid mysql url: {e}")))?;
        let mut builder = OptsBuilder::from_opts(base);
        if let Some(size) = self.stmt_cache_size {
            builder = builder.stmt_cache_size(size);
        }
        if !self.init_statements.is_empty() {
            builder = builder.init(self.init_statements.clone());
        }
        Ok(builder.into())
    }
}
