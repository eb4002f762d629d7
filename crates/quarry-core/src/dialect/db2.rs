//! IBM Db2 dialects (LUW and IBM i).

use super::{Dialect, DialectKind, LimitStyle, hex};

/// Db2 for LUW.
#[derive(Debug, Default, Clone, Copy)]
pub struct Db2Dialect;

impl Db2Dialect {
    /// Creates a new Db2 dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for Db2Dialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Db2
    }

    fn dates_include_offset(&self) -> bool {
        false
    }

    // Db2 takes the raw bytes as an escaped string.
    fn blob_literal(&self, bytes: &[u8]) -> String {
        let raw = String::from_utf8_lossy(bytes);
        format!("BLOB({})", self.quote_string(&raw))
    }

    fn random_function(&self) -> &'static str {
        "RAND()"
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::FetchFirst
    }
}

/// Db2 for IBM i.
#[derive(Debug, Default, Clone, Copy)]
pub struct IbmiDialect;

impl IbmiDialect {
    /// Creates a new IBM i dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for IbmiDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Ibmi
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn dates_include_offset(&self) -> bool {
        false
    }

    fn blob_literal(&self, bytes: &[u8]) -> String {
        format!("BLOB(X'{}')", hex(bytes))
    }

    fn random_function(&self) -> &'static str {
        "RAND()"
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::FetchFirst
    }
}
