//! Microsoft SQL Server dialect.

use super::{Dialect, DialectKind, LimitStyle, hex};

/// SQL Server: bracketed identifiers, national strings and numeric booleans.
#[derive(Debug, Default, Clone, Copy)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MssqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mssql
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('[', ']')
    }

    fn string_literal_prefix(&self) -> &'static str {
        "N"
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn blob_literal(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex(bytes))
    }

    fn random_function(&self) -> &'static str {
        "RAND()"
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::OffsetFetch
    }

    fn offset_requires_order(&self) -> bool {
        true
    }
}
