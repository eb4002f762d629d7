//! Snowflake dialect.

use super::{Dialect, DialectKind};

/// Snowflake: ANSI quoting, offset-less timestamps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnowflakeDialect;

impl SnowflakeDialect {
    /// Creates a new Snowflake dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SnowflakeDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Snowflake
    }

    fn escapes_nul(&self) -> bool {
        true
    }

    fn dates_include_offset(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_dialect() {
        let dialect = SnowflakeDialect::new();
        assert_eq!(dialect.quote_identifier("id"), "\"id\"");
        assert_eq!(dialect.blob_literal(&[0xde, 0xad]), "X'dead'");
        assert_eq!(dialect.random_function(), "RANDOM()");
    }
}
