//! Model metadata.
//!
//! The compilers only need a thin view of the application's models: attribute
//! names and their column names, attribute types (to pick literal forms and JSON
//! handling), associations (to resolve order hops) and unique indexes (to
//! enrich constraint errors). The graph is plain data and deserializes from JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

/// Attribute data types understood by the compilers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    /// Short string (`VARCHAR`).
    String,
    /// Unbounded text.
    Text,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Exact decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Timestamp with time zone.
    Date,
    /// Calendar date without time.
    DateOnly,
    /// JSON document.
    Json,
    /// Binary JSON document.
    Jsonb,
    /// Binary data.
    Blob,
    /// UUID.
    Uuid,
    /// Array of an element type.
    Array(Box<DataType>),
    /// Range over a subtype.
    Range(Box<DataType>),
}

impl DataType {
    /// Whether the type stores text.
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Text | Self::Uuid)
    }

    /// Whether the type stores a JSON document.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::Jsonb)
    }

    /// Whether the type is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Whether the type is a range.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Range(_))
    }

    /// Returns the element type of an array or range.
    #[must_use]
    pub fn element(&self) -> Option<&Self> {
        match self {
            Self::Array(inner) | Self::Range(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("STRING"),
            Self::Text => f.write_str("TEXT"),
            Self::Integer => f.write_str("INTEGER"),
            Self::BigInt => f.write_str("BIGINT"),
            Self::Float => f.write_str("FLOAT"),
            Self::Double => f.write_str("DOUBLE"),
            Self::Decimal => f.write_str("DECIMAL"),
            Self::Boolean => f.write_str("BOOLEAN"),
            Self::Date => f.write_str("DATE"),
            Self::DateOnly => f.write_str("DATEONLY"),
            Self::Json => f.write_str("JSON"),
            Self::Jsonb => f.write_str("JSONB"),
            Self::Blob => f.write_str("BLOB"),
            Self::Uuid => f.write_str("UUID"),
            Self::Array(inner) => write!(f, "ARRAY({inner})"),
            Self::Range(inner) => write!(f, "RANGE({inner})"),
        }
    }
}

impl FromStr for DataType {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        if let Some(inner) = upper
            .strip_prefix("ARRAY(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Ok(Self::Array(Box::new(inner.parse()?)));
        }
        if let Some(inner) = upper
            .strip_prefix("RANGE(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Ok(Self::Range(Box::new(inner.parse()?)));
        }
        match upper.as_str() {
            "STRING" | "VARCHAR" | "CHAR" | "CITEXT" => Ok(Self::String),
            "TEXT" => Ok(Self::Text),
            "INTEGER" | "INT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" => Ok(Self::Integer),
            "BIGINT" => Ok(Self::BigInt),
            "FLOAT" | "REAL" => Ok(Self::Float),
            "DOUBLE" | "DOUBLE PRECISION" => Ok(Self::Double),
            "DECIMAL" | "NUMERIC" => Ok(Self::Decimal),
            "BOOLEAN" | "BOOL" => Ok(Self::Boolean),
            "DATE" | "TIMESTAMP" | "TIMESTAMPTZ" => Ok(Self::Date),
            "DATEONLY" => Ok(Self::DateOnly),
            "JSON" => Ok(Self::Json),
            "JSONB" => Ok(Self::Jsonb),
            "BLOB" | "BYTEA" => Ok(Self::Blob),
            "UUID" => Ok(Self::Uuid),
            _ => Err(CompileError::InvalidWhere(format!("unknown data type {s}"))),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = CompileError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}

/// A model attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name used in where trees and order specs.
    pub name: String,
    /// Column name, when it differs from the attribute name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Attribute type.
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl Attribute {
    /// Creates an attribute whose column has the same name.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            field: None,
            data_type,
        }
    }

    /// Sets the column name.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Returns the column name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

/// Association cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationKind {
    /// The source holds the foreign key.
    BelongsTo,
    /// The target holds the foreign key, single row.
    HasOne,
    /// The target holds the foreign key, many rows.
    HasMany,
    /// Many-to-many through a join model.
    BelongsToMany,
}

/// A named association between two models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// Association alias.
    #[serde(rename = "as")]
    pub alias: String,
    /// Target model name.
    pub target: String,
    /// Cardinality.
    pub kind: AssociationKind,
    /// Join model for many-to-many associations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
}

impl Association {
    fn new(alias: impl Into<String>, target: impl Into<String>, kind: AssociationKind) -> Self {
        Self {
            alias: alias.into(),
            target: target.into(),
            kind,
            through: None,
        }
    }

    /// Creates a belongs-to association.
    #[must_use]
    pub fn belongs_to(alias: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(alias, target, AssociationKind::BelongsTo)
    }

    /// Creates a has-one association.
    #[must_use]
    pub fn has_one(alias: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(alias, target, AssociationKind::HasOne)
    }

    /// Creates a has-many association.
    #[must_use]
    pub fn has_many(alias: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(alias, target, AssociationKind::HasMany)
    }

    /// Creates a many-to-many association through a join model.
    #[must_use]
    pub fn belongs_to_many(
        alias: impl Into<String>,
        target: impl Into<String>,
        through: impl Into<String>,
    ) -> Self {
        let mut association = Self::new(alias, target, AssociationKind::BelongsToMany);
        association.through = Some(through.into());
        association
    }
}

/// A unique index, used to enrich constraint errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name as known to the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Column names covered by the index.
    pub fields: Vec<String>,
    /// Custom validation message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl Index {
    /// Creates a unique index over the given columns.
    #[must_use]
    pub fn unique<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            fields: fields.into_iter().map(Into::into).collect(),
            msg: None,
        }
    }

    /// Sets the index name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the custom validation message.
    #[must_use]
    pub fn msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Whether the index covers exactly the given columns, in any order.
    #[must_use]
    pub fn covers(&self, fields: &[String]) -> bool {
        self.fields.len() == fields.len() && fields.iter().all(|f| self.fields.contains(f))
    }
}

/// A model: a table, its attributes, associations and unique indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Model name.
    pub name: String,
    /// Table name.
    pub table: String,
    /// Optional schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Attributes in declaration order.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Outgoing associations.
    #[serde(default)]
    pub associations: Vec<Association>,
    /// Unique indexes.
    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl Model {
    /// Creates an empty model.
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            schema: None,
            attributes: Vec::new(),
            associations: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Sets the schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds an association.
    #[must_use]
    pub fn with_association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    /// Adds a unique index.
    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Looks up an attribute by its column name.
    #[must_use]
    pub fn attribute_by_field(&self, field: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.field_name() == field)
    }

    /// Maps an attribute name to its column name, passing unknown names through.
    #[must_use]
    pub fn field_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.attribute(name).map_or(name, Attribute::field_name)
    }

    /// Looks up an association by alias.
    #[must_use]
    pub fn association(&self, alias: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.alias == alias)
    }

    /// Finds the association reaching `target`, optionally with a given alias.
    #[must_use]
    pub fn association_to(&self, target: &str, alias: Option<&str>) -> Option<&Association> {
        self.associations
            .iter()
            .find(|a| a.target == target && alias.is_none_or(|alias| a.alias == alias))
    }

    /// Finds the unique index covering exactly the given columns.
    #[must_use]
    pub fn unique_index_for(&self, fields: &[String]) -> Option<&Index> {
        self.indexes.iter().find(|index| index.covers(fields))
    }

    /// Finds a unique index by its database name.
    #[must_use]
    pub fn unique_index_named(&self, name: &str) -> Option<&Index> {
        self.indexes
            .iter()
            .find(|index| index.name.as_deref() == Some(name))
    }
}

/// All models known to the compilers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGraph {
    /// Models in declaration order.
    #[serde(default)]
    pub models: Vec<Model>,
}

impl ModelGraph {
    /// Creates an empty graph.
    #[must_use]
    pub const fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Adds a model.
    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    /// Looks up a model by name.
    pub fn model(&self, name: &str) -> Result<&Model> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| CompileError::UnknownModel(name.to_string()))
    }

    /// Looks up a model by table name.
    #[must_use]
    pub fn model_for_table(&self, table: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.table == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Model {
        Model::new("User", "users")
            .with_attribute(Attribute::new("id", DataType::Integer))
            .with_attribute(Attribute::new("createdAt", DataType::Date).field("created_at"))
            .with_association(Association::has_many("Tasks", "Task"))
            .with_index(Index::unique(["username", "email"]).msg("Taken"))
    }

    #[test]
    fn test_data_type_parse() {
        assert_eq!("integer".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!(
            "ARRAY(INTEGER)".parse::<DataType>().unwrap(),
            DataType::Array(Box::new(DataType::Integer))
        );
        assert_eq!(
            "range(date)".parse::<DataType>().unwrap(),
            DataType::Range(Box::new(DataType::Date))
        );
        assert!("GEOMETRY".parse::<DataType>().is_err());
    }

    #[test]
    fn test_field_mapping() {
        let model = user();
        assert_eq!(model.field_name("createdAt"), "created_at");
        assert_eq!(model.field_name("id"), "id");
        assert_eq!(model.field_name("unknown"), "unknown");
        assert_eq!(
            model.attribute_by_field("created_at").map(|a| a.name.as_str()),
            Some("createdAt")
        );
    }

    #[test]
    fn test_association_lookup() {
        let model = user();
        assert!(model.association("Tasks").is_some());
        assert!(model.association_to("Task", None).is_some());
        assert!(model.association_to("Task", Some("Other")).is_none());
        assert!(model.association_to("Project", None).is_none());
    }

    #[test]
    fn test_unique_index_lookup() {
        let model = user();
        let fields = vec!["email".to_string(), "username".to_string()];
        assert_eq!(
            model
                .unique_index_for(&fields)
                .and_then(|i| i.msg.as_deref()),
            Some("Taken")
        );
        assert!(model.unique_index_for(&fields[..1]).is_none());
    }

    #[test]
    fn test_graph_from_json() {
        let graph: ModelGraph = serde_json::from_value(serde_json::json!({
            "models": [{
                "name": "Task",
                "table": "task",
                "attributes": [
                    { "name": "projectId", "field": "project_id", "type": "INTEGER" },
                    { "name": "tags", "type": "ARRAY(STRING)" }
                ],
                "associations": [
                    { "as": "Project", "target": "Project", "kind": "belongsTo" }
                ]
            }]
        }))
        .unwrap();
        let task = graph.model("Task").unwrap();
        assert_eq!(task.field_name("projectId"), "project_id");
        assert_eq!(
            task.attribute("tags").map(|a| &a.data_type),
            Some(&DataType::Array(Box::new(DataType::String)))
        );
        assert!(matches!(
            graph.model("Nope"),
            Err(CompileError::UnknownModel(_))
        ));
    }
}
