//! CQL column types

use std::fmt;

/// Type of a column or UDT field
///
/// `Display` renders the CQL type expression, e.g. `map<text, frozen<video_format>>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Int,
    BigInt,
    Boolean,
    Float,
    Double,
    Uuid,
    TimeUuid,
    Timestamp,
    Blob,
    Counter,
    Set(Box<ColumnType>),
    List(Box<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
    /// A frozen user-defined type, referenced by name
    Frozen(String),
    /// Fixed-length float vector used by vector search
    Vector(usize),
}

impl ColumnType {
    pub fn set_of(element: ColumnType) -> Self {
        ColumnType::Set(Box::new(element))
    }

    pub fn list_of(element: ColumnType) -> Self {
        ColumnType::List(Box::new(element))
    }

    pub fn map_of(key: ColumnType, value: ColumnType) -> Self {
        ColumnType::Map(Box::new(key), Box::new(value))
    }

    pub fn frozen_udt(name: impl Into<String>) -> Self {
        ColumnType::Frozen(name.into())
    }

    pub fn is_counter(&self) -> bool {
        matches!(self, ColumnType::Counter)
    }

    /// Non-frozen collections, which cannot be part of a primary key
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            ColumnType::Set(_) | ColumnType::List(_) | ColumnType::Map(_, _)
        )
    }

    /// Names of the user-defined types referenced anywhere inside this type
    pub fn referenced_udts(&self) -> Vec<&str> {
        match self {
            ColumnType::Frozen(name) => vec![name.as_str()],
            ColumnType::Set(inner) | ColumnType::List(inner) => inner.referenced_udts(),
            ColumnType::Map(key, value) => {
                let mut names = key.referenced_udts();
                names.extend(value.referenced_udts());
                names
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => f.write_str("text"),
            ColumnType::Int => f.write_str("int"),
            ColumnType::BigInt => f.write_str("bigint"),
            ColumnType::Boolean => f.write_str("boolean"),
            ColumnType::Float => f.write_str("float"),
            ColumnType::Double => f.write_str("double"),
            ColumnType::Uuid => f.write_str("uuid"),
            ColumnType::TimeUuid => f.write_str("timeuuid"),
            ColumnType::Timestamp => f.write_str("timestamp"),
            ColumnType::Blob => f.write_str("blob"),
            ColumnType::Counter => f.write_str("counter"),
            ColumnType::Set(inner) => write!(f, "set<{inner}>"),
            ColumnType::List(inner) => write!(f, "list<{inner}>"),
            ColumnType::Map(key, value) => write!(f, "map<{key}, {value}>"),
            ColumnType::Frozen(name) => write!(f, "frozen<{name}>"),
            ColumnType::Vector(dimension) => write!(f, "vector<float, {dimension}>"),
        }
    }
}
