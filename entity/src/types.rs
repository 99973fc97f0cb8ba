use serde::{Deserialize, Serialize};

/// Access level a scope grants on a single attribute.
///
/// Variant order matters: `Write` outranks `Read` outranks `None`, so the
/// strongest grant wins when merging scopes with `Ord::max`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    None,
    Read,
    Write,
}

impl AccessType {
    pub fn can_read(self) -> bool {
        self >= AccessType::Read
    }

    pub fn can_write(self) -> bool {
        self == AccessType::Write
    }
}

/// One attribute grant inside a scope definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeAccess {
    pub name: String,
    pub access: AccessType,
}

/// Value type of a client-defined metadata attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
}

impl AttributeKind {
    /// Whether a JSON value is a legal instance of this kind.
    pub fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            AttributeKind::String => value.is_string(),
            AttributeKind::Integer => value.is_i64() || value.is_u64(),
            AttributeKind::Float => value.is_number(),
            AttributeKind::Boolean => value.is_boolean(),
            AttributeKind::Datetime => value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
        }
    }
}

/// A metadata attribute definition a client declares for linked accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: AttributeKind,
}
