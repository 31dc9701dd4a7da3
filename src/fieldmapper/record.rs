//! Decoded entities.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::codec::{parse_flag, value_as_f64, value_as_i64, value_as_string};
use super::registry::{DEFAULT_PKEY, FLAG_IS_CHANGED, FLAG_IS_DELETED, FLAG_IS_NEW};
use crate::event::Event;

static UNKNOWN: FieldValue = FieldValue::Unknown;

/// One decoded field.
///
/// `Unknown` means the wire value did not carry the field at all, which is
/// different from an explicit `Null` and from `false`/`0`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Unknown,
    Null,
    /// String, number or boolean, as sent.
    Scalar(Value),
    /// A fleshed sub-record.
    Entity(Box<Record>),
    /// A fleshed has-many field, or a plain list.
    List(Vec<FieldValue>),
    /// An event nested inside a field.
    Event(Event),
    /// Nested structure that could not be decoded (unregistered positional class).
    Opaque(Value),
}

impl FieldValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, FieldValue::Unknown)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Boolean from any accepted flag spelling; `None` for anything else.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Scalar(value) => parse_flag(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Scalar(value) => value_as_i64(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Scalar(value) => value_as_f64(value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            FieldValue::Scalar(value) => value_as_string(value),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Record> {
        match self {
            FieldValue::Entity(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Id of a foreign key, whether fleshed into a sub-record or left bare.
    pub fn link_id(&self) -> Option<i64> {
        match self {
            FieldValue::Entity(record) => record.id(),
            other => other.as_i64(),
        }
    }

    /// Plain JSON rendering; `Unknown` renders as `None`.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            FieldValue::Unknown => None,
            FieldValue::Null => Some(Value::Null),
            FieldValue::Scalar(value) | FieldValue::Opaque(value) => Some(value.clone()),
            FieldValue::Entity(record) => Some(Value::Object(record.to_json())),
            FieldValue::List(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json().unwrap_or(Value::Null))
                    .collect(),
            )),
            FieldValue::Event(event) => serde_json::to_value(event).ok(),
        }
    }
}

/// What the caller intends the bus to do with an encoded entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutation {
    /// No flags set (entity passed as a query argument).
    #[default]
    Unchanged,
    /// Create: sets `isnew` only.
    New,
    /// Update: sets `ischanged` only.
    Changed,
    /// Delete: sets `isdeleted` only.
    Deleted,
}

impl Mutation {
    pub fn flags(self) -> MutationFlags {
        MutationFlags {
            is_new: self == Mutation::New,
            is_changed: self == Mutation::Changed,
            is_deleted: self == Mutation::Deleted,
        }
    }
}

/// Mutation flags as decoded from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationFlags {
    pub is_new: bool,
    pub is_changed: bool,
    pub is_deleted: bool,
}

impl MutationFlags {
    pub(crate) fn set(&mut self, flag: &str, value: bool) {
        match flag {
            FLAG_IS_NEW => self.is_new = value,
            FLAG_IS_CHANGED => self.is_changed = value,
            FLAG_IS_DELETED => self.is_deleted = value,
            _ => {}
        }
    }
}

/// A decoded fieldmapper entity with named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    class: Option<String>,
    pkey: String,
    fields: BTreeMap<String, FieldValue>,
    flags: MutationFlags,
}

impl Record {
    pub(crate) fn new(class: Option<String>, pkey: &str) -> Self {
        Self {
            class,
            pkey: pkey.to_string(),
            fields: BTreeMap::new(),
            flags: MutationFlags::default(),
        }
    }

    /// Record decoded without a class table.
    pub(crate) fn untyped(class: Option<String>) -> Self {
        Self::new(class, DEFAULT_PKEY)
    }

    pub(crate) fn insert(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub(crate) fn flags_mut(&mut self) -> &mut MutationFlags {
        &mut self.flags
    }

    /// Class tag, absent for untagged named-form sub-records.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// A field, or `Unknown` when the wire did not carry it.
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&UNKNOWN)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).as_bool()
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).as_i64()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).as_f64()
    }

    pub fn string(&self, name: &str) -> Option<String> {
        self.get(name).as_string()
    }

    /// A fleshed sub-record, if the field was fleshed.
    pub fn entity(&self, name: &str) -> Option<&Record> {
        self.get(name).as_entity()
    }

    /// Id behind a foreign key field, fleshed or not.
    pub fn link_id(&self, name: &str) -> Option<i64> {
        self.get(name).link_id()
    }

    /// Primary key value.
    pub fn id(&self) -> Option<i64> {
        self.int(&self.pkey)
    }

    pub fn flags(&self) -> MutationFlags {
        self.flags
    }

    pub fn is_new(&self) -> bool {
        self.flags.is_new
    }

    pub fn is_changed(&self) -> bool {
        self.flags.is_changed
    }

    pub fn is_deleted(&self) -> bool {
        self.flags.is_deleted
    }

    /// Named JSON object of every known field, for response shaping.
    ///
    /// Values are rendered as they travel on the wire. The field tables
    /// carry no types, so booleans stay `"t"`/`"f"`; use [`Record::bool`]
    /// for a typed read.
    pub fn to_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.to_json().map(|json| (name.clone(), json)))
            .collect()
    }
}
