//! Decoded bus values as a closed set of variants.
//!
//! Raw JSON from the bus is classified once, at the boundary, into
//! [`BusValue`]. Nothing past the codec needs to ask whether an object was
//! array-form or key-form.

use serde_json::{Map, Value};

use crate::event::Event;

/// Key carrying the class tag of a wire entity.
pub const CLASS_KEY: &str = "__c";
/// Key carrying the positional field array of a wire entity.
pub const POSITIONAL_KEY: &str = "__p";

/// The two coexisting wire representations of an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum WireForm {
    /// Keys are already semantic field names.
    Named(Map<String, Value>),
    /// Values indexed by the class's field-order table.
    Positional(Vec<Value>),
}

/// An entity as it appeared on the wire, class tag included when present.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEntity {
    pub class: Option<String>,
    pub form: WireForm,
}

impl WireEntity {
    /// Reads an entity out of a JSON value.
    ///
    /// Any object that is not an event is an entity: positional when it
    /// carries a `__p` array, named otherwise. Returns `None` for events,
    /// scalars and lists.
    pub fn parse(value: &Value) -> Option<WireEntity> {
        let obj = value.as_object()?;
        if crate::event::is_event(value) {
            return None;
        }

        let class = obj
            .get(CLASS_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);

        let form = match obj.get(POSITIONAL_KEY) {
            Some(Value::Array(items)) => WireForm::Positional(items.clone()),
            _ => {
                let mut fields = obj.clone();
                fields.remove(CLASS_KEY);
                WireForm::Named(fields)
            }
        };

        Some(WireEntity { class, form })
    }

    /// Looks a field up by name first, then by position.
    ///
    /// A named-form object never falls back to a position, and a positional
    /// array shorter than `index` yields `None` rather than panicking.
    pub fn raw_field(&self, name: &str, index: usize) -> Option<&Value> {
        match &self.form {
            WireForm::Named(fields) => fields.get(name),
            WireForm::Positional(items) => items.get(index),
        }
    }

    /// True for the positional wire form.
    pub fn is_positional(&self) -> bool {
        matches!(self.form, WireForm::Positional(_))
    }

    /// Serializes back to wire JSON.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(class) = &self.class {
            obj.insert(CLASS_KEY.to_string(), Value::String(class.clone()));
        }
        match &self.form {
            WireForm::Positional(items) => {
                obj.insert(POSITIONAL_KEY.to_string(), Value::Array(items.clone()));
            }
            WireForm::Named(fields) => {
                for (key, value) in fields {
                    obj.insert(key.clone(), value.clone());
                }
            }
        }
        Value::Object(obj)
    }
}

/// A bus value after boundary classification.
#[derive(Debug, Clone, PartialEq)]
pub enum BusValue {
    Event(Event),
    Entity(WireEntity),
    List(Vec<BusValue>),
    /// Strings, numbers, booleans and null.
    Scalar(Value),
}

impl BusValue {
    /// Classifies raw JSON, recursing into lists.
    pub fn from_json(value: &Value) -> BusValue {
        if let Some(event) = Event::from_value(value) {
            return BusValue::Event(event);
        }
        match value {
            Value::Array(items) => BusValue::List(items.iter().map(BusValue::from_json).collect()),
            Value::Object(_) => match WireEntity::parse(value) {
                Some(entity) => BusValue::Entity(entity),
                None => BusValue::Scalar(value.clone()),
            },
            other => BusValue::Scalar(other.clone()),
        }
    }

    /// True if this value itself is an event.
    pub fn is_event(&self) -> bool {
        matches!(self, BusValue::Event(_))
    }

    /// First event at any depth of list nesting.
    pub fn find_event(&self) -> Option<&Event> {
        match self {
            BusValue::Event(event) => Some(event),
            BusValue::List(items) => items.iter().find_map(BusValue::find_event),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&WireEntity> {
        match self {
            BusValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BusValue]> {
        match self {
            BusValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            BusValue::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

/// Whole float within i64 range; anything else is not an integer.
pub(crate) fn integral_f64(f: f64) -> Option<i64> {
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}
