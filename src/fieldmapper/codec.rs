//! Entity codec: named fields to wire form and back.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use super::record::{FieldValue, Mutation, Record};
use super::registry::{is_mutation_flag, ClassDef, FieldRegistry, MUTATION_FLAG_FIELDS};
use crate::error::{GatewayError, Result};
use crate::event::{self, Event};
use crate::value::{integral_f64, WireEntity, WireForm, CLASS_KEY, POSITIONAL_KEY};

/// Wire spelling of `true` for boolean columns.
pub const WIRE_TRUE: &str = "t";
/// Wire spelling of `false` for boolean columns.
pub const WIRE_FALSE: &str = "f";

/// Encodes and decodes fieldmapper entities against a field registry.
#[derive(Debug, Clone)]
pub struct EntityCodec {
    registry: Arc<FieldRegistry>,
}

impl EntityCodec {
    pub fn new(registry: Arc<FieldRegistry>) -> Self {
        Self { registry }
    }

    /// Codec over the built-in tables.
    pub fn builtin() -> Self {
        Self::new(Arc::new(FieldRegistry::builtin()))
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Encode named fields into the positional wire form.
    ///
    /// Every field name must exist in the class table. Application booleans
    /// become `"t"`/`"f"`; fields not supplied are sent as null. The mutation
    /// flags are set from `mutation` alone.
    pub fn encode(
        &self,
        class: &str,
        fields: &Map<String, Value>,
        mutation: Mutation,
    ) -> Result<Value> {
        let def = self.registry.require(class)?;
        validate_fields(def, fields)?;

        let mut positional = vec![Value::Null; def.fields().len()];
        for (name, value) in fields {
            if let Some(index) = def.position(name) {
                positional[index] = encode_value(value);
            }
        }
        for (flag, set) in flag_values(mutation) {
            if let Some(index) = def.position(flag) {
                positional[index] = set;
            }
        }

        let mut wire = Map::new();
        wire.insert(CLASS_KEY.to_string(), Value::String(class.to_string()));
        wire.insert(POSITIONAL_KEY.to_string(), Value::Array(positional));
        Ok(Value::Object(wire))
    }

    /// Encode named fields into the named wire form.
    ///
    /// Carries every table field (null where not supplied) so it decodes to
    /// the same record as the positional form.
    pub fn encode_named(
        &self,
        class: &str,
        fields: &Map<String, Value>,
        mutation: Mutation,
    ) -> Result<Value> {
        let def = self.registry.require(class)?;
        validate_fields(def, fields)?;

        let mut wire = Map::new();
        wire.insert(CLASS_KEY.to_string(), Value::String(class.to_string()));
        for (_, name) in def.data_fields() {
            let value = fields.get(name).map(encode_value).unwrap_or(Value::Null);
            wire.insert(name.to_string(), value);
        }
        for (flag, set) in flag_values(mutation) {
            wire.insert(flag.to_string(), set);
        }
        Ok(Value::Object(wire))
    }

    /// Decode a wire value of a known class into a record.
    ///
    /// Accepts either wire form. Refuses events, so a missed event check
    /// upstream surfaces as `RemoteEvent` instead of a record of garbage.
    pub fn decode(&self, class: &str, value: &Value) -> Result<Record> {
        let entity = entity_or_error(value)?;
        if let Some(found) = entity.class.as_deref() {
            if found != class {
                return Err(GatewayError::ClassMismatch {
                    expected: class.to_string(),
                    found: found.to_string(),
                });
            }
        }
        let def = self.registry.require(class)?;
        Ok(self.decode_with(def, &entity))
    }

    /// Decode using the class tag the wire value carries.
    pub fn decode_tagged(&self, value: &Value) -> Result<Record> {
        let entity = entity_or_error(value)?;
        let class = entity
            .class
            .clone()
            .ok_or_else(|| GatewayError::NotAnEntity("entity carries no class tag".to_string()))?;
        let def = self.registry.require(&class)?;
        Ok(self.decode_with(def, &entity))
    }

    /// Decode a list of entities of one class.
    ///
    /// Fails with `RemoteEvent` if the value itself, or any element, is an
    /// event.
    pub fn decode_list(&self, class: &str, value: &Value) -> Result<Vec<Record>> {
        if let Some(event) = Event::from_value(value) {
            return Err(GatewayError::RemoteEvent(event));
        }
        match value {
            Value::Array(items) => items.iter().map(|item| self.decode(class, item)).collect(),
            other => Err(GatewayError::NotAnEntity(format!(
                "expected a list of '{class}', got {}",
                kind(other)
            ))),
        }
    }

    /// True iff the value is an in-band event.
    pub fn is_event(&self, value: &Value) -> bool {
        event::is_event(value)
    }

    fn decode_with(&self, def: &ClassDef, entity: &WireEntity) -> Record {
        trace!(
            class = def.tag(),
            positional = entity.is_positional(),
            "Decoding entity"
        );

        let mut record = Record::new(Some(def.tag().to_string()), def.pkey());
        for (index, name) in def.fields().iter().enumerate() {
            let raw = entity.raw_field(name, index);
            if is_mutation_flag(name) {
                let set = raw.and_then(parse_flag).unwrap_or(false);
                record.flags_mut().set(name, set);
                continue;
            }
            let value = match raw {
                Some(raw) => self.decode_field(raw, def.link(name)),
                None => FieldValue::Unknown,
            };
            record.insert(name, value);
        }
        record
    }

    fn decode_field(&self, raw: &Value, link: Option<&str>) -> FieldValue {
        match raw {
            Value::Null => FieldValue::Null,
            Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .map(|item| self.decode_field(item, link))
                    .collect(),
            ),
            Value::Object(_) => {
                if let Some(event) = Event::from_value(raw) {
                    return FieldValue::Event(event);
                }
                match WireEntity::parse(raw) {
                    Some(entity) => self.decode_nested(entity, link, raw),
                    None => FieldValue::Opaque(raw.clone()),
                }
            }
            scalar => FieldValue::Scalar(scalar.clone()),
        }
    }

    fn decode_nested(&self, entity: WireEntity, link: Option<&str>, raw: &Value) -> FieldValue {
        let class = entity.class.clone().or_else(|| link.map(str::to_string));
        if let Some(def) = class.as_deref().and_then(|c| self.registry.get(c)) {
            return FieldValue::Entity(Box::new(self.decode_with(def, &entity)));
        }

        match entity.form {
            WireForm::Positional(_) => FieldValue::Opaque(raw.clone()),
            WireForm::Named(fields) => {
                let mut record = Record::untyped(class);
                for (name, value) in &fields {
                    if is_mutation_flag(name) {
                        let set = parse_flag(value).unwrap_or(false);
                        record.flags_mut().set(name, set);
                    } else {
                        record.insert(name, self.decode_field(value, None));
                    }
                }
                FieldValue::Entity(Box::new(record))
            }
        }
    }
}

fn validate_fields(def: &ClassDef, fields: &Map<String, Value>) -> Result<()> {
    for name in fields.keys() {
        if is_mutation_flag(name) {
            return Err(GatewayError::ReservedField {
                class: def.tag().to_string(),
                field: name.clone(),
            });
        }
        if def.position(name).is_none() {
            return Err(GatewayError::UnknownField {
                class: def.tag().to_string(),
                field: name.clone(),
            });
        }
    }
    Ok(())
}

/// Set flags are sent as 1, unset flags as null: the bus treats any
/// non-empty string, including "f", as true for these.
fn flag_values(mutation: Mutation) -> [(&'static str, Value); 3] {
    let flags = mutation.flags();
    let wire = |set: bool| if set { Value::from(1) } else { Value::Null };
    [
        (MUTATION_FLAG_FIELDS[0], wire(flags.is_new)),
        (MUTATION_FLAG_FIELDS[1], wire(flags.is_changed)),
        (MUTATION_FLAG_FIELDS[2], wire(flags.is_deleted)),
    ]
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Bool(true) => Value::String(WIRE_TRUE.to_string()),
        Value::Bool(false) => Value::String(WIRE_FALSE.to_string()),
        Value::Array(items) => Value::Array(items.iter().map(encode_value).collect()),
        other => other.clone(),
    }
}

fn entity_or_error(value: &Value) -> Result<WireEntity> {
    if let Some(event) = Event::from_value(value) {
        return Err(GatewayError::RemoteEvent(event));
    }
    WireEntity::parse(value)
        .ok_or_else(|| GatewayError::NotAnEntity(format!("got {}", kind(value))))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Parse a wire boolean.
///
/// Accepts exactly `"t"`, `"f"`, `true`, `false`, `1` and `0`. Anything else,
/// including `"true"` and `"1"`, is unknown.
pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == WIRE_TRUE => Some(true),
        Value::String(s) if s == WIRE_FALSE => Some(false),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Integer from a number or a numeric string (ids often arrive as strings).
pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok().filter(|f: &f64| f.is_finite()),
        _ => None,
    }
}

pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Field lookup on raw wire JSON: by name first, then by position.
///
/// Works on named objects, `__p`-carrying objects and bare arrays, so callers
/// never branch on which variant arrived.
pub fn raw_field<'a>(wire: &'a Value, name: &str, index: usize) -> Option<&'a Value> {
    match wire {
        Value::Object(obj) => obj.get(name).or_else(|| match obj.get(POSITIONAL_KEY) {
            Some(Value::Array(items)) => items.get(index),
            _ => None,
        }),
        Value::Array(items) => items.get(index),
        _ => None,
    }
}

pub fn decode_bool(wire: &Value, name: &str, index: usize) -> Option<bool> {
    raw_field(wire, name, index).and_then(parse_flag)
}

pub fn decode_int(wire: &Value, name: &str, index: usize) -> Option<i64> {
    raw_field(wire, name, index).and_then(value_as_i64)
}

pub fn decode_number(wire: &Value, name: &str, index: usize) -> Option<f64> {
    raw_field(wire, name, index).and_then(value_as_f64)
}

pub fn decode_string(wire: &Value, name: &str, index: usize) -> Option<String> {
    raw_field(wire, name, index).and_then(value_as_string)
}
