//! Fieldmapper entities.
//!
//! The bus ships table rows ("fieldmapper entities") in one of two forms:
//!
//! ```text
//! named:       {"__c": "ccs", "id": 1, "name": "Lost", "holdable": "f"}
//! positional:  {"__c": "ccs", "__p": [1, "Lost", "f", ...]}
//! ```
//!
//! The positional indices are defined by a per-class field table held in a
//! [`FieldRegistry`]. [`EntityCodec`] decodes both forms into one [`Record`]
//! shape and encodes records for create/update calls.

mod builtin;
mod codec;
mod record;
mod registry;

pub use builtin::BUILTIN_SCHEMA_VERSION;
pub use codec::{
    decode_bool, decode_int, decode_number, decode_string, parse_flag, raw_field, EntityCodec,
    WIRE_FALSE, WIRE_TRUE,
};
pub use record::{FieldValue, Mutation, MutationFlags, Record};
pub use registry::{
    is_mutation_flag, ClassDef, FieldRegistry, FieldmapperConfig, DEFAULT_PKEY, FLAG_IS_CHANGED,
    FLAG_IS_DELETED, FLAG_IS_NEW, MUTATION_FLAG_FIELDS,
};
