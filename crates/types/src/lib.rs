//! Leaf types shared by every schema crate: measured values, the error
//! taxonomy and the record helpers used to read raw JSON entities.

mod entity;
mod error;
mod fields;
mod value;

pub use entity::EntityKind;
pub use error::SchemaError;
pub use fields::{
    as_record, decode_field, into_record, missing_fields, require_fields, take_block, Record,
};
pub use value::{CellAggregate, LiveValue, LiveValues, MeasuredArray, MeasuredValue, NamedValue};
