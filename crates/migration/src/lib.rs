//! One-directional migration of stored configuration records to the current
//! revision of their entity.
//!
//! Revisions are implicit: a record is current when it carries every required
//! field and none of the fields retired by later revisions. Older records are
//! rewritten by an ordered chain of steps, each guarded by a precondition on
//! the record's shape.

mod battery;
mod charger;
mod power_meter;

use serde_json::Value;
use tracing::debug;

use types::{into_record, missing_fields, EntityKind, Record, SchemaError};

pub use battery::{BATTERY_COUNT_DEFAULT, MQTT_VOLTAGE_UNIT_DEFAULT};
pub use charger::{HuaweiDefaults, MeanWellDefaults};
pub use power_meter::{HTTP_TIMEOUT_DEFAULT_MS, POWER_UNIT_DEFAULT, SDM_ADDRESS_DEFAULT, SDM_BAUDRATE_DEFAULT};

/// A pure rewrite from one revision's shape to the next.
///
/// `apply` must leave the record in a state where `applies` no longer holds.
pub struct MigrationStep {
    pub name: &'static str,
    pub applies: fn(&Record) -> bool,
    pub apply: fn(&mut Record),
}

pub struct MigrationChain {
    pub entity: EntityKind,
    /// Fields every current record carries.
    pub required: &'static [&'static str],
    /// Top-level fields retired by a later revision.
    pub legacy: &'static [&'static str],
    pub steps: &'static [MigrationStep],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub record: Record,
    pub applied: Vec<&'static str>,
}

impl MigrationChain {
    pub fn is_current(&self, record: &Record) -> bool {
        self.outstanding(record).is_empty()
    }

    /// Required fields still missing plus legacy fields still present.
    pub fn outstanding(&self, record: &Record) -> Vec<String> {
        let mut outstanding = missing_fields(record, self.required);
        outstanding.extend(
            self.legacy
                .iter()
                .filter(|field| record.contains_key(**field))
                .map(|field| field.to_string()),
        );
        outstanding
    }

    pub fn migrate(&self, mut record: Record) -> Result<Migrated, SchemaError> {
        let mut applied = Vec::new();

        loop {
            if self.is_current(&record) {
                return Ok(Migrated { record, applied });
            }

            let step = self
                .steps
                .iter()
                .find(|step| (step.applies)(&record))
                .ok_or_else(|| SchemaError::UnmigratableSchema {
                    entity: self.entity.to_string(),
                    missing: self.outstanding(&record),
                })?;

            (step.apply)(&mut record);
            if (step.applies)(&record) || applied.len() >= self.steps.len() {
                return Err(SchemaError::UnmigratableSchema {
                    entity: self.entity.to_string(),
                    missing: vec![format!("step `{}` did not converge", step.name)],
                });
            }

            debug!(entity = %self.entity, step = step.name, "migration step applied");
            applied.push(step.name);
        }
    }
}

pub fn chain(kind: EntityKind) -> MigrationChain {
    match kind {
        EntityKind::Battery => battery::chain(),
        EntityKind::AcCharger => charger::chain(),
        EntityKind::PowerMeter => power_meter::chain(),
        EntityKind::Inverter => single_revision(kind, &["id", "serial", "name", "type"]),
        EntityKind::Network => single_revision(kind, &["hostname", "dhcp"]),
        EntityKind::Mqtt => single_revision(kind, &["enabled", "hostname", "port", "topic"]),
        EntityKind::ZeroExport => single_revision(
            kind,
            &["enabled", "InverterId", "MaxGrid", "PowerHysteresis", "MinimumLimit", "Tn"],
        ),
        EntityKind::MeanWellLimit => single_revision(kind, &[]),
    }
}

/// Brings a decoded record of `kind` to the current revision.
pub fn migrate(kind: EntityKind, value: Value) -> Result<Migrated, SchemaError> {
    let record = into_record(kind.name(), value)?;
    chain(kind).migrate(record)
}

fn single_revision(entity: EntityKind, required: &'static [&'static str]) -> MigrationChain {
    MigrationChain {
        entity,
        required,
        legacy: &[],
        steps: &[],
    }
}

/// Moves `flat` into `nested.field`, keeping an existing nested value.
fn nest_field(record: &mut Record, nested: &mut Record, flat: &str, field: &str) {
    if let Some(value) = record.remove(flat) {
        nested.entry(field.to_string()).or_insert(value);
    }
}

fn take_object(record: &mut Record, key: &str) -> Record {
    match record.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Record::new(),
    }
}

fn has_any(record: &Record, fields: &[&str]) -> bool {
    fields.iter().any(|field| record.contains_key(*field))
}
