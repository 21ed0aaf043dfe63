//! Live-status documents published by the device.
//!
//! The aggregate document is read section by section: a subsystem that is
//! switched off, missing, or malformed never prevents the rest of the
//! document from being used.

mod aggregate;
mod inverter;
mod section;
mod staleness;
mod status;

pub use aggregate::{
    parse, BatterySummary, ChargerSummary, Hints, LiveDataParser, LiveDataSnapshot,
    LiveSubsystem, PowerMeterSummary, ProducerSummary, SectionProblem, Totals,
};
pub use inverter::{ChannelStats, Channels, InverterStatus};
pub use section::{decode_section, Section, Subsystem};
pub use staleness::{DataSource, Freshness, StalenessPolicy};
pub use status::{
    cell_spread, parse_battery_status, parse_huawei_status, parse_meanwell_status,
    parse_refusol_status, BatteryIssue, BatteryStatus, HuaweiStatus, IssueSeverity,
    MeanWellStatus, PackStatus, RefusolStatus,
};
