use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use types::{as_record, MeasuredArray, MeasuredValue, SchemaError};

use crate::inverter::InverterStatus;
use crate::section::{decode_section_as, Section, Subsystem};
use crate::staleness::{DataSource, Freshness, StalenessPolicy};

/// Optional subsystem sections of the live-data document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiveSubsystem {
    Battery,
    PowerMeter,
    MeanWell,
    Huawei,
    Refusol,
    Vedirect,
}

impl LiveSubsystem {
    pub const ALL: [LiveSubsystem; 6] = [
        LiveSubsystem::Battery,
        LiveSubsystem::PowerMeter,
        LiveSubsystem::MeanWell,
        LiveSubsystem::Huawei,
        LiveSubsystem::Refusol,
        LiveSubsystem::Vedirect,
    ];

    /// Key of the section in the document.
    pub fn name(self) -> &'static str {
        match self {
            LiveSubsystem::Battery => "battery",
            LiveSubsystem::PowerMeter => "power_meter",
            LiveSubsystem::MeanWell => "meanwell",
            LiveSubsystem::Huawei => "huawei",
            LiveSubsystem::Refusol => "refusol",
            LiveSubsystem::Vedirect => "vedirect",
        }
    }
}

impl fmt::Display for LiveSubsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LiveSubsystem {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        LiveSubsystem::ALL
            .into_iter()
            .find(|subsystem| subsystem.name() == normalized)
            .ok_or_else(|| format!("unknown live subsystem `{value}`"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Totals {
    #[serde(rename = "Power")]
    pub power: MeasuredValue,
    #[serde(rename = "YieldDay")]
    pub yield_day: MeasuredValue,
    #[serde(rename = "YieldTotal")]
    pub yield_total: MeasuredValue,
}

impl Section for Totals {
    const NAME: &'static str = "total";
    const REQUIRED: &'static [&'static str] = &["Power", "YieldDay", "YieldTotal"];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Hints {
    pub time_sync: bool,
    pub default_password: bool,
    pub radio_problem: bool,
}

impl Section for Hints {
    const NAME: &'static str = "hints";
    const REQUIRED: &'static [&'static str] = &["time_sync", "default_password", "radio_problem"];
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatterySummary {
    #[serde(default)]
    pub soc: Option<MeasuredValue>,
    #[serde(default)]
    pub voltage: Option<MeasuredValue>,
    #[serde(default)]
    pub power: Option<MeasuredValue>,
    #[serde(default)]
    pub current: Option<MeasuredValue>,
}

impl Section for BatterySummary {
    const NAME: &'static str = "battery";
    const REQUIRED: &'static [&'static str] = &[];
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PowerMeterSummary {
    #[serde(rename = "GridPower")]
    pub grid_power: MeasuredValue,
    #[serde(rename = "HousePower")]
    pub house_power: MeasuredValue,
}

impl Section for PowerMeterSummary {
    const NAME: &'static str = "power_meter";
    const REQUIRED: &'static [&'static str] = &["GridPower", "HousePower"];
}

/// Charger input power, shared by the Meanwell and Huawei sections.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChargerSummary {
    #[serde(rename = "Power")]
    pub power: MeasuredValue,
}

impl Section for ChargerSummary {
    const NAME: &'static str = "charger";
    const REQUIRED: &'static [&'static str] = &["Power"];
}

/// Totals of a secondary producer (REFUsol inverter, Victron MPPT).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProducerSummary {
    pub total: Totals,
}

impl Section for ProducerSummary {
    const NAME: &'static str = "producer";
    const REQUIRED: &'static [&'static str] = &["total"];
}

/// A core section (inverters, total, hours, hints) that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionProblem {
    pub section: String,
    pub error: SchemaError,
}

/// One complete live-data document. Replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDataSnapshot {
    pub inverters: Vec<InverterStatus>,
    pub total: Option<Totals>,
    pub hours: Option<MeasuredArray>,
    pub hints: Option<Hints>,
    pub battery: Subsystem<BatterySummary>,
    pub power_meter: Subsystem<PowerMeterSummary>,
    pub meanwell: Subsystem<ChargerSummary>,
    pub huawei: Subsystem<ChargerSummary>,
    pub refusol: Subsystem<ProducerSummary>,
    pub vedirect: Subsystem<ProducerSummary>,
    /// Sections present in the document but outside the parser's subsystem set.
    pub ignored: Vec<LiveSubsystem>,
    pub problems: Vec<SectionProblem>,
}

impl LiveDataSnapshot {
    /// Subsystems that were present and enabled but unreadable.
    pub fn malformed(&self) -> Vec<(LiveSubsystem, &SchemaError)> {
        let sections = [
            (LiveSubsystem::Battery, self.battery.error()),
            (LiveSubsystem::PowerMeter, self.power_meter.error()),
            (LiveSubsystem::MeanWell, self.meanwell.error()),
            (LiveSubsystem::Huawei, self.huawei.error()),
            (LiveSubsystem::Refusol, self.refusol.error()),
            (LiveSubsystem::Vedirect, self.vedirect.error()),
        ];
        sections
            .into_iter()
            .filter_map(|(subsystem, error)| error.map(|error| (subsystem, error)))
            .collect()
    }

    pub fn stale_inverters<'a>(
        &'a self,
        policy: &'a StalenessPolicy,
    ) -> impl Iterator<Item = &'a InverterStatus> + 'a {
        self.inverters.iter().filter(move |inverter| {
            policy.freshness(DataSource::Inverter, inverter.data_age) == Freshness::Stale
        })
    }
}

/// Parses live-data documents for a configurable set of optional subsystems.
///
/// The default set covers every known subsystem, including the Huawei,
/// REFUsol and Victron sections that some firmware builds leave out.
#[derive(Debug, Clone)]
pub struct LiveDataParser {
    subsystems: BTreeSet<LiveSubsystem>,
}

impl Default for LiveDataParser {
    fn default() -> Self {
        Self::with_subsystems(LiveSubsystem::ALL)
    }
}

impl LiveDataParser {
    pub fn with_subsystems(subsystems: impl IntoIterator<Item = LiveSubsystem>) -> Self {
        Self {
            subsystems: subsystems.into_iter().collect(),
        }
    }

    pub fn subsystems(&self) -> impl Iterator<Item = LiveSubsystem> + '_ {
        self.subsystems.iter().copied()
    }

    /// Only unparseable bytes or a non-object root fail; every section is read independently.
    pub fn parse(&self, bytes: &[u8]) -> Result<LiveDataSnapshot, SchemaError> {
        let value: Value = serde_json::from_slice(bytes)?;
        self.parse_value(&value)
    }

    pub fn parse_value(&self, value: &Value) -> Result<LiveDataSnapshot, SchemaError> {
        let root = as_record("live_data", value)?;
        let mut problems = Vec::new();

        let inverters = parse_inverters(root.get("inverters"), &mut problems);
        let total = core_section::<Totals>("total", root.get("total"), &mut problems);
        // Older firmware nests the hourly yield inside `total`.
        let hours_raw = root
            .get("hours")
            .or_else(|| root.get("total").and_then(|total| total.get("hours")));
        let hours = match hours_raw {
            None | Some(Value::Null) => None,
            Some(raw) => match MeasuredArray::from_json(raw) {
                Ok(hours) => Some(hours),
                Err(error) => {
                    report("hours", error, &mut problems);
                    None
                }
            },
        };
        let hints = core_section::<Hints>("hints", root.get("hints"), &mut problems);

        let mut ignored = Vec::new();
        let mut section = |subsystem: LiveSubsystem| {
            let raw = root.get(subsystem.name());
            if self.subsystems.contains(&subsystem) {
                raw
            } else {
                if raw.is_some_and(|raw| !raw.is_null()) {
                    debug!(section = subsystem.name(), "live-data section ignored");
                    ignored.push(subsystem);
                }
                None
            }
        };

        let battery = subsystem(LiveSubsystem::Battery, section(LiveSubsystem::Battery));
        let power_meter = subsystem(LiveSubsystem::PowerMeter, section(LiveSubsystem::PowerMeter));
        let meanwell = subsystem(LiveSubsystem::MeanWell, section(LiveSubsystem::MeanWell));
        let huawei = subsystem(LiveSubsystem::Huawei, section(LiveSubsystem::Huawei));
        let refusol = subsystem(LiveSubsystem::Refusol, section(LiveSubsystem::Refusol));
        let vedirect = subsystem(LiveSubsystem::Vedirect, section(LiveSubsystem::Vedirect));

        Ok(LiveDataSnapshot {
            inverters,
            total,
            hours,
            hints,
            battery,
            power_meter,
            meanwell,
            huawei,
            refusol,
            vedirect,
            ignored,
            problems,
        })
    }
}

/// Parses with every known subsystem enabled.
pub fn parse(bytes: &[u8]) -> Result<LiveDataSnapshot, SchemaError> {
    LiveDataParser::default().parse(bytes)
}

fn subsystem<T: Section>(kind: LiveSubsystem, raw: Option<&Value>) -> Subsystem<T> {
    let parsed = Subsystem::from_section(kind.name(), raw);
    if let Subsystem::Malformed(error) = &parsed {
        warn!(section = kind.name(), error = %error, "live-data section malformed");
    }
    parsed
}

fn core_section<T: Section>(
    name: &str,
    raw: Option<&Value>,
    problems: &mut Vec<SectionProblem>,
) -> Option<T> {
    match raw {
        None | Some(Value::Null) => None,
        Some(raw) => match decode_section_as::<T>(name, raw.clone()) {
            Ok(section) => Some(section),
            Err(error) => {
                report(name, error, problems);
                None
            }
        },
    }
}

fn parse_inverters(raw: Option<&Value>, problems: &mut Vec<SectionProblem>) -> Vec<InverterStatus> {
    let items = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            report(
                "inverters",
                SchemaError::mismatch("inverters", "expected an array"),
                problems,
            );
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let name = format!("inverters[{index}]");
            match decode_section_as::<InverterStatus>(&name, item.clone()) {
                Ok(inverter) => Some(inverter),
                Err(error) => {
                    report(&name, error, problems);
                    None
                }
            }
        })
        .collect()
}

fn report(section: &str, error: SchemaError, problems: &mut Vec<SectionProblem>) {
    warn!(section, error = %error, "live-data section malformed");
    problems.push(SectionProblem {
        section: section.to_string(),
        error,
    });
}
