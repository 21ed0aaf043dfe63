use std::fmt;
use std::str::FromStr;

/// The configuration entities exchanged with the device, one per subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Battery,
    AcCharger,
    PowerMeter,
    Inverter,
    Network,
    Mqtt,
    ZeroExport,
    MeanWellLimit,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Battery,
        EntityKind::AcCharger,
        EntityKind::PowerMeter,
        EntityKind::Inverter,
        EntityKind::Network,
        EntityKind::Mqtt,
        EntityKind::ZeroExport,
        EntityKind::MeanWellLimit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Battery => "battery",
            EntityKind::AcCharger => "ac_charger",
            EntityKind::PowerMeter => "power_meter",
            EntityKind::Inverter => "inverter",
            EntityKind::Network => "network",
            EntityKind::Mqtt => "mqtt",
            EntityKind::ZeroExport => "zero_export",
            EntityKind::MeanWellLimit => "meanwell_limit",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| format!("unknown entity `{value}`"))
    }
}
