use std::time::Duration;

/// Device whose readings age independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSource {
    Inverter,
    Battery,
    Charger,
    PowerMeter,
}

impl DataSource {
    pub const ALL: [DataSource; 4] = [
        DataSource::Inverter,
        DataSource::Battery,
        DataSource::Charger,
        DataSource::PowerMeter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DataSource::Inverter => "inverter",
            DataSource::Battery => "battery",
            DataSource::Charger => "charger",
            DataSource::PowerMeter => "power_meter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Maximum `data_age` per source before its readings count as stale.
///
/// Staleness is a property of the reading, never a schema error.
#[derive(Debug, Clone, PartialEq)]
pub struct StalenessPolicy {
    pub inverter: Duration,
    pub battery: Duration,
    pub charger: Duration,
    pub power_meter: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            inverter: Duration::from_secs(300),
            battery: Duration::from_secs(60),
            charger: Duration::from_secs(60),
            power_meter: Duration::from_secs(30),
        }
    }
}

impl StalenessPolicy {
    pub fn threshold(&self, source: DataSource) -> Duration {
        match source {
            DataSource::Inverter => self.inverter,
            DataSource::Battery => self.battery,
            DataSource::Charger => self.charger,
            DataSource::PowerMeter => self.power_meter,
        }
    }

    pub fn with_threshold(mut self, source: DataSource, threshold: Duration) -> Self {
        match source {
            DataSource::Inverter => self.inverter = threshold,
            DataSource::Battery => self.battery = threshold,
            DataSource::Charger => self.charger = threshold,
            DataSource::PowerMeter => self.power_meter = threshold,
        }
        self
    }

    /// A reading exactly at the threshold is still fresh.
    pub fn freshness(&self, source: DataSource, data_age_secs: u64) -> Freshness {
        if Duration::from_secs(data_age_secs) > self.threshold(source) {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}
