use core::fmt;

use crate::{
    error::ParserError,
    ubx_packets::{CfgKey, CfgVal, CfgValGetRequest, CfgValGetResponse, CfgValSet},
};

/// Most items any single group may hold
pub const MAX_GROUP_ITEMS: usize = 16;

pub type GroupValues = heapless::Vec<CfgVal, MAX_GROUP_ITEMS>;

/// Configuration groups, in the order the startup handshake verifies them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigGroup {
    Gain,
    Interfaces,
    Signals,
    L5Availability,
    Messages,
    Navigation,
}

impl ConfigGroup {
    pub const ALL: [ConfigGroup; 6] = [
        Self::Gain,
        Self::Interfaces,
        Self::Signals,
        Self::L5Availability,
        Self::Messages,
        Self::Navigation,
    ];

    /// Whether applying a correction only takes effect after a receiver reset
    pub const fn needs_reset(self) -> bool {
        matches!(self, Self::Gain | Self::L5Availability)
    }
}

impl fmt::Display for ConfigGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gain => "LNA gain",
            Self::Interfaces => "interfaces",
            Self::Signals => "GNSS signals",
            Self::L5Availability => "L5 availability",
            Self::Messages => "message output",
            Self::Navigation => "navigation",
        })
    }
}

const GAIN: [CfgVal; 1] = [CfgVal::new(CfgKey::CFG_HW_RF_LNA_MODE, 0)];

const INTERFACES: [CfgVal; 6] = [
    CfgVal::new(CfgKey::CFG_I2C_ENABLED, 0),
    CfgVal::new(CfgKey::CFG_SPI_ENABLED, 0),
    CfgVal::new(CfgKey::CFG_UART1INPROT_UBX, 1),
    CfgVal::new(CfgKey::CFG_UART1INPROT_NMEA, 0),
    CfgVal::new(CfgKey::CFG_UART1OUTPROT_UBX, 1),
    CfgVal::new(CfgKey::CFG_UART1OUTPROT_NMEA, 0),
];

const SIGNALS: [CfgVal; 11] = [
    CfgVal::new(CfgKey::CFG_SIGNAL_GPS_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_GPS_L1CA_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_GPS_L5_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_SBAS_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_SBAS_L1CA_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_GAL_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_GAL_E1_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_GAL_E5A_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_BDS_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_BDS_B1C_ENA, 1),
    CfgVal::new(CfgKey::CFG_SIGNAL_BDS_B2A_ENA, 1),
];

const L5_AVAILABILITY: [CfgVal; 1] = [CfgVal::new(CfgKey::CFG_GPS_L5_HEALTH_OVERRIDE, 1)];

const MESSAGES: [CfgVal; 2] = [
    CfgVal::new(CfgKey::CFG_MSGOUT_UBX_NAV_PVT_UART1, 1),
    CfgVal::new(CfgKey::CFG_MSGOUT_UBX_TIM_TM2_UART1, 1),
];

const NAVIGATION: [CfgVal; 12] = [
    CfgVal::new(CfgKey::CFG_NAVSPG_DYNMODEL, 2),
    CfgVal::new(CfgKey::CFG_NAVSPG_FIXMODE, 3),
    CfgVal::new(CfgKey::CFG_NAVSPG_INIFIX3D, 1),
    CfgVal::new(CfgKey::CFG_NAVSPG_UTCSTANDARD, 3),
    CfgVal::new(CfgKey::CFG_SBAS_USE_RANGING, 0),
    CfgVal::new(CfgKey::CFG_SBAS_USE_INTEGRITY, 0),
    CfgVal::new(CfgKey::CFG_SBAS_USE_DIFFCORR, 1),
    CfgVal::new(CfgKey::CFG_TP_TP1_ENA, 0),
    CfgVal::new(CfgKey::CFG_RATE_MEAS, 500),
    CfgVal::new(CfgKey::CFG_RATE_NAV, 2),
    CfgVal::new(CfgKey::CFG_RATE_TIMEREF, 1),
    CfgVal::new(CfgKey::CFG_TP_TIMEGRID_TP1, 1),
];

const _: () = assert!(SIGNALS.len() <= MAX_GROUP_ITEMS && NAVIGATION.len() <= MAX_GROUP_ITEMS);

/// Required receiver configuration, grouped the way it is verified
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReceiverProfile {
    pub gain: GroupValues,
    pub interfaces: GroupValues,
    pub signals: GroupValues,
    pub l5_availability: GroupValues,
    pub messages: GroupValues,
    pub navigation: GroupValues,
}

impl Default for ReceiverProfile {
    /// Normal LNA gain, UBX only on UART1, GPS/SBAS/Galileo/BeiDou on L1 and
    /// L5, NAV-PVT and TIM-TM2 output, a stationary 1 Hz solution aligned to
    /// GPS time
    fn default() -> Self {
        Self {
            gain: GAIN.iter().copied().collect(),
            interfaces: INTERFACES.iter().copied().collect(),
            signals: SIGNALS.iter().copied().collect(),
            l5_availability: L5_AVAILABILITY.iter().copied().collect(),
            messages: MESSAGES.iter().copied().collect(),
            navigation: NAVIGATION.iter().copied().collect(),
        }
    }
}

impl ReceiverProfile {
    pub fn values(&self, group: ConfigGroup) -> &[CfgVal] {
        match group {
            ConfigGroup::Gain => &self.gain,
            ConfigGroup::Interfaces => &self.interfaces,
            ConfigGroup::Signals => &self.signals,
            ConfigGroup::L5Availability => &self.l5_availability,
            ConfigGroup::Messages => &self.messages,
            ConfigGroup::Navigation => &self.navigation,
        }
    }

    pub fn keys(&self, group: ConfigGroup) -> heapless::Vec<CfgKey, MAX_GROUP_ITEMS> {
        self.values(group).iter().map(|v| v.key).collect()
    }

    /// Items of `group` the receiver reported with another value or did not
    /// report at all
    pub fn divergent(&self, group: ConfigGroup, reported: &CfgValGetResponse) -> GroupValues {
        self.values(group)
            .iter()
            .filter(|want| {
                let got = reported.get(want.key);
                if got != Some(want.value) {
                    log::debug!(
                        "{}: {} is {:?}, want {}",
                        group,
                        KeyName(want.key),
                        got,
                        want.value
                    );
                    return true;
                }
                false
            })
            .copied()
            .collect()
    }

    /// Checks that every group encodes into a single poll and a single set
    /// command, which a profile loaded from a file may not.
    ///
    /// A value wider than its key would be truncated by the receiver and
    /// never read back as requested, so it is rejected here.
    pub fn validate(&self) -> Result<(), ParserError> {
        for group in ConfigGroup::ALL {
            let values = self.values(group);
            if values.iter().any(|v| v.key.value_size().is_none()) {
                return Err(ParserError::InvalidField {
                    packet: "ReceiverProfile",
                    field: "key",
                });
            }
            if let Some(wide) = values.iter().find(|v| !v.fits()) {
                log::warn!(
                    "{}: {} = {:#x} does not fit the key",
                    group,
                    KeyName(wide.key),
                    wide.value
                );
                return Err(ParserError::InvalidField {
                    packet: "ReceiverProfile",
                    field: "value",
                });
            }
            CfgValGetRequest::new(&self.keys(group)).payload()?;
            CfgValSet::new(values).payload()?;
        }
        Ok(())
    }
}

/// Key formatted with its documentation name when known
pub struct KeyName(pub CfgKey);

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#010x}", self.0 .0),
        }
    }
}
