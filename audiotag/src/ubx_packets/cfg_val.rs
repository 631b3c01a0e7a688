use bitflags::bitflags;

use super::{read_u16, read_u32, PayloadBuf};
use crate::error::ParserError;

/// The CfgValGet message is limited to requesting a maximum of 64 key-value pairs.
pub const MAX_CFG_KEYS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageSize {
    OneBit,
    OneByte,
    TwoBytes,
    FourBytes,
    EightBytes,
}

impl StorageSize {
    pub const fn to_usize(self) -> usize {
        match self {
            Self::OneBit | Self::OneByte => 1,
            Self::TwoBytes => 2,
            Self::FourBytes => 4,
            Self::EightBytes => 8,
        }
    }

    /// Largest value the storage holds
    pub const fn max_value(self) -> u64 {
        match self {
            Self::OneBit => 1,
            Self::OneByte => 0xff,
            Self::TwoBytes => 0xffff,
            Self::FourBytes => 0xffff_ffff,
            Self::EightBytes => u64::MAX,
        }
    }
}

/// 32-bit configuration item key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CfgKey(pub u32);

impl CfgKey {
    pub(crate) const SIZE: usize = 4;

    /// Storage size encoded in bits 28..30, `None` for reserved encodings
    pub const fn value_size(&self) -> Option<StorageSize> {
        match (self.0 >> 28) & 0b111 {
            1 => Some(StorageSize::OneBit),
            2 => Some(StorageSize::OneByte),
            3 => Some(StorageSize::TwoBytes),
            4 => Some(StorageSize::FourBytes),
            5 => Some(StorageSize::EightBytes),
            _ => None,
        }
    }

    pub const fn group_id(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn item_id(&self) -> u8 {
        self.0 as u8
    }
}

macro_rules! cfg_keys {
    ($($(#[$doc:meta])* $name:ident = $key:literal,)+) => {
        impl CfgKey {
            $(
                $(#[$doc])*
                pub const $name: CfgKey = CfgKey($key);
            )+

            /// Receiver documentation name of a known key
            pub const fn name(&self) -> Option<&'static str> {
                match self.0 {
                    $($key => Some(stringify!($name)),)+
                    _ => None,
                }
            }
        }
    };
}

cfg_keys! {
    /// Internal LNA mode, 0 = normal gain, 1 = low gain, 2 = bypass
    CFG_HW_RF_LNA_MODE = 0x20a3_0057,
    CFG_I2C_ENABLED = 0x1051_0003,
    CFG_SPI_ENABLED = 0x1064_0006,
    CFG_UART1INPROT_UBX = 0x1073_0001,
    CFG_UART1INPROT_NMEA = 0x1073_0002,
    CFG_UART1OUTPROT_UBX = 0x1074_0001,
    CFG_UART1OUTPROT_NMEA = 0x1074_0002,
    CFG_SIGNAL_GPS_ENA = 0x1031_001f,
    CFG_SIGNAL_GPS_L1CA_ENA = 0x1031_0001,
    CFG_SIGNAL_GPS_L5_ENA = 0x1031_0004,
    CFG_SIGNAL_SBAS_ENA = 0x1031_0020,
    CFG_SIGNAL_SBAS_L1CA_ENA = 0x1031_0005,
    CFG_SIGNAL_GAL_ENA = 0x1031_0021,
    CFG_SIGNAL_GAL_E1_ENA = 0x1031_0007,
    CFG_SIGNAL_GAL_E5A_ENA = 0x1031_0009,
    CFG_SIGNAL_BDS_ENA = 0x1031_0022,
    CFG_SIGNAL_BDS_B1C_ENA = 0x1031_000f,
    CFG_SIGNAL_BDS_B2A_ENA = 0x1031_0028,
    /// Use GPS L5 signals even while the constellation marks them unhealthy
    CFG_GPS_L5_HEALTH_OVERRIDE = 0x1032_0001,
    CFG_MSGOUT_UBX_NAV_PVT_UART1 = 0x2091_0007,
    CFG_MSGOUT_UBX_TIM_TM2_UART1 = 0x2091_0179,
    /// Dynamic platform model, 2 = stationary
    CFG_NAVSPG_DYNMODEL = 0x2011_0021,
    /// 1 = 2D only, 2 = 3D only, 3 = auto 2D/3D
    CFG_NAVSPG_FIXMODE = 0x2011_0011,
    CFG_NAVSPG_INIFIX3D = 0x1011_0013,
    /// 3 = UTC as operated by the USNO, derived from GPS time
    CFG_NAVSPG_UTCSTANDARD = 0x2011_001c,
    CFG_SBAS_USE_RANGING = 0x1036_0003,
    CFG_SBAS_USE_DIFFCORR = 0x1036_0004,
    CFG_SBAS_USE_INTEGRITY = 0x1036_0005,
    CFG_TP_TP1_ENA = 0x1005_0007,
    /// Time grid of time pulse 1, 1 = GPS
    CFG_TP_TIMEGRID_TP1 = 0x2005_000c,
    /// Measurement period in milliseconds
    CFG_RATE_MEAS = 0x3021_0001,
    /// Measurements per navigation solution
    CFG_RATE_NAV = 0x3021_0002,
    /// Time system measurements are aligned to, 1 = GPS
    CFG_RATE_TIMEREF = 0x2021_0003,
}

/// One configuration item, value held raw in the low bytes of a `u64`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CfgVal {
    pub key: CfgKey,
    pub value: u64,
}

impl CfgVal {
    pub const fn new(key: CfgKey, value: u64) -> Self {
        Self { key, value }
    }

    /// Whether the key has a known size and the value survives encoding
    pub fn fits(&self) -> bool {
        self.key
            .value_size()
            .is_some_and(|size| self.value <= size.max_value())
    }

    /// Encoded length: key plus value storage
    pub fn encoded_len(&self) -> usize {
        CfgKey::SIZE + self.key.value_size().map_or(0, StorageSize::to_usize)
    }

    /// Parses the key/value pair at the start of `buf`
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < CfgKey::SIZE {
            return None;
        }
        let key = CfgKey(read_u32(buf, 0));
        let size = key.value_size()?.to_usize();
        let raw = buf.get(CfgKey::SIZE..CfgKey::SIZE + size)?;
        let mut value = [0u8; 8];
        value[..size].copy_from_slice(raw);
        Some(Self {
            key,
            value: u64::from_le_bytes(value),
        })
    }

    fn extend_to(&self, out: &mut PayloadBuf) -> Result<(), ParserError> {
        let size = self.key.value_size().ok_or(ParserError::InvalidField {
            packet: "CfgValSet",
            field: "key",
        })?;
        let got = out.len() + self.encoded_len();
        let value = self.value.to_le_bytes();
        out.extend_from_slice(&self.key.0.to_le_bytes())
            .and_then(|()| out.extend_from_slice(&value[..size.to_usize()]))
            .map_err(|()| too_long("CfgValSet", got))
    }
}

fn too_long(packet: &'static str, got: usize) -> ParserError {
    ParserError::InvalidPacketLen {
        packet,
        expect: crate::constants::UBX_MAX_PAYLOAD_LEN,
        got,
    }
}

/// The configuration layer to read from. The configuration system in the
/// receiver is stacked, so a property may be empty for a particular layer
/// and you will receive a NAK.
#[repr(u8)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CfgLayerGet {
    /// Read from RAM, the configuration in effect
    #[default]
    Ram = 0,
    /// Read from BBR (battery backed RAM)
    Bbr = 1,
    /// Read from Flash, if available
    Flash = 2,
    /// Read the current configuration from the active source
    Default = 7,
}

impl From<u8> for CfgLayerGet {
    fn from(raw: u8) -> Self {
        match raw {
            1 => Self::Bbr,
            2 => Self::Flash,
            7 => Self::Default,
            _ => Self::Ram,
        }
    }
}

bitflags! {
    /// A mask describing where configuration is applied.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CfgLayerSet: u8 {
        const RAM = 0b001;
        const BBR = 0b010;
        const FLASH = 0b100;
    }
}

impl Default for CfgLayerSet {
    fn default() -> Self {
        Self::RAM | Self::BBR | Self::FLASH
    }
}

/// CFG-VALGET poll. The receiver NAKs unknown keys and more than 64 keys.
#[derive(Debug, Clone, Copy)]
pub struct CfgValGetRequest<'a> {
    pub layer: CfgLayerGet,
    pub position: u16,
    pub keys: &'a [CfgKey],
}

impl<'a> CfgValGetRequest<'a> {
    pub const CLASS: u8 = 0x06;
    pub const ID: u8 = 0x8b;

    pub fn new(keys: &'a [CfgKey]) -> Self {
        Self {
            layer: CfgLayerGet::Ram,
            position: 0,
            keys,
        }
    }

    pub fn payload(&self) -> Result<PayloadBuf, ParserError> {
        let len = 4 + CfgKey::SIZE * self.keys.len();
        if self.keys.len() > MAX_CFG_KEYS || len > crate::constants::UBX_MAX_PAYLOAD_LEN {
            return Err(too_long("CfgValGetRequest", len));
        }
        let mut out = PayloadBuf::new();
        let position = self.position.to_le_bytes();
        out.extend_from_slice(&[0, self.layer as u8, position[0], position[1]])
            .map_err(|()| too_long("CfgValGetRequest", len))?;
        for key in self.keys {
            out.extend_from_slice(&key.0.to_le_bytes())
                .map_err(|()| too_long("CfgValGetRequest", len))?;
        }
        Ok(out)
    }
}

/// CFG-VALSET command
#[derive(Debug, Clone, Copy)]
pub struct CfgValSet<'a> {
    pub layers: CfgLayerSet,
    pub values: &'a [CfgVal],
}

impl<'a> CfgValSet<'a> {
    pub const CLASS: u8 = 0x06;
    pub const ID: u8 = 0x8a;

    pub fn new(values: &'a [CfgVal]) -> Self {
        Self {
            layers: CfgLayerSet::default(),
            values,
        }
    }

    pub fn payload(&self) -> Result<PayloadBuf, ParserError> {
        let mut out = PayloadBuf::new();
        out.extend_from_slice(&[0, self.layers.bits(), 0, 0])
            .map_err(|()| too_long("CfgValSet", 4))?;
        for val in self.values {
            val.extend_to(&mut out)?;
        }
        Ok(out)
    }
}

/// CFG-VALGET answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgValGetResponse {
    pub version: u8,
    pub layer: CfgLayerGet,
    pub position: u16,
    pub values: heapless::Vec<CfgVal, MAX_CFG_KEYS>,
}

impl CfgValGetResponse {
    pub const CLASS: u8 = 0x06;
    pub const ID: u8 = 0x8b;
    pub const MIN_PACKET_LEN: usize = 4;

    /// Decodes the header and as many key/value pairs as are well formed;
    /// a trailing pair with a reserved size encoding or short value ends the list.
    pub fn parse(payload: &[u8]) -> Result<Self, ParserError> {
        if payload.len() < Self::MIN_PACKET_LEN {
            return Err(ParserError::InvalidPacketLen {
                packet: "CfgValGetResponse",
                expect: Self::MIN_PACKET_LEN,
                got: payload.len(),
            });
        }
        let mut values = heapless::Vec::new();
        for val in CfgValIter::new(&payload[4..]) {
            if values.push(val).is_err() {
                break;
            }
        }
        Ok(Self {
            version: payload[0],
            layer: CfgLayerGet::from(payload[1]),
            position: read_u16(payload, 2),
            values,
        })
    }

    pub fn get(&self, key: CfgKey) -> Option<u64> {
        self.values.iter().find(|v| v.key == key).map(|v| v.value)
    }
}

#[derive(Debug, Clone)]
pub struct CfgValIter<'a> {
    data: &'a [u8],
}

impl<'a> CfgValIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl Iterator for CfgValIter<'_> {
    type Item = CfgVal;

    fn next(&mut self) -> Option<Self::Item> {
        let cfg_val = CfgVal::parse(self.data)?;
        self.data = &self.data[cfg_val.encoded_len()..];
        Some(cfg_val)
    }
}
