/// Inputs to carrier display-name resolution
///
/// SIM records (USIM/RUIM), carrier configuration and the live service state,
/// plus the resolved output record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Origin of an elementary-file value.
///
/// Declaration order is priority order, lowest first, so `Ord` compares
/// priority directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfSource {
    Ruim,
    Usim,
    CarrierConfig,
    /// Operator brand override installed by a privileged carrier app
    BrandOverride,
}

impl EfSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EfSource::Ruim => "ruim",
            EfSource::Usim => "usim",
            EfSource::CarrierConfig => "carrier_config",
            EfSource::BrandOverride => "brand_override",
        }
    }
}

/// One EF_PNN entry (PLMN network name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnnRecord {
    pub full_name: String,
    #[serde(default)]
    pub short_name: Option<String>,
}

impl PnnRecord {
    pub fn new(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            short_name: None,
        }
    }

    /// Parse a carrier-config PNN override entry: `"long name, short name"`.
    /// Returns None when the long name is empty.
    pub fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split(',').map(str::trim);
        let full_name = parts.next().filter(|s| !s.is_empty())?;
        let short_name = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        Some(Self {
            full_name: full_name.to_string(),
            short_name,
        })
    }
}

/// One EF_OPL entry: maps a PLMN pattern and LAC range to a PNN record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OplRecord {
    /// MCC+MNC, where `D`/`d` matches any digit
    pub plmn: String,
    pub lac_start: u32,
    pub lac_end: u32,
    /// 1-based index into the PNN list; 0 means use the network-provided name
    pub pnn_record_id: u32,
}

impl OplRecord {
    /// Check whether this entry covers the registered PLMN and location area.
    /// An unknown LAC only matches on the PLMN pattern.
    pub fn matches(&self, plmn: &str, lac: Option<u32>) -> bool {
        if !plmn_matches(&self.plmn, plmn) {
            return false;
        }
        match lac {
            Some(lac) => self.lac_start <= lac && lac <= self.lac_end,
            None => true,
        }
    }
}

/// Compare a PLMN pattern against a concrete MCC+MNC string.
pub fn plmn_matches(pattern: &str, plmn: &str) -> bool {
    pattern.len() == plmn.len()
        && pattern
            .bytes()
            .zip(plmn.bytes())
            .all(|(p, c)| p == c || ((p == b'D' || p == b'd') && c.is_ascii_digit()))
}

/// Fields read from a USIM or RUIM application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimRecord {
    pub service_provider_name: Option<String>,
    pub pnn: Vec<PnnRecord>,
    pub opl: Vec<OplRecord>,
    pub ehplmns: BTreeSet<String>,
    pub spdi: BTreeSet<String>,
    /// Raw EF_SPN display condition byte. Stored and reported, not interpreted.
    pub carrier_name_display_condition: Option<u32>,
}

/// Carrier configuration values relevant to the displayed name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierConfig {
    pub carrier_name: Option<String>,
    pub spdi_override: BTreeSet<String>,
    pub ehplmn_override: BTreeSet<String>,
    /// `"long, short"` entries
    pub pnn_override: Vec<String>,
    pub carrier_name_display_condition_override: Option<u32>,
}

/// Registration state of one domain (voice or data)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegState {
    InService,
    #[default]
    OutOfService,
    EmergencyOnly,
    PowerOff,
}

/// Live network state of the phone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceState {
    pub voice_reg_state: RegState,
    pub data_reg_state: RegState,
    /// Registered PLMN (MCC+MNC)
    pub operator_numeric: Option<String>,
    /// Network-provided long operator name
    pub operator_alpha_long: Option<String>,
    pub is_roaming: bool,
    pub is_emergency_only: bool,
    pub lac: Option<u32>,
}

impl ServiceState {
    /// In service on either voice or data
    pub fn is_in_service(&self) -> bool {
        self.voice_reg_state == RegState::InService || self.data_reg_state == RegState::InService
    }

    pub fn is_emergency_only(&self) -> bool {
        self.is_emergency_only || self.voice_reg_state == RegState::EmergencyOnly
    }

    pub fn is_power_off(&self) -> bool {
        self.voice_reg_state == RegState::PowerOff && self.data_reg_state == RegState::PowerOff
    }

    /// Convenience for an in-service state registered on `plmn`
    pub fn in_service(plmn: &str, is_roaming: bool) -> Self {
        Self {
            voice_reg_state: RegState::InService,
            data_reg_state: RegState::InService,
            operator_numeric: Some(plmn.to_string()),
            is_roaming,
            ..Default::default()
        }
    }
}

/// Resolved carrier name to show to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierDisplayNameData {
    pub spn: Option<String>,
    pub data_spn: Option<String>,
    pub show_spn: bool,
    pub plmn: Option<String>,
    pub show_plmn: bool,
}

impl CarrierDisplayNameData {
    pub fn spn(&self) -> Option<&str> {
        self.spn.as_deref()
    }

    pub fn data_spn(&self) -> Option<&str> {
        self.data_spn.as_deref()
    }

    pub fn should_show_spn(&self) -> bool {
        self.show_spn
    }

    pub fn plmn(&self) -> Option<&str> {
        self.plmn.as_deref()
    }

    pub fn should_show_plmn(&self) -> bool {
        self.show_plmn
    }
}
