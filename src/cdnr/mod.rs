mod records;
mod resolver;

pub use records::{
    plmn_matches, CarrierConfig, CarrierDisplayNameData, EfSource, OplRecord, PnnRecord, RegState,
    ServiceState, SimRecord,
};
pub use resolver::{
    format_wfc, CarrierDisplayNameResolver, DisplaySettings, DEFAULT_EMERGENCY_ONLY_TEXT,
    DEFAULT_NO_SERVICE_TEXT, DEFAULT_WFC_DATA_FORMAT, DEFAULT_WFC_FLIGHT_MODE_FORMAT,
    DEFAULT_WFC_VOICE_FORMAT,
};
