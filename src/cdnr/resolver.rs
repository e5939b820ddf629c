/// Carrier display-name resolver
///
/// Collects EF values from every source, keeps each field tagged with the
/// source that supplied it, and computes the SPN/PLMN pair to show from the
/// current sources plus the live service state.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use super::records::{
    CarrierConfig, CarrierDisplayNameData, EfSource, OplRecord, PnnRecord, ServiceState, SimRecord,
};

pub const DEFAULT_NO_SERVICE_TEXT: &str = "No service";
pub const DEFAULT_EMERGENCY_ONLY_TEXT: &str = "Emergency calls only";
pub const DEFAULT_WFC_VOICE_FORMAT: &str = "%s Wi-Fi Calling";
pub const DEFAULT_WFC_DATA_FORMAT: &str = "%s Wi-Fi";
pub const DEFAULT_WFC_FLIGHT_MODE_FORMAT: &str = "%s";

/// Display strings and formats used by the resolver
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub no_service_text: String,
    pub emergency_only_text: String,
    pub wfc_voice_format: String,
    pub wfc_data_format: String,
    /// Used when the radio is off but Wi-Fi calling is still up
    pub wfc_flight_mode_format: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            no_service_text: DEFAULT_NO_SERVICE_TEXT.to_string(),
            emergency_only_text: DEFAULT_EMERGENCY_ONLY_TEXT.to_string(),
            wfc_voice_format: DEFAULT_WFC_VOICE_FORMAT.to_string(),
            wfc_data_format: DEFAULT_WFC_DATA_FORMAT.to_string(),
            wfc_flight_mode_format: DEFAULT_WFC_FLIGHT_MODE_FORMAT.to_string(),
        }
    }
}

/// Substitute `name` for the first `%s` in a Wi-Fi calling format.
pub fn format_wfc(format: &str, name: &str) -> String {
    format.replacen("%s", name, 1)
}

/// Normalized contribution of one source. Empty values are dropped here so
/// that they never shadow a lower-priority value.
#[derive(Debug, Clone, Default, PartialEq)]
struct EfRecord {
    spn: Option<String>,
    pnn: Option<Vec<PnnRecord>>,
    opl: Option<Vec<OplRecord>>,
    ehplmns: Option<BTreeSet<String>>,
    spdi: Option<BTreeSet<String>>,
    display_condition: Option<u32>,
}

fn non_empty_str(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}

fn non_empty_vec<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn non_empty_set(items: BTreeSet<String>) -> Option<BTreeSet<String>> {
    (!items.is_empty()).then_some(items)
}

impl EfRecord {
    fn from_sim(record: &SimRecord) -> Self {
        Self {
            spn: non_empty_str(record.service_provider_name.as_deref()),
            pnn: non_empty_vec(record.pnn.clone()),
            opl: non_empty_vec(record.opl.clone()),
            ehplmns: non_empty_set(record.ehplmns.clone()),
            spdi: non_empty_set(record.spdi.clone()),
            display_condition: record.carrier_name_display_condition,
        }
    }

    fn from_carrier_config(config: &CarrierConfig) -> Self {
        let pnn: Vec<PnnRecord> = config
            .pnn_override
            .iter()
            .filter_map(|entry| PnnRecord::parse(entry))
            .collect();
        Self {
            spn: non_empty_str(config.carrier_name.as_deref()),
            pnn: non_empty_vec(pnn),
            opl: None,
            ehplmns: non_empty_set(config.ehplmn_override.clone()),
            spdi: non_empty_set(config.spdi_override.clone()),
            display_condition: config.carrier_name_display_condition_override,
        }
    }

    fn brand_override(spn: String) -> Self {
        Self {
            spn: Some(spn),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Tagged<T> {
    source: EfSource,
    value: T,
}

/// Store `value` in `slot` unless the slot holds a value from a
/// higher-priority source.
fn offer<T: Clone>(slot: &mut Option<Tagged<T>>, source: EfSource, value: &Option<T>, field: &str) {
    let Some(value) = value else {
        return;
    };
    if let Some(current) = slot {
        if current.source > source {
            debug!(
                "Rejected {} from {}: already set by {}",
                field,
                source.as_str(),
                current.source.as_str()
            );
            return;
        }
    }
    *slot = Some(Tagged {
        source,
        value: value.clone(),
    });
}

#[derive(Debug, Default)]
struct EfFields {
    spn: Option<Tagged<String>>,
    pnn: Option<Tagged<Vec<PnnRecord>>>,
    opl: Option<Tagged<Vec<OplRecord>>>,
    ehplmns: Option<Tagged<BTreeSet<String>>>,
    spdi: Option<Tagged<BTreeSet<String>>>,
    display_condition: Option<Tagged<u32>>,
}

impl EfFields {
    fn apply(&mut self, source: EfSource, record: &EfRecord) {
        offer(&mut self.spn, source, &record.spn, "spn");
        offer(&mut self.pnn, source, &record.pnn, "pnn");
        offer(&mut self.opl, source, &record.opl, "opl");
        offer(&mut self.ehplmns, source, &record.ehplmns, "ehplmn");
        offer(&mut self.spdi, source, &record.spdi, "spdi");
        offer(
            &mut self.display_condition,
            source,
            &record.display_condition,
            "display_condition",
        );
    }
}

/// Resolves the carrier name shown for one phone
#[derive(Debug)]
pub struct CarrierDisplayNameResolver {
    settings: DisplaySettings,
    sources: BTreeMap<EfSource, EfRecord>,
    fields: EfFields,
    service_state: ServiceState,
    wifi_calling_enabled: bool,
}

impl Default for CarrierDisplayNameResolver {
    fn default() -> Self {
        Self::new(DisplaySettings::default())
    }
}

impl CarrierDisplayNameResolver {
    pub fn new(settings: DisplaySettings) -> Self {
        Self {
            settings,
            sources: BTreeMap::new(),
            fields: EfFields::default(),
            service_state: ServiceState::default(),
            wifi_calling_enabled: false,
        }
    }

    pub fn update_ef_from_usim(&mut self, record: &SimRecord) {
        self.update_ef(EfSource::Usim, EfRecord::from_sim(record));
    }

    pub fn update_ef_from_ruim(&mut self, record: &SimRecord) {
        self.update_ef(EfSource::Ruim, EfRecord::from_sim(record));
    }

    pub fn update_ef_from_carrier_config(&mut self, config: &CarrierConfig) {
        self.update_ef(EfSource::CarrierConfig, EfRecord::from_carrier_config(config));
    }

    /// Set or clear the operator brand override. A brand override makes every
    /// network count as home.
    pub fn update_ef_from_brand_override(&mut self, brand: Option<&str>) {
        match non_empty_str(brand) {
            Some(spn) => self.update_ef(EfSource::BrandOverride, EfRecord::brand_override(spn)),
            None => self.clear_source(EfSource::BrandOverride),
        }
    }

    /// Forget everything a source contributed, exposing lower-priority values.
    pub fn clear_source(&mut self, source: EfSource) {
        if self.sources.remove(&source).is_some() {
            debug!("Cleared EF source {}", source.as_str());
            self.rebuild();
        }
    }

    pub fn update_service_state(&mut self, service_state: ServiceState) {
        trace!("Service state updated: {:?}", service_state);
        self.service_state = service_state;
    }

    pub fn service_state(&self) -> &ServiceState {
        &self.service_state
    }

    pub fn set_wifi_calling_enabled(&mut self, enabled: bool) {
        self.wifi_calling_enabled = enabled;
    }

    /// Source currently supplying the SPN
    pub fn spn_source(&self) -> Option<EfSource> {
        self.fields.spn.as_ref().map(|t| t.source)
    }

    pub fn ehplmns(&self) -> Option<&BTreeSet<String>> {
        self.fields.ehplmns.as_ref().map(|t| &t.value)
    }

    pub fn spdi(&self) -> Option<&BTreeSet<String>> {
        self.fields.spdi.as_ref().map(|t| &t.value)
    }

    /// Raw display-condition value, as stored. Not used in resolution.
    pub fn carrier_name_display_condition(&self) -> Option<u32> {
        self.fields.display_condition.as_ref().map(|t| t.value)
    }

    fn update_ef(&mut self, source: EfSource, record: EfRecord) {
        debug!("EF update from {}", source.as_str());
        let replaced = self.sources.insert(source, record.clone()).is_some();
        if replaced {
            // Fields this source no longer supplies must fall back
            self.rebuild();
        } else {
            self.fields.apply(source, &record);
        }
    }

    fn rebuild(&mut self) {
        let mut fields = EfFields::default();
        // BTreeMap iterates lowest priority first
        for (source, record) in &self.sources {
            fields.apply(*source, record);
        }
        self.fields = fields;
    }

    fn is_spdi(&self, plmn: &str) -> bool {
        self.spdi().is_some_and(|spdi| spdi.contains(plmn))
    }

    fn is_ehplmn(&self, plmn: &str) -> bool {
        self.ehplmns().is_some_and(|ehplmns| ehplmns.contains(plmn))
    }

    fn opl_network_name(&self, plmn: &str) -> Option<String> {
        let opl = &self.fields.opl.as_ref()?.value;
        let entry = opl
            .iter()
            .find(|entry| entry.matches(plmn, self.service_state.lac))?;
        if entry.pnn_record_id == 0 {
            return None;
        }
        let pnn = &self.fields.pnn.as_ref()?.value;
        pnn.get(entry.pnn_record_id as usize - 1)
            .map(|record| record.full_name.clone())
    }

    fn resolve_plmn(&self, roaming: bool) -> Option<String> {
        let ss = &self.service_state;
        let registered = ss.operator_numeric.as_deref().filter(|p| !p.is_empty());

        if let Some(name) = registered.and_then(|plmn| self.opl_network_name(plmn)) {
            return Some(name);
        }

        let home = !roaming || registered.is_some_and(|plmn| self.is_ehplmn(plmn));
        if home {
            if let Some(first) = self.fields.pnn.as_ref().and_then(|t| t.value.first()) {
                return Some(first.full_name.clone());
            }
        }

        non_empty_str(ss.operator_alpha_long.as_deref()).or_else(|| registered.map(str::to_string))
    }

    fn apply_wifi_calling(&self, data: &mut CarrierDisplayNameData) {
        match data.spn.clone() {
            Some(spn) => {
                data.spn = Some(format_wfc(&self.settings.wfc_voice_format, &spn));
                data.data_spn = Some(format_wfc(&self.settings.wfc_data_format, &spn));
                data.show_spn = true;
                data.show_plmn = false;
            }
            None => {
                data.plmn = data
                    .plmn
                    .as_deref()
                    .map(|plmn| format_wfc(&self.settings.wfc_voice_format, plmn));
                data.show_plmn = true;
                data.show_spn = false;
            }
        }
    }

    /// Compute the name to display from the current sources and service state.
    pub fn get_carrier_display_name_data(&self) -> CarrierDisplayNameData {
        let ss = &self.service_state;

        if ss.is_power_off() && self.wifi_calling_enabled {
            if let Some(spn) = self.fields.spn.as_ref().map(|t| &t.value) {
                let name = format_wfc(&self.settings.wfc_flight_mode_format, spn);
                return CarrierDisplayNameData {
                    spn: Some(name.clone()),
                    data_spn: Some(name),
                    show_spn: true,
                    plmn: None,
                    show_plmn: false,
                };
            }
        }

        if !ss.is_in_service() {
            let text = if ss.is_emergency_only() && !ss.is_power_off() {
                &self.settings.emergency_only_text
            } else {
                &self.settings.no_service_text
            };
            return CarrierDisplayNameData {
                plmn: Some(text.clone()),
                show_plmn: true,
                ..Default::default()
            };
        }

        let brand_override = self.spn_source() == Some(EfSource::BrandOverride);
        let roaming = ss.is_roaming && !brand_override;
        let registered = ss.operator_numeric.as_deref();

        let spn = self.fields.spn.as_ref().map(|t| t.value.clone());
        let show_spn = match &self.fields.spn {
            None => false,
            Some(t) if t.source >= EfSource::CarrierConfig => true,
            Some(_) => !roaming || registered.is_some_and(|plmn| self.is_spdi(plmn)),
        };

        let plmn = self.resolve_plmn(roaming);
        let show_plmn = roaming || !show_spn;

        let mut data = CarrierDisplayNameData {
            data_spn: spn.clone(),
            spn,
            show_spn,
            plmn,
            show_plmn,
        };

        if self.wifi_calling_enabled {
            self.apply_wifi_calling(&mut data);
        }

        trace!(
            "Carrier name: spn={:?} show_spn={} plmn={:?} show_plmn={}",
            data.spn,
            data.show_spn,
            data.plmn,
            data.show_plmn
        );
        data
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn source_strategy() -> impl Strategy<Value = EfSource> {
        prop_oneof![
            Just(EfSource::Ruim),
            Just(EfSource::Usim),
            Just(EfSource::CarrierConfig),
            Just(EfSource::BrandOverride),
        ]
    }

    fn apply_spn(resolver: &mut CarrierDisplayNameResolver, source: EfSource, spn: &str) {
        match source {
            EfSource::Ruim => resolver.update_ef_from_ruim(&SimRecord {
                service_provider_name: Some(spn.to_string()),
                ..Default::default()
            }),
            EfSource::Usim => resolver.update_ef_from_usim(&SimRecord {
                service_provider_name: Some(spn.to_string()),
                ..Default::default()
            }),
            EfSource::CarrierConfig => resolver.update_ef_from_carrier_config(&CarrierConfig {
                carrier_name: Some(spn.to_string()),
                ..Default::default()
            }),
            EfSource::BrandOverride => resolver.update_ef_from_brand_override(Some(spn)),
        }
    }

    proptest! {
        /// Whatever the update order, the SPN comes from the highest-priority source
        #[test]
        fn highest_priority_source_wins(updates in prop::collection::vec(source_strategy(), 1..12)) {
            let mut resolver = CarrierDisplayNameResolver::default();
            resolver.update_service_state(ServiceState::in_service("310260", false));
            for source in &updates {
                apply_spn(&mut resolver, *source, source.as_str());
            }
            let best = updates.iter().max().copied().unwrap();
            prop_assert_eq!(resolver.spn_source(), Some(best));
            let data = resolver.get_carrier_display_name_data();
            prop_assert_eq!(data.spn(), Some(best.as_str()));
        }

        /// At home, a populated SPN is always shown regardless of SPDI
        #[test]
        fn home_always_shows_spn(
            spdi in prop::collection::btree_set("[0-9]{6}", 0..5),
            plmn in "[0-9]{6}",
        ) {
            let mut resolver = CarrierDisplayNameResolver::default();
            resolver.update_ef_from_usim(&SimRecord {
                service_provider_name: Some("spn".to_string()),
                spdi,
                ..Default::default()
            });
            resolver.update_service_state(ServiceState::in_service(&plmn, false));
            prop_assert!(resolver.get_carrier_display_name_data().should_show_spn());
        }

        /// Roaming: exactly SPDI membership decides SPN visibility, and PLMN
        /// is shown whenever SPN is hidden
        #[test]
        fn roaming_spdi_rule(
            spdi in prop::collection::btree_set("[0-9]{6}", 0..5),
            plmn in "[0-9]{6}",
        ) {
            let in_spdi = spdi.contains(&plmn);
            let mut resolver = CarrierDisplayNameResolver::default();
            resolver.update_ef_from_usim(&SimRecord {
                service_provider_name: Some("spn".to_string()),
                spdi,
                ..Default::default()
            });
            resolver.update_service_state(ServiceState::in_service(&plmn, true));
            let data = resolver.get_carrier_display_name_data();
            prop_assert_eq!(data.should_show_spn(), in_spdi);
            prop_assert!(data.should_show_plmn());
        }
    }
}
