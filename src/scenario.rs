//! JSON scenario files for the `--resolve` and `--simulate` modes

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cdnr::{
    CarrierConfig, CarrierDisplayNameData, CarrierDisplayNameResolver, DisplaySettings,
    ServiceState, SimRecord,
};
use crate::sms::{
    CsSendRequest, ImsSendRequest, ImsSmsDispatcher, RecordingTransport, SendOutcome, SendStatus,
    ServiceSnapshot, SmsDispatchersController, SmsFormat, SmsService, SmsTracker,
};

/// Inputs for one display-name resolution
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolveScenario {
    pub ruim: Option<SimRecord>,
    pub usim: Option<SimRecord>,
    pub carrier_config: Option<CarrierConfig>,
    pub brand_override: Option<String>,
    pub service_state: ServiceState,
    pub wifi_calling: bool,
}

impl ResolveScenario {
    pub fn resolve(&self, settings: DisplaySettings) -> CarrierDisplayNameData {
        let mut resolver = CarrierDisplayNameResolver::new(settings);
        if let Some(ruim) = &self.ruim {
            resolver.update_ef_from_ruim(ruim);
        }
        if let Some(usim) = &self.usim {
            resolver.update_ef_from_usim(usim);
        }
        if let Some(config) = &self.carrier_config {
            resolver.update_ef_from_carrier_config(config);
        }
        resolver.update_ef_from_brand_override(self.brand_override.as_deref());
        resolver.update_service_state(self.service_state.clone());
        resolver.set_wifi_calling_enabled(self.wifi_calling);
        resolver.get_carrier_display_name_data()
    }
}

/// One scripted IMS callback
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedResult {
    pub status: SendStatus,
    #[serde(default)]
    pub message_ref: u8,
    #[serde(default)]
    pub network_error_code: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioMessage {
    pub format: SmsFormat,
    pub dest_address: String,
    #[serde(default)]
    pub sc_address: Option<String>,
    pub pdu: Vec<u8>,
    /// Results delivered in order to the message's current token
    #[serde(default)]
    pub results: Vec<ScriptedResult>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsScenario {
    pub messages: Vec<ScenarioMessage>,
    /// The IMS stack refuses every send request
    #[serde(default)]
    pub ims_unavailable: bool,
    /// A GSM and a CDMA sender are registered for fallback
    #[serde(default = "default_true")]
    pub cs_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub outcomes: Vec<SendOutcome>,
    pub snapshot: ServiceSnapshot,
    pub ims_requests: usize,
    pub cs_requests: usize,
    pub pending_at_shutdown: usize,
}

impl SmsScenario {
    /// Run every message through a fresh `SmsService`.
    pub async fn simulate(&self, max_retries: u32, queue_depth: usize) -> Result<SimulationReport> {
        let ims = RecordingTransport::<ImsSendRequest>::new();
        if self.ims_unavailable {
            ims.set_reject(Some("IMS not registered"));
        }
        let gsm = RecordingTransport::<CsSendRequest>::new();
        let cdma = RecordingTransport::<CsSendRequest>::new();
        let mut controller = SmsDispatchersController::new();
        if self.cs_available {
            controller = controller.with_gsm(gsm.clone()).with_cdma(cdma.clone());
        }

        let dispatcher = ImsSmsDispatcher::new(ims.clone(), controller).with_max_retries(max_retries);
        let (service, handle) = SmsService::spawn(dispatcher, queue_depth, CancellationToken::new());

        let mut outcomes = Vec::new();
        for message in &self.messages {
            let mut tracker = SmsTracker::new(message.format, &message.dest_address, message.pdu.clone());
            if let Some(sc) = &message.sc_address {
                tracker = tracker.with_sc_address(sc);
            }

            let mut token = match handle.send_sms(tracker).await {
                Ok(token) => token,
                Err(e) => {
                    warn!("Scenario message not sent: {}", e);
                    continue;
                }
            };

            for result in &message.results {
                let outcome = handle
                    .on_send_sms_result(token, result.message_ref, result.status, result.network_error_code)
                    .await?;
                if let SendOutcome::RetriedOverIms { token: next, .. } = outcome {
                    token = next;
                }
                let done = outcome.is_terminal();
                outcomes.push(outcome);
                if done {
                    break;
                }
            }
        }

        let snapshot = handle.snapshot().await?;
        let pending = service.shutdown().await?;
        info!(
            "Simulation finished: {} outcomes, {} pending at shutdown",
            outcomes.len(),
            pending.len()
        );

        Ok(SimulationReport {
            outcomes,
            snapshot,
            ims_requests: ims.count(),
            cs_requests: gsm.count() + cdma.count(),
            pending_at_shutdown: pending.len(),
        })
    }
}

/// Read and parse a JSON scenario file
pub fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid scenario {}", path.display()))
}
