use anyhow::{bail, Context, Result};
#[cfg(test)]
use std::collections::HashMap;
use std::env;

use crate::cdnr::{
    DisplaySettings, DEFAULT_EMERGENCY_ONLY_TEXT, DEFAULT_NO_SERVICE_TEXT,
    DEFAULT_WFC_DATA_FORMAT, DEFAULT_WFC_FLIGHT_MODE_FORMAT, DEFAULT_WFC_VOICE_FORMAT,
};
use crate::sms::{DEFAULT_MAX_IMS_RETRIES, DEFAULT_QUEUE_DEPTH};

/// Upper bound accepted for SMS_MAX_IMS_RETRIES
const MAX_IMS_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    // IMS retransmissions before a retryable error is final
    pub max_ims_retries: u32,

    // Bounded depth of the SMS command queue
    pub sms_queue_depth: usize,

    // Display texts
    pub no_service_text: String,
    pub emergency_only_text: String,

    // Wi-Fi calling formats, each with exactly one %s
    pub wfc_voice_format: String,
    pub wfc_data_format: String,
    // Applied to the SPN when the radio is off and Wi-Fi calling is up
    pub wfc_flight_mode_format: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present, ignore if missing
        Self::from_getter(|key| env::var(key).ok())
    }

    /// Parse config from a custom getter function (for testing)
    pub fn from_getter<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            max_ims_retries: get("SMS_MAX_IMS_RETRIES")
                .unwrap_or_else(|| DEFAULT_MAX_IMS_RETRIES.to_string())
                .trim()
                .parse()
                .context("SMS_MAX_IMS_RETRIES must be a non-negative integer")?,

            sms_queue_depth: get("SMS_QUEUE_DEPTH")
                .unwrap_or_else(|| DEFAULT_QUEUE_DEPTH.to_string())
                .trim()
                .parse()
                .context("SMS_QUEUE_DEPTH must be a non-negative integer")?,

            no_service_text: get("CDNR_NO_SERVICE_TEXT")
                .unwrap_or_else(|| DEFAULT_NO_SERVICE_TEXT.to_string()),
            emergency_only_text: get("CDNR_EMERGENCY_ONLY_TEXT")
                .unwrap_or_else(|| DEFAULT_EMERGENCY_ONLY_TEXT.to_string()),

            wfc_voice_format: get("CDNR_WFC_VOICE_FORMAT")
                .unwrap_or_else(|| DEFAULT_WFC_VOICE_FORMAT.to_string()),
            wfc_data_format: get("CDNR_WFC_DATA_FORMAT")
                .unwrap_or_else(|| DEFAULT_WFC_DATA_FORMAT.to_string()),
            wfc_flight_mode_format: get("CDNR_WFC_FLIGHT_MODE_FORMAT")
                .unwrap_or_else(|| DEFAULT_WFC_FLIGHT_MODE_FORMAT.to_string()),
        })
    }

    /// Create config from a HashMap (convenience for testing)
    #[cfg(test)]
    pub fn from_map(map: &HashMap<&str, &str>) -> Result<Self> {
        Self::from_getter(|key| map.get(key).map(|v| v.to_string()))
    }

    /// Validate configuration values at startup.
    /// Returns Ok(()) if all validations pass, or Err with details of what failed.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.max_ims_retries == 0 || self.max_ims_retries > MAX_IMS_RETRIES_LIMIT {
            errors.push(format!(
                "SMS_MAX_IMS_RETRIES={} out of range (1..={}).",
                self.max_ims_retries, MAX_IMS_RETRIES_LIMIT
            ));
        }

        if self.sms_queue_depth == 0 {
            errors.push("SMS_QUEUE_DEPTH must be greater than 0.".to_string());
        }

        for (name, text) in [
            ("CDNR_NO_SERVICE_TEXT", &self.no_service_text),
            ("CDNR_EMERGENCY_ONLY_TEXT", &self.emergency_only_text),
        ] {
            if text.trim().is_empty() {
                errors.push(format!("{} cannot be empty.", name));
            }
        }

        for (name, format) in [
            ("CDNR_WFC_VOICE_FORMAT", &self.wfc_voice_format),
            ("CDNR_WFC_DATA_FORMAT", &self.wfc_data_format),
            ("CDNR_WFC_FLIGHT_MODE_FORMAT", &self.wfc_flight_mode_format),
        ] {
            if !Self::is_valid_format(format) {
                errors.push(format!(
                    "{} '{}' must contain exactly one %s.",
                    name, format
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )
        }
    }

    /// Display texts and formats for the carrier name resolver
    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            no_service_text: self.no_service_text.clone(),
            emergency_only_text: self.emergency_only_text.clone(),
            wfc_voice_format: self.wfc_voice_format.clone(),
            wfc_data_format: self.wfc_data_format.clone(),
            wfc_flight_mode_format: self.wfc_flight_mode_format.clone(),
        }
    }

    fn is_valid_format(format: &str) -> bool {
        format.matches("%s").count() == 1
    }
}
