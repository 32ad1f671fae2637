use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

pub const ENDPOINT_ENV: &str = "CARDSCAN_ENDPOINT";
pub const API_KEY_ENV: &str = "CARDSCAN_API_KEY";
pub const MODEL_ENV: &str = "CARDSCAN_MODEL";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/chat";
pub const DEFAULT_MODEL: &str = "llama3.2-vision:latest";

pub const EXTRACTION_PROMPT: &str = r#"You are an expert OCR AI specializing in extracting structured data from business cards, even with complex layouts.
Extract the information on the card and answer strictly in the following JSON format.

1. Start by extracting all the text on the card.
2. Classify the data into the fields of the JSON format.
3. If there is no data for a field, use an empty string.

{
    "company_name": "string",
    "first_name": "string",
    "last_name": "string",
    "job_title": "string",
    "email_address": "string",
    "complete_address": "string",
    "street": "string",
    "state": "string",
    "country": "string",
    "postal_code": "string",
    "fax_detail": "string",
    "mobile_phone": "string",
    "phone": "string",
    "website_link": "string"
}
Put the direct contact number in phone.
Email, first name and last name exist on every card; make sure to identify them."#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    /// Round-trip budget covering connect, write and read.
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            prompt: EXTRACTION_PROMPT.into(),
            timeout_secs: 150,
            max_image_dimension: 1024,
            jpeg_quality: 85,
        }
    }
}

impl InferenceSettings {
    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let count = self.api_key.chars().count();
        if count == 0 {
            return "(not set)".into();
        }
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.api_key.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            self.api_key = api_key;
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            self.model = model;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    inference: InferenceSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Stored settings with environment overrides applied on top.
    pub fn inference(&self) -> InferenceSettings {
        let mut settings = self.read().inference.clone();
        settings.apply_env_overrides();
        settings
    }

    /// Stored settings only, as they are on disk.
    pub fn stored_inference(&self) -> InferenceSettings {
        self.read().inference.clone()
    }

    pub fn update_inference<F>(&self, update: F) -> Result<InferenceSettings>
    where
        F: FnOnce(&mut InferenceSettings),
    {
        let mut guard = self.write();
        update(&mut guard.inference);
        self.persist(&guard)?;
        Ok(guard.inference.clone())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
