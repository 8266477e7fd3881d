use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::slack::ConversationCategory;
use crate::{AppError, Result};

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchSettings {
    /// Listing categories searched when resolving a channel name, in order
    pub categories: Vec<ConversationCategory>,
    pub max_concurrency: usize,
    pub list_page_size: u16,
    pub history_page_size: u16,
    pub duration_days: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            categories: ConversationCategory::DEFAULT_ORDER.to_vec(),
            max_concurrency: 8,
            list_page_size: 1000,
            history_page_size: 200,
            duration_days: 7,
        }
    }
}

impl Settings {
    /// Load `settings.toml` from the working directory, or defaults if absent.
    pub fn load() -> Result<Self> {
        let path = Path::new(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        let settings: Self =
            toml::from_str(&content).map_err(|e| AppError::TomlParse(e.to_string()))?;
        settings.fetch.validate()?;
        Ok(settings)
    }
}

impl FetchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(AppError::InvalidSettings(
                "categories must list at least one category".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::InvalidSettings(
                "max-concurrency must be positive".to_string(),
            ));
        }
        if self.list_page_size == 0 || self.history_page_size == 0 {
            return Err(AppError::InvalidSettings(
                "page sizes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
