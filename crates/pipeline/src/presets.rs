//! Globally active model preset.

use std::sync::RwLock;

use texgen_core::error::CoreError;
use texgen_core::preset::{builtin_presets, ModelPreset, DEFAULT_PRESET_ID};

pub struct PresetRegistry {
    presets: Vec<ModelPreset>,
    active: RwLock<String>,
}

impl PresetRegistry {
    /// Registry over `presets` with the first one active.
    pub fn new(presets: Vec<ModelPreset>) -> Result<Self, CoreError> {
        let first = presets
            .first()
            .ok_or_else(|| CoreError::Validation("At least one preset is required".into()))?;
        for preset in &presets {
            preset.validate()?;
        }
        let active = RwLock::new(first.id.clone());
        Ok(Self { presets, active })
    }

    pub fn list(&self) -> &[ModelPreset] {
        &self.presets
    }

    pub fn active(&self) -> ModelPreset {
        let id = self.active.read().unwrap_or_else(|e| e.into_inner()).clone();
        self.presets
            .iter()
            .find(|p| p.id == id)
            .unwrap_or(&self.presets[0])
            .clone()
    }

    pub fn set_active(&self, id: &str) -> Result<ModelPreset, CoreError> {
        let preset = self
            .presets
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::Validation(format!("Unknown preset '{id}'")))?;
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = preset.id.clone();
        tracing::info!(preset = %preset.id, "Active model preset changed");
        Ok(preset.clone())
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        let presets = builtin_presets();
        let active = RwLock::new(DEFAULT_PRESET_ID.to_string());
        Self { presets, active }
    }
}
