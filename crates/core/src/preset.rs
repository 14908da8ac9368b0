//! Model presets: checkpoint plus sampler and upscaler settings applied to
//! the workflow at submission time.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Id of the preset active on a fresh start.
pub const DEFAULT_PRESET_ID: &str = "standard-juggernaut";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetCategory {
    Standard,
    Lightning,
}

/// Main KSampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerSettings {
    pub steps: u32,
    pub cfg: f32,
    pub sampler_name: String,
    pub scheduler: String,
}

/// Settings of one tiled upscale pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpscalerSettings {
    pub steps: u32,
    pub cfg: f32,
    pub sampler_name: String,
    pub scheduler: String,
    pub upscale_by: f32,
    pub denoise: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPreset {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub category: PresetCategory,
    /// Checkpoint path as the render backend knows it.
    pub checkpoint: String,
    pub sampler: SamplerSettings,
    pub upscaler1: UpscalerSettings,
    pub upscaler2: UpscalerSettings,
}

impl ModelPreset {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() || self.checkpoint.trim().is_empty() {
            return Err(CoreError::Validation(
                "Preset id and checkpoint must not be empty".into(),
            ));
        }
        if self.sampler.steps == 0 || self.upscaler1.steps == 0 || self.upscaler2.steps == 0 {
            return Err(CoreError::Validation(format!(
                "Preset '{}' has a sampler with zero steps",
                self.id
            )));
        }
        for up in [&self.upscaler1, &self.upscaler2] {
            if !(0.0..=1.0).contains(&up.denoise) {
                return Err(CoreError::Validation(format!(
                    "Preset '{}' upscaler denoise must be between 0 and 1",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

fn sampler(steps: u32, cfg: f32, sampler_name: &str) -> SamplerSettings {
    SamplerSettings {
        steps,
        cfg,
        sampler_name: sampler_name.to_string(),
        scheduler: "karras".to_string(),
    }
}

fn upscaler(steps: u32, cfg: f32, sampler_name: &str, upscale_by: f32, denoise: f32) -> UpscalerSettings {
    UpscalerSettings {
        steps,
        cfg,
        sampler_name: sampler_name.to_string(),
        scheduler: "karras".to_string(),
        upscale_by,
        denoise,
    }
}

/// Built-in presets, default first.
pub fn builtin_presets() -> Vec<ModelPreset> {
    vec![
        ModelPreset {
            id: DEFAULT_PRESET_ID.into(),
            display_name: "Standard Juggernaut".into(),
            description: "Balanced quality and speed".into(),
            category: PresetCategory::Standard,
            checkpoint: "sdxl\\juggernautXL_juggXIByRundiffusion.safetensors".into(),
            sampler: sampler(45, 5.5, "dpmpp_2m"),
            upscaler1: upscaler(30, 4.0, "dpmpp_2m", 4.0, 0.4),
            upscaler2: upscaler(25, 4.0, "dpmpp_2m", 2.0, 0.3),
        },
        ModelPreset {
            id: "lightning-realvisxl".into(),
            display_name: "RealVisXL v5.0 Lightning".into(),
            description: "Six-step lightning model".into(),
            category: PresetCategory::Lightning,
            checkpoint: "sdxl\\realvisxlV50_v50LightningBakedvae.safetensors".into(),
            sampler: sampler(6, 2.0, "dpmpp_sde"),
            upscaler1: upscaler(12, 2.0, "dpmpp_sde", 4.0, 0.2),
            upscaler2: upscaler(8, 2.0, "dpmpp_sde", 2.0, 0.15),
        },
        ModelPreset {
            id: "turbo-juggernaut".into(),
            display_name: "Juggernaut Turbo".into(),
            description: "Fast Juggernaut with photo-realistic results".into(),
            category: PresetCategory::Lightning,
            checkpoint: "sdxl\\juggernautXL_v9RdphotoLightning.safetensors".into(),
            sampler: sampler(8, 2.5, "dpmpp_sde"),
            upscaler1: upscaler(15, 2.5, "dpmpp_sde", 4.0, 0.25),
            upscaler2: upscaler(10, 2.5, "dpmpp_sde", 2.0, 0.2),
        },
        ModelPreset {
            id: "protovision-xl".into(),
            display_name: "ProtoVision XL 3D".into(),
            description: "High-fidelity 3D textures and materials".into(),
            category: PresetCategory::Standard,
            checkpoint: "sdxl\\protovisionXLHighFidelity3D_releaseV660Bakedvae.safetensors".into(),
            sampler: sampler(35, 6.0, "dpmpp_2m"),
            upscaler1: upscaler(25, 4.5, "dpmpp_2m", 4.0, 0.35),
            upscaler2: upscaler(20, 4.5, "dpmpp_2m", 2.0, 0.25),
        },
    ]
}
