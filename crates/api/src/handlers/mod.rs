pub mod comfyui;
pub mod generations;
pub mod presets;
pub mod queue;
pub mod session;
pub mod webhook;
