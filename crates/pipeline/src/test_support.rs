use texgen_core::queue::GenerationParams;
use texgen_core::types::DbId;

pub(crate) fn sample_params() -> GenerationParams {
    GenerationParams {
        model_id: DbId::new_v4(),
        model_file_name: "crate.glb".into(),
        reference_image_url: "https://cdn.example.com/ref.png".into(),
        reference_image_name: "ref.png".into(),
        subject_prompt: "wooden crate".into(),
        style_prompt: "weathered pine".into(),
        seed: 42,
        reference_strength: 0.7,
        high_quality: false,
        view_angle: 1,
    }
}
