// SPDX-License-Identifier: MPL-2.0
//! Instruction text sent to the backend for each workflow.
//!
//! The backend receives two texts per request: an instruction describing the
//! role it plays (chosen from the mode, its sub-function and, for Render,
//! the fidelity band) and the user's request with the avoid-list appended.

use crate::domain::session::{
    CreateFunction, EditFunction, Fidelity, FidelityBand, RenderInputType, SessionState,
    StudioMode,
};

/// Suffix forcing image-only answers from conversational models.
const IMAGE_ONLY: &str =
    "Return only the image. Do not add any text, conversation or explanation to the response.";

/// Instruction used by the prompt enhancement call.
pub const ENHANCE_INSTRUCTION: &str = "Rewrite the user's prompt for an image generator, adding vivid \
detail about art style, lighting, composition and mood. Keep the prompt in the language it was \
written in. Reply with the rewritten prompt only, without any other words or formatting.";

/// Instruction used by the prompt translation call.
pub const TRANSLATE_INSTRUCTION: &str = "You translate prompts for image generators. Translate \
Portuguese prompts to English and English prompts to Portuguese. Reply with the translation only, \
without quotes, notes or explanations.";

/// Builds the instruction for a generation from `state`.
#[must_use]
pub fn instruction_for(state: &SessionState) -> String {
    match state.mode {
        StudioMode::Create => create_instruction(state.create_function).to_string(),
        StudioMode::Edit => format!(
            "{} {IMAGE_ONLY}",
            edit_instruction(state.edit_function, state.effective_mask().is_some())
        ),
        StudioMode::Render => format!(
            "{} {IMAGE_ONLY}",
            render_instruction(state.render_input_type, state.render_fidelity)
        ),
        StudioMode::Video => VIDEO_INSTRUCTION.to_string(),
    }
}

/// Formats the user's request with the optional avoid-list.
#[must_use]
pub fn user_request(prompt: &str, negative_prompt: &str) -> String {
    let negative = negative_prompt.trim();
    if negative.is_empty() {
        format!("User's request: \"{}\".", prompt.trim())
    } else {
        format!(
            "User's request: \"{}\". Negative prompt (what to avoid): \"{negative}\"",
            prompt.trim()
        )
    }
}

const VIDEO_INSTRUCTION: &str = "You are an expert animator. From the user's starting image and \
prompt, produce a short, smooth and seamless high-quality animation.";

fn create_instruction(function: CreateFunction) -> &'static str {
    match function {
        CreateFunction::Free => "You are a helpful and creative image generation assistant.",
        CreateFunction::Sticker => {
            "You are an expert sticker designer. Create a vibrant, high-quality sticker from the \
             user's prompt, with a clean white or black outline so it stands out on any \
             background and a clear, appealing main subject."
        }
        CreateFunction::Logo => {
            "You are a professional logo designer. Create a clean, modern and memorable logo from \
             the user's prompt. Keep it simple enough to scale, on a plain white background unless \
             the user asks otherwise."
        }
        CreateFunction::Comic => {
            "You are a comic book artist. Draw one dynamic comic panel from the user's prompt, with \
             bold outlines, dramatic shading and a vibrant palette."
        }
        CreateFunction::Sketch => {
            "You are a sketch artist. Create a detailed, realistic pencil sketch of the user's \
             description with clear lines, hatching and paper texture, in black and white or \
             grayscale only."
        }
        CreateFunction::Pattern => {
            "You are a pattern designer. Create a high-resolution pattern from the user's request \
             that tiles seamlessly: the right edge must continue the left edge and the top edge \
             must continue the bottom edge."
        }
    }
}

fn edit_instruction(function: EditFunction, has_mask: bool) -> &'static str {
    match function {
        EditFunction::AddRemove if has_mask => {
            "You are performing precise inpainting. The user supplied an image and a mask. Change \
             the image as the prompt asks, but only inside the white areas of the mask; black \
             areas are protected and must stay untouched. Blend the edit seamlessly at the mask \
             boundary."
        }
        EditFunction::AddRemove => {
            "You are an expert photo editor. Add or remove what the prompt describes, choosing a \
             sensible location when none is given, and keep the edit seamless and realistic."
        }
        EditFunction::Retouch => {
            "You are a professional retoucher. Subtly enhance or correct the image as instructed: \
             improve quality, adjust colour or fix small imperfections."
        }
        EditFunction::Style => {
            "You are a master of artistic styles. Re-imagine the image in the style the prompt \
             describes, keeping the composition but transforming the look completely."
        }
        EditFunction::Compose => {
            "You are a digital compositor. Combine the two supplied images as the prompt describes \
             into one cohesive new image."
        }
        EditFunction::TextOverlay | EditFunction::MaskEdit => {
            "You are a helpful and creative image editing assistant."
        }
    }
}

fn render_instruction(input: RenderInputType, fidelity: Fidelity) -> String {
    let fidelity_text = match fidelity.band() {
        FidelityBand::Strict => {
            "Strictly keep the geometry, layout and perspective of the supplied image. Do not \
             change the composition."
        }
        FidelityBand::Balanced => {
            "Use the supplied image as a strong structural base. Refine details, textures and \
             lighting freely, but preserve the main structure."
        }
        FidelityBand::Creative => {
            "Use the supplied image as inspiration only. You may reinterpret materials, lighting \
             and even minor composition while keeping the core concept."
        }
    };
    let input_text = match input {
        RenderInputType::Sketch => {
            "The input is a line-art sketch: add realistic materials, textures, lighting and \
             shadows following the prompt."
        }
        RenderInputType::BasicModel => {
            "The input is a basic 3D model: replace its flat materials with the realistic textures \
             the prompt describes and add physically based lighting with soft shadows, \
             reflections and ambient occlusion."
        }
        RenderInputType::FloorPlan => {
            "The input is a 2D floor plan: extrude it into an eye-level photorealistic interior, \
             reading rooms, furniture and symbols such as doors and windows from the plan, then \
             apply the materials and lighting the prompt describes."
        }
    };
    format!(
        "You are an architectural and interior rendering engine that turns a basic input image \
         into a photorealistic render. {fidelity_text} {input_text}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_instructions_demand_image_only_output() {
        let state = SessionState {
            mode: StudioMode::Edit,
            edit_function: EditFunction::Style,
            ..SessionState::default()
        };
        assert!(instruction_for(&state).ends_with(IMAGE_ONLY));
    }

    #[test]
    fn create_instruction_has_no_image_only_suffix() {
        let state = SessionState::default();
        assert!(!instruction_for(&state).contains(IMAGE_ONLY));
    }

    #[test]
    fn render_instruction_follows_fidelity_band() {
        let mut state = SessionState {
            mode: StudioMode::Render,
            ..SessionState::default()
        };
        state.render_fidelity = Fidelity::new(90);
        assert!(instruction_for(&state).contains("Strictly keep"));
        state.render_fidelity = Fidelity::new(10);
        assert!(instruction_for(&state).contains("inspiration only"));
        state.render_fidelity = Fidelity::new(60);
        assert!(instruction_for(&state).contains("strong structural base"));
    }

    #[test]
    fn inpainting_instruction_only_with_live_mask() {
        use crate::domain::media::{EncodedImage, ImageKind};

        let mut state = SessionState {
            mode: StudioMode::Edit,
            ..SessionState::default()
        };
        state.mask.image = Some(EncodedImage::new(vec![1], ImageKind::Png, 1, 1));
        assert!(!instruction_for(&state).contains("inpainting"));
        state.is_masking_active = true;
        assert!(instruction_for(&state).contains("inpainting"));
    }

    #[test]
    fn user_request_appends_avoid_list() {
        assert_eq!(user_request(" fox ", ""), "User's request: \"fox\".");
        assert!(user_request("fox", "blurry").ends_with("(what to avoid): \"blurry\""));
    }
}
