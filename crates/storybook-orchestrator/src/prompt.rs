//! Prompt construction for the story-generation call.

use crate::profile::{non_blank, CharacterProfile};

/// Number of pages every storybook asks for.
pub const PAGE_COUNT: u32 = 10;

/// Builds the instruction sent with the story-generation call.
///
/// Each non-blank profile field contributes one clause; blank fields are
/// left out entirely. The reference-photo clause appears only when
/// `has_reference_images` is set. The rest of the prompt is fixed: ten
/// pages alternating image and text, starting with an image, returned as a
/// JSON array of `{page, type, description | content}` objects.
#[must_use]
pub fn build_story_prompt(profile: &CharacterProfile, has_reference_images: bool) -> String {
    let name = profile.display_name();
    let age = non_blank(&profile.age)
        .map(|age| format!(", age {age}"))
        .unwrap_or_default();
    let interests = non_blank(&profile.interests)
        .map(|interests| format!(" who likes {interests}"))
        .unwrap_or_default();
    let theme = non_blank(&profile.theme)
        .map(|theme| format!(" The story theme is: {theme}."))
        .unwrap_or_default();
    let photos = if has_reference_images {
        " Use the uploaded photos as reference for how the character should look."
    } else {
        ""
    };
    let art_style = profile.effective_art_style();

    format!(
        r#"Create a {PAGE_COUNT}-page children's storybook about {name}{age}{interests}.{theme}{photos}

The storybook should have:
- {PAGE_COUNT} pages total
- Each odd page (1, 3, 5, 7, 9) should have a detailed visual scene description for image generation
- Each even page (2, 4, 6, 8, 10) should have the story text for that scene
- The story should be engaging, age-appropriate, and have a clear beginning, middle, and end

Return your response as a JSON array with this structure:
[
  {{"page": 1, "type": "image", "description": "Detailed scene description for image generation"}},
  {{"page": 2, "type": "text", "content": "Story text for this page"}},
  ...
]

Make the image descriptions very detailed, including the character's appearance, setting, mood, lighting, and specific actions happening in the scene. Use {art_style} for all images."#
    )
}
