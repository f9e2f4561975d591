//! Landing page with the generation form.

use crate::html::escape_html;

const TEMPLATE: &str = include_str!("../templates/index.html");
const ART_STYLE_PLACEHOLDER: &str = "{{DEFAULT_ART_STYLE}}";

/// Renders the landing page, pre-filling the art style field.
#[must_use]
pub fn landing_page(default_art_style: &str) -> String {
    TEMPLATE.replace(ART_STYLE_PLACEHOLDER, &escape_html(default_art_style))
}
