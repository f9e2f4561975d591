//! Storybook HTML Rendering
//!
//! This crate turns storybooks into the HTML pages served by the generator:
//! the landing page with the generation form, the storybook viewer, and
//! plain message pages such as "not found".
//!
//! It has its own view types so it does not depend on the orchestrator; the
//! HTTP layer converts persisted storybooks into [`StorybookView`] before
//! rendering.
//!
//! # Example
//!
//! ```rust
//! use storybook_render::{HtmlGenerator, PageView, StorybookView};
//!
//! let view = StorybookView {
//!     id: "story_0123".to_string(),
//!     title: "Mia".to_string(),
//!     art_style: "watercolor".to_string(),
//!     created_at: None,
//!     pages: vec![
//!         PageView::image(1, "Mia finds a map", Some("/static/storybooks/story_0123/page_1.png".to_string())),
//!         PageView::text(2, "Mia unrolled the map."),
//!     ],
//! };
//!
//! let html = HtmlGenerator::new(&view).generate();
//! assert!(html.contains("<h1>Mia</h1>"));
//! ```

mod html;
mod landing;

use chrono::{DateTime, Utc};

pub use html::{escape_html, message_page, HtmlGenerator};
pub use landing::landing_page;

/// A storybook as the viewer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorybookView {
    /// Storybook identifier.
    pub id: String,
    /// Heading shown above the pages.
    pub title: String,
    /// Art style the illustrations were drawn in.
    pub art_style: String,
    /// When the storybook was generated, if recorded.
    pub created_at: Option<DateTime<Utc>>,
    /// Pages in reading order.
    pub pages: Vec<PageView>,
}

/// What a page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBody {
    /// An illustration, or a placeholder when none was produced.
    Illustration {
        /// Scene description, used as alt text.
        description: String,
        /// Image URL, `None` when synthesis failed.
        image_url: Option<String>,
    },
    /// Story prose.
    Prose(String),
}

/// A single page of the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    /// 1-based page number.
    pub number: u32,
    /// Page body.
    pub body: PageBody,
}

impl PageView {
    /// Creates an illustrated page.
    #[must_use]
    pub fn image(number: u32, description: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            number,
            body: PageBody::Illustration {
                description: description.into(),
                image_url,
            },
        }
    }

    /// Creates a prose page.
    #[must_use]
    pub fn text(number: u32, content: impl Into<String>) -> Self {
        Self {
            number,
            body: PageBody::Prose(content.into()),
        }
    }
}
