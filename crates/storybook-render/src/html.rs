//! Storybook viewer and message pages.

use std::fmt::Write;

use crate::{PageBody, PageView, StorybookView};

/// Shared stylesheet for every rendered page.
const STYLE: &str = "body{font-family:Georgia,serif;max-width:760px;margin:2rem auto;padding:0 1rem;background:#fdf8f0;color:#333}\
h1{text-align:center}\
.meta{text-align:center;color:#777;font-size:.9rem}\
.page{background:#fff;border-radius:12px;box-shadow:0 2px 8px rgba(0,0,0,.08);margin:1.5rem 0;padding:1.5rem}\
.page img{width:100%;border-radius:8px}\
.page-number{color:#999;font-size:.8rem;text-align:right}\
.placeholder{background:#eee;border-radius:8px;padding:3rem 1rem;text-align:center;color:#888}\
.story-text{font-size:1.25rem;line-height:1.7}";

/// Renders a storybook as a standalone HTML document.
pub struct HtmlGenerator<'a> {
    view: &'a StorybookView,
}

impl<'a> HtmlGenerator<'a> {
    /// Creates a generator for `view`.
    #[must_use]
    pub const fn new(view: &'a StorybookView) -> Self {
        Self { view }
    }

    /// Generates the complete document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        write_head(&mut output, &self.view.title);
        self.write_header(&mut output);
        self.write_pages(&mut output);
        write_tail(&mut output);

        output
    }

    fn write_header(&self, output: &mut String) {
        let _ = writeln!(output, "<h1>{}</h1>", escape_html(&self.view.title));
        let _ = write!(
            output,
            "<p class=\"meta\">Illustrated in {}",
            escape_html(&self.view.art_style)
        );
        if let Some(created_at) = self.view.created_at {
            let _ = write!(output, " &middot; {}", created_at.format("%B %-d, %Y"));
        }
        let _ = writeln!(output, "</p>");
    }

    fn write_pages(&self, output: &mut String) {
        if self.view.pages.is_empty() {
            let _ = writeln!(
                output,
                "<p class=\"placeholder\">This storybook has no pages.</p>"
            );
            return;
        }
        for page in &self.view.pages {
            write_page(output, page);
        }
    }
}

fn write_page(output: &mut String, page: &PageView) {
    let _ = writeln!(output, "<section class=\"page\" id=\"page-{}\">", page.number);
    match &page.body {
        PageBody::Illustration {
            description,
            image_url: Some(url),
        } => {
            let _ = writeln!(
                output,
                "<img src=\"{}\" alt=\"{}\">",
                escape_html(url),
                escape_html(description)
            );
        }
        PageBody::Illustration {
            image_url: None, ..
        } => {
            let _ = writeln!(
                output,
                "<div class=\"placeholder\">Illustration unavailable</div>"
            );
        }
        PageBody::Prose(content) => {
            let _ = writeln!(output, "<p class=\"story-text\">{}</p>", escape_html(content));
        }
    }
    let _ = writeln!(
        output,
        "<div class=\"page-number\">{}</div>\n</section>",
        page.number
    );
}

fn write_head(output: &mut String, title: &str) {
    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"en\">\n<head>");
    let _ = writeln!(output, "<meta charset=\"utf-8\">");
    let _ = writeln!(
        output,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">"
    );
    let _ = writeln!(output, "<title>{}</title>", escape_html(title));
    let _ = writeln!(output, "<style>{STYLE}</style>");
    let _ = writeln!(output, "</head>\n<body>");
}

fn write_tail(output: &mut String) {
    let _ = writeln!(output, "<p class=\"meta\"><a href=\"/\">Create another storybook</a></p>");
    let _ = writeln!(output, "</body>\n</html>");
}

/// Renders a minimal page with a heading and one message paragraph.
#[must_use]
pub fn message_page(title: &str, message: &str) -> String {
    let mut output = String::new();
    write_head(&mut output, title);
    let _ = writeln!(output, "<h1>{}</h1>", escape_html(title));
    let _ = writeln!(output, "<p class=\"meta\">{}</p>", escape_html(message));
    write_tail(&mut output);
    output
}

/// Escapes text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
