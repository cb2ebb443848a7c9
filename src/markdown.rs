//! Markdown to static HTML conversion
//!
//! Uses pulldown-cmark for rendering markdown text components and for
//! exporting standalone documentation pages.

use crate::error::Result;
use log::info;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use std::fs;
use std::path::Path;

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Renders markdown source to an HTML fragment
///
/// Raw HTML blocks and inline tags in the source are escaped and shown as
/// text.
pub fn to_html(source: &str) -> String {
    render(source, false)
}

/// Like [`to_html`], but raw HTML in the source is passed through
///
/// Only for sources the application itself controls.
pub fn to_html_trusted(source: &str) -> String {
    render(source, true)
}

fn render(source: &str, raw_html: bool) -> String {
    let parser = Parser::new_ext(source, options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) if !raw_html => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Text of the first level-one heading, if any
pub fn title(source: &str) -> Option<String> {
    let mut in_title = false;
    let mut text = String::new();
    for event in Parser::new_ext(source, options()) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_title = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_title => {
                return Some(text.trim().to_string());
            }
            Event::Text(t) | Event::Code(t) if in_title => text.push_str(&t),
            _ => {}
        }
    }
    None
}

/// Renders markdown source into a standalone HTML document
pub fn render_page(page_title: &str, source: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        crate::component::escape_html(page_title),
        to_html(source)
    )
}

/// Converts a markdown file into a static HTML page
///
/// The page title is the first `#` heading, falling back to the file stem.
pub fn export_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let source = fs::read_to_string(src)?;
    let page_title = title(&source).unwrap_or_else(|| {
        src.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    fs::write(dst.as_ref(), render_page(&page_title, &source))?;
    info!(
        "exported {} to {}",
        src.display(),
        dst.as_ref().display()
    );
    Ok(())
}
