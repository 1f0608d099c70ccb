//! `<link rel="preload">` generation for built pages.
//!
//! The browser can start fetching every image before the preload run asks
//! for it when the page head carries one preload hint per asset. The block is
//! spliced into `index.html` at [`PRELOAD_PLACEHOLDER`], or before `</head>`
//! when the placeholder is missing.

use crate::cache::AssetId;

/// Marker comment replaced by the generated link block.
pub const PRELOAD_PLACEHOLDER: &str = "<!-- AUTO_PRELOAD_IMAGES -->";

const HEAD_CLOSE: &str = "</head>";

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Preload hint for a single image.
#[must_use]
pub fn preload_link(id: &AssetId) -> String {
    format!(
        r#"<link rel="preload" href="{}" as="image" crossorigin="anonymous">"#,
        escape_attr(id.as_str())
    )
}

/// Preload hints for every id, in order.
#[must_use]
pub fn preload_links(ids: &[AssetId]) -> Vec<String> {
    ids.iter().map(preload_link).collect()
}

/// Splice `links` into `html`.
///
/// Returns the html unchanged (and logs a warning) if it has neither the
/// placeholder nor a closing head tag, or if `links` is empty.
#[must_use]
pub fn inject_preload_links(html: &str, links: &[String]) -> String {
    if links.is_empty() {
        log::warn!("No images found to preload");
        return html.to_string();
    }

    let block = links.join("\n    ");

    if html.contains(PRELOAD_PLACEHOLDER) {
        return html.replacen(PRELOAD_PLACEHOLDER, &block, 1);
    }

    if html.contains(HEAD_CLOSE) {
        log::warn!(
            "{} placeholder not found, inserting before {}",
            PRELOAD_PLACEHOLDER,
            HEAD_CLOSE
        );
        return html.replacen(HEAD_CLOSE, &format!("  {block}\n{HEAD_CLOSE}"), 1);
    }

    log::warn!("No placeholder or {} in page, preload links not injected", HEAD_CLOSE);
    html.to_string()
}
