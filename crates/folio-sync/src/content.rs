//! Content and title transformations applied while building the page tree.

/// Info macro prepended to pages when the generated-content banner is enabled.
pub(crate) const BANNER: &str = concat!(
    r#"<ac:structured-macro ac:name="info"><ac:rich-text-body>"#,
    "<p>This page is generated automatically. ",
    "Changes made here will be overwritten by the next publish.</p>",
    "</ac:rich-text-body></ac:structured-macro>"
);

/// Return the inner HTML of `<body>`, or the whole input if there is none.
pub(crate) fn extract_body(html: &str) -> &str {
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let lower = html.to_ascii_lowercase();
    let Some(open) = lower.find("<body") else {
        return html.trim();
    };
    let Some(open_end) = lower[open..].find('>').map(|i| open + i + 1) else {
        return html.trim();
    };
    let close = lower
        .rfind("</body>")
        .filter(|&close| close >= open_end)
        .unwrap_or(html.len());
    html[open_end..close].trim()
}

/// Turn a file or directory name into a page title.
///
/// `getting-started` becomes `Getting started`.
pub(crate) fn humanize(name: &str) -> String {
    let spaced = name.replace(['-', '_'], " ");
    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Guess the MIME type of an asset from its extension.
pub(crate) fn guess_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_body_full_document() {
        let html = "<html><head><title>x</title></head><BODY class=\"doc\">\n<h1>Hi</h1>\n</body></html>";
        assert_eq!(extract_body(html), "<h1>Hi</h1>");
    }

    #[test]
    fn test_extract_body_fragment_unchanged() {
        assert_eq!(extract_body("  <p>fragment</p>\n"), "<p>fragment</p>");
    }

    #[test]
    fn test_extract_body_unclosed_body() {
        assert_eq!(extract_body("<body><p>open</p>"), "<p>open</p>");
    }

    #[test]
    fn test_humanize_dashes_and_underscores() {
        assert_eq!(humanize("getting-started"), "Getting started");
        assert_eq!(humanize("api_reference"), "Api reference");
        assert_eq!(humanize("FAQ"), "FAQ");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn test_guess_content_type_images() {
        assert_eq!(guess_content_type("img/logo.PNG"), "image/png");
        assert_eq!(guess_content_type("diagram.svg"), "image/svg+xml");
        assert_eq!(guess_content_type("photo.jpeg"), "image/jpeg");
    }

    #[test]
    fn test_guess_content_type_unknown() {
        assert_eq!(guess_content_type("file.xyz"), "application/octet-stream");
    }
}
