//! Destination rendering for wildcard matches.

use crate::wildcard::{WildcardPattern, WILDCARD};

/// Substitute captured text into a destination template.
///
/// The k-th `*` in `destination` receives the k-th capture. When the
/// template has more `*` than there are captures, the extra ones repeat the
/// last capture. Without captures the template is returned unchanged.
pub fn substitute(destination: &str, captures: &[&str]) -> String {
    let Some(last) = captures.last() else {
        return destination.to_string();
    };

    let extra: usize = captures.iter().map(|c| c.len()).sum();
    let mut rendered = String::with_capacity(destination.len() + extra);
    for (i, part) in destination.split(WILDCARD).enumerate() {
        if i > 0 {
            rendered.push_str(captures.get(i - 1).unwrap_or(last));
        }
        rendered.push_str(part);
    }
    rendered
}

/// Render `destination` for a `uri` that matched the wildcard `origin`.
///
/// Captures come from an anchored match of `uri` against `origin`, so a
/// literal segment of the origin that recurs inside the captured text is
/// preserved. If `uri` does not match `origin` (or `origin` is not a valid
/// pattern), the destination is returned as written.
pub fn render(destination: &str, origin: &str, uri: &str) -> String {
    match WildcardPattern::translate(origin) {
        Ok(pattern) => render_with(destination, &pattern, uri),
        Err(e) => {
            tracing::warn!(origin, error = %e, "origin pattern failed to compile, destination left unrendered");
            destination.to_string()
        }
    }
}

/// Same as [`render`], reusing an already compiled origin pattern.
pub fn render_with(destination: &str, origin: &WildcardPattern, uri: &str) -> String {
    if !destination.contains(WILDCARD) {
        return destination.to_string();
    }
    match origin.captures(uri) {
        Some(captures) => substitute(destination, &captures),
        None => destination.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_trailing_capture() {
        assert_eq!(
            render("/redirected/*", "/wildcard/*", "/wildcard/path1/path2/path3"),
            "/redirected/path1/path2/path3"
        );
    }

    #[test]
    fn test_render_recurring_literal_segment() {
        // Stripping every occurrence of "/docs/" would lose the inner segment.
        assert_eq!(
            render("/help/*", "/docs/*", "/docs/v1/docs/intro"),
            "/help/v1/docs/intro"
        );
    }

    #[test]
    fn test_render_capture_in_middle() {
        assert_eq!(
            render("/new/*/index.html", "/old/*.html", "/old/about.html"),
            "/new/about/index.html"
        );
    }

    #[test]
    fn test_render_multiple_captures_in_order() {
        assert_eq!(
            render("/store/*/products/*", "/shop/*/item/*", "/shop/shoes/item/42"),
            "/store/shoes/products/42"
        );
    }

    #[test]
    fn test_render_repeats_last_capture() {
        assert_eq!(render("/*/mirror/*", "/a/*", "/a/x"), "/x/mirror/x");
    }

    #[test]
    fn test_render_destination_without_wildcard() {
        assert_eq!(render("/fixed.html", "/a/*", "/a/b"), "/fixed.html");
    }

    #[test]
    fn test_render_non_matching_uri_keeps_destination() {
        assert_eq!(render("/b/*", "/a/*", "/c/d"), "/b/*");
    }

    #[test]
    fn test_substitute_without_captures() {
        assert_eq!(substitute("/b/*", &[]), "/b/*");
    }

    #[test]
    fn test_substitute_empty_capture() {
        assert_eq!(substitute("/b/*", &[""]), "/b/");
    }
}
