/// Rewrites `url` onto `baseurl`.
///
/// Scheme, authority, query and fragment of `url` are dropped; only its path
/// is kept and joined onto `baseurl` with exactly one `/` between them.
///
/// Example: `("https://api/v1/", "http://other/items?x=1")` → `"https://api/v1/items"`
pub fn prefix_url(baseurl: &str, url: &str) -> String {
    let path = path_of(url);
    format!(
        "{}/{}",
        baseurl.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Returns the path component of an absolute, scheme-relative or relative reference.
fn path_of(url: &str) -> &str {
    let rest = strip_scheme(url);
    let rest = match rest.strip_prefix("//") {
        Some(authority_and_path) => {
            let end = authority_and_path
                .find(['/', '?', '#'])
                .unwrap_or(authority_and_path.len());
            &authority_and_path[end..]
        }
        None => rest,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

fn strip_scheme(url: &str) -> &str {
    let Some(colon) = url.find(':') else {
        return url;
    };
    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid {
        &url[colon + 1..]
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::prefix_url;

    const BASE: &str = "https://aquarius.example.org/api/";

    #[test]
    fn joins_relative_paths_with_single_slash() {
        assert_eq!(
            prefix_url(BASE, "/transfers/"),
            "https://aquarius.example.org/api/transfers/"
        );
        assert_eq!(
            prefix_url("https://aquarius.example.org/api", "transfers"),
            "https://aquarius.example.org/api/transfers"
        );
        assert_eq!(
            prefix_url("https://aquarius.example.org/api///", "///transfers"),
            "https://aquarius.example.org/api/transfers"
        );
    }

    #[test]
    fn discards_foreign_scheme_and_host() {
        assert_eq!(
            prefix_url(BASE, "http://evil.example.com:8080/transfers/12"),
            "https://aquarius.example.org/api/transfers/12"
        );
        assert_eq!(
            prefix_url(BASE, "//cdn.example.com/transfers"),
            "https://aquarius.example.org/api/transfers"
        );
    }

    #[test]
    fn discards_query_and_fragment() {
        assert_eq!(
            prefix_url(BASE, "https://other/transfers/?page=2#top"),
            "https://aquarius.example.org/api/transfers/"
        );
        assert_eq!(
            prefix_url(BASE, "transfers?page=2"),
            "https://aquarius.example.org/api/transfers"
        );
    }

    #[test]
    fn host_only_url_targets_baseurl_root() {
        assert_eq!(
            prefix_url(BASE, "https://other.example.com"),
            "https://aquarius.example.org/api/"
        );
        assert_eq!(prefix_url(BASE, ""), "https://aquarius.example.org/api/");
    }

    #[test]
    fn colon_inside_path_is_not_a_scheme() {
        assert_eq!(
            prefix_url(BASE, "/records/ark:/123"),
            "https://aquarius.example.org/api/records/ark:/123"
        );
    }
}
