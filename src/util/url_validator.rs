use thiserror::Error;
use url::Url;

/// Why a feed address was rejected.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Malformed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Only web schemes can be fetched.
    #[error("Scheme '{0}' is not fetchable (expected http or https)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// Parses a feed address and checks that it names an http(s) host.
///
/// Surrounding whitespace is ignored. No network access happens here.
///
/// ```
/// use readmaster::util::validate_url;
///
/// let feed = validate_url(" https://blog.example.com/atom.xml ").unwrap();
/// assert_eq!(feed.path(), "/atom.xml");
/// assert!(validate_url("mailto:someone@example.com").is_err());
/// ```
pub fn validate_url(raw: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw.trim())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}
