//! Outbound header disguise
//!
//! Builds a header set that makes the proxy's GET look like a regular
//! browser navigation, with User-Agent and Accept-Language drawn at random
//! from fixed pools.

use http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, UPGRADE_INSECURE_REQUESTS,
    USER_AGENT,
};
use rand::Rng;
use url::Url;

/// Realistic desktop browser identities, picked uniformly per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5_0) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:118.0) Gecko/20100101 Firefox/118.0",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en;q=0.7",
    "en-US,en-CA;q=0.8",
];

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Pick a random User-Agent from the pool
pub fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::thread_rng().gen_range(0..USER_AGENTS.len())]
}

/// Pick a random Accept-Language from the pool
pub fn random_accept_language() -> &'static str {
    ACCEPT_LANGUAGES[rand::thread_rng().gen_range(0..ACCEPT_LANGUAGES.len())]
}

/// Build the disguised header set for an outbound request to `target`
pub fn headers_for(target: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(random_accept_language()),
    );
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

    // Referer is the target's own origin, as if the visitor came from the
    // site's front page.
    let referer = format!("{}/", target.origin().ascii_serialization());
    if let Ok(value) = HeaderValue::from_str(&referer) {
        headers.insert(REFERER, value);
    }

    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_comes_from_pool() {
        for _ in 0..32 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_random_accept_language_comes_from_pool() {
        for _ in 0..32 {
            assert!(ACCEPT_LANGUAGES.contains(&random_accept_language()));
        }
    }

    #[test]
    fn test_headers_for_sets_fixed_values() {
        let target = Url::parse("https://example.com/some/page").unwrap();
        let headers = headers_for(&target);

        assert_eq!(headers.get(ACCEPT).unwrap(), ACCEPT_VALUE);
        assert_eq!(headers.get(REFERER).unwrap(), "https://example.com/");
        assert_eq!(headers.get("sec-fetch-site").unwrap(), "none");
        assert_eq!(headers.get("sec-fetch-mode").unwrap(), "navigate");
        assert_eq!(headers.get("sec-fetch-user").unwrap(), "?1");
        assert_eq!(headers.get("sec-fetch-dest").unwrap(), "document");
        assert_eq!(headers.get(UPGRADE_INSECURE_REQUESTS).unwrap(), "1");
    }

    #[test]
    fn test_headers_for_randomized_values_come_from_pools() {
        let target = Url::parse("http://example.org").unwrap();
        let headers = headers_for(&target);

        let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(USER_AGENTS.contains(&ua));

        let lang = headers.get(ACCEPT_LANGUAGE).unwrap().to_str().unwrap();
        assert!(ACCEPT_LANGUAGES.contains(&lang));
    }

    #[test]
    fn test_referer_keeps_non_default_port() {
        let target = Url::parse("http://example.com:8080/path").unwrap();
        let headers = headers_for(&target);
        assert_eq!(headers.get(REFERER).unwrap(), "http://example.com:8080/");
    }
}
