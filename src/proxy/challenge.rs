//! Bot-challenge detection
//!
//! Classifies an upstream response as a challenge page by status code or by
//! known marker strings in the decoded body. A marker in a 200 body still
//! counts: some origins serve CAPTCHA interstitials with a success status.

use http::StatusCode;

use crate::proxy::fetch::UpstreamResponse;

/// Marker substrings that identify a CAPTCHA/rate-limit interstitial.
/// Matched by exact containment, never fuzzily.
const CHALLENGE_MARKERS: &[&str] = &[
    "recaptcha/api.js",
    "Our systems have detected unusual traffic",
    "detected unusual traffic from your computer network",
    "To continue, please type the characters you see",
];

/// Returns true if the upstream response is a bot challenge
pub fn is_challenge(response: &UpstreamResponse) -> bool {
    if response.status == StatusCode::FORBIDDEN || response.status == StatusCode::TOO_MANY_REQUESTS
    {
        return true;
    }

    match response.text() {
        Some(text) => CHALLENGE_MARKERS.iter().any(|marker| text.contains(marker)),
        None => false,
    }
}
