//! Canonical forms for targeting values
//!
//! Rule values are canonicalized when the index is built and request fields
//! when a request is matched. Both sides go through the same function, so
//! matching is plain string equality.

use crate::types::{Dimension, MatchRequest};

/// Canonicalize a raw value for a dimension.
///
/// Values are trimmed; countries are upper-cased, everything else is
/// lower-cased.
#[inline]
pub fn canonicalize(dimension: Dimension, raw: &str) -> String {
    let trimmed = raw.trim();
    match dimension {
        Dimension::Country => trimmed.to_uppercase(),
        Dimension::AppId | Dimension::Os => trimmed.to_lowercase(),
    }
}

/// Canonicalize all fields of a request.
pub fn canonicalize_request(request: &MatchRequest) -> MatchRequest {
    MatchRequest {
        app_id: canonicalize(Dimension::AppId, &request.app_id),
        os: canonicalize(Dimension::Os, &request.os),
        country: canonicalize(Dimension::Country, &request.country),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_upper_cased() {
        assert_eq!(canonicalize(Dimension::Country, "US"), "US");
        assert_eq!(canonicalize(Dimension::Country, "us"), "US");
        assert_eq!(canonicalize(Dimension::Country, " Us "), "US");
    }

    #[test]
    fn test_app_and_os_lower_cased() {
        assert_eq!(canonicalize(Dimension::AppId, " Com.Spotify.Music\t"), "com.spotify.music");
        assert_eq!(canonicalize(Dimension::Os, "Android"), "android");
        assert_eq!(canonicalize(Dimension::Os, "iOS "), "ios");
    }

    #[test]
    fn test_blank_becomes_empty() {
        assert_eq!(canonicalize(Dimension::Country, "   "), "");
    }

    #[test]
    fn test_canonicalize_request() {
        let req = MatchRequest::new(" COM.Any ", "ANDROID", " ca");
        let canonical = canonicalize_request(&req);
        assert_eq!(canonical, MatchRequest::new("com.any", "android", "CA"));
    }

    #[test]
    fn test_idempotent() {
        for dim in Dimension::ALL {
            let once = canonicalize(dim, " MiXeD ");
            assert_eq!(canonicalize(dim, &once), once);
        }
    }
}
