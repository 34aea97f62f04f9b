//! Download URL handling
//!
//! The platform hands back signed download URLs whose query strings may be
//! unescaped or only partially escaped. Before a URL is embedded in a remote
//! shell invocation its query component is re-escaped as a single opaque
//! token, so shell metacharacters and stray signature bytes survive the trip.

use url::Url;

use crate::error::VerifyResult;

/// Re-escape the query component of a download URL for safe reuse
///
/// The query is percent-decoded first and then re-encoded whole, not parsed
/// into key/value pairs. Decoding first makes the operation idempotent:
/// already-normalized input comes back unchanged.
pub fn normalize_download_url(raw: &str) -> VerifyResult<String> {
    let mut parsed = Url::parse(raw)?;
    if let Some(query) = parsed.query().map(str::to_owned) {
        let decoded = urlencoding::decode_binary(query.as_bytes()).into_owned();
        let encoded = urlencoding::encode_binary(&decoded).into_owned();
        parsed.set_query(Some(&encoded));
    }
    Ok(parsed.to_string())
}

/// Classify captured download output as an access failure
///
/// The object store answers denied requests with a 200-status error page, so
/// detection is by body content. Kept as a single predicate so the check can
/// move to a structured signal without touching the orchestration.
pub fn is_access_denied(output: &str) -> bool {
    output.contains("Access Denied")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifyError;

    #[test]
    fn test_normalize_escapes_query() {
        let normalized = normalize_download_url(
            "https://storage.svc.cluster.local/bucket/obj?X-Signature=a b+c&expires=1",
        )
        .unwrap();
        assert_eq!(
            normalized,
            "https://storage.svc.cluster.local/bucket/obj?X-Signature%3Da%20b%2Bc%26expires%3D1"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = "https://storage.svc.cluster.local/bucket/obj?X-Signature=a b%2Fc&expires=1";
        let once = normalize_download_url(raw).unwrap();
        let twice = normalize_download_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_without_query_is_unchanged() {
        let raw = "https://storage.svc.cluster.local/bucket/obj";
        assert_eq!(normalize_download_url(raw).unwrap(), raw);
    }

    #[test]
    fn test_normalize_rejects_relative_url() {
        let err = normalize_download_url("minio/bucket/obj?sig=1").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedUrl(_)));
    }

    #[test]
    fn test_access_denied_detection() {
        assert!(is_access_denied(
            "<?xml version=\"1.0\"?><Error><Code>Access Denied</Code></Error>"
        ));
        assert!(!is_access_denied("iris,setosa,5.1"));
    }
}
