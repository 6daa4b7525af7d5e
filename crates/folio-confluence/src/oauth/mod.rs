//! OAuth 1.0 RSA-SHA1 authentication for Confluence.
//!
//! Confluence Server/Data Center accepts OAuth 1.0 requests signed with the
//! consumer's RSA private key. Only the signing half of the protocol lives
//! here; access tokens are provisioned out of band.

pub(crate) mod key;
mod signature;

use percent_encoding::percent_decode_str;
use rsa::RsaPrivateKey;
use ureq::http::Uri;

use signature::create_authorization_header;

/// OAuth 1.0 RSA-SHA1 authentication (internal use only).
pub(crate) struct OAuth1Auth {
    consumer_key: String,
    private_key: RsaPrivateKey,
    access_token: String,
}

impl OAuth1Auth {
    /// Create auth instance with pre-loaded private key.
    pub(crate) fn new(consumer_key: &str, private_key: RsaPrivateKey, access_token: &str) -> Self {
        Self {
            consumer_key: consumer_key.to_owned(),
            private_key,
            access_token: access_token.to_owned(),
        }
    }

    /// Sign an HTTP request and return the Authorization header value.
    pub(crate) fn sign(&self, method: &str, uri: &Uri) -> String {
        // Base URL excludes query string (RFC 5849 Section 3.4.1.2)
        let base_url = format!(
            "{}://{}{}",
            uri.scheme_str().unwrap_or("https"),
            uri.authority().map_or("", |a| a.as_str()),
            uri.path()
        );

        create_authorization_header(
            method,
            &base_url,
            &query_params(uri),
            &self.consumer_key,
            &self.access_token,
            &self.private_key,
        )
    }
}

/// Decoded query parameters; the signature re-encodes them.
fn query_params(uri: &Uri) -> Vec<(String, String)> {
    let decode = |s: &str| percent_decode_str(s).decode_utf8_lossy().into_owned();
    uri.query()
        .map(|q| {
            q.split('&')
                .filter(|param| !param.is_empty())
                .map(|param| {
                    let (key, value) = param.split_once('=').unwrap_or((param, ""));
                    (decode(key), decode(value))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_query_params_are_decoded() {
        let uri: Uri = "https://wiki.example.com/rest/api/content?title=Getting%20Started&spaceKey=DOC&flag"
            .parse()
            .unwrap();
        assert_eq!(
            query_params(&uri),
            vec![
                ("title".to_owned(), "Getting Started".to_owned()),
                ("spaceKey".to_owned(), "DOC".to_owned()),
                ("flag".to_owned(), String::new()),
            ]
        );
    }

    #[test]
    fn test_query_params_without_query() {
        let uri: Uri = "https://wiki.example.com/rest/api/content/1".parse().unwrap();
        assert!(query_params(&uri).is_empty());
    }

    #[test]
    fn test_sign_produces_oauth_header() {
        let auth = OAuth1Auth::new("folio", key::tests::pkcs8_key(), "token");
        let uri: Uri = "https://wiki.example.com/rest/api/content/1?expand=version"
            .parse()
            .unwrap();
        let header = auth.sign("GET", &uri);
        assert!(header.starts_with("OAuth "));
        assert!(header.contains(r#"oauth_consumer_key="folio""#));
        assert!(header.contains(r#"oauth_token="token""#));
        assert!(header.contains("oauth_signature="));
        // Query parameters are signed but not sent in the header
        assert!(!header.contains("expand"));
    }
}
