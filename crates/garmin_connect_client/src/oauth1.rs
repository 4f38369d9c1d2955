//! OAuth 1.0a request signing (HMAC-SHA1), as required by Garmin's
//! `oauth-service` token endpoints.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::{RngExt, rng};
use reqwest::Url;
use serde::Deserialize;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const NONCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Consumer key pair published for the Garmin Connect mobile app.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct OAuthConsumer {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl std::fmt::Debug for OAuthConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConsumer")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

impl OAuthConsumer {
    /// Build the `Authorization` header value for a request.
    ///
    /// `token` is the `(oauth_token, oauth_token_secret)` pair when signing on
    /// behalf of a user. `form` holds url-encoded body parameters, which take
    /// part in the signature.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &Url,
        token: Option<(&str, &str)>,
        form: &[(String, String)],
    ) -> String {
        let nonce = generate_nonce();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_with(method, url, token, form, &nonce, timestamp)
    }

    /// Deterministic variant of [`authorization_header`](Self::authorization_header).
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &Url,
        token: Option<(&str, &str)>,
        form: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.consumer_key.clone()),
            ("oauth_nonce".into(), nonce.to_string()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_version".into(), "1.0".into()),
        ];
        if let Some((key, _)) = token {
            oauth_params.push(("oauth_token".into(), key.to_string()));
        }

        let base = signature_base_string(method, url, &oauth_params, form);
        let signature = self.sign(&base, token.map(|(_, secret)| secret));
        oauth_params.push(("oauth_signature".into(), signature));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }

    fn sign(&self, base_string: &str, token_secret: Option<&str>) -> String {
        let key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(token_secret.unwrap_or_default())
        );
        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
        mac.update(base_string.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

/// `METHOD&base-url&sorted-params`, each part percent-encoded.
pub fn signature_base_string(
    method: &str,
    url: &Url,
    oauth_params: &[(String, String)],
    form: &[(String, String)],
) -> String {
    let base_url = format!("{}{}", url.origin().ascii_serialization(), url.path());

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(oauth_params.iter().map(|(k, v)| (encode(k), encode(v))))
        .chain(form.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    params.sort();

    let joined: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&base_url),
        encode(&joined.join("&"))
    )
}

fn generate_nonce() -> String {
    let mut rng = rng();
    (0..32)
        .map(|_| NONCE_ALPHABET[rng.random_range(0..NONCE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from Twitter's "Creating a signature" guide.
    fn twitter_consumer() -> OAuthConsumer {
        OAuthConsumer {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".into(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".into(),
        }
    }

    const TOKEN: (&str, &str) = (
        "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
        "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
    );

    fn twitter_url() -> Url {
        Url::parse("https://api.twitter.com/1.1/statuses/update.json?include_entities=true")
            .expect("url")
    }

    fn twitter_form() -> Vec<(String, String)> {
        vec![(
            "status".into(),
            "Hello Ladies + Gentlemen, a signed OAuth request!".into(),
        )]
    }

    #[test]
    fn encode_keeps_unreserved_only() {
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("!"), "%21");
    }

    #[test]
    fn base_string_matches_reference() {
        let oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), "xvz1evFS4wEEPTGEFPHBog".into()),
            (
                "oauth_nonce".into(),
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".into(),
            ),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), "1318622958".into()),
            ("oauth_token".into(), TOKEN.0.into()),
            ("oauth_version".into(), "1.0".into()),
        ];
        let base = signature_base_string("post", &twitter_url(), &oauth_params, &twitter_form());
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn header_carries_reference_signature() {
        let header = twitter_consumer().authorization_header_with(
            "POST",
            &twitter_url(),
            Some(TOKEN),
            &twitter_form(),
            "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
            1318622958,
        );
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_token=\"370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb\""));
    }

    #[test]
    fn consumer_only_signature_omits_token() {
        let url = Url::parse("https://connectapi.garmin.com/oauth-service/oauth/preauthorized?ticket=ST-1")
            .expect("url");
        let header = twitter_consumer().authorization_header("GET", &url, None, &[]);
        assert!(!header.contains("oauth_token="));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
    }

    #[test]
    fn nonces_are_alphanumeric_and_distinct() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn debug_redacts_secret() {
        let out = format!("{:?}", twitter_consumer());
        assert!(!out.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
    }
}
