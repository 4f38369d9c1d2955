//! Scraping helpers for the Garmin SSO embed widget.
//!
//! The widget is plain HTML; the only state it hands back is a CSRF token,
//! the page title (which tells success, MFA and failure apart) and, on
//! success, a one-time service ticket.

use crate::GarminError;
use regex::Regex;
use std::sync::LazyLock;

static CSRF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="_csrf"\s+value="(.+?)""#).expect("csrf regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>(.+?)</title>").expect("title regex"));
static TICKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"embed\?ticket=([^"]+)""#).expect("ticket regex"));

pub const SUCCESS_TITLE: &str = "Success";

pub fn extract_csrf(html: &str) -> Result<String, GarminError> {
    capture(&CSRF_RE, html, "csrf token")
}

pub fn extract_title(html: &str) -> Result<String, GarminError> {
    capture(&TITLE_RE, html, "page title")
}

pub fn extract_ticket(html: &str) -> Result<String, GarminError> {
    capture(&TICKET_RE, html, "service ticket")
}

pub fn is_mfa_title(title: &str) -> bool {
    title.contains("MFA")
}

fn capture(re: &Regex, html: &str, what: &str) -> Result<String, GarminError> {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| GarminError::Auth(format!("sso response did not contain a {what}")))
}

/// Query parameters for `GET /sso/embed`.
pub fn embed_params(sso_base: &str) -> Vec<(&'static str, String)> {
    vec![
        ("id", "gauth-widget".into()),
        ("embedWidget", "true".into()),
        ("gauthHost", format!("{sso_base}/sso")),
    ]
}

/// Query parameters for the sign-in and MFA pages.
pub fn signin_params(sso_base: &str) -> Vec<(&'static str, String)> {
    let embed = format!("{sso_base}/sso/embed");
    vec![
        ("id", "gauth-widget".into()),
        ("embedWidget", "true".into()),
        ("gauthHost", embed.clone()),
        ("service", embed.clone()),
        ("source", embed.clone()),
        ("redirectAfterAccountLoginUrl", embed.clone()),
        ("redirectAfterAccountCreationUrl", embed),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNIN_PAGE: &str = r#"<html><head><title>GARMIN Authentication Application</title></head>
        <body><form><input type="hidden" name="_csrf"   value="3F2A-csrf-token"/></form></body></html>"#;

    const SUCCESS_PAGE: &str = r#"<html><head><title>Success</title></head><body>
        <script>var response_url = "https://sso.garmin.com/sso/embed?ticket=ST-0123456-abcdef-cas";</script>
        </body></html>"#;

    #[test]
    fn csrf_is_extracted_across_whitespace() {
        assert_eq!(extract_csrf(SIGNIN_PAGE).expect("csrf"), "3F2A-csrf-token");
    }

    #[test]
    fn title_and_ticket_from_success_page() {
        assert_eq!(extract_title(SUCCESS_PAGE).expect("title"), SUCCESS_TITLE);
        assert_eq!(
            extract_ticket(SUCCESS_PAGE).expect("ticket"),
            "ST-0123456-abcdef-cas"
        );
    }

    #[test]
    fn missing_ticket_is_auth_error() {
        let err = extract_ticket(SIGNIN_PAGE).unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn mfa_title_detection() {
        assert!(is_mfa_title("Enter MFA code for login"));
        assert!(!is_mfa_title("Success"));
    }

    #[test]
    fn signin_params_point_back_at_embed() {
        let params = signin_params("https://sso.garmin.com");
        let service = params.iter().find(|(k, _)| *k == "service").expect("service");
        assert_eq!(service.1, "https://sso.garmin.com/sso/embed");
    }
}
