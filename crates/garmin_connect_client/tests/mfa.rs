use garmin_connect_client::config::Config;
use garmin_connect_client::http_client::ReqwestGarminClient;
use garmin_connect_client::{GarminError, LoginOutcome};
use secrecy::SecretString;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIGNIN_PAGE: &str = r#"<html><head><title>GARMIN Authentication Application</title></head>
<body><input type="hidden" name="_csrf" value="csrf-1"/></body></html>"#;

const MFA_PAGE: &str = r#"<html><head><title>Enter MFA code for login</title></head>
<body><input type="hidden" name="_csrf" value="csrf-mfa"/></body></html>"#;

const SUCCESS_PAGE: &str = r#"<html><head><title>Success</title></head>
<body>"https://sso.garmin.com/sso/embed?ticket=ST-7-cas"</body></html>"#;

async fn mount_common(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sso/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sso/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SIGNIN_PAGE))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MFA_PAGE))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> ReqwestGarminClient {
    ReqwestGarminClient::new(
        Config::with_base_url(&server.uri()),
        "someone@example.com",
        SecretString::new("hunter2".into()),
    )
    .expect("client")
}

#[tokio::test]
async fn mfa_code_completes_login() {
    let server = MockServer::start().await;
    mount_common(&server).await;

    Mock::given(method("POST"))
        .and(path("/sso/verifyMFA/loginEnterMfaCode"))
        .and(body_string_contains("mfa-code=123456"))
        .and(body_string_contains("_csrf=csrf-mfa"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUCCESS_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth_consumer.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "consumer_key": "ck",
            "consumer_secret": "cs"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth-service/oauth/preauthorized"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "oauth_token=ot&oauth_token_secret=ots&mfa_token=mfa-9",
        ))
        .mount(&server)
        .await;
    // The MFA token from preauthorization is forwarded to the exchange.
    Mock::given(method("POST"))
        .and(path("/oauth-service/oauth/exchange/user/2.0"))
        .and(body_string_contains("mfa_token=mfa-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "access_token": "at-mfa",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/userprofile-service/socialProfile"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"displayName": "mfa-user"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let challenge = match client.login().await.expect("login") {
        LoginOutcome::MfaRequired(challenge) => challenge,
        LoginOutcome::Authenticated => panic!("expected an MFA challenge"),
    };
    assert!(!client.is_authenticated().await);

    client
        .resume_login(challenge, " 123456 ")
        .await
        .expect("resume");
    assert_eq!(client.display_name().await.expect("display"), "mfa-user");
}

#[tokio::test]
async fn wrong_mfa_code_is_auth_error() {
    let server = MockServer::start().await;
    mount_common(&server).await;
    Mock::given(method("POST"))
        .and(path("/sso/verifyMFA/loginEnterMfaCode"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MFA_PAGE))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let LoginOutcome::MfaRequired(challenge) = client.login().await.expect("login") else {
        panic!("expected an MFA challenge");
    };
    let err = client.resume_login(challenge, "000000").await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn empty_mfa_code_is_rejected_locally() {
    let server = MockServer::start().await;
    mount_common(&server).await;

    let client = client_for(&server);
    let LoginOutcome::MfaRequired(challenge) = client.login().await.expect("login") else {
        panic!("expected an MFA challenge");
    };
    let err = client.resume_login(challenge, "  ").await.unwrap_err();
    assert!(matches!(err, GarminError::InvalidInput(_)));
}
