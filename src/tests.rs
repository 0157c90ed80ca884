//! Integration tests for the heat network backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::notify::Notifier;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config; no notification key, so emails are skipped
        let config = Config {
            api_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            notify_api_key: None,
            notify_base_url: "http://127.0.0.1:9".to_string(),
            org_created_template_id: "org-created".to_string(),
        };

        let notifier = Arc::new(Notifier::new(&config));

        let state = AppState {
            repo,
            notifier,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a user and return its store-assigned id.
    async fn register_user(&self, external_login_id: &str, email: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/users/initial-entry"))
            .json(&json!({
                "externalLoginId": external_login_id,
                "email": email,
                "status": "Active"
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        body["data"].as_str().unwrap().to_string()
    }
}

/// A full organisation-details payload with the given name and contact fields.
fn org_details_payload(
    org_name: &str,
    preferred_contact_type: Option<&str>,
    landline: Option<&str>,
    mobile: Option<&str>,
) -> Value {
    let mut details = json!({
        "orgType": "Limited Company",
        "companiesHouseNumber": "12345678",
        "orgName": org_name,
        "orgRegisteredAddress": {
            "addressLine1": "1 High Street",
            "town": "Leeds",
            "postcode": "LS1 1AA",
            "country": "UK"
        },
        "jobTitle": "Director",
        "firstName": "ada",
        "lastName": "lovelace"
    });

    if let Some(preference) = preferred_contact_type {
        details["preferredContactType"] = json!(preference);
    }
    if let Some(number) = landline {
        details["landlineNumber"] = json!(number);
        details["contactNumberExtension"] = json!("12");
    }
    if let Some(number) = mobile {
        details["mobileNumber"] = json!(number);
    }

    details
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    // Request with a client that does not carry the API key
    let resp = Client::new()
        .get(fixture.url("/api/users"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/users"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_disabled_without_psk() {
    let fixture = TestFixture::with_psk(None).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/users"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_initial_registration_and_lookup() {
    let fixture = TestFixture::new().await;

    let user_id = fixture
        .register_user("login-abc123", "new.user@example.test")
        .await;

    // Lookup by store-assigned id
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/users/{}", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 200);
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["emailAddress"], "new.user@example.test");
    assert_eq!(get_body["data"]["status"], "Active");
    // No organisation yet
    assert!(get_body["data"]["organisation"].is_null());

    // Lookup by external login id
    let ext_resp = fixture
        .client
        .get(fixture.url("/api/users/external/login-abc123"))
        .send()
        .await
        .unwrap();
    assert_eq!(ext_resp.status(), 200);
    let ext_body: Value = ext_resp.json().await.unwrap();
    assert_eq!(ext_body["data"]["id"], user_id.as_str());

    // List contains the user
    let list_resp = fixture
        .client
        .get(fixture.url("/api/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(list_resp.status(), 200);
    let list_body: Value = list_resp.json().await.unwrap();
    assert_eq!(list_body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_initial_registration_duplicate_conflict() {
    let fixture = TestFixture::new().await;

    fixture
        .register_user("login-dup", "first@example.test")
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/users/initial-entry"))
        .json(&json!({
            "externalLoginId": "login-dup",
            "email": "second@example.test",
            "status": "Active"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_initial_registration_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/users/initial-entry"))
        .json(&json!({
            "externalLoginId": "",
            "email": "not-an-email",
            "status": "Active"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let details = body["error"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
}

#[tokio::test]
async fn test_org_details_update_assigns_org_id_once() {
    let fixture = TestFixture::new().await;
    let user_id = fixture
        .register_user("login-org", "org.owner@example.test")
        .await;

    // First update mints an organisation id
    let first_resp = fixture
        .client
        .patch(fixture.url(&format!("/api/users/{}/org-details", user_id)))
        .json(&json!({
            "orgDetails": org_details_payload(
                "Acme Heat",
                Some("Landline"),
                Some("0113 000 0000"),
                None
            ),
            "role": "RegulatoryContact"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(first_resp.status(), 200);
    let first_body: Value = first_resp.json().await.unwrap();
    assert_eq!(first_body["success"], true);
    assert_eq!(first_body["data"]["orgDetails"]["orgId"], "ORG0000001");
    assert_eq!(first_body["data"]["orgDetails"]["orgName"], "Acme Heat");
    assert_eq!(first_body["data"]["roles"][0], "RegulatoryContact");

    // Second update overwrites fields but keeps the organisation id
    let second_resp = fixture
        .client
        .patch(fixture.url(&format!("/api/users/{}/org-details", user_id)))
        .json(&json!({
            "orgDetails": org_details_payload(
                "Acme Heat Renamed",
                Some("Landline"),
                Some("0113 000 0000"),
                None
            ),
            "role": "RegulatoryContact"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(second_resp.status(), 200);
    let second_body: Value = second_resp.json().await.unwrap();
    assert_eq!(second_body["data"]["orgDetails"]["orgId"], "ORG0000001");
    assert_eq!(
        second_body["data"]["orgDetails"]["orgName"],
        "Acme Heat Renamed"
    );
    // Role added twice stays a single occurrence
    assert_eq!(second_body["data"]["roles"].as_array().unwrap().len(), 1);

    // The read shape maps the organisation and friendly role names
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/users/{}", user_id)))
        .send()
        .await
        .unwrap();
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["organisation"]["id"], "ORG0000001");
    assert_eq!(get_body["data"]["organisation"]["name"], "Acme Heat Renamed");
    assert_eq!(get_body["data"]["fullName"], "Ada Lovelace");
    assert_eq!(get_body["data"]["roles"][0], "Regulatory Contact");
}

#[tokio::test]
async fn test_org_details_validation_leaves_user_unchanged() {
    let fixture = TestFixture::new().await;
    let user_id = fixture
        .register_user("login-invalid", "invalid@example.test")
        .await;

    // Landline preferred but no landline number supplied
    let resp = fixture
        .client
        .patch(fixture.url(&format!("/api/users/{}/org-details", user_id)))
        .json(&json!({
            "orgDetails": org_details_payload("Acme Heat", Some("Landline"), None, None),
            "role": "RegulatoryContact"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "landlineNumber");
    assert_eq!(
        body["error"]["details"][0]["message"],
        "Enter your landline number."
    );

    // Nothing was persisted
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/users/{}", user_id)))
        .send()
        .await
        .unwrap();
    let get_body: Value = get_resp.json().await.unwrap();
    assert!(get_body["data"]["organisation"].is_null());
    assert!(get_body["data"]["roles"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_org_details_mobile_preference_clears_landline() {
    let fixture = TestFixture::new().await;
    let user_id = fixture
        .register_user("login-mobile", "mobile@example.test")
        .await;

    // Both numbers supplied; mobile preference must clear the landline fields
    let resp = fixture
        .client
        .patch(fixture.url(&format!("/api/users/{}/org-details", user_id)))
        .json(&json!({
            "orgDetails": org_details_payload(
                "Acme Heat",
                Some("Mobile"),
                Some("0113 000 0000"),
                Some("07700 900000")
            ),
            "role": "Contributor"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let details = &body["data"]["orgDetails"];
    assert!(details["landlineNumber"].is_null());
    assert!(details["contactNumberExtension"].is_null());
    assert_eq!(details["mobileNumber"], "07700 900000");
}

#[tokio::test]
async fn test_org_details_no_preference_clears_all_numbers() {
    let fixture = TestFixture::new().await;
    let user_id = fixture
        .register_user("login-nopref", "nopref@example.test")
        .await;

    let resp = fixture
        .client
        .patch(fixture.url(&format!("/api/users/{}/org-details", user_id)))
        .json(&json!({
            "orgDetails": org_details_payload(
                "Acme Heat",
                None,
                Some("0113 000 0000"),
                Some("07700 900000")
            ),
            "role": "Contributor"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let details = &body["data"]["orgDetails"];
    assert!(details["landlineNumber"].is_null());
    assert!(details["contactNumberExtension"].is_null());
    assert!(details["mobileNumber"].is_null());
}

#[tokio::test]
async fn test_org_details_update_unknown_user() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .patch(fixture.url("/api/users/does-not-exist/org-details"))
        .json(&json!({
            "orgDetails": org_details_payload(
                "Acme Heat",
                Some("Landline"),
                Some("0113 000 0000"),
                None
            ),
            "role": "RegulatoryContact"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_user_delete() {
    let fixture = TestFixture::new().await;
    let user_id = fixture
        .register_user("login-delete", "delete@example.test")
        .await;

    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/users/{}", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 204);

    // Verify deleted
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/users/{}", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 404);

    // Deleting again is a 404
    let delete_again_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/users/{}", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_again_resp.status(), 404);
}

#[tokio::test]
async fn test_heat_network_create_mints_sequential_ids() {
    let fixture = TestFixture::new().await;

    let first_resp = fixture
        .client
        .post(fixture.url("/api/heat-networks"))
        .json(&json!({ "location": "Leeds", "name": "Aire Valley Network" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first_resp.status(), 201);
    let first_body: Value = first_resp.json().await.unwrap();
    assert_eq!(first_body["data"]["hnId"], "HN0000001");

    let second_resp = fixture
        .client
        .post(fixture.url("/api/heat-networks"))
        .json(&json!({ "location": "York", "name": "Ouse District Heating" }))
        .send()
        .await
        .unwrap();
    let second_body: Value = second_resp.json().await.unwrap();
    assert_eq!(second_body["data"]["hnId"], "HN0000002");

    // A supplied hn id is kept, not re-minted
    let supplied_resp = fixture
        .client
        .post(fixture.url("/api/heat-networks"))
        .json(&json!({
            "hnId": "HN7777777",
            "location": "Hull",
            "name": "Humber Network"
        }))
        .send()
        .await
        .unwrap();
    let supplied_body: Value = supplied_resp.json().await.unwrap();
    assert_eq!(supplied_body["data"]["hnId"], "HN7777777");
}

#[tokio::test]
async fn test_heat_network_create_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/heat-networks"))
        .json(&json!({ "location": " ", "name": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_heat_network_lookup_by_hn_ids() {
    let fixture = TestFixture::new().await;

    fixture
        .client
        .post(fixture.url("/api/heat-networks"))
        .json(&json!({ "location": "Leeds", "name": "Aire Valley Network" }))
        .send()
        .await
        .unwrap();
    fixture
        .client
        .post(fixture.url("/api/heat-networks"))
        .json(&json!({ "location": "York", "name": "Ouse District Heating" }))
        .send()
        .await
        .unwrap();

    // No ids in the query string
    let empty_resp = fixture
        .client
        .get(fixture.url("/api/heat-networks/by-hn-ids"))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_resp.status(), 400);

    // Unknown ids
    let unknown_resp = fixture
        .client
        .get(fixture.url("/api/heat-networks/by-hn-ids?hnIds=HN9999999"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_resp.status(), 404);

    // Exact-match membership filter, no partial matches
    let found_resp = fixture
        .client
        .get(fixture.url("/api/heat-networks/by-hn-ids?hnIds=HN0000001,HN9999999"))
        .send()
        .await
        .unwrap();
    assert_eq!(found_resp.status(), 200);
    let found_body: Value = found_resp.json().await.unwrap();
    let results = found_body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["hnId"], "HN0000001");
}

#[tokio::test]
async fn test_heat_network_get_and_delete() {
    let fixture = TestFixture::new().await;

    let create_resp = fixture
        .client
        .post(fixture.url("/api/heat-networks"))
        .json(&json!({ "location": "Leeds", "name": "Aire Valley Network" }))
        .send()
        .await
        .unwrap();
    let create_body: Value = create_resp.json().await.unwrap();
    let id = create_body["data"]["id"].as_str().unwrap();

    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/heat-networks/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 200);

    let list_resp = fixture
        .client
        .get(fixture.url("/api/heat-networks"))
        .send()
        .await
        .unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    assert_eq!(list_body["data"].as_array().unwrap().len(), 1);

    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/heat-networks/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 204);

    let get_deleted_resp = fixture
        .client
        .get(fixture.url(&format!("/api/heat-networks/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_deleted_resp.status(), 404);
}

#[tokio::test]
async fn test_concurrent_sequence_allocation() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("test.sqlite"))
        .await
        .unwrap();
    let repo = Arc::new(Repository::new(pool));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.next_sequence_value("load_test_sequence").await.unwrap()
        }));
    }

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap());
    }
    values.sort_unstable();

    // Distinct, contiguous values from 1
    assert_eq!(values, (1..=10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_sequences_are_independent() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("test.sqlite"))
        .await
        .unwrap();
    let repo = Repository::new(pool);

    assert_eq!(repo.next_sequence_value("alpha_sequence").await.unwrap(), 1);
    assert_eq!(repo.next_sequence_value("alpha_sequence").await.unwrap(), 2);
    assert_eq!(repo.next_sequence_value("beta_sequence").await.unwrap(), 1);
}

#[tokio::test]
async fn test_get_by_hn_ids_empty_input() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("test.sqlite"))
        .await
        .unwrap();
    let repo = Repository::new(pool);

    let result = repo.get_by_hn_ids(&[]).await.unwrap();
    assert!(result.is_empty());
}
