//! End-to-end workflows against a mock Cloud Manager server

mod common;

use common::{MockOccmServer, snapshot};
use cvoctl_core::WorkingEnvironmentSelector;
use cvoctl_core::cvo::{
    self, LicenseInstanceTypeRequest, OntapUpgradeRequest, Tracked, UserTag,
};
use cvoctl_core::resolver;
use cvoctl_core::types::Partition;
use serde_json::json;
use wiremock::ResponseTemplate;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::Mock;

const ID: &str = "VsaWorkingEnvironment-1";

fn inventory() -> serde_json::Value {
    json!({
        "vsaWorkingEnvironments": [],
        "onPremWorkingEnvironments": [],
        "azureVsaWorkingEnvironments": [
            {"publicId": ID, "name": "env-a", "cloudProviderName": "Azure", "isHA": true, "svmName": "svm_env_a"}
        ],
        "gcpVsaWorkingEnvironments": []
    })
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn resolve_by_name_and_missing_name() {
    let server = MockOccmServer::start().await;
    server.mock_inventory(inventory()).await;
    let client = server.client();

    let env = resolver::resolve_by_name(&client, "env-a").await.unwrap();
    assert_eq!(env.public_id, ID);
    assert_eq!(env.partition, Some(Partition::Azure));

    let err = resolver::resolve_by_name(&client, "env-missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn selector_by_id_is_enriched_from_list() {
    let server = MockOccmServer::start().await;
    server.mock_direct_lookup(ID, "Azure", true).await;
    server.mock_inventory(inventory()).await;
    let client = server.client();

    let selector = WorkingEnvironmentSelector::from_fields(Some(ID), None, None).unwrap();
    let env = resolver::resolve(&client, &selector).await.unwrap();
    assert_eq!(env.svm_name, "svm_env_a");
    assert!(env.is_ha);
}

#[tokio::test]
async fn fsx_selector_uses_fsx_endpoints() {
    let server = MockOccmServer::start().await;
    server
        .get("/fsx-ontap/working-environments/account-1/fs-0abc")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "fsx-prod"})))
        .expect(1)
        .mount(server.server())
        .await;
    server
        .get("/occm/api/fsx/working-environments/fs-0abc/svms")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "svm_fsx"}])))
        .expect(1)
        .mount(server.server())
        .await;
    let client = server.client();

    let selector =
        WorkingEnvironmentSelector::from_fields(Some("fs-0abc"), None, Some("account-1")).unwrap();
    let env = resolver::resolve(&client, &selector).await.unwrap();
    assert_eq!(env.name, "fsx-prod");
    assert_eq!(env.svm_name, "svm_fsx");
    assert_eq!(resolver::api_root_for(&env), "/occm/api/fsx");
}

// ============================================================================
// Modifications
// ============================================================================

#[tokio::test]
async fn user_tags_are_put_under_provider_root() {
    let server = MockOccmServer::start().await;
    server.mock_direct_lookup(ID, "Amazon", true).await;
    Mock::given(method("PUT"))
        .and(path(format!("/occm/api/aws/ha/working-environments/{}/user-tags", ID)))
        .and(body_json(json!({"tags": [{"tagKey": "owner", "tagValue": "storage-team"}]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server.server())
        .await;

    let client = server.client();
    cvo::update_user_tags(&client, ID, &[UserTag::new("owner", "storage-team")])
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_submission_is_sent_once() {
    let server = MockOccmServer::start().await;
    server.mock_direct_lookup(ID, "Amazon", false).await;
    Mock::given(method("POST"))
        .and(path(format!("/occm/api/vsa/working-environments/{}/change-tier-level", ID)))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(server.server())
        .await;

    let client = server.client();
    let err = cvo::change_tier_level(&client, ID, "cold")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn license_change_waits_for_update_to_finish() {
    let server = MockOccmServer::start().await;
    server.mock_direct_lookup(ID, "Azure", false).await;
    Mock::given(method("PUT"))
        .and(path(format!("/occm/api/azure/vsa/working-environments/{}/license-instance-type", ID)))
        .and(body_json(json!({"instanceType": "Standard_E8s_v3", "licenseType": "azure-cot-premium-byol"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server.server())
        .await;
    server
        .mock_snapshot("/occm/api/azure/vsa", ID, snapshot("UPDATING", "9.10.1"), 2)
        .await;
    server
        .mock_snapshot("/occm/api/azure/vsa", ID, snapshot("ON", "9.10.1"), 1)
        .await;

    let client = server.client();
    let request = LicenseInstanceTypeRequest {
        instance_type: "Standard_E8s_v3".to_string(),
        license_type: "azure-cot-premium-byol".to_string(),
    };
    let props = cvo::update_license_instance_type(&client, ID, &request, None)
        .await
        .unwrap();
    assert_eq!(props.status_name(), "ON");
}

#[tokio::test]
async fn upgrade_checks_catalog_sets_flag_and_verifies_version() {
    let server = MockOccmServer::start().await;
    server.mock_direct_lookup(ID, "Amazon", false).await;
    server
        .get(&format!("/occm/api/vsa/working-environments/{}", ID))
        .and(query_param("fields", "ontapClusterProperties.fields(upgradeVersions)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ontapClusterProperties": {
                "ontapVersion": "9.9.1",
                "upgradeVersions": [
                    {"imageVersion": "ONTAP-9.10.1P3.T1", "lastModified": 1650000000, "autoUpdateAllowed": false}
                ]
            }
        })))
        .expect(1)
        .mount(server.server())
        .await;
    Mock::given(method("PUT"))
        .and(path("/occm/api/occm/config/skip-eligibility-paygo-upgrade"))
        .and(body_json(json!({"value": true, "valueType": "BOOLEAN"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server.server())
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/occm/api/vsa/working-environments/{}/update-image", ID)))
        .and(body_json(json!({"updateType": "OCCM_PROVIDED", "updateParameter": "ONTAP-9.10.1P3.T1"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(server.server())
        .await;
    server
        .mock_snapshot("/occm/api/vsa", ID, snapshot("UPDATING", ""), 1)
        .await;
    server
        .mock_snapshot("/occm/api/vsa", ID, snapshot("ON", "9.10.1P3"), 1)
        .await;

    let client = server.client();
    let mut request = OntapUpgradeRequest {
        upgrade: true,
        ontap_version: Tracked::new("ONTAP-9.9.1.T1".to_string(), "ONTAP-9.10.1P3.T1".to_string()),
        use_latest_version: Tracked::unchanged(false),
    };
    let reported = cvo::check_and_upgrade_ontap_version(&client, ID, &mut request, None)
        .await
        .unwrap();

    assert_eq!(reported.as_deref(), Some("9.10.1P3"));
    assert!(!request.ontap_version.changed());
}

#[tokio::test]
async fn upgrade_to_unlisted_version_never_touches_flag() {
    let server = MockOccmServer::start().await;
    server.mock_direct_lookup(ID, "Amazon", false).await;
    server
        .mock_snapshot(
            "/occm/api/vsa",
            ID,
            json!({"ontapClusterProperties": {"upgradeVersions": [{"imageVersion": "9.10"}]}}),
            1,
        )
        .await;
    Mock::given(method("PUT"))
        .and(path("/occm/api/occm/config/skip-eligibility-paygo-upgrade"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server.server())
        .await;

    let client = server.client();
    let err = cvo::upgrade_ontap_version(&client, ID, "9.11", None)
        .await
        .unwrap_err();
    assert!(err.is_precondition());
}
