mod common;

use common::{FakeAz, SUBSCRIPTION, TENANT, client};
use serde_json::json;
use weblodge_cloud_azure::{
    FederationProvisioner, GITHUB_ISSUER, GitHubRepository, ResourceGroup,
    TOKEN_EXCHANGE_AUDIENCE,
};

fn deployed_group(fake: &FakeAz) {
    fake.seed_group(
        "demo",
        "northeurope",
        json!({ "managed-by": "weblodge", "contains": "webapp" }),
    );
}

fn repository() -> GitHubRepository {
    GitHubRepository::new("octocat", "hello-world", "main")
}

#[tokio::test]
async fn test_provision_identity() {
    let fake = FakeAz::new();
    deployed_group(&fake);
    let client = client(&fake);
    let group = ResourceGroup::new(&client, "demo");

    let identity = FederationProvisioner::new(&client)
        .provision("demo", &repository(), &group)
        .await
        .unwrap();

    assert_eq!(identity.tenant_id, TENANT);
    assert_eq!(identity.subscription_id, SUBSCRIPTION);

    let state = fake.state();
    assert_eq!(state.ad_apps.len(), 1);
    assert_eq!(state.ad_apps[0]["displayName"], "weblodge-demo");
    assert_eq!(state.ad_apps[0]["appId"], identity.client_id.as_str());
    assert_eq!(state.service_principals.len(), 1);

    let sp_id = state.service_principals[0]["id"].as_str().unwrap();
    let group_id = format!("/subscriptions/{}/resourceGroups/demo", SUBSCRIPTION);
    assert_eq!(
        state.role_assignments,
        vec![("owner".to_string(), sp_id.to_string(), group_id)]
    );

    let credentials = &state.credentials[&identity.client_id];
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0]["issuer"], GITHUB_ISSUER);
    assert_eq!(
        credentials[0]["subject"],
        "repo:octocat/hello-world:ref:refs/heads/main"
    );
    assert_eq!(credentials[0]["audiences"], json!([TOKEN_EXCHANGE_AUDIENCE]));
}

#[tokio::test]
async fn test_provision_converges() {
    let fake = FakeAz::new();
    deployed_group(&fake);
    let client = client(&fake);
    let group = ResourceGroup::new(&client, "demo");
    let provisioner = FederationProvisioner::new(&client);

    let first = provisioner
        .provision("demo", &repository(), &group)
        .await
        .unwrap();
    for _ in 0..2 {
        let again = provisioner
            .provision("demo", &repository(), &group)
            .await
            .unwrap();
        assert_eq!(again, first);
    }

    assert_eq!(fake.count("ad app create"), 1);
    assert_eq!(fake.count("ad sp create"), 1);
    assert_eq!(fake.count("role assignment create"), 1);
    assert_eq!(fake.count("ad app federated-credential create"), 1);
    assert_eq!(fake.state().credentials[&first.client_id].len(), 1);
}

#[tokio::test]
async fn test_other_branch_adds_credential() {
    let fake = FakeAz::new();
    deployed_group(&fake);
    let client = client(&fake);
    let group = ResourceGroup::new(&client, "demo");
    let provisioner = FederationProvisioner::new(&client);

    let identity = provisioner
        .provision("demo", &repository(), &group)
        .await
        .unwrap();
    provisioner
        .provision(
            "demo",
            &GitHubRepository::new("octocat", "hello-world", "release"),
            &group,
        )
        .await
        .unwrap();

    assert_eq!(fake.state().credentials[&identity.client_id].len(), 2);
    assert_eq!(fake.count("ad app create"), 1);
}

#[tokio::test]
async fn test_provision_requires_resource_group() {
    let fake = FakeAz::new();
    let client = client(&fake);
    let group = ResourceGroup::new(&client, "demo");

    let err = FederationProvisioner::new(&client)
        .provision("demo", &repository(), &group)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(fake.count("role assignment create"), 0);
}

#[tokio::test]
async fn test_delete_application() {
    let fake = FakeAz::new();
    deployed_group(&fake);
    let client = client(&fake);
    let group = ResourceGroup::new(&client, "demo");
    let provisioner = FederationProvisioner::new(&client);
    provisioner
        .provision("demo", &repository(), &group)
        .await
        .unwrap();

    assert!(provisioner.delete_application("demo").await.unwrap());
    assert!(fake.state().ad_apps.is_empty());
    assert!(!provisioner.delete_application("demo").await.unwrap());
}
