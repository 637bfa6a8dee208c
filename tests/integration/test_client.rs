// Client facade behavior against the fake backend

use crate::common::*;
use adt_client::config::Config;
use adt_client::core::errors::ErrorKind;
use adt_client::core::models::RequestSpec;
use adt_client::xml;
use adt_client::AdtClient;
use serde_json::json;

#[tokio::test]
async fn test_discover_lists_workspaces_and_collections() {
    let (client, _backend) = create_test_client();

    let tree = client.discover().await.unwrap();
    assert_eq!(xml::find_elements(&tree, "workspace").len(), 2);

    let hrefs: Vec<&str> = xml::find_elements(&tree, "collection")
        .into_iter()
        .filter_map(|c| xml::get_attribute(c, "href"))
        .collect();
    assert_eq!(
        hrefs,
        vec![
            "/sap/bc/adt/programs/programs",
            "/sap/bc/adt/programs/includes",
            "/sap/bc/adt/activation"
        ]
    );
}

#[tokio::test]
async fn test_send_maps_error_status() {
    let (client, _backend) = create_test_client();

    let err = client.delete("/programs/programs/z_gone").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("ExceptionResourceNotFound"));

    // request() hands back the raw response instead
    let response = client
        .request(&RequestSpec::get("/programs/programs/z_gone"))
        .await
        .unwrap();
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_built_xml_is_accepted_as_request_body() {
    let (client, backend) = create_test_client();

    let body = AdtClient::build_xml(&json!({
        "adtcore:objectReferences": {
            "@_xmlns:adtcore": "http://www.sap.com/adt/core",
            "adtcore:objectReference": [
                { "@_adtcore:uri": "/sap/bc/adt/programs/programs/z_report", "@_adtcore:name": "Z_REPORT" }
            ]
        }
    }))
    .unwrap();

    client.post("/activation", body.clone()).await.unwrap_err();

    let sent = backend.calls().pop().unwrap();
    assert_eq!(sent.header("content-type"), Some("application/xml"));
    let parsed = AdtClient::parse_xml(sent.body.as_deref().unwrap()).unwrap();
    let reference = xml::find_elements(&parsed, "objectReference")[0];
    assert_eq!(xml::get_attribute(reference, "name"), Some("Z_REPORT"));
}

#[test]
fn test_client_from_config() {
    let config = Config::test_config();
    let client = AdtClient::from_config(&config).unwrap();

    assert_eq!(
        client.session().base_endpoint().as_str(),
        "http://localhost:8000/sap/bc/adt"
    );
    assert_eq!(client.session().credentials().client, "100");
}
