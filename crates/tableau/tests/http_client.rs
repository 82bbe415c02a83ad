// End-to-end HTTP behaviour of the Tableau client against a mock server.

use mockito::Matcher;
use tabops_core::{Credentials, TableauConfig};
use tabops_tableau::{
    Orientation, PageType, PdfOptions, Session, StatusLabel, TableauClient, TableauError,
};

const SIGN_IN_BODY: &str = r#"{"credentials":{"site":{"id":"site-1","contentUrl":"BranchAnalytics"},"user":{"id":"user-1"},"token":"tok-abc"}}"#;

fn signed_in(server: &mockito::ServerGuard) -> TableauClient {
    TableauClient::new(&server.url(), &TableauConfig::default())
        .unwrap()
        .with_session(Session {
            token: "tok-abc".to_string(),
            site_id: "site-1".to_string(),
            site_content_url: "BranchAnalytics".to_string(),
            user_id: "user-1".to_string(),
            site_name: None,
        })
}

#[test]
fn sign_in_stores_session_and_site_name() {
    let mut server = mockito::Server::new();
    let sign_in = server
        .mock("POST", "/api/3.19/auth/signin")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "credentials": {"name": "svc.batch", "site": {"contentUrl": "BranchAnalytics"}}
        })))
        .with_status(200)
        .with_body(SIGN_IN_BODY)
        .expect(1)
        .create();
    let site = server
        .mock("GET", "/api/3.19/sites/site-1")
        .match_header("x-tableau-auth", "tok-abc")
        .with_status(200)
        .with_body(r#"{"site":{"id":"site-1","name":"Branch Analytics","contentUrl":"BranchAnalytics"}}"#)
        .create();
    let sign_out = server
        .mock("POST", "/api/3.19/auth/signout")
        .match_header("x-tableau-auth", "tok-abc")
        .with_status(204)
        .expect(1)
        .create();

    let mut client = TableauClient::new(&server.url(), &TableauConfig::default()).unwrap();
    let session = client
        .sign_in(&Credentials::new("svc.batch", "pw"), "BranchAnalytics")
        .unwrap()
        .clone();

    assert_eq!(session.token, "tok-abc");
    assert_eq!(session.site_id, "site-1");
    assert_eq!(session.user_id, "user-1");
    assert_eq!(session.site_name.as_deref(), Some("Branch Analytics"));

    client.sign_out().unwrap();
    assert!(client.session().is_none());

    sign_in.assert();
    site.assert();
    sign_out.assert();
}

#[test]
fn sign_in_rejected_surfaces_error_code() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("POST", "/api/3.19/auth/signin")
        .with_status(401)
        .with_body(r#"{"error":{"summary":"Signin Error","detail":"Error signing in to Tableau Server","code":"401001"}}"#)
        .create();

    let mut client = TableauClient::new(&server.url(), &TableauConfig::default()).unwrap();
    let err = client
        .sign_in(&Credentials::new("jdoe", "wrong"), "")
        .unwrap_err();

    match err {
        TableauError::Service { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code.as_deref(), Some("401001"));
        }
        other => panic!("expected Service, got {other:?}"),
    }
    assert!(client.session().is_none());
}

#[test]
fn sign_in_survives_site_lookup_failure() {
    let mut server = mockito::Server::new();
    let _sign_in = server
        .mock("POST", "/api/3.19/auth/signin")
        .with_status(200)
        .with_body(SIGN_IN_BODY)
        .create();
    let _site = server
        .mock("GET", "/api/3.19/sites/site-1")
        .with_status(403)
        .create();

    let mut client = TableauClient::new(&server.url(), &TableauConfig::default()).unwrap();
    let session = client.sign_in(&Credentials::new("jdoe", "pw"), "").unwrap();
    assert!(session.site_name.is_none());
}

#[test]
fn start_refresh_over_http() {
    let mut server = mockito::Server::new();
    let refresh = server
        .mock("POST", "/api/3.19/sites/site-1/workbooks/wb-1/refresh")
        .match_header("x-tableau-auth", "tok-abc")
        .match_header("accept", "application/json")
        .with_status(202)
        .with_body(r#"{"job":{"id":"job-77","mode":"Asynchronous","type":"RefreshExtract"}}"#)
        .expect(1)
        .create();

    let client = signed_in(&server);
    let handle = client.start_refresh("wb-1").unwrap();

    assert_eq!(handle.job_id, "job-77");
    refresh.assert();
}

#[test]
fn query_job_over_http() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/api/3.19/sites/site-1/jobs/job-77")
        .with_status(200)
        .with_body(r#"{"job":{"id":"job-77","progress":100,"finishCode":1,"extractRefreshJob":{"workbook":{"id":"wb-1","name":"Sales"}}}}"#)
        .create();

    let client = signed_in(&server);
    let status = client.query_job("job-77").unwrap();

    assert_eq!(status.status_label(), StatusLabel::Error);
    assert_eq!(status.workbook_name.as_deref(), Some("Sales"));
}

#[test]
fn cancel_job_sends_one_put() {
    let mut server = mockito::Server::new();
    let cancel = server
        .mock("PUT", "/api/3.19/sites/site-1/jobs/job-77")
        .match_header("x-tableau-auth", "tok-abc")
        .with_status(404)
        .with_header("x-request-id", "req-1")
        .with_body("job not found")
        .expect(1)
        .create();

    let client = signed_in(&server);
    let response = client.cancel_job("job-77").unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(response.text(), "job not found");
    assert!(response
        .headers
        .iter()
        .any(|(k, v)| k == "x-request-id" && v == "req-1"));
    cancel.assert();
}

#[test]
fn view_image_returns_bytes() {
    let png = [0x89u8, b'P', b'N', b'G', 0x0d, 0x0a];
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/api/3.19/sites/site-1/views/view-1/image")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(png)
        .create();

    let client = signed_in(&server);
    assert_eq!(client.query_view_image("view-1").unwrap(), png.to_vec());
}

#[test]
fn view_pdf_passes_layout_options() {
    let mut server = mockito::Server::new();
    let pdf = server
        .mock("GET", "/api/3.19/sites/site-1/views/view-1/pdf")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("orientation".into(), "Landscape".into()),
            Matcher::UrlEncoded("type".into(), "A4".into()),
            Matcher::UrlEncoded("vizWidth".into(), "1600".into()),
            Matcher::UrlEncoded("vizHeight".into(), "900".into()),
        ]))
        .with_status(200)
        .with_body("%PDF-1.7")
        .expect(1)
        .create();

    let client = signed_in(&server);
    let options = PdfOptions {
        orientation: Orientation::Landscape,
        page_type: PageType::A4,
        viz_width: 1600,
        viz_height: 900,
    };
    assert_eq!(client.query_view_pdf("view-1", &options).unwrap(), b"%PDF-1.7".to_vec());
    pdf.assert();
}

#[test]
fn workbook_pdf_error_is_service_error() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/api/3.19/sites/site-1/workbooks/wb-1/pdf")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("orientation".into(), "Portrait".into()),
            Matcher::UrlEncoded("type".into(), "Letter".into()),
        ]))
        .with_status(500)
        .with_body("render failed")
        .create();

    let client = signed_in(&server);
    let err = client
        .download_workbook_pdf("wb-1", Orientation::Portrait, PageType::Letter)
        .unwrap_err();
    assert!(matches!(err, TableauError::Service { status: 500, .. }));
}
