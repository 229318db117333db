//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Request bodies are XML on the wire; they are
//! decoded back into the request type and compared as JSON, which avoids
//! false negatives from whitespace or attribute-quoting differences.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tableau_core::{
    decode_xml, Api, ApiError, CreateProjectRequest, Credentials, HttpMethod, HttpRequest,
    HttpResponse, Project, SigninRequest, SiteLookup, TableauClient,
};

const BASE_URL: &str = "http://localhost:8000";
const TOKEN: &str = "vector-token";

fn client() -> TableauClient {
    TableauClient::new(Api::default_api())
}

fn signed_in() -> TableauClient {
    let mut api = Api::default_api();
    api.set_auth_token(TOKEN);
    TableauClient::new(api)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn expected_headers(expected_req: &Value) -> Vec<(String, String)> {
    expected_req["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

/// Check method, path, headers and the decoded XML body of `req`.
fn assert_request<T: DeserializeOwned + serde::Serialize>(
    name: &str,
    req: &HttpRequest,
    expected_req: &Value,
) {
    assert_eq!(
        req.method,
        parse_method(expected_req["method"].as_str().unwrap()),
        "{name}: method"
    );
    assert_eq!(
        req.path,
        format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()),
        "{name}: path"
    );
    assert_eq!(req.headers, expected_headers(expected_req), "{name}: headers");

    let xml = String::from_utf8(req.body.clone().unwrap()).unwrap();
    assert!(xml.starts_with("<tsRequest>"), "{name}: envelope");
    let decoded: T = decode_xml(&xml).unwrap();
    assert_eq!(serde_json::to_value(&decoded).unwrap(), expected_req["body"], "{name}: body");
}

fn load(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

// ---------------------------------------------------------------------------
// Sign-in
// ---------------------------------------------------------------------------

#[test]
fn signin_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/signin.json"));

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: Credentials = serde_json::from_value(case["input"].clone()).unwrap();
        let mut c = client();

        // Verify build
        let req = c.build_signin(&input).unwrap();
        assert_request::<SigninRequest>(name, &req, &case["expected_request"]);

        // Verify parse
        let creds = c.parse_signin(simulated(case)).unwrap();
        let expected: Credentials =
            serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(creds, expected, "{name}: parsed result");
        assert_eq!(c.api().auth_token.as_deref(), Some(expected.token.as_str()), "{name}: token");
    }
}

// ---------------------------------------------------------------------------
// Create project
// ---------------------------------------------------------------------------

#[test]
fn create_project_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/create_project.json"));

    let c = signed_in();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let site_id = case["site_id"].as_str().unwrap();
        let input: Project = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_create_project(site_id, &input).unwrap();
        assert_request::<CreateProjectRequest>(name, &req, &case["expected_request"]);

        let project = c.parse_create_project(simulated(case)).unwrap();
        let expected: Project = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(project, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

#[test]
fn query_sites_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/query_sites.json"));
    let c = signed_in();

    let list = &vectors["list"];
    let req = c.build_query_sites().unwrap();
    assert_eq!(req.method, parse_method(list["expected_request"]["method"].as_str().unwrap()));
    assert_eq!(
        req.path,
        format!("{BASE_URL}{}", list["expected_request"]["path"].as_str().unwrap())
    );
    assert!(req.body.is_none());
    let sites = c.parse_query_sites(simulated(list)).unwrap();
    assert_eq!(
        serde_json::to_value(&sites).unwrap(),
        list["expected_result"],
        "list: parsed result"
    );

    for case in vectors["lookups"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (kind, key) = case["lookup"].as_object().unwrap().iter().next().unwrap();
        let key = key.as_str().unwrap().to_string();
        let lookup = match kind.as_str() {
            "Id" => SiteLookup::Id(key),
            "Name" => SiteLookup::Name(key),
            "ContentUrl" => SiteLookup::ContentUrl(key),
            other => panic!("unknown lookup: {other}"),
        };
        let include_usage = case["include_usage"].as_bool().unwrap();

        let req = c.build_query_site(&lookup, include_usage).unwrap();
        assert_eq!(req.method, HttpMethod::Get, "{name}: method");
        assert_eq!(
            req.path,
            format!("{BASE_URL}{}", case["expected_path"].as_str().unwrap()),
            "{name}: path"
        );
        assert_eq!(req.header("X-Tableau-Auth"), Some(TOKEN), "{name}: auth");

        let site = c.parse_query_site(simulated(case)).unwrap();
        assert_eq!(
            serde_json::to_value(&site).unwrap(),
            case["expected_result"],
            "{name}: parsed result"
        );
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/errors.json"));
    let c = signed_in();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_error"];
        let err = c.parse_query_projects(simulated(case)).unwrap_err();

        match (expected["kind"].as_str().unwrap(), &err) {
            ("server", ApiError::Server { status, error }) => {
                assert_eq!(
                    u64::from(*status),
                    expected["status"].as_u64().unwrap(),
                    "{name}: status"
                );
                assert_eq!(
                    error.to_string(),
                    expected["display"].as_str().unwrap(),
                    "{name}: display"
                );
            }
            ("not_found", ApiError::NotFound) => {}
            ("http", ApiError::Http { status, .. }) => {
                assert_eq!(
                    u64::from(*status),
                    expected["status"].as_u64().unwrap(),
                    "{name}: status"
                );
            }
            ("deserialization", ApiError::Deserialization(_)) => {}
            (kind, other) => panic!("{name}: expected {kind}, got {other:?}"),
        }
    }
}
