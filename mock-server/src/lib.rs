use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const ADMIN_NAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin";
pub const AUTH_HEADER: &str = "x-tableau-auth";
pub const SALES_CONTENT_URL: &str = "sales";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteUsage {
    #[serde(rename = "@number-of-users")]
    pub number_of_users: u64,
    #[serde(rename = "@storage")]
    pub storage: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@contentUrl")]
    pub content_url: String,
    #[serde(rename = "@state")]
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<SiteUsage>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@description")]
    pub description: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Datasource {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "@contentUrl", skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    #[serde(rename = "@name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "@password", skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(rename = "@token", skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub site: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Reference>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    #[serde(rename = "@code")]
    pub code: String,
    pub summary: String,
    pub detail: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsBody {
    pub credentials: Credentials,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectBody {
    pub project: Project,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasourceBody {
    pub datasource: Datasource,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteBody {
    pub site: Site,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteList {
    pub site: Vec<Site>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesBody {
    pub sites: SiteList,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectList {
    pub project: Vec<Project>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectsBody {
    pub projects: ProjectList,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug)]
struct User {
    id: String,
    name: String,
    password: String,
}

#[derive(Clone, Debug)]
struct StoredDatasource {
    id: String,
    name: String,
    project_id: String,
    size: u64,
}

#[derive(Clone, Debug)]
struct Session {
    site_id: String,
}

/// In-memory server state. Seeded with the default site, a `sales` site,
/// an admin user and a `default` project on every site.
#[derive(Debug, Default)]
pub struct Store {
    sites: Vec<Site>,
    users: Vec<User>,
    projects: HashMap<String, Vec<Project>>,
    datasources: HashMap<String, Vec<StoredDatasource>>,
    sessions: HashMap<String, Session>,
}

impl Store {
    pub fn seeded() -> Self {
        let mut store = Store::default();
        for (name, content_url) in [("Default", ""), ("Sales Team", SALES_CONTENT_URL)] {
            let site = Site {
                id: new_id(),
                name: name.to_string(),
                content_url: content_url.to_string(),
                state: "Active".to_string(),
                usage: None,
            };
            store.projects.insert(
                site.id.clone(),
                vec![Project {
                    id: new_id(),
                    name: "default".to_string(),
                    description: "The default project".to_string(),
                }],
            );
            store.sites.push(site);
        }
        store.users.push(User {
            id: new_id(),
            name: ADMIN_NAME.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        });
        store
    }

    fn usage(&self, site_id: &str) -> SiteUsage {
        SiteUsage {
            number_of_users: self.users.len() as u64,
            storage: self
                .datasources
                .get(site_id)
                .map(|ds| ds.iter().map(|d| d.size).sum())
                .unwrap_or(0),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    Router::new()
        .route("/api/{version}/auth/signin", post(signin))
        .route("/api/{version}/auth/signout", post(signout))
        .route("/api/{version}/sites", get(list_sites))
        .route("/api/{version}/sites/{site}", get(get_site))
        .route(
            "/api/{version}/sites/{site}/projects",
            get(list_projects).post(create_project),
        )
        .route("/api/{version}/sites/{site}/datasources", post(publish_datasource))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock tableau server listening");
    }
    axum::serve(listener, app()).await
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn xml_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match quick_xml::se::to_string_with_root("tsResponse", body) {
        Ok(xml) => (status, [(header::CONTENT_TYPE, "application/xml")], xml).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn error_response(status: StatusCode, code: &str, summary: &str, detail: &str) -> Response {
    warn!(%status, code, detail, "rejecting request");
    xml_response(
        status,
        &ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                summary: summary.to_string(),
                detail: detail.to_string(),
            },
        },
    )
}

fn bad_request(detail: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, "400000", "Bad Request", detail)
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, Response> {
    quick_xml::de::from_str(body).map_err(|e| bad_request(&e.to_string()))
}

async fn authorize(db: &Db, headers: &HeaderMap) -> Result<Session, Response> {
    let token = headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    db.read().await.sessions.get(token).cloned().ok_or_else(|| {
        error_response(
            StatusCode::UNAUTHORIZED,
            "401002",
            "Unauthorized Access",
            "Invalid authentication credentials were provided.",
        )
    })
}

fn check_site(session: &Session, site_id: &str) -> Result<(), Response> {
    if session.site_id == site_id {
        return Ok(());
    }
    Err(error_response(
        StatusCode::FORBIDDEN,
        "403000",
        "Forbidden",
        "The session is not signed in to this site.",
    ))
}

async fn signin(State(db): State<Db>, body: String) -> Result<Response, Response> {
    let CredentialsBody { credentials } = decode(&body)?;
    let signin_error = |detail: &str| {
        error_response(StatusCode::UNAUTHORIZED, "401001", "Signin Error", detail)
    };

    let mut store = db.write().await;
    let user = store
        .users
        .iter()
        .find(|u| u.name == credentials.name && u.password == credentials.password)
        .cloned()
        .ok_or_else(|| signin_error("Error signing in to Tableau Server"))?;
    let content_url = credentials.site.content_url.unwrap_or_default();
    let site = store
        .sites
        .iter()
        .find(|s| s.content_url == content_url)
        .cloned()
        .ok_or_else(|| signin_error("Unknown site content URL"))?;
    let user_id = match credentials.user {
        Some(target) if !store.users.iter().any(|u| u.id == target.id) => {
            return Err(signin_error("Unknown user to impersonate"));
        }
        Some(target) => target.id,
        None => user.id,
    };

    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(
        token.clone(),
        Session {
            site_id: site.id.clone(),
        },
    );
    debug!(site = %site.id, user = %user_id, "signed in");

    Ok(xml_response(
        StatusCode::OK,
        &CredentialsBody {
            credentials: Credentials {
                token,
                site: Reference {
                    id: site.id,
                    content_url: Some(site.content_url),
                },
                user: Some(Reference {
                    id: user_id,
                    content_url: None,
                }),
                ..Credentials::default()
            },
        },
    ))
}

async fn signout(State(db): State<Db>, headers: HeaderMap) -> Result<StatusCode, Response> {
    authorize(&db, &headers).await?;
    if let Some(token) = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) {
        db.write().await.sessions.remove(token);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_sites(State(db): State<Db>, headers: HeaderMap) -> Result<Response, Response> {
    authorize(&db, &headers).await?;
    let store = db.read().await;
    Ok(xml_response(
        StatusCode::OK,
        &SitesBody {
            sites: SiteList {
                site: store.sites.clone(),
            },
        },
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct SiteQuery {
    pub key: Option<String>,
    #[serde(rename = "includeUsageStatistics", default)]
    pub include_usage: bool,
}

async fn get_site(
    State(db): State<Db>,
    Path((_version, key)): Path<(String, String)>,
    Query(query): Query<SiteQuery>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    authorize(&db, &headers).await?;
    let store = db.read().await;
    let found = store.sites.iter().find(|s| match query.key.as_deref() {
        Some("name") => s.name == key,
        Some("contentUrl") => s.content_url == key,
        _ => s.id == key,
    });
    let mut site = found.cloned().ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, "404000", "Site not found", &key)
    })?;
    if query.include_usage {
        site.usage = Some(store.usage(&site.id));
    }
    Ok(xml_response(StatusCode::OK, &SiteBody { site }))
}

async fn list_projects(
    State(db): State<Db>,
    Path((_version, site_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    let session = authorize(&db, &headers).await?;
    check_site(&session, &site_id)?;
    let store = db.read().await;
    let projects = store.projects.get(&site_id).cloned().unwrap_or_default();
    Ok(xml_response(
        StatusCode::OK,
        &ProjectsBody {
            projects: ProjectList { project: projects },
        },
    ))
}

async fn create_project(
    State(db): State<Db>,
    Path((_version, site_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, Response> {
    let session = authorize(&db, &headers).await?;
    check_site(&session, &site_id)?;
    let ProjectBody { project } = decode(&body)?;
    if project.name.is_empty() {
        return Err(bad_request("A project name is required."));
    }

    let mut store = db.write().await;
    let projects = store.projects.entry(site_id).or_default();
    if projects.iter().any(|p| p.name == project.name) {
        return Err(error_response(
            StatusCode::CONFLICT,
            "409006",
            "Resource Conflict",
            "A project with the specified name already exists.",
        ));
    }
    let created = Project {
        id: new_id(),
        name: project.name,
        description: project.description,
    };
    projects.push(created.clone());
    Ok(xml_response(StatusCode::CREATED, &ProjectBody { project: created }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishQuery {
    #[serde(default)]
    pub overwrite: bool,
}

/// One part of a `multipart/mixed` body.
#[derive(Debug, PartialEq, Eq)]
pub struct Part<'a> {
    pub disposition: String,
    pub data: &'a [u8],
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Boundary parameter of a `multipart/*` content type.
pub fn boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .find_map(|param| param.trim().strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
}

/// Split a multipart body into its parts. Preamble and epilogue are dropped.
pub fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<Part<'a>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut parts = Vec::new();
    let Some(start) = find(body, delimiter) else {
        return parts;
    };
    let mut rest = &body[start + delimiter.len()..];
    while !rest.starts_with(b"--") {
        let Some(end) = find(rest, delimiter) else {
            break;
        };
        let segment = &rest[..end];
        let segment = segment.strip_prefix(b"\r\n").unwrap_or(segment);
        let segment = segment.strip_suffix(b"\r\n").unwrap_or(segment);
        if let Some(split) = find(segment, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&segment[..split]);
            let disposition = head
                .lines()
                .find_map(|line| line.strip_prefix("Content-Disposition:"))
                .map(|value| value.trim().to_string())
                .unwrap_or_default();
            parts.push(Part {
                disposition,
                data: &segment[split + 4..],
            });
        }
        rest = &rest[end + delimiter.len()..];
    }
    parts
}

async fn publish_datasource(
    State(db): State<Db>,
    Path((_version, site_id)): Path<(String, String)>,
    Query(query): Query<PublishQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Response> {
    let session = authorize(&db, &headers).await?;
    check_site(&session, &site_id)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let boundary = boundary(content_type)
        .ok_or_else(|| bad_request("Expected a multipart/mixed body."))?;
    let parts = split_multipart(&body, boundary);
    let part = |name: &str| {
        let needle = format!("name=\"{name}\"");
        parts.iter().find(|p| p.disposition.contains(&needle))
    };
    let payload =
        part("request_payload").ok_or_else(|| bad_request("Missing request_payload part."))?;
    let file =
        part("tableau_datasource").ok_or_else(|| bad_request("Missing tableau_datasource part."))?;

    let payload = String::from_utf8_lossy(payload.data);
    let DatasourceBody { datasource } = decode(&payload)?;
    let project_id = datasource.project.map(|p| p.id).unwrap_or_default();

    let mut store = db.write().await;
    let project = store
        .projects
        .get(&site_id)
        .and_then(|ps| ps.iter().find(|p| p.id == project_id))
        .cloned()
        .ok_or_else(|| {
            error_response(StatusCode::NOT_FOUND, "404005", "Project not found", &project_id)
        })?;

    let size = file.data.len() as u64;
    let stored = store.datasources.entry(site_id).or_default();
    let existing = stored
        .iter_mut()
        .find(|d| d.name == datasource.name && d.project_id == project.id);
    let id = match existing {
        Some(_) if !query.overwrite => {
            return Err(error_response(
                StatusCode::CONFLICT,
                "409004",
                "Resource Conflict",
                "A data source with the specified name already exists in the project.",
            ));
        }
        Some(existing) => {
            existing.size = size;
            existing.id.clone()
        }
        None => {
            let id = new_id();
            stored.push(StoredDatasource {
                id: id.clone(),
                name: datasource.name.clone(),
                project_id: project.id.clone(),
                size,
            });
            id
        }
    };
    debug!(%id, name = %datasource.name, size, "published datasource");

    Ok(xml_response(
        StatusCode::CREATED,
        &DatasourceBody {
            datasource: Datasource {
                id,
                name: datasource.name,
                project: Some(project),
            },
        },
    ))
}
