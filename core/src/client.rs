//! HTTP request builder and response parser for the Tableau REST API.
//!
//! # Design
//! `TableauClient` owns an `Api` configuration and nothing else. Each REST
//! operation is split into a `build_*` method that produces an `HttpRequest`
//! and a `parse_*` method that consumes an `HttpResponse`. The caller runs
//! the actual HTTP round-trip in between.
//!
//! The only state that changes is the auth token: `parse_signin` stores the
//! token the server issued and `parse_signout` drops it. Every other build
//! method reads the token to set `X-Tableau-Auth`.

use tracing::{debug, warn};

use crate::api::Api;
use crate::envelope::{decode_xml, CreateProjectRequest, DatasourceCreateRequest, SigninRequest};
use crate::error::{ApiError, ErrorResponse};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::{self, DatasourceFile};
use crate::types::{
    AuthResponse, CreateProjectResponse, Credentials, Datasource, Project,
    PublishDatasourceResponse, QueryProjectsResponse, QuerySiteResponse, QuerySitesResponse, Site,
};

pub const AUTH_HEADER: &str = "X-Tableau-Auth";
const XML_CONTENT_TYPE: &str = "application/xml";

/// How `build_query_site` identifies the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteLookup {
    Id(String),
    Name(String),
    ContentUrl(String),
}

/// Synchronous client for the Tableau REST API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct TableauClient {
    api: Api,
}

impl TableauClient {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api.base_url())
    }

    fn auth_header(&self) -> Result<(String, String), ApiError> {
        let token = self.api.auth_token.as_ref().ok_or(ApiError::NotSignedIn)?;
        Ok((AUTH_HEADER.to_string(), token.clone()))
    }

    fn site_url(&self, site_id: &str, rest: &str) -> String {
        self.url(&format!("/sites/{}{rest}", urlencoding::encode(site_id)))
    }

    fn request(
        &self,
        method: HttpMethod,
        path: String,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> HttpRequest {
        debug!(method = method.as_str(), %path, "built request");
        HttpRequest {
            method,
            path,
            headers,
            body,
        }
    }

    pub fn build_signin(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let body = SigninRequest::new(credentials.clone()).xml()?;
        Ok(self.request(
            HttpMethod::Post,
            self.url("/auth/signin"),
            vec![content_type(XML_CONTENT_TYPE)],
            Some(body),
        ))
    }

    /// Parse a sign-in response and keep the issued token for later calls.
    ///
    /// Returns the echoed credentials: the token, the signed-in site (with
    /// its id) and the user id.
    pub fn parse_signin(&mut self, response: HttpResponse) -> Result<Credentials, ApiError> {
        check_status(&response, 200)?;
        let auth: AuthResponse = decode_xml(&response.body)?;
        let credentials = auth
            .credentials
            .filter(|c| !c.token.is_empty())
            .ok_or_else(|| {
                ApiError::Deserialization("sign-in response carried no token".to_string())
            })?;
        self.api.set_auth_token(credentials.token.clone());
        debug!(
            site = credentials.site.as_ref().map(|s| s.id.as_str()).unwrap_or_default(),
            "signed in"
        );
        Ok(credentials)
    }

    pub fn build_signout(&self) -> Result<HttpRequest, ApiError> {
        Ok(self.request(
            HttpMethod::Post,
            self.url("/auth/signout"),
            vec![self.auth_header()?],
            None,
        ))
    }

    pub fn parse_signout(&mut self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 204)?;
        self.api.clear_auth_token();
        debug!("signed out");
        Ok(())
    }

    pub fn build_query_sites(&self) -> Result<HttpRequest, ApiError> {
        Ok(self.request(
            HttpMethod::Get,
            self.url("/sites"),
            vec![self.auth_header()?],
            None,
        ))
    }

    pub fn parse_query_sites(&self, response: HttpResponse) -> Result<Vec<Site>, ApiError> {
        check_status(&response, 200)?;
        let resp: QuerySitesResponse = decode_xml(&response.body)?;
        Ok(resp.sites.sites)
    }

    /// Query one site by id, name or content URL. With `include_usage` the
    /// server attaches `SiteUsage` statistics.
    pub fn build_query_site(
        &self,
        lookup: &SiteLookup,
        include_usage: bool,
    ) -> Result<HttpRequest, ApiError> {
        let mut params = Vec::new();
        let key = match lookup {
            SiteLookup::Id(id) => id,
            SiteLookup::Name(name) => {
                params.push("key=name");
                name
            }
            SiteLookup::ContentUrl(content_url) => {
                params.push("key=contentUrl");
                content_url
            }
        };
        if include_usage {
            params.push("includeUsageStatistics=true");
        }
        let mut path = self.site_url(key, "");
        if !params.is_empty() {
            path.push('?');
            path.push_str(&params.join("&"));
        }
        Ok(self.request(HttpMethod::Get, path, vec![self.auth_header()?], None))
    }

    pub fn parse_query_site(&self, response: HttpResponse) -> Result<Site, ApiError> {
        check_status(&response, 200)?;
        let resp: QuerySiteResponse = decode_xml(&response.body)?;
        Ok(resp.site)
    }

    pub fn build_query_projects(&self, site_id: &str) -> Result<HttpRequest, ApiError> {
        Ok(self.request(
            HttpMethod::Get,
            self.site_url(site_id, "/projects"),
            vec![self.auth_header()?],
            None,
        ))
    }

    pub fn parse_query_projects(&self, response: HttpResponse) -> Result<Vec<Project>, ApiError> {
        check_status(&response, 200)?;
        let resp: QueryProjectsResponse = decode_xml(&response.body)?;
        Ok(resp.projects.projects)
    }

    pub fn build_create_project(
        &self,
        site_id: &str,
        project: &Project,
    ) -> Result<HttpRequest, ApiError> {
        let auth = self.auth_header()?;
        let body = CreateProjectRequest::new(project.clone()).xml()?;
        Ok(self.request(
            HttpMethod::Post,
            self.site_url(site_id, "/projects"),
            vec![auth, content_type(XML_CONTENT_TYPE)],
            Some(body),
        ))
    }

    pub fn parse_create_project(&self, response: HttpResponse) -> Result<Project, ApiError> {
        check_status(&response, 201)?;
        let resp: CreateProjectResponse = decode_xml(&response.body)?;
        Ok(resp.project)
    }

    /// Publish `file` as a data source. The datasource must name its target
    /// project; `overwrite` replaces an existing data source of the same name.
    pub fn build_publish_datasource(
        &self,
        site_id: &str,
        datasource: &Datasource,
        file: &DatasourceFile,
        overwrite: bool,
    ) -> Result<HttpRequest, ApiError> {
        let auth = self.auth_header()?;
        let payload = DatasourceCreateRequest::new(datasource.clone()).xml()?;
        let body = multipart::datasource_body(&self.api.boundary, &payload, file)?;
        Ok(self.request(
            HttpMethod::Post,
            self.site_url(site_id, &format!("/datasources?overwrite={overwrite}")),
            vec![auth, content_type(&multipart::content_type(&self.api.boundary))],
            Some(body),
        ))
    }

    pub fn parse_publish_datasource(&self, response: HttpResponse) -> Result<Datasource, ApiError> {
        check_status(&response, 201)?;
        let resp: PublishDatasourceResponse = decode_xml(&response.body)?;
        Ok(resp.datasource)
    }
}

fn content_type(value: &str) -> (String, String) {
    ("content-type".to_string(), value.to_string())
}

/// Map non-success status codes to the appropriate `ApiError` variant.
///
/// A body the server filled with an `<error>` record wins over the bare
/// status, including for 404.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    if let Ok(ErrorResponse { error }) = decode_xml::<ErrorResponse>(&response.body) {
        if !error.code.is_empty() {
            warn!(
                status = response.status,
                code = %error.code,
                summary = %error.summary,
                "server reported error"
            );
            return Err(ApiError::Server {
                status: response.status,
                error,
            });
        }
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    warn!(status = response.status, expected, "unexpected status");
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}
