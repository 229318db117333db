//! Synchronous client core for the Tableau Server REST API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, which keeps the core deterministic and testable.
//!
//! # Design
//! - `Api` carries the server address, API version, multipart boundary and
//!   the auth token issued on sign-in.
//! - `types` mirrors the server's XML/JSON schema as plain records; every
//!   field is optional and zero values are left out of the output.
//! - `envelope` wraps request payloads in `<tsRequest>` and encodes them as
//!   indented XML; it also decodes `<tsResponse>` bodies.
//! - `TableauClient` pairs a `build_*` and a `parse_*` method per operation.

pub mod api;
pub mod client;
pub mod envelope;
pub mod error;
pub mod http;
pub mod multipart;
pub mod types;

pub use api::Api;
pub use client::{SiteLookup, TableauClient};
pub use envelope::{decode_xml, CreateProjectRequest, DatasourceCreateRequest, SigninRequest};
pub use error::{ApiError, ErrorResponse, Terror};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use multipart::DatasourceFile;
pub use types::{
    AuthResponse, ConnectionCredentials, CreateProjectResponse, Credentials, Datasource, Project,
    Projects, PublishDatasourceResponse, QueryProjectsResponse, QuerySiteResponse,
    QuerySitesResponse, Site, SiteUsage, Sites, User,
};
