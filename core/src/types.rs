//! Domain DTOs for the Tableau REST API.
//!
//! # Design
//! Every record serializes to JSON with serde using the server's key names.
//! The same derive handles XML decoding: quick-xml presents attributes as
//! `@`-prefixed keys, so each attribute-valued field carries an `@` alias.
//! XML encoding goes through `crate::envelope`, which knows which fields
//! are attributes and which are child elements.
//!
//! All fields are optional: an empty string, a zero quota or
//! a missing nested record is left out of the output. `SiteUsage` counters
//! and `ConnectionCredentials::embed` are always written.

use serde::{Deserialize, Serialize};

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// A workspace container on a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, alias = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, alias = "@name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, alias = "@description", skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Project {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projects {
    #[serde(rename = "project", default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,
}

/// A tenant partition on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    #[serde(default, alias = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, alias = "@name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, alias = "@contentUrl", skip_serializing_if = "String::is_empty")]
    pub content_url: String,
    #[serde(default, alias = "@adminMode", skip_serializing_if = "String::is_empty")]
    pub admin_mode: String,
    #[serde(default, alias = "@userQuota", skip_serializing_if = "String::is_empty")]
    pub user_quota: String,
    #[serde(default, alias = "@storageQuota", skip_serializing_if = "is_zero")]
    pub storage_quota: u64,
    #[serde(default, alias = "@state", skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(default, alias = "@statusReason", skip_serializing_if = "String::is_empty")]
    pub status_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<SiteUsage>,
}

impl Site {
    /// A site reference by content URL, as used in sign-in credentials.
    /// The default site has an empty content URL.
    pub fn with_content_url(content_url: &str) -> Self {
        Self {
            content_url: content_url.to_string(),
            ..Self::default()
        }
    }
}

/// Usage statistics returned when a site is queried with
/// `includeUsageStatistics=true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteUsage {
    #[serde(rename = "number-of-users", alias = "@number-of-users", default)]
    pub number_of_users: u64,
    #[serde(alias = "@storage", default)]
    pub storage: u64,
}

/// Site list. JSON keeps the `sites` key, even when empty; XML carries one
/// `<site>` child per entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sites {
    #[serde(default, alias = "site")]
    pub sites: Vec<Site>,
}

/// A published data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    #[serde(default, alias = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, alias = "@name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_credentials: Option<ConnectionCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

/// Connection secret embedded into a published data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCredentials {
    #[serde(default, alias = "@name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, alias = "@password", skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, alias = "@embed")]
    pub embed: bool,
}

/// Sign-in payload, and the credentials echoed back by a successful sign-in.
///
/// `site` selects the site to sign in to; `impersonate` names the user to act
/// on behalf of and is written as the `user` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, alias = "@name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, alias = "@password", skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, alias = "@token", skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,
    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    pub impersonate: Option<User>,
}

impl Credentials {
    /// Name/password credentials for the site with the given content URL.
    pub fn new(name: &str, password: &str, site_content_url: &str) -> Self {
        Self {
            name: name.to_string(),
            password: password.to_string(),
            site: Some(Site::with_content_url(site_content_url)),
            ..Self::default()
        }
    }

    pub fn impersonating(mut self, user_id: &str) -> Self {
        self.impersonate = Some(User {
            id: user_id.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, alias = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectResponse {
    #[serde(default)]
    pub project: Project,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryProjectsResponse {
    #[serde(default)]
    pub projects: Projects,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySitesResponse {
    #[serde(default)]
    pub sites: Sites,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySiteResponse {
    #[serde(default)]
    pub site: Site,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishDatasourceResponse {
    #[serde(default)]
    pub datasource: Datasource,
}
