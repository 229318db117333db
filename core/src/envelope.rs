//! XML marshaling for request envelopes.
//!
//! # Design
//! Every request sent to the server is a payload record wrapped in a fixed
//! `<tsRequest>` element, indented by three spaces. Records describe their
//! own XML shape through `XmlRecord`: a fixed element name, the attributes
//! to write, and any child records. `encode_envelope` and `encode_record`
//! drive a quick-xml `Writer` over that description, so encoding is a pure
//! function of the value and repeated calls produce identical bytes.
//!
//! Decoding goes the other way through quick-xml's serde support; the root
//! element name (`tsResponse`) is not checked.

use std::borrow::Cow;
use std::fmt::Display;
use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorResponse, Terror};
use crate::types::{
    ConnectionCredentials, Credentials, Datasource, Project, Projects, QuerySiteResponse,
    QuerySitesResponse, Site, SiteUsage, Sites, User,
};

/// Outer element of every request body.
pub const REQUEST_ENVELOPE: &str = "tsRequest";
/// Outer element of every response body.
pub const RESPONSE_ENVELOPE: &str = "tsResponse";

const INDENT_WIDTH: usize = 3;

/// Attribute list under construction; zero-valued entries are skipped.
#[derive(Default)]
pub struct Attributes<'a>(Vec<(&'static str, Cow<'a, str>)>);

impl<'a> Attributes<'a> {
    /// Add `name` unless `value` is empty.
    pub fn text(mut self, name: &'static str, value: &'a str) -> Self {
        if !value.is_empty() {
            self.0.push((name, Cow::Borrowed(value)));
        }
        self
    }

    /// Add `name` unless `value` is zero.
    pub fn number(mut self, name: &'static str, value: u64) -> Self {
        if value != 0 {
            self.0.push((name, Cow::Owned(value.to_string())));
        }
        self
    }

    /// Add `name` regardless of its value.
    pub fn always(mut self, name: &'static str, value: impl ToString) -> Self {
        self.0.push((name, Cow::Owned(value.to_string())));
        self
    }
}

/// A record with a fixed XML element shape.
pub trait XmlRecord {
    /// Element name, used both standalone and when nested.
    const ELEMENT: &'static str;

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default()
    }

    fn has_children(&self) -> bool {
        false
    }

    fn write_children<W: Write>(&self, _writer: &mut Writer<W>) -> Result<(), ApiError> {
        Ok(())
    }
}

fn encode_error(err: impl Display) -> ApiError {
    ApiError::Serialization(err.to_string())
}

fn write_record<W: Write, R: XmlRecord>(
    writer: &mut Writer<W>,
    record: &R,
) -> Result<(), ApiError> {
    let mut start = BytesStart::new(R::ELEMENT);
    for (name, value) in record.attributes().0 {
        start.push_attribute((name, value.as_ref()));
    }
    if record.has_children() {
        writer.write_event(Event::Start(start)).map_err(encode_error)?;
        record.write_children(writer)?;
        writer
            .write_event(Event::End(BytesEnd::new(R::ELEMENT)))
            .map_err(encode_error)?;
    } else {
        writer.write_event(Event::Empty(start)).map_err(encode_error)?;
    }
    Ok(())
}

fn write_optional<W: Write, R: XmlRecord>(
    writer: &mut Writer<W>,
    record: Option<&R>,
) -> Result<(), ApiError> {
    match record {
        Some(record) => write_record(writer, record),
        None => Ok(()),
    }
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), ApiError> {
    if text.is_empty() {
        return Ok(());
    }
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(encode_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(encode_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_error)?;
    Ok(())
}

fn indented_writer() -> Writer<Vec<u8>> {
    Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH)
}

/// Encode `record` on its own, with its element as the document root.
pub fn encode_record<R: XmlRecord>(record: &R) -> Result<Vec<u8>, ApiError> {
    let mut writer = indented_writer();
    write_record(&mut writer, record)?;
    Ok(writer.into_inner())
}

/// Encode `payload` wrapped in `<tsRequest>`.
pub fn encode_envelope<R: XmlRecord>(payload: &R) -> Result<Vec<u8>, ApiError> {
    let mut writer = indented_writer();
    writer
        .write_event(Event::Start(BytesStart::new(REQUEST_ENVELOPE)))
        .map_err(encode_error)?;
    write_record(&mut writer, payload)?;
    writer
        .write_event(Event::End(BytesEnd::new(REQUEST_ENVELOPE)))
        .map_err(encode_error)?;
    Ok(writer.into_inner())
}

/// Decode an XML response body into `T`.
pub fn decode_xml<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    quick_xml::de::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

impl XmlRecord for Project {
    const ELEMENT: &'static str = "project";

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default()
            .text("id", &self.id)
            .text("name", &self.name)
            .text("description", &self.description)
    }
}

impl XmlRecord for Projects {
    const ELEMENT: &'static str = "projects";

    fn has_children(&self) -> bool {
        !self.projects.is_empty()
    }

    fn write_children<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), ApiError> {
        self.projects
            .iter()
            .try_for_each(|project| write_record(writer, project))
    }
}

impl XmlRecord for SiteUsage {
    const ELEMENT: &'static str = "usage";

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default()
            .always("number-of-users", self.number_of_users)
            .always("storage", self.storage)
    }
}

impl XmlRecord for Site {
    const ELEMENT: &'static str = "site";

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default()
            .text("id", &self.id)
            .text("name", &self.name)
            .text("contentUrl", &self.content_url)
            .text("adminMode", &self.admin_mode)
            .text("userQuota", &self.user_quota)
            .number("storageQuota", self.storage_quota)
            .text("state", &self.state)
            .text("statusReason", &self.status_reason)
    }

    fn has_children(&self) -> bool {
        self.usage.is_some()
    }

    fn write_children<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), ApiError> {
        write_optional(writer, self.usage.as_ref())
    }
}

impl XmlRecord for Sites {
    const ELEMENT: &'static str = "sites";

    fn has_children(&self) -> bool {
        !self.sites.is_empty()
    }

    fn write_children<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), ApiError> {
        self.sites.iter().try_for_each(|site| write_record(writer, site))
    }
}

impl XmlRecord for ConnectionCredentials {
    const ELEMENT: &'static str = "connectionCredentials";

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default()
            .text("name", &self.name)
            .text("password", &self.password)
            .always("embed", self.embed)
    }
}

impl XmlRecord for Datasource {
    const ELEMENT: &'static str = "datasource";

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default()
            .text("id", &self.id)
            .text("name", &self.name)
    }

    fn has_children(&self) -> bool {
        self.connection_credentials.is_some() || self.project.is_some()
    }

    fn write_children<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), ApiError> {
        write_optional(writer, self.connection_credentials.as_ref())?;
        write_optional(writer, self.project.as_ref())
    }
}

impl XmlRecord for User {
    const ELEMENT: &'static str = "user";

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default().text("id", &self.id)
    }
}

impl XmlRecord for Credentials {
    const ELEMENT: &'static str = "credentials";

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default()
            .text("name", &self.name)
            .text("password", &self.password)
            .text("token", &self.token)
    }

    fn has_children(&self) -> bool {
        self.site.is_some() || self.impersonate.is_some()
    }

    fn write_children<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), ApiError> {
        write_optional(writer, self.site.as_ref())?;
        write_optional(writer, self.impersonate.as_ref())
    }
}

impl XmlRecord for Terror {
    const ELEMENT: &'static str = "error";

    fn attributes(&self) -> Attributes<'_> {
        Attributes::default().text("code", &self.code)
    }

    fn has_children(&self) -> bool {
        !self.summary.is_empty() || !self.detail.is_empty()
    }

    fn write_children<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), ApiError> {
        write_text_element(writer, "summary", &self.summary)?;
        write_text_element(writer, "detail", &self.detail)
    }
}

impl ErrorResponse {
    /// Encode as a `tsResponse` body, the way the server reports failures.
    pub fn xml(&self) -> Result<Vec<u8>, ApiError> {
        let mut writer = indented_writer();
        writer
            .write_event(Event::Start(BytesStart::new(RESPONSE_ENVELOPE)))
            .map_err(encode_error)?;
        write_record(&mut writer, &self.error)?;
        writer
            .write_event(Event::End(BytesEnd::new(RESPONSE_ENVELOPE)))
            .map_err(encode_error)?;
        Ok(writer.into_inner())
    }
}

impl Project {
    pub fn xml(&self) -> Result<Vec<u8>, ApiError> {
        encode_record(self)
    }
}

impl Datasource {
    pub fn xml(&self) -> Result<Vec<u8>, ApiError> {
        encode_record(self)
    }
}

impl QuerySitesResponse {
    pub fn xml(&self) -> Result<Vec<u8>, ApiError> {
        encode_envelope(&self.sites)
    }
}

impl QuerySiteResponse {
    pub fn xml(&self) -> Result<Vec<u8>, ApiError> {
        encode_envelope(&self.site)
    }
}

/// Body of `POST /sites/{site-id}/projects`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub project: Project,
}

impl CreateProjectRequest {
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    pub fn xml(&self) -> Result<Vec<u8>, ApiError> {
        encode_envelope(&self.project)
    }
}

/// The `request_payload` part of a data-source publish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceCreateRequest {
    #[serde(default)]
    pub datasource: Datasource,
}

impl DatasourceCreateRequest {
    pub fn new(datasource: Datasource) -> Self {
        Self { datasource }
    }

    pub fn xml(&self) -> Result<Vec<u8>, ApiError> {
        encode_envelope(&self.datasource)
    }
}

/// Body of `POST /auth/signin`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub credentials: Credentials,
}

impl SigninRequest {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn xml(&self) -> Result<Vec<u8>, ApiError> {
        encode_envelope(&self.credentials)
    }
}
