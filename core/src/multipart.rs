//! `multipart/mixed` bodies for publishing content.
//!
//! Publishing a data source sends two parts separated by the configured
//! boundary: the `request_payload` part carrying the `tsRequest` XML, then
//! the `tableau_datasource` part carrying the raw file. Lines end in CRLF.

use crate::api::CRLF;
use crate::error::ApiError;

/// A data-source file to upload alongside its publish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourceFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl DatasourceFile {
    pub fn new(file_name: &str, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.to_string(),
            contents: contents.into(),
        }
    }
}

/// Value of the `content-type` header for a body built with `boundary`.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/mixed; boundary={boundary}")
}

/// Incremental writer for a `multipart/mixed` body.
#[derive(Debug)]
pub struct MultipartBody<'a> {
    boundary: &'a str,
    buf: Vec<u8>,
}

impl<'a> MultipartBody<'a> {
    pub fn new(boundary: &'a str) -> Self {
        Self {
            boundary,
            buf: Vec::new(),
        }
    }

    /// Append one part with the given disposition and content type.
    pub fn part(mut self, disposition: &str, content_type: &str, data: &[u8]) -> Self {
        let head = format!(
            "--{boundary}{CRLF}Content-Disposition: {disposition}{CRLF}\
             Content-Type: {content_type}{CRLF}{CRLF}",
            boundary = self.boundary,
        );
        self.buf.extend_from_slice(head.as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(CRLF.as_bytes());
        self
    }

    /// Write the closing delimiter and return the body.
    pub fn finish(mut self) -> Vec<u8> {
        let tail = format!("--{}--{CRLF}", self.boundary);
        self.buf.extend_from_slice(tail.as_bytes());
        self.buf
    }
}

/// Assemble the two-part body for a data-source publish.
///
/// The file name is written inside a quoted header value, so a name holding
/// `"`, CR or LF is rejected.
pub fn datasource_body(
    boundary: &str,
    payload: &[u8],
    file: &DatasourceFile,
) -> Result<Vec<u8>, ApiError> {
    if file.file_name.contains(['"', '\r', '\n']) {
        return Err(ApiError::Serialization(format!(
            "file name {:?} cannot be used in a Content-Disposition header",
            file.file_name
        )));
    }
    Ok(MultipartBody::new(boundary)
        .part(r#"name="request_payload""#, "text/xml", payload)
        .part(
            &format!(r#"name="tableau_datasource"; filename="{}""#, file.file_name),
            "application/octet-stream",
            &file.contents,
        )
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_names_boundary() {
        assert_eq!(content_type("xyz"), "multipart/mixed; boundary=xyz");
    }

    #[test]
    fn datasource_body_layout() {
        let file = DatasourceFile::new("sales.tds", b"<datasource/>".to_vec());
        let body = datasource_body("B", b"<tsRequest/>", &file).unwrap();
        let expected = "--B\r\n\
Content-Disposition: name=\"request_payload\"\r\n\
Content-Type: text/xml\r\n\
\r\n\
<tsRequest/>\r\n\
--B\r\n\
Content-Disposition: name=\"tableau_datasource\"; filename=\"sales.tds\"\r\n\
Content-Type: application/octet-stream\r\n\
\r\n\
<datasource/>\r\n\
--B--\r\n";
        assert_eq!(String::from_utf8(body).unwrap(), expected);
    }

    #[test]
    fn binary_contents_are_copied_verbatim() {
        let file = DatasourceFile::new("extract.tdsx", vec![0u8, 159, 146, 150]);
        let body = datasource_body("B", b"", &file).unwrap();
        assert!(body.windows(4).any(|w| w == [0u8, 159, 146, 150]));
    }

    #[test]
    fn file_name_cannot_break_out_of_its_header() {
        for name in ["a\"\r\nContent-Type: evil", "a\"b.tds", "a\rb.tds", "a\nb.tds"] {
            let file = DatasourceFile::new(name, b"x".to_vec());
            let err = datasource_body("B", b"", &file).unwrap_err();
            assert!(matches!(err, ApiError::Serialization(_)), "{name:?}: {err:?}");
        }
    }

    #[test]
    fn empty_body_is_just_the_closing_delimiter() {
        assert_eq!(MultipartBody::new("B").finish(), b"--B--\r\n".to_vec());
    }
}
