use indexmap::IndexMap;

/// Version used on every error response, whatever the client declared.
pub const ERROR_VERSION: &str = "HTTP/1.1";

/// HTTP status codes surfaced by the server.
///
/// - `Ok` (200): File served
/// - `BadRequest` (400): Malformed request or rejected path
/// - `Forbidden` (403): Extension not whitelisted
/// - `NotFound` (404): File does not exist
/// - `MethodNotAllowed` (405): Method other than GET
/// - `InternalServerError` (500): I/O failure while reading or serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use staticd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use staticd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// A complete HTTP response ready to be written.
///
/// Headers keep insertion order so the wire layout is stable.
#[derive(Debug)]
pub struct Response {
    /// Version echoed on the status line
    pub version: String,
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers in insertion order
    pub headers: IndexMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/css")
///     .body(b"body {}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    version: String,
    status: StatusCode,
    headers: IndexMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: ERROR_VERSION.to_string(),
            status,
            headers: IndexMap::new(),
            body: Vec::new(),
        }
    }

    /// Sets the version written on the status line.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Adds or replaces a header, keeping its original position on replace.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Content-Length always reflects the body, and every response carries
    /// `Connection: close`.
    pub fn build(mut self) -> Response {
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self.headers
            .insert("Connection".to_string(), "close".to_string());

        Response {
            version: self.version,
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// A 200 response echoing the request's declared version.
    pub fn success(version: &str, content_type: &str, body: Vec<u8>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .version(version)
            .header("Content-Type", content_type)
            .body(body)
            .build()
    }

    /// An error response with a generated HTML body naming the status.
    ///
    /// Always uses HTTP/1.1 on the status line.
    pub fn error(status: StatusCode) -> Self {
        let body = format!(
            "<html><body><h1>{} {}</h1></body></html>",
            status.as_u16(),
            status.reason_phrase()
        );

        ResponseBuilder::new(status)
            .header("Content-Type", "text/html")
            .body(body.into_bytes())
            .build()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }
}
