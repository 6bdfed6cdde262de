use std::collections::HashMap;

/// HTTP request methods.
///
/// Only GET is served. Every other token on the request line is kept so the
/// connection can answer 405 Method Not Allowed instead of failing the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other token, kept verbatim
    Other(String),
}

impl Method {
    /// Parses an HTTP method from a request-line token.
    ///
    /// Matching is case-sensitive, as methods are on the wire.
    ///
    /// # Example
    ///
    /// ```
    /// # use staticd::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::Other("get".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(s) => s,
        }
    }
}

/// A parsed request head.
///
/// The body is never read. Headers do not affect how the request is served;
/// `User-Agent` is logged with the outcome.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The raw request target, still percent-encoded and possibly with a query
    pub target: String,
    /// HTTP version as declared by the client (e.g., "HTTP/1.1")
    pub version: String,
    /// Header fields parsed before the first malformed line
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The client's `User-Agent`, or `-` when absent.
    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or("-")
    }
}
