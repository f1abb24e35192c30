use regex::RegexSet;

/// A single oracle response: a status code (`-1` when not applicable, e.g.
/// a custom transport that has no status concept) and a raw body.
/// Mirrors `pysqli.core.injector.Response`.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: i64,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: i64, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// An HTTP-flavored response, additionally exposing header lookup the way
/// `pysqli.core.injector.HttpResponse` wraps `httplib`'s response object.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub response: Response,
    headers: reqwest::header::HeaderMap,
}

impl HttpResponse {
    pub fn new(status: i64, body: impl Into<Vec<u8>>, headers: reqwest::header::HeaderMap) -> Self {
        Self {
            response: Response::new(status, body),
            headers,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn as_response(&self) -> &Response {
        &self.response
    }
}

/// Interpretation mode for a trigger's raw boolean match. `Error` and
/// `Success` invert differently during blind `process_response`; `Unknown`
/// is reserved for custom triggers that do their own interpretation
/// upstream and pass the raw match through unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    Error,
    Success,
    Unknown,
}

/// Classifies a `Response` as a boolean oracle signal. Never fails: a
/// malformed or unexpected response still produces an unambiguous true
/// or false, per the engine's error-handling contract (§7).
pub trait Trigger: Send + Sync {
    fn mode(&self) -> TriggerMode;
    fn execute(&self, response: &Response) -> bool;

    fn is_error(&self) -> bool {
        self.mode() == TriggerMode::Error
    }
}

/// Matches a response by exact status code equality.
pub struct StatusTrigger {
    expected_status: i64,
    mode: TriggerMode,
}

impl StatusTrigger {
    pub fn new(expected_status: i64, mode: TriggerMode) -> Self {
        Self {
            expected_status,
            mode,
        }
    }
}

impl Trigger for StatusTrigger {
    fn mode(&self) -> TriggerMode {
        self.mode
    }

    fn execute(&self, response: &Response) -> bool {
        response.status == self.expected_status
    }
}

/// Case-insensitive, multiline regexp match over the response body.
/// Matches if *any* of the configured patterns is found.
pub struct RegexpTrigger {
    patterns: RegexSet,
    mode: TriggerMode,
}

impl RegexpTrigger {
    pub fn new(patterns: &[&str], mode: TriggerMode) -> Self {
        let prefixed: Vec<String> = patterns.iter().map(|p| format!("(?im){}", p)).collect();
        let patterns = RegexSet::new(prefixed).expect("invalid regexp trigger pattern");
        Self { patterns, mode }
    }

    /// Default HTTP error trigger, grounded in
    /// `pysqli.core.injector.HttpInjector.__init__`'s built-in
    /// `RegexpTrigger(['(error|unknown|illegal|warning|denied|subquery)'], mode=MODE_ERROR)`.
    pub fn default_http_error() -> Self {
        Self::new(
            &["(error|unknown|illegal|warning|denied|subquery)"],
            TriggerMode::Error,
        )
    }
}

impl Trigger for RegexpTrigger {
    fn mode(&self) -> TriggerMode {
        self.mode
    }

    fn execute(&self, response: &Response) -> bool {
        self.patterns.is_match(&response.body_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_trigger_matches_exact_code() {
        let trigger = StatusTrigger::new(0, TriggerMode::Success);
        assert!(trigger.execute(&Response::new(0, "ok")));
        assert!(!trigger.execute(&Response::new(1, "ok")));
    }

    #[test]
    fn regexp_trigger_is_case_insensitive_and_multiline() {
        let trigger = RegexpTrigger::default_http_error();
        assert!(trigger.execute(&Response::new(200, "SQL SYNTAX ERROR\nnear line 3")));
        assert!(trigger.execute(&Response::new(200, "Access Denied")));
        assert!(!trigger.execute(&Response::new(200, "all good")));
    }

    #[test]
    fn trigger_mode_roundtrip() {
        assert!(StatusTrigger::new(0, TriggerMode::Error).is_error());
        assert!(!StatusTrigger::new(0, TriggerMode::Success).is_error());
    }
}
