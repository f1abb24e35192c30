use indexmap::IndexMap;
use rand::Rng;

use crate::error::{Result, SqliError};

/// Injection method: whether extraction rides along a UNION SELECT in the
/// normal response body, or is reduced to a boolean oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Inband,
    Blind,
}

/// How the vulnerable parameter is parsed by the target query: a quoted
/// string or a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
}

/// Tagged union over the two parameter-container shapes a vulnerable
/// request can have. Mirrors `pysqli.core.injector.AbstractInjector`'s
/// runtime `DictType`/`ListType` dispatch in `process_parameters`, made
/// explicit instead of inspected at runtime.
#[derive(Debug, Clone)]
pub enum Params {
    Mapping {
        values: IndexMap<String, String>,
        target: String,
    },
    Sequence {
        values: Vec<String>,
        target: usize,
    },
}

impl Params {
    /// Synthetic single-parameter map for the User-Agent injector,
    /// mirroring `UserAgentInjector.__init__`'s
    /// `self.set_parameters({'user-agent':''}, 'user-agent')`.
    pub fn user_agent() -> Params {
        let mut values = IndexMap::new();
        values.insert("user-agent".to_string(), String::new());
        Params::Mapping {
            values,
            target: "user-agent".to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Params::Mapping { values, target } => {
                if !values.contains_key(target) {
                    return Err(SqliError::InvalidTarget(target.clone()));
                }
            }
            Params::Sequence { values, target } => {
                if *target >= values.len() {
                    return Err(SqliError::InvalidTarget(target.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Replace the target parameter's value per the `smooth` policy and
    /// return the tampered parameter set. Every other parameter passes
    /// through unchanged.
    pub fn tamper(&self, sql: &str, smooth: bool) -> Params {
        match self {
            Params::Mapping { values, target } => {
                let mut tampered = values.clone();
                let entry = tampered.get_mut(target).expect("validated at construction");
                if smooth {
                    *entry = entry.replace("SQLHERE", sql);
                } else {
                    *entry = sql.to_string();
                }
                Params::Mapping {
                    values: tampered,
                    target: target.clone(),
                }
            }
            Params::Sequence { values, target } => {
                let mut tampered = values.clone();
                if smooth {
                    tampered[*target] = tampered[*target].replace('*', sql);
                } else {
                    tampered[*target] = sql.to_string();
                }
                Params::Sequence {
                    values: tampered,
                    target: *target,
                }
            }
        }
    }
}

const TAG_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const TAG_LEN: usize = 32;

fn random_union_tag() -> String {
    let mut rng = rand::thread_rng();
    (0..TAG_LEN)
        .map(|_| TAG_ALPHABET[rng.gen_range(0..TAG_ALPHABET.len())] as char)
        .collect()
}

/// Immutable-by-convention description of an injection attack. Fields are
/// private; every mutation goes through an explicit setter, mirroring
/// `pysqli.core.context.Context`'s name-mangled attributes plus
/// accessors.
#[derive(Debug, Clone)]
pub struct Context {
    method: Method,
    field_type: FieldType,
    url: String,
    params: Params,
    comment: String,
    string_delim: char,
    default: String,
    use_ssl: bool,
    headers: Option<IndexMap<String, String>>,
    cookie: Option<String>,
    smooth: bool,
    multithread: bool,
    truncate: bool,
    encode_str: bool,
    union_fields: String,
    union_target: i32,
    union_tag: String,
}

/// Builder for `Context`. The distilled spec describes a single
/// constructor with many optional arguments (Python keyword defaults);
/// Rust has no such thing, so a builder plays that role.
pub struct ContextBuilder {
    method: Method,
    field_type: FieldType,
    url: String,
    params: Option<Params>,
    comment: String,
    string_delim: char,
    default: String,
    use_ssl: bool,
    headers: Option<IndexMap<String, String>>,
    cookie: Option<String>,
    smooth: bool,
    multithread: bool,
    truncate: bool,
    encode_str: bool,
    union_fields: String,
    union_target: i32,
    union_tag: Option<String>,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            method: Method::Inband,
            field_type: FieldType::Str,
            url: String::new(),
            params: None,
            comment: "/*".to_string(),
            string_delim: '\'',
            default: "0".to_string(),
            use_ssl: false,
            headers: None,
            cookie: None,
            smooth: false,
            multithread: true,
            truncate: false,
            encode_str: false,
            union_fields: String::new(),
            union_target: -1,
            union_tag: None,
        }
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn string_delim(mut self, delim: char) -> Self {
        self.string_delim = delim;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    pub fn use_ssl(mut self, enabled: bool) -> Self {
        self.use_ssl = enabled;
        self
    }

    pub fn headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn smooth(mut self, enabled: bool) -> Self {
        self.smooth = enabled;
        self
    }

    pub fn multithread(mut self, enabled: bool) -> Self {
        self.multithread = enabled;
        self
    }

    pub fn truncate(mut self, enabled: bool) -> Self {
        self.truncate = enabled;
        self
    }

    pub fn encode_str(mut self, enabled: bool) -> Self {
        self.encode_str = enabled;
        self
    }

    pub fn union_fields(mut self, fields: impl Into<String>) -> Self {
        self.union_fields = fields.into();
        self
    }

    pub fn union_target(mut self, target: i32) -> Self {
        self.union_target = target;
        self
    }

    pub fn union_tag(mut self, tag: impl Into<String>) -> Self {
        self.union_tag = Some(tag.into());
        self
    }

    pub fn build(self) -> Result<Context> {
        let params = self
            .params
            .ok_or_else(|| SqliError::InvalidTarget("<no params set>".to_string()))?;
        params.validate()?;

        if self.method == Method::Inband {
            if self.union_fields.is_empty() {
                return Err(SqliError::InvalidTarget(
                    "union_fields must be non-empty in inband mode".to_string(),
                ));
            }
            if self.union_target < 0 || self.union_target as usize >= self.union_fields.len() {
                return Err(SqliError::InvalidTarget(
                    "union_target out of bounds for union_fields".to_string(),
                ));
            }
        }

        Ok(Context {
            method: self.method,
            field_type: self.field_type,
            url: self.url,
            params,
            comment: self.comment,
            string_delim: self.string_delim,
            default: self.default,
            use_ssl: self.use_ssl,
            headers: self.headers,
            cookie: self.cookie,
            smooth: self.smooth,
            multithread: self.multithread,
            truncate: self.truncate,
            encode_str: self.encode_str,
            union_fields: self.union_fields,
            union_target: self.union_target,
            union_tag: self.union_tag.unwrap_or_else(random_union_tag),
        })
    }
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn set_field_type(&mut self, field_type: FieldType) {
        self.field_type = field_type;
    }

    pub fn in_string(&self) -> bool {
        self.field_type == FieldType::Str
    }

    pub fn in_int(&self) -> bool {
        self.field_type == FieldType::Int
    }

    pub fn is_blind(&self) -> bool {
        self.method == Method::Blind
    }

    pub fn is_inband(&self) -> bool {
        self.method == Method::Inband
    }

    pub fn use_blind(&mut self) {
        self.method = Method::Blind;
    }

    pub fn use_inband(&mut self) {
        self.method = Method::Inband;
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: Params) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn string_delimiter(&self) -> char {
        self.string_delim
    }

    pub fn set_string_delimiter(&mut self, delim: char) {
        self.string_delim = delim;
    }

    pub fn default_value(&self) -> &str {
        &self.default
    }

    pub fn set_default_value(&mut self, default: impl Into<String>) {
        self.default = default.into();
    }

    pub fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    pub fn enable_ssl(&mut self, enabled: bool) {
        self.use_ssl = enabled;
    }

    pub fn has_headers(&self) -> bool {
        self.headers.is_some()
    }

    pub fn headers(&self) -> Option<&IndexMap<String, String>> {
        self.headers.as_ref()
    }

    pub fn set_headers(&mut self, headers: IndexMap<String, String>) {
        self.headers = Some(headers);
    }

    pub fn set_header(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.headers
            .get_or_insert_with(IndexMap::new)
            .insert(header.into(), value.into());
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn set_cookie(&mut self, cookie: impl Into<String>) {
        self.cookie = Some(cookie.into());
    }

    pub fn is_smooth(&self) -> bool {
        self.smooth
    }

    pub fn set_smooth(&mut self, enabled: bool) {
        self.smooth = enabled;
    }

    pub fn is_multithread(&self) -> bool {
        self.multithread
    }

    pub fn set_multithread(&mut self, enabled: bool) {
        self.multithread = enabled;
    }

    pub fn require_truncate(&self) -> bool {
        self.truncate
    }

    pub fn enable_truncate(&mut self, enabled: bool) {
        self.truncate = enabled;
    }

    pub fn require_string_encoding(&self) -> bool {
        self.encode_str
    }

    pub fn enable_string_encoding(&mut self, enabled: bool) {
        self.encode_str = enabled;
    }

    pub fn inband_fields(&self) -> &str {
        &self.union_fields
    }

    pub fn set_inband_fields(&mut self, fields: impl Into<String>) {
        self.union_fields = fields.into();
    }

    pub fn inband_target(&self) -> i32 {
        self.union_target
    }

    pub fn set_inband_target(&mut self, target: i32) {
        self.union_target = target;
    }

    pub fn inband_tag(&self) -> &str {
        &self.union_tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_ctx(target: &str) -> Result<Context> {
        let mut values = IndexMap::new();
        values.insert("id".to_string(), "1".to_string());
        values.insert("name".to_string(), "x".to_string());
        Context::builder()
            .params(Params::Mapping {
                values,
                target: target.to_string(),
            })
            .build()
    }

    #[test]
    fn rejects_target_not_in_params() {
        assert!(mapping_ctx("missing").is_err());
    }

    #[test]
    fn accepts_valid_target() {
        assert!(mapping_ctx("id").is_ok());
    }

    #[test]
    fn inband_requires_union_fields() {
        let mut values = IndexMap::new();
        values.insert("id".to_string(), "1".to_string());
        let result = Context::builder()
            .method(Method::Inband)
            .params(Params::Mapping {
                values,
                target: "id".to_string(),
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn tamper_mapping_replaces_only_target() {
        let ctx = mapping_ctx("id").unwrap();
        let tampered = ctx.params().tamper("PAYLOAD", false);
        match tampered {
            Params::Mapping { values, .. } => {
                assert_eq!(values["id"], "PAYLOAD");
                assert_eq!(values["name"], "x");
            }
            _ => panic!("expected mapping"),
        }
    }

    #[test]
    fn tamper_smooth_substitutes_placeholder() {
        let mut values = IndexMap::new();
        values.insert("id".to_string(), "before SQLHERE after".to_string());
        let ctx = Context::builder()
            .params(Params::Mapping {
                values,
                target: "id".to_string(),
            })
            .build()
            .unwrap();
        let tampered = ctx.params().tamper("1=1", true);
        match tampered {
            Params::Mapping { values, .. } => {
                assert_eq!(values["id"], "before 1=1 after");
            }
            _ => panic!("expected mapping"),
        }
    }

    #[test]
    fn union_tag_is_32_uppercase_chars() {
        let ctx = mapping_ctx("id").unwrap();
        assert_eq!(ctx.inband_tag().len(), 32);
        assert!(ctx.inband_tag().chars().all(|c| c.is_ascii_uppercase()));
    }
}
