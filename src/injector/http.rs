use async_trait::async_trait;
use reqwest::Client;

use crate::context::{Context, Params};
use crate::error::{Result, SqliError};
use crate::injector::Injector;
use crate::trigger::{RegexpTrigger, Response, Trigger};

/// Where the tampered parameter set is carried on the wire. Mirrors the
/// four concrete subclasses of `pysqli.core.injector.HttpInjector`:
/// `GetInjector`, `PostInjector`, `UserAgentInjector`, `CookieInjector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpKind {
    Get,
    Post,
    UserAgent,
    Cookie,
}

/// HTTP transport shared by all four kinds above one `reqwest::Client`.
/// Grounded in `pysqli.core.injector.HttpInjector.process_injection`
/// and the teacher's `web::injection` request-building style.
pub struct HttpInjector {
    context: Context,
    trigger: Box<dyn Trigger>,
    client: Client,
    kind: HttpKind,
}

impl HttpInjector {
    pub fn new(mut context: Context, kind: HttpKind) -> Self {
        if kind == HttpKind::UserAgent {
            context
                .set_params(Params::user_agent())
                .expect("Params::user_agent is always valid");
        }
        let client = Client::builder()
            .build()
            .expect("tls backend is statically configured");
        Self {
            context,
            trigger: Box::new(RegexpTrigger::default_http_error()),
            client,
            kind,
        }
    }

    fn mapping_pairs(params: &Params) -> Result<Vec<(String, String)>> {
        match params {
            Params::Mapping { values, .. } => Ok(values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            Params::Sequence { .. } => Err(SqliError::TransportFailure(
                "HTTP transport requires named (mapping) parameters".to_string(),
            )),
        }
    }

    fn target_value<'a>(params: &'a Params, target: &str) -> &'a str {
        match params {
            Params::Mapping { values, .. } => values
                .get(target)
                .map(|s| s.as_str())
                .unwrap_or_default(),
            Params::Sequence { .. } => "",
        }
    }
}

#[async_trait]
impl Injector for HttpInjector {
    fn context(&self) -> &Context {
        &self.context
    }

    fn trigger(&self) -> &dyn Trigger {
        self.trigger.as_ref()
    }

    fn set_trigger(&mut self, trigger: Box<dyn Trigger>) {
        self.trigger = trigger;
    }

    async fn send(&self, params: &Params) -> Result<Response> {
        let mut builder = match self.kind {
            HttpKind::Get => {
                let pairs = Self::mapping_pairs(params)?;
                self.client.get(self.context.url()).query(&pairs)
            }
            HttpKind::Post => {
                let pairs = Self::mapping_pairs(params)?;
                self.client.post(self.context.url()).form(&pairs)
            }
            HttpKind::UserAgent => self.client.get(self.context.url()),
            HttpKind::Cookie => self.client.get(self.context.url()),
        };

        // Context headers go on first; the kind-specific header (and the
        // context cookie, for non-Cookie kinds) is applied last so it
        // wins over a same-named context header, per "per-request wins".
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(context_headers) = self.context.headers() {
            for (name, value) in context_headers {
                if let (Ok(name), Ok(value)) = (
                    reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                    reqwest::header::HeaderValue::from_str(value),
                ) {
                    headers.insert(name, value);
                }
            }
        }
        if self.kind != HttpKind::Cookie {
            if let Some(cookie) = self.context.cookie() {
                headers.insert(
                    reqwest::header::COOKIE,
                    reqwest::header::HeaderValue::from_str(cookie)
                        .map_err(|e| SqliError::TransportFailure(e.to_string()))?,
                );
            }
        }

        match self.kind {
            HttpKind::UserAgent => {
                let ua = Self::target_value(params, "user-agent");
                headers.insert(
                    reqwest::header::USER_AGENT,
                    reqwest::header::HeaderValue::from_str(ua)
                        .map_err(|e| SqliError::TransportFailure(e.to_string()))?,
                );
            }
            HttpKind::Cookie => {
                let pairs = Self::mapping_pairs(params)?;
                let cookie_header = pairs
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                // The original attaches the assembled cookie string under
                // a `User-Agent` header key, which is a bug, not intent --
                // this sends it as an actual `Cookie` header instead.
                headers.insert(
                    reqwest::header::COOKIE,
                    reqwest::header::HeaderValue::from_str(&cookie_header)
                        .map_err(|e| SqliError::TransportFailure(e.to_string()))?,
                );
            }
            HttpKind::Get | HttpKind::Post => {}
        }

        builder = builder.headers(headers);

        let response = builder
            .send()
            .await
            .map_err(|e| SqliError::TransportFailure(e.to_string()))?;
        let status = response.status().as_u16() as i64;
        let body = response
            .bytes()
            .await
            .map_err(|e| SqliError::TransportFailure(e.to_string()))?;
        Ok(Response::new(status, body.to_vec()))
    }
}
