pub mod cmd;
pub mod http;

use async_trait::async_trait;
use regex::Regex;

use crate::context::{Context, Params};
use crate::error::Result;
use crate::trigger::{Response, Trigger};

/// Result of a single `inject` call: a boolean oracle verdict in blind
/// mode, or a captured (or absent) in-band extraction.
#[derive(Debug, Clone)]
pub enum InjectOutcome {
    Blind(bool),
    Inband(Option<String>),
}

impl InjectOutcome {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            InjectOutcome::Blind(b) => Some(*b),
            InjectOutcome::Inband(_) => None,
        }
    }

    pub fn into_inband(self) -> Option<String> {
        match self {
            InjectOutcome::Inband(s) => s,
            InjectOutcome::Blind(_) => None,
        }
    }
}

/// A transport capable of turning one wrapped SQL payload into an oracle
/// verdict. Mirrors `pysqli.core.injector.AbstractInjector` /
/// `ContextBasedInjector`: every concrete transport only has to supply
/// `send`; parameter tampering and response interpretation are provided
/// once here and reused.
#[async_trait]
pub trait Injector: Send + Sync {
    fn context(&self) -> &Context;
    fn trigger(&self) -> &dyn Trigger;
    fn set_trigger(&mut self, trigger: Box<dyn Trigger>);

    /// Transport-specific hook: perform the actual send given the
    /// tampered parameter set, and return the raw response.
    async fn send(&self, params: &Params) -> Result<Response>;

    /// Tamper the target parameter per the context's smooth policy. All
    /// other parameters pass through unchanged.
    fn process_parameters(&self, sql: &str) -> Params {
        self.context().params().tamper(sql, self.context().is_smooth())
    }

    /// Interpret a raw response as an oracle verdict.
    ///
    /// Blind mode: run the trigger; if it is in `Error` mode, invert the
    /// boolean (an observed error means the tested condition was false).
    /// In-band mode: scan the body for `<tag>(.*)<tag>` and return the
    /// captured group, or `None` if the tag pair is absent.
    fn process_response(&self, response: &Response) -> InjectOutcome {
        if self.context().is_blind() {
            let matched = self.trigger().execute(response);
            let verdict = if self.trigger().is_error() { !matched } else { matched };
            InjectOutcome::Blind(verdict)
        } else {
            let tag = regex::escape(self.context().inband_tag());
            let pattern = format!("{tag}(.*){tag}");
            let re = Regex::new(&pattern).expect("inband tag is a fixed uppercase-only string");
            let body = response.body_str();
            let captured = re.captures(&body).map(|c| c[1].to_string());
            InjectOutcome::Inband(captured)
        }
    }

    async fn inject(&self, sql: &str) -> Result<InjectOutcome> {
        let tampered = self.process_parameters(sql);
        let response = self.send(&tampered).await?;
        Ok(self.process_response(&response))
    }
}
