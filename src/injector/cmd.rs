use async_trait::async_trait;
use tokio::process::Command;

use crate::context::{Context, Params};
use crate::error::{Result, SqliError};
use crate::injector::Injector;
use crate::trigger::{Response, StatusTrigger, Trigger, TriggerMode};

/// Local-process transport, grounded in `pysqli.core.injector.CmdInjector`.
/// The tampered parameter set is the argv of a local command (e.g. a CLI
/// client for the target database); exit status 0 is success by default.
pub struct CmdInjector {
    context: Context,
    trigger: Box<dyn Trigger>,
    program: String,
}

impl CmdInjector {
    /// Forces `multithread` off, matching the original's
    /// `CmdInjector.__init__` -- concurrent child processes sharing one
    /// command line is not a safe default.
    pub fn new(mut context: Context, program: impl Into<String>) -> Self {
        context.set_multithread(false);
        Self {
            context,
            trigger: Box::new(StatusTrigger::new(0, TriggerMode::Success)),
            program: program.into(),
        }
    }
}

#[async_trait]
impl Injector for CmdInjector {
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
        let argv = match params {
            Params::Sequence { values, .. } => values.clone(),
            Params::Mapping { values, .. } => values.values().cloned().collect(),
        };

        let output = Command::new(&self.program)
            .args(&argv)
            .output()
            .await
            .map_err(|e| SqliError::TransportFailure(e.to_string()))?;

        let status = output.status.code().unwrap_or(-1) as i64;
        Ok(Response::new(status, output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FieldType, Method};
    use indexmap::IndexMap;

    fn ctx() -> Context {
        let mut values = IndexMap::new();
        values.insert("id".to_string(), "1".to_string());
        Context::builder()
            .method(Method::Blind)
            .field_type(FieldType::Int)
            .multithread(true)
            .params(Params::Mapping {
                values,
                target: "id".to_string(),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn constructing_forces_multithread_off() {
        let injector = CmdInjector::new(ctx(), "true");
        assert!(!injector.context().is_multithread());
    }

    #[tokio::test]
    async fn exit_zero_is_success_by_default() {
        let injector = CmdInjector::new(ctx(), "true");
        let outcome = injector.inject("1=1").await.unwrap();
        assert_eq!(outcome.as_bool(), Some(true));
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure_by_default() {
        let injector = CmdInjector::new(ctx(), "false");
        let outcome = injector.inject("1=1").await.unwrap();
        assert_eq!(outcome.as_bool(), Some(false));
    }
}
