//! A SQL injection exploitation engine: boolean/blind and in-band string
//! and integer extraction over pluggable HTTP/subprocess transports,
//! parameterized by pluggable SQL dialects.
//!
//! The pieces compose roughly like this:
//!
//! ```text
//! Context  ---->  SqlForge (dialect)  ---->  Dbms (facade)
//!   |                                           ^
//!   v                                           |
//! Injector (transport)  <------------------  AsyncPool + bisect
//! ```

pub mod bisect;
pub mod config;
pub mod context;
pub mod dbms;
pub mod error;
pub mod forge;
pub mod injector;
pub mod pool;
pub mod trigger;
pub mod wrappers;

pub use config::EngineConfig;
pub use context::{Context, ContextBuilder, FieldType, Method, Params};
pub use dbms::{Dbms, COLS_ENUM, COMMENT, DBS_ENUM, FIELDS_ENUM, STR, TABLES_ENUM};
pub use error::{Result, SqliError};
pub use forge::SqlForge;
pub use injector::http::{HttpInjector, HttpKind};
pub use injector::cmd::CmdInjector;
pub use injector::{InjectOutcome, Injector};
pub use trigger::{RegexpTrigger, Response, StatusTrigger, Trigger, TriggerMode};
pub use wrappers::{DatabaseWrapper, FieldWrapper, Record, TableWrapper};

/// Install a `tracing` subscriber reading `RUST_LOG`, falling back to
/// `sqlhammer=info`. Callers embedding this engine are expected to set
/// up their own subscriber; this is a convenience for standalone use and
/// for the test/example code in this workspace.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlhammer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Build a ready-to-use `Dbms` for a named dialect (`"mysqlv5"`,
/// `"mysqlv4"`, `"mssql"`, `"oracle"`) over the given injector, wired up
/// from `config`'s pool/extraction tunables. Mirrors the role of
/// `pysqli.core.dbms.DBMSFactory`, minus the per-plugin `@dbms`/`@allow`
/// class decoration this workspace expresses instead as plain data in the
/// dialect registry.
pub fn connect(
    dialect_name: &str,
    injector: std::sync::Arc<dyn Injector>,
    config: &EngineConfig,
) -> Result<Dbms> {
    let entry = dbms::dialect(dialect_name)?;
    let forge = entry.build_forge(injector.context().clone());
    let mut dbms = Dbms::new(
        forge,
        injector,
        entry.capabilities,
        config.extraction.limit_count_max,
        config.pool.concurrency_limit,
    );
    dbms.set_strict_outbound(config.extraction.strict_outbound);
    dbms.set_fail_fast(config.pool.fail_fast);
    Ok(dbms)
}
