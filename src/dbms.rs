use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bisect::check_outbound;
use crate::context::Context;
use crate::error::{Result, SqliError};
use crate::forge::mssql::MssqlForge;
use crate::forge::mysql::MysqlForge;
use crate::forge::mysql4::Mysql4Forge;
use crate::forge::oracle::OracleForge;
use crate::forge::SqlForge;
use crate::injector::{InjectOutcome, Injector};
use crate::pool::AsyncPool;

pub const DBS_ENUM: u8 = 0x01;
pub const TABLES_ENUM: u8 = 0x02;
pub const COLS_ENUM: u8 = 0x04;
pub const FIELDS_ENUM: u8 = 0x08;
pub const STR: u8 = 0x10;
pub const COMMENT: u8 = 0x20;

pub const FULL_ENUM_CAPS: u8 = DBS_ENUM | TABLES_ENUM | COLS_ENUM | FIELDS_ENUM | COMMENT | STR;

/// One dialect entry in the registry: a name, a human description, its
/// declared capability bitset, and a constructor closure. Mirrors
/// `pysqli.core.dbms.dbms`/`allow`, which decorate a `DBMS` subclass with
/// a name/description and a capability mask at class-definition time.
pub struct DialectEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: u8,
    build: fn(Context) -> Arc<dyn SqlForge>,
}

impl DialectEntry {
    pub fn build_forge(&self, context: Context) -> Arc<dyn SqlForge> {
        (self.build)(context)
    }
}

/// Static registry of known dialects. Real deployments would extend this
/// with a `register` call; fixed here since this pack carries exactly the
/// four dialects the original ships (`pysqli.dbms.*`).
pub fn registry() -> Vec<DialectEntry> {
    vec![
        DialectEntry {
            name: "mysqlv5",
            description: "MySQL version 5",
            capabilities: FULL_ENUM_CAPS,
            build: |ctx| Arc::new(MysqlForge::new(ctx)),
        },
        DialectEntry {
            name: "mysqlv4",
            description: "MySQL version 4",
            capabilities: COMMENT | STR,
            build: |ctx| Arc::new(Mysql4Forge::new(ctx)),
        },
        DialectEntry {
            name: "mssql",
            description: "Microsoft SQL Server",
            capabilities: FULL_ENUM_CAPS,
            build: |ctx| Arc::new(MssqlForge::new(ctx)),
        },
        DialectEntry {
            name: "oracle",
            description: "Oracle",
            capabilities: FULL_ENUM_CAPS,
            build: |ctx| Arc::new(OracleForge::new(ctx)),
        },
    ]
}

pub fn dialect(name: &str) -> Result<DialectEntry> {
    registry()
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| SqliError::Unavailable)
}

async fn oracle_probe(
    forge: &dyn SqlForge,
    injector: &dyn Injector,
    cdt_template: &str,
    mid: i64,
) -> Result<bool> {
    let cdt = forge.forge_cdt(cdt_template, mid);
    let sql = forge.wrap_bisec(&cdt)?;
    tracing::debug!(mid, sql = %sql, "dispatching oracle probe");
    let verdict = match injector.inject(&sql).await? {
        InjectOutcome::Blind(b) => Ok(b),
        InjectOutcome::Inband(_) => Err(SqliError::TransportFailure(
            "oracle probe expected a blind response".to_string(),
        )),
    }?;
    tracing::debug!(mid, verdict, "oracle probe resolved");
    Ok(verdict)
}

/// Thin orchestration layer over a `SqlForge` dialect, an `Injector`
/// transport, and a bounded-concurrency `AsyncPool`. Grounded in
/// `pysqli.core.dbms.DBMS`.
pub struct Dbms {
    forge: Arc<dyn SqlForge>,
    injector: Arc<dyn Injector>,
    capabilities: u8,
    limit_count_max: i64,
    pool_limit: usize,
    strict_outbound: bool,
    fail_fast: bool,
    current_db: Mutex<Option<String>>,
}

impl Dbms {
    pub fn new(
        forge: Arc<dyn SqlForge>,
        injector: Arc<dyn Injector>,
        capabilities: u8,
        limit_count_max: i64,
        pool_limit: usize,
    ) -> Self {
        Self {
            forge,
            injector,
            capabilities,
            limit_count_max,
            pool_limit,
            strict_outbound: false,
            fail_fast: false,
            current_db: Mutex::new(None),
        }
    }

    /// Open Question (2): the original compares `size == limit_count_max
    /// - 1`; this switches the outbound check to `>=` instead.
    pub fn set_strict_outbound(&mut self, enabled: bool) {
        self.strict_outbound = enabled;
    }

    /// Open Question (3): every `AsyncPool` this façade spins up inherits
    /// this flag, aborting a batch on the first worker failure instead of
    /// degrading that slot to a sentinel.
    pub fn set_fail_fast(&mut self, enabled: bool) {
        self.fail_fast = enabled;
    }

    pub fn is_strict_outbound(&self) -> bool {
        self.strict_outbound
    }

    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn has_cap(&self, cap: u8) -> bool {
        (self.capabilities & cap) == cap
    }

    pub fn forge(&self) -> &dyn SqlForge {
        self.forge.as_ref()
    }

    /// Every `AsyncPool` this façade spins up shares the same `fail_fast`
    /// policy configured on the façade.
    fn new_pool(&self, limit: usize) -> AsyncPool {
        let mut pool = AsyncPool::new(limit);
        pool.set_fail_fast(self.fail_fast);
        pool
    }

    async fn get_blind_int(&self, sql: &str) -> Result<i64> {
        let mut pool = self.new_pool(self.pool_limit);
        let multithread = self.injector.context().is_multithread();
        let template = sql.to_string();

        if multithread {
            let forge = self.forge.clone();
            let injector = self.injector.clone();
            pool.add_bisec_task(0, self.limit_count_max, move |mid_l, mid, mid_r| {
                let forge = forge.clone();
                let injector = injector.clone();
                let template = template.clone();
                async move {
                    let a_l = oracle_probe(forge.as_ref(), injector.as_ref(), &template, mid_l).await?;
                    let a = oracle_probe(forge.as_ref(), injector.as_ref(), &template, mid).await?;
                    let a_r = oracle_probe(forge.as_ref(), injector.as_ref(), &template, mid_r).await?;
                    Ok((a_l, a, a_r))
                }
            });
        } else {
            let forge = self.forge.clone();
            let injector = self.injector.clone();
            pool.add_classic_bisec_task(0, self.limit_count_max, move |mid| {
                let forge = forge.clone();
                let injector = injector.clone();
                let template = template.clone();
                async move { oracle_probe(forge.as_ref(), injector.as_ref(), &template, mid).await }
            });
        }

        let result = pool.solve_tasks().await?;
        Ok(result.values()[0].unwrap_or(0))
    }

    async fn get_blind_str(&self, sql: &str) -> Result<String> {
        let len_sql = self.forge.string_len(sql);
        let size = self.get_blind_int(&len_sql).await?;
        check_outbound(size, self.limit_count_max, self.strict_outbound)?;

        let multithread = self.injector.context().is_multithread();
        if multithread {
            let mut pool = self.new_pool(self.pool_limit);
            for p in 0..size {
                let forge = self.forge.clone();
                let injector = self.injector.clone();
                let char_expr = self.forge.ascii(&self.forge.get_char(sql, (p + 1) as u32));
                pool.add_bisec_task(0, 255, move |mid_l, mid, mid_r| {
                    let forge = forge.clone();
                    let injector = injector.clone();
                    let char_expr = char_expr.clone();
                    async move {
                        let a_l = oracle_probe(forge.as_ref(), injector.as_ref(), &char_expr, mid_l).await?;
                        let a = oracle_probe(forge.as_ref(), injector.as_ref(), &char_expr, mid).await?;
                        let a_r = oracle_probe(forge.as_ref(), injector.as_ref(), &char_expr, mid_r).await?;
                        Ok((a_l, a, a_r))
                    }
                });
            }
            let result = pool.solve_tasks().await?;
            Ok(result.get_str_result())
        } else {
            let mut out = String::new();
            for p in 0..size {
                let mut pool = self.new_pool(1);
                let forge = self.forge.clone();
                let injector = self.injector.clone();
                let char_expr = self.forge.ascii(&self.forge.get_char(sql, (p + 1) as u32));
                pool.add_classic_bisec_task(0, 255, move |mid| {
                    let forge = forge.clone();
                    let injector = injector.clone();
                    let char_expr = char_expr.clone();
                    async move { oracle_probe(forge.as_ref(), injector.as_ref(), &char_expr, mid).await }
                });
                let r = pool.solve_tasks().await?;
                out.push_str(&r.get_str_result());
            }
            Ok(out)
        }
    }

    async fn get_inband_str(&self, sql: &str) -> Result<Option<String>> {
        let wrapped = self.forge.wrap_sql(&self.forge.forge_second_query(sql));
        match self.injector.inject(&wrapped).await? {
            InjectOutcome::Inband(captured) => Ok(captured),
            InjectOutcome::Blind(_) => Err(SqliError::TransportFailure(
                "in-band extraction expected an in-band response".to_string(),
            )),
        }
    }

    async fn get_inband_int(&self, sql: &str) -> Result<i64> {
        let captured = self.get_inband_str(sql).await?.unwrap_or_default();
        captured
            .trim()
            .parse()
            .map_err(|_| SqliError::TransportFailure(format!("non-numeric in-band capture: {captured:?}")))
    }

    pub async fn get_int(&self, sql: &str) -> Result<i64> {
        if self.injector.context().is_blind() {
            self.get_blind_int(sql).await
        } else {
            self.get_inband_int(sql).await
        }
    }

    pub async fn get_str(&self, sql: &str) -> Result<String> {
        if self.injector.context().is_blind() {
            self.get_blind_str(sql).await
        } else {
            Ok(self.get_inband_str(sql).await?.unwrap_or_default())
        }
    }

    pub async fn version(&self) -> Result<String> {
        self.get_str(&self.forge.get_version()?).await
    }

    pub async fn user(&self) -> Result<String> {
        self.get_str(&self.forge.get_user()).await
    }

    /// Resolve (and cache) the current database name. Mirrors
    /// `DBMS.database(db=None)`: when `name` is supplied it is accepted
    /// as-is, skipping the oracle round-trip; otherwise it is queried
    /// from (and cached against) the target.
    pub async fn database(&self, name: Option<&str>) -> Result<String> {
        if let Some(name) = name {
            let name = name.to_string();
            *self.current_db.lock().await = Some(name.clone());
            return Ok(name);
        }
        let name = self.get_str(&self.forge.get_current_database()).await?;
        *self.current_db.lock().await = Some(name.clone());
        Ok(name)
    }

    async fn resolve_db(&self, db: Option<&str>) -> Result<String> {
        if let Some(db) = db {
            return Ok(db.to_string());
        }
        if let Some(cached) = self.current_db.lock().await.clone() {
            return Ok(cached);
        }
        self.database(None).await
    }

    pub async fn get_nb_databases(&self) -> Result<i64> {
        self.get_int(&self.forge.get_nb_databases()?).await
    }

    pub async fn get_database_name(&self, id: u32) -> Result<String> {
        self.get_str(&self.forge.get_database_name(id)?).await
    }

    pub async fn databases(&self) -> Result<Vec<String>> {
        if !self.has_cap(DBS_ENUM) {
            return Err(SqliError::Unavailable);
        }
        tracing::info!("enumerating databases");
        let n = self.get_nb_databases().await?;
        let mut names = Vec::with_capacity(n as usize);
        for i in 0..n as u32 {
            names.push(self.get_database_name(i).await?);
        }
        Ok(names)
    }

    pub async fn get_nb_tables(&self, db: Option<&str>) -> Result<i64> {
        let db = self.resolve_db(db).await?;
        self.get_int(&self.forge.get_nb_tables(&db)?).await
    }

    pub async fn get_table_name(&self, id: u32, db: &str) -> Result<String> {
        self.get_str(&self.forge.get_table_name(id, db)?).await
    }

    pub async fn tables(&self, db: Option<&str>) -> Result<Vec<String>> {
        if !self.has_cap(TABLES_ENUM) {
            return Err(SqliError::Unavailable);
        }
        let db = self.resolve_db(db).await?;
        tracing::info!(db = %db, "enumerating tables");
        let n = self.get_nb_tables(Some(&db)).await?;
        let mut names = Vec::with_capacity(n as usize);
        for i in 0..n as u32 {
            names.push(self.get_table_name(i, &db).await?);
        }
        Ok(names)
    }

    pub async fn get_nb_fields(&self, table: &str, db: &str) -> Result<i64> {
        self.get_int(&self.forge.get_nb_fields(table, db)?).await
    }

    pub async fn get_field_name(&self, table: &str, id: u32, db: &str) -> Result<String> {
        self.get_str(&self.forge.get_field_name(table, id, db)?).await
    }

    pub async fn fields(&self, table: &str, db: Option<&str>) -> Result<Vec<String>> {
        if !self.has_cap(FIELDS_ENUM) {
            return Err(SqliError::Unavailable);
        }
        let db = self.resolve_db(db).await?;
        tracing::info!(db = %db, table, "enumerating fields");
        let n = self.get_nb_fields(table, &db).await?;
        let mut names = Vec::with_capacity(n as usize);
        for i in 0..n as u32 {
            names.push(self.get_field_name(table, i, &db).await?);
        }
        Ok(names)
    }

    pub async fn count_table_records(&self, table: &str, db: Option<&str>) -> Result<i64> {
        let db = self.resolve_db(db).await?;
        let records = self.forge.select_all(table, &db);
        self.get_int(&self.forge.count(&records)).await
    }

    pub async fn get_record_field_value(
        &self,
        field: &str,
        table: &str,
        pos: u32,
        db: Option<&str>,
    ) -> Result<String> {
        let db = self.resolve_db(db).await?;
        self.get_str(&self.forge.get_table_field_record(field, table, &db, pos))
            .await
    }
}
