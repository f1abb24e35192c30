use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::dbms::Dbms;
use crate::error::{Result, SqliError};

/// One resolved field name, scoped to a table and database. Mirrors
/// `pysqli.core.wrappers.FieldWrapper`, which exists mainly so the field
/// name prints and compares like a plain string while still carrying its
/// owning table/database for later lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWrapper {
    pub table: String,
    pub db: String,
    pub field: String,
}

impl std::fmt::Display for FieldWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field)
    }
}

/// A resolved database row, keyed by field name.
pub type Record = HashMap<String, String>;

/// Automates reading and describing one table's structure on top of the
/// `Dbms` façade. Grounded in `pysqli.core.wrappers.TableWrapper`; the
/// field list is cached lazily (`once_cell`-style) the first time it's
/// needed and can be invalidated with `refresh`.
pub struct TableWrapper {
    dbms: Arc<Dbms>,
    pub table: String,
    pub db: String,
    fields: OnceCell<Vec<String>>,
}

impl TableWrapper {
    pub fn new(dbms: Arc<Dbms>, table: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            dbms,
            table: table.into(),
            db: db.into(),
            fields: OnceCell::new(),
        }
    }

    /// Fields for this table, fetched once and cached thereafter. A
    /// benign race under concurrent first access fetches twice; only the
    /// first result is kept, which is fine since both fetches agree.
    pub async fn fields(&self) -> Result<&[String]> {
        if self.fields.get().is_none() {
            let fetched = self.dbms.fields(&self.table, Some(&self.db)).await?;
            let _ = self.fields.set(fetched);
        }
        Ok(self.fields.get().expect("just initialized above").as_slice())
    }

    /// Force the next `fields()` call to re-fetch from the target.
    pub fn refresh(&mut self) {
        self.fields = OnceCell::new();
    }

    pub async fn describe(&self) -> Result<String> {
        let fields = self.fields().await?;
        let mut out = format!("Table {}\n", self.table);
        for field in fields {
            out.push_str(&format!(" -> {field}\n"));
        }
        Ok(out)
    }

    pub async fn count(&self) -> Result<i64> {
        self.dbms.count_table_records(&self.table, Some(&self.db)).await
    }

    /// Select `num` rows starting at `pos`. If `fields` is omitted, uses
    /// the cached field list for this table.
    pub async fn select(&self, pos: u32, num: u32, fields: Option<&[String]>) -> Result<Vec<Record>> {
        let field_names: Vec<String> = match fields {
            Some(f) => f.to_vec(),
            None => self.fields().await?.to_vec(),
        };
        let mut records = Vec::with_capacity(num as usize);
        for i in pos..pos + num {
            let mut record = Record::new();
            for field in &field_names {
                let value = self
                    .dbms
                    .get_record_field_value(field, &self.table, i, Some(&self.db))
                    .await?;
                record.insert(field.clone(), value);
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Dump every row of the table.
    pub async fn all(&self, fields: Option<&[String]>) -> Result<Vec<Record>> {
        let count = self.count().await?;
        self.select(0, count as u32, fields).await
    }

    /// Build a `FieldWrapper` for `key`. When `strict` is set, `key` must
    /// name a field actually present on this table (per the cached field
    /// list), failing with `SqliError::UnknownField` otherwise.
    pub async fn field(&self, key: impl Into<String>, strict: bool) -> Result<FieldWrapper> {
        let field = key.into();
        if strict && !self.fields().await?.iter().any(|f| f == &field) {
            return Err(SqliError::UnknownField(field, self.table.clone()));
        }
        Ok(FieldWrapper {
            table: self.table.clone(),
            db: self.db.clone(),
            field,
        })
    }
}

impl std::fmt::Display for TableWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table)
    }
}

/// One database, addressable by name, that lazily enumerates its tables.
/// Mirrors `pysqli.core.wrappers.DatabaseWrapper`.
pub struct DatabaseWrapper {
    dbms: Arc<Dbms>,
    pub db: String,
    tables: OnceCell<Vec<String>>,
}

impl DatabaseWrapper {
    pub fn new(dbms: Arc<Dbms>, db: impl Into<String>) -> Self {
        Self {
            dbms,
            db: db.into(),
            tables: OnceCell::new(),
        }
    }

    pub async fn tables(&self) -> Result<&[String]> {
        if self.tables.get().is_none() {
            let fetched = self.dbms.tables(Some(&self.db)).await?;
            let _ = self.tables.set(fetched);
        }
        Ok(self.tables.get().expect("just initialized above").as_slice())
    }

    pub async fn len(&self) -> Result<i64> {
        self.dbms.get_nb_tables(Some(&self.db)).await
    }

    pub fn table(&self, key: impl Into<String>) -> TableWrapper {
        TableWrapper::new(self.dbms.clone(), key.into(), self.db.clone())
    }
}

impl std::fmt::Display for DatabaseWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, FieldType, Method, Params};
    use crate::dbms::{Dbms, FULL_ENUM_CAPS};
    use crate::forge::mysql::MysqlForge;
    use crate::injector::{InjectOutcome, Injector};
    use crate::trigger::{Response, Trigger, TriggerMode};
    use async_trait::async_trait;
    use indexmap::IndexMap;

    struct PassTrigger;
    impl Trigger for PassTrigger {
        fn mode(&self) -> TriggerMode {
            TriggerMode::Success
        }
        fn execute(&self, _response: &Response) -> bool {
            true
        }
    }

    /// Answers `get_nb_fields`/`get_field_name` in-band queries against a
    /// fixed two-column table ("id", "name"), bypassing the wire.
    struct FixedFieldsInjector {
        context: Context,
        trigger: Box<dyn Trigger>,
    }

    #[async_trait]
    impl Injector for FixedFieldsInjector {
        fn context(&self) -> &Context {
            &self.context
        }
        fn trigger(&self) -> &dyn Trigger {
            self.trigger.as_ref()
        }
        fn set_trigger(&mut self, t: Box<dyn Trigger>) {
            self.trigger = t;
        }
        async fn send(&self, _params: &Params) -> Result<Response> {
            Ok(Response::new(200, ""))
        }
        async fn inject(&self, sql: &str) -> Result<InjectOutcome> {
            if sql.contains("COUNT(*)") {
                return Ok(InjectOutcome::Inband(Some("2".to_string())));
            }
            let re = regex::Regex::new(r"LIMIT (\d+),1").unwrap();
            let idx: u32 = re
                .captures(sql)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
                .expect("get_field_name always embeds a LIMIT offset");
            let name = if idx == 0 { "id" } else { "name" };
            Ok(InjectOutcome::Inband(Some(name.to_string())))
        }
    }

    fn table_wrapper() -> TableWrapper {
        let mut values = IndexMap::new();
        values.insert("id".to_string(), "1".to_string());
        let context = Context::builder()
            .method(Method::Inband)
            .field_type(FieldType::Str)
            .union_fields("s")
            .union_target(0)
            .params(Params::Mapping {
                values,
                target: "id".to_string(),
            })
            .build()
            .unwrap();
        let forge: Arc<dyn crate::forge::SqlForge> = Arc::new(MysqlForge::new(context.clone()));
        let injector: Arc<dyn Injector> = Arc::new(FixedFieldsInjector {
            context,
            trigger: Box::new(PassTrigger),
        });
        let dbms = Arc::new(Dbms::new(forge, injector, FULL_ENUM_CAPS, 500, 5));
        TableWrapper::new(dbms, "users", "app")
    }

    #[tokio::test]
    async fn field_non_strict_allows_unknown_name() {
        let table = table_wrapper();
        let field = table.field("anything", false).await.unwrap();
        assert_eq!(field.field, "anything");
        assert_eq!(field.table, "users");
    }

    #[tokio::test]
    async fn field_strict_accepts_known_name() {
        let table = table_wrapper();
        let field = table.field("name", true).await.unwrap();
        assert_eq!(field.field, "name");
    }

    #[tokio::test]
    async fn field_strict_rejects_unknown_name() {
        let table = table_wrapper();
        let result = table.field("bogus", true).await;
        assert!(matches!(result, Err(SqliError::UnknownField(_, _))));
    }
}
