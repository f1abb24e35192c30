use crate::context::Context;
use crate::error::Result;
use crate::forge::SqlForge;

/// Oracle dialect, grounded in `pysqli.dbms.oracle.OracleForge`.
pub struct OracleForge {
    context: Context,
}

impl OracleForge {
    pub fn new(context: Context) -> Self {
        Self { context }
    }
}

impl SqlForge for OracleForge {
    fn context(&self) -> &Context {
        &self.context
    }

    fn wrap_bisec(&self, cdt: &str) -> Result<String> {
        let d = self.wrap_field(self.context.default_value());
        Ok(self.wrap_sql(&format!(
            "SELECT CASE WHEN {cdt} THEN {d} ELSE 1/0 END FROM dual"
        )))
    }

    fn get_version(&self) -> Result<String> {
        Ok("(SELECT banner FROM v$version WHERE banner LIKE 'Oracle%')".to_string())
    }

    fn get_databases(&self) -> Result<String> {
        Ok("(SELECT DISTINCT owner FROM all_tables)".to_string())
    }

    fn get_tables(&self, _db: &str) -> Result<String> {
        Ok("(SELECT table_name FROM sys.user_tables)".to_string())
    }

    /// `ALL_TAB_COLUMNS` is the Oracle catalog view for column
    /// enumeration. The original never overrides `get_fields` despite
    /// declaring `FIELDS_ENUM` capability -- this fills that gap rather
    /// than reproducing the silent breakage (see DESIGN.md).
    fn get_fields(&self, table: &str, _db: &str) -> Result<String> {
        Ok(format!(
            "(SELECT column_name FROM all_tab_columns WHERE table_name={})",
            self.wrap_string(&table.to_uppercase())
        ))
    }

    fn string_len(&self, string: &str) -> String {
        format!("LENGTH({string})")
    }

    /// 1-based, like the generic default, but `SUBSTR` not `SUBSTRING`.
    fn get_char(&self, string: &str, pos: u32) -> String {
        format!("substr({string}, {pos}, 1)")
    }

    fn count(&self, records: &str) -> String {
        format!("SELECT COUNT(*) FROM {records}")
    }

    /// 0-based row index, via `ROWNUM` rather than `LIMIT`.
    fn take(&self, records: &str, index: u32) -> String {
        format!("select * FROM {records} WHERE ROWNUM={index}")
    }

    fn get_current_database(&self) -> String {
        "(SELECT SYS.DATABASE_NAME FROM DUAL)".to_string()
    }

    fn get_user(&self) -> String {
        "(SELECT user FROM dual)".to_string()
    }
}
