use crate::context::Context;
use crate::error::Result;
use crate::forge::SqlForge;

/// MySQL 4 dialect, grounded in `pysqli.dbms.mysql4.Mysql4Forge`.
///
/// Kept as an honest example of a dialect with partial capabilities:
/// `information_schema` does not exist in MySQL 4, so database/table/field
/// enumeration genuinely cannot be forged and the base `NotImplemented`
/// defaults are left in place. Only `wrap_bisec` and `get_version` are
/// overridden.
pub struct Mysql4Forge {
    context: Context,
}

impl Mysql4Forge {
    pub fn new(context: Context) -> Self {
        Self { context }
    }
}

impl SqlForge for Mysql4Forge {
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
}
