//! Named queries.
//!
//! A `Query` pairs a statement with its positional arguments and a name.
//! The name, not the statement, is what mock hooks are keyed on and what
//! errors are attributed to.

use std::fmt;

use crate::core::value::Value;

/// A named, immutable statement plus arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    name: String,
    statement: String,
    args: Vec<Value>,
}

impl Query {
    /// Creates a query with no arguments. Use [`Query::bind`] to add some.
    pub fn new(name: impl Into<String>, statement: impl Into<String>) -> Self {
        Query {
            name: name.into(),
            statement: statement.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(
        name: impl Into<String>,
        statement: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Query {
            name: name.into(),
            statement: statement.into(),
            args,
        }
    }

    /// Appends one positional argument.
    pub fn bind(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Classifies the statement by its leading keyword.
    pub fn kind(&self) -> StatementType {
        StatementType::from_sql(&self.statement)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query {:?}: {:?} {{ [", self.name, self.statement)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, "] }}")
    }
}

/// Represents different SQL statement types, used to label log events
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    /// CREATE / DROP / ALTER
    Ddl,
    /// BEGIN/COMMIT/ROLLBACK transaction commands
    Transaction,
    Other,
}

impl StatementType {
    /// Determines the statement type from a SQL string
    pub fn from_sql(sql: &str) -> Self {
        let sql_upper = sql.trim_start().to_uppercase();
        let keyword = sql_upper.split_whitespace().next().unwrap_or("");

        match keyword {
            "SELECT" | "WITH" | "VALUES" => StatementType::Select,
            "INSERT" | "REPLACE" => StatementType::Insert,
            "UPDATE" => StatementType::Update,
            "DELETE" => StatementType::Delete,
            "CREATE" | "DROP" | "ALTER" => StatementType::Ddl,
            "BEGIN" | "COMMIT" | "ROLLBACK" | "END" | "SAVEPOINT" | "RELEASE" => {
                StatementType::Transaction
            }
            _ => StatementType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::Select => "select",
            StatementType::Insert => "insert",
            StatementType::Update => "update",
            StatementType::Delete => "delete",
            StatementType::Ddl => "ddl",
            StatementType::Transaction => "transaction",
            StatementType::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;

    #[test]
    fn test_bind_appends_in_order() {
        let q = Query::new("add_room", "INSERT INTO rooms(name, open) VALUES(?1, ?2)")
            .bind("Lecture Hall 123")
            .bind(true);
        assert_eq!(q.name(), "add_room");
        assert_eq!(q.args(), &values!["Lecture Hall 123", true][..]);
    }

    #[test]
    fn test_display() {
        let q = Query::with_args("q1", "SELECT 1 WHERE ?1", values![5, "x"]);
        assert_eq!(q.to_string(), "query \"q1\": \"SELECT 1 WHERE ?1\" { [5, \"x\"] }");
    }

    #[test]
    fn test_statement_type_classification() {
        assert_eq!(StatementType::from_sql("SELECT * FROM users"), StatementType::Select);
        assert_eq!(StatementType::from_sql("  with t as (select 1) select * from t"), StatementType::Select);
        assert_eq!(StatementType::from_sql("INSERT INTO users VALUES (1, 'test')"), StatementType::Insert);
        assert_eq!(StatementType::from_sql("UPDATE users SET name = 'new'"), StatementType::Update);
        assert_eq!(StatementType::from_sql("DELETE FROM users WHERE id = 1"), StatementType::Delete);
        assert_eq!(StatementType::from_sql("CREATE TABLE test (id INTEGER)"), StatementType::Ddl);
        assert_eq!(StatementType::from_sql("BEGIN TRANSACTION"), StatementType::Transaction);
        assert_eq!(StatementType::from_sql("PRAGMA foreign_keys = ON"), StatementType::Other);
        assert_eq!(StatementType::from_sql(""), StatementType::Other);
    }
}
