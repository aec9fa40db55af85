//! Structural validation of schema requests.
//!
//! Validation walks the raw JSON value instead of deserialising it so that
//! every violated rule is reported with its field path, not just the first.

use crate::ir::{
    ColumnDefinition, ColumnType, DynamicSchema, ForeignKeyDefinition, IndexDefinition, IndexType,
    LooseColumn, LooseSchema, LooseTable, ReferentialAction, SchemaInput, SchemaMeta,
    TableDefinition,
};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").expect("identifier regex"));

static TENANT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("tenant regex"));

/// Accepted check-constraint shapes: length comparison, numeric comparison,
/// membership, regex match and null check.
static CHECK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^LENGTH\(.+\)\s*[><=]+\s*\d+$",
        r"^.+\s*[><=]+\s*\d+(\.\d+)?$",
        r"^.+\s+IN\s*\(.+\)$",
        r"^.+\s*~\s*'.+'$",
        r"^.+\s*IS\s+(NOT\s+)?NULL$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("check constraint regex"))
    .collect()
});

/// One violated rule, addressed by a dotted path such as
/// `tables.0.columns.2.identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub field: String,
    pub message: String,
}

impl Issue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Issue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Re-root the path under `prefix`, e.g. `tables` -> `schema.tables`.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.field = join(prefix, &self.field);
        self
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

fn join(path: &str, key: impl Display) -> String {
    let key = key.to_string();
    match (path.is_empty(), key.is_empty()) {
        (true, _) => key,
        (false, true) => path.to_string(),
        (false, false) => format!("{}.{}", path, key),
    }
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

pub fn is_valid_check_constraint(expr: &str) -> bool {
    CHECK_PATTERNS.iter().any(|p| p.is_match(expr))
}

/// Tenant ids become path segments and object-store key segments.
pub fn validate_tenant_id(tenant: &str) -> Result<(), Vec<Issue>> {
    if tenant.is_empty() {
        return Err(vec![Issue::new("tenantId", "tenantID cannot be empty")]);
    }
    if !TENANT_ID.is_match(tenant) {
        return Err(vec![Issue::new(
            "tenantId",
            "tenantID may only contain letters, digits, '_' and '-'",
        )]);
    }
    Ok(())
}

/// Parse-only check that `url` is a PostgreSQL connection URL.
pub fn validate_database_url(url: &str) -> Result<(), Vec<Issue>> {
    use sqlx::postgres::PgConnectOptions;

    let scheme_ok = url.starts_with("postgres://") || url.starts_with("postgresql://");
    if !scheme_ok || PgConnectOptions::from_str(url).is_err() {
        return Err(vec![Issue::new("databaseUrl", "Invalid database URL format")]);
    }
    Ok(())
}

/// Validate a raw schema value and route it to the strict or loose form.
///
/// A top-level `schema` object selects the strict form; anything else is
/// treated as the loose form.
pub fn validate_schema(value: &Value) -> Result<SchemaInput, Vec<Issue>> {
    let Some(root) = value.as_object() else {
        return Err(vec![Issue::new("", "Expected object")]);
    };
    let mut walker = Walker::default();
    let input = if root.get("schema").is_some_and(Value::is_object) {
        walker.strict_schema(root).map(SchemaInput::Strict)
    } else {
        walker.loose_schema(root).map(SchemaInput::Loose)
    };
    match input {
        Some(input) if walker.is_clean() => Ok(input),
        _ => Err(walker.finish()),
    }
}

#[derive(Default)]
struct Walker {
    issues: Vec<Issue>,
    // primary key count and column order, reported after field rules
    table_rules: Vec<Issue>,
    // column invariants and cross-table rules, reported last
    deferred: Vec<Issue>,
}

impl Walker {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue::new(field, message));
    }

    fn table_rule(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.table_rules.push(Issue::new(field, message));
    }

    fn defer(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.deferred.push(Issue::new(field, message));
    }

    fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.table_rules.is_empty() && self.deferred.is_empty()
    }

    fn finish(mut self) -> Vec<Issue> {
        self.issues.append(&mut self.table_rules);
        self.issues.append(&mut self.deferred);
        self.issues
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let obj = value.as_object();
        if obj.is_none() {
            self.push(path, "Expected object");
        }
        obj
    }

    fn required_str(&mut self, obj: &Map<String, Value>, path: &str, key: &str) -> Option<String> {
        let field = join(path, key);
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.push(field, "Required");
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.push(field, "Cannot be empty");
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.push(field, "Expected string");
                None
            }
        }
    }

    fn identifier(&mut self, obj: &Map<String, Value>, path: &str, key: &str) -> Option<String> {
        let name = self.required_str(obj, path, key)?;
        if !is_identifier(&name) {
            self.push(join(path, key), "Must be a valid identifier");
            return None;
        }
        Some(name)
    }

    fn optional_str(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Result<Option<String>, ()> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => {
                self.push(join(path, key), "Expected string");
                Err(())
            }
        }
    }

    fn required_bool(&mut self, obj: &Map<String, Value>, path: &str, key: &str) -> Option<bool> {
        match obj.get(key) {
            Some(Value::Bool(b)) => Some(*b),
            None | Some(Value::Null) => {
                self.push(join(path, key), "Required");
                None
            }
            Some(_) => {
                self.push(join(path, key), "Expected boolean");
                None
            }
        }
    }

    fn optional_bool(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Result<Option<bool>, ()> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => {
                self.push(join(path, key), "Expected boolean");
                Err(())
            }
        }
    }

    fn positive_int(&mut self, value: &Value, field: String) -> Option<u32> {
        match value.as_u64() {
            Some(n) if n > 0 && n <= u64::from(u32::MAX) => Some(n as u32),
            _ => {
                self.push(field, "Expected positive integer");
                None
            }
        }
    }

    fn closed_enum<T: FromStr>(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
        allowed: &[&str],
    ) -> Option<T> {
        let raw = self.required_str(obj, path, key)?;
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.push(
                    join(path, key),
                    format!(
                        "Invalid enum value. Expected {}, received '{}'",
                        allowed.join(" | "),
                        raw
                    ),
                );
                None
            }
        }
    }

    fn optional_uuid(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
    ) -> Result<Option<String>, ()> {
        let id = self.optional_str(obj, path, "id")?;
        if let Some(id) = &id {
            if uuid::Uuid::parse_str(id).is_err() {
                self.push(join(path, "id"), "Invalid UUID format");
                return Err(());
            }
        }
        Ok(id)
    }

    /// `None` when the key is missing or not an array; an issue is recorded.
    fn non_empty_array<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        path: &str,
        key: &str,
        empty_message: &str,
    ) -> Option<&'v Vec<Value>> {
        let field = join(path, key);
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.push(field, "Required");
                None
            }
            Some(Value::Array(items)) if items.is_empty() => {
                self.push(field, empty_message);
                None
            }
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.push(field, "Expected array");
                None
            }
        }
    }

    fn optional_array<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<&'v [Value]> {
        match obj.get(key) {
            None | Some(Value::Null) => Some(&[]),
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.push(join(path, key), "Expected array");
                None
            }
        }
    }

    // ---------------------------------------------------------------
    // strict form
    // ---------------------------------------------------------------

    fn strict_schema(&mut self, root: &Map<String, Value>) -> Option<DynamicSchema> {
        let (identifier, name) = match root.get("schema").and_then(Value::as_object) {
            Some(obj) => (
                self.identifier(obj, "schema", "identifier"),
                self.required_str(obj, "schema", "name"),
            ),
            None => (None, None),
        };

        let tables =
            self.non_empty_array(root, "", "tables", "Schema must have at least one table");
        let mut parsed = Vec::new();
        let mut complete = tables.is_some();
        for (i, table) in tables.into_iter().flatten().enumerate() {
            match self.strict_table(table, &join("tables", i)) {
                Some(t) => parsed.push(t),
                None => complete = false,
            }
        }

        let mut seen = HashSet::new();
        for (i, table) in parsed.iter().enumerate() {
            if !seen.insert(table.identifier.as_str()) {
                self.defer(
                    format!("tables.{}.identifier", i),
                    format!("Duplicate table identifier '{}'", table.identifier),
                );
            }
        }

        let (Some(identifier), Some(name), true) = (identifier, name, complete) else {
            return None;
        };
        let schema = DynamicSchema {
            schema: SchemaMeta { identifier, name },
            tables: parsed,
        };
        self.check_foreign_key_targets(&schema);
        Some(schema)
    }

    fn strict_table(&mut self, value: &Value, path: &str) -> Option<TableDefinition> {
        let obj = self.object(value, path)?;
        let identifier = self.identifier(obj, path, "identifier");
        let name = self.required_str(obj, path, "name");

        let columns_path = join(path, "columns");
        let raw_columns =
            self.non_empty_array(obj, path, "columns", "Table must have at least one column");
        let mut columns = Vec::new();
        let mut columns_ok = raw_columns.is_some();
        for (j, col) in raw_columns.into_iter().flatten().enumerate() {
            match self.strict_column(col, &join(&columns_path, j)) {
                Some(c) => columns.push(c),
                None => columns_ok = false,
            }
        }

        let mut indexes = Vec::new();
        let mut indexes_ok = true;
        if let Some(raw) = self.optional_array(obj, path, "indexes") {
            for (k, idx) in raw.iter().enumerate() {
                match self.strict_index(idx, &join(&join(path, "indexes"), k)) {
                    Some(i) => indexes.push(i),
                    None => indexes_ok = false,
                }
            }
        } else {
            indexes_ok = false;
        }

        let mut foreign_keys = Vec::new();
        let mut fks_ok = true;
        if let Some(raw) = self.optional_array(obj, path, "foreign_keys") {
            for (k, fk) in raw.iter().enumerate() {
                match self.strict_foreign_key(fk, &join(&join(path, "foreign_keys"), k)) {
                    Some(f) => foreign_keys.push(f),
                    None => fks_ok = false,
                }
            }
        } else {
            fks_ok = false;
        }

        if columns_ok {
            self.check_table_columns(&columns, path);
            self.check_column_references(
                &columns,
                &indexes,
                &foreign_keys,
                path,
                identifier.as_deref(),
            );
        }

        if !(columns_ok && indexes_ok && fks_ok) {
            return None;
        }
        Some(TableDefinition {
            identifier: identifier?,
            name: name?,
            columns,
            indexes,
            foreign_keys,
        })
    }

    fn strict_column(&mut self, value: &Value, path: &str) -> Option<ColumnDefinition> {
        let obj = self.object(value, path)?;
        let id = self.optional_uuid(obj, path);
        let identifier = self.identifier(obj, path, "identifier");
        let name = self.required_str(obj, path, "name");
        let type_names: Vec<&str> = ColumnType::ALL.iter().map(|t| t.sql_name()).collect();
        let column_type = self.closed_enum::<ColumnType>(obj, path, "column_type", &type_names);
        let length = match obj.get("length") {
            None | Some(Value::Null) => Ok(None),
            Some(v) => self.positive_int(v, join(path, "length")).map(Some).ok_or(()),
        };
        let is_nullable = self.required_bool(obj, path, "is_nullable");
        let is_primary_key = self.required_bool(obj, path, "is_primary_key");
        let is_unique = self.required_bool(obj, path, "is_unique");
        let is_auto_increment = self.required_bool(obj, path, "is_auto_increment");
        let column_order = match obj.get("column_order") {
            None | Some(Value::Null) => {
                self.push(join(path, "column_order"), "Required");
                None
            }
            Some(v) => self.positive_int(v, join(path, "column_order")),
        };
        let default_value = self.optional_str(obj, path, "default_value");
        let check_constraint = self.optional_str(obj, path, "check_constraint");
        if let Ok(Some(expr)) = &check_constraint {
            if !is_valid_check_constraint(expr) {
                self.defer(join(path, "check_constraint"), "Invalid check constraint format");
            }
        }

        let column = ColumnDefinition {
            id: id.ok()?,
            identifier: identifier?,
            name: name?,
            column_type: column_type?,
            length: length.ok()?,
            is_nullable: is_nullable?,
            is_primary_key: is_primary_key?,
            is_unique: is_unique?,
            is_auto_increment: is_auto_increment?,
            column_order: column_order?,
            default_value: default_value.ok()?,
            check_constraint: check_constraint.ok()?,
        };

        if column.is_primary_key && column.is_nullable {
            self.defer(
                path,
                "Invalid column configuration: a primary key column cannot be nullable",
            );
        }
        if column.is_auto_increment && !column.column_type.supports_auto_increment() {
            self.defer(
                path,
                format!(
                    "Invalid column configuration: auto-increment requires INTEGER, BIGINT or SMALLINT, got {}",
                    column.column_type
                ),
            );
        }
        Some(column)
    }

    fn strict_index(&mut self, value: &Value, path: &str) -> Option<IndexDefinition> {
        let obj = self.object(value, path)?;
        let id = self.optional_uuid(obj, path);
        let identifier = self.identifier(obj, path, "identifier");
        let name = self.required_str(obj, path, "name");
        let columns = self.index_columns(obj, path);
        let type_names: Vec<&str> = IndexType::ALL.iter().map(|t| t.sql_name()).collect();
        let index_type = self.closed_enum::<IndexType>(obj, path, "index_type", &type_names);
        let is_unique = self.required_bool(obj, path, "is_unique");
        let where_clause = self.optional_str(obj, path, "where_clause");

        let index = IndexDefinition {
            id: id.ok()?,
            identifier: identifier?,
            name: name?,
            columns: columns?,
            index_type: index_type?,
            is_unique: is_unique?,
            where_clause: where_clause.ok()?.filter(|w| !w.trim().is_empty()),
        };
        if index.index_type == IndexType::Gin && index.is_unique {
            self.defer(path, "GIN indexes cannot be unique");
        }
        Some(index)
    }

    /// Index columns arrive either comma-separated or as an array.
    fn index_columns(&mut self, obj: &Map<String, Value>, path: &str) -> Option<Vec<String>> {
        let field = join(path, "columns");
        let names: Vec<String> = match obj.get("columns") {
            Some(Value::Array(items)) => {
                let mut names = Vec::new();
                for (n, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => names.push(s.trim().to_string()),
                        None => {
                            self.push(join(&field, n), "Expected string");
                            return None;
                        }
                    }
                }
                names
            }
            Some(Value::String(s)) => s.split(',').map(|c| c.trim().to_string()).collect(),
            None | Some(Value::Null) => {
                self.push(field, "Required");
                return None;
            }
            Some(_) => {
                self.push(field, "Expected string");
                return None;
            }
        };
        if names.is_empty() || names.iter().any(String::is_empty) {
            self.push(field, "Cannot be empty");
            return None;
        }
        Some(names)
    }

    fn strict_foreign_key(&mut self, value: &Value, path: &str) -> Option<ForeignKeyDefinition> {
        let obj = self.object(value, path)?;
        let id = self.optional_uuid(obj, path);
        let constraint_name = self.identifier(obj, path, "constraint_name");
        let source_column = self.identifier(obj, path, "source_column");
        let referenced_schema = self.identifier(obj, path, "referenced_schema");
        let referenced_table = self.identifier(obj, path, "referenced_table");
        let referenced_column = self.identifier(obj, path, "referenced_column");
        let action_names: Vec<&str> = ReferentialAction::ALL.iter().map(|a| a.sql_name()).collect();
        let on_update =
            self.closed_enum::<ReferentialAction>(obj, path, "on_update", &action_names);
        let on_delete =
            self.closed_enum::<ReferentialAction>(obj, path, "on_delete", &action_names);
        let is_deferrable = self.required_bool(obj, path, "is_deferrable");

        Some(ForeignKeyDefinition {
            id: id.ok()?,
            constraint_name: constraint_name?,
            source_column: source_column?,
            referenced_schema: referenced_schema?,
            referenced_table: referenced_table?,
            referenced_column: referenced_column?,
            on_update: on_update?,
            on_delete: on_delete?,
            is_deferrable: is_deferrable?,
        })
    }

    /// Exactly one primary key, column orders forming `1..=N`, unique
    /// column identifiers.
    fn check_table_columns(&mut self, columns: &[ColumnDefinition], path: &str) {
        let primary_keys = columns.iter().filter(|c| c.is_primary_key).count();
        if primary_keys != 1 {
            self.table_rule(
                join(path, "columns"),
                format!("Table must have exactly one primary key, found {}", primary_keys),
            );
        }

        let mut orders: Vec<u32> = columns.iter().map(|c| c.column_order).collect();
        orders.sort_unstable();
        let sequential = orders
            .iter()
            .enumerate()
            .all(|(i, order)| *order as usize == i + 1);
        if !sequential {
            self.table_rule(
                join(path, "columns"),
                format!(
                    "Column orders must be sequential from 1 to {}, got {:?}",
                    columns.len(),
                    orders
                ),
            );
        }

        let mut seen = HashSet::new();
        for (j, col) in columns.iter().enumerate() {
            if !seen.insert(col.identifier.as_str()) {
                self.defer(
                    format!("{}.columns.{}.identifier", path, j),
                    format!("Duplicate column identifier '{}'", col.identifier),
                );
            }
        }
    }

    fn check_column_references(
        &mut self,
        columns: &[ColumnDefinition],
        indexes: &[IndexDefinition],
        foreign_keys: &[ForeignKeyDefinition],
        path: &str,
        table: Option<&str>,
    ) {
        let known: HashSet<&str> = columns.iter().map(|c| c.identifier.as_str()).collect();
        let table = table.unwrap_or("?");
        for (k, idx) in indexes.iter().enumerate() {
            for col in &idx.columns {
                if !known.contains(col.as_str()) {
                    self.defer(
                        format!("{}.indexes.{}.columns", path, k),
                        format!(
                            "Index {} references unknown column {} on table {}",
                            idx.identifier, col, table
                        ),
                    );
                }
            }
        }
        for (k, fk) in foreign_keys.iter().enumerate() {
            if !known.contains(fk.source_column.as_str()) {
                self.defer(
                    format!("{}.foreign_keys.{}.source_column", path, k),
                    format!(
                        "Foreign key {} references unknown column {} on table {}",
                        fk.constraint_name, fk.source_column, table
                    ),
                );
            }
        }
    }

    /// Same-schema references must resolve to a table of this request.
    fn check_foreign_key_targets(&mut self, schema: &DynamicSchema) {
        let tables: HashSet<&str> = schema.tables.iter().map(|t| t.identifier.as_str()).collect();
        for (i, table) in schema.tables.iter().enumerate() {
            for (k, fk) in table.foreign_keys.iter().enumerate() {
                if fk.referenced_schema == schema.schema.identifier
                    && !tables.contains(fk.referenced_table.as_str())
                {
                    self.defer(
                        format!("tables.{}.foreign_keys.{}.referenced_table", i, k),
                        format!(
                            "Foreign key {} references table {} which is not part of schema {}",
                            fk.constraint_name, fk.referenced_table, schema.schema.identifier
                        ),
                    );
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // loose form
    // ---------------------------------------------------------------

    fn loose_schema(&mut self, root: &Map<String, Value>) -> Option<LooseSchema> {
        let mut tables = Vec::new();
        let mut ok = true;
        match root.get("tables") {
            None | Some(Value::Null) => {
                self.push("tables", "Required");
                return None;
            }
            Some(Value::Array(items)) => {
                if items.is_empty() {
                    self.push("tables", "Schema must have at least one table");
                    return None;
                }
                for (i, item) in items.iter().enumerate() {
                    let path = join("tables", i);
                    let Some(obj) = self.object(item, &path) else {
                        ok = false;
                        continue;
                    };
                    let name = self.loose_name(obj.get("name"), &join(&path, "name"));
                    let columns = self.loose_columns(obj.get("columns"), &join(&path, "columns"));
                    match (name, columns) {
                        (Some(name), Some(columns)) => tables.push(LooseTable { name, columns }),
                        _ => ok = false,
                    }
                }
            }
            Some(Value::Object(map)) => {
                if map.is_empty() {
                    self.push("tables", "Schema must have at least one table");
                    return None;
                }
                for (name, columns) in map {
                    let path = join("tables", name);
                    let name_ok = self.loose_name(Some(&Value::String(name.clone())), &path);
                    let columns = self.loose_columns(Some(columns), &path);
                    match (name_ok, columns) {
                        (Some(name), Some(columns)) => tables.push(LooseTable { name, columns }),
                        _ => ok = false,
                    }
                }
            }
            Some(_) => {
                self.push("tables", "Expected array");
                return None;
            }
        }
        ok.then_some(LooseSchema { tables })
    }

    fn loose_name(&mut self, value: Option<&Value>, field: &str) -> Option<String> {
        match value {
            None | Some(Value::Null) => {
                self.push(field, "Required");
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.push(field, "Cannot be empty");
                None
            }
            Some(Value::String(s)) if !is_identifier(s) => {
                self.push(field, "Must be a valid identifier");
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.push(field, "Expected string");
                None
            }
        }
    }

    fn loose_columns(&mut self, value: Option<&Value>, path: &str) -> Option<Vec<LooseColumn>> {
        let mut columns = Vec::new();
        let mut ok = true;
        match value {
            None | Some(Value::Null) => {
                self.push(path, "Required");
                return None;
            }
            Some(Value::Array(items)) => {
                if items.is_empty() {
                    self.push(path, "Table must have at least one column");
                    return None;
                }
                for (j, item) in items.iter().enumerate() {
                    let col_path = join(path, j);
                    let Some(obj) = self.object(item, &col_path) else {
                        ok = false;
                        continue;
                    };
                    let name = self.loose_name(obj.get("name"), &join(&col_path, "name"));
                    match (name, self.loose_column_body(obj, &col_path)) {
                        (Some(name), Some(col)) => columns.push(LooseColumn { name, ..col }),
                        _ => ok = false,
                    }
                }
            }
            Some(Value::Object(map)) => {
                if map.is_empty() {
                    self.push(path, "Table must have at least one column");
                    return None;
                }
                for (name, spec) in map {
                    let col_path = join(path, name);
                    let name = self.loose_name(Some(&Value::String(name.clone())), &col_path);
                    let body = match spec {
                        Value::String(ty) if ty.trim().is_empty() => {
                            self.push(col_path.clone(), "Cannot be empty");
                            None
                        }
                        Value::String(ty) => Some(LooseColumn {
                            name: String::new(),
                            column_type: ty.clone(),
                            unique: false,
                            nullable: None,
                            default: None,
                        }),
                        Value::Object(obj) => self.loose_column_body(obj, &col_path),
                        _ => {
                            self.push(col_path.clone(), "Expected string");
                            None
                        }
                    };
                    match (name, body) {
                        (Some(name), Some(col)) => columns.push(LooseColumn { name, ..col }),
                        _ => ok = false,
                    }
                }
            }
            Some(_) => {
                self.push(path, "Expected array");
                return None;
            }
        }
        ok.then_some(columns)
    }

    /// Everything but the column name, which depends on the container shape.
    fn loose_column_body(&mut self, obj: &Map<String, Value>, path: &str) -> Option<LooseColumn> {
        let column_type = self.required_str(obj, path, "type");
        let unique = self.optional_bool(obj, path, "unique");
        let nullable = self.optional_bool(obj, path, "nullable");
        let default = match obj.get("default") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
            Some(_) => {
                self.push(join(path, "default"), "Expected string");
                Err(())
            }
        };
        Some(LooseColumn {
            name: String::new(),
            column_type: column_type?,
            unique: unique.ok()?.unwrap_or(false),
            nullable: nullable.ok()?,
            default: default.ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_follow_grammar() {
        assert!(is_identifier("users"));
        assert!(is_identifier("user_id2"));
        assert!(!is_identifier("2users"));
        assert!(!is_identifier("_users"));
        assert!(!is_identifier("user-id"));
    }

    #[test]
    fn check_constraints_match_known_shapes() {
        assert!(is_valid_check_constraint("LENGTH(name) >= 2"));
        assert!(is_valid_check_constraint("price >= 0.5"));
        assert!(is_valid_check_constraint("status IN ('A', 'B')"));
        assert!(is_valid_check_constraint("email ~ '^.+@.+$'"));
        assert!(is_valid_check_constraint("deleted_at IS NOT NULL"));
        assert!(!is_valid_check_constraint("DROP TABLE users"));
    }

    #[test]
    fn tenant_ids_are_path_safe() {
        assert!(validate_tenant_id("tenant_42-a").is_ok());
        assert!(validate_tenant_id("").is_err());
        assert!(validate_tenant_id("../etc").is_err());
    }

    #[test]
    fn database_urls_must_be_postgres() {
        assert!(validate_database_url("postgres://user:pw@localhost:5432/app").is_ok());
        assert!(validate_database_url("mysql://localhost/app").is_err());
        assert!(validate_database_url("not a url").is_err());
    }

    #[test]
    fn issue_paths_can_be_reprefixed() {
        let issue = Issue::new("tables.0.name", "Required").prefixed("schema");
        assert_eq!(issue.field, "schema.tables.0.name");
        assert_eq!(issue.to_string(), "schema.tables.0.name: Required");
    }
}
