use schema_engine::{validate_schema, Issue, SchemaInput};
use serde_json::{json, Value};

fn column(identifier: &str, column_type: &str, order: u32, primary_key: bool) -> Value {
    json!({
        "identifier": identifier,
        "name": identifier,
        "column_type": column_type,
        "is_nullable": !primary_key,
        "is_primary_key": primary_key,
        "is_unique": false,
        "is_auto_increment": false,
        "column_order": order,
    })
}

fn schema_with(table: Value) -> Value {
    json!({
        "schema": { "identifier": "app", "name": "App" },
        "tables": [table],
    })
}

fn table(columns: Vec<Value>) -> Value {
    json!({ "identifier": "items", "name": "Items", "columns": columns })
}

fn issues(value: &Value) -> Vec<Issue> {
    validate_schema(value).unwrap_err()
}

fn has(issues: &[Issue], field: &str, fragment: &str) -> bool {
    issues
        .iter()
        .any(|i| i.field == field && i.message.contains(fragment))
}

#[test]
fn valid_strict_schema_passes() {
    let value = schema_with(table(vec![
        column("id", "UUID", 1, true),
        column("label", "text", 2, false),
    ]));
    let input = validate_schema(&value).unwrap();
    assert!(input.is_strict());
    assert_eq!(input.table_count(), 1);
}

#[test]
fn exactly_one_primary_key_is_required() {
    let none = schema_with(table(vec![column("a", "TEXT", 1, false)]));
    assert!(has(&issues(&none), "tables.0.columns", "exactly one primary key, found 0"));

    let two = schema_with(table(vec![
        column("a", "UUID", 1, true),
        column("b", "UUID", 2, true),
    ]));
    assert!(has(&issues(&two), "tables.0.columns", "exactly one primary key, found 2"));
}

#[test]
fn column_orders_must_be_sequential() {
    let gap = schema_with(table(vec![
        column("id", "UUID", 1, true),
        column("b", "TEXT", 3, false),
    ]));
    assert!(has(&issues(&gap), "tables.0.columns", "sequential"));

    let duplicate = schema_with(table(vec![
        column("id", "UUID", 1, true),
        column("b", "TEXT", 1, false),
    ]));
    assert!(has(&issues(&duplicate), "tables.0.columns", "sequential"));
}

#[test]
fn gin_indexes_cannot_be_unique() {
    let mut t = table(vec![
        column("id", "UUID", 1, true),
        column("doc", "JSONB", 2, false),
    ]);
    t["indexes"] = json!([{
        "identifier": "items_doc_idx",
        "name": "doc",
        "columns": "doc",
        "index_type": "GIN",
        "is_unique": true,
    }]);
    assert!(has(
        &issues(&schema_with(t)),
        "tables.0.indexes.0",
        "GIN indexes cannot be unique"
    ));
}

#[test]
fn auto_increment_requires_integer_types() {
    let mut id = column("id", "TEXT", 1, true);
    id["is_auto_increment"] = json!(true);
    let found = issues(&schema_with(table(vec![id])));
    assert!(has(&found, "tables.0.columns.0", "auto-increment"));

    let mut id = column("id", "BIGINT", 1, true);
    id["is_auto_increment"] = json!(true);
    assert!(validate_schema(&schema_with(table(vec![id]))).is_ok());
}

#[test]
fn primary_key_cannot_be_nullable() {
    let mut id = column("id", "UUID", 1, true);
    id["is_nullable"] = json!(true);
    assert!(has(
        &issues(&schema_with(table(vec![id]))),
        "tables.0.columns.0",
        "primary key column cannot be nullable"
    ));
}

#[test]
fn check_constraints_must_match_known_shapes() {
    let mut price = column("price", "NUMERIC", 2, false);
    price["check_constraint"] = json!("price; DROP TABLE items");
    let found = issues(&schema_with(table(vec![column("id", "UUID", 1, true), price])));
    assert!(has(&found, "tables.0.columns.1.check_constraint", "Invalid check constraint format"));
}

#[test]
fn foreign_keys_must_resolve_within_the_schema() {
    let mut t = table(vec![
        column("id", "UUID", 1, true),
        column("owner_id", "UUID", 2, false),
    ]);
    let fk = |schema: &str| {
        json!({
            "constraint_name": "items_owner_fk",
            "source_column": "owner_id",
            "referenced_schema": schema,
            "referenced_table": "owners",
            "referenced_column": "id",
            "on_update": "NO ACTION",
            "on_delete": "set null",
            "is_deferrable": false,
        })
    };

    t["foreign_keys"] = json!([fk("app")]);
    assert!(has(
        &issues(&schema_with(t.clone())),
        "tables.0.foreign_keys.0.referenced_table",
        "not part of schema app"
    ));

    t["foreign_keys"] = json!([fk("billing")]);
    assert!(validate_schema(&schema_with(t)).is_ok());
}

#[test]
fn unknown_enum_values_list_the_alternatives() {
    let found = issues(&schema_with(table(vec![column("id", "MONEY", 1, true)])));
    let issue = found
        .iter()
        .find(|i| i.field == "tables.0.columns.0.column_type")
        .unwrap();
    assert!(issue.message.starts_with("Invalid enum value. Expected UUID | VARCHAR"));
    assert!(issue.message.ends_with("received 'MONEY'"));
}

#[test]
fn every_violation_is_reported_field_rules_first() {
    let mut bad = column("2nd", "TEXT", 3, false);
    bad["name"] = json!("");
    let found = issues(&schema_with(table(vec![column("id", "UUID", 1, true), bad])));

    assert!(has(&found, "tables.0.columns.1.identifier", "Must be a valid identifier"));
    assert!(has(&found, "tables.0.columns.1.name", "Cannot be empty"));

    // Table 0 breaks a table rule, table 1 a field rule; the field issue still comes first.
    let no_pk = table(vec![column("a", "TEXT", 1, false)]);
    let mut bad_id = column("id", "UUID", 1, true);
    bad_id["id"] = json!("not-a-uuid");
    let mut second = table(vec![bad_id]);
    second["identifier"] = json!("others");
    let found = issues(&json!({
        "schema": { "identifier": "app", "name": "App" },
        "tables": [no_pk, second],
    }));
    assert_eq!(found[0], Issue::new("tables.1.columns.0.id", "Invalid UUID format"));
    assert!(has(&found[1..], "tables.0.columns", "exactly one primary key"));
}

#[test]
fn table_rules_come_before_column_invariants() {
    let mut a = column("a", "TEXT", 2, false);
    a["check_constraint"] = json!("not a constraint");
    let found = issues(&schema_with(table(vec![a])));

    let position = |fragment: &str| found.iter().position(|i| i.message.contains(fragment));
    let primary_key = position("exactly one primary key").unwrap();
    let order = position("sequential").unwrap();
    let check = position("Invalid check constraint format").unwrap();
    assert!(primary_key < order);
    assert!(order < check);
}

#[test]
fn identifiers_must_be_unique() {
    let found = issues(&schema_with(table(vec![
        column("id", "UUID", 1, true),
        column("label", "TEXT", 2, false),
        column("label", "TEXT", 3, false),
    ])));
    assert!(found.contains(&Issue::new(
        "tables.0.columns.2.identifier",
        "Duplicate column identifier 'label'"
    )));

    let found = issues(&json!({
        "schema": { "identifier": "app", "name": "App" },
        "tables": [
            table(vec![column("id", "UUID", 1, true)]),
            table(vec![column("id", "UUID", 1, true)]),
        ],
    }));
    assert_eq!(
        found,
        vec![Issue::new(
            "tables.1.identifier",
            "Duplicate table identifier 'items'"
        )]
    );
}

#[test]
fn foreign_key_source_must_be_a_column_of_its_table() {
    let mut t = table(vec![column("id", "UUID", 1, true)]);
    t["foreign_keys"] = json!([{
        "constraint_name": "items_owner_fk",
        "source_column": "owner_id",
        "referenced_schema": "billing",
        "referenced_table": "owners",
        "referenced_column": "id",
        "on_update": "CASCADE",
        "on_delete": "RESTRICT",
        "is_deferrable": false,
    }]);
    assert_eq!(
        issues(&schema_with(t)),
        vec![Issue::new(
            "tables.0.foreign_keys.0.source_column",
            "Foreign key items_owner_fk references unknown column owner_id on table items"
        )]
    );
}

#[test]
fn index_columns_accept_comma_lists() {
    let mut t = table(vec![
        column("id", "UUID", 1, true),
        column("a", "TEXT", 2, false),
        column("b", "TEXT", 3, false),
    ]);
    t["indexes"] = json!([{
        "identifier": "items_ab_idx",
        "name": "ab",
        "columns": " a ,b ",
        "index_type": "btree",
        "is_unique": false,
    }]);
    let SchemaInput::Strict(schema) = validate_schema(&schema_with(t)).unwrap() else {
        panic!("expected strict form");
    };
    assert_eq!(schema.tables[0].indexes[0].columns, vec!["a", "b"]);
}

#[test]
fn index_columns_must_exist() {
    let mut t = table(vec![column("id", "UUID", 1, true)]);
    t["indexes"] = json!([{
        "identifier": "items_missing_idx",
        "name": "missing",
        "columns": ["ghost"],
        "index_type": "BTREE",
        "is_unique": false,
    }]);
    assert!(has(
        &issues(&schema_with(t)),
        "tables.0.indexes.0.columns",
        "unknown column ghost"
    ));
}

#[test]
fn loose_form_rules() {
    assert!(has(&issues(&json!({ "tables": [] })), "tables", "at least one table"));
    assert!(has(&issues(&json!({})), "tables", "Required"));

    let found = issues(&json!({
        "tables": [{ "name": "users", "columns": [{ "name": "id" }, { "name": "bad name", "type": "text" }] }]
    }));
    assert!(has(&found, "tables.0.columns.0.type", "Required"));
    assert!(has(&found, "tables.0.columns.1.name", "Must be a valid identifier"));
}

#[test]
fn loose_form_accepts_map_tables() {
    let input = validate_schema(&json!({
        "tables": { "users": { "id": "serial", "email": { "type": "text", "unique": true } } }
    }))
    .unwrap();
    let SchemaInput::Loose(schema) = input else {
        panic!("expected loose form");
    };
    assert_eq!(schema.tables[0].name, "users");
    let columns = &schema.tables[0].columns;
    assert_eq!(columns.len(), 2);
    let email = columns.iter().find(|c| c.name == "email").unwrap();
    assert!(email.unique);
    let id = columns.iter().find(|c| c.name == "id").unwrap();
    assert_eq!(id.column_type, "serial");
}
