use super::ImportSet;
use crate::ir::{
    ColumnDefinition, ColumnType, DynamicSchema, ForeignKeyDefinition, IndexDefinition,
    TableDefinition,
};

/// Render the strict form. The import list only names what the tables use.
pub fn generate(schema: &DynamicSchema) -> String {
    let mut imports = ImportSet::new();
    let mut blocks = Vec::new();
    for table in &schema.tables {
        blocks.extend(render_table(table, &mut imports));
    }

    let mut out = imports.render();
    out.push('\n');
    out.push_str(&blocks.join("\n\n"));
    out.push('\n');
    out
}

/// One `pgTable` block followed by its index and foreign key declarations.
pub fn render_table(table: &TableDefinition, imports: &mut ImportSet) -> Vec<String> {
    imports.insert("pgTable");

    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|col| {
            imports.insert(col.column_type.constructor());
            format!("  {}: {},", col.identifier, render_column(col))
        })
        .collect();

    let mut blocks = vec![format!(
        "export const {} = pgTable(\"{}\", {{\n{}\n}});",
        table.identifier,
        table.identifier,
        columns.join("\n")
    )];

    for idx in &table.indexes {
        imports.insert("index");
        if idx.where_clause.is_some() {
            imports.insert("sql");
        }
        blocks.push(render_index(idx));
    }
    for fk in &table.foreign_keys {
        imports.insert("foreignKey");
        blocks.push(render_foreign_key(&table.identifier, fk));
    }
    blocks
}

/// Column builder expression, modifiers in a fixed order.
pub fn render_column(col: &ColumnDefinition) -> String {
    let mut args = format!("\"{}\"", col.identifier);
    match (col.column_type, col.length) {
        (ty, Some(length)) if ty.supports_length() => {
            args.push_str(&format!(", {{ length: {} }}", length));
        }
        (ColumnType::TimestampTz, _) => args.push_str(", { withTimezone: true }"),
        _ => {}
    }

    let mut expr = format!("{}({})", col.column_type.constructor(), args);
    if col.column_type.is_array() {
        expr.push_str(".array()");
    }
    if !col.is_nullable {
        expr.push_str(".notNull()");
    }
    if col.is_primary_key {
        expr.push_str(".primaryKey()");
    }
    if col.is_unique && !col.is_primary_key {
        expr.push_str(".unique()");
    }
    if let Some(value) = &col.default_value {
        let literal = serde_json::Value::String(value.clone()).to_string();
        expr.push_str(&format!(".default({})", literal));
    }
    if let Some(check) = &col.check_constraint {
        expr.push_str(&format!(".check({})", check));
    }
    if col.is_auto_increment {
        expr.push_str(".autoIncrement()");
    }
    if col.column_order > 0 {
        expr.push_str(&format!(".order({})", col.column_order));
    }
    expr
}

pub fn render_index(idx: &IndexDefinition) -> String {
    let columns = if idx.columns.len() > 1 {
        let quoted: Vec<String> = idx.columns.iter().map(|c| format!("\"{}\"", c)).collect();
        format!("[{}]", quoted.join(", "))
    } else {
        format!("\"{}\"", idx.columns.join(""))
    };

    let mut options = Vec::new();
    if idx.is_unique {
        options.push("unique: true".to_string());
    }
    if let Some(predicate) = &idx.where_clause {
        options.push(format!("where: sql`{}`", predicate.replace('`', "\\`")));
    }
    let options = if options.is_empty() {
        String::new()
    } else {
        format!(", {{ {} }}", options.join(", "))
    };

    format!(
        "export const {} = index(\"{}\", {}{});",
        idx.identifier, idx.identifier, columns, options
    )
}

pub fn render_foreign_key(table: &str, fk: &ForeignKeyDefinition) -> String {
    format!(
        "export const {name} = foreignKey(() => {table}.{source}, {{\n  name: \"{name}\",\n  references: () => {target}.{target_column},\n  onUpdate: \"{on_update}\",\n  onDelete: \"{on_delete}\"\n}});",
        name = fk.constraint_name,
        table = table,
        source = fk.source_column,
        target = fk.referenced_table,
        target_column = fk.referenced_column,
        on_update = fk.on_update.drizzle_name(),
        on_delete = fk.on_delete.drizzle_name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IndexType, ReferentialAction};

    fn column(identifier: &str, column_type: ColumnType, order: u32) -> ColumnDefinition {
        ColumnDefinition {
            id: None,
            identifier: identifier.into(),
            name: identifier.into(),
            column_type,
            length: None,
            is_nullable: true,
            is_primary_key: false,
            is_unique: false,
            is_auto_increment: false,
            column_order: order,
            default_value: None,
            check_constraint: None,
        }
    }

    #[test]
    fn modifiers_follow_fixed_order() {
        let mut col = column("code", ColumnType::Varchar, 3);
        col.length = Some(12);
        col.is_nullable = false;
        col.is_unique = true;
        col.default_value = Some("abc".into());
        col.check_constraint = Some("LENGTH(code) >= 2".into());
        assert_eq!(
            render_column(&col),
            "varchar(\"code\", { length: 12 }).notNull().unique().default(\"abc\").check(LENGTH(code) >= 2).order(3)"
        );
    }

    #[test]
    fn primary_key_suppresses_unique() {
        let mut col = column("id", ColumnType::Integer, 1);
        col.is_nullable = false;
        col.is_primary_key = true;
        col.is_unique = true;
        col.is_auto_increment = true;
        assert_eq!(
            render_column(&col),
            "integer(\"id\").notNull().primaryKey().autoIncrement().order(1)"
        );
    }

    #[test]
    fn length_ignored_outside_varchar() {
        let mut col = column("body", ColumnType::Text, 2);
        col.length = Some(40);
        assert_eq!(render_column(&col), "text(\"body\").order(2)");
    }

    #[test]
    fn array_and_timezone_columns() {
        let tags = column("tags", ColumnType::TextArray, 1);
        assert_eq!(render_column(&tags), "text(\"tags\").array().order(1)");
        let seen = column("seen_at", ColumnType::TimestampTz, 2);
        assert_eq!(
            render_column(&seen),
            "timestamp(\"seen_at\", { withTimezone: true }).order(2)"
        );
    }

    #[test]
    fn index_columns_and_options() {
        let mut idx = IndexDefinition {
            id: None,
            identifier: "users_email_idx".into(),
            name: "users email".into(),
            columns: vec!["email".into()],
            index_type: IndexType::Btree,
            is_unique: false,
            where_clause: None,
        };
        assert_eq!(
            render_index(&idx),
            "export const users_email_idx = index(\"users_email_idx\", \"email\");"
        );

        idx.columns = vec!["email".into(), "tenant".into()];
        idx.is_unique = true;
        idx.where_clause = Some("deleted_at IS NULL".into());
        assert_eq!(
            render_index(&idx),
            "export const users_email_idx = index(\"users_email_idx\", [\"email\", \"tenant\"], { unique: true, where: sql`deleted_at IS NULL` });"
        );
    }

    #[test]
    fn foreign_key_block() {
        let fk = ForeignKeyDefinition {
            id: None,
            constraint_name: "posts_author_fk".into(),
            source_column: "author_id".into(),
            referenced_schema: "app".into(),
            referenced_table: "users".into(),
            referenced_column: "id".into(),
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::SetNull,
            is_deferrable: false,
        };
        assert_eq!(
            render_foreign_key("posts", &fk),
            "export const posts_author_fk = foreignKey(() => posts.author_id, {\n  name: \"posts_author_fk\",\n  references: () => users.id,\n  onUpdate: \"no action\",\n  onDelete: \"set null\"\n});"
        );
    }
}
