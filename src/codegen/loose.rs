use crate::ir::{LooseColumn, LooseSchema, LooseTable};
use regex::Regex;
use std::sync::LazyLock;

/// The loose form always imports every constructor it knows.
pub const IMPORT_LINE: &str = "import { bigint, boolean, date, decimal, doublePrecision, integer, json, jsonb, numeric, pgTable, real, serial, text, time, timestamp, uuid, varchar } from \"drizzle-orm/pg-core\";";

static TYPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z]+)(?:\((\d+)\))?").expect("type pattern"));

static TWO_WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]+)[ _-]+([a-z]+)(?:\((\d+)\))?").expect("two-word type pattern")
});

/// Dictionary keys spelled as two words.
const TWO_WORD_TYPES: [&str; 2] = ["double precision", "character varying"];

/// Split `varchar(100)` into `("varchar", Some("100"))`. Only the leading word
/// names the type (`timestamp with time zone` is a `timestamp`), except for
/// the two-word dictionary names, which may use space, `_` or `-`.
pub fn parse_type(raw: &str) -> (String, Option<String>) {
    let lowered = raw.trim().to_lowercase();
    if let Some(caps) = TWO_WORD_PATTERN.captures(&lowered) {
        let name = format!("{} {}", &caps[1], &caps[2]);
        if TWO_WORD_TYPES.contains(&name.as_str()) {
            return (name, caps.get(3).map(|m| m.as_str().to_string()));
        }
    }
    match TYPE_PATTERN.captures(&lowered) {
        Some(caps) => (
            caps[1].to_string(),
            caps.get(2).map(|m| m.as_str().to_string()),
        ),
        None => (lowered, None),
    }
}

/// `None` for types outside the dictionary.
fn builder_for(base: &str, size: Option<&str>) -> Option<String> {
    let builder = match base {
        "serial" => "serial().primaryKey()".to_string(),
        "integer" | "int" => "integer()".to_string(),
        "bigint" => "bigint()".to_string(),
        "varchar" | "character varying" => format!("varchar({})", size.unwrap_or("255")),
        "text" => "text()".to_string(),
        "boolean" | "bool" => "boolean()".to_string(),
        "numeric" | "decimal" => match size {
            Some(size) => format!("decimal({})", size),
            None => "decimal()".to_string(),
        },
        "real" => "real()".to_string(),
        "double precision" => "doublePrecision()".to_string(),
        "timestamp" => "timestamp()".to_string(),
        "date" => "date()".to_string(),
        "time" => "time()".to_string(),
        "json" => "json()".to_string(),
        "jsonb" => "jsonb()".to_string(),
        "uuid" => "uuid()".to_string(),
        _ => return None,
    };
    Some(builder)
}

pub fn render_column(col: &LooseColumn) -> String {
    let (base, size) = parse_type(&col.column_type);
    let known = builder_for(&base, size.as_deref());
    let mut expr = known.clone().unwrap_or_else(|| "text()".to_string());

    if col.unique {
        expr.push_str(".unique()");
    }
    if col.nullable == Some(false) {
        expr.push_str(".notNull()");
    }
    if let Some(default) = col.default.as_deref().filter(|d| !d.is_empty()) {
        if base == "timestamp" && default.eq_ignore_ascii_case("current_timestamp") {
            expr.push_str(".defaultNow()");
        } else {
            expr.push_str(&format!(".default({})", default));
        }
    }
    if known.is_none() {
        let original = col.column_type.replace("*/", "* /");
        expr.push_str(&format!(" /* Original type: {} */", original));
    }
    format!("  {}: {},", col.name, expr)
}

pub fn render_table(table: &LooseTable) -> String {
    let lines: Vec<String> = table.columns.iter().map(render_column).collect();
    format!(
        "export const {} = pgTable(\"{}\", {{\n{}\n}});",
        table.name,
        table.name,
        lines.join("\n")
    )
}

/// Render the loose form. Unknown types degrade to annotated text columns.
pub fn generate(schema: &LooseSchema) -> String {
    let tables: Vec<String> = schema.tables.iter().map(render_table).collect();
    format!("{}\n\n{}\n", IMPORT_LINE, tables.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: &str) -> LooseColumn {
        LooseColumn {
            name: name.into(),
            column_type: ty.into(),
            unique: false,
            nullable: None,
            default: None,
        }
    }

    #[test]
    fn parse_type_splits_size() {
        assert_eq!(parse_type("VARCHAR(100)"), ("varchar".into(), Some("100".into())));
        assert_eq!(parse_type("text"), ("text".into(), None));
        assert_eq!(parse_type("double precision"), ("double precision".into(), None));
        assert_eq!(
            parse_type("Character-Varying(20)"),
            ("character varying".into(), Some("20".into()))
        );
        assert_eq!(parse_type("decimal(10,2)"), ("decimal".into(), None));
        assert_eq!(parse_type("timestamp with time zone"), ("timestamp".into(), None));
        assert_eq!(parse_type("integer unsigned"), ("integer".into(), None));
        assert_eq!(parse_type("varchar(64) not null"), ("varchar".into(), Some("64".into())));
    }

    #[test]
    fn qualified_types_map_by_leading_word() {
        let mut c = col("created_at", "timestamp with time zone");
        c.default = Some("CURRENT_TIMESTAMP".into());
        assert_eq!(render_column(&c), "  created_at: timestamp().defaultNow(),");

        assert_eq!(render_column(&col("hits", "integer unsigned")), "  hits: integer(),");
        assert_eq!(render_column(&col("opens", "time without time zone")), "  opens: time(),");
    }

    #[test]
    fn annotation_cannot_close_its_comment() {
        let rendered = render_column(&col("x", "money */ evil() /*"));
        assert_eq!(rendered, "  x: text() /* Original type: money * / evil() /* */,");
        assert_eq!(rendered.matches("*/").count(), 1);
    }

    #[test]
    fn varchar_defaults_to_255() {
        assert_eq!(render_column(&col("name", "varchar")), "  name: varchar(255),");
    }

    #[test]
    fn absent_nullable_flag_means_nullable() {
        let mut c = col("age", "int");
        assert_eq!(render_column(&c), "  age: integer(),");
        c.nullable = Some(true);
        assert_eq!(render_column(&c), "  age: integer(),");
        c.nullable = Some(false);
        assert_eq!(render_column(&c), "  age: integer().notNull(),");
    }

    #[test]
    fn current_timestamp_becomes_default_now() {
        let mut c = col("created_at", "timestamp");
        c.default = Some("CURRENT_TIMESTAMP".into());
        assert_eq!(render_column(&c), "  created_at: timestamp().defaultNow(),");

        let mut d = col("label", "text");
        d.default = Some("'none'".into());
        assert_eq!(render_column(&d), "  label: text().default('none'),");
    }

    #[test]
    fn unknown_type_keeps_original_as_annotation() {
        let mut c = col("amount", "money");
        c.nullable = Some(false);
        assert_eq!(
            render_column(&c),
            "  amount: text().notNull() /* Original type: money */,"
        );
    }
}
