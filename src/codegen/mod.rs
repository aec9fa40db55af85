pub mod loose;
pub mod strict;

use crate::ir::SchemaInput;
use std::collections::BTreeSet;

/// Render drizzle source for a validated schema. Pure and deterministic:
/// the same input always yields byte-identical output.
pub fn generate_drizzle(input: &SchemaInput) -> String {
    match input {
        SchemaInput::Strict(schema) => strict::generate(schema),
        SchemaInput::Loose(schema) => loose::generate(schema),
    }
}

/// First `limit` characters of generated source followed by `...`.
pub fn preview(source: &str, limit: usize) -> String {
    let cut = source
        .char_indices()
        .nth(limit)
        .map(|(i, _)| i)
        .unwrap_or(source.len());
    format!("{}...", &source[..cut])
}

/// Names referenced by generated source, kept sorted.
///
/// `sql` comes from `drizzle-orm`; everything else from `drizzle-orm/pg-core`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    names: BTreeSet<&'static str>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str) {
        self.names.insert(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.contains("sql") {
            out.push_str("import { sql } from \"drizzle-orm\";\n");
        }
        let core: Vec<&str> = self.names().filter(|n| *n != "sql").collect();
        out.push_str(&format!(
            "import {{ {} }} from \"drizzle-orm/pg-core\";\n",
            core.join(", ")
        ));
        out
    }
}

/// Names listed by the `drizzle-orm/pg-core` import line of generated source.
pub fn parse_import_line(source: &str) -> Option<Vec<String>> {
    let line = source
        .lines()
        .find(|l| l.ends_with("from \"drizzle-orm/pg-core\";"))?;
    let inner = line.strip_prefix("import {")?.split('}').next()?;
    Some(
        inner
            .split(',')
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect(),
    )
}
