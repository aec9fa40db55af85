use std::fmt;
use std::str::FromStr;

/// Returned when a closed-enumeration value is not one of its known spellings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// "double-precision", "double_precision" and "DOUBLE PRECISION" all compare equal.
fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Uuid,
    Varchar,
    Text,
    Integer,
    BigInt,
    SmallInt,
    Decimal,
    Numeric,
    Real,
    DoublePrecision,
    Boolean,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Jsonb,
    Json,
    TextArray,
    IntegerArray,
    UuidArray,
    Bytea,
    Inet,
    Cidr,
    MacAddr,
}

impl ColumnType {
    pub const ALL: [ColumnType; 24] = [
        ColumnType::Uuid,
        ColumnType::Varchar,
        ColumnType::Text,
        ColumnType::Integer,
        ColumnType::BigInt,
        ColumnType::SmallInt,
        ColumnType::Decimal,
        ColumnType::Numeric,
        ColumnType::Real,
        ColumnType::DoublePrecision,
        ColumnType::Boolean,
        ColumnType::Date,
        ColumnType::Time,
        ColumnType::Timestamp,
        ColumnType::TimestampTz,
        ColumnType::Jsonb,
        ColumnType::Json,
        ColumnType::TextArray,
        ColumnType::IntegerArray,
        ColumnType::UuidArray,
        ColumnType::Bytea,
        ColumnType::Inet,
        ColumnType::Cidr,
        ColumnType::MacAddr,
    ];

    /// PostgreSQL spelling, as accepted on the wire.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Uuid => "UUID",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Real => "REAL",
            ColumnType::DoublePrecision => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::TimestampTz => "TIMESTAMPTZ",
            ColumnType::Jsonb => "JSONB",
            ColumnType::Json => "JSON",
            ColumnType::TextArray => "TEXT[]",
            ColumnType::IntegerArray => "INTEGER[]",
            ColumnType::UuidArray => "UUID[]",
            ColumnType::Bytea => "BYTEA",
            ColumnType::Inet => "INET",
            ColumnType::Cidr => "CIDR",
            ColumnType::MacAddr => "MACADDR",
        }
    }

    /// Name of the drizzle `pg-core` constructor that builds this column.
    /// Array types use the constructor of their element type.
    pub fn constructor(self) -> &'static str {
        match self {
            ColumnType::Uuid | ColumnType::UuidArray => "uuid",
            ColumnType::Varchar => "varchar",
            ColumnType::Text | ColumnType::TextArray => "text",
            ColumnType::Integer | ColumnType::IntegerArray => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::SmallInt => "smallint",
            ColumnType::Decimal => "decimal",
            ColumnType::Numeric => "numeric",
            ColumnType::Real => "real",
            ColumnType::DoublePrecision => "doublePrecision",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Timestamp | ColumnType::TimestampTz => "timestamp",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Json => "json",
            ColumnType::Bytea => "bytea",
            ColumnType::Inet => "inet",
            ColumnType::Cidr => "cidr",
            ColumnType::MacAddr => "macaddr",
        }
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            ColumnType::TextArray | ColumnType::IntegerArray | ColumnType::UuidArray
        )
    }

    pub fn supports_length(self) -> bool {
        matches!(self, ColumnType::Varchar)
    }

    pub fn supports_auto_increment(self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::BigInt | ColumnType::SmallInt
        )
    }
}

impl FromStr for ColumnType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut wanted = normalize_token(s);
        if let Some(element) = wanted.strip_suffix(" ARRAY") {
            wanted = format!("{}[]", element);
        }
        ColumnType::ALL
            .into_iter()
            .find(|ty| ty.sql_name() == wanted)
            .ok_or_else(|| UnknownVariant {
                kind: "column type",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    Btree,
    Hash,
    Gin,
    Gist,
    Spgist,
    Brin,
}

impl IndexType {
    pub const ALL: [IndexType; 6] = [
        IndexType::Btree,
        IndexType::Hash,
        IndexType::Gin,
        IndexType::Gist,
        IndexType::Spgist,
        IndexType::Brin,
    ];

    pub fn sql_name(self) -> &'static str {
        match self {
            IndexType::Btree => "BTREE",
            IndexType::Hash => "HASH",
            IndexType::Gin => "GIN",
            IndexType::Gist => "GIST",
            IndexType::Spgist => "SPGIST",
            IndexType::Brin => "BRIN",
        }
    }
}

impl FromStr for IndexType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_token(s);
        IndexType::ALL
            .into_iter()
            .find(|ty| ty.sql_name() == wanted)
            .ok_or_else(|| UnknownVariant {
                kind: "index type",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl ReferentialAction {
    pub const ALL: [ReferentialAction; 5] = [
        ReferentialAction::Cascade,
        ReferentialAction::Restrict,
        ReferentialAction::SetNull,
        ReferentialAction::SetDefault,
        ReferentialAction::NoAction,
    ];

    pub fn sql_name(self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }

    /// Lower-case spelling expected by drizzle's `onUpdate`/`onDelete`.
    pub fn drizzle_name(self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "cascade",
            ReferentialAction::Restrict => "restrict",
            ReferentialAction::SetNull => "set null",
            ReferentialAction::SetDefault => "set default",
            ReferentialAction::NoAction => "no action",
        }
    }
}

impl FromStr for ReferentialAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_token(s);
        ReferentialAction::ALL
            .into_iter()
            .find(|action| action.sql_name() == wanted)
            .ok_or_else(|| UnknownVariant {
                kind: "referential action",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMeta {
    pub identifier: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub id: Option<String>,
    pub identifier: String,
    pub name: String,
    pub column_type: ColumnType,
    pub length: Option<u32>,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub is_auto_increment: bool,
    pub column_order: u32,
    pub default_value: Option<String>,
    pub check_constraint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub id: Option<String>,
    pub identifier: String,
    pub name: String,
    /// Column names in index order, already trimmed.
    pub columns: Vec<String>,
    pub index_type: IndexType,
    pub is_unique: bool,
    pub where_clause: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    pub id: Option<String>,
    pub constraint_name: String,
    pub source_column: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
    pub is_deferrable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub identifier: String,
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

/// The strict request form: schema metadata plus fully typed tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicSchema {
    pub schema: SchemaMeta,
    pub tables: Vec<TableDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseColumn {
    pub name: String,
    /// Free-form SQL type such as `varchar(100)` or `money`.
    pub column_type: String,
    pub unique: bool,
    /// `None` means the flag was absent, which is treated as nullable.
    pub nullable: Option<bool>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseTable {
    pub name: String,
    pub columns: Vec<LooseColumn>,
}

/// The lightweight request form with plain type strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseSchema {
    pub tables: Vec<LooseTable>,
}

/// A validated schema request. Each form has its own generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaInput {
    Strict(DynamicSchema),
    Loose(LooseSchema),
}

impl SchemaInput {
    pub fn table_count(&self) -> usize {
        match self {
            SchemaInput::Strict(schema) => schema.tables.len(),
            SchemaInput::Loose(schema) => schema.tables.len(),
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, SchemaInput::Strict(_))
    }
}
