//! Query plans and their rendering to parameter-bound SQL.

use std::fmt::{self, Write as _};

pub(crate) const CATALOG_TABLE: &str = "feed_products_sample";
pub(crate) const RULES_TABLE: &str = "feed_product_restrictions";

/// Marker carried in the product code of historical price points.
pub(crate) const HISTORICAL_MARKER: &str = "HIST";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Catalog,
    /// Catalog rows (`p`) joined to their rule records (`r`).
    CatalogWithRules,
}

impl Source {
    fn sql(self) -> String {
        match self {
            Source::Catalog => CATALOG_TABLE.to_string(),
            Source::CatalogWithRules => {
                format!("{CATALOG_TABLE} p\nJOIN {RULES_TABLE} r ON p.id = r.product_id")
            }
        }
    }
}

/// One predicate. All predicates of a plan are AND-combined.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Filter {
    /// Case-insensitive containment.
    Contains { column: &'static str, value: String },
    Equals { column: &'static str, value: String },
    /// The column carries the given marker somewhere in its value.
    Marked { column: &'static str, marker: &'static str },
    /// Boolean column stored as 0/1 is set.
    Flag(&'static str),
    NotNull(&'static str),
    AtLeast { column: &'static str, value: f64 },
    AtMost { column: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryPlan {
    pub(crate) projection: Vec<&'static str>,
    pub(crate) source: Source,
    pub(crate) filters: Vec<Filter>,
    pub(crate) grouping: Vec<&'static str>,
    pub(crate) ordering: Vec<(&'static str, Direction)>,
    pub(crate) limit: Option<u32>,
}

impl QueryPlan {
    pub(crate) fn new(source: Source, projection: &[&'static str]) -> Self {
        Self {
            projection: projection.to_vec(),
            source,
            filters: Vec::new(),
            grouping: Vec::new(),
            ordering: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub(crate) fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds `filter` only when `value` is known.
    #[must_use]
    pub(crate) fn filter_if<T>(self, value: Option<T>, filter: impl FnOnce(T) -> Filter) -> Self {
        match value {
            Some(value) => self.filter(filter(value)),
            None => self,
        }
    }

    #[must_use]
    pub(crate) fn group_by(mut self, columns: &[&'static str]) -> Self {
        self.grouping = columns.to_vec();
        self
    }

    #[must_use]
    pub(crate) fn order_by(mut self, column: &'static str, direction: Direction) -> Self {
        self.ordering.push((column, direction));
        self
    }

    #[must_use]
    pub(crate) fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Renders the plan. Every filter value becomes a numbered parameter.
    pub(crate) fn to_sql(&self) -> SqlQuery {
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {}\nFROM {}",
            self.projection.join(", "),
            self.source.sql()
        );

        for (i, filter) in self.filters.iter().enumerate() {
            sql.push_str(if i == 0 { "\nWHERE " } else { "\n  AND " });
            sql.push_str(&filter_sql(filter, &mut params));
        }
        if !self.grouping.is_empty() {
            let _ = write!(sql, "\nGROUP BY {}", self.grouping.join(", "));
        }
        if !self.ordering.is_empty() {
            let ordering: Vec<String> = self
                .ordering
                .iter()
                .map(|(column, direction)| format!("{column} {}", direction.sql()))
                .collect();
            let _ = write!(sql, "\nORDER BY {}", ordering.join(", "));
        }
        if let Some(limit) = self.limit {
            let _ = write!(sql, "\nLIMIT {limit}");
        }

        SqlQuery { sql, params }
    }
}

fn filter_sql(filter: &Filter, params: &mut Vec<Param>) -> String {
    let mut bind = |param: Param| {
        params.push(param);
        format!("?{}", params.len())
    };
    match filter {
        Filter::Contains { column, value } => {
            let pattern = format!("%{}%", escape_like(&value.to_lowercase()));
            format!("LOWER({column}) LIKE {} ESCAPE '\\'", bind(Param::Text(pattern)))
        }
        Filter::Equals { column, value } => {
            format!("{column} = {}", bind(Param::Text(value.clone())))
        }
        Filter::Marked { column, marker } => {
            format!("{column} LIKE {}", bind(Param::Text(format!("%{marker}%"))))
        }
        Filter::Flag(column) => format!("{column} = 1"),
        Filter::NotNull(column) => format!("{column} IS NOT NULL"),
        Filter::AtLeast { column, value } => format!("{column} >= {}", bind(Param::Real(*value))),
        Filter::AtMost { column, value } => format!("{column} <= {}", bind(Param::Real(*value))),
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Param {
    Text(String),
    Real(f64),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Param::Real(value) => write!(f, "{value}"),
        }
    }
}

/// SQL text plus the values bound to its `?N` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlQuery {
    pub(crate) sql: String,
    pub(crate) params: Vec<Param>,
}

impl SqlQuery {
    /// A statement with no bound parameters.
    pub(crate) fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .enumerate()
                .map(|(i, param)| format!("?{} = {param}", i + 1))
                .collect();
            write!(f, "\n-- params: {}", params.join(", "))?;
        }
        Ok(())
    }
}
