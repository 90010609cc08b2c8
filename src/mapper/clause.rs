//! WHERE / ORDER BY / pagination clause compilation.
//!
//! Filter arguments arrive as an ordered map of field name → value (or
//! explicit operator/value pair). Compilation walks the map in caller
//! order, drops anything the schema does not declare, and emits a SeaQuery
//! condition tree. Dropping is deliberate: a schema-unknown or malformed
//! filter is treated as "no constraint", never as an error and never as raw
//! SQL text.

use sea_query::{Alias, Cond, Condition, Expr, Order, PostgresQueryBuilder, Query};

use crate::entity::Value;
use crate::schema::{FieldType, Fields, field_type};

/// Keys that drive ordering/pagination instead of WHERE compilation.
pub const RESERVED_KEYS: [&str; 5] = ["order", "orderby", "per_page", "offset", "page"];

/// Filter comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Exact match (the default for bare values).
    Eq,
    In,
    NotIn,
    Between,
    NotBetween,
    Like,
    NotLike,
}

/// Operator operand: a single value or a sequence.
#[derive(Debug, Clone)]
pub enum Operand {
    One(Value),
    Many(Vec<Value>),
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::One(v)
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::One(Value::Int(v))
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Operand::One(Value::Str(v.to_string()))
    }
}

impl From<String> for Operand {
    fn from(v: String) -> Self {
        Operand::One(Value::Str(v))
    }
}

impl From<Vec<Value>> for Operand {
    fn from(v: Vec<Value>) -> Self {
        Operand::Many(v)
    }
}

impl From<Vec<i64>> for Operand {
    fn from(v: Vec<i64>) -> Self {
        Operand::Many(v.into_iter().map(Value::Int).collect())
    }
}

impl From<Vec<&str>> for Operand {
    fn from(v: Vec<&str>) -> Self {
        Operand::Many(v.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<String>> for Operand {
    fn from(v: Vec<String>) -> Self {
        Operand::Many(v.into_iter().map(Value::Str).collect())
    }
}

/// One filter entry: operator plus operand.
#[derive(Debug, Clone)]
pub struct Filter {
    pub op: Op,
    pub operand: Operand,
}

/// Ordered filter-argument map.
///
/// Keys are compiled in insertion order. Reserved keys ([`RESERVED_KEYS`])
/// are read by the ordering/pagination compilers and never reach WHERE.
#[derive(Debug, Clone, Default)]
pub struct Args {
    entries: Vec<(String, Filter)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bare value, compiled as equality.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries.push((
            key.to_string(),
            Filter {
                op: Op::Eq,
                operand: Operand::One(value.into()),
            },
        ));
        self
    }

    /// Add an explicit operator/operand pair.
    pub fn set_op(mut self, key: &str, op: Op, operand: impl Into<Operand>) -> Self {
        self.entries.push((
            key.to_string(),
            Filter {
                op,
                operand: operand.into(),
            },
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Filter)> {
        self.entries.iter()
    }

    /// First bare value stored under the key, if any.
    fn scalar(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find_map(|(k, f)| {
            if k == key
                && let Operand::One(v) = &f.operand
            {
                Some(v)
            } else {
                None
            }
        })
    }
}

/// Boolean operator joining the per-field clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolOp {
    #[default]
    And,
    Or,
}

/// Compiled pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageClause {
    pub limit: u64,
    pub offset: u64,
}

/// Compile the WHERE condition tree from the argument map.
///
/// Returns `None` when no clause was produced, in which case the statement
/// carries no WHERE at all (no filtering).
pub fn compile_where(schema: Fields, args: &Args, bool_op: BoolOp) -> Option<Condition> {
    let mut cond = match bool_op {
        BoolOp::And => Cond::all(),
        BoolOp::Or => Cond::any(),
    };
    let mut clauses = 0usize;

    for (key, filter) in args.iter() {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let Some(ty) = field_type(schema, key) else {
            tracing::debug!(field = %key, "unknown filter field; skipping");
            continue;
        };

        let col = Expr::col(Alias::new(key.as_str()));
        let expr = match filter.op {
            Op::Eq => match &filter.operand {
                Operand::One(v) => ty.coerce(v).map(|v| col.eq(v)),
                Operand::Many(_) => {
                    tracing::debug!(field = %key, "sequence operand for equality; skipping");
                    None
                }
            },
            Op::In | Op::NotIn => {
                let values = in_list(ty, &filter.operand);
                if values.is_empty() {
                    // Deliberate permissive default: an empty list means
                    // "unconstrained", not "match nothing".
                    tracing::debug!(field = %key, "empty IN list; treated as unconstrained");
                    None
                } else if filter.op == Op::In {
                    Some(col.is_in(values))
                } else {
                    Some(col.is_not_in(values))
                }
            }
            Op::Between | Op::NotBetween => match &filter.operand {
                Operand::Many(values) if values.len() == 2 => {
                    match (ty.coerce(&values[0]), ty.coerce(&values[1])) {
                        (Some(low), Some(high)) => {
                            if filter.op == Op::Between {
                                Some(col.between(low, high))
                            } else {
                                Some(col.not_between(low, high))
                            }
                        }
                        _ => None,
                    }
                }
                _ => {
                    tracing::debug!(field = %key, "BETWEEN needs exactly two values; skipping");
                    None
                }
            },
            Op::Like | Op::NotLike => match &filter.operand {
                Operand::One(v) => v.to_text().map(|text| {
                    let pattern = format!("%{}%", escape_like_wildcards(&text));
                    if filter.op == Op::Like {
                        col.like(pattern)
                    } else {
                        col.not_like(pattern)
                    }
                }),
                Operand::Many(_) => None,
            },
        };

        if let Some(expr) = expr {
            cond = cond.add(expr);
            clauses += 1;
        }
    }

    (clauses > 0).then_some(cond)
}

/// Compile the ORDER BY target from the argument map.
///
/// A missing or schema-unknown `orderby` yields `None` (storage natural
/// order). Direction defaults to descending.
pub fn compile_order_by(schema: Fields, args: &Args) -> Option<(String, Order)> {
    let orderby = args.scalar("orderby")?.as_str()?.to_string();
    field_type(schema, &orderby)?;

    let order = match args.scalar("order").and_then(Value::as_str) {
        Some(dir) if dir.eq_ignore_ascii_case("asc") => Order::Asc,
        _ => Order::Desc,
    };
    Some((orderby, order))
}

/// Compile the pagination window from the argument map.
///
/// Defaults: `per_page = 10`, `page = 1`, `offset = 0`. A zero `offset`
/// with a page number computes `offset = (page - 1) * per_page`. The clause
/// is emitted only when both offset and per-page are non-zero; `per_page =
/// 0` always means "no limit".
pub fn compile_paged(args: &Args) -> Option<PageClause> {
    let read = |key: &str, default: u64| -> u64 {
        args.scalar(key)
            .and_then(Value::as_i64)
            .map(|v| v.max(0) as u64)
            .unwrap_or(default)
    };

    let per_page = read("per_page", 10);
    let page = read("page", 1);
    let mut offset = read("offset", 0);

    if offset == 0 && page > 0 {
        offset = page.saturating_sub(1) * per_page;
    }

    (offset > 0 && per_page > 0).then_some(PageClause {
        limit: per_page,
        offset,
    })
}

/// Render a condition tree as a standalone predicate fragment.
///
/// Used where a clause has to travel as text (the listing-engine modifier
/// boundary); rendering goes through the SeaQuery builder so values keep
/// their escaping.
pub fn render_predicate(cond: Condition) -> String {
    let sql = Query::select()
        .expr(Expr::val(1))
        .cond_where(cond)
        .to_string(PostgresQueryBuilder);
    sql.split_once(" WHERE ")
        .map(|(_, clause)| clause.to_string())
        .unwrap_or_default()
}

/// Coerce an IN/NOT IN operand into a typed value list.
///
/// Comma-separated strings are split; elements that do not fit the declared
/// field type are dropped.
fn in_list(ty: FieldType, operand: &Operand) -> Vec<sea_query::Value> {
    match operand {
        Operand::Many(values) => values.iter().filter_map(|v| ty.coerce(v)).collect(),
        Operand::One(Value::Str(s)) if s.contains(',') => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| ty.coerce(&Value::Str(part.to_string())))
            .collect(),
        Operand::One(v) => ty.coerce(v).into_iter().collect(),
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
pub fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
