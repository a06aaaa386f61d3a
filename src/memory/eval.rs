//! Criteria evaluation over in-memory tables.
//!
//! Mirrors what [`crate::criteria::sql`] renders for PostgreSQL, on plain
//! `Record`s: the same null propagation (a null on either side of a
//! comparison matches nothing), `%`/`_` wildcards with backslash escapes for
//! LIKE, NULLS LAST on ascending and NULLS FIRST on descending sorts.

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;

use crate::criteria::{
    AliasDef, Criteria, JoinKind, Projection, SortDir, SortKey, COUNT_COLUMN,
};
use crate::criteria::filter::Filter;
use crate::memory::store::Table;
use crate::record::Record;
use crate::session::SessionError;
use crate::value::Value;

/// A base row plus the to-one rows its aliases resolved to. Left-outer
/// aliases may resolve to nothing.
struct EvalRow<'a> {
    base: &'a Record,
    joined: HashMap<&'a str, Option<&'a Record>>,
}

impl<'a> EvalRow<'a> {
    /// Resolves `path` to a value. Dotted paths go through an alias; a miss
    /// anywhere (no joined row, no such column) reads as SQL null.
    fn lookup(&self, path: &str) -> Option<&'a Value> {
        match path.split_once('.') {
            Some((alias, column)) => self
                .joined
                .get(alias)
                .copied()
                .flatten()
                .and_then(|row| row.get(column)),
            None => self.base.get(path),
        }
    }
}

type LikeCache = HashMap<(String, bool), Regex>;

pub(crate) fn select(
    tables: &HashMap<String, Table>,
    criteria: &Criteria,
) -> Result<Vec<Record>, SessionError> {
    let base_rows: &[Record] = tables
        .get(criteria.entity.name)
        .map(|t| t.rows.as_slice())
        .unwrap_or(&[]);

    // Join resolution first, so filters and sorts can reach alias paths.
    let mut rows = Vec::with_capacity(base_rows.len());
    for base in base_rows {
        if let Some(row) = resolve_aliases(tables, criteria, base)? {
            rows.push(row);
        }
    }

    let mut patterns = LikeCache::new();
    let mut matched = Vec::with_capacity(rows.len());
    for row in rows {
        let mut keep = true;
        for filter in &criteria.filters {
            if !matches(filter, &row, &mut patterns)? {
                keep = false;
                break;
            }
        }
        if keep {
            matched.push(row);
        }
    }

    if let Projection::Count = criteria.projection {
        // Aggregation collapses to one row; paging does not apply.
        let count = Record::new().with(COUNT_COLUMN, Value::BigInt(matched.len() as i64));
        return Ok(vec![count]);
    }

    sort_rows(&mut matched, &criteria.orders);

    match &criteria.projection {
        Projection::Entity => Ok(paginate(criteria, matched.iter().map(|r| r.base.clone()))),
        Projection::Columns(paths) => Ok(paginate(
            criteria,
            matched.iter().map(|row| {
                paths
                    .iter()
                    .map(|p| (p.clone(), row.lookup(p).cloned().unwrap_or(Value::Null)))
                    .collect()
            }),
        )),
        Projection::Group(path) => {
            let mut groups: Vec<Value> = Vec::new();
            for row in &matched {
                let value = row.lookup(path).cloned().unwrap_or(Value::Null);
                if !groups.iter().any(|seen| same_group(seen, &value)) {
                    groups.push(value);
                }
            }
            Ok(paginate(
                criteria,
                groups.into_iter().map(|v| Record::new().with(path.as_str(), v)),
            ))
        }
        Projection::Count => unreachable!("handled before sorting"),
    }
}

fn resolve_aliases<'a>(
    tables: &'a HashMap<String, Table>,
    criteria: &'a Criteria,
    base: &'a Record,
) -> Result<Option<EvalRow<'a>>, SessionError> {
    let mut joined = HashMap::with_capacity(criteria.aliases.len());
    for alias in &criteria.aliases {
        match resolve_one(tables, alias, base)? {
            Some(row) => {
                joined.insert(alias.alias.as_str(), Some(row));
            }
            None if alias.join == JoinKind::Inner => return Ok(None),
            None => {
                joined.insert(alias.alias.as_str(), None);
            }
        }
    }
    Ok(Some(EvalRow { base, joined }))
}

fn resolve_one<'a>(
    tables: &'a HashMap<String, Table>,
    alias: &AliasDef,
    base: &'a Record,
) -> Result<Option<&'a Record>, SessionError> {
    let relation = alias.relation().ok_or_else(|| {
        SessionError::Backend(format!("association \"{}\" was not resolved", alias.path))
    })?;
    match alias.join {
        JoinKind::Inner | JoinKind::LeftOuter => {}
        JoinKind::RightOuter | JoinKind::FullOuter => {
            return Err(SessionError::Unsupported(
                "right and full outer joins in the reference engine".into(),
            ));
        }
    }

    let owner = match base.get(relation.owner_column) {
        Some(v) if !v.is_null() => v,
        _ => return Ok(None),
    };
    Ok(tables.get(relation.target).and_then(|table| {
        table
            .rows
            .iter()
            .find(|row| row.get(relation.target_column).is_some_and(|v| v.equals(owner)))
    }))
}

fn matches(
    filter: &Filter,
    row: &EvalRow<'_>,
    patterns: &mut LikeCache,
) -> Result<bool, SessionError> {
    Ok(match filter {
        Filter::Eq { path, value } => {
            row.lookup(path).is_some_and(|v| v.equals(value))
        }
        Filter::Ne { path, value } => row
            .lookup(path)
            .is_some_and(|v| !v.is_null() && !value.is_null() && !v.equals(value)),
        Filter::Ge { path, value } => cmp(row, path, value)
            .is_some_and(|o| o != Ordering::Less),
        Filter::Le { path, value } => cmp(row, path, value)
            .is_some_and(|o| o != Ordering::Greater),
        Filter::Between { path, low, high } => {
            cmp(row, path, low).is_some_and(|o| o != Ordering::Less)
                && cmp(row, path, high).is_some_and(|o| o != Ordering::Greater)
        }
        Filter::Like {
            path,
            pattern,
            case_insensitive,
        } => match row.lookup(path) {
            Some(Value::Text(text)) => {
                like_pattern(patterns, pattern, *case_insensitive)?.is_match(text)
            }
            _ => false,
        },
        Filter::In { path, values } => row
            .lookup(path)
            .is_some_and(|v| values.iter().any(|candidate| v.equals(candidate))),
        Filter::IsNull { path } => row.lookup(path).map_or(true, Value::is_null),
        Filter::IsNotNull { path } => row.lookup(path).is_some_and(|v| !v.is_null()),
        Filter::IsEmpty { path } => row
            .lookup(path)
            .and_then(value_len)
            .is_some_and(|len| len == 0),
        Filter::IsNotEmpty { path } => row
            .lookup(path)
            .and_then(value_len)
            .is_some_and(|len| len > 0),
        Filter::And(filters) => {
            for f in filters {
                if !matches(f, row, patterns)? {
                    return Ok(false);
                }
            }
            true
        }
        Filter::Or(filters) => {
            for f in filters {
                if matches(f, row, patterns)? {
                    return Ok(true);
                }
            }
            false
        }
    })
}

fn cmp(row: &EvalRow<'_>, path: &str, against: &Value) -> Option<Ordering> {
    row.lookup(path).and_then(|v| v.compare(against))
}

/// Length of a value under `char_length`-style emptiness checks. Kinds with
/// no notion of length never match either emptiness filter.
fn value_len(value: &Value) -> Option<usize> {
    match value {
        Value::Text(s) => Some(s.len()),
        Value::Bytes(b) => Some(b.len()),
        Value::Json(serde_json::Value::Array(a)) => Some(a.len()),
        Value::Json(serde_json::Value::Object(o)) => Some(o.len()),
        Value::Json(serde_json::Value::String(s)) => Some(s.len()),
        _ => None,
    }
}

/// Nulls form one group, like SQL GROUP BY treats them.
fn same_group(a: &Value, b: &Value) -> bool {
    (a.is_null() && b.is_null()) || a.equals(b)
}

fn like_pattern<'c>(
    cache: &'c mut LikeCache,
    pattern: &str,
    case_insensitive: bool,
) -> Result<&'c Regex, SessionError> {
    let key = (pattern.to_owned(), case_insensitive);
    if !cache.contains_key(&key) {
        let regex = like_to_regex(pattern, case_insensitive)?;
        cache.insert(key.clone(), regex);
    }
    // Inserted above when absent.
    cache
        .get(&key)
        .ok_or_else(|| SessionError::Backend("LIKE pattern cache miss".into()))
}

/// Translates a SQL LIKE pattern into an anchored regex. `%` spans any run,
/// `_` one character, backslash escapes the next character literally.
fn like_to_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, SessionError> {
    let mut source = String::with_capacity(pattern.len() + 8);
    if case_insensitive {
        source.push_str("(?i)");
    }
    source.push('^');
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    source.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source)
        .map_err(|e| SessionError::Backend(format!("LIKE pattern {:?}: {}", pattern, e)))
}

fn sort_rows(rows: &mut [EvalRow<'_>], orders: &[SortKey]) {
    if orders.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for key in orders {
            let ordering = compare_for_sort(a.lookup(&key.path), b.lookup(&key.path), key.direction);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// PostgreSQL default null placement: last ascending, first descending.
/// Descending is the full reverse of ascending, nulls included.
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>, direction: SortDir) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let ascending = match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
    };
    match direction {
        SortDir::Asc => ascending,
        SortDir::Desc => ascending.reverse(),
    }
}

fn paginate(criteria: &Criteria, rows: impl Iterator<Item = Record>) -> Vec<Record> {
    let skip = criteria.offset.unwrap_or(0) as usize;
    match criteria.limit {
        Some(limit) => rows.skip(skip).take(limit as usize).collect(),
        None => rows.skip(skip).collect(),
    }
}
