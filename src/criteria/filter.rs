//! Predicate values and their factories.
//!
//! A [`Filter`] is plain data: sessions interpret it (the reference engine
//! evaluates it, the SQL session renders it). Factories own the null policy:
//! the skippable ones return `Option<Filter>` and yield `None` for a null
//! argument, so an absent filter simply never reaches the criteria.

use crate::value::Value;

/// One node of a predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { path: String, value: Value },
    Ne { path: String, value: Value },
    Ge { path: String, value: Value },
    Le { path: String, value: Value },
    Between { path: String, low: Value, high: Value },
    /// SQL LIKE over the whole pattern; `%`/`_` wildcards apply.
    Like {
        path: String,
        pattern: String,
        case_insensitive: bool,
    },
    In { path: String, values: Vec<Value> },
    IsNull { path: String },
    IsNotNull { path: String },
    IsEmpty { path: String },
    IsNotEmpty { path: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// Equality that always applies. With a null argument this keeps the
    /// original contract of comparing against NULL, which matches nothing.
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Equality that is skipped entirely when the argument is null.
    pub fn eq_not_null(path: impl Into<String>, value: impl Into<Value>) -> Option<Filter> {
        let value = value.into();
        (!value.is_null()).then(|| Filter::Eq {
            path: path.into(),
            value,
        })
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Option<Filter> {
        let value = value.into();
        (!value.is_null()).then(|| Filter::Ne {
            path: path.into(),
            value,
        })
    }

    /// Inclusive lower bound, skipped on null.
    pub fn ge(path: impl Into<String>, value: impl Into<Value>) -> Option<Filter> {
        let value = value.into();
        (!value.is_null()).then(|| Filter::Ge {
            path: path.into(),
            value,
        })
    }

    /// Inclusive upper bound, skipped on null.
    pub fn le(path: impl Into<String>, value: impl Into<Value>) -> Option<Filter> {
        let value = value.into();
        (!value.is_null()).then(|| Filter::Le {
            path: path.into(),
            value,
        })
    }

    /// Inclusive range, skipped when either bound is null; a half-open
    /// range never materializes from this factory.
    pub fn between(
        path: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Option<Filter> {
        let (low, high) = (low.into(), high.into());
        (!low.is_null() && !high.is_null()).then(|| Filter::Between {
            path: path.into(),
            low,
            high,
        })
    }

    /// Substring match: the value is wrapped in `%...%`. Skipped on null.
    pub fn like(path: impl Into<String>, value: impl Into<Value>) -> Option<Filter> {
        Self::contains(path, value, false)
    }

    /// Case-insensitive [`Filter::like`]; also the standalone factory used to
    /// feed optional search terms into a disjunction, where a null term
    /// contributes nothing.
    pub fn ilike(path: impl Into<String>, value: impl Into<Value>) -> Option<Filter> {
        Self::contains(path, value, true)
    }

    /// Substring match that degrades to a match-everything `%` pattern on a
    /// null value instead of being skipped.
    pub fn like_any(path: impl Into<String>, value: impl Into<Value>) -> Filter {
        let value = value.into();
        let pattern = if value.is_null() {
            "%".to_owned()
        } else {
            format!("%{}%", value)
        };
        Filter::Like {
            path: path.into(),
            pattern,
            case_insensitive: false,
        }
    }

    fn contains(
        path: impl Into<String>,
        value: impl Into<Value>,
        case_insensitive: bool,
    ) -> Option<Filter> {
        let value = value.into();
        (!value.is_null()).then(|| Filter::Like {
            path: path.into(),
            pattern: format!("%{}%", value),
            case_insensitive,
        })
    }

    /// Membership test. `None` for the collection skips the directive; an
    /// empty collection applies and matches nothing.
    pub fn is_in<V: Into<Value>>(
        path: impl Into<String>,
        values: Option<Vec<V>>,
    ) -> Option<Filter> {
        values.map(|values| Filter::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn is_null(path: impl Into<String>) -> Filter {
        Filter::IsNull { path: path.into() }
    }

    pub fn is_not_null(path: impl Into<String>) -> Filter {
        Filter::IsNotNull { path: path.into() }
    }

    pub fn is_empty(path: impl Into<String>) -> Filter {
        Filter::IsEmpty { path: path.into() }
    }

    pub fn is_not_empty(path: impl Into<String>) -> Filter {
        Filter::IsNotEmpty { path: path.into() }
    }

    /// Conjoin with another predicate, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Disjoin with another predicate, flattening nested disjunctions.
    pub fn or(self, other: Filter) -> Filter {
        match self {
            Filter::Or(mut filters) => {
                filters.push(other);
                Filter::Or(filters)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    /// Disjunction over whatever predicates are present; `None` when none
    /// are, a bare predicate when only one is.
    pub fn any_of<I>(filters: I) -> Option<Filter>
    where
        I: IntoIterator,
        I::Item: IntoOptionalFilter,
    {
        Self::combine(filters, Filter::Or)
    }

    /// Conjunction counterpart of [`Filter::any_of`].
    pub fn all_of<I>(filters: I) -> Option<Filter>
    where
        I: IntoIterator,
        I::Item: IntoOptionalFilter,
    {
        Self::combine(filters, Filter::And)
    }

    fn combine<I>(filters: I, wrap: fn(Vec<Filter>) -> Filter) -> Option<Filter>
    where
        I: IntoIterator,
        I::Item: IntoOptionalFilter,
    {
        let mut present: Vec<Filter> = filters
            .into_iter()
            .filter_map(IntoOptionalFilter::into_optional_filter)
            .collect();
        match present.len() {
            0 => None,
            1 => present.pop(),
            _ => Some(wrap(present)),
        }
    }
}

/// Accepts both `Filter` and `Option<Filter>` where a predicate may be
/// absent, so skippable factories plug into combinators without ceremony.
pub trait IntoOptionalFilter {
    fn into_optional_filter(self) -> Option<Filter>;
}

impl IntoOptionalFilter for Filter {
    fn into_optional_filter(self) -> Option<Filter> {
        Some(self)
    }
}

impl IntoOptionalFilter for Option<Filter> {
    fn into_optional_filter(self) -> Option<Filter> {
        self
    }
}
