//! Stored-procedure calls and runtime parameter typing.
//!
//! Parameter types come from a closed whitelist: a runtime [`Value`] either
//! resolves to one of the seven supported scalar types or the call is
//! refused with an error naming the value and the procedure. The whitelist
//! is deliberately a tagged enum, not a fall-through; adding a type means
//! adding a variant.

use crate::value::Value;

/// The seven parameter types a procedure call may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Text,
    /// Arbitrary-precision numeric (`rust_decimal::Decimal`).
    Numeric,
    /// 32-bit integer.
    Int,
    Double,
    /// 64-bit integer.
    BigInt,
    Date,
    Bool,
}

impl ScalarType {
    /// Resolve a runtime value against the whitelist. `None` means the
    /// value's type is not supported as a procedure parameter; note that
    /// null is unresolvable, there is no type to infer from it.
    pub fn of(value: &Value) -> Option<ScalarType> {
        match value {
            Value::Text(_) => Some(ScalarType::Text),
            Value::Decimal(_) => Some(ScalarType::Numeric),
            Value::Int(_) => Some(ScalarType::Int),
            Value::Double(_) => Some(ScalarType::Double),
            Value::BigInt(_) => Some(ScalarType::BigInt),
            Value::Date(_) => Some(ScalarType::Date),
            Value::Bool(_) => Some(ScalarType::Bool),
            _ => None,
        }
    }

    /// The PostgreSQL type this parameter binds as.
    pub fn sql_type(self) -> &'static str {
        match self {
            ScalarType::Text => "text",
            ScalarType::Numeric => "numeric",
            ScalarType::Int => "int4",
            ScalarType::Double => "float8",
            ScalarType::BigInt => "int8",
            ScalarType::Date => "date",
            ScalarType::Bool => "bool",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScalarType::Text => "text",
            ScalarType::Numeric => "numeric",
            ScalarType::Int => "integer",
            ScalarType::Double => "double",
            ScalarType::BigInt => "bigint",
            ScalarType::Date => "date",
            ScalarType::Bool => "boolean",
        };
        write!(f, "{}", name)
    }
}

/// One named, typed parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcParam {
    pub name: String,
    pub ty: ScalarType,
    pub value: Value,
}

/// A procedure invocation as handed to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub name: String,
    pub params: Vec<ProcParam>,
}

impl ProcedureCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(
        mut self,
        name: impl Into<String>,
        ty: ScalarType,
        value: impl Into<Value>,
    ) -> Self {
        self.params.push(ProcParam {
            name: name.into(),
            ty,
            value: value.into(),
        });
        self
    }

    /// Look a parameter up by name, the usual accessor inside procedure
    /// implementations.
    pub fn param(&self, name: &str) -> Option<&ProcParam> {
        self.params.iter().find(|p| p.name == name)
    }
}
