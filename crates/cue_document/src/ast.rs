//! Syntax tree for the supported CUE subset.

use std::fmt;

use serde_json::Value;

/// A parsed source file: an optional package clause and the top-level struct.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceFile {
    pub package: Option<String>,
    /// Always an `Expr::Struct` holding the top-level declarations.
    pub root: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Decl {
    Field(Field),
    /// An expression unified into the enclosing struct, e.g. `{ #Base, x: 1 }`.
    Embed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub label: Label,
    pub optional: bool,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Label {
    pub name: String,
    pub kind: LabelKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LabelKind {
    Regular,
    /// `#Name`
    Definition,
    /// `_name`
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    /// `null`, booleans, numbers and strings.
    Literal(Value),
    Kind(Kind),
    /// `_`
    Top,
    Struct(Vec<Decl>),
    List(Vec<Expr>),
    Reference(String),
    Selector(Box<Expr>, String),
    Unify(Box<Expr>, Box<Expr>),
    Disjunction(Vec<Alternative>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Alternative {
    pub value: Expr,
    pub is_default: bool,
}

/// Predeclared basic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    String,
    Int,
    Float,
    Number,
    Bool,
}

impl Kind {
    pub fn from_identifier(name: &str) -> Option<Kind> {
        match name {
            "string" => Some(Kind::String),
            "int" => Some(Kind::Int),
            "float" => Some(Kind::Float),
            "number" => Some(Kind::Number),
            "bool" => Some(Kind::Bool),
            _ => None,
        }
    }

    /// Whether a concrete value is an instance of this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Int => value.is_i64() || value.is_u64(),
            Kind::Float => value.is_f64(),
            Kind::Number => value.is_number(),
            Kind::Bool => value.is_boolean(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::String => "string",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Number => "number",
            Kind::Bool => "bool",
        };
        f.write_str(name)
    }
}
