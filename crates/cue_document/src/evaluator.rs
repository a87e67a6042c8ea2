//! Evaluation of a parsed document into a plain, fully concrete value tree.
//!
//! Every location in the document is described by the list of expressions
//! ("conjuncts") that apply to it. Evaluating a location flattens those
//! conjuncts (following references and splitting unifications) and then
//! unifies the resulting structs, lists, scalars and kinds. References are
//! bound lexically but resolve relative to where a struct is evaluated, so a
//! definition embedded at several places sees its own fields at each of them.

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::ast::{Alternative, Decl, Expr, Kind, LabelKind, SourceFile};
use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;

/// Nesting limit guarding against structural cycles such as `a: b: a`.
/// The parser applies the same limit to syntactic nesting.
pub(crate) const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

fn display_path(path: &[Segment]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// How a failed evaluation affects disjunction resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// Values that cannot be unified; eliminates a disjunct.
    Conflict,
    /// A value that is not concrete; keeps a disjunct open.
    Incomplete,
    /// Anything else; aborts evaluation.
    Fatal,
}

#[derive(Debug)]
struct EvalError {
    failure: Failure,
    path: String,
    reason: String,
}

impl EvalError {
    fn new(failure: Failure, path: &[Segment], reason: impl Into<String>) -> Self {
        Self {
            failure,
            path: display_path(path),
            reason: reason.into(),
        }
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Error::Evaluation {
            path: e.path,
            reason: e.reason,
        }
    }
}

type EvalResult<T> = std::result::Result<T, EvalError>;

/// The fields of one struct literal, placed at the location it is evaluated at.
struct Scope<'a> {
    decls: &'a [Decl],
    path: Vec<Segment>,
    parent: Option<Rc<Scope<'a>>>,
}

type Env<'a> = Option<Rc<Scope<'a>>>;

#[derive(Clone)]
enum Conjunct<'a> {
    Expr { expr: &'a Expr, env: Env<'a> },
    Resolved(Value),
}

#[derive(Clone)]
enum Base<'a> {
    Struct {
        decls: &'a [Decl],
        env: Env<'a>,
    },
    List {
        items: &'a [Expr],
        env: Env<'a>,
    },
    Disjunction {
        alternatives: &'a [Alternative],
        env: Env<'a>,
    },
    /// An already evaluated struct or list.
    Resolved(Value),
    Scalar(Value),
    Kind(Kind),
    Top,
}

/// Evaluates the whole document.
pub(crate) fn export(file: &SourceFile) -> Result<Value> {
    let mut evaluator = Evaluator::new(file);
    let conjuncts = evaluator.root_conjuncts();
    Ok(evaluator.evaluate(&[], conjuncts)?)
}

/// Evaluates the value at `path`, or `None` when no field exists there.
pub(crate) fn lookup(file: &SourceFile, path: &[String]) -> Result<Option<Value>> {
    let path: Vec<Segment> = path.iter().cloned().map(Segment::Field).collect();
    let mut evaluator = Evaluator::new(file);
    match evaluator.vertex(&path)? {
        Some(conjuncts) => Ok(Some(evaluator.evaluate(&path, conjuncts)?)),
        None => Ok(None),
    }
}

/// Whether any declaration exists at `path`, without evaluating it.
pub(crate) fn exists(file: &SourceFile, path: &[String]) -> Result<bool> {
    let path: Vec<Segment> = path.iter().cloned().map(Segment::Field).collect();
    let mut evaluator = Evaluator::new(file);
    Ok(evaluator.vertex(&path)?.is_some())
}

struct Evaluator<'a> {
    root: &'a Expr,
    /// Reference targets currently being resolved, for cycle detection.
    resolving: Vec<Vec<Segment>>,
}

impl<'a> Evaluator<'a> {
    fn new(file: &'a SourceFile) -> Self {
        Self {
            root: &file.root,
            resolving: Vec::new(),
        }
    }

    fn root_conjuncts(&self) -> Vec<Conjunct<'a>> {
        vec![Conjunct::Expr {
            expr: self.root,
            env: None,
        }]
    }

    /// Collects the conjuncts declared at `path`.
    fn vertex(&mut self, path: &[Segment]) -> EvalResult<Option<Vec<Conjunct<'a>>>> {
        let mut conjuncts = self.root_conjuncts();
        for (depth, segment) in path.iter().enumerate() {
            conjuncts = self.children(&path[..depth], &conjuncts, segment)?;
            if conjuncts.is_empty() {
                return Ok(None);
            }
        }
        Ok(Some(conjuncts))
    }

    fn children(
        &mut self,
        path: &[Segment],
        conjuncts: &[Conjunct<'a>],
        segment: &Segment,
    ) -> EvalResult<Vec<Conjunct<'a>>> {
        let bases = self.flatten_all(path, conjuncts)?;
        let mut children = Vec::new();
        for base in &bases {
            collect_children(path, base, segment, &mut children);
        }
        Ok(children)
    }

    fn flatten_all(
        &mut self,
        path: &[Segment],
        conjuncts: &[Conjunct<'a>],
    ) -> EvalResult<Vec<Base<'a>>> {
        let mut bases = Vec::new();
        for conjunct in conjuncts {
            match conjunct {
                Conjunct::Expr { expr, env } => self.flatten(path, *expr, env, &mut bases)?,
                Conjunct::Resolved(value) => bases.push(resolved_base(value.clone())),
            }
        }
        Ok(bases)
    }

    fn flatten(
        &mut self,
        path: &[Segment],
        expr: &'a Expr,
        env: &Env<'a>,
        out: &mut Vec<Base<'a>>,
    ) -> EvalResult<()> {
        match expr {
            Expr::Literal(value) => out.push(Base::Scalar(value.clone())),
            Expr::Kind(kind) => out.push(Base::Kind(*kind)),
            Expr::Top => out.push(Base::Top),
            Expr::List(items) => out.push(Base::List {
                items,
                env: env.clone(),
            }),
            Expr::Disjunction(alternatives) => out.push(Base::Disjunction {
                alternatives,
                env: env.clone(),
            }),
            Expr::Unify(lhs, rhs) => {
                self.flatten(path, lhs, env, out)?;
                self.flatten(path, rhs, env, out)?;
            }
            Expr::Struct(decls) => {
                out.push(Base::Struct {
                    decls,
                    env: env.clone(),
                });
                if decls.iter().any(|d| matches!(d, Decl::Embed(_))) {
                    let scope = Some(Rc::new(Scope {
                        decls,
                        path: path.to_vec(),
                        parent: env.clone(),
                    }));
                    for decl in decls {
                        if let Decl::Embed(embedded) = decl {
                            self.flatten(path, embedded, &scope, out)?;
                        }
                    }
                }
            }
            Expr::Reference(_) | Expr::Selector(..) => {
                let target = self.resolve(path, expr, env)?;
                if self.resolving.contains(&target) {
                    return Err(EvalError::new(
                        Failure::Fatal,
                        path,
                        format!("reference cycle through {}", display_path(&target)),
                    ));
                }
                if self.resolving.len() >= MAX_DEPTH {
                    return Err(EvalError::new(
                        Failure::Fatal,
                        path,
                        "reference chain too long",
                    ));
                }

                self.resolving.push(target.clone());
                let result = self.flatten_target(path, &target, out);
                self.resolving.pop();
                result?;
            }
        }
        Ok(())
    }

    fn flatten_target(
        &mut self,
        path: &[Segment],
        target: &[Segment],
        out: &mut Vec<Base<'a>>,
    ) -> EvalResult<()> {
        let conjuncts = self.vertex(target)?.ok_or_else(|| {
            EvalError::new(
                Failure::Fatal,
                path,
                format!("reference {} not found", display_path(target)),
            )
        })?;
        for conjunct in &conjuncts {
            match conjunct {
                Conjunct::Expr { expr, env } => self.flatten(path, *expr, env, out)?,
                Conjunct::Resolved(value) => out.push(resolved_base(value.clone())),
            }
        }
        Ok(())
    }

    /// Absolute location of the field a reference points at.
    fn resolve(&self, path: &[Segment], expr: &Expr, env: &Env<'a>) -> EvalResult<Vec<Segment>> {
        match expr {
            Expr::Reference(name) => {
                let mut scope = env.clone();
                while let Some(current) = scope {
                    let declared = current.decls.iter().any(|decl| {
                        matches!(decl, Decl::Field(field) if field.label.name == *name)
                    });
                    if declared {
                        let mut target = current.path.clone();
                        target.push(Segment::Field(name.clone()));
                        return Ok(target);
                    }
                    scope = current.parent.clone();
                }
                Err(EvalError::new(
                    Failure::Fatal,
                    path,
                    format!("reference \"{name}\" not found"),
                ))
            }
            Expr::Selector(inner, name) => {
                let mut target = self.resolve(path, inner, env)?;
                target.push(Segment::Field(name.clone()));
                Ok(target)
            }
            _ => Err(EvalError::new(
                Failure::Fatal,
                path,
                "selectors are only supported on references",
            )),
        }
    }

    fn evaluate(&mut self, path: &[Segment], conjuncts: Vec<Conjunct<'a>>) -> EvalResult<Value> {
        if path.len() > MAX_DEPTH {
            return Err(EvalError::new(
                Failure::Fatal,
                path,
                "structural cycle or document nested too deeply",
            ));
        }
        let bases = self.flatten_all(path, &conjuncts)?;
        self.evaluate_bases(path, bases)
    }

    fn evaluate_bases(&mut self, path: &[Segment], mut bases: Vec<Base<'a>>) -> EvalResult<Value> {
        if let Some(index) = bases
            .iter()
            .position(|b| matches!(b, Base::Disjunction { .. }))
        {
            if let Base::Disjunction { alternatives, env } = bases.remove(index) {
                return self.evaluate_disjunction(path, bases, alternatives, &env);
            }
        }

        let mut structs = Vec::new();
        let mut lists = Vec::new();
        let mut scalars = Vec::new();
        let mut kinds = Vec::new();
        for base in bases {
            match base {
                Base::Struct { .. } => structs.push(base),
                Base::Resolved(Value::Object(_)) => structs.push(base),
                Base::List { .. } | Base::Resolved(_) => lists.push(base),
                Base::Scalar(value) => scalars.push(value),
                Base::Kind(kind) => kinds.push(kind),
                Base::Top | Base::Disjunction { .. } => {}
            }
        }

        if !structs.is_empty() {
            if let Some(other) = scalars.first() {
                return Err(conflict(path, "struct", other));
            }
            if !lists.is_empty() {
                return Err(EvalError::new(
                    Failure::Conflict,
                    path,
                    "conflicting values: struct and list",
                ));
            }
            if let Some(kind) = kinds.first() {
                return Err(conflict(path, "struct", kind));
            }
            return self.evaluate_struct(path, &structs);
        }

        if !lists.is_empty() {
            if let Some(other) = scalars.first() {
                return Err(conflict(path, "list", other));
            }
            if let Some(kind) = kinds.first() {
                return Err(conflict(path, "list", kind));
            }
            return self.evaluate_list(path, &lists);
        }

        if let Some(first) = scalars.first() {
            if let Some(other) = scalars.iter().find(|s| *s != first) {
                return Err(conflict(path, first, other));
            }
            if let Some(kind) = kinds.iter().find(|k| !k.accepts(first)) {
                return Err(conflict(path, first, kind));
            }
            return Ok(first.clone());
        }

        let abstract_value = kinds
            .first()
            .map(ToString::to_string)
            .unwrap_or_else(|| "_".to_string());
        Err(EvalError::new(
            Failure::Incomplete,
            path,
            format!("incomplete value {abstract_value}"),
        ))
    }

    fn evaluate_disjunction(
        &mut self,
        path: &[Segment],
        others: Vec<Base<'a>>,
        alternatives: &'a [Alternative],
        env: &Env<'a>,
    ) -> EvalResult<Value> {
        // (value, is_default); `None` marks a disjunct that is still abstract.
        let mut remaining: Vec<(Option<Value>, bool)> = Vec::new();
        for alternative in alternatives {
            let mut trial = others.clone();
            self.flatten(path, &alternative.value, env, &mut trial)?;
            match self.evaluate_bases(path, trial) {
                Ok(value) => remaining.push((Some(value), alternative.is_default)),
                Err(e) => match e.failure {
                    Failure::Conflict => {}
                    Failure::Incomplete => remaining.push((None, alternative.is_default)),
                    Failure::Fatal => return Err(e),
                },
            }
        }

        if remaining.is_empty() {
            return Err(EvalError::new(
                Failure::Conflict,
                path,
                "no disjunct matches the other values",
            ));
        }

        let defaults: Vec<&Option<Value>> = remaining
            .iter()
            .filter(|(_, is_default)| *is_default)
            .map(|(value, _)| value)
            .collect();
        let candidates: Vec<&Option<Value>> = if remaining.len() == 1 {
            vec![&remaining[0].0]
        } else if !defaults.is_empty() {
            defaults
        } else {
            remaining.iter().map(|(value, _)| value).collect()
        };

        match candidates.first() {
            Some(Some(first)) if candidates.iter().all(|c| matches!(c, Some(v) if v == first)) => {
                Ok(first.clone())
            }
            _ => Err(EvalError::new(
                Failure::Incomplete,
                path,
                "unresolved disjunction",
            )),
        }
    }

    fn evaluate_struct(&mut self, path: &[Segment], structs: &[Base<'a>]) -> EvalResult<Value> {
        // (name, kind, optional) in order of first declaration.
        let mut labels: Vec<(String, LabelKind, bool)> = Vec::new();
        let mut declare = |name: &str, kind: LabelKind, optional: bool| {
            match labels.iter_mut().find(|(existing, _, _)| existing == name) {
                Some(entry) => entry.2 &= optional,
                None => labels.push((name.to_string(), kind, optional)),
            }
        };
        for base in structs {
            match base {
                Base::Struct { decls, .. } => {
                    for decl in decls.iter() {
                        if let Decl::Field(field) = decl {
                            declare(&field.label.name, field.label.kind, field.optional);
                        }
                    }
                }
                Base::Resolved(Value::Object(map)) => {
                    for key in map.keys() {
                        declare(key, LabelKind::Regular, false);
                    }
                }
                _ => {}
            }
        }

        let mut out = Map::new();
        for (name, kind, optional) in labels {
            if kind != LabelKind::Regular || optional {
                continue;
            }
            let segment = Segment::Field(name.clone());
            let mut conjuncts = Vec::new();
            for base in structs {
                collect_children(path, base, &segment, &mut conjuncts);
            }
            let mut child_path = path.to_vec();
            child_path.push(segment);
            let value = self.evaluate(&child_path, conjuncts)?;
            out.insert(name, value);
        }
        Ok(Value::Object(out))
    }

    fn evaluate_list(&mut self, path: &[Segment], lists: &[Base<'a>]) -> EvalResult<Value> {
        let lengths: Vec<usize> = lists
            .iter()
            .map(|base| match base {
                Base::List { items, .. } => items.len(),
                Base::Resolved(Value::Array(items)) => items.len(),
                _ => 0,
            })
            .collect();
        let length = lengths.first().copied().unwrap_or(0);
        if lengths.iter().any(|l| *l != length) {
            return Err(EvalError::new(
                Failure::Conflict,
                path,
                format!("incompatible list lengths {lengths:?}"),
            ));
        }

        let mut items = Vec::with_capacity(length);
        for index in 0..length {
            let segment = Segment::Index(index);
            let mut conjuncts = Vec::new();
            for base in lists {
                collect_children(path, base, &segment, &mut conjuncts);
            }
            let mut child_path = path.to_vec();
            child_path.push(segment);
            items.push(self.evaluate(&child_path, conjuncts)?);
        }
        Ok(Value::Array(items))
    }
}

fn resolved_base<'a>(value: Value) -> Base<'a> {
    match value {
        Value::Object(_) | Value::Array(_) => Base::Resolved(value),
        scalar => Base::Scalar(scalar),
    }
}

fn collect_children<'a>(
    path: &[Segment],
    base: &Base<'a>,
    segment: &Segment,
    out: &mut Vec<Conjunct<'a>>,
) {
    match (base, segment) {
        (Base::Struct { decls, env }, Segment::Field(name)) => {
            let decls: &'a [Decl] = decls;
            let mut scope: Env<'a> = None;
            for decl in decls.iter() {
                let Decl::Field(field) = decl else {
                    continue;
                };
                if field.label.name != *name {
                    continue;
                }
                let env = scope
                    .get_or_insert_with(|| {
                        Rc::new(Scope {
                            decls,
                            path: path.to_vec(),
                            parent: env.clone(),
                        })
                    })
                    .clone();
                out.push(Conjunct::Expr {
                    expr: &field.value,
                    env: Some(env),
                });
            }
        }
        (Base::List { items, env }, Segment::Index(index)) => {
            let items: &'a [Expr] = items;
            if let Some(item) = items.get(*index) {
                out.push(Conjunct::Expr {
                    expr: item,
                    env: env.clone(),
                });
            }
        }
        (Base::Resolved(Value::Object(map)), Segment::Field(name)) => {
            if let Some(value) = map.get(name) {
                out.push(Conjunct::Resolved(value.clone()));
            }
        }
        (Base::Resolved(Value::Array(items)), Segment::Index(index)) => {
            if let Some(value) = items.get(*index) {
                out.push(Conjunct::Resolved(value.clone()));
            }
        }
        _ => {}
    }
}

fn conflict(path: &[Segment], lhs: impl fmt::Display, rhs: impl fmt::Display) -> EvalError {
    EvalError::new(
        Failure::Conflict,
        path,
        format!("conflicting values {lhs} and {rhs}"),
    )
}
