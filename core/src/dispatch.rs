//! Resolution of member names on a model.
//!
//! # Design
//! A member call is a name plus an argument count. Each strategy below looks
//! at the name and answers `Matched`, `WrongArity` (the name has a shape it
//! knows, but not with that many arguments) or `NoMatch`. The strategies run
//! in a fixed order and the first match wins:
//!
//! 1. explicit members: `id`, `id=`, class readers and writers, declared attributes
//! 2. associations
//! 3. attributes currently present in the store
//! 4. predicates (`name?`)
//! 5. setters (`name=`)
//!
//! If nothing matched but some strategy recognised the shape, the call is
//! an `InvalidArgument`; otherwise the member is unknown.

use serde_json::Value;

use crate::associations::Related;
use crate::error::ModelError;
use crate::model::Model;

/// The outcome of one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Matched(T),
    WrongArity { expected: usize },
    NoMatch,
}

/// What a resolved member does when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    ReadId,
    WriteId,
    Reader(String),
    Writer(String),
    Declared(String),
    Association(String),
    Attribute(String),
    Predicate(String),
    Setter(String),
}

/// The value produced by a member call.
#[derive(Debug)]
pub enum Member {
    Value(Value),
    Related(Related),
}

impl Member {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Member::Value(value) => Some(value),
            Member::Related(_) => None,
        }
    }

    pub fn into_related(self) -> Option<Related> {
        match self {
            Member::Related(related) => Some(related),
            Member::Value(_) => None,
        }
    }
}

type Strategy = fn(&Model, &str, usize) -> Resolution<Resolved>;

const STRATEGIES: [Strategy; 5] = [explicit, association, attribute, predicate, setter];

fn with_arity(expected: usize, given: usize, resolved: Resolved) -> Resolution<Resolved> {
    if expected == given {
        Resolution::Matched(resolved)
    } else {
        Resolution::WrongArity { expected }
    }
}

fn explicit(model: &Model, name: &str, arity: usize) -> Resolution<Resolved> {
    let class = model.class();
    if name == "id" {
        return with_arity(0, arity, Resolved::ReadId);
    }
    if name == "id=" {
        return with_arity(1, arity, Resolved::WriteId);
    }
    if class.reader(name).is_some() {
        return with_arity(0, arity, Resolved::Reader(name.to_string()));
    }
    if let Some(stem) = name.strip_suffix('=') {
        if class.writer(stem).is_some() {
            return with_arity(1, arity, Resolved::Writer(stem.to_string()));
        }
    }
    if class.is_declared(name) {
        return with_arity(0, arity, Resolved::Declared(name.to_string()));
    }
    Resolution::NoMatch
}

fn association(model: &Model, name: &str, arity: usize) -> Resolution<Resolved> {
    if model.class().has_association(name) {
        with_arity(0, arity, Resolved::Association(name.to_string()))
    } else {
        Resolution::NoMatch
    }
}

fn attribute(model: &Model, name: &str, arity: usize) -> Resolution<Resolved> {
    if model.attributes().contains(name) {
        with_arity(0, arity, Resolved::Attribute(name.to_string()))
    } else {
        Resolution::NoMatch
    }
}

fn predicate(_model: &Model, name: &str, arity: usize) -> Resolution<Resolved> {
    match name.strip_suffix('?') {
        Some(stem) if !stem.is_empty() => with_arity(0, arity, Resolved::Predicate(stem.to_string())),
        _ => Resolution::NoMatch,
    }
}

fn setter(_model: &Model, name: &str, arity: usize) -> Resolution<Resolved> {
    match name.strip_suffix('=') {
        Some(stem) if !stem.is_empty() => with_arity(1, arity, Resolved::Setter(stem.to_string())),
        _ => Resolution::NoMatch,
    }
}

/// Run the strategies in priority order.
pub fn resolve(model: &Model, name: &str, arity: usize) -> Result<Resolved, ModelError> {
    let mut expected = None;
    for strategy in STRATEGIES {
        match strategy(model, name, arity) {
            Resolution::Matched(resolved) => return Ok(resolved),
            Resolution::WrongArity { expected: n } => {
                expected.get_or_insert(n);
            }
            Resolution::NoMatch => {}
        }
    }

    let class = model.class().name().to_string();
    match expected {
        Some(expected) => Err(ModelError::InvalidArgument {
            class,
            name: name.to_string(),
            expected,
            given: arity,
        }),
        None => Err(ModelError::UnknownMember {
            class,
            name: name.to_string(),
        }),
    }
}
