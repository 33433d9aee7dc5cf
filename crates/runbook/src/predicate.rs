//! Applicability predicates over host facts.
//!
//! The grammar is deliberately small and side-effect free:
//! - a clause is `ident == "literal"` or `ident != "literal"`
//! - clauses join with `&&` or `||`, never both in one expression
//! - no parentheses
//!
//! Identifiers resolve against the host's facts. Evaluation checks
//! every clause, so an unknown variable is reported even when another
//! clause would already decide the result.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    ident: String,
    negated: bool,
    literal: String,
}

/// A parsed predicate, ready to evaluate against host facts.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    joiner: Joiner,
    clauses: Vec<Clause>,
}

/// Parse a predicate expression.
pub fn parse(expr: &str) -> Result<Predicate> {
    let has_and = expr.contains("&&");
    let has_or = expr.contains("||");
    if has_and && has_or {
        return Err(Error::Parse(
            "cannot mix '&&' and '||' in one expression".to_string(),
        ));
    }

    let (joiner, separator) = if has_or {
        (Joiner::Or, "||")
    } else {
        (Joiner::And, "&&")
    };

    let clauses = expr
        .split(separator)
        .map(parse_clause)
        .collect::<Result<Vec<_>>>()?;

    Ok(Predicate { joiner, clauses })
}

fn parse_clause(part: &str) -> Result<Clause> {
    let part = part.trim();
    if part.is_empty() {
        return Err(Error::Parse("empty clause in expression".to_string()));
    }

    // Take whichever operator appears first so a literal containing
    // the other operator's characters does not confuse the split.
    let eq_pos = part.find("==");
    let ne_pos = part.find("!=");
    let (pos, negated) = match (eq_pos, ne_pos) {
        (Some(e), Some(n)) if e < n => (e, false),
        (Some(_), Some(n)) => (n, true),
        (Some(e), None) => (e, false),
        (None, Some(n)) => (n, true),
        (None, None) => {
            return Err(Error::Parse(format!(
                "expected '==' or '!=' in clause '{part}'"
            )));
        }
    };

    let ident = part[..pos].trim();
    if ident.is_empty() || !ident.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(Error::Parse(format!(
            "invalid identifier '{ident}' in clause '{part}'"
        )));
    }

    let rest = part[pos + 2..].trim();
    let literal = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .ok_or_else(|| {
            Error::Parse(format!("expected a quoted literal in clause '{part}'"))
        })?;

    Ok(Clause {
        ident: ident.to_string(),
        negated,
        literal: literal.to_string(),
    })
}

impl Predicate {
    /// Evaluate against a host's facts. Unknown identifiers are an
    /// error, never silently false.
    pub fn evaluate(&self, facts: &BTreeMap<String, String>) -> Result<bool> {
        let mut results = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            let value = facts.get(&clause.ident).ok_or_else(|| Error::UnknownVariable {
                name: clause.ident.clone(),
            })?;
            let eq = value == &clause.literal;
            results.push(eq != clause.negated);
        }
        Ok(match self.joiner {
            Joiner::And => results.iter().all(|r| *r),
            Joiner::Or => results.iter().any(|r| *r),
        })
    }
}
