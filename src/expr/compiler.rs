//! Compiling a network-agnostic [`Condition`] into a network-bound
//! [`Expression`] for one specific anchor.
//!
//! Compilation is cheap and side-effect-free: it validates the token
//! stream's structure (via [`shunting_yard::to_rpn`]) and that the anchor
//! actually exists in the network, then folds the RPN stream into a tree.
//! It does not itself evaluate anything against the network's relations —
//! that is [`crate::expr::eval::evaluate`]'s job, run fresh each time a rule
//! or watcher checks this anchor (the relation cache, not the compiler,
//! is what makes repeated evaluation cheap).

use crate::error::{Result, SynapseError};
use crate::event::EventId;
use crate::expr::condition::{Condition, Token};
use crate::expr::shunting_yard::to_rpn;
use crate::expr::Expression;
use crate::network::EventNetwork;

/// Compile `condition` against `anchor` in `network`.
///
/// Returns [`SynapseError::CompileError`] for a condition with no tokens or
/// an anchor absent from the network (the "nil spec / nil anchor / nil
/// network" cases from spec.md §9), and [`SynapseError::InvalidExpression`]
/// for any structural problem in the token stream itself.
pub fn compile(condition: &Condition, anchor: EventId, network: &EventNetwork) -> Result<Expression> {
    if condition.tokens.is_empty() {
        return Err(SynapseError::CompileError { reason: "condition has no tokens".into() });
    }
    if !network.contains(anchor) {
        return Err(SynapseError::CompileError {
            reason: format!("anchor {anchor} is not present in the network"),
        });
    }

    let rpn = to_rpn(&condition.tokens)?;
    build_tree(&rpn)
}

fn build_tree(rpn: &[Token]) -> Result<Expression> {
    let mut stack: Vec<Expression> = Vec::new();
    for token in rpn {
        match token {
            Token::Term(term) => stack.push(Expression::Term(term.clone())),
            Token::And | Token::Or => {
                let rhs = stack.pop().ok_or_else(|| SynapseError::InvalidExpression {
                    reason: "operator missing right operand during tree build".into(),
                })?;
                let lhs = stack.pop().ok_or_else(|| SynapseError::InvalidExpression {
                    reason: "operator missing left operand during tree build".into(),
                })?;
                stack.push(if matches!(token, Token::And) {
                    Expression::And(Box::new(lhs), Box::new(rhs))
                } else {
                    Expression::Or(Box::new(lhs), Box::new(rhs))
                });
            }
            Token::LParen | Token::RParen => {
                return Err(SynapseError::Internal {
                    reason: "parenthesis token survived RPN conversion".into(),
                });
            }
        }
    }
    if stack.len() != 1 {
        return Err(SynapseError::InvalidExpression {
            reason: format!("expression did not reduce to a single tree (stack depth {})", stack.len()),
        });
    }
    Ok(stack.pop().expect("checked len == 1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::value::PropertyMap;
    use crate::event::Event;
    use chrono::Utc;

    #[test]
    fn compiles_a_simple_term() {
        let net = EventNetwork::new();
        let anchor = net
            .add_event(Event::new("cpu_spike", "infra", PropertyMap::new(), Utc::now()))
            .unwrap();
        let cond = Condition::new().is_type_of("cpu_spike");
        let expr = compile(&cond, anchor, &net).unwrap();
        assert!(matches!(expr, Expression::Term(_)));
    }

    #[test]
    fn compiles_and_or_into_a_tree() {
        let net = EventNetwork::new();
        let anchor = net
            .add_event(Event::new("cpu_spike", "infra", PropertyMap::new(), Utc::now()))
            .unwrap();
        let cond = Condition::new().is_type_of("a").and().in_domain("b").or().has_peers(None);
        let expr = compile(&cond, anchor, &net).unwrap();
        assert!(matches!(expr, Expression::Or(_, _)));
    }

    #[test]
    fn empty_condition_is_a_compile_error() {
        let net = EventNetwork::new();
        let anchor = net
            .add_event(Event::new("a", "b", PropertyMap::new(), Utc::now()))
            .unwrap();
        let err = compile(&Condition::new(), anchor, &net).unwrap_err();
        assert_eq!(err.code(), crate::error::SynapseErrorCode::CompileError);
    }

    #[test]
    fn unknown_anchor_is_a_compile_error() {
        let net = EventNetwork::new();
        let cond = Condition::new().has_peers(None);
        let err = compile(&cond, EventId::new(), &net).unwrap_err();
        assert_eq!(err.code(), crate::error::SynapseErrorCode::CompileError);
    }
}
