//! Infix-to-RPN conversion for condition token streams.
//!
//! A textbook shunting-yard pass: terms go straight to the output queue,
//! `And`/`Or` are pushed onto an operator stack (popping higher-or-equal
//! precedence operators to the output first), and parentheses force/relax
//! that ordering. `And` binds tighter than `Or`, so `a Or b And c` parses as
//! `a Or (b And c)`.

use crate::error::{Result, SynapseError};
use crate::expr::condition::Token;

fn precedence(token: &Token) -> Option<u8> {
    match token {
        Token::And => Some(2),
        Token::Or => Some(1),
        _ => None,
    }
}

/// Convert an infix token stream into reverse Polish notation.
///
/// Rejects an empty stream, unbalanced parentheses, and any adjacency that
/// would starve an operator of operands (two terms in a row, a leading
/// binary operator, a trailing operator, empty parentheses) — all as
/// [`SynapseError::InvalidExpression`].
pub fn to_rpn(tokens: &[Token]) -> Result<Vec<Token>> {
    if tokens.is_empty() {
        return Err(SynapseError::InvalidExpression { reason: "expression is empty".into() });
    }

    let mut output: Vec<Token> = Vec::new();
    let mut operators: Vec<Token> = Vec::new();
    let mut expect_operand = true;

    for token in tokens {
        match token {
            Token::Term(_) => {
                if !expect_operand {
                    return Err(SynapseError::InvalidExpression {
                        reason: "term follows another term with no operator between them".into(),
                    });
                }
                output.push(token.clone());
                expect_operand = false;
            }
            Token::And | Token::Or => {
                if expect_operand {
                    return Err(SynapseError::InvalidExpression {
                        reason: "operator is starved of a left operand".into(),
                    });
                }
                let this_prec = precedence(token).expect("and/or always has precedence");
                while let Some(top) = operators.last() {
                    if matches!(top, Token::LParen) {
                        break;
                    }
                    let top_prec = precedence(top).expect("stack only holds and/or/lparen");
                    if top_prec >= this_prec {
                        output.push(operators.pop().expect("just peeked"));
                    } else {
                        break;
                    }
                }
                operators.push(token.clone());
                expect_operand = true;
            }
            Token::LParen => {
                if !expect_operand {
                    return Err(SynapseError::InvalidExpression {
                        reason: "unexpected '(' directly after a term".into(),
                    });
                }
                operators.push(token.clone());
            }
            Token::RParen => {
                let mut found_matching = false;
                while let Some(top) = operators.pop() {
                    if matches!(top, Token::LParen) {
                        found_matching = true;
                        break;
                    }
                    output.push(top);
                }
                if !found_matching {
                    return Err(SynapseError::InvalidExpression {
                        reason: "mismatched ')' with no matching '('".into(),
                    });
                }
                if expect_operand {
                    return Err(SynapseError::InvalidExpression {
                        reason: "empty parentheses contain no term".into(),
                    });
                }
            }
        }
    }

    if expect_operand {
        return Err(SynapseError::InvalidExpression {
            reason: "expression ends with a dangling operator".into(),
        });
    }

    while let Some(top) = operators.pop() {
        if matches!(top, Token::LParen) {
            return Err(SynapseError::InvalidExpression {
                reason: "mismatched '(' with no matching ')'".into(),
            });
        }
        output.push(top);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::condition::RelationTerm;

    fn term(event_type: &str) -> Token {
        Token::Term(RelationTerm::IsTypeOf(event_type.into()))
    }

    #[test]
    fn single_term_passes_through() {
        let rpn = to_rpn(&[term("a")]).unwrap();
        assert_eq!(rpn, vec![term("a")]);
    }

    #[test]
    fn and_binds_tighter_than_or() {
        // a OR b AND c  ->  a b c AND OR
        let tokens = vec![term("a"), Token::Or, term("b"), Token::And, term("c")];
        let rpn = to_rpn(&tokens).unwrap();
        assert_eq!(rpn, vec![term("a"), term("b"), term("c"), Token::And, Token::Or]);
    }

    #[test]
    fn parentheses_override_precedence() {
        // (a OR b) AND c -> a b OR c AND
        let tokens =
            vec![Token::LParen, term("a"), Token::Or, term("b"), Token::RParen, Token::And, term("c")];
        let rpn = to_rpn(&tokens).unwrap();
        assert_eq!(rpn, vec![term("a"), term("b"), Token::Or, term("c"), Token::And]);
    }

    #[test]
    fn empty_expression_is_invalid() {
        assert!(to_rpn(&[]).is_err());
    }

    #[test]
    fn mismatched_close_paren_is_invalid() {
        assert!(to_rpn(&[term("a"), Token::RParen]).is_err());
    }

    #[test]
    fn unclosed_open_paren_is_invalid() {
        assert!(to_rpn(&[Token::LParen, term("a")]).is_err());
    }

    #[test]
    fn two_terms_in_a_row_is_invalid() {
        assert!(to_rpn(&[term("a"), term("b")]).is_err());
    }

    #[test]
    fn trailing_operator_is_invalid() {
        assert!(to_rpn(&[term("a"), Token::And]).is_err());
    }
}
