use crate::{
    ast::{
        ast::{Expr, ExprKind},
        expressions::{BinaryExpr, BinaryOperator, CallExpr, RangeExpr, UnaryExpr, UnaryOperator},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    Span,
};

use super::{lookups::BindingPower, parser::Parser, stmt::parse_block};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_nud_lookup().get(&token_kind).copied() else {
        return Err(Error::new(
            ErrorImpl::UnexpectedToken {
                token: parser.current_token().value.clone(),
            },
            parser.get_position(),
        ));
    };

    let mut left = nud(parser)?;

    // While the next operator binds tighter than the caller, keep extending the lhs
    while parser.binding_power(parser.current_token_kind()) > bp {
        let token_kind = parser.current_token_kind();
        let Some(led) = parser.get_led_lookup().get(&token_kind).copied() else {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: parser.current_token().value.clone(),
                },
                parser.get_position(),
            ));
        };

        let token_bp = parser.binding_power(token_kind);
        left = led(parser, left, token_bp)?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.advance();

    let kind = match token.kind {
        TokenKind::Integer => ExprKind::Integer(token.value.parse().map_err(|_| {
            Error::new(
                ErrorImpl::NumberParseError {
                    token: token.value.clone(),
                },
                token.span.start.clone(),
            )
        })?),
        TokenKind::Float => ExprKind::Float(token.value.parse().map_err(|_| {
            Error::new(
                ErrorImpl::NumberParseError {
                    token: token.value.clone(),
                },
                token.span.start.clone(),
            )
        })?),
        TokenKind::String => ExprKind::String(token.value.clone()),
        TokenKind::True => ExprKind::Boolean(true),
        TokenKind::False => ExprKind::Boolean(false),
        TokenKind::Identifier => ExprKind::Identifier(token.value.clone()),
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken { token: token.value },
                token.span.start,
            ))
        }
    };

    Ok(Expr::new(kind, token.span))
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    Some(match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Dash => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Percent => BinaryOperator::Modulo,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::LessEquals => BinaryOperator::LessEquals,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::GreaterEquals => BinaryOperator::GreaterEquals,
        TokenKind::Equals => BinaryOperator::Equals,
        TokenKind::NotEquals => BinaryOperator::NotEquals,
        TokenKind::And => BinaryOperator::And,
        TokenKind::Or => BinaryOperator::Or,
        _ => return None,
    })
}

pub fn parse_binary_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let operator = binary_operator(operator_token.kind).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnexpectedToken {
                token: operator_token.value.clone(),
            },
            operator_token.span.start.clone(),
        )
    })?;

    let right = parse_expr(parser, bp)?;

    let span = Span {
        start: left.span.start.clone(),
        end: right.span.end.clone(),
    };

    Ok(Expr::new(
        ExprKind::Binary(BinaryExpr {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }),
        span,
    ))
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let operator = match operator_token.kind {
        TokenKind::Not => UnaryOperator::Not,
        TokenKind::Dash => UnaryOperator::Negate,
        TokenKind::Plus => UnaryOperator::Plus,
        TokenKind::PlusPlus => UnaryOperator::PreIncrement,
        _ => UnaryOperator::PreDecrement,
    };

    let operand = parse_expr(parser, BindingPower::Unary)?;

    let span = Span {
        start: operator_token.span.start,
        end: operand.span.end.clone(),
    };

    Ok(Expr::new(
        ExprKind::Unary(UnaryExpr {
            operator,
            operand: Box::new(operand),
        }),
        span,
    ))
}

pub fn parse_postfix_expr(
    parser: &mut Parser,
    left: Expr,
    _bp: BindingPower,
) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let operator = if operator_token.kind == TokenKind::PlusPlus {
        UnaryOperator::PostIncrement
    } else {
        UnaryOperator::PostDecrement
    };

    let span = Span {
        start: left.span.start.clone(),
        end: operator_token.span.end,
    };

    Ok(Expr::new(
        ExprKind::Unary(UnaryExpr {
            operator,
            operand: Box::new(left),
        }),
        span,
    ))
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.start;
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    Ok(Expr::new(
        ExprKind::Parenthesized(Box::new(expr)),
        parser.span_from(start),
    ))
}

pub fn parse_call_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let ExprKind::Identifier(callee) = left.kind else {
        return Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: String::from("("),
                message: String::from("only named functions can be called"),
            },
            parser.get_position(),
        ));
    };

    parser.advance();

    let mut arguments = vec![];

    while parser.current_token_kind() != TokenKind::CloseParen {
        arguments.push(parse_expr(parser, BindingPower::Default)?);

        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }

    parser.expect(TokenKind::CloseParen)?;

    Ok(Expr::new(
        ExprKind::Call(CallExpr { callee, arguments }),
        parser.span_from(left.span.start),
    ))
}

pub fn parse_range_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let operator = parser.advance();
    let end = parse_expr(parser, bp)?;

    let span = Span {
        start: left.span.start.clone(),
        end: end.span.end.clone(),
    };

    Ok(Expr::new(
        ExprKind::Range(RangeExpr {
            start: Box::new(left),
            end: Box::new(end),
            until: operator.kind == TokenKind::Until,
            descending: operator.kind == TokenKind::DownTo,
            step: None,
        }),
        span,
    ))
}

pub fn parse_step_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let step_token = parser.advance();

    let ExprKind::Range(mut range) = left.kind else {
        return Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: step_token.value,
                message: String::from("step can only follow a range"),
            },
            step_token.span.start,
        ));
    };

    if range.step.is_some() {
        return Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: step_token.value,
                message: String::from("a range takes a single step"),
            },
            step_token.span.start,
        ));
    }

    let step = parse_expr(parser, bp)?;
    let span = Span {
        start: left.span.start,
        end: step.span.end.clone(),
    };
    range.step = Some(Box::new(step));

    Ok(Expr::new(ExprKind::Range(range), span))
}

pub fn parse_run_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.start;
    let block = parse_block(parser)?;

    Ok(Expr::new(ExprKind::Run(block), parser.span_from(start)))
}
