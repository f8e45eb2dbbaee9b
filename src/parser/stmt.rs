use crate::{
    ast::{
        ast::{Expr, ExprKind, Stmt},
        statements::{
            AssignOperator, AssignStmt, BlockStmt, BreakStmt, ContinueStmt, DoWhileStmt,
            ExpressionStmt, FnDeclStmt, ForStmt, IfStmt, Parameter, PrintStmt, ReturnStmt,
            VarDeclStmt, WhileStmt,
        },
        types::DeclaredType,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    parser::{expr::parse_expr, lookups::BindingPower},
};

use super::{parser::Parser, types::parse_type};

/// Parses one statement and any semicolons that terminate it.
pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let handler = parser
        .get_stmt_lookup()
        .get(&parser.current_token_kind())
        .copied();

    let stmt = match handler {
        Some(handler) => handler(parser)?,
        None => parse_expression_stmt(parser)?,
    };

    while parser.eat(TokenKind::Semicolon) {}

    Ok(stmt)
}

pub fn parse_expression_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let expression = parse_expr(parser, BindingPower::Default)?;

    Ok(Stmt::Expression(ExpressionStmt {
        span: expression.span.clone(),
        expression,
    }))
}

pub fn parse_var_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start_token = parser.advance();
    let is_constant = start_token.kind == TokenKind::Val;

    let error = Error::new(
        ErrorImpl::UnexpectedTokenDetailed {
            token: parser.current_token().value.clone(),
            message: String::from("expected identifier during variable declaration"),
        },
        parser.get_position(),
    );
    let identifier = parser.expect_error(TokenKind::Identifier, Some(error))?.value;

    let declared_type = if parser.eat(TokenKind::Colon) {
        Some(parse_type(parser)?)
    } else {
        None
    };

    let assigned_value = if parser.eat(TokenKind::Assignment) {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    if declared_type.is_none() && assigned_value.is_none() {
        return Err(Error::new(
            ErrorImpl::ExpectedExplicitValue,
            start_token.span.start,
        ));
    }

    Ok(Stmt::VarDecl(VarDeclStmt {
        span: parser.span_from(start_token.span.start),
        identifier,
        is_constant,
        declared_type,
        assigned_value,
    }))
}

fn assign_operator(kind: TokenKind) -> Option<AssignOperator> {
    Some(match kind {
        TokenKind::Assignment => AssignOperator::Assign,
        TokenKind::PlusEquals => AssignOperator::AddAssign,
        TokenKind::MinusEquals => AssignOperator::SubtractAssign,
        TokenKind::StarEquals => AssignOperator::MultiplyAssign,
        TokenKind::SlashEquals => AssignOperator::DivideAssign,
        TokenKind::PercentEquals => AssignOperator::ModuloAssign,
        _ => return None,
    })
}

/// Statements starting with a name: assignments, `x++`/`x--`, or a bare expression.
pub fn parse_identifier_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let next = parser.peek(1).kind;

    if let Some(operator) = assign_operator(next) {
        let target = parser.advance();
        parser.advance();
        let value = parse_expr(parser, BindingPower::Default)?;

        return Ok(Stmt::Assign(AssignStmt {
            target: target.value,
            operator,
            value: Some(value),
            span: parser.span_from(target.span.start),
        }));
    }

    if next == TokenKind::PlusPlus || next == TokenKind::MinusMinus {
        let target = parser.advance();
        let operator = if parser.advance().kind == TokenKind::PlusPlus {
            AssignOperator::PostIncrement
        } else {
            AssignOperator::PostDecrement
        };

        return Ok(Stmt::Assign(AssignStmt {
            target: target.value,
            operator,
            value: None,
            span: parser.span_from(target.span.start),
        }));
    }

    parse_expression_stmt(parser)
}

/// `++x` or `--x` in statement position.
pub fn parse_prefix_step_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    if parser.peek(1).kind != TokenKind::Identifier {
        return parse_expression_stmt(parser);
    }

    let operator_token = parser.advance();
    let operator = if operator_token.kind == TokenKind::PlusPlus {
        AssignOperator::PreIncrement
    } else {
        AssignOperator::PreDecrement
    };
    let target = parser.advance().value;

    Ok(Stmt::Assign(AssignStmt {
        target,
        operator,
        value: None,
        span: parser.span_from(operator_token.span.start),
    }))
}

pub fn parse_print_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start_token = parser.advance();
    let newline = start_token.kind == TokenKind::Println;

    parser.expect(TokenKind::OpenParen)?;
    let value = if parser.current_token_kind() == TokenKind::CloseParen {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::CloseParen)?;

    Ok(Stmt::Print(PrintStmt {
        value,
        newline,
        span: parser.span_from(start_token.span.start),
    }))
}

fn parse_condition(parser: &mut Parser) -> Result<Expr, Error> {
    parser.expect(TokenKind::OpenParen)?;
    let condition = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    Ok(condition)
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let condition = parse_condition(parser)?;
    let then_body = parse_stmt(parser)?;

    let else_body = if parser.eat(TokenKind::Else) {
        Some(Box::new(parse_stmt(parser)?))
    } else {
        None
    };

    Ok(Stmt::If(IfStmt {
        condition,
        then_body: Box::new(then_body),
        else_body,
        span: parser.span_from(start),
    }))
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let condition = parse_condition(parser)?;
    let body = parse_stmt(parser)?;

    Ok(Stmt::While(WhileStmt {
        condition,
        body: Box::new(body),
        span: parser.span_from(start),
    }))
}

pub fn parse_do_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let body = parse_stmt(parser)?;
    parser.expect(TokenKind::While)?;
    let condition = parse_condition(parser)?;

    Ok(Stmt::DoWhile(DoWhileStmt {
        body: Box::new(body),
        condition,
        span: parser.span_from(start),
    }))
}

pub fn parse_for_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    parser.expect(TokenKind::OpenParen)?;
    let variable = parser.expect(TokenKind::Identifier)?.value;
    parser.expect(TokenKind::In)?;
    let range = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    if !matches!(range.unparenthesized().kind, ExprKind::Range(_)) {
        return Err(Error::new(ErrorImpl::ExpectedRange, range.span.start.clone()));
    }

    let body = parse_stmt(parser)?;

    Ok(Stmt::For(ForStmt {
        variable,
        range,
        body: Box::new(body),
        span: parser.span_from(start),
    }))
}

/// Parses `{ stmt* }`.
pub fn parse_block(parser: &mut Parser) -> Result<BlockStmt, Error> {
    let start = parser.expect(TokenKind::OpenCurly)?.span.start;

    let mut body = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseCurly {
        if parser.eat(TokenKind::Semicolon) {
            continue;
        }
        body.push(parse_stmt(parser)?);
    }

    parser.expect(TokenKind::CloseCurly)?;

    Ok(BlockStmt {
        body,
        span: parser.span_from(start),
    })
}

pub fn parse_block_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    Ok(Stmt::Block(parse_block(parser)?))
}

pub fn parse_fn_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let identifier = parser.expect(TokenKind::Identifier)?.value;

    parser.expect(TokenKind::OpenParen)?;

    let mut parameters = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseParen {
        let name = parser.expect(TokenKind::Identifier)?.value;
        parser.expect(TokenKind::Colon)?;
        let param_type = parse_type(parser)?;
        parameters.push(Parameter { name, param_type });

        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }

    parser.expect(TokenKind::CloseParen)?;

    let return_type = if parser.eat(TokenKind::Colon) {
        parse_type(parser)?
    } else {
        DeclaredType::Unit
    };

    let body = parse_block(parser)?;

    Ok(Stmt::FnDecl(FnDeclStmt {
        span: parser.span_from(start),
        identifier,
        parameters,
        return_type,
        body,
    }))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let value = if parser
        .get_nud_lookup()
        .contains_key(&parser.current_token_kind())
    {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    Ok(Stmt::Return(ReturnStmt {
        value,
        span: parser.span_from(start),
    }))
}

pub fn parse_break_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let span = parser.advance().span;
    Ok(Stmt::Break(BreakStmt { span }))
}

pub fn parse_continue_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let span = parser.advance().span;
    Ok(Stmt::Continue(ContinueStmt { span }))
}
