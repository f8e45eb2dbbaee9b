//! Type annotation parsing.
//!
//! Types are single identifiers resolved on the spot against the closed set
//! of declared types; anything else is an `UnknownType` error.

use crate::{
    ast::types::DeclaredType,
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::parser::Parser;

/// Parses a type name such as `Int` or `Boolean`.
///
/// # Arguments
///
/// * `parser` - Parser positioned on the type name
///
/// # Returns
///
/// The resolved DeclaredType, or an error when the name is not a known type.
pub fn parse_type(parser: &mut Parser) -> Result<DeclaredType, Error> {
    let error = Error::new(
        ErrorImpl::UnexpectedTokenDetailed {
            token: parser.current_token().value.clone(),
            message: String::from("expected a type name"),
        },
        parser.get_position(),
    );
    let token = parser.expect_error(TokenKind::Identifier, Some(error))?;

    DeclaredType::from_name(&token.value).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnknownType {
                type_: token.value.clone(),
            },
            token.span.start.clone(),
        )
    })
}
