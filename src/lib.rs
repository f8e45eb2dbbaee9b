#![allow(clippy::module_inception)]

use std::{fmt::Display, rc::Rc, sync::Once};

use crate::{
    ast::ast::Program,
    compiler::compiler::{generate, Assembly},
    errors::errors::{Error, ErrorTip},
    interpreter::interpreter::{execute, ExecutionResult},
    interpreter::output::PrintHandler,
    lexer::lexer::tokenize,
    parser::parser::parse,
};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod interpreter;
pub mod lexer;
pub mod macros;
pub mod parser;

extern crate regex;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debugging.
///
/// Safe to call multiple times. Enable with `RUST_LOG=ktlang=debug` or
/// `RUST_LOG=ktlang=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .init();
        }
    });
}

/// A byte offset into a named source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Position(pub u32, pub Rc<String>);

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.1, self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Tokenizes and parses a source file into its program tree.
#[tracing::instrument(level = "debug", skip(source))]
pub fn parse_source(source: &str, file_name: &str) -> Result<Program, Error> {
    let tokens = tokenize(source.to_string(), Some(file_name.to_string()))?;
    tracing::debug!(tokens = tokens.len(), "tokenized");

    let program = parse(tokens, Rc::new(file_name.to_string()))?;
    tracing::debug!(statements = program.body.len(), "parsed");

    Ok(program)
}

/// Parses and evaluates a program, capturing everything it prints.
pub fn run_source(source: &str, file_name: &str) -> Result<ExecutionResult, Error> {
    let program = parse_source(source, file_name)?;
    execute(&program, PrintHandler::buffer())
}

/// Parses a program and lowers it to x86-64 assembly.
pub fn compile_source(source: &str, file_name: &str) -> Result<Assembly, Error> {
    let program = parse_source(source, file_name)?;
    generate(&program)
}

/// Finds the line containing the byte offset `position`.
///
/// Returns the 1-based line number, the line's text and the offset of
/// `position` within that line, or `None` when the offset lies past the end
/// of the source.
pub fn get_line_at_position(source: &str, position: u32) -> Option<(usize, String, usize)> {
    let pos = position as usize;

    if pos > source.len() {
        return None;
    }

    let mut start = 0;

    for (index, line) in source.split_inclusive('\n').enumerate() {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            return Some((index + 1, line.to_string(), pos - start));
        }

        start = end;
    }

    // End of input: point just past the last character.
    let last_line = source.split_inclusive('\n').last().unwrap_or("");
    let line_number = source.split_inclusive('\n').count().max(1);
    Some((line_number, last_line.to_string(), last_line.len()))
}

/// Renders a caret-style report for `error` against `source`.
///
/// ```text
/// Error: UnexpectedToken (Unexpected token: `}`)
/// -> main.kt
///    |
/// 20 | var a = }
///    | --------^
/// ```
pub fn render_error(error: &Error, source: &str, file_name: &str) -> String {
    let mut report = String::new();

    if let ErrorTip::None = error.get_tip() {
        report.push_str(&format!("Error: {}\n", error.get_error_name()));
    } else {
        report.push_str(&format!(
            "Error: {} ({})\n",
            error.get_error_name(),
            error.get_tip()
        ));
    }
    report.push_str(&format!("-> {}\n", file_name));

    let Some((line, line_text, line_pos)) = get_line_at_position(source, error.get_position().0)
    else {
        return report;
    };

    let line_string = line.to_string();
    let padding = line_string.len() + 2;

    report.push_str(&format!("{:>padding$}\n", "|"));

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    report.push_str(&format!("{} | {}\n", line_string, line_text_removed.trim_end()));

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;
    report.push_str(&format!("{:>padding$} {:->arrows$}\n", "|", "^"));

    report
}

/// Prints the report from [`render_error`] to stderr.
pub fn display_error(error: &Error, source: &str, file_name: &str) {
    eprint!("{}", render_error(error, source, file_name));
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let start = string
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .count();

    (String::from(&string[start..]), start)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{
        errors::errors::{Error, ErrorImpl},
        Position,
    };

    const SOURCE: &str = "Hello, world!\nfun main() {\n\n    Testing { }\n";

    #[test]
    fn test_get_line_at_position() {
        let (line_number, line, line_pos) = super::get_line_at_position(SOURCE, 10).unwrap();
        assert_eq!(line_number, 1);
        assert_eq!(line, "Hello, world!\n");
        assert_eq!(line_pos, 10);

        let (line_number, line, line_pos) = super::get_line_at_position(SOURCE, 36).unwrap();
        assert_eq!(line_number, 4);
        assert_eq!(line, "    Testing { }\n");
        assert_eq!(line_pos, 8);

        assert!(super::get_line_at_position(SOURCE, 500).is_none());
    }

    #[test]
    fn test_render_error_points_at_offset() {
        let error = Error::new(
            ErrorImpl::UnexpectedToken {
                token: "{".to_string(),
            },
            Position(36, Rc::new("main.kt".to_string())),
        );

        let report = super::render_error(&error, SOURCE, "main.kt");
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "Error: UnexpectedToken (Unexpected token: `{`)");
        assert_eq!(lines[1], "-> main.kt");
        assert_eq!(lines[3], "4 | Testing { }");
        assert_eq!(lines[4], "  | ----^");
    }
}
