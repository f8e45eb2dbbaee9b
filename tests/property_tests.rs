//! Property tests for evaluation.
//!
//! Programs are generated from small templates so that the expected output
//! can be computed directly in Rust.

use std::rc::Rc;

use ktlang::{
    interpreter::{interpreter::Interpreter, output::PrintHandler, value::format_float},
    lexer::lexer::tokenize,
    parser::parser::parse,
    run_source,
};
use proptest::prelude::*;

fn run_main(body: &str) -> String {
    run_source(&format!("fun main() {{\n{}\n}}", body), "prop.kt")
        .unwrap()
        .output
}

proptest! {
    #[test]
    fn test_integer_division_truncates_toward_zero(
        a in -1_000_000i64..1_000_000,
        b in (-1_000i64..1_000).prop_filter("non-zero divisor", |b| *b != 0),
    ) {
        let output = run_main(&format!("println({a} / {b})\nprintln({a} % {b})"));
        prop_assert_eq!(output, format!("{}\n{}\n", a / b, a % b));
    }

    #[test]
    fn test_division_identity(
        a in -1_000_000i64..1_000_000,
        b in (-1_000i64..1_000).prop_filter("non-zero divisor", |b| *b != 0),
    ) {
        let output = run_main(&format!("val a = {a}\nval b = {b}\nprintln((a / b) * b + a % b == a)"));
        prop_assert_eq!(output, "true\n");
    }

    #[test]
    fn test_mixed_arithmetic_promotes_to_float(
        a in -10_000i64..10_000,
        whole in 0u32..10_000,
        fraction in 0u32..100,
    ) {
        let literal = format!("{}.{:02}", whole, fraction);
        let float: f64 = literal.parse().unwrap();

        let output = run_main(&format!("println({a} + {literal})\nprintln({literal} * {a})"));
        prop_assert_eq!(
            output,
            format!("{}\n{}\n", format_float(a as f64 + float), format_float(float * a as f64))
        );
    }

    #[test]
    fn test_concatenation_uses_display_text(
        text in "[a-z ]{0,10}",
        number in any::<i32>(),
        flag in any::<bool>(),
    ) {
        let output = run_main(&format!(
            "println(\"{text}\" + {number})\nprintln({flag} + \"{text}\")"
        ));
        prop_assert_eq!(output, format!("{text}{number}\n{flag}{text}\n"));
    }

    #[test]
    fn test_nested_blocks_restore_scope(depth in 1usize..8) {
        let mut body = String::from("val x = 0\n");
        for level in 1..=depth {
            body.push_str(&format!("{{ val x = {level}\n"));
        }
        body.push_str("println(x)\n");
        body.push_str(&"}".repeat(depth));
        body.push_str("\nprintln(x)");

        let source = format!("fun main() {{\n{}\n}}", body);
        let tokens = tokenize(source, Some("prop.kt".to_string())).unwrap();
        let program = parse(tokens, Rc::new("prop.kt".to_string())).unwrap();

        let mut interpreter = Interpreter::new(PrintHandler::buffer());
        interpreter.run(&program).unwrap();

        prop_assert_eq!(interpreter.output.get_output(), format!("{depth}\n0\n"));
        prop_assert_eq!(interpreter.environment.depth(), 1);
    }
}
