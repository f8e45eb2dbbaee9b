//! Integration tests for whole programs.
//!
//! Every program goes through the public pipeline: `run_source` for the
//! interpreter and `compile_source` for the code generator. When a C
//! toolchain is available on x86-64 Linux, generated programs are also
//! linked and run, and their output is compared with the interpreter's.

use ktlang::{compile_source, errors::errors::ErrorImpl, render_error, run_source};
use pretty_assertions::assert_eq;

const FIBONACCI: &str = r#"
fun fib(n: Int): Int {
    if (n < 2) return n
    return fib(n - 1) + fib(n - 2)
}

fun main() {
    for (i in 0 until 10) {
        print(fib(i))
        print(" ")
    }
    println()
}
"#;

const FIZZBUZZ: &str = r#"
fun label(n: Int): String {
    if (n % 15 == 0) return "FizzBuzz"
    if (n % 3 == 0) return "Fizz"
    if (n % 5 == 0) return "Buzz"
    return "" + n
}

fun main() {
    for (i in 1..15) println(label(i))
}
"#;

const GLOBALS: &str = r#"
var counter = 0
val greeting = "hello"

fun bump(by: Int) {
    counter += by
}

println(greeting + ", world")

fun main() {
    bump(2)
    bump(3)
    println("counter = " + counter)
}
"#;

const LOOPS: &str = r#"
fun main() {
    var total = 0
    var i = 10
    while (true) {
        i--
        if (i % 2 == 0) continue
        if (i < 3) break
        total += i
    }
    println(total)

    var n = 0
    do {
        n++
    } while (n < 5)
    println(n)

    for (k in 10 downTo 1 step 3) print(k)
    println()
}
"#;

const FLOATS: &str = r#"
fun average(a: Float, b: Float): Float {
    return (a + b) / 2
}

fun main() {
    val x = 3
    println(average(x, 4))
    var f: Float = 1
    f *= 2.5
    f++
    println(f)
    println(7.5 % 2)
    println(x > 2.5)
}
"#;

const TOP_LEVEL_CONTROL: &str = r#"
println("a")
return
println("b")
{
    break
    println("skipped")
}
for (i in 1..3) {
    if (i == 2) return
    println(i)
}
println("c")

fun main() {
    println("main")
}
"#;

const VAL_COMPOUND: &str = r#"
fun main() {
    val x = 1
    x /= 0
    x %= 0
    x += 5
    x++
    println(x)
}
"#;

const LOOP_VARIABLES: &str = r#"
fun count(): Int {
    var total = 0
    for (i in 1..3) total += i
    return total
}

fun main() {
    var i = 0
    println(count())
    println(i)
    for (i in 1..2) print(i)
    println()
    println(i)
}
"#;

const MANY_ARGUMENTS: &str = r#"
fun weigh(a: Int, b: Float, c: Int, d: Int, e: Float, f: Int, g: Int, h: Int, m: Int, k: Float): Float {
    return a + b + c + d + e + f + g + h + m + k
}

fun mix(a: Int, b: Int, c: Int, d: Int, e: Int, f: Int, g: Int, h: Int): Int {
    return a + b * 2 + c * 3 + d * 4 + e * 5 + f * 6 + g * 7 + h * 8
}

fun main() {
    println(weigh(1, 2.5, 3, 4, 5, 6, 7, 8, 9, 0.5))
    println(mix(1, 1, 1, 1, 1, 1, 1, 2))
}
"#;

const REDECLARED_GLOBAL: &str = r#"
var x = 1
println(x)
var x = "s"

fun main() {
    println(x)
}
"#;

/// Programs at the edges of the language, compared across both backends.
const EDGE_CASES: [&str; 5] = [
    TOP_LEVEL_CONTROL,
    VAL_COMPOUND,
    LOOP_VARIABLES,
    MANY_ARGUMENTS,
    REDECLARED_GLOBAL,
];

fn run_output(source: &str) -> String {
    run_source(source, "test.kt").unwrap().output
}

#[test]
fn test_fibonacci() {
    assert_eq!(run_output(FIBONACCI), "0 1 1 2 3 5 8 13 21 34 \n");
}

#[test]
fn test_fizzbuzz() {
    let output = run_output(FIZZBUZZ);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 15);
    assert_eq!(lines[2], "Fizz");
    assert_eq!(lines[4], "Buzz");
    assert_eq!(lines[13], "14");
    assert_eq!(lines[14], "FizzBuzz");
}

#[test]
fn test_globals_and_top_level_statements() {
    assert_eq!(run_output(GLOBALS), "hello, world\ncounter = 5\n");
}

#[test]
fn test_loops() {
    assert_eq!(run_output(LOOPS), "24\n5\n10741\n");
}

#[test]
fn test_floats() {
    assert_eq!(run_output(FLOATS), "3.5\n3.5\n1.5\ntrue\n");
}

#[test]
fn test_edge_cases() {
    assert_eq!(run_output(TOP_LEVEL_CONTROL), "a\nb\n1\nc\nmain\n");
    assert_eq!(run_output(VAL_COMPOUND), "1\n");
    assert_eq!(run_output(LOOP_VARIABLES), "6\n0\n12\n2\n");
    assert_eq!(run_output(MANY_ARGUMENTS), "46\n44\n");
    assert_eq!(run_output(REDECLARED_GLOBAL), "1\ns\n");
}

#[test]
fn test_diagnostics_do_not_stop_the_program() {
    let result = run_source(
        "fun main() {\n    val x = 1\n    x = 2\n    println(x + missing)\n}",
        "test.kt",
    )
    .unwrap();

    assert_eq!(result.output, "1\n");
    let names: Vec<&str> = result
        .diagnostics
        .iter()
        .map(|error| error.get_error_name())
        .collect();
    assert_eq!(names, vec!["ValReassignment", "VariableNotDeclared"]);
}

#[test]
fn test_runtime_fault_renders_at_the_operator() {
    let source = "fun main() {\n    val zero = 0\n    println(1 / zero)\n}";
    let error = run_source(source, "fault.kt").unwrap_err();

    assert_eq!(error.get_error_impl(), &ErrorImpl::DivisionByZero);
    let report = render_error(&error, source, "fault.kt");
    assert!(report.starts_with("Error: DivisionByZero"));
    assert!(report.contains("3 | println(1 / zero)"));
}

#[test]
fn test_syntax_error_from_both_pipelines() {
    let source = "fun main() { println(1 }";

    let run_error = run_source(source, "test.kt").unwrap_err();
    let build_error = compile_source(source, "test.kt").unwrap_err();
    assert_eq!(run_error, build_error);
}

#[test]
fn test_every_program_compiles_cleanly() {
    for source in [FIBONACCI, FIZZBUZZ, GLOBALS, LOOPS, FLOATS] {
        let assembly = compile_source(source, "test.kt").unwrap();

        assert!(assembly.diagnostics.is_empty(), "{:?}", assembly.diagnostics);
        assert!(assembly.text.contains("    .globl main\n"));
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
mod native {
    use std::{fs, process::Command};

    use pretty_assertions::assert_eq;

    use super::*;

    fn has_cc() -> bool {
        Command::new("cc")
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success())
    }

    /// Links `source` and returns its exit status, stdout and stderr.
    fn run_native(source: &str) -> (i32, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let assembly_path = dir.path().join("program.s");
        let executable = dir.path().join("program");

        let assembly = compile_source(source, "test.kt").unwrap();
        fs::write(&assembly_path, &assembly.text).unwrap();

        let link = Command::new("cc")
            .arg("-o")
            .arg(&executable)
            .arg(&assembly_path)
            .arg("-lm")
            .output()
            .unwrap();
        assert!(
            link.status.success(),
            "{}",
            String::from_utf8_lossy(&link.stderr)
        );

        let output = Command::new(&executable).output().unwrap();
        (
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )
    }

    #[test]
    fn test_native_matches_interpreter() {
        if !has_cc() {
            return;
        }

        for source in [FIBONACCI, FIZZBUZZ, GLOBALS, LOOPS, FLOATS] {
            let (status, stdout, _) = run_native(source);
            assert_eq!(status, 0);
            assert_eq!(stdout, run_output(source));
        }
    }

    #[test]
    fn test_native_edge_cases_match_interpreter() {
        if !has_cc() {
            return;
        }

        for source in EDGE_CASES {
            let (status, stdout, stderr) = run_native(source);
            assert_eq!(status, 0, "{}", stderr);
            assert_eq!(stdout, run_output(source), "{}", source);
        }
    }

    #[test]
    fn test_native_division_by_zero_exits() {
        if !has_cc() {
            return;
        }

        let (status, stdout, stderr) =
            run_native("fun main() {\n    println(\"before\")\n    val zero = 0\n    println(1 / zero)\n}");
        assert_eq!(status, 1);
        assert_eq!(stdout, "before\n");
        assert!(stderr.contains("DivisionByZero"));
    }
}
