//! Unit tests for the code generator.
//!
//! These check the shape of the emitted listing: sections, pools, calling
//! convention, control-flow labels and the diagnostics collected on the way.
//! Executing the output is covered by the integration tests.

use std::rc::Rc;

use crate::{
    errors::errors::{Error, ErrorImpl},
    lexer::lexer::tokenize,
    parser::parser::parse,
};

use super::compiler::{escape_string, generate, Assembly};

fn compile(source: &str) -> Result<Assembly, Error> {
    let tokens = tokenize(source.to_string(), Some("test.kt".to_string())).unwrap();
    let program = parse(tokens, Rc::new("test.kt".to_string())).unwrap();
    generate(&program)
}

fn listing(source: &str) -> String {
    compile(source).unwrap().text
}

/// Instructions of one function, from its label to its `ret`.
fn function_body(text: &str, symbol: &str) -> String {
    let start = text
        .find(&format!("\n{}:\n", symbol))
        .unwrap_or_else(|| panic!("no function {}", symbol));
    let rest = &text[start..];
    let end = rest.find("ret\n").unwrap();
    rest[..end].to_string()
}

#[test]
fn test_sections() {
    let text = listing("fun main() { println(1) }");

    assert!(text.starts_with("    .data\n"));
    assert!(text.contains("    .section .rodata\n"));
    assert!(text.contains("    .text\n"));
    assert!(text.contains("    .globl main\n"));
    assert!(text
        .trim_end()
        .ends_with(".section .note.GNU-stack,\"\",@progbits"));
}

#[test]
fn test_println_integer() {
    let text = listing("fun main() { println(42) }");
    let main = function_body(&text, "main");

    assert!(main.contains("movq $42, %rax"));
    assert!(main.contains("leaq .Lfmt_int_nl(%rip), %rdi"));
    assert!(main.contains("call printf@PLT"));
    assert!(text.contains(".Lfmt_int_nl:\n    .string \"%ld\\n\""));
}

#[test]
fn test_large_integer_uses_movabs() {
    let text = listing("fun main() { println(9000000000) }");
    assert!(text.contains("movabsq $9000000000, %rax"));
}

#[test]
fn test_prologue_reserves_aligned_frame() {
    let text = listing("fun main() { var a = 1\nvar b = 2\nvar c = 3 }");
    let main = function_body(&text, "main");

    assert!(main.contains("pushq %rbp\n    movq %rsp, %rbp\n    subq $32, %rsp"));
    assert!(main.contains(".Lmain_epilogue:\n    leave\n    "));
}

#[test]
fn test_float_pool_is_deduplicated() {
    let text = listing("fun main() { val a = 2.5\nval b = 2.5\nprintln(a + b + 1.0) }");

    assert_eq!(text.matches(".quad 0x4004000000000000").count(), 1);
    // 1.0 is always pooled first for step operators
    assert!(text.contains(".LF0:\n    .quad 0x3ff0000000000000"));
    assert!(text.contains("addsd %xmm1, %xmm0"));
}

#[test]
fn test_string_pool_and_escapes() {
    let text = listing("fun main() { println(\"say \\\"hi\\\"\\n\")\nprintln(\"say \\\"hi\\\"\\n\") }");

    assert_eq!(text.matches(".string \"say \\\"hi\\\"\\n\"").count(), 1);
    assert_eq!(escape_string("a\tb\\c\u{1}"), "a\\tb\\\\c\\001");
}

#[test]
fn test_globals_live_in_data() {
    let text = listing("var count = 0\nval name = \"x\"\nval bounds = 1..3\nfun main() { count += 1 }");

    assert!(text.contains("glob_count:\n    .quad 0\n"));
    assert!(text.contains("glob_name:\n    .quad 0\n"));
    assert!(text.contains("glob_bounds:\n    .quad 0, 0\n"));
    assert!(text.contains("movq %rax, glob_count(%rip)"));
    assert!(text.contains("movq %rdx, glob_bounds+8(%rip)"));
}

#[test]
fn test_parameters_and_call_registers() {
    let source = "fun mix(a: Int, x: Float, b: Boolean): Float { return x }\nfun main() { println(mix(1, 2.0, true)) }";
    let text = listing(source);

    let mix = function_body(&text, "kt_mix");
    assert!(mix.contains("movq %rdi, -8(%rbp)"));
    assert!(mix.contains("movsd %xmm0, -16(%rbp)"));
    assert!(mix.contains("movq %rsi, -24(%rbp)"));
    assert!(mix.contains("jmp .Lkt_mix_epilogue"));

    let main = function_body(&text, "main");
    assert!(main.contains(", %rdi\n"));
    assert!(main.contains(", %xmm0\n"));
    assert!(main.contains(", %rsi\n"));
    assert!(main.contains("movl $1, %eax\n    call kt_mix"));
    assert!(main.contains("leaq .Lfmt_float_nl(%rip), %rdi"));
}

#[test]
fn test_stack_arguments() {
    let source = "fun many(a: Int, b: Int, c: Int, d: Int, e: Int, f: Int, g: Int): Int { return g }\nfun main() { println(many(1, 2, 3, 4, 5, 6, 7)) }";
    let text = listing(source);

    let many = function_body(&text, "kt_many");
    assert!(many.contains("movq 16(%rbp), %rax"));

    let main = function_body(&text, "main");
    assert!(main.contains("subq $8, %rsp\n    pushq"));
    assert!(main.contains("call kt_many\n    addq $16, %rsp"));
}

#[test]
fn test_argument_coercion() {
    let text = listing("fun half(x: Float): Float { return x / 2 }\nfun main() { println(half(3)) }");
    let main = function_body(&text, "main");

    assert!(main.contains("cvtsi2sdq %rax, %xmm0"));
}

#[test]
fn test_integer_division_checks_zero() {
    let text = listing("fun main() { val a = 7\nval b = 2\nprintln(a / b)\nprintln(a % b) }");

    assert!(text.contains("je .Lrt_division_by_zero"));
    assert!(text.contains("je .Lrt_modulo_by_zero"));
    assert!(text.contains("cqto\n    idivq %rcx"));
    assert!(text.contains("movq %rdx, %rax"));
    assert!(text.contains(".Lrt_division_by_zero:\n"));
    assert!(text.contains("call exit@PLT"));
}

#[test]
fn test_float_modulo_calls_fmod() {
    let text = listing("fun main() { println(7.5 % 2) }");
    assert!(text.contains("call fmod@PLT"));
}

#[test]
fn test_float_comparisons_are_nan_safe() {
    let text = listing("fun main() { val a = 1.0\nval b = 2.0\nprintln(a < b)\nprintln(a == b)\nprintln(a != b) }");

    assert!(text.contains("comisd %xmm0, %xmm1\n    seta %al"));
    assert!(text.contains("sete %al\n    setnp %cl\n    andb %cl, %al"));
    assert!(text.contains("setne %al\n    setp %cl\n    orb %cl, %al"));
}

#[test]
fn test_string_comparison_uses_strcmp() {
    let text = listing("fun main() { println(\"a\" < \"b\") }");
    assert!(text.contains("call strcmp@PLT\n    cmpl $0, %eax\n    setl %al"));
}

#[test]
fn test_concatenation_allocates() {
    let text = listing("fun main() { val s = \"n=\" + 1\nprintln(s) }");

    assert!(text.contains("call sprintf@PLT"));
    assert!(text.contains("call strlen@PLT"));
    assert!(text.contains("call malloc@PLT"));
    assert!(text.contains("call strcpy@PLT"));
    assert!(text.contains("call strcat@PLT"));
}

#[test]
fn test_boolean_prints_as_text() {
    let text = listing("fun main() { println(true) }");
    assert!(text.contains("cmovneq %rcx, %rax"));
    assert!(text.contains(".Lstr_true:\n    .string \"true\""));
}

#[test]
fn test_if_else_labels() {
    let text = listing("fun main() { if (1 < 2) println(1) else println(2) }");

    assert!(text.contains("je .Lelse_1"));
    assert!(text.contains("jmp .Lendif_1"));
    assert!(text.contains(".Lelse_1:\n"));
    assert!(text.contains(".Lendif_1:\n"));
}

#[test]
fn test_nested_loops_break_innermost() {
    let source = "fun main() { for (i in 1..3) { while (true) { break }\ncontinue } }";
    let text = listing(source);

    assert!(text.contains(".Lfor_1_start:"));
    assert!(text.contains(".Lwhile_2_start:"));
    // break in the while leaves the while; continue in the for steps the counter
    let while_body_start = text.find(".Lwhile_2_start:").unwrap();
    let while_end = text.find(".Lwhile_2_end:").unwrap();
    assert!(text[while_body_start..while_end].contains("jmp .Lwhile_2_end"));
    assert!(text[while_end..].contains("jmp .Lfor_1_next"));
}

#[test]
fn test_for_directions() {
    assert!(listing("fun main() { for (i in 1..3) { } }").contains("jg .Lfor_1_end"));
    assert!(listing("fun main() { for (i in 1 until 3) { } }").contains("jge .Lfor_1_end"));

    let down = listing("fun main() { for (i in 3 downTo 1) { } }");
    assert!(down.contains("jl .Lfor_1_end"));
    assert!(down.contains("subq "));
}

#[test]
fn test_for_step_is_checked() {
    let text = listing("fun main() { for (i in 0..10 step 2) println(i) }");

    assert!(text.contains("je .Lrt_zero_step"));
    assert!(text.contains("js .Lrt_negative_step"));
}

#[test]
fn test_do_while_labels() {
    let text = listing("fun main() { var i = 0\ndo { i++ } while (i < 3) }");

    assert!(text.contains(".Ldo_1_start:"));
    assert!(text.contains(".Ldo_1_cond:"));
    assert!(text.contains("jne .Ldo_1_start"));
}

#[test]
fn test_top_level_statements_open_main() {
    let text = listing("println(\"first\")\nfun helper() { }\nfun main() { }");
    let main = function_body(&text, "main");
    let helper = function_body(&text, "kt_helper");

    assert!(main.contains("call printf@PLT"));
    assert!(!helper.contains("printf"));
}

#[test]
fn test_top_level_control_ends_its_statement() {
    let text = listing("println(1)\nreturn 7\nbreak\ncontinue\nprintln(2)\nfun main() { }");
    let main = function_body(&text, "main");

    assert!(!main.contains("jmp .Lmain_epilogue"));
    assert_eq!(main.matches("jmp .Ltop_").count(), 3);
    assert_eq!(main.matches("call printf@PLT").count(), 2);

    // Each jump lands on the label closing its own statement
    for line in main.lines().filter(|line| line.contains("jmp .Ltop_")) {
        let label = line.trim().trim_start_matches("jmp ");
        let jump = main.find(line).unwrap();
        let target = main.find(&format!("{}:\n", label)).unwrap();
        assert!(target > jump);
    }
}

#[test]
fn test_redeclared_global_gets_its_own_cell() {
    let text = listing(
        "var x = 1\nprintln(x)\nvar x = \"s\"\nfun show() { println(x) }\nfun main() { show() }",
    );

    assert!(text.contains("glob_x:\n    .quad 0\n"));
    assert!(text.contains("glob_x.1:\n    .quad 0\n"));

    let main = function_body(&text, "main");
    assert!(main.contains("movq %rax, glob_x(%rip)"));
    assert!(main.contains("movq glob_x(%rip), %rax"));
    assert!(main.contains("movq %rax, glob_x.1(%rip)"));

    let show = function_body(&text, "kt_show");
    assert!(show.contains("movq glob_x.1(%rip), %rax"));
    assert!(!show.contains("glob_x(%rip)"));
}

#[test]
fn test_missing_main() {
    let error = compile("fun helper() { }").unwrap_err();
    assert_eq!(error.get_error_impl(), &ErrorImpl::MissingMain);
}

#[test]
fn test_duplicate_function_emitted_once() {
    let assembly = compile("fun f(): Int { return 1 }\nfun f(): Int { return 2 }\nfun main() { println(f()) }").unwrap();

    assert_eq!(assembly.text.matches("\nkt_f:\n").count(), 1);
    assert!(assembly.text.contains("movq $2, %rax"));
    assert_eq!(assembly.diagnostics[0].get_error_name(), "FunctionAlreadyDeclared");
}

#[test]
fn test_undeclared_variable_gets_zero_slot() {
    let assembly = compile("fun main() { println(ghost) }").unwrap();

    assert!(assembly.text.contains("movq $0, -8(%rbp)"));
    assert_eq!(
        assembly.diagnostics[0].get_error_impl(),
        &ErrorImpl::VariableNotDeclared {
            variable: "ghost".to_string()
        }
    );
}

#[test]
fn test_call_problems_are_diagnostics() {
    let assembly = compile(
        "fun two(a: Int, b: Int): Int { return a + b }\nfun main() { println(two(1))\nprintln(nope()) }",
    )
    .unwrap();

    let names: Vec<&str> = assembly
        .diagnostics
        .iter()
        .map(|error| error.get_error_name())
        .collect();
    assert_eq!(names, vec!["MissingArguments", "FunctionNotDeclared"]);
    assert!(!assembly.text.contains("call nope"));
}

#[test]
fn test_val_reassignment_is_not_stored() {
    let assembly = compile("fun main() { val x = 1\nx = 2 }").unwrap();

    assert_eq!(assembly.diagnostics.len(), 1);
    assert_eq!(assembly.diagnostics[0].get_error_name(), "ValReassignment");
    assert_eq!(assembly.text.matches("movq %rax, -8(%rbp)").count(), 1);
}

#[test]
fn test_val_compound_assignment_emits_no_division() {
    let assembly = compile("fun main() { val x = 1\nx /= 0\nx %= 0 }").unwrap();
    let main = function_body(&assembly.text, "main");

    assert_eq!(assembly.diagnostics.len(), 2);
    assert!(assembly
        .diagnostics
        .iter()
        .all(|error| error.get_error_name() == "ValReassignment"));
    assert!(!main.contains("idivq"));
    assert!(!main.contains(".Lrt_division_by_zero"));
}

#[test]
fn test_generators_do_not_share_state() {
    let first = listing("fun main() { println(\"a\")\nprintln(1.5) }");
    let second = listing("fun main() { println(\"a\")\nprintln(1.5) }");

    assert_eq!(first, second);
    assert!(second.contains(".LS0:"));
}
