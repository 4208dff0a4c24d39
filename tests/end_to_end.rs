//! Integration tests driving the full source-to-MIPS pipeline, covering the
//! end-to-end scenarios and boundary behaviors of §8. Each test builds the
//! pipeline the way a `build`/`check`/`ir` CLI invocation would, asserting
//! on diagnostics, the quadruple dump, or the emitted MIPS text rather than
//! on program output (this compiler has no embedded runtime to execute
//! against).

use compiscriptc::diagnostics::Code;
use compiscriptc::{compile, CompilerConfig};

fn run(source: &str) -> compiscriptc::CompileOutput {
    compile(source, &CompilerConfig::new()).expect("compile() should not hit a fatal CompileError")
}

fn codes(out: &compiscriptc::CompileOutput) -> Vec<Code> {
    out.analysis.diagnostics.iter().map(|d| d.code).collect()
}

// ---- §8 end-to-end scenario 1 -------------------------------------------

#[test]
fn scenario_one_const_and_print_is_clean_with_expected_ir_and_mips() {
    let out = run("const x: integer = 1; function main(): void { print(1); }");
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));

    let dump = out.analysis.scopes.dump();
    let global = &dump[0];
    assert!(global
        .entries
        .iter()
        .any(|e| e.name == "x" && e.ty == "integer"));
    assert!(dump.iter().any(|s| s.scope == "FUNCTION main"));

    let quads = out.quads.expect("clean program should reach IR");
    let text = quads.dump().join("\n");
    assert!(text.contains("(ASSIGN, 1, x)"));
    assert!(text.contains("(LABEL, L_FUNC_main)"));
    assert!(text.contains("(BEGIN_FUNC, main, 0)"));
    assert!(text.contains("(PRINT, 1)"));
    assert!(text.contains("(RETURN)"));
    assert!(text.contains("(END_FUNC, main)"));

    let mips = out.assembly.expect("clean program should reach MIPS");
    assert!(mips.contains("x: .word 1"));
    assert!(mips.contains("main:"));
    assert!(mips.contains(".globl main"));
    assert!(mips.contains("li $v0, 1"));
    assert!(mips.contains("syscall"));
}

// ---- §8 end-to-end scenario 2 -------------------------------------------

#[test]
fn scenario_two_three_assigns_and_one_add() {
    let out = run("let a: integer = 5; let b: integer = 10; let c: integer = a + b;");
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));
    let quads = out.quads.unwrap();
    let ops: Vec<_> = quads.iter().map(|q| q.op_text.clone()).collect();
    assert_eq!(ops.iter().filter(|op| op.as_str() == "ASSIGN").count(), 3);
    assert_eq!(ops.iter().filter(|op| op.as_str() == "ADD").count(), 1);

    let mips = out.assembly.unwrap();
    assert!(mips.contains("add"));
}

// ---- §8 end-to-end scenario 3 -------------------------------------------

#[test]
fn scenario_three_short_circuit_and_has_if_false_and_two_labels() {
    let out = run("let a: boolean = true; let b: boolean = false; let c: boolean = a && b;");
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));
    let quads = out.quads.unwrap();
    let dump = quads.dump().join("\n");
    assert!(dump.contains("IF_FALSE"));
    let ops: Vec<_> = quads.iter().map(|q| q.op_text.clone()).collect();
    assert_eq!(ops.iter().filter(|op| op.as_str() == "LABEL").count(), 2);
}

// ---- §8 end-to-end scenario 4 -------------------------------------------

#[test]
fn scenario_four_while_loop_has_one_back_edge_and_one_forward_branch() {
    let out = run("function main(): void { let i: integer = 0; while (i < 10) { i = i + 1; } }");
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));
    let quads = out.quads.unwrap();
    let dump = quads.dump().join("\n");
    assert_eq!(dump.matches("(GOTO").count(), 1);
    assert!(dump.contains("ADD"));

    let mips = out.assembly.unwrap();
    assert_eq!(mips.matches("    j L").count(), 1);
    assert!(mips.contains("beqz"));
}

// ---- §8 end-to-end scenario 5 -------------------------------------------

#[test]
fn scenario_five_inherited_field_offsets_and_instance_size() {
    let out = run("class A { x: integer; } class B extends A { y: integer; }");
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));

    let b = out.analysis.scopes.classes.get("B").expect("B should be registered");
    assert_eq!(b.instance_size, 8);
    assert_eq!(out.analysis.scopes.classes.field_offset("B", "x"), Some(0));
    assert_eq!(out.analysis.scopes.classes.field_offset("B", "y"), Some(4));

    let quads = out.quads.unwrap();
    let dump = quads.dump().join("\n");
    let x_pos = dump.find("(CLASS_FIELD, B.x, 0)").expect("B.x field quad");
    let y_pos = dump.find("(CLASS_FIELD, B.y, 1)").expect("B.y field quad");
    assert!(x_pos < y_pos);
}

// ---- §8 end-to-end scenario 6 -------------------------------------------

#[test]
fn scenario_six_method_call_lowers_to_call_method_not_get_field() {
    let out = run(
        "class P { x: integer; function move(dx: integer, dy: integer): void { } } \
         function main(): void { let p: P = new P(); p.move(1, 2); }",
    );
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));
    let quads = out.quads.unwrap();
    let dump = quads.dump().join("\n");
    assert!(dump.contains("PARAM, 1"));
    assert!(dump.contains("PARAM, 2"));
    assert!(dump.contains("CALL_METHOD, p, P.move"));
    assert!(!dump.contains("GET_FIELD"));
}

// ---- §8 boundary behaviors -----------------------------------------------

#[test]
fn uninferable_let_gets_one_e104_and_placeholder_integer_type() {
    let out = run("let x; function main(): void { }");
    assert_eq!(codes(&out), vec![Code::E104]);
    let global = &out.analysis.scopes.dump()[0];
    let x = global.entries.iter().find(|e| e.name == "x").unwrap();
    assert_eq!(x.ty, "integer");
}

#[test]
fn break_outside_loop_is_one_e201() {
    let out = run("function main(): void { break; }");
    assert_eq!(codes(&out), vec![Code::E201]);
}

#[test]
fn continue_outside_loop_is_one_e201() {
    let out = run("function main(): void { continue; }");
    assert_eq!(codes(&out), vec![Code::E201]);
}

#[test]
fn return_value_inside_void_function_is_one_e103() {
    let out = run("function main(): void { return 1; }");
    assert_eq!(codes(&out), vec![Code::E103]);
}

#[test]
fn return_outside_any_function_is_e103() {
    // A bare return at the top level has no enclosing function.
    let out = run("return 1;");
    assert_eq!(codes(&out), vec![Code::E103]);
}

#[test]
fn mixed_type_array_literal_is_one_e101_with_first_element_type() {
    let out = run("let a: array<integer> = [1, true, 3];");
    assert_eq!(codes(&out), vec![Code::E101]);
}

#[test]
fn redeclaration_in_the_same_block_is_one_e001_and_first_definition_wins() {
    let out = run("function main(): void { let x: integer = 1; let x: boolean = true; }");
    assert_eq!(codes(&out), vec![Code::E001]);
}

#[test]
fn assignment_to_const_is_e202() {
    let out = run("const x: integer = 1; function main(): void { x = 2; }");
    assert_eq!(codes(&out), vec![Code::E202]);
}

#[test]
fn undefined_name_is_e002() {
    let out = run("function main(): void { print(missing); }");
    assert_eq!(codes(&out), vec![Code::E002]);
}

#[test]
fn non_integer_array_index_is_e401() {
    let out = run("let a: array<integer> = [1, 2, 3]; let x: integer = a[\"nope\"];");
    assert_eq!(codes(&out), vec![Code::E401]);
}

#[test]
fn member_access_on_non_class_is_e301() {
    let out = run("let a: integer = 1; function main(): void { print(a.field); }");
    assert_eq!(codes(&out), vec![Code::E301]);
}

#[test]
fn switch_case_type_mismatch_is_e302() {
    let out = run(
        "function main(): void { let x: integer = 1; switch (x) { case true: print(1); } }",
    );
    assert_eq!(codes(&out), vec![Code::E302]);
}

#[test]
fn argument_arity_mismatch_is_e102() {
    let out = run("function f(a: integer): void { } function main(): void { f(1, 2); }");
    assert_eq!(codes(&out), vec![Code::E102]);
}

#[test]
fn unreachable_code_after_return_is_e500() {
    let out = run("function main(): void { return; print(1); }");
    assert_eq!(codes(&out), vec![Code::E500]);
}

#[test]
fn syntax_error_produces_e999_and_stops_before_semantic_analysis() {
    let out = run("function main( { }");
    assert!(!out.analysis.is_clean());
    assert!(out.analysis.diagnostics.iter().any(|d| d.code == Code::E999));
    assert!(out.quads.is_none());
    assert!(out.assembly.is_none());
}

// ---- determinism / well-formedness (§8 universal properties) -----------

#[test]
fn semantic_analysis_is_deterministic_across_repeated_runs() {
    let src = "class A { x: integer; function greet(): void { } } \
               function main(): void { let a: A = new A(); let i: integer = 0; \
               while (i < 3) { if (i == 1) { continue; } i = i + 1; } }";
    let first = codes(&run(src));
    let second = codes(&run(src));
    assert_eq!(first, second);
    assert!(first.is_empty());
}

#[test]
fn every_goto_and_branch_target_resolves_to_a_label_in_the_ir_stream() {
    let out = run(
        "function main(): void { let i: integer = 0; \
         for (let j: integer = 0; j < 5; j = j + 1) { if (j == 2) { break; } } }",
    );
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));
    let quads = out.quads.unwrap();

    let mut labels = std::collections::HashSet::new();
    for q in quads.iter() {
        if q.op_text == "LABEL" {
            labels.insert(q.result.clone().unwrap());
        }
    }
    for q in quads.iter() {
        if matches!(q.op_text.as_str(), "GOTO" | "IF_TRUE" | "IF_FALSE") {
            let target = q.result.clone().unwrap();
            assert!(labels.contains(&target), "target {target} has no matching LABEL");
        }
    }
}

#[test]
fn begin_func_and_end_func_balance_across_the_ir_stream() {
    let out = run(
        "function a(): void { } function b(): void { } class C { function m(): void { } }",
    );
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));
    let quads = out.quads.unwrap();
    let begins = quads.iter().filter(|q| q.op_text == "BEGIN_FUNC").count();
    let ends = quads.iter().filter(|q| q.op_text == "END_FUNC").count();
    assert_eq!(begins, 2);
    assert_eq!(ends, 2);
    let begin_methods = quads.iter().filter(|q| q.op_text == "BEGIN_METHOD").count();
    let end_methods = quads.iter().filter(|q| q.op_text == "END_METHOD").count();
    assert_eq!(begin_methods, 1);
    assert_eq!(end_methods, 1);
}

#[test]
fn call_arity_matches_the_immediately_preceding_param_count() {
    let out = run(
        "function add(a: integer, b: integer): integer { return a + b; } \
         function main(): void { let r: integer = add(1, 2); }",
    );
    assert!(out.analysis.is_clean(), "{:?}", codes(&out));
    let quads = out.quads.unwrap().into_vec();
    let call_index = quads.iter().position(|q| q.op_text == "CALL").unwrap();
    let param_count_before = quads[..call_index]
        .iter()
        .rev()
        .take_while(|q| q.op_text == "PARAM")
        .count();
    let declared_arity: usize = quads[call_index].arg2.as_ref().unwrap().parse().unwrap();
    assert_eq!(param_count_before, declared_arity);
}
