/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use jvmfuzz::ClassState;
use jvmfuzz::Config;
use jvmfuzz::Expression;
use jvmfuzz::Knobs;
use jvmfuzz::MetaType;
use jvmfuzz::Modifiers;
use jvmfuzz::PrimitiveKind;
use jvmfuzz::Statement;
use jvmfuzz::Value;
use rand::SeedableRng;

fn config(assignments: &[&str]) -> Config {
    Config::new("FuzzTest", Knobs::from_assignments(assignments.iter().copied()).unwrap())
}

#[test]
fn print_only_knobs_give_a_flat_entry_method() {
    let config = config(&[
        "field_probability=0",
        "method_probability=0",
        "control_flow_probability=0",
        "print_probability=100",
    ]);
    for seed in 0..20 {
        let program = jvmfuzz::gen_program(seed, &config).unwrap();
        assert_eq!(program.state.num_fields(), 0);
        assert_eq!(program.state.num_user_methods(), 0);
        assert!(program.fields.is_empty());
        assert!(program.methods.is_empty());
        for statement in &program.entry.body.statements {
            assert!(
                matches!(statement, Statement::Print(_)),
                "seed {}: {:?}",
                seed,
                statement
            );
        }
        let source = program.to_java_source().unwrap();
        let prints = source.matches("System.out.println(").count();
        assert_eq!(prints, program.entry.body.len());
    }
}

#[test]
fn a_lone_method_cannot_call_anything() {
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
    let mut state = ClassState::new();
    let m = state.add_method(Modifiers::PRIVATE, vec![], MetaType::Void);
    for _ in 0..10 {
        assert_eq!(state.random_callable_method(&mut rng, m), None);
    }
    assert!(state.record_call(m, m).is_err());
    assert!(state.call_graph().is_acyclic());
}

#[test]
fn eager_calls_with_one_method_never_recurse() {
    let config = config(&[
        "method_call_probability=100",
        "method_probability=100",
        "max_methods=1",
    ]);
    for seed in 0..20 {
        let program = jvmfuzz::gen_program(seed, &config).unwrap();
        assert!(program.state.num_user_methods() <= 1);
        let graph = program.state.call_graph();
        assert!(graph.is_acyclic());
        for (id, _) in program.state.user_methods() {
            assert!(graph.callees(id).is_empty(), "seed {}", seed);
        }
    }
}

#[test]
fn boundary_constants_are_emitted_exactly() {
    let cases = [
        (Value::Byte(-128), MetaType::Primitive(jvmfuzz::PrimitiveKind::Byte), "((byte) -128)"),
        (Value::Byte(127), MetaType::Primitive(jvmfuzz::PrimitiveKind::Byte), "((byte) 127)"),
        (Value::Int(i32::MIN), MetaType::Primitive(jvmfuzz::PrimitiveKind::Int), "(-2147483648)"),
        (Value::Int(i32::MAX), MetaType::Primitive(jvmfuzz::PrimitiveKind::Int), "2147483647"),
        (
            Value::Long(i64::MIN),
            MetaType::Primitive(jvmfuzz::PrimitiveKind::Long),
            "(-9223372036854775808L)",
        ),
        (Value::Char(0), MetaType::Primitive(jvmfuzz::PrimitiveKind::Char), "((char) 0)"),
        (Value::Null, MetaType::string(), "((String) null)"),
    ];
    for (value, t, expected) in cases {
        assert_eq!(jvmfuzz::format_value(&value, &t), expected);
    }
}

#[test]
fn generated_classes_have_both_entry_points() {
    let program = jvmfuzz::gen_program(3, &config(&[])).unwrap();
    let source = program.to_java_source().unwrap();
    assert!(source.starts_with("// To reproduce:\n// jvmfuzz generate --seed 3"));
    assert!(source.contains("public static void main(String[] args) {"));
    assert!(source.contains("new FuzzTest().run();"));
    assert!(source.contains("public void run() {"));
}

#[test]
fn integer_division_never_sees_zero() {
    let config = config(&["binary_op_probability=100", "max_expression_depth=2"]);
    for seed in 0..20 {
        let program = jvmfuzz::gen_program(seed, &config).unwrap();
        assert!(program.num_exprs() > 0);
        for id in program.expr_ids() {
            let Expression::BinaryOp(op, left, right) = program.expr(id) else {
                continue;
            };
            let left_kind = program.expr_type(*left).as_primitive();
            let right_kind = program.expr_type(*right).as_primitive();
            let Some(node_kind) = program.expr_type(id).as_primitive() else {
                continue;
            };
            // comparisons are typed boolean and computed in the left operand's kind
            let kind = if node_kind == PrimitiveKind::Boolean {
                left_kind.unwrap()
            } else {
                node_kind
            };
            assert_eq!(left_kind, Some(kind), "seed {}: left of {:?}", seed, op);
            let expected_right = if op.is_shift() {
                PrimitiveKind::Int
            } else {
                kind
            };
            assert_eq!(right_kind, Some(expected_right), "seed {}: right of {:?}", seed, op);
            if op.is_division() && kind.is_integral() {
                assert!(
                    program.expr_type(*right).excludes_zero(),
                    "seed {}: {:?} {}",
                    seed,
                    op,
                    program.expr_type(*right)
                );
            }
        }
    }
}
