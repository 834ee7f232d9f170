/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use jvmfuzz::Builder;
use jvmfuzz::ClassState;
use jvmfuzz::Config;
use jvmfuzz::Expression;
use jvmfuzz::IntDomain;
use jvmfuzz::Knobs;
use jvmfuzz::MetaType;
use jvmfuzz::Modifiers;
use jvmfuzz::PrimitiveKind;
use jvmfuzz::Program;
use proptest::prelude::*;
use rand::SeedableRng;

const PRIMITIVES: &[PrimitiveKind] = &[
    PrimitiveKind::Boolean,
    PrimitiveKind::Byte,
    PrimitiveKind::Short,
    PrimitiveKind::Char,
    PrimitiveKind::Int,
    PrimitiveKind::Long,
    PrimitiveKind::Float,
    PrimitiveKind::Double,
];

fn arb_primitive() -> impl Strategy<Value = PrimitiveKind> {
    prop::sample::select(PRIMITIVES)
}

fn arb_component() -> impl Strategy<Value = MetaType> {
    prop_oneof![
        arb_primitive().prop_map(MetaType::Primitive),
        arb_primitive().prop_map(MetaType::boxed),
        Just(MetaType::object()),
        Just(MetaType::string()),
        Just(MetaType::date()),
        (1u32..32).prop_map(MetaType::array_index),
        Just(MetaType::nonzero_divisor()),
        Just(MetaType::dynamic("com.example.Node", false, vec![vec![]])),
    ]
}

fn arb_type() -> impl Strategy<Value = MetaType> {
    prop_oneof![
        arb_component(),
        (arb_component(), 1u8..5).prop_map(|(c, n)| MetaType::array_of(c, n)),
    ]
}

// Widening is transitive, so "wider" means "widens from" over the numeric kinds.
fn is_wider(a: PrimitiveKind, b: PrimitiveKind) -> bool {
    a != b && a.widens_from(b) && !b.widens_from(a)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn assignability_is_reflexive(t in arb_type()) {
        prop_assert!(t.is_assignable_from(&t));
        prop_assert!(!MetaType::Void.is_assignable_from(&MetaType::Void));
    }

    #[test]
    fn primitives_never_narrow(a in arb_primitive(), b in arb_primitive()) {
        if is_wider(a, b) {
            prop_assert!(!MetaType::Primitive(b).is_assignable_from(&MetaType::Primitive(a)));
            prop_assert!(MetaType::Primitive(a).is_assignable_from(&MetaType::Primitive(b)));
        }
    }

    #[test]
    fn nested_arrays_compose(c in arb_component(), n in 2u8..5) {
        let whole = MetaType::array_of(c.clone(), n);
        let inner = MetaType::array_of(c.clone(), n - 1);
        prop_assert_eq!(&MetaType::array_of(inner, 1), &whole);
        prop_assert_eq!(whole.dimensions(), n);
        prop_assert_eq!(whole.array_element(), Some(MetaType::array_of(c, n - 1)));
    }

    #[test]
    fn call_graph_stays_acyclic(
        num_methods in 1usize..8,
        edges in prop::collection::vec((0usize..8, 0usize..8), 0..40),
    ) {
        let mut state = ClassState::new();
        let methods = (0..num_methods)
            .map(|_| state.add_method(Modifiers::PRIVATE, vec![], MetaType::Void))
            .collect::<Vec<_>>();
        for (from, to) in edges {
            let caller = methods[from % num_methods];
            let callee = methods[to % num_methods];
            let allowed = caller != callee
                && !state.call_graph().excluded_for_calling(caller).contains(&callee);
            let recorded = state.record_call(caller, callee);
            prop_assert_eq!(recorded.is_ok(), allowed);
        }
        let graph = state.call_graph();
        prop_assert!(graph.is_acyclic());
        for m in &methods {
            let excluded = graph.excluded_for_calling(*m);
            prop_assert!(excluded.contains(m));
            for ancestor in graph.ancestors(*m) {
                prop_assert!(excluded.contains(&ancestor));
            }
        }
    }

    #[test]
    fn callable_methods_never_close_a_cycle(
        seed in any::<u64>(),
        num_methods in 1usize..8,
        attempts in 0usize..30,
    ) {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let mut state = ClassState::new();
        let methods = (0..num_methods)
            .map(|_| state.add_method(Modifiers::PRIVATE, vec![], MetaType::Void))
            .collect::<Vec<_>>();
        for i in 0..attempts {
            let caller = methods[i % num_methods];
            if let Some(callee) = state.random_callable_method(&mut rng, caller) {
                prop_assert!(state.record_call(caller, callee).is_ok());
            }
        }
        prop_assert!(state.call_graph().is_acyclic());
    }

    #[test]
    fn restricted_literals_stay_in_their_domain(seed in any::<u64>()) {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let mut program = Program::new("Test", seed, Knobs::default());
        let t = MetaType::nonzero_divisor();
        let e = Builder::Literal(t.clone()).build(&mut rng, &mut program, vec![]).unwrap();
        let value = match program.expr(e) {
            Expression::Constant(value) => value.clone(),
            other => panic!("expected a constant, got {:?}", other),
        };
        let n = value.as_integer().unwrap();
        prop_assert!([-9, 2, 10, 12, 100].contains(&n));
        let text = jvmfuzz::format_value(&value, &t);
        prop_assert_eq!(text.trim_start_matches('(').trim_end_matches(')'), n.to_string());
    }

    #[test]
    fn range_literals_stay_in_their_range(
        seed in any::<u64>(),
        lo in -50i64..50,
        width in 0i64..50,
    ) {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let mut program = Program::new("Test", seed, Knobs::default());
        let domain = IntDomain::Range(lo, lo + width);
        let t = MetaType::restricted(PrimitiveKind::Long, domain).unwrap();
        let e = Builder::Literal(t).build(&mut rng, &mut program, vec![]).unwrap();
        let n = match program.expr(e) {
            Expression::Constant(value) => value.as_integer().unwrap(),
            other => panic!("expected a constant, got {:?}", other),
        };
        prop_assert!(lo <= n && n <= lo + width);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn generation_is_deterministic(seed in any::<u64>()) {
        let config = Config::default();
        let first = jvmfuzz::gen_program(seed, &config).unwrap().to_java_source().unwrap();
        let second = jvmfuzz::gen_program(seed, &config).unwrap().to_java_source().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn generated_call_graphs_are_acyclic(seed in any::<u64>()) {
        let knobs = Knobs::from_assignments([
            "method_probability=60",
            "method_call_probability=60",
        ])
        .unwrap();
        let program = jvmfuzz::gen_program(seed, &Config::new("Test", knobs)).unwrap();
        let graph = program.state.call_graph();
        prop_assert!(graph.is_acyclic());
        for (id, _) in program.state.user_methods() {
            prop_assert!(!graph.callees(id).contains(&id));
        }
    }
}
