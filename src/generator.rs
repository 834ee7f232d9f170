/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use log::debug;
use log::trace;
use rand::prelude::IteratorRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Binomial;
use rand_distr::Distribution;

use crate::ast::*;
use crate::builder::Builder;
use crate::builder::ResolvedBuilder;
use crate::config::Config;
use crate::config::Knob;
use crate::context::*;
use crate::core_types::*;
use crate::environment::Environment;
use crate::error::FuzzError;
use crate::error::Result;
use crate::random::*;
use crate::registry::TypeRegistry;
use crate::resolver::block_cost;
use crate::state::MethodId;
use crate::state::MethodRecord;
use crate::state::Modifiers;
use crate::state::VarRef;
use crate::types::*;

/// Generates one class with a fresh type registry.
pub fn gen_program(seed: u64, config: &Config) -> Result<Program> {
    let mut registry = TypeRegistry::new();
    gen_program_with_registry(seed, config, &mut registry)
}

/// Generates one class, resetting `registry` first. The registry must not be shared with
/// another session running at the same time.
pub fn gen_program_with_registry(
    seed: u64,
    config: &Config,
    registry: &mut TypeRegistry,
) -> Result<Program> {
    registry.reset();
    registry.prepare_session(&config.knobs)?;
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
    let mut program = Program::new(&config.class_name, seed, config.knobs.clone());
    let entry = program.entry.method;
    let ctx = Context::from_knobs(&program.knobs).for_method(entry, false, MAX_EXECUTION_COST);
    let mut env = Environment::new();
    let length = choose_length(&mut rng, program.knobs.get(Knob::MaxProgramLength));
    debug!("Generating {} with seed {}", config.class_name, seed);
    let body = gen_block(&mut rng, &mut program, registry, ctx, &mut env, length)?;
    let cost = block_cost(&program, &body)?;
    program.state.set_cost(entry, cost);
    program.entry.body = body;
    program.log_stats()?;
    Ok(program)
}

fn choose_length<RngType: rand::Rng>(rng: &mut RngType, max: u32) -> usize {
    if max == 0 {
        0
    } else {
        rng.gen_range(1..=max) as usize
    }
}

fn choose_arity<RngType: rand::Rng>(rng: &mut RngType, max: u32) -> Arity {
    match Binomial::new(max as u64, 0.3) {
        Ok(bin) => bin.sample(rng) as Arity,
        Err(_) => 0,
    }
}

fn roll_knob<RngType: rand::Rng>(rng: &mut RngType, program: &Program, knob: Knob) -> bool {
    roll(rng, program.knobs.probability(knob))
}

/// A type for a new field, local, parameter or return value.
fn choose_value_type<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &Program,
    registry: &TypeRegistry,
) -> MetaType {
    let knobs = &program.knobs;
    if rng.gen_bool(0.1) {
        // restricted values feed loop bounds and array sizes
        return if rng.gen::<bool>() {
            MetaType::loop_bound(knobs.get(Knob::MaxLoopIterations))
        } else {
            program.index_type()
        };
    }
    let base = registry
        .value_types()
        .into_iter()
        .choose(rng)
        .unwrap_or(MetaType::Primitive(PrimitiveKind::Int));
    if rng.gen_bool(0.1) {
        let dimensions = rng.gen_range(1..=knobs.get(Knob::MaxArrayDimensions)) as u8;
        MetaType::array_of(base, dimensions)
    } else {
        base
    }
}

fn choose_printable_type<RngType: rand::Rng>(
    rng: &mut RngType,
    registry: &TypeRegistry,
) -> MetaType {
    registry
        .value_types()
        .into_iter()
        .filter(|t| t.is_printable())
        .choose(rng)
        .unwrap_or(MetaType::Primitive(PrimitiveKind::Int))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum StatementKind {
    Print,
    Assignment,
    MethodCall,
    LocalDeclaration,
    FieldDeclaration,
    ControlFlow,
}
// Tried in this order, each with its own probability; the first one that succeeds fills the slot.
const STATEMENT_CASCADE: &[StatementKind] = &[
    StatementKind::Print,
    StatementKind::Assignment,
    StatementKind::MethodCall,
    StatementKind::LocalDeclaration,
    StatementKind::FieldDeclaration,
    StatementKind::ControlFlow,
];

fn statement_kind_knob(kind: StatementKind) -> Knob {
    match kind {
        StatementKind::Print => Knob::PrintProbability,
        StatementKind::Assignment => Knob::AssignmentProbability,
        StatementKind::MethodCall => Knob::MethodCallProbability,
        StatementKind::LocalDeclaration => Knob::VariableProbability,
        StatementKind::FieldDeclaration => Knob::FieldProbability,
        StatementKind::ControlFlow => Knob::ControlFlowProbability,
    }
}

fn is_statement_kind_allowed_by_context(kind: StatementKind, ctx: Context) -> bool {
    match kind {
        StatementKind::Print => true,
        StatementKind::Assignment => true,
        StatementKind::MethodCall => ctx.may_call() && ctx.cost_budget > 0,
        StatementKind::LocalDeclaration => true,
        StatementKind::FieldDeclaration => true,
        StatementKind::ControlFlow => ctx.may_nest(),
    }
}

fn gen_block<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    length: usize,
) -> Result<Block> {
    let mut block = Block::new();
    for _ in 0..length {
        gen_statement(rng, program, registry, ctx.for_statement(), env, &mut block)?;
    }
    Ok(block)
}

// Skips the slot if no statement kind fires.
fn gen_statement<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    block: &mut Block,
) -> Result<()> {
    for kind in STATEMENT_CASCADE {
        if !is_statement_kind_allowed_by_context(*kind, ctx)
            || !roll_knob(rng, program, statement_kind_knob(*kind))
        {
            continue;
        }
        let generated = match kind {
            StatementKind::Print => gen_print(rng, program, registry, ctx, env, block)?,
            StatementKind::Assignment => gen_assignment(rng, program, registry, ctx, env, block)?,
            StatementKind::MethodCall => {
                gen_call_statement(rng, program, registry, ctx, env, block)?
            }
            StatementKind::LocalDeclaration => {
                gen_local_declaration(rng, program, registry, ctx, env, block)?
            }
            StatementKind::FieldDeclaration => {
                gen_field_declaration(rng, program, registry, ctx)?
            }
            StatementKind::ControlFlow => {
                gen_control_flow(rng, program, registry, ctx, env, block)?
            }
        };
        if generated {
            trace!("gen_statement: {:?}", kind);
            return Ok(());
        }
    }
    Ok(())
}

fn gen_print<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    block: &mut Block,
) -> Result<bool> {
    let t = choose_printable_type(rng, registry);
    let e = gen_expr(rng, program, registry, ctx, env, &t)?;
    if program.is_nop(e) {
        return Ok(false);
    }
    block.push(Statement::Print(e));
    Ok(true)
}

fn gen_assignment<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    block: &mut Block,
) -> Result<bool> {
    let Some(v) = env.random_non_final(rng, &program.state, ctx) else {
        return Ok(false);
    };
    let t = program.state.var_type(v).clone();
    let source = gen_expr(rng, program, registry, ctx, env, &t)?;
    if program.is_nop(source) {
        return Ok(false);
    }
    let e = program.add_assignment(v, source)?;
    block.push(Statement::Expression(e));
    Ok(true)
}

fn gen_call_statement<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    block: &mut Block,
) -> Result<bool> {
    match gen_user_call(rng, program, registry, ctx, env, None)? {
        Some(e) => {
            block.push(Statement::Expression(e));
            Ok(true)
        }
        None => Ok(false),
    }
}

fn gen_local_declaration<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    block: &mut Block,
) -> Result<bool> {
    let t = choose_value_type(rng, program, registry);
    let e = gen_expr(rng, program, registry, ctx, env, &t)?;
    if program.is_nop(e) {
        return Ok(false);
    }
    let modifiers = if roll_knob(rng, program, Knob::FinalProbability) {
        Modifiers::FINAL
    } else {
        Modifiers::empty()
    };
    let local = program.state.add_local(modifiers, t);
    program.state.mark_initialized(VarRef::Local(local));
    // declared after its initializer so that the initializer cannot read it
    env.declare(local);
    block.push(Statement::LocalDeclaration(local, e));
    Ok(true)
}

/// Declares a field with an initializer. Adds nothing to the current block.
fn gen_field_declaration<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
) -> Result<bool> {
    let is_static = ctx.is_static || roll_knob(rng, program, Knob::StaticProbability);
    let mut modifiers = Modifiers::PRIVATE;
    if is_static {
        modifiers |= Modifiers::STATIC;
    }
    if roll_knob(rng, program, Knob::FinalProbability) {
        modifiers |= Modifiers::FINAL;
    }
    let t = choose_value_type(rng, program, registry);
    let mut env = Environment::new();
    let init_ctx = ctx.for_field_initializer(is_static);
    let initializer = gen_expr(rng, program, registry, init_ctx, &mut env, &t)?;
    if program.is_nop(initializer) {
        return Ok(false);
    }
    let field = program.state.add_field(modifiers, t);
    program.state.mark_initialized(VarRef::Field(field));
    program.fields.push(FieldDeclaration { field, initializer });
    debug!("Declared field {}", program.state.field(field).name);
    Ok(true)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ControlFlowKind {
    If,
    For,
    While,
    DoWhile,
}
const ALL_CONTROL_FLOW_KINDS: &[ControlFlowKind] = &[
    ControlFlowKind::If,
    ControlFlowKind::For,
    ControlFlowKind::While,
    ControlFlowKind::DoWhile,
];

fn control_flow_kind_weight(kind: ControlFlowKind, program: &Program) -> u32 {
    program.knobs.get(match kind {
        ControlFlowKind::If => Knob::IfShare,
        ControlFlowKind::For => Knob::ForShare,
        ControlFlowKind::While => Knob::WhileShare,
        ControlFlowKind::DoWhile => Knob::DoWhileShare,
    })
}

fn is_control_flow_kind_allowed_by_context(
    kind: ControlFlowKind,
    program: &Program,
    ctx: Context,
) -> bool {
    match kind {
        ControlFlowKind::If => true,
        // every iteration must still be affordable
        ControlFlowKind::For | ControlFlowKind::While | ControlFlowKind::DoWhile => {
            ctx.cost_budget >= program.knobs.get(Knob::MaxLoopIterations) as u64
        }
    }
}

fn nested_block_length<RngType: rand::Rng>(rng: &mut RngType, program: &Program) -> usize {
    let max = program.knobs.get(Knob::MaxMethodLength).div_ceil(2).max(1);
    choose_length(rng, max)
}

fn gen_control_flow<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    block: &mut Block,
) -> Result<bool> {
    let Some(kind) = choose_weighted(rng, ALL_CONTROL_FLOW_KINDS, |kind| {
        if is_control_flow_kind_allowed_by_context(kind, program, ctx) {
            control_flow_kind_weight(kind, program)
        } else {
            0
        }
    }) else {
        return Ok(false);
    };
    debug!("gen_control_flow: {:?} at depth {}", kind, ctx.control_flow_depth);
    let statement = match kind {
        ControlFlowKind::If => {
            let boolean = MetaType::Primitive(PrimitiveKind::Boolean);
            let cond = gen_expr(rng, program, registry, ctx, env, &boolean)?;
            if program.is_nop(cond) {
                return Ok(false);
            }
            let branch_ctx = ctx.in_branch();
            let length = nested_block_length(rng, program);
            let then =
                env.with_scope(|env| gen_block(rng, program, registry, branch_ctx, env, length))?;
            let otherwise = if roll_knob(rng, program, Knob::ElseProbability) {
                let length = nested_block_length(rng, program);
                Some(env.with_scope(|env| {
                    gen_block(rng, program, registry, branch_ctx, env, length)
                })?)
            } else {
                None
            };
            Statement::If(cond, then, otherwise)
        }
        ControlFlowKind::For | ControlFlowKind::While | ControlFlowKind::DoWhile => {
            let max_iterations = program.knobs.get(Knob::MaxLoopIterations);
            let bound = gen_loop_bound(rng, program, ctx, env, max_iterations)?;
            let counter = program.state.add_loop_counter();
            let body_ctx = ctx.in_loop_body(max_iterations as u64);
            let length = nested_block_length(rng, program);
            let body = env.with_scope(|env| {
                env.declare(counter);
                gen_block(rng, program, registry, body_ctx, env, length)
            })?;
            let l = Loop {
                counter,
                bound,
                body,
            };
            match kind {
                ControlFlowKind::For => Statement::For(l),
                ControlFlowKind::While => Statement::While(l),
                _ => Statement::DoWhile(l),
            }
        }
    };
    block.push(statement);
    Ok(true)
}

/// A literal or a variable whose type guarantees a bound in `[1, max_iterations]`.
fn gen_loop_bound<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    ctx: Context,
    env: &mut Environment,
    max_iterations: u32,
) -> Result<ExprId> {
    let t = MetaType::loop_bound(max_iterations);
    if roll_knob(rng, program, Knob::StateReuseProbability) {
        if let Some(v) = env.initialized_value_of_type(rng, &program.state, ctx, &t) {
            return Ok(program.add_variable_ref(v));
        }
    }
    Builder::Literal(t).build(rng, program, Vec::new())
}

/// Declares a new method called from the method of `ctx`, and generates its body.
/// With `return_type` None any return type may be chosen, void included.
fn gen_method<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    caller: MethodId,
    return_type: Option<MetaType>,
) -> Result<MethodId> {
    let is_static = ctx.is_static || roll_knob(rng, program, Knob::StaticProbability);
    let mut modifiers = Modifiers::PRIVATE;
    if is_static {
        modifiers |= Modifiers::STATIC;
    }
    let arity = choose_arity(rng, program.knobs.get(Knob::MaxMethodParameters));
    let params = make_vec(arity, || choose_value_type(rng, program, registry));
    let return_type = match return_type {
        Some(t) => t,
        None if rng.gen_bool(0.25) => MetaType::Void,
        None => choose_value_type(rng, program, registry),
    };
    let method = program
        .state
        .add_method(modifiers, params.clone(), return_type.clone());
    // recorded before the body exists, so the body cannot call back into the caller
    program.state.record_call(caller, method)?;

    let mut env = Environment::new();
    let param_locals = params
        .into_iter()
        .map(|t| {
            let local = program.state.add_local(Modifiers::empty(), t);
            program.state.mark_initialized(VarRef::Local(local));
            env.declare(local);
            local
        })
        .collect::<Vec<_>>();
    let method_ctx = ctx.for_method(method, is_static, ctx.cost_budget);
    let length = choose_length(rng, program.knobs.get(Knob::MaxMethodLength));
    let mut body = gen_block(rng, program, registry, method_ctx, &mut env, length)?;
    if !return_type.is_void() {
        let ret_ctx = method_ctx.for_statement();
        let e = gen_expr(rng, program, registry, ret_ctx, &mut env, &return_type)?;
        body.push(Statement::Return(Some(e)));
    } else if rng.gen_bool(0.2) {
        body.push(Statement::Return(None));
    }
    let cost = block_cost(program, &body)?;
    program.state.set_cost(method, cost);
    program.methods.push(MethodDeclaration {
        method,
        params: param_locals,
        body,
    });
    debug!(
        "Generated method {} with cost {}",
        program.state.method(method).name,
        cost
    );
    Ok(method)
}

/// A call to a generated method, creating a new one sometimes. `wanted` None accepts any
/// return type and is used for call statements.
fn gen_user_call<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    wanted: Option<&MetaType>,
) -> Result<Option<ExprId>> {
    let Some(caller) = ctx.method else {
        return Ok(None);
    };
    let accepts = |m: &MethodRecord| match wanted {
        Some(t) => t.is_assignable_from(&m.return_type),
        None => true,
    };
    let can_create =
        program.state.num_user_methods() < program.knobs.get(Knob::MaxMethods) as usize;
    let callee = if can_create && roll_knob(rng, program, Knob::MethodProbability) {
        Some(gen_method(rng, program, registry, ctx, caller, wanted.cloned())?)
    } else {
        let budget = ctx.cost_budget;
        let callee = program
            .state
            .random_callable_method_matching(rng, caller, |m| accepts(m) && m.cost <= budget);
        if let Some(callee) = callee {
            program.state.record_call(caller, callee)?;
        }
        callee
    };
    let Some(callee) = callee else {
        return Ok(None);
    };
    let record = program.state.method(callee).clone();
    if record.cost > ctx.cost_budget {
        debug!("Not calling {}: too expensive", record.name);
        return Ok(None);
    }
    let mut args = Vec::with_capacity(record.arity());
    for t in &record.params {
        match gen_param(rng, program, registry, ctx, env, t, false)? {
            Some(e) => args.push(e),
            None => return Ok(None),
        }
    }
    let call = MethodCall {
        is_static: record.is_static(),
        owner: None,
        name: record.name.clone(),
        sender: None,
        args,
        callee: Some(callee),
    };
    Ok(Some(program.add_call(call, record.return_type)))
}

fn can_be_binary_op_result(t: &MetaType) -> bool {
    matches!(
        t,
        MetaType::Primitive(_) | MetaType::Reference(ReferenceType::String)
    )
}

/// Casts `e` to `kind` unless it already has that kind, so that Java evaluates the operator in
/// the kind the node is typed with. Integer domains survive widening.
fn coerce_operand(program: &mut Program, e: ExprId, kind: PrimitiveKind) -> ExprId {
    let t = program.expr_type(e);
    if t.as_primitive() == Some(kind) {
        return e;
    }
    let target = match t {
        MetaType::Restricted(r) if kind.is_integral() => {
            MetaType::restricted(kind, r.domain().clone()).unwrap_or(MetaType::Primitive(kind))
        }
        _ => MetaType::Primitive(kind),
    };
    program.add_cast(target, e)
}

/// Operands are computed in int, long, float or double, narrower results are cast back.
fn gen_binary_op<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    t: &MetaType,
) -> Result<ExprId> {
    let sub_ctx = ctx.for_recursion();
    let (op, operand_kind, right_type) = match t {
        MetaType::Reference(ReferenceType::String) => {
            (BinaryOperator::Add, None, MetaType::string())
        }
        MetaType::Primitive(PrimitiveKind::Boolean) => {
            if rng.gen::<bool>() {
                let op = COMPARISON_OPERATORS
                    .iter()
                    .copied()
                    .choose(rng)
                    .unwrap_or(BinaryOperator::Lt);
                let kind = [PrimitiveKind::Int, PrimitiveKind::Long, PrimitiveKind::Double]
                    .into_iter()
                    .choose(rng)
                    .unwrap_or(PrimitiveKind::Int);
                (op, Some(kind), MetaType::Primitive(kind))
            } else {
                let op = LOGICAL_OPERATORS
                    .iter()
                    .copied()
                    .choose(rng)
                    .unwrap_or(BinaryOperator::And);
                (op, Some(PrimitiveKind::Boolean), t.clone())
            }
        }
        MetaType::Primitive(p) => {
            let kind = match p {
                PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::Float
                | PrimitiveKind::Double => *p,
                _ => PrimitiveKind::Int,
            };
            let mut ops = ARITHMETIC_OPERATORS.to_vec();
            if kind.is_integral() {
                ops.extend_from_slice(INTEGRAL_OPERATORS);
            }
            let op = ops.into_iter().choose(rng).unwrap_or(BinaryOperator::Add);
            let guard_zero = op.is_division() && kind.is_integral() && !ctx.allow_divide_by_zero;
            let right_type = if guard_zero {
                MetaType::nonzero_divisor()
            } else if op.is_shift() {
                MetaType::Primitive(PrimitiveKind::Int)
            } else {
                MetaType::Primitive(kind)
            };
            (op, Some(kind), right_type)
        }
        _ => return Ok(program.add_nop()),
    };
    let left_type = match operand_kind {
        Some(kind) => MetaType::Primitive(kind),
        None => MetaType::string(),
    };
    let left = gen_expr(rng, program, registry, sub_ctx, env, &left_type)?;
    let right = gen_expr(rng, program, registry, sub_ctx, env, &right_type)?;
    if program.is_nop(left) || program.is_nop(right) {
        return Ok(program.add_nop());
    }
    let (left, right) = match operand_kind {
        Some(kind) => {
            // shift distances stay int whatever the shifted kind
            let right_kind = if op.is_shift() { PrimitiveKind::Int } else { kind };
            (
                coerce_operand(program, left, kind),
                coerce_operand(program, right, right_kind),
            )
        }
        None => (left, right),
    };
    let integral = operand_kind.is_some_and(|k| k.is_integral());
    let right_may_be_zero = !program.expr_type(right).excludes_zero();
    if op.is_division() && integral && !ctx.allow_divide_by_zero && right_may_be_zero {
        return Err(FuzzError::unexpected(format!(
            "divisor of type {} may be zero",
            program.expr_type(right)
        )));
    }
    let result_type = match (operand_kind, op) {
        (Some(_), op) if COMPARISON_OPERATORS.contains(&op) => {
            MetaType::Primitive(PrimitiveKind::Boolean)
        }
        (Some(kind), _) => MetaType::Primitive(kind),
        (None, _) => MetaType::string(),
    };
    let e = program.add_binary_op(op, result_type.clone(), left, right);
    if t.is_assignable_from(&result_type) {
        Ok(e)
    } else {
        Ok(program.add_cast(t.clone(), e))
    }
}

fn gen_cast<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    t: &MetaType,
) -> Result<ExprId> {
    let source = ALL_PRIMITIVE_KINDS
        .iter()
        .copied()
        .filter(|p| p.is_numeric())
        .choose(rng)
        .unwrap_or(PrimitiveKind::Int);
    let source = MetaType::Primitive(source);
    let operand = gen_expr(rng, program, registry, ctx.for_recursion(), env, &source)?;
    if program.is_nop(operand) {
        return Ok(operand);
    }
    Ok(program.add_cast(t.clone(), operand))
}

/// A value usable where `t` is required, or NOP if nothing could be built.
pub fn gen_expr<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    t: &MetaType,
) -> Result<ExprId> {
    if t.is_void() {
        return Ok(program.add_nop());
    }
    if roll_knob(rng, program, Knob::StateReuseProbability) {
        if let Some(v) = env.initialized_value_of_type(rng, &program.state, ctx, t) {
            return Ok(program.add_variable_ref(v));
        }
    }
    let null_forbidden = ctx.require_non_null && t.is_nullable();
    if ctx.may_recurse() {
        let wants_call = ctx.may_call() && !null_forbidden;
        if wants_call && roll_knob(rng, program, Knob::MethodCallProbability) {
            if let Some(e) = gen_user_call(rng, program, registry, ctx, env, Some(t))? {
                return Ok(e);
            }
        }
        let assignment_probability = program.knobs.probability(Knob::AssignmentProbability) / 4;
        if !null_forbidden && roll(rng, assignment_probability) {
            if let Some(v) = env.non_final_of_type(rng, &program.state, ctx, t) {
                let var_type = program.state.var_type(v).clone();
                let source = gen_expr(rng, program, registry, ctx.for_recursion(), env, &var_type)?;
                if !program.is_nop(source) {
                    return program.add_assignment(v, source);
                }
            }
        }
        if can_be_binary_op_result(t) && roll_knob(rng, program, Knob::BinaryOpProbability) {
            let e = gen_binary_op(rng, program, registry, ctx, env, t)?;
            if !program.is_nop(e) {
                return Ok(e);
            }
        }
        if matches!(t, MetaType::Primitive(p) if p.is_numeric())
            && roll_knob(rng, program, Knob::CastProbability)
        {
            let e = gen_cast(rng, program, registry, ctx, env, t)?;
            if !program.is_nop(e) {
                return Ok(e);
            }
        }
    }
    gen_from_builders(rng, program, registry, ctx, env, t)
}

fn gen_from_builders<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    t: &MetaType,
) -> Result<ExprId> {
    let allow_external = roll_knob(rng, program, Knob::ExternalCallProbability);
    let candidates = registry
        .builders_for(t)
        .into_iter()
        .filter(|b| !(b.is_null() && ctx.require_non_null))
        .filter(|b| allow_external || !b.is_external())
        .collect::<Vec<_>>();
    let resolved = try_in_random_order(rng, candidates, |rng, builder| {
        resolve_builder(rng, program, registry, ctx, env, builder).transpose()
    });
    match resolved {
        Some(resolved) => {
            let resolved = resolved?;
            let produced = resolved.builder.produces();
            if !t.is_assignable_from(&produced) {
                return Err(FuzzError::unexpected(format!(
                    "builder for {} produces {}",
                    t, produced
                )));
            }
            trace!("gen_from_builders: {:?} for {}", resolved.builder, t);
            resolved.build(rng, program)
        }
        None => {
            debug!("No builder could produce {}", t);
            Ok(program.add_nop())
        }
    }
}

/// Arguments for every parameter of `builder`, or None if one of them cannot be satisfied.
fn resolve_builder<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    builder: Builder,
) -> Result<Option<ResolvedBuilder>> {
    let non_null = builder.requires_non_null();
    let mut args = Vec::new();
    for t in builder.requires() {
        match gen_param(rng, program, registry, ctx, env, &t, non_null)? {
            Some(e) => args.push(e),
            None => return Ok(None),
        }
    }
    Ok(Some(ResolvedBuilder { builder, args }))
}

/// An argument of type `t` for a node generated in `ctx`. Initialized state of a fitting type is
/// always preferred. Otherwise a sub-expression is synthesized, or at the depth limit a builder
/// without parameters is used.
fn gen_param<RngType: rand::Rng>(
    rng: &mut RngType,
    program: &mut Program,
    registry: &TypeRegistry,
    ctx: Context,
    env: &mut Environment,
    t: &MetaType,
    non_null: bool,
) -> Result<Option<ExprId>> {
    let arg_ctx = if non_null {
        ctx.for_recursion().non_null()
    } else {
        ctx.for_recursion()
    };
    if let Some(v) = env.initialized_value_of_type(rng, &program.state, arg_ctx, t) {
        return Ok(Some(program.add_variable_ref(v)));
    }
    if ctx.may_recurse() {
        let e = gen_expr(rng, program, registry, arg_ctx, env, t)?;
        return Ok((!program.is_nop(e)).then_some(e));
    }
    let direct = registry
        .intrinsic_builders(t)
        .into_iter()
        .filter(|b| b.requires().is_empty())
        .filter(|b| !(b.is_null() && non_null))
        .choose(rng);
    match direct {
        Some(builder) => Ok(Some(builder.build(rng, program, Vec::new())?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Knobs;
    use crate::resolver::visit_statements;
    use crate::state::LocalId;

    fn config(assignments: &[&str]) -> Config {
        Config::new("Test", Knobs::from_assignments(assignments.iter().copied()).unwrap())
    }

    fn session(knobs: Knobs) -> (TypeRegistry, Program, Context) {
        let mut registry = TypeRegistry::new();
        registry.prepare_session(&knobs).unwrap();
        let program = Program::new("Test", 0, knobs);
        let entry = program.entry.method;
        let ctx = Context::from_knobs(&program.knobs).for_method(entry, false, MAX_EXECUTION_COST);
        (registry, program, ctx)
    }

    fn declare_initialized(program: &mut Program, env: &mut Environment, t: MetaType) -> LocalId {
        let local = program.state.add_local(Modifiers::empty(), t);
        program.state.mark_initialized(VarRef::Local(local));
        env.declare(local);
        local
    }

    #[test]
    fn test_binary_operands_have_the_operator_kind() {
        let (registry, mut program, ctx) = session(Knobs::default());
        let mut env = Environment::new();
        declare_initialized(&mut program, &mut env, MetaType::Primitive(PrimitiveKind::Int));
        declare_initialized(&mut program, &mut env, MetaType::Primitive(PrimitiveKind::Long));
        let kinds = [PrimitiveKind::Float, PrimitiveKind::Double, PrimitiveKind::Long];
        for seed in 0..50 {
            let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
            for kind in kinds {
                let t = MetaType::Primitive(kind);
                let e = gen_binary_op(&mut rng, &mut program, &registry, ctx, &mut env, &t)
                    .unwrap();
                let Expression::BinaryOp(op, left, right) = program.expr(e) else {
                    continue;
                };
                let (op, left, right) = (*op, *left, *right);
                assert_eq!(program.expr_type(left).as_primitive(), Some(kind), "{:?}", op);
                let right_kind = if op.is_shift() { PrimitiveKind::Int } else { kind };
                assert_eq!(program.expr_type(right).as_primitive(), Some(right_kind), "{:?}", op);
            }
        }
    }

    #[test]
    fn test_param_prefers_initialized_state() {
        let (registry, mut program, ctx) = session(Knobs::default());
        let mut env = Environment::new();
        let int = MetaType::Primitive(PrimitiveKind::Int);
        let local = declare_initialized(&mut program, &mut env, int.clone());
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let e = gen_param(&mut rng, &mut program, &registry, ctx, &mut env, &int, false)
                .unwrap()
                .unwrap();
            assert!(
                matches!(program.expr(e), Expression::VariableRef(VarRef::Local(l)) if *l == local),
                "{:?}",
                program.expr(e)
            );
        }
    }

    #[test]
    fn test_same_seed_same_program() {
        let config = config(&[]);
        for seed in 0..5 {
            let a = gen_program(seed, &config).unwrap().to_java_source().unwrap();
            let b = gen_program(seed, &config).unwrap().to_java_source().unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_empty_program_length() {
        let program = gen_program(1, &config(&["max_program_length=0"])).unwrap();
        assert!(program.entry.body.is_empty());
        assert_eq!(program.state.num_user_methods(), 0);
    }

    #[test]
    fn test_loops_respect_bounds() {
        let config = config(&[
            "control_flow_probability=100",
            "for_share=1",
            "while_share=1",
            "do_while_share=1",
            "if_share=0",
            "max_loop_iterations=3",
        ]);
        for seed in 0..10 {
            let program = gen_program(seed, &config).unwrap();
            for method in program.all_methods() {
                visit_statements(&method.body, &mut |s| {
                    if let Statement::For(l) | Statement::While(l) | Statement::DoWhile(l) = s {
                        let bound = MetaType::loop_bound(3);
                        assert!(bound.is_assignable_from(program.expr_type(l.bound)));
                        assert!(program.state.is_read_only(VarRef::Local(l.counter)));
                    }
                });
            }
        }
    }

    #[test]
    fn test_non_void_methods_end_with_return() {
        let config = config(&["method_call_probability=100", "method_probability=100"]);
        for seed in 0..10 {
            let program = gen_program(seed, &config).unwrap();
            for method in &program.methods {
                let record = program.state.method(method.method);
                if !record.return_type.is_void() {
                    assert!(method.body.ends_with_return(), "{}", record.name);
                }
            }
        }
    }

    #[test]
    fn test_static_methods_only_call_static_methods() {
        let config = config(&[
            "method_call_probability=80",
            "method_probability=60",
            "static_probability=50",
        ]);
        for seed in 0..10 {
            let program = gen_program(seed, &config).unwrap();
            let graph = program.state.call_graph();
            for (id, record) in program.state.user_methods() {
                if record.is_static() {
                    for callee in graph.callees(id) {
                        assert!(program.state.method(*callee).is_static());
                    }
                }
            }
        }
    }
}
