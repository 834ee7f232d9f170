/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use log::info;

use crate::ast::*;
use crate::config::Knob;
use crate::error::FuzzError;
use crate::error::Result;
use crate::state::ClassState;
use crate::state::VarRef;
use crate::types::MetaType;

/// One case per expression variant. Children are resolved before their parent.
pub trait Resolver {
    type Output;

    fn constant(&mut self, program: &Program, id: ExprId, value: &Value) -> Result<Self::Output>;
    fn variable_ref(&mut self, program: &Program, id: ExprId, v: VarRef) -> Result<Self::Output>;
    fn method_call(
        &mut self,
        program: &Program,
        id: ExprId,
        call: &MethodCall,
        sender: Option<Self::Output>,
        args: Vec<Self::Output>,
    ) -> Result<Self::Output>;
    fn constructor_call(
        &mut self,
        program: &Program,
        id: ExprId,
        t: &MetaType,
        args: Vec<Self::Output>,
    ) -> Result<Self::Output>;
    fn array_init(
        &mut self,
        program: &Program,
        id: ExprId,
        t: &MetaType,
        sizes: Vec<Self::Output>,
    ) -> Result<Self::Output>;
    fn type_cast(
        &mut self,
        program: &Program,
        id: ExprId,
        t: &MetaType,
        operand: Self::Output,
    ) -> Result<Self::Output>;
    fn binary_op(
        &mut self,
        program: &Program,
        id: ExprId,
        op: BinaryOperator,
        left: Self::Output,
        right: Self::Output,
    ) -> Result<Self::Output>;
    fn assignment(
        &mut self,
        program: &Program,
        id: ExprId,
        v: VarRef,
        source: Self::Output,
    ) -> Result<Self::Output>;
    fn nop(&mut self, program: &Program, id: ExprId) -> Result<Self::Output>;
}

pub fn resolve<R: Resolver>(resolver: &mut R, program: &Program, id: ExprId) -> Result<R::Output> {
    match program.expr(id) {
        Expression::Constant(value) => resolver.constant(program, id, value),
        Expression::VariableRef(v) => resolver.variable_ref(program, id, *v),
        Expression::Call(Call::Method(call)) => {
            let sender = match call.sender {
                Some(sender) => Some(resolve(resolver, program, sender)?),
                None => None,
            };
            let args = resolve_all(resolver, program, &call.args)?;
            resolver.method_call(program, id, call, sender, args)
        }
        Expression::Call(Call::Constructor(t, args)) => {
            let args = resolve_all(resolver, program, args)?;
            resolver.constructor_call(program, id, t, args)
        }
        Expression::Call(Call::ArrayInit(t, sizes)) => {
            let sizes = resolve_all(resolver, program, sizes)?;
            resolver.array_init(program, id, t, sizes)
        }
        Expression::TypeCast(t, operand) => {
            let operand = resolve(resolver, program, *operand)?;
            resolver.type_cast(program, id, t, operand)
        }
        Expression::BinaryOp(op, left, right) => {
            let left = resolve(resolver, program, *left)?;
            let right = resolve(resolver, program, *right)?;
            resolver.binary_op(program, id, *op, left, right)
        }
        Expression::Assignment(v, source) => {
            let source = resolve(resolver, program, *source)?;
            resolver.assignment(program, id, *v, source)
        }
        Expression::Nop => resolver.nop(program, id),
    }
}

fn resolve_all<R: Resolver>(
    resolver: &mut R,
    program: &Program,
    ids: &[ExprId],
) -> Result<Vec<R::Output>> {
    ids.iter().map(|id| resolve(resolver, program, *id)).collect()
}

fn escape_char(c: char, quote: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        c if c == quote => format!("\\{}", c),
        c => c.to_string(),
    }
}

fn parenthesize_negative(s: String) -> String {
    if s.starts_with('-') {
        format!("({})", s)
    } else {
        s
    }
}

/// Java source for a literal. Narrow integers carry a cast so their type is unambiguous.
pub fn format_value(value: &Value, t: &MetaType) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Byte(n) => format!("((byte) {})", n),
        Value::Short(n) => format!("((short) {})", n),
        Value::Char(n) => match char::from_u32(*n as u32) {
            Some(c) if (' '..='~').contains(&c) => format!("'{}'", escape_char(c, '\'')),
            _ => format!("((char) {})", n),
        },
        Value::Int(n) => parenthesize_negative(n.to_string()),
        Value::Long(n) => parenthesize_negative(format!("{}L", n)),
        Value::Float(x) if x.is_nan() => "Float.NaN".to_string(),
        Value::Float(x) if x.is_infinite() && *x > 0.0 => "Float.POSITIVE_INFINITY".to_string(),
        Value::Float(x) if x.is_infinite() => "Float.NEGATIVE_INFINITY".to_string(),
        Value::Float(x) => parenthesize_negative(format!("{:?}f", x)),
        Value::Double(x) if x.is_nan() => "Double.NaN".to_string(),
        Value::Double(x) if x.is_infinite() && *x > 0.0 => "Double.POSITIVE_INFINITY".to_string(),
        Value::Double(x) if x.is_infinite() => "Double.NEGATIVE_INFINITY".to_string(),
        Value::Double(x) => parenthesize_negative(format!("{:?}d", x)),
        Value::String(s) => format!(
            "\"{}\"",
            s.chars().map(|c| escape_char(c, '"')).collect::<String>()
        ),
        // the cast picks the overload when null is a method argument
        Value::Null => format!("(({}) null)", t),
    }
}

/// Resolves expressions to Java source text.
pub struct JavaSourceResolver<'a> {
    class_name: &'a str,
    state: &'a ClassState,
    method: String,
}
impl<'a> JavaSourceResolver<'a> {
    pub fn new(program: &'a Program) -> Self {
        JavaSourceResolver {
            class_name: &program.class_name,
            state: &program.state,
            method: "<fields>".to_string(),
        }
    }

    pub fn in_method(&mut self, name: &str) {
        self.method = name.to_string();
    }

    fn emission_error(&self, reason: &str) -> FuzzError {
        FuzzError::Emission {
            class: self.class_name.to_string(),
            method: self.method.clone(),
            reason: reason.to_string(),
        }
    }
}
impl<'a> Resolver for JavaSourceResolver<'a> {
    type Output = String;

    fn constant(&mut self, program: &Program, id: ExprId, value: &Value) -> Result<String> {
        Ok(format_value(value, program.expr_type(id)))
    }

    fn variable_ref(&mut self, _program: &Program, _id: ExprId, v: VarRef) -> Result<String> {
        Ok(self.state.var_name(v).to_string())
    }

    fn method_call(
        &mut self,
        _program: &Program,
        _id: ExprId,
        call: &MethodCall,
        sender: Option<String>,
        args: Vec<String>,
    ) -> Result<String> {
        let args = args.join(", ");
        Ok(match (sender, &call.owner) {
            (Some(sender), _) => format!("({}).{}({})", sender, call.name, args),
            (None, Some(owner)) => format!("{}.{}({})", owner, call.name, args),
            (None, None) => format!("{}({})", call.name, args),
        })
    }

    fn constructor_call(
        &mut self,
        _program: &Program,
        _id: ExprId,
        t: &MetaType,
        args: Vec<String>,
    ) -> Result<String> {
        Ok(format!("new {}({})", t, args.join(", ")))
    }

    fn array_init(
        &mut self,
        _program: &Program,
        _id: ExprId,
        t: &MetaType,
        sizes: Vec<String>,
    ) -> Result<String> {
        let MetaType::Array(a) = t else {
            return Err(FuzzError::unexpected(format!("array init of {}", t)));
        };
        let sizes = sizes
            .iter()
            .map(|s| format!("[{}]", s))
            .collect::<String>();
        Ok(format!("new {}{}", a.component(), sizes))
    }

    fn type_cast(
        &mut self,
        _program: &Program,
        _id: ExprId,
        t: &MetaType,
        operand: String,
    ) -> Result<String> {
        Ok(format!("(({}) {})", t, operand))
    }

    fn binary_op(
        &mut self,
        _program: &Program,
        _id: ExprId,
        op: BinaryOperator,
        left: String,
        right: String,
    ) -> Result<String> {
        Ok(format!("({} {} {})", left, op, right))
    }

    fn assignment(
        &mut self,
        _program: &Program,
        _id: ExprId,
        v: VarRef,
        source: String,
    ) -> Result<String> {
        Ok(format!("({} = {})", self.state.var_name(v), source))
    }

    fn nop(&mut self, _program: &Program, _id: ExprId) -> Result<String> {
        Err(self.emission_error("no value available for an expression"))
    }
}

/// Number of expression nodes below and including the root.
pub struct NodeCountResolver;
impl Resolver for NodeCountResolver {
    type Output = usize;

    fn constant(&mut self, _: &Program, _: ExprId, _: &Value) -> Result<usize> {
        Ok(1)
    }
    fn variable_ref(&mut self, _: &Program, _: ExprId, _: VarRef) -> Result<usize> {
        Ok(1)
    }
    fn method_call(
        &mut self,
        _: &Program,
        _: ExprId,
        _: &MethodCall,
        sender: Option<usize>,
        args: Vec<usize>,
    ) -> Result<usize> {
        Ok(1 + sender.unwrap_or(0) + args.iter().sum::<usize>())
    }
    fn constructor_call(
        &mut self,
        _: &Program,
        _: ExprId,
        _: &MetaType,
        args: Vec<usize>,
    ) -> Result<usize> {
        Ok(1 + args.iter().sum::<usize>())
    }
    fn array_init(
        &mut self,
        _: &Program,
        _: ExprId,
        _: &MetaType,
        sizes: Vec<usize>,
    ) -> Result<usize> {
        Ok(1 + sizes.iter().sum::<usize>())
    }
    fn type_cast(&mut self, _: &Program, _: ExprId, _: &MetaType, operand: usize) -> Result<usize> {
        Ok(1 + operand)
    }
    fn binary_op(
        &mut self,
        _: &Program,
        _: ExprId,
        _: BinaryOperator,
        left: usize,
        right: usize,
    ) -> Result<usize> {
        Ok(1 + left + right)
    }
    fn assignment(&mut self, _: &Program, _: ExprId, _: VarRef, source: usize) -> Result<usize> {
        Ok(1 + source)
    }
    fn nop(&mut self, _: &Program, _: ExprId) -> Result<usize> {
        Ok(1)
    }
}

/// Upper bound on the statements executed while evaluating an expression, counting callee bodies.
pub struct CostResolver;
impl Resolver for CostResolver {
    type Output = u64;

    fn constant(&mut self, _: &Program, _: ExprId, _: &Value) -> Result<u64> {
        Ok(0)
    }
    fn variable_ref(&mut self, _: &Program, _: ExprId, _: VarRef) -> Result<u64> {
        Ok(0)
    }
    fn method_call(
        &mut self,
        program: &Program,
        _: ExprId,
        call: &MethodCall,
        sender: Option<u64>,
        args: Vec<u64>,
    ) -> Result<u64> {
        let own = match call.callee {
            Some(m) => 1u64.saturating_add(program.state.method(m).cost),
            None => 1,
        };
        Ok(args
            .iter()
            .fold(own.saturating_add(sender.unwrap_or(0)), |acc, c| acc.saturating_add(*c)))
    }
    fn constructor_call(
        &mut self,
        _: &Program,
        _: ExprId,
        _: &MetaType,
        args: Vec<u64>,
    ) -> Result<u64> {
        Ok(args.iter().fold(1u64, |acc, c| acc.saturating_add(*c)))
    }
    fn array_init(&mut self, _: &Program, _: ExprId, _: &MetaType, sizes: Vec<u64>) -> Result<u64> {
        Ok(sizes.iter().fold(1u64, |acc, c| acc.saturating_add(*c)))
    }
    fn type_cast(&mut self, _: &Program, _: ExprId, _: &MetaType, operand: u64) -> Result<u64> {
        Ok(operand)
    }
    fn binary_op(
        &mut self,
        _: &Program,
        _: ExprId,
        _: BinaryOperator,
        left: u64,
        right: u64,
    ) -> Result<u64> {
        Ok(left.saturating_add(right))
    }
    fn assignment(&mut self, _: &Program, _: ExprId, _: VarRef, source: u64) -> Result<u64> {
        Ok(source)
    }
    fn nop(&mut self, _: &Program, _: ExprId) -> Result<u64> {
        Ok(0)
    }
}

/// Largest number of iterations a loop with this bound can run.
pub fn loop_iterations(program: &Program, bound: ExprId) -> u64 {
    match program.expr_type(bound) {
        MetaType::Restricted(r) => r.domain().max().unwrap_or(0).max(0) as u64,
        _ => program.knobs.get(Knob::MaxLoopIterations) as u64,
    }
}

fn expr_cost(program: &Program, id: ExprId) -> Result<u64> {
    resolve(&mut CostResolver, program, id)
}

/// Upper bound on the statements one execution of the block runs.
pub fn block_cost(program: &Program, block: &Block) -> Result<u64> {
    let mut total = 0u64;
    for statement in &block.statements {
        let cost = match statement {
            Statement::Expression(e)
            | Statement::LocalDeclaration(_, e)
            | Statement::Print(e)
            | Statement::Return(Some(e)) => 1u64.saturating_add(expr_cost(program, *e)?),
            Statement::Return(None) => 1,
            Statement::If(cond, then, otherwise) => {
                let otherwise = match otherwise {
                    Some(b) => block_cost(program, b)?,
                    None => 0,
                };
                1u64.saturating_add(expr_cost(program, *cond)?)
                    .saturating_add(block_cost(program, then)?)
                    .saturating_add(otherwise)
            }
            Statement::For(l) | Statement::While(l) | Statement::DoWhile(l) => {
                let per_iteration = 1u64
                    .saturating_add(expr_cost(program, l.bound)?)
                    .saturating_add(block_cost(program, &l.body)?);
                loop_iterations(program, l.bound)
                    .saturating_mul(per_iteration)
                    .saturating_add(2)
            }
        };
        total = total.saturating_add(cost);
    }
    Ok(total)
}

/// Calls `f` on every statement of the block, nested ones included.
pub fn visit_statements<F: FnMut(&Statement)>(block: &Block, f: &mut F) {
    for statement in &block.statements {
        f(statement);
        match statement {
            Statement::If(_, then, otherwise) => {
                visit_statements(then, f);
                if let Some(otherwise) = otherwise {
                    visit_statements(otherwise, f);
                }
            }
            Statement::For(l) | Statement::While(l) | Statement::DoWhile(l) => {
                visit_statements(&l.body, f)
            }
            _ => {}
        }
    }
}

fn statement_roots(statement: &Statement) -> Vec<ExprId> {
    match statement {
        Statement::Expression(e)
        | Statement::LocalDeclaration(_, e)
        | Statement::Print(e)
        | Statement::Return(Some(e))
        | Statement::If(e, _, _) => vec![*e],
        Statement::For(l) | Statement::While(l) | Statement::DoWhile(l) => vec![l.bound],
        Statement::Return(None) => Vec::new(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgramStats {
    pub fields: usize,
    pub methods: usize,
    pub statements: usize,
    pub expression_nodes: usize,
}

impl Program {
    pub fn stats(&self) -> Result<ProgramStats> {
        let mut stats = ProgramStats {
            fields: self.fields.len(),
            methods: self.state.num_user_methods(),
            ..ProgramStats::default()
        };
        for field in &self.fields {
            stats.expression_nodes += resolve(&mut NodeCountResolver, self, field.initializer)?;
        }
        let mut roots = Vec::new();
        for method in self.all_methods() {
            visit_statements(&method.body, &mut |s| {
                stats.statements += 1;
                roots.extend(statement_roots(s));
            });
        }
        for root in roots {
            stats.expression_nodes += resolve(&mut NodeCountResolver, self, root)?;
        }
        Ok(stats)
    }

    pub fn log_stats(&self) -> Result<()> {
        let stats = self.stats()?;
        info!(
            "Generated {}: {} fields, {} methods, {} statements, {} expression nodes",
            self.class_name, stats.fields, stats.methods, stats.statements, stats.expression_nodes
        );
        Ok(())
    }

    /// Command line that regenerates this program.
    pub fn reproduction_command(&self) -> String {
        let mut command = format!(
            "jvmfuzz generate --seed {} --class-name {}",
            self.initial_seed, self.class_name
        );
        for (knob, value) in self.knobs.non_default() {
            command.push_str(&format!(" --knob {}={}", knob, value));
        }
        command
    }

    pub fn to_java_source(&self) -> Result<String> {
        let mut writer = SourceWriter {
            out: String::new(),
            indent: 0,
            resolver: JavaSourceResolver::new(self),
            program: self,
        };
        writer.write_program()?;
        Ok(writer.out)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.to_java_source().map_err(|_| fmt::Error)?;
        write!(f, "{}", source)
    }
}

struct SourceWriter<'a> {
    out: String,
    indent: usize,
    resolver: JavaSourceResolver<'a>,
    program: &'a Program,
}
impl<'a> SourceWriter<'a> {
    fn line(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn expr(&mut self, id: ExprId) -> Result<String> {
        resolve(&mut self.resolver, self.program, id)
    }

    fn write_program(&mut self) -> Result<()> {
        let program = self.program;
        self.line("// To reproduce:");
        self.line(&format!("// {}", program.reproduction_command()));
        self.line(&format!("public class {} {{", program.class_name));
        self.indent += 1;
        for field in &program.fields {
            let record = program.state.field(field.field);
            let initializer = self.expr(field.initializer)?;
            self.line(&format!(
                "{}{} {} = {};",
                record.modifiers.keywords(),
                record.ty,
                record.name,
                initializer
            ));
        }
        for method in program.all_methods() {
            self.out.push('\n');
            self.write_method(method)?;
        }
        self.out.push('\n');
        self.line("public static void main(String[] args) {");
        self.indent += 1;
        let entry = program.state.method(program.entry.method).name.clone();
        self.line(&format!("new {}().{}();", program.class_name, entry));
        self.indent -= 1;
        self.line("}");
        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    fn write_method(&mut self, method: &MethodDeclaration) -> Result<()> {
        let program = self.program;
        let record = program.state.method(method.method);
        self.resolver.in_method(&record.name);
        let params = method
            .params
            .iter()
            .map(|p| {
                let local = program.state.local(*p);
                format!("{} {}", local.ty, local.name)
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.line(&format!(
            "{}{} {}({}) {{",
            record.modifiers.keywords(),
            record.return_type,
            record.name,
            params
        ));
        self.write_block_contents(&method.body)?;
        self.line("}");
        Ok(())
    }

    fn write_block_contents(&mut self, block: &Block) -> Result<()> {
        self.indent += 1;
        for statement in &block.statements {
            self.write_statement(statement)?;
        }
        self.indent -= 1;
        Ok(())
    }

    fn write_statement(&mut self, statement: &Statement) -> Result<()> {
        let program = self.program;
        match statement {
            // a parenthesized assignment is not a statement
            Statement::Expression(e) => match program.expr(*e) {
                Expression::Assignment(v, source) => {
                    let source = self.expr(*source)?;
                    self.line(&format!("{} = {};", program.state.var_name(*v), source));
                }
                _ => {
                    let e = self.expr(*e)?;
                    self.line(&format!("{};", e));
                }
            },
            Statement::LocalDeclaration(local, e) => {
                let record = program.state.local(*local);
                let e = self.expr(*e)?;
                self.line(&format!(
                    "{}{} {} = {};",
                    record.modifiers.keywords(),
                    record.ty,
                    record.name,
                    e
                ));
            }
            Statement::Print(e) => {
                let e = self.expr(*e)?;
                self.line(&format!("System.out.println({});", e));
            }
            Statement::If(cond, then, otherwise) => {
                let cond = self.expr(*cond)?;
                self.line(&format!("if ({}) {{", cond));
                self.write_block_contents(then)?;
                if let Some(otherwise) = otherwise {
                    self.line("} else {");
                    self.write_block_contents(otherwise)?;
                }
                self.line("}");
            }
            Statement::For(l) => {
                let counter = &program.state.local(l.counter).name;
                let bound = self.expr(l.bound)?;
                self.line(&format!(
                    "for (int {c} = 0; {c} < {}; {c}++) {{",
                    bound,
                    c = counter
                ));
                self.write_block_contents(&l.body)?;
                self.line("}");
            }
            Statement::While(l) => {
                let counter = &program.state.local(l.counter).name;
                let bound = self.expr(l.bound)?;
                self.line(&format!("int {} = 0;", counter));
                self.line(&format!("while ({} < {}) {{", counter, bound));
                self.indent += 1;
                self.line(&format!("{}++;", counter));
                self.indent -= 1;
                self.write_block_contents(&l.body)?;
                self.line("}");
            }
            Statement::DoWhile(l) => {
                let counter = &program.state.local(l.counter).name;
                let bound = self.expr(l.bound)?;
                self.line(&format!("int {} = 0;", counter));
                self.line("do {");
                self.indent += 1;
                self.line(&format!("{}++;", counter));
                self.indent -= 1;
                self.write_block_contents(&l.body)?;
                self.line(&format!("}} while ({} < {});", counter, bound));
            }
            Statement::Return(None) => self.line("return;"),
            Statement::Return(Some(e)) => {
                let e = self.expr(*e)?;
                self.line(&format!("return {};", e));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Knobs;
    use crate::state::Modifiers;
    use crate::types::IntDomain;
    use crate::types::PrimitiveKind;

    fn resolve_constant(value: Value, t: MetaType) -> String {
        let mut program = Program::new("Test", 0, Knobs::default());
        let id = program.add_constant(value, t).unwrap();
        let mut resolver = JavaSourceResolver::new(&program);
        resolve(&mut resolver, &program, id).unwrap()
    }

    #[test]
    fn test_narrow_constants_carry_casts() {
        let byte = MetaType::Primitive(PrimitiveKind::Byte);
        assert_eq!(resolve_constant(Value::Byte(-128), byte.clone()), "((byte) -128)");
        assert_eq!(resolve_constant(Value::Byte(127), byte), "((byte) 127)");
        let short = MetaType::Primitive(PrimitiveKind::Short);
        assert_eq!(resolve_constant(Value::Short(-2), short), "((short) -2)");
        let int = MetaType::Primitive(PrimitiveKind::Int);
        assert_eq!(resolve_constant(Value::Int(i32::MIN), int.clone()), "(-2147483648)");
        assert_eq!(resolve_constant(Value::Int(i32::MAX), int), "2147483647");
        let long = MetaType::Primitive(PrimitiveKind::Long);
        assert_eq!(resolve_constant(Value::Long(7), long), "7L");
    }

    #[test]
    fn test_chars_floats_and_strings() {
        let char_t = MetaType::Primitive(PrimitiveKind::Char);
        assert_eq!(resolve_constant(Value::Char(b'a' as u16), char_t.clone()), "'a'");
        assert_eq!(resolve_constant(Value::Char(b'\'' as u16), char_t.clone()), "'\\''");
        assert_eq!(resolve_constant(Value::Char(0xd800), char_t), "((char) 55296)");
        let float = MetaType::Primitive(PrimitiveKind::Float);
        assert_eq!(resolve_constant(Value::Float(0.5), float.clone()), "0.5f");
        assert_eq!(resolve_constant(Value::Float(f32::NAN), float), "Float.NaN");
        let double = MetaType::Primitive(PrimitiveKind::Double);
        assert_eq!(resolve_constant(Value::Double(-1.0), double), "(-1.0d)");
        assert_eq!(
            resolve_constant(Value::String("a\"b".to_string()), MetaType::string()),
            "\"a\\\"b\""
        );
        assert_eq!(
            resolve_constant(Value::Null, MetaType::string()),
            "((String) null)"
        );
    }

    #[test]
    fn test_restricted_constants() {
        let t = MetaType::restricted(PrimitiveKind::Int, IntDomain::set([-9, 2, 10, 12, 100]));
        let t = t.unwrap();
        assert_eq!(resolve_constant(Value::Int(-9), t.clone()), "(-9)");
        assert_eq!(resolve_constant(Value::Int(100), t), "100");
    }

    #[test]
    fn test_nop_cannot_be_emitted() {
        let mut program = Program::new("Test", 0, Knobs::default());
        let nop = program.add_nop();
        program.entry.body.push(Statement::Print(nop));
        match program.to_java_source() {
            Err(FuzzError::Emission { class, method, .. }) => {
                assert_eq!(class, "Test");
                assert_eq!(method, "run");
            }
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn test_empty_program() {
        let program = Program::new("Empty", 3, Knobs::default());
        let source = program.to_java_source().unwrap();
        assert!(source.starts_with(
            "// To reproduce:\n// jvmfuzz generate --seed 3 --class-name Empty\n"
        ));
        assert!(source.contains("public class Empty {"));
        assert!(source.contains("    public void run() {\n    }\n"));
        assert!(source.contains("        new Empty().run();\n"));
        assert_eq!(program.stats().unwrap(), ProgramStats::default());
    }

    #[test]
    fn test_loops_and_assignments() {
        let mut program = Program::new("Loops", 0, Knobs::default());
        let int = MetaType::Primitive(PrimitiveKind::Int);
        let v = program.state.add_local(Modifiers::empty(), int.clone());
        let init = program.add_constant(Value::Int(1), int.clone()).unwrap();
        program.entry.body.push(Statement::LocalDeclaration(v, init));
        let counter = program.state.add_loop_counter();
        let bound = program.add_constant(Value::Int(3), MetaType::loop_bound(5)).unwrap();
        let two = program.add_constant(Value::Int(2), int).unwrap();
        let assign = program.add_assignment(VarRef::Local(v), two).unwrap();
        let mut body = Block::new();
        body.push(Statement::Expression(assign));
        program.entry.body.push(Statement::While(Loop {
            counter,
            bound,
            body,
        }));
        let source = program.to_java_source().unwrap();
        assert!(source.contains("        int v1 = 1;\n"));
        assert!(source.contains(
            "        int v2 = 0;\n        while (v2 < 3) {\n            v2++;\n            v1 = 2;\n        }\n"
        ));
        // the bound's type allows up to 5 iterations of 2 statements each
        assert_eq!(block_cost(&program, &program.entry.body).unwrap(), 1 + 5 * 2 + 2);
        let stats = program.stats().unwrap();
        assert_eq!(stats.statements, 3);
        assert_eq!(stats.expression_nodes, 4);
    }
}
