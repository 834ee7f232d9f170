/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use BinaryOperator::*;

use crate::config::Knob;
use crate::config::Knobs;
use crate::error::FuzzError;
use crate::error::Result;
use crate::state::ClassState;
use crate::state::FieldId;
use crate::state::LocalId;
use crate::state::MethodId;
use crate::state::VarRef;
use crate::types::MetaType;
use crate::types::PrimitiveKind;
use crate::types::ReferenceType;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Null,
}
impl Value {
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::Boolean(_) => Some(PrimitiveKind::Boolean),
            Value::Byte(_) => Some(PrimitiveKind::Byte),
            Value::Short(_) => Some(PrimitiveKind::Short),
            Value::Char(_) => Some(PrimitiveKind::Char),
            Value::Int(_) => Some(PrimitiveKind::Int),
            Value::Long(_) => Some(PrimitiveKind::Long),
            Value::Float(_) => Some(PrimitiveKind::Float),
            Value::Double(_) => Some(PrimitiveKind::Double),
            Value::String(_) | Value::Null => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Byte(n) => Some(*n as i64),
            Value::Short(n) => Some(*n as i64),
            Value::Char(n) => Some(*n as i64),
            Value::Int(n) => Some(*n as i64),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// The integral value of `kind` holding `n`, if it fits.
    pub fn integer(kind: PrimitiveKind, n: i64) -> Option<Value> {
        let (lo, hi) = kind.integer_bounds()?;
        if n < lo || n > hi {
            return None;
        }
        Some(match kind {
            PrimitiveKind::Byte => Value::Byte(n as i8),
            PrimitiveKind::Short => Value::Short(n as i16),
            PrimitiveKind::Char => Value::Char(n as u16),
            PrimitiveKind::Int => Value::Int(n as i32),
            _ => Value::Long(n),
        })
    }

    /// Whether a literal of this value has exactly type `t`.
    pub fn fits(&self, t: &MetaType) -> bool {
        match (self, t) {
            (Value::Null, t) => t.is_nullable(),
            (Value::String(_), MetaType::Reference(ReferenceType::String)) => true,
            (v, MetaType::Primitive(p)) => v.primitive_kind() == Some(*p),
            (v, MetaType::Restricted(r)) => {
                v.primitive_kind() == Some(r.base())
                    && v.as_integer().is_some_and(|n| r.domain().contains_value(n))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}
pub const ARITHMETIC_OPERATORS: &[BinaryOperator] = &[Add, Sub, Mul, Div, Rem];
pub const INTEGRAL_OPERATORS: &[BinaryOperator] = &[Shl, Shr, UShr, BitAnd, BitOr, BitXor];
pub const COMPARISON_OPERATORS: &[BinaryOperator] = &[Lt, Le, Gt, Ge, Eq, Ne];
pub const LOGICAL_OPERATORS: &[BinaryOperator] = &[And, Or, BitAnd, BitOr, BitXor, Eq, Ne];
impl BinaryOperator {
    pub fn is_division(self) -> bool {
        matches!(self, Div | Rem)
    }

    /// The right operand of a shift is a distance and stays `int`.
    pub fn is_shift(self) -> bool {
        matches!(self, Shl | Shr | UShr)
    }
}
impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Add => "+",
                Sub => "-",
                Mul => "*",
                Div => "/",
                Rem => "%",
                Shl => "<<",
                Shr => ">>",
                UShr => ">>>",
                BitAnd => "&",
                BitOr => "|",
                BitXor => "^",
                Lt => "<",
                Le => "<=",
                Gt => ">",
                Ge => ">=",
                Eq => "==",
                Ne => "!=",
                And => "&&",
                Or => "||",
            }
        )
    }
}

#[derive(Clone, Debug)]
pub struct MethodCall {
    pub is_static: bool,
    /// Declaring type of a static call into the class library.
    pub owner: Option<MetaType>,
    pub name: String,
    pub sender: Option<ExprId>,
    pub args: Vec<ExprId>,
    /// Set for calls to generated methods.
    pub callee: Option<MethodId>,
}

#[derive(Clone, Debug)]
pub enum Call {
    Method(MethodCall),
    Constructor(MetaType, Vec<ExprId>),
    // one size per dimension
    ArrayInit(MetaType, Vec<ExprId>),
}

#[derive(Clone, Debug)]
pub enum Expression {
    Constant(Value),
    VariableRef(VarRef),
    Call(Call),
    TypeCast(MetaType, ExprId),
    BinaryOp(BinaryOperator, ExprId, ExprId),
    Assignment(VarRef, ExprId),
    Nop,
}

#[derive(Clone, Debug)]
pub struct Loop {
    pub counter: LocalId,
    pub bound: ExprId,
    pub body: Block,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Expression(ExprId),
    LocalDeclaration(LocalId, ExprId),
    Print(ExprId),
    If(ExprId, Block, Option<Block>),
    For(Loop),
    While(Loop),
    DoWhile(Loop),
    Return(Option<ExprId>),
}

#[derive(Clone, Debug, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}
impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, s: Statement) {
        self.statements.push(s)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn ends_with_return(&self) -> bool {
        matches!(self.statements.last(), Some(Statement::Return(_)))
    }
}

#[derive(Clone, Debug)]
pub struct FieldDeclaration {
    pub field: FieldId,
    pub initializer: ExprId,
}

#[derive(Clone, Debug)]
pub struct MethodDeclaration {
    pub method: MethodId,
    pub params: Vec<LocalId>,
    pub body: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprId(u32);
impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One generated class: declarations plus the arena all of its expressions live in.
#[derive(Clone, Debug)]
pub struct Program {
    pub class_name: String,
    pub initial_seed: u64,
    pub knobs: Knobs,
    pub state: ClassState,
    pub fields: Vec<FieldDeclaration>,
    pub methods: Vec<MethodDeclaration>,
    pub entry: MethodDeclaration,
    exprs: Vec<Expression>,
    expr_types: Vec<MetaType>,
}
impl Program {
    pub fn new(class_name: &str, initial_seed: u64, knobs: Knobs) -> Self {
        let mut state = ClassState::new();
        let entry = state.add_entry_method();
        Self {
            class_name: class_name.to_owned(),
            initial_seed,
            knobs,
            state,
            fields: Vec::new(),
            methods: Vec::new(),
            entry: MethodDeclaration {
                method: entry,
                params: Vec::new(),
                body: Block::new(),
            },
            exprs: Vec::new(),
            expr_types: Vec::new(),
        }
    }

    pub fn expr(&self, id: ExprId) -> &Expression {
        &self.exprs[id.index()]
    }

    pub fn expr_type(&self, id: ExprId) -> &MetaType {
        &self.expr_types[id.index()]
    }

    pub fn num_exprs(&self) -> usize {
        self.exprs.len()
    }

    /// Every node in the arena, including ones no statement reaches.
    pub fn expr_ids(&self) -> impl Iterator<Item = ExprId> {
        (0..self.exprs.len() as u32).map(ExprId)
    }

    pub fn add_expr(&mut self, e: Expression, t: MetaType) -> ExprId {
        self.exprs.push(e);
        self.expr_types.push(t);
        debug_assert!(self.exprs.len() == self.expr_types.len());
        ExprId((self.exprs.len() - 1) as u32)
    }

    pub fn is_nop(&self, id: ExprId) -> bool {
        matches!(self.expr(id), Expression::Nop)
    }

    /// Array dimension sizes must be values of this type.
    pub fn index_type(&self) -> MetaType {
        MetaType::array_index(self.knobs.get(Knob::MaxArrayDimensionSize))
    }

    pub fn add_nop(&mut self) -> ExprId {
        self.add_expr(Expression::Nop, MetaType::Void)
    }

    pub fn add_constant(&mut self, value: Value, t: MetaType) -> Result<ExprId> {
        if !value.fits(&t) {
            return Err(FuzzError::unexpected(format!(
                "constant {:?} is not a value of {}",
                value, t
            )));
        }
        Ok(self.add_expr(Expression::Constant(value), t))
    }

    pub fn add_variable_ref(&mut self, v: VarRef) -> ExprId {
        let t = self.state.var_type(v).clone();
        self.add_expr(Expression::VariableRef(v), t)
    }

    pub fn add_array_init(&mut self, t: MetaType, args: Vec<ExprId>) -> Result<ExprId> {
        if args.len() != t.dimensions() as usize || args.is_empty() {
            return Err(FuzzError::unexpected(format!(
                "{} sizes given for {}",
                args.len(),
                t
            )));
        }
        let index_type = self.index_type();
        if let Some(arg) = args
            .iter()
            .find(|arg| !index_type.is_assignable_from(self.expr_type(**arg)))
        {
            return Err(FuzzError::unexpected(format!(
                "array size of type {} is not a valid index",
                self.expr_type(*arg)
            )));
        }
        Ok(self.add_expr(Expression::Call(Call::ArrayInit(t.clone(), args)), t))
    }

    pub fn add_assignment(&mut self, v: VarRef, source: ExprId) -> Result<ExprId> {
        if self.state.is_read_only(v) {
            return Err(FuzzError::unexpected(format!(
                "assignment to read-only {}",
                self.state.var_name(v)
            )));
        }
        let t = self.state.var_type(v).clone();
        self.state.mark_initialized(v);
        Ok(self.add_expr(Expression::Assignment(v, source), t))
    }

    pub fn add_cast(&mut self, t: MetaType, operand: ExprId) -> ExprId {
        self.add_expr(Expression::TypeCast(t.clone(), operand), t)
    }

    pub fn add_binary_op(
        &mut self,
        op: BinaryOperator,
        result: MetaType,
        left: ExprId,
        right: ExprId,
    ) -> ExprId {
        self.add_expr(Expression::BinaryOp(op, left, right), result)
    }

    pub fn add_call(&mut self, call: MethodCall, return_type: MetaType) -> ExprId {
        self.add_expr(Expression::Call(Call::Method(call)), return_type)
    }

    pub fn add_constructor_call(&mut self, t: MetaType, args: Vec<ExprId>) -> ExprId {
        self.add_expr(Expression::Call(Call::Constructor(t.clone(), args)), t)
    }

    /// Every method declaration, generated ones first and the entry last.
    pub fn all_methods(&self) -> impl Iterator<Item = &MethodDeclaration> + '_ {
        self.methods.iter().chain(std::iter::once(&self.entry))
    }
}
