/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::rc::Rc;

use log::trace;

use crate::ast::ExprId;
use crate::ast::MethodCall;
use crate::ast::Program;
use crate::ast::Value;
use crate::error::FuzzError;
use crate::error::Result;
use crate::java_api::CallKind;
use crate::random::*;
use crate::registry::ExternalOperation;
use crate::types::*;

/// A way of constructing a value of some type, given values of the types it `requires`.
#[derive(Clone, Debug)]
pub enum Builder {
    Null(MetaType),
    Literal(MetaType),
    Boxing(PrimitiveKind),
    Constructor { ty: MetaType, params: Vec<MetaType> },
    ArrayInit { ty: MetaType, index_type: MetaType },
    External(Rc<ExternalOperation>),
}
impl Builder {
    pub fn requires(&self) -> Vec<MetaType> {
        match self {
            Builder::Null(_) | Builder::Literal(_) => Vec::new(),
            Builder::Boxing(p) => vec![MetaType::Primitive(*p)],
            Builder::Constructor { params, .. } => params.clone(),
            Builder::ArrayInit { ty, index_type } => {
                vec![index_type.clone(); ty.dimensions() as usize]
            }
            Builder::External(op) => op.requires(),
        }
    }

    pub fn produces(&self) -> MetaType {
        match self {
            Builder::Null(t) | Builder::Literal(t) => t.clone(),
            Builder::Boxing(p) => MetaType::boxed(*p),
            Builder::Constructor { ty, .. } | Builder::ArrayInit { ty, .. } => ty.clone(),
            Builder::External(op) => op.return_type.clone(),
        }
    }

    /// Whether a null argument would throw.
    pub fn requires_non_null(&self) -> bool {
        matches!(self, Builder::Constructor { .. } | Builder::External(_))
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Builder::External(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Builder::Null(_))
    }

    /// Arguments are checked by whoever picked them, so a mismatch here is a bug.
    pub fn build<RngType: rand::Rng>(
        &self,
        rng: &mut RngType,
        program: &mut Program,
        args: Vec<ExprId>,
    ) -> Result<ExprId> {
        let requires = self.requires();
        if requires.len() != args.len() {
            return Err(FuzzError::unexpected(format!(
                "{:?} requires {} arguments, got {}",
                self,
                requires.len(),
                args.len()
            )));
        }
        for (t, arg) in requires.iter().zip(args.iter()) {
            if !t.is_assignable_from(program.expr_type(*arg)) {
                return Err(FuzzError::unexpected(format!(
                    "argument of type {} given where {} is required",
                    program.expr_type(*arg),
                    t
                )));
            }
        }
        trace!("build: {:?}", self);
        match self {
            Builder::Null(t) => program.add_constant(Value::Null, t.clone()),
            Builder::Literal(t) => {
                let value = match t {
                    MetaType::Primitive(p) => choose_random_value(rng, *p),
                    MetaType::Restricted(r) => choose_in_domain(rng, r.domain())
                        .and_then(|n| Value::integer(r.base(), n))
                        .ok_or_else(|| FuzzError::unexpected(format!("empty domain in {:?}", r)))?,
                    MetaType::Reference(ReferenceType::String) => {
                        Value::String(choose_random_string(rng))
                    }
                    _ => return Err(FuzzError::unexpected(format!("no literal for {}", t))),
                };
                program.add_constant(value, t.clone())
            }
            Builder::Boxing(p) => Ok(program.add_call(
                MethodCall {
                    is_static: true,
                    owner: Some(MetaType::boxed(*p)),
                    name: "valueOf".to_string(),
                    sender: None,
                    args,
                    callee: None,
                },
                MetaType::boxed(*p),
            )),
            Builder::Constructor { ty, .. } => Ok(program.add_constructor_call(ty.clone(), args)),
            Builder::ArrayInit { ty, .. } => program.add_array_init(ty.clone(), args),
            Builder::External(op) => {
                let call = match op.kind {
                    CallKind::Static => MethodCall {
                        is_static: true,
                        owner: Some(op.declaring.clone()),
                        name: op.name.to_string(),
                        sender: None,
                        args,
                        callee: None,
                    },
                    CallKind::Instance => {
                        let mut args = args.into_iter();
                        MethodCall {
                            is_static: false,
                            owner: None,
                            name: op.name.to_string(),
                            sender: args.next(),
                            args: args.collect(),
                            callee: None,
                        }
                    }
                };
                Ok(program.add_call(call, op.return_type.clone()))
            }
        }
    }
}

/// A builder together with arguments satisfying its `requires()`.
#[derive(Clone, Debug)]
pub struct ResolvedBuilder {
    pub builder: Builder,
    pub args: Vec<ExprId>,
}
impl ResolvedBuilder {
    pub fn build<RngType: rand::Rng>(
        self,
        rng: &mut RngType,
        program: &mut Program,
    ) -> Result<ExprId> {
        self.builder.build(rng, program, self.args)
    }
}
