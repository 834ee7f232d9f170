/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use crate::config::Knob;
use crate::config::Knobs;
use crate::state::MethodId;

/// Upper bound on the statements a single run of the entry method may execute.
pub const MAX_EXECUTION_COST: u64 = 1 << 20;

#[derive(Debug, Copy, Clone)]
pub struct Context {
    // None while generating a field initializer, where no method calls are emitted.
    pub method: Option<MethodId>,
    pub is_static: bool,
    pub control_flow_depth: u16,
    pub max_control_flow_depth: u16,
    pub expr_depth: u16,
    pub max_expr_depth: u16,
    // Set for senders and arguments of library calls, which must not see null.
    pub require_non_null: bool,
    // How many statements the code being generated may still execute per call of its method.
    pub cost_budget: u64,
    pub allow_divide_by_zero: bool,
}
impl Context {
    pub fn new() -> Self {
        Context {
            method: None,
            is_static: false,
            control_flow_depth: 0,
            max_control_flow_depth: 0,
            expr_depth: 0,
            max_expr_depth: 0,
            require_non_null: false,
            cost_budget: MAX_EXECUTION_COST,
            allow_divide_by_zero: false,
        }
    }
    pub fn from_knobs(knobs: &Knobs) -> Self {
        Context {
            max_control_flow_depth: knobs.get(Knob::MaxControlFlowDepth) as u16,
            max_expr_depth: knobs.get(Knob::MaxExpressionDepth) as u16,
            allow_divide_by_zero: knobs.flag(Knob::AllowDivideByZero),
            ..Context::new()
        }
    }
    pub fn for_method(&self, method: MethodId, is_static: bool, cost_budget: u64) -> Self {
        Context {
            method: Some(method),
            is_static,
            control_flow_depth: 0,
            expr_depth: 0,
            require_non_null: false,
            cost_budget,
            ..*self
        }
    }
    pub fn for_field_initializer(&self, is_static: bool) -> Self {
        Context {
            method: None,
            is_static,
            control_flow_depth: 0,
            expr_depth: 0,
            require_non_null: false,
            ..*self
        }
    }
    pub fn may_recurse(&self) -> bool {
        self.expr_depth < self.max_expr_depth
    }
    pub fn may_nest(&self) -> bool {
        self.control_flow_depth < self.max_control_flow_depth
    }
    pub fn may_call(&self) -> bool {
        self.method.is_some()
    }
    pub fn for_recursion(&self) -> Self {
        Context {
            expr_depth: self.expr_depth + 1,
            require_non_null: false,
            ..*self
        }
    }
    /// The body of a loop runs up to `iterations` times, so it gets that share of the budget.
    pub fn in_loop_body(&self, iterations: u64) -> Self {
        Context {
            control_flow_depth: self.control_flow_depth + 1,
            cost_budget: self.cost_budget / iterations.max(1),
            ..*self
        }
    }
    pub fn in_branch(&self) -> Self {
        Context {
            control_flow_depth: self.control_flow_depth + 1,
            ..*self
        }
    }
    pub fn non_null(&self) -> Self {
        Context {
            require_non_null: true,
            ..*self
        }
    }
    /// Top of a fresh expression inside the current statement.
    pub fn for_statement(&self) -> Self {
        Context {
            expr_depth: 0,
            require_non_null: false,
            ..*self
        }
    }
}
impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
