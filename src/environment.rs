/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use log::trace;
use rand::prelude::IteratorRandom;

use crate::context::Context;
use crate::state::ClassState;
use crate::state::LocalId;
use crate::state::VarRef;
use crate::types::MetaType;

/* Java blocks nest lexically: a local is visible from its declaration to the end of the block
 * that declared it, including every nested block. Names are never reused within a class, so
 * there is no shadowing to track.
 * Fields are visible everywhere except that static code only sees static fields.
 * A fresh Environment is used for each method body, and an empty one for field initializers.
 */

#[derive(Clone, Debug)]
pub struct Environment {
    scopes: Vec<Vec<LocalId>>,
}
impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![Vec::new()],
        }
    }

    fn open_scope(&mut self) {
        trace!("open_scope: depth={}", self.scopes.len());
        self.scopes.push(Vec::new());
    }

    fn close_scope(&mut self) {
        trace!("close_scope: depth={}", self.scopes.len());
        self.scopes.pop();
    }

    pub fn with_scope<T, F: FnMut(&mut Self) -> T>(&mut self, mut f: F) -> T {
        self.open_scope();
        let result = f(self);
        self.close_scope();
        result
    }

    pub fn declare(&mut self, local: LocalId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(local);
        }
    }

    pub fn visible_locals(&self) -> impl Iterator<Item = LocalId> + '_ {
        self.scopes.iter().flatten().copied()
    }

    // Inner scopes are tried first, each with a coin flip, so recent locals are preferred.
    fn pick_local<RngType: rand::Rng, F: Fn(LocalId) -> bool>(
        &self,
        rng: &mut RngType,
        accept: F,
    ) -> Option<LocalId> {
        let mut result = None;
        for scope in self.scopes.iter().rev() {
            let found = scope.iter().copied().filter(|l| accept(*l)).choose(rng);
            if found.is_some() {
                result = found;
                if rng.gen::<bool>() {
                    return result;
                }
            }
        }
        result
    }

    fn pick_field<RngType: rand::Rng, F: Fn(VarRef) -> bool>(
        rng: &mut RngType,
        state: &ClassState,
        ctx: Context,
        accept: F,
    ) -> Option<VarRef> {
        state
            .fields()
            .filter(|(_, f)| !ctx.is_static || f.is_static())
            .map(|(id, _)| VarRef::Field(id))
            .filter(|v| accept(*v))
            .choose(rng)
    }

    fn pick_var<RngType: rand::Rng, F: Fn(VarRef) -> bool>(
        &self,
        rng: &mut RngType,
        state: &ClassState,
        ctx: Context,
        accept: F,
    ) -> Option<VarRef> {
        let accept = |v: VarRef| {
            // Reference-typed state may hold null.
            !(ctx.require_non_null && state.var_type(v).is_nullable()) && accept(v)
        };
        let local = |rng: &mut RngType| {
            self.pick_local(rng, |l| accept(VarRef::Local(l)))
                .map(VarRef::Local)
        };
        if rng.gen::<bool>() {
            Self::pick_field(rng, state, ctx, accept).or_else(|| local(rng))
        } else {
            local(rng).or_else(|| Self::pick_field(rng, state, ctx, accept))
        }
    }

    /// A field or local holding a value that can be used where `t` is required.
    pub fn initialized_value_of_type<RngType: rand::Rng>(
        &self,
        rng: &mut RngType,
        state: &ClassState,
        ctx: Context,
        t: &MetaType,
    ) -> Option<VarRef> {
        self.pick_var(rng, state, ctx, |v| {
            state.is_initialized(v) && t.is_assignable_from(state.var_type(v))
        })
    }

    /// A writable field or local whose value can be used where `t` is required.
    pub fn non_final_of_type<RngType: rand::Rng>(
        &self,
        rng: &mut RngType,
        state: &ClassState,
        ctx: Context,
        t: &MetaType,
    ) -> Option<VarRef> {
        self.pick_var(rng, state, ctx, |v| {
            !state.is_read_only(v) && t.is_assignable_from(state.var_type(v))
        })
    }

    pub fn random_non_final<RngType: rand::Rng>(
        &self,
        rng: &mut RngType,
        state: &ClassState,
        ctx: Context,
    ) -> Option<VarRef> {
        self.pick_var(rng, state, ctx, |v| !state.is_read_only(v))
    }
}
impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
