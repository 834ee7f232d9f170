/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::collections::BTreeSet;

use bitflags::bitflags;
use log::debug;

use crate::core_types::*;
use crate::error::FuzzError;
use crate::error::Result;
use crate::random::try_in_random_order;
use crate::types::MetaType;
use crate::types::PrimitiveKind;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const PUBLIC = 1;
        const PRIVATE = 1 << 1;
        const STATIC = 1 << 2;
        const FINAL = 1 << 3;
    }
}
impl Modifiers {
    /// Java keywords for the set flags, each followed by a space.
    pub fn keywords(self) -> String {
        let mut s = String::new();
        if self.contains(Modifiers::PUBLIC) {
            s.push_str("public ");
        }
        if self.contains(Modifiers::PRIVATE) {
            s.push_str("private ");
        }
        if self.contains(Modifiers::STATIC) {
            s.push_str("static ");
        }
        if self.contains(Modifiers::FINAL) {
            s.push_str("final ");
        }
        s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(u32);
impl FieldId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalId(u32);
impl LocalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(u32);
impl MethodId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarRef {
    Field(FieldId),
    Local(LocalId),
}

#[derive(Clone, Debug)]
pub struct FieldRecord {
    pub name: String,
    pub modifiers: Modifiers,
    pub ty: MetaType,
    initialized: bool,
}
impl FieldRecord {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }
}

#[derive(Clone, Debug)]
pub struct VariableRecord {
    pub name: String,
    pub modifiers: Modifiers,
    pub ty: MetaType,
    initialized: bool,
    // loop counters are only ever written by their loop header
    loop_counter: bool,
}
impl VariableRecord {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_loop_counter(&self) -> bool {
        self.loop_counter
    }
}

#[derive(Clone, Debug)]
pub struct MethodRecord {
    pub name: String,
    pub modifiers: Modifiers,
    pub params: Vec<MetaType>,
    pub return_type: MetaType,
    pub is_entry: bool,
    /// Upper bound on the number of statements one call executes, known once the body exists.
    pub cost: u64,
}
impl MethodRecord {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn arity(&self) -> Arity {
        self.params.len()
    }
}

/// "May call" edges between methods, kept acyclic.
/// `excluded_for_calling(m)` holds every method that can reach `m`, and `m` itself.
#[derive(Clone, Debug, Default)]
pub struct CallGraph {
    excluded: Vec<BTreeSet<MethodId>>,
    callees: Vec<BTreeSet<MethodId>>,
}
impl CallGraph {
    fn add_node(&mut self, id: MethodId) {
        debug_assert!(id.index() == self.excluded.len());
        self.excluded.push(BTreeSet::from([id]));
        self.callees.push(BTreeSet::new());
    }

    pub fn excluded_for_calling(&self, m: MethodId) -> &BTreeSet<MethodId> {
        &self.excluded[m.index()]
    }

    pub fn callees(&self, m: MethodId) -> &BTreeSet<MethodId> {
        &self.callees[m.index()]
    }

    pub fn len(&self) -> usize {
        self.callees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callees.is_empty()
    }

    pub fn record_call(&mut self, caller: MethodId, callee: MethodId) -> Result<()> {
        if self.excluded[caller.index()].contains(&callee) {
            return Err(FuzzError::unexpected(format!(
                "call from {:?} to {:?} would close a cycle",
                caller, callee
            )));
        }
        if !self.callees[caller.index()].insert(callee) {
            return Ok(());
        }
        let inherited = self.excluded[caller.index()].clone();
        let mut stack = vec![callee];
        while let Some(m) = stack.pop() {
            let excluded = &mut self.excluded[m.index()];
            let before = excluded.len();
            excluded.extend(inherited.iter().copied());
            // Sets only grow along edges, so an unchanged node has up-to-date descendants.
            if excluded.len() != before {
                stack.extend(self.callees[m.index()].iter().copied());
            }
        }
        Ok(())
    }

    /// Full traversal, independent of the incrementally maintained sets.
    pub fn is_acyclic(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }
        let mut marks = vec![Mark::New; self.callees.len()];
        for root in 0..self.callees.len() {
            if marks[root] != Mark::New {
                continue;
            }
            let mut stack = vec![(root, false)];
            while let Some((node, leaving)) = stack.pop() {
                if leaving {
                    marks[node] = Mark::Done;
                    continue;
                }
                match marks[node] {
                    Mark::Active => return false,
                    Mark::Done => continue,
                    Mark::New => {}
                }
                marks[node] = Mark::Active;
                stack.push((node, true));
                for callee in &self.callees[node] {
                    match marks[callee.index()] {
                        Mark::Active => return false,
                        Mark::New => stack.push((callee.index(), false)),
                        Mark::Done => {}
                    }
                }
            }
        }
        true
    }

    /// Every method from which `m` is reachable, found by walking the edges backwards.
    pub fn ancestors(&self, m: MethodId) -> BTreeSet<MethodId> {
        let mut result = BTreeSet::from([m]);
        let mut changed = true;
        while changed {
            changed = false;
            for (caller, callees) in self.callees.iter().enumerate() {
                let caller = MethodId(caller as u32);
                if !result.contains(&caller) && callees.iter().any(|c| result.contains(c)) {
                    result.insert(caller);
                    changed = true;
                }
            }
        }
        result
    }
}

/// Everything declared so far in the one class being generated.
#[derive(Clone, Debug, Default)]
pub struct ClassState {
    fields: Vec<FieldRecord>,
    methods: Vec<MethodRecord>,
    locals: Vec<VariableRecord>,
    call_graph: CallGraph,
    next_method_name: NameNum,
}
impl ClassState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, modifiers: Modifiers, ty: MetaType) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(FieldRecord {
            name: format!("f{}", self.fields.len() + 1),
            modifiers,
            ty,
            initialized: false,
        });
        id
    }

    pub fn add_method(
        &mut self,
        modifiers: Modifiers,
        params: Vec<MetaType>,
        return_type: MetaType,
    ) -> MethodId {
        self.next_method_name += 1;
        let name = format!("m{}", self.next_method_name);
        self.push_method(MethodRecord {
            name,
            modifiers,
            params,
            return_type,
            is_entry: false,
            cost: 0,
        })
    }

    /// The zero-argument instance method the harness invokes. Never a call target.
    pub fn add_entry_method(&mut self) -> MethodId {
        self.push_method(MethodRecord {
            name: "run".to_string(),
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            return_type: MetaType::Void,
            is_entry: true,
            cost: 0,
        })
    }

    fn push_method(&mut self, record: MethodRecord) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        debug!("Declared method {} ({:?})", record.name, id);
        self.methods.push(record);
        self.call_graph.add_node(id);
        id
    }

    pub fn add_local(&mut self, modifiers: Modifiers, ty: MetaType) -> LocalId {
        self.push_local(modifiers, ty, false)
    }

    pub fn add_loop_counter(&mut self) -> LocalId {
        let id = self.push_local(Modifiers::empty(), MetaType::Primitive(PrimitiveKind::Int), true);
        self.locals[id.index()].initialized = true;
        id
    }

    fn push_local(&mut self, modifiers: Modifiers, ty: MetaType, loop_counter: bool) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(VariableRecord {
            name: format!("v{}", self.locals.len() + 1),
            modifiers,
            ty,
            initialized: false,
            loop_counter,
        });
        id
    }

    pub fn field(&self, id: FieldId) -> &FieldRecord {
        &self.fields[id.index()]
    }

    pub fn local(&self, id: LocalId) -> &VariableRecord {
        &self.locals[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodRecord {
        &self.methods[id.index()]
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &FieldRecord)> + '_ {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| (FieldId(i as u32), f))
    }

    pub fn user_methods(&self) -> impl Iterator<Item = (MethodId, &MethodRecord)> + '_ {
        self.methods
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_entry)
            .map(|(i, m)| (MethodId(i as u32), m))
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn num_user_methods(&self) -> usize {
        self.next_method_name as usize
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn var_name(&self, v: VarRef) -> &str {
        match v {
            VarRef::Field(id) => &self.field(id).name,
            VarRef::Local(id) => &self.local(id).name,
        }
    }

    pub fn var_type(&self, v: VarRef) -> &MetaType {
        match v {
            VarRef::Field(id) => &self.field(id).ty,
            VarRef::Local(id) => &self.local(id).ty,
        }
    }

    pub fn is_initialized(&self, v: VarRef) -> bool {
        match v {
            VarRef::Field(id) => self.field(id).initialized,
            VarRef::Local(id) => self.local(id).initialized,
        }
    }

    /// Final declarations and loop counters.
    pub fn is_read_only(&self, v: VarRef) -> bool {
        match v {
            VarRef::Field(id) => self.field(id).modifiers.contains(Modifiers::FINAL),
            VarRef::Local(id) => {
                let local = self.local(id);
                local.is_loop_counter() || local.modifiers.contains(Modifiers::FINAL)
            }
        }
    }

    /// One-way: a variable never becomes uninitialized again.
    pub fn mark_initialized(&mut self, v: VarRef) {
        match v {
            VarRef::Field(id) => self.fields[id.index()].initialized = true,
            VarRef::Local(id) => self.locals[id.index()].initialized = true,
        }
    }

    pub fn set_cost(&mut self, id: MethodId, cost: u64) {
        self.methods[id.index()].cost = cost;
    }

    pub fn random_callable_method<RngType: rand::Rng>(
        &self,
        rng: &mut RngType,
        caller: MethodId,
    ) -> Option<MethodId> {
        self.random_callable_method_matching(rng, caller, |_| true)
    }

    /// Picks uniformly among the methods `caller` may call without closing a cycle.
    /// A static caller only sees static methods.
    pub fn random_callable_method_matching<RngType, F>(
        &self,
        rng: &mut RngType,
        caller: MethodId,
        pred: F,
    ) -> Option<MethodId>
    where
        RngType: rand::Rng,
        F: Fn(&MethodRecord) -> bool,
    {
        let caller_is_static = self.method(caller).is_static();
        let excluded = self.call_graph.excluded_for_calling(caller);
        let candidates = self
            .user_methods()
            .filter(|(id, m)| {
                *id != caller && !excluded.contains(id) && (!caller_is_static || m.is_static())
            })
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        try_in_random_order(rng, candidates, |_, id| pred(self.method(id)).then_some(id))
    }

    pub fn record_call(&mut self, caller: MethodId, callee: MethodId) -> Result<()> {
        if self.method(callee).is_entry {
            return Err(FuzzError::unexpected(format!(
                "{} called the entry method",
                self.method(caller).name
            )));
        }
        if self.method(caller).is_static() && !self.method(callee).is_static() {
            return Err(FuzzError::unexpected(format!(
                "static {} called instance method {}",
                self.method(caller).name,
                self.method(callee).name
            )));
        }
        self.call_graph.record_call(caller, callee)?;
        debug!(
            "Recorded call {} -> {}",
            self.method(caller).name,
            self.method(callee).name
        );
        Ok(())
    }
}
