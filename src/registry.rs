/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;
use log::info;

use crate::builder::Builder;
use crate::config::Knob;
use crate::config::Knobs;
use crate::error::FuzzError;
use crate::error::Result;
use crate::java_api::*;
use crate::types::*;

/// Operations that would make output depend on object identity, or that block.
const EXCLUDED_OPERATIONS: &[&str] = &[
    "equals", "hashCode", "wait", "notify", "notifyAll", "toString", "getClass",
];

/// A class library operation admitted for calls from generated code.
#[derive(Debug)]
pub struct ExternalOperation {
    pub declaring: MetaType,
    pub name: &'static str,
    pub kind: CallKind,
    pub return_type: MetaType,
    pub params: Vec<MetaType>,
    pub risk: Risk,
}
impl ExternalOperation {
    /// Instance operations need their sender first.
    pub fn requires(&self) -> Vec<MetaType> {
        match self.kind {
            CallKind::Static => self.params.clone(),
            CallKind::Instance => std::iter::once(self.declaring.clone())
                .chain(self.params.iter().cloned())
                .collect(),
        }
    }

    /// Whether the operation may run under the given overflow and divide-by-zero toggles.
    pub fn is_admitted(&self, allow_overflow: bool, allow_divide_by_zero: bool) -> bool {
        match self.risk {
            Risk::Safe => true,
            Risk::Overflow => allow_overflow,
            Risk::DivideByZero => allow_divide_by_zero,
        }
    }
}

/// Catalog of every type the generator knows about, keyed by descriptor, together with the
/// operations admitted for the current session. One registry belongs to one session at a time.
#[derive(Debug)]
pub struct TypeRegistry {
    types: BTreeMap<String, MetaType>,
    operations: Vec<Rc<ExternalOperation>>,
    index_type: MetaType,
    epoch: u64,
}
impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: BTreeMap::new(),
            operations: Vec::new(),
            index_type: MetaType::array_index(Knob::MaxArrayDimensionSize.default_value()),
            epoch: 0,
        };
        registry.bootstrap();
        registry
    }

    fn bootstrap(&mut self) {
        for p in ALL_PRIMITIVE_KINDS {
            self.register(MetaType::Primitive(*p));
        }
        self.register(MetaType::Void);
        self.register(MetaType::string());
        self.register(MetaType::date());
        self.register(MetaType::object());
    }

    /// Back to the bootstrap set, with no admitted operations.
    pub fn reset(&mut self) {
        self.types.clear();
        self.operations.clear();
        self.index_type = MetaType::array_index(Knob::MaxArrayDimensionSize.default_value());
        self.epoch += 1;
        self.bootstrap();
        debug!("Type registry reset, epoch {}", self.epoch);
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns the registered type with the same descriptor, registering `t` if there is none.
    pub fn register(&mut self, t: MetaType) -> MetaType {
        self.types.entry(t.descriptor()).or_insert(t).clone()
    }

    pub fn register_standard_library(&mut self) -> Result<()> {
        for p in ALL_PRIMITIVE_KINDS {
            self.register(MetaType::boxed(*p));
        }
        let constructors = string_builder_constructors()
            .into_iter()
            .map(|params| {
                params
                    .into_iter()
                    .map(|d| self.lookup(d))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        self.register(MetaType::dynamic(STRING_BUILDER, true, constructors));
        // only ever the owner of static calls
        self.register(MetaType::dynamic("java.lang.Math", true, Vec::new()));
        Ok(())
    }

    pub fn lookup(&self, descriptor: &str) -> Result<MetaType> {
        self.types
            .get(descriptor)
            .cloned()
            .ok_or_else(|| FuzzError::UnknownType(descriptor.to_string()))
    }

    pub fn is_known(&self, descriptor: &str) -> bool {
        self.types.contains_key(descriptor)
    }

    pub fn set_index_type(&mut self, max_dimension_size: u32) {
        self.index_type = MetaType::array_index(max_dimension_size);
    }

    pub fn index_type(&self) -> &MetaType {
        &self.index_type
    }

    /// Admits every class library operation whose types are all registered and which is neither
    /// on the exclusion list nor able to throw an exception the knobs do not allow.
    pub fn infer_external_operations(&mut self, allow_overflow: bool, allow_divide_by_zero: bool) {
        let mut admitted = Vec::new();
        for (declaring, name, kind, return_type, params, risk) in get_java_api() {
            if EXCLUDED_OPERATIONS.contains(name) {
                continue;
            }
            let (Ok(declaring), Ok(return_type)) =
                (self.lookup(declaring), self.lookup(return_type))
            else {
                continue;
            };
            let Ok(params) = params
                .iter()
                .map(|d| self.lookup(d))
                .collect::<Result<Vec<_>>>()
            else {
                continue;
            };
            let op = ExternalOperation {
                declaring,
                name,
                kind: *kind,
                return_type,
                params,
                risk: *risk,
            };
            if op.is_admitted(allow_overflow, allow_divide_by_zero) {
                admitted.push(Rc::new(op));
            }
        }
        info!("Admitted {} external operations", admitted.len());
        self.operations = admitted;
    }

    /// Everything a session needs: the class library and the knob-dependent types.
    pub fn prepare_session(&mut self, knobs: &Knobs) -> Result<()> {
        self.register_standard_library()?;
        self.set_index_type(knobs.get(Knob::MaxArrayDimensionSize));
        self.infer_external_operations(
            knobs.flag(Knob::AllowArithmeticOverflow),
            knobs.flag(Knob::AllowDivideByZero),
        );
        Ok(())
    }

    pub fn operations(&self) -> &[Rc<ExternalOperation>] {
        &self.operations
    }

    /// Builders the type itself contributes.
    pub fn intrinsic_builders(&self, t: &MetaType) -> Vec<Builder> {
        let mut builders = Vec::new();
        if t.is_nullable() {
            builders.push(Builder::Null(t.clone()));
        }
        match t {
            MetaType::Void => {}
            MetaType::Primitive(_) | MetaType::Restricted(_) => {
                builders.push(Builder::Literal(t.clone()))
            }
            MetaType::Reference(ReferenceType::String) => {
                builders.push(Builder::Literal(t.clone()))
            }
            MetaType::Reference(ReferenceType::Boxed(p)) => builders.push(Builder::Boxing(*p)),
            MetaType::Reference(ReferenceType::Object) => builders.push(Builder::Constructor {
                ty: t.clone(),
                params: Vec::new(),
            }),
            MetaType::Reference(ReferenceType::Date) => builders.push(Builder::Constructor {
                ty: t.clone(),
                params: vec![MetaType::Primitive(PrimitiveKind::Long)],
            }),
            MetaType::Reference(ReferenceType::Dynamic(d)) => {
                builders.extend(d.constructors.iter().map(|params| Builder::Constructor {
                    ty: t.clone(),
                    params: params.clone(),
                }))
            }
            MetaType::Array(_) => builders.push(Builder::ArrayInit {
                ty: t.clone(),
                index_type: self.index_type.clone(),
            }),
        }
        builders
    }

    /// Every builder whose result can be used where `t` is required.
    pub fn builders_for(&self, t: &MetaType) -> Vec<Builder> {
        let mut builders = self.intrinsic_builders(t);
        builders.extend(
            self.operations
                .iter()
                .filter(|op| t.is_assignable_from(&op.return_type))
                .map(|op| Builder::External(op.clone())),
        );
        builders
    }

    /// Registered types that fields, locals, parameters and return values may have.
    pub fn value_types(&self) -> Vec<MetaType> {
        self.types
            .values()
            .filter(|t| match t {
                MetaType::Void => false,
                MetaType::Reference(ReferenceType::Dynamic(d)) => !d.constructors.is_empty(),
                _ => true,
            })
            .cloned()
            .collect()
    }
}
impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_returns_to_bootstrap_set() {
        let mut registry = TypeRegistry::new();
        registry.register_standard_library().unwrap();
        registry.infer_external_operations(false, false);
        assert!(registry.is_known("java.lang.Integer"));
        assert!(!registry.operations().is_empty());
        registry.reset();
        assert_eq!(registry.epoch(), 1);
        assert!(!registry.is_known("java.lang.Integer"));
        assert!(registry.operations().is_empty());
        let bootstrap = [
            "int",
            "boolean",
            "void",
            "java.lang.String",
            "java.util.Date",
            "java.lang.Object",
        ];
        for d in bootstrap {
            assert!(registry.is_known(d), "{}", d);
        }
        assert!(matches!(
            registry.lookup("java.lang.StringBuilder"),
            Err(FuzzError::UnknownType(_))
        ));
    }

    #[test]
    fn test_admission_filter() {
        let mut registry = TypeRegistry::new();
        registry.register_standard_library().unwrap();
        registry.infer_external_operations(false, false);
        let names = registry.operations().iter().map(|op| op.name).collect::<Vec<_>>();
        for excluded in EXCLUDED_OPERATIONS {
            assert!(!names.contains(excluded), "{}", excluded);
        }
        // CharSequence is never registered
        assert!(!names.contains(&"contains"));
        assert!(!names.contains(&"addExact"));
        assert!(!names.contains(&"floorDiv"));
        assert!(names.contains(&"length"));

        registry.infer_external_operations(true, true);
        let names = registry.operations().iter().map(|op| op.name).collect::<Vec<_>>();
        assert!(names.contains(&"addExact"));
        assert!(names.contains(&"floorDiv"));
        for op in registry.operations() {
            assert!(op.is_admitted(true, true));
        }
        let add_exact = registry.operations().iter().find(|op| op.name == "addExact").unwrap();
        assert_eq!(add_exact.risk, Risk::Overflow);
        assert!(!add_exact.is_admitted(false, true));
        let floor_div = registry.operations().iter().find(|op| op.name == "floorDiv").unwrap();
        assert!(!floor_div.is_admitted(true, false));
    }

    #[test]
    fn test_only_known_types_before_standard_library() {
        let mut registry = TypeRegistry::new();
        registry.infer_external_operations(false, false);
        for op in registry.operations() {
            assert!(registry.is_known(&op.declaring.descriptor()));
            assert!(registry.is_known(&op.return_type.descriptor()));
        }
        assert!(registry
            .operations()
            .iter()
            .all(|op| op.declaring != MetaType::boxed(PrimitiveKind::Int)));
    }

    #[test]
    fn test_intrinsic_builders() {
        let mut registry = TypeRegistry::new();
        registry.register_standard_library().unwrap();
        let string = registry.intrinsic_builders(&MetaType::string());
        assert!(matches!(string[..], [Builder::Null(_), Builder::Literal(_)]));
        let int = registry.intrinsic_builders(&MetaType::Primitive(PrimitiveKind::Int));
        assert!(matches!(int[..], [Builder::Literal(_)]));
        assert!(registry.intrinsic_builders(&MetaType::Void).is_empty());
        let boxed = registry.intrinsic_builders(&MetaType::boxed(PrimitiveKind::Char));
        assert!(matches!(
            boxed[..],
            [Builder::Null(_), Builder::Boxing(PrimitiveKind::Char)]
        ));
        let sb = registry.lookup(STRING_BUILDER).unwrap();
        assert_eq!(registry.intrinsic_builders(&sb).len(), 3);
    }

    #[test]
    fn test_value_types_exclude_void_and_math() {
        let mut registry = TypeRegistry::new();
        registry.register_standard_library().unwrap();
        let descriptors = registry
            .value_types()
            .iter()
            .map(|t| t.descriptor())
            .collect::<Vec<_>>();
        assert!(!descriptors.contains(&"void".to_string()));
        assert!(!descriptors.contains(&"java.lang.Math".to_string()));
        assert!(descriptors.contains(&STRING_BUILDER.to_string()));
    }
}
