/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

use PrimitiveKind::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

pub const ALL_PRIMITIVE_KINDS: &[PrimitiveKind] =
    &[Boolean, Byte, Short, Char, Int, Long, Float, Double];

impl PrimitiveKind {
    pub fn descriptor(self) -> &'static str {
        match self {
            Boolean => "boolean",
            Byte => "byte",
            Short => "short",
            Char => "char",
            Int => "int",
            Long => "long",
            Float => "float",
            Double => "double",
        }
    }

    pub fn boxed_name(self) -> &'static str {
        match self {
            Boolean => "Boolean",
            Byte => "Byte",
            Short => "Short",
            Char => "Character",
            Int => "Integer",
            Long => "Long",
            Float => "Float",
            Double => "Double",
        }
    }

    pub fn is_numeric(self) -> bool {
        self != Boolean
    }

    pub fn is_integral(self) -> bool {
        matches!(self, Byte | Short | Char | Int | Long)
    }

    /// Closed range of values for the integral kinds.
    pub fn integer_bounds(self) -> Option<(i64, i64)> {
        match self {
            Byte => Some((i8::MIN as i64, i8::MAX as i64)),
            Short => Some((i16::MIN as i64, i16::MAX as i64)),
            Char => Some((0, u16::MAX as i64)),
            Int => Some((i32::MIN as i64, i32::MAX as i64)),
            Long => Some((i64::MIN, i64::MAX)),
            Boolean | Float | Double => None,
        }
    }

    /// Identity or widening primitive conversion from `other` to `self` (JLS 5.1.2).
    pub fn widens_from(self, other: PrimitiveKind) -> bool {
        if self == other {
            return true;
        }
        match (other, self) {
            (Byte, Short | Int | Long | Float | Double) => true,
            (Short, Int | Long | Float | Double) => true,
            (Char, Int | Long | Float | Double) => true,
            (Int, Long | Float | Double) => true,
            (Long, Float | Double) => true,
            (Float, Double) => true,
            _ => false,
        }
    }

    /// Result type of binary numeric promotion (JLS 5.6.2).
    pub fn promote(self, other: PrimitiveKind) -> PrimitiveKind {
        if self == Double || other == Double {
            Double
        } else if self == Float || other == Float {
            Float
        } else if self == Long || other == Long {
            Long
        } else {
            Int
        }
    }
}

/// The values a restricted integer may hold. Sets are kept sorted and deduplicated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntDomain {
    Set(Vec<i64>),
    Range(i64, i64),
}
impl IntDomain {
    pub fn set<I: IntoIterator<Item = i64>>(values: I) -> Self {
        let mut v = values.into_iter().collect::<Vec<_>>();
        v.sort_unstable();
        v.dedup();
        IntDomain::Set(v)
    }

    pub fn min(&self) -> Option<i64> {
        match self {
            IntDomain::Set(v) => v.first().copied(),
            IntDomain::Range(lo, hi) if lo <= hi => Some(*lo),
            IntDomain::Range(_, _) => None,
        }
    }

    pub fn max(&self) -> Option<i64> {
        match self {
            IntDomain::Set(v) => v.last().copied(),
            IntDomain::Range(lo, hi) if lo <= hi => Some(*hi),
            IntDomain::Range(_, _) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min().is_none()
    }

    pub fn contains_value(&self, n: i64) -> bool {
        match self {
            IntDomain::Set(v) => v.binary_search(&n).is_ok(),
            IntDomain::Range(lo, hi) => *lo <= n && n <= *hi,
        }
    }

    /// Whether every value of `other` is also a value of `self`.
    pub fn contains(&self, other: &IntDomain) -> bool {
        match (self, other) {
            (_, o) if o.is_empty() => true,
            (_, IntDomain::Set(values)) => values.iter().all(|n| self.contains_value(*n)),
            (IntDomain::Range(lo, hi), IntDomain::Range(olo, ohi)) => lo <= olo && ohi <= hi,
            (IntDomain::Set(values), IntDomain::Range(olo, ohi)) => {
                // A range can only fit in a set that is at least as large as it.
                let width = (*ohi as i128) - (*olo as i128) + 1;
                width <= values.len() as i128 && (*olo..=*ohi).all(|n| self.contains_value(n))
            }
        }
    }

    pub fn excludes_zero(&self) -> bool {
        !self.contains_value(0)
    }
}

/// An integer-valued type that only ever holds values from an explicit domain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RestrictedInt {
    base: PrimitiveKind,
    domain: IntDomain,
}
impl RestrictedInt {
    /// Returns None if the domain is empty or does not fit in the base kind.
    pub fn new(base: PrimitiveKind, domain: IntDomain) -> Option<Self> {
        let (lo, hi) = base.integer_bounds()?;
        let fits = domain.min()? >= lo && domain.max()? <= hi;
        fits.then_some(RestrictedInt { base, domain })
    }

    pub fn base(&self) -> PrimitiveKind {
        self.base
    }

    pub fn domain(&self) -> &IntDomain {
        &self.domain
    }
}

/// A reference type that is neither built in nor an array, e.g. `java.lang.StringBuilder`.
/// Two dynamic types are the same type iff their descriptors are equal.
#[derive(Debug)]
pub struct DynamicType {
    pub descriptor: String,
    pub is_final: bool,
    pub constructors: Vec<Vec<MetaType>>,
}

#[derive(Clone, Debug)]
pub enum ReferenceType {
    Object,
    String,
    Date,
    Boxed(PrimitiveKind),
    Dynamic(Rc<DynamicType>),
}
impl PartialEq for ReferenceType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ReferenceType::Object, ReferenceType::Object)
            | (ReferenceType::String, ReferenceType::String)
            | (ReferenceType::Date, ReferenceType::Date) => true,
            (ReferenceType::Boxed(p1), ReferenceType::Boxed(p2)) => p1 == p2,
            (ReferenceType::Dynamic(d1), ReferenceType::Dynamic(d2)) => {
                d1.descriptor == d2.descriptor
            }
            _ => false,
        }
    }
}
impl Eq for ReferenceType {}
impl Hash for ReferenceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor().hash(state)
    }
}
impl ReferenceType {
    pub fn descriptor(&self) -> String {
        match self {
            ReferenceType::Object => "java.lang.Object".to_string(),
            ReferenceType::String => "java.lang.String".to_string(),
            ReferenceType::Date => "java.util.Date".to_string(),
            ReferenceType::Boxed(p) => format!("java.lang.{}", p.boxed_name()),
            ReferenceType::Dynamic(d) => d.descriptor.clone(),
        }
    }

    /// Final reference types are assignable only from themselves.
    pub fn is_final(&self) -> bool {
        match self {
            ReferenceType::Object | ReferenceType::Date => false,
            ReferenceType::String | ReferenceType::Boxed(_) => true,
            ReferenceType::Dynamic(d) => d.is_final,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayType {
    // never itself an array
    component: Box<MetaType>,
    dimensions: u8,
}
impl ArrayType {
    pub fn component(&self) -> &MetaType {
        &self.component
    }

    pub fn dimensions(&self) -> u8 {
        self.dimensions
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MetaType {
    Void,
    Primitive(PrimitiveKind),
    Restricted(RestrictedInt),
    Reference(ReferenceType),
    Array(ArrayType),
}
impl MetaType {
    pub fn object() -> Self {
        MetaType::Reference(ReferenceType::Object)
    }

    pub fn string() -> Self {
        MetaType::Reference(ReferenceType::String)
    }

    pub fn date() -> Self {
        MetaType::Reference(ReferenceType::Date)
    }

    pub fn boxed(p: PrimitiveKind) -> Self {
        MetaType::Reference(ReferenceType::Boxed(p))
    }

    pub fn dynamic(descriptor: &str, is_final: bool, constructors: Vec<Vec<MetaType>>) -> Self {
        MetaType::Reference(ReferenceType::Dynamic(Rc::new(DynamicType {
            descriptor: descriptor.to_string(),
            is_final,
            constructors,
        })))
    }

    pub fn restricted(base: PrimitiveKind, domain: IntDomain) -> Option<Self> {
        RestrictedInt::new(base, domain).map(MetaType::Restricted)
    }

    /// Valid sizes for one array dimension.
    pub fn array_index(max_size: u32) -> Self {
        MetaType::Restricted(RestrictedInt {
            base: Int,
            domain: IntDomain::Range(0, max_size as i64),
        })
    }

    /// Valid upper bounds for a loop counter.
    pub fn loop_bound(max_iterations: u32) -> Self {
        MetaType::Restricted(RestrictedInt {
            base: Int,
            domain: IntDomain::Range(1, max_iterations.max(1) as i64),
        })
    }

    /// Right operands of integer division and remainder when division by zero is disallowed.
    pub fn nonzero_divisor() -> Self {
        MetaType::Restricted(RestrictedInt {
            base: Int,
            domain: IntDomain::set([-9, 2, 10, 12, 100]),
        })
    }

    /// `array_of(array_of(C, k), n) == array_of(C, k + n)`, saturating at the 255 dimensions a
    /// JVM class file can describe.
    pub fn array_of(component: MetaType, dimensions: u8) -> Self {
        if dimensions == 0 {
            return component;
        }
        match component {
            MetaType::Array(ArrayType {
                component,
                dimensions: inner,
            }) => MetaType::Array(ArrayType {
                component,
                dimensions: inner.saturating_add(dimensions),
            }),
            c => MetaType::Array(ArrayType {
                component: Box::new(c),
                dimensions,
            }),
        }
    }

    /// The element type of an array, i.e. the array type with one dimension fewer.
    pub fn array_element(&self) -> Option<MetaType> {
        match self {
            MetaType::Array(a) => Some(MetaType::array_of(
                (*a.component).clone(),
                a.dimensions - 1,
            )),
            _ => None,
        }
    }

    pub fn dimensions(&self) -> u8 {
        match self {
            MetaType::Array(a) => a.dimensions,
            _ => 0,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, MetaType::Void)
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            MetaType::Primitive(p) => Some(*p),
            MetaType::Restricted(r) => Some(r.base),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_primitive().is_some_and(|p| p.is_numeric())
    }

    /// Only restricted types can promise that a value is never zero.
    pub fn excludes_zero(&self) -> bool {
        match self {
            MetaType::Restricted(r) => r.domain.excludes_zero(),
            _ => false,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, MetaType::Reference(_) | MetaType::Array(_))
    }

    /// Whether printing a value of this type yields the same text on every run.
    pub fn is_printable(&self) -> bool {
        match self {
            MetaType::Primitive(_) | MetaType::Restricted(_) => true,
            MetaType::Reference(ReferenceType::String | ReferenceType::Boxed(_)) => true,
            _ => false,
        }
    }

    pub fn descriptor(&self) -> String {
        match self {
            MetaType::Void => "void".to_string(),
            MetaType::Primitive(p) => p.descriptor().to_string(),
            MetaType::Restricted(r) => r.base.descriptor().to_string(),
            MetaType::Reference(r) => r.descriptor(),
            MetaType::Array(a) => {
                format!(
                    "{}{}",
                    a.component.descriptor(),
                    "[]".repeat(a.dimensions as usize)
                )
            }
        }
    }

    /// Assignability is neither symmetric nor reflexive: void accepts nothing, not even itself.
    pub fn is_assignable_from(&self, other: &MetaType) -> bool {
        match (self, other) {
            (MetaType::Void, _) | (_, MetaType::Void) => false,
            (MetaType::Primitive(p), MetaType::Primitive(q)) => p.widens_from(*q),
            (MetaType::Primitive(p), MetaType::Restricted(r)) => {
                p.widens_from(r.base)
                    && match p.integer_bounds() {
                        Some((lo, hi)) => IntDomain::Range(lo, hi).contains(&r.domain),
                        None => true,
                    }
            }
            (MetaType::Restricted(r1), MetaType::Restricted(r2)) => {
                r1.base.widens_from(r2.base) && r1.domain.contains(&r2.domain)
            }
            (MetaType::Reference(ReferenceType::Object), MetaType::Reference(_))
            | (MetaType::Reference(ReferenceType::Object), MetaType::Array(_)) => true,
            (MetaType::Reference(r1), MetaType::Reference(r2)) => r1 == r2,
            (MetaType::Array(a1), MetaType::Array(a2)) => {
                a1.dimensions == a2.dimensions && component_accepts(&a1.component, &a2.component)
            }
            _ => false,
        }
    }
}

// Arrays of primitives are invariant in their component, arrays of references covariant.
fn component_accepts(this: &MetaType, other: &MetaType) -> bool {
    match (this, other) {
        (MetaType::Primitive(_), _) | (MetaType::Restricted(_), _) => {
            this.as_primitive() == other.as_primitive() && other.as_primitive().is_some()
        }
        _ => this.is_assignable_from(other),
    }
}

impl fmt::Display for MetaType {
    /// Java source spelling of the type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaType::Void => write!(f, "void"),
            MetaType::Primitive(p) => write!(f, "{}", p.descriptor()),
            MetaType::Restricted(r) => write!(f, "{}", r.base.descriptor()),
            MetaType::Reference(ReferenceType::Object) => write!(f, "Object"),
            MetaType::Reference(ReferenceType::String) => write!(f, "String"),
            MetaType::Reference(ReferenceType::Date) => write!(f, "java.util.Date"),
            MetaType::Reference(ReferenceType::Boxed(p)) => write!(f, "{}", p.boxed_name()),
            MetaType::Reference(ReferenceType::Dynamic(d)) => write!(f, "{}", d.descriptor),
            MetaType::Array(a) => {
                write!(f, "{}{}", a.component, "[]".repeat(a.dimensions as usize))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(p: PrimitiveKind) -> MetaType {
        MetaType::Primitive(p)
    }

    #[test]
    fn test_widening_chain() {
        let chain = [Byte, Short, Int, Long, Float, Double];
        for (i, narrow) in chain.iter().enumerate() {
            for wide in &chain[i..] {
                assert!(prim(*wide).is_assignable_from(&prim(*narrow)));
            }
            for wider in &chain[i + 1..] {
                assert!(!prim(*narrow).is_assignable_from(&prim(*wider)));
            }
        }
    }

    #[test]
    fn test_char_and_boolean() {
        assert!(prim(Int).is_assignable_from(&prim(Char)));
        assert!(prim(Double).is_assignable_from(&prim(Char)));
        assert!(!prim(Short).is_assignable_from(&prim(Char)));
        assert!(!prim(Char).is_assignable_from(&prim(Byte)));
        assert!(!prim(Char).is_assignable_from(&prim(Short)));
        assert!(!prim(Int).is_assignable_from(&prim(Boolean)));
        assert!(!prim(Boolean).is_assignable_from(&prim(Int)));
        assert!(prim(Boolean).is_assignable_from(&prim(Boolean)));
    }

    #[test]
    fn test_void_is_irregular() {
        assert!(!MetaType::Void.is_assignable_from(&MetaType::Void));
        assert!(!MetaType::object().is_assignable_from(&MetaType::Void));
        assert!(!MetaType::Void.is_assignable_from(&prim(Int)));
        assert_eq!(MetaType::Void.descriptor(), "void");
    }

    #[test]
    fn test_restricted_assignability() {
        let divisors = MetaType::nonzero_divisor();
        let small = MetaType::restricted(Int, IntDomain::set([2, 10])).unwrap();
        let range = MetaType::restricted(Int, IntDomain::Range(-10, 200)).unwrap();
        assert!(divisors.is_assignable_from(&small));
        assert!(!small.is_assignable_from(&divisors));
        assert!(range.is_assignable_from(&divisors));
        assert!(!divisors.is_assignable_from(&range));
        assert!(prim(Int).is_assignable_from(&divisors));
        assert!(prim(Long).is_assignable_from(&divisors));
        assert!(!divisors.is_assignable_from(&prim(Int)));
        assert!(!prim(Byte).is_assignable_from(&divisors));
        assert!(divisors.is_assignable_from(&divisors));
        assert!(divisors.descriptor() == "int");
    }

    #[test]
    fn test_restricted_range_in_set() {
        let set = IntDomain::set([3, 1, 2, 7]);
        assert_eq!(set, IntDomain::Set(vec![1, 2, 3, 7]));
        assert!(set.contains(&IntDomain::Range(1, 3)));
        assert!(!set.contains(&IntDomain::Range(1, 4)));
        assert!(!set.contains(&IntDomain::Range(i64::MIN, i64::MAX)));
        assert!(IntDomain::Range(0, 10).contains(&set));
        assert!(!IntDomain::Range(2, 10).contains(&set));
    }

    #[test]
    fn test_restricted_must_fit_base() {
        assert!(MetaType::restricted(Byte, IntDomain::Range(0, 300)).is_none());
        assert!(MetaType::restricted(Boolean, IntDomain::Range(0, 1)).is_none());
        assert!(MetaType::restricted(Int, IntDomain::Set(vec![])).is_none());
        assert!(MetaType::restricted(Byte, IntDomain::Range(-128, 127)).is_some());
    }

    #[test]
    fn test_reference_assignability() {
        let string = MetaType::string();
        let object = MetaType::object();
        let integer = MetaType::boxed(Int);
        let builder = MetaType::dynamic("java.lang.StringBuilder", true, vec![vec![]]);
        assert!(object.is_assignable_from(&string));
        assert!(object.is_assignable_from(&integer));
        assert!(object.is_assignable_from(&builder));
        assert!(object.is_assignable_from(&MetaType::array_of(prim(Int), 2)));
        assert!(!object.is_assignable_from(&prim(Int)));
        assert!(!string.is_assignable_from(&object));
        assert!(!integer.is_assignable_from(&prim(Int)));
        assert!(!integer.is_assignable_from(&MetaType::boxed(Short)));
        let same_builder = MetaType::dynamic("java.lang.StringBuilder", true, vec![]);
        assert_eq!(builder, same_builder);
        assert!(builder.is_assignable_from(&same_builder));
        let other = MetaType::dynamic("java.lang.StringBuffer", true, vec![]);
        assert!(!builder.is_assignable_from(&other));
    }

    #[test]
    fn test_array_assignability() {
        let strings2 = MetaType::array_of(MetaType::string(), 2);
        let objects2 = MetaType::array_of(MetaType::object(), 2);
        let objects1 = MetaType::array_of(MetaType::object(), 1);
        assert!(objects2.is_assignable_from(&strings2));
        assert!(!strings2.is_assignable_from(&objects2));
        assert!(!objects1.is_assignable_from(&strings2));
        let ints = MetaType::array_of(prim(Int), 1);
        let bytes = MetaType::array_of(prim(Byte), 1);
        assert!(!ints.is_assignable_from(&bytes));
        assert!(ints.is_assignable_from(&ints));
        assert_eq!(strings2.descriptor(), "java.lang.String[][]");
        assert_eq!(strings2.to_string(), "String[][]");
    }

    #[test]
    fn test_array_composition() {
        let c = prim(Long);
        assert_eq!(
            MetaType::array_of(c.clone(), 3),
            MetaType::array_of(MetaType::array_of(c.clone(), 2), 1)
        );
        let a = MetaType::array_of(c.clone(), 3);
        assert_eq!(a.array_element(), Some(MetaType::array_of(c.clone(), 2)));
        assert_eq!(
            MetaType::array_of(c.clone(), 1).array_element(),
            Some(c.clone())
        );
        assert_eq!(MetaType::array_of(c.clone(), 0), c);
    }

    #[test]
    fn test_array_dimensions_saturate() {
        let c = prim(Int);
        let deep = MetaType::array_of(MetaType::array_of(c.clone(), 200), 100);
        assert_eq!(deep.dimensions(), u8::MAX);
        assert_eq!(deep, MetaType::array_of(c.clone(), u8::MAX));
        let widest = MetaType::array_of(MetaType::array_of(c, u8::MAX), 1);
        assert_eq!(widest.dimensions(), u8::MAX);
    }

    #[test]
    fn test_promotion() {
        assert_eq!(Byte.promote(Short), Int);
        assert_eq!(Char.promote(Char), Int);
        assert_eq!(Int.promote(Long), Long);
        assert_eq!(Long.promote(Float), Float);
        assert_eq!(Float.promote(Double), Double);
    }
}
