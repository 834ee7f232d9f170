/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::sync::OnceLock;

use CallKind::*;
use Risk::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Static,
    Instance,
}

/// Which exception an operation may throw on some inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Risk {
    Safe,
    Overflow,
    DivideByZero,
}

/// (declaring type, name, kind, return type, parameter types, risk), all types by descriptor.
pub type ApiEntry = (
    &'static str,
    &'static str,
    CallKind,
    &'static str,
    Vec<&'static str>,
    Risk,
);

static JAVA_API: OnceLock<Vec<ApiEntry>> = OnceLock::new();

const STRING: &str = "java.lang.String";
const MATH: &str = "java.lang.Math";
const INTEGER: &str = "java.lang.Integer";
const LONG: &str = "java.lang.Long";
const SHORT: &str = "java.lang.Short";
const BYTE: &str = "java.lang.Byte";
const CHARACTER: &str = "java.lang.Character";
const BOOLEAN: &str = "java.lang.Boolean";
const FLOAT: &str = "java.lang.Float";
const DOUBLE: &str = "java.lang.Double";
const DATE: &str = "java.util.Date";
const OBJECT: &str = "java.lang.Object";
pub const STRING_BUILDER: &str = "java.lang.StringBuilder";

/// Public operations of the Java class library that generated code may call.
/// Entries whose types are not registered are ignored when the registry admits operations.
#[rustfmt::skip]
pub fn get_java_api() -> &'static [ApiEntry] {
    JAVA_API.get_or_init(|| vec![
        (OBJECT, "equals", Instance, "boolean", vec![OBJECT], Safe),
        (OBJECT, "hashCode", Instance, "int", vec![], Safe),
        (OBJECT, "toString", Instance, STRING, vec![], Safe),
        (OBJECT, "getClass", Instance, "java.lang.Class", vec![], Safe),
        (OBJECT, "wait", Instance, "void", vec![], Safe),
        (OBJECT, "notify", Instance, "void", vec![], Safe),
        (OBJECT, "notifyAll", Instance, "void", vec![], Safe),

        (STRING, "length", Instance, "int", vec![], Safe),
        (STRING, "isEmpty", Instance, "boolean", vec![], Safe),
        (STRING, "concat", Instance, STRING, vec![STRING], Safe),
        (STRING, "trim", Instance, STRING, vec![], Safe),
        (STRING, "indexOf", Instance, "int", vec![STRING], Safe),
        (STRING, "indexOf", Instance, "int", vec!["int"], Safe),
        (STRING, "lastIndexOf", Instance, "int", vec![STRING], Safe),
        (STRING, "startsWith", Instance, "boolean", vec![STRING], Safe),
        (STRING, "endsWith", Instance, "boolean", vec![STRING], Safe),
        (STRING, "compareTo", Instance, "int", vec![STRING], Safe),
        (STRING, "replace", Instance, STRING, vec!["char", "char"], Safe),
        (STRING, "contains", Instance, "boolean", vec!["java.lang.CharSequence"], Safe),
        (STRING, "equals", Instance, "boolean", vec![OBJECT], Safe),
        (STRING, "hashCode", Instance, "int", vec![], Safe),
        (STRING, "toString", Instance, STRING, vec![], Safe),
        (STRING, "valueOf", Static, STRING, vec!["boolean"], Safe),
        (STRING, "valueOf", Static, STRING, vec!["char"], Safe),
        (STRING, "valueOf", Static, STRING, vec!["int"], Safe),
        (STRING, "valueOf", Static, STRING, vec!["long"], Safe),
        (STRING, "valueOf", Static, STRING, vec!["float"], Safe),
        (STRING, "valueOf", Static, STRING, vec!["double"], Safe),

        (MATH, "abs", Static, "int", vec!["int"], Safe),
        (MATH, "abs", Static, "long", vec!["long"], Safe),
        (MATH, "abs", Static, "double", vec!["double"], Safe),
        (MATH, "max", Static, "int", vec!["int", "int"], Safe),
        (MATH, "max", Static, "long", vec!["long", "long"], Safe),
        (MATH, "min", Static, "int", vec!["int", "int"], Safe),
        (MATH, "min", Static, "double", vec!["double", "double"], Safe),
        (MATH, "sqrt", Static, "double", vec!["double"], Safe),
        (MATH, "floor", Static, "double", vec!["double"], Safe),
        (MATH, "ceil", Static, "double", vec!["double"], Safe),
        (MATH, "signum", Static, "float", vec!["float"], Safe),
        (MATH, "floorDiv", Static, "int", vec!["int", "int"], DivideByZero),
        (MATH, "floorMod", Static, "long", vec!["long", "long"], DivideByZero),
        (MATH, "addExact", Static, "int", vec!["int", "int"], Overflow),
        (MATH, "subtractExact", Static, "long", vec!["long", "long"], Overflow),
        (MATH, "multiplyExact", Static, "int", vec!["int", "int"], Overflow),
        (MATH, "negateExact", Static, "int", vec!["int"], Overflow),
        (MATH, "incrementExact", Static, "long", vec!["long"], Overflow),
        (MATH, "toIntExact", Static, "int", vec!["long"], Overflow),

        (INTEGER, "intValue", Instance, "int", vec![], Safe),
        (INTEGER, "longValue", Instance, "long", vec![], Safe),
        (INTEGER, "compareTo", Instance, "int", vec![INTEGER], Safe),
        (INTEGER, "compare", Static, "int", vec!["int", "int"], Safe),
        (INTEGER, "bitCount", Static, "int", vec!["int"], Safe),
        (INTEGER, "reverse", Static, "int", vec!["int"], Safe),
        (INTEGER, "rotateLeft", Static, "int", vec!["int", "int"], Safe),
        (INTEGER, "highestOneBit", Static, "int", vec!["int"], Safe),
        (INTEGER, "numberOfLeadingZeros", Static, "int", vec!["int"], Safe),
        (INTEGER, "signum", Static, "int", vec!["int"], Safe),
        (INTEGER, "sum", Static, "int", vec!["int", "int"], Safe),
        (INTEGER, "toBinaryString", Static, STRING, vec!["int"], Safe),
        (INTEGER, "toHexString", Static, STRING, vec!["int"], Safe),
        (INTEGER, "divideUnsigned", Static, "int", vec!["int", "int"], DivideByZero),
        (INTEGER, "remainderUnsigned", Static, "int", vec!["int", "int"], DivideByZero),
        (INTEGER, "hashCode", Static, "int", vec!["int"], Safe),
        (INTEGER, "toString", Static, STRING, vec!["int"], Safe),

        (LONG, "longValue", Instance, "long", vec![], Safe),
        (LONG, "compare", Static, "int", vec!["long", "long"], Safe),
        (LONG, "bitCount", Static, "int", vec!["long"], Safe),
        (LONG, "numberOfTrailingZeros", Static, "int", vec!["long"], Safe),
        (LONG, "reverseBytes", Static, "long", vec!["long"], Safe),
        (LONG, "divideUnsigned", Static, "long", vec!["long", "long"], DivideByZero),

        (SHORT, "shortValue", Instance, "short", vec![], Safe),
        (SHORT, "reverseBytes", Static, "short", vec!["short"], Safe),
        (SHORT, "toUnsignedInt", Static, "int", vec!["short"], Safe),
        (BYTE, "byteValue", Instance, "byte", vec![], Safe),
        (BYTE, "toUnsignedInt", Static, "int", vec!["byte"], Safe),

        (CHARACTER, "charValue", Instance, "char", vec![], Safe),
        (CHARACTER, "isDigit", Static, "boolean", vec!["char"], Safe),
        (CHARACTER, "isLetter", Static, "boolean", vec!["char"], Safe),
        (CHARACTER, "toUpperCase", Static, "char", vec!["char"], Safe),
        (CHARACTER, "getNumericValue", Static, "int", vec!["char"], Safe),

        (BOOLEAN, "booleanValue", Instance, "boolean", vec![], Safe),
        (BOOLEAN, "logicalXor", Static, "boolean", vec!["boolean", "boolean"], Safe),
        (BOOLEAN, "compare", Static, "int", vec!["boolean", "boolean"], Safe),

        (FLOAT, "floatValue", Instance, "float", vec![], Safe),
        (FLOAT, "isNaN", Static, "boolean", vec!["float"], Safe),
        (FLOAT, "floatToIntBits", Static, "int", vec!["float"], Safe),
        (FLOAT, "intBitsToFloat", Static, "float", vec!["int"], Safe),

        (DOUBLE, "doubleValue", Instance, "double", vec![], Safe),
        (DOUBLE, "isNaN", Static, "boolean", vec!["double"], Safe),
        (DOUBLE, "isFinite", Static, "boolean", vec!["double"], Safe),
        (DOUBLE, "compare", Static, "int", vec!["double", "double"], Safe),
        (DOUBLE, "doubleToLongBits", Static, "long", vec!["double"], Safe),
        (DOUBLE, "longBitsToDouble", Static, "double", vec!["long"], Safe),

        (DATE, "getTime", Instance, "long", vec![], Safe),
        (DATE, "before", Instance, "boolean", vec![DATE], Safe),
        (DATE, "after", Instance, "boolean", vec![DATE], Safe),
        (DATE, "compareTo", Instance, "int", vec![DATE], Safe),
        (DATE, "hashCode", Instance, "int", vec![], Safe),

        (STRING_BUILDER, "append", Instance, STRING_BUILDER, vec![STRING], Safe),
        (STRING_BUILDER, "append", Instance, STRING_BUILDER, vec!["int"], Safe),
        (STRING_BUILDER, "append", Instance, STRING_BUILDER, vec!["char"], Safe),
        (STRING_BUILDER, "append", Instance, STRING_BUILDER, vec!["boolean"], Safe),
        (STRING_BUILDER, "length", Instance, "int", vec![], Safe),
        (STRING_BUILDER, "reverse", Instance, STRING_BUILDER, vec![], Safe),
        (STRING_BUILDER, "indexOf", Instance, "int", vec![STRING], Safe),
        (STRING_BUILDER, "toString", Instance, STRING, vec![], Safe),
    ])
}

/// Constructor parameter lists of `java.lang.StringBuilder`.
pub fn string_builder_constructors() -> Vec<Vec<&'static str>> {
    vec![vec![], vec![STRING]]
}
