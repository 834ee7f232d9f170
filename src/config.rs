/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::str::FromStr;

use crate::core_types::Probability;
use crate::error::FuzzError;
use crate::error::Result;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Knob {
    FieldProbability,
    VariableProbability,
    MethodProbability,
    MethodCallProbability,
    AssignmentProbability,
    PrintProbability,
    ControlFlowProbability,
    ElseProbability,
    StaticProbability,
    FinalProbability,
    ExternalCallProbability,
    BinaryOpProbability,
    CastProbability,
    StateReuseProbability,
    ForShare,
    WhileShare,
    DoWhileShare,
    IfShare,
    MaxProgramLength,
    MaxMethodLength,
    MaxControlFlowDepth,
    MaxLoopIterations,
    MaxMethodParameters,
    MaxMethods,
    MaxArrayDimensions,
    MaxArrayDimensionSize,
    MaxExpressionDepth,
    AllowArithmeticOverflow,
    AllowDivideByZero,
}

pub const ALL_KNOBS: &[Knob] = &[
    Knob::FieldProbability,
    Knob::VariableProbability,
    Knob::MethodProbability,
    Knob::MethodCallProbability,
    Knob::AssignmentProbability,
    Knob::PrintProbability,
    Knob::ControlFlowProbability,
    Knob::ElseProbability,
    Knob::StaticProbability,
    Knob::FinalProbability,
    Knob::ExternalCallProbability,
    Knob::BinaryOpProbability,
    Knob::CastProbability,
    Knob::StateReuseProbability,
    Knob::ForShare,
    Knob::WhileShare,
    Knob::DoWhileShare,
    Knob::IfShare,
    Knob::MaxProgramLength,
    Knob::MaxMethodLength,
    Knob::MaxControlFlowDepth,
    Knob::MaxLoopIterations,
    Knob::MaxMethodParameters,
    Knob::MaxMethods,
    Knob::MaxArrayDimensions,
    Knob::MaxArrayDimensionSize,
    Knob::MaxExpressionDepth,
    Knob::AllowArithmeticOverflow,
    Knob::AllowDivideByZero,
];

impl Knob {
    pub fn name(self) -> &'static str {
        match self {
            Knob::FieldProbability => "field_probability",
            Knob::VariableProbability => "variable_probability",
            Knob::MethodProbability => "method_probability",
            Knob::MethodCallProbability => "method_call_probability",
            Knob::AssignmentProbability => "assignment_probability",
            Knob::PrintProbability => "print_probability",
            Knob::ControlFlowProbability => "control_flow_probability",
            Knob::ElseProbability => "else_probability",
            Knob::StaticProbability => "static_probability",
            Knob::FinalProbability => "final_probability",
            Knob::ExternalCallProbability => "external_call_probability",
            Knob::BinaryOpProbability => "binary_op_probability",
            Knob::CastProbability => "cast_probability",
            Knob::StateReuseProbability => "state_reuse_probability",
            Knob::ForShare => "for_share",
            Knob::WhileShare => "while_share",
            Knob::DoWhileShare => "do_while_share",
            Knob::IfShare => "if_share",
            Knob::MaxProgramLength => "max_program_length",
            Knob::MaxMethodLength => "max_method_length",
            Knob::MaxControlFlowDepth => "max_control_flow_depth",
            Knob::MaxLoopIterations => "max_loop_iterations",
            Knob::MaxMethodParameters => "max_method_parameters",
            Knob::MaxMethods => "max_methods",
            Knob::MaxArrayDimensions => "max_array_dimensions",
            Knob::MaxArrayDimensionSize => "max_array_dimension_size",
            Knob::MaxExpressionDepth => "max_expression_depth",
            Knob::AllowArithmeticOverflow => "allow_arithmetic_overflow",
            Knob::AllowDivideByZero => "allow_divide_by_zero",
        }
    }

    pub fn default_value(self) -> u32 {
        match self {
            Knob::FieldProbability => 20,
            Knob::VariableProbability => 30,
            Knob::MethodProbability => 30,
            Knob::MethodCallProbability => 20,
            Knob::AssignmentProbability => 30,
            Knob::PrintProbability => 20,
            Knob::ControlFlowProbability => 15,
            Knob::ElseProbability => 50,
            Knob::StaticProbability => 30,
            Knob::FinalProbability => 20,
            Knob::ExternalCallProbability => 20,
            Knob::BinaryOpProbability => 30,
            Knob::CastProbability => 10,
            Knob::StateReuseProbability => 50,
            Knob::ForShare => 40,
            Knob::WhileShare => 20,
            Knob::DoWhileShare => 10,
            Knob::IfShare => 30,
            Knob::MaxProgramLength => 40,
            Knob::MaxMethodLength => 12,
            Knob::MaxControlFlowDepth => 3,
            Knob::MaxLoopIterations => 5,
            Knob::MaxMethodParameters => 4,
            Knob::MaxMethods => 8,
            Knob::MaxArrayDimensions => 3,
            Knob::MaxArrayDimensionSize => 4,
            Knob::MaxExpressionDepth => 4,
            Knob::AllowArithmeticOverflow => 0,
            Knob::AllowDivideByZero => 0,
        }
    }

    pub fn min_value(self) -> u32 {
        match self {
            Knob::MaxLoopIterations | Knob::MaxArrayDimensions | Knob::MaxArrayDimensionSize => 1,
            _ => 0,
        }
    }

    pub fn max_value(self) -> u32 {
        match self {
            Knob::AllowArithmeticOverflow | Knob::AllowDivideByZero => 1,
            Knob::MaxProgramLength | Knob::MaxMethodLength => 1000,
            // keeps the largest possible array at a million elements
            Knob::MaxArrayDimensions => 4,
            Knob::MaxArrayDimensionSize => 32,
            Knob::MaxLoopIterations => 1000,
            Knob::MaxMethods => 200,
            Knob::MaxMethodParameters => 20,
            _ => 100,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Knob {
    type Err = FuzzError;

    fn from_str(s: &str) -> Result<Self> {
        // Accept both `max_loop_iterations` and `max-loop-iterations`
        let normalized = s.trim().replace('-', "_");
        ALL_KNOBS
            .iter()
            .copied()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| FuzzError::UnknownKnob(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Knobs {
    values: Vec<u32>,
}
impl Default for Knobs {
    fn default() -> Self {
        Knobs {
            values: ALL_KNOBS.iter().map(|k| k.default_value()).collect(),
        }
    }
}
impl Knobs {
    pub fn get(&self, knob: Knob) -> u32 {
        self.values[knob.index()]
    }

    pub fn probability(&self, knob: Knob) -> Probability {
        self.get(knob).min(100)
    }

    pub fn flag(&self, knob: Knob) -> bool {
        self.get(knob) != 0
    }

    pub fn set(&mut self, knob: Knob, value: u32) -> Result<()> {
        if value < knob.min_value() || value > knob.max_value() {
            return Err(FuzzError::InvalidKnobValue {
                knob: knob.name().to_string(),
                value: value.to_string(),
            });
        }
        self.values[knob.index()] = value;
        Ok(())
    }

    pub fn with(mut self, knob: Knob, value: u32) -> Result<Self> {
        self.set(knob, value)?;
        Ok(self)
    }

    /// Parses a `name=value` assignment, e.g. `print_probability=100`.
    pub fn set_from_assignment(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| FuzzError::UnknownKnob(assignment.to_string()))?;
        let knob: Knob = name.parse()?;
        let value = value
            .trim()
            .parse::<u32>()
            .map_err(|_| FuzzError::InvalidKnobValue {
                knob: knob.name().to_string(),
                value: value.to_string(),
            })?;
        self.set(knob, value)
    }

    pub fn from_assignments<'a, I: IntoIterator<Item = &'a str>>(assignments: I) -> Result<Self> {
        let mut knobs = Knobs::default();
        for assignment in assignments {
            knobs.set_from_assignment(assignment)?;
        }
        Ok(knobs)
    }

    pub fn non_default(&self) -> impl Iterator<Item = (Knob, u32)> + '_ {
        ALL_KNOBS
            .iter()
            .copied()
            .filter(|k| self.get(*k) != k.default_value())
            .map(|k| (k, self.get(k)))
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub class_name: String,
    pub knobs: Knobs,
}
impl Config {
    pub fn new(class_name: &str, knobs: Knobs) -> Self {
        Config {
            class_name: class_name.to_string(),
            knobs,
        }
    }
}
impl Default for Config {
    fn default() -> Self {
        Config::new("FuzzTest", Knobs::default())
    }
}
