/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FuzzError>;

#[derive(Debug, Error)]
pub enum FuzzError {
    /// A generator bug: an internal contract was broken. Never a property of the generated program.
    #[error("unexpected application state: {0}")]
    UnexpectedApplicationState(String),

    #[error("could not emit {class}.{method}: {reason}")]
    Emission {
        class: String,
        method: String,
        reason: String,
    },

    #[error("unknown knob: {0}")]
    UnknownKnob(String),

    #[error("invalid value `{value}` for knob {knob}")]
    InvalidKnobValue { knob: String, value: String },

    #[error("type {0} is not known to the type registry")]
    UnknownType(String),
}

impl FuzzError {
    pub fn unexpected(msg: impl Into<String>) -> Self {
        FuzzError::UnexpectedApplicationState(msg.into())
    }

    /// Invariant violations must abort the whole session, everything else only the current attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FuzzError::UnexpectedApplicationState(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invariant_violations_are_fatal() {
        assert!(FuzzError::unexpected("missing case").is_fatal());
        let emission = FuzzError::Emission {
            class: "Test".to_string(),
            method: "m1".to_string(),
            reason: "formatter error".to_string(),
        };
        assert!(!emission.is_fatal());
        assert_eq!(
            emission.to_string(),
            "could not emit Test.m1: formatter error"
        );
    }
}
