/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

mod ast;
mod builder;
mod config;
mod context;
mod core_types;
mod environment;
mod error;
mod generator;
mod java_api;
mod random;
mod registry;
mod resolver;
mod state;
mod types;

pub use ast::BinaryOperator;
pub use ast::Block;
pub use ast::Expression;
pub use ast::ExprId;
pub use ast::Program;
pub use ast::Statement;
pub use ast::Value;
pub use builder::Builder;
pub use config::Config;
pub use config::Knob;
pub use config::Knobs;
pub use config::ALL_KNOBS;
pub use error::FuzzError;
pub use error::Result;
pub use generator::gen_program;
pub use generator::gen_program_with_registry;
pub use registry::TypeRegistry;
pub use resolver::format_value;
pub use resolver::visit_statements;
pub use resolver::ProgramStats;
pub use state::ClassState;
pub use state::MethodId;
pub use state::Modifiers;
pub use types::IntDomain;
pub use types::MetaType;
pub use types::PrimitiveKind;
