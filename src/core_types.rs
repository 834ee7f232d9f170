/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

// fields are named f1, f2, .., locals v1, v2, .., methods m1, m2, ..
pub type NameNum = u32;
pub type Arity = usize;
// percentages, 0..=100
pub type Probability = u32;
