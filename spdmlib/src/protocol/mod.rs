// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

mod algo;
mod capability;
mod opcode;
mod version;

pub use algo::*;
pub use capability::*;
pub use opcode::*;
pub use version::*;

/// Build a fixed-size array out of one clonable value.
pub fn gen_array_clone<T: Clone + Copy, const N: usize>(value: T, _count: usize) -> [T; N] {
    [value; N]
}
