// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod elements;
pub mod factory;

pub use elements::*;
pub use factory::LocalElementFactory;
