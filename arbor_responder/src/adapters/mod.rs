// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adapters to integrate with other Arbor crates.

pub mod tree;
