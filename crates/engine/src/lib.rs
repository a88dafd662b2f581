// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cmt-engine: build ordering across source trees and the runner that
//! executes an ordered plan.

pub mod plan;
pub mod resolver;

pub use plan::{PlanError, PlanRunner};
pub use resolver::{
    BuildPlan, BuildStep, DependencyNode, DependencyResolver, NodeId, ResolveError,
};
