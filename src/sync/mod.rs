//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步机制，包括有界并发扇出、上游对账和空闲重置。

pub mod fanout;
pub mod idle;
pub mod reconcile;

pub use fanout::{EntityFailure, FailureKind, FanOut, PassReport, PassStream};
pub use idle::IdleResetEngine;
pub use reconcile::{ReconcileReport, ReconciliationEngine};
