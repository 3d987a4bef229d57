//! Engine profiles.
//!
//! Every contract in [`crate::traits`] is generic over one [`Engine`]. The profile fixes the
//! value extension carried by [`Param`] and [`Row`], the three transaction option records, and
//! the support matrix for the optional query operations.

use std::fmt::Debug;

use crate::results::{ArrayRow, Row};
use crate::types::{Capabilities, Param};

/// Per-engine transaction option records.
pub trait TransactionOptions: Send + Sync + 'static {
    /// Options accepted by `begin_transaction`.
    type Begin: Default + Debug + Clone + Send + Sync;
    /// Options accepted by `commit_transaction`.
    type Commit: Default + Debug + Clone + Send + Sync;
    /// Options accepted by `rollback_transaction`.
    type Rollback: Default + Debug + Clone + Send + Sync;
}

/// Compile-time description of a database engine.
pub trait Engine: Send + Sync + 'static {
    /// Engine name used in errors and log fields.
    const NAME: &'static str;

    /// Optional `Queriable` operations this engine implements.
    const CAPABILITIES: Capabilities;

    /// Native value types beyond the portable `Param` variants.
    type Extension: Debug + Clone + PartialEq + Send + Sync + 'static;

    type TransactionOptions: TransactionOptions;
}

pub type Extension<E> = <E as Engine>::Extension;

pub type EngineParam<E> = Param<Extension<E>>;

pub type EngineRow<E> = Row<Extension<E>>;

pub type EngineArrayRow<E> = ArrayRow<Extension<E>>;

pub type BeginOptions<E> = <<E as Engine>::TransactionOptions as TransactionOptions>::Begin;

pub type CommitOptions<E> = <<E as Engine>::TransactionOptions as TransactionOptions>::Commit;

pub type RollbackOptions<E> = <<E as Engine>::TransactionOptions as TransactionOptions>::Rollback;
