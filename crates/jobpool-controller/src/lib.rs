//! Worker pool reconciler
//!
//! Keeps a bounded pool of worker Jobs per group:
//! - Applies the owner's setup resources (ConfigMaps, Secrets, ...)
//! - Reaps Jobs and Pods that finished successfully
//! - Counts active Jobs per group against a ceiling
//! - Submits a normalized Job when there is room

pub mod error;
pub mod gateway;
pub mod kube_gateway;
pub mod owner;
pub mod reconciler;
pub mod setup;

pub use error::ReconcileError;
pub use gateway::{Gateway, JobClient, MiscClient, PodClient, SetupKind};
pub use kube_gateway::{connect, ConnectionSource, KubeGateway};
pub use owner::{OwnerError, SetupEntry, WorkerDefinition, WorkerOwner};
pub use reconciler::{ReconcileOutcome, ReconcileReport, Reconciler};
