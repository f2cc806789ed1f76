//! Data access subsystem.
//!
//! # Data Flow
//! ```text
//! authorization (ownership lookups) ─┐
//! request handlers (find/save/delete) ┴→ store.rs (RecordStore trait)
//!                                          → memory.rs (DashMap-backed)
//! ```
//!
//! # Design Decisions
//! - Child records resolve ownership through their patient (record → patient → user)
//! - The trait is object safe and shared as `Arc<dyn RecordStore>`
//! - Lookups never cache; every call reflects current ownership

pub mod memory;
pub mod store;

pub use memory::InMemoryRecordStore;
pub use store::{PatientRecord, RecordStore, ResourceOwnership, ResourceType, StoreError};
