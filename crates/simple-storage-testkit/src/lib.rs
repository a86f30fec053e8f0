//! # Simple Storage Testkit
//!
//! Testing utilities for simple-storage backends.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Random user records and the date-keyed predicate fixture
//! - **Generators**: Proptest strategies for keys, versions and records
//! - **Suite**: Async behavioural checks every `Storage` backend must pass
//!
//! ## Running the suite
//!
//! ```rust,no_run
//! use rand::SeedableRng;
//! use simple_storage_store::{MemorySlots, SlotStorage};
//! use simple_storage_testkit::suite;
//!
//! async fn check() {
//!     let storage = SlotStorage::new(MemorySlots::new(), "MyCache", "Users").unwrap();
//!     let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//!     suite::run_all(&storage, &mut rng).await;
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod suite;

pub use fixtures::{date_records, day_digit_predicate, random_record, random_records};
