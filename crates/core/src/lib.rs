//! Core library for boamp
//!
//! This crate implements the **Functional Core** of the boamp application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`boamp_core`** (this crate): Pure query construction and result
//!   shaping with zero I/O
//! - **`boamp`**: HTTP calls to the BOAMP open-data API, the MCP server and
//!   the CLI (the Imperative Shell)
//!
//! The current date is an input to the query builder rather than something
//! it reads, so every function here is deterministic and testable with
//! fixture data.
//!
//! # Module Organization
//!
//! - [`market`]: Market records, market types, sort orders and backend payloads
//! - [`query`]: Filter expression and request parameter construction
//! - [`locator`]: `boamp://market/{idweb}` resource locators
//! - [`error`]: The error taxonomy surfaced to callers
//!
//! # Example Usage
//!
//! ```rust
//! use boamp_core::query::{build_search_query, SearchParams};
//! use chrono::NaiveDate;
//!
//! let params = SearchParams::new(
//!     Some(vec!["informatique".to_string()]),
//!     None,
//!     None,
//!     None,
//!     None,
//! );
//! let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
//! let query = build_search_query(&params, today);
//!
//! assert_eq!(query.limit, Some(20));
//! assert_eq!(query.order_by.as_deref(), Some("datelimitereponse ASC"));
//! ```

pub mod error;
pub mod locator;
pub mod market;
pub mod query;

pub use error::MarketError;
