//! # Glean Connector
//!
//! A scheduled connector that harvests generated TechDocs pages from an
//! internal documentation service and bulk-indexes them into a Glean
//! enterprise search datasource.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐   ┌─────────────────┐
//! │  Scheduler /  │──▶│ GleanIndexer │──▶│ DocumentBuilder │
//! │  HTTP trigger │   │ batch+frame  │   │ strip nav,title │
//! └───────────────┘   └──────┬───────┘   └────────┬────────┘
//!                            │                    │
//!                            ▼                    ▼
//!                 POST /bulkindexdocuments   TechDocsClient
//!                 (Glean indexing API)       (metadata, static HTML)
//! ```
//!
//! Each run fetches the entity's documentation metadata, filters the file
//! list to HTML pages, builds search documents batch by batch, and uploads
//! the batches under a single `upload-` session id with first/last-page
//! framing.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Entity references, TechDocs metadata, Glean documents |
//! | [`error`] | Typed retrieval/network errors |
//! | [`techdocs`] | TechDocs HTTP client and HTML extraction |
//! | [`document`] | Search-document assembly |
//! | [`indexer`] | Batched bulk indexing and run orchestration |
//! | [`scheduler`] | Recurring scheduled runs |
//! | [`server`] | Manual-trigger HTTP endpoint |

pub mod config;
pub mod document;
pub mod error;
pub mod indexer;
pub mod models;
pub mod scheduler;
pub mod server;
pub mod techdocs;
