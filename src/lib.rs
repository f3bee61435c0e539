//! # pdf-compose – content-tree driven PDF composition engine
//!
//! This crate assembles a structured content tree into one finished,
//! page-numbered PDF. The build stages are:
//!
//! 1. **Describe** – declarative content model ([`content`])
//! 2. **Measure** – font registration and text metrics ([`fonts`])
//! 3. **Lay out** – sections → buffered pages + TOC records ([`layout`])
//! 4. **Reconcile** – embedded sub-documents shift later page numbers
//!    ([`pagination`])
//! 5. **Compose** – covers, body, and embeds merge into final bytes
//!    ([`compose`], [`pipeline`])
//!
//! All binary inputs (fonts, images, embedded PDFs) must be resolved into
//! in-memory buffers before a build starts; the engine itself performs no
//! I/O.

pub mod canvas;
pub mod compose;
pub mod content;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod pagination;
pub mod pipeline;
pub mod templates;

// Re-exports for convenience
pub use content::DocumentConfig;
pub use error::{Error, Result};
pub use pipeline::{build, build_from_json, Output};
