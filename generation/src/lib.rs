//! # Generation
//!
//! Sends a grounded prompt to an Ollama-style `/api/generate` endpoint and
//! rebuilds the streamed answer.
//!
//! The wire format is newline-delimited JSON, one `{response?, done?}` record
//! per line. Network reads split that stream anywhere: mid-record and even
//! mid-character. [`StreamReassembler`] absorbs both and reports the full
//! answer-so-far after every record that adds text.
//!
//! ```text
//! prompt ──► GenerationProvider::generate ──► ByteStream
//!                                               │
//!                                               ▼
//!                    StreamReassembler (utf-8 decode ─► lines ─► records)
//!                                               │
//!                                               ▼
//!                                  on_update(accumulated text)
//! ```

pub mod client;
pub mod error;
pub mod reassembler;

pub use client::{ByteStream, GenerationProvider, OllamaGenerator};
pub use error::{GenerationError, Result};
pub use reassembler::{LineState, StreamReassembler, reassemble};

/// Default generation model served by a local Ollama instance.
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Default base URL of a local Ollama instance.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
