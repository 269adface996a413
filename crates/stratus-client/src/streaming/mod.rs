//! Streaming extraction of records from response bodies
//!
//! A listing response can be larger than the memory available to the
//! device, so the body is never materialized. The extractor drives
//! `serde_json` incrementally through a [`serde::de::DeserializeSeed`]:
//! each record in the document's array is deserialized alone, handed to a
//! consumer closure, and dropped before the next one is touched.

mod extractor;

pub use extractor::extract_records;
