#![doc = "docmee-core: client library for the docmee presentation generation API."]

//! This crate holds everything needed to talk to docmee: the HTTP client,
//! wire types, the response envelope, outline stream decoding and the error
//! taxonomy. The CLI crate only adds configuration loading and argument
//! parsing on top.
//!
//! # Usage
//! Build a [`DocmeeClient`] and call the operations of the [`DocmeeApi`] trait;
//! depend on the trait where a mock is needed in tests.

pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod model;
pub mod operate_log;
pub mod stream;

pub use client::{DocmeeClient, BASE_URL};
pub use config::ClientConfig;
pub use contract::DocmeeApi;
#[cfg(any(test, feature = "test-export-mocks"))]
pub use contract::MockDocmeeApi;
pub use error::{ClientError, ClientResult, TransportError};
pub use model::{
    ArtifactInfo, CreateTokenRequest, Envelope, GenerateOutlineRequest, GeneratePptxRequest,
    TaskFile, TemplateFilter, TemplateInfo, TemplatePage, TemplateQuery, UpdateOutlineRequest,
};
pub use stream::{OutlineChunk, OutlineStream, StreamDecoder};
