// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Question answering endpoint
//!
//! `POST /process_query` runs retrieve → rerank → generate against one
//! previously uploaded PDF and returns `{"ai_answer": "..."}`.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::process_query_handler;
pub use request::QueryRequest;
pub use response::QueryResponse;
