// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! PDF upload endpoint
//!
//! `POST /upload_pdf` accepts a multipart form with a `file` field, stores the
//! PDF and builds its vector collection before responding.

pub mod handler;
pub mod response;

pub use handler::upload_pdf_handler;
pub use response::{UploadErrorResponse, UploadResponse};
