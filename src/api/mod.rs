// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod query;
pub mod upload;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{ComponentStatus, DocumentsResponse, HealthResponse};
pub use http_server::{create_app, start_server, AppState};
pub use query::{process_query_handler, QueryRequest, QueryResponse};
pub use upload::{upload_pdf_handler, UploadErrorResponse, UploadResponse};
