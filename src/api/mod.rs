// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod errors;
pub mod http_client;
pub mod http_server;
pub mod middleware;

pub use client::{EncryptedClient, RequestOptions};
pub use errors::{ApiError, ApiErrorResponse, ErrorResponse};
pub use http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use http_server::{create_app, start_server, AppState, HealthResponse};
pub use middleware::{with_encryption, EncryptionLayer, ProtectedRequest};
