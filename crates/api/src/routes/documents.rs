//! Purchase and sale endpoints.
//!
//! Every route is mounted under `/{kind}`, where `kind` is `purchases` or
//! `sales`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{DocumentId, Version};
use domain::{Document, DocumentHeader, DocumentKind, DocumentStatus, ListRequest, NewDocumentItem, Page};
use saga::{DocumentService, InMemoryInventoryLedger};
use serde::Deserialize;
use store::{DocumentStore, InMemoryCatalog};
use views::{DocumentDetail, DocumentReader};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub documents: DocumentService<S, InMemoryCatalog, InMemoryInventoryLedger>,
    pub reader: DocumentReader<S, InMemoryCatalog>,
    pub catalog: InMemoryCatalog,
    pub ledger: InMemoryInventoryLedger,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateDocumentRequest {
    pub header: DocumentHeader,
    pub items: Vec<NewDocumentItem>,
}

#[derive(Deserialize)]
pub struct UpdateDocumentRequest {
    pub header: DocumentHeader,
    pub items: Vec<NewDocumentItem>,
    /// Version the client last read; the update fails with 409 if it moved.
    #[serde(default)]
    pub expected_version: Option<u32>,
}

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: DocumentStatus,
}

// -- Handlers --

/// POST /{kind}: create a document with its lines.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(kind): Path<String>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let kind = parse_kind(&kind)?;
    let document = state.documents.create(kind, req.header, req.items).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /{kind}: list headers with paging, sorting and filters.
#[tracing::instrument(skip(state, request))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(kind): Path<String>,
    Query(request): Query<ListRequest>,
) -> Result<Json<Page<Document>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let page = state.reader.list(kind, request).await?;
    Ok(Json(page))
}

/// GET /{kind}/{id}: load a document with its flattened lines.
#[tracing::instrument(skip(state))]
pub async fn detail<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<DocumentDetail>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_document_id(&id)?;
    let detail = state.reader.detail(kind, id).await?;
    Ok(Json(detail))
}

/// PUT /{kind}/{id}: replace the header and all lines.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((kind, id)): Path<(String, String)>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_document_id(&id)?;
    let document = state
        .documents
        .update(
            kind,
            id,
            req.header,
            req.items,
            req.expected_version.map(Version::new),
        )
        .await?;
    Ok(Json(document))
}

/// POST /{kind}/{id}/status: move the document to another status.
#[tracing::instrument(skip(state, req))]
pub async fn change_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((kind, id)): Path<(String, String)>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<Document>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_document_id(&id)?;
    let document = state.documents.change_status(kind, id, req.status).await?;
    Ok(Json(document))
}

/// DELETE /{kind}/{id}: delete a document and its lines.
#[tracing::instrument(skip(state))]
pub async fn delete<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_document_id(&id)?;
    state.documents.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_kind(collection: &str) -> Result<DocumentKind, ApiError> {
    DocumentKind::from_collection(collection)
        .map_err(|_| ApiError::NotFound(format!("Unknown collection: {collection}")))
}

fn parse_document_id(id: &str) -> Result<DocumentId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
