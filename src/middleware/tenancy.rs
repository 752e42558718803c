// src/middleware/tenancy.rs

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{common::error::ApiError, models::TenantId};

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// Apartamento (tenant) alvo da requisição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub TenantId);

fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantContext, ApiError> {
    let value = headers.get(TENANT_ID_HEADER).ok_or_else(|| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: "O cabeçalho X-Tenant-ID é obrigatório.".to_string(),
    })?;

    let value_str = value.to_str().map_err(|_| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: "Cabeçalho X-Tenant-ID contém caracteres inválidos.".to_string(),
    })?;

    let tenant_id = value_str
        .trim()
        .parse::<TenantId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "Cabeçalho X-Tenant-ID inválido (não é um identificador numérico).".to_string(),
        })?;

    Ok(TenantContext(tenant_id))
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(*ctx);
        }
        tenant_from_headers(&parts.headers)
    }
}

// Barra as rotas de dados antes do handler quando o tenant não vem no cabeçalho.
pub async fn tenant_guard(mut request: Request<Body>, next: Next) -> Response {
    match tenant_from_headers(request.headers()) {
        Ok(ctx) => {
            tracing::debug!(tenant_id = ctx.0, path = %request.uri().path(), "requisição com tenant");
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_numeric_tenant_header() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(tenant_from_headers(&headers).unwrap(), TenantContext(42));
    }

    #[test]
    fn rejects_missing_or_invalid_header() {
        let headers = HeaderMap::new();
        assert_eq!(tenant_from_headers(&headers).unwrap_err().status, StatusCode::BAD_REQUEST);

        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("abc"));
        assert!(tenant_from_headers(&headers).is_err());

        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("0"));
        assert!(tenant_from_headers(&headers).is_err());
    }
}
