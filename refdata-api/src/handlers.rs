use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::error;

use crate::models::{ApiResponse, BondsQuery, FundsQuery, IssuersQuery, PageWindow};
use crate::queries;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({"success": true, "data": {"status": "ok"}}))
}

pub async fn list_funds(
    State(state): State<AppState>,
    Query(query): Query<FundsQuery>,
) -> impl IntoResponse {
    let window = PageWindow::clamp(query.page, query.per_page);
    let result = {
        let conn = match state.db.lock() {
            Ok(conn) => conn,
            Err(_) => return internal_error("database lock poisoned"),
        };
        queries::list_funds(&conn, &query.search, &query.class, window)
    };

    match result {
        Ok((rows, total)) => {
            let response = ApiResponse::paginated(rows, window.pagination(total));
            (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or_default()))
        }
        Err(e) => {
            error!(error = %e, "fund query failed");
            internal_error("failed to query funds")
        }
    }
}

pub async fn get_fund(
    State(state): State<AppState>,
    Path(cnpj): Path<String>,
) -> impl IntoResponse {
    let result = {
        let conn = match state.db.lock() {
            Ok(conn) => conn,
            Err(_) => return internal_error("database lock poisoned"),
        };
        queries::get_fund(&conn, &cnpj)
    };

    match result {
        Ok(Some(fund)) => {
            let response = ApiResponse::ok(fund);
            (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or_default()))
        }
        Ok(None) => {
            let response = ApiResponse::<()>::error(format!("fund '{}' not found", cnpj));
            (StatusCode::NOT_FOUND, Json(serde_json::to_value(response).unwrap_or_default()))
        }
        Err(e) => {
            error!(error = %e, cnpj, "fund lookup failed");
            internal_error("failed to query fund")
        }
    }
}

pub async fn list_bonds(
    State(state): State<AppState>,
    Query(query): Query<BondsQuery>,
) -> impl IntoResponse {
    let window = PageWindow::clamp(query.page, query.per_page);
    let result = {
        let conn = match state.db.lock() {
            Ok(conn) => conn,
            Err(_) => return internal_error("database lock poisoned"),
        };
        queries::list_bonds(&conn, &query.security_code, window)
    };

    match result {
        Ok((rows, total)) => {
            let response = ApiResponse::paginated(rows, window.pagination(total));
            (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or_default()))
        }
        Err(e) => {
            error!(error = %e, "bond query failed");
            internal_error("failed to query bond quotes")
        }
    }
}

pub async fn list_issuers(
    State(state): State<AppState>,
    Query(query): Query<IssuersQuery>,
) -> impl IntoResponse {
    let window = PageWindow::clamp(query.page, query.per_page);
    let result = {
        let conn = match state.db.lock() {
            Ok(conn) => conn,
            Err(_) => return internal_error("database lock poisoned"),
        };
        queries::list_issuers(&conn, &query.search, &query.category, window)
    };

    match result {
        Ok((rows, total)) => {
            let response = ApiResponse::paginated(rows, window.pagination(total));
            (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or_default()))
        }
        Err(e) => {
            error!(error = %e, "issuer query failed");
            internal_error("failed to query issuers")
        }
    }
}

fn internal_error(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    let response = ApiResponse::<()>::error(message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::to_value(response).unwrap_or_default()),
    )
}
