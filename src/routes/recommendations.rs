use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::Response;

use crate::response::{ok, AppError};
use crate::services::recommendation::{RecommendationOptions, RecommendationService};
use crate::state::AppState;

pub async fn get_queue(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    uri: Uri,
) -> Result<Response, AppError> {
    let options = parse_options(uri.query().unwrap_or(""))?;
    let service = service(&state)?;
    let result = service.get_or_generate(&user_id, options).await?;
    Ok(ok(result))
}

pub async fn refresh_queue(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    uri: Uri,
) -> Result<Response, AppError> {
    let options = parse_options(uri.query().unwrap_or(""))?;
    let service = service(&state)?;
    let result = service.generate(&user_id, options).await?;
    Ok(ok(result))
}

fn service(state: &AppState) -> Result<Arc<RecommendationService>, AppError> {
    state
        .recommendations()
        .ok_or_else(|| AppError::service_unavailable("Database is not configured"))
}

fn parse_options(query: &str) -> Result<RecommendationOptions, AppError> {
    let mut options = RecommendationOptions::default();

    if let Some(raw) = get_query_param(query, "limit") {
        let limit = raw
            .parse::<i64>()
            .map_err(|_| AppError::validation("limit must be an integer"))?;
        options = options.with_limit(limit);
    }
    if let Some(raw) = get_query_param(query, "ttlHours") {
        let ttl_hours = raw
            .parse::<f64>()
            .map_err(|_| AppError::validation("ttlHours must be a number"))?;
        options = options.with_ttl_hours(ttl_hours);
    }

    Ok(options)
}

fn get_query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut iter = pair.splitn(2, '=');
        let k = iter.next().unwrap_or("");
        if k != key {
            continue;
        }
        return Some(iter.next().unwrap_or("").trim());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let options = parse_options("limit=3&ttlHours=1.5").unwrap();
        assert_eq!(options.limit, Some(3));
        assert_eq!(options.ttl_hours, Some(1.5));

        let empty = parse_options("").unwrap();
        assert_eq!(empty, RecommendationOptions::default());
    }

    #[test]
    fn test_parse_options_rejects_garbage() {
        assert!(parse_options("limit=ten").is_err());
        assert!(parse_options("ttlHours=soon").is_err());
    }
}
