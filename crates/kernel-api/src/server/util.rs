fn apply_cors_headers(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-max-age"),
        HeaderValue::from_static("3600"),
    );
}

fn clamp_event_limit(limit: Option<usize>) -> Result<usize, HttpApiError> {
    match limit {
        None => Ok(DEFAULT_EVENT_LIMIT),
        Some(0) => Err(HttpApiError::invalid_query(
            "limit must be at least 1",
            None,
        )),
        Some(limit) => Ok(limit.min(MAX_EVENT_LIMIT)),
    }
}

fn validate_move(dx: i64, dy: i64) -> Result<(), HttpApiError> {
    if dx.abs() > MAX_MOVE_STEP || dy.abs() > MAX_MOVE_STEP {
        return Err(HttpApiError::invalid_command(
            "moves are limited to one cell per axis",
            Some(format!("dx={dx} dy={dy}")),
        ));
    }
    Ok(())
}
