#[derive(Debug, Deserialize)]
struct MoveRequest {
    dx: i64,
    dy: i64,
}

#[derive(Debug, Default, Deserialize)]
struct StepRequest {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct ToggleResponse {
    autonomy: bool,
    cognition: bool,
}

async fn post_move(
    State(state): State<AppState>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<Envelope<StepResult>>, HttpApiError> {
    validate_move(request.dx, request.dy)?;

    let result = {
        let mut system = state.inner.lock().await;
        system
            .apply_move(request.dx, request.dy)
            .map_err(HttpApiError::from_bootstrap)?
    };

    Ok(Envelope::new(result))
}

async fn post_step(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<Envelope<StepResult>>, HttpApiError> {
    let request = parse_step_request(&body)?;

    let result = {
        let mut system = state.inner.lock().await;
        system
            .step(request.text.as_deref())
            .map_err(HttpApiError::from_bootstrap)?
    };

    Ok(Envelope::new(result))
}

async fn post_autonomy(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Json<Envelope<ToggleResponse>> {
    let mut system = state.inner.lock().await;
    system.set_autonomy(request.enabled);
    Envelope::new(toggles(&system))
}

async fn post_cognition(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Json<Envelope<ToggleResponse>> {
    let mut system = state.inner.lock().await;
    system.set_cognition(request.enabled);
    Envelope::new(toggles(&system))
}

/// Empty bodies are a plain tick.
fn parse_step_request(body: &[u8]) -> Result<StepRequest, HttpApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StepRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        HttpApiError::invalid_command("step body must be json", Some(err.to_string()))
    })
}

fn toggles(system: &SystemBootstrap) -> ToggleResponse {
    ToggleResponse {
        autonomy: system.config().enable_autonomy,
        cognition: system.config().enable_cognition,
    }
}
