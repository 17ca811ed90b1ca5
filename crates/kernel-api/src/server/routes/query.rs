#[derive(Debug, Deserialize, Default)]
struct EventsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct EventsPage {
    limit: usize,
    last_seq: u64,
    events: Vec<Event>,
}

async fn get_snapshot(
    State(state): State<AppState>,
) -> Result<Json<Envelope<SystemSnapshot>>, HttpApiError> {
    let snapshot = {
        let system = state.inner.lock().await;
        system.snapshot().map_err(HttpApiError::from_bootstrap)?
    };

    Ok(Envelope::new(snapshot))
}

async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Envelope<EventsPage>>, HttpApiError> {
    let limit = clamp_event_limit(query.limit)?;

    let page = {
        let system = state.inner.lock().await;
        let events = system
            .recent_events(limit)
            .map_err(HttpApiError::from_bootstrap)?;
        let last_seq = system
            .log()
            .stats()
            .map_err(|err| HttpApiError::from_bootstrap(err.into()))?
            .last_seq;
        EventsPage {
            limit,
            last_seq,
            events,
        }
    };

    Ok(Envelope::new(page))
}

async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<Envelope<LogStats>>, HttpApiError> {
    let stats = {
        let system = state.inner.lock().await;
        system
            .log()
            .stats()
            .map_err(|err| HttpApiError::from_bootstrap(err.into()))?
    };

    Ok(Envelope::new(stats))
}
