#[derive(Clone)]
struct AppState {
    inner: std::sync::Arc<Mutex<SystemBootstrap>>,
}

impl AppState {
    fn new(system: SystemBootstrap) -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(system)),
        }
    }
}

/// Envelope shared by every successful response.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    schema_version: String,
    #[serde(flatten)]
    body: T,
}

impl<T> Envelope<T> {
    fn new(body: T) -> Json<Self> {
        Json(Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            body,
        })
    }
}
