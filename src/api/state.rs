use crate::query::StatusQuery;

#[derive(Clone)]
pub struct AppState {
    pub query: StatusQuery,
}

impl AppState {
    pub fn new(query: StatusQuery) -> Self {
        Self { query }
    }
}
