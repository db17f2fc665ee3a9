use std::sync::Arc;

use crate::{
    config::Config,
    db::{DocumentStore, Record, Repository},
    identity::IdentityVerifier,
    quotes::QuoteProvider,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub identity: Arc<IdentityVerifier>,
    pub quotes: Arc<dyn QuoteProvider>,
}

impl AppState {
    pub fn repo<T: Record>(&self) -> Repository<T> {
        Repository::new(self.store.clone())
    }
}
