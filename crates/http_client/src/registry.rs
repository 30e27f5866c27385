//! Indexes [`HttpClient`]s by UID so workflows can reference a
//! preconfigured client without embedding credentials in the payload.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::client::HttpClient;
use crate::error::HttpClientError;

#[derive(Default)]
pub struct HttpClientRegistry {
    clients: HashMap<Uuid, Arc<HttpClient>>,
}

impl HttpClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: HttpClient) -> Uuid {
        let uid = client.uid;
        self.clients.insert(uid, Arc::new(client));
        uid
    }

    pub fn get(&self, uid: &Uuid) -> Result<Arc<HttpClient>, HttpClientError> {
        self.clients.get(uid).cloned().ok_or(HttpClientError::UnknownClient(*uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpClientConfig;

    #[test]
    fn register_and_lookup_roundtrip() {
        let mut registry = HttpClientRegistry::new();
        let uid = registry.register(HttpClient::new(HttpClientConfig::default()));
        assert!(registry.get(&uid).is_ok());
    }

    #[test]
    fn unknown_uid_errors() {
        let registry = HttpClientRegistry::new();
        assert!(matches!(
            registry.get(&Uuid::new_v4()),
            Err(HttpClientError::UnknownClient(_))
        ));
    }
}
