//! Contact lookup capability injected into the login reactor.

use async_trait::async_trait;

/// Source of known account emails.
#[async_trait]
pub trait ContactService: Send + Sync {
    async fn load_emails(&self) -> anyhow::Result<Vec<String>>;
}

/// Fixed list of emails held in memory.
#[derive(Debug, Default)]
pub struct InMemoryContacts {
    emails: Vec<String>,
}

impl InMemoryContacts {
    pub fn new(emails: Vec<String>) -> Self {
        Self { emails }
    }
}

#[async_trait]
impl ContactService for InMemoryContacts {
    async fn load_emails(&self) -> anyhow::Result<Vec<String>> {
        tracing::debug!(count = self.emails.len(), "Loading contact emails");
        Ok(self.emails.clone())
    }
}
