use std::sync::Arc;

use super::Presentation;
use super::pptx::PptxBackend;

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend probe failed: {0}")]
    Probe(String),

    #[error("no presentation backend available (tried: {tried})")]
    Unavailable { tried: String },
}

/// A way of turning a `Presentation` into document bytes.
pub trait DeckBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Proves the backend can produce a readable package before real work starts.
    fn probe(&self) -> Result<(), DeckError>;

    fn render(&self, deck: &Presentation) -> Result<Vec<u8>, DeckError>;
}

/// The document-generation capability: a primary backend and an optional
/// fallback tried when the primary cannot be resolved.
#[derive(Clone)]
pub struct DeckEngine {
    pub primary: Arc<dyn DeckBackend>,
    pub fallback: Option<Arc<dyn DeckBackend>>,
}

impl Default for DeckEngine {
    fn default() -> Self {
        Self {
            primary: Arc::new(PptxBackend::deflated()),
            fallback: Some(Arc::new(PptxBackend::stored())),
        }
    }
}

impl DeckEngine {
    #[tracing::instrument(name = "deck.resolve", skip(self), fields(deck.backend))]
    pub fn resolve(&self) -> Result<Arc<dyn DeckBackend>, DeckError> {
        let span = tracing::Span::current();

        match self.primary.probe() {
            Ok(()) => {
                span.record("deck.backend", self.primary.name());
                return Ok(self.primary.clone());
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.primary.name(),
                    error = %e,
                    "Primary presentation backend unavailable"
                );
            }
        }

        let mut tried = vec![self.primary.name().to_string()];

        if let Some(fallback) = &self.fallback {
            tried.push(fallback.name().to_string());
            match fallback.probe() {
                Ok(()) => {
                    tracing::info!(
                        backend = fallback.name(),
                        "Falling back to secondary presentation backend"
                    );
                    span.record("deck.backend", fallback.name());
                    return Ok(fallback.clone());
                }
                Err(e) => {
                    tracing::error!(
                        backend = fallback.name(),
                        error = %e,
                        "Fallback presentation backend unavailable"
                    );
                }
            }
        }

        Err(DeckError::Unavailable {
            tried: tried.join(", "),
        })
    }
}
