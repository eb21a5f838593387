use moodboard_contracts::{BaseImage, DomainError, GeneratedItem, ImageValueError};
use thiserror::Error;
use tracing::debug;

use crate::adapters::ImageAdapter;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("no moodboard item with id '{0}'")]
    UnknownItem(String),
    #[error("item cannot be used as a reference image")]
    InvalidItem(#[source] ImageValueError),
    #[error(transparent)]
    Generation(#[from] DomainError),
}

/// In-memory moodboard: one adapter for text-only creation, one for edits,
/// and the produced items, newest first.
pub struct Moodboard {
    creator: Box<dyn ImageAdapter>,
    editor: Box<dyn ImageAdapter>,
    items: Vec<GeneratedItem>,
}

impl Moodboard {
    pub fn new(creator: Box<dyn ImageAdapter>, editor: Box<dyn ImageAdapter>) -> Self {
        Self {
            creator,
            editor,
            items: Vec::new(),
        }
    }

    /// Generates one item and puts it at the front. On failure the board is
    /// left as it was.
    pub fn add(
        &mut self,
        prompt: &str,
        base_image: Option<&BaseImage>,
    ) -> Result<&GeneratedItem, SessionError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        let adapter = match base_image {
            Some(_) => &self.editor,
            None => &self.creator,
        };
        debug!(backend = adapter.backend().name(), "dispatching moodboard prompt");
        let item = adapter.generate(prompt, base_image)?;
        self.items.insert(0, item);
        Ok(&self.items[0])
    }

    /// Edits an existing item into a new one; the source item stays.
    pub fn vary(&mut self, id: &str, prompt: &str) -> Result<&GeneratedItem, SessionError> {
        let base = self
            .get(id)
            .ok_or_else(|| SessionError::UnknownItem(id.to_string()))?
            .to_base_image()
            .map_err(SessionError::InvalidItem)?;
        self.add(prompt, Some(&base))
    }

    pub fn remove(&mut self, id: &str) -> Option<GeneratedItem> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn items(&self) -> &[GeneratedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use moodboard_contracts::{
        Backend, BaseImage, CallContext, DomainError, GeneratedItem, GenerationMode,
    };

    use super::{Moodboard, SessionError};
    use crate::adapters::ImageAdapter;

    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    type Calls = Arc<Mutex<Vec<(String, Option<String>)>>>;

    struct Recording {
        backend: Backend,
        calls: Calls,
        fail: bool,
    }

    impl ImageAdapter for Recording {
        fn backend(&self) -> Backend {
            self.backend
        }

        fn generate(
            &self,
            prompt: &str,
            base_image: Option<&BaseImage>,
        ) -> Result<GeneratedItem, DomainError> {
            self.calls.lock().unwrap().push((
                prompt.to_string(),
                base_image.map(|base| base.mime_type().to_string()),
            ));
            if self.fail {
                let ctx = CallContext::new(self.backend, GenerationMode::for_base_image(base_image));
                return Err(DomainError::rate_limited(ctx));
            }
            Ok(GeneratedItem::new(prompt, PIXEL, "image/png"))
        }
    }

    fn board(fail_creator: bool) -> (Moodboard, Calls, Calls) {
        let creator_calls = Calls::default();
        let editor_calls = Calls::default();
        let board = Moodboard::new(
            Box::new(Recording {
                backend: Backend::MiniMax,
                calls: creator_calls.clone(),
                fail: fail_creator,
            }),
            Box::new(Recording {
                backend: Backend::OpenRouter,
                calls: editor_calls.clone(),
                fail: false,
            }),
        );
        (board, creator_calls, editor_calls)
    }

    #[test]
    fn add_routes_by_base_image_and_prepends() {
        let (mut board, creator_calls, editor_calls) = board(false);
        let first = board.add("stone facade", None).unwrap().id().to_string();
        let base = BaseImage::new(PIXEL, "image/jpeg").unwrap();
        let second = board.add(" add ivy ", Some(&base)).unwrap().id().to_string();

        assert_eq!(board.len(), 2);
        assert_eq!(board.items()[0].id(), second);
        assert_eq!(board.items()[1].id(), first);
        assert_eq!(
            *creator_calls.lock().unwrap(),
            vec![("stone facade".to_string(), None)]
        );
        assert_eq!(
            *editor_calls.lock().unwrap(),
            vec![("add ivy".to_string(), Some("image/jpeg".to_string()))]
        );
    }

    #[test]
    fn empty_prompt_is_rejected_without_calling_adapters() {
        let (mut board, creator_calls, _) = board(false);
        assert!(matches!(board.add("   ", None), Err(SessionError::EmptyPrompt)));
        assert!(creator_calls.lock().unwrap().is_empty());
        assert!(board.is_empty());
    }

    #[test]
    fn failed_generation_leaves_items_untouched() {
        let (mut board, _, _) = board(true);
        let base = BaseImage::new(PIXEL, "image/png").unwrap();
        board.add("kept", Some(&base)).unwrap();
        let err = board.add("lost", None).unwrap_err();
        match err {
            SessionError::Generation(domain) => {
                assert_eq!(
                    domain.message(),
                    "Você excedeu o limite de solicitações da API MiniMax. Por favor, espere um momento antes de tentar novamente."
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(board.len(), 1);
        assert_eq!(board.items()[0].prompt(), "kept");
    }

    #[test]
    fn vary_uses_item_as_reference_for_editor() {
        let (mut board, _, editor_calls) = board(false);
        let source = board.add("atrium", None).unwrap().id().to_string();
        let variation = board.vary(&source, "warmer light").unwrap().id().to_string();
        assert_ne!(variation, source);
        assert_eq!(board.len(), 2);
        assert_eq!(
            *editor_calls.lock().unwrap(),
            vec![("warmer light".to_string(), Some("image/png".to_string()))]
        );
        assert!(matches!(
            board.vary("missing", "x"),
            Err(SessionError::UnknownItem(id)) if id == "missing"
        ));
    }

    #[test]
    fn remove_get_and_reset() {
        let (mut board, _, _) = board(false);
        let a = board.add("a", None).unwrap().id().to_string();
        let b = board.add("b", None).unwrap().id().to_string();
        assert_eq!(board.get(&a).unwrap().prompt(), "a");
        assert_eq!(board.remove(&a).unwrap().prompt(), "a");
        assert!(board.remove(&a).is_none());
        assert_eq!(board.items()[0].id(), b);
        board.reset();
        assert!(board.is_empty());
    }
}
