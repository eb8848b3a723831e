//! Persistence of finished responses
//!
//! The gateway saves a response only when the caller sets `store: true`.
//! Stored input and output items let a later request continue the
//! conversation through `previous_response_id`.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::protocol::{InputItem, OutputItem, ResponseObject};

/// Storage for finished responses
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Save a finished response with the input that produced it
    async fn save(&self, response: &ResponseObject, input: &[InputItem]);

    async fn get(&self, id: &str) -> Option<ResponseObject>;

    async fn input_items(&self, id: &str) -> Option<Vec<InputItem>>;

    async fn output_items(&self, id: &str) -> Option<Vec<OutputItem>>;

    /// Returns whether a response was removed
    async fn delete(&self, id: &str) -> bool;
}

struct StoredResponse {
    response: ResponseObject,
    input: Vec<InputItem>,
}

/// Bounded in-process store, evicting the oldest response when full
pub struct InMemoryStore {
    entries: DashMap<String, StoredResponse>,
    order: Mutex<VecDeque<String>>,
    max_entries: usize,
}

impl InMemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ResponseStore for InMemoryStore {
    async fn save(&self, response: &ResponseObject, input: &[InputItem]) {
        let replaced = self
            .entries
            .insert(
                response.id.clone(),
                StoredResponse {
                    response: response.clone(),
                    input: input.to_vec(),
                },
            )
            .is_some();

        let mut order = self.order.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !replaced {
            order.push_back(response.id.clone());
        }

        while order.len() > self.max_entries {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!(response_id = %oldest, "evicted stored response");
            }
        }
    }

    async fn get(&self, id: &str) -> Option<ResponseObject> {
        self.entries.get(id).map(|entry| entry.response.clone())
    }

    async fn input_items(&self, id: &str) -> Option<Vec<InputItem>> {
        self.entries.get(id).map(|entry| entry.input.clone())
    }

    async fn output_items(&self, id: &str) -> Option<Vec<OutputItem>> {
        self.entries.get(id).map(|entry| entry.response.output.clone())
    }

    async fn delete(&self, id: &str) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.order
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .retain(|entry| entry != id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::{ResponseInput, ResponsesRequest};

    fn response(id: &str) -> ResponseObject {
        let request = ResponsesRequest {
            model: "gpt-4o".to_owned(),
            input: ResponseInput::Text("hi".to_owned()),
            ..Default::default()
        };
        let mut response = ResponseObject::in_progress(id, 1, &request);
        response.output.push(OutputItem::message("msg_1".to_owned(), "Hi there".to_owned()));
        response
    }

    fn input() -> Vec<InputItem> {
        vec![serde_json::from_value(json!({"role": "user", "content": "hi"})).unwrap()]
    }

    #[tokio::test]
    async fn save_then_read_back() {
        let store = InMemoryStore::new(10);
        store.save(&response("resp_1"), &input()).await;

        assert_eq!(store.get("resp_1").await.unwrap().id, "resp_1");
        assert_eq!(store.input_items("resp_1").await.unwrap(), input());
        assert_eq!(store.output_items("resp_1").await.unwrap().len(), 1);
        assert!(store.get("resp_2").await.is_none());
    }

    #[tokio::test]
    async fn delete_reports_removal() {
        let store = InMemoryStore::new(10);
        store.save(&response("resp_1"), &input()).await;

        assert!(store.delete("resp_1").await);
        assert!(!store.delete("resp_1").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn oldest_entries_are_evicted() {
        let store = InMemoryStore::new(2);
        for id in ["resp_1", "resp_2", "resp_3"] {
            store.save(&response(id), &input()).await;
        }

        assert_eq!(store.len(), 2);
        assert!(store.get("resp_1").await.is_none());
        assert!(store.get("resp_3").await.is_some());
    }

    #[tokio::test]
    async fn saving_again_replaces_without_growing() {
        let store = InMemoryStore::new(2);
        store.save(&response("resp_1"), &input()).await;
        store.save(&response("resp_1"), &[]).await;

        assert_eq!(store.len(), 1);
        assert!(store.input_items("resp_1").await.unwrap().is_empty());
    }
}
