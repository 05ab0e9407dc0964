//! Shared test support: an in-memory transport recording endpoint traffic,
//! a decoration sink capturing replacements, and payload fixtures.
#![allow(dead_code)] // not every test binary uses every helper

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{Value, json};

use fieldlens::Result;
use fieldlens::error::LensError;
use fieldlens::host::{Decoration, DecorationSink, Scope};
use fieldlens::http::Transport;

/// Transport double with canned per-endpoint responses and a call log.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets the envelope `data` returned for an endpoint.
    pub fn respond(&self, endpoint: &str, data: Value) {
        self.responses.lock().insert(endpoint.to_string(), data);
    }

    /// Makes an endpoint fail with an application error.
    pub fn fail(&self, endpoint: &str) {
        self.failures.lock().insert(endpoint.to_string());
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(called, _)| called == endpoint)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_payload(&self, endpoint: &str) -> Option<Value> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(called, _)| called == endpoint)
            .map(|(_, payload)| payload.clone())
    }
}

impl Transport for MockTransport {
    fn call<'a>(&'a self, endpoint: &'a str, payload: Value) -> BoxFuture<'a, Result<Value>> {
        self.calls.lock().push((endpoint.to_string(), payload));
        let result = if self.failures.lock().contains(endpoint) {
            Err(LensError::Api {
                endpoint: endpoint.to_string(),
                code: -1,
                message: "mock failure".to_string(),
            })
        } else {
            Ok(self
                .responses
                .lock()
                .get(endpoint)
                .cloned()
                .unwrap_or(Value::Null))
        };
        Box::pin(async move { result })
    }
}

/// Sink double recording every replacement per scope.
#[derive(Default)]
pub struct RecordingSink {
    replacements: Mutex<Vec<(Scope, Vec<Decoration>)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replacement_count(&self) -> usize {
        self.replacements.lock().len()
    }

    pub fn last_for(&self, scope: &Scope) -> Option<Vec<Decoration>> {
        self.replacements
            .lock()
            .iter()
            .rev()
            .find(|(seen, _)| seen == scope)
            .map(|(_, decorations)| decorations.clone())
    }
}

impl DecorationSink for RecordingSink {
    fn replace(&self, scope: &Scope, decorations: &[Decoration]) {
        self.replacements
            .lock()
            .push((scope.clone(), decorations.to_vec()));
    }
}

/// A `getAttributeViewKeys` payload with one text field.
pub fn text_field_payload(av_id: &str, key_name: &str, content: &str) -> Value {
    json!([{
        "avID": av_id,
        "avName": "Tasks",
        "blockIDs": [],
        "keyValues": [{
            "key": {"id": "key-text", "name": key_name, "type": "text", "icon": ""},
            "values": [{"keyID": "key-text", "text": {"content": content}}]
        }]
    }])
}

/// Field list fixture for `getAttributeViewKeysByAvID`.
pub fn field_list(names_and_types: &[(&str, &str)]) -> Value {
    let fields: Vec<Value> = names_and_types
        .iter()
        .enumerate()
        .map(|(index, (name, field_type))| {
            json!({
                "id": format!("key-{index}"),
                "name": name,
                "type": field_type,
                "icon": ""
            })
        })
        .collect();
    json!(fields)
}
