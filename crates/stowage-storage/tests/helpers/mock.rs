use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use stowage_storage::traits::{once_stream, read_all};
use stowage_storage::{
    BackendAdapter, BackendError, BackendObject, BackendResult, ByteReader, StorageBackend,
};

/// Adapter operation, used for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Put,
    Get,
    Delete,
    ContainerExists,
    CreateContainer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: MockOp,
    pub container: String,
    pub key: Option<String>,
}

#[derive(Default)]
struct State {
    containers: HashSet<String>,
    objects: HashMap<(String, String), (Bytes, String)>,
    calls: Vec<Call>,
    failures: HashSet<MockOp>,
}

/// In-memory backend that records every call.
///
/// With `keep_content_type` off it behaves like a backend without metadata
/// retrieval, so downloads go through the sniffer.
pub struct MockBackend {
    state: Mutex<State>,
    keep_content_type: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        MockBackend {
            state: Mutex::new(State::default()),
            keep_content_type: true,
        }
    }

    pub fn without_content_types() -> Self {
        MockBackend {
            keep_content_type: false,
            ..Self::new()
        }
    }

    /// Make every following call of `op` fail with a request error.
    pub fn fail_on(&self, op: MockOp) {
        self.state.lock().unwrap().failures.insert(op);
    }

    pub fn add_container(&self, container: &str) {
        self.state
            .lock()
            .unwrap()
            .containers
            .insert(container.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_of(&self, op: MockOp) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state.lock().unwrap().containers.contains(container)
    }

    pub fn object(&self, container: &str, key: &str) -> Option<(Bytes, String)> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    fn record(&self, op: MockOp, container: &str, key: Option<&str>) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            op,
            container: container.to_string(),
            key: key.map(String::from),
        });
        if state.failures.contains(&op) {
            return Err(BackendError::request(
                format!("injected {:?} failure", op),
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendAdapter for MockBackend {
    async fn put(
        &self,
        container: &str,
        key: &str,
        data: ByteReader,
        content_type: &str,
    ) -> BackendResult<u64> {
        self.record(MockOp::Put, container, Some(key))?;
        let body = read_all(data).await?;
        let size = body.len() as u64;

        let mut state = self.state.lock().unwrap();
        if !state.containers.contains(container) {
            return Err(BackendError::not_found(container, key));
        }
        state.objects.insert(
            (container.to_string(), key.to_string()),
            (body, content_type.to_string()),
        );
        Ok(size)
    }

    async fn get(&self, container: &str, key: &str) -> BackendResult<BackendObject> {
        self.record(MockOp::Get, container, Some(key))?;
        let state = self.state.lock().unwrap();
        let (body, content_type) = state
            .objects
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BackendError::not_found(container, key))?;

        Ok(BackendObject {
            body: once_stream(body),
            content_type: self.keep_content_type.then_some(content_type),
        })
    }

    async fn delete(&self, container: &str, key: &str) -> BackendResult<()> {
        self.record(MockOp::Delete, container, Some(key))?;
        self.state
            .lock()
            .unwrap()
            .objects
            .remove(&(container.to_string(), key.to_string()));
        Ok(())
    }

    async fn container_exists(&self, container: &str) -> BackendResult<bool> {
        self.record(MockOp::ContainerExists, container, None)?;
        Ok(self.has_container(container))
    }

    async fn create_container(&self, container: &str) -> BackendResult<()> {
        self.record(MockOp::CreateContainer, container, None)?;
        self.add_container(container);
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
