//! Process-private, append-only function registry.
//!
//! The registry is never serialized or shipped across a transport. Instead
//! every process — the main process and every worker, whether a thread in
//! the same process or a re-exec'd subprocess — runs identical user
//! bootstrap code that calls [`Registry::register`]/[`Registry::use_module`]
//! in the same order, so the same name always lands at the same index with
//! the same signature. A call only ever ships the index plus the signature;
//! the callee re-validates the signature and rejects the call with
//! [`GoroutineError::RegistryMismatch`] on drift.

use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use xxhash_rust::xxh32::xxh32;

use crate::codec::Value;
use crate::error::GoroutineError;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
pub type Callable = std::sync::Arc<dyn Fn(Vec<Value>) -> BoxFuture<Result<Value, GoroutineError>> + Send + Sync>;

pub struct RegistryEntry {
    pub index: u32,
    pub name: String,
    pub signature: u32,
    pub callable: Callable,
}

/// A process-wide, append-only table of callable functions.
pub struct Registry {
    entries: RwLock<Vec<RegistryEntry>>,
    by_name: DashMap<String, u32>,
    /// Entries queued by [`Registry::use_module`], flushed after one
    /// `tokio::task::yield_now().await` — the closest analogue this crate
    /// has to "the next scheduler tick", since there is no `module.exports`
    /// walk to defer to in a compiled binary.
    pending: RwLock<Vec<(String, Callable)>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            by_name: DashMap::new(),
            pending: RwLock::new(Vec::new()),
        }
    }

    fn signature_of(name: &str) -> u32 {
        xxh32(name.as_bytes(), 0)
    }

    fn insert(&self, name: String, callable: Callable) -> u32 {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        let index = entries.len() as u32;
        let signature = Self::signature_of(&name);
        self.by_name.insert(name.clone(), index);
        entries.push(RegistryEntry {
            index,
            name,
            signature,
            callable,
        });
        index
    }

    /// Register a single callable synchronously, returning the index it was
    /// assigned. Main and every worker must call this in the same order for
    /// the same `name`s.
    pub fn register<F, Fut>(&self, name: impl Into<String>, f: F) -> u32
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, GoroutineError>> + Send + 'static,
    {
        let callable: Callable = std::sync::Arc::new(move |args| Box::pin(f(args)));
        self.insert(name.into(), callable)
    }

    /// Queue a batch of callables for deferred registration, analogous to
    /// requiring a module's exports before they become callable.
    pub fn use_module(&self, items: Vec<(String, Callable)>) {
        self.pending.write().expect("registry lock poisoned").extend(items);
    }

    /// Flush anything queued by [`Registry::use_module`]. Called once by
    /// `start()` after yielding to the scheduler.
    pub async fn flush_pending(&self) {
        tokio::task::yield_now().await;
        let pending = std::mem::take(&mut *self.pending.write().expect("registry lock poisoned"));
        for (name, callable) in pending {
            self.insert(name, callable);
        }
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).map(|v| *v)
    }

    pub fn signature_at(&self, index: u32) -> Option<u32> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .get(index as usize)
            .map(|e| e.signature)
    }

    pub fn name_at(&self, index: u32) -> Option<String> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .get(index as usize)
            .map(|e| e.name.clone())
    }

    /// Validate `sig` against the entry at `index` and run it if it matches.
    /// A missing entry or a signature mismatch are both reported as
    /// `RegistryMismatch`, with no further detail in the message — the two
    /// sides' registries have diverged and the exact cause isn't something
    /// the callee can diagnose from here.
    pub async fn call(&self, index: u32, sig: u32, args: Vec<Value>) -> Result<Value, GoroutineError> {
        let callable = {
            let entries = self.entries.read().expect("registry lock poisoned");
            let entry = entries
                .get(index as usize)
                .ok_or(GoroutineError::RegistryMismatch)?;
            if entry.signature != sig {
                return Err(GoroutineError::RegistryMismatch);
            }
            entry.callable.clone()
        };
        callable(args).await
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("registry lock poisoned").len()
    }
}

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// The process-wide registry instance.
pub fn global() -> &'static Registry {
    &REGISTRY
}
