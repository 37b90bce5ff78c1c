//! Reentrant load/persist lifecycle for model state
//!
//! State is loaded when the first scope opens and written back when the
//! last one closes. Nested scopes in between do no I/O.

use crate::config::ensure_location;
use crate::model::Model;
use crate::storage::StateStore;
use modelkit_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use tracing::{debug, error, trace};

/// Counts of the I/O a lifecycle has performed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    /// Loads from storage (first acquisitions)
    pub loads: u64,

    /// Writes to storage (last releases)
    pub persists: u64,
}

/// Owns a model's in-memory state and its open-scope counter
#[derive(Debug)]
pub struct Lifecycle<S> {
    model: String,
    location: Option<PathBuf>,
    store: StateStore,
    state: S,
    depth: usize,
    stats: LifecycleStats,
}

impl<S> Lifecycle<S>
where
    S: Serialize + DeserializeOwned + Default,
{
    /// Create an unloaded lifecycle persisting to `store`
    ///
    /// `location` is created on first acquisition when set.
    pub fn new(model: impl Into<String>, location: Option<PathBuf>, store: StateStore) -> Self {
        Self {
            model: model.into(),
            location,
            store,
            state: S::default(),
            depth: 0,
            stats: LifecycleStats::default(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_loaded(&self) -> bool {
        self.depth > 0
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn stats(&self) -> LifecycleStats {
        self.stats
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Open a scope
    pub fn acquire(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > 1 {
            trace!(model = %self.model, depth = self.depth, "Reentered model scope");
            return Ok(());
        }

        if let Err(e) = self.load() {
            self.depth -= 1;
            return Err(e);
        }
        Ok(())
    }

    /// Close a scope
    pub fn release(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::internal(format!(
                "{} released more scopes than it acquired",
                self.model
            )));
        }

        self.depth -= 1;
        if self.depth > 0 {
            trace!(model = %self.model, depth = self.depth, "Left nested model scope");
            return Ok(());
        }

        self.persist()
    }

    fn load(&mut self) -> Result<()> {
        if let Some(location) = &self.location {
            ensure_location(location)?;
        }

        match self.store.read()? {
            Some(state) => {
                self.state = state;
                debug!("Loaded model from {}", self.store.path().display());
            }
            None => {
                self.state = S::default();
                debug!("No saved model in {}", self.store.path().display());
            }
        }

        self.stats.loads += 1;
        metrics::counter!("modelkit_state_loads_total", "model" => self.model.clone()).increment(1);
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        self.store.write(&self.state)?;

        self.stats.persists += 1;
        metrics::counter!("modelkit_state_persists_total", "model" => self.model.clone())
            .increment(1);
        debug!("Saved model to {}", self.store.path().display());
        Ok(())
    }
}

/// Open scope on a model
///
/// Entering acquires; dropping releases, on every exit path. Use
/// [`Scope::close`] to observe the persist result instead of having a
/// failure logged by `Drop`.
pub struct Scope<'a, M: Model + ?Sized> {
    model: &'a mut M,
    open: bool,
}

impl<'a, M: Model + ?Sized> Scope<'a, M> {
    /// Acquire `model` for the lifetime of the returned guard
    pub fn enter(model: &'a mut M) -> Result<Self> {
        model.acquire()?;
        Ok(Self { model, open: true })
    }

    /// Open another scope on the same model through this one
    pub fn nested(&mut self) -> Result<Scope<'_, M>> {
        Scope::enter(&mut *self.model)
    }

    /// Release now and report whether persisting succeeded
    pub fn close(mut self) -> Result<()> {
        self.open = false;
        self.model.release()
    }
}

impl<M: Model + ?Sized> Deref for Scope<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        &*self.model
    }
}

impl<M: Model + ?Sized> DerefMut for Scope<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut *self.model
    }
}

impl<M: Model + ?Sized> Drop for Scope<'_, M> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        if let Err(e) = self.model.release() {
            error!(model = %self.model.name(), error = %e, "Failed to release model scope");
        }
    }
}

/// Convenience for opening scopes with method syntax
pub trait ModelExt: Model {
    /// Equivalent to [`Scope::enter`]
    fn scope(&mut self) -> Result<Scope<'_, Self>> {
        Scope::enter(self)
    }
}

impl<M: Model + ?Sized> ModelExt for M {}
