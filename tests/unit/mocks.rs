//! Mock port implementations with call counters, so manager tests can make
//! call-count and ordering assertions without re-defining boilerplate.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use depshift::application::ports::{InventoryDirectory, MdmDirectory};
use depshift::domain::{BackendError, DepStatus, MdmStatus, MigrationTags, UnmanageOutcome};

pub fn unexpected<T>() -> Result<T, BackendError> {
    Err(BackendError::transport(
        "TEST",
        "test://unexpected",
        "not expected in this test",
    ))
}

pub fn migration_tags() -> MigrationTags {
    MigrationTags {
        ready: "ready".to_string(),
        started: "started".to_string(),
        unenrolled: "unenrolled".to_string(),
        finished: "finished".to_string(),
    }
}

// ── Call log ──────────────────────────────────────────────────────────────────

/// Shared between both stubs so cross-client ordering can be asserted.
#[derive(Default)]
pub struct Calls {
    pub find_device_id: AtomicUsize,
    pub unmanage: AtomicUsize,
    pub enrollment_status: AtomicUsize,
    pub dep_status: AtomicUsize,
    pub tags: AtomicUsize,
    pub set_tags: AtomicUsize,
    /// Every call in invocation order.
    pub sequence: Mutex<Vec<&'static str>>,
    /// Arguments of each `set_tags` call: `(taxonomy, names)`.
    pub tag_writes: Mutex<Vec<(String, Vec<String>)>>,
}

impl Calls {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, counter: &AtomicUsize, name: &'static str) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.sequence.lock().unwrap().push(name);
    }

    pub fn count(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.count(&self.unmanage) + self.count(&self.set_tags)
    }

    pub fn sequence(&self) -> Vec<&'static str> {
        self.sequence.lock().unwrap().clone()
    }
}

// ── Legacy MDM stub ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MdmStub {
    pub calls: Arc<Calls>,
    /// `None` makes `unmanage` fail with a transport error.
    pub unmanage_outcome: Option<UnmanageOutcome>,
    pub enrollment: MdmStatus,
}

impl MdmStub {
    pub fn new(calls: Arc<Calls>) -> Self {
        Self {
            calls,
            unmanage_outcome: Some(UnmanageOutcome::Queued),
            enrollment: MdmStatus::Enrolled,
        }
    }
}

impl MdmDirectory for MdmStub {
    async fn find_device_id(&self, _serial: &str) -> Result<Option<u64>, BackendError> {
        self.calls
            .record(&self.calls.find_device_id, "find_device_id");
        Ok(Some(42))
    }

    async fn unmanage(&self, _serial: &str) -> Result<UnmanageOutcome, BackendError> {
        self.calls.record(&self.calls.unmanage, "unmanage");
        match self.unmanage_outcome {
            Some(outcome) => Ok(outcome),
            None => unexpected(),
        }
    }

    async fn enrollment_status(&self, _serial: &str) -> Result<MdmStatus, BackendError> {
        self.calls
            .record(&self.calls.enrollment_status, "enrollment_status");
        Ok(self.enrollment)
    }
}

// ── Inventory stub ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct InventoryStub {
    pub calls: Arc<Calls>,
    pub dep: DepStatus,
    /// `None` = device unknown to inventory (404).
    pub state: Arc<Mutex<Option<BTreeSet<String>>>>,
    pub fail_set_tags: bool,
}

impl InventoryStub {
    pub fn with_tags(calls: Arc<Calls>, dep: DepStatus, tags: &[&str]) -> Self {
        let tags = tags.iter().map(|t| (*t).to_string()).collect();
        Self {
            calls,
            dep,
            state: Arc::new(Mutex::new(Some(tags))),
            fail_set_tags: false,
        }
    }

    pub fn unknown(calls: Arc<Calls>, dep: DepStatus) -> Self {
        Self {
            calls,
            dep,
            state: Arc::new(Mutex::new(None)),
            fail_set_tags: false,
        }
    }

    pub fn current_tags(&self) -> Option<BTreeSet<String>> {
        self.state.lock().unwrap().clone()
    }
}

impl InventoryDirectory for InventoryStub {
    async fn dep_status(&self, _serial: &str) -> Result<DepStatus, BackendError> {
        self.calls.record(&self.calls.dep_status, "dep_status");
        Ok(self.dep)
    }

    async fn tags(&self, _serial: &str) -> Result<Option<BTreeSet<String>>, BackendError> {
        self.calls.record(&self.calls.tags, "tags");
        Ok(self.current_tags())
    }

    async fn set_tags(
        &self,
        _serial: &str,
        taxonomy: &str,
        names: &[String],
    ) -> Result<(), BackendError> {
        self.calls.record(&self.calls.set_tags, "set_tags");
        self.calls
            .tag_writes
            .lock()
            .unwrap()
            .push((taxonomy.to_string(), names.to_vec()));
        if self.fail_set_tags {
            return unexpected();
        }
        // SET semantics: our tests only ever carry migration tags in the
        // taxonomy, so a replace of the whole set models the backend.
        *self.state.lock().unwrap() = Some(names.iter().cloned().collect());
        Ok(())
    }
}
