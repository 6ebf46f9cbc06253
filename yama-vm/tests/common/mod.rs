//! Shared fixtures: a testing parcel installed under `abc` with the
//! built-in parcel mapped as its `yama` dep.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use yama_vm::{
    Context, DebugSink, Domain, InstallBatch, ModuleFactory, ModuleInfo, Parcel, ParcelMetadata,
    SignalCounter, TypeInfo,
};

/// A parcel whose module is assembled by the test and frozen at first
/// import.
pub struct TestParcel {
    md: ParcelMetadata,
    factory: Mutex<Option<ModuleFactory>>,
}

impl TestParcel {
    pub fn new() -> Self {
        Self::with_deps("self", ["yama"])
    }

    pub fn with_deps(
        self_name: &str,
        dep_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            md: ParcelMetadata::new(self_name, dep_names),
            factory: Mutex::new(Some(ModuleFactory::new())),
        }
    }

    /// Appends a descriptor. The first load freezes the module, so uploads
    /// must happen before it.
    pub fn upload(&self, info: TypeInfo) {
        if let Some(factory) = self.factory.lock().unwrap().as_mut() {
            factory.add(info);
        }
    }
}

impl Parcel for TestParcel {
    fn metadata(&self) -> &ParcelMetadata {
        &self.md
    }

    fn import(&self, relative_path: &str) -> Option<Arc<ModuleInfo>> {
        if !relative_path.is_empty() {
            return None;
        }
        let factory = self.factory.lock().unwrap().take()?;
        Some(Arc::new(factory.done()))
    }
}

pub struct Fixture {
    pub dbg: Arc<SignalCounter>,
    pub dm: Arc<Domain>,
    pub parcel: Arc<TestParcel>,
}

impl Fixture {
    pub fn new() -> Self {
        let dbg = Arc::new(SignalCounter::new(None));
        let dm = Arc::new(Domain::new(Some(dbg.clone() as Arc<dyn DebugSink>)));
        let parcel = Arc::new(TestParcel::new());
        let mut batch = InstallBatch::new();
        batch
            .install("abc", parcel.clone() as Arc<dyn Parcel>)
            .map_dep("abc", "yama", "yama");
        dm.install(batch).expect("installing the test parcel");
        Self { dbg, dm, parcel }
    }

    pub fn ctx(&self) -> Context {
        Context::new(self.dm.clone(), Some(self.dbg.clone() as Arc<dyn DebugSink>))
    }
}
