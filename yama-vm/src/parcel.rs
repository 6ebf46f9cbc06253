//! Parcels: named units of distribution, and the batches that install them.

use std::sync::Arc;

use crate::module::ModuleInfo;

/// A parcel's identity: the alias it uses for itself in qualified names
/// inside its own modules, plus the dep names it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelMetadata {
    self_name: String,
    dep_names: Vec<String>,
}

impl ParcelMetadata {
    /// Creates metadata from a self-name and declared dep names.
    pub fn new(
        self_name: impl Into<String>,
        dep_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            self_name: self_name.into(),
            dep_names: dep_names.into_iter().map(Into::into).collect(),
        }
    }

    /// The parcel's alias for itself.
    pub fn self_name(&self) -> &str {
        &self.self_name
    }

    /// The declared dep names.
    pub fn dep_names(&self) -> &[String] {
        &self.dep_names
    }

    /// Whether `name` is a declared dep name.
    pub fn is_dep_name(&self, name: &str) -> bool {
        self.dep_names.iter().any(|dep| dep == name)
    }

    /// Whether `name` is the self alias or a declared dep name, the only
    /// heads a qualified name inside this parcel's modules may use.
    pub fn is_self_or_dep_name(&self, name: &str) -> bool {
        name == self.self_name || self.is_dep_name(name)
    }
}

/// A named unit of shippable modules.
///
/// The domain resolves a parcel's root module once, through [`import`], and
/// memoises the result; a parcel is therefore free to build its module
/// lazily, but the module is frozen from the first resolution on.
///
/// [`import`]: Parcel::import
pub trait Parcel: Send + Sync {
    /// The parcel's identity.
    fn metadata(&self) -> &ParcelMetadata;

    /// Resolves a relative import path to a module. The root module lives at
    /// the empty path.
    fn import(&self, relative_path: &str) -> Option<Arc<ModuleInfo>>;
}

/// A set of parcel installs plus dep mappings, applied to a domain in one
/// transaction: everything installs together, or the domain is unchanged.
#[derive(Default, Clone)]
pub struct InstallBatch {
    pub(crate) installs: Vec<(String, Arc<dyn Parcel>)>,
    pub(crate) dep_mappings: Vec<(String, String, String)>,
}

impl InstallBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `parcel` under `head`.
    pub fn install(&mut self, head: impl Into<String>, parcel: Arc<dyn Parcel>) -> &mut Self {
        self.installs.push((head.into(), parcel));
        self
    }

    /// Maps dep name `dep` of the parcel installed under `installer_head` to
    /// the parcel installed under `target_head`.
    pub fn map_dep(
        &mut self,
        installer_head: impl Into<String>,
        dep: impl Into<String>,
        target_head: impl Into<String>,
    ) -> &mut Self {
        self.dep_mappings
            .push((installer_head.into(), dep.into(), target_head.into()));
        self
    }

    /// Whether the batch holds no installs.
    pub fn is_empty(&self) -> bool {
        self.installs.is_empty() && self.dep_mappings.is_empty()
    }
}

impl core::fmt::Debug for InstallBatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InstallBatch")
            .field(
                "installs",
                &self.installs.iter().map(|(head, _)| head).collect::<Vec<_>>(),
            )
            .field("dep_mappings", &self.dep_mappings)
            .finish()
    }
}
