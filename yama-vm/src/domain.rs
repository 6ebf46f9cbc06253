//! The domain: process-wide parcel host, type loader and handle registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::consts::{BUILTIN_HEAD, MAX_CALL_FRAMES, USER_MAX_LOCALS};
use crate::debug::{post_with, DebugCat, DebugSink};
use crate::error::{InstallError, LoadError};
use crate::kind::PType;
use crate::module::{ModuleFactory, ModuleInfo};
use crate::parcel::{InstallBatch, Parcel, ParcelMetadata};
use crate::qname::split_qualified;
use crate::ty::Type;
use crate::type_info::TypeInfo;
use crate::verifier::Verifier;

/// Limits a domain imposes on the contexts bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainConfig {
    /// Bound on the call stack, user frame included.
    pub max_call_frames: usize,
    /// Register budget of the user frame.
    pub user_max_locals: usize,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            max_call_frames: MAX_CALL_FRAMES,
            user_max_locals: USER_MAX_LOCALS,
        }
    }
}

#[derive(Default)]
struct State {
    parcels: HashMap<String, Arc<dyn Parcel>>,
    deps: HashMap<(String, String), String>,
    modules: HashMap<String, Arc<ModuleInfo>>,
    types: HashMap<String, Type>,
    sealed: bool,
}

/// The process-wide type registry.
///
/// Parcels install in batches (atomically), types load lazily by qualified
/// name, and every loaded handle is canonical: loading the same name twice
/// yields the same handle. Once an execution context binds to the domain,
/// further installs are rejected.
pub struct Domain {
    config: DomainConfig,
    dbg: Option<Arc<dyn DebugSink>>,
    verifier: Verifier,
    state: Mutex<State>,
    builtins: Builtins,
}

struct Builtins {
    none: Type,
    int: Type,
    uint: Type,
    float: Type,
    bool_: Type,
    char_: Type,
    type_: Type,
}

impl Domain {
    /// Creates a domain with default limits.
    pub fn new(dbg: Option<Arc<dyn DebugSink>>) -> Self {
        Self::with_config(DomainConfig::default(), dbg)
    }

    /// Creates a domain with the given limits.
    pub fn with_config(config: DomainConfig, dbg: Option<Arc<dyn DebugSink>>) -> Self {
        let verifier = Verifier::new(dbg.clone());
        let mut state = State::default();
        state
            .parcels
            .insert(BUILTIN_HEAD.to_string(), Arc::new(BuiltinParcel::new()));
        let mut load_builtin = |name: &str| -> Type {
            let fullname = format!("{BUILTIN_HEAD}:{name}");
            let mut pending = HashMap::new();
            let loaded = load_uncached(&verifier, &dbg, &mut state, &mut pending, &fullname)
                .expect("the built-in parcel always verifies and links");
            state.types.extend(pending);
            loaded
        };
        let builtins = Builtins {
            none: load_builtin(PType::None.name()),
            int: load_builtin(PType::Int.name()),
            uint: load_builtin(PType::UInt.name()),
            float: load_builtin(PType::Float.name()),
            bool_: load_builtin(PType::Bool.name()),
            char_: load_builtin(PType::Char.name()),
            type_: load_builtin(PType::Type.name()),
        };
        Self {
            config,
            dbg,
            verifier,
            state: Mutex::new(state),
            builtins,
        }
    }

    /// The domain's limits.
    pub fn config(&self) -> DomainConfig {
        self.config
    }

    pub(crate) fn dbg(&self) -> &Option<Arc<dyn DebugSink>> {
        &self.dbg
    }

    /// The domain's verifier.
    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forbids further installs; called when a context binds to the domain.
    pub(crate) fn seal(&self) {
        self.state().sealed = true;
    }

    /// Applies an install batch in one transaction.
    ///
    /// Validation covers the whole batch before anything commits: head
    /// collisions, dep mappings whose installer is not in the batch or whose
    /// dep name is undeclared, missing mappings for declared deps, and
    /// unknown target heads all roll the batch back.
    pub fn install(&self, batch: InstallBatch) -> Result<(), InstallError> {
        let mut state = self.state();
        if state.sealed {
            return Err(InstallError::Sealed);
        }

        let mut new_heads: HashMap<&str, &Arc<dyn Parcel>> = HashMap::new();
        for (head, parcel) in &batch.installs {
            if state.parcels.contains_key(head) {
                return Err(InstallError::HeadAlreadyInstalled(head.clone()));
            }
            if new_heads.insert(head.as_str(), parcel).is_some() {
                return Err(InstallError::DuplicateHead(head.clone()));
            }
        }
        for (installer, dep, target) in &batch.dep_mappings {
            let parcel = new_heads
                .get(installer.as_str())
                .ok_or_else(|| InstallError::UnknownInstaller(installer.clone()))?;
            if !parcel.metadata().is_dep_name(dep) {
                return Err(InstallError::UndeclaredDep {
                    head: installer.clone(),
                    dep: dep.clone(),
                });
            }
            if !state.parcels.contains_key(target) && !new_heads.contains_key(target.as_str()) {
                return Err(InstallError::UnknownTargetHead(target.clone()));
            }
        }
        for (head, parcel) in &batch.installs {
            for dep in parcel.metadata().dep_names() {
                let mapped = batch
                    .dep_mappings
                    .iter()
                    .any(|(installer, name, _)| installer == head && name == dep);
                if !mapped {
                    return Err(InstallError::UnmappedDep {
                        head: head.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }

        for (head, parcel) in batch.installs {
            post_with(&self.dbg, DebugCat::GENERAL, || {
                format!("installing parcel under `{head}`")
            });
            state.parcels.insert(head, parcel);
        }
        for (installer, dep, target) in batch.dep_mappings {
            state.deps.insert((installer, dep), target);
        }
        Ok(())
    }

    /// Loads the type named `head:(Owner::)?Name`, verifying and linking it
    /// (and everything it references) on first use.
    pub fn load(&self, fullname: &str) -> Result<Type, LoadError> {
        let mut state = self.state();
        if let Some(loaded) = state.types.get(fullname) {
            return Ok(loaded.clone());
        }
        let mut pending = HashMap::new();
        match load_uncached(&self.verifier, &self.dbg, &mut state, &mut pending, fullname) {
            Ok(loaded) => {
                // The whole strongly-connected load commits together.
                state.types.extend(pending);
                Ok(loaded)
            }
            Err(err) => {
                post_with(&self.dbg, DebugCat::GENERAL, || {
                    format!("failed loading `{fullname}`: {err}")
                });
                Err(err)
            }
        }
    }

    /// The built-in `None` primitive.
    pub fn none_type(&self) -> Type {
        self.builtins.none.clone()
    }

    /// The built-in `Int` primitive.
    pub fn int_type(&self) -> Type {
        self.builtins.int.clone()
    }

    /// The built-in `UInt` primitive.
    pub fn uint_type(&self) -> Type {
        self.builtins.uint.clone()
    }

    /// The built-in `Float` primitive.
    pub fn float_type(&self) -> Type {
        self.builtins.float.clone()
    }

    /// The built-in `Bool` primitive.
    pub fn bool_type(&self) -> Type {
        self.builtins.bool_.clone()
    }

    /// The built-in `Char` primitive.
    pub fn char_type(&self) -> Type {
        self.builtins.char_.clone()
    }

    /// The built-in `Type` primitive.
    pub fn type_type(&self) -> Type {
        self.builtins.type_.clone()
    }
}

/// Loads `fullname` against `state`, accumulating new handles in `pending`.
///
/// Fresh handles go into `pending` *before* their constant slots resolve, so
/// reference cycles (mutually recursive functions, method and owner struct)
/// close against the pending handle. The caller commits or drops `pending`
/// wholesale.
fn load_uncached(
    verifier: &Verifier,
    dbg: &Option<Arc<dyn DebugSink>>,
    state: &mut State,
    pending: &mut HashMap<String, Type>,
    fullname: &str,
) -> Result<Type, LoadError> {
    if let Some(loaded) = state.types.get(fullname).or_else(|| pending.get(fullname)) {
        return Ok(loaded.clone());
    }

    let q = split_qualified(fullname).ok_or_else(|| LoadError::MalformedName(fullname.into()))?;
    let head = q.head;
    let parcel = state
        .parcels
        .get(head)
        .cloned()
        .ok_or_else(|| LoadError::HeadNotFound(head.into()))?;

    let module = match state.modules.get(head) {
        Some(module) => module.clone(),
        None => {
            let module = parcel
                .import("")
                .ok_or_else(|| LoadError::ModuleNotFound(head.into()))?;
            state.modules.insert(head.to_string(), module.clone());
            module
        }
    };

    let info = module
        .get(q.unqualified)
        .cloned()
        .ok_or_else(|| LoadError::NotFound(fullname.into()))?;

    if let Some(owner) = q.owner {
        if !module.contains(owner) {
            return Err(LoadError::OwnerNotFound(fullname.into()));
        }
        load_uncached(verifier, dbg, state, pending, &format!("{head}:{owner}"))?;
    }

    verifier.verify_type(&info, parcel.metadata(), head)?;

    post_with(dbg, DebugCat::GENERAL, || format!("loading `{fullname}`"));
    let loaded = Type::new(fullname, info.clone());
    pending.insert(fullname.to_string(), loaded.clone());

    let md = parcel.metadata();
    let mut slots = Vec::with_capacity(info.consts().len());
    for entry in info.consts().entries() {
        let Some(symbol) = entry.qualified_name() else {
            slots.push(None);
            continue;
        };
        // The verifier has already validated the symbol's shape and alias.
        let sq = split_qualified(symbol)
            .ok_or_else(|| LoadError::MalformedName(symbol.to_string()))?;
        let real_head = if sq.head == md.self_name() {
            head.to_string()
        } else {
            state
                .deps
                .get(&(head.to_string(), sq.head.to_string()))
                .cloned()
                .ok_or_else(|| LoadError::UnmappedAlias {
                    fullname: fullname.into(),
                    alias: sq.head.into(),
                })?
        };
        let target = format!("{real_head}:{}", sq.unqualified);
        let resolved = load_uncached(verifier, dbg, state, pending, &target)?;
        if Some(resolved.kind()) != entry.kind() {
            return Err(LoadError::ConstKindMismatch {
                fullname: fullname.into(),
                symbol: symbol.to_string(),
                actual: resolved.kind(),
            });
        }
        slots.push(Some(resolved));
    }
    loaded.freeze(slots);
    Ok(loaded)
}

/// The built-in parcel: the seven primitive types under the `yama` head.
struct BuiltinParcel {
    md: ParcelMetadata,
    module: Arc<ModuleInfo>,
}

impl BuiltinParcel {
    fn new() -> Self {
        let mut mf = ModuleFactory::new();
        for ptype in [
            PType::None,
            PType::Int,
            PType::UInt,
            PType::Float,
            PType::Bool,
            PType::Char,
            PType::Type,
        ] {
            mf.add(TypeInfo::primitive(
                ptype.name(),
                Default::default(),
                ptype,
            ));
        }
        Self {
            md: ParcelMetadata::new(BUILTIN_HEAD, Vec::<String>::new()),
            module: Arc::new(mf.done()),
        }
    }
}

impl Parcel for BuiltinParcel {
    fn metadata(&self) -> &ParcelMetadata {
        &self.md
    }

    fn import(&self, relative_path: &str) -> Option<Arc<ModuleInfo>> {
        (relative_path.is_empty()).then(|| self.module.clone())
    }
}
