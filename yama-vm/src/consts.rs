//! Default limits of the VM.

/// Default bound on the call stack, user frame included.
pub const MAX_CALL_FRAMES: usize = 32;

/// Default register budget of the user frame.
pub const USER_MAX_LOCALS: usize = 64;

/// Head name the built-in parcel is installed under, and the dep name
/// modules use to address the built-in primitives (`yama:Int` etc.).
pub const BUILTIN_HEAD: &str = "yama";
