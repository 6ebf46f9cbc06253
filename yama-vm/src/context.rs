//! The execution context: call stack, register stack, low-level command API
//! and bytecode dispatch.

use std::sync::Arc;

use yama_asm::{Code, ConstId, Instr, RegId};
use yama_types::{Bool, Char, Float, Int, UInt};

use crate::const_table::ConstTable;
use crate::debug::{post_with, DebugCat, DebugSink};
use crate::domain::Domain;
use crate::error::{CmdResult, Panicked};
use crate::kind::{Kind, PType};
use crate::ty::Type;
use crate::type_info::CallBody;
use crate::value::Value;

/// One activation record.
///
/// The argument region is a shared view of the caller's top registers (the
/// caller pops it when the frame exits); the local region sits above it on
/// the same value stack.
#[derive(Debug)]
struct Frame {
    /// The callable being run; `None` marks the user frame.
    callee: Option<Type>,
    /// Start of the `[callable, args..]` region on the value stack.
    args_start: usize,
    /// Size of the argument region, callable included.
    args: usize,
    /// Start of the local register region on the value stack.
    locals_start: usize,
    /// Register budget of this frame.
    max_locals: usize,
    /// Program counter, for bytecode callees.
    pc: usize,
    /// The value `ret` captured, if any.
    ret_val: Option<Value>,
    /// Whether `ret` has been called in this activation.
    returned: bool,
}

/// A single-threaded execution context bound to a [`Domain`].
///
/// The bottom of the call stack is the *user frame*: it has no callable, no
/// arguments and no constant table, and hosts the low-level command API for
/// host code. Pushing a callable and its arguments and invoking [`call`]
/// enters the VM proper; panics unwind every non-user frame and surface
/// here.
///
/// [`call`]: Context::call
pub struct Context {
    dm: Arc<Domain>,
    dbg: Option<Arc<dyn DebugSink>>,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    panics: u64,
    panicking: bool,
}

impl Context {
    /// Creates a context bound to `dm`, sealing the domain against further
    /// installs.
    pub fn new(dm: Arc<Domain>, dbg: Option<Arc<dyn DebugSink>>) -> Self {
        dm.seal();
        let user_max_locals = dm.config().user_max_locals;
        Self {
            dm,
            dbg,
            stack: Vec::new(),
            frames: vec![Frame {
                callee: None,
                args_start: 0,
                args: 0,
                locals_start: 0,
                max_locals: user_max_locals,
                pc: 0,
                ret_val: None,
                returned: false,
            }],
            panics: 0,
            panicking: false,
        }
    }

    /// The bound domain.
    pub fn dm(&self) -> &Arc<Domain> {
        &self.dm
    }

    /// Loads a type through the bound domain.
    pub fn load(&self, fullname: &str) -> Result<Type, crate::error::LoadError> {
        self.dm.load(fullname)
    }

    fn top(&self) -> &Frame {
        // A context always holds at least the user frame.
        self.frames.last().expect("the user frame never pops")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("the user frame never pops")
    }

    /// Whether the current frame is the user frame.
    pub fn is_user(&self) -> bool {
        self.top().callee.is_none()
    }

    /// Current call-stack depth, user frame included.
    pub fn call_frames(&self) -> usize {
        self.frames.len()
    }

    /// The domain-configured call-stack bound.
    pub fn max_call_frames(&self) -> usize {
        self.dm.config().max_call_frames
    }

    /// Number of live registers in the current frame.
    pub fn locals(&self) -> usize {
        self.stack.len() - self.top().locals_start
    }

    /// Register budget of the current frame.
    pub fn max_locals(&self) -> usize {
        self.top().max_locals
    }

    /// Number of arguments of the current call, the callable included.
    pub fn args(&self) -> usize {
        self.top().args
    }

    /// The value of argument `index`; argument 0 is the callable itself.
    pub fn arg(&self, index: usize) -> Option<Value> {
        let frame = self.top();
        (index < frame.args)
            .then(|| self.stack.get(frame.args_start + index).cloned())
            .flatten()
    }

    /// The value of register `index` in the current frame.
    pub fn local(&self, index: usize) -> Option<Value> {
        (index < self.locals())
            .then(|| self.stack.get(self.top().locals_start + index).cloned())
            .flatten()
    }

    /// The linked constant table of the current callee; the user frame has
    /// none.
    pub fn consts(&self) -> Option<ConstTable<'_>> {
        self.top().callee.as_ref().map(Type::consts)
    }

    /// Panics raised on this context so far.
    pub fn panics(&self) -> u64 {
        self.panics
    }

    /// Whether a panic is unwinding right now.
    pub fn panicking(&self) -> bool {
        self.panicking
    }

    /// The built-in `None` primitive.
    pub fn none_type(&self) -> Type {
        self.dm.none_type()
    }

    /// The built-in `Int` primitive.
    pub fn int_type(&self) -> Type {
        self.dm.int_type()
    }

    /// The built-in `UInt` primitive.
    pub fn uint_type(&self) -> Type {
        self.dm.uint_type()
    }

    /// The built-in `Float` primitive.
    pub fn float_type(&self) -> Type {
        self.dm.float_type()
    }

    /// The built-in `Bool` primitive.
    pub fn bool_type(&self) -> Type {
        self.dm.bool_type()
    }

    /// The built-in `Char` primitive.
    pub fn char_type(&self) -> Type {
        self.dm.char_type()
    }

    /// The built-in `Type` primitive.
    pub fn type_type(&self) -> Type {
        self.dm.type_type()
    }

    /// A fresh none value.
    pub fn new_none(&self) -> Value {
        Value::None
    }

    /// A fresh [`Int`] value.
    pub fn new_int(&self, v: Int) -> Value {
        Value::Int(v)
    }

    /// A fresh [`UInt`] value.
    pub fn new_uint(&self, v: UInt) -> Value {
        Value::UInt(v)
    }

    /// A fresh [`Float`] value.
    pub fn new_float(&self, v: Float) -> Value {
        Value::Float(v)
    }

    /// A fresh [`Bool`] value.
    pub fn new_bool(&self, v: Bool) -> Value {
        Value::Bool(v)
    }

    /// A fresh [`Char`] value. Any 32-bit pattern is accepted here,
    /// surrogates and beyond-codespace values included.
    pub fn new_char(&self, v: Char) -> Value {
        Value::Char(v)
    }

    /// A fresh type value referring to `t`.
    pub fn new_type(&self, t: Type) -> Value {
        Value::Type(t)
    }

    /// The stateless handle of the callable type `t`, or `None` if `t`
    /// cannot be called.
    pub fn new_fn(&self, t: Type) -> Option<Value> {
        t.is_callable().then(|| Value::Fn(t))
    }

    // --- panic machinery ---

    /// Raises a panic: bumps the counter once and flags the unwind. A panic
    /// raised directly in the user frame completes on the spot, consuming
    /// the user frame's registers.
    fn raise(&mut self, what: &str) -> Panicked {
        if !self.panicking {
            self.panics += 1;
            self.panicking = true;
            post_with(&self.dbg, DebugCat::CTX_LLCMD, || format!("panic: {what}"));
            tracing::trace!(what, "vm panic");
            if self.frames.len() == 1 {
                self.finish_user_panic();
            }
        }
        Panicked
    }

    fn finish_user_panic(&mut self) {
        let start = self.top().locals_start;
        self.stack.truncate(start);
        self.panicking = false;
    }

    /// Raises a panic in the current frame and starts unwinding toward the
    /// user frame. A second call within the same invocation is absorbed.
    pub fn panic(&mut self) {
        let _ = self.raise("explicit panic");
    }

    fn guard(&self) -> CmdResult {
        if self.panicking {
            Err(Panicked)
        } else {
            Ok(())
        }
    }

    // --- pushes ---

    fn push_value(&mut self, v: Value) -> CmdResult {
        self.guard()?;
        if self.locals() >= self.max_locals() {
            return Err(self.raise("push would overflow max locals"));
        }
        post_with(&self.dbg, DebugCat::CTX_LLCMD, || format!("push {v}"));
        self.stack.push(v);
        Ok(())
    }

    /// Pushes a none value.
    pub fn push_none(&mut self) -> CmdResult {
        self.push_value(Value::None)
    }

    /// Pushes an [`Int`] value.
    pub fn push_int(&mut self, v: Int) -> CmdResult {
        self.push_value(Value::Int(v))
    }

    /// Pushes a [`UInt`] value.
    pub fn push_uint(&mut self, v: UInt) -> CmdResult {
        self.push_value(Value::UInt(v))
    }

    /// Pushes a [`Float`] value.
    pub fn push_float(&mut self, v: Float) -> CmdResult {
        self.push_value(Value::Float(v))
    }

    /// Pushes a [`Bool`] value.
    pub fn push_bool(&mut self, v: Bool) -> CmdResult {
        self.push_value(Value::Bool(v))
    }

    /// Pushes a [`Char`] value.
    pub fn push_char(&mut self, v: Char) -> CmdResult {
        self.push_value(Value::Char(v))
    }

    /// Pushes a type value referring to `t`.
    pub fn push_type(&mut self, t: Type) -> CmdResult {
        self.push_value(Value::Type(t))
    }

    /// Pushes the stateless handle of the callable type `t`; panics if `t`
    /// cannot be called.
    pub fn push_fn(&mut self, t: Type) -> CmdResult {
        self.guard()?;
        match self.new_fn(t) {
            Some(v) => self.push_value(v),
            None => Err(self.raise("push_fn of a non-callable type")),
        }
    }

    /// Pushes a copy of argument `index` of the current call.
    pub fn push_arg(&mut self, index: usize) -> CmdResult {
        self.guard()?;
        match self.arg(index) {
            Some(v) => self.push_value(v),
            None => Err(self.raise("push_arg index out of bounds")),
        }
    }

    // --- puts ---

    /// Writes `v` to register `dst`, or pushes it when `dst` is newtop.
    pub fn put(&mut self, dst: impl Into<RegId>, v: Value) -> CmdResult {
        self.guard()?;
        let dst = dst.into();
        match dst.index() {
            None => self.push_value(v),
            Some(index) => {
                if index >= self.locals() {
                    return Err(self.raise("put destination out of bounds"));
                }
                post_with(&self.dbg, DebugCat::CTX_LLCMD, || format!("put r{index}, {v}"));
                let at = self.top().locals_start + index;
                self.stack[at] = v;
                Ok(())
            }
        }
    }

    /// Writes a none value; see [`put`](Context::put).
    pub fn put_none(&mut self, dst: impl Into<RegId>) -> CmdResult {
        self.put(dst, Value::None)
    }

    /// Writes an [`Int`] value; see [`put`](Context::put).
    pub fn put_int(&mut self, dst: impl Into<RegId>, v: Int) -> CmdResult {
        self.put(dst, Value::Int(v))
    }

    /// Writes a [`UInt`] value; see [`put`](Context::put).
    pub fn put_uint(&mut self, dst: impl Into<RegId>, v: UInt) -> CmdResult {
        self.put(dst, Value::UInt(v))
    }

    /// Writes a [`Float`] value; see [`put`](Context::put).
    pub fn put_float(&mut self, dst: impl Into<RegId>, v: Float) -> CmdResult {
        self.put(dst, Value::Float(v))
    }

    /// Writes a [`Bool`] value; see [`put`](Context::put).
    pub fn put_bool(&mut self, dst: impl Into<RegId>, v: Bool) -> CmdResult {
        self.put(dst, Value::Bool(v))
    }

    /// Writes a [`Char`] value; see [`put`](Context::put).
    pub fn put_char(&mut self, dst: impl Into<RegId>, v: Char) -> CmdResult {
        self.put(dst, Value::Char(v))
    }

    /// Writes a type value; see [`put`](Context::put).
    pub fn put_type(&mut self, dst: impl Into<RegId>, t: Type) -> CmdResult {
        self.put(dst, Value::Type(t))
    }

    /// Writes the stateless handle of the callable type `t`; panics if `t`
    /// cannot be called.
    pub fn put_fn(&mut self, dst: impl Into<RegId>, t: Type) -> CmdResult {
        self.guard()?;
        match self.new_fn(t) {
            Some(v) => self.put(dst, v),
            None => Err(self.raise("put_fn of a non-callable type")),
        }
    }

    /// Writes the object constant `konst` of the current callee's table.
    /// Panics in the user frame, which has no constants.
    pub fn put_const(&mut self, dst: impl Into<RegId>, konst: ConstId) -> CmdResult {
        self.guard()?;
        let Some(callee) = self.top().callee.clone() else {
            return Err(self.raise("put_const in the user frame"));
        };
        let Some(entry) = callee.info().consts().konst(konst) else {
            return Err(self.raise("put_const constant out of bounds"));
        };
        let Some(v) = entry.object() else {
            return Err(self.raise("put_const of a non-object constant"));
        };
        self.put(dst, v)
    }

    /// Writes a type value referring to the type constant `konst` of the
    /// current callee's table. Panics in the user frame.
    pub fn put_type_const(&mut self, dst: impl Into<RegId>, konst: ConstId) -> CmdResult {
        self.guard()?;
        let Some(callee) = self.top().callee.clone() else {
            return Err(self.raise("put_type_const in the user frame"));
        };
        let Some(entry) = callee.info().consts().konst(konst) else {
            return Err(self.raise("put_type_const constant out of bounds"));
        };
        if !entry.is_type_const() {
            return Err(self.raise("put_type_const of a non-type constant"));
        }
        let Some(t) = callee.resolved_const(konst as usize) else {
            return Err(self.raise("put_type_const of an unlinked constant"));
        };
        self.put(dst, Value::Type(t))
    }

    /// Copies argument `index` of the current call to `dst`. Panics in the
    /// user frame, which has no arguments.
    pub fn put_arg(&mut self, dst: impl Into<RegId>, index: usize) -> CmdResult {
        self.guard()?;
        match self.arg(index) {
            Some(v) => self.put(dst, v),
            None => Err(self.raise("put_arg index out of bounds")),
        }
    }

    /// Copies register `src` to `dst`.
    pub fn copy(&mut self, src: impl Into<RegId>, dst: impl Into<RegId>) -> CmdResult {
        self.guard()?;
        let src = src.into();
        let v = match src.index().and_then(|i| self.local(i)) {
            Some(v) => v,
            None => return Err(self.raise("copy source out of bounds")),
        };
        self.put(dst, v)
    }

    /// The default value of `t`: zero for the numeric scalars, `false`,
    /// `'\0'`, none, the none type for `Type`, and the stateless
    /// handle/instance for callables and structs.
    pub fn default_value(&self, t: &Type) -> Value {
        match t.kind() {
            Kind::Primitive => match t.ptype() {
                Some(PType::Int) => Value::Int(0),
                Some(PType::UInt) => Value::UInt(0),
                Some(PType::Float) => Value::Float(0.0),
                Some(PType::Bool) => Value::Bool(false),
                Some(PType::Char) => Value::Char(0),
                Some(PType::Type) => Value::Type(self.dm.none_type()),
                Some(PType::None) | None => Value::None,
            },
            Kind::Function | Kind::Method => Value::Fn(t.clone()),
            Kind::Struct => Value::Struct(t.clone()),
        }
    }

    /// Writes the default value of `t` to `dst`.
    pub fn default_init(&mut self, dst: impl Into<RegId>, t: &Type) -> CmdResult {
        self.guard()?;
        let v = self.default_value(t);
        self.put(dst, v)
    }

    /// Writes the default value of the type constant `konst` of the current
    /// callee's table. Panics in the user frame.
    pub fn default_init_const(&mut self, dst: impl Into<RegId>, konst: ConstId) -> CmdResult {
        self.guard()?;
        let Some(callee) = self.top().callee.clone() else {
            return Err(self.raise("default_init in the user frame"));
        };
        let Some(entry) = callee.info().consts().konst(konst) else {
            return Err(self.raise("default_init constant out of bounds"));
        };
        if !entry.is_type_const() {
            return Err(self.raise("default_init of a non-type constant"));
        }
        let Some(t) = callee.resolved_const(konst as usize) else {
            return Err(self.raise("default_init of an unlinked constant"));
        };
        self.default_init(dst, &t)
    }

    /// Pops up to `n` registers off the current frame.
    pub fn pop(&mut self, n: usize) -> CmdResult {
        self.guard()?;
        let keep = self.locals().saturating_sub(n);
        let start = self.top().locals_start;
        self.stack.truncate(start + keep);
        Ok(())
    }

    // --- call protocol ---

    /// Marks the current frame as returning the value of register `src`.
    ///
    /// Legal only outside the user frame and at most once per invocation.
    /// The returned object's type is *not* checked against the callee's
    /// declared return type; native code may deliberately return a
    /// wrong-typed object.
    pub fn ret(&mut self, src: impl Into<RegId>) -> CmdResult {
        self.guard()?;
        if self.is_user() {
            return Err(self.raise("ret in the user frame"));
        }
        if self.top().returned {
            return Err(self.raise("ret called twice in one invocation"));
        }
        let src = src.into();
        let v = match src.index().and_then(|i| self.local(i)) {
            Some(v) => v,
            None => return Err(self.raise("ret register out of bounds")),
        };
        let frame = self.top_mut();
        frame.ret_val = Some(v);
        frame.returned = true;
        Ok(())
    }

    /// Consumes the top `args` registers as `[callable, arg1, ..]`, invokes
    /// the callable, and writes its return value to `dst` (indexed in the
    /// frame left after the argument region pops).
    pub fn call(&mut self, args: usize, dst: impl Into<RegId>) -> CmdResult {
        self.call_impl(args, Some(dst.into()))
    }

    /// Like [`call`](Context::call), discarding the return value.
    pub fn call_nr(&mut self, args: usize) -> CmdResult {
        self.call_impl(args, None)
    }

    fn call_impl(&mut self, args: usize, dst: Option<RegId>) -> CmdResult {
        self.guard()?;
        let locals = self.locals();
        if args == 0 {
            return Err(self.raise("call with no callable object"));
        }
        if args > locals {
            return Err(self.raise("call argument registers out of bounds"));
        }
        let callee_at = self.stack.len() - args;
        let callee = match &self.stack[callee_at] {
            Value::Fn(t) => t.clone(),
            _ => return Err(self.raise("call object is not a callable type")),
        };
        if let Some(dst) = dst {
            if let Some(index) = dst.index() {
                if index >= locals - args {
                    return Err(self.raise("call return destination out of bounds"));
                }
            }
        }
        let params = callee.param_count();
        if params != args - 1 {
            return Err(self.raise("call argument count mismatch"));
        }
        for i in 0..params {
            let expected = match callee.param_type(i) {
                Some(t) => t,
                None => return Err(self.raise("callee parameter type is unlinked")),
            };
            let actual = self.stack[callee_at + 1 + i].type_of(&self.dm);
            if actual != expected {
                return Err(self.raise("call argument type mismatch"));
            }
        }
        if self.frames.len() >= self.max_call_frames() {
            return Err(self.raise("call stack overflow"));
        }

        post_with(&self.dbg, DebugCat::CTX_LLCMD, || {
            format!("calling {callee} with {} argument(s)", args - 1)
        });
        self.frames.push(Frame {
            callee: Some(callee.clone()),
            args_start: callee_at,
            args,
            locals_start: self.stack.len(),
            max_locals: callee.max_locals(),
            pc: 0,
            ret_val: None,
            returned: false,
        });

        match callee.call() {
            Some(CallBody::Bcode(_)) => self.exec_bcode(&callee),
            Some(CallBody::Native(f)) => {
                let f = f.clone();
                // The returned status only drove the host function's own
                // early exits; the context's panic state is authoritative.
                let _ = f.as_ref()(self);
            }
            None => {
                let _ = self.raise("callee has no call body");
            }
        }

        let Some(finished) = self.frames.pop() else {
            return Err(Panicked);
        };
        // Consume the callee's registers and the argument region in one go.
        self.stack.truncate(finished.args_start);

        if self.panicking {
            if self.frames.len() == 1 {
                self.finish_user_panic();
            }
            return Err(Panicked);
        }
        let ret_val = match finished.ret_val {
            Some(v) => v,
            None => return Err(self.raise("callee returned without providing a value")),
        };
        match dst {
            Some(dst) => self.put(dst, ret_val),
            None => Ok(()),
        }
    }

    // --- bytecode dispatch ---

    fn exec_bcode(&mut self, callee: &Type) {
        let Some(CallBody::Bcode(code)) = callee.call() else {
            return;
        };
        loop {
            if self.panicking {
                return;
            }
            let pc = self.top().pc;
            let instr = match code.get(pc) {
                Some(instr) => *instr,
                None => {
                    let _ = self.raise("program counter out of bounds");
                    return;
                }
            };
            tracing::trace!(pc, %instr, "executing");
            post_with(&self.dbg, DebugCat::BCODE_EXEC, || format!("{pc:>4}: {instr}"));
            self.top_mut().pc = pc + 1;
            let result = match instr {
                Instr::Noop => Ok(()),
                Instr::Pop { n } => self.pop(n as usize),
                Instr::PutNone { dst, .. } => self.put_none(dst),
                Instr::PutConst { dst, konst, .. } => self.put_const(dst, konst),
                Instr::PutTypeConst { dst, konst, .. } => self.put_type_const(dst, konst),
                Instr::PutArg { dst, arg, .. } => self.put_arg(dst, arg as usize),
                Instr::Copy { src, dst, .. } => self.copy(src, dst),
                Instr::DefaultInit { dst, konst, .. } => self.default_init_const(dst, konst),
                Instr::Call { args, dst, .. } => self.call(args as usize, dst),
                Instr::CallNr { args } => self.call_nr(args as usize),
                Instr::Ret { src } => {
                    match self.ret(src) {
                        Ok(()) => return,
                        Err(err) => Err(err),
                    }
                }
                Instr::Jump { offset } => self.branch(code, pc, offset),
                Instr::JumpTrue { pops, offset } => self.cond_branch(code, pc, pops, offset, true),
                Instr::JumpFalse { pops, offset } => self.cond_branch(code, pc, pops, offset, false),
            };
            if result.is_err() {
                return;
            }
        }
    }

    fn branch(&mut self, code: &Code, pc: usize, offset: i16) -> CmdResult {
        match code.branch_target(pc, offset) {
            Some(target) => {
                self.top_mut().pc = target;
                Ok(())
            }
            None => Err(self.raise("branch target out of bounds")),
        }
    }

    fn cond_branch(
        &mut self,
        code: &Code,
        pc: usize,
        pops: u16,
        offset: i16,
        jump_if: bool,
    ) -> CmdResult {
        let locals = self.locals();
        let cond = match (locals > 0).then(|| self.local(locals - 1)).flatten() {
            Some(Value::Bool(b)) => b,
            _ => return Err(self.raise("conditional branch needs a boolean on top")),
        };
        self.pop(pops as usize)?;
        if cond == jump_if {
            self.branch(code, pc, offset)
        } else {
            Ok(())
        }
    }
}
