//! Low-level command API and call-protocol behaviour.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::Fixture;
use yama_asm::{RegId, NEWTOP};
use yama_vm::{
    CallBody, CallSig, ConstTableInfo, TypeInfo, Value, MAX_CALL_FRAMES, USER_MAX_LOCALS,
};

fn none_ret_consts() -> ConstTableInfo {
    ConstTableInfo::new().add_primitive_type("yama:None")
}

/// A function that pushes none and returns it, for tests that only need a
/// well-behaved callee.
fn upload_noop_fn(fx: &Fixture, name: &str) {
    fx.parcel.upload(TypeInfo::function(
        name,
        none_ret_consts(),
        CallSig::new(vec![], 0),
        1,
        CallBody::native(|ctx| {
            ctx.push_none()?;
            ctx.ret(0)
        }),
    ));
}

#[test]
fn initial_state_of_the_user_frame() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    assert!(ctx.is_user());
    assert_eq!(ctx.call_frames(), 1);
    assert_eq!(ctx.max_call_frames(), MAX_CALL_FRAMES);
    assert_eq!(ctx.args(), 0);
    assert_eq!(ctx.locals(), 0);
    assert_eq!(ctx.max_locals(), USER_MAX_LOCALS);
    assert_eq!(ctx.panics(), 0);
    assert!(!ctx.panicking());
    assert!(ctx.consts().is_none());
    assert!(ctx.arg(0).is_none());
    assert!(ctx.local(0).is_none());
}

#[test]
fn state_inside_a_call() {
    let fx = Fixture::new();
    let observed = Arc::new(AtomicBool::new(false));
    let seen = observed.clone();
    let consts = ConstTableInfo::new()
        .add_primitive_type("yama:Int")
        .add_function_type("self:f", CallSig::new(vec![0], 0));
    fx.parcel.upload(TypeInfo::function(
        "f",
        consts,
        CallSig::new(vec![0], 0),
        6,
        CallBody::native(move |ctx| {
            seen.store(true, Ordering::SeqCst);
            assert!(!ctx.is_user());
            assert!(!ctx.panicking());
            assert_eq!(ctx.call_frames(), 2);
            assert_eq!(ctx.args(), 2);
            assert_eq!(ctx.locals(), 0);
            assert_eq!(ctx.max_locals(), 6);
            let own = ctx.consts().unwrap().ty(1).unwrap();
            assert_eq!(ctx.arg(0), ctx.new_fn(own));
            assert_eq!(ctx.arg(1), Some(ctx.new_int(-14)));
            assert_eq!(ctx.consts().unwrap().len(), 2);
            assert_eq!(ctx.consts().unwrap().ty(0), Some(ctx.int_type()));
            ctx.push_int(7)?;
            ctx.ret(0)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    ctx.push_int(-14).unwrap();
    ctx.call(2, NEWTOP).unwrap();
    assert!(observed.load(Ordering::SeqCst));
    assert_eq!(ctx.local(0), Some(Value::Int(7)));
    assert_eq!(ctx.locals(), 1);
}

#[test]
fn value_equality_is_kind_plus_payload() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    assert_eq!(ctx.new_none(), ctx.new_none());
    assert_eq!(ctx.new_int(-4), ctx.new_int(-4));
    assert_ne!(ctx.new_int(-4), ctx.new_int(4));
    assert_ne!(ctx.new_int(4), ctx.new_uint(4));
    assert_eq!(ctx.new_float(0.5), ctx.new_float(0.5));
    assert_ne!(ctx.new_float(f64::NAN), ctx.new_float(f64::NAN));
    assert_eq!(ctx.new_bool(true), ctx.new_bool(true));
    assert_ne!(ctx.new_bool(true), ctx.new_bool(false));
    assert_eq!(ctx.new_char(0x394), ctx.new_char(0x394));
    assert_ne!(ctx.new_char(0x394), ctx.new_int(0x394));
    assert_eq!(ctx.new_type(ctx.int_type()), ctx.new_type(ctx.int_type()));
    assert_ne!(ctx.new_type(ctx.int_type()), ctx.new_type(ctx.uint_type()));
}

#[test]
fn new_char_accepts_surrogates_and_beyond_codespace() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    assert_eq!(ctx.new_char(0xd8a2).as_char(), Some(0xd8a2));
    assert_eq!(ctx.new_char(0x110000).as_char(), Some(0x110000));
}

#[test]
fn new_fn_rejects_non_callables() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    assert!(ctx.new_fn(ctx.int_type()).is_none());
}

#[test]
fn pushes_and_pops_in_the_user_frame() {
    let fx = Fixture::new();
    let mut ctx = fx.ctx();
    ctx.push_int(10).unwrap();
    ctx.push_uint(7).unwrap();
    ctx.push_none().unwrap();
    assert_eq!(ctx.locals(), 3);
    assert_eq!(ctx.local(0), Some(Value::Int(10)));
    assert_eq!(ctx.local(1), Some(Value::UInt(7)));
    assert_eq!(ctx.local(2), Some(Value::None));
    ctx.pop(2).unwrap();
    assert_eq!(ctx.locals(), 1);
    // Pop clamps to the live register count.
    ctx.pop(100).unwrap();
    assert_eq!(ctx.locals(), 0);
    assert_eq!(ctx.panics(), 0);
}

#[test]
fn push_overflow_panics() {
    let fx = Fixture::new();
    let mut ctx = fx.ctx();
    for _ in 0..USER_MAX_LOCALS {
        ctx.push_none().unwrap();
    }
    assert_eq!(ctx.panics(), 0);
    assert!(ctx.push_none().is_err());
    assert_eq!(ctx.panics(), 1);
    // The panic completed in the user frame and consumed its registers.
    assert!(!ctx.panicking());
    assert_eq!(ctx.locals(), 0);
}

#[test]
fn put_overwrites_and_pushes() {
    let fx = Fixture::new();
    let mut ctx = fx.ctx();
    ctx.put(NEWTOP, Value::Int(-14)).unwrap();
    assert_eq!(ctx.locals(), 1);
    assert_eq!(ctx.local(0), Some(Value::Int(-14)));
    ctx.put(0, Value::Int(3)).unwrap();
    assert_eq!(ctx.locals(), 1);
    assert_eq!(ctx.local(0), Some(Value::Int(3)));
    // Runtime puts may change a register's type freely.
    ctx.put_bool(0, true).unwrap();
    assert_eq!(ctx.local(0), Some(Value::Bool(true)));
}

#[test]
fn put_out_of_bounds_panics() {
    let fx = Fixture::new();
    let mut ctx = fx.ctx();
    assert!(ctx.put(70, Value::None).is_err());
    assert_eq!(ctx.panics(), 1);
}

#[test]
fn put_fn_of_non_callable_panics() {
    let fx = Fixture::new();
    let mut ctx = fx.ctx();
    let int_type = ctx.int_type();
    assert!(ctx.put_fn(NEWTOP, int_type).is_err());
    assert_eq!(ctx.panics(), 1);
}

#[test]
fn const_commands_panic_in_the_user_frame() {
    let fx = Fixture::new();
    let mut ctx = fx.ctx();
    assert!(ctx.put_const(NEWTOP, 0).is_err());
    assert_eq!(ctx.panics(), 1);
    assert!(ctx.put_type_const(NEWTOP, 0).is_err());
    assert_eq!(ctx.panics(), 2);
    assert!(ctx.default_init_const(NEWTOP, 0).is_err());
    assert_eq!(ctx.panics(), 3);
    assert!(ctx.put_arg(NEWTOP, 0).is_err());
    assert_eq!(ctx.panics(), 4);
}

#[test]
fn const_commands_inside_a_call() {
    let fx = Fixture::new();
    let consts = ConstTableInfo::new()
        .add_primitive_type("yama:None")
        .add_int(101)
        .add_primitive_type("yama:Int")
        .add_float(1.5);
    fx.parcel.upload(TypeInfo::function(
        "f",
        consts,
        CallSig::new(vec![], 0),
        8,
        CallBody::native(|ctx| {
            ctx.put_const(NEWTOP, 1)?;
            assert_eq!(ctx.local(0), Some(Value::Int(101)));
            ctx.put_const(NEWTOP, 3)?;
            assert_eq!(ctx.local(1), Some(Value::Float(1.5)));
            ctx.put_type_const(NEWTOP, 2)?;
            assert_eq!(ctx.local(2), Some(ctx.new_type(ctx.int_type())));
            ctx.default_init_const(NEWTOP, 2)?;
            assert_eq!(ctx.local(3), Some(Value::Int(0)));
            ctx.put_arg(NEWTOP, 0)?;
            assert_eq!(ctx.local(4).and_then(|v| v.as_fn()), ctx.arg(0).and_then(|v| v.as_fn()));
            ctx.push_none()?;
            ctx.ret(5)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    ctx.call_nr(1).unwrap();
    assert_eq!(ctx.panics(), 0);
}

#[test]
fn put_const_class_violations_panic() {
    let fx = Fixture::new();
    let consts = ConstTableInfo::new()
        .add_primitive_type("yama:None")
        .add_int(101);
    fx.parcel.upload(TypeInfo::function(
        "f",
        consts,
        CallSig::new(vec![], 0),
        4,
        CallBody::native(|ctx| {
            // Out-of-bounds index.
            assert!(ctx.put_const(NEWTOP, 9).is_err());
            Ok(())
        }),
    ));
    fx.parcel.upload(TypeInfo::function(
        "g",
        ConstTableInfo::new()
            .add_primitive_type("yama:None")
            .add_int(101),
        CallSig::new(vec![], 0),
        4,
        CallBody::native(|ctx| {
            // A type constant is not an object constant, and vice versa.
            assert!(ctx.put_const(NEWTOP, 0).is_err());
            Ok(())
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let g = fx.dm.load("abc:g").unwrap();

    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 1);

    ctx.push_fn(g).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 2);
}

#[test]
fn copy_and_default_init_by_type() {
    let fx = Fixture::new();
    let mut ctx = fx.ctx();
    ctx.push_int(-4).unwrap();
    ctx.copy(0, NEWTOP).unwrap();
    assert_eq!(ctx.local(1), Some(Value::Int(-4)));
    ctx.put_int(1, 9).unwrap();
    ctx.copy(1, 0).unwrap();
    assert_eq!(ctx.local(0), Some(Value::Int(9)));
    assert!(ctx.copy(7, NEWTOP).is_err());
    assert_eq!(ctx.panics(), 1);

    // The type overload of default_init works in the user frame.
    let uint_type = ctx.uint_type();
    let type_type = ctx.type_type();
    ctx.default_init(NEWTOP, &uint_type).unwrap();
    assert_eq!(ctx.local(0), Some(Value::UInt(0)));
    ctx.default_init(NEWTOP, &type_type).unwrap();
    assert_eq!(ctx.local(1), Some(ctx.new_type(ctx.none_type())));
}

#[test]
fn default_values_cover_every_kind() {
    let fx = Fixture::new();
    fx.parcel.upload(TypeInfo::strukt(
        "SomeStruct",
        ConstTableInfo::new(),
    ));
    fx.parcel.upload(TypeInfo::method(
        "SomeStruct::m",
        ConstTableInfo::new().add_primitive_type("yama:Int"),
        CallSig::new(vec![0], 0),
        1,
        CallBody::native(|ctx| {
            ctx.push_arg(1)?;
            ctx.ret(0)
        }),
    ));
    fx.parcel.upload(TypeInfo::function(
        "f",
        ConstTableInfo::new().add_primitive_type("yama:Int"),
        CallSig::new(vec![0], 0),
        1,
        CallBody::native(|ctx| {
            ctx.push_arg(1)?;
            ctx.ret(0)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let m = fx.dm.load("abc:SomeStruct::m").unwrap();
    let strukt = fx.dm.load("abc:SomeStruct").unwrap();

    let ctx = fx.ctx();
    assert_eq!(ctx.default_value(&ctx.none_type()), Value::None);
    assert_eq!(ctx.default_value(&ctx.int_type()), Value::Int(0));
    assert_eq!(ctx.default_value(&ctx.uint_type()), Value::UInt(0));
    assert_eq!(ctx.default_value(&ctx.float_type()), Value::Float(0.0));
    assert_eq!(ctx.default_value(&ctx.bool_type()), Value::Bool(false));
    assert_eq!(ctx.default_value(&ctx.char_type()), Value::Char(0));
    assert_eq!(ctx.default_value(&ctx.type_type()), Value::Type(ctx.none_type()));
    assert_eq!(ctx.default_value(&f), Value::Fn(f.clone()));
    assert_eq!(ctx.default_value(&m), Value::Fn(m.clone()));
    assert_eq!(ctx.default_value(&strukt), Value::Struct(strukt.clone()));
}

#[test]
fn panic_in_a_call_unwinds_to_the_user_frame() {
    let fx = Fixture::new();
    fx.parcel.upload(TypeInfo::function(
        "f",
        none_ret_consts(),
        CallSig::new(vec![], 0),
        1,
        CallBody::native(|ctx| {
            assert_eq!(ctx.panics(), 0);
            assert!(!ctx.panicking());
            ctx.panic();
            assert_eq!(ctx.panics(), 1);
            assert!(ctx.panicking());
            // A second panic within the same invocation is absorbed.
            ctx.panic();
            assert_eq!(ctx.panics(), 1);
            assert!(ctx.panicking());
            Ok(())
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 1);
    assert!(!ctx.panicking());
    assert!(ctx.is_user());
    assert_eq!(ctx.call_frames(), 1);
    assert_eq!(ctx.locals(), 0);
}

#[test]
fn panic_in_the_user_frame_completes_immediately() {
    let fx = Fixture::new();
    let mut ctx = fx.ctx();
    ctx.push_int(3).unwrap();
    ctx.panic();
    assert_eq!(ctx.panics(), 1);
    assert!(!ctx.panicking());
    assert_eq!(ctx.locals(), 0);
    // The context stays usable; another panic is a fresh one.
    ctx.panic();
    assert_eq!(ctx.panics(), 2);
}

#[test]
fn panic_unwinds_a_multi_level_call_stack() {
    let fx = Fixture::new();
    let outer_resumed = Arc::new(AtomicBool::new(false));
    let resumed = outer_resumed.clone();
    let fa_consts = ConstTableInfo::new()
        .add_primitive_type("yama:None")
        .add_function_type("self:fb", CallSig::new(vec![], 0));
    fx.parcel.upload(TypeInfo::function(
        "fa",
        fa_consts,
        CallSig::new(vec![], 0),
        4,
        CallBody::native(move |ctx| {
            let fb = ctx.consts().unwrap().ty(1).unwrap();
            ctx.put_fn(NEWTOP, fb)?;
            ctx.call_nr(1)?;
            // Never reached: the callee panics.
            resumed.store(true, Ordering::SeqCst);
            ctx.push_none()?;
            ctx.ret(0)
        }),
    ));
    fx.parcel.upload(TypeInfo::function(
        "fb",
        none_ret_consts(),
        CallSig::new(vec![], 0),
        1,
        CallBody::native(|ctx| {
            ctx.panic();
            Ok(())
        }),
    ));
    let fa = fx.dm.load("abc:fa").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(fa).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 1);
    assert!(!ctx.panicking());
    assert!(ctx.is_user());
    assert_eq!(ctx.call_frames(), 1);
    assert_eq!(ctx.locals(), 0);
    assert!(!outer_resumed.load(Ordering::SeqCst));
}

#[test]
fn call_writes_the_return_value_at_an_index() {
    let fx = Fixture::new();
    let consts = ConstTableInfo::new().add_primitive_type("yama:Int");
    fx.parcel.upload(TypeInfo::function(
        "plus",
        consts,
        CallSig::new(vec![0, 0, 0], 0),
        1,
        CallBody::native(|ctx| {
            let sum = ctx.arg(1).unwrap().as_int().unwrap()
                + ctx.arg(2).unwrap().as_int().unwrap()
                + ctx.arg(3).unwrap().as_int().unwrap();
            ctx.push_int(sum)?;
            ctx.ret(0)
        }),
    ));
    let plus = fx.dm.load("abc:plus").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_none().unwrap();
    ctx.push_fn(plus.clone()).unwrap();
    ctx.push_int(1).unwrap();
    ctx.push_int(48).unwrap();
    ctx.push_int(100).unwrap();
    // Overwrites R0 in the frame left after the argument region pops.
    ctx.call(4, 0).unwrap();
    assert_eq!(ctx.locals(), 1);
    assert_eq!(ctx.local(0), Some(Value::Int(149)));

    // And via newtop.
    ctx.push_fn(plus).unwrap();
    ctx.push_int(1).unwrap();
    ctx.push_int(2).unwrap();
    ctx.push_int(3).unwrap();
    ctx.call(4, NEWTOP).unwrap();
    assert_eq!(ctx.locals(), 2);
    assert_eq!(ctx.local(1), Some(Value::Int(6)));
}

#[test]
fn call_panics_cover_the_whole_protocol() {
    let fx = Fixture::new();
    upload_noop_fn(&fx, "f");
    let consts = ConstTableInfo::new().add_primitive_type("yama:Int");
    fx.parcel.upload(TypeInfo::function(
        "id",
        consts,
        CallSig::new(vec![0], 0),
        1,
        CallBody::native(|ctx| {
            ctx.push_arg(1)?;
            ctx.ret(0)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let id = fx.dm.load("abc:id").unwrap();

    // No callable object.
    let mut ctx = fx.ctx();
    assert!(ctx.call_nr(0).is_err());
    assert_eq!(ctx.panics(), 1);

    // Argument region exceeds the frame.
    ctx.push_fn(f.clone()).unwrap();
    assert!(ctx.call_nr(2).is_err());
    assert_eq!(ctx.panics(), 2);

    // Return destination out of bounds after the call.
    ctx.push_fn(f.clone()).unwrap();
    assert!(ctx.call(1, 0).is_err());
    assert_eq!(ctx.panics(), 3);

    // Callee slot does not hold a callable.
    ctx.push_int(10).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 4);

    // Too many arguments.
    ctx.push_fn(id.clone()).unwrap();
    ctx.push_int(1).unwrap();
    ctx.push_int(2).unwrap();
    assert!(ctx.call_nr(3).is_err());
    assert_eq!(ctx.panics(), 5);

    // Too few arguments.
    ctx.push_fn(id.clone()).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 6);

    // Argument type mismatch.
    ctx.push_fn(id).unwrap();
    ctx.push_uint(1).unwrap();
    assert!(ctx.call_nr(2).is_err());
    assert_eq!(ctx.panics(), 7);
}

#[test]
fn callee_must_provide_a_return_value() {
    let fx = Fixture::new();
    fx.parcel.upload(TypeInfo::function(
        "f",
        none_ret_consts(),
        CallSig::new(vec![], 0),
        1,
        CallBody::native(|_ctx| Ok(())),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 1);
    assert_eq!(ctx.locals(), 0);
}

#[test]
fn ret_may_return_a_wrong_typed_object() {
    let fx = Fixture::new();
    // Declared to return Int, actually returns a UInt: the interpreter
    // deliberately trusts native code here.
    let consts = ConstTableInfo::new().add_primitive_type("yama:Int");
    fx.parcel.upload(TypeInfo::function(
        "f",
        consts,
        CallSig::new(vec![], 0),
        1,
        CallBody::native(|ctx| {
            ctx.push_uint(301)?;
            ctx.ret(0)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    ctx.call(1, NEWTOP).unwrap();
    assert_eq!(ctx.local(0), Some(Value::UInt(301)));
    assert_eq!(ctx.panics(), 0);
}

#[test]
fn ret_misuse_panics() {
    let fx = Fixture::new();

    // In the user frame.
    let mut ctx = fx.ctx();
    ctx.push_none().unwrap();
    assert!(ctx.ret(0).is_err());
    assert_eq!(ctx.panics(), 1);

    // Register out of bounds.
    fx.parcel.upload(TypeInfo::function(
        "f",
        none_ret_consts(),
        CallSig::new(vec![], 0),
        1,
        CallBody::native(|ctx| ctx.ret(3)),
    ));
    // Twice in one invocation.
    fx.parcel.upload(TypeInfo::function(
        "g",
        none_ret_consts(),
        CallSig::new(vec![], 0),
        2,
        CallBody::native(|ctx| {
            ctx.push_none()?;
            ctx.ret(0)?;
            ctx.ret(0)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let g = fx.dm.load("abc:g").unwrap();

    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 1);

    ctx.push_fn(g).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 2);
}

#[test]
fn commands_refuse_to_run_while_panicking() {
    let fx = Fixture::new();
    fx.parcel.upload(TypeInfo::function(
        "f",
        none_ret_consts(),
        CallSig::new(vec![], 0),
        2,
        CallBody::native(|ctx| {
            ctx.panic();
            assert!(ctx.push_none().is_err());
            assert!(ctx.pop(1).is_err());
            assert!(ctx.ret(0).is_err());
            assert!(ctx.call_nr(1).is_err());
            assert_eq!(ctx.panics(), 1);
            Ok(())
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    assert!(ctx.call_nr(1).is_err());
    assert_eq!(ctx.panics(), 1);
}

#[test]
fn nested_calls_stack_and_unwind_cleanly() {
    let fx = Fixture::new();
    let fa_consts = ConstTableInfo::new()
        .add_primitive_type("yama:Int")
        .add_function_type("self:fb", CallSig::new(vec![0], 0));
    fx.parcel.upload(TypeInfo::function(
        "fa",
        fa_consts,
        CallSig::new(vec![0], 0),
        4,
        CallBody::native(|ctx| {
            assert_eq!(ctx.call_frames(), 2);
            let fb = ctx.consts().unwrap().ty(1).unwrap();
            ctx.put_fn(NEWTOP, fb)?;
            ctx.push_arg(1)?;
            ctx.call(2, NEWTOP)?;
            // fb doubled it; add one more.
            let doubled = ctx.local(0).unwrap().as_int().unwrap();
            ctx.push_int(doubled + 1)?;
            ctx.ret(1)
        }),
    ));
    fx.parcel.upload(TypeInfo::function(
        "fb",
        ConstTableInfo::new().add_primitive_type("yama:Int"),
        CallSig::new(vec![0], 0),
        1,
        CallBody::native(|ctx| {
            assert_eq!(ctx.call_frames(), 3);
            let v = ctx.arg(1).unwrap().as_int().unwrap();
            ctx.push_int(v * 2)?;
            ctx.ret(0)
        }),
    ));
    let fa = fx.dm.load("abc:fa").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(fa).unwrap();
    ctx.push_int(20).unwrap();
    ctx.call(2, NEWTOP).unwrap();
    assert_eq!(ctx.local(0), Some(Value::Int(41)));
    assert_eq!(ctx.call_frames(), 1);
    assert_eq!(ctx.locals(), 1);
}

#[test]
fn call_overwrites_the_destination_register() {
    let fx = Fixture::new();
    let consts = ConstTableInfo::new().add_primitive_type("yama:Int");
    fx.parcel.upload(TypeInfo::function(
        "hundred",
        consts,
        CallSig::new(vec![], 0),
        1,
        CallBody::native(|ctx| {
            ctx.push_int(100)?;
            ctx.ret(0)
        }),
    ));
    let hundred = fx.dm.load("abc:hundred").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_bool(true).unwrap();
    ctx.push_fn(hundred).unwrap();
    ctx.call(1, 0).unwrap();
    assert_eq!(ctx.local(0), Some(Value::Int(100)));
}

#[test]
fn method_handles_call_like_functions() {
    let fx = Fixture::new();
    fx.parcel
        .upload(TypeInfo::strukt("Calc", ConstTableInfo::new()));
    fx.parcel.upload(TypeInfo::method(
        "Calc::negate",
        ConstTableInfo::new().add_primitive_type("yama:Int"),
        CallSig::new(vec![0], 0),
        1,
        CallBody::native(|ctx| {
            let v = ctx.arg(1).unwrap().as_int().unwrap();
            ctx.push_int(-v)?;
            ctx.ret(0)
        }),
    ));
    let negate = fx.dm.load("abc:Calc::negate").unwrap();
    assert!(negate.is_callable());
    let mut ctx = fx.ctx();
    ctx.push_fn(negate).unwrap();
    ctx.push_int(12).unwrap();
    ctx.call(2, NEWTOP).unwrap();
    assert_eq!(ctx.local(0), Some(Value::Int(-12)));
}

#[test]
fn push_arg_copies_arguments() {
    let fx = Fixture::new();
    let consts = ConstTableInfo::new().add_primitive_type("yama:Int");
    fx.parcel.upload(TypeInfo::function(
        "f",
        consts,
        CallSig::new(vec![0, 0], 0),
        3,
        CallBody::native(|ctx| {
            ctx.push_arg(2)?;
            ctx.push_arg(1)?;
            assert_eq!(ctx.local(0), ctx.arg(2));
            assert_eq!(ctx.local(1), ctx.arg(1));
            assert!(ctx.push_arg(3).is_err());
            Ok(())
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    ctx.push_int(1).unwrap();
    ctx.push_int(2).unwrap();
    assert!(ctx.call_nr(3).is_err());
    assert_eq!(ctx.panics(), 1);
}

#[test]
fn pop_inside_a_call_only_touches_that_frame() {
    let fx = Fixture::new();
    fx.parcel.upload(TypeInfo::function(
        "f",
        none_ret_consts(),
        CallSig::new(vec![], 0),
        4,
        CallBody::native(|ctx| {
            ctx.push_int(1)?;
            ctx.push_int(2)?;
            ctx.push_int(3)?;
            ctx.pop(2)?;
            assert_eq!(ctx.locals(), 1);
            assert_eq!(ctx.local(0), Some(Value::Int(1)));
            ctx.pop(100)?;
            assert_eq!(ctx.locals(), 0);
            ctx.push_none()?;
            ctx.ret(0)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    // User registers below the call stay untouched by the callee's pops.
    ctx.push_int(-1).unwrap();
    ctx.push_fn(f).unwrap();
    ctx.call_nr(1).unwrap();
    assert_eq!(ctx.locals(), 1);
    assert_eq!(ctx.local(0), Some(Value::Int(-1)));
}

#[test]
fn put_type_const_covers_every_type_constant_kind() {
    let fx = Fixture::new();
    fx.parcel
        .upload(TypeInfo::strukt("S", ConstTableInfo::new()));
    let consts = ConstTableInfo::new()
        .add_primitive_type("yama:None")
        .add_primitive_type("yama:Int")
        .add_function_type("self:f", CallSig::new(vec![], 0))
        .add_struct_type("self:S");
    fx.parcel.upload(TypeInfo::function(
        "f",
        consts,
        CallSig::new(vec![], 0),
        4,
        CallBody::native(|ctx| {
            ctx.put_type_const(NEWTOP, 1)?;
            ctx.put_type_const(NEWTOP, 2)?;
            ctx.put_type_const(NEWTOP, 3)?;
            assert_eq!(ctx.local(0), Some(ctx.new_type(ctx.int_type())));
            let own = ctx.arg(0).unwrap().as_fn().unwrap();
            assert_eq!(ctx.local(1), Some(ctx.new_type(own)));
            let s = ctx.local(2).unwrap().as_type().unwrap();
            assert_eq!(s.unqualified_name(), "S");
            ctx.push_none()?;
            ctx.ret(3)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    ctx.call_nr(1).unwrap();
    assert_eq!(ctx.panics(), 0);
}

#[test]
fn argument_zero_is_the_callable_itself() {
    let fx = Fixture::new();
    let consts = ConstTableInfo::new()
        .add_primitive_type("yama:None")
        .add_function_type("self:f", CallSig::new(vec![], 0));
    fx.parcel.upload(TypeInfo::function(
        "f",
        consts,
        CallSig::new(vec![], 0),
        2,
        CallBody::native(|ctx| {
            let own = ctx.consts().unwrap().ty(1).unwrap();
            assert_eq!(ctx.arg(0), ctx.new_fn(own));
            ctx.push_none()?;
            ctx.ret(0)
        }),
    ));
    let f = fx.dm.load("abc:f").unwrap();
    let mut ctx = fx.ctx();
    ctx.push_fn(f).unwrap();
    ctx.call_nr(1).unwrap();
    assert_eq!(ctx.panics(), 0);
}

#[test]
fn regid_display_reads_naturally() {
    assert_eq!(NEWTOP.to_string(), "newtop");
    assert_eq!(RegId::new(3).to_string(), "r3");
}
