//! Browser-side event delivery. Run with `wasm-pack test --node -- --features wasm`.
#![cfg(all(target_arch = "wasm32", feature = "wasm"))]

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use playchalk::JsPlayEngine;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::wasm_bindgen_test;

async fn next_microtask() {
    JsFuture::from(Promise::resolve(&JsValue::UNDEFINED))
        .await
        .unwrap();
}

#[wasm_bindgen_test]
async fn test_listener_can_read_engine_state() {
    let engine = Rc::new(RefCell::new(JsPlayEngine::new(JsValue::UNDEFINED).unwrap()));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (reader, sink) = (Rc::clone(&engine), Rc::clone(&seen));
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
        sink.borrow_mut().push(reader.borrow().frame_count());
    });
    let callback: Function = listener.as_ref().unchecked_ref::<Function>().clone();
    engine.borrow_mut().subscribe(callback);

    engine.borrow_mut().add_frame();
    assert!(seen.borrow().is_empty());

    next_microtask().await;
    // DocumentChanged then FrameChanged, both after add_frame returned.
    assert_eq!(*seen.borrow(), vec![2, 2]);
    drop(listener);
}

#[wasm_bindgen_test]
async fn test_throwing_listener_does_not_block_others() {
    let mut engine = JsPlayEngine::new(JsValue::UNDEFINED).unwrap();
    let thrower = Function::new_no_args("throw new Error('listener failed')");
    engine.subscribe(thrower);

    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
        *sink.borrow_mut() += 1;
    });
    engine.subscribe(listener.as_ref().unchecked_ref::<Function>().clone());

    engine.add_frame();
    next_microtask().await;
    assert_eq!(*count.borrow(), 2);
    drop(listener);
}
