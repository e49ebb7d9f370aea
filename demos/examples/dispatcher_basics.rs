// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priorities, coalescing, cancellation, and cross-thread invocation on the UI queue.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p arbor_demos --example dispatcher_basics`

use std::sync::Arc;
use std::thread;

use arbor_dispatch::{Dispatcher, MergeKey, Priority};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.set_exception_handler(|err| {
        println!("handled failure: {err:#}");
        true
    });

    dispatcher.enqueue(Priority::Idle, || {
        println!("idle work runs last");
        Ok(())
    });
    dispatcher.enqueue(Priority::Input, || {
        println!("input runs first");
        Ok(())
    });
    for i in 0..3 {
        let queued = dispatcher.enqueue_merged(Priority::Render, MergeKey::render_pass(1), move || {
            println!("one repaint for request #{i}");
            Ok(())
        });
        println!("repaint request #{i} queued: {queued}");
    }
    let skipped = dispatcher.enqueue_with_operation(Priority::Normal, || {
        println!("never printed");
        Ok(())
    });
    skipped.abort();
    dispatcher.enqueue(Priority::Normal, || anyhow::bail!("a failing action"));

    println!("ran {} actions", dispatcher.process()?);
    println!("aborted operation status: {:?}", skipped.status());

    // A worker blocks until the UI thread has run its action.
    let remote = dispatcher.clone();
    let worker = thread::spawn(move || {
        remote.invoke(Priority::Send, || {
            println!("ran on the UI thread on behalf of a worker");
            Ok(())
        })
    });
    while !worker.is_finished() {
        dispatcher.process()?;
        thread::yield_now();
    }
    match worker.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("worker panicked"),
    }

    dispatcher.shutdown();
    println!("final state: {:?}", dispatcher.state());
    Ok(())
}
