//! Admission control under concurrent triggers
//!
//! REQUIREMENT: while a cycle is in flight, exactly one trigger is admitted
//! and every other concurrent trigger is told the compile is already active.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::{
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use common::{coordinator, success, FakeEngine};
use livecoding_core::{BuildExecutor, CycleStage, DiagnosticsSink, Error};
use tokio::task::JoinSet;

#[test]
fn test_exactly_one_of_many_threads_is_admitted() {
    // GIVEN: an idle coordinator and 16 threads released at the same instant
    let sink = DiagnosticsSink::new();
    let coordinator = coordinator(Arc::new(FakeEngine::new(sink.clone(), success())), sink);
    let barrier = Arc::new(Barrier::new(16));

    // WHEN: every thread tries to begin a compile and holds whatever it gets
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let coordinator = coordinator.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                coordinator.try_begin_compile()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // THEN: one ticket, fifteen AlreadyActive
    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(Error::AlreadyActive)))
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(coordinator.stage(), CycleStage::Reserved);

    // AND: dropping the only ticket frees the coordinator again
    drop(results);
    assert!(!coordinator.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_triggers_during_running_compile_all_conflict() -> anyhow::Result<()> {
    // GIVEN: a compile parked inside the engine on the executor
    let sink = DiagnosticsSink::new();
    let (engine, release, started) = FakeEngine::new(sink.clone(), success()).gated();
    let coordinator = coordinator(Arc::new(engine), sink);
    let executor = BuildExecutor::spawn()?;

    let ticket = coordinator.try_begin_compile()?;
    let worker = coordinator.clone();
    executor.dispatch(move || {
        let _ = worker.execute_on_build_executor(ticket);
    })?;
    tokio::task::spawn_blocking(move || started.recv_timeout(Duration::from_secs(10)))
        .await??;

    // WHEN: many async callers trigger and poll at once
    let mut set = JoinSet::new();
    for _ in 0..32 {
        let coordinator = coordinator.clone();
        set.spawn(async move {
            let admitted = coordinator.try_begin_compile().is_ok();
            let polled = coordinator.get_snapshot();
            (admitted, polled.in_progress)
        });
    }

    // THEN: nobody is admitted and every poll sees the compile in flight
    while let Some(joined) = set.join_next().await {
        let (admitted, in_progress) = joined?;
        assert!(!admitted);
        assert!(in_progress);
    }

    release.send(())?;
    tokio::task::spawn_blocking(move || executor.shutdown()).await?;
    assert!(!coordinator.is_busy());
    assert!(coordinator.try_begin_compile().is_ok());
    Ok(())
}

#[test]
fn test_admission_never_waits_for_compile() -> anyhow::Result<()> {
    let sink = DiagnosticsSink::new();
    let (engine, release, started) = FakeEngine::new(sink.clone(), success()).gated();
    let coordinator = coordinator(Arc::new(engine), sink);
    let executor = BuildExecutor::spawn()?;

    let ticket = coordinator.try_begin_compile()?;
    let worker = coordinator.clone();
    executor.dispatch(move || {
        let _ = worker.execute_on_build_executor(ticket);
    })?;
    started.recv_timeout(Duration::from_secs(10))?;

    // The engine is blocked; these calls must still return immediately
    let begin = std::time::Instant::now();
    for _ in 0..100 {
        assert!(coordinator.try_begin_compile().is_err());
        assert!(coordinator.get_snapshot().in_progress);
    }
    assert!(begin.elapsed() < Duration::from_secs(2));

    release.send(())?;
    executor.shutdown();
    Ok(())
}
