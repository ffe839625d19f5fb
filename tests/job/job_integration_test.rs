use std::net::SocketAddr;
use std::sync::Arc;

use juliafarm::job::{ResultAggregator, TaskQueue};
use juliafarm::worker::{SessionState, WorkerServer, WorkerSession};
use juliafarm::{FractalParams, Grid, JobOrchestrator, JobSpec, WorkerAddress};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

async fn spawn_worker(params: FractalParams) -> SocketAddr {
    let server = WorkerServer::bind_addr("127.0.0.1:0", params).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// A worker that reads one task line and then hangs up.
async fn spawn_dropping_worker() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
    });
    addr
}

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn address(addr: SocketAddr) -> WorkerAddress {
    WorkerAddress::new("127.0.0.1", addr.port())
}

async fn local_grid(spec: JobSpec, params: FractalParams) -> Grid {
    JobOrchestrator::new(spec, params).run().await.unwrap().grid
}

#[tokio::test]
async fn test_local_job_small_grid() {
    let spec = JobSpec::new(2, 2, 50);
    let outcome = JobOrchestrator::new(spec, FractalParams::default())
        .run()
        .await
        .unwrap();

    assert!(outcome.sessions.is_empty());
    assert_eq!((outcome.grid.rows(), outcome.grid.columns()), (2, 2));
    assert!(outcome.grid.as_slice().iter().all(|&v| v <= 50));
}

#[tokio::test]
async fn test_single_remote_worker_matches_local() {
    let spec = JobSpec::new(4, 3, 50);
    let params = FractalParams::default();
    let worker = spawn_worker(params).await;

    let outcome = JobOrchestrator::new(spec, params)
        .with_workers(vec![address(worker)])
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.grid, local_grid(spec, params).await);
    assert_eq!(outcome.sessions.len(), 1);
    assert!(outcome.sessions[0].is_success());
    assert_eq!(outcome.sessions[0].completed, 4);
}

#[tokio::test]
async fn test_two_workers_share_the_job() {
    let spec = JobSpec::new(16, 8, 100);
    let params = FractalParams::new(-0.8, 0.156, 1.5);
    let workers = vec![
        address(spawn_worker(params).await),
        address(spawn_worker(params).await),
    ];

    let outcome = JobOrchestrator::new(spec, params)
        .with_workers(workers)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.grid, local_grid(spec, params).await);
    let total: usize = outcome.sessions.iter().map(|s| s.completed).sum();
    assert_eq!(total, 16);
    assert!(outcome.sessions.iter().all(|s| s.is_success()));
}

#[tokio::test]
async fn test_unreachable_worker_does_not_block_others() {
    let spec = JobSpec::new(6, 5, 40);
    let params = FractalParams::default();
    let live = spawn_worker(params).await;

    let outcome = JobOrchestrator::new(spec, params)
        .with_workers(vec![
            WorkerAddress::new("127.0.0.1", unused_port()),
            address(live),
        ])
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.grid, local_grid(spec, params).await);

    let dead = &outcome.sessions[0];
    assert_eq!(dead.state, SessionState::Failed);
    assert_eq!(dead.completed, 0);
    assert!(dead.error.as_ref().unwrap().is_connect_failure());
    assert_eq!(outcome.sessions[1].completed, 6);
}

#[tokio::test]
async fn test_requeued_rows_are_finished_by_another_session() {
    let spec = JobSpec::new(4, 3, 30);
    let params = FractalParams::default();
    let queue = Arc::new(TaskQueue::for_job(&spec));
    let aggregator = Arc::new(ResultAggregator::for_job(&spec));

    let dropping = WorkerSession::new(
        1,
        address(spawn_dropping_worker().await),
        Arc::clone(&queue),
        Arc::clone(&aggregator),
    )
    .run()
    .await;

    assert_eq!(dropping.state, SessionState::Failed);
    assert_eq!(dropping.completed, 0);
    assert!(!dropping.requeued.is_empty());
    assert_eq!(queue.len(), 4);
    assert_eq!(aggregator.completed(), 0);

    let healthy = WorkerSession::new(
        2,
        address(spawn_worker(params).await),
        Arc::clone(&queue),
        Arc::clone(&aggregator),
    )
    .run()
    .await;

    assert!(healthy.is_success());
    assert_eq!(healthy.completed, 4);
    assert!(queue.is_empty());
    assert_eq!(aggregator.snapshot(), local_grid(spec, params).await);
}

#[tokio::test]
async fn test_job_without_any_reachable_worker_fails() {
    let spec = JobSpec::new(3, 3, 10);
    let err = JobOrchestrator::new(spec, FractalParams::default())
        .with_workers(vec![WorkerAddress::new("127.0.0.1", unused_port())])
        .run()
        .await
        .unwrap_err();

    assert!(err.is_incomplete());
    insta::assert_snapshot!(err.to_string(), @"0 tasks finished while there are 3 tasks");
}
