//! End-to-end execution and finalization behavior of the task processor.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use taskflume::{
    ConnectionPool, Connector, FlumeError, Params, ScriptBody, ScriptContext, ScriptEngine,
    ScriptRepo, StoreConnection, Task, TaskProcessor, TaskStatus, EPHEMERAL_ID,
};
use tempfile::TempDir;

/// One recorded finalization, flattened for assertions.
#[derive(Clone, Debug, PartialEq)]
struct Finalized {
    id: i64,
    status: i32,
    result: Option<Vec<u8>>,
    error: Option<String>,
}

#[derive(Default)]
struct StoreLog {
    finalized: Mutex<Vec<Finalized>>,
    fail_finalize: AtomicBool,
    fail_connect: AtomicBool,
    broken: AtomicBool,
    connects: AtomicUsize,
}

impl StoreLog {
    fn entries(&self) -> Vec<Finalized> {
        self.finalized.lock().unwrap().clone()
    }
}

struct RecordingConn {
    log: Arc<StoreLog>,
}

#[async_trait]
impl StoreConnection for RecordingConn {
    async fn is_valid(&mut self) -> bool {
        !self.log.broken.load(Ordering::SeqCst)
    }

    async fn finalize(
        &mut self,
        id: i64,
        status: TaskStatus,
        result: Option<&[u8]>,
        error: Option<&str>,
    ) -> Result<(), FlumeError> {
        if self.log.fail_finalize.load(Ordering::SeqCst) {
            return Err(FlumeError::critical("store write failed"));
        }
        self.log.finalized.lock().unwrap().push(Finalized {
            id,
            status: status.code(),
            result: result.map(<[u8]>::to_vec),
            error: error.map(str::to_string),
        });
        Ok(())
    }
}

struct RecordingConnector {
    log: Arc<StoreLog>,
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, FlumeError> {
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        if self.log.fail_connect.load(Ordering::SeqCst) {
            return Err(FlumeError::critical("store unreachable"));
        }
        Ok(Box::new(RecordingConn {
            log: Arc::clone(&self.log),
        }))
    }
}

/// A scripted stand-in for the embedded execution environment.
enum TestEngine {
    Succeed,
    WriteSink(Vec<u8>),
    Fail(String),
    /// Breaks the store mid-script so a failed repair strands the context
    /// without a connection.
    LoseConnection(Arc<StoreLog>),
}

#[async_trait]
impl ScriptEngine for TestEngine {
    async fn run(
        &self,
        _body: &ScriptBody,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Option<String>, FlumeError> {
        match self {
            TestEngine::Succeed => Ok(None),
            TestEngine::WriteSink(bytes) => {
                ctx.sink().write(bytes);
                Ok(None)
            }
            TestEngine::Fail(msg) => Err(FlumeError::runtime(msg.clone())),
            TestEngine::LoseConnection(log) => {
                log.broken.store(true, Ordering::SeqCst);
                log.fail_connect.store(true, Ordering::SeqCst);
                ctx.repair().await?;
                Ok(None)
            }
        }
    }
}

async fn fixture(engine: TestEngine) -> (TaskProcessor<TestEngine>, Arc<StoreLog>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("job.py"), "print('hi')")
        .await
        .unwrap();

    let log = Arc::new(StoreLog::default());
    let pool = Arc::new(ConnectionPool::new(
        Arc::new(RecordingConnector {
            log: Arc::clone(&log),
        }),
        1,
    ));
    let processor = TaskProcessor::new(pool, Arc::new(engine), ScriptRepo::new(dir.path()));
    (processor, log, dir)
}

#[tokio::test]
async fn success_is_finalized_with_status_2_and_no_error() {
    let (processor, log, _dir) = fixture(TestEngine::Succeed).await;

    processor
        .execute(Task::new(7, "job.py", Params::None))
        .await
        .unwrap();

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, 7);
    assert_eq!(entries[0].status, 2);
    assert_eq!(entries[0].result, None);
    assert_eq!(entries[0].error, None);
}

#[tokio::test]
async fn engine_failure_is_finalized_with_status_3_and_message() {
    let (processor, log, _dir) = fixture(TestEngine::Fail("boom".into())).await;

    // The failure is recorded, not returned.
    processor
        .execute(Task::new(7, "job.py", Params::None))
        .await
        .unwrap();

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, 3);
    assert!(entries[0].error.as_deref().unwrap().contains("boom"));
}

#[tokio::test]
async fn missing_script_is_finalized_as_failure() {
    let (processor, log, _dir) = fixture(TestEngine::Succeed).await;

    processor
        .execute(Task::new(7, "nope.py", Params::None))
        .await
        .unwrap();

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, 3);
    assert!(entries[0].error.is_some());
}

#[tokio::test]
async fn ephemeral_task_skips_finalization() {
    let (processor, log, _dir) = fixture(TestEngine::Succeed).await;

    processor
        .execute(Task::new(EPHEMERAL_ID, "job.py", Params::None))
        .await
        .unwrap();

    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn connectionless_ephemeral_task_does_not_redial_the_store() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("job.py"), "print('hi')")
        .await
        .unwrap();

    let log = Arc::new(StoreLog::default());
    let pool = Arc::new(ConnectionPool::new(
        Arc::new(RecordingConnector {
            log: Arc::clone(&log),
        }),
        1,
    ));
    let processor = TaskProcessor::new(
        Arc::clone(&pool),
        Arc::new(TestEngine::LoseConnection(Arc::clone(&log))),
        ScriptRepo::new(dir.path()),
    );

    processor
        .execute(Task::new(EPHEMERAL_ID, "job.py", Params::None))
        .await
        .unwrap();

    // One dial for the initial acquire; none to finalize a task that has no
    // durable row.
    assert_eq!(log.connects.load(Ordering::SeqCst), 1);
    assert!(log.entries().is_empty());

    // The slot freed by the lost connection must be usable again.
    log.broken.store(false, Ordering::SeqCst);
    log.fail_connect.store(false, Ordering::SeqCst);
    let conn = pool.acquire().await.unwrap();
    pool.release(conn).await;
}

#[tokio::test]
async fn sink_bytes_become_the_finalized_result() {
    let (processor, log, _dir) = fixture(TestEngine::WriteSink(b"output".to_vec())).await;

    processor
        .execute(Task::new(7, "job.py", Params::None))
        .await
        .unwrap();

    let entries = log.entries();
    assert_eq!(entries[0].result.as_deref(), Some(b"output".as_slice()));
}

#[tokio::test]
async fn finalize_failure_still_releases_the_connection() {
    let (processor, log, _dir) = fixture(TestEngine::Succeed).await;
    log.fail_finalize.store(true, Ordering::SeqCst);

    // Swallowed: the task outcome is lost but the processor stays healthy.
    processor
        .execute(Task::new(7, "job.py", Params::None))
        .await
        .unwrap();
    assert!(log.entries().is_empty());

    // The single pool slot must be free again.
    log.fail_finalize.store(false, Ordering::SeqCst);
    processor
        .execute(Task::new(8, "job.py", Params::None))
        .await
        .unwrap();
    assert_eq!(log.entries().len(), 1);
    assert_eq!(log.entries()[0].id, 8);
}

#[tokio::test]
async fn unreachable_store_escapes_as_critical() {
    let (processor, log, _dir) = fixture(TestEngine::Succeed).await;
    log.fail_connect.store(true, Ordering::SeqCst);

    let err = processor
        .execute(Task::new(7, "job.py", Params::None))
        .await
        .unwrap_err();
    assert!(err.is_critical());
}
