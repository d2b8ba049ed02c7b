//! # Demo: two suppliers feeding one processor
//!
//! Wires the full path together with in-memory stand-ins:
//!
//! - a [`ScheduledSupplier`] gets three ad-hoc tasks with durable ids, so
//!   their outcomes are finalized against the (printing) store connection;
//! - a [`BrokerSupplier`] decodes payloads pushed to a [`MemoryBroker`] into
//!   ephemeral tasks, which run but skip finalization.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use taskflume::{
    BrokerSupplier, Config, ConnectionPool, Connector, CronSpec, Dispatch, Dispatcher, FlumeError,
    MemoryBroker, Params, ScheduledSupplier, ScriptBody, ScriptContext, ScriptEngine, ScriptRepo,
    StoreConnection, TaskProcessor, TaskStatus,
};

struct PrintStore;

#[async_trait]
impl StoreConnection for PrintStore {
    async fn is_valid(&mut self) -> bool {
        true
    }

    async fn finalize(
        &mut self,
        id: i64,
        status: TaskStatus,
        result: Option<&[u8]>,
        error: Option<&str>,
    ) -> Result<(), FlumeError> {
        println!(
            "[store] finalize #{id}: status={} result={:?} error={:?}",
            status.code(),
            result.map(String::from_utf8_lossy),
            error
        );
        Ok(())
    }
}

struct PrintConnector;

#[async_trait]
impl Connector for PrintConnector {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, FlumeError> {
        println!("[store] opening connection");
        Ok(Box::new(PrintStore))
    }
}

/// "Runs" a script by echoing it; a real embedder binds an interpreter here.
struct EchoEngine;

#[async_trait]
impl ScriptEngine for EchoEngine {
    async fn run(
        &self,
        body: &ScriptBody,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Option<String>, FlumeError> {
        println!(
            "[engine] task #{}: script '{}' with params '{}'",
            ctx.task_id(),
            body.name,
            ctx.params()
        );
        ctx.sink().write(body.text.as_bytes());
        Ok(Some("echoed".into()))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let scripts = tempfile::tempdir()?;
    tokio::fs::write(scripts.path().join("greet.echo"), "hello from a script body").await?;

    let pool = Arc::new(ConnectionPool::new(Arc::new(PrintConnector), 2));
    let processor: Arc<dyn Dispatch> = Arc::new(TaskProcessor::new(
        pool,
        Arc::new(EchoEngine),
        ScriptRepo::new(scripts.path()),
    ));

    // Ad-hoc tasks with durable ids: executed and finalized.
    let scheduled = ScheduledSupplier::new(
        "scheduled",
        Arc::clone(&processor),
        CronSpec::parse("0 3 * * *")?,
        "greet.echo",
        Params::None,
    );
    scheduled.add(scheduled.task(1, "greet.echo", Params::Text("first".into())))?;
    scheduled.add(scheduled.task(2, "greet.echo", Params::Text("second".into())))?;
    scheduled.add(scheduled.task(3, "missing.echo", Params::None))?; // finalized as failed

    // Broker payloads: decoded into ephemeral tasks, no finalization.
    let broker = Arc::new(MemoryBroker::new());
    broker.push("demo", r#"{"script":"greet.echo","params":"from the queue"}"#);
    broker.push("demo", r#"{"script":"greet.echo","params":{"run":2}}"#);
    let supplier = BrokerSupplier::new("broker", broker, "demo", processor, 2);

    let mut host = Dispatcher::new(Config::default());
    host.register(scheduled);
    host.register(Arc::new(supplier));

    // Run briefly instead of waiting for an OS signal.
    let token = CancellationToken::new();
    let stop = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        stop.cancel();
    });
    host.run_until(token).await?;
    Ok(())
}
