use std::sync::Arc;
use std::time::Duration;

use enginepool::logging::{self, info};
use enginepool::{Engine, EngineResult, PoolConfig, PoolError, Supervisor};

// A toy engine: each context counts the scripts it ran
struct CounterEngine;

struct CounterContext {
    index: usize,
    executed: u64,
}

impl Engine for CounterEngine {
    type Context = CounterContext;
    type Symbol = Arc<str>;

    fn startup(&self, num_workers: usize) -> EngineResult<()> {
        info!(num_workers, "engine starting");
        Ok(())
    }

    fn shutdown(&self) {
        info!("engine stopped");
    }

    fn create_context(&self, index: usize) -> EngineResult<CounterContext> {
        Ok(CounterContext { index, executed: 0 })
    }

    fn teardown_context(&self, index: usize, context: CounterContext) {
        info!(worker = index, executed = context.executed, "context released");
    }

    fn intern(&self, key: &str) -> Arc<str> {
        Arc::from(key)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_development();

    let supervisor = Arc::new(Supervisor::new(
        Arc::new(CounterEngine),
        PoolConfig::with_workers(4),
    )?);
    supervisor.initialize().await?;

    if let Some(symbol) = supervisor.common_header("user-agent") {
        info!(%symbol, "user-agent is cached");
    }

    let mut requests = Vec::new();
    for request in 0..16u64 {
        let supervisor = Arc::clone(&supervisor);
        requests.push(tokio::spawn(async move {
            loop {
                match supervisor.acquire() {
                    Ok(mut worker) => {
                        return worker
                            .execute(move |ctx: &mut CounterContext| {
                                std::thread::sleep(Duration::from_millis(10));
                                ctx.executed += 1;
                                (ctx.index, request)
                            })
                            .await;
                    }
                    // Every worker busy: back off and retry
                    Err(PoolError::ResourceExhaustion { .. }) => {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    Err(e) => return Err(e),
                }
            }
        }));
    }

    for request in requests {
        let (worker, id) = request.await??;
        println!("request {id} served by worker {worker}");
    }

    supervisor.drain().await?;
    println!("pool drained, final state: {}", supervisor.state());
    Ok(())
}
