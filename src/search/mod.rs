// Search Pool
//
// The searcher is pointedly basic:
// [a] it looks to the queue store for a pile of SQL queries that were pre-rolled
// [b] it asks PostgreSQL to execute these queries
// [c] it stores the results back on the queue store
// [d] it also updates the progress poll data relative to this search
//
// Workers never share in-process state; the atomic set-pop and the result
// set are the only coordination points. Reaching the hit cap deletes the
// queue, which the other workers observe as the empty sentinel on their
// next pop.

use tokio::task::JoinSet;
use tokio_postgres::Client;
use tracing::{debug, trace};

use crate::db::{PgPool, PrerolledQuery, Workline};
use crate::error::Result;
use crate::store::QueueStore;

/// Drain the pre-rolled queries stored under `key` with a pool of workers
/// and return the key of the accumulated result set.
pub async fn run_search(
    key: &str,
    cap: i64,
    workers: usize,
    store: &QueueStore,
    pool: &PgPool,
) -> Result<String> {
    record_initial_workpile(key, store).await?;

    let mut tasks = JoinSet::new();
    for worker_id in 0..workers {
        let store = store.clone();
        let pool = pool.clone();
        let key = key.to_string();
        tasks.spawn(async move { search_worker(worker_id, cap, &key, &store, &pool).await });
    }

    while let Some(joined) = tasks.join_next().await {
        joined??;
    }

    Ok(format!("{}_results", key))
}

async fn search_worker(
    worker_id: usize,
    cap: i64,
    key: &str,
    store: &QueueStore,
    pool: &PgPool,
) -> Result<()> {
    trace!("Hello from search worker {}", worker_id);

    // one session for the whole drain: temp-table DDL in a descriptor must
    // land on the same connection as its main query
    let conn = pool.get().await?;

    let result_key = format!("{}_results", key);
    let remaining_key = format!("{}_remaining", key);
    let hitcount_key = format!("{}_hitcount", key);

    loop {
        let Some(payload) = store.pop_one(key).await? else {
            break;
        };

        let remaining = store.cardinality(key).await?;
        if let Err(e) = store.set_int(&remaining_key, remaining).await {
            trace!("worker {} could not refresh the remaining count: {}", worker_id, e);
        }
        trace!("worker {} says that {} items remain", worker_id, remaining);

        let prq: PrerolledQuery = serde_json::from_str(&payload)?;
        let lines = execute_prerolled(&conn, &prq).await?;

        // guard before the commit as well as after it: a cap of 0 keeps the
        // result set empty while the queue still drains
        let stored = store.cardinality(&result_key).await?;
        if stored >= cap {
            store.delete(key).await?;
            continue;
        }

        let batch = lines
            .iter()
            .map(|line| serde_json::to_string(line))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        store.add_all(&result_key, &batch).await?;

        let hitcount = store.cardinality(&result_key).await?;
        if let Err(e) = store.set_int(&hitcount_key, hitcount).await {
            trace!("worker {} could not refresh the hitcount: {}", worker_id, e);
        }
        trace!("worker {} reports that the hitcount is {}", worker_id, hitcount);

        if hitcount >= cap {
            store.delete(key).await?;
        }
    }

    Ok(())
}

/// Execute one descriptor on a single session: the optional temp-table DDL
/// first, then the main query with its optional bind parameter. Shared with
/// the bagger's acquisition phase.
pub(crate) async fn execute_prerolled(client: &Client, prq: &PrerolledQuery) -> Result<Vec<Workline>> {
    if !prq.temp_table.is_empty() {
        client.batch_execute(&prq.temp_table).await?;
    }

    let rows = if prq.data.is_empty() {
        client.query(prq.query.as_str(), &[]).await?
    } else {
        client.query(prq.query.as_str(), &[&prq.data]).await?
    };

    rows.iter().map(Workline::from_queue_row).collect()
}

/// Snapshot the initial queue cardinality into `key_poolofwork`.
pub(crate) async fn record_initial_workpile(key: &str, store: &QueueStore) -> Result<i64> {
    let remain = store.cardinality(key).await?;
    store.set_int(&format!("{}_poolofwork", key), remain).await?;
    debug!("initial size of the workpile for '{}' is {}", key, remain);
    Ok(remain)
}

/// Re-read the final result-set size for the stdout contract.
pub async fn final_hit_count(key: &str, store: &QueueStore) -> Result<i64> {
    store.cardinality(&format!("{}_results", key)).await
}
