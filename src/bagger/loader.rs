// Parallel result loading
//
// The finished bags are sharded into one chunk per worker; each loader
// serializes its chunk and adds the bags to the result set one by one. A
// serialization failure is fatal: a partial result set is worse than none.

use tokio::task::JoinSet;
use tracing::trace;

use crate::bagger::text::SentenceWithLocus;
use crate::error::Result;
use crate::store::QueueStore;

pub async fn load_the_bags(
    result_key: &str,
    workers: usize,
    bags: Vec<SentenceWithLocus>,
    store: &QueueStore,
) -> Result<()> {
    let mut tasks = JoinSet::new();
    for (worker_id, chunk) in chunk_bags(bags, workers).into_iter().enumerate() {
        let store = store.clone();
        let result_key = result_key.to_string();
        tasks.spawn(async move { load_chunk(worker_id, &result_key, chunk, &store).await });
    }

    while let Some(joined) = tasks.join_next().await {
        joined??;
    }

    Ok(())
}

async fn load_chunk(
    worker_id: usize,
    result_key: &str,
    bags: Vec<SentenceWithLocus>,
    store: &QueueStore,
) -> Result<()> {
    trace!("loader {} storing {} bags", worker_id, bags.len());
    for bag in &bags {
        let serialized = serde_json::to_string(bag)?;
        store.add(result_key, &serialized).await?;
    }
    Ok(())
}

// Even chunks, with the last one absorbing the remainder. Leave no
// sentence behind.
fn chunk_bags(bags: Vec<SentenceWithLocus>, workers: usize) -> Vec<Vec<SentenceWithLocus>> {
    let workers = workers.max(1);
    let total = bags.len();
    if total <= workers {
        return vec![bags];
    }

    let chunk_size = total / workers;
    let mut chunks: Vec<Vec<SentenceWithLocus>> = Vec::with_capacity(workers);
    let mut start = 0;
    for _ in 0..workers {
        chunks.push(bags[start..start + chunk_size].to_vec());
        start += chunk_size;
    }
    if start < total {
        if let Some(last) = chunks.last_mut() {
            last.extend_from_slice(&bags[start..]);
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bags(n: usize) -> Vec<SentenceWithLocus> {
        (0..n)
            .map(|i| SentenceWithLocus {
                locus: format!("line/w/{}", i),
                sentence: format!("bag{}", i),
            })
            .collect()
    }

    #[test]
    fn test_chunking_loses_no_bag() {
        let chunks = chunk_bags(bags(23), 5);
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 23);
        // the remainder rides along with the last chunk
        assert_eq!(chunks[4].len(), 7);
        assert_eq!(chunks[4].last().map(|b| b.sentence.as_str()), Some("bag22"));
    }

    #[test]
    fn test_small_workloads_stay_in_one_chunk() {
        let chunks = chunk_bags(bags(3), 5);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 3);
    }

    #[test]
    fn test_exact_division_has_no_remainder() {
        let chunks = chunk_bags(bags(20), 5);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.len() == 4));
    }
}
