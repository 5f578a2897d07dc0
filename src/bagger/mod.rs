// Bagger
//
// VECTOR PREP builds bags for modeling; to do this you need to...
// [a] grab db lines that are relevant to the search
// [b] turn them into a unified text block
// [c] do some preliminary cleanups
// [d] break the text into sentences tagged with a source locus
// [e] figure out all of the words used in the passage
// [f] find all of the parsing info relative to these words
// [g] figure out which headwords to associate with the collection of words
// [h] build the lemmatized bags of words ('unlemmatized' skips [e]-[h])
// [i] purge stopwords
// [j] store the bags
//
// once the bags are stored the vector consumer can fetch them and train
// its model

pub mod loader;
pub mod methods;
pub mod morphology;
pub mod stopwords;
pub mod text;

use std::time::Instant;

use tracing::{debug, info};

pub use methods::BaggingMethod;
pub use text::SentenceWithLocus;

use crate::db::{PgPool, PrerolledQuery, Workline};
use crate::error::Result;
use crate::search;
use crate::store::QueueStore;

pub struct BaggerOptions {
    pub key: String,
    pub method: BaggingMethod,
    pub workers: usize,
    pub sentences_per_bag: usize,
    /// Direct-range fallback, used when `key` is empty.
    pub direct_db: String,
    pub direct_start: i32,
    pub direct_end: i32,
    /// Overrides for the embedded skip lists.
    pub skip_headwords: Option<String>,
    pub skip_inflected: Option<String>,
}

/// Take a key; grab lines; bag them; store them. Returns the result key and
/// the number of bags stored under it.
pub async fn run_bagger(
    opts: &BaggerOptions,
    store: &QueueStore,
    pool: &PgPool,
) -> Result<(String, usize)> {
    let status_key = format!("{}_statusmessage", opts.key);
    let mut timer = PhaseTimer::new();
    info!("Seeking to build *{}* bags of words", opts.method);

    // [A] grab the db lines
    let lines = if opts.key.is_empty() {
        info!("No queue key; gathering lines with a direct PostgreSQL query");
        acquire_directly(&opts.direct_db, opts.direct_start, opts.direct_end, pool).await?
    } else {
        search::record_initial_workpile(&opts.key, store).await?;
        acquire_from_queue(&opts.key, store, pool).await?
    };
    breadcrumb(store, &status_key, &mut timer, "A", &format!("{} lines acquired", lines.len())).await;

    // [B] turn them into a unified text block
    let block = text::build_text_block(&lines);
    breadcrumb(store, &status_key, &mut timer, "B", "Unified text block built").await;

    // [C] do some preliminary cleanups
    let block = text::normalize(&block);
    breadcrumb(store, &status_key, &mut timer, "C", "Preliminary cleanups complete").await;

    // [D] break the text into located sentences
    let sentences = text::split_into_sentences(&block);
    let sentences = text::group_sentences(sentences, opts.sentences_per_bag);
    breadcrumb(store, &status_key, &mut timer, "D", &format!("Found {} sentences", sentences.len())).await;

    let bags = match opts.method {
        // unlemmatized customers have reached their target already
        BaggingMethod::Unlemmatized => sentences,
        method => {
            // [E] figure out all of the words used in the passage
            let all_words = text::vocabulary(&sentences);
            breadcrumb(store, &status_key, &mut timer, "E", &format!("Found {} distinct words", all_words.len())).await;

            // [F] find all of the parsing info relative to these words
            let word_list: Vec<String> = all_words.iter().cloned().collect();
            let morph = morphology::lookup_morphology(word_list, opts.workers, pool).await?;
            breadcrumb(store, &status_key, &mut timer, "F", &format!("Got morphology for {} terms", morph.len())).await;

            // [G] associate headwords with the collection of words
            let parsemap = morphology::build_headword_map(&all_words, &morph);
            breadcrumb(store, &status_key, &mut timer, "G", &format!("Built morphmap for {} terms", parsemap.len())).await;

            // [H] build the lemmatized bags of words
            let bags = match method {
                BaggingMethod::Flat => methods::build_flat_bags(sentences, &parsemap),
                BaggingMethod::Alternates => methods::build_composite_bags(sentences, &parsemap),
                BaggingMethod::WinnerTakesAll => {
                    methods::build_winner_takes_all_bags(sentences, &parsemap, pool).await?
                }
                BaggingMethod::Unlemmatized => unreachable!("handled before lemmatization"),
            };
            breadcrumb(store, &status_key, &mut timer, "H", &format!("Finished bagging {} bags", bags.len())).await;
            bags
        }
    };

    // [I] purge stopwords
    let headwords_to_skip = opts.skip_headwords.as_deref().unwrap_or(stopwords::SKIP_HEADWORDS);
    let inflected_to_skip = opts.skip_inflected.as_deref().unwrap_or(stopwords::SKIP_INFLECTED);
    let bags = stopwords::drop_stopwords(headwords_to_skip, bags);
    let bags = stopwords::drop_stopwords(inflected_to_skip, bags);
    let bags = stopwords::discard_empty_bags(bags);
    breadcrumb(store, &status_key, &mut timer, "I", &format!("Cleared stopwords: {} bags remain", bags.len())).await;

    // [J] store...
    let prefix = opts.key.split('_').next().unwrap_or_default();
    let result_key = format!("{}_vectorresults", prefix);
    let stored = bags.len();
    loader::load_the_bags(&result_key, opts.workers, bags, store).await?;
    breadcrumb(store, &status_key, &mut timer, "J", "Finished loading").await;

    if !opts.key.is_empty() {
        store.set_int(&format!("{}_poolofwork", opts.key), -1).await?;
        store.set_int(&format!("{}_hitcount", opts.key), 0).await?;
    }

    Ok((result_key, stored))
}

// The acquisition loop mirrors the search pool, but the rows accumulate
// locally instead of landing in the result set and the hitcount doubles as
// a progress counter.
async fn acquire_from_queue(key: &str, store: &QueueStore, pool: &PgPool) -> Result<Vec<Workline>> {
    let conn = pool.get().await?;
    let remaining_key = format!("{}_remaining", key);
    let hitcount_key = format!("{}_hitcount", key);

    let mut lines = Vec::new();
    loop {
        let Some(payload) = store.pop_one(key).await? else {
            break;
        };

        let remaining = store.cardinality(key).await?;
        if let Err(e) = store.set_int(&remaining_key, remaining).await {
            debug!("could not refresh the remaining count: {}", e);
        }

        let prq: PrerolledQuery = serde_json::from_str(&payload)?;
        for line in search::execute_prerolled(&conn, &prq).await? {
            lines.push(line);
            if lines.len() % 1000 == 0 {
                if let Err(e) = store.set_int(&hitcount_key, lines.len() as i64).await {
                    debug!("could not refresh the hitcount: {}", e);
                }
            }
        }
    }

    Ok(lines)
}

// No queue key: a single range query stands in for the whole drain. The
// columns of a bare `SELECT *` arrive minor-swapped relative to the
// pre-rolled queries.
async fn acquire_directly(db: &str, start: i32, end: i32, pool: &PgPool) -> Result<Vec<Workline>> {
    let conn = pool.get().await?;
    let query = format!("SELECT * FROM {} WHERE index BETWEEN {} AND {}", db, start, end);
    let rows = conn.query(query.as_str(), &[]).await?;
    rows.iter().map(Workline::from_direct_row).collect()
}

struct PhaseTimer {
    start: Instant,
    previous: Instant,
}

impl PhaseTimer {
    fn new() -> Self {
        let now = Instant::now();
        Self { start: now, previous: now }
    }

    fn mark(&mut self, phase: &str, message: &str) {
        let now = Instant::now();
        debug!(
            "[{}: {:.3}s][Δ: {:.3}s] {}",
            phase,
            (now - self.start).as_secs_f64(),
            (now - self.previous).as_secs_f64(),
            message
        );
        self.previous = now;
    }
}

// Progress breadcrumbs are best-effort; losing one must not sink the run.
async fn breadcrumb(
    store: &QueueStore,
    status_key: &str,
    timer: &mut PhaseTimer,
    phase: &str,
    message: &str,
) {
    if let Err(e) = store.set_text(status_key, message).await {
        debug!("could not write the status message: {}", e);
    }
    timer.mark(phase, message);
}
