// Morphology and headword lookups
//
// The vocabulary is split into a Latin and a Greek partition, sharded across
// the workers, and each shard is resolved with the temp-table-array pattern:
//
//   CREATE TEMPORARY TABLE ttw_<lang>_<n>_<uuid> AS
//       SELECT words AS w FROM unnest(ARRAY['dolor', 'amor', 'lusus']) words;
//   SELECT observed_form, xrefs, prefixrefs, possible_dictionary_forms
//       FROM latin_morphology WHERE EXISTS
//       (SELECT 1 FROM ttw_... temptable WHERE temptable.w = latin_morphology.observed_form);
//
// Temp tables are session-scoped, so a shard holds one pooled connection for
// the create/select/drop sequence. Under heavy pool churn the create can race
// against visibility; a failed shard is retried on the same inputs and, after
// the retry budget, abandoned so its words stay unlemmatized.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::PgPool;
use crate::error::Result;

/// Attempts per morphology shard before its words are given up on.
pub const MORPH_LOOKUP_RETRIES: usize = 3;

static POSSIBILITY_SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<possibility_\d{1,2}>.*?</possibility_\d{1,2}>").expect("possibility span regex")
});

static POSSIBILITY_PARSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(<possibility_(\d{1,2})>)(.*?)<xref_value>(.*?)</xref_value><xref_kind>(.*?)</xref_kind>(.*?)</possibility_\d{1,2}>",
    )
    .expect("possibility parse regex")
});

/// A parsed-morphology record keyed by observed form.
#[derive(Debug, Clone, Default)]
pub struct MorphEntry {
    pub observed: String,
    pub xrefs: String,
    pub prefix_xrefs: String,
    pub raw_possibilities: String,
    /// Distinct `<possibility_n>...</possibility_n>` spans seen for this form.
    pub unique_possibilities: HashSet<String>,
}

/// One candidate lemma for an observed form.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphPossibility {
    pub observed: String,
    pub number: String,
    pub entry: String,
    pub xref: String,
    pub transl_analysis: String,
}

impl MorphPossibility {
    /// Parse one possibility span.
    ///
    /// The entry text can arrive as "bellī, bellus"; the headword is the
    /// second comma-separated component when one exists.
    pub fn parse(observed: &str, possibility: &str) -> Option<Self> {
        let caps = POSSIBILITY_PARSE_RE.captures(possibility)?;
        let raw_entry = caps.get(3).map_or("", |m| m.as_str());
        let pieces: Vec<&str> = raw_entry.split(',').collect();
        let entry = if pieces.len() == 1 { pieces[0] } else { pieces[1] };

        Some(Self {
            observed: observed.to_string(),
            number: caps.get(2).map_or("", |m| m.as_str()).to_string(),
            entry: entry.trim().to_string(),
            xref: caps.get(4).map_or("", |m| m.as_str()).to_string(),
            transl_analysis: caps.get(6).map_or("", |m| m.as_str()).to_string(),
        })
    }
}

/// Extract the set of distinct possibility spans from a raw payload.
pub fn possibility_spans(raw: &str) -> HashSet<String> {
    POSSIBILITY_SPAN_RE
        .find_iter(raw)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Latin tokens contain an ASCII lowercase letter; everything else is Greek.
pub fn partition_by_language(words: &[String]) -> (Vec<String>, Vec<String>) {
    let mut latin = Vec::new();
    let mut greek = Vec::new();
    for word in words {
        if word.chars().any(|c| c.is_ascii_lowercase()) {
            latin.push(word.clone());
        } else {
            greek.push(word.clone());
        }
    }
    (latin, greek)
}

/// Uppercase the first letter, leaving the rest alone.
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// Sentence-initial names reach the morphology tables capitalized, so each
// token is looked up in both spellings.
fn with_title_variants(words: Vec<String>) -> Vec<String> {
    let mut all = Vec::with_capacity(words.len() * 2);
    for word in words {
        let titled = title_case(&word);
        if titled != word {
            all.push(titled);
        }
        all.push(word);
    }
    all
}

/// Find the parsing info for every word in the vocabulary.
pub async fn lookup_morphology(
    words: Vec<String>,
    workers: usize,
    pool: &PgPool,
) -> Result<HashMap<String, MorphEntry>> {
    let (latin, greek) = partition_by_language(&words);

    let mut found = HashMap::new();
    for (language, list) in [("latin", latin), ("greek", greek)] {
        for shard_map in sharded_lookup(language, with_title_variants(list), workers, pool).await? {
            for (observed, entry) in shard_map {
                merge_entry(&mut found, observed, entry);
            }
        }
    }

    debug!("found morphology for {} observed forms", found.len());
    Ok(found)
}

// Scatter the shard queries, gather their maps over a channel.
async fn sharded_lookup(
    language: &'static str,
    words: Vec<String>,
    workers: usize,
    pool: &PgPool,
) -> Result<Vec<HashMap<String, MorphEntry>>> {
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let shards = shard_words(words, workers);
    let (tx, mut rx) = mpsc::channel(shards.len());

    let mut tasks = JoinSet::new();
    for (shard_index, shard) in shards.into_iter().enumerate() {
        let pool = pool.clone();
        let tx = tx.clone();
        tasks.spawn(async move {
            let map = lookup_shard(language, shard_index, shard, &pool).await;
            let _ = tx.send(map).await;
        });
    }
    drop(tx);

    let mut results = Vec::new();
    while let Some(map) = rx.recv().await {
        results.push(map);
    }
    while let Some(joined) = tasks.join_next().await {
        joined?;
    }

    Ok(results)
}

/// Every token lands in exactly one shard; the last shard may run short.
fn shard_words(words: Vec<String>, workers: usize) -> Vec<Vec<String>> {
    let workers = workers.max(1);
    let chunk = words.len().div_ceil(workers);
    words.chunks(chunk.max(1)).map(<[String]>::to_vec).collect()
}

async fn lookup_shard(
    language: &'static str,
    shard_index: usize,
    words: Vec<String>,
    pool: &PgPool,
) -> HashMap<String, MorphEntry> {
    for attempt in 1..=MORPH_LOOKUP_RETRIES {
        match query_shard(language, shard_index, &words, pool).await {
            Ok(found) => return found,
            Err(e) => warn!(
                "morphology shard {}/{} failed on attempt {}: {}",
                language, shard_index, attempt, e
            ),
        }
    }

    warn!(
        "abandoning morphology shard {}/{}: {} words stay unlemmatized",
        language,
        shard_index,
        words.len()
    );
    HashMap::new()
}

async fn query_shard(
    language: &str,
    shard_index: usize,
    words: &[String],
    pool: &PgPool,
) -> Result<HashMap<String, MorphEntry>> {
    let conn = pool.get().await?;

    let table = format!("ttw_{}_{}_{}", language, shard_index, Uuid::new_v4().simple());
    let create = format!(
        "CREATE TEMPORARY TABLE {} AS SELECT words AS w FROM unnest(ARRAY[{}]) words",
        table,
        quoted_array(words)
    );
    conn.batch_execute(&create).await?;

    let select = format!(
        "SELECT observed_form, xrefs, prefixrefs, possible_dictionary_forms FROM {lang}_morphology \
         WHERE EXISTS (SELECT 1 FROM {table} temptable WHERE temptable.w = {lang}_morphology.observed_form)",
        lang = language,
        table = table
    );
    let queried = conn.query(select.as_str(), &[]).await;

    // the table must not outlive the shard even when the select fails
    let dropped = conn
        .batch_execute(&format!("DROP TABLE IF EXISTS {}", table))
        .await;

    let rows = queried?;
    dropped?;

    let mut found = HashMap::new();
    for row in rows {
        let raw: String = row.try_get::<_, Option<String>>(3)?.unwrap_or_default();
        let entry = MorphEntry {
            observed: row.try_get::<_, Option<String>>(0)?.unwrap_or_default(),
            xrefs: row.try_get::<_, Option<String>>(1)?.unwrap_or_default(),
            prefix_xrefs: row.try_get::<_, Option<String>>(2)?.unwrap_or_default(),
            unique_possibilities: possibility_spans(&raw),
            raw_possibilities: raw,
        };
        merge_entry(&mut found, entry.observed.clone(), entry);
    }

    Ok(found)
}

// The observed-form/headword relation is many-to-many: a form already seen
// only contributes any new possibility spans.
fn merge_entry(into: &mut HashMap<String, MorphEntry>, observed: String, entry: MorphEntry) {
    match into.get_mut(&observed) {
        Some(existing) => existing
            .unique_possibilities
            .extend(entry.unique_possibilities),
        None => {
            into.insert(observed, entry);
        }
    }
}

/// Associate every observed form with its candidate headwords.
///
/// Forms with no morphology row map to themselves so unparsed proper names
/// survive into the bags.
pub fn build_headword_map(
    words: &HashSet<String>,
    morph: &HashMap<String, MorphEntry>,
) -> HashMap<String, Vec<String>> {
    let mut map = HashMap::with_capacity(words.len());

    for (observed, entry) in morph {
        let mut candidates = Vec::new();
        for span in &entry.unique_possibilities {
            if let Some(possibility) = MorphPossibility::parse(observed, span) {
                candidates.push(possibility.entry);
            }
        }
        map.insert(observed.clone(), candidates);
    }

    for word in words {
        map.entry(word.clone())
            .or_insert_with(|| vec![word.clone()]);
    }

    map
}

/// Corpus occurrence counts for a set of headwords, via the same
/// temp-table-array pattern as the morphology lookup. Headwords missing from
/// the count table simply score nothing.
pub async fn fetch_headword_counts(
    headwords: &HashSet<String>,
    pool: &PgPool,
) -> Result<HashMap<String, i32>> {
    if headwords.is_empty() {
        return Ok(HashMap::new());
    }

    let conn = pool.get().await?;

    let table = format!("temporary_headwordlist_{}", Uuid::new_v4().simple());
    let list: Vec<String> = headwords.iter().cloned().collect();
    let create = format!(
        "CREATE TEMPORARY TABLE {} AS SELECT headwords AS hw FROM unnest(ARRAY[{}]) headwords",
        table,
        quoted_array(&list)
    );
    conn.batch_execute(&create).await?;

    let select = format!(
        "SELECT entry_name, total_count FROM dictionary_headword_wordcounts \
         WHERE EXISTS (SELECT 1 FROM {} temptable WHERE temptable.hw = dictionary_headword_wordcounts.entry_name)",
        table
    );
    let queried = conn.query(select.as_str(), &[]).await;
    let dropped = conn
        .batch_execute(&format!("DROP TABLE IF EXISTS {}", table))
        .await;

    let rows = queried?;
    dropped?;

    let mut counts = HashMap::new();
    for row in rows {
        let word: String = row.try_get(0)?;
        let count: i32 = row.try_get(1)?;
        counts.insert(word, count);
    }

    Ok(counts)
}

// Tokens were reduced to the alphabet whitelist upstream, but quoting stays
// defensive about stray apostrophes all the same.
fn quoted_array(words: &[String]) -> String {
    words
        .iter()
        .map(|w| format!("'{}'", w.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}
