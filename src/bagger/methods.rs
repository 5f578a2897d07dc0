// Bagging methods
//
// A closed enumeration with one dispatch point in the pipeline. The builders
// rewrite each sentence through the observed-form -> candidate-headwords map:
//
//   flat:       ϲυγγενεύϲ ϲυγγενήϲ      (all candidates side by side)
//   alternates: ϲυγγενεύϲ·ϲυγγενήϲ      (yoked so the alternation stays one token)
//   winner:     the dominant homonym only; "esse" always scores as "sum", never "edo"

use std::collections::{HashMap, HashSet};

use clap::ValueEnum;

use crate::bagger::morphology::fetch_headword_counts;
use crate::bagger::text::SentenceWithLocus;
use crate::db::PgPool;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BaggingMethod {
    Flat,
    Alternates,
    Unlemmatized,
    #[value(name = "winnertakesall")]
    WinnerTakesAll,
}

impl std::fmt::Display for BaggingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Flat => "flat",
            Self::Alternates => "alternates",
            Self::Unlemmatized => "unlemmatized",
            Self::WinnerTakesAll => "winnertakesall",
        };
        write!(f, "{}", name)
    }
}

/// Scoring element for winner-takes-all.
#[derive(Debug, Clone)]
pub struct WeightedHeadword {
    pub word: String,
    pub count: i32,
}

/// Replace each observed form by all of its candidate headwords, space-joined.
pub fn build_flat_bags(
    mut bags: Vec<SentenceWithLocus>,
    parsemap: &HashMap<String, Vec<String>>,
) -> Vec<SentenceWithLocus> {
    for bag in &mut bags {
        let mut new_words: Vec<&str> = Vec::new();
        for word in bag.sentence.split_whitespace() {
            if let Some(candidates) = parsemap.get(word) {
                new_words.extend(candidates.iter().map(String::as_str));
            }
        }
        let rewritten = new_words.join(" ");
        bag.sentence = rewritten;
    }
    bags
}

/// Replace each observed form by its candidates joined with an interpunct,
/// keeping the alternation a single token.
pub fn build_composite_bags(
    mut bags: Vec<SentenceWithLocus>,
    parsemap: &HashMap<String, Vec<String>>,
) -> Vec<SentenceWithLocus> {
    for bag in &mut bags {
        let mut new_words: Vec<String> = Vec::new();
        for word in bag.sentence.split_whitespace() {
            if let Some(candidates) = parsemap.get(word) {
                new_words.push(candidates.join("·"));
            }
        }
        let rewritten = new_words.join(" ");
        bag.sentence = rewritten;
    }
    bags
}

/// Keep only the candidate with the highest corpus occurrence count for each
/// observed form, then reduce as `flat`.
pub async fn build_winner_takes_all_bags(
    bags: Vec<SentenceWithLocus>,
    parsemap: &HashMap<String, Vec<String>>,
    pool: &PgPool,
) -> Result<Vec<SentenceWithLocus>> {
    let mut all_headwords = HashSet::new();
    for candidates in parsemap.values() {
        for headword in candidates {
            all_headwords.insert(headword.clone());
        }
    }

    let scores = fetch_headword_counts(&all_headwords, pool).await?;
    let winners = prune_to_winners(parsemap, &scores);

    Ok(build_flat_bags(bags, &winners))
}

// Both keys and candidates are lowered before scoring; unfound headwords
// score 0 and are retained, ties go to input order (the sort is stable).
pub(crate) fn prune_to_winners(
    parsemap: &HashMap<String, Vec<String>>,
    scores: &HashMap<String, i32>,
) -> HashMap<String, Vec<String>> {
    let mut winners = HashMap::with_capacity(parsemap.len());

    for (observed, candidates) in parsemap {
        let mut weighted: Vec<WeightedHeadword> = candidates
            .iter()
            .map(|candidate| {
                let word = candidate.to_lowercase();
                WeightedHeadword {
                    count: scores.get(&word).copied().unwrap_or(0),
                    word,
                }
            })
            .collect();
        weighted.sort_by_key(|headword| std::cmp::Reverse(headword.count));

        let winner = match weighted.first() {
            Some(headword) => vec![headword.word.clone()],
            None => Vec::new(),
        };
        winners.insert(observed.to_lowercase(), winner);
    }

    winners
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(sentence: &str) -> SentenceWithLocus {
        SentenceWithLocus {
            locus: "line/w/1".to_string(),
            sentence: sentence.to_string(),
        }
    }

    fn parsemap(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_flat_juxtaposes_candidates() {
        let map = parsemap(&[("esse", &["sum", "edo"]), ("belgae", &["belgae"])]);
        let rewritten = build_flat_bags(vec![bag("belgae esse")], &map);
        assert_eq!(rewritten[0].sentence, "belgae sum edo");
    }

    #[test]
    fn test_alternates_yoke_candidates_into_one_token() {
        let map = parsemap(&[("θεῶν", &["θεόϲ", "θέα", "θεάω", "θεά"])]);
        let rewritten = build_composite_bags(vec![bag("θεῶν")], &map);
        assert_eq!(rewritten[0].sentence, "θεόϲ·θέα·θεάω·θεά");
    }

    #[test]
    fn test_winner_takes_all_prefers_the_dominant_homonym() {
        let map = parsemap(&[("esse", &["sum", "edo"])]);
        let mut scores = HashMap::new();
        scores.insert("sum".to_string(), 50000);
        scores.insert("edo".to_string(), 300);

        let winners = prune_to_winners(&map, &scores);
        assert_eq!(winners["esse"], vec!["sum"]);
    }

    #[test]
    fn test_winner_keeps_unscored_forms() {
        // a form without a morphology row maps to itself and scores 0
        let map = parsemap(&[("belgae", &["belgae"])]);
        let winners = prune_to_winners(&map, &HashMap::new());
        assert_eq!(winners["belgae"], vec!["belgae"]);
    }

    #[test]
    fn test_winner_ties_break_by_input_order() {
        let map = parsemap(&[("uis", &["uis¹", "uis²"])]);
        let winners = prune_to_winners(&map, &HashMap::new());
        assert_eq!(winners["uis"], vec!["uis¹"]);
    }

    #[test]
    fn test_winner_lowers_keys_and_candidates() {
        let map = parsemap(&[("Belgae", &["Belgae"])]);
        let winners = prune_to_winners(&map, &HashMap::new());
        assert_eq!(winners["belgae"], vec!["belgae"]);
    }
}
