//! Text-block reconstitution, normalization and sentence segmentation.
//!
//! The corpus rows are fused into one string with embedded locus tags
//! (`⊏line/<work-uid>/<index>⊐`) so location survives the text-level
//! transforms; the tag delimiters are an external contract with the
//! downstream consumer. All fixed regexes compile once per process.

use std::collections::HashMap;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::db::Workline;
use crate::LINE_LENGTH;

/// A bag before or after lemmatization: one sentence plus its source locus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceWithLocus {
    #[serde(rename = "Loc")]
    pub locus: String,
    #[serde(rename = "Sent")]
    pub sentence: String,
}

/// Sentence terminators, applied one after another during segmentation.
const TERMINATORS: [char; 5] = ['.', '?', '!', '·', ';'];

static LOCUS_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new("⊏(.*?)⊐").expect("locus tag regex"));

static MARKUP_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new("<.*?>").expect("markup tag regex"));

// ASCII lowercase plus the Greek-with-diacritics whitelist; everything else
// is dropped from a segmented sentence. The character class is normative.
static NON_ALPHABET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        "[^\\sa-zα-ωϲϹἀἁἂἃἄἅἆἇᾀᾁᾂᾃᾄᾅᾆᾇᾲᾳᾴᾶᾷᾰᾱὰάἐἑἒἓἔἕὲέἰἱἲἳἴἵἶἷὶίῐῑῒΐῖῗὀὁὂὃὄὅόὸὐὑὒὓὔὕὖὗϋῠῡῢΰῦῧύὺᾐᾑᾒᾓᾔᾕᾖᾗῂῃῄῆῇἤἢἥἣὴήἠἡἦἧὠὡὢὣὤὥὦὧᾠᾡᾢᾣᾤᾥᾦᾧῲῳῴῶῷώὼ]",
    )
    .expect("alphabet whitelist regex")
});

// Deterministic substitution table: sigma and u/i leveling plus the Roman
// praenomen and calendar abbreviations. Order matters: the replacer resolves
// ties by taking the first listed pattern, and the table is applied in one
// pass over the text.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("v", "u"),
    ("j", "i"),
    ("σ", "ϲ"),
    ("ς", "ϲ"),
    ("A.", "Aulus"),
    ("App.", "Appius"),
    ("C.", "Caius"),
    ("G.", "Gaius"),
    ("Cn.", "Cnaius"),
    ("Gn.", "Gnaius"),
    ("D.", "Decimus"),
    ("L.", "Lucius"),
    ("M.", "Marcus"),
    ("M.’", "Manius"),
    ("N.", "Numerius"),
    ("P.", "Publius"),
    ("Q.", "Quintus"),
    ("S.", "Spurius"),
    ("Sp.", "Spurius"),
    ("Ser.", "Servius"),
    ("Sex.", "Sextus"),
    ("T.", "Titus"),
    ("Ti", "Tiberius"),
    ("V.", "Vibius"),
    ("a.", "ante"),
    ("d.", "dies"),
    ("Id.", "Idibus"),
    ("Kal.", "Kalendas"),
    ("Non.", "Nonas"),
    ("prid.", "pridie"),
    ("Ian.", "Ianuarias"),
    ("Feb.", "Februarias"),
    ("Mart.", "Martias"),
    ("Apr.", "Aprilis"),
    ("Mai.", "Maias"),
    ("Iun.", "Iunias"),
    ("Quint.", "Quintilis"),
    ("Sext.", "Sextilis"),
    ("Sept.", "Septembris"),
    ("Oct.", "Octobris"),
    ("Nov.", "Novembris"),
    ("Dec.", "Decembris"),
];

// One alternation over the whole table; the regex engine's first-listed-wins
// tie-breaking reproduces the table order.
static SUBSTITUTION_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = SUBSTITUTIONS
        .iter()
        .map(|(from, _)| regex::escape(from))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&pattern).expect("substitution table regex")
});

static SUBSTITUTION_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SUBSTITUTIONS.iter().copied().collect());

/// Fuse the acquired rows into one tagged text block.
///
/// Naive string addition is ruinously slow on a large author; the builder is
/// pre-sized to the expected line length instead.
pub fn build_text_block(lines: &[Workline]) -> String {
    let mut block = String::with_capacity(LINE_LENGTH * lines.len());
    for line in lines {
        block.push_str(&format!(
            "⊏line/{}/{}⊐{} ",
            line.work_uid, line.table_index, line.marked_up
        ));
    }
    block
}

/// Preliminary cleanup: drop `&nbsp;`, soften soft-hyphens across line
/// wraps, and strip tag-like fragments.
pub fn strip_markup(text: &str) -> String {
    let text = text.replace("&nbsp;", "");
    let text = text.replace("- ", "");
    MARKUP_TAG_RE.replace_all(&text, "").into_owned()
}

/// Apply the substitution table in a single multi-replace pass.
pub fn make_substitutions(text: &str) -> String {
    SUBSTITUTION_RE
        .replace_all(text, |caps: &Captures| {
            let matched = caps.get(0).map_or("", |m| m.as_str());
            SUBSTITUTION_MAP.get(matched).copied().unwrap_or(matched).to_string()
        })
        .into_owned()
}

/// Markup stripping followed by the substitution pass.
pub fn normalize(text: &str) -> String {
    make_substitutions(&strip_markup(text))
}

/// Split on each terminator in turn: first on `.`, then every piece on `?`,
/// and so on down the list.
pub fn split_on_terminators(text: &str) -> Vec<String> {
    let mut pieces = vec![text.to_string()];
    for terminator in TERMINATORS {
        pieces = pieces
            .iter()
            .flat_map(|piece| piece.split(terminator).map(str::to_string))
            .collect();
    }
    pieces
}

/// Segment the normalized block into located sentences.
///
/// A sentence's locus is the first embedded tag it carries; a tagless
/// sentence inherits the last tag of its predecessor. The sentence text is
/// lowered, de-tagged and reduced to the alphabet whitelist.
pub fn split_into_sentences(text: &str) -> Vec<SentenceWithLocus> {
    let mut sentences = Vec::new();
    let mut inherited = String::new();

    for piece in split_on_terminators(text) {
        let tags: Vec<&str> = LOCUS_TAG_RE
            .captures_iter(&piece)
            .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
            .collect();

        let locus = match tags.first() {
            Some(first) => {
                inherited = tags[tags.len() - 1].to_string();
                first.to_string()
            }
            None => inherited.clone(),
        };

        let lowered = piece.to_lowercase();
        let untagged = LOCUS_TAG_RE.replace_all(&lowered, "");
        let sentence = NON_ALPHABET_RE.replace_all(&untagged, "").into_owned();

        sentences.push(SentenceWithLocus { locus, sentence });
    }

    sentences
}

/// Group consecutive sentences into bags of `per_bag`; each bag keeps its
/// first sentence's locus.
pub fn group_sentences(sentences: Vec<SentenceWithLocus>, per_bag: usize) -> Vec<SentenceWithLocus> {
    if per_bag <= 1 {
        return sentences;
    }

    sentences
        .chunks(per_bag)
        .map(|chunk| SentenceWithLocus {
            locus: chunk[0].locus.clone(),
            sentence: chunk
                .iter()
                .map(|s| s.sentence.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect()
}

/// The set of distinct whitespace-delimited tokens across all sentences.
pub fn vocabulary(sentences: &[SentenceWithLocus]) -> HashSet<String> {
    let mut words = HashSet::with_capacity(sentences.len());
    for sentence in sentences {
        for word in sentence.sentence.split_whitespace() {
            words.insert(word.to_string());
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workline(uid: &str, index: i32, text: &str) -> Workline {
        Workline {
            work_uid: uid.to_string(),
            table_index: index,
            marked_up: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_block_carries_locus_tags() {
        let lines = vec![
            workline("lt0448w001", 22, "Belgae ab extremis Galliae finibus oriuntur."),
            workline("lt0448w001", 23, "pertinent ad inferiorem partem fluminis Rheni."),
        ];
        let block = build_text_block(&lines);
        assert!(block.starts_with("⊏line/lt0448w001/22⊐Belgae"));
        assert!(block.contains("⊏line/lt0448w001/23⊐pertinent"));
        assert!(block.ends_with("Rheni. "));
    }

    #[test]
    fn test_strip_markup() {
        let dirty = "arma&nbsp;virumque <span class=\"x\">cano</span> Troi- ae";
        assert_eq!(strip_markup(dirty), "armavirumque cano Troiae");
    }

    #[test]
    fn test_substitutions_level_letters_and_expand_abbreviations() {
        assert_eq!(make_substitutions("vox jam"), "uox iam");
        assert_eq!(make_substitutions("σωϲίαϲ ὅς"), "ϲωϲίαϲ ὅϲ");
        assert_eq!(make_substitutions("A. Postumius"), "Aulus Postumius");
        assert_eq!(make_substitutions("Kal. Feb."), "Kalendas Februarias");
    }

    #[test]
    fn test_substitution_ties_resolve_in_table_order() {
        // "M." is listed ahead of "M.’", so the shorter pattern wins
        assert_eq!(make_substitutions("M.’"), "Marcus’");
        // "Ti" expands wherever it occurs, as the table dictates
        assert_eq!(make_substitutions("Titus"), "Tiberiustus");
    }

    #[test]
    fn test_substitutions_idempotent_on_normalized_text() {
        let normalized = "belgae ab extremis galliae finibus oriuntur";
        assert_eq!(make_substitutions(normalized), normalized);
    }

    #[test]
    fn test_sentence_count_is_terminators_plus_one() {
        let text = "alpha. beta? gamma! delta· epsilon; zeta";
        assert_eq!(split_on_terminators(text).len(), 6);
    }

    #[test]
    fn test_consecutive_terminators_yield_empty_pieces() {
        assert_eq!(split_on_terminators("a.!b").len(), 3);
        assert_eq!(split_on_terminators("..").len(), 3);
    }

    #[test]
    fn test_normalize_runs_all_cleanups_in_order() {
        let messy = "Kal. Ian.&nbsp; <hmu_standalone_endofpage />ar- ma vjrumque σ";
        assert_eq!(normalize(messy), "Kalendas Ianuarias arma uirumque ϲ");
    }

    #[test]
    fn test_segmentation_of_single_tagged_sentence() {
        let block = "⊏line/lt0448w001/22⊐Belgae ab extremis Galliae finibus oriuntur. ";
        let sentences = split_into_sentences(block);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].locus, "line/lt0448w001/22");
        assert_eq!(sentences[0].sentence, "belgae ab extremis galliae finibus oriuntur");
        // the trailing stub after the terminator is all whitespace
        assert_eq!(sentences[1].sentence.trim(), "");
    }

    #[test]
    fn test_tagless_sentence_inherits_previous_locus() {
        let block = "⊏line/w/1⊐prima ⊏line/w/2⊐secunda. tertia. ⊏line/w/3⊐quarta";
        let sentences = split_into_sentences(block);
        assert_eq!(sentences[0].locus, "line/w/1");
        // no tag of its own: the previous sentence's *last* tag carries over
        assert_eq!(sentences[1].locus, "line/w/2");
        assert_eq!(sentences[2].locus, "line/w/3");
    }

    #[test]
    fn test_stripping_is_consistent_across_phases() {
        // the segmented text equals the normalized text minus terminators,
        // tags, case and non-alphabet characters
        let lines = vec![workline("w", 1, "Arma uirumque cano, Troiae qui primus ab oris")];
        let block = normalize(&build_text_block(&lines));
        let sentences = split_into_sentences(&block);
        let rejoined: String = sentences.iter().map(|s| s.sentence.as_str()).collect();
        assert_eq!(rejoined.trim(), "arma uirumque cano troiae qui primus ab oris");
    }

    #[test]
    fn test_group_sentences() {
        let sentences: Vec<SentenceWithLocus> = (1..=5)
            .map(|i| SentenceWithLocus {
                locus: format!("line/w/{}", i),
                sentence: format!("sentence{}", i),
            })
            .collect();
        let grouped = group_sentences(sentences, 2);
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0].locus, "line/w/1");
        assert_eq!(grouped[0].sentence, "sentence1 sentence2");
        assert_eq!(grouped[2].sentence, "sentence5");
    }

    #[test]
    fn test_vocabulary_is_a_set() {
        let sentences = vec![
            SentenceWithLocus {
                locus: String::new(),
                sentence: "arma uirumque cano".to_string(),
            },
            SentenceWithLocus {
                locus: String::new(),
                sentence: "arma gerit".to_string(),
            },
        ];
        let words = vocabulary(&sentences);
        assert_eq!(words.len(), 4);
        assert!(words.contains("arma"));
    }
}
