// End-to-end exercise of the bagging pipeline's pure phases on a synthetic
// corpus chunk: block building, normalization, segmentation, rewriting and
// the stop-word purge. Nothing here needs a live database or queue store.

use std::collections::HashMap;

use corpus_helper::bagger::methods::{build_composite_bags, build_flat_bags};
use corpus_helper::bagger::stopwords::{
    discard_empty_bags, drop_stopwords, SKIP_HEADWORDS, SKIP_INFLECTED,
};
use corpus_helper::bagger::text::{
    build_text_block, normalize, split_into_sentences, vocabulary,
};
use corpus_helper::db::Workline;

fn workline(uid: &str, index: i32, marked_up: &str) -> Workline {
    Workline {
        work_uid: uid.to_string(),
        table_index: index,
        marked_up: marked_up.to_string(),
        ..Default::default()
    }
}

fn parsemap(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
        .collect()
}

#[test]
fn unlemmatized_bag_from_a_caesar_line() {
    let lines = vec![workline(
        "lt0448w001",
        22,
        "Belgae ab extremis Galliae finibus oriuntur.",
    )];

    let block = normalize(&build_text_block(&lines));
    let sentences = split_into_sentences(&block);

    let bags = drop_stopwords(SKIP_HEADWORDS, sentences);
    let bags = drop_stopwords(SKIP_INFLECTED, bags);
    let bags = discard_empty_bags(bags);

    assert_eq!(bags.len(), 1);
    assert_eq!(bags[0].locus, "line/lt0448w001/22");
    assert_eq!(bags[0].sentence, "belgae extremis galliae finibus oriuntur");
}

#[test]
fn locus_carries_across_untagged_sentences() {
    let lines = vec![
        workline("lt0448w001", 22, "Belgae ab extremis Galliae finibus oriuntur,"),
        workline("lt0448w001", 23, "pertinent ad inferiorem partem fluminis Rheni. spectant in septentrionem."),
    ];

    let block = normalize(&build_text_block(&lines));
    let sentences = split_into_sentences(&block);
    let bags = discard_empty_bags(drop_stopwords("", sentences));

    assert_eq!(bags.len(), 2);
    assert_eq!(bags[0].locus, "line/lt0448w001/22");
    // the second sentence has no tag of its own and inherits line 23
    assert_eq!(bags[1].locus, "line/lt0448w001/23");
    assert_eq!(bags[1].sentence, "spectant in septentrionem");
}

#[test]
fn flat_and_composite_rewrites_agree_on_candidates() {
    let lines = vec![workline("gr0001w001", 1, "θεῶν")];
    let block = normalize(&build_text_block(&lines));
    let sentences = split_into_sentences(&block);

    let words = vocabulary(&sentences);
    assert!(words.contains("θεῶν"));

    let map = parsemap(&[("θεῶν", &["θεόϲ", "θέα", "θεάω", "θεά"])]);

    let flat = build_flat_bags(sentences.clone(), &map);
    assert_eq!(flat[0].sentence, "θεόϲ θέα θεάω θεά");

    let composite = build_composite_bags(sentences, &map);
    assert_eq!(composite[0].sentence, "θεόϲ·θέα·θεάω·θεά");
}

#[test]
fn terminator_only_input_produces_no_bags() {
    let lines = vec![workline("lt0448w001", 1, ". ; !")];
    let block = normalize(&build_text_block(&lines));
    let sentences = split_into_sentences(&block);

    let bags = discard_empty_bags(drop_stopwords(SKIP_INFLECTED, sentences));
    assert!(bags.is_empty());
}

#[test]
fn bag_json_uses_the_wire_names() {
    let lines = vec![workline("lt0448w001", 22, "Belgae oriuntur.")];
    let block = normalize(&build_text_block(&lines));
    let sentences = split_into_sentences(&block);
    let bags = discard_empty_bags(drop_stopwords("", sentences));

    let json = serde_json::to_string(&bags[0]).unwrap();
    assert_eq!(
        json,
        r#"{"Loc":"line/lt0448w001/22","Sent":"belgae oriuntur"}"#
    );
}
