// Stop-word purge
//
// The two whitespace-delimited skip lists ship inside the binary and can be
// overridden from the command line. Headwords and inflected forms are purged
// in separate passes, which together cover the union of both lists.

use std::collections::HashSet;

use crate::bagger::text::SentenceWithLocus;

/// Headwords too common to carry signal into the vector model.
pub const SKIP_HEADWORDS: &str = "unus verum omne sum¹ ab δύο πρότεροϲ ἄνθρωποϲ τίϲ δέω¹ ὅϲτιϲ homo πᾶϲ οὖν εἶπον ἠμί ἄν² tantus μένω μέγαϲ οὐ verus neque eo¹ nam μέν ἡμόϲ aut Sue διό reor ut ἐγώ is πωϲ ἐκάϲ enim ὅτι² παρά ἐν Ἔχιϲ sed ἐμόϲ οὐδόϲ ad de ita πηρόϲ οὗτοϲ an ἐπεί a γάρ αὐτοῦ ἐκεῖνοϲ ἀνά ἑαυτοῦ quam αὐτόϲε et ὑπό quidem Alius¹ οἷοϲ noster γίγνομαι ἄνα προϲάμβ ἄν¹ οὕτωϲ pro² tamen ἐάν atque τε qui² si multus idem οὐδέ ἐκ omnes γε δεῖ πολύϲ in ἔδω ὅτι¹ μή Ios ἕτεροϲ cum meus ὅλοξ suus omnis ὡϲ sua μετά Ἀλλά ne¹ jam εἰϲ ἤ² ἄναξ ἕ ὅϲοϲ dies ipse ὁ hic οὐδείϲ suo ἔτι ἄνω¹ ὅϲ νῦν ὁμοῖοϲ edo¹ εἰ qui¹ πάλιν ὥϲπερ ne³ ἵνα τιϲ διά φύω per τοιοῦτοϲ for eo² huc locum neo¹ sui non ἤ¹ χάω ex κατά δή ἁμόϲ ὅμοιοϲ αὐτόϲ etiam vaco πρόϲ Ζεύϲ ϲύ quis¹ tuus b εἷϲ Eos οὔτε τῇ καθά ego tu ille pro¹ ἀπό suum εἰμί ἄλλοϲ δέ alius² pars vel ὥϲτε χέω res ἡμέρα quo δέομαι modus ὑπέρ ϲόϲ ito τῷ περί Τήιοϲ ἕκαϲτοϲ autem καί ἐπί nos θεάω γάρον γάροϲ Cos²";

/// Inflected forms purged regardless of their headword.
pub const SKIP_INFLECTED: &str = "ita a inquit ego die nunc nos quid πάντων ἤ με θεόν δεῖ for igitur ϲύν b uers p ϲου τῷ εἰϲ ergo ἐπ ὥϲτε sua me πρό sic aut nisi rem πάλιν ἡμῶν φηϲί παρά ἔϲτι αὐτῆϲ τότε eos αὐτούϲ λέγει cum τόν quidem ἐϲτιν posse αὐτόϲ post αὐτῶν libro m hanc οὐδέ fr πρῶτον μέν res ἐϲτι αὐτῷ οὐχ non ἐϲτί modo αὐτοῦ sine ad uero fuit τοῦ ἀπό ea ὅτι parte ἔχει οὔτε ὅταν αὐτήν esse sub τοῦτο i omnes break μή ἤδη ϲοι sibi at mihi τήν in de τούτου ab omnia ὃ ἦν γάρ οὐδέν quam per α autem eius item ὡϲ sint length οὗ λόγον eum ἀντί ex uel ἐπειδή re ei quo ἐξ δραχμαί αὐτό ἄρα ἔτουϲ ἀλλ οὐκ τά ὑπέρ τάϲ μάλιϲτα etiam haec nihil οὕτω siue nobis si itaque uac erat uestig εἶπεν ἔϲτιν tantum tam nec unde qua hoc quis iii ὥϲπερ semper εἶναι e ½ is quem τῆϲ ἐγώ καθ his θεοῦ tibi ubi pro ἄν πολλά τῇ πρόϲ l ἔϲται οὕτωϲ τό ἐφ ἡμῖν οἷϲ inter idem illa n se εἰ μόνον ac ἵνα ipse erit μετά μοι δι γε enim ille an sunt esset γίνεται omnibus ne ἐπί τούτοιϲ ὁμοίωϲ παρ causa neque cr ἐάν quos ταῦτα h ante ἐϲτίν ἣν αὐτόν eo ὧν ἐπεί οἷον sed ἀλλά ii ἡ t te ταῖϲ est sit cuius καί quasi ἀεί o τούτων ἐϲ quae τούϲ minus quia tamen iam d διά primum r τιϲ νῦν illud u apud c ἐκ δ quod f quoque tr τί ipsa rei hic οἱ illi et πῶϲ φηϲίν τοίνυν s magis unknown οὖν dum text μᾶλλον λόγοϲ habet τοῖϲ qui αὐτοῖϲ suo πάντα uacat τίϲ pace ἔχειν οὐ κατά contra δύο ἔτι αἱ uet οὗτοϲ deinde id ut ὑπό τι lin ἄλλων τε tu ὁ cf δή potest ἐν eam tum μου nam θεόϲ κατ ὦ cui nomine περί atque δέ quibus ἡμᾶϲ τῶν eorum";

/// Drop every token present in the skip list from every bag.
pub fn drop_stopwords(skiplist: &str, bags: Vec<SentenceWithLocus>) -> Vec<SentenceWithLocus> {
    let stops: HashSet<&str> = skiplist.split(' ').collect();

    bags.into_iter()
        .map(|mut bag| {
            let kept = bag
                .sentence
                .split_whitespace()
                .filter(|word| !stops.contains(word))
                .collect::<Vec<_>>()
                .join(" ");
            bag.sentence = kept;
            bag
        })
        .collect()
}

/// Bags emptied by the purge carry nothing for the vector model.
pub fn discard_empty_bags(bags: Vec<SentenceWithLocus>) -> Vec<SentenceWithLocus> {
    bags.into_iter()
        .filter(|bag| !bag.sentence.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(sentence: &str) -> SentenceWithLocus {
        SentenceWithLocus {
            locus: "line/lt0448w001/22".to_string(),
            sentence: sentence.to_string(),
        }
    }

    #[test]
    fn test_purge_drops_listed_tokens() {
        let bags = drop_stopwords(SKIP_INFLECTED, vec![bag("belgae ab extremis galliae finibus oriuntur")]);
        assert_eq!(bags[0].sentence, "belgae extremis galliae finibus oriuntur");
    }

    #[test]
    fn test_purge_with_custom_list() {
        let bags = drop_stopwords("extremis", vec![bag("belgae extremis galliae")]);
        assert_eq!(bags[0].sentence, "belgae galliae");
    }

    #[test]
    fn test_emptied_bags_are_discarded() {
        let bags = drop_stopwords("ab", vec![bag("ab"), bag("belgae")]);
        let kept = discard_empty_bags(bags);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].sentence, "belgae");
    }
}
