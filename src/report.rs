//! The one-line stdout contract.
//!
//! The front-end captures stdout and takes the last whitespace-delimited
//! token as the result key, so these lines must never grow a trailing
//! decoration.

use crate::bagger::BaggingMethod;

pub fn search_report(hits: i64, result_key: &str) -> String {
    format!("{} hits have been stored at {}", hits, result_key)
}

pub fn bagger_report(bags: usize, method: BaggingMethod, result_key: &str) -> String {
    format!("{} {} bags of words stored at {}", bags, method, result_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_token(line: &str) -> &str {
        line.split_whitespace().last().unwrap_or_default()
    }

    #[test]
    fn test_search_report_ends_with_the_result_key() {
        let line = search_report(26, "2f81c630_results");
        assert_eq!(line, "26 hits have been stored at 2f81c630_results");
        assert_eq!(last_token(&line), "2f81c630_results");
    }

    #[test]
    fn test_bagger_report_ends_with_the_result_key() {
        let line = bagger_report(177, BaggingMethod::WinnerTakesAll, "2f81c630_vectorresults");
        assert_eq!(
            line,
            "177 winnertakesall bags of words stored at 2f81c630_vectorresults"
        );
        assert_eq!(last_token(&line), "2f81c630_vectorresults");
    }
}
