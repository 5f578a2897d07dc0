//! Command-line surface: one binary, three modes.
//!
//! The default mode is the searcher; `--sv` selects the bagger and `--ws`
//! the websocket poll broadcaster. Credentials arrive as JSON strings so the
//! front-end can hand them over verbatim.

use clap::Parser;

use crate::bagger::BaggingMethod;

pub const DEFAULT_REDIS_LOGIN: &str = r#"{"Addr": "localhost:6379", "Password": "", "DB": 0}"#;
pub const DEFAULT_POSTGRES_LOGIN: &str =
    r#"{"Host": "localhost", "Port": 5432, "User": "corpus_w", "Pass": "", "DBName": "corpusDB"}"#;

#[derive(Parser, Debug)]
#[command(name = "corpus-helper", disable_version_flag = true)]
pub struct Args {
    /// [searches] queue-store key to drain
    #[arg(short = 'k', long = "key", default_value = "")]
    pub key: String,

    /// [searches] max hit count
    #[arg(short = 'c', long = "cap", default_value_t = 200)]
    pub cap: i64,

    /// [common] number of workers to dispatch
    #[arg(short = 't', long = "workers", default_value_t = 5)]
    pub workers: usize,

    /// [common] logging level: 0 is silent; 5 is very noisy
    #[arg(short = 'l', long = "loglevel", default_value_t = 1)]
    pub loglevel: u8,

    /// [common] queue-store logon information (as a JSON string)
    #[arg(short = 'r', long = "redis", default_value = DEFAULT_REDIS_LOGIN)]
    pub redis: String,

    /// [common] psql logon information (as a JSON string)
    #[arg(short = 'p', long = "psql", default_value = DEFAULT_POSTGRES_LOGIN)]
    pub psql: String,

    /// [common] print version and exit
    #[arg(short = 'v', long = "version-info")]
    pub version: bool,

    /// [debugging] profile cpu use to './profiler_output.bin'
    #[arg(long = "profile")]
    pub profile: bool,

    /// [vectors] assert that this is a vectorizing run
    #[arg(long = "sv")]
    pub vectors: bool,

    /// [vectors] the bagging method
    #[arg(long = "svb", value_enum, default_value_t = BaggingMethod::WinnerTakesAll)]
    pub bagging_method: BaggingMethod,

    /// [vectors] number of sentences per bag
    #[arg(long = "svbs", default_value_t = 1)]
    pub sentences_per_bag: usize,

    /// [vectors][for manual debugging] db to grab from
    #[arg(long = "svdb", default_value = "lt0448")]
    pub vector_db: String,

    /// [vectors][for manual debugging] first line to grab
    #[arg(long = "svs", default_value_t = 1)]
    pub vector_start: i32,

    /// [vectors][for manual debugging] last line to grab
    #[arg(long = "sve", default_value_t = 26)]
    pub vector_end: i32,

    /// [vectors] whitespace-delimited headwords to skip (embedded list when omitted)
    #[arg(long = "svhw")]
    pub skip_headwords: Option<String>,

    /// [vectors] whitespace-delimited inflected forms to skip (embedded list when omitted)
    #[arg(long = "svin")]
    pub skip_inflected: Option<String>,

    /// [websockets] assert that you are requesting the websocket server
    #[arg(long = "ws")]
    pub websockets: bool,

    /// [websockets] port on which to open the websocket server
    #[arg(long = "wsp", default_value_t = 5010)]
    pub ws_port: u16,

    /// [websockets] fail threshold before messages stop being sent
    #[arg(long = "wsf", default_value_t = 3)]
    pub ws_fail_threshold: u32,

    /// [websockets] save the polls instead of deleting them: 0 is no; 1 is yes
    #[arg(long = "wss", default_value_t = 0)]
    pub ws_save: u8,
}

impl Args {
    /// The dial only goes to 5.
    pub fn effective_loglevel(&self) -> u8 {
        self.loglevel.min(5)
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let args = Args::try_parse_from(["corpus-helper"]).unwrap();
        assert_eq!(args.cap, 200);
        assert_eq!(args.workers, 5);
        assert_eq!(args.loglevel, 1);
        assert_eq!(args.ws_port, 5010);
        assert_eq!(args.ws_fail_threshold, 3);
        assert_eq!(args.sentences_per_bag, 1);
        assert_eq!(args.vector_db, "lt0448");
        assert_eq!(args.vector_start, 1);
        assert_eq!(args.vector_end, 26);
        assert!(matches!(args.bagging_method, BaggingMethod::WinnerTakesAll));
    }

    #[test]
    fn test_mode_flags() {
        let args =
            Args::try_parse_from(["corpus-helper", "--sv", "--svb", "alternates", "-k", "2f81c630"])
                .unwrap();
        assert!(args.vectors);
        assert!(matches!(args.bagging_method, BaggingMethod::Alternates));
        assert_eq!(args.key, "2f81c630");

        let args = Args::try_parse_from(["corpus-helper", "--ws", "--wsp", "6010"]).unwrap();
        assert!(args.websockets);
        assert_eq!(args.ws_port, 6010);
    }

    #[test]
    fn test_loglevel_clamps_high() {
        let args = Args::try_parse_from(["corpus-helper", "-l", "9"]).unwrap();
        assert_eq!(args.effective_loglevel(), 5);
    }
}
