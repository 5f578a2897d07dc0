// Corpus Helper - binary entry point
//
// One binary, three modes: the searcher (default), the bagger (--sv) and the
// websocket poll broadcaster (--ws). The stdout line at the end of a search
// or bagging run is parsed by the front-end; the result key must stay the
// last whitespace-delimited token.

use corpus_helper::bagger::{self, BaggerOptions};
use corpus_helper::cli::{self, Args};
use corpus_helper::config::{PostgresLogin, RedisLogin};
use corpus_helper::error::Result;
use corpus_helper::store::QueueStore;
use corpus_helper::{db, logging, poll, report, search, MYNAME, SHORTNAME, VERSION};
use tracing::{info, warn};

fn main() {
    let args = cli::parse();

    let version_banner = format!("{} CLI Debugging Interface (v.{})", MYNAME, VERSION);
    if args.version {
        println!("{}", version_banner);
        std::process::exit(1);
    }

    let loglevel = args.effective_loglevel();
    logging::init(loglevel);
    info!("{} [loglevel={}]", version_banner, loglevel);

    let profiler = if args.profile {
        match pprof::ProfilerGuard::new(100) {
            Ok(guard) => {
                info!("logging profiling data to 'profiler_output.bin'");
                Some(guard)
            }
            Err(e) => {
                warn!("could not start the cpu profiler: {}", e);
                None
            }
        }
    } else {
        None
    };

    // the pipelines assume workers + 1 schedulable units
    let outcome = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.workers + 1)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(run(&args)),
        Err(e) => Err(e.into()),
    };

    if let Some(guard) = profiler {
        write_profile(&guard);
    }

    if let Err(e) = outcome {
        eprintln!("[{} v.{}] {}", SHORTNAME, VERSION, e);
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<()> {
    let redis_login = RedisLogin::from_json(&args.redis)?;

    if args.websockets {
        let store = QueueStore::connect(&redis_login).await?;
        return poll::serve_polls(args.ws_port, args.ws_fail_threshold, args.ws_save > 0, store).await;
    }

    let postgres_login = PostgresLogin::from_json(&args.psql)?;
    let store = QueueStore::connect(&redis_login).await?;
    let pool = db::connect_pool(&postgres_login, args.workers).await?;

    if args.vectors {
        let opts = BaggerOptions {
            key: args.key.clone(),
            method: args.bagging_method,
            workers: args.workers,
            sentences_per_bag: args.sentences_per_bag,
            direct_db: args.vector_db.clone(),
            direct_start: args.vector_start,
            direct_end: args.vector_end,
            skip_headwords: args.skip_headwords.clone(),
            skip_inflected: args.skip_inflected.clone(),
        };
        let (result_key, stored) = bagger::run_bagger(&opts, &store, &pool).await?;
        println!("{}", report::bagger_report(stored, args.bagging_method, &result_key));
    } else {
        let result_key = search::run_search(&args.key, args.cap, args.workers, &store, &pool).await?;
        let hits = search::final_hit_count(&args.key, &store).await?;
        println!("{}", report::search_report(hits, &result_key));
    }

    Ok(())
}

// Best-effort: a failed profile must not turn a finished run into a failure.
fn write_profile(guard: &pprof::ProfilerGuard<'_>) {
    use pprof::protos::Message;

    let report = match guard.report().build() {
        Ok(report) => report,
        Err(e) => {
            warn!("could not build the cpu profile report: {}", e);
            return;
        }
    };

    let profile = match report.pprof() {
        Ok(profile) => profile,
        Err(e) => {
            warn!("could not encode the cpu profile: {}", e);
            return;
        }
    };

    let mut body = Vec::new();
    if profile.write_to_vec(&mut body).is_err() || std::fs::write("profiler_output.bin", &body).is_err() {
        warn!("could not write 'profiler_output.bin'");
        return;
    }
    info!("wrote profiling data to 'profiler_output.bin'");
}
