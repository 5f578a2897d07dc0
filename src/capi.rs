// C ABI for module-mode embedding
//
// The front-end can load the cdylib instead of shelling out to the binary.
// Each entry point builds its own runtime, runs the corresponding pipeline
// to completion and hands back the result key as a C string. The bagger
// entry point is ancillary: the standalone binary is the optimized path and
// the only one the front-end currently exercises.
//
// Error protocol: a NULL (or negative) return means failure; the message is
// retrievable with corpus_helper_last_error() until the next call on the
// same thread.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use clap::ValueEnum;

use crate::bagger::{self, BaggerOptions, BaggingMethod};
use crate::config::{PostgresLogin, RedisLogin};
use crate::db::PgPool;
use crate::error::Result;
use crate::store::QueueStore;
use crate::{poll, search};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Returns the last error message for the current thread, or NULL if none.
/// The pointer is valid until the next C API call on the same thread.
#[no_mangle]
pub extern "C" fn corpus_helper_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(std::ptr::null())
    })
}

/// Free a string returned by this library.
///
/// # Safety
///
/// `s` must be a pointer previously returned by a `corpus_helper_*` call,
/// or NULL.
#[no_mangle]
pub unsafe extern "C" fn corpus_helper_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Drain the queue at `key` with `workers` workers and a hit cap of `cap`.
/// Returns the result key, or NULL on error.
///
/// # Safety
///
/// `key`, `redis_json` and `psql_json` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn corpus_helper_search(
    key: *const c_char,
    cap: i64,
    workers: i32,
    redis_json: *const c_char,
    psql_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(key) = cstr_arg(key, "key") else {
        return std::ptr::null_mut();
    };
    let Some(logins) = decode_logins(redis_json, psql_json) else {
        return std::ptr::null_mut();
    };
    let workers = usize::try_from(workers).unwrap_or(1).max(1);

    let run = block_on_pipeline(workers, async move {
        let (store, pool) = connect_both(&logins.0, &logins.1, workers).await?;
        let result_key = search::run_search(key, cap, workers, &store, &pool).await?;
        Ok(result_key)
    });

    into_result_string(run)
}

/// Bag the rows behind `key` (or the direct range when `key` is empty) and
/// load them for the vector stage. Returns the result key, or NULL on error.
///
/// # Safety
///
/// All pointer arguments must be valid NUL-terminated strings; `hw` and
/// `inflected` may be NULL to use the embedded skip lists.
#[no_mangle]
pub unsafe extern "C" fn corpus_helper_bag(
    key: *const c_char,
    method: *const c_char,
    workers: i32,
    sentences_per_bag: i32,
    direct_db: *const c_char,
    direct_start: i32,
    direct_end: i32,
    hw: *const c_char,
    inflected: *const c_char,
    redis_json: *const c_char,
    psql_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(key) = cstr_arg(key, "key") else {
        return std::ptr::null_mut();
    };
    let Some(method) = cstr_arg(method, "method") else {
        return std::ptr::null_mut();
    };
    let Some(method) = method_from_name(method) else {
        return std::ptr::null_mut();
    };
    let Some(direct_db) = cstr_arg(direct_db, "direct_db") else {
        return std::ptr::null_mut();
    };
    let Some(logins) = decode_logins(redis_json, psql_json) else {
        return std::ptr::null_mut();
    };

    let skip_headwords = optional_cstr(hw);
    let skip_inflected = optional_cstr(inflected);
    let workers = usize::try_from(workers).unwrap_or(1).max(1);

    let opts = BaggerOptions {
        key: key.to_string(),
        method,
        workers,
        sentences_per_bag: usize::try_from(sentences_per_bag).unwrap_or(1).max(1),
        direct_db: direct_db.to_string(),
        direct_start,
        direct_end,
        skip_headwords,
        skip_inflected,
    };

    let run = block_on_pipeline(workers, async move {
        let (store, pool) = connect_both(&logins.0, &logins.1, workers).await?;
        let (result_key, _) = bagger::run_bagger(&opts, &store, &pool).await?;
        Ok(result_key)
    });

    into_result_string(run)
}

/// Serve the websocket poll broadcaster until interrupted.
/// Returns 0 on clean shutdown, -1 on error.
///
/// # Safety
///
/// `redis_json` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn corpus_helper_websocket(
    port: u16,
    fail_threshold: u32,
    preserve_keys: i32,
    redis_json: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(redis_json) = cstr_arg(redis_json, "redis_json") else {
        return -1;
    };
    let login = match RedisLogin::from_json(redis_json) {
        Ok(login) => login,
        Err(e) => {
            set_last_error(&e.to_string());
            return -1;
        }
    };

    let run = block_on_pipeline(1, async move {
        let store = QueueStore::connect(&login).await?;
        poll::serve_polls(port, fail_threshold, preserve_keys != 0, store).await
    });

    match run {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

fn method_from_name(name: &str) -> Option<BaggingMethod> {
    match BaggingMethod::from_str(name, true) {
        Ok(method) => Some(method),
        Err(_) => {
            set_last_error(&format!("unknown bagging method '{}'", name));
            None
        }
    }
}

fn block_on_pipeline<T>(
    workers: usize,
    pipeline: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers + 1)
        .enable_all()
        .build()?;
    runtime.block_on(pipeline)
}

async fn connect_both(
    redis_login: &RedisLogin,
    postgres_login: &PostgresLogin,
    workers: usize,
) -> Result<(QueueStore, PgPool)> {
    let store = QueueStore::connect(redis_login).await?;
    let pool = crate::db::connect_pool(postgres_login, workers).await?;
    Ok((store, pool))
}

unsafe fn cstr_arg<'a>(ptr: *const c_char, what: &str) -> Option<&'a str> {
    if ptr.is_null() {
        set_last_error(&format!("NULL {} argument", what));
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Some(s),
        Err(e) => {
            set_last_error(&format!("invalid {} string: {}", what, e));
            None
        }
    }
}

unsafe fn optional_cstr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(str::to_string)
}

unsafe fn decode_logins(
    redis_json: *const c_char,
    psql_json: *const c_char,
) -> Option<(RedisLogin, PostgresLogin)> {
    let redis_json = cstr_arg(redis_json, "redis_json")?;
    let psql_json = cstr_arg(psql_json, "psql_json")?;

    let redis_login = match RedisLogin::from_json(redis_json) {
        Ok(login) => login,
        Err(e) => {
            set_last_error(&e.to_string());
            return None;
        }
    };
    let postgres_login = match PostgresLogin::from_json(psql_json) {
        Ok(login) => login,
        Err(e) => {
            set_last_error(&e.to_string());
            return None;
        }
    };

    Some((redis_login, postgres_login))
}

fn into_result_string(run: Result<String>) -> *mut c_char {
    match run {
        Ok(value) => match CString::new(value) {
            Ok(s) => s.into_raw(),
            Err(e) => {
                set_last_error(&format!("result key is not C-representable: {}", e));
                std::ptr::null_mut()
            }
        },
        Err(e) => {
            set_last_error(&e.to_string());
            std::ptr::null_mut()
        }
    }
}
