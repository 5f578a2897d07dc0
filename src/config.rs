//! Credential decoding for the two backing services.
//!
//! Both credential blobs arrive as JSON strings on the command line; the
//! front-end passes them verbatim, so the field spellings are part of the
//! external contract.

use serde::{Deserialize, Serialize};

use crate::error::{HelperError, Result};
use crate::{MYNAME, VERSION};

/// Queue-store logon information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisLogin {
    #[serde(rename = "Addr")]
    pub addr: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "DB")]
    pub db: i64,
}

/// PostgreSQL logon information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresLogin {
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Pass")]
    pub pass: String,
    #[serde(rename = "DBName")]
    pub db_name: String,
}

impl RedisLogin {
    pub fn from_json(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).map_err(|e| {
            HelperError::Config(format!(
                "cannot parse the queue-store login credentials as JSON [{} v.{}]: {}",
                MYNAME, VERSION, e
            ))
        })
    }
}

impl PostgresLogin {
    pub fn from_json(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).map_err(|e| {
            HelperError::Config(format!(
                "cannot parse the PostgreSQL login credentials as JSON [{} v.{}]: {}",
                MYNAME, VERSION, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_login_round_trip() {
        let blob = r#"{"Addr": "localhost:6379", "Password": "", "DB": 0}"#;
        let login = RedisLogin::from_json(blob).unwrap();
        assert_eq!(login.addr, "localhost:6379");
        assert_eq!(login.password, "");
        assert_eq!(login.db, 0);
    }

    #[test]
    fn test_postgres_login_round_trip() {
        let blob = r#"{"Host": "localhost", "Port": 5432, "User": "corpus_w", "Pass": "", "DBName": "corpusDB"}"#;
        let login = PostgresLogin::from_json(blob).unwrap();
        assert_eq!(login.host, "localhost");
        assert_eq!(login.port, 5432);
        assert_eq!(login.db_name, "corpusDB");
    }

    #[test]
    fn test_garbage_credentials_are_config_errors() {
        let err = RedisLogin::from_json("not json").unwrap_err();
        assert!(matches!(err, HelperError::Config(_)));
    }
}
