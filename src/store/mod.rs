// Queue-Store Adapter
//
// Thin semantic wrapper over redis: the search pool, the bagger and the poll
// broadcaster never speak the wire protocol directly. One multiplexed
// connection manager is opened per process and cloned into every worker, so
// N workers cannot exhaust descriptors. Set-pop is atomic server-side; that
// is the only synchronization primitive the workers rely on.

use redis::aio::ConnectionManager;
use redis::{Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::debug;

use crate::config::RedisLogin;
use crate::error::{HelperError, Result};

/// Every scalar key is refreshed with this TTL on each write.
pub const KEY_TTL_SECONDS: u64 = 300;

#[derive(Clone)]
pub struct QueueStore {
    manager: ConnectionManager,
}

impl QueueStore {
    /// Open the shared connection manager and validate it with a PING.
    pub async fn connect(login: &RedisLogin) -> Result<Self> {
        let (host, port) = split_addr(&login.addr)?;
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(host, port),
            redis: RedisConnectionInfo {
                db: login.db,
                username: None,
                password: if login.password.is_empty() {
                    None
                } else {
                    Some(login.password.clone())
                },
            },
        };

        let client = Client::open(info)?;
        let mut manager = ConnectionManager::new(client).await?;
        redis::cmd("PING").query_async::<_, ()>(&mut manager).await?;
        debug!("Connected to the queue store at {}", login.addr);

        Ok(Self { manager })
    }

    /// Atomically pop one member from the set at `key`.
    ///
    /// `None` is the empty sentinel: the set is empty or has been deleted.
    pub async fn pop_one(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.manager.clone();
        let member: Option<String> = redis::cmd("SPOP").arg(key).query_async(&mut con).await?;
        Ok(member)
    }

    /// Current cardinality of the set at `key` (0 when absent).
    pub async fn cardinality(&self, key: &str) -> Result<i64> {
        let mut con = self.manager.clone();
        let n: i64 = redis::cmd("SCARD").arg(key).query_async(&mut con).await?;
        Ok(n)
    }

    /// Add one serialized member to the set at `key`.
    pub async fn add(&self, key: &str, member: &str) -> Result<()> {
        let mut con = self.manager.clone();
        redis::cmd("SADD")
            .arg(key)
            .arg(member)
            .query_async::<_, ()>(&mut con)
            .await?;
        Ok(())
    }

    /// Commit a whole batch of members in a single pipelined transaction.
    ///
    /// The search worker uses this to land one query's hits at once rather
    /// than paying a round trip per row.
    pub async fn add_all(&self, key: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut con = self.manager.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for member in members {
            pipe.cmd("SADD").arg(key).arg(member.as_str()).ignore();
        }
        pipe.query_async::<_, ()>(&mut con).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut con = self.manager.clone();
        redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut con).await?;
        Ok(())
    }

    pub async fn delete_many(&self, keys: &[String]) -> Result<()> {
        let mut con = self.manager.clone();
        for key in keys {
            redis::cmd("DEL")
                .arg(key.as_str())
                .query_async::<_, ()>(&mut con)
                .await?;
        }
        Ok(())
    }

    /// SET an integer scalar, refreshing the 5-minute TTL.
    pub async fn set_int(&self, key: &str, value: i64) -> Result<()> {
        let mut con = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(KEY_TTL_SECONDS)
            .query_async::<_, ()>(&mut con)
            .await?;
        Ok(())
    }

    /// SET a text scalar, refreshing the 5-minute TTL.
    pub async fn set_text(&self, key: &str, value: &str) -> Result<()> {
        let mut con = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(KEY_TTL_SECONDS)
            .query_async::<_, ()>(&mut con)
            .await?;
        Ok(())
    }

    /// GET a text scalar; `None` when the key is missing or expired.
    pub async fn get_text(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.manager.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut con).await?;
        Ok(value)
    }
}

fn split_addr(addr: &str) -> Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| HelperError::Config(format!("queue-store address '{}' lacks a port", addr)))?;
    let port: u16 = port
        .parse()
        .map_err(|_| HelperError::Config(format!("queue-store port in '{}' is not numeric", addr)))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_addr() {
        let (host, port) = split_addr("localhost:6379").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 6379);
    }

    #[test]
    fn test_split_addr_rejects_portless() {
        assert!(split_addr("localhost").is_err());
        assert!(split_addr("localhost:redis").is_err());
    }
}
