use crate::error::{Result, RosterError};
use crate::member::{Member, Registration};
use crate::registry::MemberRegistry;
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default bound on a single registry round trip.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Redis-based member registry implementation
///
/// Each member is a hash keyed by identity with one field per column of the
/// logical schema, so a node bumping its own heartbeat and the leader
/// writing slot assignments touch disjoint fields. The store-assigned id
/// comes from a shared counter key.
pub struct RedisRegistry {
    conn: Mutex<redis::aio::MultiplexedConnection>,
    prefix: String,
    op_timeout: Duration,
}

impl RedisRegistry {
    /// Create a new Redis registry client
    pub async fn new(url: &str, namespace: &str, op_timeout: Duration) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| RosterError::Config(format!("Failed to connect to Redis: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RosterError::Config(format!("Failed to connect to Redis: {}", e)))?;

        // Test with a ping
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| RosterError::Config(format!("Redis ping failed: {}", e)))?;

        let prefix = format!("rosterd:{}", namespace);

        Ok(Self {
            conn: Mutex::new(conn),
            prefix,
            op_timeout,
        })
    }

    fn member_key(&self, identity: &str) -> String {
        format!("{}:members:{}", self.prefix, identity)
    }

    fn members_pattern(&self) -> String {
        format!("{}:members:*", self.prefix)
    }

    fn seq_key(&self) -> String {
        format!("{}:members_seq", self.prefix)
    }

    /// Run one registry operation under the configured timeout; a hung
    /// connection surfaces as a store error instead of stalling the loop.
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RosterError::Store(format!(
                "redis {} timed out after {:?}",
                what, self.op_timeout
            ))),
        }
    }

    async fn list_inner(&self) -> Result<Vec<Member>> {
        let mut conn = self.conn.lock().await;
        let pattern = self.members_pattern();

        let keys: Vec<String> = conn.keys(&pattern).await.map_err(|e| {
            RosterError::Store(format!("Failed to get member keys from Redis: {}", e))
        })?;

        let marker = format!("{}:members:", self.prefix);
        let mut members = Vec::with_capacity(keys.len());
        for key in keys {
            let identity = match key.strip_prefix(&marker) {
                Some(identity) => identity.to_string(),
                None => continue,
            };

            let fields: HashMap<String, String> = conn.hgetall(&key).await.map_err(|e| {
                RosterError::Store(format!("Failed to get member from Redis: {}", e))
            })?;

            // Row deleted between KEYS and HGETALL
            if fields.is_empty() {
                continue;
            }

            members.push(member_from_fields(&identity, &fields)?);
        }

        members.sort_by_key(|member| member.id);
        Ok(members)
    }

    async fn checkin_inner(&self, registration: &Registration) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let key = self.member_key(&registration.identity);

        let exists: bool = conn.exists(&key).await.map_err(|e| {
            RosterError::Store(format!("Failed to check member in Redis: {}", e))
        })?;

        if exists {
            let _: i64 = conn.hincr(&key, "heartbeat", 1).await.map_err(|e| {
                RosterError::Store(format!("Failed to bump heartbeat in Redis: {}", e))
            })?;
            return Ok(());
        }

        let id: i64 = conn.incr(self.seq_key(), 1).await.map_err(|e| {
            RosterError::Store(format!("Failed to allocate member id in Redis: {}", e))
        })?;

        let fields = [
            ("id", id.to_string()),
            ("name", registration.name.clone()),
            ("address", registration.address.clone()),
            ("heartbeat", "0".to_string()),
            ("requested_slot", registration.requested_slot.to_string()),
            ("assigned_slot", "0".to_string()),
        ];

        let _: () = conn.hset_multiple(&key, &fields).await.map_err(|e| {
            RosterError::Store(format!("Failed to register member in Redis: {}", e))
        })?;

        Ok(())
    }

    async fn delete_inner(&self, identity: &str) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let key = self.member_key(identity);

        let _: () = conn.del(&key).await.map_err(|e| {
            RosterError::Store(format!("Failed to delete member from Redis: {}", e))
        })?;

        Ok(())
    }

    async fn persist_inner(&self, assignments: &BTreeMap<u16, Member>) -> Result<()> {
        let mut conn = self.conn.lock().await;

        for (slot, member) in assignments {
            let key = self.member_key(&member.identity);

            let exists: bool = conn.exists(&key).await.map_err(|e| {
                RosterError::Store(format!("Failed to check member in Redis: {}", e))
            })?;

            // The row vanished since the snapshot was taken; the next cycle
            // re-resolves against a fresh listing.
            if !exists {
                tracing::warn!(
                    "Skipping slot {} for vanished member {}",
                    slot,
                    member.identity
                );
                continue;
            }

            let fields = [
                ("assigned_slot", slot.to_string()),
                ("requested_slot", "0".to_string()),
            ];

            let _: () = conn.hset_multiple(&key, &fields).await.map_err(|e| {
                RosterError::Store(format!("Failed to write slot assignment to Redis: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl MemberRegistry for RedisRegistry {
    async fn list(&self) -> Result<Vec<Member>> {
        self.bounded("list", self.list_inner()).await
    }

    async fn checkin(&self, registration: &Registration) -> Result<()> {
        self.bounded("checkin", self.checkin_inner(registration)).await
    }

    async fn delete(&self, identity: &str) -> Result<()> {
        self.bounded("delete", self.delete_inner(identity)).await
    }

    async fn persist_assignments(&self, assignments: &BTreeMap<u16, Member>) -> Result<()> {
        self.bounded("assignment write", self.persist_inner(assignments))
            .await
    }
}

fn required_field<T>(fields: &HashMap<String, String>, identity: &str, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = fields.get(name).ok_or_else(|| RosterError::MalformedRow {
        identity: identity.to_string(),
        message: format!("missing field '{}'", name),
    })?;

    raw.parse().map_err(|error| RosterError::MalformedRow {
        identity: identity.to_string(),
        message: format!("field '{}': {}", name, error),
    })
}

fn member_from_fields(identity: &str, fields: &HashMap<String, String>) -> Result<Member> {
    Ok(Member {
        id: required_field(fields, identity, "id")?,
        identity: identity.to_string(),
        name: fields.get("name").cloned().unwrap_or_default(),
        address: fields.get("address").cloned().unwrap_or_default(),
        requested_slot: required_field(fields, identity, "requested_slot")?,
        heartbeat: required_field(fields, identity, "heartbeat")?,
        assigned_slot: required_field(fields, identity, "assigned_slot")?,
    })
}
