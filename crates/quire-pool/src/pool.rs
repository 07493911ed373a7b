//! The pool implementation: lease bookkeeping, timeouts, idle eviction.

use crate::{Connector, PoolError};
use log::{debug, warn};
use quire_types::PoolBounds;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct IdleConn<T> {
    conn: T,
    idle_since: Instant,
}

struct PoolState<T> {
    idle: Vec<IdleConn<T>>,
    /// Total open connections: idle plus leased. Never exceeds `max_size`.
    live: usize,
}

/// A bounded pool of reusable connections for one profile.
pub struct Pool<C: Connector> {
    connector: C,
    profile_id: String,
    bounds: PoolBounds,
    state: Mutex<PoolState<C::Conn>>,
    available: Condvar,
}

impl<C: Connector> Pool<C> {
    pub fn new(profile_id: impl Into<String>, bounds: PoolBounds, connector: C) -> Self {
        Self {
            connector,
            profile_id: profile_id.into(),
            bounds,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                live: 0,
            }),
            available: Condvar::new(),
        }
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    /// Lease a connection, blocking until one is free or the profile's
    /// acquire timeout elapses.
    pub fn acquire(&self) -> Result<PooledConnection<'_, C>, PoolError> {
        let deadline = Instant::now() + self.bounds.acquire_timeout;
        let mut state = self.state.lock().map_err(|_| PoolError::Poisoned)?;

        loop {
            self.evict_stale(&mut state);

            if let Some(idle) = state.idle.pop() {
                debug!(
                    "[POOL] Leasing idle connection for '{}' ({} live)",
                    self.profile_id, state.live
                );
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(idle.conn),
                });
            }

            if state.live < self.bounds.max_size {
                // Reserve the slot before opening so a slow connect cannot
                // let a racing acquire overshoot max_size.
                state.live += 1;
                drop(state);
                debug!("[POOL] Opening new connection for '{}'", self.profile_id);
                match self.connector.open() {
                    Ok(conn) => {
                        return Ok(PooledConnection {
                            pool: self,
                            conn: Some(conn),
                        });
                    }
                    Err(e) => {
                        let mut state = self.state.lock().map_err(|_| PoolError::Poisoned)?;
                        state.live -= 1;
                        self.available.notify_one();
                        return Err(e);
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::Timeout {
                    profile: self.profile_id.clone(),
                    waited: self.bounds.acquire_timeout,
                });
            }
            let (next, timed_out) = self
                .available
                .wait_timeout(state, deadline - now)
                .map_err(|_| PoolError::Poisoned)?;
            state = next;
            if timed_out.timed_out() && state.idle.is_empty() && state.live >= self.bounds.max_size
            {
                return Err(PoolError::Timeout {
                    profile: self.profile_id.clone(),
                    waited: self.bounds.acquire_timeout,
                });
            }
        }
    }

    /// Number of open connections (idle plus leased).
    pub fn live(&self) -> usize {
        self.state.lock().map(|s| s.live).unwrap_or(0)
    }

    /// Number of idle connections ready to lease.
    pub fn idle(&self) -> usize {
        self.state.lock().map(|s| s.idle.len()).unwrap_or(0)
    }

    /// Close surplus idle connections that outlived the idle window.
    ///
    /// `close` is required to be cheap, so running it under the lock is
    /// acceptable here.
    fn evict_stale(&self, state: &mut MutexGuard<'_, PoolState<C::Conn>>) {
        while state.idle.len() > self.bounds.min_idle {
            let oldest_is_stale = state
                .idle
                .first()
                .is_some_and(|c| c.idle_since.elapsed() >= self.bounds.idle_timeout);
            if !oldest_is_stale {
                break;
            }
            let evicted = state.idle.remove(0);
            state.live -= 1;
            debug!(
                "[POOL] Evicting idle connection for '{}' ({} live)",
                self.profile_id, state.live
            );
            self.connector.close(evicted.conn);
        }
    }

    fn release(&self, mut conn: C::Conn) {
        let healthy = self.connector.probe(&mut conn);
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if healthy {
            state.idle.push(IdleConn {
                conn,
                idle_since: Instant::now(),
            });
        } else {
            warn!(
                "[POOL] Discarding unhealthy connection for '{}'",
                self.profile_id
            );
            state.live -= 1;
            self.connector.close(conn);
        }
        self.evict_stale(&mut state);
        drop(state);
        self.available.notify_one();
    }
}

/// An exclusive lease on a live backend connection.
///
/// Dropping the guard returns the connection to the pool after a liveness
/// probe; probe failure discards it.
pub struct PooledConnection<'a, C: Connector> {
    pool: &'a Pool<C>,
    conn: Option<C::Conn>,
}

impl<C: Connector> Deref for PooledConnection<'_, C> {
    type Target = C::Conn;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl<C: Connector> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl<C: Connector> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
