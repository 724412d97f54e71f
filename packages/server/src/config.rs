//! Server configuration assembled from command line arguments.

use std::{path::PathBuf, time::Duration};

use crate::domain::RoomKind;

const HOUR: Duration = Duration::from_secs(60 * 60);

/// How long a persisted room record may stay inactive before it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub rating: Duration,
    pub radio: Duration,
    pub tournament: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            rating: HOUR * 24,
            radio: HOUR * 24,
            tournament: HOUR * 48,
        }
    }
}

impl RetentionPolicy {
    pub fn for_kind(&self, kind: RoomKind) -> Duration {
        match kind {
            RoomKind::Rating => self.rating,
            RoomKind::Radio => self.radio,
            RoomKind::Tournament => self.tournament,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON seed for the in-memory catalog. An empty catalog when absent.
    pub catalog_path: Option<PathBuf>,
    /// Period of the empty live room sweep.
    pub sweep_interval: Duration,
    /// Idle time after which an empty live room is removed.
    pub idle_room_timeout: Duration,
    /// Period of the persisted record sweep.
    pub record_sweep_interval: Duration,
    /// Seed for room codes, song shuffles and coin flips.
    pub seed: Option<u64>,
    pub retention: RetentionPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            catalog_path: None,
            sweep_interval: Duration::from_secs(5 * 60),
            idle_room_timeout: Duration::from_secs(10 * 60),
            record_sweep_interval: HOUR,
            seed: None,
            retention: RetentionPolicy::default(),
        }
    }
}
