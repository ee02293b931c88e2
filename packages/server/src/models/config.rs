use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    // 夜・昼フェーズそれぞれの制限時間
    pub phase_duration_seconds: u64,
    // 締め切りチェックの間隔
    pub scheduler_tick_millis: u64,
    pub event_channel_capacity: usize,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            phase_duration_seconds: 30,
            scheduler_tick_millis: 500,
            event_channel_capacity: 1000,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = env::var("WEREWOLF_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let phase_duration_seconds = env::var("WEREWOLF_PHASE_DURATION_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.phase_duration_seconds);
        let scheduler_tick_millis = env::var("WEREWOLF_SCHEDULER_TICK_MILLIS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.scheduler_tick_millis);
        let event_channel_capacity = env::var("WEREWOLF_EVENT_CHANNEL_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.event_channel_capacity);
        let cors_origin = env::var("WEREWOLF_CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Self {
            bind_addr,
            phase_duration_seconds,
            scheduler_tick_millis,
            event_channel_capacity,
            cors_origin,
        }
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_duration_seconds)
    }

    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_millis(self.scheduler_tick_millis)
    }
}
