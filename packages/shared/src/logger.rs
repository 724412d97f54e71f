//! Logging setup utilities for the SyncRate binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose log output is enabled at the default level.
const WORKSPACE_TARGETS: [&str; 4] = [
    "syncrate_shared",
    "syncrate_server",
    "syncrate_client",
    "tower_http",
];

/// Build the default filter directive for the given binary and level.
///
/// Binary names use dashes while tracing targets use underscores, so the binary
/// name is normalized before it is added to the directive list.
pub fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    let mut directives: Vec<String> = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, default_log_level))
        .collect();
    if !WORKSPACE_TARGETS.contains(&binary_target.as_str()) {
        directives.push(format!("{}={}", binary_target, default_log_level));
    }
    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "syncrate-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn")
///
/// # Examples
///
/// ```no_run
/// use syncrate_shared::logger::setup_logger;
///
/// setup_logger("syncrate-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_normalizes_binary_name() {
        // テスト項目: バイナリ名のハイフンがアンダースコアに変換される
        // given (前提条件):
        let binary = "syncrate-server";

        // when (操作):
        let filter = default_filter(binary, "debug");

        // then (期待する結果): 既存ターゲットと重複しない
        assert_eq!(filter.matches("syncrate_server=debug").count(), 1);
        assert!(filter.contains("tower_http=debug"));
    }

    #[test]
    fn test_default_filter_appends_unknown_binary() {
        // テスト項目: ワークスペース外のバイナリ名もフィルタに追加される
        // given (前提条件):
        let binary = "room-watch";

        // when (操作):
        let filter = default_filter(binary, "info");

        // then (期待する結果):
        assert!(filter.ends_with("room_watch=info"));
    }
}
