use lib_dashboard::core::loading::LoadingSet;
use lib_dashboard::{Domain, StateSnapshot};

/// One-line summary of a state snapshot, e.g.
/// `sales=ok users=loading business=error("HTTP 503")`.
pub fn describe(state: &StateSnapshot) -> String {
    Domain::ALL
        .iter()
        .map(|domain| {
            let status = if let Some(error) = state.error(*domain) {
                format!("error({:?})", error)
            } else if state.loading.get(*domain) {
                "loading".to_string()
            } else if state.data.is_loaded(*domain) {
                "ok".to_string()
            } else {
                "empty".to_string()
            };
            format!("{}={}", domain, status)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keys of the fetches currently in flight, comma separated.
pub fn describe_loading(loading: &LoadingSet) -> String {
    let active: Vec<&str> = loading
        .iter()
        .filter(|(_, active)| **active)
        .map(|(key, _)| key.as_str())
        .collect();
    if active.is_empty() {
        "idle".to_string()
    } else {
        active.join(",")
    }
}
