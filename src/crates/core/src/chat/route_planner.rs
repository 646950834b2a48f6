use multichat_core_types::{ChatMode, Route, RoutePlan};

/// Decide the execution mode and outbound routes for one turn.
///
/// A selected consensus route switches the turn to `consensus` mode and is
/// never sent as a route itself; the gateway learns about it through `mode`.
pub fn plan_routes(selected: &[Route]) -> RoutePlan {
    let mode = if selected.iter().any(Route::is_consensus) {
        ChatMode::Consensus
    } else {
        ChatMode::Multi
    };

    let routes: Vec<Route> = selected
        .iter()
        .filter(|route| !route.is_consensus())
        .cloned()
        .collect();

    RoutePlan {
        mode,
        routes: if routes.is_empty() { None } else { Some(routes) },
    }
}
