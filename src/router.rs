//! Fragment routing: `#/polls/<id>` shows one poll, anything else the list.

const DETAIL_PREFIX: &str = "/polls/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    List,
    Detail(String),
}

impl Route {
    /// Accepts the fragment with or without its leading `#`.
    pub fn from_fragment(fragment: &str) -> Self {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        match fragment.strip_prefix(DETAIL_PREFIX) {
            Some(id) if !id.is_empty() => Route::Detail(id.to_string()),
            _ => Route::List,
        }
    }

    /// Fragment including the leading `#`, empty for the list.
    pub fn fragment(&self) -> String {
        match self {
            Route::List => String::new(),
            Route::Detail(id) => format!("#{DETAIL_PREFIX}{id}"),
        }
    }
}

/// One dispatch of a route. Responses carry it back so that a result which
/// arrives after the user moved on is not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    generation: u64,
    route: Route,
}

impl Visit {
    pub fn route(&self) -> &Route {
        &self.route
    }
}

/// Counts dispatches; only the latest visit may update the screen.
#[derive(Debug, Default)]
pub struct Navigation {
    generation: u64,
}

impl Navigation {
    pub fn begin(&mut self, route: Route) -> Visit {
        self.generation += 1;
        Visit {
            generation: self.generation,
            route,
        }
    }

    pub fn is_current(&self, visit: &Visit) -> bool {
        visit.generation == self.generation
    }

    /// Where to go once the redirect delay after a failed load has run out.
    ///
    /// `None` when the user has navigated since, or the fragment no longer
    /// points at the route that failed.
    pub fn redirect_after_failure(&self, failed: &Visit, fragment: &str) -> Option<Route> {
        (self.is_current(failed) && Route::from_fragment(fragment) == failed.route)
            .then_some(Route::List)
    }
}
