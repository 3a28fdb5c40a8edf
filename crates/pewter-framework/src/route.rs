//! Routes: a filter, an optional state requirement and a handler chain.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::Context;
use crate::filter::Filter;
use crate::handler::BoxedHandler;

/// A registered (filter, state, handlers) binding.
///
/// Routes are immutable once registered. Only the display name can change,
/// and it plays no part in matching.
pub struct Route {
    filter: Filter,
    state: Option<String>,
    handlers: Vec<BoxedHandler>,
    name: RwLock<Option<String>>,
}

impl Route {
    pub(crate) fn new(filter: Filter, state: Option<String>, handlers: Vec<BoxedHandler>) -> Self {
        Self {
            filter,
            state,
            handlers,
            name: RwLock::new(None),
        }
    }

    /// Returns `true` if this route accepts the context.
    ///
    /// A route with a state requirement only matches a context whose state
    /// is set and equal to it.
    pub fn matches(&self, ctx: &Context) -> bool {
        if !(self.filter)(ctx) {
            return false;
        }
        match &self.state {
            None => true,
            Some(required) => ctx.state().as_deref() == Some(required.as_str()),
        }
    }

    /// The state tag this route requires, if any.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub(crate) fn handler(&self, index: usize) -> Option<BoxedHandler> {
        self.handlers.get(index).cloned()
    }

    /// The diagnostic name, if one was set.
    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    fn set_name(&self, name: String) {
        *self.name.write() = Some(name);
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name())
            .field("state", &self.state)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Handle to a registered route, returned by the `on*` methods.
#[derive(Debug, Clone)]
pub struct RouteHandle {
    route: Arc<Route>,
}

impl RouteHandle {
    pub(crate) fn new(route: Arc<Route>) -> Self {
        Self { route }
    }

    /// Attaches a diagnostic name to the route.
    pub fn name(self, name: impl Into<String>) -> Self {
        self.route.set_name(name.into());
        self
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter;
    use pewter_core::Update;

    #[test]
    fn state_requirement_is_exact() {
        let route = Route::new(filter::any_update(), Some("admin".into()), Vec::new());
        let ctx = Context::detached(Update::default());

        assert!(!route.matches(&ctx));
        ctx.set_state("admins");
        assert!(!route.matches(&ctx));
        ctx.set_state("Admin");
        assert!(!route.matches(&ctx));
        ctx.set_state("admin");
        assert!(route.matches(&ctx));
    }

    #[test]
    fn stateless_route_matches_any_state() {
        let route = Route::new(filter::any_update(), None, Vec::new());
        let ctx = Context::detached(Update::default());
        assert!(route.matches(&ctx));
        ctx.set_state("anything");
        assert!(route.matches(&ctx));
    }

    #[test]
    fn name_is_set_through_handle() {
        let handle = RouteHandle::new(Arc::new(Route::new(filter::message(), None, Vec::new())));
        assert_eq!(handle.route().name(), None);
        let handle = handle.name("echo");
        assert_eq!(handle.route().name().as_deref(), Some("echo"));
    }
}
