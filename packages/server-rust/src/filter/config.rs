use gatehouse_core::DispatchKind;

/// Name used for the applied-marker attribute when none is configured.
pub const DEFAULT_FILTER_NAME: &str = "AuthorizationFilter";

/// Configuration for [`AuthorizationFilter`](super::AuthorizationFilter).
///
/// Fixed once the layer is built; every request reads the same values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Skip the check when the gate already ran earlier in the same request lifecycle.
    pub observe_once_per_request: bool,
    /// Run the check on error dispatches.
    pub filter_error_dispatch: bool,
    /// Run the check on async-continuation dispatches.
    pub filter_async_dispatch: bool,
    /// Prefix of the marker attribute, `"{filter_name}.APPLIED"`.
    pub filter_name: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            observe_once_per_request: true,
            filter_error_dispatch: false,
            filter_async_dispatch: false,
            filter_name: DEFAULT_FILTER_NAME.to_string(),
        }
    }
}

impl FilterConfig {
    pub fn set_observe_once_per_request(&mut self, observe_once_per_request: bool) -> &mut Self {
        self.observe_once_per_request = observe_once_per_request;
        self
    }

    pub fn set_filter_error_dispatch(&mut self, filter_error_dispatch: bool) -> &mut Self {
        self.filter_error_dispatch = filter_error_dispatch;
        self
    }

    pub fn set_filter_async_dispatch(&mut self, filter_async_dispatch: bool) -> &mut Self {
        self.filter_async_dispatch = filter_async_dispatch;
        self
    }

    /// Checks every dispatch kind, once per dispatch rather than once per lifecycle.
    ///
    /// `true` disables once-per-request and enables error and async checks;
    /// `false` restores the defaults for all three.
    pub fn set_should_filter_all_dispatcher_types(&mut self, filter_all: bool) -> &mut Self {
        self.observe_once_per_request = !filter_all;
        self.filter_error_dispatch = filter_all;
        self.filter_async_dispatch = filter_all;
        self
    }

    pub fn set_filter_name(&mut self, filter_name: impl Into<String>) -> &mut Self {
        self.filter_name = filter_name.into();
        self
    }

    /// Name of the attribute that records the gate already ran.
    #[must_use]
    pub fn applied_attribute_name(&self) -> String {
        format!("{}.APPLIED", self.filter_name)
    }

    /// Whether a request of this dispatch kind bypasses the check.
    #[must_use]
    pub fn skips_dispatch(&self, dispatch: DispatchKind) -> bool {
        match dispatch {
            DispatchKind::Error => !self.filter_error_dispatch,
            DispatchKind::Async => !self.filter_async_dispatch,
            DispatchKind::Request | DispatchKind::Forward | DispatchKind::Include => false,
        }
    }
}
