//! HTTP method routing.

/// Every operation the gateway performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `POST`: publish the body onto an exchange.
    Publish,
}

impl Route {
    pub const ALL: [Route; 1] = [Route::Publish];

    /// Case-sensitive: `"post"` is not a route.
    pub fn for_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.method() == method)
    }

    pub fn method(self) -> &'static str {
        match self {
            Route::Publish => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Route(Route),
    Unsupported(String),
}

pub fn dispatch(method: &str) -> Dispatch {
    match Route::for_method(method) {
        Some(route) => Dispatch::Route(route),
        None => Dispatch::Unsupported(method.to_string()),
    }
}
