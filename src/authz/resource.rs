use std::fmt;
use std::str::FromStr;

use axum::extract::Request;
use serde::{Deserialize, Serialize};

/// Methods a resource row may declare. `Any` (`*`) exists in the schema for
/// administrators, but resolution always produces a literal request method
/// and the evaluator matches exactly, so `Any` rows are never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    #[serde(rename = "*")]
    Any,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Any => "*",
        }
    }

    /// Map a wire method into the enumerated set. Anything outside it
    /// (HEAD, OPTIONS, ...) has no resource identity and will be denied.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        match *method {
            axum::http::Method::GET => Some(Method::Get),
            axum::http::Method::POST => Some(Method::Post),
            axum::http::Method::PUT => Some(Method::Put),
            axum::http::Method::DELETE => Some(Method::Delete),
            axum::http::Method::PATCH => Some(Method::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "*" => Ok(Method::Any),
            other => Err(format!("unknown method: {other}")),
        }
    }
}

/// The canonical identity of a protected action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub name: String,
    pub method: Method,
}

impl ResourceKey {
    pub fn new(name: impl Into<String>, method: Method) -> Self {
        Self {
            name: name.into(),
            method,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.method)
    }
}

/// Explicit resource name attached to the request context. Beats every
/// other resolution strategy.
#[derive(Debug, Clone, Copy)]
pub struct ResourceName(pub &'static str);

pub type ResolveFn = fn(&Request) -> String;

/// Route-declared strategy for naming the protected resource.
#[derive(Clone, Copy)]
pub enum ResourceSpec {
    /// Compute the name from the request, e.g. list/create/update/delete
    /// split by method and the presence of an item path parameter.
    Resolver(ResolveFn),
    /// Structural fallback: `{handler}_{method}`, both lowercased.
    Handler(&'static str),
}

/// Resolve the resource key for a request, trying the strategies in fixed
/// priority order: explicit `ResourceName` override, then the route's
/// `ResourceSpec`. The key's method is always the literal request method.
///
/// `None` (method outside the enumerated set, or no strategy attached)
/// means the request has no resource identity and is denied downstream.
pub fn resolve_key(req: &Request) -> Option<ResourceKey> {
    let method = Method::from_http(req.method())?;

    if let Some(ResourceName(name)) = req.extensions().get::<ResourceName>() {
        return Some(ResourceKey::new(*name, method));
    }
    match req.extensions().get::<ResourceSpec>()? {
        ResourceSpec::Resolver(resolve) => Some(ResourceKey::new(resolve(req), method)),
        ResourceSpec::Handler(id) => Some(ResourceKey::new(
            format!("{}_{}", id.to_lowercase(), method.as_str().to_lowercase()),
            method,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(method: &str, uri: &str) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn method_round_trips_through_strings() {
        for raw in ["GET", "POST", "PUT", "DELETE", "PATCH", "*"] {
            assert_eq!(Method::from_str(raw).unwrap().as_str(), raw);
        }
        assert!(Method::from_str("get").is_err());
    }

    #[test]
    fn methods_outside_the_set_have_no_identity() {
        assert!(Method::from_http(&axum::http::Method::HEAD).is_none());
        assert!(Method::from_http(&axum::http::Method::OPTIONS).is_none());
    }

    #[test]
    fn explicit_name_beats_route_spec() {
        let mut req = request("GET", "/api/projects");
        req.extensions_mut().insert(ResourceSpec::Handler("project"));
        req.extensions_mut().insert(ResourceName("project_list"));

        let key = resolve_key(&req).unwrap();
        assert_eq!(key.name, "project_list");
        assert_eq!(key.method, Method::Get);
    }

    #[test]
    fn resolver_function_names_the_resource() {
        fn by_method(req: &Request) -> String {
            match *req.method() {
                axum::http::Method::POST => "widget_create".into(),
                _ => "widget_list".into(),
            }
        }
        let mut req = request("POST", "/api/widgets");
        req.extensions_mut().insert(ResourceSpec::Resolver(by_method));

        let key = resolve_key(&req).unwrap();
        assert_eq!(key.name, "widget_create");
        assert_eq!(key.method, Method::Post);
    }

    #[test]
    fn structural_fallback_concatenates_handler_and_method() {
        let mut req = request("DELETE", "/api/widgets/9");
        req.extensions_mut().insert(ResourceSpec::Handler("WidgetView"));

        let key = resolve_key(&req).unwrap();
        assert_eq!(key.name, "widgetview_delete");
        assert_eq!(key.method, Method::Delete);
    }

    #[test]
    fn key_method_is_the_literal_request_method_never_any() {
        let mut req = request("GET", "/api/widgets");
        req.extensions_mut().insert(ResourceName("widget_list"));
        assert_eq!(resolve_key(&req).unwrap().method, Method::Get);
    }

    #[test]
    fn no_strategy_means_no_key() {
        assert!(resolve_key(&request("GET", "/api/widgets")).is_none());
    }

    #[test]
    fn unsupported_method_means_no_key_even_with_override() {
        let mut req = request("OPTIONS", "/api/widgets");
        req.extensions_mut().insert(ResourceName("widget_list"));
        assert!(resolve_key(&req).is_none());
    }
}
