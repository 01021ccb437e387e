//! Route declarations and outbound call sites, by regular expression
//!
//! Each language gets a small fixed set of patterns. Patterns run over whole
//! file contents; line numbers are recovered from match offsets. Extraction
//! is purely textual, so it is deterministic for a given source tree.

use super::scanner::SourceKind;
use super::summary::{ApiCall, SourceLocation};
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashSet};

/// Receivers that are HTTP clients rather than routers (`api.get("/x")` in a
/// frontend is a call, not a route)
const CLIENT_RECEIVERS: &[&str] = &[
    "axios", "http", "https", "api", "client", "request", "instance", "ky", "superagent",
    "$http", "httpClient", "apiClient", "fetcher",
];

#[derive(Debug, Default, Clone)]
pub struct Extraction {
    pub routes: BTreeSet<String>,
    pub calls: Vec<ApiCall>,
}

pub struct Extractor {
    js_route: Regex,
    nest_controller: Regex,
    nest_route: Regex,
    py_route: Regex,
    django_path: Regex,
    rust_route: Regex,
    actix_route: Regex,
    go_route: Regex,
    fetch_call: Regex,
    client_call: Regex,
    template_call: Regex,
    py_call: Regex,
    options_method: Regex,
    client_prefix: Regex,
    interpolation: Regex,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            js_route: Regex::new(
                r#"(?i)([A-Za-z_$][\w$]*)\s*\.\s*(get|post|put|delete|patch)\s*\(\s*['"`]([^'"`]+)['"`]"#,
            )
            .expect("valid regex"),
            nest_controller: Regex::new(r#"@Controller\(\s*['"]([^'"]*)['"]"#)
                .expect("valid regex"),
            nest_route: Regex::new(r#"@(Get|Post|Put|Delete|Patch)\(\s*(?:['"]([^'"]*)['"])?\s*\)"#)
                .expect("valid regex"),
            py_route: Regex::new(
                r#"@\w+\.(get|post|put|delete|patch|route|api_route)\s*\(\s*['"]([^'"]+)['"]"#,
            )
            .expect("valid regex"),
            django_path: Regex::new(r#"\b(?:re_)?path\(\s*r?['"]\^?([^'"$]*)\$?['"]"#)
                .expect("valid regex"),
            rust_route: Regex::new(r#"\.route\(\s*"([^"]+)""#).expect("valid regex"),
            actix_route: Regex::new(r#"#\[(get|post|put|delete|patch)\(\s*"([^"]+)""#)
                .expect("valid regex"),
            go_route: Regex::new(r#"\.(GET|POST|PUT|DELETE|PATCH|Get|Post|Put|Delete|Patch)\(\s*"([^"]+)""#)
                .expect("valid regex"),
            fetch_call: Regex::new(r#"fetch\s*\(\s*[`'"](/[^`'"]*)[`'"]"#).expect("valid regex"),
            client_call: Regex::new(
                r#"\b(axios|api|client|http|apiClient|httpClient)\.(get|post|put|delete|patch)\s*(?:<[^>]*>)?\s*\(\s*[`'"](/[^`'"]*)[`'"]"#,
            )
            .expect("valid regex"),
            template_call: Regex::new(r#"\$\{[^}]*\}(/(?:[A-Za-z0-9/_.\-]|\$\{[^}]*\})*)"#)
                .expect("valid regex"),
            py_call: Regex::new(
                r#"\b(?:requests|httpx|session|client)\.(get|post|put|delete|patch)\s*\(\s*f?['"](?:\{[^}]*\})?(/[^'"]*)['"]"#,
            )
            .expect("valid regex"),
            options_method: Regex::new(r#"^[^,)]*,\s*\{[^}]*?method\s*:\s*['"`](\w+)['"`]"#)
                .expect("valid regex"),
            client_prefix: Regex::new(
                r#"\b(?:axios|api|client|http)\.(get|post|put|delete|patch)\s*(?:<[^>]*>)?\s*\(\s*`$"#,
            )
            .expect("valid regex"),
            interpolation: Regex::new(r#"\$\{[^}]*\}"#).expect("valid regex"),
        }
    }

    /// Adds the routes and calls found in one file to `out`
    pub fn extract(&self, relative: &str, content: &str, kind: SourceKind, out: &mut Extraction) {
        match kind {
            SourceKind::JavaScript => {
                self.js_routes(content, out);
                self.js_calls(relative, content, out);
            }
            SourceKind::Python => {
                self.python_routes(relative, content, out);
                self.python_calls(relative, content, out);
            }
            SourceKind::Rust => {
                self.collect_routes(&self.rust_route, 1, content, out);
                self.collect_routes(&self.actix_route, 2, content, out);
            }
            SourceKind::Go => {
                self.collect_routes(&self.go_route, 2, content, out);
            }
        }
    }

    fn collect_routes(&self, re: &Regex, group: usize, content: &str, out: &mut Extraction) {
        for caps in re.captures_iter(content) {
            if let Some(path) = caps.get(group) {
                insert_route(&mut out.routes, path.as_str());
            }
        }
    }

    fn js_routes(&self, content: &str, out: &mut Extraction) {
        for caps in self.js_route.captures_iter(content) {
            let receiver = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if CLIENT_RECEIVERS.contains(&receiver) {
                continue;
            }
            if let Some(path) = caps.get(3) {
                insert_route(&mut out.routes, path.as_str());
            }
        }

        let prefix = self
            .nest_controller
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches('/').to_string())
            .unwrap_or_default();
        for caps in self.nest_route.captures_iter(content) {
            let path = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            insert_route(&mut out.routes, &join_route(&prefix, path));
        }
    }

    fn js_calls(&self, relative: &str, content: &str, out: &mut Extraction) {
        let mut consumed: Vec<(usize, usize)> = Vec::new();

        for caps in self.fetch_call.captures_iter(content) {
            let whole = whole_match(&caps);
            let method = self.method_from_options(&content[whole.1..]).unwrap_or("GET");
            self.push_call(out, relative, content, whole.0, method, cap_str(&caps, 1));
            consumed.push(whole);
        }

        for caps in self.client_call.captures_iter(content) {
            let whole = whole_match(&caps);
            self.push_call(out, relative, content, whole.0, cap_str(&caps, 2), cap_str(&caps, 3));
            consumed.push(whole);
        }

        for caps in self.template_call.captures_iter(content) {
            let whole = whole_match(&caps);
            if consumed.iter().any(|(s, e)| whole.0 >= *s && whole.0 < *e) {
                continue;
            }
            let line_start = content[..whole.0].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let prefix = &content[line_start..whole.0];
            let method = self
                .client_prefix
                .captures(prefix)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .or_else(|| self.method_from_options(&content[whole.1..]))
                .unwrap_or("GET");
            self.push_call(out, relative, content, whole.0, method, cap_str(&caps, 1));
            consumed.push(whole);
        }
    }

    fn python_routes(&self, relative: &str, content: &str, out: &mut Extraction) {
        for caps in self.py_route.captures_iter(content) {
            insert_route(&mut out.routes, cap_str(&caps, 2));
        }
        let is_urlconf = relative == "urls.py" || relative.ends_with("/urls.py");
        if is_urlconf {
            for caps in self.django_path.captures_iter(content) {
                insert_route(&mut out.routes, &join_route("", cap_str(&caps, 1)));
            }
        }
    }

    fn python_calls(&self, relative: &str, content: &str, out: &mut Extraction) {
        for caps in self.py_call.captures_iter(content) {
            let start = whole_match(&caps).0;
            self.push_call(out, relative, content, start, cap_str(&caps, 1), cap_str(&caps, 2));
        }
    }

    fn method_from_options<'a>(&self, tail: &'a str) -> Option<&'a str> {
        let window = &tail[..floor_char_boundary(tail, 300)];
        self.options_method
            .captures(window)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    fn push_call(
        &self,
        out: &mut Extraction,
        relative: &str,
        content: &str,
        offset: usize,
        method: &str,
        raw_path: &str,
    ) {
        let path = self.interpolation.replace_all(raw_path, ":param").to_string();
        if !path.starts_with('/') {
            return;
        }
        out.calls.push(ApiCall {
            method: method.to_uppercase(),
            path,
            source: SourceLocation {
                file: relative.to_string(),
                line: line_of(content, offset),
            },
        });
    }
}

fn cap_str<'a>(caps: &Captures<'a>, group: usize) -> &'a str {
    caps.get(group).map(|m| m.as_str()).unwrap_or("")
}

fn whole_match(caps: &Captures<'_>) -> (usize, usize) {
    caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0))
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

fn join_route(prefix: &str, path: &str) -> String {
    let parts: Vec<&str> = [prefix, path]
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect();
    format!("/{}", parts.join("/"))
}

fn insert_route(routes: &mut BTreeSet<String>, path: &str) {
    let path = path.trim();
    if path.starts_with('/') {
        routes.insert(path.to_string());
    }
}

/// Drops repeated `(method, path, file)` call sites, keeping the first
pub fn dedupe_calls(calls: Vec<ApiCall>) -> Vec<ApiCall> {
    let mut seen = HashSet::new();
    calls
        .into_iter()
        .filter(|c| seen.insert((c.method.clone(), c.path.clone(), c.source.file.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(relative: &str, content: &str, kind: SourceKind) -> Extraction {
        let mut out = Extraction::default();
        Extractor::new().extract(relative, content, kind, &mut out);
        out
    }

    fn routes(out: &Extraction) -> Vec<&str> {
        out.routes.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_express_routes() {
        let src = r#"
const router = express.Router();
router.get('/users', list);
app.post("/users/:id/orders", create);
axios.get('/not-a-route');
"#;
        let out = run("server.js", src, SourceKind::JavaScript);
        assert_eq!(routes(&out), vec!["/users", "/users/:id/orders"]);
    }

    #[test]
    fn test_nest_controller_prefix() {
        let src = r#"
@Controller('users')
export class UsersController {
  @Get()
  findAll() {}
  @Get(':id')
  findOne() {}
}
"#;
        let out = run("users.controller.ts", src, SourceKind::JavaScript);
        assert_eq!(routes(&out), vec!["/users", "/users/:id"]);
    }

    #[test]
    fn test_fastapi_and_flask_routes() {
        let src = r#"
@app.get("/items/{item_id}")
def read_item(item_id: int): ...

@bp.route('/health')
def health(): ...
"#;
        let out = run("main.py", src, SourceKind::Python);
        assert_eq!(routes(&out), vec!["/health", "/items/{item_id}"]);
    }

    #[test]
    fn test_django_urlconf() {
        let src = "urlpatterns = [\n    path('api/users/', views.users),\n    path('api/users/<int:pk>/', views.user),\n]\n";
        let out = run("app/urls.py", src, SourceKind::Python);
        assert_eq!(routes(&out), vec!["/api/users", "/api/users/<int:pk>"]);
    }

    #[test]
    fn test_axum_and_gin_routes() {
        let rust = r#"Router::new().route("/api/users", get(list)).route("/api/users/{id}", get(one))"#;
        let out = run("src/main.rs", rust, SourceKind::Rust);
        assert_eq!(routes(&out), vec!["/api/users", "/api/users/{id}"]);

        let go = r#"r.GET("/ping", ping)"#;
        let out = run("main.go", go, SourceKind::Go);
        assert_eq!(routes(&out), vec!["/ping"]);
    }

    #[test]
    fn test_fetch_calls_with_method_option() {
        let src = "fetch('/users');\nfetch(\"/users\", { method: 'POST', body });\n";
        let out = run("src/api.js", src, SourceKind::JavaScript);
        assert_eq!(out.calls.len(), 2);
        assert_eq!(out.calls[0].method, "GET");
        assert_eq!(out.calls[0].source.line, 1);
        assert_eq!(out.calls[1].method, "POST");
        assert_eq!(out.calls[1].source.line, 2);
    }

    #[test]
    fn test_axios_calls() {
        let src = "await axios.delete('/users/7');\nconst r = await api.post<User>(`/users`, data);";
        let out = run("src/users.ts", src, SourceKind::JavaScript);
        let calls: Vec<(&str, &str)> = out
            .calls
            .iter()
            .map(|c| (c.method.as_str(), c.path.as_str()))
            .collect();
        assert_eq!(calls, vec![("DELETE", "/users/7"), ("POST", "/users")]);
    }

    #[test]
    fn test_template_interpolation_calls() {
        let src = "const res = await fetch(`${API_URL}/users/${id}/orders`);\naxios.put(`${BASE}/items/${item.id}`, body);\n";
        let out = run("src/client.ts", src, SourceKind::JavaScript);
        let calls: Vec<(&str, &str)> = out
            .calls
            .iter()
            .map(|c| (c.method.as_str(), c.path.as_str()))
            .collect();
        assert_eq!(
            calls,
            vec![("GET", "/users/:param/orders"), ("PUT", "/items/:param")]
        );
    }

    #[test]
    fn test_interpolation_inside_fetch_is_not_double_counted() {
        let src = "fetch(`/users/${id}/orders`)";
        let out = run("a.js", src, SourceKind::JavaScript);
        assert_eq!(out.calls.len(), 1);
        assert_eq!(out.calls[0].path, "/users/:param/orders");
    }

    #[test]
    fn test_python_requests_calls() {
        let src = "requests.post(f\"{BASE}/orders\", json=body)\n";
        let out = run("worker.py", src, SourceKind::Python);
        assert_eq!(out.calls.len(), 1);
        assert_eq!(out.calls[0].method, "POST");
        assert_eq!(out.calls[0].path, "/orders");
    }

    #[test]
    fn test_dedupe_calls() {
        let src = "fetch('/a'); fetch('/a'); fetch('/b');";
        let out = run("a.js", src, SourceKind::JavaScript);
        let deduped = dedupe_calls(out.calls);
        assert_eq!(deduped.len(), 2);
    }
}
