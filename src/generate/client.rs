//! TypeScript API client and shared type stubs

use super::templates::handler_name;
use crate::analysis::RepoSummary;
use crate::matching::{collect_routes, MatchResult, WILDCARD};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

const CLIENT_PRELUDE: &str = "\
const BASE_URL = process.env.BACKEND_URL ?? 'http://localhost:8000';

async function request<T>(method: string, path: string, body?: unknown): Promise<T> {
  const response = await fetch(`${BASE_URL}${path}`, {
    method,
    headers: { 'Content-Type': 'application/json' },
    credentials: 'include',
    body: body === undefined ? undefined : JSON.stringify(body),
  });
  if (!response.ok) {
    throw new Error(`${method} ${path} failed with status ${response.status}`);
  }
  return (await response.json()) as T;
}
";

fn camel_case(snake: &str) -> String {
    let mut out = String::new();
    for (i, word) in snake.split('_').filter(|w| !w.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn pascal_case(word: &str) -> String {
    word.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        format!("{}y", stem)
    } else if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

fn is_prefix_segment(segment: &str) -> bool {
    segment == "api"
        || (segment.len() > 1
            && segment.starts_with('v')
            && segment[1..].chars().all(|c| c.is_ascii_digit()))
}

/// Methods observed per normalized route, `GET` when none matched it
fn methods_by_route(routes: &[String], matches: &MatchResult) -> BTreeMap<String, BTreeSet<String>> {
    let mut methods: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for m in &matches.matched {
        methods
            .entry(m.route.clone())
            .or_default()
            .insert(m.call.method.to_uppercase());
    }
    for route in routes {
        methods
            .entry(route.clone())
            .or_insert_with(|| BTreeSet::from(["GET".to_string()]));
    }
    methods
}

fn client_function(method: &str, route: &str) -> String {
    let mut params = Vec::new();
    let mut template = String::new();
    for segment in route.split('/').filter(|s| !s.is_empty()) {
        template.push('/');
        if segment == WILDCARD {
            let name = if params.is_empty() {
                "id".to_string()
            } else {
                format!("id{}", params.len() + 1)
            };
            let _ = write!(template, "${{{}}}", name);
            params.push(format!("{}: string", name));
        } else {
            template.push_str(segment);
        }
    }
    if template.is_empty() {
        template.push('/');
    }
    let with_body = matches!(method, "POST" | "PUT" | "PATCH");
    if with_body {
        params.push("body?: unknown".to_string());
    }
    let body_arg = if with_body { ", body" } else { "" };
    format!(
        "export async function {}({}): Promise<unknown> {{\n  return request('{}', `{}`{});\n}}\n",
        camel_case(&handler_name(method, route)),
        params.join(", "),
        method,
        template,
        body_arg
    )
}

/// One typed fetch wrapper per declared backend route
pub fn api_client(summaries: &[RepoSummary], matches: &MatchResult) -> Option<String> {
    let routes = collect_routes(summaries);
    if routes.is_empty() {
        return None;
    }
    let mut out = String::from("// Generated by repofuse\n");
    out.push_str(CLIENT_PRELUDE);
    for (route, methods) in methods_by_route(&routes, matches) {
        for method in methods {
            out.push('\n');
            out.push_str(&client_function(&method, &route));
        }
    }
    Some(out)
}

/// Interface stubs for resources named by routes and data models
pub fn shared_types(summaries: &[RepoSummary]) -> Option<String> {
    let mut types: BTreeSet<String> = BTreeSet::new();
    for route in collect_routes(summaries) {
        let resource = route
            .split('/')
            .filter(|s| !s.is_empty() && *s != WILDCARD)
            .find(|s| !is_prefix_segment(s));
        if let Some(resource) = resource {
            let name = pascal_case(&singular(resource));
            if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()) {
                types.insert(name);
            }
        }
    }
    for model in summaries.iter().flat_map(|s| s.data_models.iter()) {
        let name = pascal_case(model.trim());
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()) {
            types.insert(name);
        }
    }
    if types.is_empty() {
        return None;
    }

    let mut out = String::from("// Generated by repofuse\n");
    for name in types {
        let _ = write!(
            out,
            "\nexport interface {} {{\n  id: string;\n  [key: string]: unknown;\n}}\n",
            name
        );
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FrameworkId;
    use crate::matching::match_interfaces;

    fn backend(routes: &[&str]) -> RepoSummary {
        let mut s = RepoSummary::new("https://github.com/acme/api");
        s.framework = Some(FrameworkId::Express);
        s.api_routes = routes.iter().map(|r| r.to_string()).collect();
        s
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(camel_case("get_users_by_id"), "getUsersById");
        assert_eq!(pascal_case("order-items"), "OrderItems");
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("users"), "user");
        assert_eq!(singular("address"), "address");
    }

    #[test]
    fn test_api_client_function_per_route() {
        let summaries = [backend(&["/users", "/users/:id"])];
        let client = api_client(&summaries, &match_interfaces(&summaries)).unwrap();

        assert!(client.contains("export async function getUsers(): Promise<unknown>"));
        assert!(client.contains("export async function getUsersById(id: string)"));
        assert!(client.contains("request('GET', `/users/${id}`)"));
    }

    #[test]
    fn test_api_client_uses_matched_methods() {
        let mut web = RepoSummary::new("https://github.com/acme/web");
        web.framework = Some(FrameworkId::React);
        web.api_calls = vec![crate::analysis::ApiCall {
            method: "POST".to_string(),
            path: "/orders".to_string(),
            source: crate::analysis::SourceLocation {
                file: "src/api.js".to_string(),
                line: 3,
            },
        }];
        let summaries = [web, backend(&["/orders"])];
        let client = api_client(&summaries, &match_interfaces(&summaries)).unwrap();

        assert!(client.contains("postOrders(body?: unknown)"));
        assert!(!client.contains("getOrders"));
    }

    #[test]
    fn test_no_routes_no_client() {
        let summaries = [backend(&[])];
        assert!(api_client(&summaries, &MatchResult::default()).is_none());
        assert!(shared_types(&summaries).is_none());
    }

    #[test]
    fn test_shared_types_from_routes_and_models() {
        let mut api = backend(&["/api/v1/users/:id", "/categories", "/"]);
        api.data_models = vec!["Invoice".to_string()];
        let types = shared_types(&[api]).unwrap();

        assert!(types.contains("export interface User {"));
        assert!(types.contains("export interface Category {"));
        assert!(types.contains("export interface Invoice {"));
    }
}
