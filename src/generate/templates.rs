//! Framework-specific text templates: CORS setup and endpoint stubs

use crate::analysis::FrameworkId;
use crate::matching::{normalize_path, WILDCARD};

pub const FRONTEND_ORIGIN: &str = "http://localhost:3000";

/// Middleware snippet enabling cross-origin requests from the frontend
pub fn cors_snippet(framework: FrameworkId) -> Option<String> {
    let snippet = match framework {
        FrameworkId::Express => format!(
            "// Add to your Express app\n\
             import cors from 'cors';\n\
             app.use(cors({{ origin: '{FRONTEND_ORIGIN}', credentials: true }}));\n"
        ),
        FrameworkId::Fastify => format!(
            "// Register before your routes\n\
             import cors from '@fastify/cors';\n\
             await fastify.register(cors, {{ origin: '{FRONTEND_ORIGIN}', credentials: true }});\n"
        ),
        FrameworkId::Koa => format!(
            "// Add to your Koa app\n\
             import cors from '@koa/cors';\n\
             app.use(cors({{ origin: '{FRONTEND_ORIGIN}', credentials: true }}));\n"
        ),
        FrameworkId::NestJs => format!(
            "// In main.ts, after NestFactory.create\n\
             app.enableCors({{ origin: '{FRONTEND_ORIGIN}', credentials: true }});\n"
        ),
        FrameworkId::FastApi => format!(
            "# Add to your FastAPI app\n\
             from fastapi.middleware.cors import CORSMiddleware\n\
             app.add_middleware(CORSMiddleware, allow_origins=[\"{FRONTEND_ORIGIN}\"], \
             allow_credentials=True, allow_methods=[\"*\"], allow_headers=[\"*\"])\n"
        ),
        FrameworkId::Flask => format!(
            "# Add to your Flask app\n\
             from flask_cors import CORS\n\
             CORS(app, origins=[\"{FRONTEND_ORIGIN}\"], supports_credentials=True)\n"
        ),
        FrameworkId::Django => format!(
            "# settings.py (requires django-cors-headers)\n\
             INSTALLED_APPS += [\"corsheaders\"]\n\
             MIDDLEWARE.insert(0, \"corsheaders.middleware.CorsMiddleware\")\n\
             CORS_ALLOWED_ORIGINS = [\"{FRONTEND_ORIGIN}\"]\n\
             CORS_ALLOW_CREDENTIALS = True\n"
        ),
        FrameworkId::Axum => format!(
            "// Add tower-http with the \"cors\" feature\n\
             use tower_http::cors::CorsLayer;\n\
             let cors = CorsLayer::new()\n    \
             .allow_origin(\"{FRONTEND_ORIGIN}\".parse::<HeaderValue>().unwrap())\n    \
             .allow_credentials(true);\n\
             let app = app.layer(cors);\n"
        ),
        FrameworkId::ActixWeb => format!(
            "// Add actix-cors\n\
             use actix_cors::Cors;\n\
             App::new().wrap(Cors::default().allowed_origin(\"{FRONTEND_ORIGIN}\").supports_credentials())\n"
        ),
        FrameworkId::Gin => format!(
            "// go get github.com/gin-contrib/cors\n\
             r.Use(cors.New(cors.Config{{AllowOrigins: []string{{\"{FRONTEND_ORIGIN}\"}}, AllowCredentials: true}}))\n"
        ),
        FrameworkId::Echo => format!(
            "// Echo ships CORS middleware\n\
             e.Use(middleware.CORSWithConfig(middleware.CORSConfig{{AllowOrigins: []string{{\"{FRONTEND_ORIGIN}\"}}, AllowCredentials: true}}))\n"
        ),
        _ => return None,
    };
    Some(snippet)
}

/// Rewrites wildcard segments into the framework's parameter syntax
fn framework_path(framework: FrameworkId, path: &str) -> String {
    let normalized = normalize_path(path);
    let mut index = 0;
    let segments: Vec<String> = normalized
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s != WILDCARD {
                return s.to_string();
            }
            index += 1;
            let name = if index == 1 {
                "id".to_string()
            } else {
                format!("id{}", index)
            };
            match framework {
                FrameworkId::FastApi | FrameworkId::Axum | FrameworkId::ActixWeb => {
                    format!("{{{}}}", name)
                }
                FrameworkId::Flask => format!("<{}>", name),
                FrameworkId::Django => format!("<str:{}>", name),
                _ => format!(":{}", name),
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Handler name derived from method and literal segments
pub fn handler_name(method: &str, path: &str) -> String {
    let mut name = method.to_lowercase();
    for segment in normalize_path(path).split('/').filter(|s| !s.is_empty()) {
        let word = if segment == WILDCARD { "by_id" } else { segment };
        name.push('_');
        name.extend(
            word.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
        );
    }
    if name == method.to_lowercase() {
        name.push_str("_root");
    }
    name
}

/// Stub handler for an endpoint the frontend calls but no backend declares
pub fn endpoint_stub(framework: FrameworkId, method: &str, path: &str) -> String {
    let method_lower = method.to_lowercase();
    let route = framework_path(framework, path);
    let handler = handler_name(method, path);
    match framework {
        FrameworkId::FastApi => format!(
            "@app.{method_lower}(\"{route}\")\nasync def {handler}():\n    return {{\"status\": \"not implemented\"}}\n"
        ),
        FrameworkId::Flask => format!(
            "@app.route(\"{route}\", methods=[\"{method}\"])\ndef {handler}(**kwargs):\n    return {{\"status\": \"not implemented\"}}, 501\n"
        ),
        FrameworkId::Django => format!(
            "# urls.py: path(\"{}\", views.{handler})\ndef {handler}(request, **kwargs):\n    return JsonResponse({{\"status\": \"not implemented\"}}, status=501)\n",
            route.trim_start_matches('/')
        ),
        FrameworkId::Axum => format!(
            "// .route(\"{route}\", {method_lower}({handler}))\nasync fn {handler}() -> StatusCode {{\n    StatusCode::NOT_IMPLEMENTED\n}}\n"
        ),
        FrameworkId::ActixWeb => format!(
            "#[{method_lower}(\"{route}\")]\nasync fn {handler}() -> HttpResponse {{\n    HttpResponse::NotImplemented().finish()\n}}\n"
        ),
        FrameworkId::Gin => format!(
            "r.{method}(\"{route}\", func(c *gin.Context) {{\n\tc.JSON(http.StatusNotImplemented, gin.H{{\"status\": \"not implemented\"}})\n}})\n"
        ),
        FrameworkId::Echo => format!(
            "e.{method}(\"{route}\", func(c echo.Context) error {{\n\treturn c.JSON(http.StatusNotImplemented, map[string]string{{\"status\": \"not implemented\"}})\n}})\n"
        ),
        FrameworkId::NestJs => {
            let decorator = format!("{}{}", &method[..1].to_uppercase(), &method_lower[1..]);
            format!(
                "@{decorator}('{}')\n{handler}() {{\n  throw new NotImplementedException();\n}}\n",
                route.trim_start_matches('/')
            )
        }
        FrameworkId::Fastify => format!(
            "fastify.{method_lower}('{route}', async (request, reply) => {{\n  reply.code(501).send({{ status: 'not implemented' }});\n}});\n"
        ),
        FrameworkId::Koa => format!(
            "router.{method_lower}('{route}', (ctx) => {{\n  ctx.status = 501;\n  ctx.body = {{ status: 'not implemented' }};\n}});\n"
        ),
        _ => format!(
            "app.{method_lower}('{route}', (req, res) => {{\n  res.status(501).json({{ status: 'not implemented' }});\n}});\n"
        ),
    }
}
