use crate::config::{Block, ConfigError, Statement};
use crate::fs::FileSystem;
use crate::handlers::{
    CrudHandler, EchoHandler, Handler, HealthHandler, MarkdownHandler, NotFoundHandler,
    SleepHandler, StaticHandler,
};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Zero-argument factory registered per handler type at startup.
pub type ArchetypeFactory = fn() -> Handler;

/// Factory that has captured its location's parameters and builds a fresh
/// handler per request.
pub type BoundFactory = Arc<dyn Fn() -> Handler + Send + Sync>;

static ARCHETYPES: OnceCell<FxHashMap<&'static str, ArchetypeFactory>> = OnceCell::new();

/// Populates the process-global type-name registry. Safe to call more than
/// once; the first registration wins.
pub fn register_builtin_handlers() {
    ARCHETYPES.get_or_init(|| {
        let mut map: FxHashMap<&'static str, ArchetypeFactory> = FxHashMap::default();
        map.insert("EchoHandler", || Handler::Echo(EchoHandler));
        map.insert("StaticHandler", || Handler::Static(StaticHandler::default()));
        map.insert("CrudHandler", || {
            Handler::Crud(CrudHandler::new("", "", Arc::new(crate::fs::MemFs::new())))
        });
        map.insert("MarkdownHandler", || {
            Handler::Markdown(MarkdownHandler::default())
        });
        map.insert("HealthRequestHandler", || Handler::Health(HealthHandler));
        map.insert("SleepHandler", || Handler::Sleep(SleepHandler::default()));
        map.insert("NotFoundHandler", || Handler::NotFound(NotFoundHandler));
        map
    });
}

/// Looks up the archetype factory for a handler type name.
pub fn archetype(name: &str) -> Option<ArchetypeFactory> {
    ARCHETYPES.get().and_then(|map| map.get(name).copied())
}

struct Route {
    prefix: String,
    kind: &'static str,
    factory: BoundFactory,
}

/// Longest-prefix routing table, immutable after construction.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Builds the table from the top-level `location` statements. Any
    /// invalid entry aborts construction; the server must not start on a
    /// half-valid config.
    pub fn from_config(root: &Block, fs: Arc<dyn FileSystem>) -> Result<Router, ConfigError> {
        register_builtin_handlers();
        let mut routes: Vec<Route> = Vec::new();

        for stmt in &root.statements {
            if stmt.tokens.first().map(String::as_str) != Some("location") {
                continue;
            }
            if stmt.tokens.len() != 3 {
                return Err(route_error(
                    "location directive takes a prefix and a handler type",
                ));
            }
            let prefix = dequote(&stmt.tokens[1]);
            let kind_name = dequote(&stmt.tokens[2]);
            let block = stmt.block.as_ref().ok_or_else(|| {
                route_error(&format!("location {} is missing its block", prefix))
            })?;

            if prefix.is_empty() || !prefix.starts_with('/') {
                return Err(route_error(&format!(
                    "prefix {:?} must begin with '/'",
                    prefix
                )));
            }
            if prefix != "/" && prefix.ends_with('/') {
                return Err(route_error(&format!(
                    "prefix {} may not end with '/'",
                    prefix
                )));
            }
            if routes.iter().any(|r| r.prefix == prefix) {
                return Err(route_error(&format!("duplicate prefix {}", prefix)));
            }

            let (kind, factory) = bind_factory(&prefix, &kind_name, block, fs.clone())?;
            routes.push(Route {
                prefix,
                kind,
                factory,
            });
        }

        // Longest prefix first; equal lengths keep config order.
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(Router { routes })
    }

    /// First mapping whose prefix textually prefixes the URI's path
    /// component, or the NotFound sentinel.
    pub fn route(&self, target: &str) -> (&'static str, Handler) {
        let path = match target.find('?') {
            Some(idx) => &target[..idx],
            None => target,
        };
        for route in &self.routes {
            if path.starts_with(&route.prefix) {
                return (route.kind, (route.factory)());
            }
        }
        ("NotFoundHandler", Handler::NotFound(NotFoundHandler))
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.prefix.as_str())
    }
}

fn bind_factory(
    prefix: &str,
    kind_name: &str,
    block: &Block,
    fs: Arc<dyn FileSystem>,
) -> Result<(&'static str, BoundFactory), ConfigError> {
    // The registry lookup both validates the type name and canonicalizes it
    // to a 'static string for logging.
    let kind = match archetype(kind_name).map(|factory| factory().type_name()) {
        Some(kind) => kind,
        None => return Err(route_error(&format!("unknown handler type {}", kind_name))),
    };

    let factory: BoundFactory = match kind {
        "EchoHandler" => Arc::new(|| Handler::Echo(EchoHandler)),
        "HealthRequestHandler" => Arc::new(|| Handler::Health(HealthHandler)),
        "NotFoundHandler" => Arc::new(|| Handler::NotFound(NotFoundHandler)),
        "SleepHandler" => {
            let delay = match directive(block, "delay_ms") {
                Some(value) => Duration::from_millis(value.parse().map_err(|_| {
                    route_error(&format!("location {}: delay_ms must be an integer", prefix))
                })?),
                None => Duration::from_millis(crate::handlers::sleep::DEFAULT_DELAY_MS),
            };
            Arc::new(move || Handler::Sleep(SleepHandler { delay }))
        }
        "StaticHandler" => {
            let root = required(block, "root", prefix, "StaticHandler")?;
            let prefix = prefix.to_string();
            Arc::new(move || Handler::Static(StaticHandler::new(prefix.clone(), root.clone())))
        }
        "CrudHandler" => {
            let data_path = PathBuf::from(required(block, "data_path", prefix, "CrudHandler")?);
            let prefix = prefix.to_string();
            Arc::new(move || {
                Handler::Crud(CrudHandler::new(
                    prefix.clone(),
                    data_path.clone(),
                    fs.clone(),
                ))
            })
        }
        "MarkdownHandler" => {
            let root = PathBuf::from(required(block, "root", prefix, "MarkdownHandler")?);
            let template = PathBuf::from(required(block, "template", prefix, "MarkdownHandler")?);
            let prefix = prefix.to_string();
            Arc::new(move || {
                Handler::Markdown(MarkdownHandler::new(
                    prefix.clone(),
                    root.clone(),
                    Some(template.clone()),
                ))
            })
        }
        _ => unreachable!("registry and binder cover the same types"),
    };
    Ok((kind, factory))
}

// First child statement of the form `<name> <value>;`.
fn directive(block: &Block, name: &str) -> Option<String> {
    block
        .statements
        .iter()
        .find(|stmt| is_directive(stmt, name))
        .map(|stmt| dequote(&stmt.tokens[1]))
}

fn is_directive(stmt: &Statement, name: &str) -> bool {
    stmt.tokens.len() == 2 && stmt.tokens[0] == name && stmt.block.is_none()
}

fn required(block: &Block, name: &str, prefix: &str, kind: &str) -> Result<String, ConfigError> {
    directive(block, name).ok_or_else(|| {
        route_error(&format!(
            "location {}: {} requires a {} directive",
            prefix, kind, name
        ))
    })
}

// Quoted config tokens keep their quotes; parameter values drop them.
fn dequote(token: &str) -> String {
    let bytes = token.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        token[1..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

fn route_error(message: &str) -> ConfigError {
    ConfigError::Route(message.to_string())
}
