use crate::fs::FileSystem;
use crate::http::{Method, Request, Response};
use serde_json::json;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Filesystem-backed JSON resource store. Entities live at
/// `<data_path>/<EntityType>/<id>`; bodies are stored verbatim.
#[derive(Clone)]
pub struct CrudHandler {
    pub prefix: String,
    pub data_path: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

// URL tail after the mount prefix: entity type plus optional instance ID.
struct EntityRef {
    entity: String,
    id: Option<String>,
}

impl CrudHandler {
    pub fn new(prefix: impl Into<String>, data_path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            prefix: prefix.into(),
            data_path: data_path.into(),
            fs,
        }
    }

    pub fn handle(&self, request: &Request) -> Response {
        let entity_ref = match self.parse_entity_path(request.path()) {
            Ok(entity_ref) => entity_ref,
            Err(response) => return response,
        };
        match request.method {
            Method::Post => self.create(request, entity_ref),
            Method::Get => self.retrieve_or_list(entity_ref),
            Method::Put => self.upsert(request, entity_ref),
            Method::Delete => self.delete(entity_ref),
            _ => error_response(405, "method not allowed"),
        }
    }

    fn parse_entity_path(&self, path: &str) -> Result<EntityRef, Response> {
        let rest = path
            .strip_prefix(&self.prefix)
            .ok_or_else(|| error_response(400, "request outside mount"))?;
        let rest = rest.trim_start_matches('/');
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() > 2 {
            return Err(error_response(400, "too many path segments"));
        }
        let entity = segments[0];
        if entity.is_empty() {
            return Err(error_response(400, "missing entity type"));
        }
        let id = segments.get(1).filter(|s| !s.is_empty()).map(|s| s.to_string());
        // Dot segments would escape the data directory.
        if entity.starts_with('.') || id.as_deref().map_or(false, |i| i.starts_with('.')) {
            return Err(error_response(400, "invalid entity path"));
        }
        Ok(EntityRef {
            entity: entity.to_string(),
            id,
        })
    }

    // Strict media-type match: bare `application/json` or no header at all.
    fn check_content_type(&self, request: &Request) -> Option<Response> {
        match request.headers.get("Content-Type") {
            None => None,
            Some("application/json") => None,
            Some(_) => Some(error_response(415, "unsupported media type")),
        }
    }

    fn check_json(&self, request: &Request) -> Option<Response> {
        match serde_json::from_slice::<serde_json::Value>(&request.body) {
            Ok(_) => None,
            Err(_) => Some(error_response(400, "invalid JSON body")),
        }
    }

    fn create(&self, request: &Request, entity_ref: EntityRef) -> Response {
        if entity_ref.id.is_some() {
            return error_response(400, "POST may not name an ID");
        }
        if let Some(response) = self.check_content_type(request) {
            return response;
        }
        if let Some(response) = self.check_json(request) {
            return response;
        }
        let dir = self.data_path.join(&entity_ref.entity);
        let next_id = self
            .fs
            .list_dir(&dir)
            .iter()
            .filter_map(|name| name.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        let file = dir.join(next_id.to_string());
        if self.fs.write(&file, &request.body).is_err() {
            return error_response(500, "storage failure");
        }
        let mut response = Response::json(201, json!({ "id": next_id }).to_string());
        response.headers.set(
            "Location",
            format!("{}/{}/{}", self.prefix, entity_ref.entity, next_id),
        );
        response
    }

    fn retrieve_or_list(&self, entity_ref: EntityRef) -> Response {
        let dir = self.data_path.join(&entity_ref.entity);
        match entity_ref.id {
            Some(id) => {
                let file = dir.join(&id);
                match self.fs.read(&file) {
                    Ok(bytes) => Response::json(200, bytes),
                    Err(err) if err.kind() == ErrorKind::NotFound => {
                        error_response(404, "no such entity")
                    }
                    Err(_) => error_response(500, "storage failure"),
                }
            }
            None => {
                let mut ids = self.fs.list_dir(&dir);
                ids.sort();
                Response::json(200, serde_json::to_string(&ids).unwrap_or_else(|_| "[]".into()))
            }
        }
    }

    fn upsert(&self, request: &Request, entity_ref: EntityRef) -> Response {
        let id = match &entity_ref.id {
            Some(id) => id,
            None => return error_response(400, "PUT requires an ID"),
        };
        if let Some(response) = self.check_content_type(request) {
            return response;
        }
        if let Some(response) = self.check_json(request) {
            return response;
        }
        let file = self.data_path.join(&entity_ref.entity).join(id);
        let existed = self.fs.exists(&file);
        if self.fs.write(&file, &request.body).is_err() {
            return error_response(500, "storage failure");
        }
        if existed {
            Response::new(204)
        } else {
            let mut response = Response::new(201);
            response.headers.set(
                "Location",
                format!("{}/{}/{}", self.prefix, entity_ref.entity, id),
            );
            response
        }
    }

    fn delete(&self, entity_ref: EntityRef) -> Response {
        let id = match &entity_ref.id {
            Some(id) => id,
            None => return error_response(400, "DELETE requires an ID"),
        };
        let file = self.data_path.join(&entity_ref.entity).join(id);
        if !self.fs.exists(&file) {
            return error_response(404, "no such entity");
        }
        match self.fs.remove(&file) {
            Ok(()) => Response::new(204),
            Err(_) => error_response(500, "storage failure"),
        }
    }
}

fn error_response(status: u16, message: &str) -> Response {
    Response::json(status, json!({ "error": message }).to_string())
}
