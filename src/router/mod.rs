//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa el dispatcher que mapea (método, path) a su
//! handler. Es una máquina de estados que termina en la primera rama que
//! matchea:
//!
//! 1. `OPTIONS *` → 204 con headers CORS, sin body
//! 2. `/` → `index.html` del directorio estático
//! 3. `/static/...` → archivos estáticos
//! 4. `/uploads/...` → archivos subidos
//! 5. `/resources` → GET lista todo, POST crea (multipart o JSON)
//! 6. `/resources/{id}` → GET/PUT/DELETE sobre ese id
//! 7. cualquier otra cosa → 404
//!
//! Un path conocido con el verbo equivocado es 405.
//!
//! ## Manejo de errores
//!
//! Los handlers retornan `Result<Response, HandlerError>`; el error lleva
//! su status asociado y se convierte a respuesta HTTP exactamente una vez,
//! en `dispatch`. Nada propaga más arriba de la conexión.

use crate::config::Config;
use crate::files::{self, FileError};
use crate::http::{Method, MultipartForm, Request, Response, StatusCode};
use crate::store::ResourceStore;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fallo de un handler, con el status HTTP que le corresponde
#[derive(Debug)]
pub enum HandlerError {
    /// 400 - Body JSON inválido o multipart sin boundary
    BadRequest(String),

    /// 403 - Path que escapa del directorio servido
    Forbidden(String),

    /// 404 - Ruta, recurso o archivo desconocido
    NotFound(String),

    /// 405 - Ruta conocida, verbo incorrecto
    MethodNotAllowed(String),

    /// 500 - Falla interna (E/S inesperada, etc.)
    Internal(String),
}

impl HandlerError {
    /// Status HTTP asociado al error
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::BadRequest(_) => StatusCode::BadRequest,
            HandlerError::Forbidden(_) => StatusCode::Forbidden,
            HandlerError::NotFound(_) => StatusCode::NotFound,
            HandlerError::MethodNotAllowed(_) => StatusCode::MethodNotAllowed,
            HandlerError::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Mensaje para el cliente
    pub fn message(&self) -> &str {
        match self {
            HandlerError::BadRequest(m)
            | HandlerError::Forbidden(m)
            | HandlerError::NotFound(m)
            | HandlerError::MethodNotAllowed(m)
            | HandlerError::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.status())
    }
}

impl std::error::Error for HandlerError {}

impl From<FileError> for HandlerError {
    fn from(error: FileError) -> Self {
        match error {
            FileError::Forbidden => {
                HandlerError::Forbidden("Access outside root directory".to_string())
            }
            FileError::NotFound => HandlerError::NotFound("File not found".to_string()),
            FileError::Io(e) => HandlerError::Internal(format!("IO error: {}", e)),
        }
    }
}

/// Router del servidor: conoce el almacén y los directorios servidos
pub struct Router {
    store: Arc<ResourceStore>,
    static_dir: PathBuf,
    upload_dir: PathBuf,
}

impl Router {
    /// Crea el router a partir de la configuración y el almacén compartido
    pub fn new(store: Arc<ResourceStore>, config: &Config) -> Self {
        Self {
            store,
            static_dir: PathBuf::from(&config.static_dir),
            upload_dir: PathBuf::from(&config.upload_dir),
        }
    }

    /// Procesa un request y produce siempre una respuesta
    ///
    /// Los `HandlerError` se convierten acá a su respuesta de error; los
    /// headers comunes (CORS incluido) se agregan a toda respuesta.
    pub fn dispatch(&self, request: &Request) -> Response {
        let mut response = match self.handle(request) {
            Ok(response) => response,
            Err(error) => Response::error(error.status(), error.message()),
        };
        self.add_common_headers(&mut response);
        response
    }

    /// Construye una respuesta de error con los headers comunes
    ///
    /// Para fallas que ocurren antes de tener un `Request` parseado
    /// (request line ilegible, etc.)
    pub fn error_response(&self, status: StatusCode, message: &str) -> Response {
        let mut response = Response::error(status, message);
        self.add_common_headers(&mut response);
        response
    }

    /// La máquina de estados de ruteo
    fn handle(&self, request: &Request) -> Result<Response, HandlerError> {
        // 1. Preflight CORS: responde para cualquier path
        if request.method() == Method::OPTIONS {
            return Ok(Response::no_content());
        }

        let path = request.path();

        // 2. Raíz → index.html estático
        if path == "/" {
            require_get(request)?;
            return self.serve_file(&self.static_dir, "index.html");
        }

        // 3. Archivos estáticos
        if let Some(rest) = path.strip_prefix("/static/") {
            require_get(request)?;
            return self.serve_file(&self.static_dir, rest);
        }

        // 4. Archivos subidos
        if let Some(rest) = path.strip_prefix("/uploads/") {
            require_get(request)?;
            return self.serve_file(&self.upload_dir, rest);
        }

        // 5. Colección de recursos
        if path == "/resources" {
            return match request.method() {
                Method::GET => self.list_resources(),
                Method::POST => self.create_resource(request),
                method => Err(HandlerError::MethodNotAllowed(format!(
                    "Method {} not allowed for /resources",
                    method.as_str()
                ))),
            };
        }

        // 6. Recurso individual
        if let Some(id) = path.strip_prefix("/resources/") {
            return match request.method() {
                Method::GET => self.get_resource(id),
                Method::PUT => self.update_resource(id, request),
                Method::DELETE => self.delete_resource(id),
                method => Err(HandlerError::MethodNotAllowed(format!(
                    "Method {} not allowed for /resources/{}",
                    method.as_str(),
                    id
                ))),
            };
        }

        // 7. Nada matcheó
        Err(HandlerError::NotFound(format!("Endpoint not found: {}", path)))
    }

    // === Handlers de archivos ===

    fn serve_file(&self, root: &Path, rest: &str) -> Result<Response, HandlerError> {
        let (content, content_type) = files::serve(root, rest)?;
        Ok(Response::new(StatusCode::Ok)
            .with_header("Content-Type", content_type)
            .with_body_bytes(content))
    }

    // === Handlers de recursos ===

    /// GET /resources — mapa completo id → recurso
    fn list_resources(&self) -> Result<Response, HandlerError> {
        let all = self.store.list();
        Ok(Response::json(&to_json(&all)))
    }

    /// POST /resources — crea un recurso desde JSON o multipart
    fn create_resource(&self, request: &Request) -> Result<Response, HandlerError> {
        let content_type = request.header("content-type").unwrap_or("");

        let resource = if content_type.starts_with("multipart/form-data") {
            self.resource_from_multipart(request, content_type)?
        } else {
            parse_json_body(request.body())?
        };

        let id = self.store.create(resource.clone());
        Ok(Response::created(
            &to_json(&resource),
            &format!("/resources/{}", id),
        ))
    }

    /// Construye el recurso `{"name", "value", "image"}` desde un form
    /// multipart; `image` queda en null si no vino archivo
    fn resource_from_multipart(
        &self,
        request: &Request,
        content_type: &str,
    ) -> Result<Value, HandlerError> {
        let boundary = MultipartForm::boundary(content_type).ok_or_else(|| {
            HandlerError::BadRequest("Missing boundary in multipart Content-Type".to_string())
        })?;

        let form = MultipartForm::parse(request.body(), &boundary, &self.upload_dir)
            .map_err(|e| HandlerError::Internal(format!("Upload failed: {}", e)))?;

        Ok(json!({
            "name": form.field("name"),
            "value": form.field("value"),
            "image": form.file("file").map(|f| f.public_path.clone()),
        }))
    }

    /// GET /resources/{id}
    fn get_resource(&self, id: &str) -> Result<Response, HandlerError> {
        match self.store.get(id) {
            Some(resource) => Ok(Response::json(&to_json(&resource))),
            None => Err(not_found(id)),
        }
    }

    /// PUT /resources/{id} — reemplaza el recurso completo
    fn update_resource(&self, id: &str, request: &Request) -> Result<Response, HandlerError> {
        let resource = parse_json_body(request.body())?;

        if self.store.update(id, resource.clone()) {
            Ok(Response::json(&to_json(&resource)))
        } else {
            Err(not_found(id))
        }
    }

    /// DELETE /resources/{id}
    fn delete_resource(&self, id: &str) -> Result<Response, HandlerError> {
        if self.store.delete(id) {
            Ok(Response::no_content())
        } else {
            Err(not_found(id))
        }
    }

    /// Agrega headers comunes (CORS allow-all incluido) a toda respuesta
    fn add_common_headers(&self, response: &mut Response) {
        response.add_header("Server", "resource-server/0.1");
        response.add_header("Connection", "close");
        response.add_header("Access-Control-Allow-Origin", "*");
        response.add_header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        );
        response.add_header("Access-Control-Allow-Headers", "Content-Type");
    }
}

/// Exige GET en rutas de solo lectura
fn require_get(request: &Request) -> Result<(), HandlerError> {
    if request.method() == Method::GET {
        Ok(())
    } else {
        Err(HandlerError::MethodNotAllowed(format!(
            "Method {} not allowed for {}",
            request.method().as_str(),
            request.path()
        )))
    }
}

fn not_found(id: &str) -> HandlerError {
    HandlerError::NotFound(format!("Resource not found: {}", id))
}

/// Parsea el body como documento JSON (cualquier JSON válido se acepta)
fn parse_json_body(body: &[u8]) -> Result<Value, HandlerError> {
    serde_json::from_slice(body)
        .map_err(|_| HandlerError::BadRequest("Invalid JSON body".to_string()))
}

/// Serializa a JSON; sobre `Value`/`HashMap` esto no puede fallar, pero no
/// vale la pena un panic si alguna vez cambia el tipo
fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn test_router(name: &str) -> (Router, Arc<ResourceStore>, PathBuf) {
        let base = std::env::temp_dir().join(format!("resource_server_router_{}", name));
        let _ = fs::remove_dir_all(&base);
        let static_dir = base.join("static");
        let upload_dir = base.join("uploads");
        fs::create_dir_all(&static_dir).unwrap();
        fs::create_dir_all(&upload_dir).unwrap();

        let mut config = Config::default();
        config.static_dir = static_dir.to_string_lossy().into_owned();
        config.upload_dir = upload_dir.to_string_lossy().into_owned();

        let store = Arc::new(ResourceStore::new());
        let router = Router::new(Arc::clone(&store), &config);
        (router, store, base)
    }

    fn request(raw: &[u8]) -> Request {
        Request::read_from(&mut &raw[..]).unwrap()
    }

    fn body_json(response: &Response) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    // ==================== OPTIONS / CORS ====================

    #[test]
    fn test_options_any_path_is_204_with_cors() {
        let (router, _store, _base) = test_router("options");
        let response = router.dispatch(&request(b"OPTIONS /cualquier/cosa HTTP/1.1\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::NoContent);
        assert!(response.body().is_empty());
        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin"),
            Some(&"*".to_string())
        );
        assert!(response
            .headers()
            .get("Access-Control-Allow-Methods")
            .is_some());
    }

    #[test]
    fn test_every_response_has_cors_headers() {
        let (router, _store, _base) = test_router("cors_always");
        let response = router.dispatch(&request(b"GET /resources HTTP/1.1\r\n\r\n"));
        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin"),
            Some(&"*".to_string())
        );
    }

    // ==================== Recursos: colección ====================

    #[test]
    fn test_post_then_get_resource() {
        let (router, _store, _base) = test_router("post_get");

        let raw = b"POST /resources HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 12\r\n\r\n{\"name\":\"a\"}";
        let created = router.dispatch(&request(raw));

        assert_eq!(created.status(), StatusCode::Created);
        assert_eq!(created.headers().get("Location"), Some(&"/resources/1".to_string()));
        assert_eq!(body_json(&created), json!({"name": "a"}));

        let fetched = router.dispatch(&request(b"GET /resources/1 HTTP/1.1\r\n\r\n"));
        assert_eq!(fetched.status(), StatusCode::Ok);
        assert_eq!(body_json(&fetched), json!({"name": "a"}));
    }

    #[test]
    fn test_list_resources() {
        let (router, store, _base) = test_router("list");
        store.create(json!({"name": "a"}));
        store.create(json!({"name": "b"}));

        let response = router.dispatch(&request(b"GET /resources HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::Ok);

        let listed = body_json(&response);
        assert_eq!(listed["1"], json!({"name": "a"}));
        assert_eq!(listed["2"], json!({"name": "b"}));
    }

    #[test]
    fn test_post_malformed_json_is_400() {
        let (router, store, _base) = test_router("bad_json");

        let raw = b"POST /resources HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 9\r\n\r\nno es {{{";
        let response = router.dispatch(&request(raw));

        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_collection_wrong_method_is_405() {
        let (router, _store, _base) = test_router("coll_405");
        let response = router.dispatch(&request(b"DELETE /resources HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    // ==================== Recursos: item ====================

    #[test]
    fn test_get_unknown_id_is_404() {
        let (router, _store, _base) = test_router("get_404");
        let response = router.dispatch(&request(b"GET /resources/999 HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_put_replaces_resource() {
        let (router, store, _base) = test_router("put");
        store.create(json!({"name": "a"}));

        let raw = b"PUT /resources/1 HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 12\r\n\r\n{\"name\":\"b\"}";
        let response = router.dispatch(&request(raw));

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(body_json(&response), json!({"name": "b"}));
        assert_eq!(store.get("1"), Some(json!({"name": "b"})));
    }

    #[test]
    fn test_put_unknown_id_is_404() {
        let (router, _store, _base) = test_router("put_404");
        let raw = b"PUT /resources/999 HTTP/1.1\r\nContent-Length: 12\r\n\r\n{\"name\":\"b\"}";
        let response = router.dispatch(&request(raw));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_put_malformed_body_is_400() {
        let (router, store, _base) = test_router("put_400");
        store.create(json!({"name": "a"}));

        let raw = b"PUT /resources/1 HTTP/1.1\r\nContent-Length: 4\r\n\r\n????";
        let response = router.dispatch(&request(raw));

        assert_eq!(response.status(), StatusCode::BadRequest);
        // El recurso original no se tocó
        assert_eq!(store.get("1"), Some(json!({"name": "a"})));
    }

    #[test]
    fn test_delete_then_get_is_404_and_delete_is_idempotent_failure() {
        let (router, store, _base) = test_router("delete");
        store.create(json!({"name": "a"}));

        let deleted = router.dispatch(&request(b"DELETE /resources/1 HTTP/1.1\r\n\r\n"));
        assert_eq!(deleted.status(), StatusCode::NoContent);

        let fetched = router.dispatch(&request(b"GET /resources/1 HTTP/1.1\r\n\r\n"));
        assert_eq!(fetched.status(), StatusCode::NotFound);

        let again = router.dispatch(&request(b"DELETE /resources/1 HTTP/1.1\r\n\r\n"));
        assert_eq!(again.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_item_wrong_method_is_405() {
        let (router, _store, _base) = test_router("item_405");
        let response = router.dispatch(&request(b"POST /resources/1 HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    // ==================== Multipart ====================

    #[test]
    fn test_post_multipart_creates_resource_with_image() {
        let (router, store, base) = test_router("multipart");

        let boundary = "----TestBoundaryRouter";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!("--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nwidget\r\n--{b}\r\nContent-Disposition: form-data; name=\"value\"\r\n\r\n42\r\n--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"foto.png\"\r\nContent-Type: image/png\r\n\r\n", b = boundary).as_bytes(),
        );
        body.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47]);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let mut raw = format!(
            "POST /resources HTTP/1.1\r\nContent-Type: multipart/form-data; boundary={}\r\nContent-Length: {}\r\n\r\n",
            boundary,
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(&body);

        let response = router.dispatch(&request(&raw));
        assert_eq!(response.status(), StatusCode::Created);

        let resource = body_json(&response);
        assert_eq!(resource["name"], "widget");
        assert_eq!(resource["value"], "42");
        let image = resource["image"].as_str().expect("image path");
        assert!(image.starts_with("/uploads/"));

        // El archivo quedó en disco con los bytes subidos
        let stored = store.get("1").expect("resource stored");
        assert_eq!(stored, resource);
        let disk_path = base.join("uploads").join(image.trim_start_matches("/uploads/"));
        assert_eq!(fs::read(disk_path).unwrap(), &[0x89, 0x50, 0x4E, 0x47]);

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn test_post_multipart_without_boundary_is_400() {
        let (router, _store, _base) = test_router("multipart_nobound");
        let raw = b"POST /resources HTTP/1.1\r\nContent-Type: multipart/form-data\r\nContent-Length: 4\r\n\r\nxxxx";
        let response = router.dispatch(&request(raw));
        assert_eq!(response.status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_post_multipart_without_file_has_null_image() {
        let (router, _store, _base) = test_router("multipart_nofile");

        let boundary = "----NoFile";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nwidget\r\n--{b}--\r\n",
            b = boundary
        );
        let raw = format!(
            "POST /resources HTTP/1.1\r\nContent-Type: multipart/form-data; boundary={}\r\nContent-Length: {}\r\n\r\n{}",
            boundary,
            body.len(),
            body
        );

        let response = router.dispatch(&request(raw.as_bytes()));
        assert_eq!(response.status(), StatusCode::Created);

        let resource = body_json(&response);
        assert_eq!(resource["name"], "widget");
        assert_eq!(resource["image"], Value::Null);
    }

    // ==================== Archivos ====================

    #[test]
    fn test_static_file_served() {
        let (router, _store, base) = test_router("static");
        fs::write(base.join("static/hola.txt"), b"contenido").unwrap();

        let response = router.dispatch(&request(b"GET /static/hola.txt HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body(), b"contenido");
        assert_eq!(response.headers().get("Content-Type"), Some(&"text/plain".to_string()));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn test_root_serves_index_html() {
        let (router, _store, base) = test_router("index");
        fs::write(base.join("static/index.html"), b"<html></html>").unwrap();

        let response = router.dispatch(&request(b"GET / HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.headers().get("Content-Type"), Some(&"text/html".to_string()));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn test_static_traversal_is_403() {
        let (router, _store, _base) = test_router("static_403");
        let response = router.dispatch(&request(b"GET /static/../secreto.txt HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::Forbidden);
    }

    #[test]
    fn test_encoded_traversal_is_403() {
        // %2e%2e%2f se decodifica antes de rutear
        let (router, _store, _base) = test_router("encoded_403");
        let response =
            router.dispatch(&request(b"GET /static/%2e%2e%2fsecreto.txt HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::Forbidden);
    }

    #[test]
    fn test_static_missing_is_404() {
        let (router, _store, _base) = test_router("static_404");
        let response = router.dispatch(&request(b"GET /static/no-existe.css HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_post_to_static_is_405() {
        let (router, _store, _base) = test_router("static_405");
        let raw = b"POST /static/hola.txt HTTP/1.1\r\nContent-Length: 0\r\n\r\n";
        let response = router.dispatch(&request(raw));
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    // ==================== Rutas desconocidas ====================

    #[test]
    fn test_unknown_route_is_404() {
        let (router, _store, _base) = test_router("unknown");
        let response = router.dispatch(&request(b"GET /otra/cosa HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_error_response_carries_cors() {
        let (router, _store, _base) = test_router("error_cors");
        let response = router.error_response(StatusCode::BadRequest, "Invalid request");

        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin"),
            Some(&"*".to_string())
        );
    }
}
