//! # Servido de Archivos Estáticos y Uploads
//! src/files/mod.rs
//!
//! Resuelve paths pedidos por el cliente contra un directorio raíz y
//! retorna el contenido completo del archivo con su content type inferido
//! por extensión.
//!
//! ## Seguridad
//!
//! Cualquier resolución que escape de la raíz servida es `Forbidden`:
//! - chequeo léxico: se rechazan componentes `..` y paths absolutos antes
//!   de tocar el filesystem (así un traversal a un archivo inexistente da
//!   403 y no 404)
//! - chequeo canónico: el path resuelto (symlinks incluidos) debe seguir
//!   bajo la raíz canonicalizada

use std::fs;
use std::path::{Component, Path};

/// Errores al servir un archivo
#[derive(Debug)]
pub enum FileError {
    /// El path resuelve fuera de la raíz servida
    Forbidden,

    /// El archivo no existe (o es un directorio)
    NotFound,

    /// Error de E/S inesperado leyendo el archivo
    Io(std::io::Error),
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileError::Forbidden => write!(f, "Forbidden: access outside root directory"),
            FileError::NotFound => write!(f, "File not found"),
            FileError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for FileError {}

/// Resuelve `relative_path` contra `root` y retorna (contenido, content type)
///
/// `relative_path` es lo que queda del path del request después del prefijo
/// de la ruta (ej: para `GET /static/css/app.css` llega `css/app.css`).
///
/// # Ejemplo
/// ```no_run
/// use resource_server::files;
/// use std::path::Path;
///
/// let (bytes, content_type) = files::serve(Path::new("./static"), "index.html").unwrap();
/// assert_eq!(content_type, "text/html");
/// # let _ = bytes;
/// ```
pub fn serve(root: &Path, relative_path: &str) -> Result<(Vec<u8>, &'static str), FileError> {
    // 1. Rechazo léxico: nada de "..", paths absolutos ni prefijos raros
    let requested = Path::new(relative_path);
    for component in requested.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(FileError::Forbidden),
        }
    }

    // 2. Resolver contra la raíz canonicalizada
    let canonical_root = root.canonicalize().map_err(|_| FileError::NotFound)?;
    let full_path = canonical_root.join(requested);

    let canonical = match full_path.canonicalize() {
        Ok(path) => path,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(FileError::NotFound),
        Err(e) => return Err(FileError::Io(e)),
    };

    // Un symlink dentro de la raíz puede apuntar afuera
    if !canonical.starts_with(&canonical_root) {
        return Err(FileError::Forbidden);
    }

    if canonical.is_dir() {
        return Err(FileError::NotFound);
    }

    let content = fs::read(&canonical).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FileError::NotFound,
        _ => FileError::Io(e),
    })?;

    Ok((content, content_type_for(&canonical)))
}

/// Infere el content type a partir de la extensión del archivo
///
/// Extensiones desconocidas (o ausentes) caen en `application/octet-stream`.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
