//! # Decodificador multipart/form-data
//! src/http/multipart.rs
//!
//! Parsea bodies `multipart/form-data` a mano, separando campos de texto de
//! partes de archivo según el token boundary declarado en el Content-Type.
//!
//! ## Formato del body
//!
//! ```text
//! --BOUNDARY\r\n
//! Content-Disposition: form-data; name="name"\r\n
//! \r\n
//! widget\r\n
//! --BOUNDARY\r\n
//! Content-Disposition: form-data; name="file"; filename="foto.png"\r\n
//! Content-Type: image/png\r\n
//! \r\n
//! <bytes del archivo>\r\n
//! --BOUNDARY--\r\n
//! ```
//!
//! El decode es best-effort: una parte malformada se ignora en lugar de
//! fallar todo el request. Si el mismo nombre de campo aparece dos veces,
//! gana la última aparición.
//!
//! Las partes con `filename` se escriben inmediatamente al directorio de
//! uploads bajo un nombre único que preserva la extensión original.

use crate::http::request::find_subsequence;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Contador de proceso para desempatar archivos subidos en el mismo nanosegundo
static UPLOAD_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Registro de un archivo subido vía multipart
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    /// Nombre original declarado por el cliente (sin sanitizar, solo informativo)
    pub original_name: String,

    /// Content-Type declarado de la parte (o application/octet-stream)
    pub content_type: String,

    /// Ruta en disco donde quedó guardado el archivo
    pub disk_path: PathBuf,

    /// Ruta pública con la que el archivo puede pedirse al servidor
    pub public_path: String,
}

/// Resultado de decodificar un body multipart: campos de texto y archivos
#[derive(Debug, Default)]
pub struct MultipartForm {
    /// Campos de texto: nombre → valor
    fields: HashMap<String, String>,

    /// Partes de archivo: nombre de campo → registro del archivo guardado
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Extrae el token boundary de un header Content-Type
    ///
    /// # Ejemplo
    /// ```
    /// use resource_server::http::MultipartForm;
    ///
    /// let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
    /// let boundary = MultipartForm::boundary(ct).unwrap();
    /// assert_eq!(boundary, "----WebKitFormBoundary7MA4YWxkTrZu0gW");
    /// ```
    pub fn boundary(content_type: &str) -> Option<String> {
        for param in content_type.split(';') {
            let param = param.trim();
            if let Some(value) = param.strip_prefix("boundary=") {
                // algunos clientes mandan el boundary entre comillas
                let value = value.trim_matches('"');
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        None
    }

    /// Decodifica un body multipart y guarda los archivos en `upload_dir`
    ///
    /// Las partes con `filename` se escriben a disco de inmediato; las demás
    /// se interpretan como campos de texto. Partes malformadas se descartan
    /// silenciosamente. Solo los errores de E/S al escribir archivos
    /// propagan.
    pub fn parse(body: &[u8], boundary: &str, upload_dir: &Path) -> std::io::Result<Self> {
        let delimiter = format!("--{}", boundary).into_bytes();
        let mut form = MultipartForm::default();

        // Separar el body en segmentos por cada "--boundary".
        // El primero es el preámbulo y el último el cierre ("--\r\n"):
        // ambos se descartan.
        let segments = split_on(body, &delimiter);
        if segments.len() < 3 {
            return Ok(form);
        }

        for segment in &segments[1..segments.len() - 1] {
            // Cada segmento arranca con el \r\n que sigue al boundary
            let part = match segment.strip_prefix(b"\r\n".as_slice()) {
                Some(rest) => rest,
                None => continue,
            };

            // Separar headers de la parte y su contenido
            let header_end = match find_subsequence(part, b"\r\n\r\n") {
                Some(pos) => pos,
                None => continue,
            };

            let part_headers = match std::str::from_utf8(&part[..header_end]) {
                Ok(text) => text,
                Err(_) => continue,
            };

            // El contenido termina en el \r\n que precede al siguiente boundary
            let content = &part[header_end + 4..];
            let content = content.strip_suffix(b"\r\n".as_slice()).unwrap_or(content);

            let disposition = match header_value(part_headers, "content-disposition") {
                Some(value) => value,
                None => continue,
            };

            let field_name = match disposition_param(disposition, "name") {
                Some(name) => name,
                None => continue,
            };

            match disposition_param(disposition, "filename") {
                Some(filename) if !filename.is_empty() => {
                    let content_type = header_value(part_headers, "content-type")
                        .unwrap_or("application/octet-stream")
                        .to_string();

                    let stored_name = unique_filename(&filename);
                    let disk_path = upload_dir.join(&stored_name);

                    fs::create_dir_all(upload_dir)?;
                    fs::write(&disk_path, content)?;

                    form.files.insert(
                        field_name,
                        UploadedFile {
                            original_name: filename,
                            content_type,
                            disk_path,
                            public_path: format!("/uploads/{}", stored_name),
                        },
                    );
                }
                _ => {
                    let value = String::from_utf8_lossy(content).into_owned();
                    form.fields.insert(field_name, value);
                }
            }
        }

        Ok(form)
    }

    /// Obtiene el valor de un campo de texto
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    /// Obtiene el registro del archivo subido bajo un nombre de campo
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// Obtiene todos los campos de texto
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Obtiene todos los archivos subidos
    pub fn files(&self) -> &HashMap<String, UploadedFile> {
        &self.files
    }
}

/// Divide `data` en segmentos separados por `delimiter` (el delimitador no
/// forma parte de ningún segmento)
fn split_on<'a>(data: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    let mut rest = data;

    while let Some(pos) = find_subsequence(rest, delimiter) {
        segments.push(&rest[..pos]);
        rest = &rest[pos + delimiter.len()..];
    }
    segments.push(rest);

    segments
}

/// Busca un header por nombre (case-insensitive) dentro de los headers de
/// una parte y retorna su valor
fn header_value<'a>(part_headers: &'a str, name: &str) -> Option<&'a str> {
    for line in part_headers.split("\r\n") {
        if let Some(colon_pos) = line.find(':') {
            if line[..colon_pos].trim().eq_ignore_ascii_case(name) {
                return Some(line[colon_pos + 1..].trim());
            }
        }
    }
    None
}

/// Extrae un sub-parámetro de un Content-Disposition
///
/// Ejemplo: `form-data; name="file"; filename="foto.png"` con key `filename`
/// retorna `foto.png`.
fn disposition_param(disposition: &str, key: &str) -> Option<String> {
    for param in disposition.split(';') {
        let param = param.trim();
        if let Some(eq_pos) = param.find('=') {
            if param[..eq_pos].trim().eq_ignore_ascii_case(key) {
                let value = param[eq_pos + 1..].trim().trim_matches('"');
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Genera un nombre de archivo único que preserva la extensión original
///
/// Hashea timestamp + contador de proceso + nombre original con SHA-256 y
/// usa los primeros 16 bytes en hex. El contador garantiza que dos uploads
/// en el mismo instante no colisionen.
fn unique_filename(original: &str) -> String {
    let counter = UPLOAD_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(counter.to_le_bytes());
    hasher.update(original.as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();

    // Preservar la extensión, descartando cualquier cosa sospechosa
    match original.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= 10
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{}.{}", hex, ext)
        }
        _ => hex,
    }
}
