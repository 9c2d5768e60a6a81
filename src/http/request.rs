//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Este módulo implementa un parser HTTP desde cero, directamente sobre el
//! stream de bytes de la conexión.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /resources HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 12\r\n
//! \r\n
//! {"name":"a"}
//! ```
//!
//! ## Algoritmo de lectura
//!
//! 1. Leer en chunks hasta observar el separador `\r\n\r\n`.
//! 2. Parsear la request line: exactamente tres tokens (método, path, versión).
//! 3. Parsear headers `Name: Value`; las llaves se guardan en minúsculas y
//!    ante duplicados gana la última aparición.
//! 4. Si hay `content-length`, seguir leyendo chunks hasta acumular
//!    exactamente esa cantidad de bytes de body.
//!
//! La lectura del body es bloqueante y sin timeout: un cliente que declara
//! un Content-Length y nunca lo completa retiene su thread indefinidamente.
//! Limitación aceptada del diseño, no intentamos arreglarla aquí.

use std::collections::HashMap;
use std::io::Read;

/// Tamaño del chunk de lectura sobre el socket
const READ_CHUNK_SIZE: usize = 8192;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// POST - Crear un recurso
    POST,

    /// PUT - Reemplazar un recurso existente
    PUT,

    /// DELETE - Eliminar un recurso
    DELETE,

    /// OPTIONS - Preflight CORS
    OPTIONS,
}

impl Method {
    /// Parsea un método HTTP desde un string
    ///
    /// # Errores
    ///
    /// Retorna error si el método no es soportado
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// El peer cerró la conexión sin enviar nada
    EmptyRequest,

    /// La conexión se cerró antes de completar headers o body
    IncompleteRequest,

    /// Formato inválido de la request line (no son 3 tokens, o no es UTF-8)
    InvalidRequestLine,

    /// Método HTTP no soportado
    UnsupportedMethod(String),

    /// Versión HTTP incorrecta (debe ser HTTP/1.0 o HTTP/1.1)
    InvalidHttpVersion(String),

    /// Header malformado (línea sin ':')
    InvalidHeader(String),

    /// Content-Length presente pero no numérico
    InvalidContentLength(String),

    /// Error de E/S leyendo del socket
    ConnectionError(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyRequest => write!(f, "Empty request"),
            ParseError::IncompleteRequest => write!(f, "Incomplete HTTP request"),
            ParseError::InvalidRequestLine => write!(f, "Invalid request line format"),
            ParseError::UnsupportedMethod(m) => write!(f, "Unsupported HTTP method: {}", m),
            ParseError::InvalidHttpVersion(v) => write!(f, "Invalid HTTP version: {}", v),
            ParseError::InvalidHeader(h) => write!(f, "Invalid header: {}", h),
            ParseError::InvalidContentLength(v) => write!(f, "Invalid Content-Length: {}", v),
            ParseError::ConnectionError(e) => write!(f, "Connection error: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

/// Representa un request HTTP parseado
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Método HTTP (GET, POST, PUT, DELETE, OPTIONS)
    method: Method,

    /// Path de la petición, ya percent-decodificado (ej: "/resources/1")
    path: String,

    /// Headers HTTP con llaves en minúsculas (ej: {"content-type": "application/json"})
    headers: HashMap<String, String>,

    /// Versión HTTP (HTTP/1.0 o HTTP/1.1)
    version: String,

    /// Body del request, exactamente content-length bytes
    body: Vec<u8>,
}

impl Request {
    /// Lee y parsea un request completo desde un stream
    ///
    /// Lee en chunks hasta tener headers completos y, si el request declara
    /// `Content-Length`, sigue leyendo hasta acumular el body completo.
    /// Un request cuyo body nunca llega a la longitud declarada jamás se
    /// retorna parcialmente: termina en `IncompleteRequest` al cerrarse la
    /// conexión.
    ///
    /// # Ejemplo
    /// ```
    /// use resource_server::http::Request;
    ///
    /// let raw: &[u8] = b"GET /resources HTTP/1.1\r\n\r\n";
    /// let request = Request::read_from(&mut &raw[..]).unwrap();
    ///
    /// assert_eq!(request.path(), "/resources");
    /// ```
    pub fn read_from<R: Read>(stream: &mut R) -> Result<Self, ParseError> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        // 1. Leer hasta ver el separador headers/body
        let header_end = loop {
            if let Some(pos) = find_subsequence(&buffer, b"\r\n\r\n") {
                break pos;
            }

            let n = stream
                .read(&mut chunk)
                .map_err(|e| ParseError::ConnectionError(e.to_string()))?;

            if n == 0 {
                if buffer.is_empty() {
                    return Err(ParseError::EmptyRequest);
                }
                return Err(ParseError::IncompleteRequest);
            }

            buffer.extend_from_slice(&chunk[..n]);
        };

        // 2. Parsear la sección de headers (request line + headers)
        let head = std::str::from_utf8(&buffer[..header_end])
            .map_err(|_| ParseError::InvalidRequestLine)?;

        let mut lines = head.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
        let (method, path, version) = Self::parse_request_line(request_line)?;
        let headers = Self::parse_headers(lines)?;

        // 3. Leer el body hasta completar el content-length declarado.
        //    Invariante: el body retornado mide exactamente esa longitud.
        let content_length = match headers.get("content-length") {
            Some(value) => value
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength(value.clone()))?,
            None => 0,
        };

        let body_start = header_end + 4;
        while buffer.len() - body_start < content_length {
            let n = stream
                .read(&mut chunk)
                .map_err(|e| ParseError::ConnectionError(e.to_string()))?;

            if n == 0 {
                return Err(ParseError::IncompleteRequest);
            }

            buffer.extend_from_slice(&chunk[..n]);
        }

        let body = buffer[body_start..body_start + content_length].to_vec();

        Ok(Request {
            method,
            path,
            headers,
            version,
            body,
        })
    }

    /// Parsea la request line (primera línea del request)
    ///
    /// Formato: `POST /resources HTTP/1.1` — exactamente tres tokens.
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::from_str(parts[0])?;
        let path = percent_decode(parts[1]);

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, path, version))
    }

    /// Parsea los headers HTTP
    ///
    /// Cada header tiene formato `Name: Value`. Las llaves se normalizan a
    /// minúsculas; si una llave se repite, gana la última aparición.
    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            if let Some(colon_pos) = line.find(':') {
                let name = line[..colon_pos].trim().to_lowercase();
                let value = line[colon_pos + 1..].trim().to_string();
                headers.insert(name, value);
            } else {
                return Err(ParseError::InvalidHeader(line.to_string()));
            }
        }

        Ok(headers)
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el path del request (ya percent-decodificado)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico (lookup case-insensitive)
    ///
    /// # Ejemplo
    /// ```
    /// use resource_server::http::Request;
    ///
    /// let raw: &[u8] = b"GET / HTTP/1.1\r\nContent-Type: text/plain\r\n\r\n";
    /// let request = Request::read_from(&mut &raw[..]).unwrap();
    ///
    /// assert_eq!(request.header("Content-Type"), Some("text/plain"));
    /// assert_eq!(request.header("content-type"), Some("text/plain"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Busca la primera ocurrencia de `needle` dentro de `haystack`
pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decodifica percent-escapes de una URL (%20 → espacio, %2F → '/', etc.)
///
/// Los escapes inválidos (p.ej. `%zz` o `%` final) se dejan tal cual:
/// decodificación best-effort, igual que `urllib.parse.unquote`.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        // un escape válido necesita dos dígitos hex después del '%'
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = &s[i + 1..i + 3];
            if let Ok(value) = u8::from_str_radix(hex, 16) {
                decoded.push(value);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
