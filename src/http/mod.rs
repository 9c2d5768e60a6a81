//! # Módulo HTTP
//!
//! Este módulo implementa el protocolo HTTP desde cero, sin usar
//! librerías de alto nivel. Incluye:
//!
//! - Parsing de requests directamente sobre el stream TCP
//! - Decodificación de bodies multipart/form-data
//! - Construcción de responses HTTP
//! - Manejo de status codes
//!
//! ## Subconjunto soportado
//!
//! Trabajamos sobre un subconjunto de HTTP/1.1 en texto plano:
//! - Request line de tres tokens y headers `Name: Value` con CRLF
//! - Body delimitado solo por `Content-Length` (sin chunked encoding)
//! - Una conexión por request (`Connection: close`)

// Submódulos del módulo HTTP
pub mod multipart; // Decodificación multipart/form-data
pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado

// Re-exportar los tipos principales para facilitar el uso
pub use multipart::{MultipartForm, UploadedFile};
pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
