//! # Resource Server
//! src/lib.rs
//!
//! Servidor HTTP concurrente implementado desde cero sobre sockets TCP:
//! expone un almacén de recursos en memoria vía verbos REST, sirve
//! archivos estáticos y acepta uploads multipart.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing de requests, multipart, responses y status codes
//! - `store`: Almacén de recursos en memoria con ids monotónicos
//! - `files`: Servido de archivos estáticos y subidos
//! - `router`: Máquina de estados de ruteo y conversión de errores
//! - `server`: Acceptor TCP y manejo de conexiones (un thread por conexión)
//! - `config`: Configuración por CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use resource_server::server::Server;
//! use resource_server::config::Config;
//!
//! let config = Config::default();
//! let mut server = Server::new(config);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod files;
pub mod http;
pub mod router;
pub mod server;
pub mod store;
