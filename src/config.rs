//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor con soporte completo
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./resource_server --port 8080 \
//!   --static-dir ./static \
//!   --upload-dir ./uploads
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 ./resource_server
//! ```

use clap::Parser;

/// Configuración del servidor de recursos
#[derive(Debug, Clone, Parser)]
#[command(name = "resource_server")]
#[command(about = "Servidor HTTP concurrente con almacén de recursos en memoria")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor (0 = puerto efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio raíz de archivos estáticos (servido bajo /static/)
    #[arg(long = "static-dir", default_value = "./static", env = "STATIC_DIR")]
    pub static_dir: String,

    /// Directorio donde se guardan los archivos subidos (servido bajo /uploads/)
    #[arg(long = "upload-dir", default_value = "./uploads", env = "UPLOAD_DIR")]
    pub upload_dir: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use resource_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }
        if self.static_dir.trim().is_empty() {
            return Err("Static dir must not be empty".to_string());
        }
        if self.upload_dir.trim().is_empty() {
            return Err("Upload dir must not be empty".to_string());
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════╗");
        println!("║       Resource Server Configuration          ║");
        println!("╚══════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!();
        println!("📁 Directories:");
        println!("   Static dir:   {}", self.static_dir);
        println!("   Upload dir:   {}", self.upload_dir);
        println!();
        println!("════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            static_dir: "./static".to_string(),
            upload_dir: "./uploads".to_string(),
        }
    }
}
