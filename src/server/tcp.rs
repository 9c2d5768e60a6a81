//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Implementación del servidor TCP que maneja múltiples conexiones
//! simultáneas usando threads: cada conexión se procesa en su propio
//! thread, así el loop de accept nunca se bloquea procesando un request.
//!
//! El socket pertenece al thread de su conexión y se cierra al salir por
//! drop, sin importar por qué camino termine (respuesta enviada, error de
//! parsing o error de E/S). Todos los errores se convierten a una
//! respuesta HTTP acá: nada tumba al acceptor ni a otras conexiones.

use crate::config::Config;
use crate::http::{ParseError, Request, StatusCode};
use crate::router::Router;
use crate::store::ResourceStore;
use std::fs;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Servidor HTTP concurrente: un thread por conexión
pub struct Server {
    config: Config,
    router: Arc<Router>,
    store: Arc<ResourceStore>,
    listener: Option<TcpListener>,
}

impl Server {
    /// Construye el servidor: almacén nuevo y router compartidos por `Arc`
    ///
    /// El almacén se crea una sola vez acá y cada conexión recibe una
    /// referencia compartida; no hay estado global ambiente.
    pub fn new(config: Config) -> Self {
        let store = Arc::new(ResourceStore::new());
        let router = Arc::new(Router::new(Arc::clone(&store), &config));

        Self {
            config,
            router,
            store,
            listener: None,
        }
    }

    /// Acceso al almacén compartido (útil para inspección en tests)
    pub fn store(&self) -> Arc<ResourceStore> {
        Arc::clone(&self.store)
    }

    /// Crea los directorios servidos y hace bind del listener
    ///
    /// Retorna la dirección local real, que con puerto 0 es la asignada
    /// por el sistema.
    pub fn bind(&mut self) -> std::io::Result<SocketAddr> {
        fs::create_dir_all(&self.config.static_dir)?;
        fs::create_dir_all(&self.config.upload_dir)?;

        let address = self.config.address();
        println!("[*] Iniciando servidor en {}", address);

        let listener = TcpListener::bind(&address)?;
        let local_addr = listener.local_addr()?;
        println!("[+] Servidor escuchando en {}", local_addr);

        self.listener = Some(listener);
        Ok(local_addr)
    }

    /// Loop principal: acepta conexiones y lanza un thread por cada una
    ///
    /// Hace bind primero si `bind()` no fue llamado todavía.
    pub fn run(&mut self) -> std::io::Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        println!("[*] Modo concurrente: un thread por conexion\n");

        // bind() recién garantizó que hay listener
        let listener = self.listener.as_ref().expect("listener after bind");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);

                    let peer_addr = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());

                    println!(" ✅ Nueva conexión desde: {} (spawning thread)", peer_addr);

                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(stream, router) {
                            eprintln!("   ❌ Error en thread: {}", e);
                        }
                        // El socket se cierra acá por drop, haya o no error
                    });
                }
                Err(e) => {
                    eprintln!("   ❌ Error al aceptar conexión: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Maneja una conexión completa: leer, despachar, responder
    ///
    /// Frontera de errores de la conexión: los errores de parsing se
    /// convierten en 400 y los de handler ya vienen convertidos del
    /// router. La lectura del body es bloqueante sin timeout (limitación
    /// aceptada): un cliente que no completa su Content-Length retiene
    /// este thread, pero solo este.
    pub(crate) fn handle_connection(
        mut stream: TcpStream,
        router: Arc<Router>,
    ) -> std::io::Result<()> {
        let start = Instant::now();

        // Generar Request ID único para observabilidad
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        start.elapsed().as_nanos().hash(&mut hasher);
        thread::current().id().hash(&mut hasher);
        let request_id = format!("{:016x}", hasher.finish());

        let mut response = match Request::read_from(&mut stream) {
            Ok(request) => {
                println!(
                    "   ✅ {} {} [req_id: {}]",
                    request.method().as_str(),
                    request.path(),
                    &request_id[..8]
                );
                router.dispatch(&request)
            }
            Err(ParseError::EmptyRequest) => {
                // El peer conectó y cerró sin mandar nada
                println!("   ✅ Conexión cerrada sin datos");
                return Ok(());
            }
            Err(e) => {
                println!("   ❌ Parse error: {}", e);
                router.error_response(StatusCode::BadRequest, &format!("Invalid request: {}", e))
            }
        };

        response.add_header("X-Request-Id", &request_id);

        stream.write_all(&response.to_bytes())?;
        stream.flush()?;

        let latency = start.elapsed();
        println!(
            "   ✅ {} ({:.2}ms)\n",
            response.status(),
            latency.as_secs_f64() * 1000.0
        );

        Ok(())
    }
}
