//! # Almacén de Recursos en Memoria
//! src/store/mod.rs
//!
//! Mapa mutable de identificador → recurso JSON, compartido entre todos los
//! threads de conexión y protegido por un único `Mutex`.
//!
//! ## Asignación de identificadores
//!
//! Los ids se asignan con un contador monotónico que arranca en 1 y nunca
//! se decrementa: un id emitido no se reutiliza dentro de la vida del
//! proceso, incluso después de borrar el recurso. Derivar el id de la
//! cantidad de entradas vivas colisionaría tras un delete.
//!
//! ## Concurrencia
//!
//! Toda operación toma el lock por su duración completa, así que dos
//! creates concurrentes nunca reparten el mismo id y un delete que corre
//! contra un get jamás deja ver un estado a medias. La vida del almacén es
//! la vida del proceso: no hay persistencia.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Estado interno del almacén, siempre accedido bajo el lock
struct StoreInner {
    /// Próximo id a emitir (monotónico, nunca retrocede)
    next_id: u64,

    /// Recursos vivos: id → valor JSON
    resources: HashMap<String, Value>,
}

/// Almacén de recursos compartido del servidor
///
/// Se construye una vez al arrancar y se pasa por `Arc` a cada conexión.
pub struct ResourceStore {
    inner: Mutex<StoreInner>,
}

impl ResourceStore {
    /// Crea un almacén vacío con el contador de ids en 1
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                next_id: 1,
                resources: HashMap::new(),
            }),
        }
    }

    /// Retorna una copia de todos los recursos vivos (id → recurso)
    pub fn list(&self) -> HashMap<String, Value> {
        let inner = self.inner.lock().unwrap();
        inner.resources.clone()
    }

    /// Inserta un recurso nuevo y retorna el id asignado
    ///
    /// # Ejemplo
    /// ```
    /// use resource_server::store::ResourceStore;
    /// use serde_json::json;
    ///
    /// let store = ResourceStore::new();
    /// assert_eq!(store.create(json!({"name": "a"})), "1");
    /// assert_eq!(store.create(json!({"name": "b"})), "2");
    /// ```
    pub fn create(&self, resource: Value) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id.to_string();
        inner.next_id += 1;
        inner.resources.insert(id.clone(), resource);
        id
    }

    /// Obtiene una copia del recurso bajo un id
    pub fn get(&self, id: &str) -> Option<Value> {
        let inner = self.inner.lock().unwrap();
        inner.resources.get(id).cloned()
    }

    /// Reemplaza el recurso bajo un id existente
    ///
    /// Retorna `false` si el id no existe (el recurso no se inserta).
    pub fn update(&self, id: &str, resource: Value) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.resources.get_mut(id) {
            Some(slot) => {
                *slot = resource;
                true
            }
            None => false,
        }
    }

    /// Elimina el recurso bajo un id
    ///
    /// Retorna `false` si el id no existe. Borrar no libera el id: el
    /// contador sigue adelante.
    pub fn delete(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.resources.remove(id).is_some()
    }

    /// Cantidad de recursos vivos
    pub fn count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.resources.len()
    }
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}
