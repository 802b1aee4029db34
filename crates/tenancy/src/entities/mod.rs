//! Business entity schemas.
//!
//! Each submodule defines one entity: its document type, its
//! [`Entity`](crate::schema::Entity) implementation and a convenience
//! function returning the tenant's model. Submodules never import one
//! another; cross-entity links are [`FieldType::Reference`] fields naming the
//! target entity.
//!
//! [`FieldType::Reference`]: crate::schema::FieldType::Reference

mod cliente;
mod comanda;
mod fichaje;
mod producto;
mod terminal;
mod turno;
mod vista_guardada;

pub use cliente::{Cliente, cliente_model};
pub use comanda::{Comanda, EstadoComanda, LineaComanda, comanda_model};
pub use fichaje::{Fichaje, OrigenFichaje, TipoFichaje, fichaje_model};
pub use producto::{Producto, producto_model};
pub use terminal::{Terminal, TipoTerminal, terminal_model};
pub use turno::{EstadoTurno, Turno, turno_model};
pub use vista_guardada::{VistaGuardada, vista_guardada_model};

use crate::schema::{Entity, SchemaDefinition};

/// Returns the name and schema of every built-in entity.
///
/// Registering the whole catalog at start-up surfaces schema conflicts before
/// any request is served.
pub fn catalog() -> Vec<(&'static str, SchemaDefinition)> {
    vec![
        (Cliente::NAME, Cliente::schema()),
        (Producto::NAME, Producto::schema()),
        (Fichaje::NAME, Fichaje::schema()),
        (Turno::NAME, Turno::schema()),
        (Comanda::NAME, Comanda::schema()),
        (Terminal::NAME, Terminal::schema()),
        (VistaGuardada::NAME, VistaGuardada::schema()),
    ]
}
