// src/noyau/variable.rs
//
// Variable = cellule scalaire nommée, partagée par Arc.
// Le partage se fait par identité (même Arc), jamais par nom.
//
// Lecture/écriture : un AtomicU64 (bits f64), ordre Relaxed.
// Aucune autre synchronisation : c’est à l’appelant de sérialiser ses écritures.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::erreur::{Error, Result};

/// Valeur fournie par l’hôte à chaque lecture.
pub type Source = Arc<dyn Fn() -> f64 + Send + Sync>;

enum Cell {
    Mutable(AtomicU64),
    Computed(Source),
    Constant(f64),
}

pub struct Variable {
    name: String,
    cell: Cell,
}

impl Variable {
    pub fn mutable(name: impl Into<String>, value: f64) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            cell: Cell::Mutable(AtomicU64::new(value.to_bits())),
        })
    }

    pub fn computed(name: impl Into<String>, source: impl Fn() -> f64 + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            cell: Cell::Computed(Arc::new(source)),
        })
    }

    pub fn constant(name: impl Into<String>, value: f64) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            cell: Cell::Constant(value),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        match &self.cell {
            Cell::Mutable(bits) => f64::from_bits(bits.load(Ordering::Relaxed)),
            Cell::Computed(source) => source(),
            Cell::Constant(v) => *v,
        }
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self.cell, Cell::Mutable(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.cell, Cell::Constant(_))
    }

    /// Écriture visible par tous les noeuds qui partagent cette cellule.
    pub fn set(&self, value: f64) -> Result<()> {
        match &self.cell {
            Cell::Mutable(bits) => {
                bits.store(value.to_bits(), Ordering::Relaxed);
                Ok(())
            }
            Cell::Computed(_) | Cell::Constant(_) => Err(Error::ReadOnly {
                name: self.name.clone(),
            }),
        }
    }

    /// Écriture sans erreur : ignorée hors des variables mutables.
    pub(crate) fn assign(&self, value: f64) {
        if let Cell::Mutable(bits) = &self.cell {
            bits.store(value.to_bits(), Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.cell {
            Cell::Mutable(_) => "mutable",
            Cell::Computed(_) => "calculée",
            Cell::Constant(_) => "constante",
        };
        write!(f, "{}({kind}) = {}", self.name, self.value())
    }
}

/// Même cellule (identité) ?
pub fn same_cell(a: &Arc<Variable>, b: &Arc<Variable>) -> bool {
    Arc::ptr_eq(a, b)
}
