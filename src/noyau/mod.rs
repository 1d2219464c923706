//! Noyau — moteur d’expressions en arbre
//!
//! Organisation interne :
//! - termes.rs        : décomposition texte -> termes (blocs imbriqués, positions)
//! - noeud.rs         : genres de noeuds + priorités
//! - arbre.rs         : arène, liens parent/enfants, chirurgie (remove, swap), parcours
//! - variable.rs      : cellules partagées (mutable, calculée, constante)
//! - symboles.rs      : tables (variables, constantes, fonctions, fonctionnelles) + résolveurs
//! - numerique.rs     : primitives numériques + quadrature G7K15
//! - fonctionnelles.rs: Sum, Product, Integral
//! - parseur.rs       : termes -> arbre par insertion selon la priorité
//! - interprete.rs    : évaluation directe
//! - compile.rs       : fermetures composées (compiler une fois, appeler souvent)
//! - format.rs        : réimpression re-parsable + vidage indenté
//! - simplifie.rs     : pliage des constantes
//! - expression.rs    : façade
//! - eval.rs          : pipeline complet (démarche pour l’interface)

pub mod arbre;
pub mod compile;
pub mod config;
pub mod erreur;
pub mod eval;
pub mod expression;
pub mod fonctionnelles;
pub mod format;
pub mod interprete;
pub mod noeud;
pub mod numerique;
pub mod parseur;
pub mod simplifie;
pub mod symboles;
pub mod termes;
pub mod variable;

#[cfg(test)]
mod tests_scientifiques;

#[cfg(test)]
mod tests_fuzz_safe;

#[cfg(test)]
mod tests_proprietes;

// API publique
pub use arbre::{NodeId, Order, Side, Tree};
pub use compile::Compiled;
pub use config::Config;
pub use erreur::{Error, Result};
pub use eval::{eval_expression, Rapport};
pub use expression::Expression;
pub use noeud::{Logic, NodeKind, Operator};
pub use parseur::Parser;
pub use symboles::{Function, Functional, Resolver, SymbolTables};
pub use variable::Variable;
