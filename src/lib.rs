//! Calculatrice en arbre : expressions textuelles -> arbre -> interprétation ou exécutable compilé.

pub mod noyau;

pub use noyau::{eval_expression, Compiled, Config, Error, Expression, Parser, Result};
