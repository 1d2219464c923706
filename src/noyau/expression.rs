// src/noyau/expression.rs
//
// Façade : un arbre + ses tables + ses réglages + le texte source.
//
// Cloner une expression copie l’arbre et les tables ; les cellules de variables
// restent partagées (les itérateurs de fonctionnelles, eux, sont neufs).

use std::fmt;
use std::sync::Arc;

use super::arbre::{NodeId, Tree};
use super::compile::{compile, Compiled};
use super::config::Config;
use super::erreur::{Error, Result};
use super::format::{dump, print};
use super::interprete::interpret;
use super::noeud::NodeKind;
use super::parseur::Parser;
use super::simplifie::fold_constants;
use super::symboles::{Constants, Functionals, Functions, SymbolTables, Variables};
use super::variable::Variable;

use tracing::warn;

pub struct Expression {
    tree: Tree,
    tables: SymbolTables,
    config: Config,
    source: String,
}

impl Expression {
    /// Parsing avec les tables standard et les réglages par défaut.
    pub fn parse(source: &str) -> Result<Self> {
        Parser::new().parse(source)
    }

    pub(crate) fn from_parts(tree: Tree, tables: SymbolTables, config: Config, source: String) -> Self {
        Self {
            tree,
            tables,
            config,
            source,
        }
    }

    /* ------------------------ Accès ------------------------ */

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Édition structurelle (remove, swap, graft…) ; l’appelant sérialise les écritures.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut SymbolTables {
        &mut self.tables
    }

    pub fn variables(&self) -> &Variables {
        &self.tables.variables
    }

    pub fn constants(&self) -> &Constants {
        &self.tables.constants
    }

    pub fn functions(&self) -> &Functions {
        &self.tables.functions
    }

    pub fn functionals(&self) -> &Functionals {
        &self.tables.functionals
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Variable (ou constante) par son nom.
    pub fn variable(&self, name: &str) -> Option<&Arc<Variable>> {
        self.tables.variables.get(name).or_else(|| self.tables.constants.get(name))
    }

    /// Écrit une variable mutable ; toutes ses occurrences voient la valeur.
    pub fn set(&self, name: &str, value: f64) -> Result<()> {
        match self.variable(name) {
            Some(v) => v.set(value),
            None => Err(Error::UnknownIdentifier {
                name: name.to_string(),
            }),
        }
    }

    /* ------------------------ Évaluation ------------------------ */

    /// Interprétation directe avec les valeurs courantes.
    pub fn compute(&self) -> f64 {
        interpret(&self.tree, &self.config)
    }

    /// Affecte les variables mutables dans l’ordre de la table, puis interprète.
    /// Valeurs en trop : ignorées ; manquantes : variables inchangées.
    pub fn compute_with(&self, values: &[f64]) -> f64 {
        for (v, x) in self.mutables().zip(values) {
            v.assign(*x);
        }
        self.compute()
    }

    /// Affecte par nom, puis interprète.
    pub fn compute_named(&self, bindings: &[(&str, f64)]) -> Result<f64> {
        for (name, value) in bindings {
            self.set(name, *value)?;
        }
        Ok(self.compute())
    }

    /// Exécutable réutilisable ; il lit les mêmes cellules que l’arbre.
    pub fn compile(&self) -> Compiled {
        compile(&self.tree, &self.config, self.tables.variables.iter().cloned().collect())
    }

    fn mutables(&self) -> impl Iterator<Item = &Arc<Variable>> {
        self.tables.variables.iter().filter(|v| v.is_mutable())
    }

    /* ------------------------ Transformations ------------------------ */

    /// Plie les sous-arbres constants ; retourne le nombre de noeuds remplacés.
    pub fn fold_constants(&mut self) -> Result<usize> {
        fold_constants(&mut self.tree, &self.config)
    }

    /// Extrait un noeud (ordre infixe des survivants préservé).
    pub fn remove(&mut self, id: NodeId) -> Result<NodeKind> {
        self.tree.remove(id)
    }

    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.tree.swap(a, b)
    }

    /// Vidage indenté de l’arbre.
    pub fn dump(&self) -> String {
        dump(&self.tree)
    }

    /// Copie faillible (arbre incohérent => erreur).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            tree: self.tree.duplicate()?,
            tables: self.tables.clone(),
            config: self.config.clone(),
            source: self.source.clone(),
        })
    }
}

impl Clone for Expression {
    fn clone(&self) -> Self {
        // arbre issu du parseur ou des opérations structurelles : toujours cohérent
        self.try_clone().unwrap_or_else(|err| {
            warn!(%err, source = %self.source, "clone : arbre incohérent, copie vide");
            Self {
                tree: Tree::new(),
                tables: self.tables.clone(),
                config: self.config.clone(),
                source: self.source.clone(),
            }
        })
    }
}

/// Texte re-parsable.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print(&self.tree))
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("printed", &print(&self.tree))
            .field("variables", &self.tables.variables)
            .finish()
    }
}

impl std::str::FromStr for Expression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
