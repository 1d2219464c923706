// src/noyau/erreur.rs
//
// Erreurs du noyau (décomposition, construction, chirurgie d’arbre).
// L’évaluation ne produit jamais d’erreur : IEEE-754 (inf / NaN) fait foi.

use thiserror::Error;

use super::arbre::NodeId;

/// Résultat du noyau.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("entrée vide")]
    Empty,

    #[error("position {position} : '{found}' inattendu (attendu : {expected})")]
    UnexpectedBracket {
        position: usize,
        expected: String,
        found: char,
    },

    #[error("position {position} : '{opening}' jamais refermé")]
    UnclosedBracket { position: usize, opening: char },

    #[error("position {position} : guillemet non refermé")]
    UnclosedText { position: usize },

    #[error("position {position} : nombre invalide '{text}'")]
    InvalidNumber { position: usize, text: String },

    #[error("position {position} : {found} inattendu (attendu : {expected})")]
    UnexpectedTerm {
        position: usize,
        found: String,
        expected: &'static str,
    },

    #[error("position {position} : opérande manquant pour '{operator}'")]
    MissingOperand { position: usize, operator: String },

    #[error("position {position} : ':' sans '?' correspondant")]
    DanglingVariant { position: usize },

    #[error("expression trop profonde (plus de {limit} niveaux)")]
    TooDeep { limit: usize },

    #[error("identificateur inconnu : {name}")]
    UnknownIdentifier { name: String },

    #[error("fonction inconnue : {name}/{arity}")]
    UnknownFunction { name: String, arity: usize },

    #[error("fonctionnelle inconnue : {name}/{arity}")]
    UnknownFunctional { name: String, arity: usize },

    #[error("{function} : paramètre '{parameter}' déclaré deux fois")]
    DuplicateParameter { function: String, parameter: String },

    #[error("{function} : argument '{parameter}' fourni deux fois")]
    DuplicateArgument { function: String, parameter: String },

    #[error("{function} : paramètre '{parameter}' inconnu")]
    UnknownParameter { function: String, parameter: String },

    #[error("{name} : paramètres invalides ({reason})")]
    InvalidFunctional { name: String, reason: &'static str },

    #[error("variable en lecture seule : {name}")]
    ReadOnly { name: String },

    #[error("liaison invalide « {text} » (attendu : nom = valeur)")]
    InvalidBinding { text: String },

    #[error("noeud {0:?} absent de l’arbre")]
    InvalidNode(NodeId),

    #[error("cycle : {child:?} est un ancêtre de {parent:?}")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("chemin invalide : {0}")]
    InvalidPath(String),
}
