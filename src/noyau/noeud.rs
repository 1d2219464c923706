// src/noyau/noeud.rs
//
// Genres de noeuds (énumération fermée) + priorités de construction.
//
// La priorité ne sert QU’À la construction de l’arbre (parseur) :
// plus elle est haute, plus l’opérateur lie fort.
//
//   :  0   (Variant)
//   ?  1   (Selector)
//   |  2
//   &  3
//   = ≠ > < ≥ ≤  4
//   .. 5   (Interval)
//   + - 6
//   * / 7   (et multiplication implicite)
//   - ! unaires 8
//   ^  9

use std::fmt;
use std::sync::Arc;

use super::symboles::{Function, Functional};
use super::termes::Bracket;
use super::variable::Variable;

pub const PRIORITE_VARIANT: u8 = 0;
pub const PRIORITE_SELECTOR: u8 = 1;
pub const PRIORITE_OU: u8 = 2;
pub const PRIORITE_ET: u8 = 3;
pub const PRIORITE_COMPARAISON: u8 = 4;
pub const PRIORITE_INTERVALLE: u8 = 5;
pub const PRIORITE_ADDITIVE: u8 = 6;
pub const PRIORITE_MULTIPLICATIVE: u8 = 7;
pub const PRIORITE_UNAIRE: u8 = 8;
pub const PRIORITE_PUISSANCE: u8 = 9;

/// Feuilles et sous-arbres fermés : jamais « escaladés » par un opérateur.
pub const PRIORITE_VALEUR: u8 = u8::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Operator {
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' | '×' | '·' => Some(Self::Mul),
            '/' | '÷' => Some(Self::Div),
            '^' => Some(Self::Pow),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
        }
    }

    pub fn priority(self) -> u8 {
        match self {
            Self::Add | Self::Sub => PRIORITE_ADDITIVE,
            Self::Mul | Self::Div => PRIORITE_MULTIPLICATIVE,
            Self::Pow => PRIORITE_PUISSANCE,
        }
    }

    /// Élément neutre d’un opérande absent (0 pour + -, 1 pour * / ^).
    pub fn neutral(self) -> f64 {
        match self {
            Self::Add | Self::Sub => 0.0,
            Self::Mul | Self::Div | Self::Pow => 1.0,
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Pow => a.powf(b),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Logic {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    And,
    Or,
    Not,
}

impl Logic {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "≠",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterEqual => "≥",
            Self::LessEqual => "≤",
            Self::And => "&",
            Self::Or => "|",
            Self::Not => "!",
        }
    }

    pub fn priority(self) -> u8 {
        match self {
            Self::Or => PRIORITE_OU,
            Self::And => PRIORITE_ET,
            Self::Not => PRIORITE_UNAIRE,
            _ => PRIORITE_COMPARAISON,
        }
    }

    pub fn is_comparison(self) -> bool {
        !matches!(self, Self::And | Self::Or | Self::Not)
    }

    /// Comparaison numérique ; égalité tolérante (|a - b| < epsilon).
    pub fn compare(self, a: f64, b: f64, epsilon: f64) -> bool {
        let egal = (a - b).abs() < epsilon;
        match self {
            Self::Equal => egal,
            Self::NotEqual => !egal,
            Self::Greater => a > b && !egal,
            Self::Less => a < b && !egal,
            Self::GreaterEqual => a > b || egal,
            Self::LessEqual => a < b || egal,
            Self::And | Self::Or | Self::Not => false,
        }
    }
}

/// Vérité d’un nombre : non nul et non NaN.
pub fn truthy(x: f64) -> bool {
    x != 0.0 && !x.is_nan()
}

pub fn from_bool(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[derive(Clone)]
pub enum NodeKind {
    /// ConstValueNode
    Const(f64),
    /// VariableValueNode : cellule partagée
    Variable(Arc<Variable>),
    /// + - * / ^ ; `-` sans gauche = négation
    Operator(Operator),
    Logic(Logic),
    /// `?` : gauche = condition, droite = Variant (ou valeur seule)
    Selector,
    /// `:` : gauche = alors, droite = sinon
    Variant,
    /// Enfants : chaîne d’Argument penchée à droite (gauche)
    Function { name: String, function: Arc<Function> },
    /// gauche = Paramètres (iter = a..b), droite = Coeur
    Functional {
        name: String,
        functional: Arc<dyn Functional>,
        iterator: Arc<Variable>,
    },
    /// gauche = expression de l’argument, droite = argument suivant
    Argument { name: Option<String> },
    /// ComputedBracketNode : gauche = contenu
    Bracket(Bracket),
    /// gauche = borne basse, droite = borne haute
    Interval,
    Text(String),
    Char(char),
}

impl NodeKind {
    /// Priorité de construction (valeurs et blocs : PRIORITE_VALEUR).
    pub fn priority(&self) -> u8 {
        match self {
            Self::Operator(op) => op.priority(),
            Self::Logic(l) => l.priority(),
            Self::Selector => PRIORITE_SELECTOR,
            Self::Variant => PRIORITE_VARIANT,
            Self::Interval => PRIORITE_INTERVALLE,
            _ => PRIORITE_VALEUR,
        }
    }

    /// Noeud « opérateur » (reçoit ses opérandes pendant la construction) ?
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Self::Operator(_) | Self::Logic(_) | Self::Selector | Self::Variant | Self::Interval
        )
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Self::Const(_))
    }

    /// Libellé court (vidage d’arbre, chemins).
    pub fn label(&self) -> String {
        match self {
            Self::Const(v) => format!("{v}"),
            Self::Variable(v) => v.name().to_string(),
            Self::Operator(op) => op.symbol().to_string(),
            Self::Logic(l) => l.symbol().to_string(),
            Self::Selector => "?".into(),
            Self::Variant => ":".into(),
            Self::Function { name, .. } => format!("{name}()"),
            Self::Functional { name, .. } => format!("{name}[]{{}}"),
            Self::Argument { name: Some(n) } => format!("arg {n}:"),
            Self::Argument { name: None } => "arg".into(),
            Self::Bracket(b) => format!("{}{}", b.opening(), b.closing()),
            Self::Interval => "..".into(),
            Self::Text(s) => format!("\"{s}\""),
            Self::Char(c) => format!("'{c}'"),
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
