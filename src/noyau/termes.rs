// src/noyau/termes.rs
//
// Décomposition : texte -> suite (imbriquée) de termes.
//
// Règles:
// - chiffres : un seul terme Nombre ; '.' continue le nombre seulement s’il est suivi d’un chiffre
//   (donc "0..N" donne 0, '.', '.', N)
// - lettres (ou '_') : identificateur [lettre_][lettre chiffre _]* ; '∫' seul est aussi un nom
// - identificateur collé à '(' ou '[' : coquille de fonction
// - identificateur collé à "[...]{...}" : fonctionnelle (Paramètres + Coeur)
// - ( ) [ ] { } : blocs imbriqués, famille vérifiée à la fermeture
// - "texte" et 'c' : fragments bruts
// - tout le reste : symbole d’un caractère

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;

use super::config::PROFONDEUR_MAX;
use super::erreur::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bracket {
    Round,
    Square,
    Curly,
}

impl Bracket {
    pub fn from_opening(c: char) -> Option<Self> {
        match c {
            '(' => Some(Self::Round),
            '[' => Some(Self::Square),
            '{' => Some(Self::Curly),
            _ => None,
        }
    }

    pub fn from_closing(c: char) -> Option<Self> {
        match c {
            ')' => Some(Self::Round),
            ']' => Some(Self::Square),
            '}' => Some(Self::Curly),
            _ => None,
        }
    }

    pub fn opening(self) -> char {
        match self {
            Self::Round => '(',
            Self::Square => '[',
            Self::Curly => '{',
        }
    }

    pub fn closing(self) -> char {
        match self {
            Self::Round => ')',
            Self::Square => ']',
            Self::Curly => '}',
        }
    }
}

/// Terme + position (index de caractère dans la source).
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub kind: TermKind,
    pub position: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TermKind {
    /// Valeur exacte du littéral (1.1 == 11/10) + texte source.
    Number { value: BigRational, text: String },
    Identifier(String),
    Symbol(char),
    Block { bracket: Bracket, terms: Vec<Term> },
    Function { name: String, bracket: Bracket, arguments: Vec<Term> },
    Functional { name: String, parameters: Vec<Term>, core: Vec<Term> },
    Text(String),
    Char(char),
}

impl Term {
    fn new(kind: TermKind, position: usize) -> Self {
        Self { kind, position }
    }

    /// Valeur flottante d’un terme Nombre.
    pub fn number_value(&self) -> Option<f64> {
        match &self.kind {
            TermKind::Number { value, .. } => value.to_f64(),
            _ => None,
        }
    }

    pub fn is_symbol(&self, c: char) -> bool {
        matches!(self.kind, TermKind::Symbol(s) if s == c)
    }

    /// Court libellé pour les messages d’erreur.
    pub fn describe(&self) -> String {
        match &self.kind {
            TermKind::Number { text, .. } => format!("nombre {text}"),
            TermKind::Identifier(name) => format!("identificateur {name}"),
            TermKind::Symbol(c) => format!("'{c}'"),
            TermKind::Block { bracket, .. } => format!("bloc {}…{}", bracket.opening(), bracket.closing()),
            TermKind::Function { name, .. } => format!("fonction {name}"),
            TermKind::Functional { name, .. } => format!("fonctionnelle {name}"),
            TermKind::Text(s) => format!("texte \"{s}\""),
            TermKind::Char(c) => format!("caractère '{c}'"),
        }
    }
}

/// Décompose une chaîne en termes.
pub fn decompose(source: &str) -> Result<Vec<Term>> {
    let chars: Vec<char> = source.chars().collect();
    let mut d = Decomposeur {
        chars: &chars,
        i: 0,
        profondeur: 0,
    };
    d.sequence(None)
}

struct Decomposeur<'a> {
    chars: &'a [char],
    i: usize,
    /// Blocs ouverts en cours de lecture.
    profondeur: usize,
}

impl Decomposeur<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.i).copied()
    }

    /// Lit jusqu’à la fermeture `closing` (ou la fin si None).
    fn sequence(&mut self, closing: Option<(Bracket, usize)>) -> Result<Vec<Term>> {
        let mut out = Vec::new();

        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.i += 1;
                continue;
            }

            // Fermeture : doit être de la bonne famille
            if let Some(b) = Bracket::from_closing(c) {
                return match closing {
                    Some((open, _)) if open == b => {
                        self.i += 1;
                        Ok(out)
                    }
                    Some((open, _)) => Err(Error::UnexpectedBracket {
                        position: self.i,
                        expected: format!("'{}'", open.closing()),
                        found: c,
                    }),
                    None => Err(Error::UnexpectedBracket {
                        position: self.i,
                        expected: "fin d’expression".into(),
                        found: c,
                    }),
                };
            }

            // Ouverture : bloc imbriqué
            if let Some(b) = Bracket::from_opening(c) {
                let position = self.i;
                let terms = self.block(b)?;
                out.push(Term::new(TermKind::Block { bracket: b, terms }, position));
                continue;
            }

            if c.is_ascii_digit() {
                out.push(self.number()?);
                continue;
            }

            if c == '∫' {
                self.i += 1;
                out.push(self.word_from(self.i - 1)?);
                continue;
            }

            if c.is_alphabetic() || c == '_' {
                out.push(self.word()?);
                continue;
            }

            if c == '"' {
                out.push(self.text()?);
                continue;
            }

            if c == '\'' {
                if let Some(t) = self.character() {
                    out.push(t);
                    continue;
                }
            }

            out.push(Term::new(TermKind::Symbol(c), self.i));
            self.i += 1;
        }

        match closing {
            Some((b, position)) => Err(Error::UnclosedBracket {
                position,
                opening: b.opening(),
            }),
            None => Ok(out),
        }
    }

    /// Consomme un bloc ouvert par `b` (self.i est sur l’ouvrante).
    fn block(&mut self, b: Bracket) -> Result<Vec<Term>> {
        if self.profondeur >= PROFONDEUR_MAX {
            return Err(Error::TooDeep { limit: PROFONDEUR_MAX });
        }
        let position = self.i;
        self.i += 1;
        self.profondeur += 1;
        let terms = self.sequence(Some((b, position)));
        self.profondeur -= 1;
        terms
    }

    fn number(&mut self) -> Result<Term> {
        let start = self.i;
        let mut digits = String::new();
        let mut frac_len: usize = 0;

        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.i += 1;
        }

        // '.' suivi d’un chiffre => partie décimale ; sinon on laisse le '.' (intervalle "..")
        let suivi_chiffre = self
            .chars
            .get(self.i + 1)
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false);
        if self.peek() == Some('.') && suivi_chiffre {
            self.i += 1;
            while let Some(c) = self.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                digits.push(c);
                frac_len += 1;
                self.i += 1;
            }
        }

        let text: String = self.chars[start..self.i].iter().collect();
        let numer = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| Error::InvalidNumber {
            position: start,
            text: text.clone(),
        })?;
        let denom = BigInt::from(10).pow(frac_len as u32);
        let value = if frac_len == 0 {
            BigRational::from_integer(numer)
        } else {
            BigRational::new(numer, denom)
        };

        Ok(Term::new(TermKind::Number { value, text }, start))
    }

    fn word(&mut self) -> Result<Term> {
        self.word_from(self.i)
    }

    /// Nom de `start` à la position courante (étendu aux lettres, chiffres et '_').
    fn word_from(&mut self, start: usize) -> Result<Term> {
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            self.i += 1;
        }
        let name: String = self.chars[start..self.i].iter().collect();

        match self.peek() {
            Some('(') => {
                let arguments = self.block(Bracket::Round)?;
                Ok(Term::new(
                    TermKind::Function {
                        name,
                        bracket: Bracket::Round,
                        arguments,
                    },
                    start,
                ))
            }
            Some('[') => {
                let parameters = self.block(Bracket::Square)?;
                // "Sum[i=0..3] {i}" : blancs tolérés avant le coeur
                let apres = self.i;
                while self.peek().is_some_and(char::is_whitespace) {
                    self.i += 1;
                }
                if self.peek() == Some('{') {
                    let core = self.block(Bracket::Curly)?;
                    Ok(Term::new(
                        TermKind::Functional {
                            name,
                            parameters,
                            core,
                        },
                        start,
                    ))
                } else {
                    self.i = apres;
                    Ok(Term::new(
                        TermKind::Function {
                            name,
                            bracket: Bracket::Square,
                            arguments: parameters,
                        },
                        start,
                    ))
                }
            }
            _ => Ok(Term::new(TermKind::Identifier(name), start)),
        }
    }

    fn text(&mut self) -> Result<Term> {
        let start = self.i;
        self.i += 1;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            self.i += 1;
            if c == '"' {
                return Ok(Term::new(TermKind::Text(s), start));
            }
            s.push(c);
        }
        Err(Error::UnclosedText { position: start })
    }

    /// 'c' exactement ; sinon None (le '\'' devient un symbole).
    fn character(&mut self) -> Option<Term> {
        let start = self.i;
        match (self.chars.get(start + 1), self.chars.get(start + 2)) {
            (Some(&c), Some('\'')) => {
                self.i += 3;
                Some(Term::new(TermKind::Char(c), start))
            }
            _ => None,
        }
    }
}

/// Format utilitaire (démarche) : termes en texte, blocs entre leurs crochets.
pub fn format_terms(terms: &[Term]) -> String {
    let mut out = Vec::with_capacity(terms.len());
    for t in terms {
        let s = match &t.kind {
            TermKind::Number { text, .. } => text.clone(),
            TermKind::Identifier(name) => name.clone(),
            TermKind::Symbol(c) => c.to_string(),
            TermKind::Block { bracket, terms } => {
                format!("{} {} {}", bracket.opening(), format_terms(terms), bracket.closing())
            }
            TermKind::Function {
                name,
                bracket,
                arguments,
            } => format!(
                "{name}{} {} {}",
                bracket.opening(),
                format_terms(arguments),
                bracket.closing()
            ),
            TermKind::Functional {
                name,
                parameters,
                core,
            } => format!(
                "{name}[ {} ]{{ {} }}",
                format_terms(parameters),
                format_terms(core)
            ),
            TermKind::Text(s) => format!("\"{s}\""),
            TermKind::Char(c) => format!("'{c}'"),
        };
        out.push(s);
    }
    out.join(" ")
}
