//! Noyau — évaluation (pipeline complet, pour l’interface)
//!
//! termes -> arbre -> liaisons -> interprétation -> compilation -> réimpression -> pliage
//!
//! Chaque étape laisse une trace texte dans la démarche ; les deux valeurs
//! (interprétée, compilée) sont comparées.

use tracing::debug;

use super::config::Config;
use super::erreur::{Error, Result};
use super::parseur::Parser;
use super::termes::{decompose, format_terms};

/// Écart toléré entre interprétation et exécutable compilé.
pub const TOLERANCE_ACCORD: f64 = 1e-9;

#[derive(Default, Clone, Debug)]
pub struct DemarcheNoyau {
    pub termes: String,
    pub arbre: String,
    pub imprime: String,
    pub simplifie: String,
    pub note: String,
}

#[derive(Clone, Debug)]
pub struct Rapport {
    pub interprete: f64,
    pub compile: f64,
    pub accord: bool,
    /// Variables de l’expression (ordre de la table) et leur valeur au moment du calcul.
    pub variables: Vec<(String, f64)>,
    pub demarche: DemarcheNoyau,
}

/// API publique : évalue `source` après application des liaisons ("x=4; y=2").
pub fn eval_expression(source: &str, liaisons: &str) -> Result<Rapport> {
    let s = source.trim();
    if s.is_empty() {
        return Err(Error::Empty);
    }

    // 1) Termes
    let termes = decompose(s)?;
    let termes_txt = format_terms(&termes);

    // 2) Arbre
    let parser = Parser::new();
    let mut expr = parser.parse_terms(s, &termes)?;

    // 3) Liaisons (les noms absents de l’expression sont ignorés)
    for (name, valeur) in lire_liaisons(liaisons)? {
        if expr.variables().get(&name).is_some() {
            expr.set(&name, valeur)?;
        } else {
            debug!(name, "liaison sans variable correspondante");
        }
    }

    // 4) Deux évaluations
    let interprete = expr.compute();
    let compile = expr.compile().call();
    let accord = valeurs_accord(interprete, compile);

    let variables = expr
        .variables()
        .iter()
        .map(|v| (v.name().to_string(), v.value()))
        .collect();

    // 5) Réimpression + pliage (sur l’arbre lui-même : il ne sert plus ensuite)
    let arbre = expr.dump();
    let imprime = expr.to_string();
    let plies = expr.fold_constants()?;
    let simplifie = expr.to_string();

    debug!(interprete, compile, accord, plies, "évaluation");

    let demarche = DemarcheNoyau {
        termes: termes_txt,
        arbre,
        imprime,
        simplifie,
        note: format!(
            "Pipeline: termes → arbre (insertion par priorité) → liaisons → interprétation + exécutable compilé → réimpression → pliage ({plies} noeud(s))."
        ),
    };

    Ok(Rapport {
        interprete,
        compile,
        accord,
        variables,
        demarche,
    })
}

/// Même valeur à TOLERANCE_ACCORD près (NaN == NaN, infinis de même signe).
pub fn valeurs_accord(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b || (a - b).abs() < TOLERANCE_ACCORD
}

/// "x=4; y=pi/2" -> [(x, 4), (y, 1.5707…)].
///
/// Séparateurs : ';' et fin de ligne. Chaque valeur est une expression sans
/// variable libre (mode strict).
pub fn lire_liaisons(texte: &str) -> Result<Vec<(String, f64)>> {
    let strict = Parser::new().with_config(Config::strict());
    let mut out = Vec::new();

    for morceau in texte.split([';', '\n']).map(str::trim).filter(|m| !m.is_empty()) {
        let invalide = || Error::InvalidBinding {
            text: morceau.to_string(),
        };
        let (nom, valeur) = morceau.split_once('=').ok_or_else(invalide)?;
        let nom = nom.trim();
        if !est_identificateur(nom) {
            return Err(invalide());
        }
        let v = strict.parse(valeur.trim())?.compute();
        out.push((nom.to_string(), v));
    }
    Ok(out)
}

fn est_identificateur(s: &str) -> bool {
    let mut it = s.chars();
    match it.next() {
        Some(c) if c.is_alphabetic() || c == '_' => it.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Affichage d’une valeur pour l’interface.
pub fn format_valeur(x: f64) -> String {
    if x.is_nan() {
        "indéfini".into()
    } else if x == f64::INFINITY {
        "+∞".into()
    } else if x == f64::NEG_INFINITY {
        "-∞".into()
    } else {
        format!("{x}")
    }
}
