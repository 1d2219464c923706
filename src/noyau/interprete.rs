// src/noyau/interprete.rs
//
// Évaluation directe : descente récursive sur l’arène, résultat f64 (IEEE, jamais d’erreur).
//
// - opérande absent => neutre de l’opérateur (0 pour + -, 1 pour * / ^)
// - comparaisons : |a - b| < epsilon => égal ; opérande absent => faux
// - & | paresseux ; & sans opérande => vrai, | sans opérande => faux
// - ? sans Variant : sinon = 0
// - Interval, Text, Char : NaN (fragments non numériques)
// - itérateurs de fonctionnelles : valeur propre à l’évaluation (Liaison), la cellule
//   partagée n’est jamais écrite ; deux threads peuvent évaluer le même arbre.

use std::sync::Arc;

use super::arbre::{NodeId, Tree};
use super::config::Config;
use super::noeud::{from_bool, truthy, Logic, NodeKind};
use super::variable::{same_cell, Variable};

/// Valeur courante d’un itérateur pendant une évaluation (pile chaînée, la plus interne d’abord).
struct Liaison<'a> {
    iterateur: &'a Arc<Variable>,
    valeur: f64,
    parent: Option<&'a Liaison<'a>>,
}

fn lue(v: &Arc<Variable>, portee: Option<&Liaison<'_>>) -> f64 {
    let mut cur = portee;
    while let Some(l) = cur {
        if same_cell(l.iterateur, v) {
            return l.valeur;
        }
        cur = l.parent;
    }
    v.value()
}

/// Valeur de la racine (NaN pour un arbre vide).
pub fn interpret(tree: &Tree, config: &Config) -> f64 {
    match tree.root() {
        Some(r) => interpret_node(tree, r, config),
        None => f64::NAN,
    }
}

pub fn interpret_node(tree: &Tree, id: NodeId, config: &Config) -> f64 {
    evalue(tree, id, config, None)
}

fn evalue(tree: &Tree, id: NodeId, config: &Config, portee: Option<&Liaison<'_>>) -> f64 {
    let Some(kind) = tree.kind(id) else {
        return f64::NAN;
    };
    let (left, right) = (tree.left(id), tree.right(id));
    let eval = |n: NodeId| evalue(tree, n, config, portee);

    match kind {
        NodeKind::Const(v) => *v,
        NodeKind::Variable(v) => lue(v, portee),

        NodeKind::Operator(op) => {
            let a = left.map(eval).unwrap_or_else(|| op.neutral());
            let b = right.map(eval).unwrap_or_else(|| op.neutral());
            op.apply(a, b)
        }

        NodeKind::Logic(l) => from_bool(logique(tree, *l, left, right, config, portee)),

        NodeKind::Selector => {
            let cond = left.map(|c| truthy(eval(c))).unwrap_or(false);
            let (alors, sinon) = branches(tree, right);
            let choisi = if cond { alors } else { sinon };
            choisi.map(eval).unwrap_or(0.0)
        }

        // Variant hors d’un Selector (arbre édité à la main) : la première branche
        NodeKind::Variant => left.map(eval).unwrap_or(0.0),

        NodeKind::Function { function, .. } => {
            let args = argument_nodes(tree, id);
            if args.len() != function.arity() {
                return f64::NAN;
            }
            let valeurs: Vec<f64> = args
                .iter()
                .map(|&a| tree.left(a).map(eval).unwrap_or(f64::NAN))
                .collect();
            function.call(&valeurs)
        }

        NodeKind::Functional {
            functional,
            iterator,
            ..
        } => {
            let Some(p) = functional_parts(tree, id) else {
                return f64::NAN;
            };
            let (lower, upper) = (eval(p.lower), eval(p.upper));
            let mut body = |t: f64| {
                let l = Liaison {
                    iterateur: iterator,
                    valeur: t,
                    parent: portee,
                };
                evalue(tree, p.core, config, Some(&l))
            };
            functional.apply(lower, upper, config, &mut body)
        }

        NodeKind::Argument { .. } | NodeKind::Bracket(_) => left.map(eval).unwrap_or(f64::NAN),

        NodeKind::Interval | NodeKind::Text(_) | NodeKind::Char(_) => f64::NAN,
    }
}

fn logique(
    tree: &Tree,
    l: Logic,
    left: Option<NodeId>,
    right: Option<NodeId>,
    config: &Config,
    portee: Option<&Liaison<'_>>,
) -> bool {
    let eval = |n: NodeId| evalue(tree, n, config, portee);
    match l {
        Logic::Not => !right.or(left).map(|n| truthy(eval(n))).unwrap_or(false),
        Logic::And => {
            left.map(|n| truthy(eval(n))).unwrap_or(true) && right.map(|n| truthy(eval(n))).unwrap_or(true)
        }
        Logic::Or => {
            left.map(|n| truthy(eval(n))).unwrap_or(false) || right.map(|n| truthy(eval(n))).unwrap_or(false)
        }
        _ => match (left, right) {
            (Some(a), Some(b)) => l.compare(eval(a), eval(b), config.epsilon),
            _ => false,
        },
    }
}

/* ------------------------ Lecture de la structure ------------------------ */

/// (alors, sinon) sous un Selector : Variant => ses deux enfants, sinon (droite, rien).
pub(crate) fn branches(tree: &Tree, right: Option<NodeId>) -> (Option<NodeId>, Option<NodeId>) {
    match right {
        Some(r) if matches!(tree.kind(r), Some(NodeKind::Variant)) => (tree.left(r), tree.right(r)),
        other => (other, None),
    }
}

/// Noeuds Argument d’un appel, dans l’ordre des paramètres.
pub(crate) fn argument_nodes(tree: &Tree, function: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = tree.left(function);
    while let Some(a) = cur {
        if !matches!(tree.kind(a), Some(NodeKind::Argument { .. })) {
            break;
        }
        out.push(a);
        cur = tree.right(a);
    }
    out
}

/// Pièces d’une fonctionnelle bien formée.
pub(crate) struct FunctionalParts {
    pub lower: NodeId,
    pub upper: NodeId,
    pub core: NodeId,
}

/// Paramètres = (iter = lower..upper), Coeur à droite ; None si la forme est abîmée.
pub(crate) fn functional_parts(tree: &Tree, id: NodeId) -> Option<FunctionalParts> {
    let params = tree.left(id)?;
    let interval = tree.right(params)?;
    if !matches!(tree.kind(interval), Some(NodeKind::Interval)) {
        return None;
    }
    Some(FunctionalParts {
        lower: tree.left(interval)?,
        upper: tree.right(interval)?,
        core: tree.right(id)?,
    })
}
