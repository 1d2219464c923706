// src/noyau/simplifie.rs
//
// Pliage des constantes, en place, par les opérations structurelles de l’arbre
// (replace + prune). Parcours postfixe : les enfants sont pliés avant le parent.
//
// - opérateur / logique / bloc dont tous les enfants présents sont constants => Const
// - `?` à condition constante => la branche choisie prend sa place
// - appels de fonctions : jamais pliés (une fonction hôte peut être impure)

use tracing::debug;

use super::arbre::{NodeId, Order, Side, Tree};
use super::config::Config;
use super::erreur::Result;
use super::interprete::{branches, interpret_node};
use super::noeud::{truthy, NodeKind};

/// Nombre de noeuds remplacés.
pub fn fold_constants(tree: &mut Tree, config: &Config) -> Result<usize> {
    let ordre: Vec<NodeId> = tree.walk_all(Order::Post, Side::Left).collect();
    let mut plies = 0;

    for id in ordre {
        if !tree.contains(id) {
            continue;
        }

        if matches!(tree.kind(id), Some(NodeKind::Selector)) {
            if let Some(c) = constante(tree, tree.left(id)) {
                let (alors, sinon) = branches(tree, tree.right(id));
                let choisi = if truthy(c) { alors } else { sinon };
                let remplacant = match choisi {
                    Some(b) => b,
                    None => tree.add(NodeKind::Const(0.0)),
                };
                tree.replace(id, remplacant)?;
                tree.prune(id)?;
                plies += 1;
            }
            continue;
        }

        if pliable(tree, id) {
            let v = interpret_node(tree, id, config);
            let c = tree.add(NodeKind::Const(v));
            tree.replace(id, c)?;
            tree.prune(id)?;
            plies += 1;
        }
    }

    debug!(plies, noeuds = tree.len(), "pliage des constantes");
    Ok(plies)
}

fn constante(tree: &Tree, id: Option<NodeId>) -> Option<f64> {
    match tree.kind(id?) {
        Some(NodeKind::Const(v)) => Some(*v),
        _ => None,
    }
}

fn pliable(tree: &Tree, id: NodeId) -> bool {
    let genre_ok = matches!(
        tree.kind(id),
        Some(NodeKind::Operator(_) | NodeKind::Logic(_) | NodeKind::Bracket(_))
    );
    let (l, r) = (tree.left(id), tree.right(id));
    let enfant_ok = |n: Option<NodeId>| n.is_none() || constante(tree, n).is_some();

    genre_ok && (l.is_some() || r.is_some()) && enfant_ok(l) && enfant_ok(r)
}
