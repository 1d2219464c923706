// src/noyau/format.rs
//
// Réimpression d’un arbre en texte re-parsable + vidage indenté (démarche).
//
// Parenthèses minimales : un enfant est entouré si sa priorité est plus faible que celle
// du parent, ou égale à droite (associativité à gauche). Les blocs d’origine (Bracket)
// sont conservés tels quels, donc print(parse(print(e))) == print(e).

use super::arbre::{NodeId, Side, Tree};
use super::interprete::{argument_nodes, branches};
use super::noeud::{Logic, NodeKind, Operator, PRIORITE_PUISSANCE, PRIORITE_SELECTOR, PRIORITE_UNAIRE, PRIORITE_VALEUR};

/* ------------------------ Nombres ------------------------ */

/// Littéral re-parsable : négatifs entre parenthèses, ±inf et NaN en quotients.
pub fn format_nombre(x: f64) -> String {
    if x.is_nan() {
        "(0/0)".into()
    } else if x == f64::INFINITY {
        "(1/0)".into()
    } else if x == f64::NEG_INFINITY {
        "(-1/0)".into()
    } else if x < 0.0 {
        format!("({x})")
    } else {
        // -0.0 => "0"
        format!("{}", x.abs())
    }
}

/* ------------------------ Réimpression ------------------------ */

/// Texte de l’arbre entier (vide si l’arbre l’est).
pub fn print(tree: &Tree) -> String {
    tree.root().map(|r| print_node(tree, r)).unwrap_or_default()
}

pub fn print_node(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    ecrit(tree, id, &mut out);
    out
}

fn est_unaire(tree: &Tree, id: NodeId) -> bool {
    match tree.kind(id) {
        Some(NodeKind::Operator(Operator::Sub)) => tree.left(id).is_none(),
        Some(NodeKind::Logic(Logic::Not)) => true,
        _ => false,
    }
}

/// Priorité vue par le parent (unaires : PRIORITE_UNAIRE).
fn priorite(tree: &Tree, id: NodeId) -> u8 {
    if est_unaire(tree, id) {
        return PRIORITE_UNAIRE;
    }
    tree.kind(id).map(NodeKind::priority).unwrap_or(PRIORITE_VALEUR)
}

/// Enfant `id` sous un opérateur de priorité `parent`, côté `side`.
fn ecrit_operande(tree: &Tree, id: NodeId, parent: u8, side: Side, out: &mut String) {
    let p = priorite(tree, id);
    let entoure = p < parent || (side == Side::Right && (p == parent || est_unaire(tree, id)));
    if entoure {
        out.push('(');
        ecrit(tree, id, out);
        out.push(')');
    } else {
        ecrit(tree, id, out);
    }
}

fn ecrit(tree: &Tree, id: NodeId, out: &mut String) {
    let Some(kind) = tree.kind(id) else {
        return;
    };
    let (left, right) = (tree.left(id), tree.right(id));

    match kind {
        NodeKind::Const(v) => out.push_str(&format_nombre(*v)),
        NodeKind::Variable(v) => out.push_str(v.name()),

        NodeKind::Operator(Operator::Sub) if left.is_none() => prefixe(tree, "-", right, out),
        NodeKind::Logic(Logic::Not) => prefixe(tree, "!", right.or(left), out),

        NodeKind::Operator(op) => {
            let prio = op.priority();
            // opérande absent : neutre explicite (même valeur)
            match left {
                Some(l) => ecrit_operande(tree, l, prio, Side::Left, out),
                None => out.push_str(&format_nombre(op.neutral())),
            }
            out.push_str(op.symbol());
            match right {
                Some(r) => ecrit_operande(tree, r, prio, Side::Right, out),
                None => out.push_str(&format_nombre(op.neutral())),
            }
        }

        NodeKind::Logic(_) | NodeKind::Interval => {
            let prio = kind.priority();
            let symbole = match kind {
                NodeKind::Logic(l) => l.symbol(),
                _ => "..",
            };
            if let Some(l) = left {
                ecrit_operande(tree, l, prio, Side::Left, out);
            }
            out.push_str(symbole);
            if let Some(r) = right {
                ecrit_operande(tree, r, prio, Side::Right, out);
            }
        }

        NodeKind::Selector => {
            if let Some(c) = left {
                ecrit_operande(tree, c, PRIORITE_SELECTOR + 1, Side::Left, out);
            }
            out.push('?');
            let (alors, sinon) = branches(tree, right);
            if let Some(a) = alors {
                ecrit_operande(tree, a, PRIORITE_SELECTOR + 1, Side::Left, out);
            }
            if let Some(s) = sinon {
                out.push(':');
                ecrit(tree, s, out);
            }
        }

        // Variant isolé : seule la première branche compte
        NodeKind::Variant => {
            if let Some(l) = left {
                ecrit(tree, l, out);
            }
        }

        NodeKind::Function { name, .. } => {
            out.push_str(name);
            out.push('(');
            for (k, a) in argument_nodes(tree, id).into_iter().enumerate() {
                if k > 0 {
                    out.push_str(", ");
                }
                if let Some(NodeKind::Argument { name: Some(n) }) = tree.kind(a) {
                    out.push_str(n);
                    out.push(':');
                }
                if let Some(e) = tree.left(a) {
                    ecrit(tree, e, out);
                }
            }
            out.push(')');
        }

        NodeKind::Functional { name, .. } => {
            out.push_str(name);
            out.push('[');
            if let Some(p) = left {
                ecrit(tree, p, out);
            }
            out.push_str("]{");
            if let Some(c) = right {
                ecrit(tree, c, out);
            }
            out.push('}');
        }

        NodeKind::Argument { .. } => {
            if let Some(l) = left {
                ecrit(tree, l, out);
            }
        }

        NodeKind::Bracket(b) => {
            out.push(b.opening());
            if let Some(l) = left {
                ecrit(tree, l, out);
            }
            out.push(b.closing());
        }

        NodeKind::Text(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        NodeKind::Char(c) => {
            out.push('\'');
            out.push(*c);
            out.push('\'');
        }
    }
}

/// Opérateur préfixe : opérande entouré sauf valeur ou puissance.
fn prefixe(tree: &Tree, symbole: &str, operande: Option<NodeId>, out: &mut String) {
    out.push_str(symbole);
    let Some(o) = operande else {
        out.push('0');
        return;
    };
    if priorite(tree, o) >= PRIORITE_PUISSANCE && !est_unaire(tree, o) {
        ecrit(tree, o, out);
    } else {
        out.push('(');
        ecrit(tree, o, out);
        out.push(')');
    }
}

/* ------------------------ Vidage indenté ------------------------ */

/// Une ligne par noeud : profondeur en indentation, côté (g/d), libellé.
pub fn dump(tree: &Tree) -> String {
    let mut out = String::new();
    if let Some(r) = tree.root() {
        vide(tree, r, 0, '·', &mut out);
    }
    out
}

fn vide(tree: &Tree, id: NodeId, profondeur: usize, cote: char, out: &mut String) {
    let Some(kind) = tree.kind(id) else {
        return;
    };
    if !out.is_empty() {
        out.push('\n');
    }
    for _ in 0..profondeur {
        out.push_str("  ");
    }
    out.push(cote);
    out.push(' ');
    out.push_str(&kind.label());

    if let Some(l) = tree.left(id) {
        vide(tree, l, profondeur + 1, 'g', out);
    }
    if let Some(r) = tree.right(id) {
        vide(tree, r, profondeur + 1, 'd', out);
    }
}
