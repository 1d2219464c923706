// src/noyau/compile.rs
//
// « Compiler une fois, appeler souvent » : chaque noeud devient une fermeture
// composée des fermetures de ses enfants. L’arbre n’est plus relu à l’appel.
//
// Mêmes règles que l’interprète (neutres, epsilon, paresse de & |) ; les noeuds
// logiques sont d’abord des fermetures booléennes, matérialisées en 1.0 / 0.0.
//
// Chaque itérateur de fonctionnelle reçoit un emplacement dans un cadre alloué à
// l’appel : un même exécutable peut tourner sur plusieurs threads à la fois.

use std::fmt;
use std::sync::Arc;

use super::arbre::{NodeId, Tree};
use super::config::Config;
use super::interprete::{argument_nodes, branches, functional_parts};
use super::noeud::{from_bool, truthy, Logic, NodeKind};
use super::variable::{same_cell, Variable};

/// Fermeture d’un noeud ; le cadre porte les valeurs des itérateurs de l’appel en cours.
pub type Fragment = Arc<dyn Fn(&mut [f64]) -> f64 + Send + Sync>;
type Predicat = Arc<dyn Fn(&mut [f64]) -> bool + Send + Sync>;

/// Exécutable réutilisable d’une expression.
#[derive(Clone)]
pub struct Compiled {
    root: Fragment,
    /// Taille du cadre (un emplacement par fonctionnelle).
    emplacements: usize,
    variables: Vec<Arc<Variable>>,
}

impl Compiled {
    /// Évalue avec les valeurs courantes des variables.
    pub fn call(&self) -> f64 {
        let mut cadre = vec![0.0; self.emplacements];
        (self.root)(&mut cadre)
    }

    /// Affecte les variables mutables dans l’ordre de la table, puis évalue.
    /// Valeurs en trop : ignorées ; manquantes : variables inchangées.
    pub fn call_with(&self, values: &[f64]) -> f64 {
        for (v, x) in self.variables.iter().filter(|v| v.is_mutable()).zip(values) {
            v.assign(*x);
        }
        self.call()
    }

    pub fn variables(&self) -> &[Arc<Variable>] {
        &self.variables
    }
}

impl fmt::Debug for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiled")
            .field("emplacements", &self.emplacements)
            .field("variables", &self.variables)
            .finish()
    }
}

fn constante(x: f64) -> Fragment {
    Arc::new(move |_: &mut [f64]| x)
}

/// Exécutable de la racine (NaN pour un arbre vide).
pub fn compile(tree: &Tree, config: &Config, variables: Vec<Arc<Variable>>) -> Compiled {
    let mut c = Compilateur {
        tree,
        config,
        portee: Vec::new(),
        emplacements: 0,
    };
    let root = match tree.root() {
        Some(r) => c.noeud(r),
        None => constante(f64::NAN),
    };
    Compiled {
        root,
        emplacements: c.emplacements,
        variables,
    }
}

struct Compilateur<'t> {
    tree: &'t Tree,
    config: &'t Config,
    /// Itérateurs visibles (le plus interne en dernier) et leur emplacement.
    portee: Vec<(Arc<Variable>, usize)>,
    emplacements: usize,
}

impl Compilateur<'_> {
    fn noeud(&mut self, id: NodeId) -> Fragment {
        let tree = self.tree;
        let Some(kind) = tree.kind(id) else {
            return constante(f64::NAN);
        };
        let (left, right) = (tree.left(id), tree.right(id));

        match kind {
            NodeKind::Const(v) => constante(*v),

            NodeKind::Variable(v) => {
                let emplacement = self.portee.iter().rev().find(|(it, _)| same_cell(it, v)).map(|(_, k)| *k);
                match emplacement {
                    Some(k) => Arc::new(move |cadre: &mut [f64]| cadre.get(k).copied().unwrap_or(f64::NAN)),
                    None => {
                        let v = v.clone();
                        Arc::new(move |_: &mut [f64]| v.value())
                    }
                }
            }

            NodeKind::Operator(op) => {
                let op = *op;
                let a = self.ou(left, op.neutral());
                let b = self.ou(right, op.neutral());
                Arc::new(move |cadre: &mut [f64]| {
                    let x = a(cadre);
                    op.apply(x, b(cadre))
                })
            }

            NodeKind::Logic(l) => {
                let p = self.predicat(*l, left, right);
                Arc::new(move |cadre: &mut [f64]| from_bool(p(cadre)))
            }

            NodeKind::Selector => {
                let cond: Predicat = match left {
                    Some(c) => {
                        let c = self.noeud(c);
                        Arc::new(move |cadre: &mut [f64]| truthy(c(cadre)))
                    }
                    None => Arc::new(|_: &mut [f64]| false),
                };
                let (alors, sinon) = branches(tree, right);
                let alors = self.ou(alors, 0.0);
                let sinon = self.ou(sinon, 0.0);
                Arc::new(move |cadre: &mut [f64]| if cond(cadre) { alors(cadre) } else { sinon(cadre) })
            }

            NodeKind::Variant => self.ou(left, 0.0),

            NodeKind::Function { function, .. } => {
                let args = argument_nodes(tree, id);
                if args.len() != function.arity() {
                    return constante(f64::NAN);
                }
                let fragments: Vec<Fragment> = args.iter().map(|&a| self.ou(tree.left(a), f64::NAN)).collect();
                let body = function.body();
                Arc::new(move |cadre: &mut [f64]| {
                    let mut valeurs = Vec::with_capacity(fragments.len());
                    for f in &fragments {
                        valeurs.push(f(cadre));
                    }
                    body(&valeurs)
                })
            }

            NodeKind::Functional {
                functional,
                iterator,
                ..
            } => {
                let Some(p) = functional_parts(tree, id) else {
                    return constante(f64::NAN);
                };
                // bornes : portée externe ; coeur : l’itérateur lit son emplacement
                let (lower, upper) = (self.noeud(p.lower), self.noeud(p.upper));
                let k = self.emplacements;
                self.emplacements += 1;
                self.portee.push((iterator.clone(), k));
                let core = self.noeud(p.core);
                self.portee.pop();

                let (functional, config) = (functional.clone(), self.config.clone());
                Arc::new(move |cadre: &mut [f64]| {
                    let (a, b) = (lower(cadre), upper(cadre));
                    let mut body = |t: f64| {
                        if let Some(slot) = cadre.get_mut(k) {
                            *slot = t;
                        }
                        core(cadre)
                    };
                    functional.apply(a, b, &config, &mut body)
                })
            }

            NodeKind::Argument { .. } | NodeKind::Bracket(_) => self.ou(left, f64::NAN),

            NodeKind::Interval | NodeKind::Text(_) | NodeKind::Char(_) => constante(f64::NAN),
        }
    }

    /// Enfant compilé, ou constante `defaut` s’il manque.
    fn ou(&mut self, n: Option<NodeId>, defaut: f64) -> Fragment {
        match n {
            Some(n) => self.noeud(n),
            None => constante(defaut),
        }
    }

    /// Fermeture booléenne d’un noeud logique.
    fn predicat(&mut self, l: Logic, left: Option<NodeId>, right: Option<NodeId>) -> Predicat {
        match l {
            Logic::Not => {
                let p = self.verite(right.or(left), false);
                Arc::new(move |cadre: &mut [f64]| !p(cadre))
            }
            Logic::And => {
                let (a, b) = (self.verite(left, true), self.verite(right, true));
                Arc::new(move |cadre: &mut [f64]| a(cadre) && b(cadre))
            }
            Logic::Or => {
                let (a, b) = (self.verite(left, false), self.verite(right, false));
                Arc::new(move |cadre: &mut [f64]| a(cadre) || b(cadre))
            }
            _ => match (left, right) {
                (Some(a), Some(b)) => {
                    let (a, b) = (self.noeud(a), self.noeud(b));
                    let epsilon = self.config.epsilon;
                    Arc::new(move |cadre: &mut [f64]| {
                        let x = a(cadre);
                        l.compare(x, b(cadre), epsilon)
                    })
                }
                _ => Arc::new(|_: &mut [f64]| false),
            },
        }
    }

    fn verite(&mut self, n: Option<NodeId>, defaut: bool) -> Predicat {
        match n {
            Some(n) => {
                let f = self.noeud(n);
                Arc::new(move |cadre: &mut [f64]| truthy(f(cadre)))
            }
            None => Arc::new(move |_: &mut [f64]| defaut),
        }
    }
}
