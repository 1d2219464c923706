// src/noyau/arbre.rs
//
// Arbre binaire en arène : les noeuds sont adressés par des indices stables (NodeId).
//
// Contrats:
// - un noeud occupe au plus UNE case (gauche/droite d’un parent, ou racine) ;
// - `parent` d’un noeud == la case qui le contient (maintenu par set_child, seul point d’écriture) ;
// - pas de cycle : accrocher un ancêtre sous son descendant est refusé ;
// - un indice libéré n’est jamais réutilisé (un NodeId périmé ne désigne jamais un autre noeud).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{trace, warn};

use super::erreur::{Error, Result};
use super::noeud::NodeKind;
use super::variable::Variable;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Ordre de parcours ; la priorité gauche/droite est donnée par `Side`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Order {
    Pre,
    In,
    Post,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /* ------------------------ Accès ------------------------ */

    /// Ajoute un noeud détaché (sans parent, sans enfants).
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Some(Node {
            kind,
            left: None,
            right: None,
            parent: None,
        }));
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(Error::InvalidNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(|n| &n.kind)
    }

    pub fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|n| &mut n.kind)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.left)
    }

    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.right)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        self.get(id).and_then(|n| n.child(side))
    }

    /// Côté occupé chez le parent (None : racine ou noeud détaché).
    pub fn side_of(&self, id: NodeId) -> Option<Side> {
        let p = self.parent(id)?;
        if self.left(p) == Some(id) {
            Some(Side::Left)
        } else {
            Some(Side::Right)
        }
    }

    /// Nombre de noeuds vivants.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// `a` est-il `b` ou un ancêtre de `b` ?
    pub fn is_ancestor(&self, a: NodeId, b: NodeId) -> bool {
        let mut cur = Some(b);
        while let Some(c) = cur {
            if c == a {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut d = 0;
        let mut cur = self.parent(id);
        while let Some(c) = cur {
            d += 1;
            cur = self.parent(c);
        }
        d
    }

    /// Hauteur depuis la racine (0 : arbre vide ou réduit à une feuille). Parcours sans récursion.
    pub fn height(&self) -> usize {
        let mut max = 0;
        let mut pile: Vec<(NodeId, usize)> = self.root.map(|r| (r, 0)).into_iter().collect();
        while let Some((id, d)) = pile.pop() {
            max = max.max(d);
            let Some(n) = self.get(id) else {
                continue;
            };
            pile.extend(n.left.into_iter().chain(n.right).map(|c| (c, d + 1)));
        }
        max
    }

    /* ------------------------ Liens (seul point d’écriture) ------------------------ */

    /// Place `child` dans la case `side` de `parent`.
    /// - `child` est d’abord détaché de son ancienne case ;
    /// - l’ancien occupant de la case devient détaché (il reste dans l’arène).
    pub fn set_child(&mut self, parent: NodeId, side: Side, child: Option<NodeId>) -> Result<()> {
        self.node(parent)?;
        if let Some(c) = child {
            self.node(c)?;
            if self.is_ancestor(c, parent) {
                warn!(?parent, child = ?c, "set_child refusé : cycle");
                return Err(Error::Cycle { parent, child: c });
            }
            if self.child(parent, side) == Some(c) {
                return Ok(());
            }
            self.detach(c)?;
        }

        if let Some(old) = self.child(parent, side) {
            self.node_mut(old)?.parent = None;
        }

        let p = self.node_mut(parent)?;
        match side {
            Side::Left => p.left = child,
            Side::Right => p.right = child,
        }
        if let Some(c) = child {
            self.node_mut(c)?.parent = Some(parent);
        }

        trace!(?parent, ?side, ?child, "set_child");
        Ok(())
    }

    /// Nouvelle racine (détachée au préalable si besoin).
    pub fn set_root(&mut self, root: Option<NodeId>) -> Result<()> {
        if let Some(r) = root {
            self.node(r)?;
            self.detach(r)?;
        }
        self.root = root;
        Ok(())
    }

    /// Retire le noeud de sa case (il garde ses enfants).
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        match self.node(id)?.parent {
            Some(p) => {
                let pn = self.node_mut(p)?;
                if pn.left == Some(id) {
                    pn.left = None;
                } else if pn.right == Some(id) {
                    pn.right = None;
                }
                self.node_mut(id)?.parent = None;
            }
            None => {
                if self.root == Some(id) {
                    self.root = None;
                }
            }
        }
        Ok(())
    }

    /// `new` prend la case de `old` ; `old` devient détaché.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if old == new {
            return Ok(());
        }
        self.node(new)?;
        let parent = self.node(old)?.parent;
        match parent {
            Some(p) => {
                let side = self.side_of(old).unwrap_or(Side::Left);
                // `new` peut être un descendant de `old` : on le libère d’abord
                self.detach(new)?;
                self.set_child(p, side, Some(new))
            }
            None if self.root == Some(old) => self.set_root(Some(new)),
            None => self.detach(new),
        }
    }

    /* ------------------------ Chirurgie ------------------------ */

    /// Extrait un noeud en préservant l’ordre infixe des survivants.
    ///
    /// - racine : le plus à droite du sous-arbre gauche absorbe le sous-arbre droit
    ///   (sinon le sous-arbre droit devient racine) ;
    /// - enfant gauche : la case reçoit le sous-arbre gauche, dont le plus à droite absorbe le droit ;
    /// - enfant droit : miroir (la case reçoit le droit, dont le plus à gauche absorbe le gauche).
    pub fn remove(&mut self, id: NodeId) -> Result<NodeKind> {
        let (l, r, parent) = {
            let n = self.node(id)?;
            (n.left, n.right, n.parent)
        };
        let side = self.side_of(id);
        let was_root = self.root == Some(id);

        // détache les deux sous-arbres
        if let Some(l) = l {
            self.detach(l)?;
        }
        if let Some(r) = r {
            self.detach(r)?;
        }

        let preferred = match side {
            Some(Side::Right) => Side::Right,
            _ => Side::Left,
        };

        let survivor = match (l, r) {
            (Some(l), Some(r)) => match preferred {
                Side::Left => {
                    let absorber = self.rightmost(l);
                    self.set_child(absorber, Side::Right, Some(r))?;
                    Some(l)
                }
                Side::Right => {
                    let absorber = self.leftmost(r);
                    self.set_child(absorber, Side::Left, Some(l))?;
                    Some(r)
                }
            },
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        };

        match (parent, side) {
            (Some(p), Some(s)) => self.set_child(p, s, survivor)?,
            _ if was_root => self.set_root(survivor)?,
            _ => {}
        }

        let removed = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(Error::InvalidNode(id))?;

        trace!(?id, ?survivor, "remove");
        Ok(removed.kind)
    }

    /// Échange les positions de deux noeuds : chacun prend la case et les enfants de l’autre.
    /// Cas parent/enfant direct compris ; swap(a, b) deux fois restaure la forme initiale.
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        if a == b {
            self.node(a)?;
            return Ok(());
        }
        let (pa, la, ra) = {
            let n = self.node(a)?;
            (n.parent, n.left, n.right)
        };
        let (pb, lb, rb) = {
            let n = self.node(b)?;
            (n.parent, n.left, n.right)
        };

        // a <-> b dans tous les liens
        let map = |x: Option<NodeId>| match x {
            Some(v) if v == a => Some(b),
            Some(v) if v == b => Some(a),
            other => other,
        };

        let mut externes: Vec<NodeId> = [pa, la, ra, pb, lb, rb]
            .into_iter()
            .flatten()
            .filter(|&x| x != a && x != b)
            .collect();
        externes.sort();
        externes.dedup();

        {
            let na = self.node_mut(a)?;
            na.parent = map(pb);
            na.left = map(lb);
            na.right = map(rb);
        }
        {
            let nb = self.node_mut(b)?;
            nb.parent = map(pa);
            nb.left = map(la);
            nb.right = map(ra);
        }
        for x in externes {
            let n = self.node_mut(x)?;
            n.parent = map(n.parent);
            n.left = map(n.left);
            n.right = map(n.right);
        }
        self.root = map(self.root);

        trace!(?a, ?b, "swap");
        Ok(())
    }

    /// Détache et libère tout un sous-arbre.
    pub fn prune(&mut self, id: NodeId) -> Result<()> {
        self.detach(id)?;
        for n in self.walk(id, Order::Post, Side::Left) {
            if let Some(slot) = self.nodes.get_mut(n.0) {
                *slot = None;
            }
        }
        Ok(())
    }

    /// Copie profonde d’un sous-arbre de `src` dans `self` (noeud retourné détaché).
    ///
    /// Les variables sont partagées (même cellule), SAUF les itérateurs de fonctionnelles :
    /// chaque copie reçoit son propre itérateur, re-câblé dans son Coeur.
    pub fn graft(&mut self, src: &Tree, id: NodeId) -> Result<NodeId> {
        let mut iterateurs = HashMap::new();
        self.graft_with(src, id, &mut iterateurs)
    }

    fn graft_with(
        &mut self,
        src: &Tree,
        id: NodeId,
        iterateurs: &mut HashMap<*const Variable, Arc<Variable>>,
    ) -> Result<NodeId> {
        let n = src.node(id)?;
        let kind = match &n.kind {
            NodeKind::Functional {
                name,
                functional,
                iterator,
            } => {
                let fresh = Variable::mutable(iterator.name(), iterator.value());
                iterateurs.insert(Arc::as_ptr(iterator), fresh.clone());
                NodeKind::Functional {
                    name: name.clone(),
                    functional: functional.clone(),
                    iterator: fresh,
                }
            }
            NodeKind::Variable(v) => match iterateurs.get(&Arc::as_ptr(v)) {
                Some(fresh) => NodeKind::Variable(fresh.clone()),
                None => NodeKind::Variable(v.clone()),
            },
            other => other.clone(),
        };
        let (l, r) = (n.left, n.right);

        let copy = self.add(kind);
        if let Some(l) = l {
            let cl = self.graft_with(src, l, iterateurs)?;
            self.set_child(copy, Side::Left, Some(cl))?;
        }
        if let Some(r) = r {
            let cr = self.graft_with(src, r, iterateurs)?;
            self.set_child(copy, Side::Right, Some(cr))?;
        }
        Ok(copy)
    }

    /// Copie profonde de l’arbre entier (arène compactée).
    pub fn duplicate(&self) -> Result<Tree> {
        let mut out = Tree::new();
        if let Some(r) = self.root {
            let copy = out.graft(self, r)?;
            out.set_root(Some(copy))?;
        }
        Ok(out)
    }

    /* ------------------------ Parcours ------------------------ */

    /// Les six ordres : {pré, in, post} × {gauche d’abord, droite d’abord}.
    pub fn walk(&self, start: NodeId, order: Order, first: Side) -> std::vec::IntoIter<NodeId> {
        let mut out = Vec::new();
        self.collect(start, order, first, &mut out);
        out.into_iter()
    }

    fn collect(&self, id: NodeId, order: Order, first: Side, out: &mut Vec<NodeId>) {
        let Some(n) = self.get(id) else {
            return;
        };
        let (a, b) = (n.child(first), n.child(first.other()));

        if order == Order::Pre {
            out.push(id);
        }
        if let Some(a) = a {
            self.collect(a, order, first, out);
        }
        if order == Order::In {
            out.push(id);
        }
        if let Some(b) = b {
            self.collect(b, order, first, out);
        }
        if order == Order::Post {
            out.push(id);
        }
    }

    /// Parcours de tout l’arbre depuis la racine.
    pub fn walk_all(&self, order: Order, first: Side) -> std::vec::IntoIter<NodeId> {
        match self.root {
            Some(r) => self.walk(r, order, first),
            None => Vec::new().into_iter(),
        }
    }

    /// Feuilles dans l’ordre gauche -> droite.
    pub fn leaves(&self, start: NodeId) -> Vec<NodeId> {
        self.walk(start, Order::In, Side::Left)
            .filter(|&n| self.get(n).map(Node::is_leaf).unwrap_or(false))
            .collect()
    }

    pub fn leftmost(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(l) = self.left(cur) {
            cur = l;
        }
        cur
    }

    pub fn rightmost(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(r) = self.right(cur) {
            cur = r;
        }
        cur
    }

    /// Voisins stricts dans l’ordre infixe (prédécesseurs à gauche, successeurs à droite).
    pub fn neighbors(&self, id: NodeId, direction: Side) -> Neighbors<'_> {
        Neighbors {
            tree: self,
            current: Some(id),
            direction,
        }
    }

    /// Chemin depuis le sommet : "l/r/l" ("" pour le sommet lui-même).
    pub fn path_of(&self, id: NodeId) -> Result<String> {
        self.node(id)?;
        let mut pas = Vec::new();
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            pas.push(match self.side_of(cur) {
                Some(Side::Left) => "l",
                _ => "r",
            });
            cur = p;
        }
        pas.reverse();
        Ok(pas.join("/"))
    }

    /// Suit un chemin relatif : "l", "r", ".." (parent) séparés par '/'.
    pub fn follow(&self, start: NodeId, path: &str) -> Result<NodeId> {
        self.node(start)?;
        let mut cur = start;
        for pas in path.split('/').filter(|p| !p.is_empty()) {
            let next = match pas {
                "l" => self.left(cur),
                "r" => self.right(cur),
                ".." => self.parent(cur),
                _ => return Err(Error::InvalidPath(path.to_string())),
            };
            cur = next.ok_or_else(|| Error::InvalidPath(path.to_string()))?;
        }
        Ok(cur)
    }

    /// Vérifie les invariants de liens (parents cohérents, racine sans parent, pas de cycle).
    pub fn is_consistent(&self) -> bool {
        if let Some(r) = self.root {
            match self.get(r) {
                Some(n) if n.parent.is_none() => {}
                _ => return false,
            }
        }
        let vivants = self.len();
        for (i, slot) in self.nodes.iter().enumerate() {
            let Some(n) = slot else {
                continue;
            };
            let id = NodeId(i);
            for c in [n.left, n.right].into_iter().flatten() {
                if self.parent(c) != Some(id) {
                    return false;
                }
            }
            if n.left.is_some() && n.left == n.right {
                return false;
            }
            if let Some(p) = n.parent {
                let Some(pn) = self.get(p) else {
                    return false;
                };
                if pn.left != Some(id) && pn.right != Some(id) {
                    return false;
                }
            }
            // une remontée plus longue que l’arène = cycle
            let mut pas = 0;
            let mut cur = n.parent;
            while let Some(c) = cur {
                pas += 1;
                if pas > vivants {
                    return false;
                }
                cur = self.parent(c);
            }
        }
        true
    }
}

/// Itérateur des voisins infixes (voir `Tree::neighbors`).
pub struct Neighbors<'a> {
    tree: &'a Tree,
    current: Option<NodeId>,
    direction: Side,
}

impl Iterator for Neighbors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.current?;
        let d = self.direction;
        let next = match self.tree.child(cur, d) {
            // descente : extrémité opposée du sous-arbre côté `d`
            Some(c) => Some(match d {
                Side::Right => self.tree.leftmost(c),
                Side::Left => self.tree.rightmost(c),
            }),
            // remontée tant qu’on vient du côté `d`
            None => {
                let mut n = cur;
                loop {
                    match self.tree.parent(n) {
                        Some(p) if self.tree.child(p, d) == Some(n) => n = p,
                        Some(p) => break Some(p),
                        None => break None,
                    }
                }
            }
        };
        self.current = next;
        next
    }
}
