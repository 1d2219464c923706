// src/noyau/parseur.rs
//
// Termes -> arbre, par insertion selon la priorité (pas de file RPN).
//
// Règles:
// - une valeur s’accroche à droite de l’opérateur courant ; deux valeurs collées => '*' implicite
//   ("5x", "2(x+1)", ")(")
// - un opérateur remonte depuis le noeud courant tant que le parent a une priorité >= la sienne
//   (> pour '?', associatif à droite) et s’insère au-dessus de cette chaîne
//   => associativité à gauche pour priorités égales, sans pile d’opérateurs
// - ':' se rattache au '?' ouvert le plus proche
// - '-' préfixe : soustraction sans gauche (négation) ; '!' préfixe : NON ; '+' préfixe ignoré
// - blocs : sous-arbre construit à part puis accroché comme une valeur
// - fonctions : arguments découpés sur ',' (niveau 0), "nom: expr" pour un argument nommé
// - fonctionnelles : Paramètres "i = a..b" (bornes dans la portée externe),
//   Coeur construit avec l’itérateur `i` en portée (une cellule par fonctionnelle, masque les noms externes)

use std::sync::Arc;

use tracing::{debug, instrument};

use super::arbre::{NodeId, Side, Tree};
use super::config::{Config, PROFONDEUR_MAX};
use super::erreur::{Error, Result};
use super::expression::Expression;
use super::noeud::{Logic, NodeKind, Operator, PRIORITE_UNAIRE};
use super::symboles::{Function, Resolver, SymbolTables};
use super::termes::{decompose, Bracket, Term, TermKind};
use super::variable::Variable;

/// Analyseur : tables de départ + réglages + résolveurs (dans l’ordre d’enregistrement).
pub struct Parser {
    config: Config,
    tables: SymbolTables,
    resolvers: Vec<Box<dyn Resolver>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Tables standard (constantes, primitives, Sum/Product/Integral), réglages par défaut.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            tables: SymbolTables::standard(),
            resolvers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_tables(mut self, tables: SymbolTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.add_resolver(resolver);
        self
    }

    pub fn add_resolver(&mut self, resolver: impl Resolver + 'static) {
        self.resolvers.push(Box::new(resolver));
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut SymbolTables {
        &mut self.tables
    }

    /// Décompose puis construit.
    #[instrument(level = "debug", skip(self))]
    pub fn parse(&self, source: &str) -> Result<Expression> {
        let terms = decompose(source)?;
        debug!(termes = terms.len(), "décomposition");
        self.parse_terms(source, &terms)
    }

    /// Construit une expression à partir de termes déjà décomposés.
    pub fn parse_terms(&self, source: &str, terms: &[Term]) -> Result<Expression> {
        let mut c = Construction {
            parser: self,
            tree: Tree::new(),
            tables: self.tables.clone(),
            scopes: Vec::new(),
        };

        let root = c.sequence(terms)?.ok_or(Error::Empty)?;
        c.tree.set_root(Some(root))?;
        // chaînes d’opérateurs (1+1+…) : profondeur acquise par le haut
        if c.tree.height() > PROFONDEUR_MAX {
            return Err(Error::TooDeep { limit: PROFONDEUR_MAX });
        }
        debug!(noeuds = c.tree.len(), variables = c.tables.variables.len(), "arbre construit");

        Ok(Expression::from_parts(
            c.tree,
            c.tables,
            self.config.clone(),
            source.to_string(),
        ))
    }
}

/* ------------------------ Opérateurs lus ------------------------ */

#[derive(Clone, Copy, Debug)]
enum Lu {
    Arith(Operator),
    Logic(Logic),
    Interval,
    Selector,
    Variant,
}

impl Lu {
    fn kind(self) -> NodeKind {
        match self {
            Self::Arith(op) => NodeKind::Operator(op),
            Self::Logic(l) => NodeKind::Logic(l),
            Self::Interval => NodeKind::Interval,
            Self::Selector => NodeKind::Selector,
            Self::Variant => NodeKind::Variant,
        }
    }

    fn libelle(self) -> String {
        match self {
            Self::Arith(op) => op.symbol().to_string(),
            Self::Logic(l) => l.symbol().to_string(),
            Self::Interval => "..".into(),
            Self::Selector => "?".into(),
            Self::Variant => ":".into(),
        }
    }
}

/// Lit l’opérateur en `terms[i]` (1 ou 2 caractères collés) ; retourne (opérateur, termes consommés).
fn lire_operateur(terms: &[Term], i: usize) -> Result<(Lu, usize)> {
    let t = &terms[i];
    let TermKind::Symbol(c) = t.kind else {
        return Err(Error::UnexpectedTerm {
            position: t.position,
            found: t.describe(),
            expected: "opérateur",
        });
    };

    // second caractère collé ?
    let suivant = terms.get(i + 1).and_then(|n| match n.kind {
        TermKind::Symbol(s) if n.position == t.position + 1 => Some(s),
        _ => None,
    });

    let double = match (c, suivant) {
        ('!', Some('=')) | ('<', Some('>')) => Some(Lu::Logic(Logic::NotEqual)),
        ('>', Some('=')) => Some(Lu::Logic(Logic::GreaterEqual)),
        ('<', Some('=')) => Some(Lu::Logic(Logic::LessEqual)),
        ('=', Some('=')) => Some(Lu::Logic(Logic::Equal)),
        ('&', Some('&')) => Some(Lu::Logic(Logic::And)),
        ('|', Some('|')) => Some(Lu::Logic(Logic::Or)),
        ('.', Some('.')) => Some(Lu::Interval),
        _ => None,
    };
    if let Some(op) = double {
        return Ok((op, 2));
    }

    let simple = match c {
        '=' => Lu::Logic(Logic::Equal),
        '≠' => Lu::Logic(Logic::NotEqual),
        '>' => Lu::Logic(Logic::Greater),
        '<' => Lu::Logic(Logic::Less),
        '≥' => Lu::Logic(Logic::GreaterEqual),
        '≤' => Lu::Logic(Logic::LessEqual),
        '&' => Lu::Logic(Logic::And),
        '|' => Lu::Logic(Logic::Or),
        '!' | '¬' => Lu::Logic(Logic::Not),
        '?' => Lu::Selector,
        ':' => Lu::Variant,
        '…' => Lu::Interval,
        _ => match Operator::from_symbol(c) {
            Some(op) => Lu::Arith(op),
            None => {
                return Err(Error::UnexpectedTerm {
                    position: t.position,
                    found: t.describe(),
                    expected: "opérateur ou valeur",
                })
            }
        },
    };
    Ok((simple, 1))
}

/* ------------------------ Construction ------------------------ */

struct Construction<'p> {
    parser: &'p Parser,
    tree: Tree,
    tables: SymbolTables,
    /// Itérateurs de fonctionnelles en portée (le plus interne en dernier).
    scopes: Vec<Arc<Variable>>,
}

/// État d’une séquence en cours : sommet + dernier noeud inséré.
#[derive(Default)]
struct Curseur {
    top: Option<NodeId>,
    current: Option<NodeId>,
    /// Position du dernier opérateur (messages « opérande manquant »).
    last_op: Option<(usize, String)>,
}

impl Construction<'_> {
    /// Construit le sous-arbre d’une séquence ; None si la séquence est vide.
    fn sequence(&mut self, terms: &[Term]) -> Result<Option<NodeId>> {
        let mut cur = Curseur::default();
        let mut i = 0;

        while i < terms.len() {
            let t = &terms[i];

            if let TermKind::Symbol(_) = t.kind {
                let (op, consumed) = lire_operateur(terms, i)?;
                i += consumed;
                self.operateur(&mut cur, op, t.position)?;
                continue;
            }

            let leaf = self.feuille(t)?;
            self.valeur(&mut cur, leaf)?;
            i += 1;
        }

        if self.attend_operande(&cur) {
            if let Some((position, operator)) = cur.last_op {
                return Err(Error::MissingOperand { position, operator });
            }
        }
        Ok(cur.top)
    }

    /// Le curseur attend-il un opérande (début, ou opérateur sans droite) ?
    fn attend_operande(&self, cur: &Curseur) -> bool {
        match cur.current {
            None => true,
            Some(n) => {
                let ouvert = self.tree.kind(n).map(NodeKind::is_operator).unwrap_or(false);
                ouvert && self.tree.right(n).is_none()
            }
        }
    }

    /// Priorité de construction (négation et NON préfixes : PRIORITE_UNAIRE).
    fn priorite(&self, id: NodeId) -> u8 {
        match self.tree.kind(id) {
            Some(NodeKind::Operator(Operator::Sub)) if self.tree.left(id).is_none() => PRIORITE_UNAIRE,
            Some(k) => k.priority(),
            None => 0,
        }
    }

    fn operateur(&mut self, cur: &mut Curseur, op: Lu, position: usize) -> Result<()> {
        cur.last_op = Some((position, op.libelle()));

        if self.attend_operande(cur) {
            // préfixes
            return match op {
                Lu::Arith(Operator::Add) => Ok(()),
                Lu::Arith(Operator::Sub) | Lu::Logic(Logic::Not) => {
                    let n = self.tree.add(op.kind());
                    self.accroche(cur, n)
                }
                _ => Err(Error::MissingOperand {
                    position,
                    operator: op.libelle(),
                }),
            };
        }

        match op {
            Lu::Logic(Logic::Not) => Err(Error::UnexpectedTerm {
                position,
                found: "'!'".into(),
                expected: "opérateur binaire",
            }),
            Lu::Variant => self.variant(cur, position),
            Lu::Selector => self.insere(cur, op.kind(), true),
            _ => self.insere(cur, op.kind(), false),
        }
    }

    /// Accroche `n` là où un opérande est attendu ; `n` devient le noeud courant.
    fn accroche(&mut self, cur: &mut Curseur, n: NodeId) -> Result<()> {
        match cur.current {
            None => cur.top = Some(n),
            Some(op) => {
                // chaînes préfixes (---x, a?b:c?d:…) : profondeur acquise par le bas
                if self.tree.depth(op) >= PROFONDEUR_MAX {
                    return Err(Error::TooDeep { limit: PROFONDEUR_MAX });
                }
                self.tree.set_child(op, Side::Right, Some(n))?
            }
        }
        cur.current = Some(n);
        Ok(())
    }

    fn valeur(&mut self, cur: &mut Curseur, leaf: NodeId) -> Result<()> {
        if !self.attend_operande(cur) {
            // juxtaposition : 5x == 5*x
            self.insere(cur, NodeKind::Operator(Operator::Mul), false)?;
        }
        self.accroche(cur, leaf)
    }

    /// Insère un opérateur binaire au-dessus de la chaîne des ancêtres de priorité >= (ou >).
    fn insere(&mut self, cur: &mut Curseur, kind: NodeKind, droite: bool) -> Result<()> {
        let prio = kind.priority();
        let Some(mut node) = cur.current else {
            return Err(Error::Empty);
        };

        while let Some(p) = self.tree.parent(node) {
            let pp = self.priorite(p);
            let monte = if droite { pp > prio } else { pp >= prio };
            if !monte {
                break;
            }
            node = p;
        }

        let op = self.tree.add(kind);
        match (self.tree.parent(node), self.tree.side_of(node)) {
            (Some(p), Some(side)) => {
                self.tree.set_child(p, side, Some(op))?;
            }
            _ => cur.top = Some(op),
        }
        self.tree.set_child(op, Side::Left, Some(node))?;
        cur.current = Some(op);
        Ok(())
    }

    /// ':' : le '?' ouvert le plus proche reçoit Variant(alors, _).
    fn variant(&mut self, cur: &mut Curseur, position: usize) -> Result<()> {
        let Some(mut node) = cur.current else {
            return Err(Error::DanglingVariant { position });
        };
        let selector = loop {
            let Some(p) = self.tree.parent(node) else {
                return Err(Error::DanglingVariant { position });
            };
            let ouvert = matches!(self.tree.kind(p), Some(NodeKind::Selector))
                && !matches!(
                    self.tree.right(p).and_then(|r| self.tree.kind(r)),
                    Some(NodeKind::Variant)
                );
            if ouvert {
                break p;
            }
            node = p;
        };

        let v = self.tree.add(NodeKind::Variant);
        self.tree.set_child(selector, Side::Right, Some(v))?;
        self.tree.set_child(v, Side::Left, Some(node))?;
        cur.current = Some(v);
        Ok(())
    }

    /* ------------------------ Feuilles ------------------------ */

    fn feuille(&mut self, t: &Term) -> Result<NodeId> {
        match &t.kind {
            TermKind::Number { text, .. } => {
                let v = t.number_value().ok_or_else(|| Error::InvalidNumber {
                    position: t.position,
                    text: text.clone(),
                })?;
                Ok(self.tree.add(NodeKind::Const(v)))
            }
            TermKind::Identifier(name) => {
                let v = self.identificateur(name)?;
                Ok(self.tree.add(NodeKind::Variable(v)))
            }
            TermKind::Block { bracket, terms } => self.bloc(*bracket, terms, t.position),
            TermKind::Function {
                name,
                bracket,
                arguments,
            } => self.fonction(name, *bracket, arguments, t.position),
            TermKind::Functional {
                name,
                parameters,
                core,
            } => self.fonctionnelle(name, parameters, core, t.position),
            TermKind::Text(s) => Ok(self.tree.add(NodeKind::Text(s.clone()))),
            TermKind::Char(c) => Ok(self.tree.add(NodeKind::Char(*c))),
            TermKind::Symbol(_) => Err(Error::UnexpectedTerm {
                position: t.position,
                found: t.describe(),
                expected: "valeur",
            }),
        }
    }

    fn bloc(&mut self, bracket: Bracket, terms: &[Term], position: usize) -> Result<NodeId> {
        let inner = self.sequence(terms)?.ok_or_else(|| Error::MissingOperand {
            position,
            operator: format!("{}{}", bracket.opening(), bracket.closing()),
        })?;
        let b = self.tree.add(NodeKind::Bracket(bracket));
        self.tree.set_child(b, Side::Left, Some(inner))?;
        Ok(b)
    }

    /// Portée -> constantes -> variables -> résolveurs -> variable libre implicite.
    fn identificateur(&mut self, name: &str) -> Result<Arc<Variable>> {
        if let Some(v) = self.scopes.iter().rev().find(|v| v.name() == name) {
            return Ok(v.clone());
        }
        if let Some(c) = self.tables.constants.get(name) {
            return Ok(c.clone());
        }
        if let Some(v) = self.tables.variables.get(name) {
            return Ok(v.clone());
        }

        for r in &self.parser.resolvers {
            if let Some(v) = r.resolve_variable(name) {
                debug!(name, "variable fournie par un résolveur");
                self.tables.variables.insert(v.clone());
                return Ok(v);
            }
            if let Some(x) = r.resolve_constant(name) {
                debug!(name, valeur = x, "constante fournie par un résolveur");
                return Ok(self.tables.constants.insert(name, x));
            }
        }

        if self.parser.config.implicit_variables {
            debug!(name, "variable libre implicite");
            Ok(self.tables.variables.get_or_create(name))
        } else {
            Err(Error::UnknownIdentifier {
                name: name.to_string(),
            })
        }
    }

    /// Nom connu comme valeur (portée, constante, variable) ?
    fn est_valeur(&self, name: &str) -> bool {
        self.scopes.iter().any(|v| v.name() == name)
            || self.tables.constants.get(name).is_some()
            || self.tables.variables.get(name).is_some()
    }

    /* ------------------------ Fonctions ------------------------ */

    fn fonction(&mut self, name: &str, bracket: Bracket, arguments: &[Term], position: usize) -> Result<NodeId> {
        let args = decoupe_arguments(arguments, position)?;
        let arity = args.len();
        let nommes = args.iter().any(|a| a.name.is_some());

        let function = match self.cherche_fonction(name, arity) {
            Some(f) => f,
            None => {
                // "k(x+1)" avec k valeur connue : multiplication implicite
                if !self.tables.functions.has_name(name) && self.est_valeur(name) {
                    return self.produit_implicite(name, bracket, arguments, position);
                }
                return Err(Error::UnknownFunction {
                    name: name.to_string(),
                    arity,
                });
            }
        };

        // ordre des paramètres déclarés
        let mut places: Vec<Option<(Option<String>, &[Term], usize)>> = vec![None; arity];
        let mut suivant = 0;
        for a in &args {
            let idx = match &a.name {
                None => {
                    while suivant < arity && places[suivant].is_some() {
                        suivant += 1;
                    }
                    suivant
                }
                Some(n) => function
                    .parameter_index(n)
                    .ok_or_else(|| Error::UnknownParameter {
                        function: function.name().to_string(),
                        parameter: n.clone(),
                    })?,
            };
            if idx >= arity || places[idx].is_some() {
                return Err(Error::DuplicateArgument {
                    function: function.name().to_string(),
                    parameter: function.parameters().get(idx).cloned().unwrap_or_default(),
                });
            }
            places[idx] = Some((a.name.clone(), a.terms, a.position));
        }
        if nommes {
            debug!(function = function.name(), "arguments nommés réordonnés");
        }

        // chaîne d’arguments penchée à droite
        let mut chaine: Option<NodeId> = None;
        for place in places.into_iter().rev() {
            let Some((nom, terms, pos)) = place else {
                continue;
            };
            let expr = self.sequence(terms)?.ok_or(Error::MissingOperand {
                position: pos,
                operator: ",".into(),
            })?;
            let arg = self.tree.add(NodeKind::Argument { name: nom });
            self.tree.set_child(arg, Side::Left, Some(expr))?;
            self.tree.set_child(arg, Side::Right, chaine)?;
            chaine = Some(arg);
        }

        let n = self.tree.add(NodeKind::Function {
            name: name.to_string(),
            function,
        });
        self.tree.set_child(n, Side::Left, chaine)?;
        Ok(n)
    }

    /// Tables d’abord, puis résolveurs (le premier qui répond est mémorisé).
    fn cherche_fonction(&mut self, name: &str, arity: usize) -> Option<Arc<Function>> {
        if let Some(f) = self.tables.functions.get(name, arity) {
            return Some(f.clone());
        }
        let trouve = self
            .parser
            .resolvers
            .iter()
            .find_map(|r| r.resolve_function(name, arity))?;
        debug!(name, arity, "fonction fournie par un résolveur");
        self.tables.functions.insert(trouve.clone());
        Some(trouve)
    }

    fn produit_implicite(&mut self, name: &str, bracket: Bracket, arguments: &[Term], position: usize) -> Result<NodeId> {
        let v = self.identificateur(name)?;
        let gauche = self.tree.add(NodeKind::Variable(v));
        let droite = self.bloc(bracket, arguments, position)?;
        let fois = self.tree.add(NodeKind::Operator(Operator::Mul));
        self.tree.set_child(fois, Side::Left, Some(gauche))?;
        self.tree.set_child(fois, Side::Right, Some(droite))?;
        Ok(fois)
    }

    /* ------------------------ Fonctionnelles ------------------------ */

    fn fonctionnelle(&mut self, name: &str, parameters: &[Term], core: &[Term], position: usize) -> Result<NodeId> {
        let invalide = |reason| Error::InvalidFunctional {
            name: name.to_string(),
            reason,
        };

        // i = a..b
        let iter_name = match (parameters.first(), parameters.get(1)) {
            (Some(Term { kind: TermKind::Identifier(n), .. }), Some(eq)) if eq.is_symbol('=') => n.clone(),
            _ => return Err(invalide("attendu « i = a..b »")),
        };

        let functional = match self.tables.functionals.get(name, 1) {
            Some(f) => f.clone(),
            None => {
                let f = self
                    .parser
                    .resolvers
                    .iter()
                    .find_map(|r| r.resolve_functional(name, 1))
                    .ok_or_else(|| Error::UnknownFunctional {
                        name: name.to_string(),
                        arity: 1,
                    })?;
                self.tables.functionals.insert(f.clone());
                f
            }
        };

        // bornes : portée externe
        let bornes = self
            .sequence(&parameters[2..])?
            .ok_or_else(|| invalide("bornes « a..b » attendues"))?;
        let complet = matches!(self.tree.kind(bornes), Some(NodeKind::Interval))
            && self.tree.left(bornes).is_some()
            && self.tree.right(bornes).is_some();
        if !complet {
            return Err(invalide("bornes « a..b » attendues"));
        }

        let iterator = Variable::mutable(iter_name, 0.0);
        let var = self.tree.add(NodeKind::Variable(iterator.clone()));
        let egal = self.tree.add(NodeKind::Logic(Logic::Equal));
        self.tree.set_child(egal, Side::Left, Some(var))?;
        self.tree.set_child(egal, Side::Right, Some(bornes))?;

        // coeur : itérateur en portée
        self.scopes.push(iterator.clone());
        let coeur = self.sequence(core);
        self.scopes.pop();
        let coeur = coeur?.ok_or_else(|| Error::MissingOperand {
            position,
            operator: format!("{name}{{}}"),
        })?;

        let n = self.tree.add(NodeKind::Functional {
            name: name.to_string(),
            functional,
            iterator,
        });
        self.tree.set_child(n, Side::Left, Some(egal))?;
        self.tree.set_child(n, Side::Right, Some(coeur))?;
        Ok(n)
    }
}

/* ------------------------ Arguments ------------------------ */

struct Argument<'a> {
    name: Option<String>,
    terms: &'a [Term],
    position: usize,
}

/// Découpe sur ',' de niveau 0 ; "nom: expr" => argument nommé.
fn decoupe_arguments(terms: &[Term], position: usize) -> Result<Vec<Argument<'_>>> {
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for morceau in terms.split(|t| t.is_symbol(',')) {
        let Some(premier) = morceau.first() else {
            return Err(Error::MissingOperand {
                position,
                operator: ",".into(),
            });
        };
        let arg = match (&premier.kind, morceau.get(1)) {
            (TermKind::Identifier(n), Some(deux)) if deux.is_symbol(':') => Argument {
                name: Some(n.clone()),
                terms: &morceau[2..],
                position: deux.position,
            },
            _ => Argument {
                name: None,
                terms: morceau,
                position: premier.position,
            },
        };
        out.push(arg);
    }
    Ok(out)
}
