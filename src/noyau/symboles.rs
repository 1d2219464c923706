// src/noyau/symboles.rs
//
// Tables de symboles : Variables, Constants, Functions, Functionals.
//
// - Variables / Constants : par nom (sensible à la casse), ordre d’insertion conservé
//   (l’ordre des variables = l’ordre des arguments positionnels).
// - Functions / Functionals : par (nom en minuscules, arité).
// - Resolver : résolution des noms inconnus, injectée dans le parseur ;
//   les résolveurs sont essayés dans l’ordre d’enregistrement, le premier qui répond gagne.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::config::Config;
use super::erreur::{Error, Result};
use super::variable::Variable;

/* ------------------------ Function ------------------------ */

/// Corps d’une fonction : arguments dans l’ordre des paramètres déclarés.
pub type Body = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

pub struct Function {
    name: String,
    parameters: Vec<String>,
    body: Body,
}

impl Function {
    /// Fonction hôte ; les noms de paramètres servent aux arguments nommés (`f(y: 2, x: 1)`).
    pub fn new<I, S>(name: impl Into<String>, parameters: I, body: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Result<Arc<Self>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let parameters: Vec<String> = parameters.into_iter().map(Into::into).collect();
        for (i, p) in parameters.iter().enumerate() {
            if parameters[..i].contains(p) {
                return Err(Error::DuplicateParameter {
                    function: name,
                    parameter: p.clone(),
                });
            }
        }
        Ok(Arc::new(Self {
            name,
            parameters,
            body: Arc::new(body),
        }))
    }

    /// Fonction primitive à un argument `x`.
    pub fn unary(name: &str, f: fn(f64) -> f64) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parameters: vec!["x".into()],
            body: Arc::new(move |a: &[f64]| f(a.first().copied().unwrap_or(f64::NAN))),
        })
    }

    /// Fonction primitive à deux arguments `x`, `y`.
    pub fn binary(name: &str, f: fn(f64, f64) -> f64) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parameters: vec!["x".into(), "y".into()],
            body: Arc::new(move |a: &[f64]| {
                let x = a.first().copied().unwrap_or(f64::NAN);
                let y = a.get(1).copied().unwrap_or(f64::NAN);
                f(x, y)
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p == name)
    }

    pub fn call(&self, args: &[f64]) -> f64 {
        (self.body)(args)
    }

    pub(crate) fn body(&self) -> Body {
        self.body.clone()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameters.join(", "))
    }
}

/* ------------------------ Functional ------------------------ */

/// Opérateur fonctionnel (Sum, Product, Integral…).
///
/// `body(t)` évalue le Coeur avec l’itérateur lié à `t` pour cette seule
/// évaluation ; l’opérateur décide quels `t` visiter et comment accumuler.
pub trait Functional: Send + Sync {
    fn name(&self) -> &str;

    /// Nombre de liaisons d’itérateur attendues entre crochets.
    fn arity(&self) -> usize {
        1
    }

    fn apply(&self, lower: f64, upper: f64, config: &Config, body: &mut dyn FnMut(f64) -> f64) -> f64;
}

/* ------------------------ Resolver ------------------------ */

/// Résolution des noms inconnus pendant le parsing (synchrone).
/// Chaque méthode retourne None pour « pas réclamé ».
pub trait Resolver {
    fn resolve_variable(&self, _name: &str) -> Option<Arc<Variable>> {
        None
    }

    fn resolve_constant(&self, _name: &str) -> Option<f64> {
        None
    }

    fn resolve_function(&self, _name: &str, _arity: usize) -> Option<Arc<Function>> {
        None
    }

    fn resolve_functional(&self, _name: &str, _arity: usize) -> Option<Arc<dyn Functional>> {
        None
    }
}

/// Clé (nom normalisé, arité).
fn cle(name: &str, arity: usize) -> (String, usize) {
    (name.to_lowercase(), arity)
}

/* ------------------------ Tables ------------------------ */

#[derive(Clone, Default)]
pub struct Variables(IndexMap<String, Arc<Variable>>);

impl Variables {
    pub fn get(&self, name: &str) -> Option<&Arc<Variable>> {
        self.0.get(name)
    }

    /// Insère (ou remplace) ; retourne l’ancienne cellule.
    pub fn insert(&mut self, variable: Arc<Variable>) -> Option<Arc<Variable>> {
        self.0.insert(variable.name().to_string(), variable)
    }

    /// Cellule existante ou nouvelle variable libre (valeur 0).
    pub fn get_or_create(&mut self, name: &str) -> Arc<Variable> {
        self.0
            .entry(name.to_string())
            .or_insert_with(|| Variable::mutable(name, 0.0))
            .clone()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Variable>> {
        self.0.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Variable>> {
        self.0.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Resolver for Variables {
    fn resolve_variable(&self, name: &str) -> Option<Arc<Variable>> {
        self.get(name).cloned()
    }
}

impl fmt::Debug for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.values()).finish()
    }
}

#[derive(Clone, Default)]
pub struct Constants(IndexMap<String, Arc<Variable>>);

impl Constants {
    /// pi, π, tau, e, phi.
    pub fn standard() -> Self {
        let mut c = Self::default();
        c.insert("pi", std::f64::consts::PI);
        c.insert("π", std::f64::consts::PI);
        c.insert("tau", std::f64::consts::TAU);
        c.insert("e", std::f64::consts::E);
        c.insert("phi", (1.0 + 5f64.sqrt()) / 2.0);
        c
    }

    pub fn insert(&mut self, name: &str, value: f64) -> Arc<Variable> {
        let v = Variable::constant(name, value);
        self.0.insert(name.to_string(), v.clone());
        v
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Variable>> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Variable>> {
        self.0.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Variable>> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Constants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.values()).finish()
    }
}

#[derive(Clone, Default)]
pub struct Functions(IndexMap<(String, usize), Arc<Function>>);

impl Functions {
    pub fn insert(&mut self, function: Arc<Function>) -> Option<Arc<Function>> {
        self.0.insert(cle(function.name(), function.arity()), function)
    }

    pub fn get(&self, name: &str, arity: usize) -> Option<&Arc<Function>> {
        self.0.get(&cle(name, arity))
    }

    /// Une fonction de ce nom existe-t-elle (toutes arités) ?
    pub fn has_name(&self, name: &str) -> bool {
        let n = name.to_lowercase();
        self.0.keys().any(|(k, _)| *k == n)
    }

    pub fn remove(&mut self, name: &str, arity: usize) -> Option<Arc<Function>> {
        self.0.shift_remove(&cle(name, arity))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Function>> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Resolver for Functions {
    fn resolve_function(&self, name: &str, arity: usize) -> Option<Arc<Function>> {
        self.get(name, arity).cloned()
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.values()).finish()
    }
}

#[derive(Clone, Default)]
pub struct Functionals(IndexMap<(String, usize), Arc<dyn Functional>>);

impl Functionals {
    pub fn insert(&mut self, functional: Arc<dyn Functional>) -> Option<Arc<dyn Functional>> {
        self.0
            .insert(cle(functional.name(), functional.arity()), functional)
    }

    /// Même opérateur sous un autre nom (Int pour Integral…).
    pub fn alias(&mut self, alias: &str, functional: Arc<dyn Functional>) {
        self.0.insert(cle(alias, functional.arity()), functional);
    }

    pub fn get(&self, name: &str, arity: usize) -> Option<&Arc<dyn Functional>> {
        self.0.get(&cle(name, arity))
    }

    pub fn remove(&mut self, name: &str, arity: usize) -> Option<Arc<dyn Functional>> {
        self.0.shift_remove(&cle(name, arity))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Resolver for Functionals {
    fn resolve_functional(&self, name: &str, arity: usize) -> Option<Arc<dyn Functional>> {
        self.get(name, arity).cloned()
    }
}

impl fmt::Debug for Functionals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}

/// Les quatre tables d’une expression.
#[derive(Clone, Debug, Default)]
pub struct SymbolTables {
    pub variables: Variables,
    pub constants: Constants,
    pub functions: Functions,
    pub functionals: Functionals,
}

impl SymbolTables {
    /// Constantes usuelles + bibliothèque numérique + Sum / Product / Integral.
    pub fn standard() -> Self {
        let mut t = Self {
            constants: Constants::standard(),
            ..Self::default()
        };
        super::numerique::register(&mut t.functions);
        super::fonctionnelles::register(&mut t.functionals);
        t
    }
}
