// src/noyau/fonctionnelles.rs
//
// Opérateurs fonctionnels livrés : Sum (Σ), Product (Π), Integral (∫).
// Syntaxe : Nom[i = a..b]{coeur}

use std::sync::Arc;

use super::config::Config;
use super::numerique::quadrature;
use super::symboles::{Functional, Functionals};

pub fn register(t: &mut Functionals) {
    let somme: Arc<dyn Functional> = Arc::new(Summation);
    let produit: Arc<dyn Functional> = Arc::new(Product);
    let integrale: Arc<dyn Functional> = Arc::new(Integral);

    t.insert(somme.clone());
    t.alias("Σ", somme);
    t.insert(produit.clone());
    t.alias("Π", produit);
    t.insert(integrale.clone());
    t.alias("Int", integrale.clone());
    t.alias("∫", integrale);
}

/// Pas de 1 de round(a) à round(b) inclus ; vide (a > b ou NaN) => neutre.
/// Borne infinie (ou au-delà de 2^53, où t + 1 == t) => NaN.
fn pas_entiers(lower: f64, upper: f64, neutre: f64, body: &mut dyn FnMut(f64) -> f64, acc: fn(f64, f64) -> f64) -> f64 {
    let (debut, fin) = (lower.round(), upper.round());
    if debut.is_nan() || fin.is_nan() || debut > fin {
        return neutre;
    }
    if debut + 1.0 == debut || fin + 1.0 == fin {
        return f64::NAN;
    }
    let mut total = neutre;
    let mut t = debut;
    while t <= fin {
        total = acc(total, body(t));
        t += 1.0;
    }
    total
}

#[derive(Debug, Clone, Copy)]
pub struct Summation;

impl Functional for Summation {
    fn name(&self) -> &str {
        "Sum"
    }

    fn apply(&self, lower: f64, upper: f64, _config: &Config, body: &mut dyn FnMut(f64) -> f64) -> f64 {
        pas_entiers(lower, upper, 0.0, body, |a, b| a + b)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Product;

impl Functional for Product {
    fn name(&self) -> &str {
        "Product"
    }

    fn apply(&self, lower: f64, upper: f64, _config: &Config, body: &mut dyn FnMut(f64) -> f64) -> f64 {
        pas_entiers(lower, upper, 1.0, body, |a, b| a * b)
    }
}

/// Quadrature adaptative G7K15 (tolérance et profondeur : Config).
#[derive(Debug, Clone, Copy)]
pub struct Integral;

impl Functional for Integral {
    fn name(&self) -> &str {
        "Integral"
    }

    fn apply(&self, lower: f64, upper: f64, config: &Config, body: &mut dyn FnMut(f64) -> f64) -> f64 {
        quadrature(body, lower, upper, config.integral_tolerance, config.integral_depth)
    }
}
