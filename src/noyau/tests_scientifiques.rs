//! Tests scientifiques (campagne) : propriétés du moteur, valeurs de référence, erreurs attendues.
//!
//! Chaque valeur est vérifiée sur les DEUX chemins (interprété, compilé).
//! Budget temps global sur les campagnes un peu lourdes (fonctionnelles).

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::Config;
use super::erreur::Error;
use super::expression::Expression;
use super::parseur::Parser;
use super::symboles::{Function, Resolver};
use super::variable::Variable;

const TOL: f64 = 1e-9;

fn parse_ok(expr: &str) -> Expression {
    Expression::parse(expr).unwrap_or_else(|e| panic!("expr={expr:?} err={e}"))
}

fn proche(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b || (a - b).abs() < TOL
}

/// Valeur attendue, interprétée ET compilée.
fn assert_val_expr(e: &Expression, attendu: f64) {
    let i = e.compute();
    let c = e.compile().call();
    assert!(proche(i, attendu), "expr={:?} interprété={i} attendu={attendu}", e.source());
    assert!(proche(c, attendu), "expr={:?} compilé={c} attendu={attendu}", e.source());
}

fn assert_val(expr: &str, attendu: f64) {
    assert_val_expr(&parse_ok(expr), attendu);
}

fn assert_imprime(expr: &str, attendu: &str) {
    assert_eq!(parse_ok(expr).to_string(), attendu, "expr={expr:?}");
}

fn erreur(expr: &str) -> Error {
    match Expression::parse(expr) {
        Ok(e) => panic!("expr={expr:?} aurait dû échouer, arbre={e}"),
        Err(err) => err,
    }
}

fn budget(start: Instant, max: Duration) {
    if start.elapsed() > max {
        panic!("budget temps dépassé: {:?}", max);
    }
}

/* ------------------------ Priorités ------------------------ */

#[test]
fn sci_priorites_de_reference() {
    assert_val("2+2*2", 6.0);
    assert_val("(2+2)*2", 8.0);
    assert_val("2^2*3", 12.0);
    assert_val("2^(2*5)", 1024.0);
    assert_val("(-4-4*-2)^(2^-1)", 2.0);
}

#[test]
fn sci_associativite_et_unaires() {
    assert_val("10-4-3", 3.0);
    assert_val("100/10/5", 2.0);
    // même priorité : gauche d’abord, y compris pour ^
    assert_val("2^3^2", 64.0);
    assert_val("-2^2", -4.0);
    assert_val("2*-3", -6.0);
    assert_val("--3", 3.0);
    assert_val("+3", 3.0);
    assert_val("2^-1*4", 2.0);
}

#[test]
fn sci_multiplication_implicite() {
    let e = parse_ok("2x^2 + 3(x+1)");
    e.set("x", 2.0).unwrap();
    assert_val_expr(&e, 17.0);

    assert_val("(1+1)(2+1)", 6.0);
    assert_val("2pi", std::f64::consts::TAU);
}

/* ------------------------ Logique + ternaire ------------------------ */

#[test]
fn sci_comparaisons_et_logique() {
    assert_val("4=2", 0.0);
    assert_val("4≠2", 1.0);
    assert_val("4!=2", 1.0);
    assert_val("4>2", 1.0);
    assert_val("4>=4", 1.0);
    assert_val("4≥5", 0.0);
    assert_val("2<=1", 0.0);
    assert_val("1 & 0", 0.0);
    assert_val("0 | 3", 1.0);
    assert_val("1 && 2 || 0", 1.0);
    assert_val("!0", 1.0);
    assert_val("!(2>1)", 0.0);
    // NaN est faux
    assert_val("(0/0) | 0", 0.0);
}

#[test]
fn sci_egalite_tolerante() {
    assert_val("0.1+0.2=0.3", 1.0);

    let exact = Parser::new()
        .with_config(Config::default().with_epsilon(0.0))
        .parse("0.1+0.2=0.3")
        .unwrap();
    // 0.1 + 0.2 != 0.3 en binaire
    assert_val_expr(&exact, 0.0);
}

#[test]
fn sci_ternaire_de_reference() {
    let e = parse_ok("(x>3)?7:-8");
    e.set("x", 4.0).unwrap();
    assert_val_expr(&e, 7.0);
    e.set("x", 0.0).unwrap();
    assert_val_expr(&e, -8.0);

    let e = parse_ok("-1<x & x<1 ? 5:0");
    e.set("x", 0.0).unwrap();
    assert_val_expr(&e, 5.0);
    e.set("x", 2.0).unwrap();
    assert_val_expr(&e, 0.0);
    e.set("x", -1.0).unwrap();
    assert_val_expr(&e, 0.0);
}

#[test]
fn sci_ternaires_imbriques() {
    let e = parse_ok("x>0 ? 1 : x<0 ? -1 : 0");
    for (x, attendu) in [(5.0, 1.0), (-3.0, -1.0), (0.0, 0.0)] {
        e.set("x", x).unwrap();
        assert_val_expr(&e, attendu);
    }

    // branche « alors » elle-même ternaire
    let e = parse_ok("a ? b ? 1 : 2 : 3");
    for (a, b, attendu) in [(1.0, 1.0, 1.0), (1.0, 0.0, 2.0), (0.0, 1.0, 3.0)] {
        e.compute_named(&[("a", a), ("b", b)]).unwrap();
        assert_val_expr(&e, attendu);
    }

    // sans « sinon » : 0
    assert_val("0?5", 0.0);
    assert_val("1?5", 5.0);
}

#[test]
fn sci_logique_paresseuse() {
    // la droite n’est pas évaluée quand la gauche décide
    let lectures = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let compteur = lectures.clone();

    struct Espion(Arc<Variable>);
    impl Resolver for Espion {
        fn resolve_variable(&self, name: &str) -> Option<Arc<Variable>> {
            (name == "espion").then(|| self.0.clone())
        }
    }

    let espion = Variable::computed("espion", move || {
        compteur.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        1.0
    });
    let e = Parser::new().with_resolver(Espion(espion)).parse("0 & espion | 1 | espion").unwrap();

    assert_eq!(e.compute(), 1.0);
    assert_eq!(e.compile().call(), 1.0);
    assert_eq!(lectures.load(std::sync::atomic::Ordering::Relaxed), 0);
}

/* ------------------------ Variables ------------------------ */

#[test]
fn sci_variables_partagees() {
    let e = parse_ok("x*x + x");
    assert_eq!(e.variables().len(), 1);

    e.set("x", 3.0).unwrap();
    assert_eq!(e.compute(), 12.0);

    // l’exécutable lit les mêmes cellules : pas de recompilation
    let c = e.compile();
    assert_eq!(c.call(), 12.0);
    e.set("x", 4.0).unwrap();
    assert_eq!(c.call(), 20.0);
    assert_eq!(e.compute(), 20.0);

    assert_eq!(e.compute_with(&[2.0]), 6.0);
    assert_eq!(c.call_with(&[1.0]), 2.0);
    assert_eq!(e.compute_named(&[("x", 5.0)]).unwrap(), 30.0);
}

#[test]
fn sci_positionnel_dans_l_ordre_d_apparition() {
    let e = parse_ok("a - 2b + c/4");
    let noms: Vec<&str> = e.variables().names().collect();
    assert_eq!(noms, ["a", "b", "c"]);
    assert_val_expr(&e, 0.0);
    assert_eq!(e.compute_with(&[10.0, 3.0, 8.0]), 6.0);
    // valeurs manquantes : inchangées
    assert_eq!(e.compute_with(&[0.0]), -4.0);
}

#[test]
fn sci_lecture_seule_et_inconnues() {
    let e = parse_ok("pi*r^2");
    assert_eq!(e.set("pi", 3.0), Err(Error::ReadOnly { name: "pi".into() }));
    assert_eq!(e.set("z", 1.0), Err(Error::UnknownIdentifier { name: "z".into() }));
    e.set("r", 1.0).unwrap();
    assert_val_expr(&e, std::f64::consts::PI);
}

#[test]
fn sci_clone_partage_les_cellules() {
    let e = parse_ok("x + Sum[i=1..3]{i*x}");
    let copie = e.clone();
    e.set("x", 2.0).unwrap();
    assert_eq!(copie.compute(), 14.0);
    assert_eq!(copie.to_string(), e.to_string());
}

/* ------------------------ Résolveurs ------------------------ */

struct Constante(&'static str, f64);

impl Resolver for Constante {
    fn resolve_constant(&self, name: &str) -> Option<f64> {
        (name == self.0).then_some(self.1)
    }
}

/// Coefficients d’un polynôme exposés comme fonctions hôtes a(k) et Length(a).
struct Coefficients(Arc<Vec<f64>>);

impl Resolver for Coefficients {
    fn resolve_function(&self, name: &str, arity: usize) -> Option<Arc<Function>> {
        let c = self.0.clone();
        match (name.to_lowercase().as_str(), arity) {
            ("a", 1) => Function::new("a", ["k"], move |v: &[f64]| {
                let k = v[0];
                if k >= 0.0 && (k as usize) < c.len() {
                    c[k as usize]
                } else {
                    0.0
                }
            })
            .ok(),
            ("length", 1) => Function::new("Length", ["f"], move |_: &[f64]| c.len() as f64 - 1.0).ok(),
            _ => None,
        }
    }
}

#[test]
fn sci_resolveurs_dans_l_ordre() {
    let e = Parser::new()
        .with_resolver(Constante("z", 1.0))
        .with_resolver(Constante("z", 2.0))
        .parse("z + 10")
        .unwrap();
    assert_val_expr(&e, 11.0);
    assert!(e.constants().get("z").is_some());
    assert!(e.variables().is_empty());
}

#[test]
fn sci_variable_calculee() {
    struct Horloge;
    impl Resolver for Horloge {
        fn resolve_variable(&self, name: &str) -> Option<Arc<Variable>> {
            (name == "t").then(|| Variable::computed("t", || 42.0))
        }
    }

    let e = Parser::new().with_resolver(Horloge).parse("t + 1").unwrap();
    assert_val_expr(&e, 43.0);
    assert!(matches!(e.set("t", 0.0), Err(Error::ReadOnly { .. })));
    // positionnel : seules les variables mutables comptent
    assert_eq!(e.compute_with(&[7.0]), 43.0);
}

#[test]
fn sci_mode_strict() {
    let strict = Parser::new().with_config(Config::strict());
    assert_eq!(
        strict.parse("x + 1").unwrap_err(),
        Error::UnknownIdentifier { name: "x".into() }
    );
    assert!(strict.parse("pi + 1").is_ok());
}

/* ------------------------ Fonctions ------------------------ */

#[test]
fn sci_bibliotheque_numerique() {
    assert_val("sqrt(16) + abs(-2)", 6.0);
    assert_val("max(2, 7) - min(2, 7)", 5.0);
    assert_val("log(8, 2)", 3.0);
    assert_val("fact(5)", 120.0);
    assert_val("binom(5, 2)", 10.0);
    assert_val("mod(-1, 3)", 2.0);
    assert_val("sin(pi/2)", 1.0);
    assert_val("SIN(0)", 0.0);
}

#[test]
fn sci_arguments_nommes() {
    let mut p = Parser::new();
    p.tables_mut()
        .functions
        .insert(Function::new("diff", ["x", "y"], |v: &[f64]| v[0] - v[1]).unwrap());

    let e = p.parse("diff(y: 2, x: 10)").unwrap();
    assert_val_expr(&e, 8.0);
    assert_eq!(e.to_string(), "diff(x:10, y:2)");

    let e = p.parse("diff(y: 2, 10)").unwrap();
    assert_val_expr(&e, 8.0);

    assert_eq!(
        p.parse("diff(z: 1, 2)").unwrap_err(),
        Error::UnknownParameter {
            function: "diff".into(),
            parameter: "z".into()
        }
    );
    assert!(matches!(
        p.parse("diff(x: 1, x: 2)"),
        Err(Error::DuplicateArgument { .. })
    ));
}

#[test]
fn sci_valeur_collee_a_une_parenthese() {
    let e = parse_ok("k + k(2)");
    e.set("k", 3.0).unwrap();
    assert_val_expr(&e, 9.0);
    assert_eq!(e.to_string(), "k+k*(2)");
}

/* ------------------------ Fonctionnelles ------------------------ */

#[test]
fn sci_somme_polynome_avec_fonction_hote() {
    // (coefficients, valeur attendue en x = 2)
    let cas: [(Vec<f64>, f64); 4] = [
        (vec![], -24.0),
        (vec![5.0], -19.0),
        (vec![-1.0, 0.5], -24.0),
        (vec![1.0, 2.0, 3.0, 4.0], 25.0),
    ];

    for (coefficients, en_deux) in cas {
        let coefficients = Arc::new(coefficients);
        let e = Parser::new()
            .with_resolver(Coefficients(coefficients.clone()))
            .parse("2x^4-7x^3+Sum[i=0..Length(a)]{a(i)*x^i}")
            .unwrap();

        for x in [-2.0, -0.5, 0.0, 1.0, 2.0, 3.5] {
            let mut attendu = 2.0 * f64::powi(x, 4) - 7.0 * f64::powi(x, 3);
            for (k, c) in coefficients.iter().enumerate() {
                attendu += c * f64::powi(x, k as i32);
            }
            e.set("x", x).unwrap();
            assert_val_expr(&e, attendu);
        }

        e.set("x", 2.0).unwrap();
        assert_val_expr(&e, en_deux);
    }
}

#[test]
fn sci_fonctionnelles_livrees() {
    let start = Instant::now();

    assert_val("Product[k=1..5]{k}", 120.0);
    assert_val("Sum[i=1..0]{i}", 0.0);
    assert_val("Product[i=1..0]{i}", 1.0);
    assert_val("Σ[i=1..4]{i^2}", 30.0);
    assert_val("Π[i=1..3]{2}", 8.0);
    assert_val("Sum[i=0.6..2.4]{i}", 3.0);
    assert_val("Sum[i=1..3]{Sum[j=1..i]{j}}", 10.0);
    budget(start, Duration::from_secs(2));

    assert_val("Integral[t=0..1]{t^2}", 1.0 / 3.0);
    assert_val("∫[t=0..pi]{sin(t)}", 2.0);
    assert_val("Int[t=1..0]{2t}", -1.0);
    budget(start, Duration::from_secs(5));
}

#[test]
fn sci_iterateur_masque_et_prive() {
    let e = parse_ok("i + Sum[i=1..3]{i}");
    assert_eq!(e.variables().len(), 1);
    e.set("i", 10.0).unwrap();
    assert_val_expr(&e, 16.0);
    // la cellule externe n’a pas bougé
    assert_eq!(e.variable("i").map(|v| v.value()), Some(10.0));

    let e = parse_ok("Sum[k=1..n]{k}");
    e.set("n", 100.0).unwrap();
    assert_val_expr(&e, 5050.0);

    assert_val("Sum[i=0..3] {i}", 6.0);
    assert_val("Product[i=1..4]\n{i}", 24.0);
}

#[test]
fn sci_fonctionnelle_sur_plusieurs_threads() {
    let start = Instant::now();
    let e = parse_ok("Sum[i=1..2000]{i}");
    let c = e.compile();

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..200 {
                    assert_eq!(c.call(), 2_001_000.0);
                    assert_eq!(e.compute(), 2_001_000.0);
                }
            });
        }
    });

    // imbriquées, itérateurs distincts puis homonymes
    let e = parse_ok("Sum[i=1..20]{Sum[j=1..i]{j}} + Sum[i=1..3]{Product[i=1..i]{i}}");
    let c = e.compile();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..100 {
                    assert_eq!(c.call(), 1540.0 + 9.0);
                    assert_eq!(e.compute(), 1540.0 + 9.0);
                }
            });
        }
    });
    budget(start, Duration::from_secs(20));
}

/* ------------------------ Réimpression ------------------------ */

#[test]
fn sci_reimpression() {
    assert_imprime("2+2*2", "2+2*2");
    assert_imprime("(2+2)*2", "(2+2)*2");
    assert_imprime("2 x", "2*x");
    assert_imprime("-x^2", "-x^2");
    assert_imprime("x > 0 ? 1 : -1", "x>0?1:-1");
    assert_imprime("4 != 2", "4≠2");
    assert_imprime("Sum[ i = 1 .. n ]{ i }", "Sum[i=1..n]{i}");
    assert_imprime("\"abc\" + 'z'", "\"abc\"+'z'");
}

#[test]
fn sci_reimpression_reparsable() {
    for src in [
        "2x^4-7x^3+Sum[i=0..3]{i*x^i}",
        "(x>3)?7:-8",
        "-1<x & x<1 ? 5:0",
        "a-(b-c)",
        "2^-1*4",
        "!(x=1) | y",
        "max(x, y) / -min(1, 2)",
    ] {
        let e = parse_ok(src);
        let s1 = e.to_string();
        let r = parse_ok(&s1);
        assert_eq!(r.to_string(), s1, "src={src:?}");
        // même liaison des deux côtés (x absent de certaines sources)
        if e.variable("x").is_some() {
            e.set("x", 0.75).unwrap();
            r.set("x", 0.75).unwrap();
        }
        assert!(proche(r.compute(), e.compute()), "src={src:?} s1={s1:?}");
    }
}

/* ------------------------ Pliage ------------------------ */

#[test]
fn sci_pliage_des_constantes() {
    let mut e = parse_ok("2*3+x*(1+1)");
    assert_eq!(e.fold_constants().unwrap(), 3);
    assert_eq!(e.to_string(), "6+x*2");
    assert!(e.tree().is_consistent());

    let mut e = parse_ok("1>0 ? x : y");
    e.fold_constants().unwrap();
    assert_eq!(e.to_string(), "x");

    let mut e = parse_ok("-(3)");
    e.fold_constants().unwrap();
    assert_eq!(e.to_string(), "(-3)");
}

/* ------------------------ Erreurs ------------------------ */

#[test]
fn sci_erreurs_de_construction() {
    assert_eq!(erreur(""), Error::Empty);
    assert_eq!(erreur("   "), Error::Empty);
    assert!(matches!(erreur("2+"), Error::MissingOperand { ref operator, .. } if operator == "+"));
    assert!(matches!(erreur("*3"), Error::MissingOperand { .. }));
    assert!(matches!(erreur("()"), Error::MissingOperand { .. }));
    assert!(matches!(erreur("1:2"), Error::DanglingVariant { position: 1 }));
    assert!(matches!(erreur("(1+2]"), Error::UnexpectedBracket { .. }));
    assert!(matches!(erreur("2 $ 3"), Error::UnexpectedTerm { .. }));
    assert!(matches!(erreur("x!"), Error::UnexpectedTerm { .. }));
    assert_eq!(
        erreur("foo(1)"),
        Error::UnknownFunction {
            name: "foo".into(),
            arity: 1
        }
    );
    assert!(matches!(erreur("sin(1, 2)"), Error::UnknownFunction { arity: 2, .. }));
    assert!(matches!(erreur("Foo[i=0..1]{i}"), Error::UnknownFunctional { .. }));
    assert!(matches!(erreur("Sum[i]{i}"), Error::InvalidFunctional { .. }));
    assert!(matches!(erreur("Sum[i=3]{i}"), Error::InvalidFunctional { .. }));
    assert!(matches!(erreur("Sum[i=0..3]{}"), Error::MissingOperand { .. }));
}

#[test]
fn sci_ieee_sans_erreur() {
    assert_val("1/0", f64::INFINITY);
    assert_val("-1/0", f64::NEG_INFINITY);
    assert_val("0/0", f64::NAN);
    assert_val("sqrt(-1)", f64::NAN);
    assert_val("\"abc\"", f64::NAN);
    assert_val("1..2", f64::NAN);
}
