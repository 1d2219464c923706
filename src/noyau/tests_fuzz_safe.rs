//! Tests fuzz safe : robustesse + déterminisme + limites contrôlées.
//!
//! But : marteler parseur, évaluateurs et chirurgie de l’arbre sans brûler la machine.
//! - RNG déterministe (seed fixe)
//! - profondeur bornée
//! - budget temps global
//! - invariants : interprétation == exécutable compilé, réimpression stable,
//!   swap involutif, remove préserve l’ordre infixe, pliage sans effet sur la valeur,
//!   imbrication excessive refusée (TooDeep) au lieu d’un débordement de pile

use std::time::{Duration, Instant};

use super::arbre::{NodeId, Order, Side};
use super::config::PROFONDEUR_MAX;
use super::erreur::Error;
use super::eval::valeurs_accord;
use super::expression::Expression;

/* ------------------------ RNG déterministe minimal ------------------------ */

#[derive(Clone)]
struct Rng {
    state: u64,
}
impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }
    fn next_u32(&mut self) -> u32 {
        // LCG simple (déterministe)
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }
    fn pick(&mut self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.next_u32() % n
        }
    }
    fn coin(&mut self) -> bool {
        (self.next_u32() & 1) == 1
    }
    fn valeur(&mut self) -> f64 {
        f64::from(self.pick(2001)) / 100.0 - 10.0
    }
    fn un_de<'a>(&mut self, choix: &[&'a str]) -> &'a str {
        choix[self.pick(choix.len() as u32) as usize]
    }
}

/* ------------------------ Budget anti-gel ------------------------ */

fn budget(start: Instant, max: Duration) {
    if start.elapsed() > max {
        panic!("budget temps dépassé: {:?}", max);
    }
}

/* ------------------------ Générateurs ------------------------ */

const BINAIRES: [&str; 14] = [
    "+", "-", "*", "/", "^", "<", ">", "=", "!=", "<=", ">=", "&", "|", "+",
];

fn gen_atom(rng: &mut Rng) -> String {
    match rng.pick(7) {
        0 => format!("{}", rng.pick(10)),
        1 => format!("{}.{}", rng.pick(10), rng.pick(10)),
        2 => "x".to_string(),
        3 => "y".to_string(),
        4 => format!("{}x", rng.pick(9) + 1),
        5 => "pi".to_string(),
        _ => rng.un_de(&["e", "x", "y"]).to_string(),
    }
}

/// Expression syntaxiquement valide ; `fonctionnelles` autorise Sum / Product.
fn gen_expr(rng: &mut Rng, depth: usize, fonctionnelles: bool) -> String {
    if depth == 0 {
        return gen_atom(rng);
    }
    let d = depth - 1;

    match rng.pick(12) {
        0 | 1 => gen_atom(rng),
        2..=4 => {
            let op = rng.un_de(&BINAIRES);
            format!("{}{op}{}", gen_expr(rng, d, fonctionnelles), gen_expr(rng, d, fonctionnelles))
        }
        5 => format!("({})", gen_expr(rng, d, fonctionnelles)),
        6 => format!("-{}", gen_expr(rng, d, fonctionnelles)),
        7 => format!("!{}", gen_expr(rng, d, fonctionnelles)),
        8 => format!(
            "({}?{}:{})",
            gen_expr(rng, d, fonctionnelles),
            gen_expr(rng, d, fonctionnelles),
            gen_expr(rng, d, fonctionnelles)
        ),
        9 => {
            let f = rng.un_de(&["sqrt", "abs", "sin", "cos", "exp", "floor"]);
            format!("{f}({})", gen_expr(rng, d, fonctionnelles))
        }
        10 => {
            let f = rng.un_de(&["max", "min", "atan2", "hypot"]);
            if rng.coin() {
                format!("{f}({}, {})", gen_expr(rng, d, fonctionnelles), gen_expr(rng, d, fonctionnelles))
            } else {
                format!("{f}(y: {}, x: {})", gen_expr(rng, d, fonctionnelles), gen_expr(rng, d, fonctionnelles))
            }
        }
        _ if fonctionnelles => {
            let f = rng.un_de(&["Sum", "Product"]);
            let haut = rng.pick(4);
            format!("{f}[i=0..{haut}]{{{}*i+1}}", gen_expr(rng, d.min(2), false))
        }
        _ => format!("({})^2", gen_expr(rng, d, fonctionnelles)),
    }
}

/// Suite de morceaux au hasard : le parseur doit répondre (Ok ou Err) sans paniquer.
fn gen_bruit(rng: &mut Rng) -> String {
    const MORCEAUX: [&str; 26] = [
        "1", "2", "0.5", "x", "y", "+", "-", "*", "/", "^", "<", ">", "=", "!", "&", "|", "?", ":", "..", "(",
        ")", "max(", ",", "sqrt(", " ", "[",
    ];
    let n = rng.pick(14) + 1;
    (0..n).map(|_| rng.un_de(&MORCEAUX)).collect()
}

/// Imbrication de profondeur `n` selon un motif ; renvoie le texte et sa valeur.
fn gen_profond(motif: u32, n: usize) -> (String, f64) {
    match motif {
        0 => (format!("{}1{}", "(".repeat(n), ")".repeat(n)), 1.0),
        1 => (format!("{}1", "1+".repeat(n)), (n + 1) as f64),
        2 => {
            let signe = if n % 2 == 0 { 2.0 } else { -2.0 };
            (format!("{}2", "-".repeat(n)), signe)
        }
        3 => (format!("{}7", "0?0:".repeat(n)), 7.0),
        _ => (format!("{}1{}", "abs(".repeat(n), ")".repeat(n)), 1.0),
    }
}

/* ------------------------ Helpers ------------------------ */

fn lie(e: &Expression, x: f64, y: f64) {
    for (nom, v) in [("x", x), ("y", y)] {
        if e.variables().get(nom).is_some() {
            e.set(nom, v).unwrap();
        }
    }
}

fn accord(e: &Expression) -> (f64, f64) {
    let i = e.compute();
    let c = e.compile().call();
    assert!(valeurs_accord(i, c), "désaccord sur {e}: interprété={i} compilé={c}");
    (i, c)
}

fn parse_ok(src: &str) -> Expression {
    Expression::parse(src).unwrap_or_else(|err| panic!("parse {src:?}: {err}"))
}

fn noeuds(e: &Expression) -> Vec<NodeId> {
    e.tree().walk_all(Order::Pre, Side::Left).collect()
}

/* ------------------------ Tests ------------------------ */

#[test]
fn fuzz_safe_interprete_et_compile_s_accordent() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);
    let mut rng = Rng::new(0xC0FFEE_u64);

    for _ in 0..300 {
        budget(t0, max);

        let src = gen_expr(&mut rng, 5, true);
        let e = parse_ok(&src);
        assert!(e.tree().is_consistent(), "arbre incohérent: {src:?}");

        for _ in 0..3 {
            lie(&e, rng.valeur(), rng.valeur());
            accord(&e);
        }
    }
}

#[test]
fn fuzz_safe_reimpression_stable() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);
    let mut rng = Rng::new(0xBADC0DE_u64);

    for _ in 0..250 {
        budget(t0, max);

        let src = gen_expr(&mut rng, 5, true);
        let e1 = parse_ok(&src);
        let s1 = e1.to_string();
        let e2 = parse_ok(&s1);
        let s2 = e2.to_string();
        assert_eq!(s1, s2, "réimpression instable pour {src:?}");

        let (x, y) = (rng.valeur(), rng.valeur());
        lie(&e1, x, y);
        lie(&e2, x, y);
        let (v1, _) = accord(&e1);
        let (v2, _) = accord(&e2);
        assert!(valeurs_accord(v1, v2), "{src:?} -> {s1:?}: {v1} vs {v2}");
    }
}

#[test]
fn fuzz_safe_bruit_sans_panique() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);
    let mut rng = Rng::new(0x5EED_u64);

    let mut seen_ok = 0usize;
    let mut seen_err = 0usize;

    for _ in 0..600 {
        budget(t0, max);

        let src = gen_bruit(&mut rng);
        match Expression::parse(&src) {
            Ok(e) => {
                assert!(e.tree().is_consistent(), "arbre incohérent: {src:?}");
                lie(&e, rng.valeur(), rng.valeur());
                accord(&e);

                // tout ce qui s’imprime se relit
                let s1 = e.to_string();
                let s2 = parse_ok(&s1).to_string();
                assert_eq!(s1, s2, "réimpression instable pour {src:?}");
                seen_ok += 1;
            }
            Err(err) => {
                assert!(!err.to_string().is_empty());
                seen_err += 1;
            }
        }
    }

    // On veut voir un mix des deux, sinon le fuzz ne “balaye” rien.
    assert!(seen_ok > 10, "trop peu de succès: {seen_ok}");
    assert!(seen_err > 10, "trop peu d’erreurs: {seen_err}");
}

#[test]
fn fuzz_safe_swap_involutif() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);
    let mut rng = Rng::new(0xABCDEF_u64);

    for _ in 0..200 {
        budget(t0, max);

        let src = gen_expr(&mut rng, 4, false);
        let mut e = parse_ok(&src);
        lie(&e, rng.valeur(), rng.valeur());
        let avant = e.to_string();
        let v_avant = e.compute();

        let ids = noeuds(&e);
        for _ in 0..4 {
            let a = ids[rng.pick(ids.len() as u32) as usize];
            let b = ids[rng.pick(ids.len() as u32) as usize];

            e.swap(a, b).unwrap();
            assert!(e.tree().is_consistent(), "swap({a:?}, {b:?}) incohérent sur {src:?}");
            assert_eq!(e.tree().len(), ids.len());
            // arbre déformé : les deux évaluateurs restent d’accord
            accord(&e);

            e.swap(a, b).unwrap();
            assert_eq!(e.to_string(), avant, "swap non involutif sur {src:?}");
        }
        assert!(valeurs_accord(e.compute(), v_avant));
    }
}

#[test]
fn fuzz_safe_remove_preserve_ordre_infixe() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);
    let mut rng = Rng::new(0xFACADE_u64);

    for _ in 0..150 {
        budget(t0, max);

        let src = gen_expr(&mut rng, 4, false);
        let mut e = parse_ok(&src);
        lie(&e, rng.valeur(), rng.valeur());

        while !e.tree().is_empty() {
            let infixe: Vec<NodeId> = e.tree().walk_all(Order::In, Side::Left).collect();
            let cible = infixe[rng.pick(infixe.len() as u32) as usize];

            e.remove(cible).unwrap();

            let attendu: Vec<NodeId> = infixe.iter().copied().filter(|&n| n != cible).collect();
            let apres: Vec<NodeId> = e.tree().walk_all(Order::In, Side::Left).collect();
            assert_eq!(apres, attendu, "ordre infixe perdu sur {src:?}");
            assert!(e.tree().is_consistent());
            assert!(!e.tree().contains(cible));
            accord(&e);
        }
        assert!(e.compute().is_nan(), "arbre vide => NaN");
    }
}

#[test]
fn fuzz_safe_pliage_conserve_la_valeur() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);
    let mut rng = Rng::new(0x0DDBA11_u64);

    for _ in 0..250 {
        budget(t0, max);

        let src = gen_expr(&mut rng, 5, true);
        let mut e = parse_ok(&src);
        lie(&e, rng.valeur(), rng.valeur());
        let (avant, _) = accord(&e);
        let taille = e.tree().len();

        let plies = e.fold_constants().unwrap();
        assert!(e.tree().is_consistent());
        assert!(e.tree().len() <= taille);
        if plies == 0 {
            assert_eq!(e.tree().len(), taille);
        }

        let (apres, _) = accord(&e);
        assert!(valeurs_accord(avant, apres), "pliage de {src:?} -> {e}: {avant} vs {apres}");

        // un second pliage ne trouve plus rien
        assert_eq!(e.fold_constants().unwrap(), 0, "pliage incomplet: {e}");
    }
}

#[test]
fn fuzz_safe_imbrication_profonde_refusee() {
    let t0 = Instant::now();
    let max = Duration::from_secs(2);
    let mut rng = Rng::new(0xDEE9_u64);

    let trop_profond = |src: &str| {
        let r = Expression::parse(src);
        assert!(
            matches!(r, Err(Error::TooDeep { limit: PROFONDEUR_MAX })),
            "attendu TooDeep pour {}…: {:?}",
            &src[..src.len().min(16)],
            r.map(|e| e.tree().height())
        );
    };

    // extrêmes
    trop_profond(&format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000)));
    trop_profond(&format!("{}1", "1+".repeat(5_000)));
    trop_profond(&format!("{}x", "-".repeat(100_000)));
    trop_profond(&format!("{}0", "x?1:".repeat(3_000)));
    trop_profond(&format!("{}2", "2^".repeat(3_000)));

    for _ in 0..60 {
        budget(t0, max);

        let motif = rng.pick(5);
        if rng.coin() {
            let n = PROFONDEUR_MAX + 1 + rng.pick(4_000) as usize;
            let (src, _) = gen_profond(motif, n);
            trop_profond(&src);
        } else {
            // sous la limite : l’arbre se construit et s’évalue
            let n = 1 + rng.pick(120) as usize;
            let (src, attendu) = gen_profond(motif, n);
            let e = parse_ok(&src);
            assert!(e.tree().height() <= PROFONDEUR_MAX);
            let (i, _) = accord(&e);
            assert_eq!(i, attendu, "motif {motif}, n = {n}");
        }
    }
}
