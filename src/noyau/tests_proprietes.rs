//! Tests de propriétés (proptest) : évaluateurs, réimpression, chirurgie de l’arbre.

use proptest::prelude::*;
use proptest::sample::Index;

use super::arbre::{NodeId, Order, Side};
use super::eval::valeurs_accord;
use super::expression::Expression;

// Feuilles : entiers, variables, juxtapositions "3x"
fn feuille() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..20).prop_map(|n| n.to_string()),
        Just("x".to_string()),
        Just("y".to_string()),
        (1u32..10).prop_map(|n| format!("{n}x")),
    ]
}

// Expressions valides, profondeur bornée
fn expression() -> impl Strategy<Value = String> {
    feuille().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "-", "*", "/", "^", "<", "≥", "=", "&", "|"]),
                inner.clone()
            )
                .prop_map(|(a, op, b)| format!("{a}{op}{b}")),
            inner.clone().prop_map(|a| format!("-{a}")),
            inner.clone().prop_map(|a| format!("!({a})")),
            inner.clone().prop_map(|a| format!("({a})")),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(c, a, b)| format!("({c}?{a}:{b})")),
            (inner.clone(), inner).prop_map(|(a, b)| format!("max({a}, {b})")),
        ]
    })
}

fn valeur() -> impl Strategy<Value = f64> {
    -10.0f64..10.0
}

fn parse(src: &str) -> Expression {
    Expression::parse(src).unwrap_or_else(|e| panic!("parse {src:?}: {e}"))
}

fn lie(e: &Expression, x: f64, y: f64) {
    for (nom, v) in [("x", x), ("y", y)] {
        if e.variables().get(nom).is_some() {
            e.set(nom, v).unwrap();
        }
    }
}

fn infixe(e: &Expression) -> Vec<NodeId> {
    e.tree().walk_all(Order::In, Side::Left).collect()
}

proptest! {
    #[test]
    fn interprete_egal_compile(src in expression(), x in valeur(), y in valeur()) {
        let e = parse(&src);
        lie(&e, x, y);
        let i = e.compute();
        let c = e.compile().call();
        prop_assert!(valeurs_accord(i, c), "{} : {} vs {}", src, i, c);
    }

    #[test]
    fn call_with_suit_l_ordre_de_la_table(src in expression(), x in valeur(), y in valeur()) {
        let e = parse(&src);
        let compiled = e.compile();
        let a = compiled.call_with(&[x, y]);
        let b = e.compute_with(&[x, y]);
        prop_assert!(valeurs_accord(a, b), "{} : {} vs {}", src, a, b);
    }

    #[test]
    fn reimpression_idempotente(src in expression(), x in valeur(), y in valeur()) {
        let e1 = parse(&src);
        let s1 = e1.to_string();
        let e2 = parse(&s1);
        prop_assert_eq!(&s1, &e2.to_string());

        lie(&e1, x, y);
        lie(&e2, x, y);
        let (v1, v2) = (e1.compute(), e2.compute());
        prop_assert!(valeurs_accord(v1, v2), "{} -> {} : {} vs {}", src, s1, v1, v2);
    }

    #[test]
    fn swap_deux_fois_restaure(src in expression(), i in any::<Index>(), j in any::<Index>()) {
        let mut e = parse(&src);
        let avant = e.to_string();
        let ids = infixe(&e);
        let (a, b) = (*i.get(&ids), *j.get(&ids));

        e.swap(a, b).unwrap();
        prop_assert!(e.tree().is_consistent());
        e.swap(a, b).unwrap();
        prop_assert!(e.tree().is_consistent());
        prop_assert_eq!(e.to_string(), avant);
        prop_assert_eq!(infixe(&e), ids);
    }

    #[test]
    fn remove_garde_l_ordre_des_survivants(src in expression(), i in any::<Index>()) {
        let mut e = parse(&src);
        let avant = infixe(&e);
        let cible = *i.get(&avant);

        e.remove(cible).unwrap();

        let attendu: Vec<NodeId> = avant.into_iter().filter(|&n| n != cible).collect();
        prop_assert_eq!(infixe(&e), attendu);
        prop_assert!(e.tree().is_consistent());
    }

    #[test]
    fn pliage_sans_effet_sur_la_valeur(src in expression(), x in valeur(), y in valeur()) {
        let mut e = parse(&src);
        lie(&e, x, y);
        let avant = e.compute();
        e.fold_constants().unwrap();
        let apres = e.compute();
        prop_assert!(valeurs_accord(avant, apres), "{} -> {} : {} vs {}", src, e, avant, apres);
    }

    #[test]
    fn clone_partage_les_variables(src in expression(), x in valeur()) {
        let e = parse(&src);
        let copie = e.clone();
        prop_assert_eq!(copie.to_string(), e.to_string());
        if e.variables().get("x").is_some() {
            e.set("x", x).unwrap();
            prop_assert_eq!(copie.variable("x").map(|v| v.value()), Some(x));
        }
    }
}
