// src/noyau/numerique.rs
//
// Bibliothèque numérique primitive : feuilles opaques appelées par les noeuds Fonction
// et par la fonctionnelle Integral. Aucune participation au parsing.
//
// - factorielle / binomial : calcul exact (BigInt) puis conversion f64 ;
// - quadrature : Gauss-Kronrod G7K15 adaptative (bissection).

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive};

use super::symboles::{Function, Functions};

/// Au-delà, n! dépasse f64 de toute façon.
const FACTORIELLE_MAX: u64 = 170;
/// Au-delà (pour k ≤ n/2), C(n, k) dépasse f64.
const BINOMIAL_K_MAX: u64 = 1024;

/// Enregistre les primitives dans une table de fonctions.
pub fn register(t: &mut Functions) {
    let unaires: [(&str, fn(f64) -> f64); 24] = [
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("asin", f64::asin),
        ("acos", f64::acos),
        ("atan", f64::atan),
        ("sinh", f64::sinh),
        ("cosh", f64::cosh),
        ("tanh", f64::tanh),
        ("sqrt", f64::sqrt),
        ("cbrt", f64::cbrt),
        ("exp", f64::exp),
        ("ln", f64::ln),
        ("log", f64::ln),
        ("log10", f64::log10),
        ("log2", f64::log2),
        ("abs", f64::abs),
        ("sign", signe),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("round", f64::round),
        ("trunc", f64::trunc),
        ("frac", f64::fract),
        ("fact", factorielle),
    ];
    for (name, f) in unaires {
        t.insert(Function::unary(name, f));
    }

    let binaires: [(&str, fn(f64, f64) -> f64); 11] = [
        ("atan2", f64::atan2),
        ("log", |x, b| x.ln() / b.ln()),
        ("pow", f64::powf),
        ("min", f64::min),
        ("max", f64::max),
        ("mod", modulo),
        ("hypot", f64::hypot),
        ("binom", binomial),
        ("gcd", pgcd),
        ("lcm", ppcm),
        ("root", racine_n),
    ];
    for (name, f) in binaires {
        t.insert(Function::binary(name, f));
    }
}

/* ------------------------ Primitives ------------------------ */

/// -1, 0, 1 (0 pour ±0, NaN propagé).
pub fn signe(x: f64) -> f64 {
    if x.is_nan() {
        f64::NAN
    } else if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Reste euclidien (toujours du signe du diviseur).
pub fn modulo(a: f64, m: f64) -> f64 {
    let r = a % m;
    if r != 0.0 && (r < 0.0) != (m < 0.0) {
        r + m
    } else {
        r
    }
}

/// Racine n-ième réelle (impaire : définie pour x < 0).
pub fn racine_n(x: f64, n: f64) -> f64 {
    if x < 0.0 && n.fract() == 0.0 && (n as i64) % 2 != 0 {
        -(-x).powf(1.0 / n)
    } else {
        x.powf(1.0 / n)
    }
}

/// Entier naturel exact, sinon None.
fn naturel(x: f64) -> Option<u64> {
    if x.is_finite() && x >= 0.0 && x.fract() == 0.0 && x <= u64::MAX as f64 {
        Some(x as u64)
    } else {
        None
    }
}

fn factorielle_exacte(n: u64) -> BigInt {
    let mut acc = BigInt::one();
    for k in 2..=n {
        acc *= k;
    }
    acc
}

/// n! (NaN hors des naturels ; +inf au-delà de 170).
pub fn factorielle(x: f64) -> f64 {
    match naturel(x) {
        Some(n) if n > FACTORIELLE_MAX => f64::INFINITY,
        Some(n) => factorielle_exacte(n).to_f64().unwrap_or(f64::INFINITY),
        None => f64::NAN,
    }
}

/// C(n, k) exact (0 si k > n ; NaN hors des naturels).
pub fn binomial(n: f64, k: f64) -> f64 {
    let (Some(n), Some(k)) = (naturel(n), naturel(k)) else {
        return f64::NAN;
    };
    if k > n {
        return 0.0;
    }
    // C(n, k) ≥ 2^k dès que k ≤ n/2 : au-delà de 1024, le résultat déborde
    let k = k.min(n - k);
    if k > BINOMIAL_K_MAX {
        return f64::INFINITY;
    }
    let mut num = BigInt::one();
    let mut den = BigInt::one();
    for i in 0..k {
        num *= n - i;
        den *= i + 1;
    }
    (num / den).to_f64().unwrap_or(f64::INFINITY)
}

/// PGCD sur des entiers (NaN sinon).
pub fn pgcd(a: f64, b: f64) -> f64 {
    let (Some(mut a), Some(mut b)) = (naturel(a.abs()), naturel(b.abs())) else {
        return f64::NAN;
    };
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a as f64
}

pub fn ppcm(a: f64, b: f64) -> f64 {
    let g = pgcd(a, b);
    if g.is_nan() {
        return f64::NAN;
    }
    if g == 0.0 {
        return 0.0;
    }
    (a / g * b).abs()
}

/* ------------------------ Quadrature G7K15 ------------------------ */

/// Noeuds Kronrod positifs (0 compris), ordre croissant.
const KRONROD_NOEUDS: [f64; 8] = [
    0.0,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.586_087_235_467_691_130_294_144_838_258_730,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.991_455_371_120_812_639_206_854_697_526_329,
];

const KRONROD_POIDS: [f64; 8] = [
    0.209_482_141_084_727_828_012_999_174_891_714,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.022_935_322_010_529_224_963_732_008_058_970,
];

/// Poids Gauss (noeuds Kronrod d’indice pair : 0, 2, 4, 6).
const GAUSS_POIDS: [f64; 4] = [
    0.417_959_183_673_469_387_755_102_040_816_327,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.129_484_966_168_869_693_270_611_432_679_082,
];

/// (Kronrod, |Kronrod - Gauss|) sur [a, b].
fn g7k15(f: &mut dyn FnMut(f64) -> f64, a: f64, b: f64) -> (f64, f64) {
    let centre = 0.5 * (a + b);
    let demi = 0.5 * (b - a);

    let f0 = f(centre);
    let mut kronrod = KRONROD_POIDS[0] * f0;
    let mut gauss = GAUSS_POIDS[0] * f0;

    for i in 1..KRONROD_NOEUDS.len() {
        let dx = demi * KRONROD_NOEUDS[i];
        let paire = f(centre - dx) + f(centre + dx);
        kronrod += KRONROD_POIDS[i] * paire;
        if i % 2 == 0 {
            gauss += GAUSS_POIDS[i / 2] * paire;
        }
    }

    (kronrod * demi, ((kronrod - gauss) * demi).abs())
}

/// ∫_a^b f, bissection adaptative jusqu’à `tolerance` (absolue) ou `profondeur`.
/// Bornes inversées : signe opposé. Bornes non finies : NaN.
pub fn quadrature(f: &mut dyn FnMut(f64) -> f64, a: f64, b: f64, tolerance: f64, profondeur: usize) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return f64::NAN;
    }
    if a == b {
        return 0.0;
    }
    if a > b {
        return -quadrature(f, b, a, tolerance, profondeur);
    }
    let (valeur, erreur) = g7k15(f, a, b);
    raffine(f, a, b, valeur, erreur, tolerance, profondeur)
}

fn raffine(
    f: &mut dyn FnMut(f64) -> f64,
    a: f64,
    b: f64,
    valeur: f64,
    erreur: f64,
    tolerance: f64,
    profondeur: usize,
) -> f64 {
    if erreur <= tolerance || profondeur == 0 || !erreur.is_finite() {
        return valeur;
    }
    let m = 0.5 * (a + b);
    let (vg, eg) = g7k15(f, a, m);
    let (vd, ed) = g7k15(f, m, b);
    let t = tolerance * 0.5;
    raffine(f, a, m, vg, eg, t, profondeur - 1) + raffine(f, m, b, vd, ed, t, profondeur - 1)
}
