// src/noyau/config.rs
//
// Réglages d’une expression (pas de global mutable : chaque Expression porte les siens).

/// Tolérance par défaut des comparaisons `=`, `≠`, `≥`, `≤`.
pub const EPSILON_DEFAUT: f64 = 1e-12;

/// Garde-fou : une tolérance plus grande rend `=` absurde.
const EPSILON_MAX: f64 = 1e-3;

/// Tolérance absolue par défaut de la quadrature (Integral).
pub const TOLERANCE_INTEGRALE_DEFAUT: f64 = 1e-10;

/// Profondeur de bissection de la quadrature (défaut, plafond).
pub const PROFONDEUR_INTEGRALE_DEFAUT: usize = 20;
const PROFONDEUR_INTEGRALE_MAX: usize = 30;

/// Profondeur maximale d’un arbre ou d’une imbrication de blocs.
/// Au-delà, les parcours récursifs épuiseraient la pile.
pub const PROFONDEUR_MAX: usize = 512;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// |x - y| < epsilon  =>  x = y
    pub epsilon: f64,

    /// Identificateur non réclamé : variable libre (true) ou erreur (false).
    pub implicit_variables: bool,

    /// Tolérance absolue visée par Integral.
    pub integral_tolerance: f64,

    /// Profondeur de bissection de Integral.
    pub integral_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epsilon: EPSILON_DEFAUT,
            implicit_variables: true,
            integral_tolerance: TOLERANCE_INTEGRALE_DEFAUT,
            integral_depth: PROFONDEUR_INTEGRALE_DEFAUT,
        }
    }
}

impl Config {
    /// Mode strict : tout identificateur doit être connu ou résolu.
    pub fn strict() -> Self {
        Self {
            implicit_variables: false,
            ..Self::default()
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.set_epsilon(epsilon);
        self
    }

    /// Borne epsilon dans [0, EPSILON_MAX] ; NaN => défaut.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = if epsilon.is_nan() {
            EPSILON_DEFAUT
        } else {
            epsilon.clamp(0.0, EPSILON_MAX)
        };
    }

    pub fn set_integral_tolerance(&mut self, tolerance: f64) {
        self.integral_tolerance = if tolerance.is_nan() || tolerance <= 0.0 {
            TOLERANCE_INTEGRALE_DEFAUT
        } else {
            tolerance
        };
    }

    pub fn set_integral_depth(&mut self, depth: usize) {
        self.integral_depth = depth.clamp(1, PROFONDEUR_INTEGRALE_MAX);
    }
}
